//! Dummy payment provider for development and tests.
//!
//! No remote calls: checkout and portal return synthetic URLs, and webhooks
//! are accepted unsigned. Useful for exercising the billing flow end-to-end
//! without Stripe credentials.

use async_trait::async_trait;
use axum::http::HeaderMap;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    api::models::users::CurrentUser,
    config::DummyConfig,
    db::handlers::Users,
    payment_providers::{PaymentError, PaymentProvider, Result, WebhookEvent},
};

pub struct DummyProvider {
    /// Status forced onto simulated subscription.updated events, if set
    status_override: Option<String>,
}

impl From<DummyConfig> for DummyProvider {
    fn from(config: DummyConfig) -> Self {
        Self {
            status_override: config.status,
        }
    }
}

#[async_trait]
impl PaymentProvider for DummyProvider {
    async fn ensure_customer(&self, db_pool: &SqlitePool, user: &CurrentUser) -> Result<String> {
        if let Some(existing_id) = &user.payment_customer_id {
            return Ok(existing_id.clone());
        }

        let customer_id = format!("dummy_cus_{}", user.id);
        let mut conn = db_pool.acquire().await.map_err(crate::db::errors::DbError::from)?;
        Users::new(&mut conn).set_payment_customer(user.id, &customer_id).await?;

        Ok(customer_id)
    }

    async fn create_checkout_session(
        &self,
        db_pool: &SqlitePool,
        user: &CurrentUser,
        _cancel_url: &str,
        success_url: &str,
    ) -> Result<String> {
        self.ensure_customer(db_pool, user).await?;
        Ok(format!("{success_url}?dummy_session={}", Uuid::new_v4()))
    }

    async fn create_billing_portal_session(&self, db_pool: &SqlitePool, user: &CurrentUser, return_url: &str) -> Result<String> {
        self.ensure_customer(db_pool, user).await?;
        Ok(return_url.to_string())
    }

    fn parse_webhook(&self, _headers: &HeaderMap, body: &str) -> Result<WebhookEvent> {
        let payload: serde_json::Value =
            serde_json::from_str(body).map_err(|e| PaymentError::InvalidData(format!("Malformed webhook payload: {e}")))?;

        let event_type = payload
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| PaymentError::InvalidData("Webhook payload missing event type".to_string()))?
            .to_string();

        let object = payload.pointer("/data/object").cloned().unwrap_or(serde_json::Value::Null);

        let subscription_status = self
            .status_override
            .clone()
            .or_else(|| object.get("status").and_then(|s| s.as_str()).map(|s| s.to_string()));

        Ok(WebhookEvent {
            event_type,
            customer_id: object.get("customer").and_then(|c| c.as_str()).map(|s| s.to_string()),
            client_reference_id: object.get("client_reference_id").and_then(|c| c.as_str()).map(|s| s.to_string()),
            subscription_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::users::UserCreateDBRequest;
    use crate::payment_providers::apply_webhook_event;

    async fn current_user(pool: &SqlitePool, email: &str) -> CurrentUser {
        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .create(&UserCreateDBRequest {
                email: email.to_string(),
                display_name: None,
                auth_source: "native".to_string(),
                password_hash: None,
            })
            .await
            .unwrap();
        CurrentUser::from(user)
    }

    #[sqlx::test]
    async fn test_customer_created_lazily_once(pool: SqlitePool) {
        let provider = DummyProvider::from(DummyConfig::default());
        let user = current_user(&pool, "lazy@example.com").await;

        let first = provider.ensure_customer(&pool, &user).await.unwrap();
        assert_eq!(first, format!("dummy_cus_{}", user.id));

        // A user already holding a customer id keeps it
        let mut linked = user.clone();
        linked.payment_customer_id = Some(first.clone());
        let second = provider.ensure_customer(&pool, &linked).await.unwrap();
        assert_eq!(second, first);
    }

    #[sqlx::test]
    async fn test_checkout_flow_end_to_end(pool: SqlitePool) {
        let provider = DummyProvider::from(DummyConfig::default());
        let user = current_user(&pool, "flow@example.com").await;

        let url = provider
            .create_checkout_session(&pool, &user, "http://localhost/billing", "http://localhost/billing/success")
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost/billing/success"));

        // Simulate the provider's completion webhook
        let body = format!(
            r#"{{"type": "checkout.session.completed", "data": {{"object": {{"customer": "dummy_cus_{id}", "client_reference_id": "{id}"}}}}}}"#,
            id = user.id
        );
        let event = provider.parse_webhook(&HeaderMap::new(), &body).unwrap();
        apply_webhook_event(&pool, &event).await.unwrap();

        let status: String = sqlx::query_scalar("SELECT subscription_status FROM users WHERE id = ?")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, "active");
    }
}
