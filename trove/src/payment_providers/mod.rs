//! Payment provider abstraction layer
//!
//! This module defines the `PaymentProvider` trait which abstracts
//! subscription billing across providers. The service only ever needs four
//! things from a provider: a lazily created customer record, a checkout URL,
//! a billing-portal URL, and verified webhook events. Everything else -
//! invoicing, proration, card handling - stays on the provider's side.

use async_trait::async_trait;
use axum::http::HeaderMap;
use sqlx::SqlitePool;
use tracing::instrument;

use crate::{api::models::users::CurrentUser, config::PaymentConfig, db::handlers::Users};

pub mod dummy;
pub mod stripe;

/// Create a payment provider from configuration
///
/// This is the single point where we convert config into provider instances.
/// Adding a new provider requires adding a match arm here.
pub fn create_provider(config: PaymentConfig) -> Box<dyn PaymentProvider> {
    match config {
        PaymentConfig::Stripe(stripe_config) => Box::new(stripe::StripeProvider::from(stripe_config)),
        PaymentConfig::Dummy(dummy_config) => Box::new(dummy::DummyProvider::from(dummy_config)),
    }
}

/// Result type for payment provider operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors that can occur during payment processing
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider API error: {0}")]
    ProviderApi(String),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::errors::DbError),

    #[error("Invalid payment data: {0}")]
    InvalidData(String),

    #[error("Webhook signature verification failed: {0}")]
    InvalidSignature(String),
}

/// A verified webhook event, reduced to what the service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Provider event type (e.g., "checkout.session.completed")
    pub event_type: String,
    /// Remote customer id the event refers to, if present
    pub customer_id: Option<String>,
    /// Local user id carried through checkout as the client reference
    pub client_reference_id: Option<String>,
    /// Provider-reported subscription status, for subscription.updated
    pub subscription_status: Option<String>,
}

/// Abstract payment provider interface
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create the remote customer record if the user has none yet, persist
    /// its id, and return it.
    async fn ensure_customer(&self, db_pool: &SqlitePool, user: &CurrentUser) -> Result<String>;

    /// Open a subscription checkout session.
    ///
    /// Returns the URL the user should be redirected to for payment.
    async fn create_checkout_session(&self, db_pool: &SqlitePool, user: &CurrentUser, cancel_url: &str, success_url: &str)
        -> Result<String>;

    /// Open a billing portal session for subscription self-service.
    ///
    /// Returns the URL the user should be redirected to.
    async fn create_billing_portal_session(&self, db_pool: &SqlitePool, user: &CurrentUser, return_url: &str) -> Result<String>;

    /// Verify an inbound webhook request and reduce it to a [`WebhookEvent`].
    ///
    /// A bad signature or malformed payload is an error; the caller rejects
    /// the request without touching any state.
    fn parse_webhook(&self, headers: &HeaderMap, body: &str) -> Result<WebhookEvent>;
}

/// Apply a verified webhook event to local state.
///
/// A small fixed set of event types maps to a subscription-status overwrite
/// keyed by the remote customer id (or, for checkout completion, by the
/// local user reference the session carried). The overwrite is idempotent,
/// so replayed events are harmless. Unrecognized event types are ignored.
#[instrument(skip(db_pool), fields(event_type = %event.event_type))]
pub async fn apply_webhook_event(db_pool: &SqlitePool, event: &WebhookEvent) -> Result<()> {
    let status = match event.event_type.as_str() {
        "checkout.session.completed" => Some("active".to_string()),
        "invoice.payment_succeeded" => Some("active".to_string()),
        "customer.subscription.deleted" => Some("canceled".to_string()),
        "customer.subscription.updated" => event.subscription_status.clone(),
        _ => {
            tracing::debug!("Ignoring webhook event type: {}", event.event_type);
            return Ok(());
        }
    };

    let Some(status) = status else {
        tracing::warn!("Subscription update event without a status, ignoring");
        return Ok(());
    };

    let mut conn = db_pool.acquire().await.map_err(crate::db::errors::DbError::from)?;
    let mut users = Users::new(&mut conn);

    // Checkout completion may arrive before the customer id is linked; the
    // client reference (local user id) is authoritative there.
    if event.event_type == "checkout.session.completed" {
        if let Some(user_id) = event.client_reference_id.as_ref().and_then(|id| id.parse().ok()) {
            users.set_subscription_status(user_id, &status).await?;
            if let Some(customer_id) = &event.customer_id {
                users.set_payment_customer(user_id, customer_id).await?;
            }
            return Ok(());
        }
    }

    match &event.customer_id {
        Some(customer_id) => {
            let matched = users.set_subscription_status_by_customer(customer_id, &status).await?;
            if !matched {
                tracing::warn!("Webhook event for unknown customer id, no local state changed");
            }
        }
        None => {
            tracing::warn!("Webhook event without a customer id, no local state changed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::users::UserCreateDBRequest;
    use sqlx::SqlitePool;

    async fn create_user_with_customer(pool: &SqlitePool, email: &str, customer: Option<&str>) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        let mut users = Users::new(&mut conn);
        let user = users
            .create(&UserCreateDBRequest {
                email: email.to_string(),
                display_name: None,
                auth_source: "native".to_string(),
                password_hash: None,
            })
            .await
            .unwrap();
        if let Some(customer) = customer {
            users.set_payment_customer(user.id, customer).await.unwrap();
        }
        user.id
    }

    async fn subscription_status(pool: &SqlitePool, id: i64) -> String {
        sqlx::query_scalar("SELECT subscription_status FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn event(event_type: &str, customer_id: Option<&str>) -> WebhookEvent {
        WebhookEvent {
            event_type: event_type.to_string(),
            customer_id: customer_id.map(|s| s.to_string()),
            client_reference_id: None,
            subscription_status: None,
        }
    }

    #[sqlx::test]
    async fn test_event_type_mapping(pool: SqlitePool) {
        let user = create_user_with_customer(&pool, "map@example.com", Some("cus_map")).await;

        apply_webhook_event(&pool, &event("invoice.payment_succeeded", Some("cus_map"))).await.unwrap();
        assert_eq!(subscription_status(&pool, user).await, "active");

        apply_webhook_event(&pool, &event("customer.subscription.deleted", Some("cus_map"))).await.unwrap();
        assert_eq!(subscription_status(&pool, user).await, "canceled");

        let updated = WebhookEvent {
            subscription_status: Some("past_due".to_string()),
            ..event("customer.subscription.updated", Some("cus_map"))
        };
        apply_webhook_event(&pool, &updated).await.unwrap();
        assert_eq!(subscription_status(&pool, user).await, "past_due");
    }

    #[sqlx::test]
    async fn test_checkout_completed_links_customer(pool: SqlitePool) {
        let user = create_user_with_customer(&pool, "checkout@example.com", None).await;

        let event = WebhookEvent {
            event_type: "checkout.session.completed".to_string(),
            customer_id: Some("cus_new".to_string()),
            client_reference_id: Some(user.to_string()),
            subscription_status: None,
        };
        apply_webhook_event(&pool, &event).await.unwrap();

        assert_eq!(subscription_status(&pool, user).await, "active");
        let customer: Option<String> = sqlx::query_scalar("SELECT payment_customer_id FROM users WHERE id = ?")
            .bind(user)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(customer.as_deref(), Some("cus_new"));
    }

    #[sqlx::test]
    async fn test_unknown_event_types_ignored(pool: SqlitePool) {
        let user = create_user_with_customer(&pool, "ignore@example.com", Some("cus_ignore")).await;

        apply_webhook_event(&pool, &event("customer.updated", Some("cus_ignore"))).await.unwrap();
        apply_webhook_event(&pool, &event("payment_intent.created", Some("cus_ignore"))).await.unwrap();
        assert_eq!(subscription_status(&pool, user).await, "free");
    }

    #[sqlx::test]
    async fn test_unknown_customer_changes_nothing(pool: SqlitePool) {
        let user = create_user_with_customer(&pool, "stranger@example.com", Some("cus_known")).await;

        apply_webhook_event(&pool, &event("invoice.payment_succeeded", Some("cus_other"))).await.unwrap();
        assert_eq!(subscription_status(&pool, user).await, "free");
    }

    #[sqlx::test]
    async fn test_replay_is_idempotent(pool: SqlitePool) {
        let user = create_user_with_customer(&pool, "replay@example.com", Some("cus_replay")).await;

        let event = event("invoice.payment_succeeded", Some("cus_replay"));
        apply_webhook_event(&pool, &event).await.unwrap();
        apply_webhook_event(&pool, &event).await.unwrap();
        apply_webhook_event(&pool, &event).await.unwrap();
        assert_eq!(subscription_status(&pool, user).await, "active");
    }
}
