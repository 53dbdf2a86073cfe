//! Stripe payment provider implementation

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::SqlitePool;
use stripe::{
    BillingPortalSession, CheckoutSession, CheckoutSessionMode, Client, CreateBillingPortalSession, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCustomer, Customer,
};

use crate::{
    api::models::users::CurrentUser,
    config::StripeConfig,
    db::handlers::Users,
    payment_providers::{PaymentError, PaymentProvider, Result, WebhookEvent},
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a webhook timestamp, in seconds. Bounds replay of
/// captured requests.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Stripe payment provider
pub struct StripeProvider {
    api_key: String,
    price_id: String,
    webhook_secret: String,
}

impl From<StripeConfig> for StripeProvider {
    fn from(config: StripeConfig) -> Self {
        Self {
            api_key: config.api_key,
            price_id: config.price_id,
            webhook_secret: config.webhook_secret,
        }
    }
}

impl StripeProvider {
    pub fn new(api_key: String, price_id: String, webhook_secret: String) -> Self {
        Self {
            api_key,
            price_id,
            webhook_secret,
        }
    }

    /// Get a Stripe client
    fn client(&self) -> Client {
        Client::new(&self.api_key)
    }

    /// Verify the `Stripe-Signature` header against the payload.
    ///
    /// The header carries `t=<unix ts>,v1=<hex hmac>[,v1=...]`; the signed
    /// payload is `"{t}.{body}"` under HMAC-SHA256 with the shared secret.
    fn verify_signature(&self, headers: &HeaderMap, payload: &str) -> Result<()> {
        let header = headers
            .get("stripe-signature")
            .ok_or_else(|| PaymentError::InvalidSignature("Missing stripe-signature header".to_string()))?
            .to_str()
            .map_err(|_| PaymentError::InvalidSignature("Invalid stripe-signature header".to_string()))?;

        let mut timestamp: Option<i64> = None;
        let mut signatures: Vec<&str> = Vec::new();
        for part in header.split(',') {
            if let Some((key, value)) = part.trim().split_once('=') {
                match key {
                    "t" => timestamp = value.parse().ok(),
                    "v1" => signatures.push(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| PaymentError::InvalidSignature("Missing timestamp".to_string()))?;
        if (Utc::now().timestamp() - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(PaymentError::InvalidSignature("Timestamp outside tolerance".to_string()));
        }

        let signed_payload = format!("{timestamp}.{payload}");
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|e| PaymentError::InvalidSignature(format!("Bad webhook secret: {e}")))?;
        mac.update(signed_payload.as_bytes());
        let expected: String = mac.finalize().into_bytes().iter().map(|b| format!("{b:02x}")).collect();

        if signatures.iter().any(|s| *s == expected) {
            Ok(())
        } else {
            Err(PaymentError::InvalidSignature("No matching v1 signature".to_string()))
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn ensure_customer(&self, db_pool: &SqlitePool, user: &CurrentUser) -> Result<String> {
        if let Some(existing_id) = &user.payment_customer_id {
            return Ok(existing_id.clone());
        }

        let client = self.client();
        tracing::info!("No customer record for user {}, creating one", user.id);

        let customer = Customer::create(
            &client,
            CreateCustomer {
                email: Some(&user.email),
                name: user.display_name.as_deref(),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to create Stripe customer: {:?}", e);
            PaymentError::ProviderApi(e.to_string())
        })?;

        let customer_id = customer.id.to_string();

        let mut conn = db_pool.acquire().await.map_err(crate::db::errors::DbError::from)?;
        Users::new(&mut conn).set_payment_customer(user.id, &customer_id).await?;

        Ok(customer_id)
    }

    async fn create_checkout_session(
        &self,
        db_pool: &SqlitePool,
        user: &CurrentUser,
        cancel_url: &str,
        success_url: &str,
    ) -> Result<String> {
        let customer_id = self.ensure_customer(db_pool, user).await?;
        let client = self.client();

        let client_reference = user.id.to_string();
        let checkout_params = CreateCheckoutSession {
            cancel_url: Some(cancel_url),
            success_url: Some(success_url),
            client_reference_id: Some(&client_reference),
            customer: Some(
                customer_id
                    .parse()
                    .map_err(|_| PaymentError::InvalidData(format!("Invalid customer id: {customer_id}")))?,
            ),
            line_items: Some(vec![CreateCheckoutSessionLineItems {
                price: Some(self.price_id.clone()),
                quantity: Some(1),
                ..Default::default()
            }]),
            mode: Some(CheckoutSessionMode::Subscription),
            ..Default::default()
        };

        let checkout_session = CheckoutSession::create(&client, checkout_params).await.map_err(|e| {
            tracing::error!("Failed to create Stripe checkout session: {:?}", e);
            PaymentError::ProviderApi(e.to_string())
        })?;

        tracing::info!("Created checkout session {} for user {}", checkout_session.id, user.id);

        // Return checkout URL for hosted checkout
        checkout_session.url.ok_or_else(|| {
            tracing::error!("Checkout session missing URL");
            PaymentError::ProviderApi("Checkout session missing URL".to_string())
        })
    }

    async fn create_billing_portal_session(&self, db_pool: &SqlitePool, user: &CurrentUser, return_url: &str) -> Result<String> {
        let customer_id = self.ensure_customer(db_pool, user).await?;
        let client = self.client();

        let customer = customer_id
            .parse()
            .map_err(|_| PaymentError::InvalidData(format!("Invalid customer id: {customer_id}")))?;

        let mut portal_params = CreateBillingPortalSession::new(customer);
        portal_params.return_url = Some(return_url);

        let portal_session = BillingPortalSession::create(&client, portal_params).await.map_err(|e| {
            tracing::error!("Failed to create Stripe billing portal session: {:?}", e);
            PaymentError::ProviderApi(e.to_string())
        })?;

        Ok(portal_session.url)
    }

    fn parse_webhook(&self, headers: &HeaderMap, body: &str) -> Result<WebhookEvent> {
        self.verify_signature(headers, body)?;

        // Dispatch off the raw payload rather than typed event objects so
        // unrecognized event types stay ignorable instead of failing to
        // deserialize.
        let payload: serde_json::Value =
            serde_json::from_str(body).map_err(|e| PaymentError::InvalidData(format!("Malformed webhook payload: {e}")))?;

        let event_type = payload
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| PaymentError::InvalidData("Webhook payload missing event type".to_string()))?
            .to_string();

        let object = payload.pointer("/data/object").cloned().unwrap_or(serde_json::Value::Null);

        Ok(WebhookEvent {
            event_type,
            customer_id: object.get("customer").and_then(|c| c.as_str()).map(|s| s.to_string()),
            client_reference_id: object.get("client_reference_id").and_then(|c| c.as_str()).map(|s| s.to_string()),
            subscription_status: object.get("status").and_then(|s| s.as_str()).map(|s| s.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn provider() -> StripeProvider {
        StripeProvider::new("sk_test_fake".to_string(), "price_fake".to_string(), "whsec_fake".to_string())
    }

    /// Compute a valid Stripe-Signature header for a payload, the way Stripe
    /// would sign it.
    fn sign(secret: &str, timestamp: i64, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.{payload}").as_bytes());
        let signature: String = mac.finalize().into_bytes().iter().map(|b| format!("{b:02x}")).collect();
        format!("t={timestamp},v1={signature}")
    }

    fn headers_with_signature(signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("stripe-signature", HeaderValue::from_str(signature).unwrap());
        headers
    }

    const CHECKOUT_PAYLOAD: &str = r#"{
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_123",
                "customer": "cus_test_456",
                "client_reference_id": "7"
            }
        }
    }"#;

    #[test]
    fn test_valid_signature_parses_event() {
        let provider = provider();
        let signature = sign("whsec_fake", Utc::now().timestamp(), CHECKOUT_PAYLOAD);
        let headers = headers_with_signature(&signature);

        let event = provider.parse_webhook(&headers, CHECKOUT_PAYLOAD).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.customer_id.as_deref(), Some("cus_test_456"));
        assert_eq!(event.client_reference_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let provider = provider();
        let signature = sign("whsec_other", Utc::now().timestamp(), CHECKOUT_PAYLOAD);
        let headers = headers_with_signature(&signature);

        let result = provider.parse_webhook(&headers, CHECKOUT_PAYLOAD);
        assert!(matches!(result.unwrap_err(), PaymentError::InvalidSignature(_)));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let provider = provider();
        let signature = sign("whsec_fake", Utc::now().timestamp(), CHECKOUT_PAYLOAD);
        let headers = headers_with_signature(&signature);

        let tampered = CHECKOUT_PAYLOAD.replace("cus_test_456", "cus_attacker");
        let result = provider.parse_webhook(&headers, &tampered);
        assert!(matches!(result.unwrap_err(), PaymentError::InvalidSignature(_)));
    }

    #[test]
    fn test_missing_header_rejected() {
        let provider = provider();
        let result = provider.parse_webhook(&HeaderMap::new(), CHECKOUT_PAYLOAD);
        assert!(matches!(result.unwrap_err(), PaymentError::InvalidSignature(_)));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let provider = provider();
        let stale = Utc::now().timestamp() - SIGNATURE_TOLERANCE_SECS - 60;
        let signature = sign("whsec_fake", stale, CHECKOUT_PAYLOAD);
        let headers = headers_with_signature(&signature);

        let result = provider.parse_webhook(&headers, CHECKOUT_PAYLOAD);
        assert!(matches!(result.unwrap_err(), PaymentError::InvalidSignature(_)));
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let provider = provider();
        let body = "not json at all";
        let signature = sign("whsec_fake", Utc::now().timestamp(), body);
        let headers = headers_with_signature(&signature);

        // Signature is fine, body is not
        let result = provider.parse_webhook(&headers, body);
        assert!(matches!(result.unwrap_err(), PaymentError::InvalidData(_)));
    }

    #[test]
    fn test_subscription_updated_carries_status() {
        let provider = provider();
        let body = r#"{
            "type": "customer.subscription.updated",
            "data": {"object": {"id": "sub_1", "customer": "cus_9", "status": "past_due"}}
        }"#;
        let signature = sign("whsec_fake", Utc::now().timestamp(), body);
        let headers = headers_with_signature(&signature);

        let event = provider.parse_webhook(&headers, body).unwrap();
        assert_eq!(event.event_type, "customer.subscription.updated");
        assert_eq!(event.subscription_status.as_deref(), Some("past_due"));
    }
}
