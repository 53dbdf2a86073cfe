//! HTTP handlers for the billing proxy.
//!
//! The service never talks money itself: checkout and subscription
//! management redirect to the payment provider, and inbound webhooks update
//! the local subscription status. Provider outages degrade to a redirect
//! carrying an error flag rather than a failed page.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Redirect,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    api::models::users::CurrentUser,
    errors::Error,
    payment_providers::{apply_webhook_event, PaymentError},
    AppState,
};

/// Billing state as shown on the pricing page.
#[derive(Debug, Serialize, ToSchema)]
pub struct BillingInfo {
    pub billing_enabled: bool,
    pub subscription_status: String,
    pub is_premium: bool,
}

/// Current subscription status for the caller
#[utoipa::path(
    get,
    path = "/billing",
    tag = "billing",
    responses(
        (status = 200, description = "Billing info", body = BillingInfo),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn billing_info(State(state): State<AppState>, user: CurrentUser) -> Result<Json<BillingInfo>, Error> {
    Ok(Json(BillingInfo {
        billing_enabled: state.payment_provider.is_some(),
        is_premium: user.subscription_status == "active",
        subscription_status: user.subscription_status,
    }))
}

/// Start a subscription checkout.
///
/// Redirects to the provider's hosted checkout. A missing provider or a
/// provider failure degrades to a redirect back to the pricing page with an
/// error flag; billing problems never hard-fail the app.
#[utoipa::path(
    post,
    path = "/billing/checkout",
    tag = "billing",
    responses(
        (status = 303, description = "Redirect to the provider checkout, or back to /billing with an error flag"),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_checkout(State(state): State<AppState>, user: CurrentUser) -> Result<Redirect, Error> {
    let Some(provider) = state.payment_provider.as_ref() else {
        tracing::warn!("Checkout requested but no payment provider is configured");
        return Ok(Redirect::to("/billing?error=not_configured"));
    };

    let base = state.config.dashboard_url.trim_end_matches('/');
    let success_url = format!("{base}/billing?success=true");
    let cancel_url = format!("{base}/billing?canceled=true");

    match provider.create_checkout_session(&state.db, &user, &cancel_url, &success_url).await {
        Ok(checkout_url) => Ok(Redirect::to(&checkout_url)),
        Err(e) => {
            tracing::error!("Checkout session creation failed: {e}");
            Ok(Redirect::to("/billing?error=checkout_failed"))
        }
    }
}

/// Open the provider's billing portal for subscription self-service
#[utoipa::path(
    get,
    path = "/billing/portal",
    tag = "billing",
    responses(
        (status = 303, description = "Redirect to the provider portal, or back to /billing on failure"),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn customer_portal(State(state): State<AppState>, user: CurrentUser) -> Result<Redirect, Error> {
    let Some(provider) = state.payment_provider.as_ref() else {
        tracing::warn!("Portal requested but no payment provider is configured");
        return Ok(Redirect::to("/billing?error=not_configured"));
    };

    let base = state.config.dashboard_url.trim_end_matches('/');
    let return_url = format!("{base}/billing");

    match provider.create_billing_portal_session(&state.db, &user, &return_url).await {
        Ok(portal_url) => Ok(Redirect::to(&portal_url)),
        Err(e) => {
            tracing::error!("Billing portal session creation failed: {e}");
            Ok(Redirect::to("/billing?error=portal_failed"))
        }
    }
}

/// Inbound payment provider webhook.
///
/// The payload is signature-verified before anything else; a bad signature
/// or malformed body is rejected with no state change. Recognized events
/// overwrite the subscription status; everything else is acknowledged and
/// ignored.
#[utoipa::path(
    post,
    path = "/webhooks/billing",
    tag = "billing",
    responses(
        (status = 200, description = "Event processed or ignored"),
        (status = 400, description = "Signature verification failed or malformed payload"),
        (status = 501, description = "No payment provider configured"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn webhook_handler(State(state): State<AppState>, headers: HeaderMap, body: String) -> StatusCode {
    let Some(provider) = state.payment_provider.as_ref() else {
        tracing::warn!("Webhook received but no payment provider is configured");
        return StatusCode::NOT_IMPLEMENTED;
    };

    let event = match provider.parse_webhook(&headers, &body) {
        Ok(event) => event,
        Err(PaymentError::InvalidSignature(reason)) => {
            tracing::warn!("Rejected webhook: {reason}");
            return StatusCode::BAD_REQUEST;
        }
        Err(PaymentError::InvalidData(reason)) => {
            tracing::warn!("Rejected malformed webhook: {reason}");
            return StatusCode::BAD_REQUEST;
        }
        Err(e) => {
            tracing::error!("Webhook parsing failed: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    tracing::info!("Received webhook event: {}", event.event_type);

    match apply_webhook_event(&state.db, &event).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!("Failed to apply webhook event: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
