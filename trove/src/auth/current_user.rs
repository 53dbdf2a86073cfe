//! Extractor resolving the authenticated user for a request.
//!
//! Authentication methods are tried in priority order:
//!
//! 1. Session cookie (JWT) - the subject id is looked up in the database, so
//!    revoked or deleted accounts fail even with a valid token.
//! 2. Trusted identity header - an upstream identity provider asserts the
//!    user's email. Unknown emails are auto-created on first sight (when
//!    enabled), and a display-name header backfills the profile without
//!    overwriting anything the user already set.

use crate::{
    api::models::users::CurrentUser,
    auth::session,
    db::{
        errors::DbError,
        handlers::Users,
        models::users::UserCreateDBRequest,
    },
    errors::{Error, Result},
    AppState,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::SqlitePool;
use tracing::instrument;

/// Extract the session token from the cookie header, if present.
fn session_token_from_cookies(parts: &Parts, cookie_name: &str) -> Option<String> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;
    let cookie_str = cookie_header.to_str().ok()?;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name == cookie_name {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Try JWT session cookie auth.
/// Returns:
/// - None: no session cookie present, or the token is invalid/expired
///   (expired cookies are expected; the caller falls through to other methods)
/// - Some(Ok(user)): valid token whose subject still exists
/// - Some(Err(error)): valid token but the lookup failed
#[instrument(skip_all)]
async fn try_session_cookie_auth(parts: &Parts, state: &AppState) -> Option<Result<CurrentUser>> {
    let token = session_token_from_cookies(parts, &state.config.auth.native.session.cookie_name)?;

    let claims = match session::verify_session_token(&token, &state.config) {
        Ok(claims) => claims,
        // Invalid/expired tokens are not an error here; the request may
        // authenticate another way
        Err(_) => return None,
    };

    let mut conn = match state.db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };
    let mut users = Users::new(&mut conn);

    match users.get_by_id(claims.sub).await {
        Ok(Some(user)) if user.is_active => Some(Ok(CurrentUser::from(user))),
        Ok(_) => Some(Err(Error::Unauthenticated { message: None })),
        Err(e) => Some(Err(Error::Database(e))),
    }
}

/// Try trusted identity-header auth.
/// Returns:
/// - None: header not present
/// - Some(Ok(user)): user found or auto-created
/// - Some(Err(error)): lookup/creation failed
#[instrument(skip_all)]
async fn try_identity_header_auth(parts: &Parts, state: &AppState, db: &SqlitePool) -> Option<Result<CurrentUser>> {
    let header_config = &state.config.auth.identity_header;

    let email = match parts.headers.get(&header_config.email_header).and_then(|h| h.to_str().ok()) {
        Some(email) if !email.is_empty() => email,
        _ => return None,
    };

    let display_name = parts
        .headers
        .get(&header_config.display_name_header)
        .and_then(|h| h.to_str().ok())
        .filter(|name| !name.is_empty());

    let mut conn = match db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };
    let mut users = Users::new(&mut conn);

    let user = match users.get_by_email(email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            if !header_config.auto_create_users {
                return None;
            }
            let create_request = UserCreateDBRequest {
                email: email.to_string(),
                display_name: display_name.map(|s| s.to_string()),
                auth_source: "identity-header".to_string(),
                password_hash: None,
            };
            match users.create(&create_request).await {
                Ok(user) => return Some(Ok(CurrentUser::from(user))),
                Err(e) => return Some(Err(Error::Database(e))),
            }
        }
        Err(e) => return Some(Err(Error::Database(e))),
    };

    // Backfill missing profile fields; existing non-empty values win
    if let Some(name) = display_name {
        if user.display_name.as_deref().unwrap_or("").is_empty() {
            if let Err(e) = users.backfill_display_name(user.id, name).await {
                return Some(Err(Error::Database(e)));
            }
        }
    }

    match users.get_by_id(user.id).await {
        Ok(Some(user)) => Some(Ok(CurrentUser::from(user))),
        Ok(None) => Some(Err(Error::Unauthenticated { message: None })),
        Err(e) => Some(Err(Error::Database(e))),
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        if let Some(result) = try_session_cookie_auth(parts, state).await {
            return result;
        }

        if state.config.auth.identity_header.enabled {
            if let Some(result) = try_identity_header_auth(parts, state, &state.db).await {
                return result;
            }
        }

        Err(Error::Unauthenticated { message: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_app_state, create_test_user};
    use axum::http::Request;
    use sqlx::SqlitePool;

    fn parts_with_headers(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/garage");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[sqlx::test]
    async fn test_session_cookie_resolves_user(pool: SqlitePool) {
        let state = create_test_app_state(pool.clone()).await;
        let user = create_test_user(&pool, "cookie@example.com").await;

        let token = session::create_session_token(user.id, &user.email, &state.config).unwrap();
        let mut parts = parts_with_headers(&[("cookie", &format!("trove_session={token}"))]);

        let current = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(current.id, user.id);
        assert_eq!(current.email, "cookie@example.com");
    }

    #[sqlx::test]
    async fn test_garbage_cookie_is_unauthenticated(pool: SqlitePool) {
        let state = create_test_app_state(pool).await;
        let mut parts = parts_with_headers(&[("cookie", "trove_session=garbage")]);

        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[sqlx::test]
    async fn test_identity_header_auto_creates_once(pool: SqlitePool) {
        let mut state = create_test_app_state(pool.clone()).await;
        state.config.auth.identity_header.enabled = true;

        let mut parts = parts_with_headers(&[("x-trove-user", "sso@example.com"), ("x-trove-user-name", "From Provider")]);
        let first = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(first.email, "sso@example.com");
        assert_eq!(first.display_name.as_deref(), Some("From Provider"));

        // Second request with a different asserted name: same user, name kept
        let mut parts = parts_with_headers(&[("x-trove-user", "sso@example.com"), ("x-trove-user-name", "Changed Name")]);
        let second = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.display_name.as_deref(), Some("From Provider"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = 'sso@example.com'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test]
    async fn test_identity_header_disabled_by_default(pool: SqlitePool) {
        let state = create_test_app_state(pool).await;
        let mut parts = parts_with_headers(&[("x-trove-user", "sso@example.com")]);

        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[sqlx::test]
    async fn test_backfill_fills_missing_name(pool: SqlitePool) {
        let mut state = create_test_app_state(pool.clone()).await;
        state.config.auth.identity_header.enabled = true;

        // First sign-in without a name header
        let mut parts = parts_with_headers(&[("x-trove-user", "late-name@example.com")]);
        let first = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(first.display_name.is_none());

        // Provider starts sending the name later: it backfills
        let mut parts = parts_with_headers(&[("x-trove-user", "late-name@example.com"), ("x-trove-user-name", "Finally Named")]);
        let second = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(second.display_name.as_deref(), Some("Finally Named"));
    }
}
