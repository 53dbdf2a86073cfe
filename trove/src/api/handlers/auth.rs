use axum::{
    extract::{Multipart, State},
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect},
    Form, Json,
};

use crate::{
    api::{
        handlers::{forms::MultipartForm, store_upload},
        models::{
            auth::{LoginForm, LoginInfo, RegisterForm, RegistrationInfo},
            users::{CurrentUser, UserResponse},
        },
    },
    auth::{password, session},
    db::{
        handlers::Users,
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::Error,
    AppState,
};

/// Get registration information
#[utoipa::path(
    get,
    path = "/authentication/register",
    tag = "authentication",
    responses(
        (status = 200, description = "Registration info", body = RegistrationInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_registration_info(State(state): State<AppState>) -> Result<Json<RegistrationInfo>, Error> {
    let enabled = state.config.auth.native.enabled && state.config.auth.native.allow_registration;
    Ok(Json(RegistrationInfo {
        enabled,
        message: if enabled {
            "Registration is enabled".to_string()
        } else {
            "Registration is disabled".to_string()
        },
    }))
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/authentication/register",
    tag = "authentication",
    responses(
        (status = 303, description = "Registered; redirected to login. Validation failures redirect back to the form with an error flag."),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Form(request): Form<RegisterForm>) -> Result<Redirect, Error> {
    if !state.config.auth.native.enabled || !state.config.auth.native.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    if request.password != request.confirm_password {
        return Ok(Redirect::to("/authentication/register?error=password_mismatch"));
    }

    let password_config = &state.config.auth.native.password;
    if request.password.len() < password_config.min_length || request.password.len() > password_config.max_length {
        return Ok(Redirect::to("/authentication/register?error=password_length"));
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    if user_repo.get_by_email(&request.email).await?.is_some() {
        return Ok(Redirect::to("/authentication/register?error=email_taken"));
    }

    // Hash the password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string(&password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let create_request = UserCreateDBRequest {
        email: request.email,
        display_name: None,
        auth_source: "native".to_string(),
        password_hash: Some(password_hash),
    };
    user_repo.create(&create_request).await?;

    Ok(Redirect::to("/authentication/login"))
}

/// Get login information
#[utoipa::path(
    get,
    path = "/authentication/login",
    tag = "authentication",
    responses(
        (status = 200, description = "Login info", body = LoginInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_login_info(State(state): State<AppState>) -> Result<Json<LoginInfo>, Error> {
    Ok(Json(LoginInfo {
        enabled: state.config.auth.native.enabled,
        message: if state.config.auth.native.enabled {
            "Native login is enabled".to_string()
        } else {
            "Native login is disabled".to_string()
        },
    }))
}

/// Login with email and password
///
/// The failure redirect is identical for an unknown email and a wrong
/// password; the form never learns which it was.
#[utoipa::path(
    post,
    path = "/authentication/login",
    tag = "authentication",
    responses(
        (status = 303, description = "Redirect to the garage with a session cookie on success, back to the form on failure"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Form(request): Form<LoginForm>) -> Result<axum::response::Response, Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    let invalid = || Ok(Redirect::to("/authentication/login?error=invalid_credentials").into_response());

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    let Some(user) = user_repo.get_by_email(&request.email).await? else {
        return invalid();
    };

    let Some(password_hash) = user.password_hash.clone() else {
        // Identity-provider accounts have no local password
        return invalid();
    };

    // Verify password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid || !user.is_active {
        return invalid();
    }

    let token = session::create_session_token(user.id, &user.email, &state.config)?;
    let cookie = session::session_cookie(&token, &state.config);

    Ok(([(SET_COOKIE, cookie)], Redirect::to("/garage")).into_response())
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 303, description = "Session cleared; redirected to login"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = session::clear_session_cookie(&state.config);
    ([(SET_COOKIE, cookie)], Redirect::to("/authentication/login"))
}

/// Current user's profile
#[utoipa::path(
    get,
    path = "/authentication/profile",
    tag = "authentication",
    responses(
        (status = 200, description = "Current profile", body = UserResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_profile(State(state): State<AppState>, user: CurrentUser) -> Result<Json<UserResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    let user = user_repo.get_by_id(user.id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
    })?;

    Ok(Json(UserResponse::from(user)))
}

/// Update the current user's profile.
///
/// Partial update: only non-empty submitted fields overwrite stored values.
/// An uploaded avatar goes through the blob store like every other image.
#[utoipa::path(
    post,
    path = "/authentication/profile",
    tag = "authentication",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Profile updated; redirected back to the profile"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_profile(State(state): State<AppState>, user: CurrentUser, multipart: Multipart) -> Result<Redirect, Error> {
    let mut form = MultipartForm::from_multipart(multipart, None).await?;

    let password_hash = match form.text_opt("password") {
        Some(password) => {
            let password_config = &state.config.auth.native.password;
            if password.len() < password_config.min_length || password.len() > password_config.max_length {
                return Ok(Redirect::to("/authentication/profile?error=password_length"));
            }
            Some(
                tokio::task::spawn_blocking(move || password::hash_string(&password))
                    .await
                    .map_err(|e| Error::Internal {
                        operation: format!("spawn password hashing task: {e}"),
                    })??,
            )
        }
        None => None,
    };

    let avatar_path = match form.take_file("avatar") {
        Some(file) => Some(store_upload(&state, "avatars", "avatar_", file).await?),
        None => None,
    };

    let update_request = UserUpdateDBRequest {
        display_name: form.text_opt("display_name"),
        avatar_path,
        password_hash,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Users::new(&mut conn).update_profile(user.id, &update_request).await?;

    Ok(Redirect::to("/authentication/profile"))
}
