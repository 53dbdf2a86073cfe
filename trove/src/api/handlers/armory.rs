use axum::{
    extract::{Multipart, Path, Query, State},
    response::Redirect,
    Form, Json,
};

use crate::{
    api::{
        handlers::{forms::MultipartForm, store_upload},
        models::{
            armory::{AccessoryForm, ArmoryIndexResponse, GunDetailResponse, RangeSessionForm},
            users::CurrentUser,
            DisposalForm, ListQuery,
        },
    },
    db::{
        handlers::{analytics, Guns, OwnedRepository},
        models::{
            armory::{AccessoryCreateDBRequest, GunCreateDBRequest, GunUpdateDBRequest, RangeSessionCreateDBRequest},
            DisposalRequest,
        },
    },
    errors::Error,
    types::GunId,
    AppState,
};

fn not_found() -> Error {
    Error::NotFound {
        resource: "Gun".to_string(),
    }
}

/// List the caller's guns with the armory dashboard numbers
#[utoipa::path(
    get,
    path = "/armory",
    tag = "armory",
    params(ListQuery),
    responses(
        (status = 200, description = "Guns and stats"),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_guns(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ArmoryIndexResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let guns = Guns::new(&mut conn).list(user.id, query.include_all).await?;
    let stats = analytics::armory_stats(&mut conn, user.id).await?;

    Ok(Json(ArmoryIndexResponse { guns, stats }))
}

/// Register a new gun (photo and purchase invoice optional)
#[utoipa::path(
    post,
    path = "/armory",
    tag = "armory",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Created; redirected to the armory"),
        (status = 400, description = "Invalid input"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_gun(State(state): State<AppState>, user: CurrentUser, multipart: Multipart) -> Result<Redirect, Error> {
    let mut form = MultipartForm::from_multipart(multipart, None).await?;

    let photo_path = match form.take_file("photo") {
        Some(file) => Some(store_upload(&state, "guns", "gun_", file).await?),
        None => None,
    };
    let invoice_path = match form.take_file("invoice") {
        Some(file) => Some(store_upload(&state, "invoices", "nf_gun_", file).await?),
        None => None,
    };

    let request = GunCreateDBRequest {
        nickname: form.text("nickname")?,
        make: form.text("make")?,
        model: form.text("model")?,
        caliber: form.text("caliber")?,
        base_price: form.parse_or("base_price", 0.0)?,
        total_rounds: form.parse_or("total_rounds", 0)?,
        photo_path,
        invoice_path,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Guns::new(&mut conn).create(user.id, &request).await?;

    Ok(Redirect::to("/armory"))
}

/// Gun detail with accessories and range history
#[utoipa::path(
    get,
    path = "/armory/{id}",
    tag = "armory",
    responses(
        (status = 200, description = "Gun detail"),
        (status = 404, description = "Not found"),
    )
)]
#[tracing::instrument(skip_all, fields(gun_id = id))]
pub async fn get_gun(State(state): State<AppState>, user: CurrentUser, Path(id): Path<GunId>) -> Result<Json<GunDetailResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Guns::new(&mut conn);

    let gun = repo.get(user.id, id).await?.ok_or_else(not_found)?;
    let accessories = repo.accessories(user.id, id).await?.ok_or_else(not_found)?;
    let sessions = repo.range_sessions(user.id, id).await?.ok_or_else(not_found)?;

    Ok(Json(GunDetailResponse {
        gun,
        accessories,
        sessions,
    }))
}

/// Update a gun's details
#[utoipa::path(
    post,
    path = "/armory/{id}",
    tag = "armory",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Updated; redirected to the armory"),
        (status = 404, description = "Not found"),
    )
)]
#[tracing::instrument(skip_all, fields(gun_id = id))]
pub async fn update_gun(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<GunId>,
    multipart: Multipart,
) -> Result<Redirect, Error> {
    let mut form = MultipartForm::from_multipart(multipart, None).await?;

    let photo_path = match form.take_file("photo") {
        Some(file) => Some(store_upload(&state, "guns", "gun_", file).await?),
        None => None,
    };
    let invoice_path = match form.take_file("invoice") {
        Some(file) => Some(store_upload(&state, "invoices", "nf_gun_", file).await?),
        None => None,
    };

    let request = GunUpdateDBRequest {
        nickname: form.text("nickname")?,
        make: form.text("make")?,
        model: form.text("model")?,
        caliber: form.text("caliber")?,
        base_price: form.parse_or("base_price", 0.0)?,
        photo_path,
        invoice_path,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Guns::new(&mut conn).update(user.id, id, &request).await?.ok_or_else(not_found)?;

    Ok(Redirect::to("/armory"))
}

/// Attach an accessory; its cost feeds the valuation
#[utoipa::path(
    post,
    path = "/armory/{id}/accessories",
    tag = "armory",
    responses(
        (status = 303, description = "Added; redirected to the gun"),
        (status = 404, description = "Not found"),
    )
)]
#[tracing::instrument(skip_all, fields(gun_id = id))]
pub async fn add_accessory(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<GunId>,
    Form(form): Form<AccessoryForm>,
) -> Result<Redirect, Error> {
    let request = AccessoryCreateDBRequest {
        kind: form.kind,
        brand: form.brand,
        model: form.model,
        cost: form.cost,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Guns::new(&mut conn)
        .add_accessory(user.id, id, &request)
        .await?
        .ok_or_else(not_found)?;

    Ok(Redirect::to(&format!("/armory/{id}")))
}

/// Log a range session; rounds fired add to the gun's total
#[utoipa::path(
    post,
    path = "/armory/{id}/sessions",
    tag = "armory",
    responses(
        (status = 303, description = "Logged; redirected to the gun"),
        (status = 404, description = "Not found"),
    )
)]
#[tracing::instrument(skip_all, fields(gun_id = id))]
pub async fn add_range_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<GunId>,
    Form(form): Form<RangeSessionForm>,
) -> Result<Redirect, Error> {
    let request = RangeSessionCreateDBRequest {
        fired_on: form.fired_on,
        location: form.location,
        rounds_fired: form.rounds_fired,
        ammo_brand: form.ammo_brand,
        ammo_grain: form.ammo_grain,
        failure_count: form.failure_count,
        notes: form.notes.filter(|n| !n.is_empty()),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Guns::new(&mut conn)
        .add_range_session(user.id, id, &request)
        .await?
        .ok_or_else(not_found)?;

    Ok(Redirect::to(&format!("/armory/{id}")))
}

/// Dispose of a gun (sold/donated/discarded); the row survives
#[utoipa::path(
    post,
    path = "/armory/{id}/dispose",
    tag = "armory",
    responses(
        (status = 303, description = "Disposed; redirected to the armory"),
        (status = 400, description = "Not a terminal status"),
        (status = 404, description = "Not found"),
    )
)]
#[tracing::instrument(skip_all, fields(gun_id = id))]
pub async fn dispose_gun(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<GunId>,
    Form(form): Form<DisposalForm>,
) -> Result<Redirect, Error> {
    if !form.status.is_disposal() {
        return Err(Error::BadRequest {
            message: "Disposal status must be sold, donated, or discarded".to_string(),
        });
    }

    let request = DisposalRequest {
        status: form.status,
        disposed_on: form.disposed_on,
        sale_value: form.sale_value,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Guns::new(&mut conn).dispose(user.id, id, &request).await?.ok_or_else(not_found)?;

    Ok(Redirect::to("/armory"))
}
