use axum::{
    extract::{Multipart, Path, Query, State},
    response::Redirect,
    Form, Json,
};

use crate::{
    api::{
        handlers::{forms::MultipartForm, store_upload},
        models::{
            garage::{GarageIndexResponse, OdometerForm, VehicleDetailResponse},
            users::CurrentUser,
            DisposalForm, ListQuery,
        },
    },
    db::{
        handlers::{analytics, OwnedRepository, Vehicles},
        models::{
            garage::{ServiceLogCreateDBRequest, VehicleCreateDBRequest, VehicleUpdateDBRequest},
            DisposalRequest,
        },
    },
    errors::Error,
    types::VehicleId,
    AppState,
};

fn not_found() -> Error {
    Error::NotFound {
        resource: "Vehicle".to_string(),
    }
}

/// List the caller's vehicles with the garage dashboard numbers
#[utoipa::path(
    get,
    path = "/garage",
    tag = "garage",
    params(ListQuery),
    responses(
        (status = 200, description = "Vehicles and stats"),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_vehicles(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<GarageIndexResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let vehicles = Vehicles::new(&mut conn).list(user.id, query.include_all).await?;
    let stats = analytics::garage_stats(&mut conn, user.id).await?;

    Ok(Json(GarageIndexResponse { vehicles, stats }))
}

/// Register a new vehicle
#[utoipa::path(
    post,
    path = "/garage",
    tag = "garage",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Created; redirected to the garage"),
        (status = 400, description = "Invalid input"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_vehicle(State(state): State<AppState>, user: CurrentUser, multipart: Multipart) -> Result<Redirect, Error> {
    let mut form = MultipartForm::from_multipart(multipart, None).await?;

    let photo_path = match form.take_file("photo") {
        Some(file) => Some(store_upload(&state, "cars", "car_", file).await?),
        None => None,
    };

    let request = VehicleCreateDBRequest {
        name: form.text("name")?,
        make: form.text("make")?,
        model: form.text("model")?,
        year: form.parse("year")?,
        plate: form.text("plate")?,
        odometer_km: form.parse("odometer_km")?,
        monthly_km_estimate: form.parse_or("monthly_km_estimate", 1000)?,
        estimated_value: form.parse_or("estimated_value", 0.0)?,
        photo_path,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Vehicles::new(&mut conn).create(user.id, &request).await?;

    Ok(Redirect::to("/garage"))
}

/// Vehicle detail with service history and alerts
#[utoipa::path(
    get,
    path = "/garage/{id}",
    tag = "garage",
    responses(
        (status = 200, description = "Vehicle detail"),
        (status = 404, description = "Not found"),
    )
)]
#[tracing::instrument(skip_all, fields(vehicle_id = id))]
pub async fn get_vehicle(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<VehicleId>,
) -> Result<Json<VehicleDetailResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Vehicles::new(&mut conn);

    let vehicle = repo.get(user.id, id).await?.ok_or_else(not_found)?;
    let maintenance = repo.maintenance_logs(user.id, id).await?.ok_or_else(not_found)?;
    let alerts = repo.alerts(user.id, id).await?.ok_or_else(not_found)?;

    Ok(Json(VehicleDetailResponse {
        vehicle,
        maintenance,
        alerts,
    }))
}

/// Update a vehicle's details
#[utoipa::path(
    post,
    path = "/garage/{id}",
    tag = "garage",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Updated; redirected to the garage"),
        (status = 404, description = "Not found"),
    )
)]
#[tracing::instrument(skip_all, fields(vehicle_id = id))]
pub async fn update_vehicle(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<VehicleId>,
    multipart: Multipart,
) -> Result<Redirect, Error> {
    let mut form = MultipartForm::from_multipart(multipart, None).await?;

    let photo_path = match form.take_file("photo") {
        Some(file) => Some(store_upload(&state, "cars", "car_", file).await?),
        None => None,
    };

    let request = VehicleUpdateDBRequest {
        name: form.text("name")?,
        make: form.text("make")?,
        model: form.text("model")?,
        year: form.parse("year")?,
        plate: form.text("plate")?,
        odometer_km: form.parse("odometer_km")?,
        estimated_value: form.parse_or("estimated_value", 0.0)?,
        photo_path,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Vehicles::new(&mut conn)
        .update(user.id, id, &request)
        .await?
        .ok_or_else(not_found)?;

    Ok(Redirect::to("/garage"))
}

/// Manually advance the odometer.
///
/// A reading at or below the current value changes nothing; the redirect is
/// the same either way.
#[utoipa::path(
    post,
    path = "/garage/{id}/odometer",
    tag = "garage",
    responses(
        (status = 303, description = "Redirected to the garage"),
    )
)]
#[tracing::instrument(skip_all, fields(vehicle_id = id))]
pub async fn update_odometer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<VehicleId>,
    Form(form): Form<OdometerForm>,
) -> Result<Redirect, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Vehicles::new(&mut conn).update_odometer(user.id, id, form.new_km).await?;

    Ok(Redirect::to("/garage"))
}

/// Log a service event
#[utoipa::path(
    post,
    path = "/garage/{id}/services",
    tag = "garage",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Logged; redirected to the vehicle"),
        (status = 404, description = "Not found"),
    )
)]
#[tracing::instrument(skip_all, fields(vehicle_id = id))]
pub async fn add_service_log(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<VehicleId>,
    multipart: Multipart,
) -> Result<Redirect, Error> {
    let mut form = MultipartForm::from_multipart(multipart, None).await?;

    let receipt_path = match form.take_file("receipt") {
        Some(file) => Some(store_upload(&state, "receipts", "nf_", file).await?),
        None => None,
    };

    let request = ServiceLogCreateDBRequest {
        performed_on: form.parse("performed_on")?,
        odometer_km: form.parse("odometer_km")?,
        description: form.text("description")?,
        cost: form.parse_or("cost", 0.0)?,
        notes: form.text_opt("notes"),
        receipt_path,
        interval_km: form.parse_opt("interval_km")?,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Vehicles::new(&mut conn)
        .add_service_log(user.id, id, &request)
        .await?
        .ok_or_else(not_found)?;

    Ok(Redirect::to(&format!("/garage/{id}")))
}

/// Dispose of a vehicle (sold/donated/discarded); the row survives
#[utoipa::path(
    post,
    path = "/garage/{id}/dispose",
    tag = "garage",
    responses(
        (status = 303, description = "Disposed; redirected to the garage"),
        (status = 400, description = "Not a terminal status"),
        (status = 404, description = "Not found"),
    )
)]
#[tracing::instrument(skip_all, fields(vehicle_id = id))]
pub async fn dispose_vehicle(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<VehicleId>,
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
    Vehicles::new(&mut conn)
        .dispose(user.id, id, &request)
        .await?
        .ok_or_else(not_found)?;

    Ok(Redirect::to("/garage"))
}
