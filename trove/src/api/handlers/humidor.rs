use axum::{
    extract::{Multipart, Path, Query, State},
    response::Redirect,
    Form, Json,
};

use crate::{
    api::{
        handlers::{forms::MultipartForm, store_upload},
        models::{
            humidor::{CatalogAddForm, CigarDetailResponse, CommunityResponse, HumidorIndexResponse},
            users::CurrentUser,
            DisposalForm, ListQuery,
        },
    },
    db::{
        handlers::{analytics, Cigars, OwnedRepository},
        models::{
            humidor::{CatalogOptions, CigarCreateDBRequest, CigarUpdateDBRequest, SmokingSessionCreateDBRequest},
            DisposalRequest,
        },
    },
    errors::Error,
    types::CigarId,
    AppState,
};
use chrono::Utc;

fn not_found() -> Error {
    Error::NotFound {
        resource: "Cigar".to_string(),
    }
}

/// List the caller's cigars with stats and autocomplete options
#[utoipa::path(
    get,
    path = "/humidor",
    tag = "humidor",
    params(ListQuery),
    responses(
        (status = 200, description = "Cigars, stats, and catalog options"),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_cigars(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<HumidorIndexResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Cigars::new(&mut conn);

    let cigars = repo.list(user.id, query.include_all).await?;
    let options = repo.catalog_options().await?;
    let stats = analytics::humidor_stats(&mut conn, user.id).await?;

    Ok(Json(HumidorIndexResponse { cigars, stats, options }))
}

fn cigar_create_request(form: &MultipartForm) -> Result<CigarCreateDBRequest, Error> {
    Ok(CigarCreateDBRequest {
        brand: form.text("brand")?,
        line: form.text("line")?,
        vitola: form.text_opt("vitola"),
        format: form.text_opt("format"),
        wrapper: form.text_opt("wrapper"),
        wrapper_color: form.text_opt("wrapper_color"),
        origin: form.text_opt("origin"),
        length_in: form.parse_opt("length_in")?,
        ring_gauge: form.parse_opt("ring_gauge")?,
        quantity: form.parse("quantity")?,
        price_paid: form.parse_or("price_paid", 0.0)?,
        purchase_date: form.parse_opt("purchase_date")?,
        notes: form.text_opt("notes"),
    })
}

/// Add a cigar to the humidor.
///
/// Photos are capped at the configured image size; the first one becomes the
/// `main` image, the rest land in the gallery.
#[utoipa::path(
    post,
    path = "/humidor",
    tag = "humidor",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Created; redirected to the humidor"),
        (status = 400, description = "Invalid input"),
        (status = 413, description = "A photo exceeds the size limit"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_cigar(State(state): State<AppState>, user: CurrentUser, multipart: Multipart) -> Result<Redirect, Error> {
    let mut form = MultipartForm::from_multipart(multipart, Some(state.config.uploads.max_image_bytes)).await?;

    let request = cigar_create_request(&form)?;
    let photos = form.take_files("photos");

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Cigars::new(&mut conn);
    let cigar = repo.create(user.id, &request).await?;

    for (index, photo) in photos.into_iter().enumerate() {
        let kind = if index == 0 { "main" } else { "gallery" };
        let path = store_upload(&state, "cigars", &format!("cigar_{}_", cigar.id), photo).await?;
        repo.add_cigar_image(user.id, cigar.id, &path, kind).await?;
    }

    Ok(Redirect::to("/humidor"))
}

/// Cigar detail with smoking history and images
#[utoipa::path(
    get,
    path = "/humidor/{id}",
    tag = "humidor",
    responses(
        (status = 200, description = "Cigar detail"),
        (status = 404, description = "Not found"),
    )
)]
#[tracing::instrument(skip_all, fields(cigar_id = id))]
pub async fn get_cigar(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CigarId>,
) -> Result<Json<CigarDetailResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Cigars::new(&mut conn);

    let cigar = repo.get(user.id, id).await?.ok_or_else(not_found)?;
    let sessions = repo.smoking_sessions(user.id, id).await?.ok_or_else(not_found)?;
    let images = repo.images(user.id, id).await?.ok_or_else(not_found)?;

    Ok(Json(CigarDetailResponse { cigar, sessions, images }))
}

/// Update a cigar; new photos append to the gallery
#[utoipa::path(
    post,
    path = "/humidor/{id}",
    tag = "humidor",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Updated; redirected to the cigar"),
        (status = 404, description = "Not found"),
        (status = 413, description = "A photo exceeds the size limit"),
    )
)]
#[tracing::instrument(skip_all, fields(cigar_id = id))]
pub async fn update_cigar(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CigarId>,
    multipart: Multipart,
) -> Result<Redirect, Error> {
    let mut form = MultipartForm::from_multipart(multipart, Some(state.config.uploads.max_image_bytes)).await?;

    let create = cigar_create_request(&form)?;
    let request = CigarUpdateDBRequest {
        brand: create.brand,
        line: create.line,
        vitola: create.vitola,
        format: create.format,
        wrapper: create.wrapper,
        wrapper_color: create.wrapper_color,
        origin: create.origin,
        length_in: create.length_in,
        ring_gauge: create.ring_gauge,
        quantity: create.quantity,
        price_paid: create.price_paid,
        notes: create.notes,
    };
    let photos = form.take_files("photos");

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Cigars::new(&mut conn);
    repo.update(user.id, id, &request).await?.ok_or_else(not_found)?;

    for photo in photos {
        let path = store_upload(&state, "cigars", &format!("cigar_{id}_"), photo).await?;
        repo.add_cigar_image(user.id, id, &path, "gallery").await?;
    }

    Ok(Redirect::to(&format!("/humidor/{id}")))
}

/// Log a smoking session; consumes one stick
///
/// Session photos are not size-capped. Known inconsistency with the cigar
/// photo paths, kept as-is pending a product decision.
#[utoipa::path(
    post,
    path = "/humidor/{id}/sessions",
    tag = "humidor",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Logged; redirected to the cigar"),
        (status = 404, description = "Not found"),
    )
)]
#[tracing::instrument(skip_all, fields(cigar_id = id))]
pub async fn add_smoking_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CigarId>,
    multipart: Multipart,
) -> Result<Redirect, Error> {
    let mut form = MultipartForm::from_multipart(multipart, None).await?;

    let request = SmokingSessionCreateDBRequest {
        smoked_on: form.parse("smoked_on")?,
        duration_minutes: form.parse_opt("duration_minutes")?,
        pairing: form.text_opt("pairing"),
        rating_construction: form.parse_opt("rating_construction")?,
        rating_draw: form.parse_opt("rating_draw")?,
        rating_flavor: form.parse_opt("rating_flavor")?,
        rating_overall: form.parse("rating_overall")?,
        strength_profile: form.text_opt("strength_profile"),
        tasting_notes: form.text_opt("tasting_notes"),
    };
    let photos = form.take_files("photos");

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Cigars::new(&mut conn);

    let session = repo.add_smoking_session(user.id, id, &request).await?.ok_or_else(not_found)?;

    for photo in photos {
        let path = store_upload(&state, "sessions", &format!("session_{}_", session.id), photo).await?;
        repo.add_session_image(user.id, session.id, &path).await?;
    }

    Ok(Redirect::to(&format!("/humidor/{id}")))
}

/// Dispose of a cigar entry (sold/donated/discarded); the row survives
#[utoipa::path(
    post,
    path = "/humidor/{id}/dispose",
    tag = "humidor",
    responses(
        (status = 303, description = "Disposed; redirected to the humidor"),
        (status = 400, description = "Not a terminal status"),
        (status = 404, description = "Not found"),
    )
)]
#[tracing::instrument(skip_all, fields(cigar_id = id))]
pub async fn dispose_cigar(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<CigarId>,
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
    Cigars::new(&mut conn)
        .dispose(user.id, id, &request)
        .await?
        .ok_or_else(not_found)?;

    Ok(Redirect::to("/humidor"))
}

/// The community catalog: what everyone stocks, most popular first
#[utoipa::path(
    get,
    path = "/humidor/community",
    tag = "humidor",
    responses(
        (status = 200, description = "Community catalog"),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn community_catalog(State(state): State<AppState>, _user: CurrentUser) -> Result<Json<CommunityResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let cigars = Cigars::new(&mut conn).community_catalog().await?;

    Ok(Json(CommunityResponse { cigars }))
}

/// Copy a community entry into the caller's humidor with zero stock
#[utoipa::path(
    post,
    path = "/humidor/community/add",
    tag = "humidor",
    responses(
        (status = 303, description = "Copied; redirected to the humidor"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn add_from_catalog(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CatalogAddForm>,
) -> Result<Redirect, Error> {
    let request = CigarCreateDBRequest {
        brand: form.brand,
        line: form.line,
        vitola: form.vitola.filter(|v| !v.is_empty()),
        format: form.format.filter(|v| !v.is_empty()),
        wrapper: form.wrapper.filter(|v| !v.is_empty()),
        wrapper_color: form.wrapper_color.filter(|v| !v.is_empty()),
        origin: form.origin.filter(|v| !v.is_empty()),
        length_in: form.length_in,
        ring_gauge: form.ring_gauge,
        quantity: 0,
        price_paid: 0.0,
        purchase_date: Some(Utc::now().date_naive()),
        notes: None,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Cigars::new(&mut conn).create(user.id, &request).await?;

    Ok(Redirect::to("/humidor"))
}

/// Distinct attribute values across the catalog, for autocomplete
#[utoipa::path(
    get,
    path = "/humidor/options",
    tag = "humidor",
    responses(
        (status = 200, description = "Catalog options"),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn catalog_options(State(state): State<AppState>, _user: CurrentUser) -> Result<Json<CatalogOptions>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let options = Cigars::new(&mut conn).catalog_options().await?;

    Ok(Json(options))
}
