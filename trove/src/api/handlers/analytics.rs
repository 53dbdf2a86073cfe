use axum::{extract::State, Json};

use crate::{
    api::models::{analytics::AnalyticsSummary, users::CurrentUser},
    db::handlers::analytics,
    errors::Error,
    AppState,
};

/// Cross-domain dashboard: the caller's combined asset picture
#[utoipa::path(
    get,
    path = "/analytics",
    tag = "analytics",
    responses(
        (status = 200, description = "Aggregated stats", body = AnalyticsSummary),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn dashboard(State(state): State<AppState>, user: CurrentUser) -> Result<Json<AnalyticsSummary>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let summary = analytics::aggregated(&mut conn, user.id).await?;

    Ok(Json(summary))
}
