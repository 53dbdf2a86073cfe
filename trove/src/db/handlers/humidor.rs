//! Database repository for the humidor domain.
//!
//! Cigars are inventory rather than durable assets: each smoking session
//! consumes one stick, and a cigar whose quantity reaches zero flips to the
//! `empty` status on its own. The community catalog is the one deliberately
//! cross-user query in the system - a read-only grouping of what everyone
//! stocks, used to seed new humidor entries.

use crate::{
    db::{
        errors::Result,
        handlers::repository::OwnedRepository,
        models::{
            humidor::{
                CatalogEntry, CatalogOptions, CigarCreateDBRequest, CigarDBResponse, CigarImageDBResponse, CigarUpdateDBRequest,
                SessionImageDBResponse, SmokingSessionCreateDBRequest, SmokingSessionDBResponse,
            },
            DisposalRequest,
        },
    },
    types::{CigarId, SmokingSessionId, UserId},
};
use chrono::Utc;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::{Connection, SqliteConnection};
use tracing::instrument;

/// Cache for the community catalog (60 second TTL).
///
/// The catalog spans every user's humidor, so it is the one query here whose
/// cost grows with the whole table; a short TTL keeps it off the hot path.
static CATALOG_CACHE: Lazy<Cache<&'static str, Vec<CatalogEntry>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(std::time::Duration::from_secs(60))
        .build()
});

pub struct Cigars<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Cigars<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Log a smoking session against an owned cigar.
    ///
    /// In one transaction: insert the session, then decrement the quantity by
    /// one - never below zero - and flip the status to `empty` exactly when
    /// the quantity lands on zero.
    #[instrument(skip(self, request), fields(cigar_id = id), err)]
    pub async fn add_smoking_session(
        &mut self,
        owner: UserId,
        id: CigarId,
        request: &SmokingSessionCreateDBRequest,
    ) -> Result<Option<SmokingSessionDBResponse>> {
        let mut tx = self.db.begin().await?;

        let cigar = sqlx::query_as::<_, CigarDBResponse>("SELECT * FROM cigars WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(cigar) = cigar else {
            return Ok(None);
        };

        let session = sqlx::query_as::<_, SmokingSessionDBResponse>(
            r#"
            INSERT INTO smoking_sessions
                (cigar_id, smoked_on, duration_minutes, pairing, rating_construction, rating_draw, rating_flavor,
                 rating_overall, strength_profile, tasting_notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.smoked_on)
        .bind(request.duration_minutes)
        .bind(&request.pairing)
        .bind(request.rating_construction)
        .bind(request.rating_draw)
        .bind(request.rating_flavor)
        .bind(request.rating_overall)
        .bind(&request.strength_profile)
        .bind(&request.tasting_notes)
        .fetch_one(&mut *tx)
        .await?;

        if cigar.quantity > 0 {
            let new_quantity = cigar.quantity - 1;
            if new_quantity == 0 {
                sqlx::query("UPDATE cigars SET quantity = 0, status = 'empty' WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            } else {
                sqlx::query("UPDATE cigars SET quantity = ? WHERE id = ?")
                    .bind(new_quantity)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(session))
    }

    /// Attach an image record to an owned cigar. Image rows are append-only.
    #[instrument(skip(self, path), fields(cigar_id = id), err)]
    pub async fn add_cigar_image(&mut self, owner: UserId, id: CigarId, path: &str, kind: &str) -> Result<Option<CigarImageDBResponse>> {
        if self.get(owner, id).await?.is_none() {
            return Ok(None);
        }

        let image = sqlx::query_as::<_, CigarImageDBResponse>("INSERT INTO cigar_images (cigar_id, path, kind) VALUES (?, ?, ?) RETURNING *")
            .bind(id)
            .bind(path)
            .bind(kind)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(Some(image))
    }

    /// Attach an image record to a smoking session, ownership-checked through
    /// the session's cigar.
    #[instrument(skip(self, path), fields(session_id = id), err)]
    pub async fn add_session_image(&mut self, owner: UserId, id: SmokingSessionId, path: &str) -> Result<Option<SessionImageDBResponse>> {
        let owned: Option<i64> = sqlx::query_scalar(
            "SELECT s.id FROM smoking_sessions s JOIN cigars c ON s.cigar_id = c.id WHERE s.id = ? AND c.user_id = ?",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *self.db)
        .await?;

        if owned.is_none() {
            return Ok(None);
        }

        let image = sqlx::query_as::<_, SessionImageDBResponse>("INSERT INTO session_images (session_id, path) VALUES (?, ?) RETURNING *")
            .bind(id)
            .bind(path)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(Some(image))
    }

    /// Smoking history for an owned cigar, newest first.
    #[instrument(skip(self), fields(cigar_id = id), err)]
    pub async fn smoking_sessions(&mut self, owner: UserId, id: CigarId) -> Result<Option<Vec<SmokingSessionDBResponse>>> {
        if self.get(owner, id).await?.is_none() {
            return Ok(None);
        }

        let sessions = sqlx::query_as::<_, SmokingSessionDBResponse>(
            "SELECT * FROM smoking_sessions WHERE cigar_id = ? ORDER BY smoked_on DESC, id DESC",
        )
        .bind(id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(Some(sessions))
    }

    /// Image records for an owned cigar.
    #[instrument(skip(self), fields(cigar_id = id), err)]
    pub async fn images(&mut self, owner: UserId, id: CigarId) -> Result<Option<Vec<CigarImageDBResponse>>> {
        if self.get(owner, id).await?.is_none() {
            return Ok(None);
        }

        let images = sqlx::query_as::<_, CigarImageDBResponse>("SELECT * FROM cigar_images WHERE cigar_id = ? ORDER BY id")
            .bind(id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(Some(images))
    }

    /// The community catalog: distinct (brand, line, vitola) triples across
    /// every user, most-stocked first. Served from a short-lived cache.
    pub async fn community_catalog(&mut self) -> Result<Vec<CatalogEntry>> {
        if let Some(entries) = CATALOG_CACHE.get(&"community").await {
            return Ok(entries);
        }

        let entries = self.query_community_catalog().await?;
        CATALOG_CACHE.insert("community", entries.clone()).await;
        Ok(entries)
    }

    /// Ties on popularity come back in whatever order SQLite produces -
    /// undefined, and callers must not rely on it.
    #[instrument(skip(self), err)]
    async fn query_community_catalog(&mut self) -> Result<Vec<CatalogEntry>> {
        let entries = sqlx::query_as::<_, CatalogEntry>(
            r#"
            SELECT brand, line, vitola, format, wrapper, wrapper_color, origin,
                   AVG(length_in) AS length_in,
                   AVG(ring_gauge) AS ring_gauge,
                   COUNT(*) AS popularity
            FROM cigars
            GROUP BY brand, line, vitola
            ORDER BY popularity DESC
            "#,
        )
        .fetch_all(&mut *self.db)
        .await?;

        Ok(entries)
    }

    /// Distinct attribute values across all cigars, for form autocomplete.
    #[instrument(skip(self), err)]
    pub async fn catalog_options(&mut self) -> Result<CatalogOptions> {
        let mut options = CatalogOptions::default();

        for (column, target) in [
            ("brand", 0usize),
            ("line", 1),
            ("vitola", 2),
            ("origin", 3),
            ("wrapper", 4),
        ] {
            let values: Vec<String> = sqlx::query_scalar(&format!(
                "SELECT DISTINCT {column} FROM cigars WHERE {column} IS NOT NULL AND {column} != '' ORDER BY {column}"
            ))
            .fetch_all(&mut *self.db)
            .await?;

            match target {
                0 => options.brands = values,
                1 => options.lines = values,
                2 => options.vitolas = values,
                3 => options.origins = values,
                _ => options.wrappers = values,
            }
        }

        Ok(options)
    }
}

#[async_trait::async_trait]
impl<'c> OwnedRepository for Cigars<'c> {
    type CreateRequest = CigarCreateDBRequest;
    type UpdateRequest = CigarUpdateDBRequest;
    type Response = CigarDBResponse;
    type Id = CigarId;

    #[instrument(skip(self, request), fields(brand = %request.brand), err)]
    async fn create(&mut self, owner: UserId, request: &Self::CreateRequest) -> Result<Self::Response> {
        // A freshly purchased box starts aging the day it was bought
        let cigar = sqlx::query_as::<_, CigarDBResponse>(
            r#"
            INSERT INTO cigars
                (user_id, brand, line, vitola, format, wrapper, wrapper_color, origin, length_in, ring_gauge,
                 quantity, price_paid, purchase_date, aging_since, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(&request.brand)
        .bind(&request.line)
        .bind(&request.vitola)
        .bind(&request.format)
        .bind(&request.wrapper)
        .bind(&request.wrapper_color)
        .bind(&request.origin)
        .bind(request.length_in)
        .bind(request.ring_gauge)
        .bind(request.quantity)
        .bind(request.price_paid)
        .bind(request.purchase_date)
        .bind(request.purchase_date)
        .bind(&request.notes)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(cigar)
    }

    #[instrument(skip(self), fields(cigar_id = id), err)]
    async fn get(&mut self, owner: UserId, id: Self::Id) -> Result<Option<Self::Response>> {
        let cigar = sqlx::query_as::<_, CigarDBResponse>("SELECT * FROM cigars WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(cigar)
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self, owner: UserId, include_all: bool) -> Result<Vec<Self::Response>> {
        let cigars = if include_all {
            sqlx::query_as::<_, CigarDBResponse>("SELECT * FROM cigars WHERE user_id = ? ORDER BY id")
                .bind(owner)
                .fetch_all(&mut *self.db)
                .await?
        } else {
            sqlx::query_as::<_, CigarDBResponse>("SELECT * FROM cigars WHERE user_id = ? AND status = 'active' ORDER BY id")
                .bind(owner)
                .fetch_all(&mut *self.db)
                .await?
        };

        Ok(cigars)
    }

    #[instrument(skip(self, request), fields(cigar_id = id), err)]
    async fn update(&mut self, owner: UserId, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let cigar = sqlx::query_as::<_, CigarDBResponse>(
            r#"
            UPDATE cigars SET
                brand = ?,
                line = ?,
                vitola = ?,
                format = ?,
                wrapper = ?,
                wrapper_color = ?,
                origin = ?,
                length_in = ?,
                ring_gauge = ?,
                quantity = ?,
                price_paid = ?,
                notes = ?
            WHERE id = ? AND user_id = ?
            RETURNING *
            "#,
        )
        .bind(&request.brand)
        .bind(&request.line)
        .bind(&request.vitola)
        .bind(&request.format)
        .bind(&request.wrapper)
        .bind(&request.wrapper_color)
        .bind(&request.origin)
        .bind(request.length_in)
        .bind(request.ring_gauge)
        .bind(request.quantity)
        .bind(request.price_paid)
        .bind(&request.notes)
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(cigar)
    }

    #[instrument(skip(self, request), fields(cigar_id = id, status = ?request.status), err)]
    async fn dispose(&mut self, owner: UserId, id: Self::Id, request: &DisposalRequest) -> Result<Option<Self::Response>> {
        let cigar = sqlx::query_as::<_, CigarDBResponse>(
            r#"
            UPDATE cigars SET
                status = ?,
                disposed_on = ?,
                sale_value = COALESCE(?, sale_value)
            WHERE id = ? AND user_id = ?
            RETURNING *
            "#,
        )
        .bind(request.status)
        .bind(request.disposed_on)
        .bind(request.sale_value)
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(cigar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Users;
    use crate::db::models::users::UserCreateDBRequest;
    use crate::db::models::AssetStatus;
    use chrono::NaiveDate;
    use sqlx::SqlitePool;

    async fn create_user(conn: &mut SqliteConnection, email: &str) -> UserId {
        let mut users = Users::new(conn);
        users
            .create(&UserCreateDBRequest {
                email: email.to_string(),
                display_name: None,
                auth_source: "native".to_string(),
                password_hash: None,
            })
            .await
            .unwrap()
            .id
    }

    fn cigar_request(brand: &str, quantity: i64) -> CigarCreateDBRequest {
        CigarCreateDBRequest {
            brand: brand.to_string(),
            line: "Serie D".to_string(),
            vitola: Some("Robusto".to_string()),
            quantity,
            price_paid: 12.5,
            purchase_date: NaiveDate::from_ymd_opt(2026, 1, 10),
            ..Default::default()
        }
    }

    fn session_request() -> SmokingSessionCreateDBRequest {
        SmokingSessionCreateDBRequest {
            smoked_on: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            rating_overall: 88,
            ..Default::default()
        }
    }

    #[sqlx::test]
    async fn test_session_decrements_to_empty(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_user(&mut conn, "smoker@example.com").await;
        let mut repo = Cigars::new(&mut conn);

        let cigar = repo.create(user, &cigar_request("Partagas", 2)).await.unwrap();
        assert_eq!(cigar.aging_since, cigar.purchase_date);

        repo.add_smoking_session(user, cigar.id, &session_request()).await.unwrap().unwrap();
        let cigar = repo.get(user, cigar.id).await.unwrap().unwrap();
        assert_eq!(cigar.quantity, 1);
        assert_eq!(cigar.status, AssetStatus::Active);

        repo.add_smoking_session(user, cigar.id, &session_request()).await.unwrap().unwrap();
        let cigar = repo.get(user, cigar.id).await.unwrap().unwrap();
        assert_eq!(cigar.quantity, 0);
        assert_eq!(cigar.status, AssetStatus::Empty);

        // Logging past zero records the session but never goes negative
        repo.add_smoking_session(user, cigar.id, &session_request()).await.unwrap().unwrap();
        let cigar = repo.get(user, cigar.id).await.unwrap().unwrap();
        assert_eq!(cigar.quantity, 0);
        assert_eq!(cigar.status, AssetStatus::Empty);

        let sessions = repo.smoking_sessions(user, cigar.id).await.unwrap().unwrap();
        assert_eq!(sessions.len(), 3);
    }

    #[sqlx::test]
    async fn test_empty_excluded_from_default_list(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_user(&mut conn, "inventory@example.com").await;
        let mut repo = Cigars::new(&mut conn);

        let single = repo.create(user, &cigar_request("Oliva", 1)).await.unwrap();
        repo.create(user, &cigar_request("Padron", 5)).await.unwrap();

        repo.add_smoking_session(user, single.id, &session_request()).await.unwrap().unwrap();

        let active = repo.list(user, false).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].brand, "Padron");

        let all = repo.list(user, true).await.unwrap();
        assert_eq!(all.len(), 2);

        // Restocking overwrites the quantity; the status transition stays
        // one-way (empty cigars are edited back in via a fresh entry)
        let update = CigarUpdateDBRequest {
            brand: "Oliva".to_string(),
            line: "Serie D".to_string(),
            vitola: Some("Robusto".to_string()),
            quantity: 10,
            price_paid: 12.5,
            ..Default::default()
        };
        let restocked = repo.update(user, single.id, &update).await.unwrap().unwrap();
        assert_eq!(restocked.quantity, 10);
        assert_eq!(restocked.status, AssetStatus::Empty);
    }

    #[sqlx::test]
    async fn test_images_are_ownership_checked(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let alice = create_user(&mut conn, "alice@example.com").await;
        let bob = create_user(&mut conn, "bob@example.com").await;
        let mut repo = Cigars::new(&mut conn);

        let cigar = repo.create(alice, &cigar_request("Cohiba", 3)).await.unwrap();
        let session = repo.add_smoking_session(alice, cigar.id, &session_request()).await.unwrap().unwrap();

        assert!(repo.add_cigar_image(bob, cigar.id, "cigars/x.jpg", "main").await.unwrap().is_none());
        assert!(repo.add_session_image(bob, session.id, "sessions/x.jpg").await.unwrap().is_none());

        let image = repo.add_cigar_image(alice, cigar.id, "cigars/x.jpg", "main").await.unwrap().unwrap();
        assert_eq!(image.kind, "main");
        repo.add_session_image(alice, session.id, "sessions/x.jpg").await.unwrap().unwrap();

        let images = repo.images(alice, cigar.id).await.unwrap().unwrap();
        assert_eq!(images.len(), 1);
    }

    #[sqlx::test]
    async fn test_community_catalog_spans_users(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let alice = create_user(&mut conn, "alice@example.com").await;
        let bob = create_user(&mut conn, "bob@example.com").await;
        let mut repo = Cigars::new(&mut conn);

        repo.create(alice, &cigar_request("Partagas", 5)).await.unwrap();
        repo.create(bob, &cigar_request("Partagas", 2)).await.unwrap();
        repo.create(bob, &cigar_request("Padron", 1)).await.unwrap();

        let catalog = repo.query_community_catalog().await.unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].brand, "Partagas");
        assert_eq!(catalog[0].popularity, 2);
        assert_eq!(catalog[1].brand, "Padron");
        assert_eq!(catalog[1].popularity, 1);

        let options = repo.catalog_options().await.unwrap();
        assert_eq!(options.brands, vec!["Padron".to_string(), "Partagas".to_string()]);
        assert_eq!(options.vitolas, vec!["Robusto".to_string()]);
    }
}
