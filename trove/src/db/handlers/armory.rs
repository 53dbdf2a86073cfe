//! Database repository for the armory domain.

use crate::{
    db::{
        errors::Result,
        handlers::repository::OwnedRepository,
        models::{
            armory::{
                AccessoryCreateDBRequest, AccessoryDBResponse, GunCreateDBRequest, GunDBResponse, GunUpdateDBRequest,
                RangeSessionCreateDBRequest, RangeSessionDBResponse,
            },
            DisposalRequest,
        },
    },
    types::{GunId, UserId},
};
use chrono::Utc;
use sqlx::{Connection, SqliteConnection};
use tracing::instrument;

pub struct Guns<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Guns<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Attach an accessory to an owned gun.
    #[instrument(skip(self, request), fields(gun_id = id), err)]
    pub async fn add_accessory(&mut self, owner: UserId, id: GunId, request: &AccessoryCreateDBRequest) -> Result<Option<AccessoryDBResponse>> {
        if self.get(owner, id).await?.is_none() {
            return Ok(None);
        }

        let accessory = sqlx::query_as::<_, AccessoryDBResponse>(
            "INSERT INTO accessories (gun_id, kind, brand, model, cost) VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(id)
        .bind(&request.kind)
        .bind(&request.brand)
        .bind(&request.model)
        .bind(request.cost)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(Some(accessory))
    }

    /// Log a range session; the gun's cumulative round count is advanced by
    /// `rounds_fired` in the same transaction, unconditionally.
    #[instrument(skip(self, request), fields(gun_id = id), err)]
    pub async fn add_range_session(
        &mut self,
        owner: UserId,
        id: GunId,
        request: &RangeSessionCreateDBRequest,
    ) -> Result<Option<RangeSessionDBResponse>> {
        let mut tx = self.db.begin().await?;

        let gun = sqlx::query_as::<_, GunDBResponse>("SELECT * FROM guns WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *tx)
            .await?;

        if gun.is_none() {
            return Ok(None);
        }

        let session = sqlx::query_as::<_, RangeSessionDBResponse>(
            r#"
            INSERT INTO range_sessions (gun_id, fired_on, location, rounds_fired, ammo_brand, ammo_grain, failure_count, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.fired_on)
        .bind(&request.location)
        .bind(request.rounds_fired)
        .bind(&request.ammo_brand)
        .bind(request.ammo_grain)
        .bind(request.failure_count)
        .bind(&request.notes)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE guns SET total_rounds = total_rounds + ? WHERE id = ?")
            .bind(request.rounds_fired)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(session))
    }

    /// Accessories for an owned gun.
    #[instrument(skip(self), fields(gun_id = id), err)]
    pub async fn accessories(&mut self, owner: UserId, id: GunId) -> Result<Option<Vec<AccessoryDBResponse>>> {
        if self.get(owner, id).await?.is_none() {
            return Ok(None);
        }

        let accessories = sqlx::query_as::<_, AccessoryDBResponse>("SELECT * FROM accessories WHERE gun_id = ? ORDER BY id")
            .bind(id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(Some(accessories))
    }

    /// Range history for an owned gun, newest first.
    #[instrument(skip(self), fields(gun_id = id), err)]
    pub async fn range_sessions(&mut self, owner: UserId, id: GunId) -> Result<Option<Vec<RangeSessionDBResponse>>> {
        if self.get(owner, id).await?.is_none() {
            return Ok(None);
        }

        let sessions =
            sqlx::query_as::<_, RangeSessionDBResponse>("SELECT * FROM range_sessions WHERE gun_id = ? ORDER BY fired_on DESC, id DESC")
                .bind(id)
                .fetch_all(&mut *self.db)
                .await?;

        Ok(Some(sessions))
    }
}

#[async_trait::async_trait]
impl<'c> OwnedRepository for Guns<'c> {
    type CreateRequest = GunCreateDBRequest;
    type UpdateRequest = GunUpdateDBRequest;
    type Response = GunDBResponse;
    type Id = GunId;

    #[instrument(skip(self, request), fields(nickname = %request.nickname), err)]
    async fn create(&mut self, owner: UserId, request: &Self::CreateRequest) -> Result<Self::Response> {
        let gun = sqlx::query_as::<_, GunDBResponse>(
            r#"
            INSERT INTO guns (user_id, nickname, make, model, caliber, total_rounds, base_price, photo_path, invoice_path, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(&request.nickname)
        .bind(&request.make)
        .bind(&request.model)
        .bind(&request.caliber)
        .bind(request.total_rounds)
        .bind(request.base_price)
        .bind(&request.photo_path)
        .bind(&request.invoice_path)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(gun)
    }

    #[instrument(skip(self), fields(gun_id = id), err)]
    async fn get(&mut self, owner: UserId, id: Self::Id) -> Result<Option<Self::Response>> {
        let gun = sqlx::query_as::<_, GunDBResponse>("SELECT * FROM guns WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(gun)
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self, owner: UserId, include_all: bool) -> Result<Vec<Self::Response>> {
        let guns = if include_all {
            sqlx::query_as::<_, GunDBResponse>("SELECT * FROM guns WHERE user_id = ? ORDER BY id")
                .bind(owner)
                .fetch_all(&mut *self.db)
                .await?
        } else {
            sqlx::query_as::<_, GunDBResponse>("SELECT * FROM guns WHERE user_id = ? AND status = 'active' ORDER BY id")
                .bind(owner)
                .fetch_all(&mut *self.db)
                .await?
        };

        Ok(guns)
    }

    #[instrument(skip(self, request), fields(gun_id = id), err)]
    async fn update(&mut self, owner: UserId, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let gun = sqlx::query_as::<_, GunDBResponse>(
            r#"
            UPDATE guns SET
                nickname = ?,
                make = ?,
                model = ?,
                caliber = ?,
                base_price = ?,
                photo_path = COALESCE(?, photo_path),
                invoice_path = COALESCE(?, invoice_path)
            WHERE id = ? AND user_id = ?
            RETURNING *
            "#,
        )
        .bind(&request.nickname)
        .bind(&request.make)
        .bind(&request.model)
        .bind(&request.caliber)
        .bind(request.base_price)
        .bind(&request.photo_path)
        .bind(&request.invoice_path)
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(gun)
    }

    #[instrument(skip(self, request), fields(gun_id = id, status = ?request.status), err)]
    async fn dispose(&mut self, owner: UserId, id: Self::Id, request: &DisposalRequest) -> Result<Option<Self::Response>> {
        let gun = sqlx::query_as::<_, GunDBResponse>(
            r#"
            UPDATE guns SET
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

        Ok(gun)
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

    fn gun_request(nickname: &str) -> GunCreateDBRequest {
        GunCreateDBRequest {
            nickname: nickname.to_string(),
            make: "Glock".to_string(),
            model: "19".to_string(),
            caliber: "9mm".to_string(),
            base_price: 600.0,
            total_rounds: 250,
            photo_path: None,
            invoice_path: None,
        }
    }

    fn session_request(rounds_fired: i64) -> RangeSessionCreateDBRequest {
        RangeSessionCreateDBRequest {
            fired_on: NaiveDate::from_ymd_opt(2026, 4, 12).unwrap(),
            location: "Indoor Range".to_string(),
            rounds_fired,
            ammo_brand: "CCI".to_string(),
            ammo_grain: 115,
            failure_count: 0,
            notes: None,
        }
    }

    #[sqlx::test]
    async fn test_range_session_increments_rounds(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_user(&mut conn, "shooter@example.com").await;
        let mut repo = Guns::new(&mut conn);

        let gun = repo.create(user, &gun_request("Carry")).await.unwrap();
        assert_eq!(gun.total_rounds, 250);

        repo.add_range_session(user, gun.id, &session_request(150)).await.unwrap().unwrap();
        repo.add_range_session(user, gun.id, &session_request(50)).await.unwrap().unwrap();

        let gun = repo.get(user, gun.id).await.unwrap().unwrap();
        assert_eq!(gun.total_rounds, 450);

        let sessions = repo.range_sessions(user, gun.id).await.unwrap().unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[sqlx::test]
    async fn test_child_routes_respect_ownership(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let alice = create_user(&mut conn, "alice@example.com").await;
        let bob = create_user(&mut conn, "bob@example.com").await;
        let mut repo = Guns::new(&mut conn);

        let gun = repo.create(alice, &gun_request("Alice's")).await.unwrap();

        assert!(repo.add_range_session(bob, gun.id, &session_request(100)).await.unwrap().is_none());
        assert!(repo
            .add_accessory(
                bob,
                gun.id,
                &AccessoryCreateDBRequest {
                    kind: "Optic".to_string(),
                    brand: "Trijicon".to_string(),
                    model: "RMR".to_string(),
                    cost: 450.0,
                },
            )
            .await
            .unwrap()
            .is_none());
        assert!(repo.range_sessions(bob, gun.id).await.unwrap().is_none());
        assert!(repo.accessories(bob, gun.id).await.unwrap().is_none());

        // Round count untouched by the rejected session
        let gun = repo.get(alice, gun.id).await.unwrap().unwrap();
        assert_eq!(gun.total_rounds, 250);
    }

    #[sqlx::test]
    async fn test_dispose_excludes_from_default_list(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_user(&mut conn, "seller@example.com").await;
        let mut repo = Guns::new(&mut conn);

        let gun = repo.create(user, &gun_request("Trade-in")).await.unwrap();
        let disposal = DisposalRequest {
            status: AssetStatus::Donated,
            disposed_on: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            sale_value: None,
        };
        let disposed = repo.dispose(user, gun.id, &disposal).await.unwrap().unwrap();
        assert_eq!(disposed.status, AssetStatus::Donated);
        assert_eq!(disposed.sale_value, None);

        assert!(repo.list(user, false).await.unwrap().is_empty());
        assert_eq!(repo.list(user, true).await.unwrap().len(), 1);
    }
}
