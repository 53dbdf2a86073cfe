//! Database repository for the garage domain.
//!
//! Vehicles are the root entity; maintenance logs and mileage alerts hang off
//! them and are only reachable through an ownership-checked root lookup.
//! Logging a service event is the interesting write: it inserts the log,
//! advances the odometer when the logged reading is higher, and supersedes
//! alerts of the same kind - all in one transaction.

use crate::{
    db::{
        errors::Result,
        handlers::repository::OwnedRepository,
        models::{
            garage::{
                AlertDBResponse, MaintenanceLogDBResponse, ServiceLogCreateDBRequest, VehicleCreateDBRequest, VehicleDBResponse,
                VehicleUpdateDBRequest,
            },
            DisposalRequest,
        },
    },
    types::{UserId, VehicleId},
};
use chrono::Utc;
use sqlx::{Connection, SqliteConnection};
use tracing::instrument;

pub struct Vehicles<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Vehicles<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Advance the odometer. A reading at or below the current value is a
    /// no-op reported as `None`, like a failed ownership check.
    #[instrument(skip(self), fields(vehicle_id = id), err)]
    pub async fn update_odometer(&mut self, owner: UserId, id: VehicleId, new_km: i64) -> Result<Option<VehicleDBResponse>> {
        let vehicle = sqlx::query_as::<_, VehicleDBResponse>(
            "UPDATE vehicles SET odometer_km = ? WHERE id = ? AND user_id = ? AND odometer_km < ? RETURNING *",
        )
        .bind(new_km)
        .bind(id)
        .bind(owner)
        .bind(new_km)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(vehicle)
    }

    /// Log a service event with its side effects.
    ///
    /// In one transaction: insert the maintenance log; advance the odometer
    /// if the logged reading exceeds it; when an interval is given,
    /// deactivate every active alert of the same kind and create exactly one
    /// new active alert at `logged_km + interval`.
    #[instrument(skip(self, request), fields(vehicle_id = id), err)]
    pub async fn add_service_log(
        &mut self,
        owner: UserId,
        id: VehicleId,
        request: &ServiceLogCreateDBRequest,
    ) -> Result<Option<MaintenanceLogDBResponse>> {
        let mut tx = self.db.begin().await?;

        let vehicle = sqlx::query_as::<_, VehicleDBResponse>("SELECT * FROM vehicles WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(vehicle) = vehicle else {
            return Ok(None);
        };

        let log = sqlx::query_as::<_, MaintenanceLogDBResponse>(
            r#"
            INSERT INTO maintenance_logs (vehicle_id, performed_on, odometer_km, description, cost, notes, receipt_path, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(vehicle.id)
        .bind(request.performed_on)
        .bind(request.odometer_km)
        .bind(&request.description)
        .bind(request.cost)
        .bind(&request.notes)
        .bind(&request.receipt_path)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        // Odometer only ever advances
        if request.odometer_km > vehicle.odometer_km {
            sqlx::query("UPDATE vehicles SET odometer_km = ? WHERE id = ?")
                .bind(request.odometer_km)
                .bind(vehicle.id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(interval) = request.interval_km {
            if interval > 0 {
                // Supersede: alerts of this kind that are still active go
                // inactive, then a single fresh one is planted.
                sqlx::query("UPDATE alerts SET active = 0 WHERE vehicle_id = ? AND kind = ? AND active = 1")
                    .bind(vehicle.id)
                    .bind(&request.description)
                    .execute(&mut *tx)
                    .await?;

                sqlx::query("INSERT INTO alerts (vehicle_id, kind, threshold_km, active) VALUES (?, ?, ?, 1)")
                    .bind(vehicle.id)
                    .bind(&request.description)
                    .bind(request.odometer_km + interval)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(log))
    }

    /// Maintenance history for an owned vehicle, newest first.
    #[instrument(skip(self), fields(vehicle_id = id), err)]
    pub async fn maintenance_logs(&mut self, owner: UserId, id: VehicleId) -> Result<Option<Vec<MaintenanceLogDBResponse>>> {
        if self.get(owner, id).await?.is_none() {
            return Ok(None);
        }

        let logs = sqlx::query_as::<_, MaintenanceLogDBResponse>(
            "SELECT * FROM maintenance_logs WHERE vehicle_id = ? ORDER BY performed_on DESC, id DESC",
        )
        .bind(id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(Some(logs))
    }

    /// Alerts for an owned vehicle, active ones first.
    #[instrument(skip(self), fields(vehicle_id = id), err)]
    pub async fn alerts(&mut self, owner: UserId, id: VehicleId) -> Result<Option<Vec<AlertDBResponse>>> {
        if self.get(owner, id).await?.is_none() {
            return Ok(None);
        }

        let alerts = sqlx::query_as::<_, AlertDBResponse>("SELECT * FROM alerts WHERE vehicle_id = ? ORDER BY active DESC, id")
            .bind(id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(Some(alerts))
    }
}

#[async_trait::async_trait]
impl<'c> OwnedRepository for Vehicles<'c> {
    type CreateRequest = VehicleCreateDBRequest;
    type UpdateRequest = VehicleUpdateDBRequest;
    type Response = VehicleDBResponse;
    type Id = VehicleId;

    #[instrument(skip(self, request), fields(plate = %request.plate), err)]
    async fn create(&mut self, owner: UserId, request: &Self::CreateRequest) -> Result<Self::Response> {
        let vehicle = sqlx::query_as::<_, VehicleDBResponse>(
            r#"
            INSERT INTO vehicles
                (user_id, name, make, model, year, plate, odometer_km, monthly_km_estimate, estimated_value, photo_path, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(&request.name)
        .bind(&request.make)
        .bind(&request.model)
        .bind(request.year)
        .bind(&request.plate)
        .bind(request.odometer_km)
        .bind(request.monthly_km_estimate)
        .bind(request.estimated_value)
        .bind(&request.photo_path)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(vehicle)
    }

    #[instrument(skip(self), fields(vehicle_id = id), err)]
    async fn get(&mut self, owner: UserId, id: Self::Id) -> Result<Option<Self::Response>> {
        let vehicle = sqlx::query_as::<_, VehicleDBResponse>("SELECT * FROM vehicles WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(vehicle)
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self, owner: UserId, include_all: bool) -> Result<Vec<Self::Response>> {
        let vehicles = if include_all {
            sqlx::query_as::<_, VehicleDBResponse>("SELECT * FROM vehicles WHERE user_id = ? ORDER BY id")
                .bind(owner)
                .fetch_all(&mut *self.db)
                .await?
        } else {
            sqlx::query_as::<_, VehicleDBResponse>("SELECT * FROM vehicles WHERE user_id = ? AND status = 'active' ORDER BY id")
                .bind(owner)
                .fetch_all(&mut *self.db)
                .await?
        };

        Ok(vehicles)
    }

    #[instrument(skip(self, request), fields(vehicle_id = id), err)]
    async fn update(&mut self, owner: UserId, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let vehicle = sqlx::query_as::<_, VehicleDBResponse>(
            r#"
            UPDATE vehicles SET
                name = ?,
                make = ?,
                model = ?,
                year = ?,
                plate = ?,
                odometer_km = ?,
                estimated_value = ?,
                photo_path = COALESCE(?, photo_path)
            WHERE id = ? AND user_id = ?
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&request.make)
        .bind(&request.model)
        .bind(request.year)
        .bind(&request.plate)
        .bind(request.odometer_km)
        .bind(request.estimated_value)
        .bind(&request.photo_path)
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(vehicle)
    }

    #[instrument(skip(self, request), fields(vehicle_id = id, status = ?request.status), err)]
    async fn dispose(&mut self, owner: UserId, id: Self::Id, request: &DisposalRequest) -> Result<Option<Self::Response>> {
        let vehicle = sqlx::query_as::<_, VehicleDBResponse>(
            r#"
            UPDATE vehicles SET
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

        Ok(vehicle)
    }
}
