//! Read-only per-user aggregate queries.
//!
//! Nothing in here writes. Every query is scoped to a single user; no
//! aggregate spans owners. The per-domain stats back the domain dashboards,
//! and [`aggregated`] combines them for the analytics view.

use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

use crate::{
    api::models::analytics::{AnalyticsSummary, ArmoryStats, GarageStats, HumidorStats},
    db::errors::Result,
    types::UserId,
};

#[derive(FromRow)]
struct GarageAggregateRow {
    fleet_value: f64,
    total_mileage: i64,
    vehicle_count: i64,
}

#[derive(FromRow)]
struct ArmoryAggregateRow {
    base_value: f64,
    total_rounds: i64,
    gun_count: i64,
}

#[derive(FromRow)]
struct HumidorAggregateRow {
    total_value: f64,
    total_sticks: i64,
    cigar_count: i64,
}

/// Garage dashboard figures: active fleet value, mileage and count, plus the
/// lifetime maintenance spend across all of the user's vehicles.
#[instrument(skip(db), err)]
pub async fn garage_stats(db: &mut SqliteConnection, user_id: UserId) -> Result<GarageStats> {
    let row = sqlx::query_as::<_, GarageAggregateRow>(
        r#"
        SELECT COALESCE(SUM(estimated_value), 0.0) AS fleet_value,
               COALESCE(SUM(odometer_km), 0) AS total_mileage,
               COUNT(*) AS vehicle_count
        FROM vehicles
        WHERE user_id = ? AND status = 'active'
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *db)
    .await?;

    let maintenance_cost: f64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(m.cost), 0.0)
        FROM maintenance_logs m
        JOIN vehicles v ON m.vehicle_id = v.id
        WHERE v.user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *db)
    .await?;

    Ok(GarageStats {
        fleet_value: row.fleet_value,
        total_mileage: row.total_mileage,
        maintenance_cost,
        vehicle_count: row.vehicle_count,
    })
}

/// Armory dashboard figures. Valuation counts base prices plus accessory
/// costs for the active guns.
#[instrument(skip(db), err)]
pub async fn armory_stats(db: &mut SqliteConnection, user_id: UserId) -> Result<ArmoryStats> {
    let row = sqlx::query_as::<_, ArmoryAggregateRow>(
        r#"
        SELECT COALESCE(SUM(base_price), 0.0) AS base_value,
               COALESCE(SUM(total_rounds), 0) AS total_rounds,
               COUNT(*) AS gun_count
        FROM guns
        WHERE user_id = ? AND status = 'active'
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *db)
    .await?;

    let accessory_value: f64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(a.cost), 0.0)
        FROM accessories a
        JOIN guns g ON a.gun_id = g.id
        WHERE g.user_id = ? AND g.status = 'active'
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *db)
    .await?;

    Ok(ArmoryStats {
        total_valuation: row.base_value + accessory_value,
        total_rounds: row.total_rounds,
        gun_count: row.gun_count,
    })
}

/// Humidor dashboard figures: inventory value and stick count over active
/// cigars, session count over everything the user ever logged.
#[instrument(skip(db), err)]
pub async fn humidor_stats(db: &mut SqliteConnection, user_id: UserId) -> Result<HumidorStats> {
    let row = sqlx::query_as::<_, HumidorAggregateRow>(
        r#"
        SELECT COALESCE(SUM(price_paid * quantity), 0.0) AS total_value,
               COALESCE(SUM(quantity), 0) AS total_sticks,
               COUNT(*) AS cigar_count
        FROM cigars
        WHERE user_id = ? AND status = 'active'
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *db)
    .await?;

    let session_count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM smoking_sessions s
        JOIN cigars c ON s.cigar_id = c.id
        WHERE c.user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *db)
    .await?;

    Ok(HumidorStats {
        total_value: row.total_value,
        total_sticks: row.total_sticks,
        session_count,
        cigar_count: row.cigar_count,
    })
}

/// Cross-domain summary for the analytics dashboard.
#[instrument(skip(db), err)]
pub async fn aggregated(db: &mut SqliteConnection, user_id: UserId) -> Result<AnalyticsSummary> {
    let garage = garage_stats(db, user_id).await?;
    let armory = armory_stats(db, user_id).await?;
    let humidor = humidor_stats(db, user_id).await?;

    Ok(AnalyticsSummary {
        total_assets_value: garage.fleet_value + armory.total_valuation + humidor.total_value,
        garage,
        armory,
        humidor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Cigars, Guns, OwnedRepository, Users, Vehicles};
    use crate::db::models::armory::{AccessoryCreateDBRequest, GunCreateDBRequest};
    use crate::db::models::garage::{ServiceLogCreateDBRequest, VehicleCreateDBRequest};
    use crate::db::models::humidor::CigarCreateDBRequest;
    use crate::db::models::users::UserCreateDBRequest;
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

    async fn seed_garage(conn: &mut SqliteConnection, user: UserId) {
        let mut vehicles = Vehicles::new(conn);
        let car = vehicles
            .create(
                user,
                &VehicleCreateDBRequest {
                    name: "Daily".to_string(),
                    make: "Honda".to_string(),
                    model: "Civic".to_string(),
                    year: 2020,
                    plate: format!("STAT-{user}"),
                    odometer_km: 40_000,
                    monthly_km_estimate: 1000,
                    estimated_value: 18_000.0,
                    photo_path: None,
                },
            )
            .await
            .unwrap();
        vehicles
            .add_service_log(
                user,
                car.id,
                &ServiceLogCreateDBRequest {
                    performed_on: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                    odometer_km: 40_500,
                    description: "Brakes".to_string(),
                    cost: 350.0,
                    notes: None,
                    receipt_path: None,
                    interval_km: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
    }

    #[sqlx::test]
    async fn test_aggregates_are_per_user(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let alice = create_user(&mut conn, "alice@example.com").await;
        let bob = create_user(&mut conn, "bob@example.com").await;

        seed_garage(&mut conn, alice).await;
        seed_garage(&mut conn, bob).await;

        let mut guns = Guns::new(&mut conn);
        let gun = guns
            .create(
                alice,
                &GunCreateDBRequest {
                    nickname: "Range Toy".to_string(),
                    make: "CZ".to_string(),
                    model: "Shadow 2".to_string(),
                    caliber: "9mm".to_string(),
                    base_price: 1_300.0,
                    total_rounds: 500,
                    photo_path: None,
                    invoice_path: None,
                },
            )
            .await
            .unwrap();
        guns.add_accessory(
            alice,
            gun.id,
            &AccessoryCreateDBRequest {
                kind: "Optic".to_string(),
                brand: "Holosun".to_string(),
                model: "507c".to_string(),
                cost: 300.0,
            },
        )
        .await
        .unwrap()
        .unwrap();

        let mut cigars = Cigars::new(&mut conn);
        cigars
            .create(
                alice,
                &CigarCreateDBRequest {
                    brand: "Padron".to_string(),
                    line: "1964".to_string(),
                    quantity: 4,
                    price_paid: 20.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // The odometer advanced to 40,500 via the service log
        let summary = aggregated(&mut conn, alice).await.unwrap();
        assert_eq!(summary.garage.vehicle_count, 1);
        assert_eq!(summary.garage.total_mileage, 40_500);
        assert_eq!(summary.garage.maintenance_cost, 350.0);
        assert_eq!(summary.armory.total_valuation, 1_600.0);
        assert_eq!(summary.armory.total_rounds, 500);
        assert_eq!(summary.humidor.total_value, 80.0);
        assert_eq!(summary.humidor.total_sticks, 4);
        assert_eq!(summary.total_assets_value, 18_000.0 + 1_600.0 + 80.0);

        // Bob's numbers are untouched by Alice's armory and humidor
        let summary = aggregated(&mut conn, bob).await.unwrap();
        assert_eq!(summary.armory.gun_count, 0);
        assert_eq!(summary.humidor.cigar_count, 0);
        assert_eq!(summary.garage.vehicle_count, 1);
    }

    #[sqlx::test]
    async fn test_empty_user_is_all_zeroes(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_user(&mut conn, "nothing@example.com").await;

        let summary = aggregated(&mut conn, user).await.unwrap();
        assert_eq!(summary.total_assets_value, 0.0);
        assert_eq!(summary.garage.vehicle_count, 0);
        assert_eq!(summary.armory.total_rounds, 0);
        assert_eq!(summary.humidor.session_count, 0);
    }
}
