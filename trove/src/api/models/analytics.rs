//! Response models for the per-user aggregate views.

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GarageStats {
    pub fleet_value: f64,
    pub total_mileage: i64,
    pub maintenance_cost: f64,
    pub vehicle_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ArmoryStats {
    /// Base prices plus accessory costs over the active guns
    pub total_valuation: f64,
    pub total_rounds: i64,
    pub gun_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HumidorStats {
    /// Price paid times quantity over the active cigars
    pub total_value: f64,
    pub total_sticks: i64,
    pub session_count: i64,
    pub cigar_count: i64,
}

/// Cross-domain summary for the analytics dashboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyticsSummary {
    pub total_assets_value: f64,
    pub garage: GarageStats,
    pub armory: ArmoryStats,
    pub humidor: HumidorStats,
}
