//! Common type aliases for entity identifiers.
//!
//! All entities use SQLite rowid-style integer primary keys. The aliases
//! exist so signatures say which entity an id refers to.

pub type UserId = i64;
pub type VehicleId = i64;
pub type MaintenanceLogId = i64;
pub type AlertId = i64;
pub type GunId = i64;
pub type AccessoryId = i64;
pub type RangeSessionId = i64;
pub type CigarId = i64;
pub type SmokingSessionId = i64;
