//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut SqliteConnection`, provides strongly-typed
//! operations, and returns models from [`crate::db::models`]. The three asset
//! repositories implement [`OwnedRepository`], which bakes the per-user
//! ownership check into every call.
//!
//! - [`Users`]: account management and authentication lookups
//! - [`Vehicles`]: garage roots plus maintenance logs and mileage alerts
//! - [`Guns`]: armory roots plus accessories and range sessions
//! - [`Cigars`]: humidor roots plus smoking sessions, images, and the
//!   cross-user community catalog
//! - [`analytics`]: read-only per-user aggregates
//! - [`file_storage`]: blob store trait and local-filesystem backend

pub mod analytics;
pub mod armory;
pub mod file_storage;
pub mod garage;
pub mod humidor;
pub mod repository;
pub mod users;

pub use armory::Guns;
pub use file_storage::FileStorage;
pub use garage::Vehicles;
pub use humidor::Cigars;
pub use repository::OwnedRepository;
pub use users::Users;
