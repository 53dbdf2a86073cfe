//! Base repository trait for owned root entities.

use crate::db::errors::Result;
use crate::db::models::DisposalRequest;
use crate::types::UserId;

/// Common contract for the three asset domains (vehicles, guns, cigars).
///
/// Every method takes the owning user id and re-resolves the row against it;
/// an ownership mismatch behaves exactly like a missing row (`None`). Child
/// entities are reached through domain-specific methods on the implementing
/// repository, which apply the same root ownership check first.
#[async_trait::async_trait]
pub trait OwnedRepository {
    /// The request type for creating entities
    type CreateRequest;

    /// The request type for updating entities
    type UpdateRequest;

    /// The response/DTO type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync;

    /// Create a new root entity owned by `owner`
    async fn create(&mut self, owner: UserId, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// Get a root entity by ID, `None` unless owned by `owner`
    async fn get(&mut self, owner: UserId, id: Self::Id) -> Result<Option<Self::Response>>;

    /// List root entities owned by `owner` in insertion order.
    /// Disposed entities are excluded unless `include_all` is set.
    async fn list(&mut self, owner: UserId, include_all: bool) -> Result<Vec<Self::Response>>;

    /// Overwrite mutable fields; `None` when the ownership check fails
    async fn update(&mut self, owner: UserId, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>>;

    /// Apply a terminal status without deleting the row; `None` when the
    /// ownership check fails
    async fn dispose(&mut self, owner: UserId, id: Self::Id, request: &DisposalRequest) -> Result<Option<Self::Response>>;
}
