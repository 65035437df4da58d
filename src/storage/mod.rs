pub mod models;
pub mod schema;
pub mod sqlite;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::Identity;
use crate::errors::Result;
use models::{Profile, ProfilePatch, Resource, VaultStats};

/// Owner-scoped operations on one collection. A row owned by someone else
/// behaves exactly like a missing row.
pub trait ResourceClient<R: Resource> {
    /// Newest first.
    fn list_by_owner(&self, owner: Uuid) -> Result<Vec<R>>;
    fn get_by_id(&self, owner: Uuid, id: Uuid) -> Result<R>;
    fn create(&self, owner: Uuid, new: R::New) -> Result<R>;
    fn update(&self, owner: Uuid, id: Uuid, patch: R::Patch) -> Result<R>;
    /// `Ok(false)` when nothing matched.
    fn delete(&self, owner: Uuid, id: Uuid) -> Result<bool>;
    fn count_by_owner(&self, owner: Uuid) -> Result<i64>;
}

pub trait AccountStorage {
    fn find_or_create_user(&self, email: &str) -> Result<Identity>;
    fn get_profile(&self, owner: Uuid) -> Result<Profile>;
    fn update_profile(&self, owner: Uuid, patch: ProfilePatch) -> Result<Profile>;
    fn stats(&self, owner: Uuid, since: DateTime<Utc>) -> Result<VaultStats>;
}
