//! Backend-agnostic `Database` trait.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::plans::model::{NewPlan, Plan, User, UserSync};

/// Persistence for users and their plans.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    /// Insert the user if the clerk id is new, otherwise overwrite name,
    /// email and image. Idempotent.
    async fn upsert_user(&self, user: &UserSync) -> Result<(), DatabaseError>;

    /// Look up a user by identity-provider id.
    async fn get_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>, DatabaseError>;

    // ── Plans ───────────────────────────────────────────────────────

    /// Insert a plan for the user with `clerk_id` and return its id.
    ///
    /// Fails with `DatabaseError::NotFound` if the user does not exist. When
    /// the plan is active, every other plan of the user is deactivated first.
    async fn create_plan(&self, clerk_id: &str, plan: &NewPlan) -> Result<i64, DatabaseError>;

    /// All plans of the user with `clerk_id`, newest first.
    async fn list_plans(&self, clerk_id: &str) -> Result<Vec<Plan>, DatabaseError>;
}
