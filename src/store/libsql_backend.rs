//! libSQL implementation of the async `Database` trait.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::plans::model::{NewPlan, Plan, User, UserSync};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Resolve a clerk id to the internal user id.
    async fn user_id_for(&self, clerk_id: &str) -> Result<i64, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT id FROM users WHERE clerk_id = ?1", params![clerk_id])
            .await
            .map_err(|e| DatabaseError::Query(format!("user_id_for: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map_err(|e| DatabaseError::Query(format!("row parse: {e}"))),
            Ok(None) => Err(DatabaseError::NotFound {
                entity: "user".to_string(),
                id: clerk_id.to_string(),
            }),
            Err(e) => Err(DatabaseError::Query(format!("user_id_for: {e}"))),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical timestamp format. Microsecond RFC 3339 in UTC sorts
/// lexicographically in creation order.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn parse_json_column(raw: &str, column: &str) -> Result<serde_json::Value, DatabaseError> {
    serde_json::from_str(raw)
        .map_err(|e| DatabaseError::Serialization(format!("{column}: {e}")))
}

/// Map a libsql Row to a User.
///
/// Column order matches USER_COLUMNS.
fn row_to_user(row: &libsql::Row) -> Result<User, libsql::Error> {
    let created_str: String = row.get(5)?;
    let updated_str: String = row.get(6)?;
    Ok(User {
        id: row.get(0)?,
        clerk_id: row.get(1)?,
        name: row.get(2).ok(),
        email: row.get(3)?,
        image: row.get(4).ok(),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

/// Map a libsql Row to a Plan.
///
/// Column order matches PLAN_COLUMNS.
fn row_to_plan(row: &libsql::Row) -> Result<Plan, DatabaseError> {
    let parse = |e: libsql::Error| DatabaseError::Query(format!("row parse: {e}"));

    let workout_str: String = row.get(3).map_err(parse)?;
    let diet_str: String = row.get(4).map_err(parse)?;
    let is_active: i64 = row.get(5).map_err(parse)?;
    let created_str: String = row.get(6).map_err(parse)?;

    Ok(Plan {
        id: row.get(0).map_err(parse)?,
        user_id: row.get(1).map_err(parse)?,
        name: row.get(2).map_err(parse)?,
        workout_plan: parse_json_column(&workout_str, "workout_plan")?,
        diet_plan: parse_json_column(&diet_str, "diet_plan")?,
        is_active: is_active != 0,
        created_at: parse_datetime(&created_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const USER_COLUMNS: &str = "id, clerk_id, name, email, image, created_at, updated_at";

const PLAN_COLUMNS: &str = "id, user_id, name, workout_plan, diet_plan, is_active, created_at";

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn upsert_user(&self, user: &UserSync) -> Result<(), DatabaseError> {
        let now = now_timestamp();
        self.conn()
            .execute(
                "INSERT INTO users (clerk_id, name, email, image, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT (clerk_id) DO UPDATE SET
                    name = excluded.name,
                    email = excluded.email,
                    image = excluded.image,
                    updated_at = excluded.updated_at",
                params![
                    user.clerk_id.as_str(),
                    opt_text(user.name.as_deref()),
                    user.email.as_str(),
                    opt_text(user.image.as_deref()),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_user: {e}")))?;

        debug!(clerk_id = %user.clerk_id, "User synced");
        Ok(())
    }

    async fn get_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE clerk_id = ?1"),
                params![clerk_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_user_by_clerk_id: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let user = row_to_user(&row)
                    .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
                Ok(Some(user))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_user_by_clerk_id: {e}"))),
        }
    }

    // ── Plans ───────────────────────────────────────────────────────

    async fn create_plan(&self, clerk_id: &str, plan: &NewPlan) -> Result<i64, DatabaseError> {
        let user_id = self.user_id_for(clerk_id).await?;
        let conn = self.conn();

        // Two separate statements: a failure between them leaves the user
        // with no active plan.
        if plan.is_active {
            let deactivated = conn
                .execute(
                    "UPDATE plans SET is_active = 0 WHERE user_id = ?1 AND is_active = 1",
                    params![user_id],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("deactivate_plans: {e}")))?;
            debug!(user_id, deactivated, "Deactivated previous plans");
        }

        let workout_json = serde_json::to_string(&plan.workout_plan)
            .map_err(|e| DatabaseError::Serialization(format!("workout_plan: {e}")))?;
        let diet_json = serde_json::to_string(&plan.diet_plan)
            .map_err(|e| DatabaseError::Serialization(format!("diet_plan: {e}")))?;

        let mut rows = conn
            .query(
                "INSERT INTO plans (user_id, name, workout_plan, diet_plan, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING id",
                params![
                    user_id,
                    plan.name.as_str(),
                    workout_json,
                    diet_json,
                    plan.is_active as i64,
                    now_timestamp(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_plan: {e}")))?;

        let plan_id = match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?,
            Ok(None) => {
                return Err(DatabaseError::Query(
                    "create_plan: insert returned no id".to_string(),
                ));
            }
            Err(e) => return Err(DatabaseError::Query(format!("create_plan: {e}"))),
        };

        info!(plan_id, user_id, active = plan.is_active, "Plan created");
        Ok(plan_id)
    }

    async fn list_plans(&self, clerk_id: &str) -> Result<Vec<Plan>, DatabaseError> {
        let user_id = self.user_id_for(clerk_id).await?;
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {PLAN_COLUMNS} FROM plans WHERE user_id = ?1
                     ORDER BY created_at DESC, id DESC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_plans: {e}")))?;

        let mut plans = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => plans.push(row_to_plan(&row)?),
                Ok(None) => break,
                Err(e) => return Err(DatabaseError::Query(format!("list_plans: {e}"))),
            }
        }
        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn alice() -> UserSync {
        UserSync {
            clerk_id: "user_alice".into(),
            name: Some("Alice".into()),
            email: "alice@example.com".into(),
            image: Some("https://img.example.com/alice.png".into()),
        }
    }

    fn plan(name: &str, active: bool) -> NewPlan {
        NewPlan {
            name: name.into(),
            workout_plan: serde_json::json!({"content": format!("{name} workout"), "answers": []}),
            diet_plan: serde_json::json!({"content": format!("{name} diet")}),
            is_active: active,
        }
    }

    async fn count(db: &LibSqlBackend, sql: &str) -> i64 {
        let mut rows = db.conn().query(sql, ()).await.unwrap();
        rows.next().await.unwrap().unwrap().get(0).unwrap()
    }

    // ── User tests ──────────────────────────────────────────────────

    #[tokio::test]
    async fn upsert_inserts_new_user() {
        let db = test_db().await;
        db.upsert_user(&alice()).await.unwrap();

        let user = db.get_user_by_clerk_id("user_alice").await.unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("Alice"));
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.image.as_deref(), Some("https://img.example.com/alice.png"));
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let db = test_db().await;
        db.upsert_user(&alice()).await.unwrap();
        db.upsert_user(&alice()).await.unwrap();

        assert_eq!(count(&db, "SELECT COUNT(*) FROM users").await, 1);
        let user = db.get_user_by_clerk_id("user_alice").await.unwrap().unwrap();
        assert_eq!(user.email, "alice@example.com");
    }

    #[tokio::test]
    async fn upsert_overwrites_fields() {
        let db = test_db().await;
        db.upsert_user(&alice()).await.unwrap();
        let original = db.get_user_by_clerk_id("user_alice").await.unwrap().unwrap();

        let updated = UserSync {
            name: None,
            email: "alice@new.example.com".into(),
            image: None,
            ..alice()
        };
        db.upsert_user(&updated).await.unwrap();

        let user = db.get_user_by_clerk_id("user_alice").await.unwrap().unwrap();
        assert_eq!(user.id, original.id);
        assert_eq!(user.email, "alice@new.example.com");
        assert!(user.name.is_none());
        assert!(user.image.is_none());
    }

    #[tokio::test]
    async fn get_unknown_user_is_none() {
        let db = test_db().await;
        assert!(db.get_user_by_clerk_id("nobody").await.unwrap().is_none());
    }

    // ── Plan tests ──────────────────────────────────────────────────

    #[tokio::test]
    async fn create_plan_for_unknown_user_is_not_found() {
        let db = test_db().await;
        let err = db.create_plan("nobody", &plan("p", true)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { ref entity, .. } if entity == "user"));
    }

    #[tokio::test]
    async fn list_plans_for_unknown_user_is_not_found() {
        let db = test_db().await;
        let err = db.list_plans("nobody").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn create_and_list_round_trip() {
        let db = test_db().await;
        db.upsert_user(&alice()).await.unwrap();

        let id = db.create_plan("user_alice", &plan("first", true)).await.unwrap();
        let plans = db.list_plans("user_alice").await.unwrap();

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, id);
        assert_eq!(plans[0].name, "first");
        assert!(plans[0].is_active);
        assert_eq!(plans[0].workout_plan["content"], "first workout");
        assert_eq!(plans[0].diet_plan["content"], "first diet");
    }

    #[tokio::test]
    async fn active_plan_deactivates_previous() {
        let db = test_db().await;
        db.upsert_user(&alice()).await.unwrap();

        let first = db.create_plan("user_alice", &plan("first", true)).await.unwrap();
        let second = db.create_plan("user_alice", &plan("second", true)).await.unwrap();

        let plans = db.list_plans("user_alice").await.unwrap();
        let active: Vec<_> = plans.iter().filter(|p| p.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second);
        assert!(plans.iter().any(|p| p.id == first && !p.is_active));
    }

    #[tokio::test]
    async fn inactive_plan_keeps_existing_active() {
        let db = test_db().await;
        db.upsert_user(&alice()).await.unwrap();

        let first = db.create_plan("user_alice", &plan("first", true)).await.unwrap();
        db.create_plan("user_alice", &plan("draft", false)).await.unwrap();

        let plans = db.list_plans("user_alice").await.unwrap();
        let active: Vec<_> = plans.iter().filter(|p| p.is_active).map(|p| p.id).collect();
        assert_eq!(active, vec![first]);
    }

    #[tokio::test]
    async fn deactivation_is_scoped_to_user() {
        let db = test_db().await;
        db.upsert_user(&alice()).await.unwrap();
        db.upsert_user(&UserSync {
            clerk_id: "user_bob".into(),
            name: Some("Bob".into()),
            email: "bob@example.com".into(),
            image: None,
        })
        .await
        .unwrap();

        db.create_plan("user_alice", &plan("alice", true)).await.unwrap();
        db.create_plan("user_bob", &plan("bob", true)).await.unwrap();

        let alice_plans = db.list_plans("user_alice").await.unwrap();
        assert!(alice_plans[0].is_active);
        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM plans WHERE is_active = 1").await,
            2
        );
    }

    #[tokio::test]
    async fn list_plans_newest_first() {
        let db = test_db().await;
        db.upsert_user(&alice()).await.unwrap();

        let mut ids = Vec::new();
        for name in ["one", "two", "three"] {
            ids.push(db.create_plan("user_alice", &plan(name, false)).await.unwrap());
        }

        let plans = db.list_plans("user_alice").await.unwrap();
        let listed: Vec<i64> = plans.iter().map(|p| p.id).collect();
        ids.reverse();
        assert_eq!(listed, ids);
        assert!(plans.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn new_local_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("coach.db");
        let db = LibSqlBackend::new_local(&db_path).await.unwrap();
        db.upsert_user(&alice()).await.unwrap();
        assert!(db_path.exists());
    }
}
