//! Complaint model and queries.
//!
//! Status moves Pending → In Progress → Resolved, driven by an admin.
//! `resolved_at` is non-null exactly while status is `Resolved`.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

pub const STATUS_PENDING: &str = "Pending";
pub const STATUS_IN_PROGRESS: &str = "In Progress";
pub const STATUS_RESOLVED: &str = "Resolved";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Complaint {
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    pub image_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub resolved_at: Option<String>,
}

/// Admin listing row: complaint joined with submitter identity/location.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ComplaintWithUser {
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    pub image_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub resolved_at: Option<String>,
    pub student_name: String,
    pub hostel_block: String,
    pub room_number: String,
}

/// Optional equality filters for the admin listing, AND-combined.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplaintFilter {
    pub status: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
}

/// Dashboard aggregate: total plus per-status counts.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DashboardStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub resolved: i64,
}

/// Fields needed to insert a new complaint row.
#[derive(Debug, Clone)]
pub struct NewComplaint<'a> {
    pub user_id: &'a str,
    pub category: &'a str,
    pub description: &'a str,
    pub priority: &'a str,
    pub image_path: Option<&'a str>,
}

impl Complaint {
    pub async fn create(
        db: &SqlitePool,
        new: NewComplaint<'_>,
    ) -> Result<Complaint, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO complaints (id, user_id, category, description, priority, status, image_path, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(new.user_id)
        .bind(new.category)
        .bind(new.description)
        .bind(new.priority)
        .bind(STATUS_PENDING)
        .bind(new.image_path)
        .bind(&now)
        .bind(&now)
        .execute(db)
        .await?;

        sqlx::query_as("SELECT * FROM complaints WHERE id = ?")
            .bind(&id)
            .fetch_one(db)
            .await
    }

    pub async fn find(db: &SqlitePool, id: &str) -> Result<Option<Complaint>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM complaints WHERE id = ? LIMIT 1")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// All complaints owned by one user, most recent first.
    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<Complaint>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM complaints WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    /// Admin listing joined with submitter info. Absent filter = no
    /// constraint; each bound value is checked with `?n IS NULL` so the
    /// statement stays a single parameterized query.
    pub async fn list_filtered(
        db: &SqlitePool,
        filter: &ComplaintFilter,
    ) -> Result<Vec<ComplaintWithUser>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT c.*, u.name AS student_name, u.hostel_block, u.room_number
            FROM complaints c
            JOIN users u ON c.user_id = u.id
            WHERE (?1 IS NULL OR c.status = ?1)
              AND (?2 IS NULL OR c.category = ?2)
              AND (?3 IS NULL OR c.priority = ?3)
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(filter.status.as_deref())
        .bind(filter.category.as_deref())
        .bind(filter.priority.as_deref())
        .fetch_all(db)
        .await
    }

    /// Set the status and `updated_at`. `resolved_at` is stamped only when
    /// the new status is exactly Resolved, and cleared otherwise — moving a
    /// resolved complaint back drops its resolution timestamp.
    ///
    /// Returns false when no row matched.
    pub async fn update_status(
        db: &SqlitePool,
        id: &str,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();
        let resolved_at = if status == STATUS_RESOLVED {
            Some(now.clone())
        } else {
            None
        };

        let result = sqlx::query(
            "UPDATE complaints SET status = ?, updated_at = ?, resolved_at = ? WHERE id = ?",
        )
        .bind(status)
        .bind(&now)
        .bind(&resolved_at)
        .bind(id)
        .execute(db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns false when no row matched.
    pub async fn delete(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM complaints WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Total and per-status counts in one aggregate query.
    pub async fn dashboard_stats(db: &SqlitePool) -> Result<DashboardStats, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'Pending' THEN 1 ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN status = 'In Progress' THEN 1 ELSE 0 END), 0) AS in_progress,
                COALESCE(SUM(CASE WHEN status = 'Resolved' THEN 1 ELSE 0 END), 0) AS resolved
            FROM complaints
            "#,
        )
        .fetch_one(db)
        .await
    }
}
