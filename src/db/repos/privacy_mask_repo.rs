//! Repository for `user_privacy_masks`. Every query is scoped to one user.

use sqlx::SqlitePool;

use crate::db::{now, CreatePrivacyMaskRequest, UpdatePrivacyMaskRequest, UserPrivacyMask};

pub struct PrivacyMaskRepo;

impl PrivacyMaskRepo {
    pub async fn list_for_user(
        pool: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<UserPrivacyMask>, sqlx::Error> {
        sqlx::query_as::<_, UserPrivacyMask>(
            "SELECT * FROM user_privacy_masks WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_owned(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<UserPrivacyMask>, sqlx::Error> {
        sqlx::query_as::<_, UserPrivacyMask>(
            "SELECT * FROM user_privacy_masks WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: i64,
        input: &CreatePrivacyMaskRequest,
    ) -> Result<UserPrivacyMask, sqlx::Error> {
        let now = now();
        sqlx::query_as::<_, UserPrivacyMask>(
            "INSERT INTO user_privacy_masks \
                (user_id, center_lat, center_lng, radius_m, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(user_id)
        .bind(input.center_lat)
        .bind(input.center_lng)
        .bind(input.radius_m)
        .bind(&now)
        .bind(&now)
        .fetch_one(pool)
        .await
    }

    /// Partial update. Returns `None` if the mask is missing or not owned.
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
        input: &UpdatePrivacyMaskRequest,
    ) -> Result<Option<UserPrivacyMask>, sqlx::Error> {
        sqlx::query_as::<_, UserPrivacyMask>(
            "UPDATE user_privacy_masks SET \
                center_lat = COALESCE(?, center_lat), \
                center_lng = COALESCE(?, center_lng), \
                radius_m = COALESCE(?, radius_m), \
                updated_at = ? \
             WHERE id = ? AND user_id = ? \
             RETURNING *",
        )
        .bind(input.center_lat)
        .bind(input.center_lng)
        .bind(input.radius_m)
        .bind(now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_privacy_masks WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
