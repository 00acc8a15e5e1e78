//! Repository for `walk_sessions` and their child tables
//! (`walk_spot_visits`, `walk_photos`).

use sqlx::SqlitePool;

use crate::db::{
    now, FinishWalkSession, NewSpotVisit, NewWalkPhoto, WalkPhoto, WalkSession, WalkSpotVisit,
};

pub struct WalkSessionRepo;

impl WalkSessionRepo {
    /// Sessions owned by `user_id`, most recent start first.
    pub async fn list_for_user(
        pool: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<WalkSession>, sqlx::Error> {
        sqlx::query_as::<_, WalkSession>(
            "SELECT * FROM walk_sessions WHERE user_id = ? ORDER BY started_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Unscoped lookup, used to tell "missing" apart from "not yours".
    pub async fn find_by_id(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<WalkSession>, sqlx::Error> {
        sqlx::query_as::<_, WalkSession>("SELECT * FROM walk_sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_owned(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<WalkSession>, sqlx::Error> {
        sqlx::query_as::<_, WalkSession>(
            "SELECT * FROM walk_sessions WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Start a session. `ended_at` always starts out NULL.
    pub async fn create(
        pool: &SqlitePool,
        user_id: i64,
        course_template_id: Option<i64>,
        started_at: &str,
        notes: &str,
        trajectory: &str,
    ) -> Result<WalkSession, sqlx::Error> {
        let now = now();
        sqlx::query_as::<_, WalkSession>(
            "INSERT INTO walk_sessions \
                (user_id, course_template_id, started_at, trajectory, notes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(user_id)
        .bind(course_template_id)
        .bind(started_at)
        .bind(trajectory)
        .bind(notes)
        .bind(&now)
        .bind(&now)
        .fetch_one(pool)
        .await
    }

    /// Partial update of an open session.
    ///
    /// Returns `None` when the session is missing, owned by someone else or
    /// already finished.
    pub async fn update_open(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
        course_template_id: Option<i64>,
        notes: Option<&str>,
        trajectory: Option<&str>,
    ) -> Result<Option<WalkSession>, sqlx::Error> {
        sqlx::query_as::<_, WalkSession>(
            "UPDATE walk_sessions SET \
                course_template_id = COALESCE(?, course_template_id), \
                notes = COALESCE(?, notes), \
                trajectory = COALESCE(?, trajectory), \
                updated_at = ? \
             WHERE id = ? AND user_id = ? AND ended_at IS NULL \
             RETURNING *",
        )
        .bind(course_template_id)
        .bind(notes)
        .bind(trajectory)
        .bind(now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Stamp the end-of-session fields, scoped to `(id, user_id)`.
    ///
    /// A finished session may be finished again; the new values overwrite
    /// the old ones. `total_distance_m` keeps its previous value when not given.
    pub async fn finish(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
        input: &FinishWalkSession,
    ) -> Result<Option<WalkSession>, sqlx::Error> {
        sqlx::query_as::<_, WalkSession>(
            "UPDATE walk_sessions SET \
                ended_at = ?, \
                total_distance_m = COALESCE(?, total_distance_m), \
                total_duration_sec = ?, \
                trajectory = COALESCE(?, trajectory), \
                updated_at = ? \
             WHERE id = ? AND user_id = ? \
             RETURNING *",
        )
        .bind(&input.ended_at)
        .bind(input.total_distance_m)
        .bind(input.total_duration_sec)
        .bind(&input.trajectory)
        .bind(now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Delete an owned session and its children.
    ///
    /// Returns the image paths of the removed photos so the caller can clean
    /// up the files, or `None` if nothing was deleted.
    pub async fn delete_owned(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Vec<String>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let images: Vec<(String,)> = sqlx::query_as(
            "SELECT p.image FROM walk_photos p \
             JOIN walk_sessions s ON s.id = p.session_id \
             WHERE s.id = ? AND s.user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM walk_sessions WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(images.into_iter().map(|(image,)| image).collect()))
    }

    // -----------------------------------------------------------------------
    // Spot visits
    // -----------------------------------------------------------------------

    pub async fn add_spot_visit(
        pool: &SqlitePool,
        session_id: i64,
        visit: &NewSpotVisit,
    ) -> Result<WalkSpotVisit, sqlx::Error> {
        sqlx::query_as::<_, WalkSpotVisit>(
            "INSERT INTO walk_spot_visits \
                (session_id, course_spot_template_id, name, place_id, lat, lng, \
                 arrived_at, left_at, stay_duration_sec, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(session_id)
        .bind(visit.course_spot_template_id)
        .bind(&visit.name)
        .bind(&visit.place_id)
        .bind(visit.lat)
        .bind(visit.lng)
        .bind(&visit.arrived_at)
        .bind(&visit.left_at)
        .bind(visit.stay_duration_sec)
        .bind(now())
        .fetch_one(pool)
        .await
    }

    pub async fn list_spot_visits(
        pool: &SqlitePool,
        session_id: i64,
    ) -> Result<Vec<WalkSpotVisit>, sqlx::Error> {
        sqlx::query_as::<_, WalkSpotVisit>(
            "SELECT * FROM walk_spot_visits WHERE session_id = ? ORDER BY id",
        )
        .bind(session_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_spot_visit(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<WalkSpotVisit>, sqlx::Error> {
        sqlx::query_as::<_, WalkSpotVisit>("SELECT * FROM walk_spot_visits WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Photos
    // -----------------------------------------------------------------------

    pub async fn add_photo(
        pool: &SqlitePool,
        session_id: i64,
        photo: &NewWalkPhoto,
    ) -> Result<WalkPhoto, sqlx::Error> {
        sqlx::query_as::<_, WalkPhoto>(
            "INSERT INTO walk_photos \
                (session_id, spot_visit_id, image, taken_at, lat, lng, caption, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(session_id)
        .bind(photo.spot_visit_id)
        .bind(&photo.image)
        .bind(&photo.taken_at)
        .bind(photo.lat)
        .bind(photo.lng)
        .bind(&photo.caption)
        .bind(now())
        .fetch_one(pool)
        .await
    }

    pub async fn list_photos(
        pool: &SqlitePool,
        session_id: i64,
    ) -> Result<Vec<WalkPhoto>, sqlx::Error> {
        sqlx::query_as::<_, WalkPhoto>("SELECT * FROM walk_photos WHERE session_id = ? ORDER BY id")
            .bind(session_id)
            .fetch_all(pool)
            .await
    }
}
