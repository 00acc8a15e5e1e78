//! Repository for the course catalog: `course_templates`,
//! `course_spot_templates`, `course_modes` and their junction table.

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::db::{
    now, CourseMode, CourseSpotTemplate, CourseTemplate, CourseTemplateFilter,
    CourseTemplateResponse, CreateCourseTemplateRequest, SpotInput, TemplateOwner,
    UpdateCourseTemplateRequest,
};

/// Column list for `course_modes` joined through `course_template_modes`.
const MODE_COLUMNS: &str = "m.id, m.code, m.label";

pub struct CourseTemplateRepo;

impl CourseTemplateRepo {
    // -----------------------------------------------------------------------
    // Modes
    // -----------------------------------------------------------------------

    pub async fn list_modes(pool: &SqlitePool) -> Result<Vec<CourseMode>, sqlx::Error> {
        sqlx::query_as::<_, CourseMode>("SELECT * FROM course_modes ORDER BY id")
            .fetch_all(pool)
            .await
    }

    /// Resolve mode codes to rows.
    ///
    /// Duplicate codes collapse to one row. Returns the resolved modes and
    /// the codes that matched nothing, in submission order.
    pub async fn resolve_modes(
        pool: &SqlitePool,
        codes: &[String],
    ) -> Result<(Vec<CourseMode>, Vec<String>), sqlx::Error> {
        let mut resolved: Vec<CourseMode> = Vec::new();
        let mut missing: Vec<String> = Vec::new();

        for code in codes {
            if resolved.iter().any(|m| &m.code == code) || missing.contains(code) {
                continue;
            }
            let mode = sqlx::query_as::<_, CourseMode>("SELECT * FROM course_modes WHERE code = ?")
                .bind(code)
                .fetch_optional(pool)
                .await?;
            match mode {
                Some(mode) => resolved.push(mode),
                None => missing.push(code.clone()),
            }
        }

        Ok((resolved, missing))
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    pub async fn find_by_id(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<CourseTemplate>, sqlx::Error> {
        sqlx::query_as::<_, CourseTemplate>("SELECT * FROM course_templates WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a template only if `caller` is allowed to see it.
    pub async fn find_visible(
        pool: &SqlitePool,
        id: i64,
        caller: Option<i64>,
    ) -> Result<Option<CourseTemplate>, sqlx::Error> {
        Ok(Self::find_by_id(pool, id)
            .await?
            .filter(|t| t.is_visible_to(caller)))
    }

    /// List templates visible to `caller`, with spots and modes.
    pub async fn list_visible(
        pool: &SqlitePool,
        caller: Option<i64>,
        filter: &CourseTemplateFilter,
    ) -> Result<Vec<CourseTemplateResponse>, sqlx::Error> {
        let templates = sqlx::query_as::<_, CourseTemplate>(
            "SELECT * FROM course_templates \
             WHERE (owner_id = ?1 OR (is_public = 1 AND is_active = 1)) \
               AND (?2 IS NULL OR mood = ?2) \
               AND (?3 IS NULL OR id IN ( \
                    SELECT ctm.course_template_id FROM course_template_modes ctm \
                    JOIN course_modes m ON m.id = ctm.course_mode_id \
                    WHERE m.code = ?3)) \
               AND (?4 = 0 OR owner_id = ?1) \
             ORDER BY id",
        )
        .bind(caller)
        .bind(filter.mood.map(|m| m.as_str()))
        .bind(&filter.mode)
        .bind(filter.mine)
        .fetch_all(pool)
        .await?;

        let mut result = Vec::with_capacity(templates.len());
        for template in templates {
            result.push(Self::load_response(pool, template).await?);
        }
        Ok(result)
    }

    /// Attach spots and modes to a template row.
    pub async fn load_response(
        pool: &SqlitePool,
        template: CourseTemplate,
    ) -> Result<CourseTemplateResponse, sqlx::Error> {
        let modes = Self::modes_for(pool, template.id).await?;
        let spots = Self::spots_for(pool, template.id).await?;
        Ok(CourseTemplateResponse::new(template, modes, spots))
    }

    pub async fn modes_for(
        pool: &SqlitePool,
        template_id: i64,
    ) -> Result<Vec<CourseMode>, sqlx::Error> {
        let query = format!(
            "SELECT {MODE_COLUMNS} FROM course_modes m \
             JOIN course_template_modes ctm ON ctm.course_mode_id = m.id \
             WHERE ctm.course_template_id = ? \
             ORDER BY m.id"
        );
        sqlx::query_as::<_, CourseMode>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await
    }

    pub async fn spots_for(
        pool: &SqlitePool,
        template_id: i64,
    ) -> Result<Vec<CourseSpotTemplate>, sqlx::Error> {
        sqlx::query_as::<_, CourseSpotTemplate>(
            "SELECT * FROM course_spot_templates WHERE course_template_id = ? ORDER BY \"order\"",
        )
        .bind(template_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_spot(
        pool: &SqlitePool,
        spot_id: i64,
    ) -> Result<Option<CourseSpotTemplate>, sqlx::Error> {
        sqlx::query_as::<_, CourseSpotTemplate>("SELECT * FROM course_spot_templates WHERE id = ?")
            .bind(spot_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a template with its spots and mode links.
    ///
    /// All rows are written in one transaction: readers never observe a
    /// template without its spots or with a partial mode set.
    pub async fn create(
        pool: &SqlitePool,
        owner: TemplateOwner,
        input: &CreateCourseTemplateRequest,
        mode_ids: &[i64],
    ) -> Result<CourseTemplate, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let now = now();

        let template = sqlx::query_as::<_, CourseTemplate>(
            "INSERT INTO course_templates \
                (title, description, mood, default_distance_m, default_duration_min, \
                 is_active, is_public, owner_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.mood.as_str())
        .bind(input.default_distance_m)
        .bind(input.default_duration_min)
        .bind(input.is_public)
        .bind(owner.as_column())
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;

        Self::set_modes_inner(&mut tx, template.id, mode_ids).await?;
        Self::set_spots_inner(&mut tx, template.id, &input.spots).await?;

        tx.commit().await?;
        Ok(template)
    }

    /// Update a template. Only non-`None` fields are applied; `mode_ids` and
    /// `input.spots`, when present, replace the existing sets.
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        input: &UpdateCourseTemplateRequest,
        mode_ids: Option<&[i64]>,
    ) -> Result<Option<CourseTemplate>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let template = sqlx::query_as::<_, CourseTemplate>(
            "UPDATE course_templates SET \
                title = COALESCE(?, title), \
                description = COALESCE(?, description), \
                mood = COALESCE(?, mood), \
                default_distance_m = COALESCE(?, default_distance_m), \
                default_duration_min = COALESCE(?, default_duration_min), \
                is_active = COALESCE(?, is_active), \
                is_public = COALESCE(?, is_public), \
                updated_at = ? \
             WHERE id = ? \
             RETURNING *",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.mood.map(|m| m.as_str()))
        .bind(input.default_distance_m)
        .bind(input.default_duration_min)
        .bind(input.is_active)
        .bind(input.is_public)
        .bind(now())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(ref template) = template {
            if let Some(mode_ids) = mode_ids {
                Self::set_modes_inner(&mut tx, template.id, mode_ids).await?;
            }
            if let Some(ref spots) = input.spots {
                sqlx::query("DELETE FROM course_spot_templates WHERE course_template_id = ?")
                    .bind(template.id)
                    .execute(&mut *tx)
                    .await?;
                Self::set_spots_inner(&mut tx, template.id, spots).await?;
            }
        }

        tx.commit().await?;
        Ok(template)
    }

    /// Returns `true` if a row was deleted. Spots and mode links cascade.
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM course_templates WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM course_templates")
            .fetch_one(pool)
            .await?;
        Ok(count.0)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Replace mode links within an existing transaction.
    async fn set_modes_inner(
        tx: &mut Transaction<'_, Sqlite>,
        template_id: i64,
        mode_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM course_template_modes WHERE course_template_id = ?")
            .bind(template_id)
            .execute(&mut **tx)
            .await?;

        for mode_id in mode_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO course_template_modes (course_template_id, course_mode_id) \
                 VALUES (?, ?)",
            )
            .bind(template_id)
            .bind(mode_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Insert spots in the order given; no reordering or deduplication.
    async fn set_spots_inner(
        tx: &mut Transaction<'_, Sqlite>,
        template_id: i64,
        spots: &[SpotInput],
    ) -> Result<(), sqlx::Error> {
        for spot in spots {
            sqlx::query(
                "INSERT INTO course_spot_templates \
                    (course_template_id, \"order\", name, place_id, category, stay_time_min, lat, lng) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(template_id)
            .bind(spot.order)
            .bind(&spot.name)
            .bind(&spot.place_id)
            .bind(&spot.category)
            .bind(spot.stay_time_min)
            .bind(spot.lat)
            .bind(spot.lng)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}
