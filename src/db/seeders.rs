//! Database seeders for built-in data
//!
//! Course modes are seeded on every startup. The sample courses are only
//! inserted on demand (`sanpo db seed-samples`) into an empty catalog.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::info;

use super::{CourseTemplateRepo, CreateCourseTemplateRequest, Mood, SpotInput, TemplateOwner};

/// Built-in modes: (code, label)
const BUILT_IN_MODES: [(&str, &str); 3] = [
    ("walk", "Walk"),
    ("meal", "Meal"),
    ("sightseeing", "Sightseeing"),
];

/// Seed built-in course modes (idempotent; existing codes keep their id)
pub async fn seed_course_modes(pool: &SqlitePool) -> Result<()> {
    for (code, label) in BUILT_IN_MODES {
        sqlx::query("INSERT OR IGNORE INTO course_modes (code, label) VALUES (?, ?)")
            .bind(code)
            .bind(label)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to seed course mode '{}'", code))?;
    }
    Ok(())
}

fn spot(order: i64, name: &str, place_id: &str, category: &str, stay: i64, lat: f64, lng: f64) -> SpotInput {
    SpotInput {
        order,
        name: name.to_string(),
        place_id: place_id.to_string(),
        category: category.to_string(),
        stay_time_min: Some(stay),
        lat: Some(lat),
        lng: Some(lng),
    }
}

/// Sample system courses: one per mood, two spots each
fn sample_courses() -> Vec<(CreateCourseTemplateRequest, Vec<String>)> {
    vec![
        (
            CreateCourseTemplateRequest {
                title: "Relaxing stroll".to_string(),
                description: "Take it slow in a riverside park and a cafe".to_string(),
                mood: Mood::Relax,
                default_distance_m: Some(3200),
                default_duration_min: Some(90),
                mode_codes: vec![],
                is_public: true,
                spots: vec![
                    spot(1, "Riverside park", "dummy-1", "park", 30, 35.0, 135.0),
                    spot(2, "Cafe A", "dummy-2", "cafe", 45, 35.001, 135.002),
                ],
            },
            vec!["walk".to_string()],
        ),
        (
            CreateCourseTemplateRequest {
                title: "Gourmet tour".to_string(),
                description: "Ramen followed by something sweet".to_string(),
                mood: Mood::Hungry,
                default_distance_m: Some(2100),
                default_duration_min: Some(80),
                mode_codes: vec![],
                is_public: true,
                spots: vec![
                    spot(1, "Ramen shop", "dummy-3", "ramen", 40, 35.002, 135.001),
                    spot(2, "Sweets shop", "dummy-4", "sweets", 40, 35.003, 135.003),
                ],
            },
            vec!["walk".to_string(), "meal".to_string()],
        ),
        (
            CreateCourseTemplateRequest {
                title: "Sightseeing marathon".to_string(),
                description: "A shrine and an observation deck for the energetic".to_string(),
                mood: Mood::Active,
                default_distance_m: Some(5000),
                default_duration_min: Some(120),
                mode_codes: vec![],
                is_public: true,
                spots: vec![
                    spot(1, "Shrine", "dummy-5", "shrine", 30, 35.004, 135.004),
                    spot(2, "Observation deck", "dummy-6", "viewpoint", 45, 35.005, 135.006),
                ],
            },
            vec!["walk".to_string(), "sightseeing".to_string()],
        ),
    ]
}

/// Insert the sample courses as system templates.
///
/// Does nothing if the catalog already has templates. Returns the number of
/// templates inserted.
pub async fn seed_sample_courses(pool: &SqlitePool) -> Result<usize> {
    if CourseTemplateRepo::count(pool).await? > 0 {
        info!("Course templates already exist, skipping sample data");
        return Ok(0);
    }

    seed_course_modes(pool).await?;

    let courses = sample_courses();
    let total = courses.len();
    for (course, codes) in courses {
        let (modes, missing) = CourseTemplateRepo::resolve_modes(pool, &codes).await?;
        if !missing.is_empty() {
            anyhow::bail!("Sample course '{}' uses unknown modes: {:?}", course.title, missing);
        }
        let mode_ids: Vec<i64> = modes.iter().map(|m| m.id).collect();
        let template =
            CourseTemplateRepo::create(pool, TemplateOwner::System, &course, &mode_ids).await?;
        info!(template_id = template.id, title = %template.title, "Seeded sample course");
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_sample_courses_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::db::init(dir.path()).await.unwrap();

        assert_eq!(seed_sample_courses(&pool).await.unwrap(), 3);
        assert_eq!(seed_sample_courses(&pool).await.unwrap(), 0);
        assert_eq!(CourseTemplateRepo::count(&pool).await.unwrap(), 3);

        let listed = CourseTemplateRepo::list_visible(&pool, None, &Default::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|t| t.is_system && t.spots.len() == 2));
        assert_eq!(listed[1].modes.len(), 2);
    }
}
