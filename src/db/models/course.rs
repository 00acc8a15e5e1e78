//! Course catalog models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::{Mood, TemplateOwner};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct CourseMode {
    pub id: i64,
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct CourseTemplate {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub mood: String,
    pub default_distance_m: Option<i64>,
    pub default_duration_min: Option<i64>,
    pub is_active: bool,
    pub is_public: bool,
    pub owner_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl CourseTemplate {
    pub fn owner(&self) -> TemplateOwner {
        TemplateOwner::from_column(self.owner_id)
    }

    /// Visibility rule: owners see their own templates, everyone else only
    /// sees public templates that are still active.
    pub fn is_visible_to(&self, caller: Option<i64>) -> bool {
        match (self.owner(), caller) {
            (TemplateOwner::User(owner), Some(user)) if owner == user => true,
            _ => self.is_public && self.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct CourseSpotTemplate {
    pub id: i64,
    #[serde(skip)]
    pub course_template_id: i64,
    pub order: i64,
    pub name: String,
    pub place_id: String,
    pub category: String,
    pub stay_time_min: Option<i64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Template with its spots and modes, as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseTemplateResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub mood: Mood,
    pub default_distance_m: Option<i64>,
    pub default_duration_min: Option<i64>,
    pub modes: Vec<CourseMode>,
    pub is_active: bool,
    pub is_public: bool,
    pub owner: Option<i64>,
    pub is_system: bool,
    pub spots: Vec<CourseSpotTemplate>,
    pub created_at: String,
    pub updated_at: String,
}

impl CourseTemplateResponse {
    pub fn new(
        template: CourseTemplate,
        modes: Vec<CourseMode>,
        spots: Vec<CourseSpotTemplate>,
    ) -> Self {
        let owner = template.owner();
        Self {
            id: template.id,
            title: template.title,
            description: template.description,
            mood: Mood::from(template.mood),
            default_distance_m: template.default_distance_m,
            default_duration_min: template.default_duration_min,
            modes,
            is_active: template.is_active,
            is_public: template.is_public,
            owner: owner.as_column(),
            is_system: owner.is_system(),
            spots,
            created_at: template.created_at,
            updated_at: template.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotInput {
    pub order: i64,
    pub name: String,
    pub place_id: String,
    #[serde(default)]
    pub category: String,
    pub stay_time_min: Option<i64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseTemplateRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mood: Mood,
    pub default_distance_m: Option<i64>,
    pub default_duration_min: Option<i64>,
    #[serde(default)]
    pub mode_codes: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub spots: Vec<SpotInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCourseTemplateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub mood: Option<Mood>,
    pub default_distance_m: Option<i64>,
    pub default_duration_min: Option<i64>,
    pub mode_codes: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_public: Option<bool>,
    pub spots: Option<Vec<SpotInput>>,
}

/// Query filters for the template list
#[derive(Debug, Default, Deserialize)]
pub struct CourseTemplateFilter {
    pub mood: Option<Mood>,
    pub mode: Option<String>,
    #[serde(default)]
    pub mine: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(owner_id: Option<i64>, is_public: bool, is_active: bool) -> CourseTemplate {
        CourseTemplate {
            id: 1,
            title: String::new(),
            description: String::new(),
            mood: "relax".to_string(),
            default_distance_m: None,
            default_duration_min: None,
            is_active,
            is_public,
            owner_id,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_private_template_only_visible_to_owner() {
        let t = template(Some(1), false, true);
        assert!(t.is_visible_to(Some(1)));
        assert!(!t.is_visible_to(Some(2)));
        assert!(!t.is_visible_to(None));
    }

    #[test]
    fn test_inactive_public_template_hidden_from_others() {
        let t = template(Some(1), true, false);
        assert!(t.is_visible_to(Some(1)));
        assert!(!t.is_visible_to(Some(2)));
    }

    #[test]
    fn test_public_system_template_visible_to_anonymous() {
        let t = template(None, true, true);
        assert!(t.is_visible_to(None));
        assert!(t.is_visible_to(Some(5)));
    }
}
