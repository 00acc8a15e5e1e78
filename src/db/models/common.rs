//! Common types and utilities shared across models.

use serde::{Deserialize, Serialize};

/// Mood tag of a course template
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Relax,
    Hungry,
    Active,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relax => "relax",
            Self::Hungry => "hungry",
            Self::Active => "active",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relax" => Ok(Self::Relax),
            "hungry" => Ok(Self::Hungry),
            "active" => Ok(Self::Active),
            _ => Err(format!("Unknown mood: {}", s)),
        }
    }
}

impl From<String> for Mood {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// Who a course template belongs to.
///
/// Backed by the nullable `owner_id` column: NULL means the template ships
/// with the service and is read-only for every API caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateOwner {
    System,
    User(i64),
}

impl TemplateOwner {
    pub fn from_column(owner_id: Option<i64>) -> Self {
        match owner_id {
            Some(id) => Self::User(id),
            None => Self::System,
        }
    }

    pub fn as_column(&self) -> Option<i64> {
        match self {
            Self::System => None,
            Self::User(id) => Some(*id),
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }

    /// Only the owning user may change a template; system templates are never writable
    pub fn can_modify(&self, user_id: i64) -> bool {
        *self == Self::User(user_id)
    }
}

/// One recorded position of a walk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrajectoryPoint {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Helper to parse the trajectory JSON column
pub fn parse_trajectory(json: &str) -> Vec<TrajectoryPoint> {
    serde_json::from_str(json).unwrap_or_default()
}

/// Helper to serialize a trajectory for the database
pub fn serialize_trajectory(points: &[TrajectoryPoint]) -> String {
    serde_json::to_string(points).unwrap_or_else(|_| "[]".to_string())
}
