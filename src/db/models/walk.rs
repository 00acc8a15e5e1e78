//! Walk session, spot visit and photo models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::{parse_trajectory, TrajectoryPoint};

#[derive(Debug, Clone, FromRow)]
pub struct WalkSession {
    pub id: i64,
    pub user_id: i64,
    pub course_template_id: Option<i64>,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub total_distance_m: Option<i64>,
    pub total_duration_sec: Option<i64>,
    pub trajectory: String,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

impl WalkSession {
    /// A session is finished once the finish operation has stamped `ended_at`
    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkSessionResponse {
    pub id: i64,
    pub user: i64,
    pub course_template: Option<i64>,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub total_distance_m: Option<i64>,
    pub total_duration_sec: Option<i64>,
    pub trajectory: Vec<TrajectoryPoint>,
    pub notes: String,
    pub is_finished: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<WalkSession> for WalkSessionResponse {
    fn from(session: WalkSession) -> Self {
        let is_finished = session.is_finished();
        Self {
            id: session.id,
            user: session.user_id,
            course_template: session.course_template_id,
            started_at: session.started_at,
            ended_at: session.ended_at,
            total_distance_m: session.total_distance_m,
            total_duration_sec: session.total_duration_sec,
            trajectory: parse_trajectory(&session.trajectory),
            notes: session.notes,
            is_finished,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// Session with its child records for the detail view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkSessionDetail {
    #[serde(flatten)]
    pub session: WalkSessionResponse,
    pub spot_visits: Vec<WalkSpotVisit>,
    pub photos: Vec<WalkPhotoResponse>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWalkSessionRequest {
    pub course_template: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
    /// Kept as raw JSON so a non-list value yields a field error instead of a rejection
    pub trajectory: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateWalkSessionRequest {
    pub course_template: Option<i64>,
    pub notes: Option<String>,
    pub trajectory: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FinishWalkSessionRequest {
    pub ended_at: Option<DateTime<Utc>>,
    pub total_distance_m: Option<i64>,
    pub total_duration_sec: Option<i64>,
    pub trajectory: Option<serde_json::Value>,
}

/// End-of-session fields after validation and derivation
#[derive(Debug, Clone)]
pub struct FinishWalkSession {
    pub ended_at: String,
    pub total_distance_m: Option<i64>,
    pub total_duration_sec: i64,
    pub trajectory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WalkSpotVisit {
    pub id: i64,
    #[serde(rename = "session")]
    pub session_id: i64,
    #[serde(rename = "course_spot_template")]
    pub course_spot_template_id: Option<i64>,
    pub name: String,
    pub place_id: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub arrived_at: Option<String>,
    pub left_at: Option<String>,
    pub stay_duration_sec: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSpotVisitRequest {
    pub course_spot_template: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub place_id: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub stay_duration_sec: Option<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct WalkPhoto {
    pub id: i64,
    pub session_id: i64,
    pub spot_visit_id: Option<i64>,
    pub image: String,
    pub taken_at: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub caption: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkPhotoResponse {
    pub id: i64,
    pub session: i64,
    pub spot_visit: Option<i64>,
    pub image: String,
    pub image_url: String,
    pub taken_at: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub caption: String,
    pub created_at: String,
}

impl From<WalkPhoto> for WalkPhotoResponse {
    fn from(photo: WalkPhoto) -> Self {
        let image_url = format!("/media/{}", photo.image);
        Self {
            id: photo.id,
            session: photo.session_id,
            spot_visit: photo.spot_visit_id,
            image: photo.image,
            image_url,
            taken_at: photo.taken_at,
            lat: photo.lat,
            lng: photo.lng,
            caption: photo.caption,
            created_at: photo.created_at,
        }
    }
}

/// Photo row to insert once the upload has been stored
#[derive(Debug, Clone, Default)]
pub struct NewWalkPhoto {
    pub spot_visit_id: Option<i64>,
    pub image: String,
    pub taken_at: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub caption: String,
}

/// Spot visit row to insert after validation
#[derive(Debug, Clone, Default)]
pub struct NewSpotVisit {
    pub course_spot_template_id: Option<i64>,
    pub name: String,
    pub place_id: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub arrived_at: Option<String>,
    pub left_at: Option<String>,
    pub stay_duration_sec: Option<i64>,
}
