//! Walk session endpoints: the session lifecycle (start, update, finish,
//! delete) and the spot visits and photos appended to a session.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::{
    now, parse_timestamp, serialize_trajectory, timestamp, CourseTemplateRepo,
    CreateSpotVisitRequest, CreateWalkSessionRequest, FinishWalkSession,
    FinishWalkSessionRequest, NewSpotVisit, NewWalkPhoto, UpdateWalkSessionRequest, User,
    WalkPhotoResponse, WalkSession, WalkSessionDetail, WalkSessionRepo, WalkSessionResponse,
    WalkSpotVisit,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiJsonOrDefault, ApiPath};
use super::media;
use super::validation::{
    check_coordinates, validate_max_len, validate_non_negative, validate_time_range,
    validate_trajectory,
};

fn session_not_found() -> ApiError {
    ApiError::not_found("Walk session not found")
}

/// Load a session the caller owns, 404 for anything else
async fn owned_session(state: &AppState, id: i64, user: &User) -> Result<WalkSession, ApiError> {
    WalkSessionRepo::find_owned(&state.db, id, user.id)
        .await?
        .ok_or_else(session_not_found)
}

/// Load the parent session of a child resource.
///
/// A missing session is 404; a session owned by someone else is 403.
async fn parent_session(state: &AppState, id: i64, user: &User) -> Result<WalkSession, ApiError> {
    let session = WalkSessionRepo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(session_not_found)?;

    if session.user_id != user.id {
        tracing::warn!(session_id = id, user_id = user.id, "Rejected access to another user's walk session");
        return Err(ApiError::forbidden("This walk session does not belong to you."));
    }
    Ok(session)
}

/// Check that a referenced template exists and is visible to the caller
async fn check_template(
    state: &AppState,
    errors: &mut ValidationErrorBuilder,
    template_id: Option<i64>,
    user: &User,
) -> Result<(), ApiError> {
    if let Some(template_id) = template_id {
        if CourseTemplateRepo::find_visible(&state.db, template_id, Some(user.id))
            .await?
            .is_none()
        {
            errors.add(
                "course_template",
                format!("Invalid pk \"{}\" - object does not exist.", template_id),
            );
        }
    }
    Ok(())
}

/// A spot is usable when its template is visible to the caller
async fn spot_visible(state: &AppState, spot_id: i64, user: &User) -> Result<bool, ApiError> {
    let Some(spot) = CourseTemplateRepo::find_spot(&state.db, spot_id).await? else {
        return Ok(false);
    };
    let template =
        CourseTemplateRepo::find_visible(&state.db, spot.course_template_id, Some(user.id))
            .await?;
    Ok(template.is_some())
}

/// Validate a raw trajectory value and serialize it for storage
fn check_trajectory(
    errors: &mut ValidationErrorBuilder,
    value: Option<&serde_json::Value>,
) -> Option<String> {
    let value = value?;
    match validate_trajectory(value) {
        Ok(points) => Some(serialize_trajectory(&points)),
        Err(e) => {
            errors.add("trajectory", e);
            None
        }
    }
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<WalkSessionResponse>>, ApiError> {
    let sessions = WalkSessionRepo::list_for_user(&state.db, user.id).await?;
    Ok(Json(sessions.into_iter().map(WalkSessionResponse::from).collect()))
}

/// Start a walk session
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(req): ApiJson<CreateWalkSessionRequest>,
) -> Result<(StatusCode, Json<WalkSessionResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    check_template(&state, &mut errors, req.course_template, &user).await?;
    let trajectory = check_trajectory(&mut errors, req.trajectory.as_ref());
    errors.finish()?;

    let started_at = req.started_at.map(timestamp).unwrap_or_else(now);

    let session = WalkSessionRepo::create(
        &state.db,
        user.id,
        req.course_template,
        &started_at,
        &req.notes,
        trajectory.as_deref().unwrap_or("[]"),
    )
    .await?;

    tracing::info!(
        session_id = session.id,
        user_id = user.id,
        course_template = ?session.course_template_id,
        "Started walk session"
    );

    Ok((StatusCode::CREATED, Json(WalkSessionResponse::from(session))))
}

/// Session detail with its spot visits and photos
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<WalkSessionDetail>, ApiError> {
    let session = owned_session(&state, id, &user).await?;
    let spot_visits = WalkSessionRepo::list_spot_visits(&state.db, id).await?;
    let photos = WalkSessionRepo::list_photos(&state.db, id).await?;

    Ok(Json(WalkSessionDetail {
        session: WalkSessionResponse::from(session),
        spot_visits,
        photos: photos.into_iter().map(WalkPhotoResponse::from).collect(),
    }))
}

/// Partial update of an open session
pub async fn update_session(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateWalkSessionRequest>,
) -> Result<Json<WalkSessionResponse>, ApiError> {
    let session = owned_session(&state, id, &user).await?;
    if session.is_finished() {
        return Err(ApiError::conflict("Finished walk sessions are read-only."));
    }

    let mut errors = ValidationErrorBuilder::new();
    check_template(&state, &mut errors, req.course_template, &user).await?;
    let trajectory = check_trajectory(&mut errors, req.trajectory.as_ref());
    errors.finish()?;

    // Finished between the check above and the write
    let session = WalkSessionRepo::update_open(
        &state.db,
        id,
        user.id,
        req.course_template,
        req.notes.as_deref(),
        trajectory.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::conflict("Finished walk sessions are read-only."))?;

    Ok(Json(WalkSessionResponse::from(session)))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let images = WalkSessionRepo::delete_owned(&state.db, id, user.id)
        .await?
        .ok_or_else(session_not_found)?;

    media::remove_files(&state.config.server.upload_dir, &images).await;

    tracing::info!(session_id = id, user_id = user.id, photos = images.len(), "Deleted walk session");
    Ok(StatusCode::NO_CONTENT)
}

/// Stamp the end-of-session fields.
///
/// Finishing again overwrites the previous values. Client totals are taken
/// as reported; a missing duration is derived from the timestamps. The body
/// may be omitted entirely.
pub async fn finish_session(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<i64>,
    ApiJsonOrDefault(req): ApiJsonOrDefault<FinishWalkSessionRequest>,
) -> Result<Json<WalkSessionResponse>, ApiError> {
    let session = owned_session(&state, id, &user).await?;

    let ended_at = req.ended_at.unwrap_or_else(Utc::now);
    let started_at = parse_timestamp(&session.started_at);

    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_time_range(
        started_at,
        Some(ended_at),
        "ended_at must not be earlier than started_at",
    ) {
        errors.add("ended_at", e);
    }
    if let Err(e) = validate_non_negative(req.total_distance_m, "Distance") {
        errors.add("total_distance_m", e);
    }
    if let Err(e) = validate_non_negative(req.total_duration_sec, "Duration") {
        errors.add("total_duration_sec", e);
    }
    let trajectory = check_trajectory(&mut errors, req.trajectory.as_ref());
    errors.finish()?;

    let total_duration_sec = match (req.total_duration_sec, started_at) {
        (Some(secs), _) => secs,
        (None, Some(started_at)) => (ended_at - started_at).num_seconds(),
        (None, None) => 0,
    };

    let finish = FinishWalkSession {
        ended_at: timestamp(ended_at),
        total_distance_m: req.total_distance_m,
        total_duration_sec,
        trajectory,
    };

    let session = WalkSessionRepo::finish(&state.db, id, user.id, &finish)
        .await?
        .ok_or_else(session_not_found)?;

    tracing::info!(
        session_id = id,
        user_id = user.id,
        total_duration_sec,
        total_distance_m = ?finish.total_distance_m,
        "Finished walk session"
    );

    Ok(Json(WalkSessionResponse::from(session)))
}

// ---------------------------------------------------------------------------
// Spot visits
// ---------------------------------------------------------------------------

pub async fn add_spot_visit(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(session_id): ApiPath<i64>,
    ApiJson(req): ApiJson<CreateSpotVisitRequest>,
) -> Result<(StatusCode, Json<WalkSpotVisit>), ApiError> {
    parent_session(&state, session_id, &user).await?;

    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_max_len(&req.name, 100, "Name") {
        errors.add("name", e);
    }
    if let Err(e) = validate_max_len(&req.place_id, 100, "Place id") {
        errors.add("place_id", e);
    }
    check_coordinates(&mut errors, "lat", req.lat, "lng", req.lng);
    if let Err(e) = validate_time_range(
        req.arrived_at,
        req.left_at,
        "left_at must not be earlier than arrived_at",
    ) {
        errors.add("left_at", e);
    }
    if let Err(e) = validate_non_negative(req.stay_duration_sec, "Stay duration") {
        errors.add("stay_duration_sec", e);
    }
    if let Some(spot_id) = req.course_spot_template {
        if !spot_visible(&state, spot_id, &user).await? {
            errors.add(
                "course_spot_template",
                format!("Invalid pk \"{}\" - object does not exist.", spot_id),
            );
        }
    }
    errors.finish()?;

    let stay_duration_sec = req.stay_duration_sec.or_else(|| match (req.arrived_at, req.left_at) {
        (Some(arrived), Some(left)) => Some((left - arrived).num_seconds()),
        _ => None,
    });

    let visit = NewSpotVisit {
        course_spot_template_id: req.course_spot_template,
        name: req.name,
        place_id: req.place_id,
        lat: req.lat,
        lng: req.lng,
        arrived_at: req.arrived_at.map(timestamp),
        left_at: req.left_at.map(timestamp),
        stay_duration_sec,
    };

    let visit = WalkSessionRepo::add_spot_visit(&state.db, session_id, &visit).await?;
    tracing::info!(session_id, spot_visit_id = visit.id, "Recorded spot visit");

    Ok((StatusCode::CREATED, Json(visit)))
}

pub async fn list_spot_visits(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(session_id): ApiPath<i64>,
) -> Result<Json<Vec<WalkSpotVisit>>, ApiError> {
    parent_session(&state, session_id, &user).await?;
    Ok(Json(WalkSessionRepo::list_spot_visits(&state.db, session_id).await?))
}

// ---------------------------------------------------------------------------
// Photos
// ---------------------------------------------------------------------------

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Uploaded file is too large")
    } else {
        ApiError::bad_request(err.body_text())
    }
}

/// Parse an optional multipart text value; blank means absent
fn parse_optional<T: std::str::FromStr>(
    errors: &mut ValidationErrorBuilder,
    field: &str,
    value: Option<String>,
    message: &str,
) -> Option<T> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.add(field, message);
            None
        }
    }
}

/// Upload a photo for a session (multipart form)
///
/// Fields: `image` (required file), `spot_visit`, `taken_at`, `lat`, `lng`, `caption`.
pub async fn add_photo(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(session_id): ApiPath<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<WalkPhotoResponse>), ApiError> {
    parent_session(&state, session_id, &user).await?;

    let mut image: Option<(Option<String>, Option<String>, Vec<u8>)> = None;
    let mut spot_visit = None;
    let mut taken_at = None;
    let mut lat = None;
    let mut lng = None;
    let mut caption = String::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                image = Some((file_name, content_type, data.to_vec()));
            }
            "spot_visit" => spot_visit = Some(field.text().await.map_err(multipart_error)?),
            "taken_at" => taken_at = Some(field.text().await.map_err(multipart_error)?),
            "lat" => lat = Some(field.text().await.map_err(multipart_error)?),
            "lng" => lng = Some(field.text().await.map_err(multipart_error)?),
            "caption" => caption = field.text().await.map_err(multipart_error)?,
            _ => {}
        }
    }

    let mut errors = ValidationErrorBuilder::new();

    let spot_visit: Option<i64> =
        parse_optional(&mut errors, "spot_visit", spot_visit, "A valid integer is required.");
    let taken_at: Option<DateTime<Utc>> =
        parse_optional(&mut errors, "taken_at", taken_at, "Datetime has wrong format.");
    let lat: Option<f64> = parse_optional(&mut errors, "lat", lat, "A valid number is required.");
    let lng: Option<f64> = parse_optional(&mut errors, "lng", lng, "A valid number is required.");
    check_coordinates(&mut errors, "lat", lat, "lng", lng);

    if let Err(e) = validate_max_len(&caption, 255, "Caption") {
        errors.add("caption", e);
    }

    if let Some(visit_id) = spot_visit {
        let belongs = WalkSessionRepo::find_spot_visit(&state.db, visit_id)
            .await?
            .is_some_and(|v| v.session_id == session_id);
        if !belongs {
            errors.add("spot_visit", "Spot visit does not belong to this walk session.");
        }
    }

    let ext = match image {
        None => {
            errors.add("image", "No file was submitted.");
            None
        }
        Some((ref file_name, ref content_type, _)) => {
            match media::image_extension(file_name.as_deref(), content_type.as_deref()) {
                Ok(ext) => Some(ext),
                Err(e) => {
                    errors.add("image", e.to_string());
                    None
                }
            }
        }
    };
    errors.finish()?;

    let (Some(ext), Some((_, _, data))) = (ext, image) else {
        return Err(ApiError::validation_field("image", "No file was submitted."));
    };

    let upload_dir = &state.config.server.upload_dir;
    let relative = media::save_photo(upload_dir, session_id, &ext, &data).await?;

    let photo = NewWalkPhoto {
        spot_visit_id: spot_visit,
        image: relative.clone(),
        taken_at: taken_at.map(timestamp),
        lat,
        lng,
        caption,
    };

    let photo = match WalkSessionRepo::add_photo(&state.db, session_id, &photo).await {
        Ok(photo) => photo,
        Err(e) => {
            media::remove_files(upload_dir, &[relative]).await;
            return Err(e.into());
        }
    };

    tracing::info!(session_id, photo_id = photo.id, bytes = data.len(), "Stored walk photo");

    Ok((StatusCode::CREATED, Json(WalkPhotoResponse::from(photo))))
}

pub async fn list_photos(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(session_id): ApiPath<i64>,
) -> Result<Json<Vec<WalkPhotoResponse>>, ApiError> {
    parent_session(&state, session_id, &user).await?;
    let photos = WalkSessionRepo::list_photos(&state.db, session_id).await?;
    Ok(Json(photos.into_iter().map(WalkPhotoResponse::from).collect()))
}
