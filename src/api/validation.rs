//! Input validation for API requests.
//!
//! This module provides validation functions for API request data,
//! ensuring all inputs meet the required format and constraints.
//!
//! For collecting multiple validation errors and returning them as an ApiError,
//! use the `ValidationErrorBuilder` from the `error` module.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{SpotInput, TrajectoryPoint};

use super::error::ValidationErrorBuilder;

lazy_static! {
    /// Regex for validating usernames (letters, digits and @/./+/-/_)
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();

    /// Regex for validating email addresses (pragmatic, not RFC 5322)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)+$"
    ).unwrap();
}

/// Validate a username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("This field is required".to_string());
    }

    if username.chars().count() > 150 {
        return Err("Username is too long (max 150 characters)".to_string());
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username may contain only letters, numbers, and @/./+/-/_ characters".to_string(),
        );
    }

    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("This field is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email address is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Enter a valid email address".to_string());
    }

    Ok(())
}

/// Validate a latitude in degrees
pub fn validate_latitude(lat: f64) -> Result<(), String> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err("Latitude must be between -90 and 90".to_string());
    }
    Ok(())
}

/// Validate a longitude in degrees
pub fn validate_longitude(lng: f64) -> Result<(), String> {
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err("Longitude must be between -180 and 180".to_string());
    }
    Ok(())
}

/// Validate an optional coordinate pair, adding errors under the given field names
pub fn check_coordinates(
    errors: &mut ValidationErrorBuilder,
    lat_field: &str,
    lat: Option<f64>,
    lng_field: &str,
    lng: Option<f64>,
) {
    if let Some(lat) = lat {
        if let Err(e) = validate_latitude(lat) {
            errors.add(lat_field, e);
        }
    }
    if let Some(lng) = lng {
        if let Err(e) = validate_longitude(lng) {
            errors.add(lng_field, e);
        }
    }
}

/// Validate a text field against a maximum length (in characters)
pub fn validate_max_len(value: &str, max: usize, label: &str) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{} is too long (max {} characters)", label, max));
    }
    Ok(())
}

/// Validate a required text field
pub fn validate_required(value: &str, max: usize, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("This field is required".to_string());
    }
    validate_max_len(value, max, label)
}

/// Validate an optional non-negative quantity (metres, minutes, seconds)
pub fn validate_non_negative(value: Option<i64>, label: &str) -> Result<(), String> {
    match value {
        Some(v) if v < 0 => Err(format!("{} must not be negative", label)),
        _ => Ok(()),
    }
}

/// Validate that an interval does not end before it starts
pub fn validate_time_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    message: &str,
) -> Result<(), String> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(message.to_string()),
        _ => Ok(()),
    }
}

/// Parse and validate a recorded trajectory.
///
/// The value must be a JSON list of `{lat, lng, timestamp}` objects with
/// valid coordinates and non-decreasing timestamps.
pub fn validate_trajectory(value: &serde_json::Value) -> Result<Vec<TrajectoryPoint>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| "trajectory must be a list".to_string())?;

    let mut points: Vec<TrajectoryPoint> = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let point: TrajectoryPoint = serde_json::from_value(item.clone()).map_err(|_| {
            format!(
                "trajectory[{}] must be an object with lat, lng and timestamp",
                i
            )
        })?;

        validate_latitude(point.lat).map_err(|e| format!("trajectory[{}]: {}", i, e))?;
        validate_longitude(point.lng).map_err(|e| format!("trajectory[{}]: {}", i, e))?;

        if let Some(prev) = points.last() {
            if point.timestamp < prev.timestamp {
                return Err(format!(
                    "trajectory[{}] is earlier than the previous point; timestamps must not decrease",
                    i
                ));
            }
        }
        points.push(point);
    }

    Ok(points)
}

/// Validate the spots of a course template, adding errors under `spots`
pub fn check_spots(errors: &mut ValidationErrorBuilder, spots: &[SpotInput]) {
    if spots.is_empty() {
        errors.add("spots", "A course needs at least one spot");
        return;
    }

    let mut seen_orders: Vec<i64> = Vec::with_capacity(spots.len());
    for (i, spot) in spots.iter().enumerate() {
        if spot.order < 1 {
            errors.add("spots", format!("spots[{}].order must be 1 or greater", i));
        } else if seen_orders.contains(&spot.order) {
            errors.add("spots", format!("spots[{}].order {} is used twice", i, spot.order));
        }
        seen_orders.push(spot.order);

        if let Err(e) = validate_required(&spot.name, 100, "Spot name") {
            errors.add("spots", format!("spots[{}].name: {}", i, e));
        }
        if let Err(e) = validate_required(&spot.place_id, 100, "Place id") {
            errors.add("spots", format!("spots[{}].place_id: {}", i, e));
        }
        if let Err(e) = validate_max_len(&spot.category, 50, "Category") {
            errors.add("spots", format!("spots[{}].category: {}", i, e));
        }
        if let Err(e) = validate_non_negative(spot.stay_time_min, "Stay time") {
            errors.add("spots", format!("spots[{}].stay_time_min: {}", i, e));
        }
        if let Some(Err(e)) = spot.lat.map(validate_latitude) {
            errors.add("spots", format!("spots[{}].lat: {}", i, e));
        }
        if let Some(Err(e)) = spot.lng.map(validate_longitude) {
            errors.add("spots", format!("spots[{}].lng: {}", i, e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spot(order: i64) -> SpotInput {
        SpotInput {
            order,
            name: "Park".to_string(),
            place_id: "place-1".to_string(),
            category: "park".to_string(),
            stay_time_min: Some(10),
            lat: Some(35.0),
            lng: Some(135.0),
        }
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("hanako").is_ok());
        assert!(validate_username("taro.yamada+walks@home").is_ok());

        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("walker@example.com").is_ok());
        assert!(validate_email("first.last@sub.example.co.jp").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("user@localhost").is_err());
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_latitude(35.68).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.5).is_err());
        assert!(validate_latitude(f64::NAN).is_err());

        assert!(validate_longitude(139.76).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(181.0).is_err());
    }

    #[test]
    fn test_validate_time_range() {
        let early = "2025-04-01T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let late = "2025-04-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();

        assert!(validate_time_range(Some(early), Some(late), "bad").is_ok());
        assert!(validate_time_range(Some(early), Some(early), "bad").is_ok());
        assert!(validate_time_range(None, Some(early), "bad").is_ok());
        assert_eq!(
            validate_time_range(Some(late), Some(early), "left before arriving"),
            Err("left before arriving".to_string())
        );
    }

    #[test]
    fn test_validate_trajectory_accepts_ordered_points() {
        let value = json!([
            {"lat": 35.0, "lng": 135.0, "timestamp": "2025-04-01T09:00:00Z"},
            {"lat": 35.001, "lng": 135.001, "timestamp": "2025-04-01T09:00:00Z"},
            {"lat": 35.002, "lng": 135.002, "timestamp": "2025-04-01T09:01:00Z"}
        ]);
        let points = validate_trajectory(&value).unwrap();
        assert_eq!(points.len(), 3);

        assert!(validate_trajectory(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_validate_trajectory_rejects_non_list() {
        let err = validate_trajectory(&json!({"lat": 35.0})).unwrap_err();
        assert_eq!(err, "trajectory must be a list");
        assert!(validate_trajectory(&json!("35.0,135.0")).is_err());
    }

    #[test]
    fn test_validate_trajectory_rejects_bad_points() {
        let missing_timestamp = json!([{"lat": 35.0, "lng": 135.0}]);
        assert!(validate_trajectory(&missing_timestamp).is_err());

        let out_of_range = json!([{"lat": 95.0, "lng": 135.0, "timestamp": "2025-04-01T09:00:00Z"}]);
        assert!(validate_trajectory(&out_of_range).unwrap_err().contains("Latitude"));

        let backwards = json!([
            {"lat": 35.0, "lng": 135.0, "timestamp": "2025-04-01T09:05:00Z"},
            {"lat": 35.0, "lng": 135.0, "timestamp": "2025-04-01T09:00:00Z"}
        ]);
        assert!(validate_trajectory(&backwards).unwrap_err().contains("trajectory[1]"));
    }

    #[test]
    fn test_check_spots() {
        let mut errors = ValidationErrorBuilder::new();
        check_spots(&mut errors, &[spot(1), spot(2)]);
        assert!(errors.is_empty());

        let mut errors = ValidationErrorBuilder::new();
        check_spots(&mut errors, &[]);
        assert!(!errors.is_empty());

        let mut errors = ValidationErrorBuilder::new();
        check_spots(&mut errors, &[spot(1), spot(1)]);
        assert!(!errors.is_empty());

        let mut errors = ValidationErrorBuilder::new();
        let mut bad = spot(0);
        bad.name = String::new();
        check_spots(&mut errors, &[bad]);
        assert!(!errors.is_empty());
    }
}
