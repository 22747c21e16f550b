//! Decoding of web-app payloads into validated records.
//!
//! Each record shape deserializes first and then runs its own validity predicate. A payload
//! is only accepted when both steps succeed; [`Payload::decode`] tries every known shape in
//! turn and reports which one matched.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;

use crate::model::{ChatId, Trip, TripRequest};

pub const MAX_LOCATION_CHARS: usize = 128;
pub const MAX_SEATS: u32 = 8;

/// How far in the past a departure may be and still be accepted (clock skew, slow forms).
pub fn past_grace() -> Duration {
    Duration::hours(1)
}

pub fn max_horizon() -> Duration {
    Duration::days(365)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is empty")]
    EmptyLocation(&'static str),
    #[error("{0} exceeds {max} characters", max = MAX_LOCATION_CHARS)]
    LocationTooLong(&'static str),
    #[error("origin and destination are the same")]
    SameRoute,
    #[error("time {0} is in the past")]
    TimeInPast(DateTime<Utc>),
    #[error("time {0} is too far in the future")]
    TimeTooFar(DateTime<Utc>),
    #[error("seat count {0} is outside 1..={max}", max = MAX_SEATS)]
    Seats(u32),
    #[error("chat id is missing")]
    MissingChat,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid payload: {0}")]
    Invalid(#[from] ValidationError),
}

/// A record shape that can be decoded from a web-app payload.
pub trait Validated: DeserializeOwned {
    const SHAPE: &'static str;

    fn validate_at(&self, now: DateTime<Utc>) -> Result<(), ValidationError>;
}

fn check_route(origin: &str, destination: &str) -> Result<(), ValidationError> {
    for (field, value) in [("origin", origin), ("destination", destination)] {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyLocation(field));
        }
        if trimmed.chars().count() > MAX_LOCATION_CHARS {
            return Err(ValidationError::LocationTooLong(field));
        }
    }
    if origin.trim().to_lowercase() == destination.trim().to_lowercase() {
        return Err(ValidationError::SameRoute);
    }
    Ok(())
}

fn check_time(time: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), ValidationError> {
    if time < now - past_grace() {
        return Err(ValidationError::TimeInPast(time));
    }
    if time > now + max_horizon() {
        return Err(ValidationError::TimeTooFar(time));
    }
    Ok(())
}

fn check_chat(chat_id: ChatId) -> Result<(), ValidationError> {
    if chat_id.0 == 0 {
        return Err(ValidationError::MissingChat);
    }
    Ok(())
}

impl Validated for Trip {
    const SHAPE: &'static str = "trip";

    fn validate_at(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        check_route(&self.origin, &self.destination)?;
        check_time(self.departure_time, now)?;
        if self.seats == 0 || self.seats > MAX_SEATS {
            return Err(ValidationError::Seats(self.seats));
        }
        check_chat(self.chat_id)
    }
}

impl Validated for TripRequest {
    const SHAPE: &'static str = "trip_request";

    fn validate_at(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        check_route(&self.origin, &self.destination)?;
        check_time(self.desired_time, now)?;
        check_chat(self.chat_id)
    }
}

pub fn decode_at<T: Validated>(raw: &str, now: DateTime<Utc>) -> Result<T, DecodeError> {
    let record: T = serde_json::from_str(raw)?;
    record.validate_at(now)?;
    Ok(record)
}

/// Outcome of matching a raw payload against every known record shape.
#[derive(Debug)]
pub enum Payload {
    Trip(Trip),
    TripRequest(TripRequest),
    Unrecognized { trip: DecodeError, request: DecodeError },
}

impl Payload {
    pub fn decode(raw: &str) -> Self {
        Self::decode_at(raw, Utc::now())
    }

    pub fn decode_at(raw: &str, now: DateTime<Utc>) -> Self {
        let trip = match decode_at::<Trip>(raw, now) {
            Ok(trip) => return Payload::Trip(trip),
            Err(e) => e,
        };
        tracing::debug!(shape = Trip::SHAPE, error = %trip, "payload rejected");

        match decode_at::<TripRequest>(raw, now) {
            Ok(request) => Payload::TripRequest(request),
            Err(request) => {
                tracing::debug!(shape = TripRequest::SHAPE, error = %request, "payload rejected");
                Payload::Unrecognized { trip, request }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 5, 1, 8, 0, 0).unwrap()
    }

    const TRIP: &str = r#"{
        "origin": "Bishkek",
        "destination": "Osh",
        "departureTime": "2030-05-01T10:00:00Z",
        "seats": 2,
        "chatId": 42
    }"#;

    const REQUEST: &str = r#"{
        "origin": "Bishkek",
        "destination": "Osh",
        "desiredTime": "2030-05-01T16:00:00+06:00",
        "chatId": 42
    }"#;

    #[test]
    fn test_trip_payload_decodes_as_trip() {
        match Payload::decode_at(TRIP, now()) {
            Payload::Trip(trip) => {
                assert_eq!(trip.seats, 2);
                assert_eq!(trip.chat_id, ChatId(42));
            }
            other => panic!("expected trip, got {:?}", other),
        }
    }

    #[test]
    fn test_request_payload_falls_through_to_request() {
        match Payload::decode_at(REQUEST, now()) {
            Payload::TripRequest(request) => {
                assert_eq!(request.desired_time, Utc.with_ymd_and_hms(2030, 5, 1, 10, 0, 0).unwrap());
            }
            other => panic!("expected trip request, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_trip_is_not_accepted() {
        let zero_seats = TRIP.replace("\"seats\": 2", "\"seats\": 0");
        let err = decode_at::<Trip>(&zero_seats, now()).unwrap_err();
        assert!(matches!(err, DecodeError::Invalid(ValidationError::Seats(0))));

        // Still not a request either: no desiredTime.
        assert!(matches!(
            Payload::decode_at(&zero_seats, now()),
            Payload::Unrecognized { .. }
        ));
    }

    #[test]
    fn test_trip_with_too_many_seats_is_rejected() {
        let crowded = TRIP.replace("\"seats\": 2", "\"seats\": 40");
        assert!(matches!(
            decode_at::<Trip>(&crowded, now()),
            Err(DecodeError::Invalid(ValidationError::Seats(40)))
        ));
    }

    #[test]
    fn test_blank_and_identical_routes_are_rejected() {
        let blank = REQUEST.replace("\"Bishkek\"", "\"   \"");
        assert!(matches!(
            decode_at::<TripRequest>(&blank, now()),
            Err(DecodeError::Invalid(ValidationError::EmptyLocation("origin")))
        ));

        let same = REQUEST.replace("\"Osh\"", "\" bishkek \"");
        assert!(matches!(
            decode_at::<TripRequest>(&same, now()),
            Err(DecodeError::Invalid(ValidationError::SameRoute))
        ));
    }

    #[test]
    fn test_implausible_times_are_rejected() {
        let past = TRIP.replace("2030-05-01T10:00:00Z", "2030-04-30T10:00:00Z");
        assert!(matches!(
            decode_at::<Trip>(&past, now()),
            Err(DecodeError::Invalid(ValidationError::TimeInPast(_)))
        ));

        let far = TRIP.replace("2030-05-01T10:00:00Z", "2032-05-01T10:00:00Z");
        assert!(matches!(
            decode_at::<Trip>(&far, now()),
            Err(DecodeError::Invalid(ValidationError::TimeTooFar(_)))
        ));
    }

    #[test]
    fn test_missing_chat_is_rejected() {
        let anonymous = REQUEST.replace("\"chatId\": 42", "\"chatId\": 0");
        assert!(matches!(
            decode_at::<TripRequest>(&anonymous, now()),
            Err(DecodeError::Invalid(ValidationError::MissingChat))
        ));
    }

    #[test]
    fn test_garbage_is_unrecognized() {
        match Payload::decode_at("not json at all", now()) {
            Payload::Unrecognized { trip, request } => {
                assert!(matches!(trip, DecodeError::Malformed(_)));
                assert!(matches!(request, DecodeError::Malformed(_)));
            }
            other => panic!("expected unrecognized, got {:?}", other),
        }
    }
}
