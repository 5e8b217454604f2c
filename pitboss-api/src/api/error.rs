//! Error responses shared by every endpoint.
//!
//! Handlers return `Result<_, ApiError>`. Each variant maps to one status
//! code and renders as an [`ErrorResponse`] body.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder, status};
use rocket::serde::json::Json;
use serde::Serialize;
use ts_rs::TS;

use crate::models::{AmountInput, Money};

/// Messages per request field.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

#[derive(Debug)]
pub enum ApiError {
    /// One or more fields failed validation (400).
    Validation(FieldErrors),
    /// The request as a whole is unacceptable (400).
    BadRequest(String),
    NotFound(String),
    Database(diesel::result::Error),
}

impl ApiError {
    /// A validation error on a single field.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(name.to_string(), vec![message.into()]);
        ApiError::Validation(fields)
    }

    pub fn not_found(what: &str, id: i32) -> Self {
        ApiError::NotFound(format!("{} {} not found", what, id))
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Database(_) => Status::InternalServerError,
        }
    }
}

/// Whether `e` is a UNIQUE constraint failure.
pub fn is_unique_violation(e: &diesel::result::Error) -> bool {
    matches!(
        e,
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _
        )
    )
}

impl From<diesel::result::Error> for ApiError {
    fn from(e: diesel::result::Error) -> Self {
        ApiError::Database(e)
    }
}

impl From<ApiError> for status::Custom<Json<ErrorResponse>> {
    fn from(e: ApiError) -> Self {
        let code = e.status();
        let body = match e {
            ApiError::Validation(fields) => ErrorResponse {
                error: "Validation failed".to_string(),
                fields: Some(fields),
            },
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => ErrorResponse {
                error: msg,
                fields: None,
            },
            ApiError::Database(db_err) => {
                error!("Database error: {:?}", db_err);
                ErrorResponse {
                    error: "Internal server error".to_string(),
                    fields: None,
                }
            }
        };
        status::Custom(code, Json(body))
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        status::Custom::<Json<ErrorResponse>>::from(self).respond_to(req)
    }
}

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NEGATIVE: &str = "Ensure this value is greater than or equal to 0.";
pub const BAD_DATETIME: &str = "Datetime has wrong format. Use one of these formats instead: \
                                YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].";

/// Collects field errors while a request body is checked, so one response
/// reports every bad field.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Checks an optional text field: trims it, rejects blanks and values
    /// longer than `max_len` characters.
    pub fn text(&mut self, field: &str, value: Option<&String>, max_len: usize) -> Option<String> {
        let value = value?.trim();
        if value.is_empty() {
            self.add(field, BLANK);
            return None;
        }
        if value.chars().count() > max_len {
            self.add(
                field,
                format!("Ensure this field has no more than {} characters.", max_len),
            );
            return None;
        }
        Some(value.to_string())
    }

    /// Like [`Validator::text`], but a missing value is an error too.
    pub fn required_text(
        &mut self,
        field: &str,
        value: Option<&String>,
        max_len: usize,
    ) -> Option<String> {
        if value.is_none() {
            self.add(field, REQUIRED);
            return None;
        }
        self.text(field, value, max_len)
    }

    pub fn required<T: Copy>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.add(field, REQUIRED);
        }
        value
    }

    /// Parses a monetary amount that may not be negative.
    pub fn amount(&mut self, field: &str, value: Option<&AmountInput>) -> Option<Money> {
        match value?.parse() {
            Ok(money) if money.is_negative() => {
                self.add(field, NEGATIVE);
                None
            }
            Ok(money) => Some(money),
            Err(e) => {
                self.add(field, e.to_string());
                None
            }
        }
    }

    /// Parses a monetary amount that may be negative, e.g. a buy-in delta.
    pub fn signed_amount(&mut self, field: &str, value: Option<&AmountInput>) -> Option<Money> {
        match value?.parse() {
            Ok(money) => Some(money),
            Err(e) => {
                self.add(field, e.to_string());
                None
            }
        }
    }

    /// Parses an ISO 8601 timestamp. Offsets are converted to UTC; values
    /// without one are taken as UTC.
    pub fn datetime(&mut self, field: &str, value: Option<&String>) -> Option<NaiveDateTime> {
        let value = value?.trim();
        match parse_datetime(value) {
            Some(parsed) => Some(parsed),
            None => {
                self.add(field, BAD_DATETIME);
                None
            }
        }
    }

    pub fn non_negative(&mut self, field: &str, value: Option<i32>) -> Option<i32> {
        match value {
            Some(v) if v < 0 => {
                self.add(field, NEGATIVE);
                None
            }
            other => other,
        }
    }

    /// Returns the collected errors, if any.
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Some(with_offset.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_collects_every_field() {
        let mut v = Validator::new();
        let bad_amount = AmountInput::Text("12.345".to_string());
        let negative = AmountInput::Text("-1.00".to_string());

        assert!(v.required_text("name", None, 50).is_none());
        assert!(v.amount("buy_in", Some(&bad_amount)).is_none());
        assert!(v.amount("cash_out", Some(&negative)).is_none());
        assert!(v.text("description", Some(&"   ".to_string()), 10).is_none());

        match v.finish() {
            Err(ApiError::Validation(fields)) => {
                assert_eq!(fields["name"], vec![REQUIRED]);
                assert_eq!(
                    fields["buy_in"],
                    vec!["Ensure that there are no more than 2 decimal places."]
                );
                assert_eq!(fields["cash_out"], vec![NEGATIVE]);
                assert_eq!(fields["description"], vec![BLANK]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_text_length_limit() {
        let mut v = Validator::new();
        let long = "x".repeat(51);
        assert!(v.text("name", Some(&long), 50).is_none());
        assert_eq!(v.text("other", Some(&" ok ".to_string()), 50), Some("ok".to_string()));
        match v.finish() {
            Err(ApiError::Validation(fields)) => {
                assert_eq!(fields.len(), 1);
                assert!(fields.contains_key("name"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = NaiveDateTime::parse_from_str("2025-03-14 20:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        assert_eq!(parse_datetime("2025-03-14T20:00:00"), Some(expected));
        assert_eq!(parse_datetime("2025-03-14T20:00"), Some(expected));
        assert_eq!(parse_datetime("2025-03-14T20:00:00Z"), Some(expected));
        assert_eq!(parse_datetime("2025-03-14T22:00:00+02:00"), Some(expected));
        assert_eq!(parse_datetime("yesterday"), None);
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(ApiError::field("name", REQUIRED).status(), Status::BadRequest);
        assert_eq!(ApiError::not_found("Pit", 3).status(), Status::NotFound);
        assert_eq!(
            ApiError::from(diesel::result::Error::NotFound).status(),
            Status::InternalServerError
        );
    }
}
