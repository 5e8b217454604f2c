//! JSON data guard that logs request bodies.
//!
//! A drop-in replacement for `Json<T>` in handlers. Values under any
//! `password` key are replaced before the body reaches the log.
//!
//! A body that is valid JSON but does not fit `T` (a string where a number
//! belongs, say) fails with 400. The offending fields are cached on the
//! request as [`RejectedBody`] and the 400 catcher reports them the same
//! way handler validation does.

use std::io;

use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::{
    Data, Request,
    data::{self, FromData},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::api::error::FieldErrors;

pub struct LoggedJson<T>(pub T);

/// Field errors for a body that could not be read into the handler's type.
#[derive(Debug, Default)]
pub struct RejectedBody(pub Option<FieldErrors>);

impl<T> LoggedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for LoggedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Replaces every `password` value in `value`, at any depth.
pub fn redact_passwords(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if key.eq_ignore_ascii_case("password") {
                    *inner = Value::String("<redacted>".to_string());
                } else {
                    redact_passwords(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_passwords),
        _ => {}
    }
}

/// Works out which top-level fields of `body` do not fit `T` by reading
/// each one on its own. Every request type leaves its fields optional, so a
/// lone field only fails when its own value is wrong. Anything that cannot
/// be pinned to a field lands under `non_field_errors`.
pub fn mismatched_fields<T: DeserializeOwned>(
    body: &Value,
    err: &serde_json::Error,
) -> FieldErrors {
    let mut fields = FieldErrors::new();
    if let Value::Object(map) = body {
        for (key, value) in map {
            let single: Map<String, Value> =
                [(key.clone(), value.clone())].into_iter().collect();
            if let Err(e) = serde_json::from_value::<T>(Value::Object(single)) {
                fields.entry(key.clone()).or_default().push(e.to_string());
            }
        }
    }
    if fields.is_empty() {
        fields.insert("non_field_errors".to_string(), vec![err.to_string()]);
    }
    fields
}

#[rocket::async_trait]
impl<'r, T: DeserializeOwned> FromData<'r> for LoggedJson<T> {
    type Error = json::Error<'r>;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> data::Outcome<'r, Self> {
        let body = match Json::<Value>::from_data(req, data).await {
            data::Outcome::Success(body) => body.into_inner(),
            data::Outcome::Error((status, e)) => {
                if let json::Error::Parse(_, parse_err) = &e {
                    let mut fields = FieldErrors::new();
                    fields.insert(
                        "non_field_errors".to_string(),
                        vec![format!("JSON parse error - {}", parse_err)],
                    );
                    req.local_cache(|| RejectedBody(Some(fields)));
                }
                return data::Outcome::Error((status, e));
            }
            data::Outcome::Forward(f) => return data::Outcome::Forward(f),
        };

        let mut logged = body.clone();
        redact_passwords(&mut logged);

        match serde_json::from_value::<T>(body.clone()) {
            Ok(parsed) => {
                info!(
                    "API Request Body: {} {} | Data: {}",
                    req.method().as_str(),
                    req.uri().path(),
                    logged
                );
                data::Outcome::Success(LoggedJson(parsed))
            }
            Err(e) => {
                warn!(
                    "API Request Body rejected: {} {} | Data: {} | {}",
                    req.method().as_str(),
                    req.uri().path(),
                    logged,
                    e
                );
                let fields = mismatched_fields::<T>(&body, &e);
                req.local_cache(|| RejectedBody(Some(fields)));
                data::Outcome::Error((
                    Status::BadRequest,
                    json::Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)),
                ))
            }
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for LoggedJson<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Seat {
        name: Option<String>,
        table: Option<i32>,
        reward_points: Option<i32>,
    }

    fn fields_for(body: Value) -> FieldErrors {
        let err = serde_json::from_value::<Seat>(body.clone()).unwrap_err();
        mismatched_fields::<Seat>(&body, &err)
    }

    #[test]
    fn test_mismatched_fields_names_each_bad_field() {
        let fields = fields_for(json!({
            "name": 5,
            "table": 2,
            "reward_points": "ten",
            "unknown": true
        }));

        assert_eq!(fields.len(), 2);
        assert!(fields["name"][0].contains("invalid type"));
        assert!(fields["reward_points"][0].contains("\"ten\""));
    }

    #[test]
    fn test_mismatched_fields_without_an_object() {
        let fields = fields_for(json!(["Ada"]));
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["non_field_errors"]);
    }

    #[test]
    fn test_redact_passwords_at_any_depth() {
        let mut body = json!({
            "username": "boss",
            "password": "hunter2",
            "nested": [{"Password": "x", "keep": 1}]
        });
        redact_passwords(&mut body);

        assert_eq!(body["username"], "boss");
        assert_eq!(body["password"], "<redacted>");
        assert_eq!(body["nested"][0]["Password"], "<redacted>");
        assert_eq!(body["nested"][0]["keep"], 1);
    }
}
