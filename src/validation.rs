//! Request validation: JSON body extraction plus `validator` schemas narrowed into typed commands.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::{Map, Value};
use validator::{Validate, ValidationErrors};

use crate::error::{AppError, AppResult, FieldError};

/// A request schema that, once its constraints hold, narrows into a typed command.
pub trait Schema: Validate {
    type Output;

    fn narrow(self) -> Self::Output;
}

/// Runs every constraint of `payload` and reports all violations together.
pub fn validate<T: Schema>(payload: T) -> AppResult<T::Output> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(field_errors(&e)))?;
    Ok(payload.narrow())
}

pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                FieldError::new(field.to_string(), message)
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

/// JSON body extractor whose rejections use the validation error shape.
///
/// Syntax errors are reported on the `body` field. A key holding a value of the wrong type is
/// reported on that key, together with every constraint the remaining keys violate.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await.map_err(|e| {
            tracing::warn!(error = %e, "rejected request body");
            AppError::Validation(vec![FieldError::new("body", e.body_text())])
        })?;
        Ok(JsonBody(from_json_value(value)?))
    }
}

/// Deserializes `value` into `T`, collecting one error per mistyped key.
///
/// Relies on every field of `T` being optional, so that a single key can be checked on its own.
pub fn from_json_value<T>(value: Value) -> AppResult<T>
where
    T: DeserializeOwned + Validate,
{
    let mut object = match value {
        Value::Object(object) => object,
        other => {
            return serde_json::from_value(other).map_err(|e| {
                AppError::Validation(vec![FieldError::new("body", e.to_string())])
            })
        }
    };

    let mut mistyped: Vec<FieldError> = object
        .iter()
        .filter_map(|(key, field)| {
            let single = Map::from_iter([(key.clone(), field.clone())]);
            serde_json::from_value::<T>(Value::Object(single))
                .err()
                .map(|e| FieldError::new(key.clone(), format!("{key}: {e}")))
        })
        .collect();

    if mistyped.is_empty() {
        return serde_json::from_value(Value::Object(object))
            .map_err(|e| AppError::Validation(vec![FieldError::new("body", e.to_string())]));
    }

    for bad in &mistyped {
        object.remove(&bad.field);
    }
    tracing::warn!(fields = mistyped.len(), "request body has mistyped fields");

    // What remains deserializes; add its constraint violations, skipping keys already reported.
    if let Ok(rest) = serde_json::from_value::<T>(Value::Object(object)) {
        if let Err(errors) = rest.validate() {
            let others: Vec<FieldError> = field_errors(&errors)
                .into_iter()
                .filter(|f| !mistyped.iter().any(|m| m.field == f.field))
                .collect();
            mistyped.extend(others);
        }
    }
    mistyped.sort_by(|a, b| a.field.cmp(&b.field));
    Err(AppError::Validation(mistyped))
}

/// `deserialize_with` helper: trims surrounding whitespace of an optional string.
pub fn trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.map(|s| s.trim().to_string()))
}

/// Like [`trimmed`], additionally lowercasing. Used for emails.
pub fn trimmed_lowercase<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.map(|s| s.trim().to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    struct Sample {
        #[serde(default, deserialize_with = "trimmed")]
        #[validate(
            required(message = "name is required"),
            length(min = 2, message = "name is too short")
        )]
        name: Option<String>,
        #[validate(range(min = 0.0, message = "price must not be negative"))]
        price: Option<f64>,
    }

    impl Schema for Sample {
        type Output = (String, f64);

        fn narrow(self) -> Self::Output {
            (self.name.unwrap_or_default(), self.price.unwrap_or_default())
        }
    }

    #[test]
    fn trims_before_checking_length() {
        let sample: Sample = serde_json::from_str(r#"{"name":"  a  "}"#).unwrap();
        assert_eq!(sample.name.as_deref(), Some("a"));
        let err = validate(sample).unwrap_err();
        match err {
            AppError::Validation(fields) => {
                assert_eq!(fields, vec![FieldError::new("name", "name is too short")]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reports_every_violation() {
        let sample: Sample = serde_json::from_str(r#"{"price":-1}"#).unwrap();
        let AppError::Validation(fields) = validate(sample).unwrap_err() else {
            panic!("expected validation error");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["name", "price"]);
    }

    #[test]
    fn narrows_valid_payload() {
        let sample: Sample = serde_json::from_str(r#"{"name":" Tea ","price":2.5}"#).unwrap();
        assert_eq!(validate(sample).unwrap(), ("Tea".to_string(), 2.5));
    }

    #[test]
    fn mistyped_field_is_reported_with_other_violations() {
        let err = from_json_value::<Sample>(serde_json::json!({ "name": "T", "price": "abc" }))
            .unwrap_err();
        let AppError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0], FieldError::new("name", "name is too short"));
        assert_eq!(fields[1].field, "price");
        assert!(fields[1].message.contains("invalid type"));
    }

    #[test]
    fn mistyped_required_field_is_not_also_reported_missing() {
        let err = from_json_value::<Sample>(serde_json::json!({ "name": 42 })).unwrap_err();
        let AppError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field, "name");
    }

    #[test]
    fn non_object_body_is_a_body_error() {
        let err = from_json_value::<Sample>(serde_json::json!([1, 2])).unwrap_err();
        let AppError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields[0].field, "body");
    }

    #[test]
    fn well_typed_object_deserializes() {
        let sample: Sample = from_json_value(serde_json::json!({ "name": " Tea " })).unwrap();
        assert_eq!(sample.name.as_deref(), Some("Tea"));
    }
}
