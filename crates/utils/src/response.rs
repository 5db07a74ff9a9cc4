//! The `{ "success": bool, "<payload>": ... }` envelope wrapped around every
//! backend response.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvelopeError {
    #[error("response body is not a JSON object")]
    NotAnObject,
    #[error("envelope has no boolean `success` flag")]
    MissingSuccess,
    #[error("server rejected the request: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },
    #[error("envelope is missing `{0}`")]
    MissingField(String),
    #[error("`{field}` has an unexpected shape: {reason}")]
    InvalidField { field: String, reason: String },
}

/// A parsed envelope whose `success` flag was `true`.
#[derive(Debug, Clone)]
pub struct Envelope {
    fields: Map<String, Value>,
}

impl Envelope {
    /// Validate the `success` flag. `success: false` becomes
    /// [`EnvelopeError::Rejected`] carrying the server's `message`, if any.
    pub fn parse(body: Value) -> Result<Self, EnvelopeError> {
        let Value::Object(fields) = body else {
            return Err(EnvelopeError::NotAnObject);
        };

        match fields.get("success").and_then(Value::as_bool) {
            Some(true) => Ok(Self { fields }),
            Some(false) => Err(EnvelopeError::Rejected {
                message: fields
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            None => Err(EnvelopeError::MissingSuccess),
        }
    }

    /// Remove and deserialize a payload field.
    pub fn take<T: DeserializeOwned>(&mut self, field: &str) -> Result<T, EnvelopeError> {
        let value = self
            .fields
            .remove(field)
            .filter(|v| !v.is_null())
            .ok_or_else(|| EnvelopeError::MissingField(field.to_string()))?;

        serde_json::from_value(value).map_err(|e| EnvelopeError::InvalidField {
            field: field.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_success_with_payload() {
        let mut envelope =
            Envelope::parse(json!({ "success": true, "banner": [{ "imageUrl": "a" }] })).unwrap();
        let items: Vec<Value> = envelope.take("banner").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            envelope.take::<Vec<Value>>("banner").unwrap_err(),
            EnvelopeError::MissingField("banner".to_string())
        );
    }

    #[test]
    fn test_rejected_carries_message() {
        let err = Envelope::parse(json!({ "success": false, "message": "duplicate" })).unwrap_err();
        assert_eq!(
            err,
            EnvelopeError::Rejected {
                message: Some("duplicate".to_string())
            }
        );
        assert_eq!(err.to_string(), "server rejected the request: duplicate");
    }

    #[test]
    fn test_missing_success_flag() {
        let err = Envelope::parse(json!({ "matches": [] })).unwrap_err();
        assert_eq!(err, EnvelopeError::MissingSuccess);

        let err = Envelope::parse(json!([1, 2, 3])).unwrap_err();
        assert_eq!(err, EnvelopeError::NotAnObject);
    }

    #[test]
    fn test_missing_and_null_payload() {
        let mut envelope = Envelope::parse(json!({ "success": true, "players": null })).unwrap();
        let err = envelope.take::<Vec<Value>>("players").unwrap_err();
        assert_eq!(err, EnvelopeError::MissingField("players".to_string()));
    }

    #[test]
    fn test_wrong_payload_shape() {
        let mut envelope = Envelope::parse(json!({ "success": true, "news": "nope" })).unwrap();
        let err = envelope.take::<Vec<Value>>("news").unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidField { ref field, .. } if field == "news"));
    }
}
