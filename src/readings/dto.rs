use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ApiError, FieldErrors};
use crate::readings::repo::NewReading;

/// Body for create and full update. Any `user`/owner field a client sends is
/// simply not part of this shape, so it can never reach the repository.
#[derive(Debug, Deserialize)]
pub struct ReadingInput {
    pub value: Option<Decimal>,
    pub unit: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

impl ReadingInput {
    /// NUMERIC(5,2): at most 5 digits total, 2 of them decimal places.
    pub fn validate(self) -> Result<NewReading, ApiError> {
        let mut errors = FieldErrors::new();

        let value = match self.value {
            Some(v) => {
                if v.scale() > 2 {
                    errors.entry("value".into()).or_default().push(
                        "Ensure that there are no more than 2 decimal places.".into(),
                    );
                }
                if v.abs() >= Decimal::from(1000) {
                    errors.entry("value".into()).or_default().push(
                        "Ensure that there are no more than 5 digits in total.".into(),
                    );
                }
                Some(v)
            }
            None => {
                errors
                    .entry("value".into())
                    .or_default()
                    .push("This field is required.".into());
                None
            }
        };

        let timestamp = match self.timestamp {
            Some(t) => Some(t),
            None => {
                errors
                    .entry("timestamp".into())
                    .or_default()
                    .push("This field is required.".into());
                None
            }
        };

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(NewReading {
            value: value.unwrap(),
            unit: self.unit.unwrap_or_else(|| "mg/dL".to_string()),
            timestamp: timestamp.unwrap(),
            notes: self.notes,
            status: self.status,
        })
    }
}

/// One page in the list response.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn input(value: &str) -> ReadingInput {
        ReadingInput {
            value: Some(value.parse().unwrap()),
            unit: None,
            timestamp: Some(datetime!(2025-10-18 08:00 UTC)),
            notes: None,
            status: None,
        }
    }

    #[test]
    fn unit_defaults_to_mg_dl() {
        let reading = input("104.5").validate().unwrap();
        assert_eq!(reading.unit, "mg/dL");
    }

    #[test]
    fn three_decimal_places_rejected() {
        let err = input("104.505").validate().unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(
                    errors["value"][0],
                    "Ensure that there are no more than 2 decimal places."
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn more_than_five_digits_rejected() {
        assert!(input("1000.00").validate().is_err());
        assert!(input("999.99").validate().is_ok());
    }

    #[test]
    fn missing_value_and_timestamp_are_field_errors() {
        let input = ReadingInput {
            value: None,
            unit: None,
            timestamp: None,
            notes: None,
            status: None,
        };
        match input.validate().unwrap_err() {
            ApiError::Validation(errors) => {
                assert!(errors.contains_key("value"));
                assert!(errors.contains_key("timestamp"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn owner_field_in_body_is_not_deserialized() {
        let raw = r#"{"value": "90.00", "timestamp": "2025-10-18T08:00:00Z", "user_id": "11111111-1111-1111-1111-111111111111"}"#;
        let parsed: ReadingInput = serde_json::from_str(raw).unwrap();
        // No owner field exists on the input shape at all.
        assert_eq!(parsed.value, Some("90.00".parse().unwrap()));
    }
}
