//! Core data models for the diagnosis relay

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of features in one input vector (the classifier's column count)
pub const VECTOR_WIDTH: usize = 5;

/// Field names of an input vector, in stdin column order
pub const FIELD_NAMES: [&str; VECTOR_WIDTH] = ["c0", "c1", "c2", "c3", "c4"];

/// Identity of one connected client for the lifetime of its connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A single feature value as submitted by the client.
///
/// Browser forms send text; programmatic clients may send JSON numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

/// Unvalidated vector payload of an inbound `diagnosis request` event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInputVector {
    pub c0: Option<FieldValue>,
    pub c1: Option<FieldValue>,
    pub c2: Option<FieldValue>,
    pub c3: Option<FieldValue>,
    pub c4: Option<FieldValue>,
}

impl RawInputVector {
    /// Build a payload from five text values, as the browser form does
    pub fn from_text(values: [&str; VECTOR_WIDTH]) -> Self {
        let [c0, c1, c2, c3, c4] = values.map(|v| Some(FieldValue::Text(v.to_string())));
        Self { c0, c1, c2, c3, c4 }
    }

    fn fields(&self) -> [(&'static str, Option<&FieldValue>); VECTOR_WIDTH] {
        [
            (FIELD_NAMES[0], self.c0.as_ref()),
            (FIELD_NAMES[1], self.c1.as_ref()),
            (FIELD_NAMES[2], self.c2.as_ref()),
            (FIELD_NAMES[3], self.c3.as_ref()),
            (FIELD_NAMES[4], self.c4.as_ref()),
        ]
    }

    /// Check that every field is present, numeric and finite
    pub fn validate(&self) -> Result<InputVector, ValidationError> {
        let mut values = [0.0_f64; VECTOR_WIDTH];

        for (slot, (field, value)) in values.iter_mut().zip(self.fields()) {
            let value = value.ok_or(ValidationError::MissingField { field })?;
            let parsed = match value {
                FieldValue::Number(n) => *n,
                FieldValue::Text(text) => {
                    text.trim()
                        .parse::<f64>()
                        .map_err(|_| ValidationError::NotNumeric {
                            field,
                            value: text.clone(),
                        })?
                }
            };
            if !parsed.is_finite() {
                return Err(ValidationError::NotFinite { field });
            }
            *slot = parsed;
        }

        Ok(InputVector { values })
    }
}

/// Validated, immutable five-feature vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputVector {
    values: [f64; VECTOR_WIDTH],
}

impl InputVector {
    /// Values in column order c0..c4
    pub fn values(&self) -> &[f64; VECTOR_WIDTH] {
        &self.values
    }

    /// The feature row as decimal text separated by single spaces
    pub fn to_row(&self) -> String {
        self.values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TryFrom<[f64; VECTOR_WIDTH]> for InputVector {
    type Error = ValidationError;

    fn try_from(values: [f64; VECTOR_WIDTH]) -> Result<Self, Self::Error> {
        let [c0, c1, c2, c3, c4] = values.map(|v| Some(FieldValue::Number(v)));
        RawInputVector { c0, c1, c2, c3, c4 }.validate()
    }
}

/// One inbound request bound to the session that must receive the reply
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub request_id: u64,
    pub session_id: SessionId,
    pub vector: RawInputVector,
}

/// Diagnosis classes the classifier can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Diagnosis {
    /// Normal thyroid function (`1 0 0`)
    Euthyroidism,
    /// Elevated thyroid function (`0 1 0`)
    Hyperthyroidism,
    /// Suppressed thyroid function (`0 0 1`)
    Hypothyroidism,
}

impl Diagnosis {
    pub const ALL: [Diagnosis; 3] = [
        Diagnosis::Euthyroidism,
        Diagnosis::Hyperthyroidism,
        Diagnosis::Hypothyroidism,
    ];

    /// The one-hot triplet the classifier prints for this class
    pub fn one_hot(&self) -> &'static str {
        match self {
            Diagnosis::Euthyroidism => "1 0 0",
            Diagnosis::Hyperthyroidism => "0 1 0",
            Diagnosis::Hypothyroidism => "0 0 1",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Diagnosis::Euthyroidism => "euthyroidism",
            Diagnosis::Hyperthyroidism => "hyperthyroidism",
            Diagnosis::Hypothyroidism => "hypothyroidism",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
