//! Mapping of raw classifier output to a diagnosis

use crate::error::DiagnosisError;
use crate::models::Diagnosis;
use std::str::FromStr;

impl FromStr for Diagnosis {
    type Err = DiagnosisError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Diagnosis::ALL
            .into_iter()
            .find(|d| d.one_hot() == trimmed)
            .ok_or_else(|| DiagnosisError::UnrecognizedOutput {
                raw: trimmed.to_string(),
            })
    }
}

/// Map classifier stdout to a diagnosis by exact one-hot match.
///
/// Surrounding whitespace is ignored; anything else that is not one of the
/// three triplets is `UnrecognizedOutput`.
pub fn map_output(raw: &str) -> Result<Diagnosis, DiagnosisError> {
    raw.parse()
}
