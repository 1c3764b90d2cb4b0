//! Local diagnosis through the classifier executable

use anyhow::{bail, Result};
use colored::Colorize;
use diagnosis_lib::{
    ClassificationRequest, ClassifierConfig, Diagnosis, DiagnosisCoordinator, DiagnosisError,
    ProcessInvoker, RawInputVector, ResultsPayload, SessionId, FIELD_NAMES, VECTOR_WIDTH,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tabled::Tabled;

use crate::output::{
    color_diagnosis, format_elapsed, print_error, print_json, print_success, print_table,
    OutputFormat,
};

/// Row for the input vector table
#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Build the request payload from exactly five command-line values
pub fn raw_vector(values: &[String]) -> Result<RawInputVector> {
    if values.len() != VECTOR_WIDTH {
        bail!("expected {} values, got {}", VECTOR_WIDTH, values.len());
    }
    Ok(RawInputVector::from_text([
        values[0].as_str(),
        values[1].as_str(),
        values[2].as_str(),
        values[3].as_str(),
        values[4].as_str(),
    ]))
}

/// Run one diagnosis locally and print the outcome
pub async fn run(
    values: &[String],
    classifier: &str,
    classifier_args: &[String],
    model_dir: &str,
    timeout_secs: u64,
    format: OutputFormat,
) -> Result<()> {
    let request = ClassificationRequest {
        request_id: 1,
        session_id: SessionId(0),
        vector: raw_vector(values)?,
    };

    let coordinator = DiagnosisCoordinator::new(Arc::new(ProcessInvoker::new(
        ClassifierConfig::new(classifier, model_dir).with_leading_args(classifier_args.iter().cloned()),
    )))
    .with_timeout(Duration::from_secs(timeout_secs));

    let start = Instant::now();
    let result = coordinator.diagnose(&request).await;
    let elapsed = start.elapsed();

    match format {
        OutputFormat::Json => print_json(&ResultsPayload::from(&result))?,
        OutputFormat::Table => {
            let rows: Vec<FeatureRow> = FIELD_NAMES
                .iter()
                .zip(values)
                .map(|(field, value)| FeatureRow {
                    field: *field,
                    value: value.clone(),
                })
                .collect();
            print_table(&rows);
            print_outcome(&result, elapsed);
        }
    }

    match result {
        Ok(_) => Ok(()),
        Err(e) => bail!("{}", e),
    }
}

fn print_outcome(result: &Result<Diagnosis, DiagnosisError>, elapsed: Duration) {
    match result {
        Ok(diagnosis) => {
            print_success(&format!(
                "Diagnosis: {} ({}) in {}",
                color_diagnosis(*diagnosis),
                diagnosis.one_hot().cyan(),
                format_elapsed(elapsed)
            ));
        }
        Err(e) => print_error(&format!("{}: {}", e.kind().as_str().bold(), e.client_message())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_raw_vector_from_args() {
        let raw = raw_vector(&strings(&["1", "2", "3", "4", "5"])).unwrap();
        assert_eq!(raw.validate().unwrap().to_row(), "1 2 3 4 5");
    }

    #[test]
    fn test_raw_vector_wrong_arity() {
        assert!(raw_vector(&strings(&["1", "2", "3"])).is_err());
    }

    #[tokio::test]
    async fn test_run_reports_invalid_input() {
        let err = run(
            &strings(&["1", "2", "abc", "4", "5"]),
            "/nonexistent/neuralnet",
            &[],
            "/nonexistent/model",
            1,
            OutputFormat::Json,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("c2"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_with_stand_in_classifier() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("neuralnet.sh");
        std::fs::write(&script, "cat > /dev/null\necho '0 1 0'\n").unwrap();

        let result = run(
            &strings(&["1", "2", "3", "4", "5"]),
            "sh",
            &[script.display().to_string()],
            &dir.path().display().to_string(),
            10,
            OutputFormat::Table,
        )
        .await;
        assert!(result.is_ok(), "{:?}", result);
    }
}
