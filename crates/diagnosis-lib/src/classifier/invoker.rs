//! Child-process invocation of the external classifier
//!
//! Each invocation spawns a fresh process, feeds the one-row matrix on
//! stdin and collects stdout/stderr once the process exits.

use super::Classifier;
use crate::error::ProcessError;
use crate::models::{InputVector, VECTOR_WIDTH};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Default bound on one invocation before it is abandoned
pub const DEFAULT_INVOCATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Rows written per invocation; the relay always classifies one vector
const ROW_COUNT: usize = 1;

/// How to launch the classifier
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Classifier executable
    pub executable: PathBuf,
    /// Arguments placed before the fixed prediction flags (wrappers, interpreters)
    pub leading_args: Vec<String>,
    /// Directory holding the pre-trained network
    pub model_dir: PathBuf,
}

impl ClassifierConfig {
    pub fn new(executable: impl Into<PathBuf>, model_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            leading_args: Vec::new(),
            model_dir: model_dir.into(),
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Full argument list: predict, pattern classification, normalized
    /// input read from stdin, network loaded from `model_dir`
    pub fn arguments(&self) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend([
            "--predict".to_string(),
            "--pattern-classification".to_string(),
            "--normalization=yes".to_string(),
            "--in-file=stdin".to_string(),
            format!("--load-dir={}", self.model_dir.display()),
        ]);
        args
    }
}

/// Captured result of one classifier run that exited successfully
#[derive(Debug, Clone)]
pub struct ClassifierInvocation {
    /// Stdout with surrounding whitespace removed
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

/// The three stdin lines: row count, column count, feature row
pub fn stdin_protocol(input: &InputVector) -> [String; 3] {
    [
        ROW_COUNT.to_string(),
        VECTOR_WIDTH.to_string(),
        input.to_row(),
    ]
}

/// Write the stdin protocol line by line, each write completing before the next.
///
/// A broken pipe means the classifier stopped reading early; its exit
/// status decides the outcome, so writing simply stops there.
async fn write_protocol<W>(writer: &mut W, input: &InputVector) -> Result<(), ProcessError>
where
    W: AsyncWrite + Unpin,
{
    for line in stdin_protocol(input) {
        match writer.write_all(format!("{}\n", line).as_bytes()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!("Classifier closed stdin before the full vector was written");
                return Ok(());
            }
            Err(source) => {
                return Err(ProcessError::Io {
                    stage: "writing stdin",
                    source,
                })
            }
        }
    }

    match writer.flush().await {
        Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(ProcessError::Io {
            stage: "flushing stdin",
            source: e,
        }),
        _ => Ok(()),
    }
}

/// Runs the classifier as a child process, one process per call
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    config: ClassifierConfig,
}

impl ProcessInvoker {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }
}

#[async_trait]
impl Classifier for ProcessInvoker {
    async fn invoke(&self, input: &InputVector) -> Result<ClassifierInvocation, ProcessError> {
        let start = Instant::now();

        let mut child = Command::new(&self.config.executable)
            .args(self.config.arguments())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                executable: self.config.executable.display().to_string(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            write_protocol(&mut stdin, input).await?;
            // Dropping the handle closes the pipe and signals end of input
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| ProcessError::Io {
                stage: "collecting output",
                source,
            })?;

        let elapsed = start.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !stderr.is_empty() {
            warn!(stderr = %stderr, "Classifier wrote to stderr");
        }

        if !output.status.success() {
            return Err(ProcessError::Exit {
                status: output.status.to_string(),
                stderr,
            });
        }

        debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            stdout = %stdout,
            "Classifier invocation completed"
        );

        Ok(ClassifierInvocation {
            stdout,
            stderr,
            exit_code: output.status.code(),
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawInputVector;

    fn vector(values: [&str; 5]) -> InputVector {
        RawInputVector::from_text(values).validate().unwrap()
    }

    /// Classifier stand-in: a shell script run through `sh`
    #[cfg(unix)]
    fn script_invoker(dir: &tempfile::TempDir, body: &str) -> ProcessInvoker {
        let script = dir.path().join("classifier.sh");
        std::fs::write(&script, body).unwrap();
        ProcessInvoker::new(
            ClassifierConfig::new("sh", dir.path().join("model"))
                .with_leading_args([script.display().to_string()]),
        )
    }

    #[test]
    fn test_stdin_protocol_lines() {
        let lines = stdin_protocol(&vector(["1", "2", "3", "4", "5"]));
        assert_eq!(lines, ["1".to_string(), "5".to_string(), "1 2 3 4 5".to_string()]);
    }

    #[test]
    fn test_arguments_include_fixed_flags() {
        let config = ClassifierConfig::new("../neuralnet", "../thyroidologist");
        assert_eq!(
            config.arguments(),
            vec![
                "--predict",
                "--pattern-classification",
                "--normalization=yes",
                "--in-file=stdin",
                "--load-dir=../thyroidologist",
            ]
        );

        let wrapped = config.with_leading_args(["wrapper.sh"]);
        assert_eq!(wrapped.arguments()[0], "wrapper.sh");
        assert_eq!(wrapped.arguments().len(), 6);
    }

    #[tokio::test]
    async fn test_write_protocol_bytes() {
        let mut buffer: Vec<u8> = Vec::new();
        write_protocol(&mut buffer, &vector(["0.5", "2", "3.25", "-4", "5"]))
            .await
            .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "1\n5\n0.5 2 3.25 -4 5\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_feeds_stdin_and_trims_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("stdin.txt");
        let args = dir.path().join("args.txt");
        let body = format!(
            "cat > '{}'\necho \"$@\" > '{}'\nprintf '1 0 0 \\n'\n",
            capture.display(),
            args.display()
        );
        let invoker = script_invoker(&dir, &body);

        let invocation = invoker
            .invoke(&vector(["1", "2", "3", "4", "5"]))
            .await
            .unwrap();

        assert_eq!(invocation.stdout, "1 0 0");
        assert_eq!(invocation.exit_code, Some(0));
        assert_eq!(
            std::fs::read_to_string(&capture).unwrap(),
            "1\n5\n1 2 3 4 5\n"
        );

        let recorded_args = std::fs::read_to_string(&args).unwrap();
        assert!(recorded_args.contains("--predict --pattern-classification"));
        assert!(recorded_args.contains("--in-file=stdin"));
        assert!(recorded_args.contains("--load-dir="));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stderr_alone_is_not_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = script_invoker(
            &dir,
            "cat > /dev/null\necho 'warning: slow convergence' >&2\necho '0 0 1'\n",
        );

        let invocation = invoker
            .invoke(&vector(["1", "2", "3", "4", "5"]))
            .await
            .unwrap();
        assert_eq!(invocation.stdout, "0 0 1");
        assert_eq!(invocation.stderr, "warning: slow convergence");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_process_error() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = script_invoker(&dir, "cat > /dev/null\necho 'no model' >&2\nexit 3\n");

        let err = invoker
            .invoke(&vector(["1", "2", "3", "4", "5"]))
            .await
            .unwrap_err();
        match err {
            ProcessError::Exit { stderr, .. } => assert_eq!(stderr, "no model"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let invoker = ProcessInvoker::new(ClassifierConfig::new(
            "/nonexistent/neuralnet-12345",
            "/nonexistent/model",
        ));

        let err = invoker
            .invoke(&vector(["1", "2", "3", "4", "5"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
        assert!(err.to_string().contains("neuralnet-12345"));
    }
}
