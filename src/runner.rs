//! External process execution.
//!
//! Every script and ffmpeg invocation goes through [`ProcessRunner`]. The
//! system runner waits for the process, buffers its output and appends
//! failures to an error log shared by all stages.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{AlimeError, Result};

/// Buffered output of a finished process: stdout followed by stderr.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub combined: String,
}

impl ProcessOutput {
    pub fn new<S: Into<String>>(combined: S) -> Self {
        Self {
            combined: combined.into(),
        }
    }

    /// Last non-empty output line, where scripts print their result.
    pub fn last_line(&self) -> Option<&str> {
        self.combined
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args` to completion.
    async fn run(&self, program: &str, args: &[String]) -> Result<ProcessOutput>;
}

/// Interpreter, output directory and runner shared by a script-backed stage.
#[derive(Clone)]
pub struct ScriptContext {
    pub python: String,
    pub output_dir: PathBuf,
    pub runner: Arc<dyn ProcessRunner>,
}

pub struct SystemRunner {
    working_dir: PathBuf,
    error_log: PathBuf,
}

impl SystemRunner {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(working_dir: P, error_log: Q) -> Self {
        Self {
            working_dir: working_dir.into(),
            error_log: error_log.into(),
        }
    }

    async fn record_failure(&self, command_line: &str, output: &str) {
        let entry = format_log_entry(&chrono::Local::now().to_rfc3339(), command_line, output);

        if let Some(parent) = self.error_log.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                warn!("Failed to create error log directory: {}", e);
                return;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.error_log)
            .await;

        match file {
            Ok(mut file) => {
                // The entry must be on disk before the failure is returned
                let written = match file.write_all(entry.as_bytes()).await {
                    Ok(()) => file.flush().await,
                    Err(e) => Err(e),
                };
                if let Err(e) = written {
                    warn!("Failed to write error log entry: {}", e);
                }
            }
            Err(e) => warn!("Failed to open error log file {}: {}", self.error_log.display(), e),
        }
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<ProcessOutput> {
        let command_line = format_command_line(program, args);
        debug!("Executing command: {}", command_line);

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.working_dir)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                self.record_failure(&command_line, &e.to_string()).await;
                return Err(AlimeError::Spawn {
                    program: program.to_string(),
                    source: e,
                });
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            self.record_failure(&command_line, &combined).await;
            return Err(AlimeError::Process {
                description: command_line,
                status: output.status.to_string(),
                output: combined,
            });
        }

        Ok(ProcessOutput { combined })
    }
}

pub fn format_command_line(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

fn format_log_entry(time: &str, command_line: &str, output: &str) -> String {
    format!(
        "Time: {}\nFailed to execute command: {}\n{}\n--------------------------------------------\n",
        time, command_line, output
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_log_entry_format() {
        let entry = format_log_entry("2024-01-01T00:00:00+00:00", "ffmpeg -i a.mp4", "boom");
        assert_eq!(
            entry,
            "Time: 2024-01-01T00:00:00+00:00\nFailed to execute command: ffmpeg -i a.mp4\nboom\n\
             --------------------------------------------\n"
        );
    }

    #[test]
    fn test_last_line() {
        let output = ProcessOutput::new("Loading model\n3.25\n\n");
        assert_eq!(output.last_line(), Some("3.25"));
        assert_eq!(ProcessOutput::default().last_line(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemRunner::new(dir.path(), dir.path().join("error/log.txt"));

        let output = runner
            .run("sh", &args(&["-c", "echo out; echo err 1>&2"]))
            .await
            .unwrap();

        assert_eq!(output.combined, "out\nerr\n");
        assert!(!dir.path().join("error/log.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_appends_error_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("error/log.txt");
        let runner = SystemRunner::new(dir.path(), &log);

        for _ in 0..2 {
            let err = runner
                .run("sh", &args(&["-c", "echo broken; exit 3"]))
                .await
                .unwrap_err();
            assert!(matches!(err, AlimeError::Process { ref output, .. } if output.contains("broken")));
        }

        let content = std::fs::read_to_string(&log).unwrap();
        assert_eq!(content.matches("Failed to execute command: sh -c echo broken; exit 3").count(), 2);
        assert!(content.contains("broken\n"));
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_error_log_written_before_failure_returns() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("error/log.txt");
        let runner = SystemRunner::new(dir.path(), &log);

        for expected in 1..=50 {
            runner.run("sh", &args(&["-c", "exit 3"])).await.unwrap_err();
            let content = std::fs::read_to_string(&log).unwrap();
            assert_eq!(content.matches("Failed to execute command").count(), expected);
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let runner = SystemRunner::new(dir.path(), &log);

        let err = runner
            .run("alime-definitely-not-installed", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, AlimeError::Spawn { .. }));
        assert!(log.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemRunner::new(dir.path(), dir.path().join("log.txt"));

        runner.run("sh", &args(&["-c", "touch marker"])).await.unwrap();
        assert!(dir.path().join("marker").exists());
    }
}
