use std::path::Path;
use std::sync::Mutex;
use async_trait::async_trait;
use tokio::process::Command;
use crate::error::HunterError;

pub mod mergecap;
pub mod tshark;

/// Helper macro to convert Vec<&str> to Vec<String> to avoid having to keep writing `.to_string()`
#[macro_export]
macro_rules! vec_of_strings {
    ($($x:expr),*) => (vec![$($x.to_string()),*]);
}

/// Command lines are passed as strings, so paths that are not UTF-8 are refused rather than mangled
pub(crate) fn path_str(path: &Path) -> Result<&str, HunterError> {
    path.to_str()
        .ok_or_else(|| HunterError::NonUtf8Path { path: path.to_path_buf() })
}

/// Runs a prepared command line, where the first element is the program. The hunter only builds
/// the command lines and hands them to a runner, so in unit tests a runner that records the
/// commands can be swapped in instead of executing tshark and mergecap.
#[async_trait]
pub trait CommandRunner {
    async fn run(&self, cmd: Vec<String>) -> Result<String, HunterError>;
}

/// Runs commands as child processes, one at a time, waiting for each to exit.
#[derive(Debug, Default, Clone)]
pub struct SubprocessRunner;

#[async_trait]
impl CommandRunner for SubprocessRunner {
    async fn run(&self, cmd: Vec<String>) -> Result<String, HunterError> {
        let (program, args) = match cmd.split_first() {
            Some(split) => split,
            None => {
                return Err(HunterError::ToolFailed {
                    tool: String::new(),
                    status: None,
                    stderr: "empty command".to_string(),
                })
            }
        };
        tracing::debug!("running command: {}", cmd.join(" "));
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|source| HunterError::ToolNotStarted { tool: program.clone(), source })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(HunterError::ToolFailed {
                tool: program.clone(),
                status: output.status.code(),
                stderr,
            });
        }
        // tshark and mergecap are quiet on success, but keep stdout in case it is needed
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Does not run anything, keeps every command it was given and succeeds. Commands whose program
/// matches `fail_program` fail instead, to exercise the error paths.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<Vec<String>>>,
    fail_program: Option<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(program: &str) -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            fail_program: Some(program.to_string()),
        }
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, cmd: Vec<String>) -> Result<String, HunterError> {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(cmd.clone());
        }
        match (&self.fail_program, cmd.first()) {
            (Some(fail), Some(program)) if fail.eq(program) => Err(HunterError::ToolFailed {
                tool: program.clone(),
                status: Some(1),
                stderr: "recorded failure".to_string(),
            }),
            _ => Ok(cmd.join(" ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subprocess_runner_success() {
        let out = SubprocessRunner.run(vec_of_strings!["echo", "hunt"]).await.unwrap();
        assert_eq!(out.trim(), "hunt");
    }

    #[tokio::test]
    async fn test_subprocess_runner_failure_status() {
        let res = SubprocessRunner.run(vec_of_strings!["sh", "-c", "echo broken >&2; exit 3"]).await;
        match res {
            Err(HunterError::ToolFailed { tool, status, stderr }) => {
                assert_eq!(tool, "sh");
                assert_eq!(status, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected tool failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_subprocess_runner_missing_program() {
        let res = SubprocessRunner.run(vec_of_strings!["packet-hunter-no-such-tool"]).await;
        assert!(matches!(res, Err(HunterError::ToolNotStarted { .. })));
        assert!(SubprocessRunner.run(Vec::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_recording_runner() {
        let runner = RecordingRunner::failing("mergecap");
        assert!(runner.run(vec_of_strings!["tshark", "-r", "a"]).await.is_ok());
        assert!(runner.run(vec_of_strings!["mergecap", "-w", "b"]).await.is_err());
        assert_eq!(runner.commands().len(), 2);
        assert_eq!(runner.commands()[0], vec_of_strings!["tshark", "-r", "a"]);
    }
}
