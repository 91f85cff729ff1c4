use super::PredictionExecutor;
use crate::{
    Error, JsonObject, Request, Response, Result,
    domain_error::{DomainError, ErrorMapper},
};
use async_trait::async_trait;
use axum::body::Bytes;
use std::{collections::HashMap, process::Stdio, time::Duration};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Forwards requests to a long-lived child process running its own executor.
///
/// The child speaks newline-delimited JSON on stdin/stdout: one request line
/// in, one response line out. Each answer must be a JSON object and is
/// relayed byte for byte. A child
/// that crashes, hangs past the relay timeout, or breaks the framing is
/// discarded; the failed request gets a `BACKEND_UNAVAILABLE` response
/// and the next request spawns a replacement.
pub struct SubprocessPredictionExecutor {
    command: Vec<String>,
    env: HashMap<String, String>,
    relay_timeout: Duration,
    mapper: ErrorMapper,
    child: Option<ChildChannel>,
    spawn_count: usize,
}

struct ChildChannel {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ChildChannel {
    async fn round_trip(&mut self, line: &[u8]) -> Result<Bytes> {
        self.stdin.write_all(line).await?;
        self.stdin.flush().await?;

        let mut buf = Vec::new();
        let read = self.stdout.read_until(b'\n', &mut buf).await?;
        if read == 0 {
            return Err(Error::executor("child process closed its output"));
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }

        // Anything other than one JSON object per line means the framing is lost.
        if serde_json::from_slice::<JsonObject>(&buf).is_err() {
            return Err(Error::executor(format!(
                "child process wrote a line that is not a JSON object: {}",
                String::from_utf8_lossy(&buf)
            )));
        }

        Ok(Bytes::from(buf))
    }

    fn describe_exit(&mut self) -> String {
        match self.process.try_wait() {
            Ok(Some(status)) => format!("exited with {}", status),
            Ok(None) => "still running".to_string(),
            Err(e) => format!("unknown state: {}", e),
        }
    }
}

impl SubprocessPredictionExecutor {
    pub fn new(command: Vec<String>, relay_timeout: Duration) -> Result<Self> {
        if command.is_empty() {
            return Err(Error::config("subprocess executor requires a command"));
        }

        Ok(Self {
            command,
            env: HashMap::new(),
            relay_timeout,
            mapper: ErrorMapper::new(),
            child: None,
            spawn_count: 0,
        })
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Number of children spawned so far, replacements included.
    pub fn spawn_count(&self) -> usize {
        self.spawn_count
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    fn spawn(&mut self) -> Result<ChildChannel> {
        let program = &self.command[0];
        debug!("Spawning executor subprocess: {:?}", self.command);

        let mut cmd = Command::new(program);
        cmd.args(&self.command[1..]);
        cmd.envs(&self.env);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());
        cmd.kill_on_drop(true);

        let mut process = cmd.spawn().map_err(|e| {
            Error::executor(format!(
                "Failed to spawn executor subprocess {}: {}",
                program, e
            ))
        })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::executor("Failed to get stdin for executor subprocess"))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::executor("Failed to get stdout for executor subprocess"))?;

        self.spawn_count += 1;
        info!(
            "Executor subprocess started (pid {:?}, spawn #{})",
            process.id(),
            self.spawn_count
        );

        Ok(ChildChannel {
            process,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn backend_failure(&self, reason: impl std::fmt::Display) -> Response {
        self.mapper.map(&DomainError::backend_unavailable(format!(
            "Prediction subprocess failed: {}",
            reason
        )))
    }
}

#[async_trait]
impl PredictionExecutor for SubprocessPredictionExecutor {
    async fn start(&mut self) -> Result<()> {
        if self.child.is_none() {
            self.child = Some(self.spawn()?);
        }
        Ok(())
    }

    async fn execute(&mut self, request: Request) -> Result<Response> {
        let line = request.to_json_line()?;

        // Held outside `self` while in flight: if this future is dropped the
        // child is killed instead of being reused with a pending response.
        let mut channel = match self.child.take() {
            Some(channel) => channel,
            None => {
                warn!("Executor subprocess is not running, spawning a replacement");
                match self.spawn() {
                    Ok(channel) => channel,
                    Err(e) => return Ok(self.backend_failure(e)),
                }
            }
        };

        match tokio::time::timeout(self.relay_timeout, channel.round_trip(&line)).await {
            Ok(Ok(body)) => {
                self.child = Some(channel);
                Ok(Response::Relayed { body })
            }
            Ok(Err(e)) => {
                let state = channel.describe_exit();
                warn!("Executor subprocess failed ({}): {}", state, e);
                Ok(self.backend_failure(e))
            }
            Err(_) => {
                warn!(
                    "Executor subprocess did not answer within {:?}, discarding it",
                    self.relay_timeout
                );
                Ok(self.backend_failure(format!(
                    "no response within {}s",
                    self.relay_timeout.as_secs_f64()
                )))
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(ChildChannel {
            mut process, stdin, ..
        }) = self.child.take()
        else {
            return Ok(());
        };

        debug!("Stopping executor subprocess");
        // Closing stdin ends the child's request loop.
        drop(stdin);

        match tokio::time::timeout(STOP_GRACE_PERIOD, process.wait()).await {
            Ok(Ok(status)) => info!("Executor subprocess exited with {}", status),
            Ok(Err(e)) => warn!("Failed to wait for executor subprocess: {}", e),
            Err(_) => {
                warn!("Executor subprocess ignored shutdown, killing it");
                if let Err(e) = process.kill().await {
                    warn!("Failed to kill executor subprocess: {}", e);
                }
            }
        }

        Ok(())
    }
}
