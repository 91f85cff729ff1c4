//! Child side of the subprocess protocol.
//!
//! A process started by [`super::SubprocessPredictionExecutor`] runs a full
//! executor of its own and answers one JSON line per request line.

use super::{ConfiguredExecutorFactory, PredictionExecutor};
use crate::{
    Request, Response, Result,
    config::Config,
    domain_error::{DomainError, ErrorMapper},
    signal::shutdown_signal,
};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Answers requests read from `reader` until it reaches EOF.
///
/// Returns `Err` on the first unexpected failure; the process is then expected
/// to exit so the parent observes a crashed child.
pub async fn serve<R, W>(executor: &mut dyn PredictionExecutor, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mapper = ErrorMapper::new();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let parsed = serde_json::from_str::<Value>(&line)
            .ok()
            .and_then(Request::from_value);

        let response = match parsed {
            Some(request) => executor.execute(request).await?,
            None => mapper.map(&DomainError::malformed_input(
                "Request body must be a JSON object",
            )),
        };

        write_line(&mut writer, &response).await?;
        debug!("Answered request on stdio");
    }

    info!("Request stream closed");
    Ok(())
}

async fn write_line<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = response.to_bytes()?.to_vec();
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Runs an inline executor over the process's stdin/stdout.
pub async fn run(config: Config) -> Result<()> {
    let factory = ConfiguredExecutorFactory::new(config);
    let mut executor = factory.create_inline()?;
    executor.start().await?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    let outcome = tokio::select! {
        result = serve(&mut executor, stdin, stdout) => result,
        _ = shutdown_signal() => Ok(()),
    };

    // Released on every exit path, including a failed request loop.
    let stopped = executor.stop().await;
    outcome.and(stopped)
}
