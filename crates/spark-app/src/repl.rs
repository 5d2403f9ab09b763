//! Interactive chat loop.

use std::future::Future;
use std::io::Write;

use spark_client::ChatSession;
use spark_common::SparkError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

/// Read user turns from `input` and stream replies to `output` until the
/// exit keyword, end of input, or `shutdown` resolves. The session is
/// stopped however the loop ends.
///
/// Remote and transport errors are printed and the user may retry; the next
/// turn reconnects. Configuration errors and failures to write `output` end
/// the loop.
pub async fn run<R, W, S>(
    session: &mut ChatSession,
    input: R,
    output: &mut W,
    exit_keyword: &str,
    shutdown: S,
) -> Result<(), SparkError>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send,
    S: Future<Output = ()>,
{
    let outcome = converse(session, input, output, exit_keyword, shutdown).await;
    session.stop().await;
    outcome
}

async fn converse<R, W, S>(
    session: &mut ChatSession,
    input: R,
    output: &mut W,
    exit_keyword: &str,
    shutdown: S,
) -> Result<(), SparkError>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    loop {
        write!(output, "You: ")?;
        output.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut shutdown => {
                writeln!(output)?;
                info!("interrupted, stopping session");
                return Ok(());
            }
        };
        let Some(line) = line else {
            writeln!(output)?;
            return Ok(());
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case(exit_keyword) {
            return Ok(());
        }

        write!(output, "Spark: ")?;
        output.flush()?;
        // The reply keeps streaming into history even if the terminal is
        // gone; the first write failure is reported once the turn ends.
        let mut write_error: Option<std::io::Error> = None;
        let result = tokio::select! {
            result = session.chat(text, |delta| {
                if write_error.is_none() {
                    if let Err(e) = write!(output, "{delta}").and_then(|()| output.flush()) {
                        write_error = Some(e);
                    }
                }
            }) => result,
            _ = &mut shutdown => {
                writeln!(output)?;
                info!("interrupted mid-reply, stopping session");
                return Ok(());
            }
        };
        if let Some(e) = write_error {
            warn!(error = %e, "lost output while streaming a reply");
            return Err(e.into());
        }
        writeln!(output)?;

        if let Err(e) = result {
            warn!(error = %e, "turn failed");
            writeln!(output, "[error] {e}")?;
            if !e.is_recoverable() {
                return Err(SparkError::Chat(e.to_string()));
            }
        }
    }
}
