//! `wsterm stream <job_id>`: watch the live output of a running job.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::handshake;
use crate::session::{resize, InputMode, Session, SessionIo, Timings};
use crate::terminal::{self, CrosstermTerminal};

/// Attaches to the output of `job_id`. Any keypress detaches.
pub async fn run(config: &Config, job_id: &str) -> Result<()> {
    let resize = resize::detect(config.resize_mode, config.resize_poll_interval())?;

    let connection = handshake::open_stream(config, job_id)
        .await
        .with_context(|| format!("Could not stream job {}", job_id))?;
    let session = Session::new(job_id, connection, Timings::stream());
    let info = session.info().clone();

    let io = SessionIo {
        input: tokio::io::stdin(),
        output: tokio::io::stdout(),
        resize,
        input_mode: InputMode::DetachOnKeypress,
        watch_signals: true,
    };

    // Piped stdin has no raw mode; detach happens on the first byte, if any.
    let end = if terminal::stdin_is_tty() {
        session.attach(CrosstermTerminal, io).await
    } else {
        session.run(io).await
    }
    .with_context(|| format!("Stream of job {} failed", job_id))?;

    log::info!(
        "Stream of job {} via {} ended: {:?}",
        info.target,
        info.endpoint,
        end.reason
    );
    Ok(())
}
