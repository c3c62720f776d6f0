//! `wsterm shell <target>`: interactive shell on a remote target.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::handshake;
use crate::session::{resize, InputMode, Session, SessionIo};
use crate::terminal::{self, CrosstermTerminal};

/// Opens a shell on `target` and runs it until either side ends it.
///
/// `resource` overrides the configured API resource.
pub async fn run(config: &Config, target: &str, resource: Option<&str>) -> Result<()> {
    if !terminal::stdin_is_tty() {
        anyhow::bail!("wsterm shell needs an interactive terminal on stdin");
    }

    let timings = config.timings()?;
    let resize = resize::detect(config.resize_mode, config.resize_poll_interval())?;
    let resource = resource.unwrap_or(config.resource.as_str());

    // Handshake BEFORE entering raw mode so errors are visible
    let connection = handshake::open_session(config, resource, target)
        .await
        .with_context(|| format!("Could not open a shell on {}", target))?;
    let session = Session::new(target, connection, timings);
    let info = session.info().clone();

    let io = SessionIo {
        input: tokio::io::stdin(),
        output: tokio::io::stdout(),
        resize,
        input_mode: InputMode::Interactive,
        watch_signals: true,
    };
    let end = session
        .attach(CrosstermTerminal, io)
        .await
        .with_context(|| format!("Shell on {} failed", target))?;

    log::info!(
        "Shell on {} via {} ended: {:?}",
        info.target,
        info.endpoint,
        end.reason
    );
    Ok(())
}
