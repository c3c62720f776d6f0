//! Local terminal control.
//!
//! Raw mode is held by a [`RawModeGuard`] for the lifetime of a session so
//! that every exit path (return, `?`, panic unwinding) puts the user's shell
//! back the way it was.

use anyhow::{Context, Result};

use crate::frame::TerminalSize;

/// Mode switching for the local terminal.
pub trait TerminalMode: Send {
    /// Disable line buffering and echo.
    fn enter_raw(&mut self) -> Result<()>;
    /// Restore cooked mode.
    fn leave_raw(&mut self) -> Result<()>;
}

/// The process's controlling terminal, driven through crossterm.
#[derive(Debug, Default)]
pub struct CrosstermTerminal;

impl TerminalMode for CrosstermTerminal {
    fn enter_raw(&mut self) -> Result<()> {
        crossterm::terminal::enable_raw_mode().context("Failed to enable raw mode")
    }

    fn leave_raw(&mut self) -> Result<()> {
        crossterm::terminal::disable_raw_mode().context("Failed to disable raw mode")
    }
}

/// RAII guard for raw mode.
///
/// Restores the terminal when dropped, even if a panic occurs.
#[derive(Debug)]
pub struct RawModeGuard<T: TerminalMode> {
    terminal: T,
}

impl<T: TerminalMode> RawModeGuard<T> {
    /// Puts `terminal` into raw mode and returns the guard that undoes it.
    ///
    /// # Errors
    ///
    /// Returns an error (and leaves the terminal untouched) if raw mode
    /// cannot be entered.
    pub fn engage(mut terminal: T) -> Result<Self> {
        terminal.enter_raw()?;
        log::debug!("[Terminal] Raw mode enabled");
        Ok(Self { terminal })
    }
}

impl<T: TerminalMode> Drop for RawModeGuard<T> {
    fn drop(&mut self) {
        // Always attempt to restore terminal state
        if let Err(e) = self.terminal.leave_raw() {
            log::error!("[Terminal] Failed to restore terminal: {:#}", e);
        } else {
            log::debug!("[Terminal] Raw mode disabled");
        }
    }
}

/// Current size of the controlling terminal.
///
/// # Errors
///
/// Fails when there is no controlling terminal to ask.
pub fn query_size() -> Result<TerminalSize> {
    let (cols, rows) = crossterm::terminal::size().context("Could not get terminal size")?;
    Ok(TerminalSize::new(rows, cols))
}

/// Whether standard input is attached to a terminal.
pub fn stdin_is_tty() -> bool {
    atty::is(atty::Stream::Stdin)
}
