//! Completion coordinator.
//!
//! Every pump runs under [`Completion::spawn`] and reports exactly one
//! [`PumpExit`]. The channel holds one slot per pump, so reporting never
//! blocks even after the waiter has stopped listening. The waiter takes the
//! first exit and cancels the shared token, which stops the sibling pumps.

use std::future::Future;

use scopeguard::ScopeGuard;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TunnelError;

/// The pumps a session can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pump {
    /// Local input to remote.
    Input,
    /// Remote output to local display.
    Output,
    /// Terminal size changes to remote.
    Resize,
    /// Periodic pings.
    Keepalive,
    /// Process termination signals.
    Signals,
    /// Ends a watch-only session on the first keypress.
    Detach,
}

impl Pump {
    /// Name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Resize => "resize",
            Self::Keepalive => "keepalive",
            Self::Signals => "signals",
            Self::Detach => "detach",
        }
    }
}

/// Why a pump finished without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Peer closed with normal closure.
    RemoteClosed,
    /// Local input reached end of file.
    InputClosed,
    /// The user pressed a key in a watch-only session.
    Detached,
    /// A termination signal arrived.
    Signal(&'static str),
    /// Another pump finished first.
    Cancelled,
}

/// One pump's final report.
#[derive(Debug)]
pub struct PumpExit {
    /// Which pump finished.
    pub pump: Pump,
    /// How it finished.
    pub result: Result<StopReason, TunnelError>,
}

/// Sending side, cloned into every pump.
#[derive(Debug, Clone)]
pub struct Completion {
    tx: mpsc::Sender<PumpExit>,
    cancel: CancellationToken,
}

/// Receiving side, held by the session controller.
#[derive(Debug)]
pub struct CompletionWaiter {
    rx: mpsc::Receiver<PumpExit>,
    cancel: CancellationToken,
}

/// Creates a coordinator with room for `pumps` reports.
pub fn channel(pumps: usize) -> (Completion, CompletionWaiter) {
    let (tx, rx) = mpsc::channel(pumps.max(1));
    let cancel = CancellationToken::new();
    (
        Completion {
            tx,
            cancel: cancel.clone(),
        },
        CompletionWaiter { rx, cancel },
    )
}

impl Completion {
    /// Report a pump exit. Never blocks.
    pub fn notify(&self, exit: PumpExit) {
        if let Err(e) = self.tx.try_send(exit) {
            log::trace!("[Session] Completion report dropped: {}", e);
        }
    }

    /// Token cancelled once the session is over.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs `pump` as a task that reports its exit.
    ///
    /// The task stops early when the session is cancelled. If the pump
    /// panics, a drop guard still reports it as aborted.
    pub fn spawn<F>(&self, pump: Pump, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<StopReason, TunnelError>> + Send + 'static,
    {
        let completion = self.clone();
        tokio::spawn(async move {
            let guard = scopeguard::guard(completion, move |completion| {
                completion.notify(PumpExit {
                    pump,
                    result: Err(TunnelError::Aborted(pump.name())),
                });
            });

            let cancel = guard.cancel.clone();
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => Ok(StopReason::Cancelled),
                result = fut => result,
            };

            match &result {
                Ok(reason) => log::debug!("[Session] {} pump stopped: {:?}", pump.name(), reason),
                Err(e) => log::warn!("[Session] {} pump failed: {:#}", pump.name(), e),
            }

            let completion = ScopeGuard::into_inner(guard);
            completion.notify(PumpExit { pump, result });
        })
    }
}

impl CompletionWaiter {
    /// Waits for the first pump exit, then cancels every other pump.
    ///
    /// Returns `None` only if every [`Completion`] was dropped without a
    /// report.
    pub async fn first(mut self) -> Option<PumpExit> {
        let exit = self.rx.recv().await;
        self.cancel.cancel();
        exit
    }
}
