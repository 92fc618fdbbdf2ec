//! Cancellable single-shot timers backing the game's join and answer windows.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::sleep;

/// Handle to a scheduled callback.
///
/// The callback fires at most once. Cancelling (or dropping) the handle
/// before the deadline guarantees the callback never runs; cancelling after
/// the callback has already started is a harmless no-op.
#[derive(Debug)]
pub struct TimerHandle {
    cancel: Option<oneshot::Sender<()>>,
}

impl TimerHandle {
    /// Cancel the pending callback. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            // The receiver is gone once the timer fired; nothing to do then.
            let _ = tx.send(());
        }
    }
}

/// Run `callback` after `duration` unless the returned handle is cancelled
/// (or dropped) first.
///
/// The deadline and the cancellation race inside a single `select!`, so
/// exactly one of "callback runs" and "callback never runs" is observed.
pub fn schedule<F>(duration: Duration, callback: F) -> TimerHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::select! {
            _ = sleep(duration) => callback.await,
            // Resolves on explicit cancel and when the handle is dropped.
            _ = rx => {}
        }
    });

    TimerHandle { cancel: Some(tx) }
}
