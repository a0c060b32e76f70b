//! # Shutdown Module
//!
//! One Ctrl-C listener for the whole process. The request flag is raised
//! before the running dispatcher is told to stop, so the reconnect loop
//! always sees the request once `dispatch()` returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use teloxide::dispatching::ShutdownToken;
use tokio::sync::Notify;
use tracing::{debug, info};

/// Delay between attempts to stop a dispatcher that has not started polling yet
const IDLE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Process-wide shutdown request shared with the reconnect loop
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
    dispatcher: Arc<Mutex<Option<ShutdownToken>>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the Ctrl-C listener
    pub fn listen_for_ctrl_c(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down");
                signal.trigger().await;
            }
        });
    }

    /// Record a shutdown request and stop the registered dispatcher, if any
    pub async fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_one();

        let token = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(token) = token else {
            return;
        };

        loop {
            match token.shutdown() {
                Ok(done) => {
                    done.await;
                    return;
                }
                Err(_) => {
                    debug!("Dispatcher not running yet, retrying shutdown");
                    tokio::time::sleep(IDLE_RETRY_DELAY).await;
                }
            }
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Resolves once a shutdown has been requested, including before the call
    pub async fn requested(&self) {
        if self.is_requested() {
            return;
        }
        self.notify.notified().await;
    }

    /// Make `token` the dispatcher stopped by the next request.
    ///
    /// Callers must check [`is_requested`](Self::is_requested) afterwards: a
    /// request that raced the registration is only visible through the flag.
    pub fn register(&self, token: ShutdownToken) {
        *self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }
}
