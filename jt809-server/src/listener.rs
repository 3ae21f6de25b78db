//! Sub-link listener
//!
//! The superior platform dials back to this listener after a successful
//! login. Transient accept errors are retried with a capped exponential
//! backoff; anything else ends listening.

use jt809_core::{Jt809Error, Jt809Result};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// First retry delay after a transient accept error
pub const INITIAL_ACCEPT_DELAY: Duration = Duration::from_millis(5);
/// Upper bound of the retry delay
pub const MAX_ACCEPT_DELAY: Duration = Duration::from_secs(1);

/// Accept retry delays: 5 ms, doubling, capped at 1 s
#[derive(Debug, Clone, Default)]
pub struct AcceptBackoff {
    current: Option<Duration>,
}

impl AcceptBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay before the next retry
    pub fn next_delay(&mut self) -> Duration {
        let next = match self.current {
            None => INITIAL_ACCEPT_DELAY,
            Some(d) => (d * 2).min(MAX_ACCEPT_DELAY),
        };
        self.current = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Whether an accept error is worth retrying
pub fn is_transient(err: &io::Error) -> bool {
    use io::ErrorKind::*;

    if matches!(
        err.kind(),
        ConnectionAborted | ConnectionReset | ConnectionRefused | Interrupted | WouldBlock | TimedOut
    ) {
        return true;
    }

    // ENFILE / EMFILE: descriptor exhaustion clears as connections close
    #[cfg(unix)]
    if matches!(err.raw_os_error(), Some(23) | Some(24)) {
        return true;
    }

    false
}

/// Listener for the sub link
#[derive(Debug)]
pub struct SubLinkListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl SubLinkListener {
    /// Bind to `address` (`ip:port`)
    ///
    /// # Errors
    /// `Jt809Error::Connection` naming the address if binding fails.
    pub async fn bind(address: &str) -> Jt809Result<Self> {
        let listener = TcpListener::bind(address).await.map_err(|e| {
            Jt809Error::Connection(io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", address, e),
            ))
        })?;
        let local_addr = listener.local_addr()?;
        log::info!("Sub-link listener bound on {}", local_addr);
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept one connection
    ///
    /// # Returns
    /// `Ok(None)` if `cancel` fires first.
    ///
    /// # Errors
    /// `Jt809Error::Connection` for a non-transient accept error.
    pub async fn accept(
        &self,
        cancel: &CancellationToken,
    ) -> Jt809Result<Option<(TcpStream, SocketAddr)>> {
        let accepted = accept_with_backoff(cancel, || self.listener.accept()).await?;
        if let Some((_, peer)) = &accepted {
            log::info!("Accepted sub link from {}", peer);
        }
        Ok(accepted)
    }
}

/// Drive `accept` until it yields a connection, retrying transient errors
async fn accept_with_backoff<T, F, Fut>(
    cancel: &CancellationToken,
    mut accept: F,
) -> Jt809Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    let mut backoff = AcceptBackoff::new();
    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            r = accept() => r,
        };

        match result {
            Ok(accepted) => return Ok(Some(accepted)),
            Err(e) if is_transient(&e) => {
                let delay = backoff.next_delay();
                log::debug!(
                    "Sub-link accept temporary error: {}, retrying in {:?}",
                    e,
                    delay
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(None),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => {
                log::error!("Sub-link accept error: {}", e);
                return Err(Jt809Error::Connection(e));
            }
        }
    }
}
