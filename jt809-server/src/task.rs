//! Supervised task spawning

use std::any::Any;
use std::future::Future;
use tokio::task::JoinHandle;

/// Spawn `future` and log it if it panics
///
/// The returned handle belongs to the supervisor and completes once the
/// task has ended, whether normally, by panic or by runtime shutdown.
pub fn spawn_supervised<F>(name: &'static str, future: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(future);
    tokio::spawn(async move {
        match handle.await {
            Ok(()) => log::trace!("Task {} finished", name),
            Err(e) if e.is_panic() => {
                log::error!("Task {} panicked: {}", name, panic_message(e.into_panic().as_ref()));
            }
            Err(e) => log::debug!("Task {} cancelled: {}", name, e),
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
