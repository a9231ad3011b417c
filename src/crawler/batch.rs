use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use parking_lot::Mutex;

use super::{fetch_with_retry, FetchError, Fetcher, Response, RetryPolicy};

/// Cooperative cancellation shared between the evaluator and batch workers.
///
/// Cancelling drops the only sender of a never-used channel, which wakes every
/// receiver blocked on it.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<Mutex<Option<Sender<()>>>>,
    receiver: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = channel::bounded(0);
        Self { sender: Arc::new(Mutex::new(Some(sender))), receiver }
    }

    pub fn cancel(&self) {
        if self.sender.lock().take().is_some() {
            tracing::info!("batch cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Sleeps for `timeout` unless cancelled first. Returns whether the token
    /// was cancelled.
    pub fn wait(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Err(channel::RecvTimeoutError::Timeout) => false,
            _ => true,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Responses of a batch in completion order. Ends once every URL has been
/// accounted for.
#[derive(Debug)]
pub struct BatchStream {
    results: Receiver<Response>,
}

impl Iterator for BatchStream {
    type Item = Response;

    fn next(&mut self) -> Option<Self::Item> {
        self.results.recv().ok()
    }
}

/// Fetches every URL with at most `concurrency` requests in flight.
///
/// A dispatcher thread takes a permit from a bounded channel before starting
/// each worker; workers hand the permit back after sending their response.
pub fn fetch_batch(
    fetcher: Arc<dyn Fetcher>,
    urls: Vec<String>,
    concurrency: usize,
    policy: RetryPolicy,
    cancel: CancelToken,
) -> BatchStream {
    let concurrency = concurrency.max(1);
    let (result_tx, result_rx) = channel::unbounded();

    tracing::debug!(count = urls.len(), concurrency, "dispatching batch");

    let dispatcher = {
        let result_tx = result_tx.clone();
        move || dispatch(fetcher, urls, concurrency, policy, cancel, result_tx)
    };

    if let Err(e) = thread::Builder::new().name("harvest-batch".to_owned()).spawn(dispatcher) {
        // The closure (and the URLs in it) is gone; report the failure once.
        tracing::error!(error = %e, "failed to start batch dispatcher");
        let _ = result_tx.send(Response::failed("", FetchError::Transport(e.to_string())));
    }

    BatchStream { results: result_rx }
}

fn dispatch(
    fetcher: Arc<dyn Fetcher>,
    urls: Vec<String>,
    concurrency: usize,
    policy: RetryPolicy,
    cancel: CancelToken,
    results: Sender<Response>,
) {
    let (permit_tx, permit_rx) = channel::bounded::<()>(concurrency);
    let mut pending = urls.into_iter();

    while let Some(url) = pending.next() {
        if cancel.is_cancelled() {
            drain_cancelled(url, pending, &results);
            return;
        }

        select! {
            send(permit_tx, ()) -> _ => {}
            recv(cancel.receiver) -> _ => {
                drain_cancelled(url, pending, &results);
                return;
            }
        }

        let worker = {
            let fetcher = fetcher.clone();
            let cancel = cancel.clone();
            let results = results.clone();
            let permits = permit_rx.clone();
            let url = url.clone();
            move || {
                let response = match fetch_with_retry(fetcher.as_ref(), &url, &policy, &cancel) {
                    Ok(response) => response,
                    Err(e) => Response::failed(url, e),
                };
                let _ = results.send(response);
                let _ = permits.recv();
            }
        };

        if let Err(e) = thread::Builder::new().name("harvest-fetch".to_owned()).spawn(worker) {
            tracing::error!(url, error = %e, "failed to start fetch worker");
            let _ = results.send(Response::failed(url, FetchError::Transport(e.to_string())));
            let _ = permit_rx.try_recv();
        }
    }
}

fn drain_cancelled(url: String, rest: impl Iterator<Item = String>, results: &Sender<Response>) {
    for url in std::iter::once(url).chain(rest) {
        let _ = results.send(Response::failed(url, FetchError::Cancelled));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_wakes_waiters() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(!token.wait(Duration::from_millis(1)));

        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
        assert!(token.wait(Duration::from_secs(60)));
    }
}
