use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use harvest::crawler::{fetch_batch, CancelToken, FetchError, Fetcher, Response, RetryPolicy};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

/// Sleeps on every request and records how many were running at once.
#[derive(Default)]
struct SlowFetcher {
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    failing: Vec<&'static str>,
}

impl SlowFetcher {
    fn new(delay: Duration) -> Self {
        Self { delay, ..Default::default() }
    }
}

impl Fetcher for SlowFetcher {
    fn fetch(&self, url: &str) -> Result<Response, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&url) {
            return Err(FetchError::Transport("connection reset".to_owned()));
        }
        Ok(Response { status: 200, body: format!("body of {url}"), url: url.to_owned(), ..Default::default() })
    }
}

/// Fails the first `failures` attempts of every URL.
struct FlakyFetcher {
    failures: usize,
    attempts: Mutex<Vec<String>>,
}

impl Fetcher for FlakyFetcher {
    fn fetch(&self, url: &str) -> Result<Response, FetchError> {
        let mut attempts = self.attempts.lock();
        attempts.push(url.to_owned());
        let seen = attempts.iter().filter(|u| *u == url).count();
        if seen <= self.failures {
            return Err(FetchError::Timeout(url.to_owned()));
        }
        Ok(Response { status: 200, url: url.to_owned(), ..Default::default() })
    }
}

/// Answers each URL after its own delay.
struct DelayedFetcher {
    delays: Vec<(&'static str, Duration)>,
}

impl Fetcher for DelayedFetcher {
    fn fetch(&self, url: &str) -> Result<Response, FetchError> {
        let delay = self.delays.iter().find(|(u, _)| *u == url).map(|(_, d)| *d).unwrap_or_default();
        thread::sleep(delay);
        Ok(Response { status: 200, url: url.to_owned(), ..Default::default() })
    }
}

fn urls(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("http://site/{i}")).collect()
}

#[test]
fn every_url_gets_exactly_one_response() {
    let fetcher = Arc::new(SlowFetcher::new(Duration::from_millis(20)));
    let mut responses: Vec<Response> =
        fetch_batch(fetcher.clone(), urls(3), 2, RetryPolicy::none(), CancelToken::new()).collect();

    responses.sort_by(|a, b| a.url.cmp(&b.url));
    let seen: Vec<_> = responses.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(seen, vec!["http://site/0", "http://site/1", "http://site/2"]);
    assert!(responses.iter().all(|r| r.body == format!("body of {}", r.url)));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn responses_arrive_in_completion_order() {
    let fetcher = Arc::new(DelayedFetcher {
        delays: vec![
            ("http://slow", Duration::from_millis(400)),
            ("http://medium", Duration::from_millis(150)),
            ("http://fast", Duration::ZERO),
        ],
    });
    let submitted = vec!["http://slow".to_owned(), "http://medium".to_owned(), "http://fast".to_owned()];

    let order: Vec<String> = fetch_batch(fetcher, submitted, 3, RetryPolicy::none(), CancelToken::new())
        .map(|response| response.url)
        .collect();

    assert_eq!(order, vec!["http://fast", "http://medium", "http://slow"]);
}

#[test]
fn concurrency_bounds_requests_in_flight() {
    let fetcher = Arc::new(SlowFetcher::new(Duration::from_millis(30)));
    let count = fetch_batch(fetcher.clone(), urls(10), 3, RetryPolicy::none(), CancelToken::new()).count();

    assert_eq!(count, 10);
    let peak = fetcher.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "{peak} requests ran at once");
    assert!(peak >= 2, "batch never ran requests in parallel");
}

#[test]
fn zero_concurrency_still_makes_progress() {
    let fetcher = Arc::new(SlowFetcher::new(Duration::ZERO));
    let count = fetch_batch(fetcher.clone(), urls(4), 0, RetryPolicy::none(), CancelToken::new()).count();

    assert_eq!(count, 4);
    assert_eq!(fetcher.peak.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_batch_ends_immediately() {
    let fetcher = Arc::new(SlowFetcher::new(Duration::ZERO));
    assert_eq!(fetch_batch(fetcher, vec![], 4, RetryPolicy::none(), CancelToken::new()).count(), 0);
}

#[test]
fn failures_are_reported_per_url() {
    let fetcher = Arc::new(SlowFetcher {
        failing: vec!["http://site/1"],
        ..SlowFetcher::new(Duration::ZERO)
    });
    let mut responses: Vec<Response> =
        fetch_batch(fetcher, urls(3), 2, RetryPolicy::none(), CancelToken::new()).collect();
    responses.sort_by(|a, b| a.url.cmp(&b.url));

    assert!(responses[0].is_success());
    assert_eq!(responses[1].error, Some(FetchError::Transport("connection reset".to_owned())));
    assert_eq!(responses[1].status, 0);
    assert!(responses[2].is_success());
}

#[test]
fn transient_failures_are_retried() {
    let fetcher = Arc::new(FlakyFetcher { failures: 2, attempts: Mutex::new(vec![]) });
    let policy = RetryPolicy { max_retries: 2, backoff: Duration::from_millis(1) };
    let responses: Vec<Response> =
        fetch_batch(fetcher.clone(), urls(2), 2, policy, CancelToken::new()).collect();

    assert!(responses.iter().all(Response::is_success));
    assert_eq!(fetcher.attempts.lock().len(), 6);
}

#[test]
fn retries_give_up_after_the_limit() {
    let fetcher = Arc::new(FlakyFetcher { failures: 5, attempts: Mutex::new(vec![]) });
    let policy = RetryPolicy { max_retries: 1, backoff: Duration::from_millis(1) };
    let responses: Vec<Response> =
        fetch_batch(fetcher.clone(), urls(1), 1, policy, CancelToken::new()).collect();

    assert_eq!(responses[0].error, Some(FetchError::Timeout("http://site/0".to_owned())));
    assert_eq!(fetcher.attempts.lock().len(), 2);
}

#[test]
fn cancelled_before_start_fetches_nothing() {
    let fetcher = Arc::new(SlowFetcher::new(Duration::ZERO));
    let cancel = CancelToken::new();
    cancel.cancel();

    let responses: Vec<Response> =
        fetch_batch(fetcher.clone(), urls(3), 2, RetryPolicy::none(), cancel).collect();

    assert_eq!(responses.len(), 3);
    assert!(responses.iter().all(|r| r.error == Some(FetchError::Cancelled)));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn cancelling_stops_pending_work() {
    let fetcher = Arc::new(SlowFetcher::new(Duration::from_millis(100)));
    let cancel = CancelToken::new();
    let mut stream = fetch_batch(fetcher.clone(), urls(20), 1, RetryPolicy::none(), cancel.clone());

    let first = stream.next().expect("first response");
    assert!(first.is_success());
    cancel.cancel();

    let started = Instant::now();
    let rest: Vec<Response> = stream.collect();
    assert_eq!(rest.len(), 19);
    assert!(rest.iter().filter(|r| r.error == Some(FetchError::Cancelled)).count() >= 17);
    assert!(fetcher.calls.load(Ordering::SeqCst) < 20);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn cancel_interrupts_retry_backoff_and_keeps_the_failure() {
    let fetcher = Arc::new(FlakyFetcher { failures: 10, attempts: Mutex::new(vec![]) });
    let policy = RetryPolicy { max_retries: 5, backoff: Duration::from_secs(30) };
    let cancel = CancelToken::new();
    let stream = fetch_batch(fetcher, urls(1), 1, policy, cancel.clone());

    thread::sleep(Duration::from_millis(50));
    let started = Instant::now();
    cancel.cancel();

    let responses: Vec<Response> = stream.collect();
    assert_eq!(responses[0].error, Some(FetchError::Timeout("http://site/0".to_owned())));
    assert!(started.elapsed() < Duration::from_secs(5));
}
