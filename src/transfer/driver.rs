//! [`TransferDriver`]: a pooled, event-loop-driven HTTP client.
//!
//! Grounded on `original_source/webscraper/curldriver.hpp`/`curldriver.cpp`:
//! a fixed pool of transfer slots, a pending queue drained FIFO as slots
//! free, and completions invoked once per transfer. The libevent/curl-multi
//! socket loop has no direct async-Rust analogue; `spec.md §9` calls for
//! "one task owning a reactor handle" instead, so here a single background
//! task owns a [`tokio::task::JoinSet`] bounding in-flight transfers to the
//! pool size, with FIFO overflow going through a [`VecDeque`] exactly as the
//! original's `pending` queue does.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::TransferError;
use crate::transfer::options::{Method, RequestOptions};

/// What a completion callback is handed once a transfer finishes.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// Response body; empty on transport failure.
    pub body: Vec<u8>,
    /// The URL the transfer actually landed on, after redirects.
    pub effective_url: String,
    /// HTTP status; `0` signals a transport-level failure rather than a
    /// real response (`spec.md §4.1` failure semantics).
    pub status: u16,
}

impl TransferOutcome {
    /// Whether the transfer reached a server and got a 2xx/3xx/4xx/5xx
    /// response at all (as opposed to failing before one arrived).
    #[must_use]
    pub const fn reached_server(&self) -> bool {
        self.status != 0
    }
}

/// Invoked exactly once per submission, on the driver's event-loop task.
pub type Completion = Box<dyn FnOnce(TransferOutcome) + Send>;

struct Submission {
    url: String,
    options: RequestOptions,
    completion: Completion,
}

/// A pooled HTTP transfer driver.
///
/// Cheap to clone; clones share the same submission queue and worker task.
#[derive(Clone)]
pub struct TransferDriver {
    tx: mpsc::UnboundedSender<Submission>,
}

impl TransferDriver {
    /// Start the driver: `pool_size` concurrent transfer slots, sharing
    /// `user_agent` across every request (`spec.md §4.1`: "All transfers
    /// share a process-wide user-agent string configured at init").
    pub fn new(pool_size: usize, user_agent: &str) -> Result<Self, TransferError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.to_owned())
            .build()
            .map_err(|e| TransferError::DriverUnavailable(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run(client, rx, pool_size.max(1)));
        Ok(Self { tx })
    }

    /// Submit a transfer. Never blocks beyond the cost of an unbounded
    /// channel send; back-pressure happens inside the event-loop task, not
    /// here.
    pub fn submit(&self, url: impl Into<String>, options: RequestOptions, completion: Completion) {
        let submission = Submission { url: url.into(), options, completion };
        if self.tx.send(submission).is_err() {
            tracing::warn!("transfer driver submission after shutdown; dropping");
        }
    }

    async fn run(client: reqwest::Client, mut rx: mpsc::UnboundedReceiver<Submission>, pool_size: usize) {
        let mut pending: VecDeque<Submission> = VecDeque::new();
        let mut in_flight: JoinSet<()> = JoinSet::new();
        let mut channel_open = true;

        loop {
            tokio::select! {
                maybe_submission = rx.recv(), if channel_open => {
                    match maybe_submission {
                        Some(submission) => {
                            if in_flight.len() < pool_size {
                                Self::spawn_transfer(&client, submission, &mut in_flight);
                            } else {
                                pending.push_back(submission);
                            }
                        }
                        None => channel_open = false,
                    }
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Some(submission) = pending.pop_front() {
                        Self::spawn_transfer(&client, submission, &mut in_flight);
                    }
                }
            }

            if !channel_open && pending.is_empty() && in_flight.is_empty() {
                break;
            }
        }
    }

    fn spawn_transfer(client: &reqwest::Client, submission: Submission, in_flight: &mut JoinSet<()>) {
        let client = client.clone();
        in_flight.spawn(async move {
            let Submission { url, options, completion } = submission;

            let mut builder = match options.method {
                Method::Get => client.get(&url),
                Method::Post => client.post(&url),
            };
            for (name, value) in options.headers.iter() {
                builder = builder.header(name, value);
            }
            if let Some(body) = options.body {
                builder = builder.body(body);
            }

            let outcome = match builder.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let effective_url = response.url().to_string();
                    let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
                    TransferOutcome { body, effective_url, status }
                }
                Err(error) => {
                    tracing::warn!(url = %url, error = %error, "transfer failed");
                    TransferOutcome { body: Vec::new(), effective_url: url, status: 0 }
                }
            };

            completion(outcome);
        });
    }
}

/// Build the default, process-wide header-set: nothing beyond the driver's
/// own user-agent (set at the client level, not per-request).
#[must_use]
pub fn empty_headers() -> Arc<std::collections::HashMap<String, String>> {
    Arc::new(std::collections::HashMap::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU16, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn completes_a_successful_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
            .mount(&server)
            .await;

        let driver = TransferDriver::new(2, "pricehound-test/1.0").unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        driver.submit(format!("{}/ping", server.uri()), RequestOptions::get(), Box::new(move |outcome| {
            let _ = tx.send(outcome);
        }));

        let outcome = rx.await.unwrap();
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.body, b"pong");
    }

    #[tokio::test]
    async fn transport_failure_yields_zero_status_and_empty_body() {
        let driver = TransferDriver::new(1, "pricehound-test/1.0").unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        driver.submit(
            "http://127.0.0.1:1/unreachable",
            RequestOptions::get(),
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        );

        let outcome = rx.await.unwrap();
        assert!(!outcome.reached_server());
        assert!(outcome.body.is_empty());
    }

    #[tokio::test]
    async fn pool_saturation_drains_fifo() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let driver = TransferDriver::new(1, "pricehound-test/1.0").unwrap();
        let completed_order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let counter = Arc::new(AtomicU16::new(0));

        let mut receivers = Vec::new();
        for i in 0..3u16 {
            let (tx, rx) = tokio::sync::oneshot::channel();
            let order = Arc::clone(&completed_order);
            let counter = Arc::clone(&counter);
            driver.submit(server.uri(), RequestOptions::get(), Box::new(move |_outcome| {
                counter.fetch_add(1, Ordering::SeqCst);
                order.lock().unwrap().push(i);
                let _ = tx.send(());
            }));
            receivers.push(rx);
        }

        for rx in receivers {
            rx.await.unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(*completed_order.lock().unwrap(), vec![0, 1, 2]);
    }
}
