//! In-memory transport with scripted per-page responses
//!
//! Each page has a queue of steps consumed one per attempt; the last step repeats once the
//! queue runs dry. Every call is tracked so tests can tell completed requests from ones
//! that were dropped mid-flight.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use toprated::{Error, HttpTransport, NetworkFaultKind, Result, TransportResponse};

/// What one attempt at a page does
#[derive(Clone, Debug)]
pub enum Step {
    /// Answer with a status and body after `delay`
    Respond {
        status: u16,
        retry_after: Option<Duration>,
        body: Vec<u8>,
        delay: Duration,
    },
    /// Fail at the network layer after `delay`
    Fault {
        kind: NetworkFaultKind,
        delay: Duration,
    },
}

impl Step {
    /// 200 with `body`, immediately
    pub fn ok(body: Vec<u8>) -> Self {
        Step::Respond {
            status: 200,
            retry_after: None,
            body,
            delay: Duration::ZERO,
        }
    }

    /// 200 with `body` after `delay`
    pub fn ok_after(body: Vec<u8>, delay: Duration) -> Self {
        Step::Respond {
            status: 200,
            retry_after: None,
            body,
            delay,
        }
    }

    /// Bare status, immediately
    pub fn status(status: u16) -> Self {
        Step::Respond {
            status,
            retry_after: None,
            body: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    /// 429 with a `Retry-After`
    pub fn rate_limited(retry_after: Duration) -> Self {
        Step::Respond {
            status: 429,
            retry_after: Some(retry_after),
            body: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    /// Network fault, immediately
    pub fn fault(kind: NetworkFaultKind) -> Self {
        Step::Fault {
            kind,
            delay: Duration::ZERO,
        }
    }
}

/// Scripted [`HttpTransport`]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<u32, Vec<Step>>>,
    calls: Mutex<Vec<(u32, Instant)>>,
    max_in_flight: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    completed: AtomicUsize,
    cancelled: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            max_in_flight,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
        }
    }

    /// Queue the steps for `page`, builder style
    pub fn page(self, page: u32, steps: Vec<Step>) -> Self {
        self.scripts.lock().unwrap().insert(page, steps);
        self
    }

    /// Number of attempts made at `page`
    pub fn calls_for(&self, page: u32) -> usize {
        self.calls.lock().unwrap().iter().filter(|(p, _)| *p == page).count()
    }

    /// Instants at which `page` was requested
    pub fn call_times(&self, page: u32) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == page)
            .map(|(_, t)| *t)
            .collect()
    }

    /// Total attempts across all pages
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Requests dropped before they produced an outcome
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Requests that produced an outcome (success or fault)
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Requests currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous requests observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_step(&self, page: u32) -> Option<Step> {
        let mut scripts = self.scripts.lock().unwrap();
        let steps = scripts.get_mut(&page)?;
        if steps.len() > 1 {
            Some(steps.remove(0))
        } else {
            steps.first().cloned()
        }
    }
}

/// Tracks one request; counts it as cancelled if dropped before `finish`
struct CallGuard<'a> {
    transport: &'a ScriptedTransport,
    finished: bool,
}

impl<'a> CallGuard<'a> {
    fn start(transport: &'a ScriptedTransport) -> Self {
        let now = transport.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        transport.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self {
            transport,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
        self.transport.completed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.transport.in_flight.fetch_sub(1, Ordering::SeqCst);
        if !self.finished {
            self.transport.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get_page(&self, key: &str, page: u32) -> Result<TransportResponse> {
        self.calls.lock().unwrap().push((page, Instant::now()));
        let guard = CallGuard::start(self);

        let outcome = match self.next_step(page) {
            None => Ok(TransportResponse {
                status: 404,
                retry_after: None,
                body: Vec::new(),
            }),
            Some(Step::Respond {
                status,
                retry_after,
                body,
                delay,
            }) => {
                tokio::time::sleep(delay).await;
                Ok(TransportResponse {
                    status,
                    retry_after,
                    body,
                })
            }
            Some(Step::Fault { kind, delay }) => {
                tokio::time::sleep(delay).await;
                Err(Error::Network {
                    key: key.to_string(),
                    page,
                    kind,
                    message: "scripted fault".to_string(),
                })
            }
        };

        guard.finish();
        outcome
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}
