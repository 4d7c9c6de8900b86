use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

use super::link::{LinkError, LinkOperation, LinkOutput, LinkResult, LinkStatus};
use crate::model::Alarm;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedLinkConfig {
    pub connect_latency_ms: u64,
    pub disconnect_latency_ms: u64,
    pub send_latency_ms: u64,
    /// Probability in `[0, 1]` that an unscripted connect or send fails.
    pub failure_rate: f64,
    pub seed: u64,
}

impl Default for SimulatedLinkConfig {
    fn default() -> Self {
        Self {
            connect_latency_ms: 1500,
            disconnect_latency_ms: 500,
            send_latency_ms: 1000,
            failure_rate: 0.0,
            seed: 0,
        }
    }
}

impl SimulatedLinkConfig {
    /// No latency, no random failures.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            connect_latency_ms: 0,
            disconnect_latency_ms: 0,
            send_latency_ms: 0,
            ..Self::default()
        }
    }
}

type Scripted = Result<bool, LinkError>;

#[derive(Debug, Default)]
struct Scripts {
    connect: VecDeque<Scripted>,
    send: VecDeque<Scripted>,
    disconnect: VecDeque<LinkError>,
}

/// Shell-side stand-in for the BLE driver: answers [`LinkOperation`]s the
/// way a real peripheral would.
///
/// Outcomes come from the scripted queues first; once those are exhausted,
/// from a seeded RNG driven by `failure_rate`. Every call is recorded so
/// tests can assert on what reached the "peripheral".
#[derive(Debug)]
pub struct SimulatedLink {
    config: SimulatedLinkConfig,
    connected: AtomicBool,
    connecting: AtomicBool,
    scripts: Mutex<Scripts>,
    rng: Mutex<StdRng>,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    status_queries: AtomicUsize,
    sent: Mutex<Vec<Vec<Alarm>>>,
}

impl Default for SimulatedLink {
    fn default() -> Self {
        Self::new(SimulatedLinkConfig::default())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimulatedLink {
    #[must_use]
    pub fn new(config: SimulatedLinkConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            connected: AtomicBool::new(false),
            connecting: AtomicBool::new(false),
            scripts: Mutex::new(Scripts::default()),
            rng: Mutex::new(rng),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            status_queries: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn instant() -> Self {
        Self::new(SimulatedLinkConfig::instant())
    }

    /// Pretend the driver was already connected before the core started.
    pub fn mark_connected(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    pub fn script_connect(&self, outcomes: impl IntoIterator<Item = bool>) {
        lock(&self.scripts).connect.extend(outcomes.into_iter().map(Ok));
    }

    pub fn script_send(&self, outcomes: impl IntoIterator<Item = bool>) {
        lock(&self.scripts).send.extend(outcomes.into_iter().map(Ok));
    }

    pub fn inject_connect_error(&self, error: LinkError) {
        lock(&self.scripts).connect.push_back(Err(error));
    }

    pub fn inject_send_error(&self, error: LinkError) {
        lock(&self.scripts).send.push_back(Err(error));
    }

    /// The next disconnect fails and leaves the driver's mirror connected.
    pub fn inject_disconnect_error(&self, error: LinkError) {
        lock(&self.scripts).disconnect.push_back(error);
    }

    #[must_use]
    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn send_calls(&self) -> usize {
        lock(&self.sent).len()
    }

    #[must_use]
    pub fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    /// Every alarm list that reached the peripheral, in call order.
    #[must_use]
    pub fn sent_configurations(&self) -> Vec<Vec<Alarm>> {
        lock(&self.sent).clone()
    }

    #[must_use]
    pub fn status(&self) -> LinkStatus {
        LinkStatus {
            connected: self.connected.load(Ordering::SeqCst),
            connecting: self.connecting.load(Ordering::SeqCst),
        }
    }

    #[must_use]
    pub fn latency(&self, operation: &LinkOperation) -> Duration {
        let millis = match operation {
            LinkOperation::Connect => self.config.connect_latency_ms,
            LinkOperation::Disconnect => self.config.disconnect_latency_ms,
            LinkOperation::SendConfiguration { .. } => self.config.send_latency_ms,
            LinkOperation::QueryStatus => 0,
        };
        Duration::from_millis(millis)
    }

    /// Run `operation` after its configured latency.
    pub async fn perform(&self, operation: &LinkOperation) -> LinkResult {
        let connecting = matches!(operation, LinkOperation::Connect);
        if connecting {
            self.connecting.store(true, Ordering::SeqCst);
        }
        tokio::time::sleep(self.latency(operation)).await;
        self.respond(operation)
    }

    /// Answer `operation` immediately.
    pub fn respond(&self, operation: &LinkOperation) -> LinkResult {
        let result = match operation {
            LinkOperation::Connect => {
                self.connect_calls.fetch_add(1, Ordering::SeqCst);
                let scripted = lock(&self.scripts).connect.pop_front();
                let outcome = scripted.unwrap_or_else(|| Ok(self.random_outcome()));
                self.connecting.store(false, Ordering::SeqCst);
                self.connected
                    .store(matches!(outcome, Ok(true)), Ordering::SeqCst);
                outcome.map(LinkOutput::Connected)
            }
            LinkOperation::Disconnect => {
                self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
                let injected = lock(&self.scripts).disconnect.pop_front();
                match injected {
                    Some(error) => Err(error),
                    None => {
                        self.connected.store(false, Ordering::SeqCst);
                        Ok(LinkOutput::Disconnected)
                    }
                }
            }
            LinkOperation::SendConfiguration { alarms } => {
                lock(&self.sent).push(alarms.clone());
                let scripted = lock(&self.scripts).send.pop_front();
                let outcome = scripted.unwrap_or_else(|| Ok(self.random_outcome()));
                outcome.map(LinkOutput::ConfigurationAccepted)
            }
            LinkOperation::QueryStatus => {
                self.status_queries.fetch_add(1, Ordering::SeqCst);
                Ok(LinkOutput::Status(self.status()))
            }
        };
        debug!(op = operation.name(), ?result, "Simulated link answered");
        result
    }

    fn random_outcome(&self) -> bool {
        let rate = self.config.failure_rate.clamp(0.0, 1.0);
        !lock(&self.rng).gen_bool(rate)
    }
}
