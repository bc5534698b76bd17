//! Recording fakes for the publisher's external seams.
//!
//! Each fake records what it was asked to do so tests can assert on call
//! counts, keys, and bytes without touching the network.

use crate::artefact::sha256_digest::Sha256Digest;
use crate::cdn::{CdnClient, CdnError, Clock, InvalidationRequest};
use crate::destination::Destination;
use crate::retry::Sleeper;
use crate::storage::{ObjectStore, StoreError};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::{Duration, SystemTime};

/// An object written to a [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Where it was written.
    pub destination: Destination,
    /// The bytes written.
    pub body: Vec<u8>,
    /// The checksum sent with it.
    pub digest: Sha256Digest,
}

/// An in-memory [`ObjectStore`].
///
/// Successful puts are appended to a log and overwrite the bucket view, so
/// the final contents can be compared across runs. Failures can be scripted
/// per key.
#[derive(Debug, Default)]
pub struct RecordingStore {
    puts: RefCell<Vec<StoredObject>>,
    attempts: RefCell<usize>,
    failures: RefCell<HashMap<String, VecDeque<StoreError>>>,
}

impl RecordingStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next put to `key` with `error`. Queued failures are used in
    /// order before puts to `key` succeed again.
    pub fn fail_next(&self, key: impl Into<String>, error: StoreError) {
        self.failures
            .borrow_mut()
            .entry(key.into())
            .or_default()
            .push_back(error);
    }

    /// Every successful put, in order.
    #[must_use]
    pub fn puts(&self) -> Vec<StoredObject> {
        self.puts.borrow().clone()
    }

    /// Keys of every successful put, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.puts
            .borrow()
            .iter()
            .map(|object| object.destination.key.clone())
            .collect()
    }

    /// Number of put calls, successful or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        *self.attempts.borrow()
    }

    /// Final bucket contents: key to bytes, last write wins.
    #[must_use]
    pub fn contents(&self) -> BTreeMap<String, Vec<u8>> {
        self.puts
            .borrow()
            .iter()
            .map(|object| (object.destination.key.clone(), object.body.clone()))
            .collect()
    }

    /// The most recent successful put to `key`.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.puts
            .borrow()
            .iter()
            .rev()
            .find(|object| object.destination.key == key)
            .cloned()
    }
}

impl ObjectStore for RecordingStore {
    fn put_object(
        &self,
        destination: &Destination,
        body: &[u8],
        digest: &Sha256Digest,
    ) -> Result<(), StoreError> {
        *self.attempts.borrow_mut() += 1;
        let scripted = self
            .failures
            .borrow_mut()
            .get_mut(&destination.key)
            .and_then(VecDeque::pop_front);
        if let Some(error) = scripted {
            return Err(error);
        }
        self.puts.borrow_mut().push(StoredObject {
            destination: destination.clone(),
            body: body.to_vec(),
            digest: *digest,
        });
        Ok(())
    }
}

/// A [`CdnClient`] that records requests.
#[derive(Debug, Default)]
pub struct RecordingCdn {
    requests: RefCell<Vec<InvalidationRequest>>,
    failures: RefCell<VecDeque<CdnError>>,
}

impl RecordingCdn {
    /// Create a CDN that accepts every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next request with `error`.
    pub fn fail_next(&self, error: CdnError) {
        self.failures.borrow_mut().push_back(error);
    }

    /// Every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<InvalidationRequest> {
        self.requests.borrow().clone()
    }

    /// Number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl CdnClient for RecordingCdn {
    fn create_invalidation(&self, request: &InvalidationRequest) -> Result<String, CdnError> {
        self.requests.borrow_mut().push(request.clone());
        if let Some(error) = self.failures.borrow_mut().pop_front() {
            return Err(error);
        }
        Ok(format!("I{}", self.requests.borrow().len()))
    }
}

/// A [`Sleeper`] that records delays instead of waiting.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Create a sleeper with no recorded delays.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far.
    #[must_use]
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration) {
        self.delays.borrow_mut().push(delay);
    }
}

/// A [`Clock`] stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub SystemTime);

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}
