//! One-compilation-per-fingerprint coordination.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use xcompile_common::Fingerprint;
use xcompile_compiler::{CompileError, CompiledArtifact};

pub(crate) type Outcome = Result<Arc<CompiledArtifact>, CompileError>;

/// A compilation in progress that other callers can wait on.
#[derive(Default)]
pub(crate) struct Flight {
    outcome: Mutex<Option<Outcome>>,
    ready: Condvar,
}

impl Flight {
    fn publish(&self, outcome: Outcome) {
        *self.outcome.lock() = Some(outcome);
        self.ready.notify_all();
    }

    /// Blocks until the leader publishes an outcome.
    pub(crate) fn wait(&self) -> Outcome {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.ready.wait(&mut slot);
        }
    }
}

/// Fingerprints currently being compiled.
#[derive(Default)]
pub(crate) struct InFlight {
    flights: DashMap<Fingerprint, Arc<Flight>>,
}

/// Either this caller compiles, or it waits on whoever already is.
pub(crate) enum Claim<'a> {
    Leader(LeaderGuard<'a>),
    Follower(Arc<Flight>),
}

impl InFlight {
    pub(crate) fn claim(&self, fingerprint: Fingerprint) -> Claim<'_> {
        match self.flights.entry(fingerprint) {
            Entry::Occupied(e) => Claim::Follower(Arc::clone(e.get())),
            Entry::Vacant(e) => {
                let flight = Arc::new(Flight::default());
                e.insert(Arc::clone(&flight));
                Claim::Leader(LeaderGuard {
                    table: self,
                    fingerprint,
                    flight,
                    finished: false,
                })
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.flights.len()
    }
}

/// Held by the caller that compiles a fingerprint.
///
/// Dropping the guard without calling [`finish`](Self::finish), e.g. when the
/// compiler panics, publishes an error so waiters are never stranded. Either
/// way the fingerprint leaves the table after its outcome is published.
pub(crate) struct LeaderGuard<'a> {
    table: &'a InFlight,
    fingerprint: Fingerprint,
    flight: Arc<Flight>,
    finished: bool,
}

impl LeaderGuard<'_> {
    pub(crate) fn finish(mut self, outcome: Outcome) {
        self.flight.publish(outcome);
        self.finished = true;
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.flight.publish(Err(CompileError::new(
                "xcompile",
                self.fingerprint.to_string(),
                "compilation aborted before producing a result",
            )));
        }
        self.table.flights.remove(&self.fingerprint);
    }
}
