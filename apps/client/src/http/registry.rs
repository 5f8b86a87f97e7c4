use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, Shared};

use crate::errors::ApiError;
use crate::http::ApiResponse;

/// Outcome of an in-flight request, awaitable by any number of callers.
pub type SharedResponse = Shared<BoxFuture<'static, Result<ApiResponse, ApiError>>>;

struct PendingEntry {
    ticket: u64,
    response: SharedResponse,
}

#[derive(Default)]
struct RegistryState {
    next_ticket: u64,
    entries: HashMap<String, PendingEntry>,
}

/// What `claim` handed back to the caller.
pub(crate) enum Claim {
    /// Another call with the same fingerprint is already running.
    Joined(SharedResponse),
    /// This caller started the call.
    Issued(SharedResponse),
}

/// In-flight GETs by fingerprint. Each entry is `IN_FLIGHT` until the call
/// that created it settles; removal is keyed by that call's ticket.
#[derive(Default)]
pub struct PendingRegistry {
    state: Mutex<RegistryState>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Joins the entry for `key` if one exists, otherwise calls `start` with a
    /// fresh ticket and registers the future it returns. Lookup, start and
    /// insert happen under one lock, so `start` must not block.
    pub(crate) fn claim<F>(&self, key: &str, start: F) -> Claim
    where
        F: FnOnce(u64) -> SharedResponse,
    {
        let mut state = self.lock();
        if let Some(entry) = state.entries.get(key) {
            return Claim::Joined(entry.response.clone());
        }
        state.next_ticket += 1;
        let ticket = state.next_ticket;
        let response = start(ticket);
        state.entries.insert(
            key.to_string(),
            PendingEntry {
                ticket,
                response: response.clone(),
            },
        );
        Claim::Issued(response)
    }

    /// Removes the entry for `key` only if it still belongs to `ticket`.
    /// Returns whether anything was removed.
    pub(crate) fn release(&self, key: &str, ticket: u64) -> bool {
        let mut state = self.lock();
        match state.entries.get(key) {
            Some(entry) if entry.ticket == ticket => {
                state.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
