use crate::api::{self, ApiError, SearchBackend};
use crate::stories::{Action, Dispatch, Story};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use url::Url;

/// When a search request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerPolicy {
    /// Every change of the search term fires a request.
    #[default]
    Automatic,
    /// Only an explicit submit fires a request.
    Manual,
}

/// The text being edited and the query that requests are built from.
///
/// Under [`TriggerPolicy::Automatic`] both always agree; under
/// [`TriggerPolicy::Manual`] the confirmed query only moves on submit.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    policy: TriggerPolicy,
    input: String,
    confirmed: String,
}

impl SearchQuery {
    pub fn new(policy: TriggerPolicy, initial: impl Into<String>) -> Self {
        let input = initial.into();
        Self {
            policy,
            confirmed: input.clone(),
            input,
        }
    }

    pub fn policy(&self) -> TriggerPolicy {
        self.policy
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn confirmed(&self) -> &str {
        &self.confirmed
    }

    /// Replace the input text. Returns the term to fetch if this policy
    /// fetches on change.
    pub fn change(&mut self, term: impl Into<String>) -> Option<&str> {
        self.input = term.into();
        match self.policy {
            TriggerPolicy::Automatic => {
                self.confirmed.clone_from(&self.input);
                Some(&self.confirmed)
            }
            TriggerPolicy::Manual => None,
        }
    }

    /// Confirm the current input and return it as the term to fetch.
    pub fn submit(&mut self) -> &str {
        self.confirmed.clone_from(&self.input);
        &self.confirmed
    }
}

/// Issues search requests and turns their outcome into dispatches.
///
/// Every request gets the next sequence number. `FETCH_INIT` is sent before
/// the request starts; exactly one `FETCH_SUCCESS` or `FETCH_FAILURE` with
/// the same number follows when it settles. Superseded requests are not
/// cancelled.
pub struct FetchOrchestrator<B> {
    backend: Arc<B>,
    api_base: Url,
    next_seq: u64,
    tx: UnboundedSender<Dispatch>,
}

impl<B: SearchBackend> FetchOrchestrator<B> {
    pub fn new(backend: B, api_base: Url, tx: UnboundedSender<Dispatch>) -> Self {
        Self {
            backend: Arc::new(backend),
            api_base,
            next_seq: 0,
            tx,
        }
    }

    /// Start a search for `term` on a background task.
    ///
    /// A blank term issues nothing and dispatches nothing. Must be called
    /// from within a tokio runtime.
    pub fn fetch(&mut self, term: &str) -> Option<u64> {
        let Some(url) = api::request_url(&self.api_base, term) else {
            debug!("blank search term, not fetching");
            return None;
        };

        self.next_seq += 1;
        let seq = self.next_seq;
        info!(seq, term, "searching stories");

        if self.tx.send(Dispatch::request(seq, Action::FetchInit)).is_err() {
            warn!(seq, "dispatch channel closed, dropping request");
            return None;
        }

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let action = settle(seq, backend.search(url).await);
            let _ = tx.send(Dispatch::request(seq, action));
        });

        Some(seq)
    }
}

/// Run one search inline, handing each action to `dispatch` as the
/// request progresses. Returns `false` when the term was blank.
pub async fn search_once<B: SearchBackend>(
    backend: &B,
    api_base: &Url,
    term: &str,
    mut dispatch: impl FnMut(Action),
) -> bool {
    let Some(url) = api::request_url(api_base, term) else {
        return false;
    };
    dispatch(Action::FetchInit);
    dispatch(settle(0, backend.search(url).await));
    true
}

fn settle(seq: u64, result: Result<Vec<Story>, ApiError>) -> Action {
    match result {
        Ok(stories) => {
            debug!(seq, count = stories.len(), "search settled");
            Action::FetchSuccess(stories)
        }
        Err(e) => {
            warn!(seq, error = %e, "search failed");
            Action::FetchFailure
        }
    }
}
