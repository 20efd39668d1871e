use super::{Action, StoriesState, reduce};
use tracing::debug;

/// An action on its way to the controller.
///
/// Actions produced by a search request carry that request's sequence
/// number; actions triggered directly by the user carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub seq: Option<u64>,
    pub action: Action,
}

impl Dispatch {
    pub fn request(seq: u64, action: Action) -> Self {
        Self {
            seq: Some(seq),
            action,
        }
    }

    pub fn user(action: Action) -> Self {
        Self { seq: None, action }
    }
}

/// Owns the stories state and funnels every change through [`reduce`].
#[derive(Debug, Default)]
pub struct StoriesController {
    state: StoriesState,
    latest_seq: u64,
    ignore_stale: bool,
}

impl StoriesController {
    /// With `ignore_stale` set, responses belonging to a request older than
    /// the most recently started one are dropped instead of applied.
    pub fn new(ignore_stale: bool) -> Self {
        Self {
            state: StoriesState::default(),
            latest_seq: 0,
            ignore_stale,
        }
    }

    pub fn state(&self) -> &StoriesState {
        &self.state
    }

    /// Apply a dispatch. Returns `false` when it was discarded as stale.
    pub fn dispatch(&mut self, dispatch: Dispatch) -> bool {
        let Dispatch { seq, action } = dispatch;

        if let Some(seq) = seq {
            match &action {
                Action::FetchInit => self.latest_seq = self.latest_seq.max(seq),
                Action::FetchSuccess(_) | Action::FetchFailure
                    if self.ignore_stale && seq < self.latest_seq =>
                {
                    debug!(
                        seq,
                        latest = self.latest_seq,
                        kind = action.kind(),
                        "discarding stale response"
                    );
                    return false;
                }
                _ => {}
            }
        }

        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
        true
    }
}
