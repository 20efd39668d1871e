mod controller;

pub use controller::{Dispatch, StoriesController};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Identifier of a story. The search API sends strings, hand-written
/// story files often use plain integers; both decode to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StoryId(String);

impl StoryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for StoryId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for StoryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => StoryId(s),
            RawId::Number(n) => StoryId(n.to_string()),
        })
    }
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub num_comments: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
    #[serde(rename = "objectID")]
    pub object_id: StoryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Stories plus the request lifecycle flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoriesState {
    pub data: Vec<Story>,
    pub is_loading: bool,
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    FetchInit,
    FetchSuccess(Vec<Story>),
    FetchFailure,
    RemoveStory(Story),
}

impl Action {
    /// Wire name of the action kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchInit => "FETCH_INIT",
            Self::FetchSuccess(_) => "FETCH_SUCCESS",
            Self::FetchFailure => "FETCH_FAILURE",
            Self::RemoveStory(_) => "REMOVE_STORY",
        }
    }
}

/// Apply one action to the stories state.
///
/// Pure: the same `(state, action)` pair always yields the same result.
pub fn reduce(state: StoriesState, action: Action) -> StoriesState {
    match action {
        Action::FetchInit => StoriesState {
            is_loading: true,
            is_error: false,
            ..state
        },
        Action::FetchSuccess(stories) => StoriesState {
            data: dedup_by_id(stories),
            is_loading: false,
            is_error: false,
        },
        Action::FetchFailure => StoriesState {
            is_loading: false,
            is_error: true,
            ..state
        },
        Action::RemoveStory(story) => {
            let mut state = state;
            state.data.retain(|s| s.object_id != story.object_id);
            state
        }
    }
}

/// Keep the first story for every id, preserving response order.
fn dedup_by_id(mut stories: Vec<Story>) -> Vec<Story> {
    let mut seen = HashSet::with_capacity(stories.len());
    stories.retain(|s| seen.insert(s.object_id.clone()));
    stories
}

/// Untyped action as found in recorded action logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

/// Raised when an envelope cannot become an [`Action`]. An unknown kind
/// is a programming error on the producer side and is never recovered.
#[derive(Error, Debug)]
pub enum ReduceError {
    #[error("unknown action kind: {0}")]
    UnknownAction(String),

    #[error("invalid payload for {kind}: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TryFrom<ActionEnvelope> for Action {
    type Error = ReduceError;

    fn try_from(envelope: ActionEnvelope) -> Result<Self, Self::Error> {
        let ActionEnvelope { kind, payload } = envelope;
        let invalid = |source| ReduceError::InvalidPayload {
            kind: kind.clone(),
            source,
        };

        match kind.as_str() {
            "FETCH_INIT" => Ok(Action::FetchInit),
            "FETCH_FAILURE" => Ok(Action::FetchFailure),
            "FETCH_SUCCESS" => serde_json::from_value(payload)
                .map(Action::FetchSuccess)
                .map_err(invalid),
            "REMOVE_STORY" => serde_json::from_value(payload)
                .map(Action::RemoveStory)
                .map_err(invalid),
            _ => Err(ReduceError::UnknownAction(kind.clone())),
        }
    }
}

/// Decode and apply a recorded action.
pub fn reduce_envelope(
    state: StoriesState,
    envelope: ActionEnvelope,
) -> Result<StoriesState, ReduceError> {
    let action = Action::try_from(envelope)?;
    Ok(reduce(state, action))
}


#[cfg(test)]
mod tests {
    use super::testing::story;
    use super::*;
    use proptest::prelude::*;

    fn ids(state: &StoriesState) -> Vec<&str> {
        state.data.iter().map(|s| s.object_id.as_str()).collect()
    }

    #[test]
    fn test_fetch_init_sets_loading_and_keeps_data() {
        let state = StoriesState {
            data: vec![story(1, "React")],
            is_loading: false,
            is_error: true,
        };
        let next = reduce(state, Action::FetchInit);
        assert!(next.is_loading);
        assert!(!next.is_error);
        assert_eq!(ids(&next), vec!["1"]);
    }

    #[test]
    fn test_fetch_success_replaces_data() {
        let state = StoriesState {
            data: vec![story(1, "React"), story(2, "Vue")],
            is_loading: true,
            is_error: false,
        };
        let next = reduce(state, Action::FetchSuccess(vec![story(3, "Svelte")]));
        assert_eq!(ids(&next), vec!["3"]);
        assert!(!next.is_loading);
        assert!(!next.is_error);
    }

    #[test]
    fn test_fetch_success_drops_duplicate_ids() {
        let payload = vec![story(1, "first"), story(2, "other"), story(1, "second")];
        let next = reduce(StoriesState::default(), Action::FetchSuccess(payload));
        assert_eq!(ids(&next), vec!["1", "2"]);
        assert_eq!(next.data[0].title, "first");
    }

    #[test]
    fn test_fetch_failure_keeps_data() {
        let state = StoriesState {
            data: vec![story(1, "React")],
            is_loading: true,
            is_error: false,
        };
        let next = reduce(state, Action::FetchFailure);
        assert!(!next.is_loading);
        assert!(next.is_error);
        assert_eq!(ids(&next), vec!["1"]);
    }

    #[test]
    fn test_remove_missing_story_is_noop() {
        let state = StoriesState {
            data: vec![story(1, "React")],
            is_loading: false,
            is_error: false,
        };
        let next = reduce(state.clone(), Action::RemoveStory(story(9, "gone")));
        assert_eq!(next, state);
    }

    #[test]
    fn test_init_success_remove_flow() {
        let state = StoriesState::default();

        let state = reduce(state, Action::FetchInit);
        assert_eq!(
            state,
            StoriesState {
                data: vec![],
                is_loading: true,
                is_error: false
            }
        );

        let state = reduce(state, Action::FetchSuccess(vec![story(1, "React")]));
        assert_eq!(ids(&state), vec!["1"]);
        assert!(!state.is_loading && !state.is_error);

        let state = reduce(state, Action::RemoveStory(story(1, "React")));
        assert_eq!(state, StoriesState::default());
    }

    #[test]
    fn test_story_decodes_api_hit() {
        let json = r#"{
            "title": "Show HN: a thing",
            "url": null,
            "author": "pg",
            "num_comments": null,
            "points": 42,
            "objectID": "38000001",
            "created_at": "2023-10-26T12:00:00.000Z",
            "_tags": ["story"]
        }"#;
        let s: Story = serde_json::from_str(json).unwrap();
        assert_eq!(s.object_id.as_str(), "38000001");
        assert_eq!(s.url, "");
        assert_eq!(s.num_comments, 0);
        assert_eq!(s.points, Some(42));
        assert!(s.created_at.is_some());
    }

    #[test]
    fn test_story_accepts_integer_id() {
        let json = r#"{"title":"React","url":"http://test.org","author":"ME","num_comments":3,"lang":"EN","objectID":0}"#;
        let s: Story = serde_json::from_str(json).unwrap();
        assert_eq!(s.object_id, StoryId::from(0));
        assert_eq!(s.points, None);
    }

    #[test]
    fn test_state_serializes_with_wire_names() {
        let value = serde_json::to_value(StoriesState::default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"data": [], "isLoading": false, "isError": false})
        );
    }

    #[test]
    fn test_envelope_unknown_kind_is_error() {
        let envelope = ActionEnvelope {
            kind: "FETCH_RETRY".to_string(),
            payload: serde_json::Value::Null,
        };
        let err = reduce_envelope(StoriesState::default(), envelope).unwrap_err();
        assert!(matches!(err, ReduceError::UnknownAction(ref k) if k == "FETCH_RETRY"));
    }

    #[test]
    fn test_envelope_bad_payload_is_error() {
        let envelope: ActionEnvelope =
            serde_json::from_str(r#"{"type":"FETCH_SUCCESS","payload":{"hits":3}}"#).unwrap();
        let err = reduce_envelope(StoriesState::default(), envelope).unwrap_err();
        assert!(matches!(err, ReduceError::InvalidPayload { ref kind, .. } if kind == "FETCH_SUCCESS"));
    }

    #[test]
    fn test_envelope_remove_story() {
        let state = reduce(
            StoriesState::default(),
            Action::FetchSuccess(vec![story(1, "React"), story(2, "Vue")]),
        );
        let envelope: ActionEnvelope =
            serde_json::from_str(r#"{"type":"REMOVE_STORY","payload":{"objectID":1}}"#).unwrap();
        let next = reduce_envelope(state, envelope).unwrap();
        assert_eq!(ids(&next), vec!["2"]);
    }

    fn arb_state() -> impl Strategy<Value = StoriesState> {
        (
            prop::collection::vec(0u64..40, 0..25),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(ids, is_loading, is_error)| {
                let data = ids.into_iter().map(|id| story(id, "t")).collect();
                StoriesState {
                    data: dedup_by_id(data),
                    is_loading,
                    is_error,
                }
            })
    }

    fn arb_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            Just(Action::FetchInit),
            Just(Action::FetchFailure),
            prop::collection::vec(0u64..40, 0..10).prop_map(|ids| {
                Action::FetchSuccess(ids.into_iter().map(|id| story(id, "t")).collect())
            }),
            (0u64..40).prop_map(|id| Action::RemoveStory(story(id, "t"))),
        ]
    }

    proptest! {
        #[test]
        fn prop_removals_never_grow_and_never_resurrect(
            state in arb_state(),
            removals in prop::collection::vec(0u64..40, 0..30),
        ) {
            let mut state = state;
            let mut removed = HashSet::new();
            for id in removals {
                let before = state.data.len();
                state = reduce(state, Action::RemoveStory(story(id, "x")));
                removed.insert(StoryId::from(id));
                prop_assert!(state.data.len() <= before);
                prop_assert!(state.data.iter().all(|s| !removed.contains(&s.object_id)));
            }
        }

        #[test]
        fn prop_init_after_success_sets_loading(
            state in arb_state(),
            ids in prop::collection::vec(0u64..40, 0..10),
        ) {
            let payload: Vec<Story> = ids.into_iter().map(|id| story(id, "t")).collect();
            let after_success = reduce(state, Action::FetchSuccess(payload));
            let data = after_success.data.clone();
            let after_init = reduce(after_success, Action::FetchInit);
            prop_assert!(after_init.is_loading);
            prop_assert!(!after_init.is_error);
            prop_assert_eq!(after_init.data, data);
        }

        #[test]
        fn prop_reduce_is_pure(state in arb_state(), action in arb_action()) {
            let first = reduce(state.clone(), action.clone());
            let second = reduce(state, action);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_flags_never_both_set(state in arb_state(), actions in prop::collection::vec(arb_action(), 1..20)) {
            let mut state = StoriesState { is_loading: false, is_error: false, ..state };
            for action in actions {
                state = reduce(state, action);
                prop_assert!(!(state.is_loading && state.is_error));
                let unique: HashSet<_> = state.data.iter().map(|s| &s.object_id).collect();
                prop_assert_eq!(unique.len(), state.data.len());
            }
        }
    }
}
