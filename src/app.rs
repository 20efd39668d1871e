use crate::api::SearchBackend;
use crate::config::Config;
use crate::fetch::{FetchOrchestrator, SearchQuery, TriggerPolicy};
use crate::local::filter_stories;
use crate::stories::{Action, Dispatch, StoriesController, StoriesState, Story};
use crate::store::{KeyValueStore, PersistedSearchTerm};
use tracing::{info, warn};

/// Where the story list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Search API; the term builds the request.
    Remote,
    /// Fixed in-memory list; the term filters titles.
    Local,
}

/// Input mode for the search bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub const LIST_OVERHEAD: u16 = 9;

/// Main application state.
pub struct App<B, S> {
    pub should_quit: bool,
    pub show_help: bool,
    pub source: Source,
    pub input_mode: InputMode,

    pub controller: StoriesController,
    pub query: SearchQuery,

    // List view state
    pub list_selected: usize,
    pub page_size: usize,

    // Status message
    pub status_msg: String,

    term: PersistedSearchTerm<S>,
    orchestrator: FetchOrchestrator<B>,
}

impl<B: SearchBackend, S: KeyValueStore> App<B, S> {
    /// The persisted search term is read here, once.
    pub fn new(
        orchestrator: FetchOrchestrator<B>,
        term: PersistedSearchTerm<S>,
        source: Source,
        config: &Config,
    ) -> Self {
        let initial = term.load(&config.default_search_term);
        Self {
            should_quit: false,
            show_help: false,
            source,
            input_mode: InputMode::Normal,

            controller: StoriesController::new(config.ignore_stale_responses),
            query: SearchQuery::new(config.trigger, initial),

            list_selected: 0,
            page_size: 20,

            status_msg: String::new(),

            term,
            orchestrator,
        }
    }

    /// Initial load: search for the persisted term, or install the local list.
    pub fn init(&mut self, local_stories: Vec<Story>) {
        match self.source {
            Source::Remote => {
                let term = self.query.confirmed().to_string();
                self.search(&term);
            }
            Source::Local => {
                let count = local_stories.len();
                self.controller
                    .dispatch(Dispatch::user(Action::FetchSuccess(local_stories)));
                self.status_msg = format!("{} stories loaded", count);
            }
        }
    }

    pub fn state(&self) -> &StoriesState {
        self.controller.state()
    }

    /// Stories as shown: everything fetched remotely, or the titles matching
    /// the confirmed term in local mode.
    pub fn visible_stories(&self) -> Vec<&Story> {
        let data = &self.state().data;
        match self.source {
            Source::Remote => data.iter().collect(),
            Source::Local => filter_stories(data, self.query.confirmed()),
        }
    }

    pub fn selected_story(&self) -> Option<&Story> {
        self.visible_stories().get(self.list_selected).copied()
    }

    /// Feed a dispatch from the orchestrator into the controller.
    pub fn apply(&mut self, dispatch: Dispatch) {
        let kind = dispatch.action.kind();
        if !self.controller.dispatch(dispatch) {
            return;
        }
        match kind {
            "FETCH_INIT" => {
                self.status_msg = format!("Searching for \"{}\"...", self.query.confirmed());
            }
            "FETCH_SUCCESS" => {
                self.list_selected = 0;
                self.status_msg = format!("{} stories found", self.state().data.len());
            }
            "FETCH_FAILURE" => self.status_msg = "Search failed".to_string(),
            _ => {}
        }
        self.clamp_selection();
    }

    /// The search term changed: persist it, then re-fetch if the policy says so.
    pub fn change_term(&mut self, term: String) {
        if let Err(e) = self.term.save(&term) {
            warn!(error = %e, "failed to persist search term");
            self.status_msg = format!("Could not save search term: {}", e);
        }
        let fetch = self.query.change(term).map(str::to_string);
        match self.source {
            Source::Remote => {
                if let Some(term) = fetch {
                    self.search(&term);
                }
            }
            Source::Local => {
                self.list_selected = 0;
            }
        }
    }

    pub fn push_char(&mut self, c: char) {
        let mut term = self.query.input().to_string();
        term.push(c);
        self.change_term(term);
    }

    pub fn pop_char(&mut self) {
        let mut term = self.query.input().to_string();
        if term.pop().is_some() {
            self.change_term(term);
        }
    }

    pub fn clear_term(&mut self) {
        if !self.query.input().is_empty() {
            self.change_term(String::new());
        }
    }

    /// Explicit submit of the current input.
    pub fn submit(&mut self) {
        let term = self.query.submit().to_string();
        match self.source {
            Source::Remote => self.search(&term),
            Source::Local => self.list_selected = 0,
        }
    }

    /// Repeat the last confirmed search.
    pub fn refresh(&mut self) {
        if self.source == Source::Remote {
            let term = self.query.confirmed().to_string();
            self.search(&term);
        }
    }

    fn search(&mut self, term: &str) {
        if self.orchestrator.fetch(term).is_none() {
            self.status_msg = "Type a search term".to_string();
        }
    }

    /// Remove the selected story from the list.
    pub fn remove_selected(&mut self) {
        if let Some(story) = self.selected_story().cloned() {
            info!(id = %story.object_id, "removing story");
            self.status_msg = format!("Removed: {}", story.title);
            self.controller
                .dispatch(Dispatch::user(Action::RemoveStory(story)));
            self.clamp_selection();
        }
    }

    pub fn trigger(&self) -> TriggerPolicy {
        self.query.policy()
    }

    /// Update page size based on terminal height.
    pub fn update_page_size(&mut self, terminal_height: u16) {
        let new_size = terminal_height.saturating_sub(LIST_OVERHEAD) as usize;
        self.page_size = new_size.max(1);
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_stories().len();
        if self.list_selected >= len {
            self.list_selected = len.saturating_sub(1);
        }
    }

    /// Move selection down in the list.
    pub fn list_next(&mut self) {
        if self.list_selected + 1 < self.visible_stories().len() {
            self.list_selected += 1;
        }
    }

    /// Move selection up in the list.
    pub fn list_prev(&mut self) {
        self.list_selected = self.list_selected.saturating_sub(1);
    }

    pub fn list_page_down(&mut self) {
        let len = self.visible_stories().len();
        self.list_selected = (self.list_selected + self.page_size).min(len.saturating_sub(1));
    }

    pub fn list_page_up(&mut self) {
        self.list_selected = self.list_selected.saturating_sub(self.page_size);
    }

    pub fn list_first(&mut self) {
        self.list_selected = 0;
    }

    pub fn list_last(&mut self) {
        self.list_selected = self.visible_stories().len().saturating_sub(1);
    }

    /// Open the selected story's link in the system browser.
    pub fn open_selected(&mut self) {
        let Some(url) = self.selected_story().map(|s| s.url.clone()) else {
            return;
        };
        if url.is_empty() {
            self.status_msg = "This story has no link".to_string();
            return;
        }
        match std::process::Command::new("xdg-open")
            .arg(&url)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
        {
            Ok(_) => self.status_msg = format!("Opening: {}", url),
            Err(e) => {
                warn!(error = %e, "xdg-open failed");
                self.status_msg = format!("Link: {} (no browser available)", url);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::FakeBackend;
    use crate::store::{MemoryStore, SEARCH_KEY};
    use crate::stories::testing::story;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use url::Url;

    fn test_app(
        backend: FakeBackend,
        store: MemoryStore,
        source: Source,
        trigger: TriggerPolicy,
    ) -> (App<FakeBackend, MemoryStore>, UnboundedReceiver<Dispatch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let base = Url::parse("https://search.test/search").unwrap();
        let config = Config {
            trigger,
            ..Config::default()
        };
        let app = App::new(
            FetchOrchestrator::new(backend, base, tx),
            PersistedSearchTerm::new(store),
            source,
            &config,
        );
        (app, rx)
    }

    async fn drain(app: &mut App<FakeBackend, MemoryStore>, rx: &mut UnboundedReceiver<Dispatch>, n: usize) {
        for _ in 0..n {
            let dispatch = rx.recv().await.unwrap();
            app.apply(dispatch);
        }
    }

    #[tokio::test]
    async fn test_initial_search_uses_fallback_term() {
        let backend = FakeBackend::with_hits("React", vec![story(1, "React")]);
        let (mut app, mut rx) =
            test_app(backend, MemoryStore::default(), Source::Remote, TriggerPolicy::Automatic);
        app.init(Vec::new());

        drain(&mut app, &mut rx, 1).await;
        assert!(app.state().is_loading);
        drain(&mut app, &mut rx, 1).await;
        assert_eq!(app.state().data, vec![story(1, "React")]);
        assert_eq!(app.status_msg, "1 stories found");
    }

    #[tokio::test]
    async fn test_initial_search_uses_persisted_term() {
        let mut store = MemoryStore::default();
        store.set(SEARCH_KEY, "vue").unwrap();
        let backend = FakeBackend::with_hits("vue", vec![story(2, "Vue")]);
        let (mut app, mut rx) = test_app(backend, store, Source::Remote, TriggerPolicy::Automatic);
        assert_eq!(app.query.input(), "vue");

        app.init(Vec::new());
        drain(&mut app, &mut rx, 2).await;
        assert_eq!(app.state().data, vec![story(2, "Vue")]);
    }

    #[tokio::test]
    async fn test_automatic_policy_fetches_on_change_and_persists() {
        let backend = FakeBackend::with_hits("Rust", vec![story(3, "Rust")]);
        let (mut app, mut rx) =
            test_app(backend, MemoryStore::default(), Source::Remote, TriggerPolicy::Automatic);

        app.change_term("Rust".to_string());
        assert_eq!(app.term.load("fallback"), "Rust");
        drain(&mut app, &mut rx, 2).await;
        assert_eq!(app.state().data, vec![story(3, "Rust")]);
    }

    #[tokio::test]
    async fn test_manual_policy_waits_for_submit() {
        let backend = FakeBackend::with_hits("Rust", vec![story(3, "Rust")]);
        let (mut app, mut rx) =
            test_app(backend, MemoryStore::default(), Source::Remote, TriggerPolicy::Manual);

        app.change_term("Rust".to_string());
        assert!(rx.try_recv().is_err());
        assert_eq!(app.query.confirmed(), "React");
        assert_eq!(app.term.load("fallback"), "Rust");

        app.submit();
        drain(&mut app, &mut rx, 2).await;
        assert_eq!(app.state().data, vec![story(3, "Rust")]);
    }

    #[tokio::test]
    async fn test_empty_term_does_not_fetch() {
        let (mut app, mut rx) = test_app(
            FakeBackend::default(),
            MemoryStore::default(),
            Source::Remote,
            TriggerPolicy::Automatic,
        );
        app.change_term(String::new());
        assert!(rx.try_recv().is_err());
        assert!(!app.state().is_loading);
        assert_eq!(app.status_msg, "Type a search term");
    }

    #[tokio::test]
    async fn test_failed_search_shows_error() {
        let (mut app, mut rx) = test_app(
            FakeBackend::default(),
            MemoryStore::default(),
            Source::Remote,
            TriggerPolicy::Automatic,
        );
        app.init(Vec::new());
        drain(&mut app, &mut rx, 2).await;
        assert!(app.state().is_error);
        assert!(!app.state().is_loading);
        assert_eq!(app.status_msg, "Search failed");
    }

    #[test]
    fn test_local_filter_and_remove() {
        let (mut app, _rx) = test_app(
            FakeBackend::default(),
            MemoryStore::default(),
            Source::Local,
            TriggerPolicy::Automatic,
        );
        app.init(vec![story(1, "React"), story(2, "Vue"), story(3, "Preact")]);
        assert_eq!(app.visible_stories().len(), 2);

        app.clear_term();
        assert_eq!(app.visible_stories().len(), 3);

        for c in "vu".chars() {
            app.push_char(c);
        }
        assert_eq!(app.visible_stories(), vec![&story(2, "Vue")]);

        app.remove_selected();
        assert!(app.visible_stories().is_empty());
        assert_eq!(app.state().data.len(), 2);
        assert_eq!(app.status_msg, "Removed: Vue");

        app.pop_char();
        app.pop_char();
        assert_eq!(app.visible_stories().len(), 2);
    }

    #[test]
    fn test_selection_is_clamped_after_remove() {
        let (mut app, _rx) = test_app(
            FakeBackend::default(),
            MemoryStore::default(),
            Source::Local,
            TriggerPolicy::Automatic,
        );
        app.init(vec![story(1, "a"), story(2, "b"), story(3, "c")]);
        app.clear_term();
        app.list_last();
        assert_eq!(app.list_selected, 2);
        app.remove_selected();
        assert_eq!(app.list_selected, 1);
        assert_eq!(app.selected_story(), Some(&story(2, "b")));
        app.list_next();
        assert_eq!(app.list_selected, 1);
        app.list_first();
        assert_eq!(app.selected_story(), Some(&story(1, "a")));
    }
}
