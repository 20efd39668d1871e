mod api;
mod app;
mod config;
mod fetch;
mod local;
mod stories;
mod store;
mod ui;

use api::{HnClient, SearchBackend};
use app::{App, InputMode, Source};
use clap::{Parser, Subcommand};
use config::Config;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use fetch::{FetchOrchestrator, TriggerPolicy};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use stories::{ActionEnvelope, Dispatch, StoriesState, Story};
use store::{FileStore, KeyValueStore, MemoryStore, PersistedSearchTerm, SEARCH_KEY};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Search Hacker News stories from the terminal
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Search API base URL (overrides the config file)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Apply responses in arrival order, even from superseded requests
    #[arg(long, global = true)]
    keep_stale: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive story list (default)
    Run {
        /// Search only when Enter is pressed instead of on every keystroke
        #[arg(long)]
        manual: bool,
        /// Filter a local story list instead of querying the API
        #[arg(long)]
        local: bool,
        /// JSON file with stories for local mode (implies --local)
        #[arg(long)]
        stories: Option<PathBuf>,
        /// Start with this search term instead of the saved one
        #[arg(short, long)]
        term: Option<String>,
        /// Write the log here instead of the cache directory
        #[arg(long)]
        log_file: Option<PathBuf>,
        /// Do not read or write the saved search term
        #[arg(long)]
        no_save: bool,
    },
    /// Search once and print the results
    Search {
        /// Search term
        term: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Filter a local story list by title
    Filter {
        /// Search term, matched case-insensitively against titles
        term: String,
        /// JSON file with stories (built-in samples when omitted)
        #[arg(long)]
        stories: Option<PathBuf>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Apply a JSON-lines file of recorded actions and print the final state
    Replay {
        /// File with one {"type": ..., "payload": ...} object per line
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(base) = cli.api_base {
        config.api_base = base;
    }
    if cli.keep_stale {
        config.ignore_stale_responses = false;
    }

    let command = cli.command.unwrap_or(Commands::Run {
        manual: false,
        local: false,
        stories: None,
        term: None,
        log_file: None,
        no_save: false,
    });

    match command {
        Commands::Search { term, json } => {
            init_stderr_logging();
            let api_base = config.api_base_url()?;
            let backend = HnClient::new(Duration::from_secs(config.request_timeout_secs))?;

            let mut state = StoriesState::default();
            let issued = fetch::search_once(&backend, &api_base, &term, |action| {
                state = stories::reduce(std::mem::take(&mut state), action);
            })
            .await;

            if !issued {
                eprintln!("Error: search term is empty");
                std::process::exit(2);
            }
            if state.is_error {
                eprintln!("Error: something went wrong while searching (see log above)");
                std::process::exit(1);
            }
            print_stories(&state.data.iter().collect::<Vec<_>>(), json)?;
        }
        Commands::Filter {
            term,
            stories,
            json,
        } => {
            init_stderr_logging();
            let all = match stories {
                Some(path) => local::load_stories(&path)?,
                None => local::sample_stories(),
            };
            print_stories(&local::filter_stories(&all, &term), json)?;
        }
        Commands::Replay { file } => {
            init_stderr_logging();
            let state = replay(&file)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Commands::Run {
            manual,
            local,
            stories,
            term,
            log_file,
            no_save,
        } => {
            if manual {
                config.trigger = TriggerPolicy::Manual;
            }
            if log_file.is_some() {
                config.log_file = log_file;
            }
            init_file_logging(&config)?;

            let source = if local || stories.is_some() {
                Source::Local
            } else {
                Source::Remote
            };
            let local_stories = match (&source, stories) {
                (Source::Local, Some(path)) => local::load_stories(&path)?,
                (Source::Local, None) => local::sample_stories(),
                (Source::Remote, _) => Vec::new(),
            };

            let api_base = config.api_base_url()?;
            let backend = HnClient::new(Duration::from_secs(config.request_timeout_secs))?;
            let (tx, rx) = mpsc::unbounded_channel();
            let orchestrator = FetchOrchestrator::new(backend, api_base, tx);

            if no_save {
                let mut store = MemoryStore::default();
                if let Some(term) = term {
                    store.set(SEARCH_KEY, &term)?;
                }
                let app = App::new(orchestrator, PersistedSearchTerm::new(store), source, &config);
                run_tui(app, rx, local_stories).await?;
            } else {
                let path = config
                    .store_path()
                    .ok_or("Could not determine data directory")?;
                let mut store = FileStore::open_or_reset(path)?;
                info!(path = %store.path().display(), "using search term store");
                if let Some(term) = term {
                    store.set(SEARCH_KEY, &term)?;
                }
                let app = App::new(orchestrator, PersistedSearchTerm::new(store), source, &config);
                run_tui(app, rx, local_stories).await?;
            }
        }
    }

    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hn_search=info"))
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// The terminal belongs to the UI, so the log goes to a file.
fn init_file_logging(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let path = config.log_path().ok_or("Could not determine cache directory")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn print_stories(stories: &[&Story], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(stories)?);
        return Ok(());
    }
    if stories.is_empty() {
        println!("No stories found.");
    }
    for story in stories {
        let points = story
            .points
            .map(|p| format!(", {} points", p))
            .unwrap_or_default();
        println!(
            "{}  ({} comments{}) by {}",
            story.title, story.num_comments, points, story.author
        );
        if !story.url.is_empty() {
            println!("    {}", story.url);
        }
    }
    Ok(())
}

/// Apply every recorded action in `path` to an empty state.
/// An unknown action kind aborts the replay.
fn replay(path: &Path) -> Result<StoriesState, Box<dyn std::error::Error>> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut state = StoriesState::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let envelope: ActionEnvelope = serde_json::from_str(&line)
            .map_err(|e| format!("line {}: {}", index + 1, e))?;
        state = stories::reduce_envelope(state, envelope).map_err(|e| {
            error!(line = index + 1, error = %e, "replay aborted");
            format!("line {}: {}", index + 1, e)
        })?;
    }
    Ok(state)
}

async fn run_tui<B: SearchBackend, S: KeyValueStore>(
    mut app: App<B, S>,
    mut rx: UnboundedReceiver<Dispatch>,
    local_stories: Vec<Story>,
) -> Result<(), Box<dyn std::error::Error>> {
    app.init(local_stories);

    // Init terminal
    let mut terminal = ratatui::init();

    let result = match terminal.size() {
        Ok(size) => {
            app.update_page_size(size.height);
            run_app(&mut terminal, &mut app, &mut rx).await
        }
        Err(e) => Err(e.into()),
    };

    // Restore terminal
    ratatui::restore();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run_app<B: SearchBackend, S: KeyValueStore>(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut App<B, S>,
    rx: &mut UnboundedReceiver<Dispatch>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        while let Ok(dispatch) = rx.try_recv() {
            app.apply(dispatch);
        }

        terminal.draw(|frame| ui::render(app, frame))?;

        if app.should_quit {
            return Ok(());
        }

        // Poll for events with a short timeout so settled searches show up promptly
        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    handle_key(app, key);
                }
                Event::Resize(_, height) => {
                    app.update_page_size(height);
                }
                _ => {}
            }
        }
    }
}

fn handle_key<B: SearchBackend, S: KeyValueStore>(app: &mut App<B, S>, key: KeyEvent) {
    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Help toggle (global)
    if key.code == KeyCode::Char('?') && app.input_mode == InputMode::Normal {
        app.show_help = !app.show_help;
        return;
    }

    // If help is showing, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    match app.input_mode {
        InputMode::Editing => handle_search_input(app, key),
        InputMode::Normal => handle_list_key(app, key),
    }
}

fn handle_search_input<B: SearchBackend, S: KeyValueStore>(app: &mut App<B, S>, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
            if app.trigger() == TriggerPolicy::Manual {
                app.submit();
            }
        }
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => app.pop_char(),
        KeyCode::Char(c) => app.push_char(c),
        _ => {}
    }
}

fn handle_list_key<B: SearchBackend, S: KeyValueStore>(app: &mut App<B, S>, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('/') => {
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Down | KeyCode::Char('j') => app.list_next(),
        KeyCode::Up | KeyCode::Char('k') => app.list_prev(),
        KeyCode::PageDown => app.list_page_down(),
        KeyCode::PageUp => app.list_page_up(),
        KeyCode::Char('g') => app.list_first(),
        KeyCode::Char('G') => app.list_last(),
        KeyCode::Char('d') | KeyCode::Delete => app.remove_selected(),
        KeyCode::Char('o') => app.open_selected(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Esc => app.clear_term(),
        _ => {}
    }
}
