use crate::api::SearchResponse;
use crate::stories::{Story, StoryId};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocalError {
    #[error("Cannot read stories file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid stories file {path}: {source}")]
    SerializationError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A stories file is either a bare list or a saved search response.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoriesFile {
    List(Vec<Story>),
    Search(SearchResponse),
}

/// Built-in stories for offline use.
pub fn sample_stories() -> Vec<Story> {
    vec![
        Story {
            title: "React".to_string(),
            url: "https://reactjs.org/".to_string(),
            author: "Jordan Walke".to_string(),
            num_comments: 3,
            points: Some(4),
            object_id: StoryId::from(0),
            created_at: None,
        },
        Story {
            title: "Vue".to_string(),
            url: "https://vuejs.org/".to_string(),
            author: "Evan You".to_string(),
            num_comments: 10,
            points: Some(7),
            object_id: StoryId::from(1),
            created_at: None,
        },
    ]
}

/// Load stories from a JSON file.
pub fn load_stories(path: &Path) -> Result<Vec<Story>, LocalError> {
    let text = std::fs::read_to_string(path).map_err(|source| LocalError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    let file: StoriesFile =
        serde_json::from_str(&text).map_err(|source| LocalError::SerializationError {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(match file {
        StoriesFile::List(stories) => stories,
        StoriesFile::Search(response) => response.hits,
    })
}

/// Case-insensitive substring match on the title. An empty term matches.
pub fn matches_title(story: &Story, term: &str) -> bool {
    story.title.to_lowercase().contains(&term.to_lowercase())
}

/// Stories whose title contains `term`, in list order.
pub fn filter_stories<'a>(stories: &'a [Story], term: &str) -> Vec<&'a Story> {
    stories.iter().filter(|s| matches_title(s, term)).collect()
}
