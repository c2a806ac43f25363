//! Conversation persistence
//!
//! Each conversation is one pretty-printed JSON file (an array of turns) in
//! the history directory. The file name doubles as the conversation id and
//! starts with an `MMDDHHmm` stamp, so sorting names in descending order
//! lists conversations newest first.

use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::core::message::Turn;

/// History directory used when the config does not name one. Resolved
/// relative to the working directory.
pub const DEFAULT_HISTORY_DIR: &str = "ChatHistory";

#[derive(Debug)]
pub enum StoreError {
    /// No saved conversation has the requested id.
    NotFound { id: String },

    /// The conversation file exists but does not hold a valid transcript.
    Corrupt {
        id: String,
        source: serde_json::Error,
    },

    /// An underlying filesystem operation failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { id } => write!(f, "no saved conversation named '{id}'"),
            StoreError::Corrupt { id, source } => {
                write!(f, "conversation '{id}' is not a valid transcript: {source}")
            }
            StoreError::Io { path, source } => {
                write!(f, "history access failed at {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::NotFound { .. } => None,
            StoreError::Corrupt { source, .. } => Some(source),
            StoreError::Io { source, .. } => Some(source),
        }
    }
}

/// Filesystem-backed store for saved conversations.
pub struct ConversationStore {
    dir: PathBuf,
}

impl ConversationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lists conversation ids, newest first. Non-JSON files and empty files
    /// are skipped; a missing history directory reads as an empty list.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !name.ends_with(".json") {
                continue;
            }
            let metadata = entry.metadata().map_err(|source| StoreError::Io {
                path: entry.path(),
                source,
            })?;
            if !metadata.is_file() || metadata.len() == 0 {
                continue;
            }
            ids.push(name);
        }

        // Names begin with an MMDDHHmm stamp, so reverse-lexicographic order
        // is newest first.
        ids.sort_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    pub fn load(&self, id: &str) -> Result<Vec<Turn>, StoreError> {
        let path = self.dir.join(id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound { id: id.to_string() })
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            id: id.to_string(),
            source,
        })
    }

    /// Writes the transcript atomically: serialize to a temp file in the
    /// history directory, sync, then rename over the target.
    pub fn save(&self, id: &str, turns: &[Turn]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.dir.join(id);
        let contents = serde_json::to_string_pretty(turns).map_err(|source| StoreError::Io {
            path: path.clone(),
            source: source.into(),
        })?;

        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.clone(),
            source,
        };
        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        temp_file.write_all(contents.as_bytes()).map_err(io_err)?;
        temp_file.as_file_mut().sync_all().map_err(io_err)?;
        temp_file
            .persist(&path)
            .map_err(|err| StoreError::Io {
                path: path.clone(),
                source: err.error,
            })?;
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.dir.join(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound { id: id.to_string() })
            }
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{ContentBlock, ImageSource, ReferenceItem, Role, TurnContent};
    use tempfile::TempDir;

    fn sample_turns() -> Vec<Turn> {
        vec![
            Turn::new(
                Role::User,
                TurnContent::Blocks(vec![
                    ContentBlock::ImageUrl {
                        image_url: ImageSource {
                            url: "data:image/png;base64,AAAA".to_string(),
                        },
                    },
                    ContentBlock::Reference {
                        reference: vec![ReferenceItem {
                            content: "snippet".to_string(),
                            title: Some("Doc".to_string()),
                            link: None,
                        }],
                    },
                    ContentBlock::Text {
                        text: "what does the chart show?".to_string(),
                    },
                ]),
            ),
            Turn::assistant("a trend", Some("looked at the axes".to_string())),
        ]
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path());
        let turns = sample_turns();
        store.save("08210930_chart.json", &turns).unwrap();
        let loaded = store.load("08210930_chart.json").unwrap();
        assert_eq!(loaded, turns);
    }

    #[test]
    fn save_creates_the_history_directory() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path().join("nested").join("history"));
        store.save("08210930_a.json", &sample_turns()).unwrap();
        assert!(store.dir().join("08210930_a.json").exists());
    }

    #[test]
    fn list_is_newest_first_and_skips_junk() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path());
        for name in ["01020304_old.json", "12312359_new.json", "06151200_mid.json"] {
            store.save(name, &sample_turns()).unwrap();
        }
        fs::write(dir.path().join("08010101_empty.json"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a transcript").unwrap();

        let ids = store.list().unwrap();
        assert_eq!(
            ids,
            vec![
                "12312359_new.json".to_string(),
                "06151200_mid.json".to_string(),
                "01020304_old.json".to_string(),
            ]
        );
    }

    #[test]
    fn list_of_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path().join("nowhere"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn load_missing_conversation_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path());
        let err = store.load("08210930_gone.json").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn load_invalid_json_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path());
        fs::write(dir.path().join("08210930_bad.json"), "{not json").unwrap();
        let err = store.load("08210930_bad.json").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert!(err.to_string().contains("08210930_bad.json"));
    }

    #[test]
    fn load_wrong_shape_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path());
        fs::write(
            dir.path().join("08210930_map.json"),
            r#"{"role": "user", "content": "not a list"}"#,
        )
        .unwrap();
        assert!(matches!(
            store.load("08210930_map.json").unwrap_err(),
            StoreError::Corrupt { .. }
        ));
    }

    #[test]
    fn legacy_image_url_objects_are_coerced_on_load() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path());
        fs::write(
            dir.path().join("08210930_legacy.json"),
            r#"[
                {
                    "role": "user",
                    "content": [
                        {"type": "image_url", "image_url": {"url": {"kind": "inline"}}},
                        {"type": "text", "text": "see image"}
                    ]
                }
            ]"#,
        )
        .unwrap();
        let turns = store.load("08210930_legacy.json").unwrap();
        let TurnContent::Blocks(blocks) = &turns[0].content else {
            panic!("expected block content");
        };
        let ContentBlock::ImageUrl { image_url } = &blocks[0] else {
            panic!("expected image block");
        };
        assert_eq!(image_url.url, r#"{"kind":"inline"}"#);
    }

    #[test]
    fn delete_removes_and_reports_missing() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path());
        store.save("08210930_tmp.json", &sample_turns()).unwrap();
        store.delete("08210930_tmp.json").unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(matches!(
            store.delete("08210930_tmp.json").unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }
}
