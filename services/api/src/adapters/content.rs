//! services/api/src/adapters/content.rs
//!
//! Filesystem-backed implementation of the `ContentCatalog` port. The roster
//! is read once at startup and every content file is indexed into an explicit
//! registry keyed by (character id, content kind); request-time lookups only
//! ever resolve through that registry, so a miss is a definite `NotFound`
//! rather than a failed path guess.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mythquest_core::domain::{BioForm, Character, CharacterBio, Question};
use mythquest_core::ports::{ContentCatalog, PortError, PortResult};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ContentKind {
    Questions,
    ShortBio,
    FullBio,
}

impl ContentKind {
    fn label(self) -> &'static str {
        match self {
            ContentKind::Questions => "questions",
            ContentKind::ShortBio => "short biography",
            ContentKind::FullBio => "full biography",
        }
    }
}

pub struct FsContentCatalog {
    roster: Vec<Character>,
    registry: HashMap<(String, ContentKind), PathBuf>,
}

impl FsContentCatalog {
    /// Reads `characters.json` and indexes the content files present for the
    /// roster. Characters with missing files stay on the roster; their
    /// lookups report `NotFound` at request time.
    pub async fn load(content_dir: &Path) -> PortResult<Self> {
        let roster_path = content_dir.join("characters.json");
        let raw = tokio::fs::read_to_string(&roster_path).await.map_err(|e| {
            PortError::NotFound(format!(
                "character roster at {}: {e}",
                roster_path.display()
            ))
        })?;
        let roster: Vec<Character> = serde_json::from_str(&raw)
            .map_err(|e| PortError::Unexpected(format!("malformed character roster: {e}")))?;

        let mut registry = HashMap::new();
        for character in &roster {
            let entries = [
                (
                    ContentKind::Questions,
                    content_dir
                        .join("questions")
                        .join(format!("{}.json", character.id)),
                ),
                (
                    ContentKind::ShortBio,
                    content_dir
                        .join("biographies")
                        .join(format!("{}_short.json", character.id)),
                ),
                (
                    ContentKind::FullBio,
                    content_dir
                        .join("biographies")
                        .join(format!("{}_full.json", character.id)),
                ),
            ];
            for (kind, path) in entries {
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    registry.insert((character.id.clone(), kind), path);
                } else {
                    warn!("no {} file for '{}'", kind.label(), character.id);
                }
            }
        }

        info!(
            "content catalog loaded: {} characters, {} content files",
            roster.len(),
            registry.len()
        );
        Ok(Self { roster, registry })
    }

    async fn read_entry(&self, character_id: &str, kind: ContentKind) -> PortResult<String> {
        let path = self
            .registry
            .get(&(character_id.to_string(), kind))
            .ok_or_else(|| {
                PortError::NotFound(format!("{} for '{character_id}'", kind.label()))
            })?;
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PortError::Unexpected(format!("read {}: {e}", path.display())))
    }
}

#[async_trait]
impl ContentCatalog for FsContentCatalog {
    fn roster(&self) -> &[Character] {
        &self.roster
    }

    fn character(&self, character_id: &str) -> Option<&Character> {
        self.roster.iter().find(|c| c.id == character_id)
    }

    async fn questions(&self, character_id: &str) -> PortResult<Vec<Question>> {
        let raw = self.read_entry(character_id, ContentKind::Questions).await?;
        serde_json::from_str(&raw).map_err(|e| {
            PortError::Unexpected(format!("malformed questions for '{character_id}': {e}"))
        })
    }

    async fn biography(&self, character_id: &str, form: BioForm) -> PortResult<CharacterBio> {
        let kind = match form {
            BioForm::Short => ContentKind::ShortBio,
            BioForm::Full => ContentKind::FullBio,
        };
        let raw = self.read_entry(character_id, kind).await?;
        serde_json::from_str(&raw).map_err(|e| {
            PortError::Unexpected(format!(
                "malformed {} for '{character_id}': {e}",
                kind.label()
            ))
        })
    }
}
