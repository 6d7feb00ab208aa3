//! # Content: error pages
//!
//! An [`ErrorPage`] is the content entity whose rendered output becomes a
//! cached artifact. Pages are keyed by status code, so a store holds at most
//! one page per code on each [`Stage`].

use crate::error::ContentError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Publication stage of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Draft,
    Live,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Draft => "draft",
            Stage::Live => "live",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPage {
    pub error_code: u16,
    pub title: String,
    /// Body HTML as authored in the CMS.
    pub content: String,
    /// Free-form CMS status label, e.g. `New page`.
    pub status: String,
    pub last_edited: DateTime<Utc>,
}

impl ErrorPage {
    pub fn new(error_code: u16, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            error_code,
            title: title.into(),
            content: content.into(),
            status: "New page".to_string(),
            last_edited: Utc::now(),
        }
    }

    pub fn link(&self) -> String {
        error_page_link(self.error_code)
    }
}

/// URL path under which the site serves the page for `code`.
pub fn error_page_link(code: u16) -> String {
    format!("/error-page/{code}")
}

#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
    async fn find_error_page(
        &self,
        code: u16,
        stage: Stage,
    ) -> Result<Option<ErrorPage>, ContentError>;

    /// Saves `page` to the draft stage, replacing any page with the same code.
    async fn write(&self, page: ErrorPage) -> Result<(), ContentError>;

    /// Copies the page for `code` from one stage to another.
    async fn publish(&self, code: u16, from: Stage, to: Stage) -> Result<(), ContentError>;
}

#[derive(Debug, Default)]
pub struct MemoryContentStore {
    pages: RwLock<HashMap<(Stage, u16), ErrorPage>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, stage: Stage) -> usize {
        self.pages.read().keys().filter(|(s, _)| *s == stage).count()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.read().is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn find_error_page(
        &self,
        code: u16,
        stage: Stage,
    ) -> Result<Option<ErrorPage>, ContentError> {
        Ok(self.pages.read().get(&(stage, code)).cloned())
    }

    async fn write(&self, mut page: ErrorPage) -> Result<(), ContentError> {
        page.last_edited = Utc::now();
        self.pages.write().insert((Stage::Draft, page.error_code), page);
        Ok(())
    }

    async fn publish(&self, code: u16, from: Stage, to: Stage) -> Result<(), ContentError> {
        let mut pages = self.pages.write();
        let page = pages
            .get(&(from, code))
            .cloned()
            .ok_or(ContentError::NotFound {
                code,
                stage: from.as_str(),
            })?;
        pages.insert((to, code), page);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ContentSnapshot {
    #[serde(default)]
    draft: BTreeMap<u16, ErrorPage>,
    #[serde(default)]
    live: BTreeMap<u16, ErrorPage>,
}

impl ContentSnapshot {
    fn stage(&self, stage: Stage) -> &BTreeMap<u16, ErrorPage> {
        match stage {
            Stage::Draft => &self.draft,
            Stage::Live => &self.live,
        }
    }

    fn stage_mut(&mut self, stage: Stage) -> &mut BTreeMap<u16, ErrorPage> {
        match stage {
            Stage::Draft => &mut self.draft,
            Stage::Live => &mut self.live,
        }
    }
}

/// Pages persisted as one JSON document so they survive between `build` and `serve`.
#[derive(Debug)]
pub struct JsonContentStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonContentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<ContentSnapshot, ContentError> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ContentSnapshot::default()),
            Err(source) => Err(ContentError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    async fn store(&self, snapshot: &ContentSnapshot) -> Result<(), ContentError> {
        let raw = serde_json::to_vec_pretty(snapshot)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ContentError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|source| ContentError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[async_trait]
impl ContentStore for JsonContentStore {
    async fn find_error_page(
        &self,
        code: u16,
        stage: Stage,
    ) -> Result<Option<ErrorPage>, ContentError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.stage(stage).get(&code).cloned())
    }

    async fn write(&self, mut page: ErrorPage) -> Result<(), ContentError> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.load().await?;
        page.last_edited = Utc::now();
        snapshot.draft.insert(page.error_code, page);
        self.store(&snapshot).await
    }

    async fn publish(&self, code: u16, from: Stage, to: Stage) -> Result<(), ContentError> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.load().await?;
        let page = snapshot
            .stage(from)
            .get(&code)
            .cloned()
            .ok_or(ContentError::NotFound {
                code,
                stage: from.as_str(),
            })?;
        snapshot.stage_mut(to).insert(code, page);
        self.store(&snapshot).await
    }
}
