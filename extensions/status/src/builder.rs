//! Static Page Cache Builder
//!
//! Makes sure the maintenance `ErrorPage` exists and that its rendered HTML is
//! cached under the assets directory.

use quiesce_core::{
    ContentError, ContentStore, ErrorPage, Invalidation, MAINTENANCE_STATUS, PageRenderer, Stage,
    ensure_assets_dir, error_page_filepath,
};
use sha1::{Digest, Sha1};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DEFAULT_TITLE: &str = "Under Maintenance";
pub const DEFAULT_CONTENT: &str = "<h1>Maintenance Mode</h1>\n<p>Sorry, this site is currently undergoing scheduled maintenance, please check back shortly.</p>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheReport {
    /// The page did not exist; it was created, published and cached.
    Created { path: PathBuf },
    /// The page existed but its artifact was missing or stale.
    Regenerated { path: PathBuf },
    AlreadyValid { path: PathBuf },
    Failed { path: PathBuf, reason: String },
}

impl CacheReport {
    pub fn path(&self) -> &Path {
        match self {
            CacheReport::Created { path }
            | CacheReport::Regenerated { path }
            | CacheReport::AlreadyValid { path }
            | CacheReport::Failed { path, .. } => path,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CacheReport::Failed { .. })
    }

    /// Alteration message in the form printed by the bootstrap step.
    pub fn message(&self, code: u16) -> String {
        match self {
            CacheReport::Created { .. } | CacheReport::Regenerated { .. } => {
                format!("{code} error page created")
            }
            CacheReport::AlreadyValid { path } => {
                format!("{code} error page already cached at {}", path.display())
            }
            CacheReport::Failed { path, reason } => format!(
                "{code} error page could not be created at {}. Please check permissions ({reason})",
                path.display()
            ),
        }
    }
}

pub struct CacheBuilder {
    store: Arc<dyn ContentStore>,
    renderer: Arc<dyn PageRenderer>,
    assets_dir: PathBuf,
    code: u16,
    invalidation: Invalidation,
    // Serializes entity creation and the file write.
    lock: Mutex<()>,
}

impl CacheBuilder {
    pub fn new(
        store: Arc<dyn ContentStore>,
        renderer: Arc<dyn PageRenderer>,
        assets_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            renderer,
            assets_dir: assets_dir.into(),
            code: MAINTENANCE_STATUS,
            invalidation: Invalidation::default(),
            lock: Mutex::new(()),
        }
    }

    pub fn with_invalidation(mut self, invalidation: Invalidation) -> Self {
        self.invalidation = invalidation;
        self
    }

    pub fn with_status_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    pub fn status_code(&self) -> u16 {
        self.code
    }

    pub fn artifact_path(&self) -> PathBuf {
        error_page_filepath(&self.assets_dir, self.code)
    }

    pub fn fingerprint_path(&self) -> PathBuf {
        let mut raw = self.artifact_path().into_os_string();
        raw.push(".sha1");
        PathBuf::from(raw)
    }

    /// Ensure the error page exists and its artifact is on disk.
    ///
    /// Never fails: store, render and filesystem problems are logged and
    /// come back as [`CacheReport::Failed`].
    pub async fn ensure_cached(&self) -> CacheReport {
        let _guard = self.lock.lock().await;
        let path = self.artifact_path();

        if let Err(e) = ensure_assets_dir(&self.assets_dir).await {
            return self.failed(
                path,
                format!("assets directory {}: {e}", self.assets_dir.display()),
            );
        }

        let (page, created) = match self.find_or_create().await {
            Ok(found) => found,
            Err(e) => return self.failed(path, e.to_string()),
        };

        if !created && tokio::fs::try_exists(&path).await.unwrap_or(false) {
            if self.is_current(&page).await {
                tracing::debug!(path = %path.display(), "Cached error page is current");
                return CacheReport::AlreadyValid { path };
            }
            tracing::info!(path = %path.display(), "Error page content changed, regenerating");
        }

        let body = match self.renderer.render(&page).await {
            Ok(body) => body,
            Err(e) => return self.failed(path, e.to_string()),
        };
        if body.is_empty() {
            return self.failed(path, "rendered body is empty".to_string());
        }
        if let Err(e) = tokio::fs::write(&path, body.as_bytes()).await {
            return self.failed(path, e.to_string());
        }
        self.write_fingerprint(&page).await;

        tracing::info!(path = %path.display(), bytes = body.len(), "{} error page created", self.code);
        if created {
            CacheReport::Created { path }
        } else {
            CacheReport::Regenerated { path }
        }
    }

    /// The page to render and whether it had to be created first.
    ///
    /// Existence is decided on the draft stage. The page returned is the live
    /// one when published, since that is what the site serves at its link.
    async fn find_or_create(&self) -> Result<(ErrorPage, bool), ContentError> {
        let draft = self.store.find_error_page(self.code, Stage::Draft).await?;
        let created = draft.is_none();
        let draft = match draft {
            Some(page) => page,
            None => self.create_default_page().await?,
        };

        let live = self.store.find_error_page(self.code, Stage::Live).await?;
        Ok((live.unwrap_or(draft), created))
    }

    async fn create_default_page(&self) -> Result<ErrorPage, ContentError> {
        let page = ErrorPage::new(self.code, DEFAULT_TITLE, DEFAULT_CONTENT);
        self.store.write(page).await?;
        self.store
            .publish(self.code, Stage::Draft, Stage::Live)
            .await?;
        tracing::info!(code = self.code, "Created and published default error page");

        // Re-read so the caller sees what the store actually persisted.
        self.store
            .find_error_page(self.code, Stage::Draft)
            .await?
            .ok_or(ContentError::NotFound {
                code: self.code,
                stage: Stage::Draft.as_str(),
            })
    }

    async fn is_current(&self, page: &ErrorPage) -> bool {
        match self.invalidation {
            Invalidation::Lazy => true,
            Invalidation::ContentHash => {
                match tokio::fs::read_to_string(self.fingerprint_path()).await {
                    Ok(stored) => stored.trim() == fingerprint(page),
                    Err(_) => false,
                }
            }
        }
    }

    async fn write_fingerprint(&self, page: &ErrorPage) {
        let path = self.fingerprint_path();
        if let Err(e) = tokio::fs::write(&path, fingerprint(page)).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to record error page fingerprint");
        }
    }

    fn failed(&self, path: PathBuf, reason: String) -> CacheReport {
        tracing::error!(
            reason = %reason,
            "{} error page could not be created at {}. Please check permissions",
            self.code,
            path.display()
        );
        CacheReport::Failed { path, reason }
    }
}

/// SHA-1 over the parts of a page that affect its rendering.
pub fn fingerprint(page: &ErrorPage) -> String {
    let mut hasher = Sha1::new();
    hasher.update(page.error_code.to_be_bytes());
    hasher.update(page.title.as_bytes());
    hasher.update([0u8]);
    hasher.update(page.content.as_bytes());

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::TemplateRenderer;
    use async_trait::async_trait;
    use quiesce_core::{MemoryContentStore, RenderError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[derive(Default)]
    struct CountingRenderer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageRenderer for CountingRenderer {
        async fn render(&self, page: &ErrorPage) -> Result<String, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            TemplateRenderer.render(page).await
        }
    }

    struct FixedRenderer(Result<String, String>);

    #[async_trait]
    impl PageRenderer for FixedRenderer {
        async fn render(&self, _page: &ErrorPage) -> Result<String, RenderError> {
            self.0.clone().map_err(RenderError::Pipeline)
        }
    }

    fn builder_with(
        store: &Arc<MemoryContentStore>,
        renderer: &Arc<CountingRenderer>,
        assets: &Path,
    ) -> CacheBuilder {
        CacheBuilder::new(store.clone(), renderer.clone(), assets)
    }

    #[tokio::test]
    async fn test_fresh_system_creates_page_and_file() {
        let dir = tempdir().unwrap();
        let assets = dir.path().join("assets");
        let store = Arc::new(MemoryContentStore::new());
        let renderer = Arc::new(CountingRenderer::default());
        let builder = builder_with(&store, &renderer, &assets);

        let report = builder.ensure_cached().await;
        let path = assets.join("error-503.html");
        assert_eq!(report, CacheReport::Created { path: path.clone() });

        let draft = store.find_error_page(503, Stage::Draft).await.unwrap().unwrap();
        assert_eq!(draft.title, DEFAULT_TITLE);
        assert_eq!(draft.status, "New page");
        let live = store.find_error_page(503, Stage::Live).await.unwrap();
        assert!(live.is_some(), "default page must be published");

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, TemplateRenderer.render_html(&draft));
        assert!(written.contains("Maintenance Mode"));
    }

    #[tokio::test]
    async fn test_second_call_is_already_valid_without_render() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryContentStore::new());
        let renderer = Arc::new(CountingRenderer::default());
        let builder = builder_with(&store, &renderer, dir.path());

        builder.ensure_cached().await;
        let modified = std::fs::metadata(builder.artifact_path())
            .unwrap()
            .modified()
            .unwrap();

        let report = builder.ensure_cached().await;
        assert!(matches!(report, CacheReport::AlreadyValid { .. }));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            std::fs::metadata(builder.artifact_path())
                .unwrap()
                .modified()
                .unwrap(),
            modified
        );
    }

    #[tokio::test]
    async fn test_existing_page_missing_file_regenerates() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryContentStore::new());
        store
            .write(ErrorPage::new(503, "Custom", "<p>custom body</p>"))
            .await
            .unwrap();
        let renderer = Arc::new(CountingRenderer::default());
        let builder = builder_with(&store, &renderer, dir.path());

        let report = builder.ensure_cached().await;
        assert!(matches!(report, CacheReport::Regenerated { .. }));

        let written = std::fs::read_to_string(builder.artifact_path()).unwrap();
        assert!(written.contains("<p>custom body</p>"));
        let page = store.find_error_page(503, Stage::Draft).await.unwrap().unwrap();
        assert_eq!(page.title, "Custom");
    }

    #[tokio::test]
    async fn test_lazy_mode_keeps_stale_file() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryContentStore::new());
        let renderer = Arc::new(CountingRenderer::default());
        let builder = builder_with(&store, &renderer, dir.path());
        builder.ensure_cached().await;

        store
            .write(ErrorPage::new(503, "Edited", "<p>edited</p>"))
            .await
            .unwrap();

        let report = builder.ensure_cached().await;
        assert!(matches!(report, CacheReport::AlreadyValid { .. }));
        let written = std::fs::read_to_string(builder.artifact_path()).unwrap();
        assert!(!written.contains("<p>edited</p>"));
    }

    #[tokio::test]
    async fn test_content_hash_mode_detects_edits() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryContentStore::new());
        let renderer = Arc::new(CountingRenderer::default());
        let builder =
            builder_with(&store, &renderer, dir.path()).with_invalidation(Invalidation::ContentHash);
        builder.ensure_cached().await;
        assert!(matches!(
            builder.ensure_cached().await,
            CacheReport::AlreadyValid { .. }
        ));

        store
            .write(ErrorPage::new(503, "Edited", "<p>edited</p>"))
            .await
            .unwrap();
        // Unpublished edits are not what the site serves yet.
        assert!(matches!(
            builder.ensure_cached().await,
            CacheReport::AlreadyValid { .. }
        ));

        store.publish(503, Stage::Draft, Stage::Live).await.unwrap();

        let report = builder.ensure_cached().await;
        assert!(matches!(report, CacheReport::Regenerated { .. }));
        let written = std::fs::read_to_string(builder.artifact_path()).unwrap();
        assert!(written.contains("<p>edited</p>"));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_live_page_is_rendered_and_fingerprinted() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryContentStore::new());
        store
            .write(ErrorPage::new(503, "Published", "<p>live</p>"))
            .await
            .unwrap();
        store.publish(503, Stage::Draft, Stage::Live).await.unwrap();
        store
            .write(ErrorPage::new(503, "Pending", "<p>draft</p>"))
            .await
            .unwrap();
        let renderer = Arc::new(CountingRenderer::default());
        let builder =
            builder_with(&store, &renderer, dir.path()).with_invalidation(Invalidation::ContentHash);

        assert!(matches!(
            builder.ensure_cached().await,
            CacheReport::Regenerated { .. }
        ));
        let written = std::fs::read_to_string(builder.artifact_path()).unwrap();
        assert!(written.contains("<p>live</p>"));

        let live = store.find_error_page(503, Stage::Live).await.unwrap().unwrap();
        let stored = std::fs::read_to_string(builder.fingerprint_path()).unwrap();
        assert_eq!(stored, fingerprint(&live));
    }

    struct BrokenStore;

    #[async_trait]
    impl ContentStore for BrokenStore {
        async fn find_error_page(
            &self,
            code: u16,
            _stage: Stage,
        ) -> Result<Option<ErrorPage>, ContentError> {
            Err(ContentError::NotFound {
                code,
                stage: "corrupt",
            })
        }

        async fn write(&self, _page: ErrorPage) -> Result<(), ContentError> {
            Err(ContentError::Io {
                path: PathBuf::from("content.json"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        }

        async fn publish(&self, code: u16, from: Stage, _to: Stage) -> Result<(), ContentError> {
            Err(ContentError::NotFound {
                code,
                stage: from.as_str(),
            })
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_not_raised() {
        let dir = tempdir().unwrap();
        let renderer = Arc::new(CountingRenderer::default());
        let builder = CacheBuilder::new(Arc::new(BrokenStore), renderer.clone(), dir.path());

        let report = builder.ensure_cached().await;
        assert!(matches!(report, CacheReport::Failed { ref reason, .. } if reason.contains("corrupt")));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
        assert!(!builder.artifact_path().exists());
    }

    #[tokio::test]
    async fn test_store_write_failure_is_reported() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryContentStore::new());

        struct ReadOnlyStore(Arc<MemoryContentStore>);

        #[async_trait]
        impl ContentStore for ReadOnlyStore {
            async fn find_error_page(
                &self,
                code: u16,
                stage: Stage,
            ) -> Result<Option<ErrorPage>, ContentError> {
                self.0.find_error_page(code, stage).await
            }

            async fn write(&self, page: ErrorPage) -> Result<(), ContentError> {
                BrokenStore.write(page).await
            }

            async fn publish(&self, code: u16, from: Stage, to: Stage) -> Result<(), ContentError> {
                self.0.publish(code, from, to).await
            }
        }

        let builder = CacheBuilder::new(
            Arc::new(ReadOnlyStore(store.clone())),
            Arc::new(TemplateRenderer),
            dir.path(),
        );
        let report = builder.ensure_cached().await;
        assert!(report.is_failed());
        assert!(report.message(503).contains("Please check permissions"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_not_raised() {
        let dir = tempdir().unwrap();
        // A directory squatting on the artifact path makes the write fail.
        std::fs::create_dir_all(dir.path().join("error-503.html")).unwrap();
        let store = Arc::new(MemoryContentStore::new());
        let renderer = Arc::new(CountingRenderer::default());
        let builder = builder_with(&store, &renderer, dir.path());

        let report = builder.ensure_cached().await;
        assert!(report.is_failed());
        assert!(report.message(503).contains("Please check permissions"));
        // No rollback of the entity.
        assert!(store.find_error_page(503, Stage::Live).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unusable_assets_dir_fails() {
        let dir = tempdir().unwrap();
        let assets = dir.path().join("assets");
        std::fs::write(&assets, "file in the way").unwrap();
        let store = Arc::new(MemoryContentStore::new());
        let renderer = Arc::new(CountingRenderer::default());
        let builder = builder_with(&store, &renderer, &assets);

        assert!(builder.ensure_cached().await.is_failed());
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_render_failure_and_empty_body_fail() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn ContentStore> = Arc::new(MemoryContentStore::new());

        let broken = CacheBuilder::new(
            store.clone(),
            Arc::new(FixedRenderer(Err("boom".into()))),
            dir.path(),
        );
        let report = broken.ensure_cached().await;
        assert!(matches!(report, CacheReport::Failed { ref reason, .. } if reason.contains("boom")));

        let empty = CacheBuilder::new(store, Arc::new(FixedRenderer(Ok(String::new()))), dir.path());
        assert!(empty.ensure_cached().await.is_failed());
        assert!(!dir.path().join("error-503.html").exists());
    }

    #[tokio::test]
    async fn test_concurrent_calls_render_once() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryContentStore::new());
        let renderer = Arc::new(CountingRenderer::default());
        let builder = Arc::new(builder_with(&store, &renderer, dir.path()));

        let (a, b) = tokio::join!(builder.ensure_cached(), builder.ensure_cached());
        let mut reports = [a, b];
        reports.sort_by_key(|r| matches!(r, CacheReport::AlreadyValid { .. }));

        assert!(matches!(reports[0], CacheReport::Created { .. }));
        assert!(matches!(reports[1], CacheReport::AlreadyValid { .. }));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(Stage::Draft), 1);
    }

    #[test]
    fn test_fingerprint_tracks_title_and_content() {
        let a = ErrorPage::new(503, "A", "body");
        let mut b = a.clone();
        assert_eq!(fingerprint(&a), fingerprint(&b));

        b.content.push('!');
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 40);
    }

    #[test]
    fn test_fingerprint_path_sits_next_to_artifact() {
        let builder = CacheBuilder::new(
            Arc::new(MemoryContentStore::new()),
            Arc::new(TemplateRenderer),
            "assets",
        );
        assert_eq!(builder.fingerprint_path(), PathBuf::from("assets/error-503.html.sha1"));
    }
}
