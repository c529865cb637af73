//! Navigation session: history, the current page and background prefetch.
//!
//! [`Session`] is the explicit context a front end owns. It wires the
//! resolver, cache and pool together and keeps the only mutable navigation
//! state: the [`History`] stacks and the currently displayed page. Background
//! tasks never touch either; they report thumbnails through a channel that
//! is replaced on every resolution, so completions for a page the user has
//! left are dropped rather than shown.

mod history;
mod prefetch;

pub use history::History;
pub use prefetch::{DEFAULT_POOL_SIZE, Panel, PanelUpdate, PoolError, PrefetchPool, join_all};

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::cache::ContentCache;
use crate::config::SessionConfig;
use crate::gallery::GalleryPager;
use crate::output::{self, OutputError};
use crate::provider::Provider;
use crate::provider::markup::ThumbLink;
use crate::resolver::{
    PageClient, PageResolver, ResolveError, ResolvedPage, RetryDecision, RetryPolicy, Thumbnail,
};

/// Errors constructing a [`Session`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// HTTP client could not be built.
    #[error(transparent)]
    Client(#[from] ResolveError),

    /// Pool size rejected.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Previous/next navigation affordance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavButton {
    /// Item URL the button opens.
    pub link: String,
    /// Thumbnail, when it could be loaded.
    pub thumbnail: Option<Thumbnail>,
}

/// A successfully resolved page plus its navigation buttons.
#[derive(Debug, Clone)]
pub struct PageView {
    /// Resolved page.
    pub page: ResolvedPage,
    /// Previous item button.
    pub prev: Option<NavButton>,
    /// Next item button.
    pub next: Option<NavButton>,
}

/// Explicit navigation context.
#[derive(Debug)]
pub struct Session {
    resolver: Arc<PageResolver>,
    retry: RetryPolicy,
    pool: PrefetchPool,
    history: History,
    current: Option<PageView>,
    thumbnail_width: u32,
    output_dir: PathBuf,
    panel_rx: Option<mpsc::UnboundedReceiver<PanelUpdate>>,
    panel_tasks: Vec<JoinHandle<()>>,
}

impl Session {
    /// Builds a session from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the client or pool cannot be built.
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        let client = PageClient::new(&config.http_settings())?;
        let cache = Arc::new(ContentCache::new(&config.cache_dir, config.reverse_cache_bytes));
        let mut resolver = PageResolver::new(client, cache).with_panel_size(config.panel_size);
        if let Some(origin) = &config.origin_override {
            resolver = resolver.with_origin(origin.clone());
        }
        let pool = PrefetchPool::new(config.pool_size)?;
        Ok(Self::with_parts(
            Arc::new(resolver),
            config.retry_policy(),
            pool,
            config.thumbnail_width,
            config.output_dir.clone(),
        ))
    }

    /// Assembles a session from prebuilt parts.
    #[must_use]
    pub fn with_parts(
        resolver: Arc<PageResolver>,
        retry: RetryPolicy,
        pool: PrefetchPool,
        thumbnail_width: u32,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            resolver,
            retry,
            pool,
            history: History::new(),
            current: None,
            thumbnail_width,
            output_dir,
            panel_rx: None,
            panel_tasks: Vec::new(),
        }
    }

    /// Currently displayed page, if the last resolution succeeded.
    #[must_use]
    pub fn current(&self) -> Option<&PageView> {
        self.current.as_ref()
    }

    /// Navigation history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Shared resolver.
    #[must_use]
    pub fn resolver(&self) -> &Arc<PageResolver> {
        &self.resolver
    }

    /// Shared background pool.
    #[must_use]
    pub fn pool(&self) -> &PrefetchPool {
        &self.pool
    }

    /// Resolves `url` with whole-pipeline retry.
    ///
    /// The current page is cleared before the first attempt, so after a
    /// failure nothing from the previous page remains visible. On success the
    /// item's canonical URL is recorded in history when `remember` is set, so
    /// different links to one item share a history entry. The related
    /// thumbnail panels start loading in the background.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's [`ResolveError`] once the retry bound is
    /// exhausted.
    #[instrument(skip(self))]
    pub async fn resolve(
        &mut self,
        url: &str,
        remember: bool,
        ignore_cache: bool,
    ) -> Result<&PageView, ResolveError> {
        let mut attempt = 1;
        loop {
            match self.attempt(url, remember, ignore_cache).await {
                Ok(()) => break,
                Err(e) => match self.retry.should_retry(attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next,
                    } => {
                        warn!(attempt, error = %e, "resolution attempt failed; retrying");
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        attempt = next;
                    }
                    RetryDecision::GiveUp { reason } => {
                        warn!(attempt, error = %e, reason = %reason, "resolution failed");
                        return Err(e);
                    }
                },
            }
        }
        self.current_view(url)
    }

    /// Single resolution attempt without retry.
    ///
    /// # Errors
    ///
    /// Returns the attempt's [`ResolveError`].
    pub async fn resolve_once(
        &mut self,
        url: &str,
        remember: bool,
        ignore_cache: bool,
    ) -> Result<&PageView, ResolveError> {
        self.attempt(url, remember, ignore_cache).await?;
        self.current_view(url)
    }

    /// Goes back one entry, if possible, and loads it without recording.
    ///
    /// Returns `None` when there is nothing to go back to.
    pub async fn go_back(&mut self) -> Option<Result<&PageView, ResolveError>> {
        let url = self.history.go_back()?;
        debug!(url = %url, "navigating back");
        Some(self.resolve_once(&url, false, false).await)
    }

    /// Goes forward one entry, if possible, and loads it as a recorded visit.
    ///
    /// Returns `None` when the forward stack is empty.
    pub async fn go_forward(&mut self) -> Option<Result<&PageView, ResolveError>> {
        let url = self.history.forward_target()?;
        debug!(url = %url, "navigating forward");
        Some(self.resolve_once(&url, true, false).await)
    }

    /// Thumbnails that finished since the last drain, for the current page.
    pub fn drain_panel_updates(&mut self) -> Vec<PanelUpdate> {
        let mut updates = Vec::new();
        if let Some(rx) = self.panel_rx.as_mut() {
            while let Ok(update) = rx.try_recv() {
                updates.push(update);
            }
        }
        updates
    }

    /// Waits for the current page's panel tasks, then drains their results.
    pub async fn settle_panels(&mut self) -> Vec<PanelUpdate> {
        join_all(std::mem::take(&mut self.panel_tasks)).await;
        self.drain_panel_updates()
    }

    /// Pager for the current page's gallery, if it links one.
    #[must_use]
    pub fn gallery_pager(&self) -> Option<GalleryPager> {
        let page = &self.current.as_ref()?.page;
        let gallery = page.gallery_hash()?;
        Some(GalleryPager::new(
            Arc::clone(&self.resolver),
            page.provider,
            gallery,
        ))
    }

    /// Saves the current page's image into the output directory.
    ///
    /// Returns `Ok(None)` when no page is displayed.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the file cannot be written.
    pub fn save_current_image(&self) -> Result<Option<PathBuf>, OutputError> {
        let Some(view) = self.current.as_ref() else {
            return Ok(None);
        };
        output::save_image(&self.output_dir, &view.page.image_name, &view.page.image).map(Some)
    }

    async fn attempt(
        &mut self,
        url: &str,
        remember: bool,
        ignore_cache: bool,
    ) -> Result<(), ResolveError> {
        self.clear_current();

        let page = self.resolver.resolve(url, ignore_cache).await?;
        let prev = self.nav_button(&page, page.prev_url.as_deref()).await;
        let next = self.nav_button(&page, page.next_url.as_deref()).await;

        if remember {
            self.history.push_visit(&page.canonical_url());
        }
        self.spawn_panels(&page);
        info!(identifier = %page.identifier, remember, "page displayed");
        self.current = Some(PageView { page, prev, next });
        Ok(())
    }

    fn current_view(&self, url: &str) -> Result<&PageView, ResolveError> {
        self.current
            .as_ref()
            .ok_or_else(|| ResolveError::missing_field("page", url))
    }

    fn clear_current(&mut self) {
        self.current = None;
        // Dropping the receiver makes late panel results undeliverable.
        self.panel_rx = None;
        self.panel_tasks.clear();
    }

    async fn nav_button(&self, page: &ResolvedPage, link: Option<&str>) -> Option<NavButton> {
        let link = link?;
        let thumbnail = match page.provider.identifier(link) {
            Some(identifier) => {
                let thumb_url = page.sibling_thumb_url(&identifier);
                match self
                    .resolver
                    .thumbnail(page.provider, link, &thumb_url, self.thumbnail_width)
                    .await
                {
                    Ok(thumbnail) => Some(thumbnail),
                    Err(e) => {
                        warn!(link, error = %e, "navigation thumbnail unavailable");
                        None
                    }
                }
            }
            None => {
                warn!(link, "navigation link carries no identifier");
                None
            }
        };
        Some(NavButton {
            link: link.to_string(),
            thumbnail,
        })
    }

    fn spawn_panels(&mut self, page: &ResolvedPage) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.panel_rx = Some(rx);
        self.panel_tasks = [
            (Panel::Author, page.author_links.clone()),
            (Panel::Gallery, page.gallery_links.clone()),
        ]
        .into_iter()
        .map(|(panel, links)| {
            let resolver = Arc::clone(&self.resolver);
            let provider = page.provider;
            let width = self.thumbnail_width;
            let tx = tx.clone();
            self.pool.spawn(async move {
                load_panel(&resolver, provider, panel, &links, width, &tx).await;
            })
        })
        .collect();
    }
}

async fn load_panel(
    resolver: &PageResolver,
    provider: &'static Provider,
    panel: Panel,
    links: &[ThumbLink],
    width: u32,
    tx: &mpsc::UnboundedSender<PanelUpdate>,
) {
    for (slot, entry) in links.iter().enumerate() {
        if tx.is_closed() {
            debug!(?panel, "page replaced; panel load abandoned");
            return;
        }
        match resolver
            .thumbnail(provider, &entry.link, &entry.thumb_url, width)
            .await
        {
            Ok(thumbnail) => {
                let _ = tx.send(PanelUpdate {
                    panel,
                    slot,
                    thumbnail,
                });
            }
            Err(e) => warn!(?panel, slot, url = %entry.thumb_url, error = %e, "panel thumbnail failed"),
        }
    }
}
