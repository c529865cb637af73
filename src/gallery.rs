//! Paginated browsing of a gallery's thumbnail listing.
//!
//! Listings are fetched fifteen entries at a time and cached per page under
//! `{gallery}_{page:05}`. The page count starts at a large sentinel and is
//! replaced by `ceil(total / 15)` once a listing reports its total.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::navigation::{Panel, PanelUpdate, PrefetchPool};
use crate::provider::markup::{self, ThumbLink};
use crate::provider::{self, Provider};
use crate::resolver::{PageResolver, ResolveError};

/// Entries per listing page.
pub const GALLERY_PAGE_SIZE: usize = 15;

/// Page count assumed before the first listing reports its total.
pub const PROVISIONAL_PAGE_COUNT: u64 = 1_000_000;

/// One fetched listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryPage {
    /// Gallery hash.
    pub gallery: String,
    /// Page number actually fetched, after clamping.
    pub page: u64,
    /// Page count known after this fetch.
    pub page_count: u64,
    /// Up to [`GALLERY_PAGE_SIZE`] `(link, thumbnail)` pairs.
    pub entries: Vec<ThumbLink>,
    /// Whether the listing came from the cache.
    pub from_cache: bool,
}

/// Pager over one gallery.
#[derive(Debug, Clone)]
pub struct GalleryPager {
    resolver: Arc<PageResolver>,
    provider: &'static Provider,
    gallery: String,
    page: u64,
    page_count: u64,
}

impl GalleryPager {
    /// Creates a pager for `gallery` on `provider`, positioned at page 1.
    #[must_use]
    pub fn new(
        resolver: Arc<PageResolver>,
        provider: &'static Provider,
        gallery: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            provider,
            gallery: gallery.into(),
            page: 1,
            page_count: PROVISIONAL_PAGE_COUNT,
        }
    }

    /// Creates a pager from a gallery URL such as `https://imgrock.pw/g/abc`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NoProvider`] for unsupported hosts and
    /// [`ResolveError::MissingField`] when the URL has no `/g/` hash.
    pub fn from_url(resolver: Arc<PageResolver>, url: &str) -> Result<Self, ResolveError> {
        let provider = provider::select_provider(url).ok_or_else(|| ResolveError::no_provider(url))?;
        let gallery =
            markup::gallery_hash(url).ok_or_else(|| ResolveError::missing_field("gallery hash", url))?;
        Ok(Self::new(resolver, provider, gallery))
    }

    /// Gallery hash.
    #[must_use]
    pub fn gallery(&self) -> &str {
        &self.gallery
    }

    /// Owning provider.
    #[must_use]
    pub fn provider(&self) -> &'static Provider {
        self.provider
    }

    /// Current page number.
    #[must_use]
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Known page count; provisional until the first fetch.
    #[must_use]
    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    /// Clamps a requested page into `[1, page_count]`.
    #[must_use]
    pub fn clamp(&self, requested: i64) -> u64 {
        u64::try_from(requested)
            .unwrap_or(1)
            .clamp(1, self.page_count.max(1))
    }

    /// Fetches page `requested`, clamped to the known range.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the listing cannot be fetched or lacks its
    /// total marker.
    #[instrument(skip(self), fields(gallery = %self.gallery, provider = self.provider.cache_key()))]
    pub async fn turn_page(&mut self, requested: i64) -> Result<GalleryPage, ResolveError> {
        let page = self.clamp(requested);
        let key = format!("{}_{page:05}", self.gallery);
        let url = self.provider.gallery_listing_url(
            &self.resolver.origin(self.provider),
            &self.gallery,
            page,
        );
        let cache = self.resolver.cache();
        let namespace = self.provider.cache_key();

        let (listing, from_cache) = match cache.get_or_miss(namespace, &key).await {
            Some(bytes) => (String::from_utf8_lossy(&bytes).into_owned(), true),
            None => {
                let bytes = self.resolver.client().get(&url, None).await?;
                (String::from_utf8_lossy(&bytes).into_owned(), false)
            }
        };

        let total = markup::listing_total(&listing)
            .ok_or_else(|| ResolveError::missing_field("listing total", &url))?;
        if !from_cache {
            cache.put_or_warn(namespace, &key, listing.as_bytes()).await;
        }

        let per_page = u64::try_from(GALLERY_PAGE_SIZE).unwrap_or(u64::MAX);
        self.page_count = total.div_ceil(per_page).max(1);
        self.page = page;
        let entries = markup::listing_entries(&listing, GALLERY_PAGE_SIZE);
        info!(
            page,
            page_count = self.page_count,
            entries = entries.len(),
            from_cache,
            "gallery page loaded"
        );

        Ok(GalleryPage {
            gallery: self.gallery.clone(),
            page,
            page_count: self.page_count,
            entries,
            from_cache,
        })
    }

    /// Fetches the page after the current one.
    ///
    /// # Errors
    ///
    /// Same as [`turn_page`](Self::turn_page).
    pub async fn next_page(&mut self) -> Result<GalleryPage, ResolveError> {
        let requested = i64::try_from(self.page.saturating_add(1)).unwrap_or(i64::MAX);
        self.turn_page(requested).await
    }

    /// Fetches the page before the current one.
    ///
    /// # Errors
    ///
    /// Same as [`turn_page`](Self::turn_page).
    pub async fn prev_page(&mut self) -> Result<GalleryPage, ResolveError> {
        let requested = i64::try_from(self.page).unwrap_or(i64::MAX) - 1;
        self.turn_page(requested).await
    }

    /// Spawns one background task per entry to load its thumbnail.
    ///
    /// Results arrive on the returned receiver tagged with
    /// [`Panel::Listing`]. Dropping the receiver discards late results.
    pub fn load_thumbnails(
        &self,
        page: &GalleryPage,
        pool: &PrefetchPool,
        width: u32,
    ) -> (mpsc::UnboundedReceiver<PanelUpdate>, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let panel = Panel::Listing { page: page.page };
        let handles = page
            .entries
            .iter()
            .enumerate()
            .map(|(slot, entry)| {
                let resolver = Arc::clone(&self.resolver);
                let provider = self.provider;
                let entry = entry.clone();
                let tx = tx.clone();
                pool.spawn(async move {
                    match resolver
                        .thumbnail(provider, &entry.link, &entry.thumb_url, width)
                        .await
                    {
                        Ok(thumbnail) => {
                            if tx.send(PanelUpdate { panel, slot, thumbnail }).is_err() {
                                debug!(slot, "listing receiver gone; result dropped");
                            }
                        }
                        Err(e) => warn!(slot, url = %entry.thumb_url, error = %e, "listing thumbnail failed"),
                    }
                })
            })
            .collect();
        (rx, handles)
    }
}
