//! Page resolution: from a user-supplied item URL to a fully extracted page.
//!
//! A resolution walks a fixed sequence of stages:
//!
//! ```text
//! Identify -> FetchInitial -> DecodeRedirect -> FetchRedirect -> SubmitForm
//!          \______________________ cache hit _____________________/
//!                                                                  -> Extract -> FetchImage
//! ```
//!
//! Any failing stage aborts the attempt with a [`ResolveError`]. Whole
//! attempts are retried by the caller according to a [`RetryPolicy`]; the
//! resolver itself never retries.
//!
//! - [`PageResolver`] - runs the handshake and extraction against one provider
//! - [`PageClient`] - shared HTTP client (timeouts, proxy, User-Agent)
//! - [`ResolvedPage`] - everything extracted from a final item page
//! - [`Thumbnail`] - a resized, cached thumbnail for navigation and panels
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use imgview_core::cache::ContentCache;
//! use imgview_core::resolver::{HttpSettings, PageClient, PageResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PageClient::new(&HttpSettings::default())?;
//! let resolver = PageResolver::new(client, Arc::new(ContentCache::new("cache", true)));
//! let page = resolver.resolve("https://imgrock.pw/abc123/photo.jpg.html", false).await?;
//! println!("{} ({}x{})", page.image_name, page.width, page.height);
//! # Ok(())
//! # }
//! ```

mod error;
mod http_client;
mod retry;

pub use error::ResolveError;
pub use http_client::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, HttpSettings, PageClient, proxy_url,
    view_form_body,
};
pub use retry::{DEFAULT_MAX_ATTEMPTS, RetryDecision, RetryPolicy};

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::cache::ContentCache;
use crate::imaging::{self, ImageError, ScaledImage};
use crate::provider::markup::{self, ThumbLink};
use crate::provider::{self, Provider};

/// Default number of slots in each related-thumbnail panel.
pub const DEFAULT_PANEL_SIZE: usize = 8;

/// Marker the hosts render instead of an item page for deleted items.
const FILE_NOT_FOUND_MARKER: &str = "File Not Found";

/// Stage a resolution is in; used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStage {
    /// Selecting the provider and extracting the identifier.
    Identify,
    /// GET of the canonical item page.
    FetchInitial,
    /// Reassembling the redirect URL from scattered tokens.
    DecodeRedirect,
    /// GET of the redirect target.
    FetchRedirect,
    /// POST of the view form.
    SubmitForm,
    /// Pulling fields out of the final page.
    Extract,
    /// Fetching the full-size image.
    FetchImage,
}

impl ResolveStage {
    /// Lowercase stage name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identify => "identify",
            Self::FetchInitial => "fetch_initial",
            Self::DecodeRedirect => "decode_redirect",
            Self::FetchRedirect => "fetch_redirect",
            Self::SubmitForm => "submit_form",
            Self::Extract => "extract",
            Self::FetchImage => "fetch_image",
        }
    }
}

impl fmt::Display for ResolveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider and identifier an input URL maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Owning provider.
    pub provider: &'static Provider,
    /// Item identifier.
    pub identifier: String,
    /// Canonical item page URL.
    pub page_url: String,
}

/// A resized thumbnail and the item it links to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// Item page URL the thumbnail opens.
    pub link: String,
    /// Source thumbnail URL.
    pub thumb_url: String,
    /// PNG rendition at the configured width.
    pub image: ScaledImage,
}

/// Everything extracted from a final item page.
#[derive(Debug, Clone)]
pub struct ResolvedPage {
    /// Owning provider.
    pub provider: &'static Provider,
    /// Item identifier.
    pub identifier: String,
    /// Canonical item page URL.
    pub page_url: String,
    /// Directory prefix of the item's thumbnails, ending in `/`.
    pub thumb_prefix: String,
    /// Full-size image URL.
    pub image_url: String,
    /// `{image file stem}_{identifier}`; also the image's cache key.
    pub image_name: String,
    /// Full-size image bytes.
    pub image: Vec<u8>,
    /// Decoded image width.
    pub width: u32,
    /// Decoded image height.
    pub height: u32,
    /// Previous item link, if any.
    pub prev_url: Option<String>,
    /// Next item link, if any.
    pub next_url: Option<String>,
    /// "More from gallery" link, if any.
    pub gallery_url: Option<String>,
    /// "More from author" panel entries.
    pub author_links: Vec<ThumbLink>,
    /// "More from gallery" panel entries.
    pub gallery_links: Vec<ThumbLink>,
    /// Whether the page markup came from the cache.
    pub from_cache: bool,
}

impl ResolvedPage {
    /// Gallery hash taken from the gallery link.
    #[must_use]
    pub fn gallery_hash(&self) -> Option<String> {
        self.gallery_url.as_deref().and_then(markup::gallery_hash)
    }

    /// `https://{host}/{identifier}` on the provider's real host.
    ///
    /// Every input URL form of one item maps to this value, whatever origin
    /// the requests were sent to.
    #[must_use]
    pub fn canonical_url(&self) -> String {
        self.provider.page_url(&self.provider.origin(), &self.identifier)
    }

    /// Predicted thumbnail URL for an identifier under this page's prefix.
    #[must_use]
    pub fn sibling_thumb_url(&self, identifier: &str) -> String {
        format!("{}{identifier}_t.jpg", self.thumb_prefix)
    }

    /// Main image scaled to `width`.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError`] if the image cannot be decoded or re-encoded.
    pub fn preview(&self, width: u32) -> Result<ScaledImage, ImageError> {
        imaging::resize_to_width(&self.image, width)
    }
}

/// Runs the item-page handshake and extraction.
#[derive(Debug, Clone)]
pub struct PageResolver {
    client: PageClient,
    cache: Arc<ContentCache>,
    origin_override: Option<String>,
    panel_size: usize,
}

impl PageResolver {
    /// Creates a resolver over `client` and `cache`.
    #[must_use]
    pub fn new(client: PageClient, cache: Arc<ContentCache>) -> Self {
        Self {
            client,
            cache,
            origin_override: None,
            panel_size: DEFAULT_PANEL_SIZE,
        }
    }

    /// Sends every provider request to `origin` instead of `https://{host}`.
    ///
    /// Used to point the resolver at a local mock server.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin_override = Some(origin.into());
        self
    }

    /// Sets the number of panel slots extracted per page.
    #[must_use]
    pub fn with_panel_size(mut self, panel_size: usize) -> Self {
        self.panel_size = panel_size;
        self
    }

    /// Origin requests for `provider` are sent to.
    #[must_use]
    pub fn origin(&self, provider: &Provider) -> String {
        self.origin_override
            .clone()
            .unwrap_or_else(|| provider.origin())
    }

    /// Shared HTTP client.
    #[must_use]
    pub fn client(&self) -> &PageClient {
        &self.client
    }

    /// Shared content cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    /// Maps an input URL to its provider and identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NoProvider`] or [`ResolveError::NoIdentifier`].
    pub fn identify(&self, url: &str) -> Result<Target, ResolveError> {
        let provider = provider::select_provider(url).ok_or_else(|| ResolveError::no_provider(url))?;
        let identifier = provider
            .identifier(url)
            .ok_or_else(|| ResolveError::no_identifier(url, provider.cache_key()))?;
        let page_url = provider.page_url(&self.origin(provider), &identifier);
        Ok(Target {
            provider,
            identifier,
            page_url,
        })
    }

    /// Resolves `url` into a [`ResolvedPage`].
    ///
    /// Cached page markup is used unless `ignore_cache` is set; a fresh
    /// handshake overwrites the cached entry.
    ///
    /// # Errors
    ///
    /// Returns the [`ResolveError`] of the first failing stage.
    #[instrument(
        skip(self),
        fields(provider = tracing::field::Empty, identifier = tracing::field::Empty)
    )]
    pub async fn resolve(&self, url: &str, ignore_cache: bool) -> Result<ResolvedPage, ResolveError> {
        let target = self.identify(url)?;
        tracing::Span::current()
            .record("provider", target.provider.cache_key())
            .record("identifier", target.identifier.as_str());

        let cached = if ignore_cache {
            None
        } else {
            self.cache
                .get_or_miss(target.provider.cache_key(), &target.identifier)
                .await
        };
        let from_cache = cached.is_some();
        let markup = match cached {
            Some(bytes) => {
                debug!("page markup served from cache");
                bytes
            }
            None => self.handshake(&target).await?,
        };

        let markup = String::from_utf8_lossy(&markup);
        let page = self.extract(&target, &markup, from_cache).await?;
        info!(
            image = %page.image_name,
            width = page.width,
            height = page.height,
            from_cache,
            "page resolved"
        );
        Ok(page)
    }

    /// Runs the three-request handshake and caches the final markup.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] for 404s, undecodable tokens, the
    /// "File Not Found" page, a missing form field or transport failures.
    #[instrument(skip(self, target), fields(identifier = %target.identifier))]
    pub async fn handshake(&self, target: &Target) -> Result<Vec<u8>, ResolveError> {
        let provider = target.provider;
        let page_url = target.page_url.as_str();

        debug!(stage = %ResolveStage::FetchInitial, url = page_url);
        let initial = self.client.get(page_url, None).await?;
        let initial = String::from_utf8_lossy(&initial);

        debug!(stage = %ResolveStage::DecodeRedirect);
        let redirect = provider
            .resolve_redirect(&initial)
            .map_err(|e| ResolveError::decode_failure(page_url, e.to_string()))?;
        let redirect_url = absolutize(page_url, &redirect);

        debug!(stage = %ResolveStage::FetchRedirect, url = %redirect_url);
        let landing = self.client.get(&redirect_url, Some(page_url)).await?;
        let landing = String::from_utf8_lossy(&landing);
        if landing.contains(FILE_NOT_FOUND_MARKER) {
            debug!(url = %redirect_url, "host reports file not found");
            return Err(ResolveError::not_found(page_url));
        }

        let field = provider.post_field_name(&landing);
        if field.is_empty() {
            return Err(ResolveError::missing_field("form field name", redirect_url));
        }

        debug!(stage = %ResolveStage::SubmitForm, field = %field);
        let final_page = self
            .client
            .post_view_form(&redirect_url, Some(page_url), &target.identifier, &field)
            .await?;

        self.cache
            .put_or_warn(provider.cache_key(), &target.identifier, &final_page)
            .await;
        Ok(final_page)
    }

    async fn extract(
        &self,
        target: &Target,
        markup: &str,
        from_cache: bool,
    ) -> Result<ResolvedPage, ResolveError> {
        let provider = target.provider;
        debug!(stage = %ResolveStage::Extract);

        let thumb_url = provider
            .thumb_url(markup)
            .ok_or_else(|| ResolveError::missing_field("thumbnail marker", &target.page_url))?;
        let thumb_prefix = markup::thumb_prefix(&thumb_url);

        let image_url = provider
            .image_url(markup)
            .map(|url| absolutize(&target.page_url, &url))
            .ok_or_else(|| ResolveError::missing_field("image url", &target.page_url))?;
        let image_name = format!(
            "{}_{}",
            markup::file_stem(&markup::url_filename(&image_url)),
            target.identifier
        );

        debug!(stage = %ResolveStage::FetchImage, url = %image_url);
        let (image, (width, height)) = self.fetch_image(provider, &image_url, &image_name).await?;

        Ok(ResolvedPage {
            provider,
            identifier: target.identifier.clone(),
            page_url: target.page_url.clone(),
            thumb_prefix,
            image_url,
            image_name,
            image,
            width,
            height,
            prev_url: provider.prev_identifier_url(markup),
            next_url: provider.next_identifier_url(markup),
            gallery_url: markup::gallery_url(markup),
            author_links: provider.author_thumbnails(markup, self.panel_size),
            gallery_links: provider.gallery_thumbnails(markup, self.panel_size),
            from_cache,
        })
    }

    /// Full-size image bytes and their dimensions.
    ///
    /// Fetched bytes are cached under `image_name` only once they decode.
    async fn fetch_image(
        &self,
        provider: &Provider,
        image_url: &str,
        image_name: &str,
    ) -> Result<(Vec<u8>, (u32, u32)), ResolveError> {
        if let Some(bytes) = self.cache.get_or_miss(provider.cache_key(), image_name).await {
            let size = imaging::dimensions(&bytes)
                .map_err(|e| ResolveError::transient(image_url, e.to_string()))?;
            return Ok((bytes, size));
        }
        let bytes = self.client.get(image_url, None).await?;
        let size = match imaging::dimensions(&bytes) {
            Ok(size) => size,
            Err(e) => {
                warn!(url = image_url, error = %e, "image not cached; bytes do not decode");
                return Err(ResolveError::transient(image_url, e.to_string()));
            }
        };
        self.cache
            .put_or_warn(provider.cache_key(), image_name, &bytes)
            .await;
        Ok((bytes, size))
    }

    /// Loads a thumbnail through the cache and scales it to `width`.
    ///
    /// The cache key is the thumbnail file name without its extension.
    /// Fetched bytes are cached only after they decode.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the fetch fails or the bytes do not decode.
    #[instrument(level = "debug", skip(self, provider), fields(provider = provider.cache_key()))]
    pub async fn thumbnail(
        &self,
        provider: &Provider,
        link: &str,
        thumb_url: &str,
        width: u32,
    ) -> Result<Thumbnail, ResolveError> {
        let key = markup::url_filename(thumb_url);
        let key = markup::file_stem(&key);
        let image = match self.cache.get_or_miss(provider.cache_key(), key).await {
            Some(bytes) => imaging::resize_to_width(&bytes, width)
                .map_err(|e| ResolveError::transient(thumb_url, e.to_string()))?,
            None => {
                let bytes = self.client.get(thumb_url, None).await?;
                let image = match imaging::resize_to_width(&bytes, width) {
                    Ok(image) => image,
                    Err(e) => {
                        warn!(
                            url = thumb_url,
                            error = %e,
                            "thumbnail not cached; bytes do not decode"
                        );
                        return Err(ResolveError::transient(thumb_url, e.to_string()));
                    }
                };
                self.cache.put_or_warn(provider.cache_key(), key, &bytes).await;
                image
            }
        };
        Ok(Thumbnail {
            link: link.to_string(),
            thumb_url: thumb_url.to_string(),
            image,
        })
    }
}

/// Resolves `candidate` against `base` when it is relative.
fn absolutize(base: &str, candidate: &str) -> String {
    if Url::parse(candidate).is_ok() {
        return candidate.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(candidate))
        .map_or_else(|_| candidate.to_string(), String::from)
}
