//! Site descriptors for the supported image hosts.
//!
//! Every supported host runs the same viewer software, so a provider is pure
//! data: host, cache namespace, redirect token names, and which of two
//! structural families it uses for the form field and the image URL. One
//! resolver drives all of them.
//!
//! # Registry order
//!
//! [`select_provider`] checks the registry in this fixed order and returns the
//! first whose key occurs anywhere in the input URL:
//!
//! 1. `imgrock`
//! 2. `imgview`
//! 3. `imgtown`
//! 4. `imgoutlet`
//! 5. `imgmaze`
//! 6. `imgdew`
//!
//! The order is part of the contract: a URL mentioning two keys resolves to
//! the one listed first here, regardless of where each key appears.

pub mod markup;
pub mod token;

use regex::Regex;
use tracing::debug;

pub use markup::ThumbLink;
pub use token::{DecodeError, TokenPlan};

/// How the view form's extra field name is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFieldMode {
    /// Two single-quoted fragments.
    Short,
    /// Eleven single-quoted fragments.
    Long,
}

impl PostFieldMode {
    /// Fragment names concatenated, in order, to form the field name.
    #[must_use]
    pub fn token_names(self) -> &'static [&'static str] {
        match self {
            Self::Short => &["_0x161539", "_0xac7006"],
            Self::Long => &[
                "_0x6f3649",
                "_0x5754e8",
                "_0x58bd37",
                "_0x23f325",
                "_0x3e41de",
                "_0x1728a8",
                "_0x46dc6a",
                "_0x2a20de",
                "_0x1a0961",
                "_0x1008b5",
                "_0x301249",
            ],
        }
    }
}

/// How the full-size image URL is found on the final page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageUrlMode {
    /// `{server}/img/{path}` from two double-quoted fragments.
    Compose,
    /// The `picview` image following the "Next" marker.
    Pattern,
}

/// Fragment names joined by [`ImageUrlMode::Compose`].
const COMPOSE_SERVER_TOKEN: &str = "_0xDB36";
const COMPOSE_PATH_TOKEN: &str = "_0xDB54";

/// Static descriptor for one image host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provider {
    cache_key: &'static str,
    host: &'static str,
    redirect_plan: TokenPlan,
    post_field_mode: PostFieldMode,
    image_url_mode: ImageUrlMode,
}

const ROCK_PLAN: TokenPlan = TokenPlan::new([
    "_0x92afb7",
    "_0x1cdcb3",
    "_0x31f1b4",
    "_0x4817e7",
    "_0x2c6182",
    "_0x53e80d",
    "_0x375c1e",
    "_0x16777a",
    "_0x14ff50",
    "_0x18dc18",
]);

const VIEW_PLAN: TokenPlan = TokenPlan::new([
    "_0x474995",
    "_0x105bd2",
    "_0x5f000f",
    "_0x5f4353",
    "_0x39b490",
    "_0x51ca4d",
    "_0x3edc55",
    "_0x2091c4",
    "_0x388eb7",
    "_0x308cf0",
]);

const OUTLET_PLAN: TokenPlan = TokenPlan::new([
    "_0x4ae180",
    "_0x31c497",
    "_0x580e37",
    "_0x337490",
    "_0x5aa778",
    "_0x4c78db",
    "_0x5f2b0",
    "_0x19792c",
    "_0x269158",
    "_0xacf574",
]);

const MAZE_PLAN: TokenPlan = TokenPlan::new([
    "_0x1ab2d2",
    "_0x2b3b4c",
    "_0x3b4d44",
    "_0x43582a",
    "_0x501afd",
    "_0x23d671",
    "_0x220856",
    "_0x473131",
    "_0x421cf1",
    "_0x86fd3f",
]);

/// Supported hosts in selection priority order.
pub static PROVIDERS: [Provider; 6] = [
    Provider {
        cache_key: "imgrock",
        host: "imgrock.pw",
        redirect_plan: ROCK_PLAN,
        post_field_mode: PostFieldMode::Short,
        image_url_mode: ImageUrlMode::Compose,
    },
    Provider {
        cache_key: "imgview",
        host: "imgview.pw",
        redirect_plan: VIEW_PLAN,
        post_field_mode: PostFieldMode::Long,
        image_url_mode: ImageUrlMode::Pattern,
    },
    Provider {
        cache_key: "imgtown",
        host: "imgtown.pw",
        redirect_plan: ROCK_PLAN,
        post_field_mode: PostFieldMode::Long,
        image_url_mode: ImageUrlMode::Pattern,
    },
    Provider {
        cache_key: "imgoutlet",
        host: "imgoutlet.pw",
        redirect_plan: OUTLET_PLAN,
        post_field_mode: PostFieldMode::Short,
        image_url_mode: ImageUrlMode::Compose,
    },
    Provider {
        cache_key: "imgmaze",
        host: "imgmaze.pw",
        redirect_plan: MAZE_PLAN,
        post_field_mode: PostFieldMode::Long,
        image_url_mode: ImageUrlMode::Pattern,
    },
    Provider {
        cache_key: "imgdew",
        host: "imgdew.pw",
        redirect_plan: VIEW_PLAN,
        post_field_mode: PostFieldMode::Long,
        image_url_mode: ImageUrlMode::Pattern,
    },
];

/// Picks the first registered provider whose key occurs in `url`.
#[must_use]
pub fn select_provider(url: &str) -> Option<&'static Provider> {
    let found = PROVIDERS.iter().find(|p| url.contains(p.cache_key));
    debug!(url, provider = found.map(Provider::cache_key), "provider lookup");
    found
}

/// Looks a provider up by its cache key.
#[must_use]
pub fn provider_by_key(cache_key: &str) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|p| p.cache_key == cache_key)
}

impl Provider {
    /// Cache namespace and URL-matching key (e.g. `imgrock`).
    #[must_use]
    pub fn cache_key(&self) -> &'static str {
        self.cache_key
    }

    /// Network host (e.g. `imgrock.pw`).
    #[must_use]
    pub fn host(&self) -> &'static str {
        self.host
    }

    /// `https://{host}`.
    #[must_use]
    pub fn origin(&self) -> String {
        format!("https://{}", self.host)
    }

    /// Redirect token plan.
    #[must_use]
    pub fn redirect_plan(&self) -> &TokenPlan {
        &self.redirect_plan
    }

    /// Form field assembly family.
    #[must_use]
    pub fn post_field_mode(&self) -> PostFieldMode {
        self.post_field_mode
    }

    /// Image URL family.
    #[must_use]
    pub fn image_url_mode(&self) -> ImageUrlMode {
        self.image_url_mode
    }

    /// Extracts the item identifier from a URL on this provider.
    ///
    /// The identifier is the first path segment after `{key}.{tld}/`.
    #[must_use]
    pub fn identifier(&self, url: &str) -> Option<String> {
        let pattern = format!(
            r"https?://{}\.[a-z]+/(.+?)(?:/|$)",
            regex::escape(self.cache_key)
        );
        let regex = Regex::new(&pattern).ok()?;
        regex
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Canonical item page URL under `origin`.
    #[must_use]
    pub fn page_url(&self, origin: &str, identifier: &str) -> String {
        format!("{}/{identifier}", origin.trim_end_matches('/'))
    }

    /// Gallery listing URL under `origin`.
    #[must_use]
    pub fn gallery_listing_url(&self, origin: &str, gallery: &str, page: u64) -> String {
        format!(
            "{}/?fld_hash={gallery}&op=gallery&per_page={}&page={page}",
            origin.trim_end_matches('/'),
            crate::gallery::GALLERY_PAGE_SIZE
        )
    }

    /// Decodes the redirect target hidden in the initial page.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the tokens do not form a valid payload.
    pub fn resolve_redirect(&self, markup: &str) -> Result<String, DecodeError> {
        self.redirect_plan.decode_redirect(markup)
    }

    /// Name of the extra form field the view POST must carry.
    ///
    /// Empty when the fragments are absent.
    #[must_use]
    pub fn post_field_name(&self, markup: &str) -> String {
        token::concat_tokens(markup, self.post_field_mode.token_names())
    }

    /// Full-size image URL on the final page.
    #[must_use]
    pub fn image_url(&self, markup: &str) -> Option<String> {
        match self.image_url_mode {
            ImageUrlMode::Compose => {
                let server = token::extract_token(markup, COMPOSE_SERVER_TOKEN);
                let path = token::extract_token(markup, COMPOSE_PATH_TOKEN);
                if server.is_empty() || path.is_empty() {
                    None
                } else {
                    Some(format!("{server}/img/{path}"))
                }
            }
            ImageUrlMode::Pattern => markup::picview_image_url(markup),
        }
    }

    /// Link to the next item.
    #[must_use]
    pub fn next_identifier_url(&self, markup: &str) -> Option<String> {
        markup::next_url(markup)
    }

    /// Link to the previous item.
    #[must_use]
    pub fn prev_identifier_url(&self, markup: &str) -> Option<String> {
        markup::prev_url(markup)
    }

    /// "More from author" entries.
    #[must_use]
    pub fn author_thumbnails(&self, markup: &str, limit: usize) -> Vec<ThumbLink> {
        markup::author_thumbnails(markup, limit)
    }

    /// "More from gallery" entries.
    #[must_use]
    pub fn gallery_thumbnails(&self, markup: &str, limit: usize) -> Vec<ThumbLink> {
        markup::gallery_thumbnails(markup, limit)
    }

    /// Share-marker thumbnail URL of the current item.
    #[must_use]
    pub fn thumb_url(&self, markup: &str) -> Option<String> {
        markup::thumb_url(markup)
    }
}
