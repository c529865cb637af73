//! Image Viewer Core Library
//!
//! This library resolves item pages on a family of image hosts into their
//! full-size images. The hosts hide the real viewer page behind an
//! obfuscated redirect and a form post; the resolver walks that handshake,
//! caches the final markup and the image on disk, and extracts navigation
//! links and related-thumbnail panels for a front end to render.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`provider`] - Static host descriptors, token decoding and markup extraction
//! - [`cache`] - Disk-backed, provider-namespaced content cache
//! - [`resolver`] - Page resolution state machine, HTTP client and retry policy
//! - [`navigation`] - Session context, back/forward history and background prefetch
//! - [`gallery`] - Paginated gallery listings
//! - [`imaging`] - Image dimensions and thumbnail resizing
//! - [`output`] - Saving images with collision-free names
//! - [`config`] - Session defaults, TOML file config and proxy persistence

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod gallery;
pub mod imaging;
pub mod navigation;
pub mod output;
pub mod provider;
pub mod resolver;
pub mod user_agent;

// Re-export commonly used types
pub use cache::{CacheError, ContentCache};
pub use config::{ConfigError, FileConfig, SessionConfig};
pub use gallery::{GALLERY_PAGE_SIZE, GalleryPage, GalleryPager};
pub use navigation::{History, NavButton, PageView, Panel, PanelUpdate, PrefetchPool, Session};
pub use provider::{PROVIDERS, Provider, select_provider};
pub use resolver::{
    PageClient, PageResolver, ResolveError, ResolvedPage, RetryDecision, RetryPolicy, Thumbnail,
};
