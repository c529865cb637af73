//! Integration tests for page resolution.
//!
//! Drives the full handshake against a mock host through the public API.

use std::sync::Arc;

use imgview_core::cache::ContentCache;
use imgview_core::resolver::{HttpSettings, PageClient, PageResolver, ResolveError};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::fixtures::{self, HandshakePages, item_url, mount_assets, mount_handshake};
use support::socket_guard::start_mock_server_or_skip;

fn resolver_for(server: &MockServer, cache_dir: &TempDir) -> PageResolver {
    let client = PageClient::new(&HttpSettings::default()).unwrap();
    let cache = Arc::new(ContentCache::new(cache_dir.path(), true));
    PageResolver::new(client, cache).with_origin(server.uri())
}

#[tokio::test]
async fn test_handshake_resolves_full_page() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_handshake(&server, "abc123", 1).await;
    mount_assets(&server, "abc123", 1).await;
    let cache_dir = TempDir::new().unwrap();
    let resolver = resolver_for(&server, &cache_dir);

    let page = resolver.resolve(&item_url("abc123"), false).await.unwrap();

    assert_eq!(page.provider.cache_key(), "imgrock");
    assert_eq!(page.identifier, "abc123");
    assert_eq!(page.image_url, format!("{}/img/pic.jpg", server.uri()));
    assert_eq!(page.image_name, "pic_abc123");
    assert_eq!((page.width, page.height), (900, 600));
    assert_eq!(page.thumb_prefix, format!("{}/th/01/", server.uri()));
    assert_eq!(
        page.prev_url.as_deref(),
        Some("https://imgrock.pw/prev111/p.jpg.html")
    );
    assert_eq!(
        page.next_url.as_deref(),
        Some("https://imgrock.pw/next222/n.jpg.html")
    );
    assert_eq!(page.gallery_hash().as_deref(), Some("gal777"));
    assert_eq!(page.author_links.len(), 2);
    assert_eq!(page.gallery_links.len(), 1);
    assert!(!page.from_cache);

    // Page markup and image are both cached, byte-reversed on disk.
    let cache = resolver.cache();
    assert!(cache.get("imgrock", "abc123").await.unwrap().is_some());
    assert_eq!(
        cache.get("imgrock", "pic_abc123").await.unwrap().unwrap(),
        page.image
    );
    let on_disk = std::fs::read(cache_dir.path().join("imgrock").join("pic_abc123")).unwrap();
    assert_eq!(on_disk.first(), page.image.last());
}

#[tokio::test]
async fn test_second_resolve_is_served_from_cache() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    // Every handshake step and the image may be requested exactly once.
    mount_handshake(&server, "abc123", 1).await;
    mount_assets(&server, "abc123", 1).await;
    let cache_dir = TempDir::new().unwrap();
    let resolver = resolver_for(&server, &cache_dir);

    let first = resolver.resolve(&item_url("abc123"), false).await.unwrap();
    let second = resolver.resolve(&item_url("abc123"), false).await.unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.image, second.image);
    assert_eq!((second.width, second.height), (900, 600));
    assert_eq!(first.next_url, second.next_url);
}

#[tokio::test]
async fn test_ignore_cache_repeats_handshake_but_not_image() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_handshake(&server, "abc123", 2).await;
    mount_assets(&server, "abc123", 1).await;
    let cache_dir = TempDir::new().unwrap();
    let resolver = resolver_for(&server, &cache_dir);

    resolver.resolve(&item_url("abc123"), false).await.unwrap();
    let again = resolver.resolve(&item_url("abc123"), true).await.unwrap();
    assert!(!again.from_cache);
}

#[tokio::test]
async fn test_initial_404_is_not_found() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/gone1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let cache_dir = TempDir::new().unwrap();
    let resolver = resolver_for(&server, &cache_dir);

    let err = resolver.resolve(&item_url("gone1"), false).await.unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[tokio::test]
async fn test_file_not_found_marker_is_not_found() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let redirect = format!("{}/redirect/dead1", server.uri());
    Mock::given(method("GET"))
        .and(path("/dead1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::initial_page(&redirect)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/redirect/dead1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h2>File Not Found</h2>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let cache_dir = TempDir::new().unwrap();
    let resolver = resolver_for(&server, &cache_dir);

    let err = resolver.resolve(&item_url("dead1"), false).await.unwrap_err();
    assert!(matches!(err, ResolveError::NotFound { .. }), "{err}");
    assert!(resolver.cache().get("imgrock", "dead1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_tokens_is_decode_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/plain1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>no tokens</html>"))
        .mount(&server)
        .await;
    let cache_dir = TempDir::new().unwrap();
    let resolver = resolver_for(&server, &cache_dir);

    let err = resolver.resolve(&item_url("plain1"), false).await.unwrap_err();
    assert!(matches!(err, ResolveError::DecodeFailure { .. }), "{err}");
}

#[tokio::test]
async fn test_missing_form_field_is_missing_field() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let redirect = format!("{}/redirect/nofield", server.uri());
    Mock::given(method("GET"))
        .and(path("/nofield"))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::initial_page(&redirect)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/redirect/nofield"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>changed layout</html>"))
        .mount(&server)
        .await;
    let cache_dir = TempDir::new().unwrap();
    let resolver = resolver_for(&server, &cache_dir);

    let err = resolver.resolve(&item_url("nofield"), false).await.unwrap_err();
    assert!(
        matches!(
            err,
            ResolveError::MissingField {
                field: "form field name",
                ..
            }
        ),
        "{err}"
    );
}

#[tokio::test]
async fn test_cached_markup_without_thumbnail_marker_is_missing_field() {
    let cache_dir = TempDir::new().unwrap();
    let client = PageClient::new(&HttpSettings::default()).unwrap();
    let cache = Arc::new(ContentCache::new(cache_dir.path(), true));
    cache.put("imgrock", "bare1", b"<html></html>").await.unwrap();
    let resolver = PageResolver::new(client, cache).with_origin("http://127.0.0.1:1");

    let err = resolver.resolve(&item_url("bare1"), false).await.unwrap_err();
    assert!(
        matches!(
            err,
            ResolveError::MissingField {
                field: "thumbnail marker",
                ..
            }
        ),
        "{err}"
    );
}

#[tokio::test]
async fn test_unsupported_host_is_no_provider() {
    let cache_dir = TempDir::new().unwrap();
    let client = PageClient::new(&HttpSettings::default()).unwrap();
    let resolver = PageResolver::new(client, Arc::new(ContentCache::new(cache_dir.path(), true)));

    let err = resolver
        .resolve("https://example.com/abc123", false)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::NoProvider { .. }));
}

#[tokio::test]
async fn test_undecodable_thumbnail_is_not_cached() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/th/flaky_t.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/th/flaky_t.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(fixtures::png_bytes(240, 180)))
        .mount(&server)
        .await;
    let cache_dir = TempDir::new().unwrap();
    let resolver = resolver_for(&server, &cache_dir);
    let provider = imgview_core::provider::provider_by_key("imgrock").unwrap();
    let thumb_url = format!("{}/th/flaky_t.jpg", server.uri());

    let first = resolver
        .thumbnail(provider, "https://imgrock.pw/flaky", &thumb_url, 120)
        .await
        .unwrap_err();
    assert!(matches!(first, ResolveError::Transient { .. }), "{first}");
    assert!(resolver.cache().get("imgrock", "flaky_t").await.unwrap().is_none());

    let second = resolver
        .thumbnail(provider, "https://imgrock.pw/flaky", &thumb_url, 120)
        .await
        .unwrap();
    assert_eq!((second.image.width, second.image.height), (120, 90));
    assert!(resolver.cache().get("imgrock", "flaky_t").await.unwrap().is_some());
}

#[tokio::test]
async fn test_cached_undecodable_image_is_transient() {
    let cache_dir = TempDir::new().unwrap();
    let client = PageClient::new(&HttpSettings::default()).unwrap();
    let cache = Arc::new(ContentCache::new(cache_dir.path(), true));
    let origin = "http://127.0.0.1:1";
    cache
        .put("imgrock", "bad1", fixtures::final_page(origin, "bad1").as_bytes())
        .await
        .unwrap();
    cache.put("imgrock", "pic_bad1", b"not an image").await.unwrap();
    let resolver = PageResolver::new(client, cache).with_origin(origin);

    let err = resolver.resolve(&item_url("bad1"), false).await.unwrap_err();
    assert!(matches!(err, ResolveError::Transient { .. }), "{err}");
}

#[tokio::test]
async fn test_long_field_and_picview_layout_resolves() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let origin = server.uri();
    let pages = HandshakePages {
        initial: fixtures::initial_page_for("imgview", &format!("{origin}/redirect/view9")),
        landing: fixtures::long_landing_page(),
        final_page: fixtures::picview_final_page(&origin, "view9"),
    };
    fixtures::mount_handshake_pages(&server, "view9", pages, 1).await;
    Mock::given(method("GET"))
        .and(path("/img/pic.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(fixtures::png_bytes(640, 480)))
        .expect(1)
        .mount(&server)
        .await;
    let cache_dir = TempDir::new().unwrap();
    let resolver = resolver_for(&server, &cache_dir);

    let page = resolver
        .resolve("https://imgview.pw/view9/pic.jpg.html", false)
        .await
        .unwrap();

    assert_eq!(page.provider.cache_key(), "imgview");
    assert_eq!(page.image_url, format!("{origin}/img/pic.jpg"));
    assert_eq!(page.image_name, "pic_view9");
    assert_eq!((page.width, page.height), (640, 480));
    assert_eq!(page.thumb_prefix, format!("{origin}/th/02/"));
    assert_eq!(
        page.next_url.as_deref(),
        Some("https://imgview.pw/next222/n.jpg.html")
    );
    assert_eq!(page.canonical_url(), "https://imgview.pw/view9");
    assert!(resolver.cache().get("imgview", "view9").await.unwrap().is_some());
}
