//! Host page fixtures and mock mounting for the imgrock layout.
//!
//! imgrock uses two-fragment form fields and composes the image URL from two
//! tokens; imgview spreads the field over eleven fragments and marks the
//! image with `class="picview"`. One mock server plays every role: item
//! page, redirect target, image server and thumbnail server.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imgview_core::provider::token::REASSEMBLY_ORDER;
use imgview_core::provider::{PostFieldMode, provider_by_key};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Form field name the landing page spells out.
pub const FIELD_NAME: &str = "f00dcafe";

/// Encodes a solid-color PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([30, 120, 210]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

/// Item URL as a user would paste it.
pub fn item_url(identifier: &str) -> String {
    format!("https://imgrock.pw/{identifier}/pic.jpg.html")
}

/// Canonical item URL, as history records it.
pub fn canonical_url(identifier: &str) -> String {
    format!("https://imgrock.pw/{identifier}")
}

/// Initial page hiding `redirect_url` in imgrock's ten tokens.
pub fn initial_page(redirect_url: &str) -> String {
    initial_page_for("imgrock", redirect_url)
}

/// Initial page hiding `redirect_url` in the ten tokens of provider `key`.
pub fn initial_page_for(key: &str, redirect_url: &str) -> String {
    let provider = provider_by_key(key).expect("provider registered");
    let names = provider.redirect_plan().names();
    let encoded = STANDARD.encode(redirect_url);

    let mut slots = vec![String::new(); names.len()];
    let chunk = encoded.len().div_ceil(REASSEMBLY_ORDER.len()).max(1);
    for (piece, slot) in encoded
        .as_bytes()
        .chunks(chunk)
        .zip(REASSEMBLY_ORDER.iter())
    {
        slots[*slot] = String::from_utf8(piece.to_vec()).expect("ascii");
    }
    slots[1] = "ZGVjb3k=".to_string();

    let vars: String = names
        .iter()
        .zip(&slots)
        .map(|(name, value)| format!("var {name}=\"{value}\";\n"))
        .collect();
    format!("<html><script>\n{vars}</script><p>Continue</p></html>")
}

/// Landing page carrying the two form-field fragments.
pub fn landing_page() -> String {
    let names = PostFieldMode::Short.token_names();
    format!(
        "<html><script>var {}='f00d'; var {}='cafe';</script></html>",
        names[0], names[1]
    )
}

/// Landing page spelling the field name across the eleven long-mode fragments.
pub fn long_landing_page() -> String {
    let names = PostFieldMode::Long.token_names();
    let fragments = ["f0", "0d", "", "c", "a", "f", "e", "", "", "", ""];
    let vars: String = names
        .iter()
        .zip(fragments)
        .map(|(name, value)| format!("var {name}='{value}';\n"))
        .collect();
    format!("<html><script>{vars}</script></html>")
}

/// Final imgview page whose image sits after the "Next" link.
pub fn picview_final_page(origin: &str, identifier: &str) -> String {
    format!(
        r#"<html>
<div class="nav">
<a style="float:left" href="https://imgview.pw/prev111/p.jpg.html"><span class="x">< Previous</span></a>
<a style="float:right" href="https://imgview.pw/next222/n.jpg.html"><span class="x">Next ></span></a>
</div>
<img src="{origin}/img/pic.jpg" class="picview" alt="pic.jpg">
<textarea>[URL=https://imgview.pw/{identifier}][IMG]{origin}/th/02/{identifier}_t.jpg[/IMG][/URL]</textarea>
</html>
"#
    )
}

/// Final viewer page for `identifier` with assets served by `origin`.
pub fn final_page(origin: &str, identifier: &str) -> String {
    format!(
        r#"<html><script>var _0xDB36="{origin}"; var _0xDB54="pic.jpg";</script>
<div class="nav">
<a style="float:left" href="https://imgrock.pw/prev111/p.jpg.html"><span class="x">< Previous</span></a>
<a style="float:right" href="https://imgrock.pw/next222/n.jpg.html"><span class="x">Next ></span></a>
</div>
<textarea>[URL=https://imgrock.pw/{identifier}][IMG]{origin}/th/01/{identifier}_t.jpg[/IMG][/URL]</textarea>
<a href="https://imgrock.pw/g/gal777">More from gallery</a>
<table><tr>
<td align="left"><b>Author</b><table>
<tr><td><a href="https://imgrock.pw/a1"><img src="{origin}/th/a1_t.jpg"></a></td>
<td><a href="https://imgrock.pw/a2"><img src="{origin}/th/a2_t.jpg"></a></td></tr>
</table></td>
<td align="right"><b>Gallery</b><table>
<tr><td><a href="https://imgrock.pw/g1"><img src="{origin}/th/g1_t.jpg"></a></td></tr>
</table></td>
</tr></table></html>
"#
    )
}

/// Mounts the three handshake steps for `identifier`, each expected `times`.
pub async fn mount_handshake(server: &MockServer, identifier: &str, times: u64) {
    let origin = server.uri();
    let redirect_url = format!("{origin}/redirect/{identifier}");
    let pages = HandshakePages {
        initial: initial_page(&redirect_url),
        landing: landing_page(),
        final_page: final_page(&origin, identifier),
    };
    mount_handshake_pages(server, identifier, pages, times).await;
}

/// Markup served at each handshake step.
pub struct HandshakePages {
    /// Item page with the hidden redirect.
    pub initial: String,
    /// Redirect target carrying the form-field fragments.
    pub landing: String,
    /// Response to the view POST.
    pub final_page: String,
}

/// Mounts `pages` behind `/{identifier}` and `/redirect/{identifier}`.
pub async fn mount_handshake_pages(
    server: &MockServer,
    identifier: &str,
    pages: HandshakePages,
    times: u64,
) {
    let page_url = format!("{}/{identifier}", server.uri());
    let redirect_path = format!("/redirect/{identifier}");

    Mock::given(method("GET"))
        .and(path(format!("/{identifier}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(pages.initial))
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(redirect_path.clone()))
        .and(header("referer", page_url.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(pages.landing))
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(redirect_path))
        .and(header("referer", page_url.as_str()))
        .and(body_string_contains(format!(
            "op=view&id={identifier}&pre=1&{FIELD_NAME}=1"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_string(pages.final_page))
        .expect(times)
        .mount(server)
        .await;
}

/// Mounts the main image and every thumbnail the final page references.
pub async fn mount_assets(server: &MockServer, identifier: &str, image_fetches: u64) {
    Mock::given(method("GET"))
        .and(path("/img/pic.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(900, 600)))
        .expect(image_fetches)
        .mount(server)
        .await;

    for thumb in [
        format!("/th/01/{identifier}_t.jpg"),
        "/th/01/prev111_t.jpg".to_string(),
        "/th/01/next222_t.jpg".to_string(),
        "/th/a1_t.jpg".to_string(),
        "/th/a2_t.jpg".to_string(),
        "/th/g1_t.jpg".to_string(),
    ] {
        Mock::given(method("GET"))
            .and(path(thumb))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(240, 180)))
            .mount(server)
            .await;
    }
}
