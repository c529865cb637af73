//! CLI entry point for the image viewer.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use imgview_core::config::{self, SessionConfig};
use imgview_core::{GalleryPage, GalleryPager, PageView, PanelUpdate, Session};
use serde::Serialize;
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, Command, GalleryArgs, ViewArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = build_config(&args)?;
    let mut session = Session::new(&config).context("Failed to set up session")?;

    match &args.command {
        Command::View(view) => run_view(&mut session, view, config.preview_width).await,
        Command::Gallery(gallery) => run_gallery(&mut session, gallery, config.thumbnail_width).await,
    }
}

/// Layers defaults, the config file and command-line flags.
fn build_config(args: &Args) -> Result<SessionConfig> {
    let loaded = config::load_config(args.config.as_deref())?;
    let mut session = SessionConfig::default();
    if let Some(file) = &loaded.config {
        session.apply_file(file);
        debug!(path = ?loaded.path, "config file applied");
    }

    if let Some(dir) = &args.cache_dir {
        session.cache_dir.clone_from(dir);
    }
    if let Some(dir) = &args.output_dir {
        session.output_dir.clone_from(dir);
    }
    if args.plain_cache {
        session.reverse_cache_bytes = false;
    }
    if let Some(attempts) = args.max_attempts {
        session.max_attempts = attempts;
    }
    if let Some(origin) = &args.origin {
        session.origin_override = Some(origin.clone());
    }

    if let Some(proxy) = &args.proxy {
        config::write_proxy_file(&args.proxy_file, proxy).with_context(|| {
            format!("Failed to remember proxy in '{}'", args.proxy_file.display())
        })?;
        session.proxy = Some(proxy.clone());
    } else if args.saved_proxy {
        match config::read_proxy_file(&args.proxy_file)? {
            Some(proxy) => session.proxy = Some(proxy),
            None => bail!(
                "No saved proxy in '{}'\n  Suggestion: run once with --proxy host:port",
                args.proxy_file.display()
            ),
        }
    }

    Ok(session)
}

#[derive(Serialize)]
struct ViewSummary<'a> {
    provider: &'static str,
    identifier: &'a str,
    page_url: &'a str,
    image_url: &'a str,
    image_name: &'a str,
    width: u32,
    height: u32,
    preview: Option<[u32; 2]>,
    from_cache: bool,
    prev: Option<&'a str>,
    next: Option<&'a str>,
    gallery: Option<&'a str>,
    author_panel: usize,
    gallery_panel: usize,
    saved: Option<String>,
    panel_thumbnails: Option<usize>,
}

async fn run_view(session: &mut Session, args: &ViewArgs, preview_width: u32) -> Result<()> {
    session
        .resolve(&args.url, true, args.force)
        .await
        .with_context(|| format!("Could not open '{}'", args.url))?;

    let saved = if args.save {
        session
            .save_current_image()
            .context("Failed to save image")?
            .map(|path| path.display().to_string())
    } else {
        None
    };

    let panel_thumbnails = if args.panels {
        let updates = session.settle_panels().await;
        report_panel_updates(&updates);
        Some(updates.len())
    } else {
        None
    };

    let Some(view) = session.current() else {
        bail!("Page for '{}' is not available", args.url);
    };
    let preview = match view.page.preview(preview_width) {
        Ok(scaled) => Some([scaled.width, scaled.height]),
        Err(e) => {
            warn!(error = %e, "preview could not be rendered");
            None
        }
    };
    let summary = view_summary(view, preview, saved, panel_thumbnails);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_view(&summary);
    }
    Ok(())
}

fn view_summary(
    view: &PageView,
    preview: Option<[u32; 2]>,
    saved: Option<String>,
    panel_thumbnails: Option<usize>,
) -> ViewSummary<'_> {
    let page = &view.page;
    ViewSummary {
        provider: page.provider.cache_key(),
        identifier: &page.identifier,
        page_url: &page.page_url,
        image_url: &page.image_url,
        image_name: &page.image_name,
        width: page.width,
        height: page.height,
        preview,
        from_cache: page.from_cache,
        prev: view.prev.as_ref().map(|b| b.link.as_str()),
        next: view.next.as_ref().map(|b| b.link.as_str()),
        gallery: page.gallery_url.as_deref(),
        author_panel: page.author_links.len(),
        gallery_panel: page.gallery_links.len(),
        saved,
        panel_thumbnails,
    }
}

fn print_view(summary: &ViewSummary<'_>) {
    println!(
        "{} ({}x{}) [{}]",
        summary.image_name, summary.width, summary.height, summary.provider
    );
    println!("  image:   {}", summary.image_url);
    if let Some([w, h]) = summary.preview {
        println!("  preview: {w}x{h}");
    }
    if let Some(prev) = summary.prev {
        println!("  prev:    {prev}");
    }
    if let Some(next) = summary.next {
        println!("  next:    {next}");
    }
    if let Some(gallery) = summary.gallery {
        println!("  gallery: {gallery}");
    }
    println!(
        "  related: {} from author, {} from gallery",
        summary.author_panel, summary.gallery_panel
    );
    if let Some(path) = &summary.saved {
        println!("  saved:   {path}");
    }
}

fn report_panel_updates(updates: &[PanelUpdate]) {
    for update in updates {
        debug!(
            panel = ?update.panel,
            slot = update.slot,
            link = %update.thumbnail.link,
            "panel thumbnail ready"
        );
    }
    info!(count = updates.len(), "panel thumbnails loaded");
}

async fn run_gallery(session: &mut Session, args: &GalleryArgs, thumbnail_width: u32) -> Result<()> {
    let mut pager = if args.url.contains("/g/") {
        GalleryPager::from_url(Arc::clone(session.resolver()), &args.url)?
    } else {
        session
            .resolve(&args.url, true, false)
            .await
            .with_context(|| format!("Could not open '{}'", args.url))?;
        session
            .gallery_pager()
            .with_context(|| format!("'{}' does not link a gallery", args.url))?
    };

    let page = pager
        .turn_page(args.page)
        .await
        .with_context(|| format!("Could not load gallery page {}", args.page))?;

    if args.thumbnails {
        let (mut rx, handles) = pager.load_thumbnails(&page, session.pool(), thumbnail_width);
        imgview_core::navigation::join_all(handles).await;
        let mut loaded = 0usize;
        while let Ok(update) = rx.try_recv() {
            debug!(slot = update.slot, link = %update.thumbnail.link, "listing thumbnail ready");
            loaded += 1;
        }
        if loaded < page.entries.len() {
            warn!(loaded, expected = page.entries.len(), "some thumbnails failed");
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&gallery_json(&page))?);
    } else {
        println!(
            "gallery {} page {}/{}",
            page.gallery, page.page, page.page_count
        );
        for entry in &page.entries {
            println!("  {}", entry.link);
        }
    }
    Ok(())
}

fn gallery_json(page: &GalleryPage) -> serde_json::Value {
    serde_json::json!({
        "gallery": page.gallery,
        "page": page.page,
        "page_count": page.page_count,
        "from_cache": page.from_cache,
        "entries": page
            .entries
            .iter()
            .map(|e| serde_json::json!({ "link": e.link, "thumbnail": e.thumb_url }))
            .collect::<Vec<_>>(),
    })
}
