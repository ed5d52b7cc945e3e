use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use memento_prefetch::application::{BrowseScrapbookUseCase, Navigation, WindowedPrefetchCache};
use memento_prefetch::domain::entities::ScrapbookId;
use memento_prefetch::infrastructure::{
    AppConfig, CliArgs, HttpImagePrefetcher, HttpPrefetcherConfig, JsonContentStore, StateConfig,
    StorageManager,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn pick_scrapbook(
    args: &CliArgs,
    state: &StateConfig,
    store: &JsonContentStore,
) -> Result<ScrapbookId> {
    if let Some(id) = &args.scrapbook {
        return Ok(ScrapbookId::new(id.as_str()));
    }

    if let Some(last) = &state.last_scrapbook_id {
        let last = ScrapbookId::new(last.as_str());
        if store.has_scrapbook(&last) {
            return Ok(last);
        }
        warn!(scrapbook = %last, "Last scrapbook no longer in library");
    }

    store
        .scrapbooks()
        .first()
        .map(|summary| summary.id.clone())
        .ok_or_else(|| eyre!("library {} contains no scrapbooks", args.library.display()))
}

fn log_navigation(navigation: Navigation) {
    match navigation {
        Navigation::Moved { from, to, refocus } => {
            info!(from, to, ?refocus, "Focus moved");
        }
        Navigation::AtBoundary { index } => {
            info!(index, "Focus unchanged");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(&args);
    config.validate()?;

    init_logging(&config)?;

    info!(version = memento_prefetch::VERSION, "Starting {}", memento_prefetch::NAME);

    let state = storage.load_state()?;
    let store = Arc::new(
        JsonContentStore::open(&args.library)
            .await
            .wrap_err_with(|| format!("Failed to load library {}", args.library.display()))?,
    );
    let scrapbook_id = pick_scrapbook(&args, &state, &store)?;

    let settings = config.prefetch_settings();
    let prefetcher = Arc::new(HttpImagePrefetcher::new(&HttpPrefetcherConfig {
        cache_size: config.http.image_cache_size,
        timeout: settings.timeout,
        user_agent: config.http.user_agent.clone(),
        system_proxy: true,
    })?);
    let cache = Arc::new(WindowedPrefetchCache::new(prefetcher.clone(), settings));

    let mut session = BrowseScrapbookUseCase::new(store, Arc::clone(&cache));
    let count = session
        .open(&scrapbook_id, state.resume_index(scrapbook_id.as_str()))
        .await?;
    println!("Opened {scrapbook_id}: {count} memories");

    if let Some(text) = &args.search {
        match session.find(text).await? {
            Some(navigation) => log_navigation(navigation),
            None => warn!(text = %text, "No memory matches search"),
        }
    }

    for index in &args.focus {
        log_navigation(session.jump_to(*index));
    }

    cache.wait_idle().await;
    let evicted = session.trim_cache();

    if let Some(memory) = session.current() {
        println!("Focused #{}: {}", session.current_index(), memory.title);
    }
    println!("{}", cache.status());
    println!("{}", prefetcher.cache().stats().await);
    info!(evicted, "Prefetch settled");

    storage.save_state(&StateConfig {
        last_scrapbook_id: Some(scrapbook_id.to_string()),
        last_memory_index: Some(session.current_index()),
    })?;

    Ok(())
}
