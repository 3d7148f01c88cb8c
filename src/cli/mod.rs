//! # CLI Module
//!
//! Command-line interface for the thumbnail cache.
//!
//! ## Usage
//! ```bash
//! # Get (or generate) a thumbnail for a photo
//! album-thumbs get ~/Photos/beach.jpg --out beach-thumb.jpg
//!
//! # Store an album cover under its synthetic key
//! album-thumbs get ~/Photos/beach.jpg --album-cover 3
//!
//! # Read-only lookup
//! album-thumbs lookup album-3-first
//!
//! # Cache housekeeping
//! album-thumbs stats --output json
//! album-thumbs list
//! album-thumbs clear
//! ```

use album_thumbnail_cache::core::{CacheConfig, CacheKey, ImageSource, ThumbnailCache};
use album_thumbnail_cache::error::{Result, ThumbnailCacheError};
use album_thumbnail_cache::events::{CacheEvent, Event, EventChannel, EventReceiver};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use std::path::{Path, PathBuf};

/// Album Thumbnail Cache - fast previews for your photo albums
#[derive(Parser, Debug)]
#[command(name = "album-thumbs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Settings {
    /// Thumbnail database path
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// JSON file with cache settings (flags override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache capacity in bytes
    #[arg(long, global = true)]
    max_cache_size: Option<u64>,

    /// Longest thumbnail side in pixels
    #[arg(long, global = true)]
    thumbnail_size: Option<u32>,

    /// JPEG quality between 0 and 1
    #[arg(long, global = true)]
    quality: Option<f32>,

    /// Refuse thumbnails that eviction cannot make room for
    #[arg(long, global = true)]
    strict_capacity: bool,

    /// Print cache events (hits, misses, evictions)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Return the cached thumbnail for an image, generating it on a miss
    Get {
        /// Source image
        image: PathBuf,

        /// Cache key (defaults to the image path)
        #[arg(long, conflicts_with = "album_cover")]
        key: Option<String>,

        /// Store under the cover key of this album
        #[arg(long)]
        album_cover: Option<i64>,

        /// Write the thumbnail to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Look up a cached thumbnail without generating one
    Lookup {
        /// Cache key
        key: String,

        /// Write the thumbnail to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Remove one cached thumbnail
    Delete {
        /// Cache key
        key: String,
    },
    /// List cached thumbnails, least evictable last
    List {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
    /// Print the total cached bytes
    Size,
    /// Show cache statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
    /// Remove every cached thumbnail
    Clear,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let term = Term::stderr();

    let config = load_config(&cli.settings)?;
    let db_path = cli.settings.cache.clone().unwrap_or_else(default_db_path);
    let (sender, receiver) = EventChannel::new();

    let cache = ThumbnailCache::builder()
        .config(config)
        .sqlite(db_path.clone())
        .events(sender)
        .build()?;

    if !cache.is_persistent() {
        term.write_line(&format!(
            "{} could not open {}, running without a cache",
            style("warning:").yellow().bold(),
            db_path.display()
        ))
        .ok();
    }

    let outcome = match cli.command {
        Commands::Get {
            image,
            key,
            album_cover,
            out,
        } => {
            let key = match (key, album_cover) {
                (Some(key), _) => key,
                (None, Some(album_id)) => CacheKey::album_cover(album_id),
                (None, None) => CacheKey::photo(&image),
            };
            run_get(&cache, &term, image, &key, out.as_deref()).await
        }
        Commands::Lookup { key, out } => run_lookup(&cache, &term, &key, out.as_deref()).await,
        Commands::Delete { key } => {
            let removed = cache.delete_cached_thumbnail(&key).await;
            if removed {
                println!("deleted {}", key);
            } else {
                println!("{} was not cached", key);
            }
            Ok(())
        }
        Commands::List { output } => {
            run_list(&cache, &term, output).await;
            Ok(())
        }
        Commands::Size => {
            println!("{}", cache.get_cache_size().await);
            Ok(())
        }
        Commands::Stats { output } => {
            run_stats(&cache, &term, output).await;
            Ok(())
        }
        Commands::Clear => {
            cache.clear_cache().await;
            println!("cache cleared");
            Ok(())
        }
    };

    if cli.settings.verbose {
        print_events(&term, &receiver);
    }

    outcome
}

fn load_config(settings: &Settings) -> Result<CacheConfig> {
    let mut config = match &settings.config {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| ThumbnailCacheError::Io {
                path: path.clone(),
                source: e,
            })?;
            CacheConfig::from_json_str(&json)?
        }
        None => CacheConfig::default(),
    };

    if let Some(bytes) = settings.max_cache_size {
        config = config.max_cache_size(bytes);
    }
    if let Some(pixels) = settings.thumbnail_size {
        config = config.thumbnail_size(pixels);
    }
    if let Some(quality) = settings.quality {
        config = config.quality(quality);
    }
    if settings.strict_capacity {
        config = config.strict_capacity(true);
    }

    config.validate()?;
    Ok(config)
}

fn default_db_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("album-thumbnail-cache")
        .join("thumbnails.db")
}

async fn run_get(
    cache: &ThumbnailCache,
    term: &Term,
    image: PathBuf,
    key: &str,
    out: Option<&Path>,
) -> Result<()> {
    let handle = cache.get_thumbnail(ImageSource::File(image), key).await?;

    term.write_line(&format!(
        "{} {} ({})",
        style("✓").green().bold(),
        style(key).cyan(),
        format_bytes(handle.len() as u64)
    ))
    .ok();

    if let Some(out) = out {
        write_thumbnail(out, handle.bytes())?;
    }
    cache.release(&handle);
    Ok(())
}

async fn run_lookup(
    cache: &ThumbnailCache,
    term: &Term,
    key: &str,
    out: Option<&Path>,
) -> Result<()> {
    match cache.get_cached_thumbnail(key).await {
        Some(handle) => {
            term.write_line(&format!(
                "{} {} ({})",
                style("hit").green().bold(),
                style(key).cyan(),
                format_bytes(handle.len() as u64)
            ))
            .ok();
            if let Some(out) = out {
                write_thumbnail(out, handle.bytes())?;
            }
            cache.release(&handle);
        }
        None => {
            term.write_line(&format!("{} {}", style("miss").yellow().bold(), key))
                .ok();
        }
    }
    Ok(())
}

async fn run_stats(cache: &ThumbnailCache, term: &Term, output: OutputFormat) {
    let stats = cache.stats().await;
    let config = cache.config();

    match output {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "persistent": cache.is_persistent(),
                "total_entries": stats.total_entries,
                "total_size_bytes": stats.total_size_bytes,
                "max_cache_size": config.max_cache_size,
                "oldest_entry": stats.oldest_entry.and_then(format_timestamp),
                "newest_entry": stats.newest_entry.and_then(format_timestamp),
            });
            match serde_json::to_string_pretty(&output) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::warn!("Failed to render stats: {}", e),
            }
        }
        OutputFormat::Pretty => {
            term.write_line(&format!("{}", style("Thumbnail Cache").bold().cyan()))
                .ok();
            term.write_line(&format!(
                "  {} thumbnails, {} of {}",
                style(stats.total_entries).cyan(),
                style(format_bytes(stats.total_size_bytes)).yellow(),
                format_bytes(config.max_cache_size)
            ))
            .ok();
            if let Some(oldest) = stats.oldest_entry.and_then(format_timestamp) {
                term.write_line(&format!("  oldest: {}", style(oldest).dim())).ok();
            }
            if let Some(newest) = stats.newest_entry.and_then(format_timestamp) {
                term.write_line(&format!("  newest: {}", style(newest).dim())).ok();
            }
        }
    }
}

async fn run_list(cache: &ThumbnailCache, term: &Term, output: OutputFormat) {
    let entries = cache.entries().await;

    match output {
        OutputFormat::Json => match serde_json::to_string_pretty(&entries) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::warn!("Failed to render entries: {}", e),
        },
        OutputFormat::Pretty => {
            if entries.is_empty() {
                term.write_line(&format!("{}", style("cache is empty").dim())).ok();
            }
            for entry in &entries {
                term.write_line(&format!(
                    "  {} {} ({} hits, last used {})",
                    style(&entry.key).cyan(),
                    style(format_bytes(entry.size_bytes)).yellow(),
                    entry.access_count,
                    format_timestamp(entry.timestamp).unwrap_or_else(|| "-".to_string())
                ))
                .ok();
            }
        }
    }
}

fn print_events(term: &Term, receiver: &EventReceiver) {
    for event in receiver.drain() {
        let Event::Cache(event) = event;
        let line = match &event {
            CacheEvent::Hit { key, access_count } => {
                format!("hit {} (access #{})", key, access_count)
            }
            CacheEvent::Miss { key } => format!("miss {}", key),
            CacheEvent::Generated { key, size_bytes } => {
                format!("generated {} ({})", key, format_bytes(*size_bytes))
            }
            CacheEvent::Stored { key, size_bytes } => {
                format!("stored {} ({})", key, format_bytes(*size_bytes))
            }
            CacheEvent::Evicted { key, size_bytes } => {
                format!("evicted {} ({})", key, format_bytes(*size_bytes))
            }
            CacheEvent::EvictionShortfall {
                required_bytes,
                freed_bytes,
            } => format!(
                "eviction freed {} of {}",
                format_bytes(*freed_bytes),
                format_bytes(*required_bytes)
            ),
            CacheEvent::Deleted { key } => format!("deleted {}", key),
            CacheEvent::Cleared => "cleared".to_string(),
            CacheEvent::Degraded { operation, message } => {
                format!("degraded during {}: {}", operation, message)
            }
        };
        term.write_line(&format!("  {} {}", style("·").dim(), line)).ok();
    }
}

fn write_thumbnail(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|e| ThumbnailCacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn format_timestamp(millis: u64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(millis as i64)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use album_thumbnail_cache::error::CacheError;

    fn settings() -> Settings {
        Settings {
            cache: None,
            config: None,
            max_cache_size: None,
            thumbnail_size: None,
            quality: None,
            strict_capacity: false,
            verbose: false,
        }
    }

    #[test]
    fn flags_override_defaults() {
        let config = load_config(&Settings {
            max_cache_size: Some(4096),
            strict_capacity: true,
            ..settings()
        })
        .unwrap();

        assert_eq!(config.max_cache_size, 4096);
        assert!(config.strict_capacity);
        assert_eq!(config.thumbnail_size, 200);
    }

    #[test]
    fn invalid_flag_is_a_cache_config_error() {
        let error = load_config(&Settings {
            quality: Some(2.0),
            ..settings()
        })
        .unwrap_err();

        assert!(matches!(
            error,
            ThumbnailCacheError::Cache(CacheError::InvalidConfig(_))
        ));
        assert_eq!(error.to_string().matches("configuration").count(), 1);
    }

    #[test]
    fn json_file_is_read_before_flags() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(&path, r#"{ "thumbnail_size": 96, "quality": 0.5 }"#).unwrap();

        let config = load_config(&Settings {
            config: Some(path),
            quality: Some(0.9),
            ..settings()
        })
        .unwrap();

        assert_eq!(config.thumbnail_size, 96);
        assert_eq!(config.quality, 0.9);
    }

    #[test]
    fn byte_sizes_are_human_readable() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(500 * 1024 * 1024), "500.0 MB");
    }
}
