//! # album-thumbs CLI
//!
//! Command-line access to the thumbnail cache.
//!
//! ## Usage
//! ```bash
//! album-thumbs get ~/Photos/beach.jpg
//! album-thumbs lookup album-3-first --out cover.jpg
//! album-thumbs stats --output json
//! ```

mod cli;

use album_thumbnail_cache::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    album_thumbnail_cache::init_tracing();
    cli::run().await
}
