//! # adlog
//!
//! Ingests classified-ad pages into a deduplicated listing store.
//!
//! ## Architecture
//!
//! ```text
//! URL → Fetcher → Extractor → Image acquirer → Store
//! ```
//!
//! - [`fetcher`]: single-shot page download with a fixed identity
//! - [`extractor`]: title/image recovery through ordered fallback rules
//! - [`media`]: validated, streamed image downloads under a media root
//! - [`store`]: SQLite persistence with race-safe create-or-get
//! - [`ingest`]: the pipeline tying them together
//!
//! ## Quick Start
//!
//! ```bash
//! # Ingest a listing page
//! adlog ingest https://www.avito.ru/moskva/velosipedy/bike_123
//!
//! # Count a view
//! adlog view 1
//!
//! # Most viewed listings
//! adlog top --limit 10
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components
/// from a [`Config`](config::Config).
pub mod app;

/// Command-line interface using clap.
///
/// - `ingest <url>...` - Ingest listing pages
/// - `view <id>` - Count a view and print the listing
/// - `show <id>` - Print a listing
/// - `top [--limit N]` - Most viewed listings
pub mod cli;

/// Configuration loaded from `~/.config/adlog/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Listing`](domain::Listing): a stored, deduplicated page
/// - [`ParsedMetadata`](domain::ParsedMetadata): what extraction recovered
/// - [`StoredImage`](domain::StoredImage): an image under the media root
pub mod domain;

/// HTML metadata extraction.
pub mod extractor;

/// Page fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for page fetching
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// The ingestion pipeline.
pub mod ingest;

/// Image acquisition and content-type handling.
pub mod media;

/// SQLite persistence layer.
///
/// - [`ListingStore`](store::ListingStore): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
