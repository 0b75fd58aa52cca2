pub mod commands;

use clap::{Parser, Subcommand};

use crate::ingest::DEFAULT_POPULAR_LIMIT;

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Parser)]
#[command(name = "adlog")]
#[command(about = "Ingest classified-ad pages into a deduplicated listing store", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/adlog/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    /// Print listings as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest one or more listing pages
    Ingest {
        /// Page URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Number of pages ingested concurrently
        #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
    },
    /// Record a view of a listing and print it
    View {
        /// Listing id
        id: i64,
    },
    /// Print a listing without counting a view
    Show {
        /// Listing id
        id: i64,
    },
    /// List the most viewed listings
    Top {
        /// Number of listings to show (1-100)
        #[arg(short, long, default_value_t = DEFAULT_POPULAR_LIMIT)]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingest_many() {
        let cli = Cli::parse_from(["adlog", "ingest", "https://a.example/1", "https://a.example/2"]);
        match cli.command {
            Commands::Ingest { urls, workers } => {
                assert_eq!(urls.len(), 2);
                assert_eq!(workers, DEFAULT_WORKERS);
            }
            _ => panic!("expected ingest"),
        }
        assert!(!cli.json);
    }

    #[test]
    fn test_ingest_requires_url() {
        assert!(Cli::try_parse_from(["adlog", "ingest"]).is_err());
    }

    #[test]
    fn test_parse_top_with_global_flags() {
        let cli = Cli::parse_from(["adlog", "top", "--limit", "5", "--json", "-c", "/tmp/a.toml"]);
        assert!(cli.json);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/a.toml")));
        assert!(matches!(cli.command, Commands::Top { limit: 5 }));
    }
}
