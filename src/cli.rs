use clap::{Args, Parser, Subcommand};
use seekfile_index::query::{DEFAULT_PAGE_SIZE, resolve_categories};
use seekfile_index::{Query, SortField};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "seekfile", version, about = "Index file metadata and search it", long_about = None)]
pub struct Cli {
    /// Configuration file (JSON, YAML or TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan the configured roots and print the final status
    Scan {
        /// Rewrite every record instead of skipping unchanged files
        #[arg(long)]
        full: bool,
    },
    /// Search the indexed files
    Search(SearchArgs),
    /// Print the current index status
    Status,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Name pattern: substring, or wildcard with `*` and `?`
    pub pattern: Option<String>,
    /// Minimum size in bytes
    #[arg(long, default_value_t = 0)]
    pub min_size: u64,
    /// Maximum size in bytes
    #[arg(long, default_value_t = 0)]
    pub max_size: u64,
    /// Allowed extension (repeatable)
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,
    /// documents, images, audio, video or all (repeatable)
    #[arg(long = "category", value_name = "CATEGORY")]
    pub categories: Vec<String>,
    /// name, size, modified or path
    #[arg(long, default_value = "name")]
    pub sort: String,
    /// Sort descending
    #[arg(long)]
    pub desc: bool,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

impl SearchArgs {
    pub fn into_query(self) -> Query {
        let categories = resolve_categories(self.categories.iter().map(String::as_str));
        Query::new()
            .pattern(self.pattern.unwrap_or_default())
            .min_size(self.min_size)
            .max_size(self.max_size)
            .extensions(self.extensions)
            .extensions(categories)
            .sort(SortField::parse(&self.sort))
            .descending(self.desc)
            .page(self.page, self.page_size)
    }
}
