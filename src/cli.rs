use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Debug CLI for poking at the MangaDex API
#[derive(Parser)]
#[command(name = "mangadex")]
#[command(about = "Query the MangaDex catalog from the command line", long_about = None)]
pub struct Cli {
    /// TOML client configuration; `MANGADEX_*` variables override it
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Display locale for localized titles (e.g. `ja`, `pt-br`)
    #[arg(short, long, global = true)]
    pub locale: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search manga by title
    Search {
        /// Title to search for
        query: String,
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// Show one manga with its authors, cover and tags
    Manga {
        id: String,
    },
    /// List chapters of a manga
    Feed {
        manga_id: String,
        /// Translated language filter
        #[arg(long, default_value = "en")]
        lang: String,
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// Print page image URLs of a chapter
    Pages {
        chapter_id: String,
        /// Use the compressed data-saver images
        #[arg(long)]
        data_saver: bool,
    },
    /// List tags, optionally only one group (content, format, genre, theme)
    Tags {
        #[arg(short, long)]
        group: Option<String>,
    },
}
