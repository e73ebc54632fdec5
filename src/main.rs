mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use mangadex_client::prelude::*;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => ClientConfig::default(),
    }
    .with_env_overrides();
    if cli.locale.is_some() {
        config.locale = cli.locale.clone();
    }
    let client = MangaDex::builder().config(config).build().context("building client")?;

    match cli.command {
        Commands::Search { query, limit } => {
            for manga in Manga::search(&client, &query, Some(limit)).await.context("searching manga")? {
                let year = manga.attributes.year.map(|y| y.to_string()).unwrap_or_else(|| "?".into());
                println!("{}  {} ({})", manga.id(), manga.title(), year);
            }
        }
        Commands::Manga { id } => {
            let manga = Manga::get(&client, &id).await.with_context(|| format!("fetching manga {id}"))?;
            println!("{}", manga.title());
            if let Some(status) = manga.attributes.status {
                println!("status: {status:?}");
            }
            let authors: Vec<&str> = manga.authors.iter().filter_map(|a| a.peek()).map(Author::name).collect();
            println!("authors: {}", authors.join(", "));
            let tags: Vec<&str> = manga.tags.iter().map(Tag::name).collect();
            println!("tags: {}", tags.join(", "));
            if let Some(cover) = manga.main_cover.as_ref().and_then(|c| c.peek()) {
                println!("cover: {}", cover.url(&client, CoverSize::Medium)?);
            }
            let description = manga.attributes.description.local_string();
            if !description.is_empty() {
                println!("\n{description}");
            }
        }
        Commands::Feed { manga_id, lang, limit } => {
            let manga = Manga::get(&client, &manga_id).await.with_context(|| format!("fetching manga {manga_id}"))?;
            let query = Query::new().array("translatedLanguage", [lang]).order("chapter", Order::Asc);
            for chapter in manga.feed(&client, query, Some(limit)).await.context("fetching feed")? {
                let a = &chapter.attributes;
                println!(
                    "{}  vol {} ch {}  {}",
                    chapter.id(),
                    a.volume.as_deref().unwrap_or("-"),
                    a.chapter.as_deref().unwrap_or("-"),
                    a.title.as_deref().unwrap_or("")
                );
            }
        }
        Commands::Pages { chapter_id, data_saver } => {
            let chapter = Chapter::get(&client, &chapter_id).await.with_context(|| format!("fetching chapter {chapter_id}"))?;
            for url in chapter.pages(&client, data_saver).await.context("fetching page list")? {
                println!("{url}");
            }
        }
        Commands::Tags { group } => {
            let wanted = match group.as_deref() {
                Some(g) => Some(serde_json::from_value::<TagGroup>(serde_json::Value::String(g.to_lowercase())).with_context(|| format!("unknown tag group '{g}'"))?),
                None => None,
            };
            for tag in Tag::all(&client).await.context("fetching tags")?.iter() {
                if wanted.map_or(true, |g| g == tag.group()) {
                    println!("{}  {:?}  {}", tag.id(), tag.group(), tag.name());
                }
            }
        }
    }
    Ok(())
}
