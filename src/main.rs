use clap::{Parser, Subcommand};
use icon_studio::{
    builtin_presets, download, find_preset,
    logger::{self, LogLevel, LoggerConfig},
    AspectRatio, BatchEvent, GeneratedImage, HistoryStore, IconError, IconRequest, IconStudio,
    StudioConfig,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "icon-studio", version, about = "Generate text icons and manage their history")]
struct Cli {
    /// Debug-level logging with source locations
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one icon, or a sequential batch with --count
    Generate {
        text: String,
        #[arg(short, long, default_value = "minimalist")]
        style: String,
        #[arg(short, long, default_value = "16:9")]
        ratio: String,
        #[arg(short, long)]
        count: Option<usize>,
        /// Also write each image into this directory
        #[arg(long)]
        save_dir: Option<PathBuf>,
    },
    /// List the built-in style presets
    Styles,
    #[command(subcommand)]
    History(HistoryCommand),
    /// Save a history record's image as a PNG file
    Download {
        id: String,
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// Show saved generations, newest first
    List,
    Delete { id: String },
    /// Remove every saved generation
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let cli = Cli::parse();

    let level = std::env::var("ICON_LOG_LEVEL")
        .ok()
        .and_then(|value| LogLevel::parse(&value));
    let logger_config = match (cli.verbose, level) {
        (true, _) => LoggerConfig::development(),
        (false, Some(level)) => LoggerConfig::new().with_level(level),
        (false, None) => LoggerConfig::new().with_level(LogLevel::Warn),
    };
    logger::init_with_config(logger_config)?;

    if dotenv_loaded {
        log::debug!("✅ .env file loaded");
    } else {
        log::debug!("No .env file found, using system environment variables");
    }

    let config = StudioConfig::from_env();
    config.validate()?;
    logger::log_config_info(&config);

    match cli.command {
        Command::Generate {
            text,
            style,
            ratio,
            count,
            save_dir,
        } => {
            let style = find_preset(&style).ok_or_else(|| {
                IconError::InvalidInput(format!("unknown style '{}', see `icon-studio styles`", style))
            })?;
            let aspect_ratio: AspectRatio = ratio.parse()?;
            let request = IconRequest::new(text, style.clone(), aspect_ratio);
            let studio = IconStudio::from_config(config)?;

            let outcome = match count {
                None => studio.generate_one(&request).await.map(|record| vec![record]),
                Some(count) => {
                    studio
                        .generate_batch(&request, count, |event| match event {
                            BatchEvent::Started { current, total } => {
                                eprintln!("Generating {}/{}...", current, total)
                            }
                            BatchEvent::Completed { record, .. } => print_record(record),
                        })
                        .await
                }
            };
            let records = match outcome {
                Ok(records) => records,
                Err(IconError::PersistenceFailed { record, source }) => {
                    eprintln!("warning: {}", source);
                    print_record(&record);
                    return Err(source.into());
                }
                Err(err) => return Err(err.into()),
            };

            if count.is_none() {
                records.iter().for_each(print_record);
            }
            if let Some(dir) = save_dir {
                for record in &records {
                    let path = studio.download(record, &dir).await?;
                    println!("saved {}", path.display());
                }
            }
        }
        Command::Styles => {
            for preset in builtin_presets() {
                println!(
                    "{:<14} {} {} - {}",
                    preset.id,
                    preset.icon.as_deref().unwrap_or(" "),
                    preset.name,
                    preset.description
                );
            }
        }
        Command::History(command) => {
            let store = HistoryStore::from_config(&config.history);
            match command {
                HistoryCommand::List => {
                    let records = store.list_all().await?;
                    if records.is_empty() {
                        println!("No history yet.");
                    }
                    records.iter().for_each(print_record);
                }
                HistoryCommand::Delete { id } => {
                    store.delete_one(&id).await?;
                    println!("deleted {}", id);
                }
                HistoryCommand::Clear { yes } => {
                    if !yes {
                        return Err(IconError::InvalidInput(
                            "refusing to clear history without --yes".into(),
                        )
                        .into());
                    }
                    store.clear_all().await?;
                    println!("history cleared");
                }
            }
        }
        Command::Download { id, dir } => {
            let store = HistoryStore::from_config(&config.history);
            let record = store
                .list_all()
                .await?
                .into_iter()
                .find(|record| record.id == id)
                .ok_or_else(|| IconError::InvalidInput(format!("no history record '{}'", id)))?;
            let path = download::save_image(&record.url, &dir, &config.product_name).await?;
            println!("saved {}", path.display());
        }
    }

    Ok(())
}

fn print_record(record: &GeneratedImage) {
    let when = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(record.timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| record.timestamp.to_string());
    let preview: String = record.url.chars().take(48).collect();
    println!(
        "{}  {}  {:<20} {:<6} {:<16} {}…",
        record.id, when, record.text, record.aspect_ratio, record.style_name, preview
    );
}
