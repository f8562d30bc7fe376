mod terminal;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use flashcards_core::EngineConfig;
use flashcards_core::config::DEFAULT_STORAGE_KEY;
use flashcards_core::model::Collection;
use services::interchange;
use services::{AppError, Clock, Orchestrator, PersistenceAdapter, StudyStore};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use storage::repository::Storage;

const DEFAULT_DB_URL: &str = "sqlite://flashcards.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingPath { command: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidLogLevel { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingPath { command } => write!(f, "{command} requires a file path"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLogLevel { raw } => write!(f, "invalid --log-level value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [study] [options]      # interactive study session");
    eprintln!("  cargo run -p app -- export <file> [options]");
    eprintln!("  cargo run -p app -- import <file> [options]");
    eprintln!("  cargo run -p app -- info   [options]");
    eprintln!("  cargo run -p app -- clear  [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>     default {DEFAULT_DB_URL}");
    eprintln!("  --key <storage_key>   default {DEFAULT_STORAGE_KEY}");
    eprintln!("  --log-level <level>   off|error|warn|info|debug|trace (default warn)");
    eprintln!("  --memory              keep everything in memory");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  FLASHCARDS_DB_URL, FLASHCARDS_STORAGE_KEY, FLASHCARDS_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Study,
    Export(PathBuf),
    Import(PathBuf),
    Info,
    Clear,
}

impl Command {
    fn parse(first: &str, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        match first {
            "study" => Ok(Self::Study),
            "export" => Self::path(args, "export").map(Self::Export),
            "import" => Self::path(args, "import").map(Self::Import),
            "info" => Ok(Self::Info),
            "clear" => Ok(Self::Clear),
            other => Err(ArgsError::UnknownCommand(other.to_owned())),
        }
    }

    fn path(
        args: &mut impl Iterator<Item = String>,
        command: &'static str,
    ) -> Result<PathBuf, ArgsError> {
        args.next()
            .filter(|p| !p.starts_with("--"))
            .map(PathBuf::from)
            .ok_or(ArgsError::MissingPath { command })
    }
}

#[derive(Debug)]
struct Args {
    command: Command,
    /// `None` selects the in-memory store.
    db_url: Option<String>,
    storage_key: String,
    log_level: LevelFilter,
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Option<Self>, ArgsError> {
        let mut args = argv.into_iter().peekable();

        let command = match args.peek().map(String::as_str) {
            None => Command::Study,
            Some("--help" | "-h") => return Ok(None),
            Some(first) if first.starts_with("--") => Command::Study,
            Some(_) => {
                let first = args.next().unwrap_or_default();
                Command::parse(&first, &mut args)?
            }
        };

        let mut db_url = Some(
            std::env::var("FLASHCARDS_DB_URL")
                .ok()
                .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url),
        );
        let mut storage_key = std::env::var("FLASHCARDS_STORAGE_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STORAGE_KEY.into());
        let mut log_level = match std::env::var("FLASHCARDS_LOG") {
            Ok(raw) => parse_level(raw)?,
            Err(_) => LevelFilter::Warn,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = Some(normalize_sqlite_url(value));
                }
                "--key" => {
                    storage_key = require_value(&mut args, "--key")?;
                }
                "--log-level" => {
                    log_level = parse_level(require_value(&mut args, "--log-level")?)?;
                }
                "--memory" => db_url = None,
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Some(Self {
            command,
            db_url,
            storage_key,
            log_level,
        }))
    }
}

fn parse_level(raw: String) -> Result<LevelFilter, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidLogLevel { raw })
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_logging(level: LevelFilter) {
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .build();
    if let Err(err) = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("logger already initialised: {err}");
    }
}

async fn open_storage(db_url: Option<&str>) -> Result<Storage, Box<dyn std::error::Error>> {
    match db_url {
        None => Ok(Storage::in_memory()),
        Some(url) => {
            // Keep file creation in the binary glue so storage stays pure.
            prepare_sqlite_file(url)?;
            Ok(Storage::sqlite(url).await?)
        }
    }
}

async fn run(args: Args, storage: Storage) -> Result<(), AppError> {
    let config = EngineConfig::default().with_storage_key(args.storage_key);
    let clock = Clock::default_clock();
    let persistence = PersistenceAdapter::new(
        Arc::clone(&storage.kv),
        config.storage_key.clone(),
        config.schema_version,
    );

    match args.command {
        Command::Study => {
            let dirty = Arc::new(AtomicBool::new(true));
            let flag = Arc::clone(&dirty);
            let store = StudyStore::load(persistence, Collection::sample(clock.stamp()), clock, config)
                .await
                .with_render_hook(move || flag.store(true, Ordering::Relaxed));
            terminal::run(Orchestrator::new(store), dirty).await
        }
        Command::Export(path) => {
            let store = StudyStore::load(persistence, Collection::empty(), clock, config).await;
            let contents = store.export()?;
            std::fs::write(&path, contents)?;
            println!(
                "Exported {} to {}",
                interchange::plural(store.decks().len(), "deck"),
                path.display()
            );
            Ok(())
        }
        Command::Import(path) => {
            let text = std::fs::read_to_string(&path)?;
            let payload = interchange::parse_import(&text)?;
            let mut store = StudyStore::load(persistence, Collection::empty(), clock, config).await;
            let report = store.import(payload);
            store.flush().await?;
            println!(
                "Imported {} with {}",
                interchange::plural(report.decks_added, "deck"),
                interchange::plural(report.cards_added, "card")
            );
            Ok(())
        }
        Command::Info => {
            let info = persistence.info().await?;
            println!("key:            {}", persistence.key());
            println!("stored:         {}", info.exists);
            if let Some(version) = info.schema_version {
                println!("schema version: {version}");
            }
            if let Some(saved_at) = info.saved_at {
                println!("saved at:       {saved_at}");
            }
            println!("size:           {} bytes", info.size_bytes);
            println!("decks:          {}", info.deck_count);
            Ok(())
        }
        Command::Clear => {
            persistence.clear().await?;
            println!("Cleared {}", persistence.key());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match Args::parse(argv) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return;
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            std::process::exit(2);
        }
    };

    init_logging(args.log_level);

    let storage = match open_storage(args.db_url.as_deref()).await {
        Ok(storage) => storage,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(args, storage).await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
