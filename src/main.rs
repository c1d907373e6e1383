use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use enum_sync::config::Config;
use enum_sync::detect;
use enum_sync::parser::EnumParser;
use enum_sync::scanner;
use enum_sync::validator::sanitize_identifier;
use enum_sync::sync::{SyncEngine, SyncEvent, SyncStats};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "enum-sync")]
#[command(about = "Keeps enum definitions and generated C# enum files in sync")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "enum-sync.toml", global = true)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate C# files from stored definitions
    Generate {
        /// Only this enum
        name: Option<String>,
        /// Rewrite files even when their content is unchanged
        #[arg(short, long)]
        force: bool,
    },
    /// Merge every generated file back into its definition
    Sync {
        /// Ignore the revision cache
        #[arg(short, long)]
        force: bool,
    },
    /// Sync once, then merge generated files as they change
    Watch,
    /// Create a starter enum file and its definition
    New {
        name: String,
        #[arg(long)]
        namespace: Option<String>,
        /// Mark the enum with [System.Flags]
        #[arg(long)]
        flags: bool,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Add a value to an enum
    Add {
        enum_name: String,
        value: String,
        #[arg(long, default_value = "")]
        tooltip: String,
        /// Turn the value into a valid identifier first
        #[arg(long)]
        sanitize: bool,
    },
    /// Soft-delete a value, keeping its number reserved
    Remove { enum_name: String, value: String },
    /// Reactivate a soft-deleted value
    Restore { enum_name: String, value: String },
    /// Rename an active value
    Rename {
        enum_name: String,
        old: String,
        new: String,
    },
    /// Validate every stored definition
    Check,
    /// List every enum declared in C# sources under a directory
    Detect {
        /// Directory to search, the project root by default
        dir: Option<PathBuf>,
    },
    /// Append a value to an enum in any C# file, editing the file in place
    Insert {
        file: PathBuf,
        enum_name: String,
        value: String,
        #[arg(long, default_value = "")]
        tooltip: String,
        /// Turn the value into a valid identifier first
        #[arg(long)]
        sanitize: bool,
    },
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        return Config::load(path).with_context(|| format!("Failed to load config from {:?}", path));
    }
    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(Config::with_root(root))
}

fn print_stats(stats: &SyncStats, elapsed: Duration) {
    println!(
        "  Created: {}, Merged: {}, Written: {}, Unchanged: {}, Skipped: {}, Failed: {}",
        stats.created, stats.merged, stats.written, stats.unchanged, stats.skipped, stats.failed
    );
    println!("Done in {:?}", elapsed);
}

fn run_events(engine: &mut SyncEngine, events: Vec<SyncEvent>) -> Result<()> {
    let start = Instant::now();
    for event in events {
        engine.push(event);
    }
    let stats = engine.run();
    print_stats(&stats, start.elapsed());
    if stats.failed > 0 {
        anyhow::bail!("{} file(s) failed, see warnings above", stats.failed);
    }
    Ok(())
}

fn watch(engine: &mut SyncEngine) -> Result<()> {
    println!("Initial sync...");
    if let Err(e) = run_events(engine, vec![SyncEvent::StartupScan]) {
        eprintln!("{}", e);
    }

    let watch_path = engine.config().generated_dir();
    std::fs::create_dir_all(&watch_path)
        .with_context(|| format!("Failed to create {:?}", watch_path))?;

    println!("\nWatch mode enabled. Monitoring {}", watch_path.display());
    println!("Press Ctrl+C to stop.\n");

    // Create channel for file system events
    let (tx, rx) = channel();

    let mut watcher: RecommendedWatcher = Watcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                if let Err(e) = tx.send(event) {
                    eprintln!("Failed to send file event: {}", e);
                }
            }
        },
        notify::Config::default(),
    )?;
    watcher.watch(&watch_path, RecursiveMode::NonRecursive)?;

    // Debounce delay (in milliseconds)
    const DEBOUNCE_MS: u64 = 300;

    let mut last_change_time = Instant::now();
    let mut pending_build = false;

    loop {
        if let Ok(event) = rx.recv_timeout(Duration::from_millis(100)) {
            if matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
            ) {
                for path in event.paths.into_iter().filter(|p| scanner::is_enum_source(p)) {
                    engine.push(SyncEvent::FileChanged(path));
                    pending_build = true;
                    last_change_time = Instant::now();
                }
            }
        }

        // Treat a quiet period after the last change as a finished build
        if pending_build && last_change_time.elapsed().as_millis() as u64 >= DEBOUNCE_MS {
            println!("\nChanges detected, syncing...");
            if let Err(e) = run_events(engine, vec![SyncEvent::BuildFinished]) {
                eprintln!("Error during sync: {}", e);
            }
            println!("\nWatching for changes (press Ctrl+C to stop)...\n");
            pending_build = false;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    let config = load_config(&cli.config)?;

    println!("Enum Sync v{}", env!("CARGO_PKG_VERSION"));
    println!("{}", "=".repeat(50));

    let mut engine = SyncEngine::new(config);

    match cli.command {
        Commands::Generate { name, force } => {
            engine.set_force(force);
            run_events(&mut engine, vec![SyncEvent::Apply(name)])?;
        }
        Commands::Sync { force } => {
            if force {
                println!("[Force mode] Ignoring cache, re-reading all files...");
            }
            engine.set_force(force);
            run_events(&mut engine, vec![SyncEvent::StartupScan])?;
        }
        Commands::Watch => watch(&mut engine)?,
        Commands::New {
            name,
            namespace,
            flags,
            force,
        } => {
            let path = engine.create_enum(&name, namespace.as_deref(), flags, force)?;
            engine.save_cache();
            println!("Created {}", path.display());
        }
        Commands::Add {
            enum_name,
            value,
            tooltip,
            sanitize,
        } => {
            let added = engine.add_value(&enum_name, &value, &tooltip, sanitize)?;
            engine.save_cache();
            println!("Added {}.{}", enum_name, added);
        }
        Commands::Remove { enum_name, value } => {
            let number = engine.remove_value(&enum_name, &value)?;
            engine.save_cache();
            println!("Removed {}.{} (number {} stays reserved)", enum_name, value, number);
        }
        Commands::Restore { enum_name, value } => {
            engine.restore_value(&enum_name, &value)?;
            engine.save_cache();
            println!("Restored {}.{}", enum_name, value);
        }
        Commands::Rename {
            enum_name,
            old,
            new,
        } => {
            engine.rename_value(&enum_name, &old, &new)?;
            engine.save_cache();
            println!("Renamed {}.{} to {}", enum_name, old, new);
        }
        Commands::Check => {
            let report = engine.check();
            if report.is_empty() {
                println!("All definitions are valid");
                return Ok(());
            }
            for (enum_name, violations) in &report {
                eprintln!("{}:", enum_name);
                for violation in violations {
                    eprintln!("  - {}", violation);
                }
            }
            std::process::exit(1);
        }
        Commands::Detect { dir } => {
            let root = dir.unwrap_or_else(|| engine.config().root.clone());
            let enums = detect::find_enums_in_project(&EnumParser::new(), &root);
            for found in &enums {
                let path = found.path.strip_prefix(&root).unwrap_or(&found.path);
                println!(
                    "{}{}  {} value(s)  {}",
                    found.qualified_name(),
                    if found.parsed.use_flags { " [Flags]" } else { "" },
                    found.parsed.values.len(),
                    path.display()
                );
            }
            println!("Found {} enum(s)", enums.len());
        }
        Commands::Insert {
            file,
            enum_name,
            value,
            tooltip,
            sanitize,
        } => {
            let value = if sanitize {
                sanitize_identifier(&value)
            } else {
                value
            };
            let number = detect::insert_value(
                &EnumParser::new(),
                &file,
                &enum_name,
                &value,
                &tooltip,
                &engine.config().numbering(),
            )?;
            println!("Inserted {}.{} = {}", enum_name, value, number);
        }
    }

    Ok(())
}
