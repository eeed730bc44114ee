use anyhow::{ensure, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use tagfuse::config::{configs_to_queries, validate_query_configs, Config};
use tagfuse::db::{Database, Registry};
use tagfuse::{logging, vfs};

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    mount_point: Option<PathBuf>,
    db_type: Option<String>,
    db_source: Option<String>,
    log_level: Option<String>,
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut args = Args::default();

    fn take_value(argv: &[String], i: usize, name: &str) -> String {
        match argv.get(i + 1) {
            Some(value) => value.clone(),
            None => {
                eprintln!("Error: {name} requires an argument");
                std::process::exit(1);
            }
        }
    }

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("tagfuse {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                args.config = Some(PathBuf::from(take_value(&argv, i, "--config")));
                i += 1;
            }
            "--mount-point" => {
                args.mount_point = Some(PathBuf::from(take_value(&argv, i, "--mount-point")));
                i += 1;
            }
            "--db-type" => {
                args.db_type = Some(take_value(&argv, i, "--db-type"));
                i += 1;
            }
            "--db-source" => {
                args.db_source = Some(take_value(&argv, i, "--db-source"));
                i += 1;
            }
            "--log-level" => {
                args.log_level = Some(take_value(&argv, i, "--log-level"));
                i += 1;
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    args
}

fn print_help() {
    println!(
        r#"tagfuse - browse a photo database as a read-only FUSE filesystem

USAGE:
    tagfuse [OPTIONS]

OPTIONS:
    --config, -c PATH    Path to a JSON config file
    --mount-point PATH   Where the filesystem will be mounted
    --db-type TYPE       Photo database type (e.g. digikam-sqlite)
    --db-source SOURCE   Database source, for local databases the path to
                         the database file
    --log-level LEVEL    Log level (trace, debug, info, warn, error)
    --version, -V        Show version
    --help, -h           Show this help message

Flags override values from the config file. Unmount with fusermount -u.

ENVIRONMENT:
    TAGFUSE_LOG          Log level when --log-level is not given
"#
    );
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = parse_args();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(mount_point) = args.mount_point {
        config.mount_point = Some(mount_point);
    }
    if let Some(db_type) = args.db_type {
        config.db.db_type = db_type;
    }
    if let Some(db_source) = args.db_source {
        config.db.source = db_source;
    }
    if let Some(log_level) = args.log_level {
        config.log_level = Some(log_level);
    }

    logging::init(config.log_level.as_deref())?;

    let mount_point = config
        .mount_point
        .context("a mount point is required (--mount-point or the config file)")?;
    ensure!(
        !config.db.db_type.is_empty(),
        "a database type is required (--db-type or the config file)"
    );

    validate_query_configs(&config.queries)?;
    let queries = configs_to_queries(&config.queries)?;

    let registry = Registry::with_builtin()?;
    let db: Arc<dyn Database> = Arc::from(
        registry
            .open(&config.db.db_type, &config.db.source)
            .context("failed to connect to database")?,
    );

    let result = vfs::mount(&mount_point, Arc::clone(&db), queries);

    if let Err(err) = db.close() {
        error!(error = %format!("{err:#}"), "error closing database");
    }
    info!("unmounted");

    result
}
