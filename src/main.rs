// ==========================================
// 配送单号 CSV 导入 - 命令行入口
// ==========================================
// 子命令: init-db / import / template / list
// 数据库: --db 或 SHIP_NUMBER_CSV_DB_PATH，缺省为用户数据目录
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use ship_number_csv::config::import_config_trait::parse_char_setting;
use ship_number_csv::config::{ConfigManager, ImportConfigReader};
use ship_number_csv::db::{
    ensure_schema, get_default_db_path, open_sqlite_connection, read_schema_version,
};
use ship_number_csv::importer::{
    CsvTemplateEmitter, ShipNumberImporter, ShipNumberImporterImpl, TEMPLATE_FILE_NAME,
};
use ship_number_csv::repository::{ShipmentRepository, SqliteShipmentRepository};
use ship_number_csv::{i18n, logging};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

#[derive(Parser, Debug)]
#[command(name = "ship-number-csv")]
#[command(about = "Bulk-assign ship numbers to orders from a CSV file")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Message locale (en, ja)
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema
    InitDb,

    /// Import a ship number CSV (all rows or nothing)
    Import {
        /// CSV file to import
        file: PathBuf,

        /// Field delimiter (overrides csv_import_delimiter)
        #[arg(long)]
        delimiter: Option<String>,

        /// Field enclosure (overrides csv_import_enclosure)
        #[arg(long)]
        enclosure: Option<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the CSV template with the canonical header
    Template {
        /// Output file or directory
        #[arg(short, long, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// List stored ship numbers
    List {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }
    if let Some(locale) = &cli.locale {
        i18n::set_locale(locale);
    }

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(get_default_db_path()));
    let conn = open_database(&db_path)?;

    match cli.command {
        Command::InitDb => {
            let version = read_schema_version(&conn)?.unwrap_or_default();
            println!("{} (schema v{})", db_path.display(), version);
            Ok(ExitCode::SUCCESS)
        }
        Command::Import {
            file,
            delimiter,
            enclosure,
            json,
        } => {
            let conn = Arc::new(Mutex::new(conn));
            let config = ConfigManager::from_connection(Arc::clone(&conn))?;
            let mut settings = config.load_import_settings()?;
            if let Some(value) = delimiter {
                settings.delimiter = parse_char_setting("--delimiter", &value)?;
            }
            if let Some(value) = enclosure {
                settings.enclosure = parse_char_setting("--enclosure", &value)?;
            }

            let importer = ShipNumberImporterImpl::new(conn, settings);
            let outcome = importer
                .import_file(&file)
                .with_context(|| format!("import failed: {}", file.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                for message in outcome.messages() {
                    println!("{}", message);
                }
            }

            Ok(if outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Template { out } => {
            let conn = Arc::new(Mutex::new(conn));
            let settings = ConfigManager::from_connection(conn)?.load_import_settings()?;
            let target = out.unwrap_or_else(|| PathBuf::from(TEMPLATE_FILE_NAME));

            let path = CsvTemplateEmitter::from_settings(&settings).write_to(&target)?;
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::List { json } => {
            let records = SqliteShipmentRepository::new(&conn).find_all()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    println!(
                        "{}\t{}\t{}",
                        record.order_id,
                        record.ship_number,
                        record.updated_at.to_rfc3339()
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// 打开数据库并确保表结构存在
fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let path_str = path.to_string_lossy();
    let conn = open_sqlite_connection(&path_str)
        .with_context(|| format!("cannot open database {}", path.display()))?;
    ensure_schema(&conn)?;
    Ok(conn)
}
