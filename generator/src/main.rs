//! modsgen CLI - Generate MODS XML records from spreadsheets
//!
//! # Main Commands
//!
//! ```bash
//! modsgen generate catalog.xlsx             # One .mods file per row
//! modsgen generate catalog.csv -t child     # Parent rows followed by child rows
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! modsgen parse-location '<mods:name><mods:namePart>'   # Show a parsed location
//! modsgen rows catalog.csv                              # Show the rows as read
//! modsgen date 5/4/99 --force                           # Normalize one date
//! ```

use clap::{Args, Parser, Subcommand};
use mods_generator::logs::{init_log_file, log_error, log_info};
use mods_generator::{
    normalize_text, parse_location, process, DataHandler, DataRow, ProcessOptions, RecordKind,
    SourceOptions,
};
use serde_json::json;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable giving the default output directory
const OUTPUT_DIR_VAR: &str = "MODSGEN_OUTPUT_DIR";

/// Environment variable giving the default log file
const LOG_FILE_VAR: &str = "MODSGEN_LOG_FILE";

#[derive(Parser)]
#[command(name = "modsgen")]
#[command(about = "Generate MODS XML records from spreadsheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write one MODS record per data row
    Generate {
        /// Input spreadsheet (xls, xlsx, ods) or delimited text file
        input: PathBuf,

        /// Record type: parent or child
        #[arg(short = 't', long = "type", default_value = "parent")]
        record_kind: RecordKind,

        /// Seed child records with their parent's content
        #[arg(long)]
        copy_parent_to_children: bool,

        #[command(flatten)]
        source: SourceArgs,

        /// Encoding of the written records
        #[arg(short = 'e', long, default_value = "utf-8")]
        output_encoding: String,

        /// Output directory (default: $MODSGEN_OUTPUT_DIR or xml_files)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Also append logs to this file, as JSON lines
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Write records without indentation
        #[arg(long)]
        compact: bool,
    },

    /// Parse a location string and print it as JSON
    ParseLocation {
        /// Location string, e.g. '<mods:titleInfo><mods:title>'
        location: String,
    },

    /// Print the control row and data rows of an input file as JSON
    Rows {
        /// Input spreadsheet or delimited text file
        input: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Normalize a single date value
    Date {
        /// Date text, e.g. 5/14/2000
        value: String,

        /// Also rewrite dates with two-digit years
        #[arg(long)]
        force: bool,
    },
}

/// Options for reading the input file
#[derive(Args)]
struct SourceArgs {
    /// Sheet number, starting at 1
    #[arg(short, long, default_value = "1")]
    sheet: usize,

    /// Row holding the location strings, starting at 1
    #[arg(short = 'r', long = "ctrl-row", default_value = "2")]
    ctrl_row: usize,

    /// Input encoding for delimited text ("auto" to detect)
    #[arg(short, long, default_value = "utf-8")]
    input_encoding: String,

    /// CSV delimiter (auto-detect if not specified)
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Normalize dates with two-digit years too
    #[arg(long)]
    force_dates: bool,
}

impl SourceArgs {
    fn to_options(&self) -> SourceOptions {
        SourceOptions {
            sheet: self.sheet,
            control_row: self.ctrl_row,
            input_encoding: self.input_encoding.clone(),
            delimiter: self.delimiter,
            force_dates: self.force_dates,
            ..Default::default()
        }
    }
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            input,
            record_kind,
            copy_parent_to_children,
            source,
            output_encoding,
            output_dir,
            log_file,
            compact,
        } => {
            let output_dir = output_dir
                .or_else(|| env::var_os(OUTPUT_DIR_VAR).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("xml_files"));
            let log_file = log_file.or_else(|| env::var_os(LOG_FILE_VAR).map(PathBuf::from));

            let options = ProcessOptions {
                record_kind,
                force_dates: source.force_dates,
                copy_parent_to_children,
                sheet: source.sheet,
                control_row: source.ctrl_row,
                input_encoding: source.input_encoding,
                output_encoding,
                delimiter: source.delimiter,
                output_dir,
                pretty: !compact,
                ..Default::default()
            };
            cmd_generate(&input, &options, log_file.as_deref())
        }

        Commands::ParseLocation { location } => cmd_parse_location(&location),

        Commands::Rows { input, source } => cmd_rows(&input, &source.to_options()),

        Commands::Date { value, force } => {
            println!("{}", normalize_text(&value, force));
            Ok(())
        }
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

fn cmd_generate(
    input: &Path,
    options: &ProcessOptions,
    log_file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = log_file {
        init_log_file(path)?;
    }

    log_info(format!(
        "Generating {} records from {}",
        options.record_kind,
        input.display()
    ));
    let summary = process(input, options)?;

    eprintln!(
        "\n✨ Done! {} written, {} skipped",
        summary.written.len(),
        summary.skipped.len()
    );
    Ok(())
}

fn cmd_parse_location(location: &str) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = parse_location(location)?;
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

fn cmd_rows(input: &Path, options: &SourceOptions) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Reading: {}", input.display());

    let handler = DataHandler::open(input, options)?;
    if let Some(encoding) = handler.encoding() {
        eprintln!("   Encoding: {}", encoding);
    }
    let rows: Vec<DataRow> = handler.data_rows().collect();
    eprintln!("   Data rows: {}", rows.len());

    let report = json!({
        "controlRow": handler.control_row(),
        "idColumn": handler.id_col(),
        "rows": rows,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
