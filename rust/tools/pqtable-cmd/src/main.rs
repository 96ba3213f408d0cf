use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;
mod utils;

use commands::EngineArg;

#[derive(Parser)]
#[command(name = "pqtable-cmd")]
#[command(about = "Command-line utility for reading and writing parquet tables")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the mapped columns, row groups and footer metadata of a file
    Inspect {
        /// Include row groups and per-column-chunk statistics
        #[arg(short, long)]
        details: bool,

        /// Parquet file to inspect
        file: String,
    },

    /// Print the first rows of a file
    Head {
        /// Number of rows to print
        #[arg(short = 'n', long, default_value_t = 10)]
        rows: u64,

        /// Print rows as JSON objects instead of tab-separated text
        #[arg(long)]
        json: bool,

        /// Read through the cached engine instead of a sequential pass
        #[arg(long)]
        cached: bool,

        /// Parquet file to read
        file: String,
    },

    /// Read every cell of a file and report throughput
    Consume {
        /// Read engine
        #[arg(long, value_enum, default_value_t = EngineArg::Auto)]
        engine: EngineArg,

        /// Worker threads for building the cached table
        #[arg(long)]
        workers: Option<usize>,

        /// Parent directory for scratch files of the cached table
        #[arg(long)]
        temp_dir: Option<String>,

        /// Number of times to repeat the read
        #[arg(long, default_value_t = 1)]
        iterations: u64,

        /// Parquet file to read
        file: String,
    },

    /// Rewrite a file through the table model
    Copy {
        /// Write arrays as bare repeated fields instead of LIST groups
        #[arg(long)]
        flat: bool,

        /// Rows per row group in the output
        #[arg(long)]
        row_group_rows: Option<usize>,

        /// Source parquet file
        input: String,

        /// Destination path
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logger(cli.verbose);

    match cli.command {
        Commands::Inspect { details, file } => commands::inspect::run(details, file),
        Commands::Head {
            rows,
            json,
            cached,
            file,
        } => commands::head::run(rows, json, cached, file),
        Commands::Consume {
            engine,
            workers,
            temp_dir,
            iterations,
            file,
        } => commands::consume::run(engine, workers, temp_dir, iterations, file),
        Commands::Copy {
            flat,
            row_group_rows,
            input,
            output,
        } => commands::copy::run(flat, row_group_rows, input, output),
    }
}
