use std::fs;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use instant::Duration;
use log::LevelFilter;

use fillgrid::{
    render_grid, save_image, solve, Choice, Crossword, FillFailure, FillOptions, ImageFormat, SlotOrder,
    ValueOrder, WordList,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SlotOrderArg {
    Heuristic,
    FirstUnassigned,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ValueOrderArg {
    LeastConstraining,
    Domain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> LevelFilter {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Fill a crossword grid from a word list
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Grid structure file ('#' or ' ' for blocks, '_' or '.' for fillable cells)
    structure: String,

    /// Word list file (one word per line)
    words: String,

    /// Also save the fill here: as a picture for .png or .svg, as text otherwise
    output: Option<String>,

    /// How to choose the next slot to fill
    #[arg(long, value_enum, default_value_t = SlotOrderArg::Heuristic)]
    slot_order: SlotOrderArg,

    /// How to order the candidate words for a slot
    #[arg(long, value_enum, default_value_t = ValueOrderArg::LeastConstraining)]
    value_order: ValueOrderArg,

    /// Skip arc consistency after each trial assignment
    #[arg(long)]
    no_inference: bool,

    /// Give up after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log level (RUST_LOG, if set, takes precedence)
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Shorthand for --log-level debug
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn fill_options(&self) -> FillOptions {
        FillOptions {
            slot_order: match self.slot_order {
                SlotOrderArg::Heuristic => SlotOrder::MinimumRemainingValues,
                SlotOrderArg::FirstUnassigned => SlotOrder::FirstUnassigned,
            },
            value_order: match self.value_order {
                ValueOrderArg::LeastConstraining => ValueOrder::LeastConstraining,
                ValueOrderArg::Domain => ValueOrder::DomainOrder,
            },
            inference: !self.no_inference,
            timeout: self.timeout_ms.map(Duration::from_millis),
            abort: None,
        }
    }

    fn level_filter(&self) -> LevelFilter {
        let level = LevelFilter::from(self.log_level);
        if self.debug {
            level.max(LevelFilter::Debug)
        } else {
            level
        }
    }
}

fn init_logger(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false);

    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder.init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.level_filter());

    if let Err(e) = try_main(&cli) {
        eprintln!("Error: {e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Save the fill to `output`, picking the format from its extension.
fn write_output(
    crossword: &Crossword,
    words: &WordList,
    choices: &[Choice],
    output: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match ImageFormat::from_path(output) {
        Some(format) => save_image(crossword, words, choices, output, format)?,
        None => fs::write(output, render_grid(crossword, words, choices))?,
    }

    log::info!("Wrote fill to {}", output);
    Ok(())
}

/// Load the grid and word list, fill the grid, and print (and optionally save) the result.
fn try_main(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let crossword = Crossword::load_from_path(&cli.structure)?;
    let words = WordList::load_from_path(&cli.words)?;

    match solve(&crossword, &words, &cli.fill_options()) {
        Ok(result) => {
            log::debug!("{:?}", result.statistics);
            println!("{}", render_grid(&crossword, &words, &result.choices));

            if let Some(output) = &cli.output {
                write_output(&crossword, &words, &result.choices, output)?;
            }

            Ok(())
        }
        Err(FillFailure::NoSolution) => {
            println!("No solution.");
            Ok(())
        }
        Err(failure) => Err(failure.into()),
    }
}
