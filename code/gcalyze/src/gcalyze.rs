/// `gcalyze` -- Analyze JVM garbage collector log files
///
/// Run with --help for brief help, or with --fmt=help on any printing command for the fields it
/// can print.
///
/// Quirks
///
/// All the log files named on the command line are treated as one log: they are read, ordered so
/// that supplementary heap sizing logs (see `sizing-log-marker` in the config file) come last, and
/// catenated before parsing.  Timestamps are then relative to the earliest record of the whole lot,
/// so mixing logs from different runs gives meaningless times.
///
/// The region size used for occupancy rates and sizing estimates comes from the log if the log
/// states it, and otherwise from the config file.  Without either, `regions --rates` fails.
mod format;
mod metadata;
mod pauses;
mod regions;
mod scaling;
mod sizing;
mod summary;
mod zgc;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gclog::{Category, CollectorFamily, ParsedLog};
use gcutils::AnalysisConfig;
use std::io::{self, Write};
use std::process;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print information about the program
    Version,

    /// Print information about the log itself: dialect, collector, JDK version, region size
    Metadata(LogCmdArgs),

    /// Print the heap pauses of the region-based collector
    Pauses(LogCmdArgs),

    /// Print pause counts and durations grouped by kind of pause, with their overhead
    Summary(LogCmdArgs),

    /// Print the user, system and real CPU time of each collection
    Scaling(LogCmdArgs),

    /// Print region counts by region type, or occupancy rates
    Regions(RegionsCmdArgs),

    /// Print the records of the low-pause collector
    Zgc(ZgcCmdArgs),

    /// Print heap sizing activity, or a summary of it
    Sizing(SizingCmdArgs),

    /// Print all records and metadata as one JSON document
    Export(ExportCmdArgs),
}

#[derive(Args, Debug)]
pub struct LogCmdArgs {
    #[command(flatten)]
    source_args: SourceArgs,

    #[command(flatten)]
    input_args: InputArgs,

    #[command(flatten)]
    print_args: PrintArgs,

    #[command(flatten)]
    meta_args: MetaArgs,
}

#[derive(Args, Debug)]
pub struct RegionsCmdArgs {
    /// Print occupancy rates in MB/s between consecutive samples instead of the samples
    #[arg(long, default_value_t = false)]
    rates: bool,

    #[command(flatten)]
    log_args: LogCmdArgs,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ZgcKind {
    Pause,
    Concurrent,
    Pages,
    Cause,
}

#[derive(Args, Debug)]
pub struct ZgcCmdArgs {
    /// The kind of record to print
    #[arg(long, value_enum, default_value_t = ZgcKind::Pause)]
    kind: ZgcKind,

    #[command(flatten)]
    log_args: LogCmdArgs,
}

#[derive(Args, Debug)]
pub struct SizingCmdArgs {
    /// Print totals for the time-based sizing policy instead of the records
    #[arg(long, default_value_t = false)]
    summary: bool,

    /// Print the running total of uncommitted memory instead of the records
    #[arg(long, default_value_t = false)]
    cumulative: bool,

    #[command(flatten)]
    log_args: LogCmdArgs,
}

#[derive(Args, Debug)]
pub struct ExportCmdArgs {
    #[command(flatten)]
    source_args: SourceArgs,

    #[command(flatten)]
    input_args: InputArgs,

    #[command(flatten)]
    meta_args: MetaArgs,
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Log file names, at least one
    #[arg(last = true)]
    logfiles: Vec<String>,
}

#[derive(Args, Debug)]
pub struct InputArgs {
    /// File containing JSON data with analysis settings [default: none]
    #[arg(long)]
    config_file: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct PrintArgs {
    /// Select fields and format for the output [default: command dependent, see --fmt=help]
    #[arg(long)]
    fmt: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct MetaArgs {
    /// Print useful statistics about the input to stderr, then terminate
    #[arg(long, short, default_value_t = false)]
    verbose: bool,

    /// Print unformatted and/or debug-formatted data (for developers)
    #[arg(long, default_value_t = false)]
    raw: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match gcalyze() {
        Ok(()) => {}
        Err(msg) => {
            eprintln!("ERROR: {}", msg);
            process::exit(1);
        }
    }
}

fn gcalyze() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        // Syntax:
        //  - components of the version string are space-separated but there are spaces nowhere else
        //  - the keyword "gcalyze" is always the first component
        //  - other components are in random order
        //  - every component is keyword(value)
        //  - "version" carries a semver
        println!("gcalyze version({})", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if match cli.command {
        Commands::Metadata(ref args) => {
            format::maybe_help(&args.print_args.fmt, &metadata::fmt_help)
        }
        Commands::Pauses(ref args) => format::maybe_help(&args.print_args.fmt, &pauses::fmt_help),
        Commands::Summary(ref args) => {
            format::maybe_help(&args.print_args.fmt, &summary::fmt_help)
        }
        Commands::Scaling(ref args) => {
            format::maybe_help(&args.print_args.fmt, &scaling::fmt_help)
        }
        Commands::Regions(ref args) => format::maybe_help(&args.log_args.print_args.fmt, || {
            regions::fmt_help(args.rates)
        }),
        Commands::Zgc(ref args) => {
            format::maybe_help(&args.log_args.print_args.fmt, || zgc::fmt_help(args.kind))
        }
        Commands::Sizing(ref args) => format::maybe_help(&args.log_args.print_args.fmt, || {
            sizing::fmt_help(args.summary, args.cumulative)
        }),
        Commands::Version | Commands::Export(_) => false,
    } {
        return Ok(());
    }

    let (source_args, input_args, meta_args) = match cli.command {
        Commands::Metadata(ref args)
        | Commands::Pauses(ref args)
        | Commands::Summary(ref args)
        | Commands::Scaling(ref args) => (&args.source_args, &args.input_args, &args.meta_args),
        Commands::Regions(RegionsCmdArgs { ref log_args, .. })
        | Commands::Zgc(ZgcCmdArgs { ref log_args, .. })
        | Commands::Sizing(SizingCmdArgs { ref log_args, .. }) => (
            &log_args.source_args,
            &log_args.input_args,
            &log_args.meta_args,
        ),
        Commands::Export(ref args) => (&args.source_args, &args.input_args, &args.meta_args),
        Commands::Version => panic!("Unexpected"),
    };

    // Analysis settings, if specified.

    let cfg = if let Some(ref config_filename) = input_args.config_file {
        gcutils::read_analysis_config(config_filename)?
    } else {
        AnalysisConfig::default()
    };

    // Log files, in parse order.

    let mut logfiles = source_args.logfiles.clone();
    if logfiles.is_empty() {
        bail!("No log files specified")
    }
    gclog::order_logfiles(&mut logfiles, &cfg.sizing_log_marker);
    log::debug!("Log files in parse order: {:?}", logfiles);

    let text = gclog::read_logfiles(&logfiles)?;
    let log = gclog::parse_log(&text, cfg.region_size_mb)?;

    if meta_args.verbose {
        print_stats(&log);
        return Ok(());
    }

    if let Some(category) = required_category(&cli.command, &log) {
        log.require(category)?;
        if meta_args.raw {
            print_raw(&mut io::stdout(), &log, category)?;
            return Ok(());
        }
    }

    let mut output = io::stdout();
    match cli.command {
        Commands::Version => panic!("Unexpected"),

        Commands::Metadata(ref args) => metadata::print(&mut output, &args.print_args, &log),

        Commands::Pauses(ref args) => pauses::print(&mut output, &args.print_args, &log),

        Commands::Summary(ref args) => summary::print(&mut output, &args.print_args, &cfg, &log),

        Commands::Scaling(ref args) => scaling::print(&mut output, &args.print_args, &log),

        Commands::Regions(ref args) => {
            if args.rates {
                let Some(region_size_mb) = log.format_info.region_size_mb.or(cfg.region_size_mb)
                else {
                    bail!("Region size unknown: the log does not state it and no config file sets it")
                };
                regions::print_rates(&mut output, &args.log_args.print_args, region_size_mb, &log)
            } else {
                regions::print_samples(&mut output, &args.log_args.print_args, &log)
            }
        }

        Commands::Zgc(ref args) => zgc::print(&mut output, &args.log_args.print_args, args.kind, &log),

        Commands::Sizing(ref args) => {
            let print_args = &args.log_args.print_args;
            if args.summary {
                sizing::print_summary(&mut output, print_args, &cfg, &log)
            } else if args.cumulative {
                sizing::print_cumulative(&mut output, print_args, &log)
            } else {
                sizing::print_records(&mut output, print_args, &log)
            }
        }

        Commands::Export(_) => {
            let doc = gclog::export_json(&log)?;
            output.write_all(doc.as_bytes())?;
            output.write_all(b"\n")?;
            Ok(())
        }
    }
}

// The record category a command prints.  `metadata` and `export` print whatever there is.
fn required_category(command: &Commands, log: &ParsedLog) -> Option<Category> {
    match command {
        Commands::Pauses(_) => Some(Category::HeapPause),
        Commands::Summary(_) => {
            if log.format_info.collector_family == CollectorFamily::ConcurrentLowPause {
                Some(Category::Pause)
            } else {
                Some(Category::HeapPause)
            }
        }
        Commands::Scaling(_) => Some(Category::Scaling),
        Commands::Regions(_) => Some(Category::RegionTransition),
        Commands::Zgc(args) => Some(match args.kind {
            ZgcKind::Pause => Category::Pause,
            ZgcKind::Concurrent => Category::ConcurrentPhase,
            ZgcKind::Pages => Category::PageSizing,
            ZgcKind::Cause => Category::CollectionCause,
        }),
        Commands::Sizing(_) => Some(Category::SizingActivity),
        Commands::Version | Commands::Metadata(_) | Commands::Export(_) => None,
    }
}

fn print_stats(log: &ParsedLog) {
    let stats = &log.stats;
    eprintln!("Lines read: {}", stats.lines);
    eprintln!("Lines matched: {}", stats.matched);
    for category in gclog::ALL_CATEGORIES {
        eprintln!("  {category}: {}", log.count(category));
    }
    eprintln!("Lines discarded: {}", stats.discarded);
    eprintln!("Sizing evaluations abandoned: {}", stats.abandoned_evaluations);
    eprintln!("Unparseable timestamps: {}", stats.unparsed_timestamps);
}

fn print_raw(output: &mut dyn io::Write, log: &ParsedLog, category: Category) -> Result<()> {
    for e in log.events.iter().chain(log.scaling.iter()) {
        if e.kind.category() == category {
            writeln!(output, "{:?}", e)?;
        }
    }
    Ok(())
}
