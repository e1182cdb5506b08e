//! CLI tool to select records from a FASTA-style file by header key.
//!
//! Usage:
//!   fastaselect --in <records.fasta> --sel <list.txt> [--out <out.fasta>]
//!   fastaselect --in <records.fasta> --sel <list.txt> --fragc --out 'part_%s.fasta'
//!
//! If no output file is specified, writes to stdout.

use clap::Parser;
use fastaselect_rs::config::DEFAULT_MAX_LINE_LENGTH;
use fastaselect_rs::{
    FileOpener, FragmentMode, InputKind, OutputTemplate, Polarity, SelectConfig, SelectError,
    SelectReport, decode_escapes, run_fragmented, run_select_to,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

const HEADER_HELP: &str = "\
Record files contain one or more entries.
Each entry starts with a header line which begins with \">NAME\".
The rest of the entry contains any number of data lines.
Data lines may hold any text other than another header line.
NAME ends at the first byte from the --hi delimiter set.

Selection files contain a series of entry names, one per line, each ended by
a byte from the --hs delimiter set. With --fragc or --fraga the name is
followed by a group name, which fills the %s in the --out template.

Entries whose NAME matches a selection exactly are written in the order in
which they appear in the selection file.

Example: if the selection file holds the lines \"YACL12\", \"SLACL2\" and
\"LLEV12\", those entries are written in the order YACL12, SLACL2, LLEV12.";

/// Select records from a FASTA-style file by header key.
///
/// Selected records are written in selection-list order. Records are held in
/// memory only until every earlier selection has been written.
#[derive(Parser)]
#[command(name = "fastaselect", version)]
struct Cli {
    /// Read records from FILE
    #[arg(long = "in", value_name = "FILE", required_unless_present = "hhead")]
    input: Option<PathBuf>,

    /// Selection list; "-" reads stdin
    #[arg(long, value_name = "FILE", default_value = "-")]
    sel: String,

    /// Write selected records to FILE ("-" is stdout). With --fragc/--fraga
    /// FILE must contain exactly one %s
    #[arg(long, value_name = "FILE")]
    out: Option<String>,

    /// Continue on miss: warn about selectors with no record instead of failing
    #[arg(long)]
    com: bool,

    /// Continue on duplicates: keep the first of repeated selectors and warn
    #[arg(long)]
    cod: bool,

    /// One new output file per group; groups must be contiguous
    #[arg(long, conflicts_with = "fraga")]
    fragc: bool,

    /// One output file per group, appended to; groups may recur
    #[arg(long)]
    fraga: bool,

    /// Emit records that do NOT match a selector
    #[arg(long, conflicts_with_all = ["fragc", "fraga"])]
    reject: bool,

    /// Longest allowed input line, in bytes
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_LINE_LENGTH as u64,
          value_parser = clap::value_parser!(u64).range(1..))]
    wl: u64,

    /// Selection-list delimiters (escape syntax: \t, ^A, \001, \x01, ...)
    #[arg(long, visible_alias = "ht", value_name = "STRING")]
    hs: Option<String>,

    /// Header key delimiters (same syntax as --hs)
    #[arg(long, value_name = "STRING")]
    hi: Option<String>,

    /// First byte of a header line
    #[arg(long, value_name = "CHAR", default_value_t = '>')]
    marker: char,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,

    /// Explain header selection and delimiters, then exit
    #[arg(long)]
    hhead: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet { "error" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if cli.hhead {
        eprintln!("{HEADER_HELP}");
        return ExitCode::SUCCESS;
    }

    match run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> Result<SelectConfig, SelectError> {
    let mut config = SelectConfig::new()
        .with_continue_on_miss(cli.com)
        .with_continue_on_duplicates(cli.cod)
        .with_max_line_length(usize::try_from(cli.wl).unwrap_or(usize::MAX));

    if let Some(hs) = &cli.hs {
        config = config.with_selector_delimiters(&decode_escapes(hs)?);
    }
    if let Some(hi) = &cli.hi {
        config = config.with_header_key_delimiters(&decode_escapes(hi)?);
    }
    if !cli.marker.is_ascii() {
        return Err(SelectError::InvalidConfig(format!(
            "record marker '{}' is not an ASCII character",
            cli.marker
        )));
    }
    config = config.with_record_marker(cli.marker as u8);

    if cli.reject {
        config = config.with_polarity(Polarity::Reject);
    }
    if cli.fragc {
        config = config.with_fragment(FragmentMode::CreateExclusive);
    } else if cli.fraga {
        config = config.with_fragment(FragmentMode::Append);
    }

    config.validate()?;
    Ok(config)
}

fn open_input(input: InputKind, path: &Path) -> Result<File, SelectError> {
    File::open(path).map_err(|source| SelectError::Input {
        input,
        path: path.to_path_buf(),
        source,
    })
}

fn run(cli: &Cli) -> Result<SelectReport, SelectError> {
    let config = build_config(cli)?;

    let input = cli
        .input
        .as_ref()
        .ok_or_else(|| SelectError::InvalidConfig("no --in specified".to_string()))?;
    let stream = BufReader::with_capacity(1 << 16, open_input(InputKind::Records, input)?);

    let selection: Box<dyn BufRead> = if cli.sel == "-" {
        Box::new(io::stdin().lock())
    } else {
        let file = open_input(InputKind::Selection, Path::new(&cli.sel))?;
        Box::new(BufReader::new(file))
    };

    if config.fragment.is_active() {
        let out = cli.out.as_deref().ok_or_else(|| {
            SelectError::InvalidConfig("fragment mode needs an --out template".to_string())
        })?;
        let opener = FileOpener::new(OutputTemplate::parse(out)?);
        return run_fragmented(&config, selection, stream, opener);
    }

    // The output is created only after the selection list has loaded.
    let out = cli.out.clone();
    run_select_to(&config, selection, stream, move || -> Result<Box<dyn Write>, SelectError> {
        match out.as_deref() {
            None | Some("-") => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
            Some(path) => {
                let file = File::create(path).map_err(|source| SelectError::Sink {
                    path: PathBuf::from(path),
                    source,
                })?;
                Ok(Box::new(BufWriter::new(file)))
            }
        }
    })
}
