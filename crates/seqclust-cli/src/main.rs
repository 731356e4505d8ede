// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use seqclust_cli::{FitRequest, run_fit};
use seqclust_core::{ReproMode, SegError, SegmentationResult, SequenceView};
use seqclust_fit::{ClusteringConfig, FitReport, InitMethod};
use serde::Serialize;
use serde_json::Value;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt};

struct Cli {
    command: Command,
}

enum Command {
    Fit(FitArgs),
}

#[derive(Debug)]
struct FitArgs {
    segments: Option<usize>,
    threshold: f64,
    init: InitMethod,
    repro_mode: ReproMode,
    partition: Option<Vec<usize>>,
    input: PathBuf,
    output: Option<PathBuf>,
}

impl Default for FitArgs {
    fn default() -> Self {
        Self {
            segments: None,
            threshold: 0.0,
            init: InitMethod::Default,
            repro_mode: ReproMode::Balanced,
            partition: None,
            input: PathBuf::new(),
            output: None,
        }
    }
}

fn parse_repro_mode(raw: &str) -> Result<ReproMode, CliError> {
    match raw.to_ascii_lowercase().as_str() {
        "strict" => Ok(ReproMode::Strict),
        "balanced" => Ok(ReproMode::Balanced),
        "fast" => Ok(ReproMode::Fast),
        _ => Err(CliError::invalid_input(format!(
            "invalid --repro-mode '{raw}'; expected one of: strict, balanced, fast"
        ))),
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Seg(#[from] SegError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("{context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotSupported(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Seg(err) => err.code(),
            Self::InvalidInput(_) => "invalid_input",
            Self::NotSupported(_) => "not_supported",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

#[derive(Clone, Debug)]
struct LoadedSequence {
    path: PathBuf,
    format: &'static str,
    values: Vec<f64>,
    n: usize,
    d: usize,
}

impl LoadedSequence {
    fn as_view(&self) -> Result<SequenceView<'_>, CliError> {
        SequenceView::new(self.values.as_slice(), self.n, self.d).map_err(CliError::from)
    }

    fn summary(&self) -> InputSummary {
        InputSummary {
            path: self.path.display().to_string(),
            format: self.format.to_string(),
            n: self.n,
            d: self.d,
        }
    }
}

#[derive(Serialize)]
struct InputSummary {
    path: String,
    format: String,
    n: usize,
    d: usize,
}

#[derive(Serialize)]
struct FitOutput {
    command: &'static str,
    input: InputSummary,
    config: ClusteringConfig,
    repro_mode: &'static str,
    report: FitReport,
    result: SegmentationResult,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run() -> Result<(), CliError> {
    let Some(cli) = parse_cli_from_env()? else {
        return Ok(());
    };

    match cli.command {
        Command::Fit(args) => handle_fit(args),
    }
}

fn parse_cli_from_env() -> Result<Option<Cli>, CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        print_root_help();
        return Ok(None);
    }

    if matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let command_name = args[0].clone();
    let rest = &args[1..];

    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name.as_str())?;
        return Ok(None);
    }
    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        print_version();
        return Ok(None);
    }

    let command = match command_name.as_str() {
        "fit" => Command::Fit(parse_fit_args(rest)?),
        _ => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{command_name}'; expected one of: fit"
            )));
        }
    };

    Ok(Some(Cli { command }))
}

fn parse_fit_args(tokens: &[String]) -> Result<FitArgs, CliError> {
    let mut args = FitArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--segments" | "-m" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.segments = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--threshold" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.threshold = parse_f64_arg(raw.as_str(), flag)?;
            }
            "--init" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.init = raw.parse::<InitMethod>()?;
            }
            "--repro-mode" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.repro_mode = parse_repro_mode(raw.as_str())?;
            }
            "--partition" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.partition = Some(parse_partition_arg(raw.as_str(), flag)?);
            }
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = PathBuf::from(raw);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown fit option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.input.as_os_str().is_empty() {
        return Err(CliError::invalid_input("fit requires --input <path>"));
    }
    if args.segments.is_none() && args.partition.is_none() {
        return Err(CliError::invalid_input(
            "fit requires --segments <usize> or --partition <l0,l1,...>",
        ));
    }

    Ok(args)
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if token == "-m" {
        return Ok((token, None));
    }
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn parse_usize_arg(raw: &str, flag: &str) -> Result<usize, CliError> {
    raw.parse::<usize>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn parse_f64_arg(raw: &str, flag: &str) -> Result<f64, CliError> {
    raw.parse::<f64>()
        .map_err(|_| CliError::invalid_input(format!("{flag} expects a number, got '{raw}'")))
}

fn parse_partition_arg(raw: &str, flag: &str) -> Result<Vec<usize>, CliError> {
    let lengths = raw
        .split(',')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(|cell| parse_usize_arg(cell, flag))
        .collect::<Result<Vec<_>, _>>()?;
    if lengths.is_empty() {
        return Err(CliError::invalid_input(format!(
            "{flag} expects a comma-separated list of segment lengths"
        )));
    }
    Ok(lengths)
}

fn print_version() {
    println!("seqclust {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "seqclust {}\n\nUSAGE:\n  seqclust <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  fit      Segment a sequence into contiguous clusters\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nSet RUST_LOG (e.g. RUST_LOG=debug) for fit logs on stderr.\nRun 'seqclust <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    match command {
        "fit" => {
            println!(
                "USAGE:\n  seqclust fit --input <path> --segments <usize> [OPTIONS]\n\nOPTIONS:\n  -m, --segments <usize>                 Number of segments, clamped to [1, n]\n  --threshold <float>                    Search depth in [0, 1]. Default: 0 (deepest)\n  --init <default|ts|eq>                 Default: default\n  --repro-mode <strict|balanced|fast>    Default: balanced\n  --partition <l0,l1,...>                Explicit segment lengths; overrides --segments\n  --input <path>                         Required (.csv or .json)\n  --output <path>                        Write JSON output to file"
            );
            Ok(())
        }
        _ => Err(CliError::invalid_input(format!(
            "unknown command '{command}'; expected one of: fit"
        ))),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), CliError> {
    let input = load_sequence(args.input.as_path())?;
    let view = input.as_view()?;

    let num_segments = args
        .partition
        .as_ref()
        .map(Vec::len)
        .or(args.segments)
        .unwrap_or(1);
    let request = FitRequest {
        config: ClusteringConfig::new(num_segments, args.threshold).with_init(args.init),
        repro_mode: args.repro_mode,
        partition: args.partition,
    };
    info!(
        path = %input.path.display(),
        n = input.n,
        d = input.d,
        num_segments,
        "fitting sequence"
    );

    let (result, report) = run_fit(view, &request)?;
    let output = FitOutput {
        command: "fit",
        input: input.summary(),
        config: request.config.clamped(input.n),
        repro_mode: request.repro_mode.as_str(),
        report,
        result,
    };
    write_json_output(&output, args.output.as_deref())
}

fn load_sequence(path: &Path) -> Result<LoadedSequence, CliError> {
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .ok_or_else(|| {
            CliError::not_supported(format!(
                "unable to infer input format for '{}'; expected .csv or .json",
                path.display()
            ))
        })?;

    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    let (format, samples) = match extension.as_str() {
        "csv" => ("csv", parse_csv_data(raw.as_str())?),
        "json" => ("json", parse_json_data(raw.as_str())?),
        _ => {
            return Err(CliError::not_supported(format!(
                "unsupported input format '{extension}'; expected .csv or .json"
            )));
        }
    };

    Ok(LoadedSequence {
        path: path.to_path_buf(),
        format,
        values: samples.values,
        n: samples.n,
        d: samples.d,
    })
}

/// Row-major samples collected from an input file.
#[derive(Debug, PartialEq)]
struct Samples {
    values: Vec<f64>,
    n: usize,
    d: usize,
}

/// Accumulates rows and enforces one width across all of them.
#[derive(Default)]
struct SampleBuilder {
    values: Vec<f64>,
    n: usize,
    d: Option<usize>,
}

impl SampleBuilder {
    /// Returns the established width when `width` disagrees with it.
    fn start_row(&mut self, width: usize) -> Result<(), usize> {
        match self.d {
            Some(d) if d != width => Err(d),
            Some(_) => Ok(()),
            None => {
                self.d = Some(width);
                Ok(())
            }
        }
    }

    fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    fn end_row(&mut self) {
        self.n += 1;
    }

    fn finish(self, empty_msg: &str) -> Result<Samples, CliError> {
        match self.d {
            Some(d) if d > 0 && self.n > 0 => Ok(Samples {
                values: self.values,
                n: self.n,
                d,
            }),
            _ => Err(CliError::invalid_input(empty_msg)),
        }
    }
}

fn csv_cells(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

/// A leading row is treated as a header when none of its cells are numbers
/// and at least one data row follows.
fn parse_csv_data(raw: &str) -> Result<Samples, CliError> {
    let lines = raw
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect::<Vec<_>>();

    let skip_header = lines.len() > 1
        && csv_cells(lines[0].1)
            .iter()
            .all(|cell| !cell.is_empty() && cell.parse::<f64>().is_err());

    let mut builder = SampleBuilder::default();
    for &(line_no, line) in lines.iter().skip(usize::from(skip_header)) {
        let cells = csv_cells(line);
        builder.start_row(cells.len()).map_err(|expected| {
            CliError::invalid_input(format!(
                "CSV row {line_no} has {} columns but expected {expected}",
                cells.len()
            ))
        })?;
        for (col, cell) in cells.iter().enumerate() {
            let value = cell.parse::<f64>().map_err(|_| {
                CliError::invalid_input(format!(
                    "CSV row {line_no} column {} is not a valid float: '{cell}'",
                    col + 1
                ))
            })?;
            builder.push(value);
        }
        builder.end_row();
    }
    builder.finish("CSV input is empty")
}

/// Accepts `[1, 2, ...]`, `[[1, 2], [3, 4], ...]` or either shape under a
/// top-level `"samples"` key.
fn parse_json_data(raw: &str) -> Result<Samples, CliError> {
    let document: Value = serde_json::from_str(raw)
        .map_err(|source| CliError::json("invalid JSON input", source))?;
    let samples = match &document {
        Value::Object(obj) => obj
            .get("samples")
            .ok_or_else(|| CliError::invalid_input("JSON object input must contain 'samples'"))?,
        other => other,
    };
    let rows = samples
        .as_array()
        .ok_or_else(|| CliError::invalid_input("JSON samples must be an array"))?;

    let mut builder = SampleBuilder::default();
    for (row_idx, row) in rows.iter().enumerate() {
        let cells = match row {
            Value::Array(cells) => cells.as_slice(),
            Value::Number(_) => std::slice::from_ref(row),
            _ => {
                return Err(CliError::invalid_input(format!(
                    "JSON sample {row_idx} must be a number or an array of numbers"
                )));
            }
        };
        builder.start_row(cells.len()).map_err(|expected| {
            CliError::invalid_input(format!(
                "JSON sample {row_idx} has {} values but expected {expected}",
                cells.len()
            ))
        })?;
        for (col_idx, cell) in cells.iter().enumerate() {
            let value = cell.as_f64().ok_or_else(|| {
                CliError::invalid_input(format!(
                    "JSON sample {row_idx} value {col_idx} is not a number"
                ))
            })?;
            builder.push(value);
        }
        builder.end_row();
    }
    builder.finish("JSON samples must contain at least one non-empty sample")
}

fn write_json_output<T: Serialize>(
    payload: &T,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let (target, mut writer): (String, Box<dyn Write>) = match output_path {
        Some(path) => {
            let file = fs::File::create(path).map_err(|source| {
                CliError::io(format!("failed to create '{}'", path.display()), source)
            })?;
            (path.display().to_string(), Box::new(io::BufWriter::new(file)))
        }
        None => ("stdout".to_string(), Box::new(io::stdout().lock())),
    };

    serde_json::to_writer_pretty(&mut writer, payload)
        .map_err(|source| CliError::json("failed to serialize JSON output", source))?;
    writeln!(writer)
        .and_then(|()| writer.flush())
        .map_err(|source| CliError::io(format!("failed to write {target}"), source))
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };
    let mut stderr = io::stderr().lock();
    if serde_json::to_writer_pretty(&mut stderr, &envelope).is_err() {
        let _ = write!(stderr, "error[{}]: {err}", err.code());
    }
    let _ = writeln!(stderr);
}
