use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use featcrop::{BatchEvent, BatchOptions, DetectorConfig};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Locate reference templates inside photographs and derive aspect-locked crops"
)]
struct Cli {
    /// Directory holding the reference templates.
    #[arg(long, value_name = "DIR")]
    templates: PathBuf,
    /// Directory holding the full-resolution input images.
    #[arg(long, value_name = "DIR")]
    input: PathBuf,
    /// Directory for crops at native resolution.
    #[arg(long, value_name = "DIR")]
    output_high: Option<PathBuf>,
    /// Directory for crops resampled to exactly width x height.
    #[arg(long, value_name = "DIR")]
    output_fixed: Option<PathBuf>,
    /// Target crop width in pixels.
    #[arg(long, default_value_t = 456)]
    width: u32,
    /// Target crop height in pixels.
    #[arg(long, default_value_t = 564)]
    height: u32,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

/// One line of the progress channel: `{"type": ..., "msg": ...}`.
#[derive(Serialize)]
struct EventRecord<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    msg: &'a str,
}

fn emit_line(event: &BatchEvent) {
    let (kind, msg) = match event {
        BatchEvent::Info(msg) => ("info", msg.as_str()),
        BatchEvent::Success(msg) => ("success", msg.as_str()),
        BatchEvent::Error(msg) => ("error", msg.as_str()),
    };
    let record = EventRecord { kind, msg };
    if let Ok(line) = serde_json::to_string(&record) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.flush();
    }
}

/// Lists regular files in `dir`. An unreadable or missing directory
/// yields an empty list: only output-directory creation is allowed to
/// abort a run.
fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                files.push(entry.path());
            }
        }
    }
    files
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("featcrop=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.width == 0 || cli.height == 0 {
        return Err("width and height must be positive".into());
    }

    // Failing to create a declared output directory is the only
    // globally fatal condition; it aborts before any pair runs.
    for dir in [&cli.output_high, &cli.output_fixed].into_iter().flatten() {
        fs::create_dir_all(dir)?;
    }

    let templates = list_files(&cli.templates);
    let inputs = list_files(&cli.input);

    let options = BatchOptions {
        output_high: cli.output_high,
        output_fixed: cli.output_fixed,
        target_width: cli.width,
        target_height: cli.height,
        detector: DetectorConfig::default(),
    };
    featcrop::run(&templates, &inputs, &options, &mut |event| {
        emit_line(&event)
    });
    Ok(())
}
