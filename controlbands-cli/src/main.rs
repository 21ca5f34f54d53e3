// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

mod fields;
mod pipeline;

use anyhow::{bail, Context, Result};
use clap::Parser;
use controlbands_core::{unix_now, BandConfig, BandEngine, BandInterval};
use controlbands_storage::{SnapshotEncoding, SnapshotStore};
use pipeline::BandPipeline;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Moving-range control bands over JSON lines", long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Field path of the group key (overrides config file)
    #[arg(long)]
    group_by: Option<String>,

    /// Field path of the observed value (overrides config file)
    #[arg(long)]
    value_field: Option<String>,

    /// Trailing window in seconds (overrides config file)
    #[arg(long)]
    band_interval_secs: Option<f64>,

    /// Snapshot file for band state (overrides config file)
    #[arg(long)]
    state: Option<PathBuf>,

    /// Input JSON lines, `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Output JSON lines, `-` for stdout
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Records processed together as one batch
    #[arg(long, default_value_t = 1)]
    batch_size: usize,

    /// Write the snapshot as JSON instead of bincode
    #[arg(long)]
    json_state: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    execute(args).map(|_| ())
}

/// Load config, restore state, stream the input and persist state again
fn execute(args: Args) -> Result<RunStats> {
    if args.batch_size == 0 {
        bail!("--batch-size must be at least 1");
    }

    // Load configuration
    let mut config = BandConfig::load(args.config.as_deref())?;

    // Apply CLI overrides
    if let Some(group_by) = args.group_by {
        config.group_by = Some(group_by).filter(|g| !g.is_empty());
    }
    if let Some(field) = args.value_field {
        config.value_field = field;
    }
    if let Some(secs) = args.band_interval_secs {
        config.band_interval = BandInterval::from_secs(secs);
    }
    if let Some(state) = args.state {
        config.state_path = Some(state);
    }
    config.validate()?;

    let engine = BandEngine::from_config(&config)?;

    let encoding = if args.json_state {
        SnapshotEncoding::Json
    } else {
        SnapshotEncoding::Bincode
    };
    let store = config
        .state_path
        .as_ref()
        .map(|path| SnapshotStore::new(path).with_encoding(encoding));

    if let Some(store) = &store {
        let restored = store
            .load_into(&engine)
            .with_context(|| format!("Failed to restore band state from {:?}", store.path()))?;
        if !restored {
            tracing::info!(path = ?store.path(), "No band state found, starting fresh");
        }
    }

    tracing::info!(
        band_interval_secs = engine.retention_secs(),
        group_by = ?config.group_by,
        value_field = %config.value_field,
        "Starting control bands"
    );

    let pipeline = BandPipeline::new(engine, &config)?;
    let reader = open_input(&args.input)?;
    let mut writer = open_output(&args.output)?;

    let stats = run(&pipeline, reader, &mut writer, args.batch_size)?;
    writer.flush().context("Failed to flush output")?;

    if let Some(store) = &store {
        store
            .save_engine(pipeline.engine())
            .with_context(|| format!("Failed to save band state to {:?}", store.path()))?;
    }

    tracing::info!(
        read = stats.read,
        written = stats.written,
        skipped = stats.skipped,
        groups = pipeline.engine().registry().len(),
        "Finished"
    );
    Ok(stats)
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RunStats {
    read: usize,
    written: usize,
    skipped: usize,
}

fn run<R: BufRead, W: Write>(
    pipeline: &BandPipeline,
    reader: R,
    writer: &mut W,
    batch_size: usize,
) -> Result<RunStats> {
    let mut stats = RunStats::default();
    let mut batch = Vec::with_capacity(batch_size);

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        stats.read += 1;

        match serde_json::from_str::<Value>(&line) {
            Ok(record @ Value::Object(_)) => batch.push(record),
            Ok(_) => {
                tracing::warn!(line = index + 1, "Skipping input line: not a JSON object");
                stats.skipped += 1;
            }
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Skipping input line: invalid JSON");
                stats.skipped += 1;
            }
        }

        if batch.len() >= batch_size {
            stats.written += flush_batch(pipeline, &mut batch, writer)?;
        }
    }

    if !batch.is_empty() {
        stats.written += flush_batch(pipeline, &mut batch, writer)?;
    }

    Ok(stats)
}

fn flush_batch<W: Write>(
    pipeline: &BandPipeline,
    batch: &mut Vec<Value>,
    writer: &mut W,
) -> Result<usize> {
    let records = pipeline.process_batch(std::mem::take(batch), unix_now())?;
    for record in &records {
        serde_json::to_writer(&mut *writer, record).context("Failed to write output")?;
        writer.write_all(b"\n").context("Failed to write output")?;
    }
    Ok(records.len())
}

fn open_input(input: &str) -> Result<Box<dyn BufRead>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(Path::new(input)).with_context(|| format!("Failed to open {}", input))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(output: &str) -> Result<Box<dyn Write>> {
    if output == "-" {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    let file =
        File::create(Path::new(output)).with_context(|| format!("Failed to create {}", output))?;
    Ok(Box::new(BufWriter::new(file)))
}
