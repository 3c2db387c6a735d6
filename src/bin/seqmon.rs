//! Sequence endurance monitor: runs a gap-tracking session against a
//! simulated board or a recorded byte stream.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{anyhow, Context, Result};
use bci_link_monitor::{
    config::{ConfigLoader, MonitorConfig},
    hal::{ReaderSource, SampleSource, SimulatedBoard},
    report::{sink_for, ReportFormat},
    session::{MonitorSession, SessionReport},
    tracking::ThresholdMode,
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const EXIT_ABORTED: u8 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about = "Sample sequence endurance monitor")]
struct Args {
    /// Configuration file, replaces the standard search paths
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay a recorded raw board stream instead of simulating
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Bad packets before the session aborts
    #[arg(long)]
    threshold: Option<u64>,

    /// Abort only once bad packets exceed the threshold
    #[arg(long)]
    strict: bool,

    /// Simulator: drop every n-th sample
    #[arg(long)]
    drop_every: Option<u64>,

    /// Simulator: random per-sample drop probability
    #[arg(long)]
    drop_probability: Option<f64>,

    /// Simulator: RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many samples
    #[arg(long)]
    samples: Option<u64>,

    /// Report format: text, csv or json
    #[arg(long)]
    format: Option<ReportFormat>,

    /// Report file, standard output when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    init_tracing();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!(summary = ?config.get_summary(), "configuration loaded");

    let report = match &args.replay {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let source = ReaderSource::new(path.display().to_string(), BufReader::new(file))
                .with_sample_rate(config.session.sample_rate_hz);
            run_session(source, &config)?
        }
        None => {
            let board = SimulatedBoard::new(config.simulator.clone())
                .context("invalid simulator configuration")?;
            run_session(board, &config)?
        }
    };

    Ok(ExitCode::from(exit_status(&report)))
}

fn exit_status(report: &SessionReport) -> u8 {
    if report.aborted() {
        EXIT_ABORTED
    } else {
        0
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // reports may go to stdout
    let _ = fmt().with_env_filter(env_filter).with_writer(io::stderr).try_init();
}

fn load_config(args: &Args) -> Result<MonitorConfig> {
    let loader = match &args.config {
        Some(path) if !path.exists() => {
            return Err(anyhow!("configuration file {} does not exist", path.display()));
        }
        Some(path) => ConfigLoader::with_paths(vec![path.clone()]),
        None => ConfigLoader::new(),
    };

    let mut config = loader.load().context("failed to load configuration")?;

    apply_overrides(args, &mut config);

    config
        .validate_consistency()
        .map_err(|errors| anyhow!("invalid configuration: {}", errors.join("; ")))?;
    Ok(config)
}

/// Command line flags win over every configuration layer
fn apply_overrides(args: &Args, config: &mut MonitorConfig) {
    if let Some(threshold) = args.threshold {
        config.tracker.bad_threshold = threshold;
    }
    if args.strict {
        config.tracker.threshold_mode = ThresholdMode::Strict;
    }
    if let Some(every) = args.drop_every {
        config.simulator.drop_every = Some(every);
    }
    if let Some(probability) = args.drop_probability {
        config.simulator.drop_probability = probability;
    }
    if let Some(seed) = args.seed {
        config.simulator.seed = Some(seed);
    }
    if let Some(samples) = args.samples {
        config.session.max_samples = Some(samples);
    }
    if let Some(format) = args.format {
        config.report.format = format;
    }
    if let Some(output) = &args.output {
        config.report.output = Some(output.clone());
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

fn run_session<S: SampleSource>(source: S, config: &MonitorConfig) -> Result<SessionReport> {
    let writer = open_output(config.report.output.as_deref())?;
    let mut session = MonitorSession::new(source, &config.tracker, config.session.clone())?
        .with_sink(sink_for(config.report.format, writer));

    let report = session.run().context("monitoring session failed")?;
    info!(
        reason = %report.end_reason,
        bad = report.summary.bad_count,
        duration_ms = report.duration_ms(),
        "done"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bci_link_monitor::hal::{SourceInfo, SourceKind};
    use bci_link_monitor::session::EndReason;
    use bci_link_monitor::tracking::TrackerSummary;

    fn configured() -> MonitorConfig {
        let mut config = MonitorConfig::default();
        config.tracker.bad_threshold = 10;
        config.simulator.drop_every = Some(50);
        config.session.max_samples = Some(1_000);
        config
    }

    fn report(end_reason: EndReason) -> SessionReport {
        SessionReport {
            source: SourceInfo {
                name: "Simulated Board".to_string(),
                kind: SourceKind::Simulator,
                channel_count: 8,
                sample_rate_hz: Some(250),
            },
            summary: TrackerSummary {
                total_count: 6,
                good_count: 1,
                bad_count: 5,
                aborted: end_reason == EndReason::BadPacketThreshold,
            },
            end_reason,
            started_at_ms: 0,
            finished_at_ms: 24,
            aux: None,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "bci-seqmon",
            "--threshold",
            "3",
            "--strict",
            "--drop-every",
            "7",
            "--samples",
            "20",
            "--format",
            "csv",
            "--output",
            "report.csv",
        ])
        .unwrap();

        let mut config = configured();
        apply_overrides(&args, &mut config);

        assert_eq!(config.tracker.bad_threshold, 3);
        assert_eq!(config.tracker.threshold_mode, ThresholdMode::Strict);
        assert_eq!(config.simulator.drop_every, Some(7));
        assert_eq!(config.session.max_samples, Some(20));
        assert_eq!(config.report.format, ReportFormat::Csv);
        assert_eq!(config.report.output, Some(PathBuf::from("report.csv")));
    }

    #[test]
    fn test_config_kept_without_flags() {
        let args = Args::try_parse_from(["bci-seqmon"]).unwrap();

        let mut config = configured();
        apply_overrides(&args, &mut config);

        assert_eq!(config, configured());
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Args::try_parse_from(["bci-seqmon", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&report(EndReason::BadPacketThreshold)), EXIT_ABORTED);
        assert_eq!(exit_status(&report(EndReason::SourceExhausted)), 0);
        assert_eq!(exit_status(&report(EndReason::SampleLimit)), 0);
    }
}
