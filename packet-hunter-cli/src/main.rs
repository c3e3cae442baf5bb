use std::sync::Arc;
use anyhow::{anyhow, bail, Context};
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing::level_filters::LevelFilter;
use packet_hunter_lib::tools::SubprocessRunner;
use packet_hunter_lib::{PacketHunter, RunReport};
use packet_hunter_schemas::cli_models::{HuntSettings, Opts};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    std::process::exit(match run_app().await {
        Ok(_) => 0,
        Err(err) => {
            tracing::error!("ERROR: {}", err);
            err.chain().skip(1).for_each(|cause| tracing::error!("because: {}", cause));
            1
        }
    });
}

fn log_level(s: &str) -> anyhow::Result<LevelFilter> {
    match s.to_lowercase().as_str() {
        "error" => Ok(LevelFilter::ERROR),
        "warn" => Ok(LevelFilter::WARN),
        "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "trace" => Ok(LevelFilter::TRACE),
        _ => Err(anyhow!("Unknown Log LevelFilter {}", s)),
    }
}

/// Exit code for a clap error, `--help` and `--version` are not failures.
fn usage_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        // a missing input or destination is a usage error, not a crash
        _ => 1,
    }
}

fn parse_opts() -> Opts {
    match Opts::try_parse() {
        Ok(opts) => opts,
        Err(err) => {
            let _ = err.print();
            std::process::exit(usage_exit_code(err.kind()));
        }
    }
}

/// Tool failures only fail the run when `--strict` is given.
fn check_report(strict: bool, report: &RunReport) -> anyhow::Result<()> {
    if strict && !report.is_clean() {
        bail!("{} tshark/mergecap invocation(s) failed", report.failures.len());
    }
    Ok(())
}

/// Parse the CLI options, set up logging and run the hunt. Only problems with the inputs are
/// errors unless `--strict` is given, then failed tshark or mergecap runs are errors too.
pub async fn run_app() -> anyhow::Result<()> {
    let opts = parse_opts();
    let mut e = None;
    // Determine and set log level
    let level = match &opts.verbosity {
        None => LevelFilter::INFO,
        Some(x) => match log_level(x) {
            Ok(l) => l,
            Err(err) => {
                e = Some(err);
                LevelFilter::INFO
            }
        },
    };

    let stdout_log = tracing_subscriber::fmt::layer();
    tracing_subscriber::registry()
        .with(stdout_log.with_filter(level))
        .init();
    if let Some(e) = e {
        tracing::warn!("{}", e);
    }

    let settings = HuntSettings::from(&opts);
    let mut hunter = PacketHunter::new(
        opts.source.clone(),
        opts.destination.clone(),
        opts.config.clone(),
        opts.filters.as_deref(),
        settings,
        Arc::new(SubprocessRunner),
    )
        .await
        .context("setting up packet hunt")?;

    let report = hunter.run()
        .await
        .context("running packet hunt")?;

    check_report(opts.strict, &report)
}

#[cfg(test)]
mod tests {
    use packet_hunter_lib::HunterError;
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level("DEBUG").unwrap(), LevelFilter::DEBUG);
        assert_eq!(log_level("warn").unwrap(), LevelFilter::WARN);
        assert!(log_level("loud").is_err());
    }

    #[test]
    fn test_usage_exit_code() {
        let missing_destination = Opts::try_parse_from(["packet-hunter", "-i", "capture.pcapng"]).unwrap_err();
        assert_eq!(usage_exit_code(missing_destination.kind()), 1);
        let missing_input = Opts::try_parse_from(["packet-hunter", "-d", "out"]).unwrap_err();
        assert_eq!(usage_exit_code(missing_input.kind()), 1);
        let help = Opts::try_parse_from(["packet-hunter", "--help"]).unwrap_err();
        assert_eq!(usage_exit_code(help.kind()), 0);
        let version = Opts::try_parse_from(["packet-hunter", "--version"]).unwrap_err();
        assert_eq!(usage_exit_code(version.kind()), 0);
    }

    #[test]
    fn test_check_report() {
        let clean = RunReport::default();
        assert!(check_report(true, &clean).is_ok());
        assert!(check_report(false, &clean).is_ok());

        let failed = RunReport {
            failures: vec![HunterError::ToolFailed {
                tool: "tshark".to_string(),
                status: Some(2),
                stderr: "tshark: The file \"capture.pcapng\" doesn't exist.".to_string(),
            }],
            ..Default::default()
        };
        let err = check_report(true, &failed).unwrap_err();
        assert_eq!(err.to_string(), "1 tshark/mergecap invocation(s) failed");
        assert!(check_report(false, &failed).is_ok());
    }
}
