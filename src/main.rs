use std::io::{BufRead, IsTerminal};

use anyhow::{Context, Result, bail};
use clap::Parser;
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use techdetect::TechDetector;
use techdetect::cli::{
    BatchResults, Cli, OutputFormat, ScanResult, collect_targets, render_json, render_line, render_text,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut targets = cli.targets();
    if targets.is_empty() && !std::io::stdin().is_terminal() {
        targets = read_stdin_targets().context("failed to read targets from stdin")?;
    }
    if targets.is_empty() {
        bail!("no target URL given (pass URLs as arguments, with --url, or on stdin)");
    }

    let mode = cli.mode();
    let config = cli.to_config();
    let detector = match TechDetector::new(config).await {
        Ok(detector) => detector,
        Err(e) => {
            error!("Failed to initialise detector: {}", e);
            let results = targets.iter().map(|url| ScanResult::failure(url, mode, &e)).collect();
            emit_all(cli.format, results)?;
            std::process::exit(1);
        }
    };
    if mode.include_augmentation() {
        warn!("No script runtime is bundled with the CLI, --full reports HTTP results only");
    }
    info!("Scanning {} target(s) with concurrency {}", targets.len(), cli.concurrency.max(1));

    let detector = &detector;
    let mut scans = stream::iter(targets)
        .map(|url| async move {
            match detector.detect(&url, mode.include_augmentation()).await {
                Ok(result) => ScanResult::success(&url, mode, &result, detector.store()),
                Err(e) => {
                    warn!("Detection failed for {}: {}", url, e);
                    ScanResult::failure(&url, mode, e)
                }
            }
        })
        .buffered(cli.concurrency.max(1));

    let mut results = Vec::new();
    while let Some(result) = scans.next().await {
        match cli.format {
            OutputFormat::Jsonl => println!("{}", render_line(&result)?),
            OutputFormat::Text => print!("{}", render_text(&result)),
            OutputFormat::Json => {}
        }
        results.push(result);
    }
    if cli.format == OutputFormat::Json {
        println!("{}", render_json(&BatchResults { results })?);
    }

    Ok(())
}

/// 日志输出到 stderr，stdout 只留结果
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_stdin_targets() -> Result<Vec<String>> {
    let lines = std::io::stdin().lock().lines().collect::<Result<Vec<_>, _>>()?;
    Ok(collect_targets(lines.iter().map(String::as_str)))
}

fn emit_all(format: OutputFormat, results: Vec<ScanResult>) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", render_json(&BatchResults { results })?),
        OutputFormat::Jsonl => {
            for result in &results {
                println!("{}", render_line(result)?);
            }
        }
        OutputFormat::Text => {
            for result in &results {
                eprint!("{}", render_text(result));
            }
        }
    }
    Ok(())
}
