//! 命令行参数与输出格式

use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::path::PathBuf;

use crate::config::{ConfigManager, GlobalConfig};
use crate::detector::DetectResult;
use crate::error::TdResult;
use crate::rule::{RuleStore, Technology};

#[derive(Parser, Debug)]
#[command(name = "techdetect")]
#[command(version)]
#[command(about = "Detect web technologies by probing a site with declarative fingerprint rules", long_about = None)]
pub struct Cli {
    #[arg(help = "Target URLs. When none are given, URLs are read from stdin (one per line).")]
    pub urls: Vec<String>,

    #[arg(short = 'u', long = "url", help = "Additional target URL (repeatable)")]
    pub extra_urls: Vec<String>,

    #[arg(short = 'F', long, help = "Fingerprint rules: a JSON file or a directory of *.json files")]
    pub fingerprints: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value = "text", help = "Output format")]
    pub format: OutputFormat,

    #[arg(short = 'k', long, help = "Skip TLS certificate verification")]
    pub insecure: bool,

    #[arg(short = 'c', long, default_value_t = 4, help = "Number of targets processed concurrently")]
    pub concurrency: usize,

    #[arg(long, help = "Also run the augmentation stage when an augmenter is available")]
    pub full: bool,

    #[arg(short, long, help = "Enable debug logging")]
    pub verbose: bool,
}

impl Cli {
    /// 位置参数与 `--url` 合并，去掉空行与重复项（保持顺序）
    pub fn targets(&self) -> Vec<String> {
        collect_targets(self.urls.iter().chain(self.extra_urls.iter()).map(String::as_str))
    }

    pub fn to_config(&self) -> GlobalConfig {
        let mut builder = ConfigManager::custom().insecure_skip_verify(self.insecure);
        if let Some(path) = &self.fingerprints {
            builder = builder.fingerprints_path(path.clone());
        }
        builder.build()
    }

    pub fn mode(&self) -> ScanMode {
        if self.full { ScanMode::Full } else { ScanMode::HttpOnly }
    }
}

/// 清洗目标列表：去空白、跳过空行与 `#` 注释、去重
pub fn collect_targets<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !targets.iter().any(|t| t == line) {
            targets.push(line.to_string());
        }
    }
    targets
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    #[value(name = "text", help = "Human-readable listing")]
    Text,
    #[value(name = "json", help = "One JSON document with all results")]
    Json,
    #[value(name = "jsonl", help = "One JSON object per target, printed as it completes")]
    Jsonl,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    HttpOnly,
    Full,
}

impl ScanMode {
    pub fn include_augmentation(self) -> bool {
        matches!(self, ScanMode::Full)
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::HttpOnly => write!(f, "http_only"),
            ScanMode::Full => write!(f, "full"),
        }
    }
}

/// 单个目标的输出记录
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub url: String,
    pub technologies: Vec<Technology>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_paths: Vec<String>,
    pub mode: ScanMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResult {
    pub fn success(url: &str, mode: ScanMode, result: &DetectResult, store: &RuleStore) -> Self {
        Self {
            url: url.to_string(),
            technologies: result.to_technologies(store),
            failed_paths: result.failed_paths.clone(),
            mode,
            error: None,
        }
    }

    pub fn failure(url: &str, mode: ScanMode, error: impl fmt::Display) -> Self {
        Self {
            url: url.to_string(),
            technologies: Vec::new(),
            failed_paths: Vec::new(),
            mode,
            error: Some(error.to_string()),
        }
    }
}

/// JSON 格式的整体输出
#[derive(Debug, Clone, Serialize)]
pub struct BatchResults {
    pub results: Vec<ScanResult>,
}

pub fn render_json(results: &BatchResults) -> TdResult<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

pub fn render_line(result: &ScanResult) -> TdResult<String> {
    Ok(serde_json::to_string(result)?)
}

pub fn render_text(result: &ScanResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", result.url);
    if let Some(error) = &result.error {
        let _ = writeln!(out, "  error: {}", error);
        return out;
    }
    if result.technologies.is_empty() {
        let _ = writeln!(out, "  (no technologies detected)");
    }
    for tech in &result.technologies {
        let _ = writeln!(out, "  {}", tech);
    }
    if !result.failed_paths.is_empty() {
        let _ = writeln!(out, "  failed paths: {}", result.failed_paths.join(", "));
    }
    out
}
