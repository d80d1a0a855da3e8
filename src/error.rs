//! 全局错误类型定义

use thiserror::Error;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use url::ParseError as UrlParseError;

/// 致命网络错误特征串（域名解析失败 / 网络不可达）
const FATAL_NETWORK_MARKERS: &[&str] = &[
    "no such host",
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "nodename nor servname provided",
    "network is unreachable",
    "network unreachable",
];

#[derive(Error, Debug)]
pub enum TechDetectError {
    // 规则相关错误
    #[error("Failed to load rules: {0}")]
    RuleLoadError(String),
    #[error("Failed to parse rules: {0}")]
    RuleParseError(String),

    // 检测相关错误
    #[error("Detector not initialized")]
    DetectorNotInitialized,
    #[error("Augmentation failed: {0}")]
    AugmentError(String),

    // 网络相关错误
    #[error("Network request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Request timed out: {0}")]
    RequestTimeout(String),
    #[error("Host unreachable: {0}")]
    HostUnreachable(String),
    #[error("Failed after {retries} retries: {source}")]
    RetryExhausted {
        retries: u32,
        #[source]
        source: Box<TechDetectError>,
    },

    // 序列化/反序列化错误
    #[error("JSON parse failed: {0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO operation failed: {0}")]
    IoError(#[from] IoError),
    #[error("URL parse failed: {0}")]
    UrlError(#[from] UrlParseError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TechDetectError {
    /// 将 reqwest 错误归类：超时 / 致命网络错误 / 普通请求错误
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::RequestTimeout(error_chain(&err));
        }
        let chain = error_chain(&err);
        if is_fatal_network_message(&chain) {
            return Self::HostUnreachable(chain);
        }
        Self::HttpError(err)
    }

    /// 是否为目标级致命网络错误（命中后同一目标的剩余路径直接判失败）
    pub fn is_fatal_network(&self) -> bool {
        match self {
            Self::HostUnreachable(_) => true,
            Self::RetryExhausted { source, .. } => source.is_fatal_network(),
            _ => false,
        }
    }
}

/// 展开错误链（reqwest 的顶层信息不含底层 DNS/IO 原因）
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

fn is_fatal_network_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    FATAL_NETWORK_MARKERS.iter().any(|marker| lower.contains(marker))
}

// 全局Result类型
pub type TdResult<T> = Result<T, TechDetectError>;
