//! 重定向解析：Location 解析与同域判断

use url::Url;

/// 以当前 URL 为基准解析 Location
/// 支持绝对 URL、`//host/...`、`/path` 及相对路径；非 http(s) 目标返回 None
pub fn resolve_location(current: &Url, location: &str) -> Option<Url> {
    let location = location.trim();
    if location.is_empty() {
        return None;
    }
    let next = current.join(location).ok()?;
    match next.scheme() {
        "http" | "https" => Some(next),
        _ => None,
    }
}

/// 把探针路径拼接到目标 URL 上（目标末尾的单个 `/` 被去掉）
pub fn join_probe_path(base: &str, path: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    if path.is_empty() || path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// 主机名相同（忽略大小写、端口与协议差异）
pub fn is_same_host(current: &Url, next: &Url) -> bool {
    match (current.host_str(), next.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}
