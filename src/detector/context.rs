//! 检测上下文：单个路径抓取（含重定向链）累积出的响应数据

/// 检测上下文
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionContext {
    /// 重定向链上所有非空响应体按遍历顺序以换行拼接
    pub body: String,
    /// 每个 Header 名首次出现的值，按出现顺序保存
    headers: Vec<(String, String)>,
    /// 最后一跳的状态码
    pub status: u16,
}

impl DetectionContext {
    pub fn new(body: impl Into<String>, status: u16) -> Self {
        Self {
            body: body.into(),
            headers: Vec::new(),
            status,
        }
    }

    /// 大小写不敏感地查找 Header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// 仅在该 Header 名尚未出现时记录（先到先得）
    pub fn insert_header_if_absent(&mut self, name: &str, value: &str) -> bool {
        if self.header(name).is_some() {
            return false;
        }
        self.headers.push((name.to_string(), value.to_string()));
        true
    }

    /// 链式构造（测试与外部抓取器使用）
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.insert_header_if_absent(name, value);
        self
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_header_wins_case_insensitively() {
        let mut ctx = DetectionContext::new("", 200);
        assert!(ctx.insert_header_if_absent("Server", "nginx"));
        assert!(!ctx.insert_header_if_absent("server", "apache"));
        assert_eq!(ctx.header("SERVER"), Some("nginx"));
        assert_eq!(ctx.headers().next(), Some(("Server", "nginx")));
        assert_eq!(ctx.header("x-missing"), None);
    }
}
