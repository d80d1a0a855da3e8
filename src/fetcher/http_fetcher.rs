//! 基于 reqwest 的页面抓取器
//! 手动处理重定向：仅跟随同域跳转，并累积整条链上的响应体与 Header

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderName, HeaderValue, LOCATION};
use reqwest::{Client, Method, RequestBuilder, redirect::Policy};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::PageFetcher;
use super::redirect::{is_same_host, resolve_location};
use crate::config::GlobalConfig;
use crate::detector::DetectionContext;
use crate::error::{TdResult, TechDetectError};
use crate::rule::RequestConfig;
use crate::utils::HeaderConverter;

/// HTTP 抓取器
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_redirects: usize,
}

impl HttpFetcher {
    /// 按配置构建客户端（关闭自动重定向）
    pub fn new(config: &GlobalConfig) -> TdResult<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            max_redirects: config.max_redirects,
        })
    }

    fn build_request(&self, method: &Method, url: Url, request: &RequestConfig) -> TdResult<RequestBuilder> {
        let mut builder = self.client.request(method.clone(), url);

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TechDetectError::InvalidInput(format!("invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TechDetectError::InvalidInput(format!("invalid header value {:?}: {}", value, e)))?;
            builder = builder.header(name, value);
        }

        builder = match &request.body {
            None | Some(Value::Null) => builder,
            Some(Value::String(text)) => builder.body(text.clone()),
            Some(other) => {
                let builder = builder.body(other.to_string());
                if request.headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                    builder
                } else {
                    builder.header(CONTENT_TYPE, "application/json")
                }
            }
        };

        Ok(builder)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, request: &RequestConfig) -> TdResult<DetectionContext> {
        let mut current = Url::parse(url)?;
        let method = Method::from_bytes(request.method_name().as_bytes())
            .map_err(|e| TechDetectError::InvalidInput(format!("invalid method {:?}: {}", request.method, e)))?;

        let mut ctx = DetectionContext::default();
        let mut bodies: Vec<String> = Vec::new();
        let mut hops = 0;

        loop {
            let response = self
                .build_request(&method, current.clone(), request)?
                .send()
                .await
                .map_err(TechDetectError::from_request)?;

            let status = response.status();
            let location = response
                .headers()
                .get(LOCATION)
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
            HeaderConverter::merge_first_seen(response.headers(), &mut ctx);

            let body = response.text().await.map_err(TechDetectError::from_request)?;
            if !body.is_empty() {
                bodies.push(body);
            }
            ctx.status = status.as_u16();

            if !status.is_redirection() {
                break;
            }
            let Some(location) = location else {
                debug!("{} answered {} without Location, stop following", current, status);
                break;
            };
            if hops >= self.max_redirects {
                debug!("Redirect limit {} reached at {}", self.max_redirects, current);
                break;
            }
            let Some(next) = resolve_location(&current, &location) else {
                debug!("Unresolvable redirect target {:?} from {}", location, current);
                break;
            };
            if !is_same_host(&current, &next) {
                debug!("Cross-host redirect {} -> {} not followed", current, next);
                break;
            }

            current = next;
            hops += 1;
        }

        ctx.body = bodies.join("\n");
        Ok(ctx)
    }
}
