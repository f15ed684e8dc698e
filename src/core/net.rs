// src/core/net.rs
//
// Plain blocking GET. Status codes the guild site uses for "go away" map to
// `Blocked`; everything else non-2xx is an `Http` error.

use std::time::Duration;

use crate::error::FetchError;

pub struct HttpConfig<'a> {
    pub user_agent: &'a str,
    pub timeout: Duration,
}

pub fn http_get(url: &str, cfg: &HttpConfig) -> Result<String, FetchError> {
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(cfg.timeout)
        .timeout_read(cfg.timeout)
        .timeout_write(cfg.timeout)
        .user_agent(cfg.user_agent)
        .build();

    tracing::debug!(url, "GET");

    match agent.get(url).call() {
        Ok(resp) => resp.into_string().map_err(FetchError::Io),
        Err(ureq::Error::Status(code, _resp)) => Err(classify_status(code, url)),
        Err(err) => Err(FetchError::Http(format!("request failed: {err}"))),
    }
}

fn classify_status(code: u16, url: &str) -> FetchError {
    match code {
        404 => FetchError::NotFound(s!(url)),
        403 | 429 | 503 => FetchError::Blocked(format!("HTTP {code}")),
        _ => FetchError::Http(format!("HTTP {code} {url}")),
    }
}
