//! HTTP-backed page executor
//!
//! Navigation is a plain GET that keeps the returned document as the current
//! page. Page-globals are read from inline script assignments and selectors
//! are evaluated with `scraper`. Waiting means re-loading the current page
//! until the condition holds or the deadline passes.

use crate::config::SessionConfig;
use crate::executor::script::{parse_path, resolve_global};
use crate::executor::{ExecError, ExecResult, FetchOptions, PageExecutor};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE};
use reqwest::{Client, Method};
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Default user agent when the configuration does not set one
pub const DEFAULT_USER_AGENT: &str = concat!("tracker-atlas/", env!("CARGO_PKG_VERSION"));

/// Document currently loaded in the session
#[derive(Debug, Clone)]
struct LoadedPage {
    url: Url,
    body: String,
}

/// Page executor over a reqwest client
pub struct HttpPageExecutor {
    client: Client,
    cookie: Option<String>,
    page: Mutex<Option<LoadedPage>>,
}

/// Builds the HTTP client used for every page round trip
///
/// # Arguments
///
/// * `config` - Session settings (user agent)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &SessionConfig) -> Result<Client, reqwest::Error> {
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

impl HttpPageExecutor {
    /// Creates an executor with no page loaded
    pub fn new(config: &SessionConfig) -> crate::Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            cookie: config.cookie.clone().filter(|c| !c.trim().is_empty()),
            page: Mutex::new(None),
        })
    }

    fn current(&self) -> ExecResult<LoadedPage> {
        self.page
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ExecError::NoPage)
    }

    /// Resolves `target` against the current page when it is relative
    fn resolve_url(&self, target: &str) -> ExecResult<Url> {
        match Url::parse(target) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.current()?.url;
                base.join(target).map_err(|e| ExecError::Navigation {
                    url: target.to_string(),
                    message: e.to_string(),
                })
            }
            Err(e) => Err(ExecError::Navigation {
                url: target.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn credentials(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.cookie {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        }
    }

    async fn load(&self, url: Url) -> ExecResult<()> {
        let navigation_error = |message: String| ExecError::Navigation {
            url: url.to_string(),
            message,
        };

        tracing::debug!(url = %url, "Loading page");
        let response = self
            .credentials(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(navigation_error(format!("HTTP {}", status.as_u16())));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        *self.page.lock().unwrap_or_else(PoisonError::into_inner) = Some(LoadedPage {
            url: final_url,
            body,
        });
        Ok(())
    }

    async fn reload(&self) -> ExecResult<()> {
        let url = self.current()?.url;
        self.load(url).await
    }
}

/// Returns the inner markup of every match of `selector` in `body`
fn select_inner_html(body: &str, selector: &str) -> ExecResult<Vec<String>> {
    let parsed = Selector::parse(selector).map_err(|_| ExecError::Selector(selector.to_string()))?;
    let document = Html::parse_document(body);
    Ok(document.select(&parsed).map(|el| el.inner_html()).collect())
}

fn header_pair(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
    let value = HeaderValue::from_str(value).ok()?;
    Some((name, value))
}

#[async_trait]
impl PageExecutor for HttpPageExecutor {
    async fn navigate(&self, url: &str) -> ExecResult<()> {
        let url = self.resolve_url(url)?;
        self.load(url).await
    }

    async fn wait_for_global_defined(
        &self,
        name: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> ExecResult<()> {
        let path = parse_path(name).map_err(|message| ExecError::Evaluation {
            expression: name.to_string(),
            message,
        })?;
        let deadline = Instant::now() + timeout;

        loop {
            if resolve_global(&self.current()?.body, &path).is_some() {
                return Ok(());
            }
            if Instant::now() + poll_interval > deadline {
                return Err(ExecError::Timeout {
                    what: format!("global '{}'", name),
                    after: timeout,
                });
            }
            tokio::time::sleep(poll_interval).await;
            self.reload().await?;
        }
    }

    async fn evaluate(&self, expression: &str) -> ExecResult<Value> {
        let evaluation_error = |message: String| ExecError::Evaluation {
            expression: expression.to_string(),
            message,
        };
        let path = parse_path(expression).map_err(evaluation_error)?;
        let page = self.current()?;
        resolve_global(&page.body, &path)
            .ok_or_else(|| evaluation_error(format!("'{}' is undefined", expression)))
    }

    async fn fetch_in_page(&self, url: &str, options: &FetchOptions) -> ExecResult<String> {
        let fetch_error = |message: String| ExecError::Fetch {
            url: url.to_string(),
            message,
        };
        let target = self.resolve_url(url)?;
        let method = Method::from_bytes(options.method.as_bytes())
            .map_err(|e| fetch_error(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(options.encoding.content_type()),
        );
        for (name, value) in &options.headers {
            match header_pair(name, value) {
                Some((name, value)) => {
                    headers.insert(name, value);
                }
                None => tracing::warn!(header = %name, "Skipping invalid request header"),
            }
        }

        let mut request = self.client.request(method, target).headers(headers);
        if options.credentials_included {
            request = self.credentials(request);
        }
        if options.body.is_some() {
            request = request.body(options.encoded_body());
        }

        let response = request.send().await.map_err(|e| fetch_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status.as_u16())));
        }
        response.text().await.map_err(|e| fetch_error(e.to_string()))
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> ExecResult<()> {
        let deadline = Instant::now() + timeout;
        // Re-poll at a tenth of the budget, bounded to keep request volume sane
        let poll_interval = (timeout / 10).clamp(Duration::from_millis(50), Duration::from_secs(2));

        loop {
            if !select_inner_html(&self.current()?.body, selector)?.is_empty() {
                return Ok(());
            }
            if Instant::now() + poll_interval > deadline {
                return Err(ExecError::Timeout {
                    what: format!("selector '{}'", selector),
                    after: timeout,
                });
            }
            tokio::time::sleep(poll_interval).await;
            self.reload().await?;
        }
    }

    async fn inner_html(&self, selector: &str) -> ExecResult<Vec<String>> {
        select_inner_html(&self.current()?.body, selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionConfig {
        SessionConfig {
            csrf: false,
            csrf_token_expression: String::new(),
            cookie: Some("JSESSIONID=abc".to_string()),
            user_agent: None,
        }
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&session()).is_ok());
    }

    #[test]
    fn test_bad_user_agent_is_an_http_error() {
        let mut config = session();
        config.user_agent = Some("atlas\nbroken".to_string());
        assert!(matches!(
            HttpPageExecutor::new(&config),
            Err(crate::AtlasError::Http(_))
        ));
    }

    #[test]
    fn test_select_inner_html() {
        let body = r#"<div class="c"><b>one</b></div><div class="c">two</div>"#;
        let found = select_inner_html(body, "div.c").unwrap();
        assert_eq!(found, vec!["<b>one</b>".to_string(), "two".to_string()]);
        assert!(select_inner_html(body, "span").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            select_inner_html("<p></p>", "div[["),
            Err(ExecError::Selector(_))
        ));
    }

    #[tokio::test]
    async fn test_operations_require_a_page() {
        let executor = HttpPageExecutor::new(&session()).unwrap();
        assert!(matches!(
            executor.evaluate("tree.config.data").await,
            Err(ExecError::NoPage)
        ));
        assert!(matches!(
            executor.navigate("/relative").await,
            Err(ExecError::NoPage)
        ));
    }
}
