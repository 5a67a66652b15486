//! Page executor trait, request options and error types

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a single page round trip
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("Evaluation of '{expression}' failed: {message}")]
    Evaluation { expression: String, message: String },

    #[error("In-page fetch of {url} failed: {message}")]
    Fetch { url: String, message: String },

    #[error("No page has been loaded yet")]
    NoPage,

    #[error("Invalid selector '{0}'")]
    Selector(String),

    #[error("Failed to decode value: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for executor operations
pub type ExecResult<T> = Result<T, ExecError>;

/// Capability surface of one remote page session
///
/// A session represents a single browser tab: callers must not issue a new
/// round trip before the previous one has completed.
#[async_trait]
pub trait PageExecutor: Send + Sync {
    /// Loads a page and makes it the current document
    async fn navigate(&self, url: &str) -> ExecResult<()>;

    /// Polls until the named page-global is defined or `timeout` elapses
    async fn wait_for_global_defined(
        &self,
        name: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> ExecResult<()>;

    /// Evaluates an expression in the current page
    async fn evaluate(&self, expression: &str) -> ExecResult<Value>;

    /// Performs an HTTP request from inside the page's authenticated session
    /// and returns the raw response body
    async fn fetch_in_page(&self, url: &str, options: &FetchOptions) -> ExecResult<String>;

    /// Waits until an element matching `selector` is present in the page
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> ExecResult<()>;

    /// Returns the inner markup of every element matching `selector`
    async fn inner_html(&self, selector: &str) -> ExecResult<Vec<String>>;
}

/// Evaluates an expression and decodes the result into `T`
pub async fn evaluate_into<T, E>(executor: &E, expression: &str) -> ExecResult<T>
where
    T: DeserializeOwned,
    E: PageExecutor + ?Sized,
{
    let value = executor.evaluate(expression).await?;
    Ok(serde_json::from_value(value)?)
}

/// Request body encoding for in-page fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Json,
    Form,
}

impl BodyEncoding {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json; charset=UTF-8",
            Self::Form => "application/x-www-form-urlencoded; charset=UTF-8",
        }
    }
}

/// Authenticated session state carried explicitly into every fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// CSRF token; `None` when CSRF mode is disabled
    pub csrf_token: Option<String>,
}

impl Session {
    pub fn with_csrf_token(token: impl Into<String>) -> Self {
        Self {
            csrf_token: Some(token.into()),
        }
    }
}

/// Options for [`PageExecutor::fetch_in_page`]
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub method: String,
    pub encoding: BodyEncoding,
    pub body: Option<Map<String, Value>>,
    pub credentials_included: bool,
    pub headers: Vec<(String, String)>,
}

impl FetchOptions {
    /// A credentialed POST with a form-urlencoded body
    pub fn post_form(body: Option<Map<String, Value>>) -> Self {
        Self {
            method: "POST".to_string(),
            encoding: BodyEncoding::Form,
            body,
            credentials_included: true,
            headers: Vec::new(),
        }
    }

    /// A credentialed POST with a JSON body
    pub fn post_json(body: Map<String, Value>) -> Self {
        Self {
            method: "POST".to_string(),
            encoding: BodyEncoding::Json,
            body: Some(body),
            credentials_included: true,
            headers: Vec::new(),
        }
    }

    /// Attaches the CSRF header pair when the session carries a token
    pub fn with_session(mut self, session: &Session) -> Self {
        if let Some(token) = &session.csrf_token {
            self.headers
                .push(("x-csrf-token".to_string(), token.clone()));
            self.headers
                .push(("X-Requested-With".to_string(), "XMLHttpRequest".to_string()));
        }
        self
    }

    /// Encodes the body according to `encoding`
    ///
    /// Form values are rendered as plain text: strings verbatim, `null` as
    /// empty, everything else as its JSON text (so an empty list is `[]`).
    /// Keys are emitted in sorted order.
    pub fn encoded_body(&self) -> String {
        let Some(body) = &self.body else {
            return String::new();
        };
        match self.encoding {
            BodyEncoding::Json => Value::Object(body.clone()).to_string(),
            BodyEncoding::Form => {
                let mut entries: Vec<_> = body.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));

                let mut serializer = url::form_urlencoded::Serializer::new(String::new());
                for (key, value) in entries {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    serializer.append_pair(key, &text);
                }
                serializer.finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body() -> Map<String, Value> {
        match json!({
            "b_list": [],
            "a_text": "x y",
            "c_flag": true,
            "d_null": null,
            "e_num": -11
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_form_encoding() {
        let options = FetchOptions::post_form(Some(body()));
        assert_eq!(
            options.encoded_body(),
            "a_text=x+y&b_list=%5B%5D&c_flag=true&d_null=&e_num=-11"
        );
    }

    #[test]
    fn test_json_encoding() {
        let options = FetchOptions::post_json(body());
        let decoded: Value = serde_json::from_str(&options.encoded_body()).unwrap();
        assert_eq!(decoded["e_num"], -11);
        assert_eq!(decoded["b_list"], json!([]));
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(FetchOptions::post_form(None).encoded_body(), "");
    }

    #[test]
    fn test_csrf_headers_only_with_token() {
        let plain = FetchOptions::post_form(None).with_session(&Session::default());
        assert!(plain.headers.is_empty());

        let secured = FetchOptions::post_form(None).with_session(&Session::with_csrf_token("t0k"));
        assert!(secured
            .headers
            .contains(&("x-csrf-token".to_string(), "t0k".to_string())));
        assert!(secured
            .headers
            .contains(&("X-Requested-With".to_string(), "XMLHttpRequest".to_string())));
    }
}
