//! Remote page session abstraction
//!
//! The crawl engine never talks HTTP directly. Every navigation, page-global
//! read and authenticated request goes through a [`PageExecutor`], which
//! models one browser tab driven one round trip at a time.

mod http;
pub mod script;
mod traits;

pub use http::{build_http_client, HttpPageExecutor, DEFAULT_USER_AGENT};
pub use traits::{
    evaluate_into, BodyEncoding, ExecError, ExecResult, FetchOptions, PageExecutor, Session,
};
