//! HTTP client module
//!
//! Provides the single-attempt HTTP client shared by the delimited and report
//! extractors and the catalog loader.
//!
//! # Features
//!
//! - **Timeouts**: client-wide default with per-request override
//! - **Credentials**: HTTP Basic and default headers (app tokens)
//! - **Verbatim errors**: non-2xx bodies are kept for the caller to log

mod client;

pub use client::{
    HttpAuth, HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig,
    DEFAULT_TIMEOUT,
};
