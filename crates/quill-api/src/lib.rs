//! HTTP client for the Quill blog platform API.
//!
//! This crate provides:
//! - The [`HttpClient`] trait the session store talks through
//! - [`ReqwestClient`], the production implementation, with a bearer
//!   interceptor that reads the current token from durable storage at
//!   send time
//! - The [`ApiError`] taxonomy separating application errors (response
//!   received) from transport and request-construction failures

mod client;
mod error;

pub use client::{ApiRequest, ApiResponse, HttpClient, ReqwestClient, TokenSource};
pub use error::{ApiError, ApiResult};

pub use reqwest::Method;
