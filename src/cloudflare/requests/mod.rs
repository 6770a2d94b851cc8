//! Request definitions for the measurement endpoint.

pub mod chunk;
pub mod ping;
pub mod upload;

use std::borrow::Cow;

use http::Method;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

/// User agent sent with every measurement request.
pub const UA: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Body attached to a request, if any.
pub enum RequestBody<T> {
    None,
    Text(T),
}

/// A request against the measurement endpoint.
///
/// Implementations describe the endpoint path, method, headers, and
/// body; the client turns them into actual HTTP traffic.
pub trait Request {
    type Body: Into<reqwest::Body>;

    const METHOD: Method = Method::GET;

    /// Path and query relative to the endpoint base. Absolute URLs
    /// are passed through untouched.
    fn endpoint(&self) -> Cow<str>;

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(UA));
        headers
    }

    fn body(&self) -> RequestBody<Self::Body> {
        RequestBody::None
    }
}

impl<R: Request> Request for &R {
    type Body = R::Body;

    const METHOD: Method = R::METHOD;

    fn endpoint(&self) -> Cow<str> {
        (**self).endpoint()
    }

    fn headers(&self) -> HeaderMap {
        (**self).headers()
    }

    fn body(&self) -> RequestBody<Self::Body> {
        (**self).body()
    }
}

impl<R: Request> Request for &mut R {
    type Body = R::Body;

    const METHOD: Method = R::METHOD;

    fn endpoint(&self) -> Cow<str> {
        (**self).endpoint()
    }

    fn headers(&self) -> HeaderMap {
        (**self).headers()
    }

    fn body(&self) -> RequestBody<Self::Body> {
        (**self).body()
    }
}
