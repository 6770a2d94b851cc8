use std::borrow::Cow;

use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, USER_AGENT};
use reqwest::Method;

use crate::cloudflare::requests::{Request, UA};

/// External hosts probed alongside the endpoint's trace route.
///
/// Favicons are tiny and served from well-provisioned edges, which
/// keeps the samples dominated by network latency rather than server
/// time.
const FAVICON_TARGETS: [&str; 4] = [
    "https://www.google.com/favicon.ico",
    "https://www.cloudflare.com/favicon.ico",
    "https://www.microsoft.com/favicon.ico",
    "https://www.apple.com/favicon.ico",
];

/// One latency sample: a HEAD request against a probe target.
#[derive(Debug, Clone)]
pub struct Ping {
    endpoint: String,
}

impl Ping {
    /// Probe target for the nth sample.
    ///
    /// Samples cycle round-robin through the endpoint's trace route
    /// followed by the favicon targets. The trace route gets a nonce
    /// query parameter as an extra cache buster.
    pub fn nth(sample: usize, nonce: u64) -> Self {
        let endpoint = match sample % (FAVICON_TARGETS.len() + 1) {
            0 => format!("/cdn-cgi/trace?_={}", nonce),
            n => FAVICON_TARGETS[n - 1].to_string(),
        };

        Self { endpoint }
    }
}

impl Request for Ping {
    type Body = &'static str;

    const METHOD: Method = Method::HEAD;

    fn endpoint(&self) -> Cow<str> {
        Cow::from(self.endpoint.as_str())
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_static(UA));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

        headers
    }
}
