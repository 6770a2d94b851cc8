use std::borrow::Cow;

use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, USER_AGENT};

use crate::cloudflare::requests::{Request, UA};

/// One download chunk from the `/__down` endpoint.
///
/// The tag is a per-request uniquifier appended to the query string
/// so intermediate caches never serve a previous chunk.
#[derive(Debug, Clone, Copy)]
pub struct Chunk {
    bytes: u64,
    tag: u64,
}

impl Chunk {
    pub fn new(bytes: u64, tag: u64) -> Self {
        Self { bytes, tag }
    }
}

impl Request for Chunk {
    type Body = &'static str;

    fn endpoint(&self) -> Cow<str> {
        format!("/__down?bytes={}&_={}", self.bytes, self.tag).into()
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_static(UA));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        headers
    }
}
