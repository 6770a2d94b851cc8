use std::borrow::Cow;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, USER_AGENT};
use reqwest::Method;

use crate::cloudflare::requests::{Request, RequestBody, UA};

/// One upload burst against the `/__up` endpoint.
///
/// The payload is a run of ASCII zeroes; only its size matters for
/// the measurement.
pub struct Upload {
    data: String,
    tag: u64,
}

impl Upload {
    pub fn new(bytes: u64, tag: u64) -> Self {
        Self { data: "0".repeat(bytes as usize), tag }
    }

    /// Size of the payload this request carries.
    pub fn payload_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

impl Request for Upload {
    type Body = String;

    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<str> {
        format!("/__up?_={}", self.tag).into()
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_static(UA));
        headers.insert(CONTENT_LENGTH, self.data.len().into());

        headers
    }

    fn body(&self) -> RequestBody<Self::Body> {
        RequestBody::Text(self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_all_zeroes() {
        let upload = Upload::new(16, 7);
        assert_eq!(upload.payload_bytes(), 16);
        assert_eq!(upload.data, "0".repeat(16));
    }

    #[test]
    fn test_endpoint_carries_tag() {
        let upload = Upload::new(8, 99);
        assert_eq!(upload.endpoint(), "/__up?_=99");
    }

    #[test]
    fn test_content_length_matches_payload() {
        let upload = Upload::new(1024, 1);
        let headers = upload.headers();
        assert_eq!(headers.get(CONTENT_LENGTH).unwrap(), "1024");
    }
}
