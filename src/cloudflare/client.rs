use std::time::Duration;

use reqwest::{Body, Client as ReqwestClient, RequestBuilder, Response};
use url::Url;

use crate::cloudflare::requests::{Request, RequestBody, UA};
use crate::errors::SpeedTestError;

/// Default measurement endpoint.
pub static DEFAULT_BASE_URL: &str = "https://speed.cloudflare.com";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the measurement endpoint.
///
/// Wraps a single connection-pooling reqwest client; parallel
/// measurement streams all clone this handle.
#[derive(Debug, Clone)]
pub struct Client {
    base: Url,
    client: ReqwestClient,
}

impl Client {
    /// Create a client for the given endpoint base URL.
    pub fn new(base_url: &str) -> Result<Self, SpeedTestError> {
        let base = Url::parse(base_url).map_err(|e| {
            SpeedTestError::config(format!(
                "invalid endpoint URL {:?}: {}",
                base_url, e
            ))
        })?;

        let client = ReqwestClient::builder()
            .user_agent(UA)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                SpeedTestError::from_reqwest("could not build HTTP client", e)
            })?;

        Ok(Self { base, client })
    }

    /// Hostname of the measurement endpoint.
    pub fn host(&self) -> &str {
        self.base.host_str().unwrap_or("unknown")
    }

    /// Execute a request and return the raw response.
    ///
    /// The response body is left untouched so callers can stream it;
    /// error statuses are converted to errors before the body is
    /// read. Relative endpoints resolve against the base URL while
    /// absolute ones replace it.
    pub async fn execute<R: Request>(
        &self,
        request: &R,
    ) -> Result<Response, SpeedTestError> {
        let endpoint = request.endpoint();
        let url = self.base.join(&endpoint).map_err(|e| {
            SpeedTestError::config(format!(
                "invalid request target {:?}: {}",
                endpoint, e
            ))
        })?;

        let response = self
            .client
            .request(R::METHOD, url)
            .headers(request.headers())
            .request_body(request.body())
            .send()
            .await
            .map_err(|e| SpeedTestError::from_reqwest("request failed", e))?
            .error_for_status()
            .map_err(|e| {
                SpeedTestError::from_reqwest("endpoint rejected request", e)
            })?;

        Ok(response)
    }
}

trait RequestBuilderExt: Sized {
    fn request_body<T: Into<Body>>(self, body: RequestBody<T>) -> Self;
}

impl RequestBuilderExt for RequestBuilder {
    fn request_body<T: Into<Body>>(self, body: RequestBody<T>) -> Self {
        match body {
            RequestBody::None => self,
            RequestBody::Text(value) => self.body(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudflare::requests::chunk::Chunk;
    use crate::cloudflare::requests::ping::Ping;
    use crate::cloudflare::requests::upload::Upload;
    use crate::errors::ErrorKind;
    use wiremock::matchers::{body_string, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_new_rejects_invalid_base_url() {
        let result = Client::new("not a url");
        assert!(matches!(result, Err(e) if e.kind == ErrorKind::Config));
    }

    #[test]
    fn test_host_comes_from_base_url() {
        let client = Client::new("https://speed.cloudflare.com").unwrap();
        assert_eq!(client.host(), "speed.cloudflare.com");
    }

    #[tokio::test]
    async fn test_execute_chunk_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/__down"))
            .and(query_param("bytes", "1024"))
            .and(query_param("_", "5"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(vec![0u8; 1024]),
            )
            .mount(&server)
            .await;

        let client = Client::new(&server.uri()).unwrap();
        let response = client.execute(&Chunk::new(1024, 5)).await.unwrap();
        let body = response.bytes().await.unwrap();
        assert_eq!(body.len(), 1024);
    }

    #[tokio::test]
    async fn test_execute_upload_sends_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/__up"))
            .and(body_string("0".repeat(32)))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = Client::new(&server.uri()).unwrap();
        let upload = Upload::new(32, 9);
        assert!(client.execute(&upload).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_ping_uses_head() {
        let server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .and(path("/cdn-cgi/trace"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = Client::new(&server.uri()).unwrap();
        assert!(client.execute(&Ping::nth(0, 1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_surfaces_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/__down"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = Client::new(&server.uri()).unwrap();
        let result = client.execute(&Chunk::new(64, 1)).await;
        assert!(matches!(result, Err(e) if e.kind == ErrorKind::Http));
    }
}
