//! Network identity lookup.
//!
//! Before measurements start, the probe resolves the public IP, ISP,
//! and approximate location of the connection through a geolocation
//! service. The probe never fails: lookup errors degrade to
//! placeholder values so a test can always run.

use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

use crate::cloudflare::requests::UA;
use crate::errors::SpeedTestError;
use crate::results::NetworkInfo;

const GEO_LOOKUP_URL: &str = "https://ipapi.co/json/";
const GEO_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

const VPN_PROVIDER: &str = "CyberGuard VPN";

// Map anchor used when the lookup returns no coordinates.
const FALLBACK_LATITUDE: f64 = 6.5244;
const FALLBACK_LONGITUDE: f64 = 3.3792;

/// Response payload from the geolocation service.
///
/// Every field is optional; the service omits fields it cannot
/// resolve.
#[derive(Debug, Deserialize)]
struct GeoLookup {
    ip: Option<String>,
    org: Option<String>,
    city: Option<String>,
    country_name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Resolves the network identity attached to test results.
#[derive(Debug, Clone)]
pub struct NetworkInfoProbe {
    lookup_url: String,
    simulate_vpn: bool,
}

impl NetworkInfoProbe {
    /// Create a probe against the default geolocation service.
    ///
    /// With `simulate_vpn` set, the probe skips the lookup entirely
    /// and reports a fixed VPN identity.
    pub fn new(simulate_vpn: bool) -> Self {
        Self { lookup_url: GEO_LOOKUP_URL.to_string(), simulate_vpn }
    }

    /// Override the geolocation service URL.
    pub fn with_lookup_url(mut self, url: impl Into<String>) -> Self {
        self.lookup_url = url.into();
        self
    }

    /// Resolve the network identity for this run.
    ///
    /// This never returns an error: lookup failures are logged and
    /// replaced with placeholder values.
    pub async fn probe(&self) -> NetworkInfo {
        if self.simulate_vpn {
            return Self::vpn_identity();
        }

        debug!("Looking up network info via {}", self.lookup_url);

        match self.lookup().await {
            Ok(info) => info,
            Err(error) => {
                warn!(
                    "Network info lookup failed, using placeholders: {}",
                    error
                );
                Self::placeholder()
            }
        }
    }

    async fn lookup(&self) -> Result<NetworkInfo, SpeedTestError> {
        let client = reqwest::Client::builder()
            .user_agent(UA)
            .timeout(GEO_LOOKUP_TIMEOUT)
            .build()
            .map_err(|e| {
                SpeedTestError::from_reqwest("could not build lookup client", e)
            })?;

        let payload: GeoLookup = client
            .get(&self.lookup_url)
            .send()
            .await
            .map_err(|e| {
                SpeedTestError::from_reqwest("network info lookup", e)
            })?
            .error_for_status()
            .map_err(|e| {
                SpeedTestError::from_reqwest("network info lookup", e)
            })?
            .json()
            .await
            .map_err(|e| {
                SpeedTestError::from_reqwest(
                    "could not parse network info response",
                    e,
                )
            })?;

        let location = match (payload.city, payload.country_name) {
            (Some(city), Some(country)) => format!("{}, {}", city, country),
            (Some(city), None) => city,
            (None, Some(country)) => country,
            (None, None) => "Unknown".to_string(),
        };

        Ok(NetworkInfo::new(
            payload.ip.unwrap_or_else(|| "N/A".to_string()),
            payload.org.unwrap_or_else(|| "Unknown ISP".to_string()),
            location,
            "wifi".to_string(),
            false,
            None,
            payload.latitude.unwrap_or(FALLBACK_LATITUDE),
            payload.longitude.unwrap_or(FALLBACK_LONGITUDE),
        ))
    }

    /// Fixed identity reported when VPN simulation is requested.
    fn vpn_identity() -> NetworkInfo {
        NetworkInfo::new(
            "10.8.0.1".to_string(),
            VPN_PROVIDER.to_string(),
            "Zurich, CH".to_string(),
            "VPN".to_string(),
            true,
            Some(VPN_PROVIDER.to_string()),
            47.3769,
            8.5417,
        )
    }

    /// Placeholder identity used when the lookup fails.
    fn placeholder() -> NetworkInfo {
        NetworkInfo::new(
            "N/A".to_string(),
            "N/A".to_string(),
            "N/A".to_string(),
            "unknown".to_string(),
            false,
            None,
            FALLBACK_LATITUDE,
            FALLBACK_LONGITUDE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_probe_parses_lookup_response() {
        let server = MockServer::start().await;
        let body = r#"{
            "ip": "198.51.100.14",
            "org": "Example Broadband",
            "city": "Porto",
            "country_name": "Portugal",
            "latitude": 41.1579,
            "longitude": -8.6291
        }"#;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let probe = NetworkInfoProbe::new(false)
            .with_lookup_url(format!("{}/json/", server.uri()));
        let info = probe.probe().await;

        assert_eq!(info.ip, "198.51.100.14");
        assert_eq!(info.isp, "Example Broadband");
        assert_eq!(info.location, "Porto, Portugal");
        assert_eq!(info.connection_type, "wifi");
        assert!(!info.vpn_active);
        assert!(info.vpn_provider.is_none());
        assert!((info.latitude - 41.1579).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_probe_fills_missing_fields() {
        let server = MockServer::start().await;
        let body = r#"{"ip": "198.51.100.14", "city": "Porto"}"#;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let probe = NetworkInfoProbe::new(false)
            .with_lookup_url(format!("{}/json/", server.uri()));
        let info = probe.probe().await;

        assert_eq!(info.isp, "Unknown ISP");
        assert_eq!(info.location, "Porto");
        assert!((info.latitude - FALLBACK_LATITUDE).abs() < 0.001);
        assert!((info.longitude - FALLBACK_LONGITUDE).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_probe_placeholder_on_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let probe = NetworkInfoProbe::new(false)
            .with_lookup_url(format!("{}/json/", server.uri()));
        let info = probe.probe().await;

        assert_eq!(info.ip, "N/A");
        assert_eq!(info.isp, "N/A");
        assert_eq!(info.location, "N/A");
        assert_eq!(info.connection_type, "unknown");
        assert!(!info.vpn_active);
        assert!((info.latitude - FALLBACK_LATITUDE).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_probe_placeholder_on_invalid_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("not json"),
            )
            .mount(&server)
            .await;

        let probe = NetworkInfoProbe::new(false)
            .with_lookup_url(format!("{}/json/", server.uri()));
        let info = probe.probe().await;

        assert_eq!(info.ip, "N/A");
        assert_eq!(info.connection_type, "unknown");
    }

    #[tokio::test]
    async fn test_simulate_vpn_reports_fixed_identity() {
        // No lookup service involved at all.
        let probe = NetworkInfoProbe::new(true)
            .with_lookup_url("http://127.0.0.1:1/json/".to_string());
        let info = probe.probe().await;

        assert_eq!(info.ip, "10.8.0.1");
        assert_eq!(info.isp, "CyberGuard VPN");
        assert_eq!(info.location, "Zurich, CH");
        assert_eq!(info.connection_type, "VPN");
        assert!(info.vpn_active);
        assert_eq!(info.vpn_provider.as_deref(), Some("CyberGuard VPN"));
        assert!((info.latitude - 47.3769).abs() < 0.001);
        assert!((info.longitude - 8.5417).abs() < 0.001);
    }
}
