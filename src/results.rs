//! Result data structures for speed test output.
//!
//! This module provides the data structures for a completed speed test
//! run: the persisted [`TestResult`] record, the network identity
//! attached to it, and the display catalog of measurement servers.
//! All structures implement Serialize for JSON output and Deserialize
//! so history files can be read back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cloudflare::requests::UA;

/// Whether the connection was routed through a VPN during the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VpnStatus {
    Active,
    Inactive,
}

serde_plain::derive_display_from_serialize!(VpnStatus);
serde_plain::derive_fromstr_from_deserialize!(VpnStatus);

/// Network identity information gathered before the test starts.
///
/// Populated by the network info probe. When the probe cannot reach
/// its lookup service it falls back to placeholder values, so every
/// field is always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Public IP address, or "N/A" when unavailable.
    pub ip: String,
    /// ISP or organization name.
    pub isp: String,
    /// Human-readable location, e.g. "Zurich, CH".
    pub location: String,
    /// Connection type label: "VPN", "wifi", or "unknown".
    pub connection_type: String,
    /// Whether a VPN is active on this connection.
    pub vpn_active: bool,
    /// VPN provider name, when one is active.
    pub vpn_provider: Option<String>,
    /// Approximate latitude of the connection.
    pub latitude: f64,
    /// Approximate longitude of the connection.
    pub longitude: f64,
}

impl NetworkInfo {
    /// Create a new NetworkInfo.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ip: String,
        isp: String,
        location: String,
        connection_type: String,
        vpn_active: bool,
        vpn_provider: Option<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            ip,
            isp,
            location,
            connection_type,
            vpn_active,
            vpn_provider,
            latitude,
            longitude,
        }
    }
}

/// A display catalog entry for the measurement endpoint.
#[derive(Debug, Clone, Copy)]
pub struct DisplayServer {
    /// Display name, e.g. "Cloudflare (London)".
    pub name: &'static str,
    /// Latitude of the display location.
    pub latitude: f64,
    /// Longitude of the display location.
    pub longitude: f64,
}

/// Catalog of display locations for the measurement endpoint.
///
/// The endpoint is anycast, so the actual serving location is not
/// known client-side. One entry is picked at random per run for
/// presentation.
pub const DISPLAY_SERVERS: [DisplayServer; 6] = [
    DisplayServer {
        name: "Cloudflare (Global)",
        latitude: 37.7749,
        longitude: -122.4194,
    },
    DisplayServer {
        name: "Cloudflare (London)",
        latitude: 51.5074,
        longitude: -0.1278,
    },
    DisplayServer {
        name: "Cloudflare (Tokyo)",
        latitude: 35.6895,
        longitude: 139.6917,
    },
    DisplayServer {
        name: "Cloudflare (Sydney)",
        latitude: -33.8688,
        longitude: 151.2093,
    },
    DisplayServer {
        name: "Cloudflare (Frankfurt)",
        latitude: 50.1109,
        longitude: 8.6821,
    },
    DisplayServer {
        name: "Cloudflare (New York)",
        latitude: 40.7128,
        longitude: -74.0060,
    },
];

/// The measurement server chosen for a single run.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Display name of the server location.
    pub location: String,
    /// Hostname requests are actually sent to.
    pub host: String,
    /// Latitude of the display location.
    pub latitude: f64,
    /// Longitude of the display location.
    pub longitude: f64,
}

impl ServerInfo {
    /// Create a new ServerInfo.
    pub fn new(
        location: String,
        host: String,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self { location, host, latitude, longitude }
    }

    /// Pick a random display entry from the catalog for the given
    /// endpoint host.
    pub fn pick(host: &str) -> Self {
        let index = {
            use rand::Rng;
            rand::thread_rng().gen_range(0..DISPLAY_SERVERS.len())
        };
        let server = &DISPLAY_SERVERS[index];

        Self {
            location: server.name.to_string(),
            host: host.to_string(),
            latitude: server.latitude,
            longitude: server.longitude,
        }
    }
}

/// A complete speed test result record.
///
/// This is the unit stored in history and emitted as JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    /// Download speed in Mbps.
    pub download_mbps: f64,
    /// Upload speed in Mbps.
    pub upload_mbps: f64,
    /// Mean latency in milliseconds.
    pub ping_ms: f64,
    /// Jitter (population standard deviation of latency samples) in
    /// milliseconds.
    pub jitter_ms: f64,
    /// Display name of the measurement server.
    pub server_location: String,
    /// Hostname of the measurement endpoint.
    pub server_host: String,
    /// Total test duration in seconds.
    pub test_duration_secs: f64,
    /// Connection type label at test time.
    pub connection_type: String,
    /// ISP or organization name.
    pub isp: String,
    /// Public IP address at test time.
    pub ip_address: String,
    /// User agent string used for measurement requests.
    pub user_agent: String,
    /// Whether a VPN was active during the test.
    pub vpn_status: VpnStatus,
    /// VPN provider name, present only when a VPN was active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpn_provider: Option<String>,
    /// True when the numbers come from the simulated fallback rather
    /// than real measurement traffic.
    #[serde(default)]
    pub simulated: bool,
    /// Timestamp when the test completed.
    pub created_at: DateTime<Utc>,
}

impl TestResult {
    /// Create a new TestResult from measurement outputs.
    ///
    /// The VPN provider is only carried over when the VPN was active,
    /// so a provider name never appears on an inactive record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        download_mbps: f64,
        upload_mbps: f64,
        ping_ms: f64,
        jitter_ms: f64,
        test_duration_secs: f64,
        network: &NetworkInfo,
        server: &ServerInfo,
        simulated: bool,
    ) -> Self {
        let vpn_status = if network.vpn_active {
            VpnStatus::Active
        } else {
            VpnStatus::Inactive
        };
        let vpn_provider = if network.vpn_active {
            network.vpn_provider.clone()
        } else {
            None
        };

        Self {
            download_mbps,
            upload_mbps,
            ping_ms,
            jitter_ms,
            server_location: server.location.clone(),
            server_host: server.host.clone(),
            test_duration_secs,
            connection_type: network.connection_type.clone(),
            isp: network.isp.clone(),
            ip_address: network.ip.clone(),
            user_agent: UA.to_string(),
            vpn_status,
            vpn_provider,
            simulated,
            created_at: Utc::now(),
        }
    }
}
