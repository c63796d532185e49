use serde::{Deserialize, Deserializer, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
}

/// Qrator API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QratorConfig {
    /// Base URL of the JSON-RPC API, without trailing slash
    pub api_url: String,
    /// Account identifier as supplied by the operator, validated at startup
    pub client_id: String,
    /// Value of the `X-Qrator-Auth` header
    pub auth_token: String,
    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Qrator API configuration
    pub qrator: QratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 9502,
            },
            qrator: QratorConfig::default(),
        }
    }
}

impl Default for QratorConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.qrator.net/request".to_string(),
            client_id: String::new(),
            auth_token: String::new(),
            request_timeout_seconds: 5,
        }
    }
}

/// JSON-RPC request body
#[derive(Debug, Serialize)]
pub struct QratorRequest<'a> {
    pub method: &'a str,
    /// Always empty, none of the methods used here take parameters
    pub params: &'a str,
    pub id: i64,
}

/// Response wrapper shared by every API method
///
/// Missing and `null` members both decode as `None`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub result: Option<T>,
    pub error: Option<String>,
    pub id: Option<i64>,
}

impl<T> Envelope<T> {
    /// Upstream rejection message, if any. `null` and `""` both mean success.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|message| !message.is_empty())
    }
}

/// A domain protected under the account
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Domain {
    /// Provider-assigned identifier
    pub id: u64,
    /// Domain name, used as the `domain` label
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// Domain status (e.g. "online")
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,
    /// Provider-facing IP address
    #[serde(rename = "qratorIp", default)]
    pub qrator_ip: Option<String>,
}

/// Decode a string that the API may send as `null`
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Latest statistics snapshot for one domain
///
/// Counters missing from the response decode as zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DomainStatistics {
    /// Bypassed traffic (bps)
    pub bsend: f64,
    /// Incoming traffic (bps)
    pub brecv: f64,
    /// Outgoing traffic (bps)
    pub bout: f64,
    /// Bypassed packets (pps)
    pub psend: f64,
    /// Incoming packets (pps)
    pub precv: f64,
    /// Request rate (rps)
    pub reqspeed: f64,
    pub reqlonger02s: u64,
    pub reqlonger05s: u64,
    pub reqlonger07s: u64,
    pub reqlonger10s: u64,
    /// Total request count
    pub reqall: u64,
    pub err50x: u64,
    pub err501: u64,
    pub err502: u64,
    pub err503: u64,
    pub err504: u64,
    /// Addresses banned by Qrator itself
    pub ban: u64,
    /// Addresses banned through the API
    pub ban_api: u64,
    /// Addresses banned by the WAF
    pub ban_waf: u64,
    /// Billable traffic (Mbps)
    pub billable: u64,
}
