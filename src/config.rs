//! Startup configuration, with every default in one place.
//!
//! A configuration file is written in [RON](https://github.com/ron-rs/ron);
//! missing fields keep their defaults, so a file only has to mention what it
//! changes:
//!
//! ```text
//! (
//!     renderer: (ip: "192.168.0.10"),
//!     array: (sources: 32, radius: 1.0),
//! )
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::{Ipv4Addr, ToSocketAddrs},
    path::Path,
    time::Duration,
};

/// The SoundScape Renderer's network interface port.
pub const DEFAULT_SSR_PORT: u16 = 4711;
/// Port of the second renderer used by local sound field synthesis.
pub const DEFAULT_SSR2_PORT: u16 = 4712;
/// The SSR expects every message to end in a binary zero.
pub const DEFAULT_TERMINATOR: &str = "\0";
/// Motive's default multicast group.
pub const DEFAULT_MULTICAST_IP: &str = "239.255.42.99";
/// Motive's default data port.
pub const DEFAULT_TRACKING_PORT: u16 = 1511;

/// Sources pace themselves at no less than one frame per this long.
pub const MAX_FRAME_INTERVAL: Duration = Duration::from_secs(3600);

/// The pause between frames at `rate` frames per second. A rate of zero
/// means no pacing at all.
pub fn frame_interval(rate: f64) -> Result<Duration, ConfigError> {
    if rate == 0.0 {
        return Ok(Duration::ZERO);
    }
    if !(rate > 0.0) {
        return Err(ConfigError::Invalid(format!(
            "frame rate must be zero or positive, got {rate}"
        )));
    }
    match Duration::try_from_secs_f64(1.0 / rate) {
        Ok(interval) if interval <= MAX_FRAME_INTERVAL => Ok(interval),
        _ => Err(ConfigError::Invalid(format!(
            "frame rate {rate} is below one frame per {}s",
            MAX_FRAME_INTERVAL.as_secs()
        ))),
    }
}

/// Everything needed to set up a bridge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[allow(missing_docs)]
    pub renderer: RendererConfig,
    #[allow(missing_docs)]
    pub tracking: TrackingConfig,
    #[allow(missing_docs)]
    pub array: ArrayConfig,
    #[allow(missing_docs)]
    pub bridge: BridgeConfig,
}

/// Where the renderer(s) listen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Host running the renderer(s)
    pub ip: String,
    /// Port of the (first) renderer
    pub port: u16,
    /// Port of the second renderer, only used for local sound field synthesis
    pub second_port: u16,
    /// Appended to every message
    pub terminator: String,
    /// Upper bound on writing a single message; 0 waits forever
    pub write_timeout_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_owned(),
            port: DEFAULT_SSR_PORT,
            second_port: DEFAULT_SSR2_PORT,
            terminator: DEFAULT_TERMINATOR.to_owned(),
            write_timeout_ms: 1000,
        }
    }
}

impl RendererConfig {
    /// `ip:port` of the first renderer.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// `ip:second_port` of the second renderer.
    pub fn second_addr(&self) -> String {
        format!("{}:{}", self.ip, self.second_port)
    }

    #[allow(missing_docs)]
    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }
}

/// Where tracking data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Interface to receive on; any interface if unset
    pub unicast_ip: Option<String>,
    /// Multicast group to join; plain unicast if unset
    pub multicast_ip: Option<String>,
    #[allow(missing_docs)]
    pub port: u16,
    /// Upper bound on a single receive, and so on how long a stop can take
    pub receive_timeout_ms: u64,
    /// Index of the tracked rigid body in each frame
    pub rigid_body: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            unicast_ip: None,
            multicast_ip: Some(DEFAULT_MULTICAST_IP.to_owned()),
            port: DEFAULT_TRACKING_PORT,
            receive_timeout_ms: 100,
            rigid_body: 0,
        }
    }
}

impl TrackingConfig {
    #[allow(missing_docs)]
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    /// The unicast interface as an address, resolving host names.
    pub fn unicast_addr(&self) -> Result<Option<Ipv4Addr>, ConfigError> {
        self.unicast_ip.as_deref().map(resolve_v4).transpose()
    }

    /// The multicast group as an address. It has to be a multicast address.
    pub fn multicast_addr(&self) -> Result<Option<Ipv4Addr>, ConfigError> {
        match self.multicast_ip.as_deref() {
            None => Ok(None),
            Some(s) => {
                let addr: Ipv4Addr = s
                    .parse()
                    .map_err(|_| ConfigError::Invalid(format!("bad multicast address {s:?}")))?;
                if !addr.is_multicast() {
                    return Err(ConfigError::Invalid(format!("{addr} is not a multicast address")));
                }
                Ok(Some(addr))
            }
        }
    }
}

fn resolve_v4(host: &str) -> Result<Ipv4Addr, ConfigError> {
    (host, 0)
        .to_socket_addrs()
        .map_err(ConfigError::IoError)?
        .find_map(|a| match a.ip() {
            std::net::IpAddr::V4(v4) => Some(v4),
            std::net::IpAddr::V6(_) => None,
        })
        .ok_or_else(|| ConfigError::Invalid(format!("{host:?} has no IPv4 address")))
}

/// The circular source array of local sound field synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayConfig {
    /// Number of virtual sources
    pub sources: usize,
    /// Radius in meters
    pub radius: f64,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            sources: 64,
            radius: 0.5,
        }
    }
}

/// Knobs of the bridge loop itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Samples kept in the history
    pub history_capacity: usize,
    /// Pause after a receive that found nothing
    pub backoff_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            history_capacity: crate::history::DEFAULT_CAPACITY,
            backoff_ms: crate::bridge::DEFAULT_BACKOFF.as_millis() as u64,
        }
    }
}

impl BridgeConfig {
    #[allow(missing_docs)]
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Config {
    /// Reads a configuration from a RON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_ron(&text)
    }

    /// Parses a configuration from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Config = ron::de::from_str(text).map_err(ConfigError::RonSpannedError)?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as RON, e.g. to write out the defaults.
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(ConfigError::RonError)
    }

    /// Rejects values no bridge can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.array.radius >= 0.0 && self.array.radius.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "array radius must be a non-negative number, got {}",
                self.array.radius
            )));
        }
        if self.renderer.terminator.is_empty() {
            return Err(ConfigError::Invalid(
                "message terminator must not be empty".to_owned(),
            ));
        }
        self.tracking.multicast_addr()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.renderer.addr(), "localhost:4711");
        assert_eq!(config.renderer.second_addr(), "localhost:4712");
        assert_eq!(config.renderer.terminator, "\0");
        assert_eq!(config.renderer.write_timeout(), Some(Duration::from_secs(1)));
        assert_eq!(config.tracking.port, 1511);
        assert_eq!(config.tracking.multicast_ip.as_deref(), Some("239.255.42.99"));
        assert_eq!(config.tracking.receive_timeout(), Duration::from_millis(100));
        assert_eq!(config.array.sources, 64);
        assert_eq!(config.array.radius, 0.5);
        assert_eq!(config.bridge.history_capacity, 500);
        assert_eq!(config.bridge.backoff(), Duration::from_millis(100));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_ron(
            r#"(
                renderer: (ip: "10.0.0.2"),
                array: (sources: 12),
            )"#,
        )
        .unwrap();
        assert_eq!(config.renderer.addr(), "10.0.0.2:4711");
        assert_eq!(config.array.sources, 12);
        assert_eq!(config.array.radius, 0.5);
        assert_eq!(config.tracking, TrackingConfig::default());
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(Config::from_ron("()").unwrap(), Config::default());
    }

    #[test]
    fn config_writes_out_and_reads_back() {
        let mut config = Config::default();
        config.renderer.terminator = "\n".to_owned();
        config.tracking.unicast_ip = Some("192.168.1.20".to_owned());
        config.array.radius = 1.25;
        let text = config.to_ron().unwrap();
        assert_eq!(Config::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(tracking: (rigid_body: 2, multicast_ip: None))").unwrap();
        let config = Config::from_path(file.path()).unwrap();
        assert_eq!(config.tracking.rigid_body, 2);
        assert_eq!(config.tracking.multicast_addr().unwrap(), None);
    }

    #[test]
    fn zero_write_timeout_blocks() {
        let config = Config::from_ron("(renderer: (write_timeout_ms: 0))").unwrap();
        assert_eq!(config.renderer.write_timeout(), None);
    }

    #[test]
    fn rejects_nonsense() {
        assert!(matches!(
            Config::from_ron("(array: (radius: -1.0))"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_ron(r#"(tracking: (multicast_ip: Some("10.0.0.1")))"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_ron("(array: (sources: \"many\"))"),
            Err(ConfigError::RonSpannedError(_))
        ));
    }

    #[test]
    fn frame_intervals() {
        assert_eq!(frame_interval(0.0).unwrap(), Duration::ZERO);
        assert_eq!(frame_interval(f64::INFINITY).unwrap(), Duration::ZERO);
        assert_eq!(frame_interval(50.0).unwrap(), Duration::from_millis(20));
        assert!(frame_interval(1.0 / 3000.0).unwrap() <= MAX_FRAME_INTERVAL);
        for rate in [1e-20, 1e-5, -1.0, f64::NAN, f64::NEG_INFINITY] {
            assert!(
                matches!(frame_interval(rate), Err(ConfigError::Invalid(_))),
                "{rate}"
            );
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            Config::from_path("/definitely/not/here.ron"),
            Err(ConfigError::IoError(_))
        ));
    }
}
