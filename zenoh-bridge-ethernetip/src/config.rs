//! Configuration for the EtherNet/IP bridge.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use zensight_bridge_framework::{
    BridgeConfig, BridgeError, LoggingConfig, Result as BridgeResult, ZenohConfig,
};
use zensight_common::KEY_PREFIX;

use crate::cip::DEFAULT_PORT;

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthernetIpBridgeConfig {
    /// Zenoh connection settings
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// EtherNet/IP device and request handling settings
    pub ethernetip: EthernetIpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// EtherNet/IP adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthernetIpConfig {
    /// Key expression prefix (default: "zensight/ethernetip")
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Device address (IP or hostname)
    pub endpoint_ip: String,

    /// Device TCP port (default: 44818)
    #[serde(default = "default_port")]
    pub endpoint_tcp_port: u16,

    /// Connect and per-operation timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Number of request workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Pending requests held before the listener waits
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_key_prefix() -> String {
    format!("{}/ethernetip", KEY_PREFIX)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

impl EthernetIpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `host:port` of the device, for logs and status.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.endpoint_ip, self.endpoint_tcp_port)
    }
}

impl BridgeConfig for EthernetIpBridgeConfig {
    fn zenoh(&self) -> &ZenohConfig {
        &self.zenoh
    }

    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn key_prefix(&self) -> &str {
        &self.ethernetip.key_prefix
    }

    fn status_metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "endpoint": self.ethernetip.endpoint(),
            "workers": self.ethernetip.workers,
        })
    }

    fn validate(&self) -> BridgeResult<()> {
        let eip = &self.ethernetip;

        if eip.endpoint_ip.trim().is_empty() {
            return Err(BridgeError::validation("endpoint_ip must not be empty"));
        }
        if eip.endpoint_tcp_port == 0 {
            return Err(BridgeError::validation("endpoint_tcp_port must not be 0"));
        }
        if eip.timeout_ms == 0 {
            return Err(BridgeError::validation("timeout_ms must be greater than 0"));
        }
        if eip.workers == 0 {
            return Err(BridgeError::validation("workers must be at least 1"));
        }
        if eip.queue_capacity == 0 {
            return Err(BridgeError::validation("queue_capacity must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let json5 = r#"{
            ethernetip: {
                endpoint_ip: "192.168.1.10",
            },
        }"#;

        let config = EthernetIpBridgeConfig::from_json5(json5).unwrap();
        assert_eq!(config.ethernetip.key_prefix, "zensight/ethernetip");
        assert_eq!(config.ethernetip.endpoint_tcp_port, 44818);
        assert_eq!(config.ethernetip.timeout(), Duration::from_secs(2));
        assert_eq!(config.ethernetip.workers, 4);
        assert_eq!(config.ethernetip.queue_capacity, 64);
        assert_eq!(config.zenoh.mode, "peer");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let json5 = r#"{
            zenoh: {
                mode: "client",
                connect: ["tcp/127.0.0.1:7447"],
            },
            ethernetip: {
                key_prefix: "plant/line1/plc",
                endpoint_ip: "plc.local",
                endpoint_tcp_port: 2222,
                timeout_ms: 500,
                workers: 2,
                queue_capacity: 8,
            },
            logging: {
                level: "debug",
                format: "json",
            },
        }"#;

        let config = EthernetIpBridgeConfig::from_json5(json5).unwrap();
        assert_eq!(config.key_prefix(), "plant/line1/plc");
        assert_eq!(config.ethernetip.endpoint(), "plc.local:2222");
        assert_eq!(config.zenoh.connect, vec!["tcp/127.0.0.1:7447"]);

        let metadata = config.status_metadata();
        assert_eq!(metadata["endpoint"], "plc.local:2222");
        assert_eq!(metadata["workers"], 2);
    }

    #[test]
    fn test_missing_endpoint_is_rejected() {
        let result = EthernetIpBridgeConfig::from_json5("{ ethernetip: {} }");
        assert!(matches!(result, Err(BridgeError::ConfigParse(_))));

        let result = EthernetIpBridgeConfig::from_json5(r#"{ ethernetip: { endpoint_ip: " " } }"#);
        assert!(matches!(result, Err(BridgeError::ConfigValidation(_))));
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let json5 = r#"{ ethernetip: { endpoint_ip: "10.0.0.5", workers: 0 } }"#;
        let err = EthernetIpBridgeConfig::from_json5(json5).unwrap_err();
        assert!(err.to_string().contains("workers"));

        let json5 = r#"{ ethernetip: { endpoint_ip: "10.0.0.5", queue_capacity: 0 } }"#;
        assert!(EthernetIpBridgeConfig::from_json5(json5).is_err());
    }

    #[test]
    fn test_trailing_slash_prefix_is_rejected() {
        let json5 = r#"{ ethernetip: { endpoint_ip: "10.0.0.5", key_prefix: "plant/" } }"#;
        assert!(matches!(
            EthernetIpBridgeConfig::from_json5(json5),
            Err(BridgeError::ConfigValidation(_))
        ));
    }
}
