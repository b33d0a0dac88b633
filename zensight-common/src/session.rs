use zenoh::Session;

use crate::config::ZenohConfig;
use crate::error::{Error, Result};

impl ZenohConfig {
    /// Translate into a native Zenoh configuration.
    pub fn to_zenoh(&self) -> Result<zenoh::Config> {
        let mut zenoh_config = zenoh::Config::default();

        let mode = match self.mode.as_str() {
            "client" | "peer" | "router" => format!("\"{}\"", self.mode),
            other => {
                return Err(Error::Config(format!(
                    "Invalid Zenoh mode: '{}'. Expected 'client', 'peer', or 'router'",
                    other
                )));
            }
        };
        insert(&mut zenoh_config, "mode", &mode)?;

        if !self.connect.is_empty() {
            insert(
                &mut zenoh_config,
                "connect/endpoints",
                &serde_json::to_string(&self.connect)?,
            )?;
        }

        if !self.listen.is_empty() {
            insert(
                &mut zenoh_config,
                "listen/endpoints",
                &serde_json::to_string(&self.listen)?,
            )?;
        }

        if let Some(enabled) = self.multicast_scouting {
            insert(
                &mut zenoh_config,
                "scouting/multicast/enabled",
                if enabled { "true" } else { "false" },
            )?;
        }

        Ok(zenoh_config)
    }
}

fn insert(config: &mut zenoh::Config, key: &str, value: &str) -> Result<()> {
    config
        .insert_json5(key, value)
        .map_err(|e| Error::Config(format!("Failed to set '{}': {}", key, e)))
}

/// Connect to Zenoh using the provided configuration.
pub async fn connect(config: &ZenohConfig) -> Result<Session> {
    let zenoh_config = config.to_zenoh()?;

    tracing::info!(
        mode = %config.mode,
        connect = ?config.connect,
        listen = ?config.listen,
        "Connecting to Zenoh"
    );

    let session = zenoh::open(zenoh_config).await?;

    tracing::info!(zid = %session.zid(), "Connected to Zenoh");

    Ok(session)
}
