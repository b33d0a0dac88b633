//! Integration tests for zensight-common library.

use std::io::Write;

use serde::Deserialize;
use zensight_common::{
    LogFormat, LoggingConfig, ZenohConfig, load_config, relative_key, request_wildcard,
    response_key,
};

#[derive(Debug, Deserialize)]
struct BridgeFile {
    zenoh: ZenohConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
fn test_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{
            // comments are allowed in JSON5
            zenoh: {{ mode: "client", connect: ["tcp/127.0.0.1:7447"] }},
            logging: {{ level: "warn", format: "json" }},
        }}"#
    )
    .unwrap();

    let config: BridgeFile = load_config(file.path()).unwrap();
    assert_eq!(config.zenoh.mode, "client");
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_load_config_missing_file() {
    let result: zensight_common::Result<BridgeFile> = load_config("/nonexistent/bridge.json5");
    let err = result.unwrap_err();
    assert!(err.to_string().contains("/nonexistent/bridge.json5"));
}

#[test]
fn test_request_response_key_pairing() {
    let prefix = "zensight/ethernetip";

    for category in ["read", "write", "method", "subscribe"] {
        let request = format!("{}/{}", prefix, category);
        let response = response_key(prefix, category);

        assert!(response.starts_with(&request));
        assert!(response.ends_with("/response"));
        assert_eq!(relative_key(prefix, &request), category);
    }

    assert_eq!(request_wildcard(prefix), "zensight/ethernetip/**");
}
