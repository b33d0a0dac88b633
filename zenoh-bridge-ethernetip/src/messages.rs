//! Request and response documents exchanged over Zenoh.
//!
//! All bodies are JSON. Every response carries `success`, `status_code` and
//! `error_message`; a failed response always has a non-empty message.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use zensight_common::rfc3339_now;

use crate::codec::TagValue;

/// Body of `<prefix>/read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRequest {
    pub tags: Vec<String>,
}

/// One tag's value in a read response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResponseData {
    pub value: TagValue,
    pub source_timestamp: String,
}

/// Body of `<prefix>/read/response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResponse {
    pub server_timestamp: String,
    pub data: BTreeMap<String, ReadResponseData>,
    pub success: bool,
    pub status_code: u32,
    pub error_message: String,
}

impl ReadResponse {
    /// A successful, empty response stamped with the current time.
    pub fn new() -> Self {
        Self {
            server_timestamp: rfc3339_now(),
            data: BTreeMap::new(),
            success: true,
            status_code: 0,
            error_message: String::new(),
        }
    }

    pub fn fail(&mut self, message: impl fmt::Display, status_code: u32) {
        self.success = false;
        self.status_code = status_code;
        self.error_message = message.to_string();
    }
}

impl Default for ReadResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of `<prefix>/write`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub node_id: String,
    pub value: TagValue,
}

/// Body of `<prefix>/write/response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteResponse {
    pub node_id: String,
    pub timestamp: String,
    pub success: bool,
    pub status_code: u32,
    pub error_message: String,
}

impl WriteResponse {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            timestamp: rfc3339_now(),
            success: true,
            status_code: 0,
            error_message: String::new(),
        }
    }

    pub fn fail(&mut self, message: impl fmt::Display, status_code: u32) {
        self.success = false;
        self.status_code = status_code;
        self.error_message = message.to_string();
    }
}

/// Body of `<prefix>/method`. Reserved, never executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRequest {
    pub object_id: String,
    pub method_id: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

/// Body of `<prefix>/method/response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResponse {
    pub object_id: String,
    pub method_id: String,
    pub timestamp: String,
    pub success: bool,
    pub status_code: u32,
    pub error_message: String,
    pub arguments: Vec<Value>,
    pub values: Vec<Value>,
}

impl MethodResponse {
    /// A failed response echoing the request, if there was one.
    pub fn failed(request: Option<MethodRequest>, message: impl fmt::Display) -> Self {
        let request = request.unwrap_or(MethodRequest {
            object_id: String::new(),
            method_id: String::new(),
            arguments: Vec::new(),
        });

        Self {
            object_id: request.object_id,
            method_id: request.method_id,
            timestamp: rfc3339_now(),
            success: false,
            status_code: 0,
            error_message: message.to_string(),
            arguments: request.arguments,
            values: Vec::new(),
        }
    }
}

/// Subscription operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionOperation {
    #[default]
    Create,
    Republish,
    Publish,
    Delete,
}

/// Parameters of a `create` subscription request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SubscriptionCreateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_interval: Option<u32>,
    #[serde(default, rename = "lifetime", skip_serializing_if = "Option::is_none")]
    pub lifetime_count: Option<u32>,
    #[serde(default, rename = "keepalive", skip_serializing_if = "Option::is_none")]
    pub max_keep_alive_count: Option<u32>,
    #[serde(
        default,
        rename = "max_publish_notifications",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_notifications_per_publish: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(
        default,
        rename = "items_to_monitor",
        skip_serializing_if = "Option::is_none"
    )]
    pub monitored_items: Option<Vec<MonitoredItem>>,
}

/// A tag to monitor in a `create` subscription request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredItem {
    pub node_id: String,
    #[serde(default)]
    pub values: bool,
    #[serde(default)]
    pub events: bool,
}

/// Parameters of `republish` and `delete` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionIdParams {
    pub subscription_id: u32,
}

/// Typed parameters, selected by the request's operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionParams {
    Create(SubscriptionCreateParams),
    Republish(SubscriptionIdParams),
    Publish,
    Delete(SubscriptionIdParams),
}

/// Body of `<prefix>/subscribe`. Reserved, never executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub request_type: SubscriptionOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_params: Option<Value>,
}

impl SubscriptionRequest {
    /// Interpret `request_params` according to `request_type`.
    pub fn params(&self) -> Result<SubscriptionParams, serde_json::Error> {
        let raw = self.request_params.clone().unwrap_or(Value::Null);
        let params = match self.request_type {
            SubscriptionOperation::Create => {
                if raw.is_null() {
                    SubscriptionParams::Create(SubscriptionCreateParams::default())
                } else {
                    SubscriptionParams::Create(serde_json::from_value(raw)?)
                }
            }
            SubscriptionOperation::Republish => {
                SubscriptionParams::Republish(serde_json::from_value(raw)?)
            }
            SubscriptionOperation::Publish => SubscriptionParams::Publish,
            SubscriptionOperation::Delete => {
                SubscriptionParams::Delete(serde_json::from_value(raw)?)
            }
        };
        Ok(params)
    }
}

/// Body of `<prefix>/subscribe/response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub request_type: SubscriptionOperation,
    pub subscription_id: u32,
    pub timestamp: String,
    pub success: bool,
    pub status_code: u32,
    pub error_message: String,
    pub results: Vec<Value>,
}

impl SubscriptionResponse {
    pub fn failed(request_type: SubscriptionOperation, message: impl fmt::Display) -> Self {
        Self {
            request_type,
            subscription_id: 0,
            timestamp: rfc3339_now(),
            success: false,
            status_code: 0,
            error_message: message.to_string(),
            results: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_response_shape() {
        let mut response = ReadResponse::new();
        response.data.insert(
            "Temperature".to_string(),
            ReadResponseData {
                value: TagValue::from("72F"),
                source_timestamp: "2024-01-01T00:00:00Z".to_string(),
            },
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["status_code"], 0);
        assert_eq!(json["error_message"], "");
        assert_eq!(json["data"]["Temperature"]["value"], "72F");
        assert!(json["server_timestamp"].is_string());
    }

    #[test]
    fn test_fail_sets_message() {
        let mut response = WriteResponse::new("SetPoint");
        response.fail("tag not found: SetPoint", 0);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["node_id"], "SetPoint");
        assert_eq!(json["success"], false);
        assert_eq!(json["error_message"], "tag not found: SetPoint");
    }

    #[test]
    fn test_write_request_parse() {
        let request: WriteRequest =
            serde_json::from_str(r#"{"node_id": "Setpoints", "value": [1, 2, 3]}"#).unwrap();
        assert_eq!(request.node_id, "Setpoints");
        assert!(matches!(request.value, TagValue::Array(ref items) if items.len() == 3));
    }

    #[test]
    fn test_method_request_defaults() {
        let request: MethodRequest =
            serde_json::from_str(r#"{"object_id": "o", "method_id": "m"}"#).unwrap();
        assert!(request.arguments.is_empty());

        let response = MethodResponse::failed(Some(request), "not supported");
        assert_eq!(response.object_id, "o");
        assert!(!response.success);
    }

    #[test]
    fn test_subscription_params() {
        let request: SubscriptionRequest = serde_json::from_str(
            r#"{"request_type": "create", "request_params": {
                "publish_interval": 500,
                "keepalive": 3,
                "items_to_monitor": [{"node_id": "Temperature", "values": true}]
            }}"#,
        )
        .unwrap();

        match request.params().unwrap() {
            SubscriptionParams::Create(params) => {
                assert_eq!(params.publish_interval, Some(500));
                assert_eq!(params.max_keep_alive_count, Some(3));
                let items = params.monitored_items.unwrap();
                assert_eq!(items[0].node_id, "Temperature");
                assert!(items[0].values);
                assert!(!items[0].events);
            }
            other => panic!("unexpected params: {:?}", other),
        }

        let request: SubscriptionRequest =
            serde_json::from_str(r#"{"request_type": "delete", "request_params": {"subscription_id": 9}}"#)
                .unwrap();
        assert_eq!(
            request.params().unwrap(),
            SubscriptionParams::Delete(SubscriptionIdParams { subscription_id: 9 })
        );

        let request: SubscriptionRequest =
            serde_json::from_str(r#"{"request_type": "republish"}"#).unwrap();
        assert!(request.params().is_err());
    }
}
