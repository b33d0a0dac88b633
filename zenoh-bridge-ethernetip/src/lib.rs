//! Zenoh bridge for EtherNet/IP tag access.
//!
//! Requests arrive as JSON on key expressions under the configured prefix
//! and are answered on the matching response key:
//!
//! ```text
//! <prefix>/read            {"tags": ["Temperature", "Count"]}
//! <prefix>/read/response   {"server_timestamp", "data", "success", "status_code", "error_message"}
//! <prefix>/write           {"node_id": "SetPoint", "value": 1500}
//! <prefix>/write/response  {"node_id", "timestamp", "success", "status_code", "error_message"}
//! <prefix>/method          reserved, answered with success=false
//! <prefix>/subscribe       reserved, answered with success=false
//! ```
//!
//! Device access goes through a single session task ([`device::DeviceSession`]),
//! so at most one CIP request is on the wire at a time.

pub mod cip;
pub mod codec;
pub mod config;
pub mod device;
pub mod directory;
pub mod handler;
pub mod messages;
pub mod router;

pub use codec::{CodecError, ScalarValue, TagValue};
pub use config::EthernetIpBridgeConfig;
pub use device::{DeviceSession, TagSession};
pub use directory::{Tag, TagDirectory};
pub use handler::BridgeContext;
