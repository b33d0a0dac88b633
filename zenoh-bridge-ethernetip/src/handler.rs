//! Read, write, method and subscription handlers.
//!
//! Handlers never fail: every outcome becomes a response document. They do
//! not publish; the worker pool does that.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::cip::{CipError, STATUS_SUCCESS, status_message};
use crate::codec::{self, CodecError};
use crate::device::TagSession;
use crate::directory::TagDirectory;
use crate::messages::{
    MethodRequest, MethodResponse, ReadRequest, ReadResponse, ReadResponseData,
    SubscriptionOperation, SubscriptionRequest, SubscriptionResponse, WriteRequest, WriteResponse,
};

/// Everything a handler needs: the device session and the tag directory.
#[derive(Debug, Clone)]
pub struct BridgeContext<S> {
    session: S,
    directory: Arc<TagDirectory>,
}

impl<S: TagSession> BridgeContext<S> {
    pub fn new(session: S, directory: Arc<TagDirectory>) -> Self {
        Self { session, directory }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn directory(&self) -> &TagDirectory {
        &self.directory
    }
}

/// Why a request could not be served.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid request payload: {0}")]
    BadRequest(#[from] serde_json::Error),

    #[error("tag not found: {0}")]
    UnknownTag(String),

    #[error("device error on tag {tag}: {source}")]
    Device { tag: String, source: CipError },

    #[error("tag {tag}: {source}")]
    Codec { tag: String, source: CodecError },

    #[error("write to {tag} rejected: status 0x{status:02X} ({message})")]
    Rejected {
        tag: String,
        status: u8,
        message: &'static str,
    },

    #[error("{0} requests are not supported by this bridge")]
    Unsupported(&'static str),
}

impl HandlerError {
    /// Device-reported status, 0 when the failure did not come from the device.
    pub fn status_code(&self) -> u32 {
        match self {
            HandlerError::Device { source, .. } => source.status_code(),
            HandlerError::Rejected { status, .. } => u32::from(*status),
            _ => 0,
        }
    }
}

/// Serve a read request.
///
/// Tags are read in request order. An unknown tag fails the whole request
/// with no data; a device or conversion failure stops at that tag and keeps
/// what was read before it.
pub async fn handle_read<S: TagSession>(ctx: &BridgeContext<S>, payload: &[u8]) -> ReadResponse {
    let mut response = ReadResponse::new();

    let request: ReadRequest = match serde_json::from_slice(payload) {
        Ok(request) => request,
        Err(e) => {
            let error = HandlerError::from(e);
            warn!(error = %error, "Rejected read request");
            response.fail(&error, error.status_code());
            return response;
        }
    };

    if let Err(error) = read_tags(ctx, &request.tags, &mut response.data).await {
        warn!(error = %error, "Read failed");
        if matches!(error, HandlerError::UnknownTag(_)) {
            response.data.clear();
        }
        response.fail(&error, error.status_code());
    } else {
        debug!(tags = request.tags.len(), "Read complete");
    }

    response
}

async fn read_tags<S: TagSession>(
    ctx: &BridgeContext<S>,
    names: &[String],
    data: &mut BTreeMap<String, ReadResponseData>,
) -> Result<(), HandlerError> {
    for name in names {
        let tag = ctx
            .directory
            .get(name)
            .ok_or_else(|| HandlerError::UnknownTag(name.clone()))?;

        let raw = ctx
            .session
            .read_tag(tag)
            .await
            .map_err(|source| HandlerError::Device {
                tag: name.clone(),
                source,
            })?;

        let sample = codec::decode_sample(tag, &raw).map_err(|source| HandlerError::Codec {
            tag: name.clone(),
            source,
        })?;

        data.insert(name.clone(), sample);
    }

    Ok(())
}

/// Serve a write request. The value is fully converted before the device
/// is touched.
pub async fn handle_write<S: TagSession>(
    ctx: &BridgeContext<S>,
    payload: &[u8],
) -> WriteResponse {
    let request: WriteRequest = match serde_json::from_slice(payload) {
        Ok(request) => request,
        Err(e) => {
            let error = HandlerError::from(e);
            warn!(error = %error, "Rejected write request");
            let mut response = WriteResponse::new(node_id_hint(payload));
            response.fail(&error, error.status_code());
            return response;
        }
    };

    let mut response = WriteResponse::new(request.node_id.as_str());
    match write_tag(ctx, &request).await {
        Ok(status) => {
            debug!(tag = %request.node_id, "Write complete");
            response.status_code = u32::from(status);
        }
        Err(error) => {
            warn!(tag = %request.node_id, error = %error, "Write failed");
            response.fail(&error, error.status_code());
        }
    }

    response
}

async fn write_tag<S: TagSession>(
    ctx: &BridgeContext<S>,
    request: &WriteRequest,
) -> Result<u8, HandlerError> {
    let name = &request.node_id;
    let tag = ctx
        .directory
        .get(name)
        .ok_or_else(|| HandlerError::UnknownTag(name.clone()))?;

    let wire = codec::encode(tag, &request.value).map_err(|source| HandlerError::Codec {
        tag: name.clone(),
        source,
    })?;

    let status = ctx
        .session
        .write_tag(tag, wire)
        .await
        .map_err(|source| HandlerError::Device {
            tag: name.clone(),
            source,
        })?;

    if status != STATUS_SUCCESS {
        return Err(HandlerError::Rejected {
            tag: name.clone(),
            status,
            message: status_message(status),
        });
    }

    Ok(status)
}

// Best effort: echo node_id from a payload that failed to parse as a request.
fn node_id_hint(payload: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(payload)
        .ok()
        .and_then(|v| v.get("node_id")?.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Answer a method request. Methods are a reserved contract.
pub fn handle_method(payload: &[u8]) -> MethodResponse {
    match serde_json::from_slice::<MethodRequest>(payload) {
        Ok(request) => {
            debug!(
                object_id = %request.object_id,
                method_id = %request.method_id,
                "Method request"
            );
            MethodResponse::failed(Some(request), HandlerError::Unsupported("method"))
        }
        Err(e) => MethodResponse::failed(None, HandlerError::from(e)),
    }
}

/// Answer a subscription request. Subscriptions are a reserved contract.
pub fn handle_subscribe(payload: &[u8]) -> SubscriptionResponse {
    let request = match serde_json::from_slice::<SubscriptionRequest>(payload) {
        Ok(request) => request,
        Err(e) => {
            return SubscriptionResponse::failed(
                SubscriptionOperation::default(),
                HandlerError::from(e),
            );
        }
    };

    match request.params() {
        Ok(params) => {
            debug!(params = ?params, "Subscription request");
            SubscriptionResponse::failed(
                request.request_type,
                HandlerError::Unsupported("subscription"),
            )
        }
        Err(e) => SubscriptionResponse::failed(request.request_type, HandlerError::from(e)),
    }
}
