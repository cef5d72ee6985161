//! RPC envelope
//!
//! One request frame and one response frame per call. `error` on the response
//! is reserved for call-level failures (unknown method, undecodable params);
//! domain failures travel inside the result payload.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Correlation id, echoed on the response
    pub id: String,

    pub method: String,

    pub params: serde_json::Value,
}

impl RpcRequest {
    /// Build a request with a fresh correlation id
    pub fn new<P: Serialize>(method: &str, params: &P) -> serde_json::Result<Self> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            method: method.to_string(),
            params: serde_json::to_value(params)?,
        })
    }

    pub fn decode_params<P: DeserializeOwned>(&self) -> serde_json::Result<P> {
        P::deserialize(&self.params)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcResponse {
    pub fn ok(id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(error.into()),
        }
    }
}
