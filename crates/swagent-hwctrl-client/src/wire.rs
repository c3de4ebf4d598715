//! Request/response frames exchanged with hw agents.
//!
//! Frames are JSON objects, one per line. Every request carries a
//! sequence number that the response echoes back.

use crate::error::{HwCtrlError, HwCtrlResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method name of the fabric reachability query.
pub const GET_HW_FABRIC_REACHABILITY: &str = "getHwFabricReachability";

/// A method call, independent of framing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// A call that takes no arguments.
    pub fn empty(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }
}

/// Request as written to the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestFrame {
    pub seq: u64,
    #[serde(flatten)]
    pub request: RpcRequest,
}

/// Response as read from the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseFrame {
    pub fn ok(seq: u64, result: Value) -> Self {
        Self {
            seq,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(seq: u64, message: impl Into<String>) -> Self {
        Self {
            seq,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Converts the frame into the call's outcome.
    pub fn into_result(self, method: &str) -> HwCtrlResult<Value> {
        match self.error {
            Some(message) => Err(HwCtrlError::Remote {
                method: method.to_string(),
                message,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Serializes a frame followed by the line terminator.
pub fn encode_line<T: Serialize>(frame: &T) -> HwCtrlResult<Vec<u8>> {
    let mut line = serde_json::to_vec(frame)?;
    line.push(b'\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_frame_is_flat() {
        let frame = RequestFrame {
            seq: 9,
            request: RpcRequest::empty(GET_HW_FABRIC_REACHABILITY),
        };
        let value: Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            value,
            json!({"seq": 9, "method": "getHwFabricReachability", "params": null})
        );
    }

    #[test]
    fn test_encode_line_terminates() {
        let line = encode_line(&ResponseFrame::ok(1, json!({}))).unwrap();
        assert_eq!(line.last(), Some(&b'\n'));
        assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);
    }

    #[test]
    fn test_response_error_maps_to_remote() {
        let frame: ResponseFrame =
            serde_json::from_str(r#"{"seq": 2, "error": "switch not ready"}"#).unwrap();
        match frame.into_result("getHwFabricReachability") {
            Err(HwCtrlError::Remote { method, message }) => {
                assert_eq!(method, "getHwFabricReachability");
                assert_eq!(message, "switch not ready");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_response_null_result() {
        let frame: ResponseFrame = serde_json::from_str(r#"{"seq": 2, "result": null}"#).unwrap();
        assert_eq!(frame.into_result("noop").unwrap(), Value::Null);
    }
}
