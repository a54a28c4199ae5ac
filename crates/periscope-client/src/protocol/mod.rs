//! Wire message model.
//!
//! Every message is a JSON object. Calls carry a `method`, an optional `id`
//! and optional `params`; responses echo the `id` of the call they answer and
//! carry either `success` or `error`. Unknown fields are ignored and absent
//! optional fields are treated as omitted, so newer desktops can add fields
//! without breaking older clients.

use periscope_plugins::{CallId, ErrorReport, PushCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatch::DispatchError;

/// Method name used for plugin calls in both directions.
pub(crate) const EXECUTE_METHOD: &str = "execute";

/// Decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// The desktop asks the client to do something.
    Call(InboundCall),
    /// The desktop answers a call the client sent.
    Response(InboundResponse),
}

/// Call from the desktop.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundCall {
    /// Correlation id; `None` when the desktop expects no response.
    pub id: Option<CallId>,
    /// Method name.
    pub method: String,
    /// Parameters, when supplied.
    pub params: Option<Value>,
}

/// Response from the desktop to a client-initiated call.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundResponse {
    /// Id of the call being answered.
    pub id: CallId,
    /// `Ok` with the `success` payload or `Err` with the `error` payload.
    pub outcome: Result<Value, Value>,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<CallId>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    success: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl InboundMessage {
    /// Decodes one inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MalformedMessage`] when the text is not a
    /// JSON object, a field has the wrong type, or the object is neither a
    /// call nor a response.
    pub fn decode(text: &str) -> Result<Self, DispatchError> {
        let value: Value = serde_json::from_str(text).map_err(DispatchError::from_json_error)?;
        if !value.is_object() {
            return Err(DispatchError::malformed("message is not a JSON object"));
        }
        let raw = RawMessage::deserialize(value).map_err(DispatchError::from_json_error)?;

        match (raw.method, raw.id) {
            (Some(method), id) => Ok(Self::Call(InboundCall {
                id,
                method,
                params: raw.params,
            })),
            (None, Some(id)) => {
                let outcome = match raw.error {
                    Some(error) => Err(error),
                    None => Ok(raw.success.unwrap_or(Value::Null)),
                };
                Ok(Self::Response(InboundResponse { id, outcome }))
            }
            (None, None) => Err(DispatchError::malformed(
                "message has neither a method nor an id",
            )),
        }
    }
}

/// Reads just the `id` of a message that failed to decode.
///
/// Returns `None` unless `text` is a JSON object whose `id` is itself a
/// valid correlation id, so a call with a bad `method` or `params` can
/// still be answered.
#[must_use]
pub fn recover_id(text: &str) -> Option<CallId> {
    let mut value: Value = serde_json::from_str(text).ok()?;
    let id = value.as_object_mut()?.remove("id")?;
    CallId::deserialize(id).ok()
}

/// Parameters of an `execute` call, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteParams {
    /// Plugin identifier.
    pub api: String,
    /// Method within the plugin.
    pub method: String,
    /// Method parameters, when supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl From<PushCall> for ExecuteParams {
    fn from(call: PushCall) -> Self {
        Self {
            api: call.api,
            method: call.method,
            params: call.params,
        }
    }
}

/// Parameters of `init` and `deinit`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LifecycleParams {
    /// Plugin identifier.
    pub plugin: String,
}

/// Body of an out-of-band error report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReportBody {
    /// Failure description.
    pub message: String,
    /// Diagnostic context.
    pub stacktrace: String,
}

/// Message the client sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    /// Client-initiated call.
    Call {
        /// Correlation id allocated by the pending-call table.
        id: CallId,
        /// Method name.
        method: String,
        /// Parameters, when supplied.
        #[serde(skip_serializing_if = "Option::is_none")]
        params: Option<Value>,
    },
    /// Successful answer to a desktop call.
    Success {
        /// Id of the answered call.
        id: CallId,
        /// Result payload.
        success: Value,
    },
    /// Failed answer to a desktop call.
    Failure {
        /// Id of the answered call.
        id: CallId,
        /// Error payload.
        error: Value,
    },
    /// Out-of-band error report; expects no response.
    ErrorReport {
        /// Report body.
        error: ErrorReportBody,
    },
}

impl OutboundMessage {
    /// Wraps a plugin push in the `execute` envelope.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Serialize`] if the parameters cannot be
    /// represented as JSON.
    pub fn execute(id: CallId, call: PushCall) -> Result<Self, DispatchError> {
        let params = serde_json::to_value(ExecuteParams::from(call))?;
        Ok(Self::Call {
            id,
            method: EXECUTE_METHOD.to_owned(),
            params: Some(params),
        })
    }

    /// Builds an error report message.
    #[must_use]
    pub fn error_report(report: ErrorReport) -> Self {
        Self::ErrorReport {
            error: ErrorReportBody {
                message: report.message,
                stacktrace: report.stacktrace,
            },
        }
    }

    /// Serialises the message to its wire text.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Serialize`] when encoding fails.
    pub fn encode(&self) -> Result<String, DispatchError> {
        serde_json::to_string(self).map_err(DispatchError::from)
    }
}
