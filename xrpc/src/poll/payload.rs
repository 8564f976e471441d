//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Envelopes that travel over the poll-mode HTTP endpoints.

use crate::wire::{CallPayload, CallerInfo, ReplyPayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A call posted to `/xrpc` or handed out by `/xrpcPoll`.
///
/// Extends [`CallPayload`] with the relay target and the instance id that
/// matches the polling client's reply to the waiting caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollCallPayload {
    /// Caller metadata.
    #[serde(rename = "CallerInfo", default)]
    pub caller_info: CallerInfo,

    /// Fully qualified method name.
    #[serde(rename = "Method", default)]
    pub method: String,

    /// Undecoded arguments.
    #[serde(rename = "Args", default)]
    pub args: Value,

    /// Client to relay the call to. Empty means the server runs it itself.
    #[serde(rename = "ToID", default, skip_serializing_if = "String::is_empty")]
    pub to_id: String,

    /// Assigned by the server when the call is queued for a client.
    #[serde(rename = "InstanceID", default, skip_serializing_if = "is_zero")]
    pub instance_id: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl PollCallPayload {
    /// Wraps `call` for delivery to `to_id`.
    pub fn new(call: CallPayload, to_id: impl Into<String>) -> Self {
        Self {
            caller_info: call.caller_info,
            method: call.method,
            args: call.args,
            to_id: to_id.into(),
            instance_id: 0,
        }
    }

    /// Strips the relay fields.
    pub fn into_call(self) -> CallPayload {
        CallPayload {
            caller_info: self.caller_info,
            method: self.method,
            args: self.args,
        }
    }
}

/// A result posted back to `/xrpcReceive`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollReplyPayload {
    /// The reply itself, flattened into the same JSON object.
    #[serde(flatten)]
    pub reply: ReplyPayload,

    /// Copied from the [`PollCallPayload`] being answered.
    #[serde(rename = "InstanceID", default)]
    pub instance_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_wire_names() {
        let call = CallPayload::new(CallerInfo::new("server"), "Ring.Pass", &json!([1])).unwrap();
        let mut payload = PollCallPayload::new(call, "client-7");
        payload.instance_id = 3;

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "CallerInfo": {"CallerID": "server"},
                "Method": "Ring.Pass",
                "Args": [1],
                "ToID": "client-7",
                "InstanceID": 3
            })
        );
    }

    #[test]
    fn test_direct_call_omits_relay_fields() {
        let payload: PollCallPayload =
            serde_json::from_str(r#"{"Method":"Calc.Product","Args":{"A":3,"B":4}}"#).unwrap();
        assert!(payload.to_id.is_empty());
        assert_eq!(payload.instance_id, 0);
        assert_eq!(payload.into_call().method, "Calc.Product");
    }

    #[test]
    fn test_reply_is_flattened() {
        let reply = PollReplyPayload {
            reply: ReplyPayload::business_error("nope"),
            instance_id: 9,
        };
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["Error"], "nope");
        assert_eq!(value["InstanceID"], 9);

        let back: PollReplyPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back, reply);
    }
}
