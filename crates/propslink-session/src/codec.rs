// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire codec for the print-service protocol.
//
// One JSON object per frame, discriminated by its `type` field.  Client
// messages that open or advance a handshake carry `protocol_version`; the
// per-job ack and status reports do not.  Encoding is infallible; decoding
// either yields a complete `ServerMessage` or a `ProtocolError`, never a
// partially populated one.

use serde_json::{Map, Value, json};

use propslink_core::error::ProtocolError;
use propslink_core::types::{JobRequest, JobStatus, PrinterInfo};

/// Protocol version tag sent on client-originated handshake messages.
pub const PROTOCOL_VERSION: &str = "1";

/// Fields a `print` message must carry, in the order they are checked.
pub const PRINT_REQUIRED_FIELDS: [&str; 5] =
    ["job_id", "printer_id", "barcode", "asset_name", "category_name"];

/// A decoded server-to-client message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    AuthResult {
        success: bool,
        server_name: String,
        new_token: Option<String>,
        /// Reason given on failure, if any.
        message: Option<String>,
    },
    PairingApproved {
        token: String,
        server_name: String,
    },
    PairingDenied,
    PairingPending {
        client_id: String,
        message: String,
    },
    Print(JobRequest),
    Error {
        code: String,
        message: String,
    },
    ForceDisconnect {
        reason: Option<String>,
    },
}

impl ServerMessage {
    /// The wire `type` tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthResult { .. } => "auth_result",
            Self::PairingApproved { .. } => "pairing_approved",
            Self::PairingDenied => "pairing_denied",
            Self::PairingPending { .. } => "pairing_pending",
            Self::Print(_) => "print",
            Self::Error { .. } => "error",
            Self::ForceDisconnect { .. } => "force_disconnect",
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// `authenticate`: present a token together with the local printer roster.
pub fn encode_authenticate(token: &str, client_name: &str, printers: &[PrinterInfo]) -> String {
    let printers: Vec<Value> = printers
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "name": p.name,
                "status": p.status,
                "templates": p.templates,
            })
        })
        .collect();

    json!({
        "type": "authenticate",
        "protocol_version": PROTOCOL_VERSION,
        "token": token,
        "client_name": client_name,
        "printers": printers,
    })
    .to_string()
}

/// `pairing_request`: ask the server for a token.
pub fn encode_pairing_request(client_name: &str) -> String {
    json!({
        "type": "pairing_request",
        "protocol_version": PROTOCOL_VERSION,
        "client_name": client_name,
    })
    .to_string()
}

/// `print_ack`: the job was received (not that it was printed).
pub fn encode_print_ack(job_id: &str) -> String {
    json!({
        "type": "print_ack",
        "job_id": job_id,
    })
    .to_string()
}

/// `print_status`: terminal outcome of a job.  `error` is `null` when absent.
pub fn encode_print_status(job_id: &str, status: JobStatus, error: Option<&str>) -> String {
    json!({
        "type": "print_status",
        "job_id": job_id,
        "status": status.as_str(),
        "error": error,
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Parse one inbound frame.
pub fn decode(raw: &str) -> Result<ServerMessage, ProtocolError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ProtocolError::MalformedPayload(format!("invalid JSON: {e}")))?;

    let Value::Object(obj) = value else {
        return Err(ProtocolError::MalformedPayload(
            "message is not a JSON object".into(),
        ));
    };

    let kind = match obj.get("type") {
        None | Some(Value::Null) => return Err(ProtocolError::MissingType),
        Some(Value::String(s)) => s.as_str(),
        Some(other) => return Err(ProtocolError::UnknownType(other.to_string())),
    };

    match kind {
        "auth_result" => Ok(ServerMessage::AuthResult {
            success: required_bool(&obj, "success")?,
            server_name: required_str(&obj, "server_name")?,
            new_token: optional_str(&obj, "new_token")?.filter(|t| !t.is_empty()),
            message: optional_str(&obj, "message")?,
        }),
        "pairing_approved" => Ok(ServerMessage::PairingApproved {
            token: required_str(&obj, "token")?,
            server_name: required_str(&obj, "server_name")?,
        }),
        "pairing_denied" => Ok(ServerMessage::PairingDenied),
        "pairing_pending" => Ok(ServerMessage::PairingPending {
            client_id: required_id(&obj, "client_id")?,
            message: required_str(&obj, "message")?,
        }),
        "print" => decode_print(&obj).map(ServerMessage::Print),
        "error" => Ok(ServerMessage::Error {
            code: required_id(&obj, "code")?,
            message: required_str(&obj, "message")?,
        }),
        "force_disconnect" => Ok(ServerMessage::ForceDisconnect {
            reason: optional_str(&obj, "reason")?,
        }),
        other => Err(ProtocolError::UnknownType(other.to_string())),
    }
}

fn decode_print(obj: &Map<String, Value>) -> Result<JobRequest, ProtocolError> {
    // Report the first absent field before any type checks, so the error
    // names the field the server forgot rather than one it got wrong.
    for field in PRINT_REQUIRED_FIELDS {
        if obj.get(field).is_none_or(Value::is_null) {
            return Err(ProtocolError::MissingField(field));
        }
    }

    let quantity = match obj.get("quantity") {
        None | Some(Value::Null) => 1,
        Some(v) => v
            .as_u64()
            .and_then(|q| u32::try_from(q).ok())
            .ok_or_else(|| invalid("quantity", "a non-negative integer"))?,
    };

    Ok(JobRequest {
        job_id: required_id(obj, "job_id")?,
        printer_id: required_id(obj, "printer_id")?,
        barcode: required_str(obj, "barcode")?,
        asset_name: required_str(obj, "asset_name")?,
        category_name: required_str(obj, "category_name")?,
        quantity,
        department_name: optional_str(obj, "department_name")?,
        site_short_name: optional_str(obj, "site_short_name")?,
        qr_content: optional_str(obj, "qr_content")?,
        location_name: optional_str(obj, "location_name")?,
        location_description: optional_str(obj, "location_description")?,
        location_categories: optional_str(obj, "location_categories")?,
        location_departments: optional_str(obj, "location_departments")?,
    })
}

fn invalid(field: &str, expected: &str) -> ProtocolError {
    ProtocolError::MalformedPayload(format!("field '{field}' must be {expected}"))
}

fn required_str(obj: &Map<String, Value>, field: &'static str) -> Result<String, ProtocolError> {
    optional_str(obj, field)?.ok_or(ProtocolError::MissingField(field))
}

fn optional_str(obj: &Map<String, Value>, field: &str) -> Result<Option<String>, ProtocolError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(field, "a string")),
    }
}

fn required_bool(obj: &Map<String, Value>, field: &'static str) -> Result<bool, ProtocolError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ProtocolError::MissingField(field)),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(invalid(field, "a boolean")),
    }
}

/// Identifiers arrive as strings or integers depending on the server.
fn required_id(obj: &Map<String, Value>, field: &'static str) -> Result<String, ProtocolError> {
    optional_id(obj, field)?.ok_or(ProtocolError::MissingField(field))
}

fn optional_id(obj: &Map<String, Value>, field: &str) -> Result<Option<String>, ProtocolError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(Some(n.to_string())),
        Some(_) => Err(invalid(field, "a string or integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).expect("encoder produced invalid JSON")
    }

    fn print_payload() -> Value {
        json!({
            "type": "print",
            "job_id": "J1",
            "printer_id": "1",
            "barcode": "BEAMS-1",
            "asset_name": "Mic",
            "category_name": "Audio",
        })
    }

    #[test]
    fn authenticate_carries_version_token_and_roster() {
        let printers = vec![PrinterInfo {
            id: "1".into(),
            name: "Zebra".into(),
            status: "online".into(),
            templates: vec!["Square".into()],
        }];
        let msg = parse(&encode_authenticate("T1", "Front Desk", &printers));
        assert_eq!(msg["type"], "authenticate");
        assert_eq!(msg["protocol_version"], PROTOCOL_VERSION);
        assert_eq!(msg["token"], "T1");
        assert_eq!(msg["client_name"], "Front Desk");
        assert_eq!(msg["printers"][0]["id"], "1");
        assert_eq!(msg["printers"][0]["templates"][0], "Square");
    }

    #[test]
    fn pairing_request_carries_version() {
        let msg = parse(&encode_pairing_request("Front Desk"));
        assert_eq!(msg["type"], "pairing_request");
        assert_eq!(msg["protocol_version"], PROTOCOL_VERSION);
        assert_eq!(msg["client_name"], "Front Desk");
    }

    #[test]
    fn job_reports_have_no_version() {
        let ack = parse(&encode_print_ack("J1"));
        assert_eq!(ack["type"], "print_ack");
        assert_eq!(ack["job_id"], "J1");
        assert!(ack.get("protocol_version").is_none());

        let ok = parse(&encode_print_status("J1", JobStatus::Completed, None));
        assert_eq!(ok["type"], "print_status");
        assert_eq!(ok["status"], "completed");
        assert!(ok["error"].is_null());
        assert!(ok.get("protocol_version").is_none());

        let failed = parse(&encode_print_status("J1", JobStatus::Failed, Some("paper out")));
        assert_eq!(failed["status"], "failed");
        assert_eq!(failed["error"], "paper out");
    }

    #[test]
    fn decodes_print_with_defaults() {
        let msg = decode(&print_payload().to_string()).unwrap();
        let ServerMessage::Print(job) = msg else {
            panic!("expected print, got {msg:?}");
        };
        assert_eq!(job, JobRequest::new("J1", "1", "BEAMS-1", "Mic", "Audio"));
    }

    #[test]
    fn decodes_print_optional_fields_and_numeric_ids() {
        let mut payload = print_payload();
        payload["job_id"] = json!(42);
        payload["printer_id"] = json!(7);
        payload["quantity"] = json!(3);
        payload["department_name"] = json!("Sound");
        payload["site_short_name"] = json!("HQ");
        payload["qr_content"] = json!("https://beams.example.com/a/1");
        payload["location_name"] = json!("Store Room");

        let ServerMessage::Print(job) = decode(&payload.to_string()).unwrap() else {
            panic!("expected print");
        };
        assert_eq!(job.job_id, "42");
        assert_eq!(job.printer_id, "7");
        assert_eq!(job.quantity, 3);
        assert_eq!(job.department_name.as_deref(), Some("Sound"));
        assert_eq!(job.site_short_name.as_deref(), Some("HQ"));
        assert_eq!(job.qr_payload(), "https://beams.example.com/a/1");
        assert_eq!(job.location_name.as_deref(), Some("Store Room"));
    }

    #[test]
    fn print_missing_field_is_named() {
        for field in PRINT_REQUIRED_FIELDS {
            let mut payload = print_payload();
            payload.as_object_mut().unwrap().remove(field);
            assert_eq!(
                decode(&payload.to_string()),
                Err(ProtocolError::MissingField(field)),
                "removing {field}"
            );
        }
    }

    #[test]
    fn missing_and_unknown_type() {
        assert_eq!(decode(r#"{"job_id": "J1"}"#), Err(ProtocolError::MissingType));
        assert_eq!(
            decode(r#"{"type": "reboot"}"#),
            Err(ProtocolError::UnknownType("reboot".into()))
        );
        assert!(matches!(
            decode(r#"{"type": 5}"#),
            Err(ProtocolError::UnknownType(_))
        ));
    }

    #[test]
    fn malformed_payloads() {
        assert!(matches!(decode("not json"), Err(ProtocolError::MalformedPayload(_))));
        assert!(matches!(decode("[1, 2]"), Err(ProtocolError::MalformedPayload(_))));

        let mut payload = print_payload();
        payload["quantity"] = json!("two");
        assert!(matches!(
            decode(&payload.to_string()),
            Err(ProtocolError::MalformedPayload(_))
        ));
    }

    #[test]
    fn decodes_handshake_messages() {
        assert_eq!(
            decode(r#"{"type": "auth_result", "success": true, "server_name": "BEAMS", "new_token": "T2"}"#),
            Ok(ServerMessage::AuthResult {
                success: true,
                server_name: "BEAMS".into(),
                new_token: Some("T2".into()),
                message: None,
            })
        );
        assert_eq!(
            decode(r#"{"type": "pairing_approved", "token": "T1", "server_name": "BEAMS"}"#),
            Ok(ServerMessage::PairingApproved {
                token: "T1".into(),
                server_name: "BEAMS".into(),
            })
        );
        assert_eq!(
            decode(r#"{"type": "pairing_approved", "server_name": "BEAMS"}"#),
            Err(ProtocolError::MissingField("token"))
        );
        assert_eq!(decode(r#"{"type": "pairing_denied"}"#), Ok(ServerMessage::PairingDenied));
        assert_eq!(
            decode(r#"{"type": "pairing_pending", "client_id": 12, "message": "waiting"}"#),
            Ok(ServerMessage::PairingPending {
                client_id: "12".into(),
                message: "waiting".into(),
            })
        );
        assert_eq!(
            decode(r#"{"type": "error", "code": "rate_limited", "message": "slow down"}"#),
            Ok(ServerMessage::Error {
                code: "rate_limited".into(),
                message: "slow down".into(),
            })
        );
        assert_eq!(
            decode(r#"{"type": "force_disconnect"}"#),
            Ok(ServerMessage::ForceDisconnect { reason: None })
        );
    }

    #[test]
    fn auth_result_requires_success() {
        assert_eq!(
            decode(r#"{"type": "auth_result", "server_name": "BEAMS"}"#),
            Err(ProtocolError::MissingField("success"))
        );
    }

    #[test]
    fn handshake_fields_are_required() {
        let cases = [
            (r#"{"type": "auth_result", "success": true}"#, "server_name"),
            (r#"{"type": "pairing_approved", "token": "T1"}"#, "server_name"),
            (r#"{"type": "pairing_pending", "message": "waiting"}"#, "client_id"),
            (r#"{"type": "pairing_pending", "client_id": "c-1"}"#, "message"),
            (r#"{"type": "error", "message": "slow down"}"#, "code"),
            (r#"{"type": "error", "code": "internal"}"#, "message"),
        ];
        for (raw, field) in cases {
            assert_eq!(decode(raw), Err(ProtocolError::MissingField(field)), "{raw}");
        }
    }
}
