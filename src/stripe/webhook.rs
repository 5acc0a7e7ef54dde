//! Webhook signature verification and event decoding.
//!
//! The gateway signs each delivery with `Stripe-Signature: t=<ts>,v1=<hex>`,
//! where `v1` is HMAC-SHA256 over `"<ts>.<raw body>"`. Verification runs on
//! the raw bytes before any JSON parsing, so a delivery that fails the
//! signature check is rejected without being interpreted.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Event type that settles a pending payment
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Signed event envelope. Only the type and the session id inside
/// `data.object` are of interest to reconciliation.
#[derive(Debug, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: EventObject,
}

#[derive(Debug, Deserialize)]
pub struct EventObject {
    pub id: String,
}

impl Event {
    pub fn is_session_completed(&self) -> bool {
        self.event_type == CHECKOUT_SESSION_COMPLETED
    }

    pub fn session_id(&self) -> &str {
        &self.data.object.id
    }
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// A tolerance of zero or less disables the timestamp check, which keeps
/// replayed fixtures usable in development.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> AppResult<()> {
    let (timestamp, candidates) = parse_header(header)?;

    if tolerance_secs > 0 && (now - timestamp).abs() > tolerance_secs {
        return Err(AppError::InvalidSignature(
            "Signature timestamp outside tolerance".to_string(),
        ));
    }

    let mut signed_payload = Vec::with_capacity(payload.len() + 16);
    signed_payload.extend_from_slice(timestamp.to_string().as_bytes());
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(payload);

    for candidate in candidates {
        let Ok(bytes) = hex::decode(candidate) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| AppError::Internal("Webhook secret unusable as HMAC key".to_string()))?;
        mac.update(&signed_payload);
        if mac.verify_slice(&bytes).is_ok() {
            return Ok(());
        }
    }

    Err(AppError::InvalidSignature(
        "No signature matched the payload".to_string(),
    ))
}

/// Decode the event envelope from verified bytes
pub fn parse_event(payload: &[u8]) -> AppResult<Event> {
    serde_json::from_slice(payload)
        .map_err(|e| AppError::MalformedPayload(format!("Unreadable event payload: {}", e)))
}

/// Verify then decode, mirroring the gateway SDK's `construct_event`
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> AppResult<Event> {
    verify_signature(payload, header, secret, tolerance_secs, now)?;
    parse_event(payload)
}

/// Split `t=<ts>,v1=<hex>[,v1=<hex>...]` into the timestamp and all v1
/// candidates. Unknown schemes (v0 at least exists in the wild) are ignored.
fn parse_header(header: &str) -> AppResult<(i64, Vec<&str>)> {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse::<i64>().ok();
            }
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    match (timestamp, candidates.is_empty()) {
        (Some(t), false) => Ok((t, candidates)),
        _ => Err(AppError::InvalidSignature(
            "Malformed signature header".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &[u8], timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn completed_body(session_id: &str) -> String {
        format!(
            r#"{{"id":"evt_1","type":"checkout.session.completed","data":{{"object":{{"id":"{}"}}}}}}"#,
            session_id
        )
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = completed_body("cs_test_abc");
        let header = format!("t=1700000000,v1={}", sign(body.as_bytes(), 1_700_000_000));

        let event =
            construct_event(body.as_bytes(), &header, SECRET, 300, 1_700_000_010).unwrap();
        assert!(event.is_session_completed());
        assert_eq!(event.session_id(), "cs_test_abc");
    }

    #[test]
    fn test_tampered_body_rejected() {
        let body = completed_body("cs_test_abc");
        let header = format!("t=1700000000,v1={}", sign(body.as_bytes(), 1_700_000_000));
        let tampered = completed_body("cs_test_xyz");

        let err = verify_signature(tampered.as_bytes(), &header, SECRET, 300, 1_700_000_010)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature(_)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = completed_body("cs_test_abc");
        let mut mac = HmacSha256::new_from_slice(b"whsec_other").unwrap();
        mac.update(format!("1700000000.{}", body).as_bytes());
        let header = format!("t=1700000000,v1={}", hex::encode(mac.finalize().into_bytes()));

        assert!(verify_signature(body.as_bytes(), &header, SECRET, 300, 1_700_000_010).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = completed_body("cs_test_abc");
        let header = format!("t=1700000000,v1={}", sign(body.as_bytes(), 1_700_000_000));

        let err =
            verify_signature(body.as_bytes(), &header, SECRET, 300, 1_700_001_000).unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature(_)));
    }

    #[test]
    fn test_zero_tolerance_skips_timestamp_check() {
        let body = completed_body("cs_test_abc");
        let header = format!("t=1700000000,v1={}", sign(body.as_bytes(), 1_700_000_000));

        assert!(verify_signature(body.as_bytes(), &header, SECRET, 0, 1_900_000_000).is_ok());
    }

    #[test]
    fn test_malformed_header_rejected() {
        let body = completed_body("cs_test_abc");
        for header in ["", "t=123", "v1=deadbeef", "t=abc,v1=deadbeef", "nonsense"] {
            assert!(
                verify_signature(body.as_bytes(), header, SECRET, 300, 123).is_err(),
                "header {:?} should not verify",
                header
            );
        }
    }

    #[test]
    fn test_second_v1_candidate_accepted() {
        let body = completed_body("cs_test_abc");
        let header = format!(
            "t=1700000000,v1=deadbeef,v1={}",
            sign(body.as_bytes(), 1_700_000_000)
        );

        assert!(verify_signature(body.as_bytes(), &header, SECRET, 300, 1_700_000_010).is_ok());
    }

    #[test]
    fn test_unknown_event_type_still_parses() {
        let body = r#"{"id":"evt_2","type":"charge.refunded","data":{"object":{"id":"ch_1"}}}"#;
        let event = parse_event(body.as_bytes()).unwrap();
        assert!(!event.is_session_completed());
    }

    #[test]
    fn test_garbage_payload_is_malformed() {
        let err = parse_event(b"not json").unwrap_err();
        assert!(matches!(err, AppError::MalformedPayload(_)));
    }
}
