use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

/// Signature scheme used by the payment provider: base64 HMAC-SHA256 over
/// the notification URL concatenated with the raw request body.
pub fn sign_event(notification_url: &str, body: &[u8], key: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes()).expect("valid key");
    mac.update(notification_url.as_bytes());
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

pub fn verify_event(notification_url: &str, body: &[u8], key: &str, signature: &str) -> bool {
    let expected = sign_event(notification_url, body, key);
    constant_time_eq(expected.as_bytes(), signature.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Subset of the provider's webhook envelope this service acts on.
#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEventData {
    pub object: PaymentEventObject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEventObject {
    pub payment: Payment,
}

#[derive(Debug, Deserialize)]
pub struct Payment {
    pub status: String,
    /// Carries the paying member's identity-provider user id, set when the
    /// checkout link is created.
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "signature-key";
    const URL: &str = "https://memx.example.com/v1/payments/webhook";

    #[test]
    fn signature_round_trips() {
        let body = br#"{"type":"payment.updated"}"#;
        let sig = sign_event(URL, body, KEY);
        assert!(verify_event(URL, body, KEY, &sig));
    }

    #[test]
    fn tampered_body_fails_verification() {
        let sig = sign_event(URL, b"original", KEY);
        assert!(!verify_event(URL, b"tampered", KEY, &sig));
    }

    #[test]
    fn signature_is_bound_to_the_notification_url() {
        let body = b"payload";
        let sig = sign_event(URL, body, KEY);
        assert!(!verify_event("https://other.example.com/hook", body, KEY, &sig));
    }

    #[test]
    fn event_envelope_parses() {
        let event: PaymentEvent = serde_json::from_str(
            r#"{
                "type": "payment.updated",
                "data": {"object": {"payment": {"status": "COMPLETED", "note": "user_123"}}}
            }"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "payment.updated");
        assert_eq!(event.data.object.payment.status, "COMPLETED");
        assert_eq!(event.data.object.payment.note.as_deref(), Some("user_123"));
    }
}
