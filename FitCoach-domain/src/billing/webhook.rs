//! Webhook signature verification and event decoding.
//!
//! The signature header has the form `t=<unix seconds>,v1=<hex hmac>[,v1=...]`.
//! The signed message is `"<t>.<payload>"`, keyed with the endpoint secret.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

use super::stripe::{StripeInvoice, StripeSubscription};
use super::types::{BillingEvent, WebhookEvent};
use super::BillingError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed payload, in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Hex-encoded HMAC-SHA256 of `message`
pub fn hmac_sha256_hex(secret: &str, message: &str) -> Result<String, BillingError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BillingError::Configuration(format!("Invalid webhook secret: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Compare two byte strings without short-circuiting on the first mismatch
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Build a signature header for `payload` signed at `timestamp`
pub fn sign_payload(payload: &str, secret: &str, timestamp: i64) -> Result<String, BillingError> {
    let signature = hmac_sha256_hex(secret, &format!("{}.{}", timestamp, payload))?;
    Ok(format!("t={},v1={}", timestamp, signature))
}

/// Check a signature header against `payload`. `now` is unix seconds.
pub fn verify_signature(payload: &str, header: &str, secret: &str, now: i64) -> Result<(), BillingError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| BillingError::InvalidSignature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(BillingError::InvalidSignature("missing v1 signature".to_string()));
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(BillingError::InvalidSignature("timestamp outside tolerance".to_string()));
    }

    let expected = hmac_sha256_hex(secret, &format!("{}.{}", timestamp, payload))?;
    if signatures
        .iter()
        .any(|candidate| constant_time_eq(candidate.as_bytes(), expected.as_bytes()))
    {
        Ok(())
    } else {
        Err(BillingError::InvalidSignature("signature mismatch".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: serde_json::Value,
}

/// Decode a verified payload into the event the application reacts to
pub fn decode_event(payload: &str) -> Result<WebhookEvent, BillingError> {
    let envelope: WebhookEnvelope = serde_json::from_str(payload)?;
    debug!("Decoding webhook event {}", envelope.event_type);

    let event = match envelope.event_type.as_str() {
        "customer.subscription.created" | "customer.subscription.updated" => {
            let subscription: StripeSubscription = serde_json::from_value(envelope.data.object)?;
            BillingEvent::SubscriptionUpdated(subscription.into())
        }
        "customer.subscription.deleted" => {
            let subscription: StripeSubscription = serde_json::from_value(envelope.data.object)?;
            BillingEvent::SubscriptionDeleted(subscription.into())
        }
        "invoice.payment_failed" => {
            let invoice: StripeInvoice = serde_json::from_value(envelope.data.object)?;
            BillingEvent::PaymentFailed(invoice.into())
        }
        "invoice.payment_succeeded" | "invoice.paid" => {
            let invoice: StripeInvoice = serde_json::from_value(envelope.data.object)?;
            BillingEvent::PaymentSucceeded(invoice.into())
        }
        _ => BillingEvent::Ignored,
    };

    Ok(WebhookEvent::new(envelope.event_type, event))
}
