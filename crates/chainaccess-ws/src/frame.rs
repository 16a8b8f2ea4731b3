//! Subscription frames exchanged over the socket.

use serde::{Deserialize, Serialize};

/// Client → server request to start a subscription.
#[derive(Debug, Serialize)]
pub struct SubscribeFrame<'a, A: Serialize> {
    pub subscription_id: &'a str,
    pub action: &'static str,
    pub topic: &'a str,
    pub arguments: &'a A,
}

impl<'a, A: Serialize> SubscribeFrame<'a, A> {
    pub fn new(subscription_id: &'a str, topic: &'a str, arguments: &'a A) -> Self {
        Self {
            subscription_id,
            action: "subscribe",
            topic,
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Any server → client frame. Which fields are present decides its meaning.
#[derive(Debug, Deserialize)]
struct ServerFrame {
    #[serde(default)]
    subscription_id: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    payload: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

/// A server frame as seen by one subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// The server accepted the subscribe request.
    Ack,
    Data(serde_json::Value),
    /// A rejection before the ack, a stream failure after it.
    Error(ErrorBody),
    /// Addressed to another subscription, or nothing this client acts on.
    Ignored,
}

/// Classify a text frame for `subscription_id`.
///
/// Frames without a subscription id are treated as connection-wide and
/// apply to every subscription on the socket.
pub fn parse(text: &str, subscription_id: &str) -> Result<Inbound, String> {
    let frame: ServerFrame = serde_json::from_str(text).map_err(|e| e.to_string())?;

    if let Some(id) = &frame.subscription_id {
        if id != subscription_id {
            return Ok(Inbound::Ignored);
        }
    }
    if let Some(err) = frame.error {
        return Ok(Inbound::Error(err));
    }
    if let Some(payload) = frame.payload {
        return Ok(Inbound::Data(payload));
    }
    match frame.action.as_deref() {
        Some("subscribe") => Ok(Inbound::Ack),
        _ => Ok(Inbound::Ignored),
    }
}
