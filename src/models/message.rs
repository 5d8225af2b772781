use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::position::Position;

/// Name under which an actor is reachable on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActorId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Performative {
    Request,
    Bid,
    Accept,
    Reject,
    Inform,
}

/// Protocol payloads, tagged by performative on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "performative", rename_all = "kebab-case")]
pub enum Message {
    /// Call for proposals broadcast by a passenger.
    Request { pickup: Position },
    Bid { eta: u32, position: Position },
    Accept {
        pickup: Position,
        destination: Position,
        passenger: ActorId,
    },
    Reject,
    /// Arrival notice from the vehicle that carried the passenger.
    Inform,
}

impl Message {
    pub fn performative(&self) -> Performative {
        match self {
            Message::Request { .. } => Performative::Request,
            Message::Bid { .. } => Performative::Bid,
            Message::Accept { .. } => Performative::Accept,
            Message::Reject => Performative::Reject,
            Message::Inform => Performative::Inform,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    pub sender: ActorId,
    pub recipient: ActorId,
    pub message: Message,
    pub sent_at: DateTime<Utc>,
}

impl Envelope {
    pub fn new(sender: ActorId, recipient: ActorId, message: Message) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            recipient,
            message,
            sent_at: Utc::now(),
        }
    }

    pub fn performative(&self) -> Performative {
        self.message.performative()
    }
}
