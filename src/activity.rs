//! Append-only trip activity log entries
use crate::types::{Attachment, Role, TimeStamp};
use std::fmt;

#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone, Copy)]
pub enum ActivityKind {
    #[n(0)]
    Received,
    #[n(1)]
    Validated,
    #[n(2)]
    SentBackPickup,
    #[n(3)]
    SentBackDropoff,
    #[n(4)]
    IssueRaised,
    #[n(5)]
    UpdateRequested,
    #[n(6)]
    DeleteRequested,
    #[n(7)]
    Reply,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Received => "received",
            ActivityKind::Validated => "validated",
            ActivityKind::SentBackPickup => "sent-back-pickup",
            ActivityKind::SentBackDropoff => "sent-back-dropoff",
            ActivityKind::IssueRaised => "raise-issue",
            ActivityKind::UpdateRequested => "request-update",
            ActivityKind::DeleteRequested => "request-delete",
            ActivityKind::Reply => "reply",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a trip's activity log. Entries are never edited or deleted on their own.
#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone)]
pub struct TripActivity {
    #[n(0)]
    pub trip_id: u64,
    #[n(1)]
    pub action: ActivityKind,
    #[n(2)]
    pub message: String,
    #[n(3)]
    pub attachments: Vec<Attachment>,
    #[n(4)]
    pub actor_name: String,
    #[n(5)]
    pub actor_role: Role,
    #[n(6)]
    pub created_at: TimeStamp,
}

impl TripActivity {
    pub fn new(
        trip_id: u64,
        action: ActivityKind,
        message: String,
        actor_name: String,
        actor_role: Role,
        created_at: TimeStamp,
    ) -> Self {
        Self {
            trip_id,
            action,
            message,
            attachments: vec![],
            actor_name,
            actor_role,
            created_at,
        }
    }
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
    /// CBOR encoding of the entry together with its sha256 digest.
    pub fn build(&self) -> anyhow::Result<(String, Vec<u8>)> {
        let cbor = minicbor::to_vec(self)?;
        let hash = sha256::digest(&cbor);

        Ok((hash, cbor))
    }
}
