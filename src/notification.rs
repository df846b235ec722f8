//! Fan-out notifications addressed to a role and/or a named user
use crate::types::{Role, TimeStamp};
use crate::utils;

#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone, Copy)]
pub enum NotificationKind {
    #[n(0)]
    TripReceived,
    #[n(1)]
    TripValidated,
    #[n(2)]
    TripSentBack,
    #[n(3)]
    UpdateRequested,
    #[n(4)]
    IssueRaised,
    #[n(5)]
    DeleteRequested,
    #[n(6)]
    TripDeleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TripReceived => "trip-received",
            NotificationKind::TripValidated => "trip-validated",
            NotificationKind::TripSentBack => "trip-sent-back",
            NotificationKind::UpdateRequested => "update-request",
            NotificationKind::IssueRaised => "issue",
            NotificationKind::DeleteRequested => "delete-request",
            NotificationKind::TripDeleted => "trip-deleted",
        }
    }
}

#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone)]
pub struct Notification {
    // bech32 encoded uuid7
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub message: String,
    #[n(2)]
    pub kind: NotificationKind,
    #[n(3)]
    pub target_role: Option<Role>,
    #[n(4)]
    pub target_user: Option<String>,
    #[n(5)]
    pub trip_id: u64,
    #[n(6)]
    pub request_type: Option<String>,
    #[n(7)]
    pub requester_name: String,
    #[n(8)]
    pub requester_role: Role,
    #[n(9)]
    pub request_message: Option<String>,
    #[n(10)]
    pub requester_contact: Option<String>,
    #[n(11)]
    pub created_at: TimeStamp,
    #[n(12)]
    pub read: bool,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        message: String,
        trip_id: u64,
        requester_name: String,
        requester_role: Role,
        created_at: TimeStamp,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            id: utils::new_uuid_to_bech32("notify")?,
            message,
            kind,
            target_role: None,
            target_user: None,
            trip_id,
            request_type: None,
            requester_name,
            requester_role,
            request_message: None,
            requester_contact: None,
            created_at,
            read: false,
        })
    }
    pub fn to_role(mut self, role: Role) -> Self {
        self.target_role = Some(role);
        self
    }
    pub fn to_user(mut self, user: &str) -> Self {
        self.target_user = Some(user.to_string());
        self
    }
    pub fn with_request(mut self, request_type: &str, message: &str) -> Self {
        self.request_type = Some(request_type.to_string());
        if !message.is_empty() {
            self.request_message = Some(message.to_string());
        }
        self
    }
    pub fn with_contact(mut self, contact: Option<&str>) -> Self {
        self.requester_contact = contact.map(str::to_string);
        self
    }
    /// Whether a dashboard for `role`/`user` should show this notification.
    /// A named user narrows a role target; a user-only target matches on name alone.
    pub fn is_for(&self, role: Role, user: &str) -> bool {
        match (&self.target_role, &self.target_user) {
            (Some(r), Some(u)) => *r == role && u == user,
            (Some(r), None) => *r == role,
            (None, Some(u)) => u == user,
            (None, None) => false,
        }
    }
}

/// Receives notifications produced by workflow transitions.
pub trait NotificationSink: Send + Sync {
    fn create(&self, notification: &Notification) -> anyhow::Result<()>;
}
