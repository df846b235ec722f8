use crate::trip::{PendingRequestType, TripStatus};
use crate::types::Role;
use crate::workflow::ActionKind;

/// Entry-form problems. These block submission and never reach the state machine.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Required field '{0}' is missing")]
    MissingField(&'static str),
    #[error("Field '{field}' must be greater than zero, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("Gross weight {gross} is below empty weight {empty}")]
    GrossBelowEmpty { gross: f64, empty: f64 },
    #[error("Rate override is enabled but '{0}' is not set")]
    IncompleteRateOverride(&'static str),
    #[error("Rate override effective dates are out of order")]
    OverrideDates,
}

/// A transition the state machine refused. The trip is left as it was.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TransitionError {
    #[error("Role '{role}' may not perform '{action}'")]
    Unauthorized { action: ActionKind, role: Role },
    #[error("'{action}' is not available while the trip is '{status}'")]
    InvalidState {
        action: ActionKind,
        status: TripStatus,
    },
    #[error("Trip already has an outstanding '{0}' request")]
    RequestOutstanding(PendingRequestType),
    #[error("Trip entry is locked for '{name}' once it has left pending upload")]
    EntryLocked { name: String },
    #[error("Trip has no {0} to notify")]
    MissingRecipient(&'static str),
}

/// Problems converting the REST payload into domain values.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum WireError {
    #[error("Unknown trip status '{0}'")]
    UnknownStatus(String),
    #[error("Unknown pending request type '{0}'")]
    UnknownRequestType(String),
    #[error("Unknown role '{0}'")]
    UnknownRole(String),
    #[error("Unknown rate party type '{0}'")]
    UnknownRatePartyType(String),
    #[error("Invalid date '{0}'")]
    InvalidDate(String),
    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),
    #[error("Upload field '{field}' is not a JSON attachment list: {reason}")]
    MalformedUploads { field: &'static str, reason: String },
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}
