//! Shared value types used across the workflow, resolver and store
use crate::error::WireError;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

/// A point in time, stored as nanoseconds since the epoch in CBOR.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    /// Sortable key used for ordering activity entries in the store.
    pub fn nanos(&self) -> i64 {
        self.0.timestamp_nanos_opt().unwrap_or(i64::MAX)
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl FromStr for TimeStamp {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|_| WireError::InvalidTimestamp(s.to_string()))
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// A calendar day. Trips, rate records and overrides are all dated at day granularity.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct TripDate(NaiveDate);

impl TripDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }
    pub fn to_naive_date(&self) -> NaiveDate {
        self.0
    }
    /// Midnight UTC on this day.
    pub fn start_of_day(&self) -> TimeStamp {
        TimeStamp(self.0.and_time(NaiveTime::MIN).and_utc())
    }
}

impl From<NaiveDate> for TripDate {
    fn from(value: NaiveDate) -> Self {
        TripDate(value)
    }
}

impl fmt::Display for TripDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for TripDate {
    type Err = WireError;

    // accepts plain dates as well as full RFC 3339 timestamps sent by older clients
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self(date));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.date_naive()))
            .map_err(|_| WireError::InvalidDate(s.to_string()))
    }
}

impl<C> minicbor::Encode<C> for TripDate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.i32(self.0.num_days_from_ce())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TripDate {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let days = d.i32()?;

        NaiveDate::from_num_days_from_ce_opt(days)
            .map(TripDate)
            .ok_or(minicbor::decode::Error::message(
                "failed to convert day count to a calendar date",
            ))
    }
}

/// Application roles. Admin, manager and accountant are the privileged back-office roles.
#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum Role {
    #[n(0)]
    Admin,
    #[n(1)]
    Manager,
    #[n(2)]
    Accountant,
    #[n(3)]
    PickupSupervisor,
    #[n(4)]
    DropoffSupervisor,
    #[n(5)]
    Guest,
}

impl Role {
    pub const PRIVILEGED: [Role; 3] = [Role::Admin, Role::Manager, Role::Accountant];
    pub const SUPERVISORS: [Role; 2] = [Role::PickupSupervisor, Role::DropoffSupervisor];

    pub fn is_privileged(&self) -> bool {
        Self::PRIVILEGED.contains(self)
    }
    pub fn is_supervisor(&self) -> bool {
        Self::SUPERVISORS.contains(self)
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Accountant => "accountant",
            Role::PickupSupervisor => "pickup_supervisor",
            Role::DropoffSupervisor => "dropoff_supervisor",
            Role::Guest => "guest",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "accountant" => Ok(Role::Accountant),
            "pickupsupervisor" => Ok(Role::PickupSupervisor),
            "dropoffsupervisor" => Ok(Role::DropoffSupervisor),
            "guest" => Ok(Role::Guest),
            _ => Err(WireError::UnknownRole(s.to_string())),
        }
    }
}

/// The user performing an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub role: Role,
    pub contact: Option<String>,
}

impl Actor {
    pub fn new(name: &str, role: Role) -> Self {
        Self {
            name: name.to_string(),
            role,
            contact: None,
        }
    }
    pub fn with_contact(mut self, contact: &str) -> Self {
        self.contact = Some(contact.to_string());
        self
    }
}

/// An uploaded document. `url` may be a data URI; contents are never interpreted.
#[derive(
    minicbor::Encode,
    minicbor::Decode,
    serde::Serialize,
    serde::Deserialize,
    Debug,
    Clone,
    PartialEq,
    Eq,
)]
pub struct Attachment {
    #[n(0)]
    pub name: String,
    #[n(1)]
    pub url: String,
}

impl Attachment {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// A named counterparty, material or vehicle as entered on a trip.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyRef {
    #[n(0)]
    pub name: String,
    // true when the name had no match in master data at entry time
    #[n(1)]
    pub is_one_off: bool,
}

impl PartyRef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            is_one_off: false,
        }
    }
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }
}
