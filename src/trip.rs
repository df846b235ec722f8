//! Trip records, their workflow metadata and the entry-form builder
use crate::error::{ValidationError, WireError};
use crate::rate::{MoneyFields, RatePartyType, TripRateOverride};
use crate::types::{Attachment, PartyRef, Role, TimeStamp, TripDate};
use std::fmt;
use std::str::FromStr;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripStatus {
    #[n(0)]
    PendingUpload,
    #[n(1)]
    InTransit,
    #[n(2)]
    PendingValidation,
    #[n(3)]
    TripCompleted,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::PendingUpload => "pending upload",
            TripStatus::InTransit => "in transit",
            TripStatus::PendingValidation => "pending validation",
            TripStatus::TripCompleted => "trip completed",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = WireError;

    // "completed" and "validated" are older spellings of the terminal state
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s
            .trim()
            .to_ascii_lowercase()
            .replace(['_', '-'], " ");
        match key.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
            "pending upload" => Ok(TripStatus::PendingUpload),
            "in transit" => Ok(TripStatus::InTransit),
            "pending validation" => Ok(TripStatus::PendingValidation),
            "trip completed" | "completed" | "validated" => Ok(TripStatus::TripCompleted),
            _ => Err(WireError::UnknownStatus(s.to_string())),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingRequestType {
    #[n(0)]
    Update,
    #[n(1)]
    SentBackPickup,
    #[n(2)]
    SentBackDropoff,
    #[n(3)]
    Delete,
}

impl PendingRequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingRequestType::Update => "update",
            PendingRequestType::SentBackPickup => "sent-back-pickup",
            PendingRequestType::SentBackDropoff => "sent-back-dropoff",
            PendingRequestType::Delete => "delete",
        }
    }
}

impl fmt::Display for PendingRequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PendingRequestType {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "update" => Ok(PendingRequestType::Update),
            "sent-back-pickup" => Ok(PendingRequestType::SentBackPickup),
            "sent-back-dropoff" => Ok(PendingRequestType::SentBackDropoff),
            "delete" => Ok(PendingRequestType::Delete),
            _ => Err(WireError::UnknownRequestType(s.to_string())),
        }
    }
}

/// A supervisor request or a send-back awaiting action. A trip carries at most one.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct PendingRequest {
    #[n(0)]
    pub kind: PendingRequestType,
    #[n(1)]
    pub message: String,
    #[n(2)]
    pub by: String,
    #[n(3)]
    pub role: Role,
    #[n(4)]
    pub at: TimeStamp,
}

/// Weighbridge readings in tons.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Default, PartialEq)]
pub struct Weights {
    #[n(0)]
    pub empty: f64,
    #[n(1)]
    pub gross: f64,
    #[n(2)]
    pub net: f64,
}

/// Net weight as derived from a gross and an empty reading, never negative.
pub fn net_of(gross: f64, empty: f64) -> f64 {
    let net = gross - empty;
    if net > 0.0 { net } else { 0.0 }
}

impl Weights {
    /// End-of-trip readings always derive their net, there is no manual path.
    pub fn derived(gross: f64, empty: f64) -> Self {
        Self {
            empty,
            gross,
            net: net_of(gross, empty),
        }
    }
}

/// Weight fields of the entry form.
///
/// Net weight follows `gross - empty` until the user types a net weight
/// directly; from then on it is manual and gross/empty edits leave it alone.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightForm {
    weights: Weights,
    net_manual: bool,
}

impl WeightForm {
    pub fn new() -> Self {
        Self::default()
    }
    /// Starts an edit session from stored readings; the net weight is not manual yet.
    pub fn from_weights(weights: Weights) -> Self {
        Self {
            weights,
            net_manual: false,
        }
    }
    pub fn set_gross(&mut self, gross: f64) {
        self.weights.gross = gross;
        self.recompute();
    }
    pub fn set_empty(&mut self, empty: f64) {
        self.weights.empty = empty;
        self.recompute();
    }
    pub fn set_net(&mut self, net: f64) {
        self.weights.net = net;
        self.net_manual = true;
    }
    pub fn is_net_manual(&self) -> bool {
        self.net_manual
    }
    pub fn weights(&self) -> Weights {
        self.weights
    }
    fn recompute(&mut self) {
        if !self.net_manual {
            self.weights.net = net_of(self.weights.gross, self.weights.empty);
        }
    }
}

/// The five pickup document slots.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Default, PartialEq, Eq)]
pub struct Uploads {
    #[n(0)]
    pub eway_bill: Vec<Attachment>,
    #[n(1)]
    pub invoice: Vec<Attachment>,
    #[n(2)]
    pub wayment_slip: Vec<Attachment>,
    #[n(3)]
    pub royalty_slip: Vec<Attachment>,
    #[n(4)]
    pub tax_invoice: Vec<Attachment>,
}

impl Uploads {
    pub fn is_empty(&self) -> bool {
        self.eway_bill.is_empty()
            && self.invoice.is_empty()
            && self.wayment_slip.is_empty()
            && self.royalty_slip.is_empty()
            && self.tax_invoice.is_empty()
    }
    pub fn len(&self) -> usize {
        self.eway_bill.len()
            + self.invoice.len()
            + self.wayment_slip.len()
            + self.royalty_slip.len()
            + self.tax_invoice.len()
    }
}

/// Written by the drop-off supervisor on receipt.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Receipt {
    #[n(0)]
    pub date: TripDate,
    #[n(1)]
    pub by: String,
    #[n(2)]
    pub role: Role,
    #[n(3)]
    pub end_weights: Weights,
    #[n(4)]
    pub end_wayment_slip: Vec<Attachment>,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Validation {
    #[n(0)]
    pub by: String,
    #[n(1)]
    pub at: TimeStamp,
    #[n(2)]
    pub comments: String,
}

/// One shipment from a pickup site to a drop-off site.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Trip {
    // assigned by the store on create
    #[n(0)]
    pub id: u64,
    #[n(1)]
    pub date: TripDate,
    #[n(2)]
    pub status: TripStatus,
    #[n(3)]
    pub created_by: String,
    #[n(4)]
    pub customer: PartyRef,
    #[n(5)]
    pub quarry: PartyRef,
    #[n(6)]
    pub royalty_owner: PartyRef,
    #[n(7)]
    pub transporter: PartyRef,
    #[n(8)]
    pub vehicle: PartyRef,
    #[n(9)]
    pub material: PartyRef,
    #[n(10)]
    pub pickup_place: String,
    #[n(11)]
    pub drop_off_place: String,
    #[n(12)]
    pub weights: Weights,
    #[n(13)]
    pub money: MoneyFields,
    #[n(14)]
    pub rate_override_enabled: bool,
    #[n(15)]
    pub rate_override: Option<TripRateOverride>,
    #[n(16)]
    pub uploads: Uploads,
    #[n(17)]
    pub receipt: Option<Receipt>,
    #[n(18)]
    pub validation: Option<Validation>,
    #[n(19)]
    pub pending_request: Option<PendingRequest>,
    #[n(20)]
    pub remarks: String,
}

impl Trip {
    /// Name of the counterparty a rate role is resolved against.
    pub fn party_name(&self, party_type: RatePartyType) -> &str {
        match party_type {
            RatePartyType::VendorCustomer => &self.customer.name,
            RatePartyType::MineQuarry => &self.quarry.name,
            RatePartyType::TransportOwner => &self.transporter.name,
            RatePartyType::RoyaltyOwner => &self.royalty_owner.name,
        }
    }
    pub fn party_mut(&mut self, party_type: RatePartyType) -> &mut PartyRef {
        match party_type {
            RatePartyType::VendorCustomer => &mut self.customer,
            RatePartyType::MineQuarry => &mut self.quarry,
            RatePartyType::TransportOwner => &mut self.transporter,
            RatePartyType::RoyaltyOwner => &mut self.royalty_owner,
        }
    }
    pub fn pending_request_type(&self) -> Option<PendingRequestType> {
        self.pending_request.as_ref().map(|r| r.kind)
    }
    /// The override that applies to rate resolution, if any.
    pub fn active_override(&self) -> Option<&TripRateOverride> {
        if self.rate_override_enabled {
            self.rate_override.as_ref()
        } else {
            None
        }
    }
    pub fn received_by(&self) -> Option<&str> {
        self.receipt.as_ref().map(|r| r.by.as_str())
    }
}

/// The trip entry form.
///
/// Collects what a pickup supervisor types in, then checks it with
/// [`TripDraft::validate_and_finalise`]. Money fields are not part of the
/// form; they are resolved once the draft is accepted.
#[derive(Debug, Clone, Default)]
pub struct TripDraft {
    date: Option<TripDate>,
    created_by: String,
    customer: PartyRef,
    quarry: PartyRef,
    royalty_owner: PartyRef,
    transporter: PartyRef,
    vehicle: PartyRef,
    material: PartyRef,
    pickup_place: String,
    drop_off_place: String,
    weights: WeightForm,
    rate_override: Option<TripRateOverride>,
    remarks: String,
}

impl TripDraft {
    pub fn new() -> Self {
        Self::default()
    }
    /// Loads a stored trip into the form for editing.
    pub fn from_trip(trip: &Trip) -> Self {
        Self {
            date: Some(trip.date),
            created_by: trip.created_by.clone(),
            customer: trip.customer.clone(),
            quarry: trip.quarry.clone(),
            royalty_owner: trip.royalty_owner.clone(),
            transporter: trip.transporter.clone(),
            vehicle: trip.vehicle.clone(),
            material: trip.material.clone(),
            pickup_place: trip.pickup_place.clone(),
            drop_off_place: trip.drop_off_place.clone(),
            weights: WeightForm::from_weights(trip.weights),
            rate_override: if trip.rate_override_enabled {
                trip.rate_override.clone()
            } else {
                None
            },
            remarks: trip.remarks.clone(),
        }
    }
    pub fn set_date(mut self, date: TripDate) -> Self {
        self.date = Some(date);
        self
    }
    pub fn set_created_by(mut self, name: &str) -> Self {
        self.created_by = name.trim().to_string();
        self
    }
    pub fn set_customer(mut self, name: &str) -> Self {
        self.customer = PartyRef::new(name);
        self
    }
    pub fn set_quarry(mut self, name: &str) -> Self {
        self.quarry = PartyRef::new(name);
        self
    }
    pub fn set_royalty_owner(mut self, name: &str) -> Self {
        self.royalty_owner = PartyRef::new(name);
        self
    }
    pub fn set_transporter(mut self, name: &str) -> Self {
        self.transporter = PartyRef::new(name);
        self
    }
    pub fn set_vehicle(mut self, number: &str) -> Self {
        self.vehicle = PartyRef::new(number);
        self
    }
    pub fn set_material(mut self, name: &str) -> Self {
        self.material = PartyRef::new(name);
        self
    }
    pub fn set_pickup_place(mut self, place: &str) -> Self {
        self.pickup_place = place.trim().to_string();
        self
    }
    pub fn set_drop_off_place(mut self, place: &str) -> Self {
        self.drop_off_place = place.trim().to_string();
        self
    }
    pub fn set_gross_weight(mut self, gross: f64) -> Self {
        self.weights.set_gross(gross);
        self
    }
    pub fn set_empty_weight(mut self, empty: f64) -> Self {
        self.weights.set_empty(empty);
        self
    }
    /// Typing a net weight makes it manual for the rest of the session.
    pub fn set_net_weight(mut self, net: f64) -> Self {
        self.weights.set_net(net);
        self
    }
    pub fn set_rate_override(mut self, rate_override: TripRateOverride) -> Self {
        self.rate_override = Some(rate_override);
        self
    }
    pub fn clear_rate_override(mut self) -> Self {
        self.rate_override = None;
        self
    }
    pub fn set_remarks(mut self, remarks: &str) -> Self {
        self.remarks = remarks.to_string();
        self
    }
    pub fn weights(&self) -> Weights {
        self.weights.weights()
    }
    pub fn is_net_manual(&self) -> bool {
        self.weights.is_net_manual()
    }
    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    /// Checks required fields and produces an unsaved trip in `pending upload`.
    /// Money fields are left at zero for the caller to resolve.
    pub fn validate_and_finalise(&self) -> Result<Trip, ValidationError> {
        let date = self.date.ok_or(ValidationError::MissingField("date"))?;

        let required = [
            ("createdBy", self.created_by.as_str()),
            ("customer", self.customer.name.as_str()),
            ("material", self.material.name.as_str()),
            ("vehicleNumber", self.vehicle.name.as_str()),
            ("pickupPlace", self.pickup_place.as_str()),
            ("dropOffPlace", self.drop_off_place.as_str()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ValidationError::MissingField(*field));
        }

        let weights = self.weights.weights();
        for (field, value) in [
            ("grossWeight", weights.gross),
            ("emptyWeight", weights.empty),
            ("netWeight", weights.net),
        ] {
            if !(value > 0.0) {
                return Err(ValidationError::NonPositive { field, value });
            }
        }
        if !self.weights.is_net_manual() && weights.gross < weights.empty {
            return Err(ValidationError::GrossBelowEmpty {
                gross: weights.gross,
                empty: weights.empty,
            });
        }

        if let Some(rate_override) = &self.rate_override {
            rate_override.validate()?;
        }

        Ok(Trip {
            id: 0,
            date,
            status: TripStatus::PendingUpload,
            created_by: self.created_by.clone(),
            customer: self.customer.clone(),
            quarry: self.quarry.clone(),
            royalty_owner: self.royalty_owner.clone(),
            transporter: self.transporter.clone(),
            vehicle: self.vehicle.clone(),
            material: self.material.clone(),
            pickup_place: self.pickup_place.clone(),
            drop_off_place: self.drop_off_place.clone(),
            weights,
            money: MoneyFields::default(),
            rate_override_enabled: self.rate_override.is_some(),
            rate_override: self.rate_override.clone(),
            uploads: Uploads::default(),
            receipt: None,
            validation: None,
            pending_request: None,
            remarks: self.remarks.clone(),
        })
    }
}
