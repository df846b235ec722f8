//! Rate records, per-trip overrides and the resolver that turns them into money
use crate::directory::MasterData;
use crate::error::{ValidationError, WireError};
use crate::trip::Trip;
use crate::types::TripDate;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// The four counterparty roles a per-ton rate is resolved against.
#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum RatePartyType {
    #[n(0)]
    MineQuarry,
    #[n(1)]
    VendorCustomer,
    #[n(2)]
    RoyaltyOwner,
    #[n(3)]
    TransportOwner,
}

impl RatePartyType {
    pub const ALL: [RatePartyType; 4] = [
        RatePartyType::VendorCustomer,
        RatePartyType::MineQuarry,
        RatePartyType::TransportOwner,
        RatePartyType::RoyaltyOwner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RatePartyType::MineQuarry => "mine-quarry",
            RatePartyType::VendorCustomer => "vendor-customer",
            RatePartyType::RoyaltyOwner => "royalty-owner",
            RatePartyType::TransportOwner => "transport-owner",
        }
    }
}

impl fmt::Display for RatePartyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatePartyType {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "mine-quarry" => Ok(RatePartyType::MineQuarry),
            "vendor-customer" => Ok(RatePartyType::VendorCustomer),
            "royalty-owner" => Ok(RatePartyType::RoyaltyOwner),
            "transport-owner" => Ok(RatePartyType::TransportOwner),
            _ => Err(WireError::UnknownRatePartyType(s.to_string())),
        }
    }
}

/// A manual per-trip rate for one rate-party role.
///
/// `gst_amount` and `total_rate_per_ton` are derived; every setter that
/// touches the rate, the GST percentage or the chargeable flag recomputes
/// them.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct TripRateOverride {
    #[n(0)]
    pub material_type_id: Option<u64>,
    #[n(1)]
    pub rate_party_type: RatePartyType,
    #[n(2)]
    pub rate_party_id: Option<u64>,
    #[n(3)]
    pub pickup_location_id: Option<u64>,
    #[n(4)]
    pub drop_off_location_id: Option<u64>,
    #[n(5)]
    pub total_km: f64,
    #[n(6)]
    pub rate_per_km: f64,
    #[n(7)]
    rate_per_ton: f64,
    #[n(8)]
    gst_chargeable: bool,
    #[n(9)]
    gst_percentage: f64,
    #[n(10)]
    gst_amount: f64,
    #[n(11)]
    total_rate_per_ton: f64,
    #[n(12)]
    pub effective_from: Option<TripDate>,
    #[n(13)]
    pub effective_to: Option<TripDate>,
    #[n(14)]
    pub remarks: String,
}

impl TripRateOverride {
    pub fn new(rate_party_type: RatePartyType) -> Self {
        Self {
            material_type_id: None,
            rate_party_type,
            rate_party_id: None,
            pickup_location_id: None,
            drop_off_location_id: None,
            total_km: 0.0,
            rate_per_km: 0.0,
            rate_per_ton: 0.0,
            gst_chargeable: false,
            gst_percentage: 0.0,
            gst_amount: 0.0,
            total_rate_per_ton: 0.0,
            effective_from: None,
            effective_to: None,
            remarks: String::new(),
        }
    }
    pub fn set_rate_party_id(mut self, id: u64) -> Self {
        self.rate_party_id = Some(id);
        self
    }
    pub fn set_material_type_id(mut self, id: u64) -> Self {
        self.material_type_id = Some(id);
        self
    }
    pub fn set_locations(mut self, pickup_id: u64, drop_off_id: u64) -> Self {
        self.pickup_location_id = Some(pickup_id);
        self.drop_off_location_id = Some(drop_off_id);
        self
    }
    pub fn set_distance(mut self, total_km: f64, rate_per_km: f64) -> Self {
        self.total_km = total_km;
        self.rate_per_km = rate_per_km;
        self
    }
    pub fn set_effective(mut self, from: TripDate, to: Option<TripDate>) -> Self {
        self.effective_from = Some(from);
        self.effective_to = to;
        self
    }
    pub fn set_rate_per_ton(mut self, rate: f64) -> Self {
        self.rate_per_ton = rate;
        self.recompute();
        self
    }
    pub fn set_gst_percentage(mut self, percentage: f64) -> Self {
        self.gst_percentage = percentage;
        self.recompute();
        self
    }
    pub fn set_gst_chargeable(mut self, chargeable: bool) -> Self {
        self.gst_chargeable = chargeable;
        self.recompute();
        self
    }
    pub fn set_remarks(mut self, remarks: &str) -> Self {
        self.remarks = remarks.to_string();
        self
    }

    pub fn rate_per_ton(&self) -> f64 {
        self.rate_per_ton
    }
    pub fn gst_chargeable(&self) -> bool {
        self.gst_chargeable
    }
    pub fn gst_percentage(&self) -> f64 {
        self.gst_percentage
    }
    pub fn gst_amount(&self) -> f64 {
        self.gst_amount
    }
    pub fn total_rate_per_ton(&self) -> f64 {
        self.total_rate_per_ton
    }

    fn recompute(&mut self) {
        self.gst_amount = if self.gst_chargeable {
            self.rate_per_ton * self.gst_percentage / 100.0
        } else {
            0.0
        };
        self.total_rate_per_ton = self.rate_per_ton + self.gst_amount;
    }

    /// The four fields an enabled override cannot go without.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.rate_party_id.is_none() {
            return Err(ValidationError::IncompleteRateOverride("ratePartyId"));
        }
        if self.material_type_id.is_none() {
            return Err(ValidationError::IncompleteRateOverride("materialTypeId"));
        }
        if !(self.rate_per_ton > 0.0) {
            return Err(ValidationError::IncompleteRateOverride("ratePerTon"));
        }
        let Some(from) = self.effective_from else {
            return Err(ValidationError::IncompleteRateOverride("effectiveFrom"));
        };
        if let Some(to) = self.effective_to {
            if to < from {
                return Err(ValidationError::OverrideDates);
            }
        }
        Ok(())
    }
}

/// A master-data rate record, valid from `effective_from` through `effective_to` inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRate {
    pub id: u64,
    pub rate_party_type: RatePartyType,
    pub rate_party_id: u64,
    pub material_type_id: u64,
    pub pickup_location_id: u64,
    pub drop_off_location_id: u64,
    pub total_rate_per_ton: f64,
    pub effective_from: TripDate,
    pub effective_to: Option<TripDate>,
}

impl MaterialRate {
    pub fn is_effective_on(&self, date: TripDate) -> bool {
        self.effective_from <= date && self.effective_to.is_none_or(|to| to >= date)
    }
}

/// Revenue, the three cost lines and profit for one trip.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Default, PartialEq)]
pub struct MoneyFields {
    #[n(0)]
    pub revenue: f64,
    #[n(1)]
    pub material_cost: f64,
    #[n(2)]
    pub transport_cost: f64,
    #[n(3)]
    pub royalty_cost: f64,
    #[n(4)]
    pub profit: f64,
}

impl MoneyFields {
    pub fn from_rates(rates: &ResolvedRates, net_weight: f64) -> Self {
        let net_weight = if net_weight > 0.0 { net_weight } else { 0.0 };

        let revenue = rates.vendor_customer * net_weight;
        let material_cost = rates.mine_quarry * net_weight;
        let transport_cost = rates.transport_owner * net_weight;
        let royalty_cost = rates.royalty_owner * net_weight;

        Self {
            revenue,
            material_cost,
            transport_cost,
            royalty_cost,
            profit: revenue - (material_cost + transport_cost + royalty_cost),
        }
    }
    pub fn total_cost(&self) -> f64 {
        self.material_cost + self.transport_cost + self.royalty_cost
    }
}

/// Per-ton rate for each rate-party role. Zero means nothing matched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolvedRates {
    pub vendor_customer: f64,
    pub mine_quarry: f64,
    pub transport_owner: f64,
    pub royalty_owner: f64,
}

impl ResolvedRates {
    pub fn get(&self, party_type: RatePartyType) -> f64 {
        match party_type {
            RatePartyType::VendorCustomer => self.vendor_customer,
            RatePartyType::MineQuarry => self.mine_quarry,
            RatePartyType::TransportOwner => self.transport_owner,
            RatePartyType::RoyaltyOwner => self.royalty_owner,
        }
    }
    fn set(&mut self, party_type: RatePartyType, rate: f64) {
        match party_type {
            RatePartyType::VendorCustomer => self.vendor_customer = rate,
            RatePartyType::MineQuarry => self.mine_quarry = rate,
            RatePartyType::TransportOwner => self.transport_owner = rate,
            RatePartyType::RoyaltyOwner => self.royalty_owner = rate,
        }
    }
}

/// Resolves rates against one master-data snapshot.
///
/// Names are matched exactly; anything that does not resolve yields a zero
/// rate rather than an error. Among effective records the latest
/// `effective_from` wins and ties go to the smallest record id.
pub struct RateResolver<'a> {
    master: &'a MasterData,
}

impl<'a> RateResolver<'a> {
    pub fn new(master: &'a MasterData) -> Self {
        Self { master }
    }

    /// The table record that applies to `party_type` on this trip, if any.
    pub fn lookup(&self, trip: &Trip, party_type: RatePartyType) -> Option<&'a MaterialRate> {
        let party_id = self
            .master
            .parties
            .lookup(party_type, trip.party_name(party_type))?;
        let material_id = self.master.materials.find_exact(&trip.material.name)?;
        let pickup_id = self.master.sites.find_exact(&trip.pickup_place)?;
        let drop_off_id = self.master.sites.find_exact(&trip.drop_off_place)?;

        self.master
            .rates
            .iter()
            .filter(|rate| {
                rate.rate_party_type == party_type
                    && rate.rate_party_id == party_id
                    && rate.material_type_id == material_id
                    && rate.pickup_location_id == pickup_id
                    && rate.drop_off_location_id == drop_off_id
                    && rate.is_effective_on(trip.date)
            })
            .max_by(|a, b| {
                a.effective_from
                    .cmp(&b.effective_from)
                    .then_with(|| b.id.cmp(&a.id))
            })
    }

    /// Per-ton rate for one role; an enabled override for that role short-circuits the table.
    pub fn rate_for(&self, trip: &Trip, party_type: RatePartyType) -> f64 {
        if let Some(rate_override) = trip.active_override() {
            if rate_override.rate_party_type == party_type {
                trace!(
                    %party_type,
                    rate = rate_override.total_rate_per_ton(),
                    "using trip rate override"
                );
                return rate_override.total_rate_per_ton();
            }
        }

        match self.lookup(trip, party_type) {
            Some(rate) => {
                trace!(
                    %party_type,
                    rate_id = rate.id,
                    rate = rate.total_rate_per_ton,
                    "matched rate record"
                );
                rate.total_rate_per_ton
            }
            None => {
                trace!(%party_type, "no rate record matched");
                0.0
            }
        }
    }

    pub fn rates(&self, trip: &Trip) -> ResolvedRates {
        let mut rates = ResolvedRates::default();
        for party_type in RatePartyType::ALL {
            rates.set(party_type, self.rate_for(trip, party_type));
        }
        rates
    }

    pub fn resolve(&self, trip: &Trip) -> MoneyFields {
        MoneyFields::from_rates(&self.rates(trip), trip.weights.net)
    }
}
