//! The REST JSON shape of a trip
//!
//! The backend stores statuses as loose strings and upload slots as
//! JSON-encoded strings. [`TripRecord`] mirrors that payload field for field;
//! converting it into a [`Trip`] normalizes everything once so the rest of
//! the crate only sees enums and attachment lists.
use crate::directory::DirectoryEntry;
use crate::error::WireError;
use crate::rate::{MaterialRate, MoneyFields, TripRateOverride};
use crate::trip::{
    PendingRequest, PendingRequestType, Receipt, Trip, TripStatus, Uploads, Validation, Weights,
};
use crate::types::{Attachment, PartyRef, Role, TripDate};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RateOverrideRecord {
    pub material_type_id: Option<u64>,
    pub rate_party_type: String,
    pub rate_party_id: Option<u64>,
    pub pickup_location_id: Option<u64>,
    pub drop_off_location_id: Option<u64>,
    pub total_km: f64,
    pub rate_per_km: f64,
    pub rate_per_ton: f64,
    pub gst_chargeable: bool,
    pub gst_percentage: f64,
    pub gst_amount: f64,
    pub total_rate_per_ton: f64,
    pub effective_from: Option<String>,
    pub effective_to: Option<String>,
    pub remarks: String,
}

/// A row of the material rate table as the rate endpoint returns it.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterialRateRecord {
    pub id: u64,
    pub rate_party_type: String,
    pub rate_party_id: u64,
    pub material_type_id: u64,
    pub pickup_location_id: u64,
    pub drop_off_location_id: u64,
    pub total_rate_per_ton: f64,
    pub effective_from: String,
    pub effective_to: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TripRecord {
    pub id: u64,
    pub date: String,
    pub status: String,
    pub created_by: String,

    pub customer: String,
    pub customer_is_one_off: bool,
    pub quarry_name: String,
    pub quarry_is_one_off: bool,
    pub royalty_owner_name: String,
    pub royalty_owner_is_one_off: bool,
    pub transporter_name: String,
    pub transporter_is_one_off: bool,
    pub vehicle_number: String,
    pub vehicle_is_one_off: bool,
    pub material: String,
    pub material_is_one_off: bool,

    pub pickup_place: String,
    pub drop_off_place: String,
    pub place: String,

    pub empty_weight: f64,
    pub gross_weight: f64,
    pub net_weight: f64,
    pub end_empty_weight: Option<f64>,
    pub end_gross_weight: Option<f64>,
    pub end_net_weight: Option<f64>,

    pub revenue: f64,
    pub material_cost: f64,
    pub transport_cost: f64,
    pub royalty_cost: f64,
    pub profit: f64,

    pub rate_override_enabled: bool,
    pub rate_override: Option<RateOverrideRecord>,

    pub eway_bill_upload: String,
    pub invoice_upload: String,
    pub wayment_slip_upload: String,
    pub royalty_slip_upload: String,
    pub tax_invoice_upload: String,
    pub end_wayment_slip_upload: String,

    pub received_date: Option<String>,
    pub received_by: Option<String>,
    pub received_by_role: Option<String>,

    pub validated_by: Option<String>,
    pub validated_at: Option<String>,
    pub validation_comments: Option<String>,

    pub pending_request_type: Option<String>,
    pub pending_request_message: Option<String>,
    pub pending_request_by: Option<String>,
    pub pending_request_role: Option<String>,
    pub pending_request_at: Option<String>,

    pub remarks: String,
}

fn parse_attachments(field: &'static str, raw: &str) -> Result<Vec<Attachment>, WireError> {
    if raw.trim().is_empty() {
        return Ok(vec![]);
    }
    serde_json::from_str(raw).map_err(|e| WireError::MalformedUploads {
        field,
        reason: e.to_string(),
    })
}

// empty slots go out as "" like the backend expects
fn encode_attachments(list: &[Attachment]) -> String {
    if list.is_empty() {
        return String::new();
    }
    serde_json::to_string(list).unwrap_or_default()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn party(name: &str, is_one_off: bool) -> PartyRef {
    PartyRef {
        is_one_off,
        ..PartyRef::new(name)
    }
}

impl TryFrom<RateOverrideRecord> for TripRateOverride {
    type Error = WireError;

    /// GST amount and total rate are derived again rather than trusted.
    fn try_from(record: RateOverrideRecord) -> Result<Self, Self::Error> {
        let mut rate_override = TripRateOverride::new(record.rate_party_type.parse()?)
            .set_rate_per_ton(record.rate_per_ton)
            .set_gst_percentage(record.gst_percentage)
            .set_gst_chargeable(record.gst_chargeable)
            .set_remarks(&record.remarks);
        rate_override.material_type_id = record.material_type_id;
        rate_override.rate_party_id = record.rate_party_id;
        rate_override.pickup_location_id = record.pickup_location_id;
        rate_override.drop_off_location_id = record.drop_off_location_id;
        rate_override.total_km = record.total_km;
        rate_override.rate_per_km = record.rate_per_km;
        rate_override.effective_from = non_empty(&record.effective_from)
            .map(str::parse::<TripDate>)
            .transpose()?;
        rate_override.effective_to = non_empty(&record.effective_to)
            .map(str::parse::<TripDate>)
            .transpose()?;
        Ok(rate_override)
    }
}

impl From<&TripRateOverride> for RateOverrideRecord {
    fn from(rate_override: &TripRateOverride) -> Self {
        Self {
            material_type_id: rate_override.material_type_id,
            rate_party_type: rate_override.rate_party_type.as_str().to_string(),
            rate_party_id: rate_override.rate_party_id,
            pickup_location_id: rate_override.pickup_location_id,
            drop_off_location_id: rate_override.drop_off_location_id,
            total_km: rate_override.total_km,
            rate_per_km: rate_override.rate_per_km,
            rate_per_ton: rate_override.rate_per_ton(),
            gst_chargeable: rate_override.gst_chargeable(),
            gst_percentage: rate_override.gst_percentage(),
            gst_amount: rate_override.gst_amount(),
            total_rate_per_ton: rate_override.total_rate_per_ton(),
            effective_from: rate_override.effective_from.map(|d| d.to_string()),
            effective_to: rate_override.effective_to.map(|d| d.to_string()),
            remarks: rate_override.remarks.clone(),
        }
    }
}

impl TryFrom<MaterialRateRecord> for MaterialRate {
    type Error = WireError;

    /// A blank `effectiveTo` means the rate is still open-ended.
    fn try_from(record: MaterialRateRecord) -> Result<Self, Self::Error> {
        Ok(MaterialRate {
            id: record.id,
            rate_party_type: record.rate_party_type.parse()?,
            rate_party_id: record.rate_party_id,
            material_type_id: record.material_type_id,
            pickup_location_id: record.pickup_location_id,
            drop_off_location_id: record.drop_off_location_id,
            total_rate_per_ton: record.total_rate_per_ton,
            effective_from: record.effective_from.parse()?,
            effective_to: non_empty(&record.effective_to)
                .map(str::parse::<TripDate>)
                .transpose()?,
        })
    }
}

impl From<&MaterialRate> for MaterialRateRecord {
    fn from(rate: &MaterialRate) -> Self {
        Self {
            id: rate.id,
            rate_party_type: rate.rate_party_type.as_str().to_string(),
            rate_party_id: rate.rate_party_id,
            material_type_id: rate.material_type_id,
            pickup_location_id: rate.pickup_location_id,
            drop_off_location_id: rate.drop_off_location_id,
            total_rate_per_ton: rate.total_rate_per_ton,
            effective_from: rate.effective_from.to_string(),
            effective_to: rate.effective_to.map(|d| d.to_string()),
        }
    }
}

// who raises each request when the payload leaves the role out
fn default_requester(kind: PendingRequestType) -> Role {
    match kind {
        PendingRequestType::SentBackPickup | PendingRequestType::SentBackDropoff => Role::Admin,
        PendingRequestType::Update | PendingRequestType::Delete => Role::PickupSupervisor,
    }
}

impl TryFrom<TripRecord> for Trip {
    type Error = WireError;

    fn try_from(record: TripRecord) -> Result<Self, Self::Error> {
        let date: TripDate = record.date.parse()?;
        let status: TripStatus = record.status.parse()?;

        let pickup_place = if record.pickup_place.trim().is_empty() {
            record.place.clone()
        } else {
            record.pickup_place.clone()
        };

        let uploads = Uploads {
            eway_bill: parse_attachments("ewayBillUpload", &record.eway_bill_upload)?,
            invoice: parse_attachments("invoiceUpload", &record.invoice_upload)?,
            wayment_slip: parse_attachments("waymentSlipUpload", &record.wayment_slip_upload)?,
            royalty_slip: parse_attachments("royaltySlipUpload", &record.royalty_slip_upload)?,
            tax_invoice: parse_attachments("taxInvoiceUpload", &record.tax_invoice_upload)?,
        };

        let receipt = match non_empty(&record.received_by) {
            Some(by) => Some(Receipt {
                date: match non_empty(&record.received_date) {
                    Some(raw) => raw.parse()?,
                    None => date,
                },
                by: by.to_string(),
                role: match non_empty(&record.received_by_role) {
                    Some(raw) => raw.parse()?,
                    None => Role::DropoffSupervisor,
                },
                end_weights: Weights::derived(
                    record.end_gross_weight.unwrap_or_default(),
                    record.end_empty_weight.unwrap_or_default(),
                ),
                end_wayment_slip: parse_attachments(
                    "endWaymentSlipUpload",
                    &record.end_wayment_slip_upload,
                )?,
            }),
            None => None,
        };

        let validation = match non_empty(&record.validated_by) {
            Some(by) => Some(Validation {
                by: by.to_string(),
                at: match non_empty(&record.validated_at) {
                    Some(raw) => raw.parse()?,
                    None => date.start_of_day(),
                },
                comments: record.validation_comments.clone().unwrap_or_default(),
            }),
            None => None,
        };

        let pending_request = match non_empty(&record.pending_request_type) {
            Some(raw) => {
                let kind: PendingRequestType = raw.parse()?;
                Some(PendingRequest {
                    kind,
                    message: record.pending_request_message.clone().unwrap_or_default(),
                    by: record.pending_request_by.clone().unwrap_or_default(),
                    role: match non_empty(&record.pending_request_role) {
                        Some(raw) => raw.parse()?,
                        None => default_requester(kind),
                    },
                    at: match non_empty(&record.pending_request_at) {
                        Some(raw) => raw.parse()?,
                        None => date.start_of_day(),
                    },
                })
            }
            None => None,
        };

        let rate_override = record
            .rate_override
            .map(TripRateOverride::try_from)
            .transpose()?;

        Ok(Trip {
            id: record.id,
            date,
            status,
            created_by: record.created_by,
            customer: party(&record.customer, record.customer_is_one_off),
            quarry: party(&record.quarry_name, record.quarry_is_one_off),
            royalty_owner: party(&record.royalty_owner_name, record.royalty_owner_is_one_off),
            transporter: party(&record.transporter_name, record.transporter_is_one_off),
            vehicle: party(&record.vehicle_number, record.vehicle_is_one_off),
            material: party(&record.material, record.material_is_one_off),
            pickup_place,
            drop_off_place: record.drop_off_place,
            weights: Weights {
                empty: record.empty_weight,
                gross: record.gross_weight,
                net: record.net_weight,
            },
            money: MoneyFields {
                revenue: record.revenue,
                material_cost: record.material_cost,
                transport_cost: record.transport_cost,
                royalty_cost: record.royalty_cost,
                profit: record.profit,
            },
            rate_override_enabled: record.rate_override_enabled && rate_override.is_some(),
            rate_override,
            uploads,
            receipt,
            validation,
            pending_request,
            remarks: record.remarks,
        })
    }
}

impl From<&Trip> for TripRecord {
    fn from(trip: &Trip) -> Self {
        let receipt = trip.receipt.as_ref();
        let validation = trip.validation.as_ref();
        let request = trip.pending_request.as_ref();

        Self {
            id: trip.id,
            date: trip.date.to_string(),
            status: trip.status.as_str().to_string(),
            created_by: trip.created_by.clone(),
            customer: trip.customer.name.clone(),
            customer_is_one_off: trip.customer.is_one_off,
            quarry_name: trip.quarry.name.clone(),
            quarry_is_one_off: trip.quarry.is_one_off,
            royalty_owner_name: trip.royalty_owner.name.clone(),
            royalty_owner_is_one_off: trip.royalty_owner.is_one_off,
            transporter_name: trip.transporter.name.clone(),
            transporter_is_one_off: trip.transporter.is_one_off,
            vehicle_number: trip.vehicle.name.clone(),
            vehicle_is_one_off: trip.vehicle.is_one_off,
            material: trip.material.name.clone(),
            material_is_one_off: trip.material.is_one_off,
            pickup_place: trip.pickup_place.clone(),
            drop_off_place: trip.drop_off_place.clone(),
            place: trip.pickup_place.clone(),
            empty_weight: trip.weights.empty,
            gross_weight: trip.weights.gross,
            net_weight: trip.weights.net,
            end_empty_weight: receipt.map(|r| r.end_weights.empty),
            end_gross_weight: receipt.map(|r| r.end_weights.gross),
            end_net_weight: receipt.map(|r| r.end_weights.net),
            revenue: trip.money.revenue,
            material_cost: trip.money.material_cost,
            transport_cost: trip.money.transport_cost,
            royalty_cost: trip.money.royalty_cost,
            profit: trip.money.profit,
            rate_override_enabled: trip.rate_override_enabled,
            rate_override: trip.rate_override.as_ref().map(RateOverrideRecord::from),
            eway_bill_upload: encode_attachments(&trip.uploads.eway_bill),
            invoice_upload: encode_attachments(&trip.uploads.invoice),
            wayment_slip_upload: encode_attachments(&trip.uploads.wayment_slip),
            royalty_slip_upload: encode_attachments(&trip.uploads.royalty_slip),
            tax_invoice_upload: encode_attachments(&trip.uploads.tax_invoice),
            end_wayment_slip_upload: receipt
                .map(|r| encode_attachments(&r.end_wayment_slip))
                .unwrap_or_default(),
            received_date: receipt.map(|r| r.date.to_string()),
            received_by: receipt.map(|r| r.by.clone()),
            received_by_role: receipt.map(|r| r.role.as_str().to_string()),
            validated_by: validation.map(|v| v.by.clone()),
            validated_at: validation.map(|v| v.at.to_string()),
            validation_comments: validation.map(|v| v.comments.clone()),
            pending_request_type: request.map(|r| r.kind.as_str().to_string()),
            pending_request_message: request.map(|r| r.message.clone()),
            pending_request_by: request.map(|r| r.by.clone()),
            pending_request_role: request.map(|r| r.role.as_str().to_string()),
            pending_request_at: request.map(|r| r.at.to_string()),
            remarks: trip.remarks.clone(),
        }
    }
}

/// Parses one trip from a REST response body.
pub fn trip_from_json(body: &str) -> anyhow::Result<Trip> {
    let record: TripRecord = serde_json::from_str(body)?;
    Ok(Trip::try_from(record)?)
}

pub fn trip_to_json(trip: &Trip) -> anyhow::Result<String> {
    Ok(serde_json::to_string(&TripRecord::from(trip))?)
}

/// Parses the rate table list endpoint, for use in a rate [`crate::directory::Loader`].
pub fn rates_from_json(body: &str) -> anyhow::Result<Vec<MaterialRate>> {
    let records: Vec<MaterialRateRecord> = serde_json::from_str(body)?;
    records
        .into_iter()
        .map(|record| MaterialRate::try_from(record).map_err(anyhow::Error::from))
        .collect()
}

/// Parses an `{id, name}` list endpoint. Extra fields on each row are ignored.
pub fn directory_from_json(body: &str) -> anyhow::Result<Vec<DirectoryEntry>> {
    Ok(serde_json::from_str(body)?)
}
