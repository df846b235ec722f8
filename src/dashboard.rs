//! Trip list filters and dashboard totals
use crate::trip::{PendingRequestType, Trip, TripStatus};
use crate::types::TripDate;

/// Narrows a trip list. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripFilter {
    pub status: Option<TripStatus>,
    pub created_by: Option<String>,
    pub received_by: Option<String>,
    pub pending_request: Option<PendingRequestType>,
    pub from: Option<TripDate>,
    pub to: Option<TripDate>,
}

impl TripFilter {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_status(mut self, status: TripStatus) -> Self {
        self.status = Some(status);
        self
    }
    pub fn created_by(mut self, name: &str) -> Self {
        self.created_by = Some(name.to_string());
        self
    }
    pub fn received_by(mut self, name: &str) -> Self {
        self.received_by = Some(name.to_string());
        self
    }
    pub fn with_pending_request(mut self, kind: PendingRequestType) -> Self {
        self.pending_request = Some(kind);
        self
    }
    /// Inclusive on both ends.
    pub fn between(mut self, from: TripDate, to: TripDate) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn matches(&self, trip: &Trip) -> bool {
        self.status.is_none_or(|s| trip.status == s)
            && self
                .created_by
                .as_deref()
                .is_none_or(|name| trip.created_by == name)
            && self
                .received_by
                .as_deref()
                .is_none_or(|name| trip.received_by() == Some(name))
            && self
                .pending_request
                .is_none_or(|kind| trip.pending_request_type() == Some(kind))
            && self.from.is_none_or(|from| trip.date >= from)
            && self.to.is_none_or(|to| trip.date <= to)
    }

    pub fn apply<'a>(&self, trips: &'a [Trip]) -> Vec<&'a Trip> {
        trips.iter().filter(|t| self.matches(t)).collect()
    }
}

/// Sums over a set of trips.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TripTotals {
    pub count: usize,
    pub net_weight: f64,
    pub revenue: f64,
    pub material_cost: f64,
    pub transport_cost: f64,
    pub royalty_cost: f64,
    pub profit: f64,
}

impl TripTotals {
    pub fn add(&mut self, trip: &Trip) {
        self.count += 1;
        self.net_weight += trip.weights.net;
        self.revenue += trip.money.revenue;
        self.material_cost += trip.money.material_cost;
        self.transport_cost += trip.money.transport_cost;
        self.royalty_cost += trip.money.royalty_cost;
        self.profit += trip.money.profit;
    }
    pub fn total_cost(&self) -> f64 {
        self.material_cost + self.transport_cost + self.royalty_cost
    }
}

impl<'a> FromIterator<&'a Trip> for TripTotals {
    fn from_iter<I: IntoIterator<Item = &'a Trip>>(iter: I) -> Self {
        let mut totals = TripTotals::default();
        for trip in iter {
            totals.add(trip);
        }
        totals
    }
}

pub fn summarize<'a>(trips: impl IntoIterator<Item = &'a Trip>) -> TripTotals {
    trips.into_iter().collect()
}
