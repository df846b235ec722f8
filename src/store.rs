//! Storage collaborators and their sled-backed implementations
use crate::activity::TripActivity;
use crate::notification::{Notification, NotificationSink};
use crate::trip::Trip;
use crate::types::Role;
use anyhow::Context;
use sled::{Db, Tree};
use std::sync::Arc;
use tracing::{debug, info};

/// Trip persistence as seen by the service layer.
pub trait TripStore: Send + Sync {
    fn get_all(&self) -> anyhow::Result<Vec<Trip>>;
    fn get(&self, id: u64) -> anyhow::Result<Option<Trip>>;
    /// Stores a new trip and returns it with its assigned id.
    fn create(&self, trip: Trip) -> anyhow::Result<Trip>;
    /// Replaces a stored trip. Fails when the id is unknown.
    fn update(&self, trip: &Trip) -> anyhow::Result<()>;
    fn remove(&self, id: u64) -> anyhow::Result<()>;
    fn get_activity(&self, id: u64) -> anyhow::Result<Vec<TripActivity>>;
    fn create_activity(&self, entry: &TripActivity) -> anyhow::Result<()>;
}

pub struct SledTripStore {
    instance: Arc<Db>,
    trips: Tree,
    activity: Tree,
}

impl SledTripStore {
    pub fn new(instance: Arc<Db>) -> anyhow::Result<Self> {
        let trips = instance.open_tree("trips")?;
        let activity = instance.open_tree("activity")?;
        Ok(Self {
            instance,
            trips,
            activity,
        })
    }

    fn decode_trip(bytes: &[u8]) -> anyhow::Result<Trip> {
        minicbor::decode(bytes).context("failed to decode stored trip")
    }
}

// activity keys sort by trip, then by time
fn activity_key(entry: &TripActivity, digest: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + digest.len());
    key.extend_from_slice(&entry.trip_id.to_be_bytes());
    key.extend_from_slice(&entry.created_at.nanos().to_be_bytes());
    key.extend_from_slice(digest.as_bytes());
    key
}

impl TripStore for SledTripStore {
    fn get_all(&self) -> anyhow::Result<Vec<Trip>> {
        self.trips
            .iter()
            .values()
            .map(|value| Self::decode_trip(&value?))
            .collect()
    }

    fn get(&self, id: u64) -> anyhow::Result<Option<Trip>> {
        match self.trips.get(id.to_be_bytes())? {
            Some(bytes) => Ok(Some(Self::decode_trip(&bytes)?)),
            None => Ok(None),
        }
    }

    fn create(&self, mut trip: Trip) -> anyhow::Result<Trip> {
        // sled ids start at zero; keep zero free for unsaved trips
        trip.id = self.instance.generate_id()? + 1;
        self.trips
            .insert(trip.id.to_be_bytes(), minicbor::to_vec(&trip)?)?;
        info!(trip_id = trip.id, created_by = %trip.created_by, "stored new trip");
        Ok(trip)
    }

    fn update(&self, trip: &Trip) -> anyhow::Result<()> {
        let key = trip.id.to_be_bytes();
        if !self.trips.contains_key(key)? {
            return Err(anyhow::anyhow!("Trip #{} does not exist", trip.id));
        }
        self.trips.insert(key, minicbor::to_vec(trip)?)?;
        debug!(trip_id = trip.id, status = %trip.status, "updated trip");
        Ok(())
    }

    fn remove(&self, id: u64) -> anyhow::Result<()> {
        if self.trips.remove(id.to_be_bytes())?.is_none() {
            return Err(anyhow::anyhow!("Trip #{} does not exist", id));
        }
        // activity entries are append-only and outlive the trip
        info!(trip_id = id, "removed trip");
        Ok(())
    }

    fn get_activity(&self, id: u64) -> anyhow::Result<Vec<TripActivity>> {
        self.activity
            .scan_prefix(id.to_be_bytes())
            .values()
            .map(|value| {
                let value = value?;
                minicbor::decode(&value).context("failed to decode trip activity")
            })
            .collect()
    }

    fn create_activity(&self, entry: &TripActivity) -> anyhow::Result<()> {
        let (digest, cbor) = entry.build()?;
        self.activity.insert(activity_key(entry, &digest), cbor)?;
        debug!(trip_id = entry.trip_id, action = %entry.action, "appended trip activity");
        Ok(())
    }
}

pub struct SledNotificationSink {
    notifications: Tree,
}

impl SledNotificationSink {
    pub fn new(instance: &Db) -> anyhow::Result<Self> {
        Ok(Self {
            notifications: instance.open_tree("notifications")?,
        })
    }

    pub fn all(&self) -> anyhow::Result<Vec<Notification>> {
        self.notifications
            .iter()
            .values()
            .map(|value| {
                let value = value?;
                minicbor::decode(&value).context("failed to decode notification")
            })
            .collect()
    }

    /// What a recipient dashboard shows, oldest first.
    pub fn for_recipient(&self, role: Role, user: &str) -> anyhow::Result<Vec<Notification>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|n| n.is_for(role, user))
            .collect())
    }

    pub fn mark_read(&self, id: &str) -> anyhow::Result<()> {
        let Some(bytes) = self.notifications.get(id.as_bytes())? else {
            return Err(anyhow::anyhow!("Notification {} does not exist", id));
        };
        let mut notification: Notification = minicbor::decode(&bytes)?;
        notification.read = true;
        self.notifications
            .insert(id.as_bytes(), minicbor::to_vec(&notification)?)?;
        Ok(())
    }
}

impl NotificationSink for SledNotificationSink {
    fn create(&self, notification: &Notification) -> anyhow::Result<()> {
        self.notifications
            .insert(notification.id.as_bytes(), minicbor::to_vec(notification)?)?;
        debug!(
            trip_id = notification.trip_id,
            kind = notification.kind.as_str(),
            target_role = ?notification.target_role,
            target_user = ?notification.target_user,
            "notification created"
        );
        Ok(())
    }
}
