//! Service layer API for trip workflow operations
use crate::activity::TripActivity;
use crate::config::AppConfig;
use crate::dashboard::TripFilter;
use crate::directory::{Directory, MasterData, MasterDataCache};
use crate::notification::NotificationSink;
use crate::rate::{RatePartyType, RateResolver};
use crate::store::{SledNotificationSink, SledTripStore, TripStore};
use crate::trip::{PendingRequestType, Trip, TripDraft, Uploads};
use crate::types::{Actor, Attachment, PartyRef, TimeStamp};
use crate::workflow::{
    Action, ActionKind, ReceiveDetails, SendBackTarget, Transition, TripStateMachine,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct TripService {
    store: Arc<dyn TripStore>,
    notifications: Arc<dyn NotificationSink>,
    master: Arc<MasterDataCache>,
    machine: TripStateMachine,
}

impl TripService {
    pub fn new(
        store: Arc<dyn TripStore>,
        notifications: Arc<dyn NotificationSink>,
        master: Arc<MasterDataCache>,
    ) -> Self {
        Self {
            store,
            notifications,
            master,
            machine: TripStateMachine::new(),
        }
    }

    /// Trips, activity and notifications all kept in one sled database.
    pub fn open(instance: Arc<sled::Db>, master: Arc<MasterDataCache>) -> anyhow::Result<Self> {
        let notifications = Arc::new(SledNotificationSink::new(&instance)?);
        let store = Arc::new(SledTripStore::new(instance)?);
        Ok(Self::new(store, notifications, master))
    }

    pub fn from_config(config: &AppConfig, master: Arc<MasterDataCache>) -> anyhow::Result<Self> {
        Ok(Self::open(config.open_database()?, master)?.with_state_machine(config.state_machine()))
    }

    pub fn with_state_machine(mut self, machine: TripStateMachine) -> Self {
        self.machine = machine;
        self
    }

    pub fn state_machine(&self) -> &TripStateMachine {
        &self.machine
    }

    fn load_trip(&self, id: u64) -> anyhow::Result<Trip> {
        self.store
            .get(id)?
            .ok_or_else(|| anyhow::anyhow!("Trip #{} does not exist", id))
    }

    /// Enter a new trip. Rates are resolved here and nowhere else.
    pub fn create_trip(&self, draft: TripDraft, actor: &Actor) -> anyhow::Result<Trip> {
        self.machine.check_create(actor)?;

        let draft = if draft.created_by().is_empty() {
            draft.set_created_by(&actor.name)
        } else {
            draft
        };
        let mut trip = draft.validate_and_finalise()?;

        let master = self.master.snapshot()?;
        mark_one_offs(&mut trip, &master);
        trip.money = RateResolver::new(&master).resolve(&trip);
        debug!(
            revenue = trip.money.revenue,
            profit = trip.money.profit,
            "resolved trip money fields"
        );

        let trip = self.store.create(trip)?;
        info!(trip_id = trip.id, by = %actor.name, "trip created");
        Ok(trip)
    }

    /// Replace the entry fields of a stored trip.
    ///
    /// Status, workflow metadata and money fields are kept as they are. A
    /// privileged edit answers an outstanding update request.
    pub fn edit_trip(&self, id: u64, draft: TripDraft, actor: &Actor) -> anyhow::Result<Trip> {
        let current = self.load_trip(id)?;
        self.machine.check_edit(&current, actor)?;

        let mut edited = draft.validate_and_finalise()?;
        let master = self.master.snapshot()?;
        mark_one_offs(&mut edited, &master);

        let mut next = current.clone();
        next.date = edited.date;
        next.customer = edited.customer;
        next.quarry = edited.quarry;
        next.royalty_owner = edited.royalty_owner;
        next.transporter = edited.transporter;
        next.vehicle = edited.vehicle;
        next.material = edited.material;
        next.pickup_place = edited.pickup_place;
        next.drop_off_place = edited.drop_off_place;
        next.weights = edited.weights;
        next.rate_override_enabled = edited.rate_override_enabled;
        next.rate_override = edited.rate_override;
        next.remarks = edited.remarks;

        if actor.role.is_privileged()
            && next.pending_request_type() == Some(PendingRequestType::Update)
        {
            debug!(trip_id = id, "edit resolves outstanding update request");
            next.pending_request = None;
        }

        self.store.update(&next)?;
        info!(trip_id = id, by = %actor.name, "trip edited");
        Ok(next)
    }

    /// Run one workflow action against a stored trip and persist its effects.
    ///
    /// The trip is written first; activity and notifications follow and are
    /// only logged when they fail.
    pub fn perform(&self, id: u64, actor: &Actor, action: Action) -> anyhow::Result<Transition> {
        let trip = self.load_trip(id)?;
        let transition = self.machine.apply(&trip, actor, action, TimeStamp::new())?;

        match &transition.trip {
            None => self.store.remove(id)?,
            Some(next) if transition.changed => self.store.update(next)?,
            Some(_) => {}
        }
        if transition.changed {
            info!(
                trip_id = id,
                action = %transition.kind,
                from = %transition.from,
                to = ?transition.status(),
                by = %actor.name,
                "trip transition applied"
            );
        }

        if let Some(entry) = &transition.activity {
            if let Err(e) = self.store.create_activity(entry) {
                warn!(
                    trip_id = id,
                    action = %transition.kind,
                    error = %e,
                    "failed to record trip activity"
                );
            }
        }
        for notification in &transition.notifications {
            if let Err(e) = self.notifications.create(notification) {
                warn!(
                    trip_id = id,
                    kind = notification.kind.as_str(),
                    error = %e,
                    "failed to send notification"
                );
            }
        }

        Ok(transition)
    }

    // the stored trip after an action that keeps it
    fn perform_kept(&self, id: u64, actor: &Actor, action: Action) -> anyhow::Result<Trip> {
        self.perform(id, actor, action)?
            .trip
            .ok_or_else(|| anyhow::anyhow!("Trip #{} was removed", id))
    }

    pub fn upload_documents(
        &self,
        id: u64,
        actor: &Actor,
        uploads: Uploads,
    ) -> anyhow::Result<Trip> {
        self.perform_kept(id, actor, Action::UploadDocuments(uploads))
    }

    pub fn receive_trip(
        &self,
        id: u64,
        actor: &Actor,
        details: ReceiveDetails,
    ) -> anyhow::Result<Trip> {
        self.perform_kept(id, actor, Action::Receive(details))
    }

    pub fn validate_trip(&self, id: u64, actor: &Actor, comments: &str) -> anyhow::Result<Trip> {
        self.perform_kept(
            id,
            actor,
            Action::Validate {
                comments: comments.to_string(),
            },
        )
    }

    pub fn send_back(
        &self,
        id: u64,
        actor: &Actor,
        to: SendBackTarget,
        message: &str,
    ) -> anyhow::Result<Trip> {
        self.perform_kept(
            id,
            actor,
            Action::SendBack {
                to,
                message: message.to_string(),
            },
        )
    }

    pub fn request_update(&self, id: u64, actor: &Actor, message: &str) -> anyhow::Result<Trip> {
        self.perform_kept(
            id,
            actor,
            Action::RequestUpdate {
                message: message.to_string(),
            },
        )
    }

    pub fn raise_issue(
        &self,
        id: u64,
        actor: &Actor,
        message: &str,
        attachments: Vec<Attachment>,
    ) -> anyhow::Result<Trip> {
        self.perform_kept(
            id,
            actor,
            Action::RaiseIssue {
                message: message.to_string(),
                attachments,
            },
        )
    }

    pub fn request_delete(&self, id: u64, actor: &Actor, message: &str) -> anyhow::Result<Trip> {
        self.perform_kept(
            id,
            actor,
            Action::RequestDelete {
                message: message.to_string(),
            },
        )
    }

    pub fn delete_trip(&self, id: u64, actor: &Actor) -> anyhow::Result<()> {
        self.perform(id, actor, Action::Delete)?;
        Ok(())
    }

    pub fn reply(
        &self,
        id: u64,
        actor: &Actor,
        message: &str,
        attachments: Vec<Attachment>,
    ) -> anyhow::Result<()> {
        self.perform(
            id,
            actor,
            Action::Reply {
                message: message.to_string(),
                attachments,
            },
        )?;
        Ok(())
    }

    pub fn get_trip(&self, id: u64) -> anyhow::Result<Trip> {
        self.load_trip(id)
    }

    pub fn get_activity(&self, id: u64) -> anyhow::Result<Vec<TripActivity>> {
        self.store.get_activity(id)
    }

    /// Trips matching `filter`, newest id first.
    pub fn list_trips(&self, filter: &TripFilter) -> anyhow::Result<Vec<Trip>> {
        let mut trips: Vec<Trip> = self
            .store
            .get_all()?
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect();
        trips.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(trips)
    }

    pub fn available_actions(&self, id: u64, actor: &Actor) -> anyhow::Result<Vec<ActionKind>> {
        let trip = self.load_trip(id)?;
        Ok(self.machine.available_actions(&trip, actor))
    }
}

// flag names with no exact directory match; near matches are only logged
fn mark_one_offs(trip: &mut Trip, master: &MasterData) {
    for party_type in RatePartyType::ALL {
        if let Some(directory) = master.parties.directory(party_type) {
            flag(trip.party_mut(party_type), directory, party_type.as_str());
        }
    }
    flag(&mut trip.material, &master.materials, "material");
    flag(&mut trip.vehicle, &master.vehicles, "vehicle");
}

fn flag(party: &mut PartyRef, directory: &Directory, label: &str) {
    if party.is_blank() {
        party.is_one_off = false;
        return;
    }
    party.is_one_off = !directory.contains(&party.name);
    if party.is_one_off {
        let suggestions: Vec<&str> = directory
            .suggest(&party.name)
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        if suggestions.is_empty() {
            debug!(name = %party.name, kind = label, "one-off entry");
        } else {
            info!(
                name = %party.name,
                kind = label,
                ?suggestions,
                "one-off entry resembles existing names"
            );
        }
    }
}
