//! The trip lifecycle state machine
//!
//! `pending upload -> in transit -> pending validation -> trip completed`, with
//! send-back edges from pending validation to either of the first two states.
//! [`TripStateMachine::apply`] is pure: it checks the actor's role and the trip's
//! status, then returns the next trip value together with the activity entry and
//! notifications the caller should persist. Nothing is written here.
use crate::activity::{ActivityKind, TripActivity};
use crate::error::TransitionError;
use crate::notification::{Notification, NotificationKind};
use crate::trip::{
    PendingRequest, PendingRequestType, Receipt, Trip, TripStatus, Uploads, Validation, Weights,
};
use crate::types::{Actor, Attachment, Role, TimeStamp, TripDate};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    UploadDocuments,
    Receive,
    Validate,
    SendBackPickup,
    SendBackDropoff,
    RequestUpdate,
    RaiseIssue,
    RequestDelete,
    Delete,
    Reply,
    Edit,
    Create,
}

const ANY_STATUS: &[TripStatus] = &[
    TripStatus::PendingUpload,
    TripStatus::InTransit,
    TripStatus::PendingValidation,
    TripStatus::TripCompleted,
];
const PRIVILEGED: &[Role] = &Role::PRIVILEGED;
const SUPERVISORS: &[Role] = &Role::SUPERVISORS;
const STAFF: &[Role] = &[
    Role::Admin,
    Role::Manager,
    Role::Accountant,
    Role::PickupSupervisor,
    Role::DropoffSupervisor,
];

impl ActionKind {
    pub const ALL: [ActionKind; 11] = [
        ActionKind::UploadDocuments,
        ActionKind::Receive,
        ActionKind::Validate,
        ActionKind::SendBackPickup,
        ActionKind::SendBackDropoff,
        ActionKind::RequestUpdate,
        ActionKind::RaiseIssue,
        ActionKind::RequestDelete,
        ActionKind::Delete,
        ActionKind::Reply,
        ActionKind::Edit,
    ];

    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            ActionKind::UploadDocuments => &[Role::PickupSupervisor],
            ActionKind::Receive => &[Role::DropoffSupervisor],
            ActionKind::Validate
            | ActionKind::SendBackPickup
            | ActionKind::SendBackDropoff
            | ActionKind::Delete => PRIVILEGED,
            ActionKind::RequestUpdate | ActionKind::RaiseIssue | ActionKind::RequestDelete => {
                SUPERVISORS
            }
            ActionKind::Reply => STAFF,
            ActionKind::Edit | ActionKind::Create => {
                &[Role::Admin, Role::Manager, Role::Accountant, Role::PickupSupervisor]
            }
        }
    }

    pub fn allowed_from(&self) -> &'static [TripStatus] {
        match self {
            ActionKind::UploadDocuments => &[TripStatus::PendingUpload],
            ActionKind::Receive => &[TripStatus::InTransit],
            ActionKind::Validate | ActionKind::SendBackPickup | ActionKind::SendBackDropoff => {
                &[TripStatus::PendingValidation]
            }
            ActionKind::RequestUpdate => &[TripStatus::InTransit, TripStatus::PendingValidation],
            ActionKind::RaiseIssue => &[TripStatus::TripCompleted],
            ActionKind::RequestDelete => &[
                TripStatus::PendingUpload,
                TripStatus::InTransit,
                TripStatus::PendingValidation,
            ],
            ActionKind::Create => &[TripStatus::PendingUpload],
            ActionKind::Delete | ActionKind::Reply | ActionKind::Edit => ANY_STATUS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::UploadDocuments => "upload documents",
            ActionKind::Receive => "receive",
            ActionKind::Validate => "validate",
            ActionKind::SendBackPickup => "send back to pickup",
            ActionKind::SendBackDropoff => "send back to dropoff",
            ActionKind::RequestUpdate => "request update",
            ActionKind::RaiseIssue => "raise issue",
            ActionKind::RequestDelete => "request delete",
            ActionKind::Delete => "delete",
            ActionKind::Reply => "reply",
            ActionKind::Edit => "edit",
            ActionKind::Create => "create",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the drop-off supervisor records at receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiveDetails {
    pub date: TripDate,
    pub end_gross_weight: f64,
    pub end_empty_weight: f64,
    pub end_wayment_slip: Vec<Attachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBackTarget {
    Pickup,
    Dropoff,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    UploadDocuments(Uploads),
    Receive(ReceiveDetails),
    Validate {
        comments: String,
    },
    SendBack {
        to: SendBackTarget,
        message: String,
    },
    RequestUpdate {
        message: String,
    },
    RaiseIssue {
        message: String,
        attachments: Vec<Attachment>,
    },
    RequestDelete {
        message: String,
    },
    Delete,
    Reply {
        message: String,
        attachments: Vec<Attachment>,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::UploadDocuments(_) => ActionKind::UploadDocuments,
            Action::Receive(_) => ActionKind::Receive,
            Action::Validate { .. } => ActionKind::Validate,
            Action::SendBack {
                to: SendBackTarget::Pickup,
                ..
            } => ActionKind::SendBackPickup,
            Action::SendBack {
                to: SendBackTarget::Dropoff,
                ..
            } => ActionKind::SendBackDropoff,
            Action::RequestUpdate { .. } => ActionKind::RequestUpdate,
            Action::RaiseIssue { .. } => ActionKind::RaiseIssue,
            Action::RequestDelete { .. } => ActionKind::RequestDelete,
            Action::Delete => ActionKind::Delete,
            Action::Reply { .. } => ActionKind::Reply,
        }
    }
}

/// The outcome of an accepted action.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub kind: ActionKind,
    pub from: TripStatus,
    /// The trip as it should be stored; `None` when the trip is deleted.
    pub trip: Option<Trip>,
    /// False when the action was accepted but left the trip as it was.
    pub changed: bool,
    pub activity: Option<TripActivity>,
    pub notifications: Vec<Notification>,
}

impl Transition {
    fn unchanged(kind: ActionKind, trip: &Trip) -> Self {
        Self {
            kind,
            from: trip.status,
            trip: Some(trip.clone()),
            changed: false,
            activity: None,
            notifications: vec![],
        }
    }
    pub fn is_deletion(&self) -> bool {
        self.trip.is_none()
    }
    pub fn status(&self) -> Option<TripStatus> {
        self.trip.as_ref().map(|t| t.status)
    }
}

pub struct TripStateMachine {
    admin_display_name: String,
}

impl Default for TripStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TripStateMachine {
    pub fn new() -> Self {
        Self {
            admin_display_name: "Admin".to_string(),
        }
    }
    /// Name shown to the pickup supervisor when a trip is deleted.
    pub fn with_admin_display_name(mut self, name: &str) -> Self {
        self.admin_display_name = name.to_string();
        self
    }

    /// Role and status check for one action, without applying it.
    pub fn authorize(
        &self,
        kind: ActionKind,
        role: Role,
        status: TripStatus,
    ) -> Result<(), TransitionError> {
        if !kind.allowed_roles().contains(&role) {
            return Err(TransitionError::Unauthorized { action: kind, role });
        }
        if !kind.allowed_from().contains(&status) {
            return Err(TransitionError::InvalidState {
                action: kind,
                status,
            });
        }
        Ok(())
    }

    /// The actions a UI should enable for `actor` on this trip.
    pub fn available_actions(&self, trip: &Trip, actor: &Actor) -> Vec<ActionKind> {
        ActionKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                ActionKind::Edit => self.check_edit(trip, actor).is_ok(),
                ActionKind::RequestUpdate => {
                    trip.pending_request_type().is_none()
                        && self.authorize(*kind, actor.role, trip.status).is_ok()
                }
                ActionKind::RequestDelete => {
                    trip.pending_request_type().is_none()
                        && self.authorize(*kind, actor.role, trip.status).is_ok()
                }
                _ => self.authorize(*kind, actor.role, trip.status).is_ok(),
            })
            .collect()
    }

    /// Trips are entered by pickup supervisors and the back office.
    pub fn check_create(&self, actor: &Actor) -> Result<(), TransitionError> {
        self.authorize(ActionKind::Create, actor.role, TripStatus::PendingUpload)
    }

    /// Entry fields are editable by privileged roles at any time, and by the
    /// creating pickup supervisor only while the trip is still pending upload.
    pub fn check_edit(&self, trip: &Trip, actor: &Actor) -> Result<(), TransitionError> {
        if actor.role.is_privileged() {
            return Ok(());
        }
        if actor.role != Role::PickupSupervisor || actor.name != trip.created_by {
            return Err(TransitionError::Unauthorized {
                action: ActionKind::Edit,
                role: actor.role,
            });
        }
        if trip.status != TripStatus::PendingUpload {
            return Err(TransitionError::EntryLocked {
                name: actor.name.clone(),
            });
        }
        Ok(())
    }

    pub fn apply(
        &self,
        trip: &Trip,
        actor: &Actor,
        action: Action,
        now: TimeStamp,
    ) -> anyhow::Result<Transition> {
        let kind = action.kind();
        self.authorize(kind, actor.role, trip.status)?;
        debug!(
            trip_id = trip.id,
            %kind,
            role = %actor.role,
            status = %trip.status,
            "applying trip action"
        );

        let mut next = trip.clone();
        let mut transition = Transition {
            kind,
            from: trip.status,
            trip: None,
            changed: true,
            activity: None,
            notifications: vec![],
        };
        let activity = |action: ActivityKind, message: String| {
            TripActivity::new(
                trip.id,
                action,
                message,
                actor.name.clone(),
                actor.role,
                now,
            )
        };
        let notify = |kind: NotificationKind, message: String| {
            Notification::new(kind, message, trip.id, actor.name.clone(), actor.role, now)
                .map(|n| n.with_contact(actor.contact.as_deref()))
        };

        match action {
            Action::UploadDocuments(uploads) => {
                next.uploads = uploads;
                next.status = TripStatus::InTransit;
                if next.pending_request_type() == Some(PendingRequestType::SentBackPickup) {
                    next.pending_request = None;
                }
            }
            Action::Receive(details) => {
                next.status = TripStatus::PendingValidation;
                next.receipt = Some(Receipt {
                    date: details.date,
                    by: actor.name.clone(),
                    role: actor.role,
                    end_weights: Weights::derived(
                        details.end_gross_weight,
                        details.end_empty_weight,
                    ),
                    end_wayment_slip: details.end_wayment_slip,
                });
                if next.pending_request_type() == Some(PendingRequestType::SentBackDropoff) {
                    next.pending_request = None;
                }

                let message = format!(
                    "Trip #{} received by {} and pending validation",
                    trip.id, actor.name
                );
                transition.activity = Some(activity(ActivityKind::Received, message.clone()));
                for role in Role::PRIVILEGED {
                    transition.notifications.push(
                        notify(NotificationKind::TripReceived, message.clone())?.to_role(role),
                    );
                }
            }
            Action::Validate { comments } => {
                next.status = TripStatus::TripCompleted;
                next.validation = Some(Validation {
                    by: actor.name.clone(),
                    at: now,
                    comments: comments.clone(),
                });
                next.pending_request = None;

                let message = format!("Trip #{} validated by {}", trip.id, actor.name);
                transition.activity = Some(activity(ActivityKind::Validated, comments));
                transition.notifications.push(
                    notify(NotificationKind::TripValidated, message.clone())?
                        .to_role(Role::PickupSupervisor)
                        .to_user(&trip.created_by),
                );
                let dropoff = notify(NotificationKind::TripValidated, message.clone())?
                    .to_role(Role::DropoffSupervisor);
                transition.notifications.push(match trip.received_by() {
                    Some(name) => dropoff.to_user(name),
                    None => dropoff,
                });
                transition
                    .notifications
                    .push(notify(NotificationKind::TripValidated, message)?.to_role(Role::Admin));
            }
            Action::SendBack { to, message } => {
                let (status, request, entry, target_role, target_user) = match to {
                    SendBackTarget::Pickup => (
                        TripStatus::PendingUpload,
                        PendingRequestType::SentBackPickup,
                        ActivityKind::SentBackPickup,
                        Role::PickupSupervisor,
                        trip.created_by.clone(),
                    ),
                    SendBackTarget::Dropoff => (
                        TripStatus::InTransit,
                        PendingRequestType::SentBackDropoff,
                        ActivityKind::SentBackDropoff,
                        Role::DropoffSupervisor,
                        trip.received_by()
                            .ok_or(TransitionError::MissingRecipient("drop-off supervisor"))?
                            .to_string(),
                    ),
                };
                next.status = status;
                next.pending_request = Some(PendingRequest {
                    kind: request,
                    message: message.clone(),
                    by: actor.name.clone(),
                    role: actor.role,
                    at: now,
                });

                transition.activity = Some(activity(entry, message.clone()));
                transition.notifications.push(
                    notify(
                        NotificationKind::TripSentBack,
                        format!("Trip #{} was sent back by {}", trip.id, actor.name),
                    )?
                    .with_request(request.as_str(), &message)
                    .to_role(target_role)
                    .to_user(&target_user),
                );
            }
            Action::RequestUpdate { message } => {
                if let Some(outstanding) = trip.pending_request_type() {
                    if outstanding == PendingRequestType::Update {
                        debug!(trip_id = trip.id, "update already requested");
                        return Ok(Transition::unchanged(kind, trip));
                    }
                    return Err(TransitionError::RequestOutstanding(outstanding).into());
                }
                next.pending_request = Some(PendingRequest {
                    kind: PendingRequestType::Update,
                    message: message.clone(),
                    by: actor.name.clone(),
                    role: actor.role,
                    at: now,
                });

                transition.activity =
                    Some(activity(ActivityKind::UpdateRequested, message.clone()));
                transition.notifications.push(
                    notify(
                        NotificationKind::UpdateRequested,
                        format!("{} requested an update to trip #{}", actor.name, trip.id),
                    )?
                    .with_request(PendingRequestType::Update.as_str(), &message)
                    .to_role(Role::Admin),
                );
            }
            Action::RaiseIssue {
                message,
                attachments,
            } => {
                transition.changed = false;
                transition.activity = Some(
                    activity(ActivityKind::IssueRaised, message.clone())
                        .with_attachments(attachments),
                );
                transition.notifications.push(
                    notify(
                        NotificationKind::IssueRaised,
                        format!("{} raised an issue on trip #{}", actor.name, trip.id),
                    )?
                    .with_request("issue", &message)
                    .to_role(Role::Admin),
                );
            }
            Action::RequestDelete { message } => {
                if let Some(outstanding) = trip.pending_request_type() {
                    if outstanding == PendingRequestType::Delete {
                        return Ok(Transition::unchanged(kind, trip));
                    }
                    return Err(TransitionError::RequestOutstanding(outstanding).into());
                }
                next.pending_request = Some(PendingRequest {
                    kind: PendingRequestType::Delete,
                    message: message.clone(),
                    by: actor.name.clone(),
                    role: actor.role,
                    at: now,
                });

                transition.activity =
                    Some(activity(ActivityKind::DeleteRequested, message.clone()));
                transition.notifications.push(
                    notify(
                        NotificationKind::DeleteRequested,
                        format!("{} asked to delete trip #{}", actor.name, trip.id),
                    )?
                    .with_request(PendingRequestType::Delete.as_str(), &message)
                    .to_role(Role::Admin),
                );
            }
            Action::Delete => {
                transition.notifications.push(
                    notify(
                        NotificationKind::TripDeleted,
                        format!("Trip #{} was deleted by {}", trip.id, self.admin_display_name),
                    )?
                    .to_role(Role::PickupSupervisor)
                    .to_user(&trip.created_by),
                );
                return Ok(transition);
            }
            Action::Reply {
                message,
                attachments,
            } => {
                transition.changed = false;
                transition.activity =
                    Some(activity(ActivityKind::Reply, message).with_attachments(attachments));
            }
        }

        transition.trip = Some(next);
        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::MoneyFields;
    use crate::types::PartyRef;

    fn trip(status: TripStatus) -> Trip {
        Trip {
            id: 12,
            date: TripDate::from_ymd(2024, 6, 15).unwrap(),
            status,
            created_by: "ravi".to_string(),
            customer: PartyRef::new("Acme Infra"),
            quarry: PartyRef::new("North Quarry"),
            royalty_owner: PartyRef::default(),
            transporter: PartyRef::default(),
            vehicle: PartyRef::new("KA01AB1234"),
            material: PartyRef::new("20mm Aggregate"),
            pickup_place: "Gate A".to_string(),
            drop_off_place: "Ring Road Site".to_string(),
            weights: Weights::derived(40.0, 12.0),
            money: MoneyFields::default(),
            rate_override_enabled: false,
            rate_override: None,
            uploads: Uploads::default(),
            receipt: None,
            validation: None,
            pending_request: None,
            remarks: String::new(),
        }
    }

    fn now() -> TimeStamp {
        TimeStamp::new_with(2024, 6, 16, 8, 0, 0).unwrap()
    }

    fn transition_error(err: anyhow::Error) -> TransitionError {
        err.downcast::<TransitionError>().unwrap()
    }

    #[test]
    fn upload_moves_to_in_transit() {
        let machine = TripStateMachine::new();
        let pickup = Actor::new("ravi", Role::PickupSupervisor);
        let uploads = Uploads {
            eway_bill: vec![Attachment::new("eway.pdf", "https://files/eway.pdf")],
            ..Default::default()
        };

        let t = machine
            .apply(
                &trip(TripStatus::PendingUpload),
                &pickup,
                Action::UploadDocuments(uploads.clone()),
                now(),
            )
            .unwrap();

        assert_eq!(t.status(), Some(TripStatus::InTransit));
        assert_eq!(t.trip.unwrap().uploads, uploads);
        assert!(t.notifications.is_empty());
        assert!(t.activity.is_none());
    }

    #[test]
    fn receive_derives_end_net_and_notifies_back_office() {
        let machine = TripStateMachine::new();
        let dropoff = Actor::new("sunil", Role::DropoffSupervisor);
        let details = ReceiveDetails {
            date: TripDate::from_ymd(2024, 6, 16).unwrap(),
            end_gross_weight: 39.5,
            end_empty_weight: 12.0,
            end_wayment_slip: vec![],
        };

        let t = machine
            .apply(&trip(TripStatus::InTransit), &dropoff, Action::Receive(details), now())
            .unwrap();
        let next = t.trip.unwrap();
        let receipt = next.receipt.unwrap();

        assert_eq!(next.status, TripStatus::PendingValidation);
        assert_eq!(receipt.end_weights.net, 27.5);
        assert_eq!(receipt.by, "sunil");
        let roles: Vec<_> = t.notifications.iter().filter_map(|n| n.target_role).collect();
        assert_eq!(roles, vec![Role::Admin, Role::Manager, Role::Accountant]);
        assert_eq!(t.activity.unwrap().action, ActivityKind::Received);
    }

    #[test]
    fn receive_rejected_for_other_roles() {
        let machine = TripStateMachine::new();
        let details = ReceiveDetails {
            date: TripDate::from_ymd(2024, 6, 16).unwrap(),
            end_gross_weight: 39.5,
            end_empty_weight: 12.0,
            end_wayment_slip: vec![],
        };
        let admin = Actor::new("asha", Role::Admin);

        let err = machine
            .apply(&trip(TripStatus::InTransit), &admin, Action::Receive(details), now())
            .unwrap_err();

        assert_eq!(
            transition_error(err),
            TransitionError::Unauthorized {
                action: ActionKind::Receive,
                role: Role::Admin
            }
        );
    }

    #[test]
    fn validate_clears_pending_request() {
        let machine = TripStateMachine::new();
        let mut pending = trip(TripStatus::PendingValidation);
        pending.pending_request = Some(PendingRequest {
            kind: PendingRequestType::Update,
            message: "fix vehicle".to_string(),
            by: "sunil".to_string(),
            role: Role::DropoffSupervisor,
            at: now(),
        });

        let t = machine
            .apply(
                &pending,
                &Actor::new("meena", Role::Accountant),
                Action::Validate {
                    comments: "ok".to_string(),
                },
                now(),
            )
            .unwrap();
        let next = t.trip.unwrap();

        assert_eq!(next.status, TripStatus::TripCompleted);
        assert_eq!(next.pending_request, None);
        assert_eq!(next.validation.unwrap().by, "meena");
        assert_eq!(t.notifications.len(), 3);
    }

    #[test]
    fn validate_rejected_for_supervisor() {
        let machine = TripStateMachine::new();

        let err = machine
            .apply(
                &trip(TripStatus::PendingValidation),
                &Actor::new("ravi", Role::PickupSupervisor),
                Action::Validate {
                    comments: String::new(),
                },
                now(),
            )
            .unwrap_err();

        assert!(matches!(
            transition_error(err),
            TransitionError::Unauthorized {
                action: ActionKind::Validate,
                ..
            }
        ));
    }

    #[test]
    fn send_back_to_dropoff_needs_receiver() {
        let machine = TripStateMachine::new();

        let err = machine
            .apply(
                &trip(TripStatus::PendingValidation),
                &Actor::new("asha", Role::Admin),
                Action::SendBack {
                    to: SendBackTarget::Dropoff,
                    message: "recheck weight".to_string(),
                },
                now(),
            )
            .unwrap_err();

        assert_eq!(
            transition_error(err),
            TransitionError::MissingRecipient("drop-off supervisor")
        );
    }

    #[test]
    fn send_back_to_pickup_targets_creator() {
        let machine = TripStateMachine::new();

        let t = machine
            .apply(
                &trip(TripStatus::PendingValidation),
                &Actor::new("asha", Role::Admin),
                Action::SendBack {
                    to: SendBackTarget::Pickup,
                    message: "invoice missing".to_string(),
                },
                now(),
            )
            .unwrap();
        let next = t.trip.unwrap();

        assert_eq!(next.status, TripStatus::PendingUpload);
        assert_eq!(next.pending_request_type(), Some(PendingRequestType::SentBackPickup));
        assert_eq!(t.notifications[0].target_user.as_deref(), Some("ravi"));
    }

    #[test]
    fn request_update_twice_is_noop() {
        let machine = TripStateMachine::new();
        let sunil = Actor::new("sunil", Role::DropoffSupervisor);
        let action = Action::RequestUpdate {
            message: "wrong vehicle".to_string(),
        };

        let first = machine
            .apply(&trip(TripStatus::InTransit), &sunil, action.clone(), now())
            .unwrap();
        let after_first = first.trip.unwrap();
        let second = machine.apply(&after_first, &sunil, action, now()).unwrap();

        assert!(!second.changed);
        assert!(second.notifications.is_empty());
        assert_eq!(second.trip.unwrap(), after_first);
    }

    #[test]
    fn raise_issue_leaves_status() {
        let machine = TripStateMachine::new();

        let t = machine
            .apply(
                &trip(TripStatus::TripCompleted),
                &Actor::new("ravi", Role::PickupSupervisor),
                Action::RaiseIssue {
                    message: "short by a ton".to_string(),
                    attachments: vec![],
                },
                now(),
            )
            .unwrap();

        assert!(!t.changed);
        assert_eq!(t.status(), Some(TripStatus::TripCompleted));
        assert_eq!(t.notifications[0].target_role, Some(Role::Admin));
    }

    #[test]
    fn delete_notifies_creator() {
        let machine = TripStateMachine::new();

        let t = machine
            .apply(
                &trip(TripStatus::InTransit),
                &Actor::new("asha", Role::Manager),
                Action::Delete,
                now(),
            )
            .unwrap();

        assert!(t.is_deletion());
        assert_eq!(t.notifications[0].message, "Trip #12 was deleted by Admin");
        assert_eq!(t.notifications[0].target_user.as_deref(), Some("ravi"));
    }

    #[test]
    fn edit_locked_for_creator_after_upload() {
        let machine = TripStateMachine::new();
        let ravi = Actor::new("ravi", Role::PickupSupervisor);

        assert!(machine.check_edit(&trip(TripStatus::PendingUpload), &ravi).is_ok());
        assert_eq!(
            machine.check_edit(&trip(TripStatus::InTransit), &ravi),
            Err(TransitionError::EntryLocked {
                name: "ravi".to_string()
            })
        );
        assert!(machine
            .check_edit(&trip(TripStatus::TripCompleted), &Actor::new("asha", Role::Admin))
            .is_ok());
        assert!(machine
            .check_edit(
                &trip(TripStatus::PendingUpload),
                &Actor::new("kiran", Role::PickupSupervisor),
            )
            .is_err());
    }

    #[test]
    fn available_actions_hide_repeat_request() {
        let machine = TripStateMachine::new();
        let sunil = Actor::new("sunil", Role::DropoffSupervisor);
        let mut in_transit = trip(TripStatus::InTransit);

        assert!(machine
            .available_actions(&in_transit, &sunil)
            .contains(&ActionKind::RequestUpdate));

        in_transit.pending_request = Some(PendingRequest {
            kind: PendingRequestType::Update,
            message: String::new(),
            by: "sunil".to_string(),
            role: Role::DropoffSupervisor,
            at: now(),
        });
        let actions = machine.available_actions(&in_transit, &sunil);
        assert!(!actions.contains(&ActionKind::RequestUpdate));
        assert!(actions.contains(&ActionKind::Receive));
    }
}
