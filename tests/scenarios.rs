use std::sync::Arc;
use trip_workflow::{
    activity::ActivityKind,
    config::load_config,
    dashboard::{TripFilter, summarize},
    directory::{DirectoryEntry, MasterDataCache},
    notification::NotificationKind,
    rate::{MaterialRate, RatePartyType, TripRateOverride},
    service::TripService,
    store::SledNotificationSink,
    trip::{PendingRequestType, TripDraft, TripStatus, Uploads},
    types::{Actor, Attachment, Role, TripDate},
    workflow::{ReceiveDetails, SendBackTarget},
};

use tempfile::tempdir; // Use for test db cleanup.

fn init_logs() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("trip_workflow=debug")
        .with_test_writer()
        .try_init();
}

fn date(y: i32, m: u32, d: u32) -> TripDate {
    TripDate::from_ymd(y, m, d).unwrap()
}

fn rate(
    id: u64,
    party_type: RatePartyType,
    party_id: u64,
    per_ton: f64,
    from: TripDate,
    to: Option<TripDate>,
) -> MaterialRate {
    MaterialRate {
        id,
        rate_party_type: party_type,
        rate_party_id: party_id,
        material_type_id: 3,
        pickup_location_id: 10,
        drop_off_location_id: 11,
        total_rate_per_ton: per_ton,
        effective_from: from,
        effective_to: to,
    }
}

fn entries(list: &[(u64, &str)]) -> Vec<DirectoryEntry> {
    list.iter()
        .map(|(id, name)| DirectoryEntry::new(*id, name))
        .collect()
}

/// Master data shared by every scenario: one party per role, two sites,
/// one material and a rate per role. The customer has an expired rate as
/// well as the current one.
fn master_data() -> Arc<MasterDataCache> {
    Arc::new(
        MasterDataCache::builder()
            .parties(
                RatePartyType::VendorCustomer,
                || -> anyhow::Result<Vec<DirectoryEntry>> { Ok(entries(&[(1, "Acme Infra")])) },
            )
            .parties(
                RatePartyType::MineQuarry,
                || -> anyhow::Result<Vec<DirectoryEntry>> { Ok(entries(&[(2, "North Quarry")])) },
            )
            .parties(
                RatePartyType::TransportOwner,
                || -> anyhow::Result<Vec<DirectoryEntry>> { Ok(entries(&[(5, "Fast Movers")])) },
            )
            .parties(
                RatePartyType::RoyaltyOwner,
                || -> anyhow::Result<Vec<DirectoryEntry>> {
                    Ok(entries(&[(6, "State Mines Dept")]))
                },
            )
            .sites(|| -> anyhow::Result<Vec<DirectoryEntry>> {
                Ok(entries(&[(10, "Gate A"), (11, "Ring Road Site")]))
            })
            .materials(|| -> anyhow::Result<Vec<DirectoryEntry>> {
                Ok(entries(&[(3, "20mm Aggregate")]))
            })
            .vehicles(|| -> anyhow::Result<Vec<DirectoryEntry>> {
                Ok(entries(&[(7, "KA01AB1234")]))
            })
            .rates(|| -> anyhow::Result<Vec<MaterialRate>> {
                Ok(vec![
                    rate(
                        100,
                        RatePartyType::VendorCustomer,
                        1,
                        450.0,
                        date(2023, 1, 1),
                        Some(date(2023, 12, 31)),
                    ),
                    rate(101, RatePartyType::VendorCustomer, 1, 500.0, date(2024, 1, 1), None),
                    rate(102, RatePartyType::MineQuarry, 2, 200.0, date(2024, 1, 1), None),
                    rate(103, RatePartyType::TransportOwner, 5, 100.0, date(2024, 1, 1), None),
                    rate(104, RatePartyType::RoyaltyOwner, 6, 50.0, date(2024, 1, 1), None),
                ])
            })
            .build(),
    )
}

/// A 10 ton trip on 2024-06-15 that resolves against every rate above.
fn ten_ton_draft() -> TripDraft {
    TripDraft::new()
        .set_date(date(2024, 6, 15))
        .set_customer("Acme Infra")
        .set_quarry("North Quarry")
        .set_transporter("Fast Movers")
        .set_royalty_owner("State Mines Dept")
        .set_vehicle("KA01AB1234")
        .set_material("20mm Aggregate")
        .set_pickup_place("Gate A")
        .set_drop_off_place("Ring Road Site")
        .set_gross_weight(22.0)
        .set_empty_weight(12.0)
}

fn uploads() -> Uploads {
    Uploads {
        eway_bill: vec![Attachment::new("eway.pdf", "data:application/pdf;base64,AAAA")],
        wayment_slip: vec![Attachment::new("slip.jpg", "data:image/jpeg;base64,AAAA")],
        ..Uploads::default()
    }
}

fn receive_details() -> ReceiveDetails {
    ReceiveDetails {
        date: date(2024, 6, 16),
        end_gross_weight: 21.5,
        end_empty_weight: 12.0,
        end_wayment_slip: vec![],
    }
}

fn pickup() -> Actor {
    Actor::new("ravi", Role::PickupSupervisor).with_contact("+91 98450 00001")
}

fn dropoff() -> Actor {
    Actor::new("sunil", Role::DropoffSupervisor)
}

fn admin() -> Actor {
    Actor::new("asha", Role::Admin)
}

#[test]
fn full_lifecycle_to_completion() -> anyhow::Result<()> {
    init_logs();
    // Sled takes a file lock, so every test opens its own database under a temp dir.
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("lifecycle.db"))?);

    let service = TripService::open(db.clone(), master_data())?;
    let sink = SledNotificationSink::new(&db)?;

    let trip = service.create_trip(ten_ton_draft(), &pickup())?;
    assert_eq!(trip.status, TripStatus::PendingUpload);
    assert_eq!(trip.created_by, "ravi");

    let trip = service.upload_documents(trip.id, &pickup(), uploads())?;
    assert_eq!(trip.status, TripStatus::InTransit);
    assert_eq!(trip.uploads.len(), 2);

    let trip = service.receive_trip(trip.id, &dropoff(), receive_details())?;
    assert_eq!(trip.status, TripStatus::PendingValidation);
    let receipt = trip.receipt.as_ref().unwrap();
    assert_eq!(receipt.by, "sunil");
    assert_eq!(receipt.end_weights.net, 9.5);

    let received: Vec<_> = sink
        .all()?
        .into_iter()
        .filter(|n| n.kind == NotificationKind::TripReceived)
        .collect();
    assert_eq!(received.len(), 3);

    let trip = service.validate_trip(trip.id, &admin(), "weights match")?;
    assert_eq!(trip.status, TripStatus::TripCompleted);
    assert_eq!(trip.pending_request, None);
    assert_eq!(trip.validation.as_ref().unwrap().by, "asha");

    let validated: Vec<_> = sink
        .all()?
        .into_iter()
        .filter(|n| n.kind == NotificationKind::TripValidated)
        .collect();
    assert_eq!(validated.len(), 3);
    assert!(validated.iter().any(|n| n.is_for(Role::PickupSupervisor, "ravi")));
    assert!(validated.iter().any(|n| n.is_for(Role::DropoffSupervisor, "sunil")));
    assert!(validated.iter().any(|n| n.is_for(Role::Admin, "asha")));

    let actions: Vec<_> = service
        .get_activity(trip.id)?
        .into_iter()
        .map(|a| a.action)
        .collect();
    assert_eq!(actions, vec![ActivityKind::Received, ActivityKind::Validated]);

    Ok(())
}

#[test]
fn money_is_resolved_from_rate_table() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("money.db"))?);
    let service = TripService::open(db, master_data())?;

    let trip = service.create_trip(ten_ton_draft(), &pickup())?;

    // the expired 450 record is skipped for the current 500 one
    assert_eq!(trip.money.revenue, 5000.0);
    assert_eq!(trip.money.material_cost, 2000.0);
    assert_eq!(trip.money.transport_cost, 1000.0);
    assert_eq!(trip.money.royalty_cost, 500.0);
    assert_eq!(trip.money.profit, 1500.0);

    Ok(())
}

#[test]
fn override_wins_for_its_role_only() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("override.db"))?);
    let service = TripService::open(db, master_data())?;

    let rate_override = TripRateOverride::new(RatePartyType::VendorCustomer)
        .set_rate_party_id(1)
        .set_material_type_id(3)
        .set_locations(10, 11)
        .set_rate_per_ton(600.0)
        .set_effective(date(2024, 6, 1), None);
    let trip = service.create_trip(ten_ton_draft().set_rate_override(rate_override), &pickup())?;

    assert!(trip.rate_override_enabled);
    assert_eq!(trip.money.revenue, 6000.0);
    assert_eq!(trip.money.material_cost, 2000.0);
    assert_eq!(trip.money.transport_cost, 1000.0);
    assert_eq!(trip.money.royalty_cost, 500.0);

    Ok(())
}

#[test]
fn unknown_names_price_at_zero() -> anyhow::Result<()> {
    init_logs();
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("one_off.db"))?);
    let service = TripService::open(db, master_data())?;

    let trip = service.create_trip(ten_ton_draft().set_customer("ACME INFRA"), &pickup())?;

    assert!(trip.customer.is_one_off);
    assert!(!trip.quarry.is_one_off);
    assert_eq!(trip.money.revenue, 0.0);
    assert_eq!(trip.money.material_cost, 2000.0);
    assert_eq!(trip.money.profit, -3500.0);

    Ok(())
}

#[test]
fn edits_do_not_reprice() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("edit.db"))?);
    let service = TripService::open(db, master_data())?;

    let trip = service.create_trip(ten_ton_draft(), &pickup())?;
    let edited = service.edit_trip(
        trip.id,
        TripDraft::from_trip(&trip).set_gross_weight(32.0),
        &pickup(),
    )?;

    assert_eq!(edited.weights.net, 20.0);
    assert_eq!(edited.money, trip.money);

    Ok(())
}

#[test]
fn send_back_round_trips() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("send_back.db"))?);
    let service = TripService::open(db.clone(), master_data())?;
    let sink = SledNotificationSink::new(&db)?;

    let trip = service.create_trip(ten_ton_draft(), &pickup())?;
    service.upload_documents(trip.id, &pickup(), uploads())?;
    service.receive_trip(trip.id, &dropoff(), receive_details())?;

    // back to the drop-off supervisor, who receives again
    let trip = service.send_back(trip.id, &admin(), SendBackTarget::Dropoff, "slip unreadable")?;
    assert_eq!(trip.status, TripStatus::InTransit);
    assert_eq!(
        trip.pending_request_type(),
        Some(PendingRequestType::SentBackDropoff)
    );
    let to_sunil = sink.for_recipient(Role::DropoffSupervisor, "sunil")?;
    assert_eq!(to_sunil.len(), 1);
    assert_eq!(to_sunil[0].request_type.as_deref(), Some("sent-back-dropoff"));
    assert_eq!(to_sunil[0].request_message.as_deref(), Some("slip unreadable"));

    let trip = service.receive_trip(trip.id, &dropoff(), receive_details())?;
    assert_eq!(trip.status, TripStatus::PendingValidation);
    assert_eq!(trip.pending_request, None);

    // back to pickup, who uploads again
    let trip = service.send_back(trip.id, &admin(), SendBackTarget::Pickup, "missing invoice")?;
    assert_eq!(trip.status, TripStatus::PendingUpload);
    assert_eq!(
        trip.pending_request_type(),
        Some(PendingRequestType::SentBackPickup)
    );

    let trip = service.upload_documents(trip.id, &pickup(), uploads())?;
    assert_eq!(trip.status, TripStatus::InTransit);
    assert_eq!(trip.pending_request, None);

    Ok(())
}

#[test]
fn request_update_twice_is_a_single_request() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("update.db"))?);
    let service = TripService::open(db.clone(), master_data())?;
    let sink = SledNotificationSink::new(&db)?;

    let trip = service.create_trip(ten_ton_draft(), &pickup())?;
    service.upload_documents(trip.id, &pickup(), uploads())?;

    let first = service.request_update(trip.id, &pickup(), "wrong vehicle")?;
    let second = service.request_update(trip.id, &pickup(), "wrong vehicle")?;

    assert_eq!(first, second);
    assert_eq!(service.get_trip(trip.id)?, first);
    assert_eq!(service.get_activity(trip.id)?.len(), 1);

    let to_admin = sink.for_recipient(Role::Admin, "asha")?;
    assert_eq!(to_admin.len(), 1);
    assert_eq!(to_admin[0].kind, NotificationKind::UpdateRequested);
    assert_eq!(
        to_admin[0].requester_contact.as_deref(),
        Some("+91 98450 00001")
    );

    // a different request cannot stack on top
    assert!(service.request_delete(trip.id, &pickup(), "duplicate").is_err());

    Ok(())
}

#[test]
fn unauthorized_actions_change_nothing() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("unauthorized.db"))?);
    let service = TripService::open(db.clone(), master_data())?;
    let sink = SledNotificationSink::new(&db)?;

    let trip = service.create_trip(ten_ton_draft(), &pickup())?;
    service.upload_documents(trip.id, &pickup(), uploads())?;

    // only the drop-off supervisor receives
    assert!(service.receive_trip(trip.id, &admin(), receive_details()).is_err());
    service.receive_trip(trip.id, &dropoff(), receive_details())?;
    let before = service.get_trip(trip.id)?;
    let notified = sink.all()?.len();

    // supervisors cannot validate
    assert!(service.validate_trip(trip.id, &dropoff(), "looks fine").is_err());
    assert!(service.validate_trip(trip.id, &pickup(), "looks fine").is_err());

    assert_eq!(service.get_trip(trip.id)?, before);
    assert_eq!(sink.all()?.len(), notified);

    Ok(())
}

#[test]
fn issue_on_completed_trip_is_logged_only() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("issue.db"))?);
    let service = TripService::open(db.clone(), master_data())?;
    let sink = SledNotificationSink::new(&db)?;

    let trip = service.create_trip(ten_ton_draft(), &pickup())?;
    service.upload_documents(trip.id, &pickup(), uploads())?;
    service.receive_trip(trip.id, &dropoff(), receive_details())?;
    let completed = service.validate_trip(trip.id, &admin(), "")?;

    let after = service.raise_issue(
        trip.id,
        &dropoff(),
        "short by half a ton",
        vec![Attachment::new("photo.jpg", "data:image/jpeg;base64,AAAA")],
    )?;
    service.reply(trip.id, &admin(), "checking with the weighbridge", vec![])?;

    assert_eq!(after, completed);
    assert_eq!(service.get_trip(trip.id)?, completed);

    let activity = service.get_activity(trip.id)?;
    let issue = activity
        .iter()
        .find(|a| a.action == ActivityKind::IssueRaised)
        .unwrap();
    assert_eq!(issue.attachments.len(), 1);
    assert_eq!(activity.last().unwrap().action, ActivityKind::Reply);

    let issues: Vec<_> = sink
        .all()?
        .into_iter()
        .filter(|n| n.kind == NotificationKind::IssueRaised)
        .collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].target_role, Some(Role::Admin));

    Ok(())
}

#[test]
fn delete_notifies_creator_with_configured_name() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "database_path = {:?}\n\n[workflow]\nadmin_display_name = \"Head Office\"\n",
            temp_dir.path().join("delete.db")
        ),
    )?;
    let config = load_config(&config_path)?;
    config.init_tracing();

    let db = config.open_database()?;
    let service =
        TripService::open(db.clone(), master_data())?.with_state_machine(config.state_machine());
    let sink = SledNotificationSink::new(&db)?;

    let trip = service.create_trip(ten_ton_draft(), &pickup())?;
    service.reply(trip.id, &admin(), "duplicate of an earlier trip", vec![])?;
    service.delete_trip(trip.id, &admin())?;

    assert!(service.get_trip(trip.id).is_err());
    // the reply stays in the log after the trip is gone
    let activity = service.get_activity(trip.id)?;
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].message, "duplicate of an earlier trip");

    let to_ravi = sink.for_recipient(Role::PickupSupervisor, "ravi")?;
    assert_eq!(to_ravi.len(), 1);
    assert_eq!(
        to_ravi[0].message,
        format!("Trip #{} was deleted by Head Office", trip.id)
    );

    Ok(())
}

#[test]
fn dashboards_filter_and_total() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("dashboard.db"))?);
    let service = TripService::open(db, master_data())?;

    let a = service.create_trip(ten_ton_draft(), &pickup())?;
    let b = service.create_trip(ten_ton_draft(), &pickup())?;
    service.create_trip(
        ten_ton_draft().set_date(date(2024, 7, 1)),
        &Actor::new("kiran", Role::PickupSupervisor),
    )?;
    service.upload_documents(b.id, &pickup(), uploads())?;

    let ravis = service.list_trips(&TripFilter::new().created_by("ravi"))?;
    assert_eq!(ravis.len(), 2);
    // newest first
    assert_eq!(ravis[0].id, b.id);
    assert_eq!(ravis[1].id, a.id);

    let waiting = service.list_trips(&TripFilter::new().with_status(TripStatus::PendingUpload))?;
    assert_eq!(waiting.len(), 2);

    let june = service.list_trips(
        &TripFilter::new().between(date(2024, 6, 1), date(2024, 6, 30)),
    )?;
    let totals = summarize(&june);
    assert_eq!(totals.count, 2);
    assert_eq!(totals.net_weight, 20.0);
    assert_eq!(totals.revenue, 10000.0);
    assert_eq!(totals.profit, 3000.0);

    Ok(())
}
