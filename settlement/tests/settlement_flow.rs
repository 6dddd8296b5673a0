//! Settlement drafts saved to and reopened from the ledger

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use ledger_core::{
    Choice, Config as LedgerConfig, Identity, Ledger, MemberId, ParticipationRecord,
    ParticipationStatus, Poll, PollId, TransactionConfig,
};
use rust_decimal::Decimal;
use settlement::{BulkSplit, Config, Error, Round, RoundTotals, SettlementEngine, ShareField};

fn id(name: &str) -> MemberId {
    MemberId::new(name)
}

fn dinner_poll() -> Poll {
    let admin = id("admin");
    let mut participants = BTreeMap::new();
    for (name, non_drinker) in [("a", false), ("b", false), ("c", true)] {
        participants.insert(
            id(name),
            ParticipationRecord {
                status: ParticipationStatus::Joined,
                decline_reason: None,
                is_non_drinker: non_drinker,
                updated_at: Utc::now(),
            },
        );
    }

    Poll {
        id: PollId::new("dinner"),
        title: "Dinner".to_string(),
        description: String::new(),
        date_choices: vec![Choice::new("Fri", admin.clone())],
        venue_choices: vec![Choice::new("A", admin.clone()), Choice::new("B", admin.clone())],
        participants,
        confirmed_attendees: ["a", "b", "c"].iter().map(|n| id(n)).collect(),
        finalized_date_id: None,
        finalized_venue_id: None,
        deadline: None,
        is_hidden: false,
        taxi_requesters: BTreeSet::from([id("c"), id("z")]),
        settlement: None,
        created_by: admin,
        created_at: Utc::now(),
    }
}

async fn seed(ledger: &Ledger, poll: &Poll) {
    ledger
        .transact("seed", |tx| tx.put(poll))
        .await
        .unwrap();
}

fn split() -> BulkSplit {
    BulkSplit {
        base: RoundTotals::new(90_000, 60_000),
        second_round: RoundTotals::new(40_000, 40_000),
        transport: Decimal::from(12_500),
    }
}

#[tokio::test]
async fn test_save_and_reopen_keeps_pins() {
    let ledger = Ledger::in_memory(TransactionConfig::default()).unwrap();
    let poll = dinner_poll();
    seed(&ledger, &poll).await;

    let engine = SettlementEngine::new(ledger.clone(), &Config::default()).unwrap();
    let admin = Identity::admin("admin");

    let mut draft = engine.open_draft(&admin, &poll.id).unwrap();
    draft.apply_bulk_split(split()).unwrap();
    draft
        .adjust_share(&id("a"), ShareField::Round(Round::Base), Decimal::from(50_000))
        .unwrap();
    draft.toggle_paid(&id("b")).unwrap();
    engine.save_draft(&admin, draft).await.unwrap();

    let reopened = engine.open_draft(&admin, &poll.id).unwrap();
    let a = reopened.share(&id("a")).unwrap();
    assert_eq!(a.base_share, Decimal::from(50_000));
    assert!(!a.base_auto);
    assert!(reopened.share(&id("b")).unwrap().is_paid);

    // Second round is beverage only: split between the two drinkers
    assert_eq!(a.second_round_share, Decimal::from(20_000));
    assert_eq!(reopened.share(&id("c")).unwrap().second_round_share, Decimal::ZERO);

    // Only C rides, Z asked but did not attend; 12,500 rounds up to 13,000
    assert_eq!(reopened.share(&id("c")).unwrap().transport_share, Decimal::from(13_000));
    assert!(reopened.share(&id("z")).is_none());
    assert_eq!(reopened.summary().transport.surplus(), Decimal::from(500));
}

#[tokio::test]
async fn test_save_fills_missing_attendees() {
    let ledger = Ledger::in_memory(TransactionConfig::default()).unwrap();
    let poll = dinner_poll();
    seed(&ledger, &poll).await;
    let engine = SettlementEngine::new(ledger.clone(), &Config::default()).unwrap();

    engine
        .save_settlement(&Identity::admin("admin"), &poll.id, Default::default())
        .await
        .unwrap();

    let stored = ledger.load::<Poll>(&poll.id).unwrap().settlement.unwrap();
    assert_eq!(stored.items.len(), 3);
}

#[tokio::test]
async fn test_reopen_after_uncheck_only_charges_attendees() {
    let ledger = Ledger::in_memory(TransactionConfig::default()).unwrap();
    let mut poll = dinner_poll();
    seed(&ledger, &poll).await;
    let engine = SettlementEngine::new(ledger.clone(), &Config::default()).unwrap();
    let admin = Identity::admin("admin");

    let mut draft = engine.open_draft(&admin, &poll.id).unwrap();
    draft.apply_bulk_split(split()).unwrap();
    engine.save_draft(&admin, draft).await.unwrap();

    poll = ledger.load::<Poll>(&poll.id).unwrap();
    poll.confirmed_attendees.remove(&id("c"));
    seed(&ledger, &poll).await;

    let mut draft = engine.open_draft(&admin, &poll.id).unwrap();
    draft
        .adjust_share(&id("a"), ShareField::Round(Round::Base), Decimal::from(50_000))
        .unwrap();

    assert!(draft.share(&id("c")).is_none());
    assert_eq!(draft.share(&id("b")).unwrap().base_share, Decimal::from(40_000));
    assert_eq!(draft.summary().base.assigned, Decimal::from(90_000));
    assert_eq!(draft.summary().unpaid, 2);
}

#[tokio::test]
async fn test_members_cannot_settle() {
    let ledger = Ledger::in_memory(TransactionConfig::default()).unwrap();
    let poll = dinner_poll();
    seed(&ledger, &poll).await;
    let engine = SettlementEngine::new(ledger.clone(), &Config::default()).unwrap();
    let member = Identity::member("a");

    assert!(matches!(
        engine.open_draft(&member, &poll.id),
        Err(Error::PermissionDenied(_))
    ));
    let err = engine
        .save_settlement(&member, &poll.id, Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)));
    assert!(ledger.load::<Poll>(&poll.id).unwrap().settlement.is_none());
}

#[tokio::test]
async fn test_banned_admin_reported_as_banned() {
    let ledger = Ledger::in_memory(TransactionConfig::default()).unwrap();
    let poll = dinner_poll();
    seed(&ledger, &poll).await;
    let engine = SettlementEngine::new(ledger.clone(), &Config::default()).unwrap();
    let mut admin = Identity::admin("admin");
    admin.is_banned = true;

    assert!(matches!(engine.open_draft(&admin, &poll.id), Err(Error::Banned(_))));
    let err = engine
        .save_settlement(&admin, &poll.id, Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Banned(_)));
    assert!(ledger.load::<Poll>(&poll.id).unwrap().settlement.is_none());
}

#[tokio::test]
async fn test_missing_poll() {
    let ledger = Ledger::in_memory(TransactionConfig::default()).unwrap();
    let engine = SettlementEngine::new(ledger, &Config::default()).unwrap();

    let err = engine
        .open_draft(&Identity::admin("admin"), &PollId::new("nope"))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_settlement_persists_in_rocksdb() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = LedgerConfig::default();
    config.data_dir = temp_dir.path().to_path_buf();
    let admin = Identity::admin("admin");
    let poll = dinner_poll();

    {
        let ledger = Ledger::open(&config).unwrap();
        seed(&ledger, &poll).await;
        let engine = SettlementEngine::new(ledger, &Config::default()).unwrap();
        let mut draft = engine.open_draft(&admin, &poll.id).unwrap();
        draft.apply_bulk_split(split()).unwrap();
        engine.save_draft(&admin, draft).await.unwrap();
    }

    let ledger = Ledger::open(&config).unwrap();
    let engine = SettlementEngine::new(ledger, &Config::default()).unwrap();
    let draft = engine.open_draft(&admin, &poll.id).unwrap();
    assert_eq!(draft.share(&id("a")).unwrap().base_share, Decimal::from(40_000));
    assert_eq!(draft.summary().base.assigned, Decimal::from(90_000));
}
