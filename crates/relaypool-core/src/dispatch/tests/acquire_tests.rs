use super::{account, account_with_tweets, harness, harness_with, strong_signals, t0, used};
use crate::store::AccountStore;
use chrono::Duration;
use relaypool_types::{
    AccountRole, AccountStatus, DispatchConfig, EventQuery, EventType, Outcome, PoolError,
};

#[test]
fn test_limit_three_then_exhausted_until_rollover() {
    let h = harness();
    h.dispatcher.register_account(account_with_tweets("solo", AccountRole::Main, 3, 60)).unwrap();

    for _ in 0..3 {
        h.dispatcher.acquire("tweet", None).unwrap();
    }
    let err = h.dispatcher.acquire("tweet", None).unwrap_err();
    assert!(matches!(err, PoolError::ExhaustedPool { .. }), "{err:?}");
    assert!(err.is_transient());

    // Still the same window at its last second
    h.clock.advance(Duration::seconds(60));
    assert!(h.dispatcher.acquire("tweet", None).is_err());

    h.clock.advance(Duration::seconds(1));
    let lease = h.dispatcher.acquire("tweet", None).unwrap();
    assert_eq!(lease.account_id, "solo");
    assert_eq!(used(&h.store, "solo", "tweet"), 1);
}

#[test]
fn test_exhausted_pool_changes_nothing() {
    let h = harness();
    h.dispatcher.register_account(account_with_tweets("a", AccountRole::Main, 1, 60)).unwrap();
    h.dispatcher.acquire("tweet", None).unwrap();

    let before = h.store.get("a").unwrap();
    let events_before = h.store.events(&EventQuery::default()).unwrap().len();
    h.clock.advance(Duration::seconds(5));

    assert!(h.dispatcher.acquire("tweet", None).is_err());
    assert_eq!(h.store.get("a").unwrap(), before);
    assert_eq!(h.store.events(&EventQuery::default()).unwrap().len(), events_before);
}

#[test]
fn test_lease_carries_ttl_and_appends_acquired_event() {
    let h = harness();
    h.dispatcher.register_account(account("a", AccountRole::Main)).unwrap();

    let lease = h.dispatcher.acquire("search", None).unwrap();
    assert_eq!(lease.issued_at, t0());
    assert_eq!(lease.expires_at, t0() + Duration::seconds(120));
    assert_eq!(lease.action_type, "search");
    assert_eq!(h.dispatcher.outstanding_leases(), 1);

    let record = h.store.get("a").unwrap();
    assert_eq!(record.last_used_at, Some(t0()));
    // Budget created lazily from the configured default
    assert_eq!(record.budgets["search"].limit, 180);
    assert_eq!(record.budgets["search"].used_in_window, 1);

    let events = h.store.events(&EventQuery::for_account("a")).unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.event_type, EventType::Acquired);
    assert_eq!(last.action_type.as_deref(), Some("search"));
}

#[test]
fn test_unknown_action_type_is_ineligible() {
    let mut config = DispatchConfig::default();
    config.default_budgets.clear();
    let h = harness_with(config);
    h.dispatcher.register_account(account_with_tweets("a", AccountRole::Main, 5, 60)).unwrap();

    assert!(h.dispatcher.acquire("tweet", None).is_ok());
    let err = h.dispatcher.acquire("poll", None).unwrap_err();
    assert_eq!(err, PoolError::ExhaustedPool { action: "poll".into(), role: None });
}

#[test]
fn test_role_filter_restricts_candidates() {
    let h = harness();
    let mut main = account("main", AccountRole::Main);
    main.signals = strong_signals();
    h.dispatcher.register_account(main).unwrap();
    h.dispatcher.register_account(account("niche", AccountRole::Niche)).unwrap();

    assert_eq!(h.dispatcher.acquire("like", None).unwrap().account_id, "main");
    assert_eq!(h.dispatcher.acquire("like", Some(AccountRole::Niche)).unwrap().account_id, "niche");

    let err = h.dispatcher.acquire("like", Some(AccountRole::Monitoring)).unwrap_err();
    assert_eq!(
        err,
        PoolError::ExhaustedPool { action: "like".into(), role: Some("monitoring".into()) }
    );
}

#[test]
fn test_healthier_account_preferred_then_failover() {
    let h = harness();
    let mut strong = account_with_tweets("strong", AccountRole::Main, 2, 900);
    strong.signals = strong_signals();
    h.dispatcher.register_account(strong).unwrap();
    h.dispatcher.register_account(account_with_tweets("weak", AccountRole::Main, 2, 900)).unwrap();

    let picks: Vec<String> =
        (0..4).map(|_| h.dispatcher.acquire("tweet", None).unwrap().account_id).collect();
    assert_eq!(picks, vec!["strong", "strong", "weak", "weak"]);
    assert!(h.dispatcher.acquire("tweet", None).is_err());
}

#[test]
fn test_alternates_equally_healthy_accounts() {
    let h = harness();
    h.dispatcher.register_account(account("a", AccountRole::Main)).unwrap();
    h.dispatcher.register_account(account("b", AccountRole::Main)).unwrap();

    let mut picks = Vec::new();
    for _ in 0..6 {
        let lease = h.dispatcher.acquire("tweet", None).unwrap();
        picks.push(lease.account_id.clone());
        h.dispatcher.report(&lease, Outcome::Success).unwrap();
        h.clock.advance(Duration::seconds(1));
    }
    assert_eq!(picks, vec!["a", "b", "a", "b", "a", "b"]);
}

#[test]
fn test_disabled_account_never_selected_regardless_of_health() {
    let h = harness();
    let mut star = account("star", AccountRole::Main);
    star.signals = strong_signals();
    star.status = AccountStatus::Disabled;
    h.dispatcher.register_account(star).unwrap();
    h.dispatcher.register_account(account("plain", AccountRole::Main)).unwrap();

    for _ in 0..5 {
        assert_eq!(h.dispatcher.acquire("tweet", None).unwrap().account_id, "plain");
    }
}

#[test]
fn test_erroring_account_is_not_selected() {
    let h = harness();
    h.dispatcher.register_account(account("a", AccountRole::Main)).unwrap();

    let first = h.dispatcher.acquire("tweet", None).unwrap();
    let second = h.dispatcher.acquire("tweet", None).unwrap();
    h.dispatcher.report(&first, Outcome::Failure).unwrap();
    assert_eq!(h.store.get("a").unwrap().status, AccountStatus::Erroring);

    let err = h.dispatcher.acquire("tweet", None).unwrap_err();
    assert!(matches!(err, PoolError::ExhaustedPool { .. }), "{err:?}");

    // A lease issued before the failure still settles the account
    h.dispatcher.report(&second, Outcome::Success).unwrap();
    assert_eq!(h.store.get("a").unwrap().status, AccountStatus::Active);
    assert_eq!(h.dispatcher.acquire("tweet", None).unwrap().account_id, "a");
}

#[test]
fn test_out_of_range_lease_ttl_is_rejected_up_front() {
    let config = DispatchConfig { lease_ttl_secs: i64::MAX, ..Default::default() };
    let store = std::sync::Arc::new(crate::store::MemoryStore::new());
    let err = super::super::Dispatcher::new(store, config).err().unwrap();
    assert!(matches!(err, PoolError::Config(_)), "{err:?}");

    let h = harness_with(DispatchConfig {
        lease_ttl_secs: relaypool_types::MAX_WINDOW_SECS,
        ..Default::default()
    });
    h.dispatcher.register_account(account("a", AccountRole::Main)).unwrap();
    let lease = h.dispatcher.acquire("tweet", None).unwrap();
    assert_eq!(lease.expires_at, t0() + Duration::seconds(relaypool_types::MAX_WINDOW_SECS));
}
