use super::{account, account_with_tweets, harness, t0, used};
use crate::aggregator;
use crate::export::ExportFormat;
use crate::store::AccountStore;
use chrono::Duration;
use relaypool_types::{
    AccountError, AccountFilter, AccountRole, AccountStatus, AggregateReport, EventQuery,
    EventType, Outcome, PoolError, RateBudget, SignalUpdate,
};

#[test]
fn test_register_rejects_duplicates_and_blank_ids() {
    let h = harness();
    let summary = h.dispatcher.register_account(account("a", AccountRole::Main)).unwrap();
    assert!((summary.health_score - 45.0).abs() < 1e-9);

    let err = h.dispatcher.register_account(account("a", AccountRole::Backup)).unwrap_err();
    assert_eq!(err, PoolError::Account(AccountError::AlreadyExists { id: "a".into() }));
    assert!(matches!(
        h.dispatcher.register_account(account("  ", AccountRole::Main)),
        Err(PoolError::Config(_))
    ));
}

#[test]
fn test_list_accounts_masks_credentials() {
    let h = harness();
    h.dispatcher.register_account(account("a", AccountRole::Main)).unwrap();

    let listed = h.dispatcher.list_accounts(&AccountFilter::any()).unwrap();
    assert_eq!(listed.len(), 1);
    let summary = &listed[0];
    assert_eq!(summary.masked_credential, "AAAA...ZZZZ");
    assert_eq!(summary.fingerprint.len(), 12);

    let json = serde_json::to_string(&listed).unwrap();
    assert!(!json.contains("secretvalue"));
    assert!(!json.contains("key-a-0123456789"));
}

#[test]
fn test_unknown_account_is_not_found() {
    let h = harness();
    assert!(h.dispatcher.get_account("ghost").unwrap_err().is_not_found());
    assert!(h.dispatcher.reactivate("ghost").unwrap_err().is_not_found());
    assert!(h.dispatcher.update_signals("ghost", SignalUpdate::default()).unwrap_err().is_not_found());
    assert!(h.dispatcher.remove_account("ghost").unwrap_err().is_not_found());
}

#[test]
fn test_disable_then_reactivate() {
    let h = harness();
    h.dispatcher.register_account(account("a", AccountRole::Main)).unwrap();

    h.dispatcher.disable("a", "suspicious login").unwrap();
    assert!(h.dispatcher.acquire("tweet", None).is_err());
    let err = h.dispatcher.disable("a", "again").unwrap_err();
    assert_eq!(
        err,
        PoolError::Account(AccountError::Disabled {
            id: "a".into(),
            reason: Some("suspicious login".into())
        })
    );

    assert!(h.dispatcher.reactivate("a").unwrap());
    assert!(!h.dispatcher.reactivate("a").unwrap());
    let record = h.store.get("a").unwrap();
    assert_eq!(record.status, AccountStatus::Active);
    assert!(record.disabled_reason.is_none());
    assert!(h.dispatcher.acquire("tweet", None).is_ok());

    let kinds: Vec<EventType> = h
        .store
        .events(&EventQuery::for_account("a"))
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(
        kinds,
        vec![EventType::Registered, EventType::Disabled, EventType::Reactivated, EventType::Acquired]
    );
}

#[test]
fn test_reactivation_clears_failure_streak() {
    let h = harness();
    h.dispatcher.register_account(account("a", AccountRole::Main)).unwrap();
    let leases: Vec<_> = (0..3).map(|_| h.dispatcher.acquire("tweet", None).unwrap()).collect();
    for lease in &leases {
        h.dispatcher.report(lease, Outcome::Failure).unwrap();
    }
    assert_eq!(h.store.get("a").unwrap().status, AccountStatus::Disabled);

    // Never automatic
    h.clock.advance(Duration::days(30));
    h.dispatcher.reconcile().unwrap();
    assert_eq!(h.store.get("a").unwrap().status, AccountStatus::Disabled);

    h.dispatcher.reactivate("a").unwrap();
    let lease = h.dispatcher.acquire("tweet", None).unwrap();
    h.dispatcher.report(&lease, Outcome::Failure).unwrap();
    assert_eq!(h.store.get("a").unwrap().status, AccountStatus::Erroring);
}

#[test]
fn test_remove_drops_outstanding_leases() {
    let h = harness();
    h.dispatcher.register_account(account("a", AccountRole::Main)).unwrap();
    let lease = h.dispatcher.acquire("tweet", None).unwrap();

    h.dispatcher.remove_account("a").unwrap();
    assert_eq!(h.dispatcher.outstanding_leases(), 0);
    assert!(h.dispatcher.report(&lease, Outcome::Success).unwrap_err().is_invalid_lease());
    assert_eq!(h.store.events(&EventQuery::for_account("a")).unwrap().last().unwrap().event_type, EventType::Removed);
}

#[test]
fn test_update_signals_rescores() {
    let h = harness();
    h.dispatcher.register_account(account("a", AccountRole::Main)).unwrap();

    let score = h
        .dispatcher
        .update_signals(
            "a",
            SignalUpdate { engagement_rate: Some(0.02), follower_growth_7d: Some(50), ..Default::default() },
        )
        .unwrap();
    // 0.35*0.5 + 0.25*0.75 + 0.25*1 + 0.15*0.5
    assert!((score - 68.75).abs() < 1e-9, "{score}");
    assert!((h.store.get("a").unwrap().health_score - score).abs() < 1e-12);
}

#[test]
fn test_daily_reset_is_idempotent_within_a_day() {
    let h = harness();
    let record = account("a", AccountRole::Main)
        .with_budget(RateBudget::new("dm", 2, 86_400, t0()))
        .with_budget(RateBudget::new("tweet", 5, 900, t0()));
    h.dispatcher.register_account(record).unwrap();

    h.dispatcher.acquire("dm", None).unwrap();
    h.dispatcher.acquire("dm", None).unwrap();
    h.dispatcher.acquire("tweet", None).unwrap();
    assert!(h.dispatcher.acquire("dm", None).is_err());

    assert!(h.dispatcher.reset_daily_counters().unwrap());
    assert_eq!(used(&h.store, "a", "dm"), 0);
    assert_eq!(used(&h.store, "a", "tweet"), 1);

    h.dispatcher.acquire("dm", None).unwrap();
    h.clock.advance(Duration::hours(2));
    assert!(!h.dispatcher.reset_daily_counters().unwrap());
    assert_eq!(used(&h.store, "a", "dm"), 1);

    h.clock.advance(Duration::days(1));
    assert!(h.dispatcher.reset_daily_counters().unwrap());
}

#[test]
fn test_reconcile_recovers_and_rescores() {
    let h = harness();
    h.dispatcher.register_account(account_with_tweets("limited", AccountRole::Main, 5, 60)).unwrap();
    h.dispatcher.register_account(account("faulty", AccountRole::Backup)).unwrap();

    let lease = h.dispatcher.acquire("tweet", Some(AccountRole::Main)).unwrap();
    h.dispatcher.report(&lease, Outcome::RateLimited).unwrap();
    let lease = h.dispatcher.acquire("tweet", Some(AccountRole::Backup)).unwrap();
    h.dispatcher.report(&lease, Outcome::Failure).unwrap();
    let damaged = h.store.get("faulty").unwrap().health_score;

    let _abandoned = h.dispatcher.acquire("search", None).unwrap();
    h.clock.advance(Duration::days(8));
    let summary = h.dispatcher.reconcile().unwrap();

    assert_eq!(summary.recovered, 1);
    assert_eq!(summary.expired_leases, 1);
    assert_eq!(summary.rescored, 1);
    assert_eq!(h.store.get("limited").unwrap().status, AccountStatus::Active);

    let faulty = h.store.get("faulty").unwrap();
    assert!(faulty.health_score > damaged);
    assert!(faulty.signals.violations.is_empty());
    // Reservation of the abandoned lease stands
    assert_eq!(h.store.get("limited").unwrap().budgets.get("search").map(|b| b.used_in_window), Some(1));

    let again = h.dispatcher.reconcile().unwrap();
    assert_eq!((again.recovered, again.rescored, again.expired_leases), (0, 0, 0));
}

#[test]
fn test_headroom_reports_remaining_units() {
    let h = harness();
    h.dispatcher.register_account(account_with_tweets("a", AccountRole::Main, 4, 60)).unwrap();
    h.dispatcher.acquire("tweet", None).unwrap();

    let headroom = h.dispatcher.headroom("a").unwrap();
    assert_eq!(headroom, vec![("tweet".to_string(), 3, 4)]);
    h.clock.advance(Duration::seconds(61));
    assert_eq!(h.dispatcher.headroom("a").unwrap()[0].1, 4);
}

#[test]
fn test_json_export_round_trips_aggregate() {
    let h = harness();
    h.dispatcher.register_account(account("a", AccountRole::Main)).unwrap();
    h.dispatcher.register_account(account("b", AccountRole::Niche)).unwrap();

    for outcome in [Outcome::Success, Outcome::Failure, Outcome::Success, Outcome::RateLimited] {
        let lease = h.dispatcher.acquire("tweet", None).unwrap();
        h.dispatcher.report(&lease, outcome).unwrap();
        h.clock.advance(Duration::seconds(1));
    }
    let spare = h.dispatcher.acquire("like", None).unwrap();
    h.dispatcher.release(&spare).unwrap();

    let from = t0();
    let to = t0() + Duration::hours(1);
    let direct = aggregator::compute(&*h.store, from, to).unwrap();
    let blob = h.dispatcher.export(ExportFormat::Json, from, to).unwrap();
    let parsed: AggregateReport = serde_json::from_str(&blob).unwrap();

    assert_eq!(parsed.outcomes, direct.outcomes);
    assert_eq!(parsed.usage_by_action, direct.usage_by_action);
    assert_eq!(parsed.pool.by_status, direct.pool.by_status);
    assert_eq!(parsed.pool.total_accounts, direct.pool.total_accounts);
    assert_eq!((parsed.window_start, parsed.window_end), (from, to));
    assert!((parsed.success_rate - direct.success_rate).abs() < 1e-12);
    for (role, health) in &direct.avg_health_by_role {
        assert!((parsed.avg_health_by_role[role] - health).abs() < 1e-9);
    }

    assert_eq!(direct.outcomes.acquired, 5);
    assert_eq!(direct.outcomes.succeeded, 2);
    assert_eq!(direct.outcomes.released, 1);
    assert_eq!(direct.usage_by_action["tweet"], 4);
}

#[test]
fn test_register_caps_imported_usage_at_limit() {
    let h = harness();
    let mut budget = RateBudget::new("tweet", 3, 900, t0());
    budget.used_in_window = 10;
    h.dispatcher.register_account(account("a", AccountRole::Main).with_budget(budget)).unwrap();

    assert_eq!(used(&h.store, "a", "tweet"), 3);
    assert!(h.dispatcher.acquire("tweet", None).is_err());
}

#[test]
fn test_register_rejects_unenforceable_budgets() {
    let h = harness();
    let cases = [
        RateBudget::new("tweet", 0, 900, t0()),
        RateBudget::new("tweet", 5, 0, t0()),
        RateBudget::new("tweet", 5, -60, t0()),
        RateBudget::new("tweet", 5, i64::MAX, t0()),
    ];
    for budget in cases {
        let err = h.dispatcher.register_account(account("a", AccountRole::Main).with_budget(budget)).unwrap_err();
        assert!(matches!(err, PoolError::Config(_)), "{err:?}");
    }

    let mut record = account("a", AccountRole::Main);
    record.budgets.insert("like".into(), RateBudget::new("tweet", 5, 900, t0()));
    let err = h.dispatcher.register_account(record).unwrap_err();
    assert!(err.to_string().contains("budgets.like"), "{err}");
    assert!(h.store.get("a").unwrap_err().is_not_found());
}

#[test]
fn test_remove_forgets_account_lock() {
    let h = harness();
    h.dispatcher.register_account(account("a", AccountRole::Main)).unwrap();
    h.dispatcher.acquire("tweet", None).unwrap();
    assert_eq!(h.dispatcher.tracked_locks(), 1);

    h.dispatcher.remove_account("a").unwrap();
    assert_eq!(h.dispatcher.tracked_locks(), 0);
}
