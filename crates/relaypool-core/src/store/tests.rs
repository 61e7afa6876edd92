use super::*;
use chrono::{Duration, TimeZone};
use relaypool_types::{
    AccountError, AccountRole, AccountStatus, Credentials, EventType, PoolError, RateBudget,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()
}

fn record(id: &str, role: AccountRole, health: f64) -> AccountRecord {
    let mut r = AccountRecord::new(id, role, Credentials::default(), t0());
    r.health_score = health;
    r
}

fn event(id: &str, kind: EventType, at: DateTime<Utc>) -> EventLogEntry {
    EventLogEntry::new(at, id, kind).with_action("tweet")
}

fn backends() -> Vec<(&'static str, Box<dyn AccountStore>)> {
    vec![
        ("memory", Box::new(MemoryStore::new())),
        ("sqlite", Box::new(SqliteStore::open_in_memory().unwrap())),
    ]
}

#[test]
fn test_get_missing_is_not_found() {
    for (name, store) in backends() {
        let err = store.get("ghost").unwrap_err();
        assert!(err.is_not_found(), "{name}: {err:?}");
    }
}

#[test]
fn test_insert_rejects_duplicate_id() {
    for (name, store) in backends() {
        let r = record("a1", AccountRole::Main, 50.0);
        store.insert(&r, &[]).unwrap();
        let err = store.insert(&r, &[]).unwrap_err();
        assert_eq!(
            err,
            PoolError::Account(AccountError::AlreadyExists { id: "a1".into() }),
            "{name}"
        );
    }
}

#[test]
fn test_list_orders_by_health_then_least_recently_used() {
    for (name, store) in backends() {
        let mut recent = record("recent", AccountRole::Main, 80.0);
        recent.last_used_at = Some(t0() + Duration::minutes(5));
        let mut older = record("older", AccountRole::Main, 80.0);
        older.last_used_at = Some(t0());
        let never = record("never", AccountRole::Main, 80.0);
        let best = record("best", AccountRole::Backup, 95.0);
        let weak = record("weak", AccountRole::Main, 20.0);

        for r in [&recent, &older, &never, &best, &weak] {
            store.insert(r, &[]).unwrap();
        }

        let ids: Vec<String> =
            store.list(&AccountFilter::any()).unwrap().into_iter().map(|r| r.account_id).collect();
        assert_eq!(ids, vec!["best", "never", "older", "recent", "weak"], "{name}");
    }
}

#[test]
fn test_list_applies_role_status_and_tag_filters() {
    for (name, store) in backends() {
        let main = record("main", AccountRole::Main, 50.0).with_tags(["crypto"]);
        let mut disabled = record("disabled", AccountRole::Main, 90.0);
        disabled.status = AccountStatus::Disabled;
        let niche = record("niche", AccountRole::Niche, 60.0);
        for r in [&main, &disabled, &niche] {
            store.insert(r, &[]).unwrap();
        }

        let selectable = store.list(&AccountFilter::selectable(Some(AccountRole::Main))).unwrap();
        assert_eq!(selectable.len(), 1, "{name}");
        assert_eq!(selectable[0].account_id, "main");

        let tagged =
            store.list(&AccountFilter { tag: Some("crypto".into()), ..Default::default() }).unwrap();
        assert_eq!(tagged.len(), 1, "{name}");

        let disabled_only = store.list(&AccountFilter::any().with_status(AccountStatus::Disabled));
        assert_eq!(disabled_only.unwrap()[0].account_id, "disabled", "{name}");
    }
}

#[test]
fn test_commit_writes_record_and_events_together() {
    for (name, store) in backends() {
        let mut r = record("a1", AccountRole::Main, 50.0);
        store.insert(&r, &[event("a1", EventType::Registered, t0())]).unwrap();

        r.status = AccountStatus::RateLimited;
        store.commit(&r, &[event("a1", EventType::RateLimited, t0() + Duration::seconds(1))]).unwrap();

        assert_eq!(store.get("a1").unwrap().status, AccountStatus::RateLimited, "{name}");
        let kinds: Vec<EventType> = store
            .events(&EventQuery::for_account("a1"))
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(kinds, vec![EventType::Registered, EventType::RateLimited], "{name}");
    }
}

#[test]
fn test_event_timestamps_never_go_backwards() {
    for (name, store) in backends() {
        store.append_event(&event("a1", EventType::Acquired, t0() + Duration::seconds(10))).unwrap();
        store.append_event(&event("a1", EventType::Succeeded, t0())).unwrap();

        let events = store.events(&EventQuery::default()).unwrap();
        assert_eq!(events.len(), 2, "{name}");
        assert!(events[1].timestamp >= events[0].timestamp, "{name}");
        assert_eq!(events[1].event_type, EventType::Succeeded);
    }
}

#[test]
fn test_event_window_and_limit() {
    for (name, store) in backends() {
        for i in 0..5 {
            store.append_event(&event("a1", EventType::Acquired, t0() + Duration::minutes(i))).unwrap();
        }
        store.append_event(&event("b2", EventType::Acquired, t0() + Duration::minutes(2))).unwrap();

        let window = EventQuery::window(t0() + Duration::minutes(1), t0() + Duration::minutes(4));
        assert_eq!(store.events(&window).unwrap().len(), 3, "{name}");

        let newest_two = EventQuery { account_id: Some("a1".into()), limit: Some(2), ..Default::default() };
        let events = store.events(&newest_two).unwrap();
        assert_eq!(events.len(), 2, "{name}");
        assert_eq!(events[1].timestamp, t0() + Duration::minutes(4), "{name}");
    }
}

#[test]
fn test_reset_daily_counters_is_idempotent_per_day() {
    for (name, store) in backends() {
        let mut r = record("a1", AccountRole::Main, 50.0)
            .with_budget(RateBudget::new("dm", 500, 86_400, t0()))
            .with_budget(RateBudget::new("tweet", 200, 900, t0()));
        r.budgets.get_mut("dm").unwrap().used_in_window = 120;
        r.budgets.get_mut("tweet").unwrap().used_in_window = 7;
        store.insert(&r, &[]).unwrap();

        let today = t0().date_naive();
        let later = t0() + Duration::hours(1);
        assert!(store.reset_daily_counters(today, later).unwrap(), "{name}");

        let after = store.get("a1").unwrap();
        assert_eq!(after.budgets["dm"].used_in_window, 0, "{name}");
        assert_eq!(after.budgets["tweet"].used_in_window, 7, "{name}");

        // Usage after the reset survives a second call on the same day
        let mut used = after.clone();
        used.budgets.get_mut("dm").unwrap().used_in_window = 3;
        store.save(&used).unwrap();
        assert!(!store.reset_daily_counters(today, later + Duration::hours(2)).unwrap(), "{name}");
        assert_eq!(store.get("a1").unwrap().budgets["dm"].used_in_window, 3, "{name}");

        assert!(store.reset_daily_counters(today.succ_opt().unwrap(), later).unwrap(), "{name}");
    }
}

#[test]
fn test_remove_keeps_history() {
    for (name, store) in backends() {
        let r = record("a1", AccountRole::Main, 50.0);
        store.insert(&r, &[event("a1", EventType::Registered, t0())]).unwrap();
        store.remove("a1", &[event("a1", EventType::Removed, t0())]).unwrap();

        assert!(store.get("a1").unwrap_err().is_not_found(), "{name}");
        assert_eq!(store.events(&EventQuery::for_account("a1")).unwrap().len(), 2, "{name}");
        assert!(store.remove("a1", &[]).unwrap_err().is_not_found(), "{name}");
    }
}

#[test]
fn test_sqlite_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pool.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        let mut r = record("durable", AccountRole::Engagement, 71.5)
            .with_budget(RateBudget::new("like", 50, 900, t0()));
        r.budgets.get_mut("like").unwrap().used_in_window = 9;
        r.credentials.bearer_token = "bearer-secret-token".into();
        store.insert(&r, &[event("durable", EventType::Registered, t0())]).unwrap();
        store.reset_daily_counters(t0().date_naive(), t0()).unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let r = store.get("durable").unwrap();
    assert_eq!(r.role, AccountRole::Engagement);
    assert_eq!(r.budgets["like"].used_in_window, 9);
    assert_eq!(r.credentials.bearer_token, "bearer-secret-token");
    assert_eq!(store.events(&EventQuery::default()).unwrap().len(), 1);
    assert!(!store.reset_daily_counters(t0().date_naive(), t0()).unwrap());
}
