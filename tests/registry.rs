//! Registry, observer and subscription tests.

mod common;

use common::{Keyless, User};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracked_changes::{
    ChangeEvent, ChangeRegistry, ChangeTracker, ChangesError, EventKind, FieldChange,
    RegisterOptions, RegistryConfig, Sequence, SubscriptionConfig, SubscriptionFilter, Value,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn registry() -> ChangeRegistry {
    let registry = ChangeRegistry::default();
    registry.register::<User>().unwrap();
    registry
}

#[test]
fn test_observer_receives_save_and_delete() {
    init_tracing();
    let registry = registry();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    registry
        .connect::<User>(Arc::new(move |tracker: &ChangeTracker<User>| {
            log.lock().push((tracker.last_event(), tracker.changes().unwrap()));
        }))
        .unwrap();

    let mut user = registry.track(User::new("x")).unwrap();
    assert!(seen.lock().is_empty());

    user.instance_mut().id = Some(1);
    user.record_event(EventKind::Save).unwrap();
    user.record_event(EventKind::Delete).unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, EventKind::Save);
    assert_eq!(seen[0].1["id"], FieldChange::new(Value::Null, 1));
    assert_eq!(seen[1].0, EventKind::Delete);
    assert_eq!(seen[1].1["id"], FieldChange::new(1, Value::Null));
}

#[test]
fn test_observers_run_in_order() {
    let registry = registry();
    let order = Arc::new(Mutex::new(Vec::new()));

    for n in 0..3 {
        let order = order.clone();
        registry
            .connect::<User>(Arc::new(move |_: &ChangeTracker<User>| order.lock().push(n)))
            .unwrap();
    }

    let mut user = registry.track(User::persisted(1, "x")).unwrap();
    user.record_event(EventKind::Save).unwrap();

    assert_eq!(*order.lock(), vec![0, 1, 2]);
}

#[test]
fn test_connect_unregistered() {
    let registry = ChangeRegistry::default();
    let result = registry.connect::<User>(Arc::new(|_: &ChangeTracker<User>| {}));
    assert!(matches!(result, Err(ChangesError::NotRegistered(name)) if name == "user"));
}

#[test]
fn test_register_without_primary_key() {
    let registry = ChangeRegistry::default();
    let result = registry.register::<Keyless>();
    assert!(matches!(result, Err(ChangesError::Field(_))));
}

#[test]
fn test_strict_registry_rejects_duplicates() {
    let registry = ChangeRegistry::new(RegistryConfig {
        allow_existing: false,
        ..Default::default()
    });
    registry.register::<User>().unwrap();

    assert!(matches!(
        registry.register::<User>(),
        Err(ChangesError::AlreadyRegistered(_))
    ));

    // Per-call override wins
    registry
        .register_with::<User>(RegisterOptions {
            allow_existing: Some(true),
        })
        .unwrap();
}

#[test]
fn test_tracker_outlives_unregister() {
    let registry = registry();
    let count = Arc::new(Mutex::new(0));
    let seen = count.clone();
    registry
        .connect::<User>(Arc::new(move |_: &ChangeTracker<User>| *seen.lock() += 1))
        .unwrap();

    let mut user = registry.track(User::persisted(1, "x")).unwrap();
    registry.unregister::<User>().unwrap();

    user.record_event(EventKind::Save).unwrap();
    assert_eq!(*count.lock(), 1);
    assert!(matches!(
        registry.track(User::new("y")),
        Err(ChangesError::NotRegistered(_))
    ));
}

// --- Subscriptions ---

#[test]
fn test_subscription_receives_change_events() {
    let registry = registry();
    let handle = registry.subscribe_all();

    let mut user = registry.track(User::new("x")).unwrap();
    user.instance_mut().id = Some(7);
    user.record_event(EventKind::Save).unwrap();

    let event = handle.recv_timeout(Duration::from_millis(100)).unwrap();
    match event {
        ChangeEvent::Changed {
            model,
            event,
            sequence,
            primary_key,
            changes,
        } => {
            assert_eq!(model, "user");
            assert_eq!(event, EventKind::Save);
            assert_eq!(sequence, Sequence(1));
            assert_eq!(primary_key, Value::Int(7));
            assert_eq!(changes.len(), 1);
        }
        other => panic!("Expected Changed event, got {:?}", other),
    }

    // Initial capture is never published
    assert!(handle.try_recv().is_err());
}

#[test]
fn test_subscription_event_filter() {
    let registry = registry();
    let handle = registry.subscribe(SubscriptionConfig {
        filter: SubscriptionFilter::events(vec![EventKind::Delete]),
        ..Default::default()
    });

    let mut user = registry.track(User::persisted(2, "x")).unwrap();
    user.record_event(EventKind::Save).unwrap();
    user.record_event(EventKind::Delete).unwrap();

    let event = handle.recv_timeout(Duration::from_millis(100)).unwrap();
    assert!(matches!(
        event,
        ChangeEvent::Changed {
            event: EventKind::Delete,
            primary_key: Value::Null,
            ..
        }
    ));
    assert!(handle.try_recv().is_err());
}

#[test]
fn test_change_event_json() {
    let registry = registry();
    let handle = registry.subscribe_all();

    let mut user = registry.track(User::persisted(3, "x")).unwrap();
    user.instance_mut().name = "y".to_string();
    user.record_event(EventKind::Save).unwrap();

    let event = handle.recv_timeout(Duration::from_millis(100)).unwrap();
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "changed");
    assert_eq!(json["model"], "user");
    assert_eq!(json["event"], "save");
    assert_eq!(json["changes"]["name"]["previous"]["value"], "x");
    assert_eq!(json["changes"]["name"]["current"]["value"], "y");
}

#[test]
fn test_trackers_on_separate_threads() {
    init_tracing();
    let registry = Arc::new(registry());
    let handle = registry.subscribe_all();

    let workers: Vec<_> = (1..=4)
        .map(|id| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let mut user = registry.track(User::new("x")).unwrap();
                user.instance_mut().id = Some(id);
                user.record_event(EventKind::Save).unwrap();
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let mut keys: Vec<_> = (0..4)
        .map(|_| match handle.recv_timeout(Duration::from_secs(1)).unwrap() {
            ChangeEvent::Changed { primary_key, .. } => primary_key.as_int().unwrap(),
            other => panic!("Expected Changed event, got {:?}", other),
        })
        .collect();
    keys.sort_unstable();
    assert_eq!(keys, vec![1, 2, 3, 4]);
}
