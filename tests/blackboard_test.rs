//! Integration tests for registering, subscribing and firing.

use std::sync::Arc;

use blackboard::Blackboard;
use blackboard::BlackboardConfigBuilder;
use blackboard::BlackboardError;
use blackboard::ClearPolicy;
use blackboard::DispatchReport;
use blackboard::Event;
use blackboard::ListenerId;
use blackboard::TypeKey;

use crate::common::Butler;
use crate::common::ConsoleGreeter;
use crate::common::Doorbell;
use crate::common::Farewell;
use crate::common::FarewellEvent;
use crate::common::Greeter;
use crate::common::GreetingEvent;
use crate::common::GrumpyGreeter;
use crate::common::Host;
use crate::common::Intercom;
use crate::common::Leaver;
use crate::common::Mood;
use crate::common::PoliteGreeter;
use crate::common::RecordingSink;

mod common;

fn greeter_board() -> Blackboard {
    let blackboard = Blackboard::new();
    blackboard
        .register::<dyn Greeter, GreetingEvent>()
        .expect("register greeter");
    blackboard
}

#[test]
fn test_every_listener_receives_event_once() {
    let blackboard = greeter_board();
    let first = Arc::new(ConsoleGreeter::default());
    let second = Arc::new(ConsoleGreeter::default());

    blackboard.add_listener(&first).unwrap();
    blackboard.add_listener(&second).unwrap();
    let report = blackboard.fire(&GreetingEvent::new("hi")).unwrap();

    assert_eq!(report, DispatchReport {
        delivered: 2,
        failed: 0,
        unreachable: 0,
    });
    assert_eq!(first.greetings(), vec!["hi"]);
    assert_eq!(second.greetings(), vec!["hi"]);
    assert_eq!(blackboard.listener_count::<dyn Greeter>(), 2);
}

#[test]
fn test_listeners_for_capability() {
    let blackboard = greeter_board();
    let greeter = Arc::new(ConsoleGreeter::default());
    let butler = Arc::new(Butler::default());
    blackboard.add_listener(&greeter).unwrap();
    blackboard.add_listener(&butler).unwrap();

    let listeners = blackboard.listeners_for::<dyn Greeter>();
    assert_eq!(listeners.len(), 2);
    for listener in &listeners {
        listener.on_greeting(&GreetingEvent::new("direct")).unwrap();
    }
    assert_eq!(greeter.greetings(), vec!["direct"]);
    assert_eq!(*butler.greetings.lock(), vec!["direct, sir"]);

    assert!(blackboard.listeners_for::<dyn Farewell>().is_empty());
}

#[test]
fn test_adding_same_listener_twice_delivers_once() {
    let blackboard = greeter_board();
    let greeter = Arc::new(ConsoleGreeter::default());

    blackboard.add_listener(&greeter).unwrap();
    blackboard.add_listener(&greeter).unwrap();
    blackboard.fire(&GreetingEvent::new("hi")).unwrap();

    assert_eq!(greeter.greetings().len(), 1);
}

#[test]
fn test_registration_lookup() {
    let blackboard = greeter_board();

    let registration = blackboard
        .registration_for::<GreetingEvent>()
        .expect("greeting is registered");
    assert_eq!(registration.capability().key(), TypeKey::of::<dyn Greeter>());
    assert_eq!(registration.handler().method_name(), "on_greeting");
    assert_eq!(registration.handler().declared_in(), TypeKey::of::<dyn Greeter>());
    assert!(blackboard.registration_for::<FarewellEvent>().is_none());
    assert_eq!(blackboard.registration_count(), 1);
}

#[test]
fn test_duplicate_registration() {
    let blackboard = greeter_board();

    let same = blackboard
        .register::<dyn Greeter, GreetingEvent>()
        .unwrap_err();
    assert!(same.is_duplicate_registration());

    let other = blackboard
        .register::<dyn PoliteGreeter, GreetingEvent>()
        .unwrap_err();
    match other {
        BlackboardError::DuplicateRegistration {
            capability,
            event,
            existing,
        } => {
            assert_eq!(capability, TypeKey::of::<dyn PoliteGreeter>());
            assert_eq!(event, TypeKey::of::<GreetingEvent>());
            assert_eq!(existing, TypeKey::of::<dyn Greeter>());
        }
        e => panic!("Expected DuplicateRegistration, got {e:?}"),
    }
    assert_eq!(blackboard.registration_count(), 1);
}

#[test]
fn test_fire_unregistered_event() {
    let blackboard = greeter_board();

    let err = blackboard.fire(&FarewellEvent::new("bye")).unwrap_err();
    assert!(matches!(
        err,
        BlackboardError::EventNotRegistered { event } if event == TypeKey::of::<FarewellEvent>()
    ));
}

#[test]
fn test_fire_without_listeners() {
    let blackboard = greeter_board();
    let report = blackboard.fire(&GreetingEvent::new("anyone?")).unwrap();
    assert_eq!(report, DispatchReport::default());
}

#[test]
fn test_listener_without_matching_registration() {
    let blackboard = greeter_board();
    let leaver = Arc::new(Leaver::default());

    let err = blackboard.add_listener(&leaver).unwrap_err();
    assert!(matches!(err, BlackboardError::NoMatchingRegistration { .. }));
    assert!(!blackboard.is_subscribed(&leaver));
}

#[test]
fn test_removed_listener_stops_receiving() {
    let blackboard = greeter_board();
    let greeter = Arc::new(ConsoleGreeter::default());
    blackboard.add_listener(&greeter).unwrap();
    blackboard.fire(&GreetingEvent::new("one")).unwrap();

    assert!(blackboard.remove_listener(&greeter));
    let report = blackboard.fire(&GreetingEvent::new("two")).unwrap();

    assert_eq!(report.delivered, 0);
    assert_eq!(greeter.greetings(), vec!["one"]);
    assert!(!blackboard.remove_listener(&greeter));
}

#[test]
fn test_listener_with_two_capabilities() {
    let blackboard = greeter_board();
    blackboard.register::<dyn Farewell, FarewellEvent>().unwrap();
    let host = Arc::new(Host::default());

    let subscribed = blackboard.add_listener(&host).unwrap();
    assert_eq!(subscribed.len(), 2);
    assert!(subscribed.contains(&TypeKey::of::<dyn Greeter>()));
    assert!(subscribed.contains(&TypeKey::of::<dyn Farewell>()));

    blackboard.fire(&GreetingEvent::new("hello")).unwrap();
    blackboard.fire(&FarewellEvent::new("goodbye")).unwrap();
    assert_eq!(*host.greetings.lock(), vec!["hello"]);
    assert_eq!(*host.farewells.lock(), vec!["goodbye"]);

    // A single removal unsubscribes from both.
    assert!(blackboard.remove_listener(&host));
    assert!(!blackboard.is_subscribed(&host));
    assert_eq!(blackboard.fire(&GreetingEvent::new("again")).unwrap().delivered, 0);
    assert_eq!(blackboard.fire(&FarewellEvent::new("again")).unwrap().delivered, 0);
}

#[test]
fn test_listener_satisfies_ancestor_capability() {
    let blackboard = greeter_board();
    let butler = Arc::new(Butler::default());

    let subscribed = blackboard.add_listener(&butler).unwrap();
    assert_eq!(subscribed, vec![TypeKey::of::<dyn Greeter>()]);

    blackboard.fire(&GreetingEvent::new("good evening")).unwrap();
    assert_eq!(*butler.greetings.lock(), vec!["good evening, sir"]);
}

#[test]
fn test_capability_with_inherited_handler() {
    let blackboard = Blackboard::new();
    let registration = blackboard
        .register::<dyn PoliteGreeter, GreetingEvent>()
        .unwrap();
    assert_eq!(registration.handler().declared_in(), TypeKey::of::<dyn Greeter>());

    let butler = Arc::new(Butler::default());
    let plain = Arc::new(ConsoleGreeter::default());
    blackboard.add_listener(&butler).unwrap();
    assert!(matches!(
        blackboard.add_listener(&plain),
        Err(BlackboardError::NoMatchingRegistration { .. })
    ));

    let report = blackboard.fire(&GreetingEvent::new("welcome")).unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(*butler.greetings.lock(), vec!["welcome, sir"]);
    assert_eq!(blackboard.listener_count::<dyn PoliteGreeter>(), 1);
}

#[test]
fn test_dropped_listener_is_not_kept_alive() {
    let blackboard = greeter_board();
    let kept = Arc::new(ConsoleGreeter::default());
    let dropped = Arc::new(ConsoleGreeter::default());
    blackboard.add_listener(&kept).unwrap();
    blackboard.add_listener(&dropped).unwrap();

    let weak = Arc::downgrade(&dropped);
    drop(dropped);
    assert!(weak.upgrade().is_none());

    let report = blackboard.fire(&GreetingEvent::new("still there?")).unwrap();
    assert_eq!(report, DispatchReport {
        delivered: 1,
        failed: 0,
        unreachable: 1,
    });
    assert_eq!(blackboard.listener_count::<dyn Greeter>(), 1);
    assert_eq!(blackboard.prune(), 1);
    assert_eq!(blackboard.prune(), 0);
}

#[test]
fn test_fire_from_stamps_notifier() {
    let blackboard = greeter_board();
    let greeter = Arc::new(ConsoleGreeter::default());
    blackboard.add_listener(&greeter).unwrap();

    let event = GreetingEvent::new("ding dong");
    blackboard.fire_from(&event, Arc::new(Doorbell)).unwrap();

    assert_eq!(
        event.notifier().map(|n| n.notifier_name()),
        Some("doorbell".to_string())
    );
    assert_eq!(*greeter.notified_by.lock(), vec!["doorbell"]);

    // The notifier is write-once.
    let err = blackboard.fire_from(&event, Arc::new(Intercom)).unwrap_err();
    assert!(matches!(err, BlackboardError::InvalidArgument { .. }));
    assert_eq!(greeter.greetings().len(), 1);

    // Plain refiring keeps the first notifier.
    blackboard.fire(&event).unwrap();
    assert_eq!(*greeter.notified_by.lock(), vec!["doorbell", "doorbell"]);
}

#[test]
fn test_fire_from_unregistered_event_leaves_notifier_unset() {
    let blackboard = greeter_board();
    let event = FarewellEvent::new("bye");

    assert!(blackboard.fire_from(&event, Arc::new(Doorbell)).is_err());
    assert!(event.notifier().is_none());
}

#[test]
fn test_failing_handlers_do_not_stop_broadcast() {
    let sink = Arc::new(RecordingSink::default());
    let blackboard = greeter_board().with_error_sink(sink.clone());
    let failing = Arc::new(GrumpyGreeter { mood: Mood::Failing });
    let panicking = Arc::new(GrumpyGreeter {
        mood: Mood::Panicking,
    });
    let greeter = Arc::new(ConsoleGreeter::default());
    blackboard.add_listener(&failing).unwrap();
    blackboard.add_listener(&panicking).unwrap();
    blackboard.add_listener(&greeter).unwrap();

    let report = blackboard.fire(&GreetingEvent::new("hi")).unwrap();

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(greeter.greetings(), vec!["hi"]);

    let failures = sink.failures();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(|f| f.contains("on_greeting")));
    assert!(failures.iter().any(|f| f.contains("not in the mood")));
    assert!(failures.iter().any(|f| f.contains("grumpy greeter panicked")));
}

#[test]
fn test_clear_keeps_listeners_by_default() {
    let blackboard = greeter_board();
    let greeter = Arc::new(ConsoleGreeter::default());
    blackboard.add_listener(&greeter).unwrap();

    blackboard.clear();
    assert_eq!(blackboard.registration_count(), 0);
    assert!(matches!(
        blackboard.fire(&GreetingEvent::new("lost")),
        Err(BlackboardError::EventNotRegistered { .. })
    ));
    assert!(blackboard.is_subscribed(&greeter));

    // Orphaned subscriptions are reached again once the event is registered.
    blackboard.register::<dyn Greeter, GreetingEvent>().unwrap();
    blackboard.fire(&GreetingEvent::new("found")).unwrap();
    assert_eq!(greeter.greetings(), vec!["found"]);
}

#[test]
fn test_clear_everything_drops_listeners() {
    let config = BlackboardConfigBuilder::default()
        .clear_policy(ClearPolicy::Everything)
        .build()
        .unwrap();
    let blackboard = Blackboard::with_config(config);
    blackboard.register::<dyn Greeter, GreetingEvent>().unwrap();
    let greeter = Arc::new(ConsoleGreeter::default());
    blackboard.add_listener(&greeter).unwrap();

    blackboard.clear();
    assert!(!blackboard.is_subscribed(&greeter));

    blackboard.register::<dyn Greeter, GreetingEvent>().unwrap();
    let report = blackboard.fire(&GreetingEvent::new("anyone?")).unwrap();
    assert_eq!(report.delivered, 0);
    assert!(greeter.greetings().is_empty());
}

#[test]
fn test_remove_listener_by_id() {
    let blackboard = greeter_board();
    let greeter = Arc::new(ConsoleGreeter::default());
    blackboard.add_listener(&greeter).unwrap();

    assert!(blackboard.remove_listener_by_id(ListenerId::of(&greeter)));
    assert!(!blackboard.is_subscribed(&greeter));
}

#[test]
fn test_verbose_logging_toggle_does_not_affect_delivery() {
    let blackboard = greeter_board();
    let greeter = Arc::new(ConsoleGreeter::default());
    blackboard.add_listener(&greeter).unwrap();

    blackboard.enable_logging();
    blackboard.fire(&GreetingEvent::new("loud")).unwrap();
    blackboard.disable_logging();
    blackboard.fire(&GreetingEvent::new("quiet")).unwrap();

    assert_eq!(greeter.greetings(), vec!["loud", "quiet"]);
}
