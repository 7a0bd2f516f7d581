use crate::broker::{AuthGate, Broker, SharedBroker, lock};
use crate::client::Client;
use crate::transport::dispatch;
use crate::transport::message::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;

fn setup(ids: &[&str]) -> (SharedBroker, Vec<mpsc::Receiver<ServerMessage>>) {
    let broker = Broker::new().shared();
    let mut receivers = Vec::new();
    for id in ids {
        let (tx, rx) = mpsc::channel(8);
        lock(&broker).register_client(Client::new(*id, tx)).unwrap();
        receivers.push(rx);
    }
    (broker, receivers)
}

fn subscribe(topic: &str) -> ClientMessage {
    ClientMessage::Subscribe {
        topic: topic.to_string(),
    }
}

fn publish(topic: &str, payload: &str) -> ClientMessage {
    ClientMessage::Publish {
        topic: topic.to_string(),
        payload: payload.to_string(),
    }
}

fn auth(payload: &str) -> ClientMessage {
    ClientMessage::Auth {
        payload: payload.to_string(),
    }
}

#[test]
fn test_handle_subscribe() {
    let (broker, _rx) = setup(&["a"]);
    dispatch(&broker, &AuthGate::disabled(), "a", subscribe("news"));
    assert!(lock(&broker).client("a").unwrap().is_subscribed("news"));
}

#[test]
fn test_handle_publish() {
    let (broker, mut rx) = setup(&["a", "b"]);
    let gate = AuthGate::disabled();
    dispatch(&broker, &gate, "b", subscribe("news"));
    dispatch(&broker, &gate, "a", publish("news", "hello"));

    assert_eq!(
        rx[1].try_recv().unwrap(),
        ServerMessage::Publish {
            topic: "news".to_string(),
            payload: "hello".to_string()
        }
    );
    assert!(rx[0].try_recv().is_err());
}

#[test]
fn test_unauthenticated_requests_are_silently_dropped() {
    let (broker, mut rx) = setup(&["a", "b"]);
    let gate = AuthGate::new(true, "user", "pass");

    dispatch(&broker, &gate, "b", subscribe("x"));
    assert!(!lock(&broker).client("b").unwrap().is_subscribed("x"));

    // Give b a subscription directly so a leaked publish would be visible.
    lock(&broker).subscribe("b", "x");
    dispatch(&broker, &gate, "a", publish("x", "y"));

    assert!(rx[0].try_recv().is_err());
    assert!(rx[1].try_recv().is_err());
}

#[test]
fn test_failed_auth_is_acknowledged_and_changes_nothing() {
    let (broker, mut rx) = setup(&["a"]);
    let gate = AuthGate::new(true, "user", "pass");

    dispatch(&broker, &gate, "a", auth("user:wrong"));

    assert_eq!(rx[0].try_recv().unwrap(), ServerMessage::auth_ack(false));
    assert!(!lock(&broker).is_authenticated("a"));
}

#[test]
fn test_successful_auth_unlocks_subscribe_and_publish() {
    let (broker, mut rx) = setup(&["a", "b"]);
    let gate = AuthGate::new(true, "user", "pass");

    dispatch(&broker, &gate, "a", auth("user:pass"));
    dispatch(&broker, &gate, "b", auth("user:pass"));
    assert_eq!(rx[0].try_recv().unwrap(), ServerMessage::auth_ack(true));
    assert_eq!(rx[1].try_recv().unwrap(), ServerMessage::auth_ack(true));

    dispatch(&broker, &gate, "b", subscribe("news"));
    dispatch(&broker, &gate, "a", publish("news", "hello"));

    assert_eq!(
        rx[1].try_recv().unwrap(),
        ServerMessage::Publish {
            topic: "news".to_string(),
            payload: "hello".to_string()
        }
    );
}

#[test]
fn test_auth_frame_fails_when_auth_disabled() {
    let (broker, mut rx) = setup(&["a", "b"]);
    let gate = AuthGate::new(false, "user", "pass");

    dispatch(&broker, &gate, "a", auth("user:pass"));
    assert_eq!(rx[0].try_recv().unwrap(), ServerMessage::auth_ack(false));

    dispatch(&broker, &gate, "a", auth("nope"));
    assert_eq!(rx[0].try_recv().unwrap(), ServerMessage::auth_ack(false));
    assert!(!lock(&broker).is_authenticated("a"));

    // The failed acks do not take pub/sub away.
    dispatch(&broker, &gate, "b", subscribe("news"));
    dispatch(&broker, &gate, "a", publish("news", "hello"));
    assert_eq!(
        rx[1].try_recv().unwrap(),
        ServerMessage::Publish {
            topic: "news".to_string(),
            payload: "hello".to_string()
        }
    );
}

#[test]
fn test_unknown_message_is_ignored() {
    let (broker, mut rx) = setup(&["a"]);
    dispatch(&broker, &AuthGate::disabled(), "a", ClientMessage::Unknown);
    assert!(rx[0].try_recv().is_err());
    assert!(lock(&broker).client("a").unwrap().subscriptions.is_empty());
}
