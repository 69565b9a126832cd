use std::time::Duration;

use textgame::adapter::server::ServerConfig;
use textgame::adapter::{Adapter, PeerClient, PeerEvent};
use textgame::types::Role;

async fn next_event(adapter: &mut Adapter) -> PeerEvent {
    tokio::time::timeout(Duration::from_secs(2), adapter.next_event())
        .await
        .expect("timeout waiting for peer event")
        .expect("server stopped")
}

fn config(max_displays: usize) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_displays,
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn disconnect_frees_the_lowest_index() {
    let mut adapter = Adapter::start(config(2)).await.unwrap();
    let addr = adapter.local_addr();

    let (first, w0) = PeerClient::connect(addr, Role::Display, "a").await.unwrap();
    let (_second, w1) = PeerClient::connect(addr, Role::Display, "b").await.unwrap();
    assert_eq!(w0.index, 0);
    assert_eq!(w1.index, 1);
    assert!(matches!(next_event(&mut adapter).await, PeerEvent::Registered(_)));
    assert!(matches!(next_event(&mut adapter).await, PeerEvent::Registered(_)));

    drop(first);
    match next_event(&mut adapter).await {
        PeerEvent::Disconnected(p) => assert_eq!(p.to_string(), "display0"),
        other => panic!("unexpected event {other:?}"),
    }

    let (_third, w2) = PeerClient::connect(addr, Role::Display, "c").await.unwrap();
    assert_eq!(w2.index, 0);
    assert_eq!(w2.name, "display0");
}

#[tokio::test]
async fn role_capacity_is_enforced_per_role() {
    let adapter = Adapter::start(config(1)).await.unwrap();
    let addr = adapter.local_addr();

    let (_display, _) = PeerClient::connect(addr, Role::Display, "a").await.unwrap();
    let err = PeerClient::connect(addr, Role::Display, "b")
        .await
        .err()
        .expect("second display should be refused");
    assert!(err.to_string().contains("no free display slot"));

    // Inputs have their own slots.
    let (_input, welcome) = PeerClient::connect(addr, Role::Input, "kb").await.unwrap();
    assert_eq!(welcome.name, "input0");
}

#[test]
fn connect_to_closed_port_fails() {
    let port = {
        let l = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        l.local_addr().unwrap().port()
    };
    let addr = format!("127.0.0.1:{port}").parse().unwrap();
    let res = tokio_test::block_on(PeerClient::connect(addr, Role::Input, "late"));
    assert!(res.is_err());
}
