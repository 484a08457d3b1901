//! End-to-end scenarios driven over real sockets against a `Server` bound
//! to ephemeral ports: room isolation, join-before-media ordering, name
//! collisions, room cleanup, and fan-out ordering.

use std::net::SocketAddr;
use std::time::Duration;

use sfu_core::Server;
use sfu_protocol::media::{encode_name_prefix, NAME_PREFIX_LEN};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

async fn start_server() -> (std::sync::Arc<Server>, SocketAddr, SocketAddr) {
    start_server_with_default_room("general").await
}

async fn start_server_with_default_room(
    default_room: &str,
) -> (std::sync::Arc<Server>, SocketAddr, SocketAddr) {
    let server = std::sync::Arc::new(
        Server::bind(
            "127.0.0.1:0".parse().unwrap(),
            "127.0.0.1:0".parse().unwrap(),
            default_room,
        )
        .await
        .unwrap(),
    );
    let control_addr = server.control_local_addr().unwrap();
    let media_addr = server.media_local_addr().unwrap();
    tokio::spawn(server.clone().run());
    (server, control_addr, media_addr)
}

/// A `join` with no `room` field lands in the server's configured
/// default room, not a value hardcoded anywhere in the protocol.
async fn join_without_room(control_addr: SocketAddr, user: &str) -> (TcpStream, serde_json::Value) {
    let mut stream = TcpStream::connect(control_addr).await.unwrap();
    let request = serde_json::json!({"type":"join","user":user});
    stream.write_all(request.to_string().as_bytes()).await.unwrap();
    let mut buf = [0u8; 1024];
    let n = timeout(Duration::from_secs(2), stream.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    let reply: serde_json::Value = serde_json::from_slice(&buf[..n]).unwrap();
    (stream, reply)
}

async fn join(control_addr: SocketAddr, user: &str, room: &str) -> TcpStream {
    let mut stream = TcpStream::connect(control_addr).await.unwrap();
    let request = serde_json::json!({"type":"join","user":user,"room":room});
    stream.write_all(request.to_string().as_bytes()).await.unwrap();
    let mut buf = [0u8; 1024];
    let n = timeout(Duration::from_secs(2), stream.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    let reply: serde_json::Value = serde_json::from_slice(&buf[..n]).unwrap();
    assert_eq!(reply["status"], "joined");
    assert_eq!(reply["room"], room);
    stream
}

async fn recv_json(stream: &mut TcpStream) -> serde_json::Value {
    let mut buf = [0u8; 1024];
    let n = timeout(Duration::from_secs(2), stream.read(&mut buf))
        .await
        .expect("timed out waiting for a reply")
        .unwrap();
    serde_json::from_slice(&buf[..n]).unwrap()
}

async fn expect_no_message(stream: &mut TcpStream) {
    let mut buf = [0u8; 1024];
    let result = timeout(Duration::from_millis(200), stream.read(&mut buf)).await;
    assert!(result.is_err(), "expected no message, got one");
}

fn media_datagram(name: &str, payload: &[u8]) -> Vec<u8> {
    let mut bytes = encode_name_prefix(name).to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

// S1: Two users in one room; text reaches only the non-sender.
#[tokio::test]
async fn s1_text_reaches_only_other_room_member() {
    let (_server, control_addr, _media_addr) = start_server().await;
    let mut alice = join(control_addr, "Alice", "general").await;
    let mut bob = join(control_addr, "Bob", "general").await;

    alice
        .write_all(serde_json::json!({"type":"text","payload":"hi"}).to_string().as_bytes())
        .await
        .unwrap();

    let received = recv_json(&mut bob).await;
    assert_eq!(received, serde_json::json!({"type":"text","payload":"Alice: hi"}));
    expect_no_message(&mut alice).await;
}

// S2: Isolation. A media datagram in one room never reaches another room's member.
#[tokio::test]
async fn s2_media_is_isolated_by_room() {
    let (_server, control_addr, media_addr) = start_server().await;
    let _alice = join(control_addr, "Alice", "r1").await;
    let _bob = join(control_addr, "Bob", "r2").await;

    let alice_media = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let bob_media = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    bob_media
        .send_to(&media_datagram("Bob", &[9, 9]), media_addr)
        .await
        .unwrap();
    // Let Bob's own binding datagram land first so his endpoint is known.
    tokio::time::sleep(Duration::from_millis(50)).await;

    alice_media
        .send_to(&media_datagram("Alice", &vec![0u8; 2048]), media_addr)
        .await
        .unwrap();

    let mut buf = [0u8; 4096];
    let result = timeout(Duration::from_millis(300), bob_media.recv_from(&mut buf)).await;
    assert!(result.is_err(), "Bob must not receive Alice's media from a different room");
}

// S3: Media before control completes is dropped; it succeeds once joined.
#[tokio::test]
async fn s3_media_before_join_is_dropped_then_succeeds() {
    let (_server, control_addr, media_addr) = start_server().await;

    let carol_media = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    // Send the binding datagram before Carol has joined at all.
    carol_media
        .send_to(&media_datagram("Carol", &[1, 2, 3]), media_addr)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let _carol = join(control_addr, "Carol", "general").await;
    let dave_media = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let _dave = join(control_addr, "Dave", "general").await;
    dave_media
        .send_to(&media_datagram("Dave", &[0u8; 4]), media_addr)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Now that Carol's `join` has completed, a second binding datagram succeeds.
    carol_media
        .send_to(&media_datagram("Carol", &[4, 5, 6]), media_addr)
        .await
        .unwrap();

    let mut buf = [0u8; 4096];
    let (len, _) = timeout(Duration::from_secs(2), dave_media.recv_from(&mut buf))
        .await
        .expect("Dave should receive Carol's post-join datagram")
        .unwrap();
    assert_eq!(&buf[NAME_PREFIX_LEN..len], &[4, 5, 6]);
}

// S4: Name collision is rejected with the exact reason string, no room state change.
#[tokio::test]
async fn s4_duplicate_name_is_rejected() {
    let (_server, control_addr, _media_addr) = start_server().await;
    let _alice = join(control_addr, "Alice", "general").await;

    let mut second = TcpStream::connect(control_addr).await.unwrap();
    second
        .write_all(
            serde_json::json!({"type":"join","user":"Alice","room":"general"})
                .to_string()
                .as_bytes(),
        )
        .await
        .unwrap();
    let reply = recv_json(&mut second).await;
    assert_eq!(reply, serde_json::json!({"error": "Имя уже занято"}));

    // Connection is closed by the server.
    let mut buf = [0u8; 16];
    let n = timeout(Duration::from_secs(2), second.read(&mut buf)).await.unwrap().unwrap();
    assert_eq!(n, 0, "server should close the rejected connection");
}

// S5: Room cleanup on leave.
#[tokio::test]
async fn s5_room_disappears_after_last_member_leaves() {
    let (_server, control_addr, _media_addr) = start_server().await;
    let mut dave = join(control_addr, "Dave", "ephemeral").await;
    dave.write_all(serde_json::json!({"type":"leave"}).to_string().as_bytes())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut observer = join(control_addr, "Observer", "other").await;
    observer
        .write_all(serde_json::json!({"type":"list_rooms"}).to_string().as_bytes())
        .await
        .unwrap();
    let reply = recv_json(&mut observer).await;
    let rooms = reply["rooms"].as_array().unwrap();
    assert!(!rooms.iter().any(|r| r == "ephemeral"));
}

// S6 (scaled down): fan-out preserves per-sender order to each receiver.
#[tokio::test]
async fn s6_media_fanout_preserves_order() {
    let (_server, control_addr, media_addr) = start_server().await;
    let _alice = join(control_addr, "Alice", "general").await;
    let _bob = join(control_addr, "Bob", "general").await;

    let alice_media = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let bob_media = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // Bob must bind first so Alice's datagrams have somewhere to land.
    bob_media
        .send_to(&media_datagram("Bob", &[]), media_addr)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    const COUNT: u8 = 20;
    for seq in 0..COUNT {
        alice_media
            .send_to(&media_datagram("Alice", &[seq]), media_addr)
            .await
            .unwrap();
    }

    let mut buf = [0u8; 4096];
    for expected in 0..COUNT {
        let (len, _) = timeout(Duration::from_secs(2), bob_media.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[NAME_PREFIX_LEN..len], &[expected]);
    }
}

#[tokio::test]
async fn join_with_no_room_uses_the_configured_default_room() {
    let (_server, control_addr, _media_addr) = start_server_with_default_room("lounge").await;

    let (mut alice, reply) = join_without_room(control_addr, "Alice").await;
    assert_eq!(reply["status"], "joined");
    assert_eq!(reply["room"], "lounge");

    let mut bob = join(control_addr, "Bob", "lounge").await;
    bob.write_all(br#"{"type":"text","payload":"hi"}"#).await.unwrap();
    let reply = recv_json(&mut alice).await;
    assert_eq!(reply, serde_json::json!({"type":"text","payload":"Bob: hi"}));
}
