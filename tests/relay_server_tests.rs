use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use broadside::relay::{RelayServer, EMPTY_STORE_NOTICE};
use broadside::NullSink;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

async fn start_server() -> RelayServer {
    RelayServer::bind("127.0.0.1:0", Arc::new(NullSink))
        .await
        .unwrap()
}

/// Connects and consumes the welcome line, returning the assigned id.
async fn connect(addr: SocketAddr) -> (Lines<BufReader<OwnedReadHalf>>, OwnedWriteHalf, u32) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let id = lines
        .next_line()
        .await
        .unwrap()
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    (lines, write_half, id)
}

async fn send(write_half: &mut OwnedWriteHalf, line: &str) {
    write_half.write_all(line.as_bytes()).await.unwrap();
    write_half.write_all(b"\n").await.unwrap();
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

#[tokio::test(flavor = "multi_thread")]
async fn clients_get_sequential_ids() {
    let server = start_server().await;
    let (_lines_a, _write_a, id_a) = connect(server.local_addr()).await;
    let (_lines_b, _write_b, id_b) = connect(server.local_addr()).await;
    assert_eq!(id_a, 0);
    assert_eq!(id_b, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn uploaded_configuration_is_delivered_verbatim() {
    let server = start_server().await;
    let payload = "4;0,0,2,H|2,2,1,H|3,3,1,H";

    let (_lines_a, mut write_a, id_a) = connect(server.local_addr()).await;
    send(&mut write_a, &format!("{id_a}#P1#{payload}")).await;
    wait_until(|| server.stored_configurations() == 1).await;

    let (mut lines_b, mut write_b, id_b) = connect(server.local_addr()).await;
    send(&mut write_b, &format!("{id_b}#P2")).await;
    let reply = lines_b.next_line().await.unwrap().unwrap();
    assert_eq!(reply, format!("P2#{payload}"));
}

#[tokio::test(flavor = "multi_thread")]
async fn downloads_pick_from_the_stored_configurations() {
    let server = start_server().await;
    let first = "4;0,0,2,H|2,2,1,H|3,3,1,H";
    let second = "4;1,0,2,H|0,3,1,V|3,0,1,H";

    let (_lines, mut write, id) = connect(server.local_addr()).await;
    send(&mut write, &format!("{id}#P1#{first}")).await;
    send(&mut write, &format!("{id}#P1#{second}")).await;
    wait_until(|| server.stored_configurations() == 2).await;

    let (mut lines_b, mut write_b, id_b) = connect(server.local_addr()).await;
    for _ in 0..10 {
        send(&mut write_b, &format!("{id_b}#P2")).await;
        let reply = lines_b.next_line().await.unwrap().unwrap();
        assert!(
            reply == format!("P2#{first}") || reply == format!("P2#{second}"),
            "unexpected reply: {reply}"
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_store_yields_a_plain_notice() {
    let server = start_server().await;
    let (mut lines, mut write, id) = connect(server.local_addr()).await;
    send(&mut write, &format!("{id}#P2")).await;
    let reply = lines.next_line().await.unwrap().unwrap();
    assert_eq!(reply, EMPTY_STORE_NOTICE);
    assert!(!reply.contains('#'));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_lines_are_ignored_and_the_connection_survives() {
    let server = start_server().await;
    let (mut lines, mut write, id) = connect(server.local_addr()).await;

    send(&mut write, "no separator at all").await;
    send(&mut write, &format!("{id}#P")).await;
    send(&mut write, &format!("{id}#ZZ#payload")).await;
    send(&mut write, &format!("{id}#P1")).await; // upload without payload

    // the handler is still alive and still answers
    send(&mut write, &format!("{id}#P2")).await;
    let reply = lines.next_line().await.unwrap().unwrap();
    assert_eq!(reply, EMPTY_STORE_NOTICE);
    assert_eq!(server.stored_configurations(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn reserved_data_messages_are_ignored() {
    let server = start_server().await;
    let (mut lines, mut write, id) = connect(server.local_addr()).await;
    send(&mut write, &format!("{id}#P3#whatever")).await;
    send(&mut write, &format!("{id}#P2")).await;
    let reply = lines.next_line().await.unwrap().unwrap();
    assert_eq!(reply, EMPTY_STORE_NOTICE);
}

#[tokio::test(flavor = "multi_thread")]
async fn end_message_closes_the_session() {
    let server = start_server().await;
    let (_lines, mut write, id) = connect(server.local_addr()).await;
    wait_until(|| server.connected_clients() == 1).await;

    send(&mut write, &format!("{id}#P0")).await;
    wait_until(|| server.connected_clients() == 0).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn dropping_the_socket_counts_as_a_disconnect() {
    let server = start_server().await;
    let pair = connect(server.local_addr()).await;
    wait_until(|| server.connected_clients() == 1).await;
    drop(pair);
    wait_until(|| server.connected_clients() == 0).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn finalized_server_shuts_down_after_the_last_client_leaves() {
    let server = start_server().await;
    server.set_finalized(true);

    let (_lines, mut write, id) = connect(server.local_addr()).await;
    wait_until(|| server.connected_clients() == 1).await;
    send(&mut write, &format!("{id}#P0")).await;
    wait_until(|| server.connected_clients() == 0).await;

    timeout(Duration::from_secs(2), server.shutdown_complete())
        .await
        .expect("listener did not close");
}

#[tokio::test(flavor = "multi_thread")]
async fn close_connections_broadcasts_an_end_message() {
    let server = start_server().await;
    let (mut lines, _write, _id) = connect(server.local_addr()).await;
    wait_until(|| server.connected_clients() == 1).await;

    server.close_connections();
    let line = lines.next_line().await.unwrap().unwrap();
    assert_eq!(line, "P0#");

    timeout(Duration::from_secs(2), server.shutdown_complete())
        .await
        .expect("listener did not close");
}
