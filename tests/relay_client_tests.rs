use std::sync::Arc;
use std::time::Duration;

use broadside::relay::{RelayClient, RelayServer};
use broadside::{GameSession, NullSink, Orientation};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::net::TcpListener;
use tokio::time::sleep;

async fn start_server() -> RelayServer {
    RelayServer::bind("127.0.0.1:0", Arc::new(NullSink))
        .await
        .unwrap()
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

/// Client whose local session already carries a complete randomized fleet.
fn client_with_fleet(dim: usize, seed: u64) -> RelayClient {
    let client = RelayClient::new(Arc::new(NullSink), dim);
    let handle = client.session_handle();
    let mut session =
        GameSession::with_rng(dim, Arc::new(NullSink), SmallRng::seed_from_u64(seed));
    session.randomize_player_fleet();
    *handle.lock().unwrap() = Some(session);
    client
}

#[tokio::test(flavor = "multi_thread")]
async fn uploaded_fleet_reaches_another_client_intact() {
    let server = start_server().await;
    let addr = server.local_addr().to_string();

    let uploader = client_with_fleet(4, 21);
    let expected_layout = {
        let handle = uploader.session_handle();
        let guard = handle.lock().unwrap();
        guard.as_ref().unwrap().player_fleet_layout()
    };
    uploader.connect(&addr).await.unwrap();
    assert_eq!(uploader.client_id(), Some(0));
    assert!(uploader.send_configuration().await);
    wait_until(|| server.stored_configurations() == 1).await;

    let downloader = RelayClient::new(Arc::new(NullSink), 10);
    downloader.connect(&addr).await.unwrap();
    assert_eq!(downloader.client_id(), Some(1));
    assert!(downloader.request_configuration().await);

    let handle = downloader.session_handle();
    wait_until(|| {
        let guard = handle.lock().unwrap();
        guard
            .as_ref()
            .map(|s| s.is_player_fleet_placed())
            .unwrap_or(false)
    })
    .await;

    let guard = handle.lock().unwrap();
    let session = guard.as_ref().unwrap();
    assert_eq!(session.player_fleet_layout(), expected_layout);
    drop(guard);

    uploader.disconnect().await;
    downloader.disconnect().await;
    wait_until(|| server.connected_clients() == 0).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn operations_require_a_connection() {
    let client = client_with_fleet(4, 22);
    assert!(!client.is_connected());
    assert!(!client.send_configuration().await);
    assert!(!client.request_configuration().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_requires_a_launched_game() {
    let server = start_server().await;
    let client = RelayClient::new(Arc::new(NullSink), 4);
    client.connect(&server.local_addr().to_string()).await.unwrap();
    assert!(!client.send_configuration().await);
    assert_eq!(server.stored_configurations(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_requires_a_fully_placed_fleet() {
    let server = start_server().await;
    let client = RelayClient::new(Arc::new(NullSink), 4);
    client.new_game();
    {
        let handle = client.session_handle();
        let mut guard = handle.lock().unwrap();
        let session = guard.as_mut().unwrap();
        // one boat short of a complete dim-4 fleet
        assert!(session.place_boat(0, 0, 2, Orientation::Horizontal));
        assert!(session.place_boat(2, 2, 1, Orientation::Horizontal));
    }
    client.connect(&server.local_addr().to_string()).await.unwrap();
    assert!(!client.send_configuration().await);
    assert_eq!(server.stored_configurations(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn server_shutdown_disconnects_the_client() {
    let server = start_server().await;
    let client = client_with_fleet(4, 23);
    client.connect(&server.local_addr().to_string()).await.unwrap();
    wait_until(|| server.connected_clients() == 1).await;

    server.close_connections();
    wait_until(|| !client.is_connected()).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn connecting_to_a_dead_address_fails() {
    // grab a free port, then close it again
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let client = RelayClient::new(Arc::new(NullSink), 4);
    assert!(client.connect(&addr).await.is_err());
    assert!(!client.is_connected());
}

#[tokio::test(flavor = "multi_thread")]
async fn configuration_arriving_without_a_session_launches_one() {
    let server = start_server().await;
    let addr = server.local_addr().to_string();

    let uploader = client_with_fleet(6, 24);
    uploader.connect(&addr).await.unwrap();
    assert!(uploader.send_configuration().await);
    wait_until(|| server.stored_configurations() == 1).await;

    // downloader never calls new_game(); the read loop must create the session
    let downloader = RelayClient::new(Arc::new(NullSink), 10);
    downloader.connect(&addr).await.unwrap();
    assert!(downloader.request_configuration().await);

    let handle = downloader.session_handle();
    wait_until(|| handle.lock().unwrap().is_some()).await;
    wait_until(|| {
        let guard = handle.lock().unwrap();
        guard
            .as_ref()
            .map(|s| s.dim() == 6 && s.is_player_fleet_placed())
            .unwrap_or(false)
    })
    .await;
}
