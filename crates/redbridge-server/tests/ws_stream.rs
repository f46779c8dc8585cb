use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

use redbridge_server::{ServerConfig, ServerHandle};

async fn start_test_server() -> (ServerHandle, String, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        rom_path: None,
        replay_dir: dir.path().join("replays"),
        max_sessions: 2,
        default_wait_frames: 1,
        record_frames: true,
        debug_endpoints: false,
    };
    let handle = redbridge_server::start(cfg).await.unwrap();
    let base = format!("http://{}", handle.local_addr());
    (handle, base, dir)
}

async fn create_session(client: &reqwest::Client, base: &str) -> (String, String) {
    let body: Value = client
        .post(format!("{base}/v1/sessions"))
        .json(&json!({ "agent_kind": "rl" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    (
        body["session_id"].as_str().unwrap().to_string(),
        body["control_token"].as_str().unwrap().to_string(),
    )
}

async fn next_json<S>(ws: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("message before timeout")
            .expect("stream open")
            .expect("message ok");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn spectator_stream_follows_steps() {
    let (handle, base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let (id, token) = create_session(&client, &base).await;

    let ws_url = format!("ws://{}/v1/sessions/{id}/ws", handle.local_addr());
    let (mut ws, _resp) = tokio_tungstenite::connect_async(ws_url).await.unwrap();

    let hello = next_json(&mut ws).await;
    assert_eq!(hello["type"], "hello");
    assert_eq!(hello["session_id"], id.as_str());

    // The stream leads with the current state.
    let state = next_json(&mut ws).await;
    assert_eq!(state["type"], "state");
    assert_eq!(state["step"], 0);
    assert!(state["frame_png"].is_string());

    // A controller step shows up as the next message.
    client
        .post(format!("{base}/v1/sessions/{id}/step"))
        .header("x-control-token", &token)
        .json(&json!({ "action": { "type": "press", "key": "right" } }))
        .send()
        .await
        .unwrap();

    let state = next_json(&mut ws).await;
    assert_eq!(state["step"], 1);
    assert!(state["snapshot"]["party"].is_array());

    handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn spectator_sees_session_close() {
    let (handle, base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let (id, token) = create_session(&client, &base).await;

    let ws_url = format!("ws://{}/v1/sessions/{id}/ws", handle.local_addr());
    let (mut ws, _resp) = tokio_tungstenite::connect_async(ws_url).await.unwrap();
    next_json(&mut ws).await; // hello
    next_json(&mut ws).await; // initial state

    client
        .post(format!("{base}/v1/sessions/{id}/step"))
        .header("x-control-token", &token)
        .json(&json!({ "action": { "type": "wait" } }))
        .send()
        .await
        .unwrap();
    next_json(&mut ws).await; // step 1

    client
        .post(format!("{base}/v1/sessions/{id}/close"))
        .header("x-control-token", &token)
        .send()
        .await
        .unwrap();

    let closed = next_json(&mut ws).await;
    assert_eq!(closed["type"], "closed");
    assert_eq!(closed["reason"], "session closed");

    handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ws_for_unknown_session_is_rejected() {
    let (handle, _base, _dir) = start_test_server().await;

    let ws_url = format!("ws://{}/v1/sessions/sess-none/ws", handle.local_addr());
    let err = tokio_tungstenite::connect_async(ws_url).await;
    assert!(err.is_err(), "upgrade should fail for unknown sessions");

    handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn replay_stream_plays_recorded_session() {
    let (handle, base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let (id, token) = create_session(&client, &base).await;

    for _ in 0..3 {
        client
            .post(format!("{base}/v1/sessions/{id}/step"))
            .header("x-control-token", &token)
            .json(&json!({ "action": { "type": "press", "key": "a" } }))
            .send()
            .await
            .unwrap();
    }
    client
        .post(format!("{base}/v1/sessions/{id}/close"))
        .header("x-control-token", &token)
        .send()
        .await
        .unwrap();

    let ws_url = format!(
        "ws://{}/v1/replays/{id}/ws?frame_ms=1",
        handle.local_addr()
    );
    let (mut ws, _resp) = tokio_tungstenite::connect_async(ws_url).await.unwrap();

    let hello = next_json(&mut ws).await;
    assert_eq!(hello["type"], "hello");

    for expected_step in 1..=3u64 {
        let state = next_json(&mut ws).await;
        assert_eq!(state["type"], "state");
        assert_eq!(state["step"], expected_step);
        assert!(state["frame_png"].is_string());
    }

    let closed = next_json(&mut ws).await;
    assert_eq!(closed["type"], "closed");
    assert_eq!(closed["reason"], "end of replay");

    handle.shutdown().await;
}
