//! HTTP route tests, driven through the router without a socket.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use live_tictactoe_server::{AppState, ServerConfig, router};
use serde_json::Value;
use tower::ServiceExt;

fn app() -> Router {
    router(AppState::new(ServerConfig::default()))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.expect("Infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Body read failed")
        .to_bytes();
    (status, String::from_utf8(bytes.to_vec()).expect("UTF-8 body"))
}

fn post(uri: &str, client: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::COOKIE, format!("tictactoe={client}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Valid request")
}

fn play(game: u32, client: &str, field: &str, cell: usize) -> Request<Body> {
    Request::post(format!("/games/{game}/move"))
        .header(header::COOKIE, format!("tictactoe={client}"))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("{field}={cell}")))
        .expect("Valid request")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("Valid request")
}

async fn started_game(app: &Router) {
    let (status, body) = send(app, post("/games", "alice", "")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, r#"{"id":1}"#);

    let (_, body) = send(app, post("/games/1/join", "alice", r#"{"name":"Alice"}"#)).await;
    assert!(body.contains(r#""role":"player1""#), "{body}");
    let (_, body) = send(app, post("/games/1/join", "bob", "")).await;
    assert!(body.contains(r#""role":"player2""#), "{body}");
}

#[tokio::test]
async fn test_new_client_gets_cookie() {
    let app = app();
    let response = app.clone().oneshot(get("/games")).await.unwrap();

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("Set-Cookie header");
    assert!(cookie.starts_with("tictactoe="));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_known_client_keeps_cookie() {
    let app = app();
    let response = app.oneshot(post("/games", "alice", "")).await.unwrap();
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_third_client_spectates() {
    let app = app();
    started_game(&app).await;

    let (status, body) = send(&app, post("/games/1/join", "carol", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""role":"spectator""#));

    // Joining again keeps the slot.
    let (_, body) = send(&app, post("/games/1/join", "bob", "")).await;
    assert!(body.contains(r#""role":"player2""#));
}

#[tokio::test]
async fn test_move_rejections() {
    let app = app();
    let (_, _) = send(&app, post("/games", "alice", "")).await;
    send(&app, post("/games/1/join", "alice", "")).await;

    let (status, body) = send(&app, play(1, "alice", "i", 0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Game has not started yet");

    send(&app, post("/games/1/join", "bob", "")).await;
    send(&app, post("/games/1/join", "carol", "")).await;

    let (status, body) = send(&app, play(1, "carol", "i", 0)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "You are not a player in this game");

    let (status, body) = send(&app, play(1, "bob", "i", 0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "It is not your turn");

    let (status, _) = send(&app, play(1, "alice", "i", 9)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, play(1, "alice", "i", 0)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, play(1, "bob", "i", 0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Cell 0 is already occupied");
}

#[tokio::test]
async fn test_malformed_move_form_is_bad_request() {
    let app = app();
    started_game(&app).await;

    for body in ["i=abc", "i=-1", "i=", ""] {
        let request = Request::post("/games/1/move")
            .header(header::COOKIE, "tictactoe=alice")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("Valid request");
        let (status, reply) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body:?} gave {reply}");
    }

    // Nothing was played.
    let (status, _) = send(&app, play(1, "alice", "i", 0)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_game_is_not_found() {
    let app = app();
    let (status, _) = send(&app, play(7, "alice", "i", 0)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, post("/games/abc/join", "alice", "")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Game abc not found");
}

#[tokio::test]
async fn test_win_over_http() {
    let app = app();
    started_game(&app).await;

    for (client, cell) in [("alice", 0), ("bob", 3), ("alice", 1), ("bob", 4)] {
        let (status, body) = send(&app, play(1, client, "cell", cell)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body.contains(r#""game_over":false"#));
    }

    let (status, body) = send(&app, play(1, "alice", "i", 2)).await;
    assert_eq!(status, StatusCode::OK);
    let reply: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(reply["game_over"], true);
    assert_eq!(reply["status"], "Game over! Alice wins!");

    let (status, body) = send(&app, play(1, "bob", "i", 8)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Game has already ended");

    let (_, body) = send(&app, get("/games")).await;
    let list: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(list[0]["info"], "Player Alice wins!");
    assert_eq!(list[0]["phase"], "Over");
}

#[tokio::test]
async fn test_history_navigation() {
    let app = app();
    started_game(&app).await;
    send(&app, play(1, "alice", "i", 0)).await;
    send(&app, play(1, "bob", "i", 4)).await;

    let (status, body) = send(&app, get("/games/1/history/-1")).await;
    assert_eq!(status, StatusCode::OK);
    let view: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(view["cells"][0], "X");
    assert_eq!(view["cells"][4], "");
    assert_eq!(view["controls"]["back_offset"], -2);
    assert_eq!(view["controls"]["forward_offset"], 0);

    let (status, body) = send(&app, get("/games/1/history/1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "History offset 1 is out of range");
}

#[tokio::test]
async fn test_board_fragment() {
    let app = app();
    started_game(&app).await;
    send(&app, play(1, "alice", "i", 8)).await;

    let (status, body) = send(&app, get("/games/1/board")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"id="cell_8" data-game="1" data-index="8">X</div>"#));
    assert!(!body.contains('\n'));
}

#[tokio::test]
async fn test_index_lists_games() {
    let app = app();
    started_game(&app).await;

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"<a href="/games/1">Game 1</a> Playing Alice vs bob"#));
}
