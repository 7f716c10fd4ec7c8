//! Live stream tests: what a connected viewer actually receives.

use futures::{Stream, StreamExt};
use live_tictactoe::{GameId, ParticipantId};
use live_tictactoe_server::sse::{game_stream, lobby_stream};
use live_tictactoe_server::{AppState, LiveGame, ServerConfig, SseFrame};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(200);

type Frames = Pin<Box<dyn Stream<Item = SseFrame> + Send>>;

async fn open(state: &AppState, game: &Arc<LiveGame>, client: &str) -> Frames {
    let stream = game_stream(state.clone(), Arc::clone(game), ParticipantId::from(client))
        .await
        .expect("Stream opened");
    Box::pin(stream)
}

async fn next(stream: &mut Frames) -> SseFrame {
    timeout(WAIT, stream.next())
        .await
        .expect("Frame in time")
        .expect("Stream still open")
}

#[tokio::test]
async fn test_viewer_sees_moves_and_game_over() {
    let state = AppState::new(ServerConfig::default());
    let game = state.create_game().await.unwrap();

    let mut alice = open(&state, &game, "alice").await;
    let first = next(&mut alice).await;
    assert_eq!(first.name(), "first-join");
    assert!(first.data().contains("Waiting for player 2"));
    assert_eq!(next(&mut alice).await.name(), "clients");

    let _bob = open(&state, &game, "bob").await;
    let clients = next(&mut alice).await;
    assert_eq!(clients.name(), "clients");
    assert!(clients.data().contains("bob (O)"));

    state.play(&game, &"alice".into(), 4).await.unwrap();
    let cell = next(&mut alice).await;
    assert_eq!(cell.name(), "cell_4");
    assert!(cell.data().contains(">X</div>"));
    assert!(timeout(QUIET, alice.next()).await.is_err(), "No game_over yet");

    for (mover, index) in [("bob", 0), ("alice", 3), ("bob", 1), ("alice", 5)] {
        state.play(&game, &mover.into(), index).await.unwrap();
        assert_eq!(next(&mut alice).await.name(), format!("cell_{index}"));
    }
    let over = next(&mut alice).await;
    assert_eq!(over.name(), "game_over");
    assert_eq!(over.to_string(), "event: game_over\ndata: \n\n");
}

#[tokio::test]
async fn test_closing_last_stream_announces_leave() {
    let state = AppState::new(ServerConfig::default());
    let game = state.create_game().await.unwrap();

    let mut alice = open(&state, &game, "alice").await;
    next(&mut alice).await;
    next(&mut alice).await;

    let bob_tab_one = open(&state, &game, "bob").await;
    let bob_tab_two = open(&state, &game, "bob").await;
    next(&mut alice).await;
    next(&mut alice).await;

    drop(bob_tab_one);
    assert!(timeout(QUIET, alice.next()).await.is_err(), "Bob still has a tab open");

    drop(bob_tab_two);
    let left = next(&mut alice).await;
    assert_eq!(left.name(), "clients");
    assert!(left.data().contains(r#"<li class="player">bob (O)</li>"#), "{}", left.data());
    game.with_game(|g| {
        let bob = g.participants().get(&"bob".into()).unwrap();
        assert!(!bob.connected());
        assert!(bob.is_player());
    });
}

#[tokio::test]
async fn test_slow_viewer_is_cut_off() {
    let config = ServerConfig::default().with_listener_queue_capacity(1usize);
    let state = AppState::new(config);
    let game = state.create_game().await.unwrap();
    assert_eq!(game.id(), GameId::new(1));

    // Own join fills the one-slot queue; the next event overflows it.
    let mut alice = open(&state, &game, "alice").await;
    state.join(&game, &"bob".into(), "Bob").await.unwrap();

    assert_eq!(next(&mut alice).await.name(), "first-join");
    assert_eq!(next(&mut alice).await.name(), "clients");
    assert!(timeout(WAIT, alice.next()).await.unwrap().is_none());

    game.with_game(|g| assert!(!g.participants().get(&"alice".into()).unwrap().connected()));
    assert_eq!(game.hub().listener_count(), 0);
}

#[tokio::test]
async fn test_lobby_sees_game_list_changes() {
    let state = AppState::new(ServerConfig::default());
    let mut lobby: Frames = Box::pin(lobby_stream(state.clone()));
    assert_eq!(state.lobby().listener_count(), 1);

    let game = state.create_game().await.unwrap();
    let created = next(&mut lobby).await;
    assert_eq!(created.name(), "game_update");
    assert!(created.data().contains(r#"<a href="/games/1">Game 1</a> Waiting for players"#), "{}", created.data());

    let alice = open(&state, &game, "alice").await;
    assert!(next(&mut lobby).await.data().contains("Waiting for player 2"));

    state.join(&game, &"bob".into(), "Bob").await.unwrap();
    assert!(next(&mut lobby).await.data().contains("Playing alice vs Bob"));

    // Spectators and ordinary moves leave the list alone.
    let carol = open(&state, &game, "carol").await;
    for (mover, cell) in [("alice", 0), ("bob", 3), ("alice", 1), ("bob", 4)] {
        state.play(&game, &mover.into(), cell).await.unwrap();
    }
    assert!(timeout(QUIET, lobby.next()).await.is_err(), "No lobby update expected");

    state.play(&game, &"alice".into(), 2).await.unwrap();
    let over = next(&mut lobby).await;
    assert!(over.data().contains("Player alice wins!"), "{}", over.data());

    drop(carol);
    assert!(timeout(QUIET, lobby.next()).await.is_err(), "Spectator leave is not listed");

    drop(alice);
    let left = next(&mut lobby).await;
    assert_eq!(left.name(), "game_update");
    assert!(left.data().contains("Player alice wins!"));

    drop(lobby);
    assert_eq!(state.lobby().listener_count(), 0);
}
