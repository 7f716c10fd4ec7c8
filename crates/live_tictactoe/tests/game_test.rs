//! Tests for the game state machine.

use live_tictactoe::{
    Game, GameError, GameId, GamePhase, JoinOutcome, MoveOutcome, ParticipantId, PlayedMove,
    PlayerSlot,
};

fn new_game() -> Game {
    Game::new(GameId::new(1))
}

fn started_game() -> Game {
    let mut game = new_game();
    game.join("p1".into(), "Alice");
    game.join("p2".into(), "Bob");
    game
}

fn play(game: &mut Game, moves: &[(PlayerSlot, usize)]) {
    for &(slot, cell) in moves {
        game.play_move(slot, cell).expect("Valid move");
    }
}

#[test]
fn test_two_joins_start_game_with_first_joiner() {
    let mut game = new_game();
    assert_eq!(game.phase(), GamePhase::NotStarted);

    assert_eq!(game.join("p1".into(), "p1"), JoinOutcome::Player(PlayerSlot::One));
    assert!(!game.started());
    assert_eq!(game.join("p2".into(), "p2"), JoinOutcome::Player(PlayerSlot::Two));

    assert!(game.started());
    assert_eq!(game.current_player(), Some(PlayerSlot::One));
    assert_eq!(game.current_player_id(), Some(&ParticipantId::from("p1")));
    assert_eq!(game.phase(), GamePhase::InProgress);
}

#[test]
fn test_join_is_idempotent_for_players() {
    let mut game = started_game();
    assert_eq!(
        game.join("p1".into(), "Alice again"),
        JoinOutcome::ReturningPlayer(PlayerSlot::One)
    );
    assert_eq!(game.participants().len(), 2);
    assert_eq!(game.player_name(PlayerSlot::One), Some("Alice"));
}

#[test]
fn test_third_join_is_spectator_and_reconnects() {
    let mut game = started_game();
    assert_eq!(game.join("s1".into(), "Sam"), JoinOutcome::Spectator);

    game.disconnect(&"s1".into());
    let spectator = game.participants().get(&"s1".into()).expect("Spectator kept");
    assert!(!spectator.connected());

    assert_eq!(game.join("s1".into(), "Sam"), JoinOutcome::ReturningSpectator);
    let spectator = game.participants().get(&"s1".into()).expect("Spectator kept");
    assert!(spectator.connected());
    assert_eq!(game.participants().spectators().count(), 1);
}

#[test]
fn test_move_before_start_rejected() {
    let mut game = new_game();
    game.join("p1".into(), "p1");
    assert_eq!(game.play_move(PlayerSlot::One, 0), Err(GameError::NotStarted));
    assert!(game.history().is_empty());
}

#[test]
fn test_occupied_cell_rejected() {
    let mut game = started_game();
    play(&mut game, &[(PlayerSlot::One, 4)]);
    assert_eq!(game.play_move(PlayerSlot::Two, 4), Err(GameError::CellOccupied(4)));
    assert_eq!(game.history().len(), 1);
}

#[test]
fn test_wrong_turn_rejected() {
    let mut game = started_game();
    assert_eq!(game.play_move(PlayerSlot::Two, 0), Err(GameError::NotYourTurn));
    play(&mut game, &[(PlayerSlot::One, 0)]);
    assert_eq!(game.play_move(PlayerSlot::One, 1), Err(GameError::NotYourTurn));
}

#[test]
fn test_out_of_range_cell_rejected_before_write() {
    let mut game = started_game();
    let before = *game.board();
    assert_eq!(game.play_move(PlayerSlot::One, 9), Err(GameError::InvalidCell(9)));
    assert_eq!(*game.board(), before);
}

#[test]
fn test_top_row_win() {
    let mut game = started_game();
    play(
        &mut game,
        &[
            (PlayerSlot::One, 0),
            (PlayerSlot::Two, 3),
            (PlayerSlot::One, 1),
            (PlayerSlot::Two, 4),
        ],
    );
    assert_eq!(game.play_move(PlayerSlot::One, 2), Ok(MoveOutcome::Won(PlayerSlot::One)));

    assert_eq!(game.winner(), Some(PlayerSlot::One));
    assert_eq!(game.winner_id(), Some(&ParticipantId::from("p1")));
    assert!(game.game_over());
    // No turn switch after the winning move.
    assert_eq!(game.current_player(), Some(PlayerSlot::One));
    assert_eq!(game.info(), "Player Alice wins!");
}

#[test]
fn test_moves_after_game_over_rejected() {
    let mut game = started_game();
    play(
        &mut game,
        &[
            (PlayerSlot::One, 0),
            (PlayerSlot::Two, 3),
            (PlayerSlot::One, 1),
            (PlayerSlot::Two, 4),
            (PlayerSlot::One, 2),
        ],
    );
    assert_eq!(game.play_move(PlayerSlot::Two, 5), Err(GameError::GameAlreadyEnded));
    assert_eq!(game.play_move(PlayerSlot::One, 8), Err(GameError::GameAlreadyEnded));
}

#[test]
fn test_full_board_without_line_is_draw() {
    let mut game = started_game();
    // X O X / X O O / O X X
    let moves = [
        (PlayerSlot::One, 0),
        (PlayerSlot::Two, 1),
        (PlayerSlot::One, 2),
        (PlayerSlot::Two, 4),
        (PlayerSlot::One, 3),
        (PlayerSlot::Two, 5),
        (PlayerSlot::One, 7),
        (PlayerSlot::Two, 6),
    ];
    play(&mut game, &moves);
    assert_eq!(game.play_move(PlayerSlot::One, 8), Ok(MoveOutcome::Draw));

    assert!(game.game_over());
    assert!(game.is_draw());
    assert_eq!(game.winner(), None);
    assert_eq!(game.history().len(), 9);
    assert_eq!(game.play_status(), "Game over! It's a draw.");
}

#[test]
fn test_last_move_tracks_every_move() {
    let mut game = started_game();
    assert_eq!(game.last_move(), Ok(None));

    let moves = [
        (PlayerSlot::One, 4),
        (PlayerSlot::Two, 0),
        (PlayerSlot::One, 8),
        (PlayerSlot::Two, 2),
    ];
    for (n, &(slot, cell)) in moves.iter().enumerate() {
        game.play_move(slot, cell).expect("Valid move");
        assert_eq!(game.last_move(), Ok(Some(PlayedMove::new(slot, cell))));
        assert_eq!(game.history().len(), n + 1);
    }
}

#[test]
fn test_status_lines() {
    let mut game = new_game();
    assert_eq!(game.info(), "Waiting for players");
    assert_eq!(game.play_status(), "Waiting for players");

    game.join("p1".into(), "Alice");
    assert_eq!(game.info(), "Waiting for player 2");

    game.join("p2".into(), "Bob");
    assert_eq!(game.info(), "Playing Alice vs Bob");
    assert_eq!(game.play_status(), "Current player: Player 1");

    play(&mut game, &[(PlayerSlot::One, 0)]);
    assert_eq!(game.play_status(), "Current player: Player 2");
}

#[test]
fn test_cells_render_symbols() {
    let mut game = started_game();
    play(&mut game, &[(PlayerSlot::One, 4), (PlayerSlot::Two, 0)]);

    let symbols: Vec<&str> = game.cells().map(|cell| cell.symbol).collect();
    assert_eq!(symbols, ["O", "", "", "", "X", "", "", "", ""]);
    assert_eq!(game.cell(4).map(|c| c.symbol), Ok("X"));
    assert_eq!(game.cell(9), Err(GameError::InvalidCell(9)));
}
