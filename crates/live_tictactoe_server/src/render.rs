//! HTML fragments pushed to browsers.
//!
//! Fragments sent over SSE must fit in a single `data:` line, so they are
//! written through [`SingleLine`], which drops every CR and LF.

use crate::state::GameSummary;
use live_tictactoe::{Board, Cell, Game, GameId, ParticipantId, PlayerSlot};
use std::fmt::{self, Write};

/// Writer adapter that discards line breaks.
#[derive(Debug, Default)]
pub struct SingleLine<W> {
    inner: W,
}

impl<W: Write> SingleLine<W> {
    /// Wraps a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwraps the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for SingleLine<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for piece in s.split(['\r', '\n']) {
            self.inner.write_str(piece)?;
        }
        Ok(())
    }
}

/// Copies `s` with line breaks removed.
pub fn single_line(s: &str) -> String {
    let mut out = SingleLine::new(String::with_capacity(s.len()));
    // Writing into a String cannot fail.
    let _ = out.write_str(s);
    out.into_inner()
}

/// Renders a fragment into a single-line string.
pub fn to_single_line<F>(render: F) -> Result<String, fmt::Error>
where
    F: FnOnce(&mut SingleLine<String>) -> fmt::Result,
{
    let mut out = SingleLine::new(String::new());
    render(&mut out)?;
    Ok(out.into_inner())
}

struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&#39;")?,
                c => f.write_char(c)?,
            }
        }
        Ok(())
    }
}

/// A single board cell.
pub fn cell(w: &mut impl Write, cell: &Cell) -> fmt::Result {
    let class = if cell.symbol.is_empty() { "cell" } else { "cell taken" };
    write!(
        w,
        r#"<div class="{class}" id="cell_{index}" data-game="{game}" data-index="{index}">{symbol}</div>"#,
        index = cell.index,
        game = cell.game_id,
        symbol = cell.symbol,
    )
}

/// The 3x3 grid for `board`.
pub fn board(w: &mut impl Write, game_id: GameId, board: &Board) -> fmt::Result {
    write!(w, r#"<div class="board" id="board_{game_id}">"#)?;
    for index in 0..live_tictactoe::CELL_COUNT {
        let view = Cell {
            symbol: board.symbol(index),
            index,
            game_id,
        };
        cell(w, &view)?;
    }
    w.write_str("</div>")
}

/// Players then spectators, in join order.
pub fn clients(w: &mut impl Write, game: &Game, viewer: &ParticipantId) -> fmt::Result {
    w.write_str(r#"<ul id="clients">"#)?;
    for slot in [PlayerSlot::One, PlayerSlot::Two] {
        let Some(participant) = game.player(slot).and_then(|id| game.participants().get(id))
        else {
            write!(w, r#"<li class="player waiting">{} (waiting)</li>"#, slot.label())?;
            continue;
        };
        write!(
            w,
            r#"<li class="player{}">{} ({}){}</li>"#,
            if participant.connected() { " connected" } else { "" },
            Escaped(participant.name()),
            slot.symbol(),
            if participant.id() == viewer { " (you)" } else { "" },
        )?;
    }
    for spectator in game.participants().spectators() {
        write!(
            w,
            r#"<li class="spectator{}">{}{}</li>"#,
            if spectator.connected() { " connected" } else { "" },
            Escaped(spectator.name()),
            if spectator.id() == viewer { " (you)" } else { "" },
        )?;
    }
    w.write_str("</ul>")
}

/// Full game view: status line, board and participant list.
pub fn game_partial(w: &mut impl Write, game: &Game, viewer: &ParticipantId) -> fmt::Result {
    let role = game.slot_of(viewer).map_or("spectator", |slot| match slot {
        PlayerSlot::One => "player1",
        PlayerSlot::Two => "player2",
    });
    write!(
        w,
        r#"<div id="game" data-game="{}" data-role="{role}" data-over="{}">"#,
        game.id(),
        game.game_over(),
    )?;
    write!(w, r#"<p id="status">{}</p>"#, Escaped(&game.play_status()))?;
    board(w, game.id(), game.board())?;
    clients(w, game, viewer)?;
    w.write_str("</div>")
}

/// Lobby game list.
pub fn game_list(w: &mut impl Write, games: &[GameSummary]) -> fmt::Result {
    w.write_str(r#"<ul id="games">"#)?;
    for game in games {
        write!(
            w,
            r#"<li class="game {phase}"><a href="/games/{id}">Game {id}</a> {info}</li>"#,
            phase = game.phase,
            id = game.id,
            info = Escaped(&game.info),
        )?;
    }
    w.write_str("</ul>")
}

/// Lobby page.
pub fn index_page(games: &[GameSummary]) -> Result<String, fmt::Error> {
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head><title>Tic-tac-toe</title></head>\n<body>\n");
    page.push_str("<h1>Tic-tac-toe</h1>\n");
    page.push_str(r#"<form method="post" action="/games"><button>New game</button></form>"#);
    page.push('\n');
    game_list(&mut page, games)?;
    page.push_str("\n</body>\n</html>\n");
    Ok(page)
}
