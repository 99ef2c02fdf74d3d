use anyhow::Result;
use crossterm::{
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};

use std::io::{stdout, Write};

use tictactoe_ai::{
    bitboard::{BitBoard, Player, WinningLine},
    hints::Hint,
    search::{Evaluation, ScoredMove},
    SIZE,
};

/// Draws the board with 1-based row and column labels.
/// Cells of `line` are highlighted red, the hinted cell green.
pub fn display(board: &BitBoard, line: Option<WinningLine>, hint: Option<&Hint>) -> Result<()> {
    let mut stdout = stdout();

    let cols: String = (1..=SIZE).map(|x| format!(" {}", x)).collect();
    stdout.queue(PrintStyledContent(style(format!("\n  {}\n", cols))))?;

    for row in 0..SIZE {
        stdout.queue(PrintStyledContent(style(format!("{}  ", row + 1))))?;
        for col in 0..SIZE {
            let (symbol, color) = match board.cell(row, col) {
                Some(Player::X) => ("X", Color::Red),
                Some(Player::O) => ("O", Color::Yellow),
                None => ("·", Color::Grey),
            };
            let on_line = line.map_or(false, |line| line.mask & (1 << (row * SIZE + col)) != 0);
            let hinted = hint.map_or(false, |hint| hint.best_move == (row, col));
            let background = if on_line {
                Color::DarkRed
            } else if hinted {
                Color::DarkGreen
            } else {
                Color::DarkBlue
            };

            stdout.queue(PrintStyledContent(
                style(format!("{} ", symbol))
                    .attribute(Attribute::Bold)
                    .on(background)
                    .with(color),
            ))?;
        }
        stdout.queue(PrintStyledContent(style("\n".to_string())))?;
    }

    if let Some(probabilities) = hint.and_then(|hint| hint.probabilities) {
        for row in 0..SIZE {
            let line: String = (0..SIZE)
                .map(|col| format!("{:>4.0}%", probabilities[row * SIZE + col] * 100.0))
                .collect();
            stdout.queue(PrintStyledContent(style(format!("{}\n", line))))?;
        }
    }
    stdout.flush()?;
    Ok(())
}

/// Describes an evaluation from `player`'s side
pub fn describe(evaluation: Evaluation, player: Player) -> String {
    let moves = |plies: usize| if plies == 1 { "move" } else { "moves" };
    match evaluation {
        Evaluation::Win { plies } => format!(
            "{} can force a win in at most {} {}.",
            player,
            plies,
            moves(plies)
        ),
        Evaluation::Loss { plies } => format!(
            "{} can force a win in at most {} {}.",
            player.other(),
            plies,
            moves(plies)
        ),
        Evaluation::Draw => format!("{} can at best force a draw.", player),
    }
}

/// Prints the score of every legal move as a grid
pub fn display_scores(moves: &[ScoredMove]) -> Result<()> {
    let mut stdout = stdout();
    for row in 0..SIZE {
        let line: String = (0..SIZE)
            .map(|col| match moves.iter().find(|m| m.cell == (row, col)) {
                Some(m) => match Evaluation::from_score(m.score) {
                    Evaluation::Win { plies } => format!(" W{:<3}", plies),
                    Evaluation::Loss { plies } => format!(" L{:<3}", plies),
                    Evaluation::Draw => " D   ".to_string(),
                },
                None => " --  ".to_string(),
            })
            .collect();
        stdout.queue(PrintStyledContent(style(format!("{}\n", line))))?;
    }
    stdout.flush()?;
    Ok(())
}
