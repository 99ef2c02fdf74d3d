//! Computer-vs-computer matches between difficulty tiers
//!
//! Every game runs in its own session with its own board and generator,
//! so games can be spread over threads with nothing shared but the results.

use anyhow::{anyhow, Result};
use indicatif::*;
use rayon::prelude::*;
use tracing::info;

use std::fmt;
use std::sync::mpsc::*;
use std::thread;

use crate::{
    bitboard::{Outcome, Player},
    config::{AppConfig, DifficultyConfig},
    controller::TurnController,
    error::EngineError,
    search::Searcher,
    strategy::{DifficultyStrategy, DifficultyTier, MoveSource},
};

/// Results of a match, counted from X's side
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ArenaReport {
    pub x_wins: usize,
    pub o_wins: usize,
    pub draws: usize,
}

impl ArenaReport {
    pub fn total(&self) -> usize {
        self.x_wins + self.o_wins + self.draws
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win(Player::X) => self.x_wins += 1,
            Outcome::Win(Player::O) => self.o_wins += 1,
            Outcome::Draw => self.draws += 1,
            // finished games never end in progress
            Outcome::InProgress => {}
        }
    }
}

impl fmt::Display for ArenaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total().max(1) as f64;
        write!(
            f,
            "{} games: X won {} ({:.1}%), O won {} ({:.1}%), {} drawn ({:.1}%)",
            self.total(),
            self.x_wins,
            100.0 * self.x_wins as f64 / total,
            self.o_wins,
            100.0 * self.o_wins as f64 / total,
            self.draws,
            100.0 * self.draws as f64 / total,
        )
    }
}

/// Plays one full game between two computer tiers
pub fn play_game(
    x: DifficultyTier,
    o: DifficultyTier,
    searcher: &Searcher,
    skills: &DifficultyConfig,
    seed: u64,
) -> Result<Outcome, EngineError> {
    let mut controller = TurnController::with_seats(MoveSource::Computer(x), MoveSource::Computer(o));
    let mut strategy = DifficultyStrategy::seeded(searcher.clone(), skills.clone(), seed);

    while !controller.is_over() {
        controller.play_computer(&mut strategy)?;
    }
    Ok(controller.outcome())
}

/// Plays `games` games in parallel, game `i` seeded with `seed + i`
pub fn run(
    config: &AppConfig,
    x: DifficultyTier,
    o: DifficultyTier,
    games: usize,
    seed: u64,
    show_progress: bool,
) -> Result<ArenaReport> {
    let searcher = config.search.searcher()?;
    let skills = config.difficulty.clone();

    let (tx, rx) = channel();
    let worker = thread::spawn(move || {
        (0..games).into_par_iter().for_each_with(tx, |tx, i| {
            let result = play_game(x, o, &searcher, &skills, seed.wrapping_add(i as u64));
            // the receiver outlives the pool unless the caller bailed out
            let _ = tx.send(result);
        });
    });

    let progress = if show_progress {
        let progress = ProgressBar::new(games as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("Playing {msg}: {bar:40.cyan/blue} {pos}/{len} ~{eta} remaining")
                .progress_chars("█▓▒░  "),
        );
        progress.set_message(&format!("{} vs {}", x, o));
        progress
    } else {
        ProgressBar::hidden()
    };

    let mut report = ArenaReport::default();
    let mut first_error = None;
    // ends once every game has reported and the senders are dropped
    for result in rx.iter() {
        match result {
            Ok(outcome) => report.record(outcome),
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    worker
        .join()
        .map_err(|_| anyhow!("arena worker thread panicked"))?;
    if let Some(err) = first_error {
        return Err(err.into());
    }

    info!(%x, %o, x_wins = report.x_wins, o_wins = report.o_wins, draws = report.draws, "arena finished");
    Ok(report)
}
