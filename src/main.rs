use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use std::io::{stdin, stdout, Stdin, Write};
use std::path::PathBuf;

use tictactoe_ai::{
    arena,
    bitboard::{BitBoard, Outcome, Player},
    config::AppConfig,
    controller::{GameState, TurnController},
    hints,
    search::Evaluation,
    strategy::{DifficultyStrategy, DifficultyTier, MoveSource},
    Move, SIZE,
};

mod display;
use display::*;

/// Noughts and crosses against a computer opponent
#[derive(Parser, Debug)]
#[command(name = "tictactoe_cli", version)]
struct Cli {
    /// Path to a TOML config file, defaults are used if it does not exist
    #[arg(short, long, default_value = "tictactoe.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a game in the terminal (the default)
    Play {
        /// Who plays X: "human" or a difficulty
        #[arg(long)]
        x: Option<MoveSource>,

        /// Who plays O: "human" or a difficulty
        #[arg(long)]
        o: Option<MoveSource>,

        /// Show the best move before each human turn
        #[arg(long)]
        hints: bool,
    },

    /// Play many computer-vs-computer games and report the results
    Arena {
        #[arg(long, value_enum)]
        x: DifficultyTier,

        #[arg(long, value_enum)]
        o: DifficultyTier,

        #[arg(short, long)]
        games: Option<usize>,

        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Score every move of a position, e.g. "X.. / .X. / OO."
    Analyse {
        layout: String,

        /// The side to move, inferred from the number of marks if omitted
        #[arg(long, value_enum)]
        player: Option<Side>,
    },

    /// Print the default configuration as TOML
    DefaultConfig,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Side {
    X,
    O,
}

impl From<Side> for Player {
    fn from(side: Side) -> Self {
        match side {
            Side::X => Player::X,
            Side::O => Player::O,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)?;

    match cli.command.unwrap_or(Command::Play {
        x: None,
        o: None,
        hints: false,
    }) {
        Command::Play { x, o, hints } => play(
            &config,
            x.unwrap_or(config.game.x),
            o.unwrap_or(config.game.o),
            hints || config.game.hints,
        ),
        Command::Arena { x, o, games, seed } => {
            let games = games.unwrap_or(config.arena.games);
            let seed = seed.unwrap_or(config.arena.seed);
            let report = arena::run(&config, x, o, games, seed, true)?;
            println!("X ({}) vs O ({}): {}", x, o, report);
            Ok(())
        }
        Command::Analyse { layout, player } => analyse(&config, &layout, player.map(Player::from)),
        Command::DefaultConfig => {
            print!("{}", AppConfig::default_toml()?);
            Ok(())
        }
    }
}

fn analyse(config: &AppConfig, layout: &str, player: Option<Player>) -> Result<()> {
    let mut board = BitBoard::from_layout(layout)?;
    let player = player.unwrap_or_else(|| board.side_to_move());
    display(&board, board.winning_line(), None)?;

    let mut searcher = config.search.searcher()?;
    let moves = searcher.scored_moves(&mut board, player)?;
    println!("\nMove scores for {} (W: win, L: loss, D: draw, in moves):", player);
    display_scores(&moves)?;

    let best = searcher.best_scored_move(&mut board, player)?;
    println!("{}", describe(Evaluation::from_score(best.score), player));
    println!("Best move: {} {}", best.cell.0 + 1, best.cell.1 + 1);
    println!("Positions searched: {}", searcher.node_count);
    Ok(())
}

fn play(config: &AppConfig, x: MoveSource, o: MoveSource, show_hints: bool) -> Result<()> {
    let stdin = stdin();
    let mut controller = TurnController::with_seats(x, o);
    let mut strategy = DifficultyStrategy::new(config.search.searcher()?, config.difficulty.clone());
    let mut hint_searcher = config.search.searcher()?;

    println!("Welcome to noughts and crosses\n");
    println!("X: {}, O: {}", x, o);

    // game loop
    loop {
        match controller.state() {
            GameState::WaitingForMove(player) => match controller.seat(player) {
                // AI player
                MoveSource::Computer(tier) => {
                    display(controller.board(), None, None)?;
                    println!("{} ({}) is thinking...", player, tier);
                    stdout().flush()?;

                    // slow down play if both players are AI
                    if !x.is_human() && !o.is_human() {
                        std::thread::sleep(std::time::Duration::from_millis(800));
                    }

                    let ((row, col), _) = controller.play_computer(&mut strategy)?;
                    println!("{} plays {} {}", player, row + 1, col + 1);
                }

                // human player
                MoveSource::Human => {
                    let hint = if show_hints {
                        Some(hints::compute(controller.board(), player, &mut hint_searcher, None)?)
                    } else {
                        None
                    };
                    display(controller.board(), None, hint.as_ref())?;
                    if let Some(hint) = &hint {
                        println!("{}", describe(hint.evaluation, player));
                    }

                    print!("{} to move (row col, or q to quit) > ", player);
                    stdout().flush()?;
                    let mut input_str = String::new();
                    if stdin.read_line(&mut input_str)? == 0 {
                        return Ok(());
                    }
                    if input_str.trim().eq_ignore_ascii_case("q") {
                        return Ok(());
                    }

                    let (row, col) = match parse_move(&input_str) {
                        Ok(cell) => cell,
                        Err(err) => {
                            println!("{}", err);
                            continue;
                        }
                    };
                    if let Err(err) = controller.play(row, col) {
                        println!("{}", err);
                        // try the move again
                        continue;
                    }
                }
            },

            // end states
            GameState::Terminal(outcome) => {
                display(controller.board(), controller.winning_line(), None)?;
                match outcome {
                    Outcome::Win(player) => println!("{} wins!", player),
                    Outcome::Draw => println!("Draw!"),
                    Outcome::InProgress => {}
                }
                if ask_yes_no(&stdin, "Play again? y/n: ")? {
                    controller.reset();
                } else {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Accepts "row col" (1-based) or a single cell number 1-9 counted row by row
fn parse_move(input: &str) -> Result<Move> {
    let numbers = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| anyhow!("Invalid number: {}", s))
        })
        .collect::<Result<Vec<_>>>()?;

    match numbers.as_slice() {
        [cell @ 1..=9] => Ok(((cell - 1) / SIZE, (cell - 1) % SIZE)),
        [row @ 1..=3, col @ 1..=3] => Ok((row - 1, col - 1)),
        _ => Err(anyhow!(
            "Invalid move '{}'. Enter a row and column between 1 and {}, or a cell 1-9",
            input.trim(),
            SIZE
        )),
    }
}

fn ask_yes_no(stdin: &Stdin, prompt: &str) -> Result<bool> {
    loop {
        let mut buffer = String::new();
        print!("{}", prompt);
        stdout().flush()?;
        if stdin.read_line(&mut buffer)? == 0 {
            return Ok(false);
        }
        match buffer.to_lowercase().chars().next() {
            Some('y') => return Ok(true),
            Some('n') => return Ok(false),
            _ => println!("Unknown answer given"),
        }
    }
}
