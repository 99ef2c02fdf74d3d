#[cfg(test)]
pub mod test {
    use anyhow::{anyhow, Result};
    use proptest::prelude::*;

    use std::collections::HashSet;

    use crate::{
        arena,
        bitboard::{BitBoard, LineKind, Outcome, Player, WINNING_LINES},
        config::{AppConfig, DifficultyConfig},
        controller::{GameState, TurnController},
        error::EngineError,
        hints::{self, encode_board, MoveOracle},
        search::{Evaluation, Searcher, DEFAULT_BLOCKING_BONUS, MAX_BLOCKING_BONUS},
        strategy::{random_move, DifficultyStrategy, DifficultyTier, MoveSource},
        Move, CELLS, SIZE,
    };

    fn seeded_strategy(seed: u64) -> DifficultyStrategy<rand::rngs::StdRng> {
        DifficultyStrategy::seeded(Searcher::default(), DifficultyConfig::default(), seed)
    }

    // plays the given cells (as indices) in turn, skipping illegal ones and stopping at the end
    fn play_out(cells: &[usize]) -> TurnController {
        let mut controller = TurnController::new();
        for &idx in cells {
            if controller.is_over() {
                break;
            }
            let _ = controller.try_play(idx / SIZE, idx % SIZE);
        }
        controller
    }

    #[test]
    pub fn layout_parsing() -> Result<()> {
        let board = BitBoard::from_layout("X.. / .X. / OO.")?;
        assert_eq!(board.mask(Player::X), 0b000_010_001);
        assert_eq!(board.mask(Player::O), 0b011_000_000);
        assert_eq!(board.to_string(), "X..\n.X.\nOO.");
        assert_eq!(BitBoard::from_layout(board.to_string())?, board);

        assert!(BitBoard::from_layout("X..").is_err());
        assert!(BitBoard::from_layout("X.. .X. OO. X").is_err());
        assert!(matches!(
            BitBoard::from_layout("X.. .Z. OO."),
            Err(EngineError::InvalidLayout(_))
        ));
        Ok(())
    }

    #[test]
    pub fn signed_cells_match_layout() -> Result<()> {
        let board = BitBoard::from_layout("XO. / .X. / ..O")?;
        let cells = board.signed_cells();
        assert_eq!(cells, [1, -1, 0, 0, 1, 0, 0, 0, -1]);
        assert_eq!(BitBoard::from_signed(&cells)?, board);
        assert!(BitBoard::from_signed(&[2, 0, 0, 0, 0, 0, 0, 0, 0]).is_err());
        assert!(BitBoard::from_masks(0b11, 0b10).is_err());
        assert!(BitBoard::from_masks(1 << 9, 0).is_err());
        Ok(())
    }

    #[test]
    pub fn grid_view() -> Result<()> {
        let board = BitBoard::from_layout("X.. / .O. / ..X")?;
        let grid = board.grid();
        assert_eq!(grid[0][0], Some(Player::X));
        assert_eq!(grid[1][1], Some(Player::O));
        assert_eq!(grid[2][2], Some(Player::X));
        assert_eq!(grid[0][1], None);
        assert_eq!(board.cell(3, 0), None);
        Ok(())
    }

    #[test]
    pub fn place_rejects_invalid_moves() -> Result<()> {
        let mut board = BitBoard::new();
        board.place(1, 1, Player::X)?;
        let before = board;

        assert_eq!(
            board.place(1, 1, Player::O),
            Err(EngineError::Occupied { row: 1, col: 1 })
        );
        assert_eq!(
            board.place(3, 0, Player::O),
            Err(EngineError::OutOfRange { row: 3, col: 0 })
        );
        assert_eq!(board, before);
        assert!(!board.is_legal(1, 1));
        assert!(!board.is_legal(0, 5));
        assert!(board.is_legal(0, 0));
        Ok(())
    }

    #[test]
    pub fn every_line_wins() -> Result<()> {
        for line in WINNING_LINES.iter() {
            for &player in [Player::X, Player::O].iter() {
                let mut board = BitBoard::new();
                for idx in 0..CELLS {
                    if line.mask & (1 << idx) != 0 {
                        board.place(idx / SIZE, idx % SIZE, player)?;
                    }
                }
                assert_eq!(board.winner(), Outcome::Win(player));
                assert_eq!(board.winning_line(), Some(*line));
            }
        }
        Ok(())
    }

    #[test]
    pub fn winning_line_endpoints() -> Result<()> {
        let board = BitBoard::from_layout("..X / .X. / XOO")?;
        let line = board.winning_line().ok_or(anyhow!("no winning line"))?;
        assert_eq!(line.kind, LineKind::AntiDiagonal);
        assert_eq!((line.start, line.end), ((0, 2), (2, 0)));

        let board = BitBoard::from_layout("XO. / XO. / .OX")?;
        let line = board.winning_line().ok_or(anyhow!("no winning line"))?;
        assert_eq!(line.kind, LineKind::Column);
        assert_eq!((line.start, line.end), ((0, 1), (2, 1)));
        assert_eq!(board.winner(), Outcome::Win(Player::O));
        Ok(())
    }

    #[test]
    pub fn full_board_without_line_is_draw() -> Result<()> {
        let board = BitBoard::from_layout("XOX / XOO / OXX")?;
        assert_eq!(board.winner(), Outcome::Draw);
        assert_eq!(board.winning_line(), None);
        assert!(board.is_full());
        assert_eq!(board.legal_moves().count(), 0);
        Ok(())
    }

    #[test]
    pub fn legal_moves_are_row_major() -> Result<()> {
        let board = BitBoard::from_layout("X.O / .X. / O..")?;
        let moves: Vec<Move> = board.legal_moves().collect();
        assert_eq!(moves, vec![(0, 1), (1, 0), (1, 2), (2, 1), (2, 2)]);
        assert_eq!(board.legal_moves().len(), 5);
        Ok(())
    }

    #[test]
    pub fn completes_line_does_not_touch_the_board() -> Result<()> {
        let board = BitBoard::from_layout("XX. / OO. / ...")?;
        let before = board;
        assert!(board.completes_line(0, 2, Player::X));
        assert!(board.completes_line(1, 2, Player::O));
        assert!(!board.completes_line(1, 2, Player::X));
        // occupied cells never complete anything
        assert!(!board.completes_line(0, 0, Player::X));
        assert_eq!(board, before);
        Ok(())
    }

    #[test]
    pub fn perfect_takes_the_win_and_the_block() -> Result<()> {
        let mut board = BitBoard::from_layout("X.. / .X. / OO.")?;
        let before = board;
        let mut searcher = Searcher::default();
        assert_eq!(searcher.best_move(&mut board, Player::O)?, (2, 2));
        assert_eq!(board, before);

        let mut strategy = seeded_strategy(1);
        assert_eq!(
            strategy.choose_move(&board, Player::O, DifficultyTier::Perfect)?,
            (2, 2)
        );
        Ok(())
    }

    #[test]
    pub fn blocking_bonus_breaks_ties_between_lost_moves() -> Result<()> {
        // X threatens (1, 2) and (2, 2), every O move loses on the next ply
        let mut board = BitBoard::from_layout("X.O / XX. / O..")?;

        let mut searcher = Searcher::default();
        let scored = searcher.scored_moves(&mut board, Player::O)?;
        for m in scored.iter() {
            assert_eq!(
                Evaluation::from_score(m.score),
                Evaluation::Loss { plies: 2 }
            );
        }
        assert_eq!(searcher.best_move(&mut board, Player::O)?, (1, 2));

        // without the bonus the first cell in row-major order is kept
        let mut plain = Searcher::new(0).ok_or(anyhow!("zero bonus rejected"))?;
        assert_eq!(plain.best_move(&mut board, Player::O)?, (0, 1));
        Ok(())
    }

    #[test]
    pub fn bonus_never_beats_a_better_score() -> Result<()> {
        // X can win at once in (0, 2); blocking O's row in (1, 2) only earns the bonus
        let mut board = BitBoard::from_layout("XX. / OO. / X.O")?;
        let mut searcher = Searcher::default();
        assert_eq!(searcher.best_move(&mut board, Player::X)?, (0, 2));

        assert!(Searcher::new(DEFAULT_BLOCKING_BONUS).is_some());
        assert!(Searcher::new(MAX_BLOCKING_BONUS).is_some());
        assert!(Searcher::new(MAX_BLOCKING_BONUS + 1).is_none());
        assert!(Searcher::new(-1).is_none());
        // large bonuses are rejected without overflowing
        assert!(Searcher::new(i32::MAX).is_none());
        assert_eq!(Searcher::default().blocking_bonus(), DEFAULT_BLOCKING_BONUS);
        Ok(())
    }

    #[test]
    pub fn search_prefers_the_fastest_win() -> Result<()> {
        let mut board = BitBoard::from_layout("XX. / OO. / ...")?;
        let mut searcher = Searcher::default();
        assert_eq!(searcher.best_move(&mut board, Player::X)?, (0, 2));
        assert_eq!(
            searcher.evaluate(&mut board, Player::X)?,
            Evaluation::Win { plies: 1 }
        );
        assert_eq!(
            searcher.evaluate(&mut board, Player::O)?,
            Evaluation::Win { plies: 1 }
        );
        Ok(())
    }

    #[test]
    pub fn empty_board_is_a_draw() -> Result<()> {
        let mut board = BitBoard::new();
        let mut searcher = Searcher::default();
        assert_eq!(searcher.evaluate(&mut board, Player::X)?, Evaluation::Draw);
        assert!(searcher.node_count > 0);
        assert_eq!(board, BitBoard::new());
        Ok(())
    }

    #[test]
    pub fn search_is_deterministic() -> Result<()> {
        for layout in [".........", "X........", "X...O...X", "XO..X...."].iter() {
            let mut board = BitBoard::from_layout(layout)?;
            let player = board.side_to_move();
            let first = Searcher::default().best_move(&mut board, player)?;
            let second = Searcher::default().best_move(&mut board, player)?;
            assert_eq!(first, second);
        }
        Ok(())
    }

    #[test]
    pub fn no_moves_on_finished_boards() -> Result<()> {
        let mut searcher = Searcher::default();
        let mut strategy = seeded_strategy(3);

        let mut full = BitBoard::from_layout("XOX / XOO / OXX")?;
        assert_eq!(
            searcher.best_move(&mut full, Player::X),
            Err(EngineError::NoLegalMoves)
        );

        let mut won = BitBoard::from_layout("XXX / OO. / ...")?;
        assert_eq!(
            searcher.best_move(&mut won, Player::O),
            Err(EngineError::NoLegalMoves)
        );
        for &tier in DifficultyTier::ALL.iter() {
            assert_eq!(
                strategy.choose_move(&won, Player::O, tier),
                Err(EngineError::NoLegalMoves)
            );
        }
        assert_eq!(
            random_move(&won, &mut rand::thread_rng()),
            Err(EngineError::NoLegalMoves)
        );
        Ok(())
    }

    #[test]
    pub fn perfect_never_throws_away_a_position() -> Result<()> {
        // walk every reachable position and check the perfect move keeps the value
        let mut searcher = Searcher::default();
        let mut seen = HashSet::new();
        let mut stack = vec![BitBoard::new()];

        while let Some(mut board) = stack.pop() {
            if !seen.insert(board) || board.winner() != Outcome::InProgress {
                continue;
            }
            let player = board.side_to_move();
            let best = searcher.best_scored_move(&mut board, player)?;
            let value = Evaluation::from_score(best.score);

            let mut next = board;
            next.place(best.cell.0, best.cell.1, player)?;
            if next.winner() == Outcome::InProgress {
                let reply = searcher.evaluate(&mut next, player.other())?;
                match value {
                    Evaluation::Win { .. } => assert!(matches!(reply, Evaluation::Loss { .. })),
                    Evaluation::Draw => assert_eq!(reply, Evaluation::Draw),
                    Evaluation::Loss { .. } => {}
                }
            }

            for (row, col) in board.legal_moves() {
                let mut child = board;
                child.place(row, col, player)?;
                stack.push(child);
            }
        }
        // all non-terminal positions plus the finished ones
        assert_eq!(seen.len(), 5478);
        Ok(())
    }

    #[test]
    pub fn perfect_against_perfect_draws() -> Result<()> {
        let mut controller = TurnController::with_seats(
            MoveSource::Computer(DifficultyTier::Perfect),
            MoveSource::Computer(DifficultyTier::Perfect),
        );
        let mut strategy = seeded_strategy(0);
        while !controller.is_over() {
            controller.play_computer(&mut strategy)?;
        }
        assert_eq!(controller.state(), GameState::Terminal(Outcome::Draw));
        assert_eq!(controller.move_count(), CELLS);
        Ok(())
    }

    #[test]
    pub fn difficulty_distributions() -> Result<()> {
        let board = BitBoard::from_layout("X.O / XX. / O..")?;
        let best = Searcher::default().best_move(&mut board.clone(), Player::O)?;
        let mut strategy = seeded_strategy(42);

        let trivial: HashSet<Move> = (0..200)
            .map(|_| strategy.choose_move(&board, Player::O, DifficultyTier::Trivial))
            .collect::<Result<_, _>>()?;
        assert!(trivial.len() > 1);
        assert!(trivial.iter().any(|&cell| cell != best));

        let perfect: HashSet<Move> = (0..200)
            .map(|_| strategy.choose_move(&board, Player::O, DifficultyTier::Perfect))
            .collect::<Result<_, _>>()?;
        assert_eq!(perfect.into_iter().collect::<Vec<_>>(), vec![best]);
        Ok(())
    }

    #[test]
    pub fn middle_tiers_mix_search_and_random_play() -> Result<()> {
        // four free cells, so random play finds the searched move a quarter of the time
        let board = BitBoard::from_layout("X.O / XX. / O..")?;
        let best = Searcher::default().best_move(&mut board.clone(), Player::O)?;
        let draws = 1000;

        let mut strategy = seeded_strategy(9);
        let mut searched = |tier| -> Result<usize> {
            let mut hits = 0;
            for _ in 0..draws {
                if strategy.choose_move(&board, Player::O, tier)? == best {
                    hits += 1;
                }
            }
            Ok(hits)
        };

        // expected 625 of 1000 at p = 0.5
        let balanced = searched(DifficultyTier::Balanced)?;
        assert!((530..=720).contains(&balanced), "balanced searched {} times", balanced);
        // expected 850 of 1000 at p = 0.8
        let strong = searched(DifficultyTier::Strong)?;
        assert!((780..=930).contains(&strong), "strong searched {} times", strong);
        assert!(balanced < strong);

        // with every probability at 1 even the weakest tier always searches
        let always = DifficultyConfig {
            trivial: 1.0,
            balanced: 1.0,
            strong: 1.0,
        };
        let mut strategy = DifficultyStrategy::seeded(Searcher::default(), always, 9);
        for _ in 0..200 {
            assert_eq!(strategy.choose_move(&board, Player::O, DifficultyTier::Trivial)?, best);
        }
        Ok(())
    }

    #[test]
    pub fn skill_probabilities() {
        let strategy = seeded_strategy(0);
        assert_eq!(strategy.skill_probability(DifficultyTier::Trivial), 0.0);
        assert_eq!(strategy.skill_probability(DifficultyTier::Balanced), 0.5);
        assert_eq!(strategy.skill_probability(DifficultyTier::Strong), 0.8);
        assert_eq!(strategy.skill_probability(DifficultyTier::Perfect), 1.0);

        let always = DifficultyConfig {
            trivial: 1.0,
            balanced: 1.0,
            strong: 1.0,
        };
        let strong = DifficultyStrategy::seeded(Searcher::default(), always, 0);
        assert_eq!(strong.skill_probability(DifficultyTier::Trivial), 1.0);
        assert!(DifficultyTier::Trivial < DifficultyTier::Perfect);
    }

    #[test]
    pub fn move_sources_parse() {
        assert_eq!("human".parse::<MoveSource>(), Ok(MoveSource::Human));
        assert_eq!(
            "Strong".parse::<MoveSource>(),
            Ok(MoveSource::Computer(DifficultyTier::Strong))
        );
        assert_eq!(
            "easy".parse::<MoveSource>(),
            Ok(MoveSource::Computer(DifficultyTier::Trivial))
        );
        assert!("robot".parse::<MoveSource>().is_err());
        assert_eq!(MoveSource::Computer(DifficultyTier::Perfect).to_string(), "perfect");
    }

    #[test]
    pub fn controller_turns_and_outcome() -> Result<()> {
        let mut controller = TurnController::new();
        assert_eq!(controller.state(), GameState::WaitingForMove(Player::X));

        assert_eq!(controller.play(0, 0)?, GameState::WaitingForMove(Player::O));
        assert_eq!(controller.play(1, 0)?, GameState::WaitingForMove(Player::X));
        controller.play(0, 1)?;
        controller.play(1, 1)?;
        assert_eq!(
            controller.play(0, 2)?,
            GameState::Terminal(Outcome::Win(Player::X))
        );
        assert_eq!(controller.outcome(), Outcome::Win(Player::X));
        let line = controller.winning_line().ok_or(anyhow!("no winning line"))?;
        assert_eq!((line.kind, line.start, line.end), (LineKind::Row, (0, 0), (0, 2)));
        Ok(())
    }

    #[test]
    pub fn controller_rejects_bad_moves() -> Result<()> {
        let mut controller = TurnController::new();
        controller.play(1, 1)?;
        let board = *controller.board();

        assert_eq!(
            controller.play(1, 1),
            Err(EngineError::Occupied { row: 1, col: 1 })
        );
        assert_eq!(
            controller.play(0, 3),
            Err(EngineError::OutOfRange { row: 0, col: 3 })
        );
        assert!(!controller.try_play(9, 9));
        assert_eq!(*controller.board(), board);
        assert_eq!(controller.state(), GameState::WaitingForMove(Player::O));
        Ok(())
    }

    #[test]
    pub fn terminal_state_is_absorbing_until_reset() -> Result<()> {
        let mut controller = play_out(&[0, 3, 1, 4, 2]);
        assert_eq!(
            controller.state(),
            GameState::Terminal(Outcome::Win(Player::X))
        );
        let board = *controller.board();

        assert_eq!(controller.play(2, 2), Err(EngineError::GameOver));
        assert_eq!(*controller.board(), board);
        assert_eq!(controller.active_player(), None);
        assert_eq!(controller.active_source(), None);

        controller.reset();
        assert_eq!(controller.state(), GameState::WaitingForMove(Player::X));
        assert_eq!(*controller.board(), BitBoard::new());
        Ok(())
    }

    #[test]
    pub fn controller_draw() -> Result<()> {
        // X O X / X O O / O X X
        let controller = play_out(&[0, 1, 2, 4, 3, 5, 7, 6, 8]);
        assert_eq!(controller.state(), GameState::Terminal(Outcome::Draw));
        assert_eq!(controller.winning_line(), None);
        Ok(())
    }

    #[test]
    pub fn computer_seats() -> Result<()> {
        let mut controller = TurnController::with_seats(
            MoveSource::Human,
            MoveSource::Computer(DifficultyTier::Perfect),
        );
        let mut strategy = seeded_strategy(5);

        assert_eq!(
            controller.play_computer(&mut strategy),
            Err(EngineError::HumanTurn(Player::X))
        );
        assert_eq!(controller.active_source(), Some(MoveSource::Human));

        controller.play(0, 0)?;
        assert_eq!(
            controller.active_source(),
            Some(MoveSource::Computer(DifficultyTier::Perfect))
        );
        let (cell, state) = controller.play_computer(&mut strategy)?;
        // the only move that does not lose against a corner opening
        assert_eq!(cell, (1, 1));
        assert_eq!(state, GameState::WaitingForMove(Player::X));

        controller.set_seat(Player::X, MoveSource::Computer(DifficultyTier::Trivial));
        assert!(controller.play_computer(&mut strategy).is_ok());
        Ok(())
    }

    struct FixedOracle([f32; CELLS]);

    impl MoveOracle for FixedOracle {
        fn move_probabilities(&self, _state: &[f32; CELLS]) -> [f32; CELLS] {
            self.0
        }
    }

    #[test]
    pub fn board_encoding_is_relative_to_the_player() -> Result<()> {
        let board = BitBoard::from_layout("XO. / ... / ...")?;
        let for_x = encode_board(&board, Player::X);
        let for_o = encode_board(&board, Player::O);
        assert_eq!(&for_x[..3], &[1.0f32, -1.0, 0.0]);
        assert_eq!(&for_o[..3], &[-1.0f32, 1.0, 0.0]);
        Ok(())
    }

    #[test]
    pub fn oracle_moves_skip_occupied_cells() -> Result<()> {
        let board = BitBoard::from_layout("X.. / ... / ...")?;
        let oracle = FixedOracle([0.9, 0.01, 0.01, 0.01, 0.05, 0.01, 0.01, 0.0, 0.0]);
        assert_eq!(oracle.select_move(&board, Player::O), Some((1, 1)));

        let full = BitBoard::from_layout("XOX / XOO / OXX")?;
        assert_eq!(oracle.select_move(&full, Player::O), None);
        Ok(())
    }

    #[test]
    pub fn hints_combine_search_and_oracle() -> Result<()> {
        let board = BitBoard::from_layout("X.. / .X. / OO.")?;
        let mut searcher = Searcher::default();
        let oracle = FixedOracle([1.0 / CELLS as f32; CELLS]);

        let hint = hints::compute(&board, Player::O, &mut searcher, Some(&oracle as &dyn MoveOracle))?;
        assert_eq!(hint.best_move, (2, 2));
        assert_eq!(hint.evaluation, Evaluation::Win { plies: 1 });
        assert!(hint.probabilities.is_some());

        let hint = hints::compute(&board, Player::O, &mut searcher, None)?;
        assert_eq!(hint.probabilities, None);
        Ok(())
    }

    #[test]
    pub fn arena_tiers() -> Result<()> {
        let config = AppConfig::default();

        let report = arena::run(&config, DifficultyTier::Perfect, DifficultyTier::Perfect, 8, 0, false)?;
        assert_eq!(report.draws, 8);

        let report = arena::run(&config, DifficultyTier::Trivial, DifficultyTier::Perfect, 100, 11, false)?;
        assert_eq!(report.total(), 100);
        assert_eq!(report.x_wins, 0);

        let report = arena::run(&config, DifficultyTier::Perfect, DifficultyTier::Balanced, 100, 23, false)?;
        assert_eq!(report.o_wins, 0);
        Ok(())
    }

    proptest! {
        #[test]
        fn masks_stay_disjoint(cells in proptest::collection::vec(0..CELLS, 0..20)) {
            let mut controller = TurnController::new();
            for idx in cells {
                let _ = controller.try_play(idx / SIZE, idx % SIZE);
                let board = controller.board();
                prop_assert_eq!(board.mask(Player::X) & board.mask(Player::O), 0);
                prop_assert_eq!(board.occupied().count_ones() as usize, board.num_moves());
            }
        }

        #[test]
        fn place_then_remove_restores_the_board(cells in proptest::collection::vec(0..CELLS, 0..9)) {
            let board = *play_out(&cells).board();
            for (row, col) in board.legal_moves() {
                for &player in [Player::X, Player::O].iter() {
                    let mut trial = board;
                    trial.place(row, col, player).unwrap();
                    trial.remove(row, col);
                    prop_assert_eq!(trial, board);
                }
            }
        }

        #[test]
        fn chosen_moves_are_legal(cells in proptest::collection::vec(0..CELLS, 0..9), seed in any::<u64>()) {
            let controller = play_out(&cells);
            if let GameState::WaitingForMove(player) = controller.state() {
                let board = *controller.board();
                let mut strategy = seeded_strategy(seed);
                for &tier in DifficultyTier::ALL.iter() {
                    let (row, col) = strategy.choose_move(&board, player, tier).unwrap();
                    prop_assert!(board.is_legal(row, col));
                }
                prop_assert_eq!(*controller.board(), board);
            }
        }

        #[test]
        fn search_leaves_the_board_unchanged(cells in proptest::collection::vec(0..CELLS, 0..9)) {
            let controller = play_out(&cells);
            if let Some(player) = controller.active_player() {
                let mut board = *controller.board();
                let before = board;
                Searcher::default().best_move(&mut board, player).unwrap();
                prop_assert_eq!(board, before);
            }
        }
    }
}
