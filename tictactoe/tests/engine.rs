use tictactoe::{Board, Cell, Engine, Marker, Move, Outcome};

const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

fn board(s: &str) -> Board {
    s.parse().unwrap()
}

fn with_marks(marks: &[((usize, usize), Marker)]) -> Board {
    let mut b = Board::empty();
    for &((row, col), marker) in marks {
        b.apply_move(Move::new(row, col), marker).unwrap();
    }
    b
}

/// Every 3x3 arrangement of X, O and empty, ignoring turn order.
fn all_boards() -> impl Iterator<Item = Board> {
    (0..3u32.pow(9)).map(|mut code| {
        let text: String = (0..9)
            .map(|_| {
                let ch = ['.', 'X', 'O'][(code % 3) as usize];
                code /= 3;
                ch
            })
            .collect();
        board(&text)
    })
}

fn line_complete(b: &Board, marker: Marker) -> bool {
    LINES.iter().any(|line| {
        line.iter()
            .all(|&(row, col)| b.get(row, col) == Some(marker.cell()))
    })
}

/// Exhaustive game value for `to_move`: 1 win, 0 draw, -1 loss.
fn solve(b: &Board, to_move: Marker) -> i32 {
    if b.has_won(to_move.opponent()) {
        return -1;
    }
    let moves = b.possible_moves();
    if moves.is_empty() {
        return 0;
    }
    moves
        .into_iter()
        .map(|mv| {
            let mut child = *b;
            child.apply_move(mv, to_move).unwrap();
            -solve(&child, to_move.opponent())
        })
        .max()
        .unwrap_or(0)
}

#[test]
fn takes_immediate_win_on_every_line() {
    for engine_marker in [Marker::X, Marker::O] {
        let engine = Engine::new(engine_marker);
        for line in LINES {
            for gap in 0..3 {
                let marks: Vec<_> = line
                    .iter()
                    .enumerate()
                    .filter(|&(idx, _)| idx != gap)
                    .map(|(_, &pos)| (pos, engine_marker))
                    .collect();
                let b = with_marks(&marks);
                let (row, col) = line[gap];
                assert_eq!(
                    engine.choose_move(&b).unwrap(),
                    Move::new(row, col),
                    "missed win on\n{}",
                    b.render()
                );
            }
        }
    }
}

#[test]
fn prefers_own_win_over_blocking() {
    // O can win on the middle row; X also threatens the top row.
    let engine = Engine::against(Marker::X);
    let mv = engine.choose_move(&board("XX./OO./X..")).unwrap();
    assert_eq!(mv, Move::new(1, 2));
}

#[test]
fn game_over_matches_lines_and_fullness() {
    for b in all_boards() {
        let full = (0..3).all(|row| (0..3).all(|col| b.get(row, col) != Some(Cell::Empty)));
        let decided = line_complete(&b, Marker::X) || line_complete(&b, Marker::O);
        assert_eq!(b.is_game_over(), full || decided, "board {b}");
        assert_eq!(b.has_won(Marker::X), line_complete(&b, Marker::X), "board {b}");
    }
}

#[test]
fn double_win_reports_engine_win() {
    let b = board("XXX/OOO/...");
    assert_eq!(Engine::against(Marker::X).outcome(&b), Outcome::Lose);
    assert_eq!(Engine::against(Marker::O).outcome(&b), Outcome::Lose);
}

#[test]
fn outcome_from_human_side() {
    let engine = Engine::against(Marker::X);
    assert_eq!(engine.outcome(&board("XXX/OO./...")), Outcome::Win);
    assert_eq!(engine.outcome(&board("X.O/XO./O.X")), Outcome::Lose);
}

#[test]
fn drawn_board_is_a_tie() {
    let b = board("XOX/XOO/OXX");
    assert!(b.is_game_over());
    assert!(b.possible_moves().is_empty());
    assert_eq!(Engine::against(Marker::X).outcome(&b), Outcome::Tie);
    assert_eq!(Engine::against(Marker::O).outcome(&b), Outcome::Tie);
}

#[test]
fn heuristic_line_contributions() {
    let engine = Engine::new(Marker::X);
    assert_eq!(engine.score(&Board::empty()), 0);
    // Edge cell sits on one row and one column only.
    assert_eq!(engine.score(&board(".X./.../...")), 2);
    assert_eq!(engine.score(&board(".O./.../...")), -2);
    // Open two on the top row: +10 there, +1 on both columns and the diagonal.
    assert_eq!(engine.score(&board("XX./.../...")), 10 + 1 + 1 + 1);
    assert_eq!(engine.score(&board("OO./.../...")), -(10 + 1 + 1 + 1));
}

#[test]
fn choose_move_is_deterministic() {
    for text in [".........", "X........", "X../.O./..X", "XO./.X./..O"] {
        let b = board(text);
        let engine = Engine::against(Marker::X);
        let first = engine.choose_move(&b).unwrap();
        for _ in 0..5 {
            assert_eq!(engine.choose_move(&b).unwrap(), first);
        }
    }
}

#[test]
fn opening_move_keeps_the_draw() {
    let engine = Engine::new(Marker::X).with_depth(4).unwrap();
    let mut b = Board::empty();
    let mv = engine.make_move(&mut b).unwrap();
    assert!(
        solve(&b, Marker::O) <= 0,
        "opening {mv:?} loses against best play"
    );
}

#[test]
fn replies_never_hand_over_a_forced_loss_after_any_opening() {
    let engine = Engine::against(Marker::X);
    for mv in Board::empty().possible_moves() {
        let mut b = Board::empty();
        b.apply_move(mv, Marker::X).unwrap();
        engine.make_move(&mut b).unwrap();
        assert!(
            solve(&b, Marker::X) <= 0,
            "reply to {mv:?} loses against best play\n{}",
            b.render()
        );
    }
}

/// Counts games the human wins when the engine answers every human move.
fn human_wins(b: &Board, engine: &Engine, human_to_move: bool) -> usize {
    if b.is_game_over() {
        return usize::from(engine.outcome(b) == Outcome::Win);
    }
    if human_to_move {
        b.possible_moves()
            .into_iter()
            .map(|mv| {
                let mut child = *b;
                child.apply_move(mv, engine.opponent()).unwrap();
                human_wins(&child, engine, false)
            })
            .sum()
    } else {
        let mut child = *b;
        engine.make_move(&mut child).unwrap();
        human_wins(&child, engine, true)
    }
}

#[test]
fn never_loses_against_any_human_line() {
    for human in [Marker::X, Marker::O] {
        let engine = Engine::against(human);
        let lost = human_wins(&Board::empty(), &engine, human == Marker::X);
        assert_eq!(lost, 0, "engine lost {lost} games playing {:?}", engine.marker());
    }
}

#[test]
fn beats_first_empty_cell_player() {
    for human in [Marker::X, Marker::O] {
        let engine = Engine::against(human);
        let mut b = Board::empty();
        let mut human_to_move = human == Marker::X;
        while !b.is_game_over() {
            if human_to_move {
                let mv = b.possible_moves()[0];
                b.apply_move(mv, human).unwrap();
            } else {
                engine.make_move(&mut b).unwrap();
            }
            human_to_move = !human_to_move;
        }
        assert_eq!(engine.outcome(&b), Outcome::Lose, "board\n{}", b.render());
    }
}
