use serde::{Deserialize, Serialize};

use crate::Outcome;

/// Running win/lose/tie tally for the human player across games.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

/// Share of completed games per outcome, as percentages.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    pub win: f64,
    pub lose: f64,
    pub tie: f64,
}

impl Scoreboard {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Lose => self.losses += 1,
            Outcome::Tie => self.ties += 1,
        }
    }

    pub fn games(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// All zero until a game has been recorded.
    pub fn rates(&self) -> Rates {
        let games = self.games();
        if games == 0 {
            return Rates::default();
        }
        let pct = |count: u32| f64::from(count) / f64::from(games) * 100.0;
        Rates {
            win: pct(self.wins),
            lose: pct(self.losses),
            tie: pct(self.ties),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_board_has_zero_rates() {
        let board = Scoreboard::default();
        assert_eq!(board.games(), 0);
        assert_eq!(board.rates(), Rates::default());
    }

    #[test]
    fn record_and_rates() {
        let mut board = Scoreboard::default();
        board.record(Outcome::Win);
        board.record(Outcome::Lose);
        board.record(Outcome::Lose);
        board.record(Outcome::Tie);
        assert_eq!(board.games(), 4);
        assert_eq!(
            board,
            Scoreboard {
                wins: 1,
                losses: 2,
                ties: 1
            }
        );
        let rates = board.rates();
        assert!((rates.win - 25.0).abs() < 1e-9);
        assert!((rates.lose - 50.0).abs() < 1e-9);
        assert!((rates.tie - 25.0).abs() < 1e-9);
    }

    #[test]
    fn clear_resets_counts() {
        let mut board = Scoreboard {
            wins: 3,
            losses: 1,
            ties: 2,
        };
        board.clear();
        assert_eq!(board, Scoreboard::default());
    }

    #[test]
    fn json_shape() {
        let board = Scoreboard {
            wins: 1,
            losses: 0,
            ties: 2,
        };
        let json = serde_json::to_string(&board).unwrap();
        assert_eq!(json, r#"{"wins":1,"losses":0,"ties":2}"#);
        let back: Scoreboard = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);
    }
}
