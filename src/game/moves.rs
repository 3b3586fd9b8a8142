use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::rules::RuleError;
use super::state::PlayerId;

/// 三种手势。
///
/// 声明顺序即循环顺序：每个手势赢前一个、输给后一个（首尾相接）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    pub fn index(self) -> usize {
        match self {
            Move::Rock => 0,
            Move::Paper => 1,
            Move::Scissors => 2,
        }
    }

    pub fn from_index(index: usize) -> Move {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn beats(self, other: Move) -> bool {
        self.index() == (other.index() + 1) % Self::ALL.len()
    }

    /// 被本手势击败的手势。
    pub fn beats_target(self) -> Move {
        Self::from_index(self.index() + Self::ALL.len() - 1)
    }

    /// 能击败本手势的手势。
    pub fn beaten_by(self) -> Move {
        Self::from_index(self.index() + 1)
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Move {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn name(self) -> &'static str {
        match self {
            Move::Rock => "rock",
            Move::Paper => "paper",
            Move::Scissors => "scissors",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Move::Rock => "🪨",
            Move::Paper => "📄",
            Move::Scissors => "✂️",
        }
    }

    pub fn label(self, emoji: bool) -> &'static str {
        if emoji {
            self.emoji()
        } else {
            self.name()
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Move {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rock" | "🪨" => Ok(Move::Rock),
            "paper" | "📄" => Ok(Move::Paper),
            "scissors" | "✂️" | "✂" => Ok(Move::Scissors),
            _ => Err(RuleError::UnknownMove {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Winner {
    Player1,
    Player2,
    Draw,
}

impl Winner {
    /// 座位 0 为玩家一，其余为玩家二。
    pub fn for_seat(player_id: PlayerId) -> Winner {
        if player_id == 0 {
            Winner::Player1
        } else {
            Winner::Player2
        }
    }

    pub fn seat(self) -> Option<PlayerId> {
        match self {
            Winner::Player1 => Some(0),
            Winner::Player2 => Some(1),
            Winner::Draw => None,
        }
    }

    pub fn opposite(self) -> Winner {
        match self {
            Winner::Player1 => Winner::Player2,
            Winner::Player2 => Winner::Player1,
            Winner::Draw => Winner::Draw,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Player1 => f.write_str("Player 1"),
            Winner::Player2 => f.write_str("Player 2"),
            Winner::Draw => f.write_str("Draw"),
        }
    }
}

/// 由双方手势判定胜负。
pub fn resolve(p1: Move, p2: Move) -> Winner {
    if p1 == p2 {
        Winner::Draw
    } else if p1.beats(p2) {
        Winner::Player1
    } else {
        Winner::Player2
    }
}
