use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::OpponentConfig;
use crate::game::{Card, Hand, MoveSelector, RuleError};

/// 在当前手牌中均匀随机选牌。
pub struct RandomSelector {
    rng: SmallRng,
}

impl RandomSelector {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_config(config: &OpponentConfig) -> Self {
        match config.seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        }
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveSelector for RandomSelector {
    fn select_card(&mut self, hand: &Hand) -> Result<Card, RuleError> {
        hand.cards()
            .choose(&mut self.rng)
            .cloned()
            .ok_or(RuleError::EmptyHand)
    }
}
