use serde::{Deserialize, Serialize};

use super::moves::{Move, Winner};
use super::rules::RuleError;
use super::state::{Hand, PlayerId, RoundResult};

/// 作用于新发手牌的变换。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum HandModifier {
    /// 去掉所有 `target` 牌。
    Remove { target: Move },
    Add { card: Move },
    /// `from` 牌换成 `to`，标识不变。
    Replace { from: Move, to: Move },
    Composite { modifiers: Vec<HandModifier> },
}

impl HandModifier {
    pub fn apply(&self, mut hand: Hand, owner: PlayerId) -> Result<Hand, RuleError> {
        match self {
            HandModifier::Remove { target } => {
                hand.retain(|card| card.mv() != *target);
                Ok(hand)
            }
            HandModifier::Add { card } => {
                hand.deal(*card, Some(owner))?;
                Ok(hand)
            }
            HandModifier::Replace { from, to } => Ok(hand.map_cards(|card| {
                if card.mv() == *from {
                    card.with_move(*to)
                } else {
                    card
                }
            })),
            HandModifier::Composite { modifiers } => apply_hand_pipeline(modifiers, hand, owner),
        }
    }
}

/// 按顺序折叠修饰器，后者看到前者的输出。
pub fn apply_hand_pipeline(
    modifiers: &[HandModifier],
    hand: Hand,
    owner: PlayerId,
) -> Result<Hand, RuleError> {
    modifiers
        .iter()
        .try_fold(hand, |hand, modifier| modifier.apply(hand, owner))
}

/// 回合修饰器对结果的作用，以持有者的座位为准。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RoundEffect {
    WinBonus { amount: u32 },
    WinMultiplier { factor: u32 },
    /// 平局判给持有者。
    DrawsWin,
    Composite { effects: Vec<RoundEffect> },
}

impl RoundEffect {
    pub fn apply(&self, result: RoundResult, owner: PlayerId) -> RoundResult {
        let seat = Winner::for_seat(owner);
        match self {
            RoundEffect::WinBonus { amount } if result.winner() == seat => {
                let money = result.money().saturating_add(*amount);
                result.with_money(money)
            }
            RoundEffect::WinMultiplier { factor } if result.winner() == seat => {
                let money = result.money().saturating_mul(*factor);
                result.with_money(money)
            }
            RoundEffect::DrawsWin if result.winner() == Winner::Draw => result.with_winner(seat),
            RoundEffect::Composite { effects } => effects
                .iter()
                .fold(result, |result, effect| effect.apply(result, owner)),
            _ => result,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundModifier {
    pub name: String,
    pub cost: u32,
    pub effect: RoundEffect,
}

impl RoundModifier {
    pub fn new(name: impl Into<String>, cost: u32, effect: RoundEffect) -> Self {
        Self {
            name: name.into(),
            cost,
            effect,
        }
    }

    pub fn apply(&self, result: RoundResult, owner: PlayerId) -> RoundResult {
        self.effect.apply(result, owner)
    }

    /// 商店出售的全部修饰器。
    pub fn catalog() -> Vec<RoundModifier> {
        vec![
            RoundModifier::new("Lucky Coin", 100, RoundEffect::WinBonus { amount: 50 }),
            RoundModifier::new("Stalemate Breaker", 150, RoundEffect::DrawsWin),
            RoundModifier::new("Double Down", 250, RoundEffect::WinMultiplier { factor: 2 }),
            RoundModifier::new(
                "High Roller",
                400,
                RoundEffect::Composite {
                    effects: vec![
                        RoundEffect::DrawsWin,
                        RoundEffect::WinBonus { amount: 100 },
                    ],
                },
            ),
        ]
    }

    pub fn from_catalog(name: &str) -> Option<RoundModifier> {
        Self::catalog()
            .into_iter()
            .find(|modifier| modifier.name.eq_ignore_ascii_case(name))
    }
}

/// 先折叠玩家一的修饰器，再折叠玩家二的。
pub fn apply_round_pipeline(
    result: RoundResult,
    p1_modifiers: &[RoundModifier],
    p2_modifiers: &[RoundModifier],
) -> RoundResult {
    let result = p1_modifiers
        .iter()
        .fold(result, |result, modifier| modifier.apply(result, 0));
    p2_modifiers
        .iter()
        .fold(result, |result, modifier| modifier.apply(result, 1))
}
