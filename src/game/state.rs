use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use tracing::debug;

use super::modifiers::{apply_hand_pipeline, HandModifier, RoundModifier};
use super::moves::{resolve, Move, Winner};
use super::rules::RuleError;
use crate::config::{DisplayOptions, GameConfig};

/// 未配置时每回合支付给赢家的金额。
pub const DEFAULT_ROUND_PAYOUT: u32 = 100;
const PLAYER_COUNT: usize = 2;

/// 卡牌标识，在同一玩家的手牌中唯一。
pub type CardId = u32;
/// 座位号：0 为玩家一，1 为玩家二。
pub type PlayerId = u8;

/// 可出的一张手势牌。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    id: CardId,
    #[serde(rename = "move")]
    mv: Move,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<PlayerId>,
}

impl Card {
    pub fn new(id: CardId, mv: Move, owner: Option<PlayerId>) -> Self {
        Self { id, mv, owner }
    }

    pub fn id(&self) -> CardId {
        self.id
    }

    pub fn mv(&self) -> Move {
        self.mv
    }

    pub fn owner(&self) -> Option<PlayerId> {
        self.owner
    }

    /// 保留标识与归属，只换手势。
    pub fn with_move(&self, mv: Move) -> Self {
        Self { mv, ..self.clone() }
    }
}

/// 玩家本回合可用的手牌。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hand {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    cards: Vec<Card>,
    #[serde(default)]
    next_id: CardId,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next_id: CardId) -> Self {
        Self {
            cards: Vec::new(),
            next_id,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn next_id(&self) -> CardId {
        self.next_id
    }

    /// 发一张带新标识的牌。标识用尽时返回错误，手牌不变。
    pub fn deal(&mut self, mv: Move, owner: Option<PlayerId>) -> Result<CardId, RuleError> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or(RuleError::CardIdsExhausted { next_id: id })?;
        self.cards.push(Card::new(id, mv, owner));
        Ok(id)
    }

    pub fn get(&self, card_id: CardId) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == card_id)
    }

    pub fn position(&self, card_id: CardId) -> Option<usize> {
        self.cards.iter().position(|card| card.id == card_id)
    }

    pub fn contains_move(&self, mv: Move) -> bool {
        self.cards.iter().any(|card| card.mv == mv)
    }

    pub fn count_of(&self, mv: Move) -> usize {
        self.cards.iter().filter(|card| card.mv == mv).count()
    }

    /// 移除第一张标识为 `card_id` 的牌。
    pub fn remove(&mut self, card_id: CardId) -> Result<Card, RuleError> {
        let idx = self
            .position(card_id)
            .ok_or(RuleError::CardNotInHand { card_id })?;
        Ok(self.cards.remove(idx))
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Card) -> bool,
    {
        self.cards.retain(keep);
    }

    pub fn map_cards<F>(mut self, f: F) -> Self
    where
        F: FnMut(Card) -> Card,
    {
        self.cards = self.cards.into_iter().map(f).collect();
        self
    }

    pub fn moves(&self) -> Vec<Move> {
        self.cards.iter().map(|card| card.mv).collect()
    }

    pub fn describe(&self, emoji: bool) -> String {
        self.cards
            .iter()
            .map(|card| card.mv.label(emoji))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn duplicate_id(&self) -> Option<CardId> {
        let mut seen = HashSet::new();
        self.cards
            .iter()
            .map(|card| card.id)
            .find(|id| !seen.insert(*id))
    }
}

/// 玩家的出牌槽。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", content = "card")]
pub enum PlayedCard {
    #[default]
    NotYetPlayed,
    Played(Card),
}

impl PlayedCard {
    pub fn card(&self) -> Option<&Card> {
        match self {
            PlayedCard::NotYetPlayed => None,
            PlayedCard::Played(card) => Some(card),
        }
    }

    pub fn is_played(&self) -> bool {
        matches!(self, PlayedCard::Played(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub hand: Hand,
    #[serde(default)]
    pub played: PlayedCard,
    #[serde(default)]
    pub money: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hand_pipeline: Vec<HandModifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub round_pipeline: Vec<RoundModifier>,
    /// 电脑预先选好、尚未出的牌。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_pick: Option<CardId>,
    #[serde(default)]
    next_card_id: CardId,
}

impl Player {
    pub fn new(id: PlayerId, money: u32) -> Self {
        Self {
            id,
            hand: Hand::new(),
            played: PlayedCard::NotYetPlayed,
            money,
            hand_pipeline: Vec::new(),
            round_pipeline: Vec::new(),
            pending_pick: None,
            next_card_id: 0,
        }
    }

    pub fn with_hand_modifier(mut self, modifier: HandModifier) -> Self {
        self.hand_pipeline.push(modifier);
        self
    }

    pub fn add_hand_modifier(&mut self, modifier: HandModifier) {
        self.hand_pipeline.push(modifier);
    }

    pub fn add_round_modifier(&mut self, modifier: RoundModifier) {
        self.round_pipeline.push(modifier);
    }

    /// 每种手势发一张，再经过手牌修饰器管线；旧手牌与出牌槽清空。
    /// 出错时玩家保持原样。
    pub fn make_hand(&mut self) -> Result<&Hand, RuleError> {
        let mut hand = Hand::starting_at(self.next_card_id);
        for mv in Move::ALL {
            hand.deal(mv, Some(self.id))?;
        }
        let hand = self.apply_hand_modifiers(hand)?;
        self.next_card_id = hand.next_id();
        self.hand = hand;
        self.played = PlayedCard::NotYetPlayed;
        self.pending_pick = None;
        debug!(player = self.id, hand = %self.hand.describe(false), "hand made");
        Ok(&self.hand)
    }

    pub fn apply_hand_modifiers(&self, hand: Hand) -> Result<Hand, RuleError> {
        apply_hand_pipeline(&self.hand_pipeline, hand, self.id)
    }

    pub fn play_card(&mut self, card_id: CardId) -> Result<Card, RuleError> {
        let card = self.hand.remove(card_id)?;
        self.played = PlayedCard::Played(card.clone());
        self.pending_pick = None;
        Ok(card)
    }

    pub fn remove_card(&mut self, card_id: CardId) -> Result<Card, RuleError> {
        self.hand.remove(card_id)
    }

    /// 预选且仍在手中的牌。
    pub fn pending_card(&self) -> Option<&Card> {
        self.pending_pick.and_then(|card_id| self.hand.get(card_id))
    }

    pub fn played_move(&self) -> Option<Move> {
        self.played.card().map(Card::mv)
    }
}

/// 一次对决的结果。胜者在构造时由双方手势算出，之后可被回合修饰器改写。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundResult {
    p1_move: Move,
    p2_move: Move,
    money: u32,
    winner: Winner,
}

impl RoundResult {
    pub fn new(p1_move: Move, p2_move: Move, money: u32) -> Self {
        Self {
            p1_move,
            p2_move,
            money,
            winner: resolve(p1_move, p2_move),
        }
    }

    pub fn p1_move(&self) -> Move {
        self.p1_move
    }

    pub fn p2_move(&self) -> Move {
        self.p2_move
    }

    pub fn money(&self) -> u32 {
        self.money
    }

    pub fn winner(&self) -> Winner {
        self.winner
    }

    pub fn with_money(mut self, money: u32) -> Self {
        self.money = money;
        self
    }

    pub fn with_winner(mut self, winner: Winner) -> Self {
        self.winner = winner;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GamePhase {
    #[default]
    PreGame,
    Draw,
    Play,
    Results,
    Shop,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    GameStarted {
        round: u32,
    },
    PhaseChanged {
        from: GamePhase,
        to: GamePhase,
    },
    HandDrawn {
        player_id: PlayerId,
        cards: Vec<Card>,
    },
    CardPlayed {
        player_id: PlayerId,
        card: Card,
    },
    RoundResolved {
        round: u32,
        result: RoundResult,
    },
    MoneyAwarded {
        player_id: PlayerId,
        amount: u32,
    },
    ModifierPurchased {
        player_id: PlayerId,
        name: String,
        cost: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    PlayerCount { count: usize },
    SeatMismatch { index: usize, player_id: PlayerId },
    DuplicateCardId { player_id: PlayerId, card_id: CardId },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    pub players: Vec<Player>,
    pub round: u32,
    pub phase: GamePhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<RoundResult>,
    #[serde(default)]
    pub display: DisplayOptions,
    #[serde(default = "default_payout")]
    pub round_payout: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
}

fn default_payout() -> u32 {
    DEFAULT_ROUND_PAYOUT
}

impl GameState {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            players: (0..PLAYER_COUNT as PlayerId)
                .map(|id| Player::new(id, config.starting_money))
                .collect(),
            round: 0,
            phase: GamePhase::PreGame,
            last_result: None,
            display: config.display.clone(),
            round_payout: config.round_payout,
            event_log: Vec::new(),
        }
    }

    pub fn with_phase(mut self, phase: GamePhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, RuleError> {
        self.get_player(id)
            .ok_or(RuleError::PlayerNotFound { player_id: id })
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, RuleError> {
        self.get_player_mut(id)
            .ok_or(RuleError::PlayerNotFound { player_id: id })
    }

    pub fn set_phase(&mut self, phase: GamePhase) {
        if self.phase != phase {
            let from = self.phase;
            self.phase = phase;
            self.record_event(GameEvent::PhaseChanged { from, to: phase });
        }
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if self.players.len() != PLAYER_COUNT {
            return Err(IntegrityError::PlayerCount {
                count: self.players.len(),
            });
        }
        for (index, player) in self.players.iter().enumerate() {
            if player.id as usize != index {
                return Err(IntegrityError::SeatMismatch {
                    index,
                    player_id: player.id,
                });
            }
            if let Some(card_id) = player.hand.duplicate_id() {
                return Err(IntegrityError::DuplicateCardId {
                    player_id: player.id,
                    card_id,
                });
            }
        }
        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(&GameConfig::default())
    }
}
