use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{
    modifiers::{apply_round_pipeline, RoundModifier},
    moves::Winner,
    selector::{ChosenCard, MoveSelector},
    state::{
        Card, CardId, GameEvent, GamePhase, GameState, IntegrityError, PlayedCard, PlayerId,
        RoundResult,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayCardAction {
    pub player_id: PlayerId,
    pub card_id: CardId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseAction {
    pub player_id: PlayerId,
    pub modifier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("card {card_id} is not in hand")]
    CardNotInHand { card_id: CardId },
    #[error("action needs phase {expected:?} but the game is in {actual:?}")]
    InvalidPhaseTransition {
        expected: GamePhase,
        actual: GamePhase,
    },
    #[error("player {player_id} already played a card this round")]
    CardAlreadyPlayed { player_id: PlayerId },
    #[error("both players must play before the round resolves")]
    RoundIncomplete,
    #[error("hand is empty")]
    EmptyHand,
    #[error("no card ids left after {next_id}")]
    CardIdsExhausted { next_id: CardId },
    #[error("player {player_id} does not exist")]
    PlayerNotFound { player_id: PlayerId },
    #[error("costs {required} but only {available} available")]
    InsufficientFunds { required: u32, available: u32 },
    #[error("no modifier named {name:?} in the shop")]
    UnknownModifier { name: String },
    #[error("{value:?} is not rock, paper or scissors")]
    UnknownMove { value: String },
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
    #[error("state integrity violated: {error:?}")]
    IntegrityViolation { error: IntegrityError },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RoundResult>,
}

impl RuleResolution {
    pub fn new(state: GameState, events: Vec<GameEvent>) -> Self {
        let result = events.iter().rev().find_map(|event| match event {
            GameEvent::RoundResolved { result, .. } => Some(result.clone()),
            _ => None,
        });
        Self {
            state,
            events,
            result,
        }
    }
}

/// 规则引擎，驱动 `GameState` 的阶段流转。`S` 为电脑座位选牌。
pub struct RuleEngine<S> {
    opponent: S,
}

impl<S: MoveSelector> RuleEngine<S> {
    pub fn new(opponent: S) -> Self {
        Self { opponent }
    }

    fn ensure_phase(state: &GameState, expected: GamePhase) -> Result<(), RuleError> {
        if state.phase != expected {
            warn!(?expected, actual = ?state.phase, "rejected phase transition");
            return Err(RuleError::InvalidPhaseTransition {
                expected,
                actual: state.phase,
            });
        }
        Ok(())
    }

    fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    fn events_since(state: &GameState, mark: usize) -> Vec<GameEvent> {
        state.event_log[mark..].to_vec()
    }

    fn commit<T: MoveSelector + ?Sized>(
        state: &mut GameState,
        player_id: PlayerId,
        selector: &mut T,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_integrity(state)?;
        Self::ensure_phase(state, GamePhase::Play)?;

        let mark = state.event_log.len();
        let player = state.player_mut(player_id)?;
        if player.played.is_played() {
            return Err(RuleError::CardAlreadyPlayed { player_id });
        }
        let card = player.play_with(selector)?;
        debug!(player = player_id, card = card.id(), mv = %card.mv(), "card played");
        state.record_event(GameEvent::CardPlayed { player_id, card });
        Ok(Self::events_since(state, mark))
    }

    pub fn begin_game(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_integrity(state)?;
        Self::ensure_phase(state, GamePhase::PreGame)?;

        let mark = state.event_log.len();
        state.round = 1;
        state.last_result = None;
        state.record_event(GameEvent::GameStarted { round: state.round });
        state.set_phase(GamePhase::Draw);
        info!("game started");
        Ok(Self::events_since(state, mark))
    }

    pub fn draw_hands(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_integrity(state)?;
        Self::ensure_phase(state, GamePhase::Draw)?;

        let mark = state.event_log.len();
        let mut players = state.players.clone();
        let mut drawn = Vec::with_capacity(players.len());
        for player in &mut players {
            let cards = player.make_hand()?.cards().to_vec();
            drawn.push(GameEvent::HandDrawn {
                player_id: player.id,
                cards,
            });
        }
        state.players = players;
        for event in drawn {
            state.record_event(event);
        }
        state.set_phase(GamePhase::Play);
        Ok(Self::events_since(state, mark))
    }

    pub fn play_card(
        &mut self,
        state: &mut GameState,
        action: PlayCardAction,
    ) -> Result<Vec<GameEvent>, RuleError> {
        let mut chosen = ChosenCard::new(action.card_id);
        Self::commit(state, action.player_id, &mut chosen)
    }

    /// 电脑出牌。已有预选时打出预选的那张。
    pub fn play_opponent(
        &mut self,
        state: &mut GameState,
        player_id: PlayerId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        let pending = state.player(player_id)?.pending_card().map(Card::id);
        match pending {
            Some(card_id) => Self::commit(state, player_id, &mut ChosenCard::new(card_id)),
            None => Self::commit(state, player_id, &mut self.opponent),
        }
    }

    /// 电脑预选一张牌但不打出；同一回合内重复调用返回同一张。
    pub fn preview_opponent(
        &mut self,
        state: &mut GameState,
        player_id: PlayerId,
    ) -> Result<Card, RuleError> {
        Self::ensure_integrity(state)?;
        Self::ensure_phase(state, GamePhase::Play)?;

        let player = state.player_mut(player_id)?;
        if player.played.is_played() {
            return Err(RuleError::CardAlreadyPlayed { player_id });
        }
        if let Some(card) = player.pending_card() {
            return Ok(card.clone());
        }
        let card = self.opponent.select_card(&player.hand)?;
        player.pending_pick = Some(card.id());
        debug!(player = player_id, card = card.id(), "opponent pick held");
        Ok(card)
    }

    pub fn resolve_round(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_integrity(state)?;
        Self::ensure_phase(state, GamePhase::Play)?;

        let p1 = state.player(0)?;
        let p2 = state.player(1)?;
        let (p1_card, p2_card) = match (&p1.played, &p2.played) {
            (PlayedCard::Played(a), PlayedCard::Played(b)) => (a, b),
            _ => return Err(RuleError::RoundIncomplete),
        };

        let base = RoundResult::new(p1_card.mv(), p2_card.mv(), state.round_payout);
        let result = apply_round_pipeline(base, &p1.round_pipeline, &p2.round_pipeline);

        let mark = state.event_log.len();
        if let Some(seat) = result.winner().seat() {
            let winner = state.player_mut(seat)?;
            winner.money = winner.money.saturating_add(result.money());
            state.record_event(GameEvent::MoneyAwarded {
                player_id: seat,
                amount: result.money(),
            });
        }
        info!(
            round = state.round,
            p1 = %result.p1_move(),
            p2 = %result.p2_move(),
            winner = %result.winner(),
            "round resolved"
        );
        state.record_event(GameEvent::RoundResolved {
            round: state.round,
            result: result.clone(),
        });
        state.last_result = Some(result);
        state.set_phase(GamePhase::Results);
        Ok(Self::events_since(state, mark))
    }

    pub fn open_shop(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_phase(state, GamePhase::Results)?;
        let mark = state.event_log.len();
        state.set_phase(GamePhase::Shop);
        Ok(Self::events_since(state, mark))
    }

    pub fn purchase(
        &mut self,
        state: &mut GameState,
        action: PurchaseAction,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_integrity(state)?;
        Self::ensure_phase(state, GamePhase::Shop)?;

        let modifier = RoundModifier::from_catalog(&action.modifier).ok_or_else(|| {
            RuleError::UnknownModifier {
                name: action.modifier.clone(),
            }
        })?;
        let player = state.player_mut(action.player_id)?;
        if player.money < modifier.cost {
            return Err(RuleError::InsufficientFunds {
                required: modifier.cost,
                available: player.money,
            });
        }
        player.money -= modifier.cost;
        let event = GameEvent::ModifierPurchased {
            player_id: action.player_id,
            name: modifier.name.clone(),
            cost: modifier.cost,
        };
        player.add_round_modifier(modifier);

        let mark = state.event_log.len();
        state.record_event(event);
        Ok(Self::events_since(state, mark))
    }

    /// 从结算或商店进入下一回合发牌。
    pub fn next_round(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        if !matches!(state.phase, GamePhase::Results | GamePhase::Shop) {
            return Err(RuleError::InvalidPhaseTransition {
                expected: GamePhase::Shop,
                actual: state.phase,
            });
        }
        let mark = state.event_log.len();
        state.round += 1;
        state.set_phase(GamePhase::Draw);
        Ok(Self::events_since(state, mark))
    }

    /// 执行当前阶段之后的那一步。
    pub fn advance_phase(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        match state.phase {
            GamePhase::PreGame => self.begin_game(state),
            GamePhase::Draw => self.draw_hands(state),
            GamePhase::Play => self.resolve_round(state),
            GamePhase::Results => self.open_shop(state),
            GamePhase::Shop => self.next_round(state),
        }
    }

    pub fn winner_of_last_round(state: &GameState) -> Option<Winner> {
        state.last_result.as_ref().map(RoundResult::winner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::RandomSelector;
    use crate::game::moves::Move;

    // Always plays the first card with the given move.
    struct Always(Move);

    impl MoveSelector for Always {
        fn select_card(&mut self, hand: &crate::game::Hand) -> Result<Card, RuleError> {
            hand.cards()
                .iter()
                .find(|card| card.mv() == self.0)
                .cloned()
                .ok_or(RuleError::EmptyHand)
        }
    }

    fn in_play(opponent: Move) -> (RuleEngine<Always>, GameState) {
        let mut engine = RuleEngine::new(Always(opponent));
        let mut state = GameState::default();
        engine.begin_game(&mut state).expect("begin");
        engine.draw_hands(&mut state).expect("draw");
        (engine, state)
    }

    fn card_id_of(state: &GameState, player_id: PlayerId, mv: Move) -> CardId {
        state
            .get_player(player_id)
            .and_then(|player| player.hand.cards().iter().find(|card| card.mv() == mv))
            .map(Card::id)
            .expect("move should be in hand")
    }

    #[test]
    fn rock_against_paper_pays_player_two() {
        let (mut engine, mut state) = in_play(Move::Paper);
        let rock = card_id_of(&state, 0, Move::Rock);
        engine
            .play_card(&mut state, PlayCardAction { player_id: 0, card_id: rock })
            .expect("rock is in hand");
        engine.play_opponent(&mut state, 1).expect("opponent plays");

        let events = engine.resolve_round(&mut state).expect("round resolves");
        assert_eq!(state.phase, GamePhase::Results);
        assert_eq!(RuleEngine::<Always>::winner_of_last_round(&state), Some(Winner::Player2));
        assert_eq!(state.players[1].money, 100);
        assert_eq!(state.players[0].money, 0);
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::MoneyAwarded { player_id: 1, amount: 100 })));
    }

    #[test]
    fn scissors_mirror_is_a_draw() {
        let (mut engine, mut state) = in_play(Move::Scissors);
        let scissors = card_id_of(&state, 0, Move::Scissors);
        engine
            .play_card(&mut state, PlayCardAction { player_id: 0, card_id: scissors })
            .expect("scissors is in hand");
        engine.play_opponent(&mut state, 1).expect("opponent plays");
        engine.resolve_round(&mut state).expect("round resolves");

        assert_eq!(state.last_result.as_ref().map(RoundResult::winner), Some(Winner::Draw));
        assert_eq!(state.players[0].hand.len(), 2);
        assert_eq!(state.players[1].hand.len(), 2);
        assert!(state.players.iter().all(|player| player.money == 0));
    }

    #[test]
    fn wrong_phase_is_rejected_without_changes() {
        let mut engine = RuleEngine::new(Always(Move::Rock));
        let mut state = GameState::default();
        let before = state.clone();

        let err = engine.draw_hands(&mut state).unwrap_err();
        assert_eq!(
            err,
            RuleError::InvalidPhaseTransition {
                expected: GamePhase::Draw,
                actual: GamePhase::PreGame
            }
        );
        assert!(engine.resolve_round(&mut state).is_err());
        assert!(engine.open_shop(&mut state).is_err());
        assert!(engine.next_round(&mut state).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn second_play_in_same_round_is_rejected() {
        let (mut engine, mut state) = in_play(Move::Rock);
        let paper = card_id_of(&state, 0, Move::Paper);
        let rock = card_id_of(&state, 0, Move::Rock);
        engine
            .play_card(&mut state, PlayCardAction { player_id: 0, card_id: paper })
            .expect("paper is in hand");
        let err = engine
            .play_card(&mut state, PlayCardAction { player_id: 0, card_id: rock })
            .unwrap_err();
        assert_eq!(err, RuleError::CardAlreadyPlayed { player_id: 0 });
        assert_eq!(state.players[0].hand.len(), 2);
    }

    #[test]
    fn missing_card_is_reported() {
        let (mut engine, mut state) = in_play(Move::Rock);
        let err = engine
            .play_card(&mut state, PlayCardAction { player_id: 0, card_id: 77 })
            .unwrap_err();
        assert_eq!(err, RuleError::CardNotInHand { card_id: 77 });
        assert!(!state.players[0].played.is_played());
    }

    #[test]
    fn resolve_needs_both_cards() {
        let (mut engine, mut state) = in_play(Move::Rock);
        assert_eq!(engine.resolve_round(&mut state), Err(RuleError::RoundIncomplete));
        engine.play_opponent(&mut state, 1).expect("opponent plays");
        assert_eq!(engine.resolve_round(&mut state), Err(RuleError::RoundIncomplete));
    }

    #[test]
    fn preview_does_not_commit() {
        let (mut engine, mut state) = in_play(Move::Scissors);
        let card = engine.preview_opponent(&mut state, 1).expect("preview");
        assert_eq!(card.mv(), Move::Scissors);
        assert_eq!(state.players[1].hand.len(), 3);
        assert!(!state.players[1].played.is_played());
        assert_eq!(state.players[1].pending_pick, Some(card.id()));
    }

    #[test]
    fn previewed_card_is_the_one_played() {
        for seed in 0..50 {
            let mut engine = RuleEngine::new(RandomSelector::with_seed(seed));
            let mut state = GameState::default();
            engine.begin_game(&mut state).expect("begin");
            engine.draw_hands(&mut state).expect("draw");

            let preview = engine.preview_opponent(&mut state, 1).expect("preview");
            let again = engine.preview_opponent(&mut state, 1).expect("second preview");
            assert_eq!(again, preview, "seed {seed}");

            engine.play_opponent(&mut state, 1).expect("opponent plays");
            assert_eq!(state.players[1].played.card(), Some(&preview), "seed {seed}");
            assert_eq!(state.players[1].pending_pick, None);
            assert_eq!(
                engine.preview_opponent(&mut state, 1),
                Err(RuleError::CardAlreadyPlayed { player_id: 1 })
            );
        }
    }

    #[test]
    fn exhausted_ids_fail_the_draw_without_changes() {
        let mut engine = RuleEngine::new(Always(Move::Rock));
        let mut state = GameState::default();
        engine.begin_game(&mut state).expect("begin");
        let json = format!(r#"{{"id":1,"next_card_id":{}}}"#, CardId::MAX);
        state.players[1] = serde_json::from_str(&json).expect("player json");
        let before = state.clone();

        let err = engine.draw_hands(&mut state).unwrap_err();
        assert_eq!(err, RuleError::CardIdsExhausted { next_id: CardId::MAX });
        assert_eq!(state, before);
    }

    #[test]
    fn shop_purchase_debits_once() {
        let mut engine = RuleEngine::new(Always(Move::Rock));
        let mut state = GameState::default().with_phase(GamePhase::Shop);
        state.players[0].money = 120;

        let action = PurchaseAction {
            player_id: 0,
            modifier: "Lucky Coin".into(),
        };
        engine.purchase(&mut state, action.clone()).expect("affordable");
        assert_eq!(state.players[0].money, 20);
        assert_eq!(state.players[0].round_pipeline.len(), 1);

        let err = engine.purchase(&mut state, action).unwrap_err();
        assert_eq!(
            err,
            RuleError::InsufficientFunds {
                required: 100,
                available: 20
            }
        );
        assert_eq!(state.players[0].round_pipeline.len(), 1);

        let err = engine
            .purchase(
                &mut state,
                PurchaseAction {
                    player_id: 0,
                    modifier: "Time Machine".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, RuleError::UnknownModifier { .. }));
    }

    #[test]
    fn purchased_modifier_changes_payout() {
        let (mut engine, mut state) = in_play(Move::Rock);
        state.players[0].add_round_modifier(
            RoundModifier::from_catalog("Double Down").expect("in catalog"),
        );
        let paper = card_id_of(&state, 0, Move::Paper);
        engine
            .play_card(&mut state, PlayCardAction { player_id: 0, card_id: paper })
            .expect("paper is in hand");
        engine.play_opponent(&mut state, 1).expect("opponent plays");
        engine.resolve_round(&mut state).expect("round resolves");
        assert_eq!(state.players[0].money, 200);
    }

    #[test]
    fn advance_walks_every_phase() {
        let mut engine = RuleEngine::new(Always(Move::Rock));
        let mut state = GameState::default();

        engine.advance_phase(&mut state).expect("pregame -> draw");
        assert_eq!(state.phase, GamePhase::Draw);
        engine.advance_phase(&mut state).expect("draw -> play");
        assert_eq!(state.phase, GamePhase::Play);

        engine.play_opponent(&mut state, 0).expect("seat 0 auto-plays");
        engine.play_opponent(&mut state, 1).expect("seat 1 auto-plays");
        engine.advance_phase(&mut state).expect("play -> results");
        assert_eq!(state.phase, GamePhase::Results);
        engine.advance_phase(&mut state).expect("results -> shop");
        assert_eq!(state.phase, GamePhase::Shop);
        engine.advance_phase(&mut state).expect("shop -> draw");
        assert_eq!(state.phase, GamePhase::Draw);
        assert_eq!(state.round, 2);

        engine.advance_phase(&mut state).expect("redraw");
        assert!(state.players.iter().all(|player| player.hand.len() == 3));
        assert!(state.players.iter().all(|player| !player.played.is_played()));
    }
}
