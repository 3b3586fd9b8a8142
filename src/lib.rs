pub mod ai;
pub mod config;
pub mod game;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::RandomSelector;
pub use config::{DisplayOptions, GameConfig, OpponentConfig};
pub use game::{
    apply_hand_pipeline, apply_round_pipeline, resolve, Card, CardId, ChosenCard, GameEvent,
    GamePhase, GameState, Hand, HandModifier, IntegrityError, Move, MoveSelector, PlayCardAction,
    PlayedCard, Player, PlayerId, PurchaseAction, RoundEffect, RoundModifier, RoundResult,
    RuleEngine, RuleError, RuleResolution, Winner,
};

use utils::{console_log, set_panic_hook};

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// 玩家座位。
const HUMAN_SEAT: PlayerId = 0;
/// 电脑座位。
const OPPONENT_SEAT: PlayerId = 1;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

fn parse_config(config_json: Option<String>) -> Result<GameConfig, JsValue> {
    match config_json {
        Some(json) => GameConfig::from_json(&json).map_err(to_js_error),
        None => Ok(GameConfig::default()),
    }
}

#[wasm_bindgen]
pub struct GameSession {
    state: GameState,
    engine: RuleEngine<RandomSelector>,
    config: GameConfig,
}

#[wasm_bindgen]
impl GameSession {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<GameSession, JsValue> {
        let config = parse_config(config_json)?;
        let engine = RuleEngine::new(RandomSelector::from_config(&config.opponent));
        let state = GameState::new(&config);
        console_log(&format!(
            "session ready: payout {}, emoji {}",
            config.round_payout, config.display.emoji
        ));
        Ok(GameSession {
            state,
            engine,
            config,
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        state
            .integrity_check()
            .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
        self.state = state;
        Ok(())
    }

    pub fn phase(&self) -> Result<JsValue, JsValue> {
        to_value(&self.state.phase).map_err(JsValue::from)
    }

    pub fn begin_game(&mut self) -> Result<String, JsValue> {
        self.transact(|engine, state| engine.begin_game(state))
    }

    pub fn draw_hands(&mut self) -> Result<String, JsValue> {
        self.transact(|engine, state| engine.draw_hands(state))
    }

    /// 玩家出牌、电脑应对并结算，任一步失败则会话不变。
    pub fn play_card(&mut self, card_id: CardId) -> Result<String, JsValue> {
        self.transact(|engine, state| {
            let action = PlayCardAction {
                player_id: HUMAN_SEAT,
                card_id,
            };
            let mut events = engine.play_card(state, action)?;
            events.extend(engine.play_opponent(state, OPPONENT_SEAT)?);
            events.extend(engine.resolve_round(state)?);
            Ok(events)
        })
    }

    /// 为任意座位出牌，不结算。
    pub fn play_card_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: PlayCardAction =
            serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        self.transact(|engine, state| engine.play_card(state, action))
    }

    pub fn play_opponent(&mut self) -> Result<String, JsValue> {
        self.transact(|engine, state| engine.play_opponent(state, OPPONENT_SEAT))
    }

    pub fn resolve_round(&mut self) -> Result<String, JsValue> {
        self.transact(|engine, state| engine.resolve_round(state))
    }

    pub fn advance_phase(&mut self) -> Result<String, JsValue> {
        self.transact(|engine, state| engine.advance_phase(state))
    }

    pub fn purchase(&mut self, modifier: String) -> Result<String, JsValue> {
        self.transact(|engine, state| {
            engine.purchase(
                state,
                PurchaseAction {
                    player_id: HUMAN_SEAT,
                    modifier,
                },
            )
        })
    }

    pub fn add_hand_modifier_json(&mut self, player_id: PlayerId, json: &str) -> Result<(), JsValue> {
        let modifier: HandModifier = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.state
            .player_mut(player_id)
            .map_err(to_js_error)?
            .add_hand_modifier(modifier);
        Ok(())
    }

    pub fn emoji(&self) -> bool {
        self.state.display.emoji
    }

    pub fn set_emoji(&mut self, emoji: bool) {
        self.state.display.emoji = emoji;
    }

    pub fn toggle_emoji(&mut self) -> bool {
        self.state.display.emoji = !self.state.display.emoji;
        self.state.display.emoji
    }

    pub fn describe_hand(&self, player_id: PlayerId) -> Result<String, JsValue> {
        let player = self.state.player(player_id).map_err(to_js_error)?;
        Ok(player.hand.describe(self.state.display.emoji))
    }

    /// 电脑立即预选，延迟后返回所选的牌；随后的出牌会打出同一张。
    pub fn think_opponent(&mut self, delay_ms: Option<u32>) -> Promise {
        let delay = delay_ms.unwrap_or(self.config.opponent.think_delay_ms);
        let mut next = self.state.clone();
        let picked = self
            .engine
            .preview_opponent(&mut next, OPPONENT_SEAT)
            .map_err(to_js_error)
            .and_then(|card| serde_json::to_string(&card).map_err(serde_to_js_error));
        if picked.is_ok() {
            self.state = next;
        }

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            picked.map(|json| JsValue::from_str(&json))
        })
    }
}

impl GameSession {
    /// 在状态副本上执行 `action`，成功后才替换原状态。
    fn transact<F>(&mut self, action: F) -> Result<String, JsValue>
    where
        F: FnOnce(
            &mut RuleEngine<RandomSelector>,
            &mut GameState,
        ) -> Result<Vec<GameEvent>, RuleError>,
    {
        let mut next = self.state.clone();
        let events = action(&mut self.engine, &mut next).map_err(to_js_error)?;
        self.state = next;
        make_resolution_json(RuleResolution::new(self.state.clone(), events))
    }
}

/// 判定两个手势（文字或 emoji）的胜负。
#[wasm_bindgen(js_name = "resolveRound")]
pub fn resolve_round(p1: &str, p2: &str) -> Result<String, JsValue> {
    let p1: Move = p1.parse().map_err(to_js_error)?;
    let p2: Move = p2.parse().map_err(to_js_error)?;
    let result = RoundResult::new(p1, p2, game::DEFAULT_ROUND_PAYOUT);
    serde_json::to_string(&result).map_err(serde_to_js_error)
}

#[wasm_bindgen(js_name = "randomMove")]
pub fn random_move(emoji: bool) -> String {
    Move::random(&mut rand::thread_rng()).label(emoji).to_string()
}

#[wasm_bindgen(js_name = "shopCatalog")]
pub fn shop_catalog() -> Result<JsValue, JsValue> {
    to_value(&RoundModifier::catalog()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state(config_json: Option<String>) -> Result<JsValue, JsValue> {
    let config = parse_config(config_json)?;
    to_value(&GameState::new(&config)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}
