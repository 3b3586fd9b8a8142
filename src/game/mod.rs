//! 游戏核心逻辑（手势、手牌、修饰器管线、规则引擎）。

pub mod modifiers;
pub mod moves;
pub mod rules;
pub mod selector;
pub mod state;

pub use modifiers::{
    apply_hand_pipeline,
    apply_round_pipeline,
    HandModifier,
    RoundEffect,
    RoundModifier,
};
pub use moves::{resolve, Move, Winner};
pub use rules::{PlayCardAction, PurchaseAction, RuleEngine, RuleError, RuleResolution};
pub use selector::{ChosenCard, MoveSelector};
pub use state::{
    Card,
    CardId,
    GameEvent,
    GamePhase,
    GameState,
    Hand,
    IntegrityError,
    PlayedCard,
    Player,
    PlayerId,
    RoundResult,
    DEFAULT_ROUND_PAYOUT,
};
