//! 会话配置，由前端传入的 JSON 解析。

use serde::{Deserialize, Serialize};

use crate::game::{RuleError, DEFAULT_ROUND_PAYOUT};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayOptions {
    /// 用 emoji 而非文字显示手势。
    pub emoji: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OpponentConfig {
    /// 固定随机种子；缺省时使用系统熵。
    pub seed: Option<u64>,
    pub think_delay_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameConfig {
    pub display: DisplayOptions,
    pub starting_money: u32,
    pub round_payout: u32,
    pub opponent: OpponentConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            display: DisplayOptions::default(),
            starting_money: 0,
            round_payout: DEFAULT_ROUND_PAYOUT,
            opponent: OpponentConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        serde_json::from_str(json).map_err(|error| RuleError::InvalidConfig {
            message: error.to_string(),
        })
    }
}
