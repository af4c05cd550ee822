use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::deck::DEFAULT_SYMBOLS;
use super::rules::EngineError;

const DEFAULT_PAIR_COUNT: u32 = 8;
const DEFAULT_REVERT_DELAY_MS: u32 = 1000;
const DEFAULT_TICK_INTERVAL_MS: u32 = 1000;

const MOBILE_MAX_WIDTH: u32 = 480;
const TABLET_MAX_WIDTH: u32 = 768;

/// 视口布局档位，决定棋盘上的牌对数量。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayoutPreset {
    /// 3x2 棋盘
    Mobile,
    /// 4x4 棋盘
    Tablet,
    /// 6x4 棋盘
    Desktop,
}

impl LayoutPreset {
    pub fn for_viewport_width(width: u32) -> Self {
        if width <= MOBILE_MAX_WIDTH {
            LayoutPreset::Mobile
        } else if width <= TABLET_MAX_WIDTH {
            LayoutPreset::Tablet
        } else {
            LayoutPreset::Desktop
        }
    }

    pub fn pair_count(self) -> u32 {
        match self {
            LayoutPreset::Mobile => 3,
            LayoutPreset::Tablet => 8,
            LayoutPreset::Desktop => 12,
        }
    }
}

impl FromStr for LayoutPreset {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mobile" | "phone" => Ok(LayoutPreset::Mobile),
            "tablet" => Ok(LayoutPreset::Tablet),
            "desktop" | "wide" => Ok(LayoutPreset::Desktop),
            _ => Err(()),
        }
    }
}

/// 引擎参数，时间单位为毫秒。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    #[serde(default = "default_pair_count")]
    pub pair_count: u32,
    #[serde(default = "default_revert_delay")]
    pub revert_delay_ms: u32,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u32,
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
}

fn default_pair_count() -> u32 {
    DEFAULT_PAIR_COUNT
}

fn default_revert_delay() -> u32 {
    DEFAULT_REVERT_DELAY_MS
}

fn default_tick_interval() -> u32 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_symbols() -> Vec<String> {
    DEFAULT_SYMBOLS.iter().map(|symbol| symbol.to_string()).collect()
}

impl GameConfig {
    pub fn from_layout(preset: LayoutPreset) -> Self {
        Self::default().with_pair_count(preset.pair_count())
    }

    pub fn with_pair_count(mut self, pair_count: u32) -> Self {
        self.pair_count = pair_count;
        self
    }

    pub fn with_revert_delay(mut self, delay_ms: u32) -> Self {
        self.revert_delay_ms = delay_ms;
        self
    }

    pub fn with_symbols<S: Into<String>>(mut self, symbols: impl IntoIterator<Item = S>) -> Self {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tick_interval_ms == 0 {
            return Err(EngineError::invalid_configuration(
                "tick interval must be greater than zero",
            ));
        }
        if self.pair_count == 0 {
            return Err(EngineError::invalid_configuration(
                "pair count must be greater than zero",
            ));
        }
        if self.pair_count as usize > self.symbols.len() {
            return Err(EngineError::invalid_configuration(format!(
                "pair count {} exceeds alphabet of {} symbols",
                self.pair_count,
                self.symbols.len()
            )));
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            pair_count: DEFAULT_PAIR_COUNT,
            revert_delay_ms: DEFAULT_REVERT_DELAY_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            symbols: default_symbols(),
        }
    }
}
