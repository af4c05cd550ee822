//! 游戏核心逻辑模块（发牌、状态机、配置）。

pub mod config;
pub mod deck;
pub mod rules;
pub mod state;

pub use config::{GameConfig, LayoutPreset};
pub use deck::{build_deck, shuffle, Card, CardStatus, Deck, DEFAULT_SYMBOLS};
pub use rules::{EngineError, MatchEngine, RevealOutcome, WinCallback};
pub use state::{
    CardView,
    GameEvent,
    GameSession,
    IntegrityError,
    RevertTicket,
    SessionPhase,
    Snapshot,
    WinSummary,
};
