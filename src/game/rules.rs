use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    config::GameConfig,
    deck::build_deck,
    state::{
        GameEvent, GameSession, IntegrityError, RevertTicket, SessionPhase, Snapshot, WinSummary,
    },
};
use crate::log;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum EngineError {
    InvalidConfiguration { reason: String },
    InvalidReference { index: usize, deck_size: usize },
    IntegrityViolation { error: IntegrityError },
}

impl EngineError {
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        EngineError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidConfiguration { reason } => {
                write!(f, "invalid configuration: {reason}")
            }
            EngineError::InvalidReference { index, deck_size } => {
                write!(f, "card index {index} is outside a deck of {deck_size}")
            }
            EngineError::IntegrityViolation { error } => {
                write!(f, "session integrity violated: {error:?}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// 一次引擎调用的结果与之后的棋盘。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealOutcome {
    pub accepted: bool,
    pub events: Vec<GameEvent>,
    pub snapshot: Snapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victory: Option<WinSummary>,
}

impl RevealOutcome {
    pub fn new(accepted: bool, events: Vec<GameEvent>, session: &GameSession) -> Self {
        Self {
            accepted,
            events,
            snapshot: session.snapshot(),
            victory: session.outcome,
        }
    }

    pub fn changed_cards(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(GameEvent::changed_card)
            .collect()
    }

    pub fn revert_ticket(&self) -> Option<RevertTicket> {
        self.events.iter().find_map(|event| match event {
            GameEvent::RevertScheduled { ticket } => Some(*ticket),
            _ => None,
        })
    }

    pub fn clock_started(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, GameEvent::ClockStarted))
    }

    pub fn clock_stopped(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, GameEvent::ClockStopped { .. }))
    }
}

pub type WinCallback = Box<dyn FnMut(&WinSummary)>;

/// 翻牌配对规则引擎。翻回由调用方凭 [`RevertTicket`] 在延迟后触发。
pub struct MatchEngine {
    config: GameConfig,
    session: GameSession,
    rng: SmallRng,
    next_ticket: u64,
    on_won: Option<WinCallback>,
    win_notified: bool,
}

impl MatchEngine {
    pub fn new(config: GameConfig) -> Result<Self, EngineError> {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    pub fn with_seed(config: GameConfig, seed: u64) -> Result<Self, EngineError> {
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(config: GameConfig, mut rng: SmallRng) -> Result<Self, EngineError> {
        config.validate().map_err(|error| {
            log::warn(&format!("rejected configuration: {error}"));
            error
        })?;
        let deck = build_deck(config.pair_count, &config.symbols, &mut rng)?;
        log::info(&format!(
            "match engine ready with {} pairs",
            config.pair_count
        ));
        Ok(Self {
            config,
            session: GameSession::new(deck),
            rng,
            next_ticket: 1,
            on_won: None,
            win_notified: false,
        })
    }

    /// 载入存档会话。
    pub fn restore(&mut self, session: GameSession) -> Result<(), EngineError> {
        session
            .integrity_check()
            .map_err(|error| EngineError::IntegrityViolation { error })?;
        if session.pair_count == 0 || session.pair_count as usize > self.config.symbols.len() {
            return Err(EngineError::invalid_configuration(format!(
                "saved game has {} pairs but the alphabet holds {} symbols",
                session.pair_count,
                self.config.symbols.len()
            )));
        }
        if let Some(ticket) = session.pending_revert {
            self.next_ticket = self.next_ticket.max(ticket.id + 1);
        }
        self.config.pair_count = session.pair_count;
        self.win_notified = session.is_won();
        self.session = session;
        Ok(())
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase
    }

    pub fn snapshot(&self) -> Snapshot {
        self.session.snapshot()
    }

    pub fn pending_revert(&self) -> Option<RevertTicket> {
        self.session.pending_revert
    }

    pub fn clock_running(&self) -> bool {
        self.session.clock_running()
    }

    /// 注册胜利回调，每局只触发一次。
    pub fn on_won<F>(&mut self, callback: F)
    where
        F: FnMut(&WinSummary) + 'static,
    {
        self.on_won = Some(Box::new(callback));
    }

    fn ignored(&self) -> RevealOutcome {
        RevealOutcome::new(false, Vec::new(), &self.session)
    }

    pub fn reveal_card(&mut self, index: usize) -> Result<RevealOutcome, EngineError> {
        let deck_size = self.session.deck.len();
        let card = self
            .session
            .deck
            .get(index)
            .ok_or(EngineError::InvalidReference { index, deck_size })?;

        if self.session.is_won()
            || self.session.is_locked()
            || card.is_matched()
            || self.session.pending.first() == Some(&index)
        {
            log::debug(
                "reveal_card",
                &format!("ignored index={index} phase={:?}", self.session.phase),
            );
            return Ok(self.ignored());
        }

        let mut events = Vec::new();
        match self.session.phase {
            SessionPhase::Idle => {
                events.extend(self.session.start_clock());
                events.extend(self.session.reveal(index));
                self.session.phase = SessionPhase::OneRevealed;
            }
            SessionPhase::OneRevealed => {
                events.extend(self.session.reveal(index));
                self.session.moves += 1;
                events.push(GameEvent::MoveCounted {
                    moves: self.session.moves,
                });
                self.session.phase = SessionPhase::Resolving;
                self.resolve_pair(&mut events);
            }
            SessionPhase::Resolving | SessionPhase::Won => return Ok(self.ignored()),
        }

        Ok(RevealOutcome::new(true, events, &self.session))
    }

    fn resolve_pair(&mut self, events: &mut Vec<GameEvent>) {
        let (first, second) = match self.session.pending.as_slice() {
            [first, second] => (*first, *second),
            _ => return,
        };

        if !self.session.symbols_match(first, second) {
            let ticket = RevertTicket {
                id: self.next_ticket,
                delay_ms: self.config.revert_delay_ms,
                cards: [first, second],
            };
            self.next_ticket += 1;
            self.session.pending_revert = Some(ticket);
            log::action(
                "mismatch",
                &format!("cards {first} and {second}, revert ticket {}", ticket.id),
            );
            events.push(GameEvent::PairMismatched { first, second });
            events.push(GameEvent::RevertScheduled { ticket });
            return;
        }

        events.extend(self.session.mark_matched(first));
        events.extend(self.session.mark_matched(second));
        self.session.matched_pairs += 1;
        self.session.pending.clear();
        self.session.phase = SessionPhase::Idle;
        events.push(GameEvent::PairMatched {
            first,
            second,
            matched_pairs: self.session.matched_pairs,
        });
        log::action(
            "match",
            &format!(
                "cards {first} and {second} ({}/{})",
                self.session.matched_pairs, self.session.pair_count
            ),
        );

        if self.session.matched_pairs == self.session.pair_count {
            events.push(GameEvent::ClockStopped {
                elapsed_time: self.session.elapsed_time,
            });
            let summary = self.session.declare_victory();
            events.push(GameEvent::GameWon {
                moves: summary.moves,
                elapsed_time: summary.elapsed_time,
            });
            self.log_session();
            self.notify_won(summary);
        }
    }

    fn notify_won(&mut self, summary: WinSummary) {
        if self.win_notified {
            return;
        }
        self.win_notified = true;
        log::info(&format!(
            "game won in {} moves and {}s",
            summary.moves, summary.elapsed_time
        ));
        if let Some(callback) = self.on_won.as_mut() {
            callback(&summary);
        }
    }

    /// 翻回未配对的两张牌，过期的票据会被忽略。
    pub fn complete_revert(&mut self, ticket_id: u64) -> RevealOutcome {
        let ticket = match self.session.pending_revert {
            Some(ticket) if ticket.id == ticket_id => ticket,
            _ => {
                log::debug("complete_revert", &format!("stale ticket {ticket_id}"));
                return self.ignored();
            }
        };

        let mut events = Vec::new();
        for index in ticket.cards {
            events.extend(self.session.hide(index));
        }
        self.session.pending.clear();
        self.session.pending_revert = None;
        self.session.phase = SessionPhase::Idle;

        RevealOutcome::new(true, events, &self.session)
    }

    /// 重新发牌；失败时保留当前对局。
    pub fn restart(&mut self, pair_count: Option<u32>) -> Result<RevealOutcome, EngineError> {
        let pair_count = pair_count.unwrap_or(self.config.pair_count);
        let deck = build_deck(pair_count, &self.config.symbols, &mut self.rng).map_err(|error| {
            log::warn(&format!("restart rejected: {error}"));
            error
        })?;

        let mut events = Vec::new();
        if let Some(ticket) = self.session.pending_revert.take() {
            events.push(GameEvent::RevertCancelled {
                ticket_id: ticket.id,
            });
        }
        if self.session.clock_running() {
            events.push(GameEvent::ClockStopped {
                elapsed_time: self.session.elapsed_time,
            });
        }
        events.push(GameEvent::SessionStarted { pair_count });

        self.config.pair_count = pair_count;
        self.session = GameSession::new(deck);
        self.win_notified = false;
        log::action("restart", &format!("pairs={pair_count}"));

        Ok(RevealOutcome::new(true, events, &self.session))
    }

    pub fn tick(&mut self) -> bool {
        self.session.tick()
    }

    fn log_session(&self) {
        log::session_summary(
            self.session.phase,
            self.session.moves,
            self.session.elapsed_time,
            self.session.matched_pairs,
            self.session.pair_count,
        );
    }
}
