use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::deck::{CardStatus, Deck};

/// 对局阶段。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Idle,
    /// 已翻开一张，等待第二张。
    OneRevealed,
    /// 两张未配对，棋盘锁定。
    Resolving,
    Won,
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Idle
    }
}

/// 胜利时的成绩。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WinSummary {
    pub moves: u32,
    pub elapsed_time: u32,
}

/// 待执行的翻回票据。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevertTicket {
    pub id: u64,
    pub delay_ms: u32,
    pub cards: [usize; 2],
}

/// 对局事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    SessionStarted {
        pair_count: u32,
    },
    ClockStarted,
    ClockStopped {
        elapsed_time: u32,
    },
    CardRevealed {
        index: usize,
        symbol: String,
    },
    CardHidden {
        index: usize,
    },
    CardMatched {
        index: usize,
    },
    MoveCounted {
        moves: u32,
    },
    PairMatched {
        first: usize,
        second: usize,
        matched_pairs: u32,
    },
    PairMismatched {
        first: usize,
        second: usize,
    },
    RevertScheduled {
        ticket: RevertTicket,
    },
    RevertCancelled {
        ticket_id: u64,
    },
    GameWon {
        moves: u32,
        elapsed_time: u32,
    },
}

impl GameEvent {
    pub fn changed_card(&self) -> Option<usize> {
        match self {
            GameEvent::CardRevealed { index, .. }
            | GameEvent::CardHidden { index }
            | GameEvent::CardMatched { index } => Some(*index),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    DeckSizeMismatch { expected: usize, actual: usize },
    IndexMismatch { position: usize, index: usize },
    SymbolCount { symbol: String, count: usize },
    PendingOverflow { len: usize },
    PendingOutOfRange { index: usize },
    PendingNotRevealed { index: usize },
    MatchedCountMismatch { expected: u32, actual: u32 },
    PhaseMismatch { phase: SessionPhase, pending: usize },
    StrayRevealed { index: usize },
    OutcomeMismatch { phase: SessionPhase, matched_pairs: u32, pair_count: u32 },
    MissingRevertTicket,
    UnexpectedRevertTicket { phase: SessionPhase },
    RevertTicketMismatch { ticket: [usize; 2], pending: Vec<usize> },
}

/// 给前端的卡牌视图，背面朝上时不带符号。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardView {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub status: CardStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub moves: u32,
    pub elapsed_time: u32,
    pub matched_pairs: u32,
    pub pair_count: u32,
    pub phase: SessionPhase,
    pub cards: Vec<CardView>,
}

/// 一局游戏的完整状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSession {
    pub deck: Deck,
    pub pair_count: u32,
    pub moves: u32,
    pub elapsed_time: u32,
    pub matched_pairs: u32,
    #[serde(default)]
    pub phase: SessionPhase,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending: Vec<usize>,
    #[serde(default)]
    pub started: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_revert: Option<RevertTicket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<WinSummary>,
}

impl GameSession {
    pub fn new(deck: Deck) -> Self {
        Self {
            pair_count: deck.pair_count() as u32,
            deck,
            moves: 0,
            elapsed_time: 0,
            matched_pairs: 0,
            phase: SessionPhase::Idle,
            pending: Vec::with_capacity(2),
            started: false,
            pending_revert: None,
            outcome: None,
        }
    }

    pub fn is_won(&self) -> bool {
        self.phase == SessionPhase::Won
    }

    pub fn is_locked(&self) -> bool {
        self.phase == SessionPhase::Resolving
    }

    pub fn clock_running(&self) -> bool {
        self.started && !self.is_won()
    }

    pub fn start_clock(&mut self) -> Option<GameEvent> {
        if self.started {
            return None;
        }
        self.started = true;
        Some(GameEvent::ClockStarted)
    }

    pub fn tick(&mut self) -> bool {
        if !self.clock_running() {
            return false;
        }
        self.elapsed_time = self.elapsed_time.saturating_add(1);
        true
    }

    pub fn reveal(&mut self, index: usize) -> Option<GameEvent> {
        let card = self.deck.get_mut(index)?;
        card.status = CardStatus::Revealed;
        self.pending.push(index);
        Some(GameEvent::CardRevealed {
            index,
            symbol: card.symbol.clone(),
        })
    }

    pub fn hide(&mut self, index: usize) -> Option<GameEvent> {
        let card = self.deck.get_mut(index)?;
        if card.status != CardStatus::Revealed {
            return None;
        }
        card.status = CardStatus::Hidden;
        Some(GameEvent::CardHidden { index })
    }

    pub fn mark_matched(&mut self, index: usize) -> Option<GameEvent> {
        let card = self.deck.get_mut(index)?;
        card.status = CardStatus::Matched;
        Some(GameEvent::CardMatched { index })
    }

    pub fn symbols_match(&self, first: usize, second: usize) -> bool {
        match (self.deck.get(first), self.deck.get(second)) {
            (Some(a), Some(b)) => a.symbol == b.symbol,
            _ => false,
        }
    }

    pub fn declare_victory(&mut self) -> WinSummary {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        let summary = WinSummary {
            moves: self.moves,
            elapsed_time: self.elapsed_time,
        };
        self.phase = SessionPhase::Won;
        self.pending.clear();
        self.pending_revert = None;
        self.outcome = Some(summary);
        summary
    }

    pub fn snapshot(&self) -> Snapshot {
        let cards = self
            .deck
            .cards()
            .iter()
            .map(|card| CardView {
                index: card.index,
                symbol: (!card.is_hidden()).then(|| card.symbol.clone()),
                status: card.status,
            })
            .collect();

        Snapshot {
            moves: self.moves,
            elapsed_time: self.elapsed_time,
            matched_pairs: self.matched_pairs,
            pair_count: self.pair_count,
            phase: self.phase,
            cards,
        }
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let expected = self.pair_count as usize * 2;
        if self.deck.len() != expected {
            return Err(IntegrityError::DeckSizeMismatch {
                expected,
                actual: self.deck.len(),
            });
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut matched_cards = 0u32;
        for (position, card) in self.deck.cards().iter().enumerate() {
            if card.index != position {
                return Err(IntegrityError::IndexMismatch {
                    position,
                    index: card.index,
                });
            }
            *counts.entry(card.symbol.as_str()).or_insert(0) += 1;
            if card.is_matched() {
                matched_cards += 1;
            }
        }
        if let Some((symbol, count)) = counts.into_iter().find(|(_, count)| *count != 2) {
            return Err(IntegrityError::SymbolCount {
                symbol: symbol.to_string(),
                count,
            });
        }

        if matched_cards != self.matched_pairs * 2 {
            return Err(IntegrityError::MatchedCountMismatch {
                expected: self.matched_pairs * 2,
                actual: matched_cards,
            });
        }

        if self.pending.len() > 2 {
            return Err(IntegrityError::PendingOverflow {
                len: self.pending.len(),
            });
        }
        for &index in &self.pending {
            match self.deck.get(index) {
                None => return Err(IntegrityError::PendingOutOfRange { index }),
                Some(card) if card.status != CardStatus::Revealed => {
                    return Err(IntegrityError::PendingNotRevealed { index })
                }
                Some(_) => {}
            }
        }

        let expected_pending = match self.phase {
            SessionPhase::Idle | SessionPhase::Won => 0,
            SessionPhase::OneRevealed => 1,
            SessionPhase::Resolving => 2,
        };
        if self.pending.len() != expected_pending {
            return Err(IntegrityError::PhaseMismatch {
                phase: self.phase,
                pending: self.pending.len(),
            });
        }

        if let Some(card) = self
            .deck
            .cards()
            .iter()
            .find(|card| card.status == CardStatus::Revealed && !self.pending.contains(&card.index))
        {
            return Err(IntegrityError::StrayRevealed { index: card.index });
        }

        if self.is_won() != (self.matched_pairs == self.pair_count) {
            return Err(IntegrityError::OutcomeMismatch {
                phase: self.phase,
                matched_pairs: self.matched_pairs,
                pair_count: self.pair_count,
            });
        }

        match (self.phase, self.pending_revert) {
            (SessionPhase::Resolving, None) => return Err(IntegrityError::MissingRevertTicket),
            (SessionPhase::Resolving, Some(ticket)) if ticket.cards[..] != self.pending[..] => {
                return Err(IntegrityError::RevertTicketMismatch {
                    ticket: ticket.cards,
                    pending: self.pending.clone(),
                })
            }
            (SessionPhase::Resolving, Some(_)) | (_, None) => {}
            (phase, Some(_)) => return Err(IntegrityError::UnexpectedRevertTicket { phase }),
        }

        Ok(())
    }
}
