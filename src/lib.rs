pub mod game;
pub mod log;
pub mod timers;

use gloo_timers::future::TimeoutFuture;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::{Function, Promise};

pub use game::{
    build_deck, shuffle, Card, CardStatus, CardView, Deck, EngineError, GameConfig, GameEvent,
    GameSession, IntegrityError, LayoutPreset, MatchEngine, RevealOutcome, RevertTicket,
    SessionPhase, Snapshot, WinSummary, DEFAULT_SYMBOLS,
};
use timers::BoardTimers;

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    init_logging();
}

fn to_js_error(error: EngineError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn call_js(callback: &Option<Function>, value: &JsValue) {
    if let Some(function) = callback {
        if let Err(error) = function.call1(&JsValue::NULL, value) {
            log::warn(&format!("js callback threw: {error:?}"));
        }
    }
}

/// `GameEngine` 与计时器闭包共享的状态。调用 JS 回调时不持有任何借用。
#[derive(Clone)]
struct Shared {
    engine: Rc<RefCell<MatchEngine>>,
    timers: Rc<RefCell<BoardTimers>>,
    won: Rc<Cell<Option<WinSummary>>>,
    auto_clock: Rc<Cell<bool>>,
    on_change: Rc<RefCell<Option<Function>>>,
    on_won: Rc<RefCell<Option<Function>>>,
}

impl Shared {
    fn new(mut engine: MatchEngine) -> Self {
        let won = Rc::new(Cell::new(None));
        let slot = Rc::clone(&won);
        engine.on_won(move |summary| slot.set(Some(*summary)));
        Self {
            engine: Rc::new(RefCell::new(engine)),
            timers: Rc::new(RefCell::new(BoardTimers::default())),
            won,
            auto_clock: Rc::new(Cell::new(true)),
            on_change: Rc::new(RefCell::new(None)),
            on_won: Rc::new(RefCell::new(None)),
        }
    }

    /// 按结果挂上或清除计时器。
    fn schedule(&self, outcome: &RevealOutcome) {
        if let Some(ticket) = outcome.revert_ticket() {
            self.arm_revert(ticket);
        }
        if outcome.clock_started() && self.auto_clock.get() {
            self.arm_clock();
        }
        if outcome.clock_stopped() {
            self.timers.borrow_mut().stop_clock();
        }
    }

    fn arm_revert(&self, ticket: RevertTicket) {
        let shared = self.clone();
        self.timers
            .borrow_mut()
            .schedule_revert(ticket.delay_ms, move || {
                let outcome = shared.engine.borrow_mut().complete_revert(ticket.id);
                if outcome.accepted {
                    shared.emit_change(&outcome);
                }
            });
    }

    fn arm_clock(&self) {
        let interval = self.engine.borrow().config().tick_interval_ms;
        let shared = self.clone();
        self.timers.borrow_mut().start_clock(interval, move || {
            let ticked = shared.engine.borrow_mut().tick();
            if ticked {
                let snapshot = shared.engine.borrow().snapshot();
                shared.emit_change(&snapshot);
            }
        });
    }

    /// 恢复存档后按会话状态重新挂上计时器。
    fn rearm(&self) {
        self.timers.borrow_mut().cancel_all();
        let (pending, clock_running) = {
            let engine = self.engine.borrow();
            (engine.pending_revert(), engine.clock_running())
        };
        if let Some(ticket) = pending {
            self.arm_revert(ticket);
        }
        if clock_running && self.auto_clock.get() {
            self.arm_clock();
        }
    }

    fn emit_change<T: Serialize>(&self, payload: &T) {
        let callback = self.on_change.borrow().clone();
        match to_value(payload) {
            Ok(value) => call_js(&callback, &value),
            Err(error) => log::warn(&format!("onChange payload failed to serialize: {error}")),
        }
    }

    fn flush_win(&self) {
        let Some(summary) = self.won.take() else {
            return;
        };
        let callback = self.on_won.borrow().clone();
        match to_value(&summary) {
            Ok(value) => call_js(&callback, &value),
            Err(error) => log::warn(&format!("onWon payload failed to serialize: {error}")),
        }
    }

    fn finish(&self, outcome: RevealOutcome) -> Result<JsValue, JsValue> {
        self.schedule(&outcome);
        let value = to_value(&outcome).map_err(JsValue::from);
        self.flush_win();
        value
    }
}

/// 浏览器侧的翻牌引擎，持有翻回计时器和秒表。
#[wasm_bindgen]
pub struct GameEngine {
    shared: Shared,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>, seed: Option<u64>) -> Result<GameEngine, JsValue> {
        let config = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => GameConfig::default(),
        };
        let engine = match seed {
            Some(seed) => MatchEngine::with_seed(config, seed),
            None => MatchEngine::new(config),
        }
        .map_err(to_js_error)?;
        Ok(GameEngine {
            shared: Shared::new(engine),
        })
    }

    #[wasm_bindgen(js_name = "forViewport")]
    pub fn for_viewport(width: u32, seed: Option<u64>) -> Result<GameEngine, JsValue> {
        let config = GameConfig::from_layout(LayoutPreset::for_viewport_width(width));
        let json = serde_json::to_string(&config).map_err(serde_to_js_error)?;
        GameEngine::new(Some(json), seed)
    }

    #[wasm_bindgen(js_name = "revealCard")]
    pub fn reveal_card(&self, index: usize) -> Result<JsValue, JsValue> {
        let outcome = self
            .shared
            .engine
            .borrow_mut()
            .reveal_card(index)
            .map_err(to_js_error)?;
        self.shared.finish(outcome)
    }

    pub fn restart(&self, pair_count: Option<u32>) -> Result<JsValue, JsValue> {
        let outcome = self
            .shared
            .engine
            .borrow_mut()
            .restart(pair_count)
            .map_err(to_js_error)?;
        self.shared.timers.borrow_mut().cancel_all();
        self.shared.won.set(None);
        self.shared.finish(outcome)
    }

    #[wasm_bindgen(js_name = "restartForViewport")]
    pub fn restart_for_viewport(&self, width: u32) -> Result<JsValue, JsValue> {
        self.restart(Some(LayoutPreset::for_viewport_width(width).pair_count()))
    }

    /// 手动走一秒，配合 `setAutoClock(false)` 使用。
    pub fn tick(&self) -> bool {
        self.shared.engine.borrow_mut().tick()
    }

    #[wasm_bindgen(js_name = "setAutoClock")]
    pub fn set_auto_clock(&self, enabled: bool) {
        self.shared.auto_clock.set(enabled);
        if !enabled {
            self.shared.timers.borrow_mut().stop_clock();
            return;
        }
        let running = self.shared.engine.borrow().clock_running();
        if running {
            self.shared.arm_clock();
        }
    }

    /// 等待延迟后翻回未配对的两张牌；没有待翻回时直接返回快照。
    #[wasm_bindgen(js_name = "settleAsync")]
    pub fn settle_async(&self) -> Promise {
        let shared = self.shared.clone();
        let ticket = shared.engine.borrow().pending_revert();

        future_to_promise(async move {
            if let Some(ticket) = ticket {
                TimeoutFuture::new(ticket.delay_ms).await;
                let outcome = shared.engine.borrow_mut().complete_revert(ticket.id);
                return to_value(&outcome).map_err(JsValue::from);
            }
            let snapshot = shared.engine.borrow().snapshot();
            to_value(&snapshot).map_err(JsValue::from)
        })
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_value(&self.shared.engine.borrow().snapshot()).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = "snapshotJson")]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.shared.engine.borrow().snapshot()).map_err(serde_to_js_error)
    }

    #[wasm_bindgen(js_name = "stateJson")]
    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.shared.engine.borrow().session()).map_err(serde_to_js_error)
    }

    /// 载入存档，并恢复其中的翻回计时和秒表。
    #[wasm_bindgen(js_name = "setStateJson")]
    pub fn set_state_json(&self, json: &str) -> Result<(), JsValue> {
        let session: GameSession = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.shared
            .engine
            .borrow_mut()
            .restore(session)
            .map_err(to_js_error)?;
        self.shared.won.set(None);
        self.shared.rearm();
        Ok(())
    }

    #[wasm_bindgen(js_name = "configJson")]
    pub fn config_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.shared.engine.borrow().config()).map_err(serde_to_js_error)
    }

    #[wasm_bindgen(js_name = "setOnChange")]
    pub fn set_on_change(&self, callback: Option<Function>) {
        *self.shared.on_change.borrow_mut() = callback;
    }

    #[wasm_bindgen(js_name = "setOnWon")]
    pub fn set_on_won(&self, callback: Option<Function>) {
        *self.shared.on_won.borrow_mut() = callback;
    }

    #[wasm_bindgen(js_name = "clockActive")]
    pub fn clock_active(&self) -> bool {
        self.shared.timers.borrow().clock_active()
    }
}

impl Drop for GameEngine {
    fn drop(&mut self) {
        // 计时器闭包持有 shared 的克隆，清掉才能释放。
        self.shared.timers.borrow_mut().cancel_all();
    }
}

/// 生成一副洗好的牌，`alphabet` 省略时使用默认水果符号。
#[wasm_bindgen(js_name = "buildDeck")]
pub fn build_deck_js(pair_count: u32, alphabet: JsValue, seed: Option<u64>) -> Result<JsValue, JsValue> {
    let symbols: Vec<String> = if alphabet.is_undefined() || alphabet.is_null() {
        DEFAULT_SYMBOLS.iter().map(|symbol| symbol.to_string()).collect()
    } else {
        from_value(alphabet).map_err(JsValue::from)?
    };

    let mut rng = match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    let deck = build_deck(pair_count, &symbols, &mut rng).map_err(to_js_error)?;
    to_value(&deck).map_err(JsValue::from)
}

#[derive(Serialize)]
struct LayoutChoice {
    preset: LayoutPreset,
    pair_count: u32,
}

#[wasm_bindgen(js_name = "layoutForWidth")]
pub fn layout_for_width(width: u32) -> Result<JsValue, JsValue> {
    let preset = LayoutPreset::for_viewport_width(width);
    to_value(&LayoutChoice {
        preset,
        pair_count: preset.pair_count(),
    })
    .map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "defaultConfig")]
pub fn default_config() -> Result<JsValue, JsValue> {
    to_value(&GameConfig::default()).map_err(JsValue::from)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}

#[cfg(feature = "browser_log")]
fn init_logging() {
    let _ = console_log::init_with_level(::log::Level::Debug);
}

#[cfg(not(feature = "browser_log"))]
fn init_logging() {}
