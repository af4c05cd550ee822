//! Browser tests for the wasm bindings. Run with `wasm-pack test --headless --firefox`.

#![cfg(target_arch = "wasm32")]

use concentron::{layout_for_width, GameEngine, RevealOutcome, Snapshot};
use gloo_timers::future::TimeoutFuture;
use serde::Deserialize;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const FAST_CONFIG: &str = r#"{"pair_count":2,"revert_delay_ms":20,"symbols":["A","B"]}"#;

#[derive(Deserialize)]
struct LayoutChoice {
    pair_count: u32,
}

fn snapshot(engine: &GameEngine) -> Snapshot {
    serde_json::from_str(&engine.snapshot_json().expect("snapshot should serialize"))
        .expect("snapshot json should parse")
}

/// Finds the partner of card 0 by peeking at the saved state.
fn mismatch_partner(engine: &GameEngine) -> usize {
    let state: serde_json::Value =
        serde_json::from_str(&engine.state_json().expect("state should serialize"))
            .expect("state json should parse");
    let cards = state["deck"]["cards"].as_array().expect("deck has cards");
    let first = &cards[0]["symbol"];
    cards
        .iter()
        .position(|card| &card["symbol"] != first)
        .expect("two symbols are dealt")
}

#[wasm_bindgen_test]
fn layout_helper_reports_pair_count() {
    let value = layout_for_width(400).expect("layout should serialize");
    let choice: LayoutChoice = serde_wasm_bindgen::from_value(value).expect("layout shape");
    assert_eq!(choice.pair_count, 3);
}

#[wasm_bindgen_test]
fn reveal_returns_outcome() {
    let engine = GameEngine::new(Some(FAST_CONFIG.into()), Some(4)).expect("engine");
    let value = engine.reveal_card(0).expect("index is valid");
    let outcome: RevealOutcome = serde_wasm_bindgen::from_value(value).expect("outcome shape");
    assert!(outcome.accepted);
    assert!(engine.clock_active());
}

#[wasm_bindgen_test]
fn out_of_range_reveal_is_an_error() {
    let engine = GameEngine::new(Some(FAST_CONFIG.into()), Some(4)).expect("engine");
    assert!(engine.reveal_card(9).is_err());
}

#[wasm_bindgen_test]
async fn mismatch_flips_back_after_delay() {
    let engine = GameEngine::new(Some(FAST_CONFIG.into()), Some(4)).expect("engine");
    let partner = mismatch_partner(&engine);
    engine.reveal_card(0).expect("index is valid");
    engine.reveal_card(partner).expect("index is valid");
    assert_eq!(snapshot(&engine).moves, 1);

    TimeoutFuture::new(60).await;

    let after = snapshot(&engine);
    assert!(after.cards.iter().all(|card| card.symbol.is_none()));
}

#[wasm_bindgen_test]
async fn restart_cancels_revert_timer() {
    let engine = GameEngine::new(Some(FAST_CONFIG.into()), Some(4)).expect("engine");
    let partner = mismatch_partner(&engine);
    engine.reveal_card(0).expect("index is valid");
    engine.reveal_card(partner).expect("index is valid");

    engine.restart(None).expect("restart should succeed");
    assert!(!engine.clock_active());
    engine.reveal_card(0).expect("index is valid");

    TimeoutFuture::new(60).await;

    let after = snapshot(&engine);
    assert!(after.cards[0].symbol.is_some(), "new game's card must stay up");
}

#[wasm_bindgen_test]
async fn settle_async_resolves_pending_mismatch() {
    let engine = GameEngine::new(Some(FAST_CONFIG.into()), Some(4)).expect("engine");
    engine.set_auto_clock(false);
    let partner = mismatch_partner(&engine);
    engine.reveal_card(0).expect("index is valid");
    engine.reveal_card(partner).expect("index is valid");

    let value: JsValue = JsFuture::from(engine.settle_async()).await.expect("promise resolves");
    assert!(!value.is_undefined());
    assert!(snapshot(&engine).cards.iter().all(|card| card.symbol.is_none()));
}

#[wasm_bindgen_test]
async fn restored_mismatch_flips_back_after_delay() {
    let source = GameEngine::new(Some(FAST_CONFIG.into()), Some(4)).expect("engine");
    source.set_auto_clock(false);
    let partner = mismatch_partner(&source);
    source.reveal_card(0).expect("index is valid");
    source.reveal_card(partner).expect("index is valid");
    let saved = source.state_json().expect("state should serialize");
    source.restart(None).expect("restart should succeed");

    let engine = GameEngine::new(Some(FAST_CONFIG.into()), Some(9)).expect("engine");
    engine.set_state_json(&saved).expect("saved mismatch is consistent");
    assert!(snapshot(&engine).cards[partner].symbol.is_some());
    assert!(engine.clock_active());

    TimeoutFuture::new(60).await;

    let after = snapshot(&engine);
    assert!(after.cards.iter().all(|card| card.symbol.is_none()));
    assert!(engine.reveal_card(0).expect("index is valid").is_object());
}

#[wasm_bindgen_test]
fn rejected_state_keeps_current_timers() {
    let engine = GameEngine::new(Some(FAST_CONFIG.into()), Some(4)).expect("engine");
    engine.reveal_card(0).expect("index is valid");
    assert!(engine.set_state_json("{\"deck\":{\"cards\":[]}}").is_err());
    assert!(engine.clock_active());
}

#[wasm_bindgen_test]
fn auto_clock_can_be_switched_back_on_mid_game() {
    let engine = GameEngine::new(Some(FAST_CONFIG.into()), Some(4)).expect("engine");
    engine.reveal_card(0).expect("index is valid");
    assert!(engine.clock_active());

    engine.set_auto_clock(false);
    assert!(!engine.clock_active());
    engine.set_auto_clock(true);
    assert!(engine.clock_active());
}

#[wasm_bindgen_test]
fn auto_clock_stays_off_before_first_reveal() {
    let engine = GameEngine::new(Some(FAST_CONFIG.into()), Some(4)).expect("engine");
    engine.set_auto_clock(false);
    engine.set_auto_clock(true);
    assert!(!engine.clock_active());
}
