//! WASM bindings for threepiece-core
//!
//! Provides a JavaScript-friendly API over [`GameSession`]. The page owns the
//! DOM, the animations and the AI timer:
//!
//! ```js
//! const session = new WasmSession(BigInt(Date.now()));
//! const update = () => render(session.snapshot(), session.events());
//!
//! const ticket = session.cellActivated(i);
//! update();
//! if (ticket !== undefined) {
//!   setTimeout(() => { session.runAiMove(ticket); update(); }, session.aiDelayMs());
//! }
//! ```
//!
//! Undrained events are capped at [`MAX_EVENTS`](crate::MAX_EVENTS).

use wasm_bindgen::prelude::*;

use crate::{AiTicket, GameSession, Pos, SessionConfig};

/// WASM-friendly wrapper around GameSession
#[wasm_bindgen]
pub struct WasmSession {
    inner: GameSession,
}

#[wasm_bindgen]
impl WasmSession {
    /// Create a session. `seed` drives the AI's tie-breaking. It is a `u64`,
    /// so JS must pass a BigInt, e.g. `BigInt(Date.now())`.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> WasmSession {
        WasmSession {
            inner: GameSession::new(SessionConfig {
                seed,
                ..SessionConfig::default()
            }),
        }
    }

    /// Handle a click on cell `index` (0-8).
    /// Returns the AI ticket to redeem after `aiDelayMs`, if the AI is due.
    /// Out-of-range indices are ignored.
    #[wasm_bindgen(js_name = cellActivated)]
    pub fn cell_activated(&mut self, index: u32) -> Option<u32> {
        let pos = Pos::from_index(index)?;
        self.inner
            .on_cell_activated(pos)
            .and_then(|turn| turn.ai_ticket)
            .map(|ticket| ticket.0)
    }

    /// Play the AI move for `ticket`. Returns false for a stale ticket.
    #[wasm_bindgen(js_name = runAiMove)]
    pub fn run_ai_move(&mut self, ticket: u32) -> bool {
        self.inner.run_ai_move(AiTicket(ticket)).is_some()
    }

    /// Start a new game, keeping scores.
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Toggle the AI opponent (starts a new game).
    #[wasm_bindgen(js_name = setAiEnabled)]
    pub fn set_ai_enabled(&mut self, enabled: bool) {
        self.inner.set_ai_enabled(enabled);
    }

    /// Delay the page should wait before calling `runAiMove`.
    #[wasm_bindgen(js_name = aiDelayMs)]
    pub fn ai_delay_ms(&self) -> u32 {
        self.inner.ai_delay().as_millis() as u32
    }

    /// Current state as a plain object:
    /// { cells, current_player, status, next_removal, scores, ai_enabled, ai_thinking }
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.snapshot()).map_err(JsValue::from)
    }

    /// Events since the last call, as an array of { event, ... } objects.
    pub fn events(&mut self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.drain_events()).map_err(JsValue::from)
    }
}

impl Default for WasmSession {
    fn default() -> Self {
        Self::new(0)
    }
}
