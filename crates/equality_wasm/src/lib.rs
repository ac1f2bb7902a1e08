//! WASM bridge for the Equality Explorer model.
//!
//! Wraps `equality_core::scene::Scene` for the browser view. Ids cross the
//! boundary as `u32`, sides as `"left"`/`"right"`, and structured results
//! (drop outcomes, sum-to-zero cells, events, terms) as plain JS objects via
//! `serde-wasm-bindgen`. Empty-cell queries return `-1` for a full plate.

mod scene;

pub use scene::WasmScene;

use equality_core::scenes::SceneKind;
use wasm_bindgen::prelude::*;

/// Names accepted by the `WasmScene` constructor.
#[wasm_bindgen]
pub fn scene_names() -> Vec<String> {
    SceneKind::ALL
        .iter()
        .map(|kind| kind.name().to_string())
        .collect()
}
