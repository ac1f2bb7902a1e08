//! Scene wrapper exposed to JS.

use anyhow::{bail, Context};
use equality_core::balance_scale::Side;
use equality_core::grid::Location;
use equality_core::operation::UniversalOperation;
use equality_core::scene::Scene;
use equality_core::scenes::SceneKind;
use equality_core::term::{Term, TermId, VariableId};
use equality_core::term_creator::{CreatorId, TermOptions};
use js_sys::Float64Array;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmScene {
    pub(crate) scene: Scene,
}

pub(crate) fn build_scene(name: &str) -> anyhow::Result<Scene> {
    let kind: SceneKind = name
        .parse()
        .with_context(|| format!("Unknown scene '{}'", name))?;
    let scene = kind
        .build()
        .with_context(|| format!("Failed to build scene '{}'", name))?;
    Ok(scene)
}

pub(crate) fn parse_side(side: &str) -> anyhow::Result<Side> {
    match side {
        "left" => Ok(Side::Left),
        "right" => Ok(Side::Right),
        other => bail!("Unknown side '{}', expected 'left' or 'right'", other),
    }
}

pub(crate) fn parse_operation(operator: &str, operand: i32) -> anyhow::Result<UniversalOperation> {
    if operator.trim().is_empty() {
        bail!("Operator is empty");
    }
    UniversalOperation::parse(operator, i64::from(operand))
        .with_context(|| format!("Invalid operation '{} {}'", operator, operand))
}

/// `-1` stands for "no empty cell".
fn cell_or_sentinel(cell: Option<usize>) -> i32 {
    cell.map_or(-1, |cell| cell as i32)
}

fn js_error(context: &str, error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {:#}", context, error))
}

fn serialize<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// A term as the view sees it.
#[derive(Serialize)]
struct TermView<'a> {
    id: u32,
    creator: u32,
    label: String,
    x: f64,
    y: f64,
    diameter: f64,
    cell: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    side: Option<&'a str>,
}

#[wasm_bindgen]
impl WasmScene {
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str) -> Result<WasmScene, JsValue> {
        console_error_panic_hook::set_once();
        let scene = build_scene(name).map_err(|e| js_error("Scene setup failed", e))?;
        Ok(WasmScene { scene })
    }

    pub fn name(&self) -> String {
        self.scene.name().to_string()
    }

    /// Creator names, left side first. Creator ids are indices into this list.
    pub fn creator_names(&self) -> Vec<String> {
        self.scene.creators().iter().map(|c| c.name()).collect()
    }

    pub fn set_creator_location(&mut self, creator: u32, x: f64, y: f64) -> Result<(), JsValue> {
        self.scene
            .set_creator_location(CreatorId(creator as usize), Location::new(x, y))
            .map_err(|e| js_error("Failed to move creator", e))
    }

    pub fn create_term_on_plate(&mut self, creator: u32, cell: u32) -> Result<u32, JsValue> {
        let term = self
            .scene
            .create_term_on_plate(
                CreatorId(creator as usize),
                cell as usize,
                TermOptions::default(),
            )
            .map_err(|e| js_error("Failed to create term", e))?;
        Ok(term.0 as u32)
    }

    pub fn create_term_dragging(&mut self, creator: u32) -> Result<u32, JsValue> {
        let term = self
            .scene
            .create_term_dragging(CreatorId(creator as usize))
            .map_err(|e| js_error("Failed to create term", e))?;
        Ok(term.0 as u32)
    }

    /// Returns the `DropOutcome` as a JS object.
    pub fn drop_term(&mut self, term: u32, x: f64, y: f64) -> Result<JsValue, JsValue> {
        let outcome = self
            .scene
            .drop_term(TermId(u64::from(term)), Location::new(x, y))
            .map_err(|e| js_error("Failed to drop term", e))?;
        serialize(&outcome)
    }

    /// Returns the cell the term left.
    pub fn remove_term_from_plate(&mut self, term: u32) -> Result<u32, JsValue> {
        let cell = self
            .scene
            .remove_term_from_plate(TermId(u64::from(term)))
            .map_err(|e| js_error("Failed to remove term", e))?;
        Ok(cell as u32)
    }

    pub fn dispose_term(&mut self, term: u32) -> Result<(), JsValue> {
        self.scene
            .dispose_term(TermId(u64::from(term)))
            .map_err(|e| js_error("Failed to dispose term", e))
    }

    /// Applies a universal operation and returns the cells that summed to zero.
    pub fn apply_operation(&mut self, operator: &str, operand: i32) -> Result<JsValue, JsValue> {
        let operation =
            parse_operation(operator, operand).map_err(|e| js_error("Operation failed", e))?;
        let cells = self
            .scene
            .apply_universal_operation(&operation)
            .map_err(|e| js_error("Operation failed", e))?;
        serialize(&cells)
    }

    pub fn angle(&self) -> f64 {
        self.scene.angle()
    }

    pub fn is_balanced(&self) -> bool {
        self.scene.is_balanced()
    }

    /// `[left, right]` plate weights.
    pub fn weights(&self) -> Float64Array {
        let weights = [
            self.scene.plate(Side::Left).weight().to_decimal(),
            self.scene.plate(Side::Right).weight().to_decimal(),
        ];
        Float64Array::from(&weights[..])
    }

    pub fn first_empty_cell(&self, side: &str) -> Result<i32, JsValue> {
        let side = parse_side(side).map_err(|e| js_error("Invalid side", e))?;
        Ok(cell_or_sentinel(self.scene.plate(side).first_empty_cell()))
    }

    pub fn closest_empty_cell(&self, side: &str, x: f64, y: f64) -> Result<i32, JsValue> {
        let side = parse_side(side).map_err(|e| js_error("Invalid side", e))?;
        Ok(cell_or_sentinel(
            self.scene
                .plate(side)
                .closest_empty_cell(&Location::new(x, y)),
        ))
    }

    /// Sets `x`. Scenes without a variable reject this.
    pub fn set_variable_value(&mut self, value: i32) -> Result<(), JsValue> {
        self.scene
            .set_variable_value(VariableId(0), i64::from(value))
            .map_err(|e| js_error("Failed to set variable", e))
    }

    pub fn is_lockable(&self) -> bool {
        self.scene.is_lockable()
    }

    pub fn set_locked(&mut self, locked: bool) -> Result<(), JsValue> {
        self.scene
            .set_locked(locked)
            .map_err(|e| js_error("Failed to lock scene", e))
    }

    /// Saves into `slot`, or the first empty slot when `slot` is negative.
    /// Returns the slot used.
    pub fn save_snapshot(&mut self, slot: i32) -> Result<u32, JsValue> {
        let slot = usize::try_from(slot).ok();
        let index = self
            .scene
            .save_to_slot(slot)
            .map_err(|e| js_error("Failed to save snapshot", e))?;
        Ok(index as u32)
    }

    pub fn restore_snapshot(&mut self, slot: u32) -> Result<(), JsValue> {
        self.scene
            .snapshots_mut()
            .select(slot as usize)
            .and_then(|_| self.scene.restore_selected_snapshot())
            .map_err(|e| js_error("Failed to restore snapshot", e))
    }

    pub fn delete_snapshot(&mut self, slot: u32) -> Result<(), JsValue> {
        self.scene
            .snapshots_mut()
            .delete(slot as usize)
            .map(|_| ())
            .map_err(|e| js_error("Failed to delete snapshot", e))
    }

    /// Every live term, with its cell (`-1` when off the plate).
    pub fn terms(&self) -> Result<JsValue, JsValue> {
        let views: Vec<TermView> = self
            .scene
            .terms()
            .values()
            .map(|term| self.term_view(term))
            .collect();
        serialize(&views)
    }

    /// Events queued since the last call, oldest first.
    pub fn drain_events(&mut self) -> Result<JsValue, JsValue> {
        let events = self.scene.drain_events();
        serialize(&events)
    }

    pub fn reset(&mut self) -> Result<(), JsValue> {
        self.scene
            .reset()
            .map_err(|e| js_error("Failed to reset scene", e))
    }
}

impl WasmScene {
    fn term_view(&self, term: &Term) -> TermView<'static> {
        let placement = [Side::Left, Side::Right].into_iter().find_map(|side| {
            self.scene
                .plate(side)
                .cell_for_term(term.id)
                .map(|cell| (side, cell))
        });
        TermView {
            id: term.id.0 as u32,
            creator: term.creator.0 as u32,
            label: term.value.to_string(),
            x: term.location.x,
            y: term.location.y,
            diameter: term.diameter,
            cell: cell_or_sentinel(placement.map(|(_, cell)| cell)),
            side: placement.map(|(side, _)| match side {
                Side::Left => "left",
                Side::Right => "right",
            }),
        }
    }
}
