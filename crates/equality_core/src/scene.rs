//! A scene: one balance scale, the term creators on each side of it, and
//! every live term.
//!
//! The scene owns all state. Creators and terms refer to each other by id
//! (`CreatorId`, `TermId`), plates only hold term ids, and positions are
//! pushed into the term map through `Movable`. Every public mutation ends by
//! recomputing plate weights and the beam angle, so queries never see a
//! stale scale.
//!
//! Changes the view has to know about (terms created or disposed, cells that
//! summed to zero) are queued as `SceneEvent`s and drained by the caller.

use crate::balance_scale::{BalanceScale, ScaleSettings, Side};
use crate::error::{EqualityError, Result};
use crate::fraction::ReducedFraction;
use crate::grid::{GridSettings, Location};
use crate::operation::UniversalOperation;
use crate::plate::Plate;
use crate::snapshot::{CreatorSnapshot, SceneSnapshot, SnapshotSlots, NUMBER_OF_SNAPSHOTS};
use crate::term::{Term, TermId, TermMap, Variable, VariableId, SMALL_TERM_DIAMETER};
use crate::term_creator::{
    CreatorId, CreatorOptions, OperationOutcome, TermCreator, TermCreatorKind, TermOptions,
};
use crate::traits::Movable;
use log::{debug, warn};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSettings {
    pub name: String,
    pub scale: ScaleSettings,
    /// Like terms share one cell per plate and combine when dropped there.
    pub combine_like_terms: bool,
    /// Whether the left and right sides can be locked together.
    pub lockable: bool,
    pub term_diameter: f64,
    pub number_of_snapshots: usize,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            name: "scene".to_string(),
            scale: ScaleSettings::default(),
            combine_like_terms: false,
            lockable: false,
            term_diameter: SMALL_TERM_DIAMETER,
            number_of_snapshots: NUMBER_OF_SNAPSHOTS,
        }
    }
}

/// One creator to build on a side of the scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorSpec {
    pub kind: TermCreatorKind,
    pub initial_number_of_terms_on_plate: usize,
}

impl CreatorSpec {
    pub fn new(kind: TermCreatorKind) -> Self {
        Self {
            kind,
            initial_number_of_terms_on_plate: 0,
        }
    }

    pub fn with_initial_terms(mut self, count: usize) -> Self {
        self.initial_number_of_terms_on_plate = count;
        self
    }
}

/// A cell that was vacated because its term's value became zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SumToZeroCell {
    pub side: Side,
    pub cell: usize,
    /// Symbol of the vanished term, `None` for constants.
    pub symbol: Option<String>,
    /// Center of the cell once the scale has settled.
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SceneEvent {
    TermCreated {
        term: TermId,
        creator: CreatorId,
        location: Location,
    },
    TermDisposed {
        term: TermId,
        creator: CreatorId,
    },
    SumToZero {
        cells: Vec<SumToZeroCell>,
    },
}

/// Where a dropped term ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropOutcome {
    Placed { cell: usize },
    /// Combined with the like term already in the cell. `None` when they
    /// summed to zero.
    Combined { term: Option<TermId> },
    /// The plate was full and the term was disposed.
    Disposed,
}

/// What a universal operation will do to one captured term.
#[derive(Debug, Clone, Copy)]
enum Step {
    Keep,
    Replace(CreatorId, ReducedFraction),
    Zero,
}

#[derive(Debug, Clone)]
pub struct Scene {
    settings: SceneSettings,
    creators: Vec<TermCreator>,
    terms: TermMap,
    next_term_id: u64,
    scale: BalanceScale,
    variables: Vec<Variable>,
    locked: bool,
    events: Vec<SceneEvent>,
    snapshots: SnapshotSlots,
}

impl Scene {
    /// Builds a scene and puts each creator's initial terms on its plate.
    ///
    /// Creators on the same side whose values are negatives become each
    /// other's inverse. When the left and right lists are pairwise
    /// equivalent, those pairs are linked for locking; a lockable scene
    /// requires that.
    pub fn new(
        settings: SceneSettings,
        variables: Vec<Variable>,
        left: Vec<CreatorSpec>,
        right: Vec<CreatorSpec>,
    ) -> Result<Self> {
        let scale = BalanceScale::new(settings.scale)?;

        let mut creators = Vec::with_capacity(left.len() + right.len());
        for (side, specs) in [(Side::Left, left), (Side::Right, right)] {
            for spec in specs {
                if let TermCreatorKind::Variable(kind) = &spec.kind {
                    if kind.variable.0 >= variables.len() {
                        return Err(EqualityError::VariableNotFound(kind.variable.0));
                    }
                }
                let options = CreatorOptions {
                    initial_number_of_terms_on_plate: spec.initial_number_of_terms_on_plate,
                    combine_like_terms: settings.combine_like_terms,
                    diameter: settings.term_diameter,
                };
                let id = CreatorId(creators.len());
                creators.push(TermCreator::new(id, side, spec.kind, options));
            }
        }

        link_inverses(&mut creators);
        let paired = link_equivalents(&mut creators);
        if settings.lockable && !paired {
            return Err(EqualityError::InvalidSettings(format!(
                "{} is lockable but its left and right creators differ",
                settings.name
            )));
        }
        if settings.combine_like_terms {
            assign_like_terms_cells(&mut creators, &settings.scale.grid)?;
        }

        let mut scene = Self {
            snapshots: SnapshotSlots::new(settings.number_of_snapshots),
            settings,
            creators,
            terms: TermMap::new(),
            next_term_id: 0,
            scale,
            variables,
            locked: false,
            events: Vec::new(),
        };
        let created = scene.populate()?;
        scene.refresh()?;
        scene.announce_all(&created)?;
        debug!(
            "built scene {} with {} creators and {} terms",
            scene.settings.name,
            scene.creators.len(),
            created.len()
        );
        Ok(scene)
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn creators(&self) -> &[TermCreator] {
        &self.creators
    }

    pub fn creators_on_side(&self, side: Side) -> impl Iterator<Item = &TermCreator> + '_ {
        self.creators.iter().filter(move |c| c.side() == side)
    }

    pub fn creator(&self, id: CreatorId) -> Result<&TermCreator> {
        self.creators
            .get(id.0)
            .ok_or(EqualityError::CreatorNotFound(id))
    }

    /// Where the creator's panel sits; new dragged terms start there.
    pub fn set_creator_location(&mut self, id: CreatorId, location: Location) -> Result<()> {
        self.creator_mut(id)?.set_location(location);
        Ok(())
    }

    fn creator_mut(&mut self, id: CreatorId) -> Result<&mut TermCreator> {
        self.creators
            .get_mut(id.0)
            .ok_or(EqualityError::CreatorNotFound(id))
    }

    /// Every live term, on a plate or not.
    pub fn terms(&self) -> &TermMap {
        &self.terms
    }

    pub fn term(&self, id: TermId) -> Result<&Term> {
        self.terms.get(&id).ok_or(EqualityError::TermNotFound(id))
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VariableId) -> Result<&Variable> {
        self.variables
            .get(id.0)
            .ok_or(EqualityError::VariableNotFound(id.0))
    }

    /// Changes a variable and re-weighs both plates. A value the plates
    /// cannot be weighed with is rejected and the variable keeps its value.
    pub fn set_variable_value(&mut self, id: VariableId, value: i64) -> Result<()> {
        let mut variables = self.variables.clone();
        let variable = variables
            .get_mut(id.0)
            .ok_or(EqualityError::VariableNotFound(id.0))?;
        variable.set_value(value)?;
        debug!("variable {} = {value}", variable.symbol);
        self.scale.weigh(&self.terms, &variables)?;
        self.variables = variables;
        self.refresh()
    }

    pub fn scale(&self) -> &BalanceScale {
        &self.scale
    }

    pub fn plate(&self, side: Side) -> &Plate {
        self.scale.plate(side)
    }

    pub fn angle(&self) -> f64 {
        self.scale.angle()
    }

    pub fn is_balanced(&self) -> bool {
        self.scale.is_balanced()
    }

    pub fn number_of_terms_on_scale(&self) -> usize {
        self.scale.number_of_terms()
    }

    /// Sum of the constant values or coefficients a creator has on its plate.
    pub fn sum_of_values_on_plate(&self, creator: CreatorId) -> Result<ReducedFraction> {
        self.creator(creator)?.sum_of_values_on_plate(&self.terms)
    }

    /// Takes the queued events, oldest first.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    // --- term lifecycle ---------------------------------------------------

    /// Creates a term and puts it in `cell`. Fails if the cell is occupied.
    pub fn create_term_on_plate(
        &mut self,
        creator: CreatorId,
        cell: usize,
        options: TermOptions,
    ) -> Result<TermId> {
        let side = self.creator(creator)?.side();
        if !self.scale.plate(side).is_empty_cell(cell)? {
            return Err(EqualityError::CellOccupied(cell));
        }
        let term = self.instantiate(creator, options)?;
        self.place(term, cell)?;
        self.refresh()?;
        self.announce(term)?;
        Ok(term)
    }

    /// Creates a term at the creator's panel location, off the plate, as the
    /// user starts dragging it out.
    pub fn create_term_dragging(&mut self, creator: CreatorId) -> Result<TermId> {
        let term = self.instantiate(creator, TermOptions::default())?;
        self.announce(term)?;
        Ok(term)
    }

    /// Lifts a term off its plate, as the user starts dragging it. Terms
    /// above it shift down. While locked, its partner on the other plate is
    /// disposed. Returns the cell the term occupied.
    pub fn remove_term_from_plate(&mut self, term: TermId) -> Result<usize> {
        let (_, cell) = self.lift(term)?;
        if let Some(partner) = self.term(term)?.locked_partner {
            self.discard(partner)?;
        }
        self.refresh()?;
        Ok(cell)
    }

    /// Disposes a term (and its locked partner), vacating any cell it holds.
    pub fn dispose_term(&mut self, term: TermId) -> Result<()> {
        let partner = self.term(term)?.locked_partner;
        self.discard(term)?;
        if let Some(partner) = partner {
            if self.terms.contains_key(&partner) {
                self.discard(partner)?;
            }
        }
        self.refresh()?;
        Ok(())
    }

    pub fn dispose_terms_on_plate(&mut self, side: Side) -> Result<()> {
        let on_plate: Vec<TermId> = self.scale.plate(side).terms().map(|(_, t)| t).collect();
        for term in on_plate {
            self.discard(term)?;
        }
        self.refresh()?;
        Ok(())
    }

    pub fn dispose_all_terms(&mut self) -> Result<()> {
        self.discard_everything()?;
        self.refresh()?;
        Ok(())
    }

    /// Drops a dragged term at `location`.
    ///
    /// With like terms combined, the term goes to its creator's like-terms
    /// cell and combines with whatever is there. Otherwise it goes to the
    /// empty cell closest to `location`; if the plate is full the term is
    /// disposed. While locked, an equivalent term is dropped on the other
    /// plate too, and `PlateFull` is returned (before anything changes) if
    /// the other plate has no room.
    pub fn drop_term(&mut self, term: TermId, location: Location) -> Result<DropOutcome> {
        let (creator, side) = self.side_of(term)?;
        let (like_terms_cell, equivalent) = {
            let creator = self.creator(creator)?;
            if creator.is_term_on_plate(term) {
                return Err(EqualityError::TermAlreadyOnPlate(term));
            }
            let like_terms_cell = if creator.combine_like_terms() {
                creator.like_terms_cell()
            } else {
                None
            };
            (like_terms_cell, creator.equivalent())
        };
        let combine = like_terms_cell.is_some();

        let target = match like_terms_cell {
            Some(cell) => cell,
            None => match self.scale.plate(side).closest_empty_cell(&location) {
                Some(cell) => cell,
                None => {
                    warn!("{side:?} plate is full, disposing {term}");
                    self.dispose_term(term)?;
                    return Ok(DropOutcome::Disposed);
                }
            },
        };

        let mirror = if self.locked {
            let equivalent =
                equivalent.ok_or_else(|| EqualityError::NotLockable(self.settings.name.clone()))?;
            let cell = match self.creator(equivalent)?.like_terms_cell().filter(|_| combine) {
                Some(cell) => cell,
                None => {
                    let other = self.scale.plate(side.opposite());
                    let mirrored = other.location_for_cell(target)?;
                    other
                        .closest_empty_cell(&mirrored)
                        .ok_or(EqualityError::PlateFull)?
                }
            };
            Some((equivalent, cell))
        } else {
            None
        };

        let (value, symbol) = {
            let term = self.term(term)?;
            (term.value.significant_value(), term.value.symbol().map(str::to_string))
        };
        let mut created = Vec::new();
        let mut zeros = Vec::new();

        let outcome = self.settle(term, target, combine)?;
        match outcome {
            DropOutcome::Combined { term: Some(new) } => created.push(new),
            DropOutcome::Combined { term: None } => zeros.push((side, target, symbol.clone())),
            _ => {}
        }

        if let Some((equivalent, cell)) = mirror {
            let partner = self.instantiate(
                equivalent,
                TermOptions {
                    value,
                    diameter: None,
                },
            )?;
            match self.settle(partner, cell, combine)? {
                DropOutcome::Placed { .. } => {
                    created.push(partner);
                    if let DropOutcome::Placed { .. } = outcome {
                        self.link_partners(term, partner)?;
                    }
                }
                DropOutcome::Combined { term: Some(new) } => created.push(new),
                DropOutcome::Combined { term: None } => {
                    zeros.push((side.opposite(), cell, symbol.clone()))
                }
                DropOutcome::Disposed => {}
            }
        }

        self.refresh()?;
        self.announce_all(&created)?;
        let cells = self.sum_to_zero_cells(zeros)?;
        self.emit_sum_to_zero(cells);
        debug!("dropped {term}: {outcome:?}");
        Ok(outcome)
    }

    /// Combines two like terms into a new term, off the plate, at the first
    /// term's location. Both originals are disposed. The result belongs to
    /// `creator` or to its inverse, whichever matches its sign. `None` if
    /// the terms summed to zero.
    pub fn combine_terms(
        &mut self,
        creator: CreatorId,
        term1: TermId,
        term2: TermId,
    ) -> Result<Option<TermId>> {
        let combined = self.combine(creator, term1, term2)?;
        self.refresh()?;
        if let Some(term) = combined {
            self.announce(term)?;
        }
        Ok(combined)
    }

    /// Creates a copy of a term, off the plate, at the term's location.
    pub fn copy_term(&mut self, term: TermId) -> Result<TermId> {
        let (creator, value, location, diameter) = {
            let original = self.term(term)?;
            let value = self.creator(original.creator)?.copy_value(original)?;
            (original.creator, value, original.location, original.diameter)
        };
        let copy = self.instantiate(
            creator,
            TermOptions {
                value: Some(value),
                diameter: Some(diameter),
            },
        )?;
        self.terms.move_to(copy, location);
        self.announce(copy)?;
        Ok(copy)
    }

    // --- universal operations ---------------------------------------------

    /// Applies an operation to one term. The replacement (if any) takes the
    /// same cell. Returns the term that now stands in for `term`, `None` if
    /// it summed to zero.
    pub fn apply_operation_to_term(
        &mut self,
        operation: &UniversalOperation,
        term: TermId,
    ) -> Result<Option<TermId>> {
        let step = self.plan_step(operation, term)?;
        let zero = match step {
            Step::Zero => self.zero_record(term)?,
            _ => None,
        };
        let result = self.apply_step(term, step)?;
        self.refresh()?;
        if let (Step::Replace(..), Some(new)) = (step, result) {
            self.announce(new)?;
        }
        let cells = self.sum_to_zero_cells(zero.into_iter().collect())?;
        self.emit_sum_to_zero(cells);
        Ok(result)
    }

    /// Creates a term directly on the plate when an operation adds a
    /// constant where there is none.
    pub fn apply_operation_to_plate(
        &mut self,
        operation: &UniversalOperation,
        creator: CreatorId,
    ) -> Result<Option<TermId>> {
        let Some((cell, value)) = self.plate_creation(operation, creator)? else {
            return Ok(None);
        };
        let term = self.instantiate(creator, TermOptions::with_value(value))?;
        self.place(term, cell)?;
        self.refresh()?;
        self.announce(term)?;
        Ok(Some(term))
    }

    /// Applies an operation to every term on the scale.
    ///
    /// Everything is validated and planned before the first mutation, so an
    /// error leaves the scene untouched. Plate-level creations happen before
    /// term-level changes, and the scale settles before the cells that
    /// summed to zero are reported (once, as a single event).
    pub fn apply_universal_operation(
        &mut self,
        operation: &UniversalOperation,
    ) -> Result<Vec<SumToZeroCell>> {
        for creator in &self.creators {
            creator.check_supports_operations()?;
        }

        let captured: Vec<TermId> = self
            .creators
            .iter()
            .flat_map(|c| c.terms_on_plate().iter().copied())
            .collect();

        let mut creations = Vec::new();
        for index in 0..self.creators.len() {
            let creator = CreatorId(index);
            if let Some((cell, value)) = self.plate_creation(operation, creator)? {
                creations.push((creator, cell, value));
            }
        }
        let steps = captured
            .iter()
            .map(|&term| Ok((term, self.plan_step(operation, term)?)))
            .collect::<Result<Vec<_>>>()?;
        self.check_planned_weights(&creations, &steps)?;

        let mut created = Vec::new();
        for (creator, cell, value) in creations {
            let term = self.instantiate(creator, TermOptions::with_value(value))?;
            self.place(term, cell)?;
            created.push(term);
        }

        let mut zeros = Vec::new();
        for (term, step) in steps {
            if let Step::Zero = step {
                zeros.extend(self.zero_record(term)?);
            }
            let result = self.apply_step(term, step)?;
            if let (Step::Replace(..), Some(new)) = (step, result) {
                created.push(new);
            }
        }

        self.refresh()?;
        self.announce_all(&created)?;
        let cells = self.sum_to_zero_cells(zeros)?;
        debug!(
            "applied {operation}: {} created, {} summed to zero",
            created.len(),
            cells.len()
        );
        self.emit_sum_to_zero(cells.clone());
        Ok(cells)
    }

    // --- lock -------------------------------------------------------------

    pub fn is_lockable(&self) -> bool {
        self.settings.lockable
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Unlocking forgets every partner link.
    pub fn set_locked(&mut self, locked: bool) -> Result<()> {
        if locked && !self.is_lockable() {
            return Err(EqualityError::NotLockable(self.settings.name.clone()));
        }
        if !locked {
            for term in self.terms.values_mut() {
                term.locked_partner = None;
            }
        }
        self.locked = locked;
        debug!("{} locked: {locked}", self.settings.name);
        Ok(())
    }

    // --- reset and snapshots ----------------------------------------------

    /// Back to the state the scene was built in.
    pub fn reset(&mut self) -> Result<()> {
        self.discard_everything()?;
        self.variables.iter_mut().for_each(Variable::reset);
        self.locked = false;
        self.snapshots.clear();
        let created = self.populate()?;
        self.refresh()?;
        self.announce_all(&created)?;
        debug!("reset {}", self.settings.name);
        Ok(())
    }

    /// Records what every creator has on its plate, and the variable values.
    pub fn save_snapshot(&self) -> Result<SceneSnapshot> {
        let creators = self
            .creators
            .iter()
            .map(|creator| {
                let plate = self.scale.plate(creator.side());
                let records = creator
                    .terms_on_plate()
                    .iter()
                    .map(|&id| {
                        let cell = plate
                            .cell_for_term(id)
                            .ok_or(EqualityError::TermNotOnPlate(id))?;
                        creator.snapshot_record(self.term(id)?, cell)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(CreatorSnapshot {
                    creator: creator.id(),
                    records,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SceneSnapshot {
            creators,
            variable_values: self.variables.iter().map(Variable::value).collect(),
        })
    }

    /// Replaces every term with the ones recorded in `snapshot`. The snapshot
    /// is checked against this scene first, so a mismatch changes nothing.
    pub fn restore_snapshot(&mut self, snapshot: &SceneSnapshot) -> Result<()> {
        self.check_snapshot(snapshot)?;

        self.discard_everything()?;
        for (variable, &value) in self.variables.iter_mut().zip(&snapshot.variable_values) {
            variable.set_value(value)?;
        }
        let mut created = Vec::new();
        for creator_snapshot in &snapshot.creators {
            for record in &creator_snapshot.records {
                let term = self.instantiate(
                    creator_snapshot.creator,
                    TermOptions {
                        value: record.value(),
                        diameter: None,
                    },
                )?;
                self.place(term, record.cell_index())?;
                created.push(term);
            }
        }
        self.refresh()?;
        self.announce_all(&created)?;
        debug!(
            "restored {} terms in {}",
            created.len(),
            self.settings.name
        );
        Ok(())
    }

    fn check_snapshot(&self, snapshot: &SceneSnapshot) -> Result<()> {
        if snapshot.variable_values.len() != self.variables.len() {
            return Err(EqualityError::SnapshotMismatch(format!(
                "expected {} variable values, found {}",
                self.variables.len(),
                snapshot.variable_values.len()
            )));
        }
        for (variable, &value) in self.variables.iter().zip(&snapshot.variable_values) {
            let (min, max) = variable.range();
            if value < min || value > max {
                return Err(EqualityError::VariableOutOfRange { value, min, max });
            }
        }
        let mut used = HashSet::new();
        for creator_snapshot in &snapshot.creators {
            let creator = self.creator(creator_snapshot.creator)?;
            let grid = self.scale.plate(creator.side()).grid();
            for record in &creator_snapshot.records {
                creator.check_record(record)?;
                let cell = record.cell_index();
                if !grid.is_valid_cell(cell) {
                    return Err(EqualityError::InvalidCell(cell));
                }
                if !used.insert((creator.side(), cell)) {
                    return Err(EqualityError::CellOccupied(cell));
                }
            }
        }
        Ok(())
    }

    pub fn snapshots(&self) -> &SnapshotSlots {
        &self.snapshots
    }

    pub fn snapshots_mut(&mut self) -> &mut SnapshotSlots {
        &mut self.snapshots
    }

    /// Saves a snapshot into `slot`, or into the first empty slot. Returns
    /// the slot used, which becomes the selected one.
    pub fn save_to_slot(&mut self, slot: Option<usize>) -> Result<usize> {
        let index = slot
            .or_else(|| self.snapshots.first_empty())
            .ok_or(EqualityError::InvalidSnapshotSlot(self.snapshots.len()))?;
        let snapshot = self.save_snapshot()?;
        self.snapshots.save(index, snapshot)?;
        Ok(index)
    }

    pub fn restore_selected_snapshot(&mut self) -> Result<()> {
        let snapshot = self
            .snapshots
            .selected_snapshot()
            .cloned()
            .ok_or_else(|| EqualityError::SnapshotMismatch("no snapshot is selected".into()))?;
        self.restore_snapshot(&snapshot)
    }

    // --- internals ----------------------------------------------------------

    fn refresh(&mut self) -> Result<()> {
        self.scale.update(&mut self.terms, &self.variables)
    }

    fn side_of(&self, term: TermId) -> Result<(CreatorId, Side)> {
        let creator = self.term(term)?.creator;
        Ok((creator, self.creator(creator)?.side()))
    }

    /// Creates a term at its creator's location. Nobody is told yet.
    fn instantiate(&mut self, creator: CreatorId, options: TermOptions) -> Result<TermId> {
        let id = TermId(self.next_term_id);
        let term = self.creator(creator)?.create_term(id, options)?;
        debug!("{creator} created {id} ({})", term.value);
        self.next_term_id += 1;
        self.terms.insert(id, term);
        self.creator_mut(creator)?.track(id);
        Ok(id)
    }

    fn announce(&mut self, term: TermId) -> Result<()> {
        let term = self.term(term)?;
        let event = SceneEvent::TermCreated {
            term: term.id,
            creator: term.creator,
            location: term.location,
        };
        self.events.push(event);
        Ok(())
    }

    fn announce_all(&mut self, terms: &[TermId]) -> Result<()> {
        terms.iter().try_for_each(|&term| self.announce(term))
    }

    fn place(&mut self, term: TermId, cell: usize) -> Result<()> {
        let (creator, side) = self.side_of(term)?;
        self.scale
            .plate_mut(side)
            .add_term(term, cell, &mut self.terms)?;
        self.creator_mut(creator)?.mark_on_plate(term);
        Ok(())
    }

    fn lift(&mut self, term: TermId) -> Result<(Side, usize)> {
        let (creator, side) = self.side_of(term)?;
        if !self.creator(creator)?.is_term_on_plate(term) {
            return Err(EqualityError::TermNotOnPlate(term));
        }
        let cell = self
            .scale
            .plate_mut(side)
            .remove_term(term, &mut self.terms)?;
        self.creator_mut(creator)?.mark_off_plate(term);
        Ok((side, cell))
    }

    /// Drops a term from the arena without touching any cell.
    fn forget(&mut self, term: TermId) -> Result<Term> {
        let removed = self
            .terms
            .remove(&term)
            .ok_or(EqualityError::TermNotFound(term))?;
        self.creator_mut(removed.creator)?.untrack(term);
        if let Some(partner) = removed.locked_partner.and_then(|p| self.terms.get_mut(&p)) {
            partner.locked_partner = None;
        }
        debug!("disposed {term}");
        self.events.push(SceneEvent::TermDisposed {
            term,
            creator: removed.creator,
        });
        Ok(removed)
    }

    /// Lifts a term off its plate if it is on one, then forgets it.
    fn discard(&mut self, term: TermId) -> Result<()> {
        let (creator, _) = self.side_of(term)?;
        if self.creator(creator)?.is_term_on_plate(term) {
            self.lift(term)?;
        }
        self.forget(term)?;
        Ok(())
    }

    fn discard_everything(&mut self) -> Result<()> {
        let all: Vec<TermId> = self
            .creators
            .iter()
            .flat_map(|creator| creator.all_terms().iter().copied())
            .collect();
        all.into_iter().try_for_each(|term| self.discard(term))
    }

    fn link_partners(&mut self, a: TermId, b: TermId) -> Result<()> {
        self.terms
            .get_mut(&a)
            .ok_or(EqualityError::TermNotFound(a))?
            .locked_partner = Some(b);
        self.terms
            .get_mut(&b)
            .ok_or(EqualityError::TermNotFound(b))?
            .locked_partner = Some(a);
        Ok(())
    }

    /// `creator`, or its inverse when `value` has the other sign.
    fn routed_creator(&self, creator: CreatorId, value: ReducedFraction) -> Result<CreatorId> {
        let c = self.creator(creator)?;
        if c.owns_sign(value) {
            return Ok(creator);
        }
        c.inverse().ok_or_else(|| EqualityError::Unsupported {
            operation: "create a term of the opposite sign",
            creator: c.name(),
        })
    }

    /// Puts a dropped term in `cell`, combining with the occupant when like
    /// terms combine.
    fn settle(&mut self, term: TermId, cell: usize, combine: bool) -> Result<DropOutcome> {
        let (_, side) = self.side_of(term)?;
        match self.scale.plate(side).term_for_cell(cell)? {
            Some(existing) if combine => {
                let creator = self.term(existing)?.creator;
                let combined = self.combine(creator, existing, term)?;
                if let Some(new) = combined {
                    self.place(new, cell)?;
                }
                Ok(DropOutcome::Combined { term: combined })
            }
            Some(_) => Err(EqualityError::CellOccupied(cell)),
            None => {
                self.place(term, cell)?;
                Ok(DropOutcome::Placed { cell })
            }
        }
    }

    fn combine(
        &mut self,
        creator: CreatorId,
        term1: TermId,
        term2: TermId,
    ) -> Result<Option<TermId>> {
        if term1 == term2 {
            return Err(EqualityError::Unsupported {
                operation: "combine a term with itself",
                creator: self.creator(creator)?.name(),
            });
        }
        let value = self
            .creator(creator)?
            .combined_value(self.term(term1)?, self.term(term2)?)?;
        let routed = value
            .map(|value| self.routed_creator(creator, value))
            .transpose()?;
        let location = self.term(term1)?.location;

        self.discard(term1)?;
        self.discard(term2)?;
        let combined = match (value, routed) {
            (Some(value), Some(routed)) => {
                let term = self.instantiate(routed, TermOptions::with_value(value))?;
                self.terms.move_to(term, location);
                Some(term)
            }
            _ => None,
        };
        debug!("combined {term1} and {term2} into {combined:?}");
        Ok(combined)
    }

    fn plan_step(&self, operation: &UniversalOperation, term: TermId) -> Result<Step> {
        let term_ref = self.term(term)?;
        let creator = term_ref.creator;
        Ok(
            match self.creator(creator)?.operation_outcome(operation, term_ref)? {
                OperationOutcome::Unchanged => Step::Keep,
                OperationOutcome::SumToZero => Step::Zero,
                OperationOutcome::Replace(value) => {
                    Step::Replace(self.routed_creator(creator, value)?, value)
                }
            },
        )
    }

    fn apply_step(&mut self, term: TermId, step: Step) -> Result<Option<TermId>> {
        match step {
            Step::Keep => Ok(Some(term)),
            Step::Zero => {
                self.discard(term)?;
                Ok(None)
            }
            Step::Replace(creator, value) => {
                let (old_creator, side) = self.side_of(term)?;
                let (location, diameter) = {
                    let old = self.term(term)?;
                    (old.location, old.diameter)
                };
                let new = self.instantiate(
                    creator,
                    TermOptions {
                        value: Some(value),
                        diameter: Some(diameter),
                    },
                )?;
                if self.creator(old_creator)?.is_term_on_plate(term) {
                    self.scale
                        .plate_mut(side)
                        .replace_term(term, new, &mut self.terms)?;
                    self.creator_mut(creator)?.mark_on_plate(new);
                } else {
                    self.terms.move_to(new, location);
                }
                self.forget(term)?;
                Ok(Some(new))
            }
        }
    }

    /// Weighs both plates as they will be once `creations` and `steps` are
    /// applied, so an operation whose result cannot be weighed is rejected
    /// before anything changes.
    fn check_planned_weights(
        &self,
        creations: &[(CreatorId, usize, ReducedFraction)],
        steps: &[(TermId, Step)],
    ) -> Result<()> {
        let weight_of = |creator: CreatorId, value: ReducedFraction| -> Result<ReducedFraction> {
            self.creator(creator)?
                .term_value(Some(value))?
                .weight(&self.variables)
        };
        for side in [Side::Left, Side::Right] {
            let mut weight = ReducedFraction::zero();
            for &(creator, _, value) in creations {
                if self.creator(creator)?.side() == side {
                    weight = weight.plus(weight_of(creator, value)?)?;
                }
            }
            for &(term, step) in steps {
                if self.side_of(term)?.1 != side {
                    continue;
                }
                let term_weight = match step {
                    Step::Keep => self.term(term)?.weight(&self.variables)?,
                    Step::Zero => continue,
                    Step::Replace(creator, value) => weight_of(creator, value)?,
                };
                weight = weight.plus(term_weight)?;
            }
        }
        Ok(())
    }

    /// The cell and value of the term an operation creates on `creator`'s
    /// plate, if any.
    fn plate_creation(
        &self,
        operation: &UniversalOperation,
        creator: CreatorId,
    ) -> Result<Option<(usize, ReducedFraction)>> {
        let creator = self.creator(creator)?;
        let Some(cell) = creator.like_terms_cell() else {
            return creator
                .plate_operation_value(operation, false)
                .map(|_| None);
        };
        let empty = self.scale.plate(creator.side()).is_empty_cell(cell)?;
        Ok(creator
            .plate_operation_value(operation, empty)?
            .map(|value| (cell, value)))
    }

    /// Where a term that is about to sum to zero sits, if on a plate.
    fn zero_record(&self, term: TermId) -> Result<Option<(Side, usize, Option<String>)>> {
        let (_, side) = self.side_of(term)?;
        let symbol = self.term(term)?.value.symbol().map(str::to_string);
        Ok(self
            .scale
            .plate(side)
            .cell_for_term(term)
            .map(|cell| (side, cell, symbol)))
    }

    fn sum_to_zero_cells(
        &self,
        zeros: Vec<(Side, usize, Option<String>)>,
    ) -> Result<Vec<SumToZeroCell>> {
        zeros
            .into_iter()
            .map(|(side, cell, symbol)| {
                Ok(SumToZeroCell {
                    side,
                    cell,
                    symbol,
                    location: self.scale.plate(side).location_for_cell(cell)?,
                })
            })
            .collect()
    }

    fn emit_sum_to_zero(&mut self, cells: Vec<SumToZeroCell>) {
        if !cells.is_empty() {
            self.events.push(SceneEvent::SumToZero { cells });
        }
    }

    /// Creates each creator's initial terms. Returns the new terms.
    fn populate(&mut self) -> Result<Vec<TermId>> {
        let mut created = Vec::new();
        for index in 0..self.creators.len() {
            let creator = &self.creators[index];
            let (id, side) = (creator.id(), creator.side());
            let count = creator.options().initial_number_of_terms_on_plate;
            if count == 0 {
                continue;
            }
            match (creator.combine_like_terms(), creator.like_terms_cell()) {
                (true, Some(cell)) => {
                    // like terms would combine anyway, so start with their sum
                    let options = match creator.default_value() {
                        Some(value) => TermOptions::with_value(value.times_integer(count as i64)?),
                        None => TermOptions::default(),
                    };
                    let term = self.instantiate(id, options)?;
                    self.place(term, cell)?;
                    created.push(term);
                }
                _ => {
                    for _ in 0..count {
                        let cell = self
                            .scale
                            .plate(side)
                            .first_empty_cell()
                            .ok_or(EqualityError::PlateFull)?;
                        let term = self.instantiate(id, TermOptions::default())?;
                        self.place(term, cell)?;
                        created.push(term);
                    }
                }
            }
        }
        Ok(created)
    }
}

/// Links creators on the same side whose values are negatives.
fn link_inverses(creators: &mut [TermCreator]) {
    let mut pairs = Vec::new();
    for (i, a) in creators.iter().enumerate() {
        for b in creators.iter() {
            if a.id() != b.id() && a.side() == b.side() && a.is_inverse_of(b) {
                pairs.push((i, b.id()));
            }
        }
    }
    for (i, inverse) in pairs {
        creators[i].set_inverse(inverse);
    }
}

/// Pairs left and right creators when the two lists are equivalent, in
/// order. Returns whether they were.
fn link_equivalents(creators: &mut [TermCreator]) -> bool {
    let (left, right): (Vec<usize>, Vec<usize>) =
        (0..creators.len()).partition(|&i| creators[i].side() == Side::Left);
    if left.is_empty()
        || left.len() != right.len()
        || !left
            .iter()
            .zip(&right)
            .all(|(&l, &r)| creators[l].is_equivalent_to(&creators[r]))
    {
        return false;
    }
    for (l, r) in left.into_iter().zip(right) {
        let (left_id, right_id) = (creators[l].id(), creators[r].id());
        creators[l].set_equivalent(right_id);
        creators[r].set_equivalent(left_id);
    }
    true
}

/// Gives each creator its cell in the bottom row, left to right. A creator
/// and its inverse share a cell.
fn assign_like_terms_cells(creators: &mut [TermCreator], grid: &GridSettings) -> Result<()> {
    let bottom_row = grid.rows.saturating_sub(1);
    for side in [Side::Left, Side::Right] {
        let mut next_column = 0;
        for i in 0..creators.len() {
            if creators[i].side() != side {
                continue;
            }
            let shared = creators[i]
                .inverse()
                .and_then(|inverse| creators[inverse.0].like_terms_cell());
            let cell = match shared {
                Some(cell) => cell,
                None => {
                    if next_column >= grid.columns {
                        return Err(EqualityError::InvalidSettings(format!(
                            "{side:?} side has more kinds of terms than columns"
                        )));
                    }
                    next_column += 1;
                    bottom_row * grid.columns + next_column - 1
                }
            };
            creators[i].set_like_terms_cell(cell);
        }
    }
    Ok(())
}
