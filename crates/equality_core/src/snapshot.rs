//! Snapshots of scene state, and the fixed set of slots the user saves them in.

use crate::error::{EqualityError, Result};
use crate::fraction::ReducedFraction;
use crate::term_creator::CreatorId;
use serde::{Deserialize, Serialize};

/// Number of snapshot slots per scene.
pub const NUMBER_OF_SNAPSHOTS: usize = 5;

/// One term on a plate, as recorded by its creator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum TermRecord {
    Constant {
        cell_index: usize,
        constant_value: ReducedFraction,
    },
    Variable {
        cell_index: usize,
        coefficient: ReducedFraction,
    },
    Mystery {
        cell_index: usize,
    },
}

impl TermRecord {
    pub fn cell_index(&self) -> usize {
        match self {
            TermRecord::Constant { cell_index, .. }
            | TermRecord::Variable { cell_index, .. }
            | TermRecord::Mystery { cell_index } => *cell_index,
        }
    }

    /// Constant value or coefficient.
    pub fn value(&self) -> Option<ReducedFraction> {
        match self {
            TermRecord::Constant { constant_value, .. } => Some(*constant_value),
            TermRecord::Variable { coefficient, .. } => Some(*coefficient),
            TermRecord::Mystery { .. } => None,
        }
    }
}

/// Everything one creator has on its plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorSnapshot {
    pub creator: CreatorId,
    pub records: Vec<TermRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub creators: Vec<CreatorSnapshot>,
    /// Values of the scene's variables, in scene order.
    pub variable_values: Vec<i64>,
}

/// Fixed slots holding saved snapshots, one of which may be selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSlots {
    slots: Vec<Option<SceneSnapshot>>,
    selected: Option<usize>,
}

impl Default for SnapshotSlots {
    fn default() -> Self {
        Self::new(NUMBER_OF_SNAPSHOTS)
    }
}

impl SnapshotSlots {
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![None; count],
            selected: None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    fn check(&self, index: usize) -> Result<()> {
        if index < self.slots.len() {
            Ok(())
        } else {
            Err(EqualityError::InvalidSnapshotSlot(index))
        }
    }

    pub fn get(&self, index: usize) -> Result<Option<&SceneSnapshot>> {
        self.check(index)?;
        Ok(self.slots[index].as_ref())
    }

    pub fn first_empty(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Stores a snapshot and selects its slot.
    pub fn save(&mut self, index: usize, snapshot: SceneSnapshot) -> Result<()> {
        self.check(index)?;
        self.slots[index] = Some(snapshot);
        self.selected = Some(index);
        Ok(())
    }

    /// Only slots that hold a snapshot can be selected.
    pub fn select(&mut self, index: usize) -> Result<()> {
        self.check(index)?;
        if self.slots[index].is_none() {
            return Err(EqualityError::SnapshotMismatch(format!(
                "slot {index} is empty"
            )));
        }
        self.selected = Some(index);
        Ok(())
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_snapshot(&self) -> Option<&SceneSnapshot> {
        self.selected.and_then(|index| self.slots[index].as_ref())
    }

    pub fn delete(&mut self, index: usize) -> Result<Option<SceneSnapshot>> {
        self.check(index)?;
        if self.selected == Some(index) {
            self.selected = None;
        }
        Ok(self.slots[index].take())
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(cell: usize) -> SceneSnapshot {
        SceneSnapshot {
            creators: vec![CreatorSnapshot {
                creator: CreatorId(0),
                records: vec![TermRecord::Constant {
                    cell_index: cell,
                    constant_value: ReducedFraction::with_integer(2),
                }],
            }],
            variable_values: vec![],
        }
    }

    #[test]
    fn save_selects_and_delete_deselects() {
        let mut slots = SnapshotSlots::default();
        assert_eq!(slots.len(), NUMBER_OF_SNAPSHOTS);
        assert!(slots.is_empty());

        slots.save(2, snapshot(35)).unwrap();
        assert_eq!(slots.selected(), Some(2));
        assert_eq!(slots.first_empty(), Some(0));
        assert_eq!(slots.selected_snapshot(), Some(&snapshot(35)));

        assert!(slots.select(0).is_err());
        assert_eq!(slots.delete(2).unwrap(), Some(snapshot(35)));
        assert_eq!(slots.selected(), None);
        assert_eq!(
            slots.save(NUMBER_OF_SNAPSHOTS, snapshot(1)),
            Err(EqualityError::InvalidSnapshotSlot(NUMBER_OF_SNAPSHOTS))
        );
    }

    #[test]
    fn records_serialize_with_view_field_names() {
        let json = serde_json::to_value(&snapshot(7).creators[0].records[0]).unwrap();
        assert_eq!(json["type"], "Constant");
        assert_eq!(json["cellIndex"], 7);
        assert_eq!(json["constantValue"]["numerator"], 2);
        assert_eq!(json["constantValue"]["denominator"], 1);
    }
}
