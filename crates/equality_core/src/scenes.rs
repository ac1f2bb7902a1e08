//! The built-in scenes.
//!
//! The basics scenes weigh mystery objects whose integer weights the user
//! discovers by balancing them. Numbers and variables introduce constants and
//! `x`, and solving combines like terms so universal operations can be
//! applied to both sides.

use crate::balance_scale::ScaleSettings;
use crate::error::{EqualityError, Result};
use crate::scene::{CreatorSpec, Scene, SceneSettings};
use crate::term::{Variable, VariableId, BIG_TERM_DIAMETER, SMALL_TERM_DIAMETER};
use crate::term_creator::TermCreatorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneKind {
    Shapes,
    Fruits,
    Coins,
    Animals,
    Numbers,
    Variables,
    Solving,
}

impl SceneKind {
    pub const ALL: [SceneKind; 7] = [
        SceneKind::Shapes,
        SceneKind::Fruits,
        SceneKind::Coins,
        SceneKind::Animals,
        SceneKind::Numbers,
        SceneKind::Variables,
        SceneKind::Solving,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SceneKind::Shapes => "shapes",
            SceneKind::Fruits => "fruits",
            SceneKind::Coins => "coins",
            SceneKind::Animals => "animals",
            SceneKind::Numbers => "numbers",
            SceneKind::Variables => "variables",
            SceneKind::Solving => "solving",
        }
    }

    pub fn settings(self) -> SceneSettings {
        let basics = |max_weight: f64| SceneSettings {
            name: self.name().to_string(),
            scale: ScaleSettings {
                max_weight,
                ..ScaleSettings::default()
            },
            ..SceneSettings::default()
        };
        match self {
            SceneKind::Shapes | SceneKind::Fruits | SceneKind::Coins => basics(30.0),
            SceneKind::Animals => basics(50.0),
            SceneKind::Numbers | SceneKind::Variables => SceneSettings {
                name: self.name().to_string(),
                lockable: true,
                term_diameter: SMALL_TERM_DIAMETER,
                ..SceneSettings::default()
            },
            SceneKind::Solving => SceneSettings {
                name: self.name().to_string(),
                combine_like_terms: true,
                lockable: true,
                term_diameter: BIG_TERM_DIAMETER,
                ..SceneSettings::default()
            },
        }
    }

    /// Creators for one side; both sides get the same list.
    fn creators(self) -> Vec<CreatorSpec> {
        let kinds = match self {
            SceneKind::Shapes => vec![
                TermCreatorKind::mystery("sphere", 2),
                TermCreatorKind::mystery("square", 3),
                TermCreatorKind::constant(1),
            ],
            SceneKind::Fruits => vec![
                TermCreatorKind::mystery("apple", 4),
                TermCreatorKind::mystery("lemon", 5),
                TermCreatorKind::mystery("orange", 2),
            ],
            SceneKind::Coins => vec![
                TermCreatorKind::mystery("coin1", 3),
                TermCreatorKind::mystery("coin2", 2),
                TermCreatorKind::mystery("coin3", 5),
            ],
            SceneKind::Animals => vec![
                TermCreatorKind::mystery("dog", 11),
                TermCreatorKind::mystery("turtle", 4),
                TermCreatorKind::mystery("cat", 6),
            ],
            SceneKind::Numbers => vec![TermCreatorKind::constant(1), TermCreatorKind::constant(-1)],
            SceneKind::Variables | SceneKind::Solving => vec![
                TermCreatorKind::variable("x", VariableId(0), 1),
                TermCreatorKind::variable("x", VariableId(0), -1),
                TermCreatorKind::constant(1),
                TermCreatorKind::constant(-1),
            ],
        };
        kinds.into_iter().map(CreatorSpec::new).collect()
    }

    fn variables(self) -> Vec<Variable> {
        match self {
            SceneKind::Variables | SceneKind::Solving => vec![Variable::x()],
            _ => Vec::new(),
        }
    }

    pub fn build(self) -> Result<Scene> {
        Scene::new(
            self.settings(),
            self.variables(),
            self.creators(),
            self.creators(),
        )
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SceneKind {
    type Err = EqualityError;

    fn from_str(name: &str) -> Result<Self> {
        SceneKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| EqualityError::InvalidSettings(format!("unknown scene: {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance_scale::Side;
    use crate::operation::UniversalOperation;

    #[test]
    fn every_scene_builds_empty_and_balanced() {
        for kind in SceneKind::ALL {
            let scene = kind.build().unwrap();
            assert_eq!(scene.name(), kind.name());
            assert_eq!(scene.number_of_terms_on_scale(), 0);
            assert!(scene.is_balanced());
            assert_eq!(kind.name().parse::<SceneKind>(), Ok(kind));
        }
        assert!("lab".parse::<SceneKind>().is_err());
    }

    #[test]
    fn only_solving_supports_universal_operations() {
        let op = UniversalOperation::parse("+", 1).unwrap();
        for kind in SceneKind::ALL {
            let mut scene = kind.build().unwrap();
            let result = scene.apply_universal_operation(&op);
            assert_eq!(result.is_ok(), kind == SceneKind::Solving, "{kind}");
        }
    }

    #[test]
    fn basics_scenes_cannot_be_locked() {
        let mut animals = SceneKind::Animals.build().unwrap();
        assert!(!animals.is_lockable());
        assert!(animals.set_locked(true).is_err());
        assert_eq!(animals.scale().settings().max_weight, 50.0);

        let mut numbers = SceneKind::Numbers.build().unwrap();
        numbers.set_locked(true).unwrap();
        assert_eq!(numbers.creators_on_side(Side::Left).count(), 2);
    }
}
