//! Design Generator - factorial expansion of factor levels
//!
//! ## Ordering
//!
//! ```text
//! factors: Tone[formal, casual] x Length[short, long]
//!
//! combinations:
//!   0: Tone=formal, Length=short
//!   1: Tone=formal, Length=long
//!   2: Tone=casual, Length=short
//!   3: Tone=casual, Length=long
//! ```
//!
//! The first factor is the outermost loop and level order is preserved
//! inside every factor. Zero factors yield a single empty combination so
//! a design without factors still produces one trial per covariate.

use serde::{Deserialize, Serialize};

/// One value of a [`Factor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    name: String,
    prompt: String,
}

impl Level {
    /// Create a level with the prompt fragment it injects.
    #[must_use]
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
        }
    }

    /// Level name (unique within its factor by convention, not enforced).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prompt fragment injected when this level is active.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// An experimental dimension with an ordered list of levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factor {
    name: String,
    levels: Vec<Level>,
}

impl Factor {
    /// Create a factor from its levels.
    #[must_use]
    pub fn new(name: impl Into<String>, levels: Vec<Level>) -> Self {
        Self {
            name: name.into(),
            levels,
        }
    }

    /// Factor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Levels in declaration order.
    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }
}

/// A single factor assignment inside a [`Combination`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Name of the assigned factor
    pub factor: String,
    /// Level chosen for that factor
    pub level: Level,
}

/// One assignment of every factor to one of its levels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combination {
    assignments: Vec<Assignment>,
}

impl Combination {
    /// The empty combination (identity of the Cartesian product).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assignments in factor order.
    #[must_use]
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Number of assigned factors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// True for the empty combination.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Level assigned to `factor`, if the factor is part of this combination.
    #[must_use]
    pub fn level_for(&self, factor: &str) -> Option<&Level> {
        self.assignments
            .iter()
            .find(|a| a.factor == factor)
            .map(|a| &a.level)
    }

    /// Prompt fragments of every assigned level, in factor order.
    #[must_use]
    pub fn level_prompts(&self) -> Vec<&str> {
        self.assignments.iter().map(|a| a.level.prompt()).collect()
    }

    fn extended(&self, factor: &Factor, level: &Level) -> Self {
        let mut assignments = Vec::with_capacity(self.assignments.len() + 1);
        assignments.extend(self.assignments.iter().cloned());
        assignments.push(Assignment {
            factor: factor.name().to_string(),
            level: level.clone(),
        });
        Self { assignments }
    }
}

/// Expand factors into every combination (Cartesian product).
///
/// Produces exactly `∏ |levels(f)|` combinations; a factor with no levels
/// therefore empties the design. No sorting, filtering or deduplication is
/// applied.
///
/// ## Example
///
/// ```rust
/// use factorlab::design::{generate_combinations, Factor, Level};
///
/// let factors = vec![
///     Factor::new("tone", vec![Level::new("formal", "Be formal."), Level::new("casual", "Be casual.")]),
///     Factor::new("length", vec![Level::new("short", "Be brief."), Level::new("long", "Elaborate.")]),
/// ];
///
/// let combos = generate_combinations(&factors);
/// assert_eq!(combos.len(), 4);
/// assert_eq!(combos[1].level_for("length").unwrap().name(), "long");
/// ```
#[must_use]
pub fn generate_combinations(factors: &[Factor]) -> Vec<Combination> {
    let mut working = vec![Combination::empty()];

    for factor in factors {
        let mut next = Vec::with_capacity(working.len() * factor.levels().len());
        for partial in &working {
            for level in factor.levels() {
                next.push(partial.extended(factor, level));
            }
        }
        working = next;
    }

    working
}

/// Index pair identifying one trial inside a model's stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrialSlot {
    /// Index into the covariate list
    pub covariate_index: usize,
    /// Index into the combination list
    pub combination_index: usize,
}

/// Enumerate trial slots with covariates as the outer loop.
#[must_use]
pub fn trial_slots(combination_count: usize, covariate_count: usize) -> Vec<TrialSlot> {
    (0..covariate_count)
        .flat_map(|covariate_index| {
            (0..combination_count).map(move |combination_index| TrialSlot {
                covariate_index,
                combination_index,
            })
        })
        .collect()
}
