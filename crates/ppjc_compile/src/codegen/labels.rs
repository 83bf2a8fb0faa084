//! Unique label allocation.
//!
//! Generated labels come in categories (`L_IF`, `L_LOOP`, `L_SC`, …),
//! each with its own monotonic counter, so two labels are equal only if
//! the same allocation produced them. Function and global labels derive
//! from the (unique) identifier instead: `F_<NAME>` and `G_<NAME>`,
//! uppercased.

use std::collections::HashMap;

/// Per-category monotonic label counters.
#[derive(Debug, Default)]
pub struct LabelAllocator {
    counters: HashMap<&'static str, usize>,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next label in a category: `L_<CATEGORY>_<n>`.
    pub fn next(&mut self, category: &'static str) -> String {
        let counter = self.counters.entry(category).or_insert(0);
        let label = format!("L_{}_{}", category, counter);
        *counter += 1;
        label
    }

    /// The entry label of a function: `F_<NAME>` uppercased.
    pub fn function(name: &str) -> String {
        format!("F_{}", name.to_uppercase())
    }

    /// The data label of a global variable: `G_<NAME>` uppercased.
    pub fn global(name: &str) -> String {
        format!("G_{}", name.to_uppercase())
    }
}
