//! The ACTION/GOTO parse table.
//!
//! The table is addressed by dense indices: terminal columns are the
//! grammar's declared terminal order plus one extra column for the end
//! marker; nonterminal columns are declared order. Dense addressing makes
//! the table independent of interner state, which is what lets it be
//! serialized to the cache file and loaded by a later run, as long as the
//! grammar file (and therefore the dense order) is byte-identical, which
//! the cache's grammar hash guarantees.

use serde::{Deserialize, Serialize};

/// One ACTION cell. Absent cells (`None` in the row) are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Push the state and the current token; advance the input.
    Shift(usize),
    /// Reduce by the production with this index.
    Reduce(usize),
    /// The input is a complete sentence.
    Accept,
}

/// The generated parse table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseTable {
    pub state_count: usize,
    /// `action[state][terminal_column]`; the last column is the end marker.
    pub action: Vec<Vec<Option<Action>>>,
    /// `goto[state][nonterminal_index]`.
    pub goto: Vec<Vec<Option<usize>>>,
}

impl ParseTable {
    pub fn action_at(&self, state: usize, terminal_column: usize) -> Option<Action> {
        self.action[state][terminal_column]
    }

    pub fn goto_at(&self, state: usize, nonterminal_index: usize) -> Option<usize> {
        self.goto[state][nonterminal_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_round_trips_through_json() {
        let table = ParseTable {
            state_count: 2,
            action: vec![
                vec![Some(Action::Shift(1)), None],
                vec![Some(Action::Reduce(3)), Some(Action::Accept)],
            ],
            goto: vec![vec![Some(1)], vec![None]],
        };
        let json = serde_json::to_string(&table).unwrap();
        let back: ParseTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
