//! Game-wide values (score, level, flags) with undo/redo.
//!
//! `Globals` is owned by the game loop and handed to the per-tick callback;
//! there is no global instance. Every change pushes a full snapshot onto the
//! history, so undo and redo just move a cursor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GlobalValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for GlobalValue {
    fn from(v: bool) -> Self {
        GlobalValue::Bool(v)
    }
}

impl From<i64> for GlobalValue {
    fn from(v: i64) -> Self {
        GlobalValue::Int(v)
    }
}

impl From<i32> for GlobalValue {
    fn from(v: i32) -> Self {
        GlobalValue::Int(v as i64)
    }
}

impl From<f64> for GlobalValue {
    fn from(v: f64) -> Self {
        GlobalValue::Float(v)
    }
}

impl From<&str> for GlobalValue {
    fn from(v: &str) -> Self {
        GlobalValue::Text(v.to_string())
    }
}

impl From<String> for GlobalValue {
    fn from(v: String) -> Self {
        GlobalValue::Text(v)
    }
}

impl GlobalValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            GlobalValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            GlobalValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

pub type GameState = BTreeMap<String, GlobalValue>;

/// Build a `GameState` from key/value pairs
pub fn state<K, V, I>(pairs: I) -> GameState
where
    K: Into<String>,
    V: Into<GlobalValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

#[derive(Clone, Debug)]
pub struct Globals {
    history: Vec<GameState>,
    /// Index of the current snapshot
    cursor: usize,
}

impl Globals {
    pub fn new(initial: GameState) -> Self {
        Self {
            history: vec![initial],
            cursor: 0,
        }
    }

    fn push(&mut self, snapshot: GameState) {
        // A new change drops anything that could have been redone
        self.history.truncate(self.cursor + 1);
        self.history.push(snapshot);
        self.cursor = self.history.len() - 1;
    }

    /// Replace the whole state.
    pub fn set(&mut self, state: GameState) {
        self.push(state);
    }

    /// Merge `changes` over the current state (shallow, key by key).
    pub fn update(&mut self, changes: GameState) {
        let mut next = self.current().clone();
        next.extend(changes);
        self.push(next);
    }

    pub fn current(&self) -> &GameState {
        &self.history[self.cursor]
    }

    pub fn get(&self, key: &str) -> Option<&GlobalValue> {
        self.current().get(key)
    }

    pub fn has_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn has_redo(&self) -> bool {
        self.cursor + 1 < self.history.len()
    }

    pub fn undo(&mut self) -> bool {
        if !self.has_undo() {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.has_redo() {
            return false;
        }
        self.cursor += 1;
        true
    }
}

impl Default for Globals {
    fn default() -> Self {
        Self::new(GameState::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_adds_history() {
        let mut globals = Globals::new(state([("score", 0)]));
        assert!(!globals.has_undo());

        globals.set(state([("score", 1)]));
        assert!(globals.has_undo());
        assert_eq!(globals.current(), &state([("score", 1)]));
    }

    #[test]
    fn test_update_then_undo() {
        let mut globals = Globals::new(state([("score", 0)]));
        globals.update(state([("score", 1)]));
        assert_eq!(globals.get("score").and_then(GlobalValue::as_int), Some(1));

        assert!(globals.undo());
        assert_eq!(globals.get("score").and_then(GlobalValue::as_int), Some(0));
        assert!(!globals.undo());
    }

    #[test]
    fn test_update_merges() {
        let mut globals = Globals::default();
        globals.update(state([("score", GlobalValue::Int(0)), ("level", GlobalValue::Int(1))]));
        globals.update(state([("score", GlobalValue::Int(1)), ("completed", GlobalValue::Bool(true))]));

        let expected = state([
            ("score", GlobalValue::Int(1)),
            ("level", GlobalValue::Int(1)),
            ("completed", GlobalValue::Bool(true)),
        ]);
        assert_eq!(globals.current(), &expected);
    }

    #[test]
    fn test_redo_branch_dropped_on_change() {
        let mut globals = Globals::new(state([("score", 0)]));
        globals.update(state([("score", 1)]));
        globals.update(state([("score", 2)]));

        globals.undo();
        assert!(globals.has_redo());
        assert!(globals.redo());
        assert_eq!(globals.get("score"), Some(&GlobalValue::Int(2)));

        globals.undo();
        globals.undo();
        globals.update(state([("name", "ada")]));
        assert!(!globals.has_redo());
        assert_eq!(globals.get("score"), Some(&GlobalValue::Int(0)));
        assert_eq!(globals.get("name"), Some(&GlobalValue::Text("ada".into())));
    }
}
