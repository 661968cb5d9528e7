//! Insertion-ordered collection of variables keyed by identifier.

use std::collections::HashMap;

use super::Variable;

/// Variables needed by one rendering pass.
///
/// Keyed by identifier; iteration follows first insertion, which is also the order the
/// resolver seeds its worklist with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSet {
    order: Vec<String>,
    entries: HashMap<String, Variable>,
}

impl VariableSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable. Returns `false` if its identifier was already present, in which
    /// case the set is left unchanged.
    pub fn insert(&mut self, variable: Variable) -> bool {
        let id = variable.identifier().to_string();
        if self.entries.contains_key(&id) {
            return false;
        }
        self.order.push(id.clone());
        self.entries.insert(id, variable);
        true
    }

    /// Remove a variable by identifier.
    pub fn remove(&mut self, identifier: &str) -> Option<Variable> {
        let removed = self.entries.remove(identifier)?;
        self.order.retain(|id| id != identifier);
        Some(removed)
    }

    /// Look up a variable by identifier.
    pub fn get(&self, identifier: &str) -> Option<&Variable> {
        self.entries.get(identifier)
    }

    /// Whether a variable with this identifier is present.
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Identifiers in insertion order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Remove every variable.
    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}

impl FromIterator<Variable> for VariableSet {
    fn from_iter<I: IntoIterator<Item = Variable>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<Variable> for VariableSet {
    fn extend<I: IntoIterator<Item = Variable>>(&mut self, iter: I) {
        for variable in iter {
            self.insert(variable);
        }
    }
}
