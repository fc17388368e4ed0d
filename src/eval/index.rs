use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use super::Inputs;
use crate::error::{SymError, SymResult};
use crate::expr::{Expression, Node, VarKind};
use crate::utils::Tree;

/// Name to slot tables, one per variable kind.
///
/// Slots are handed out in order of first appearance in a preorder walk, so
/// the tables also list the variables in that order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTables {
    pub bools: IndexMap<String, usize>,
    pub ints: IndexMap<String, usize>,
    pub reals: IndexMap<String, usize>,
}

impl SlotTables {
    #[must_use]
    pub fn table(&self, kind: VarKind) -> &IndexMap<String, usize> {
        match kind {
            VarKind::Bool => &self.bools,
            VarKind::Int => &self.ints,
            VarKind::Real => &self.reals,
        }
    }

    fn table_mut(&mut self, kind: VarKind) -> &mut IndexMap<String, usize> {
        match kind {
            VarKind::Bool => &mut self.bools,
            VarKind::Int => &mut self.ints,
            VarKind::Real => &mut self.reals,
        }
    }

    #[must_use]
    pub fn slot(&self, kind: VarKind, name: &str) -> Option<usize> {
        self.table(kind).get(name).copied()
    }

    /// Length the input array of `kind` needs.
    #[must_use]
    pub fn len(&self, kind: VarKind) -> usize {
        self.table(kind).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bools.is_empty() && self.ints.is_empty() && self.reals.is_empty()
    }

    fn claim(&mut self, kind: VarKind, name: &str) -> usize {
        let table = self.table_mut(kind);
        let next = table.len();
        *table.entry(name.to_owned()).or_insert(next)
    }
}

/// Minimum input lengths a tree with assigned slots needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Arity {
    pub bools: usize,
    pub ints: usize,
    pub reals: usize,
}

impl Arity {
    /// # Errors
    /// Fails with [`SymError::UnassignedSlot`] if a variable has no slot yet.
    pub fn of(expr: &Expression) -> SymResult<Self> {
        let mut arity = Arity::default();
        let mut missing = None;
        expr.preorder(&mut |node| {
            if let Node::Variable(v) = node.node() {
                match v.slot() {
                    Some(slot) => {
                        let len = arity.get_mut(v.kind());
                        *len = (*len).max(slot + 1);
                    }
                    None => missing = missing.take().or_else(|| Some(v.name().to_owned())),
                }
            }
        });
        match missing {
            Some(name) => Err(SymError::UnassignedSlot(name)),
            None => Ok(arity),
        }
    }

    #[must_use]
    pub fn get(&self, kind: VarKind) -> usize {
        match kind {
            VarKind::Bool => self.bools,
            VarKind::Int => self.ints,
            VarKind::Real => self.reals,
        }
    }

    fn get_mut(&mut self, kind: VarKind) -> &mut usize {
        match kind {
            VarKind::Bool => &mut self.bools,
            VarKind::Int => &mut self.ints,
            VarKind::Real => &mut self.reals,
        }
    }

    /// # Errors
    /// Fails with [`SymError::IndexOutOfRange`] naming the highest slot of the
    /// first kind whose input array is too short.
    pub fn check(&self, inputs: &Inputs<'_>) -> SymResult<()> {
        for kind in [VarKind::Bool, VarKind::Int, VarKind::Real] {
            let (need, len) = (self.get(kind), inputs.len(kind));
            if need > len {
                return Err(SymError::IndexOutOfRange {
                    kind,
                    slot: need - 1,
                    len,
                });
            }
        }
        Ok(())
    }
}

impl Expression {
    /// Assigns every variable its slot in the input array of its kind.
    ///
    /// The first occurrence of a name claims the next free slot, later
    /// occurrences reuse it. Running it again on the same tree gives the same
    /// slots.
    pub fn put_indexes(&mut self) -> SlotTables {
        let mut tables = SlotTables::default();
        self.preorder_mut(&mut |node| {
            if let Node::Variable(v) = node.node_mut() {
                let slot = tables.claim(v.kind(), v.name());
                v.set_slot(slot);
            }
        });
        debug!(
            "Assigned {} bool, {} int and {} real slots",
            tables.bools.len(),
            tables.ints.len(),
            tables.reals.len()
        );
        tables
    }
}
