//! Symbolic variables and their def/use dependency graph.
//!
//! Variables live in a contiguous arena indexed by [`VarId`]. Parent edges
//! always point at variables defined earlier in the trace, so the graph is
//! acyclic by construction and plain BFS suffices for the closure queries.

use alloy_primitives::U256;

use crate::FastHashSet;

/// Arena index of a symbolic variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    /// Concrete value, when the trace or constant folding produced one.
    pub value: Option<U256>,
    pub parents: Vec<VarId>,
    pub children: Vec<VarId>,
}

/// Owns every symbolic variable of one lifted trace.
#[derive(Debug, Clone, Default)]
pub struct VarArena {
    vars: Vec<Variable>,
}

impl VarArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a variable, wiring the child edge on each parent.
    pub fn alloc(&mut self, name: String, value: Option<U256>, parents: Vec<VarId>) -> VarId {
        let id = VarId(self.vars.len() as u32);
        for &parent in &parents {
            self.vars[parent.0 as usize].children.push(id);
        }
        self.vars.push(Variable { name, value, parents, children: Vec::new() });
        id
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn get(&self, id: VarId) -> &Variable {
        &self.vars[id.0 as usize]
    }

    pub fn value(&self, id: VarId) -> Option<U256> {
        self.get(id).value
    }

    pub fn parents(&self, id: VarId) -> &[VarId] {
        &self.get(id).parents
    }

    pub fn children(&self, id: VarId) -> &[VarId] {
        &self.get(id).children
    }

    /// Transitive closure over parent edges, including `id` itself.
    pub fn ancestors(&self, id: VarId) -> FastHashSet<VarId> {
        self.closure(id, |v| self.get(v).parents.as_slice())
    }

    /// Transitive closure over child edges, including `id` itself.
    pub fn descendants(&self, id: VarId) -> FastHashSet<VarId> {
        self.closure(id, |v| self.get(v).children.as_slice())
    }

    fn closure<'a>(&'a self, id: VarId, next: impl Fn(VarId) -> &'a [VarId]) -> FastHashSet<VarId> {
        let mut seen = FastHashSet::default();
        let mut queue = std::collections::VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if seen.insert(current) {
                queue.extend(next(current).iter().copied());
            }
        }
        seen
    }

    pub fn value_eq(&self, a: VarId, b: VarId) -> bool {
        self.value(a) == self.value(b)
    }

    pub fn value_ne(&self, a: VarId, b: VarId) -> bool {
        !self.value_eq(a, b)
    }

    pub fn value_lt(&self, a: VarId, b: VarId) -> bool {
        self.value_ord(a, b, |a, b| a < b)
    }

    pub fn value_le(&self, a: VarId, b: VarId) -> bool {
        self.value_ord(a, b, |a, b| a <= b)
    }

    pub fn value_gt(&self, a: VarId, b: VarId) -> bool {
        self.value_ord(a, b, |a, b| a > b)
    }

    pub fn value_ge(&self, a: VarId, b: VarId) -> bool {
        self.value_ord(a, b, |a, b| a >= b)
    }

    // Ordering comparisons are vacuously false when either side has no
    // concrete value; equality treats two unconstrained variables as equal.
    fn value_ord(&self, a: VarId, b: VarId, cmp: impl Fn(U256, U256) -> bool) -> bool {
        match (self.value(a), self.value(b)) {
            (Some(a), Some(b)) => cmp(a, b),
            _ => false,
        }
    }
}

impl std::ops::Index<VarId> for VarArena {
    type Output = Variable;

    fn index(&self, id: VarId) -> &Variable {
        self.get(id)
    }
}
