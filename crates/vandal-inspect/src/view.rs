//! The view algebra the heuristics are written in.
//!
//! An [`OpView`] is a set of same-opcode ops with a working-set mask and
//! per-op link sets into other views. Every combinator mutates the view in
//! place and returns it for chaining; combinators that operate on links
//! require a current link cursor, set by the most recent [`OpView::link`].

use alloy_primitives::{Address, U256};
use itertools::Itertools;

use crate::{
    errors::QueryError,
    loader::{OpId, OpLoader},
    meta_op::{MetaOp, OpAttr, VarSlot},
    results::{Results, RowOp},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    pub fn compare<T: PartialOrd>(&self, a: T, b: T) -> bool {
        match self {
            Cmp::Eq => a == b,
            Cmp::Ne => a != b,
            Cmp::Lt => a < b,
            Cmp::Le => a <= b,
            Cmp::Gt => a > b,
            Cmp::Ge => a >= b,
        }
    }
}

/// Variable-graph relations usable in link predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Ancestors,
    Descendants,
    Parents,
    Children,
}

/// Executing-address actions for [`OpView::source_address`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressAction {
    Eq,
    Ne,
}

/// A discrete filter: `op.attr CMP value`.
#[derive(Debug, Clone, Copy)]
pub struct OpFilter {
    pub attr: OpAttr,
    pub cmp: Cmp,
    pub value: U256,
}

impl OpFilter {
    pub fn new(attr: OpAttr, cmp: Cmp, value: u64) -> Self {
        Self { attr, cmp, value: U256::from(value) }
    }

    pub fn depth_eq(value: u64) -> Self {
        Self::new(OpAttr::Depth, Cmp::Eq, value)
    }

    pub fn depth_gt(value: u64) -> Self {
        Self::new(OpAttr::Depth, Cmp::Gt, value)
    }

    pub fn call_index_eq(value: u64) -> Self {
        Self::new(OpAttr::CallIndex, Cmp::Eq, value)
    }

    pub fn op_index_lt(value: u64) -> Self {
        Self::new(OpAttr::OpIndex, Cmp::Lt, value)
    }

    fn passes(&self, op: &MetaOp) -> bool {
        self.cmp.compare(op.attr(self.attr), self.value)
    }
}

/// A cross filter between a linked pair: `a.attr CMP (b.attr + bias)`.
#[derive(Debug, Clone, Copy)]
pub struct LinkFilter {
    pub attr: OpAttr,
    pub cmp: Cmp,
    pub bias: u64,
}

impl LinkFilter {
    pub const OP_INDEX_LT: Self = Self { attr: OpAttr::OpIndex, cmp: Cmp::Lt, bias: 0 };
    pub const OP_INDEX_GT: Self = Self { attr: OpAttr::OpIndex, cmp: Cmp::Gt, bias: 0 };
    pub const CALL_INDEX_EQ: Self = Self { attr: OpAttr::CallIndex, cmp: Cmp::Eq, bias: 0 };
    pub const DEPTH_EQ: Self = Self { attr: OpAttr::Depth, cmp: Cmp::Eq, bias: 0 };

    pub const fn new(attr: OpAttr, cmp: Cmp) -> Self {
        Self { attr, cmp, bias: 0 }
    }

    pub const fn biased(attr: OpAttr, cmp: Cmp, bias: u64) -> Self {
        Self { attr, cmp, bias }
    }

    fn passes(&self, a: &MetaOp, b: &MetaOp) -> bool {
        self.cmp
            .compare(a.attr(self.attr), b.attr(self.attr).wrapping_add(U256::from(self.bias)))
    }
}

pub struct OpView<'a> {
    loader: &'a OpLoader<'a>,
    opcode: &'static str,
    ops: Vec<OpId>,
    working_set: Vec<bool>,
    /// Per local op: link sets in view-insertion order.
    links: Vec<Vec<(&'static str, Vec<OpId>)>>,
    current_link: Option<&'static str>,
}

impl<'a> OpView<'a> {
    pub(crate) fn new(loader: &'a OpLoader<'a>, opcode: &'static str, ops: Vec<OpId>) -> Self {
        let len = ops.len();
        Self {
            loader,
            opcode,
            ops,
            working_set: vec![true; len],
            links: vec![Vec::new(); len],
            current_link: None,
        }
    }

    pub fn opcode(&self) -> &'static str {
        self.opcode
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Ops still alive after filtering.
    pub fn active(&self) -> Vec<&'a MetaOp> {
        (0..self.ops.len())
            .filter(|&i| self.working_set[i])
            .map(|i| self.meta(i))
            .collect()
    }

    fn meta(&self, local: usize) -> &'a MetaOp {
        &self.loader.ops()[self.ops[local]]
    }

    fn current(&self) -> Result<&'static str, QueryError> {
        debug_assert!(self.current_link.is_some(), "no current link");
        self.current_link.ok_or(QueryError::NoCurrentLink)
    }

    fn link_set_mut(&mut self, local: usize, view: &'static str) -> Option<&mut Vec<OpId>> {
        self.links[local]
            .iter_mut()
            .find(|(name, _)| *name == view)
            .map(|(_, set)| set)
    }

    /// Deactivate every op failing any of the filters. Conjunction
    /// semantics; idempotent.
    pub fn filter(&mut self, filters: &[OpFilter]) -> &mut Self {
        if filters.is_empty() {
            return self
        }
        for i in 0..self.ops.len() {
            if self.working_set[i] && !filters.iter().all(|f| f.passes(self.meta(i))) {
                self.working_set[i] = false;
            }
        }
        self
    }

    /// For each surviving op, record every surviving op of `other` passing
    /// all cross filters. Ops left without a link are deactivated. Sets the
    /// current-link cursor to `other`.
    pub fn link(&mut self, other: &OpView<'_>, filters: &[LinkFilter]) -> &mut Self {
        let candidates: Vec<OpId> = (0..other.ops.len())
            .filter(|&j| other.working_set[j])
            .map(|j| other.ops[j])
            .collect();

        for i in 0..self.ops.len() {
            if !self.working_set[i] {
                continue
            }
            let a = self.meta(i);
            let matched: Vec<OpId> = candidates
                .iter()
                .copied()
                .filter(|&b| {
                    let b = &self.loader.ops()[b];
                    filters.iter().all(|f| f.passes(a, b))
                })
                .collect();
            if matched.is_empty() {
                self.working_set[i] = false;
            } else {
                match self.link_set_mut(i, other.opcode) {
                    Some(set) => *set = matched,
                    None => self.links[i].push((other.opcode, matched)),
                }
            }
        }

        self.current_link = Some(other.opcode);
        self
    }

    /// Intra-link filter over the current link's pairs.
    pub fn filter_link(&mut self, filters: &[LinkFilter]) -> Result<&mut Self, QueryError> {
        if filters.is_empty() {
            return Ok(self)
        }
        let current = self.current()?;
        self.prune_links(current, |_, a, b| filters.iter().all(|f| f.passes(a, b)));
        Ok(self)
    }

    /// Keep current links whose `other_slot` variable is in `relation` of
    /// the op's `self_slot` variable; with `invert`, keep those that are
    /// not. Ops whose link set empties are deactivated.
    pub fn is_relation(
        &mut self,
        self_slot: VarSlot,
        other_slot: VarSlot,
        relation: Relation,
        invert: bool,
    ) -> Result<&mut Self, QueryError> {
        let current = self.current()?;
        let arena = self.loader.arena();

        for i in 0..self.ops.len() {
            if !self.working_set[i] {
                continue
            }
            let Some(seed) = self.meta(i).var(self_slot) else {
                self.working_set[i] = false;
                continue
            };
            let nodes = match relation {
                Relation::Ancestors => arena.ancestors(seed),
                Relation::Descendants => arena.descendants(seed),
                Relation::Parents => arena.parents(seed).iter().copied().collect(),
                Relation::Children => arena.children(seed).iter().copied().collect(),
            };

            let loader = self.loader;
            if let Some(set) = self.link_set_mut(i, current) {
                set.retain(|&b| {
                    let related = loader.ops()[b]
                        .var(other_slot)
                        .is_some_and(|var| nodes.contains(&var));
                    related != invert
                });
                if set.is_empty() {
                    self.working_set[i] = false;
                }
            } else {
                self.working_set[i] = false;
            }
        }
        Ok(self)
    }

    pub fn is_descendant(
        &mut self,
        self_slot: VarSlot,
        other_slot: VarSlot,
    ) -> Result<&mut Self, QueryError> {
        self.is_relation(self_slot, other_slot, Relation::Descendants, false)
    }

    pub fn is_ancestor(
        &mut self,
        self_slot: VarSlot,
        other_slot: VarSlot,
    ) -> Result<&mut Self, QueryError> {
        self.is_relation(self_slot, other_slot, Relation::Ancestors, false)
    }

    pub fn is_child(
        &mut self,
        self_slot: VarSlot,
        other_slot: VarSlot,
    ) -> Result<&mut Self, QueryError> {
        self.is_relation(self_slot, other_slot, Relation::Children, false)
    }

    pub fn is_parent(
        &mut self,
        self_slot: VarSlot,
        other_slot: VarSlot,
    ) -> Result<&mut Self, QueryError> {
        self.is_relation(self_slot, other_slot, Relation::Parents, false)
    }

    /// Compare a slot's concrete value against a literal, deactivating on
    /// mismatch. Unconstrained values fail every comparison.
    pub fn is_value_literal(&mut self, slot: VarSlot, value: U256, cmp: Cmp) -> &mut Self {
        let arena = self.loader.arena();
        for i in 0..self.ops.len() {
            if !self.working_set[i] {
                continue
            }
            let concrete = self.meta(i).var(slot).and_then(|id| arena.value(id));
            if !concrete.is_some_and(|v| cmp.compare(v, value)) {
                self.working_set[i] = false;
            }
        }
        self
    }

    /// Compare slot values across the current link's pairs, pruning links
    /// that fail. Equality treats two unconstrained variables as equal;
    /// ordering requires both sides concrete.
    pub fn is_value(
        &mut self,
        self_slot: VarSlot,
        other_slot: VarSlot,
        cmp: Cmp,
    ) -> Result<&mut Self, QueryError> {
        let current = self.current()?;
        let arena = self.loader.arena();
        self.prune_links(current, |_, a, b| match (a.var(self_slot), b.var(other_slot)) {
            (Some(x), Some(y)) => match cmp {
                Cmp::Eq => arena.value_eq(x, y),
                Cmp::Ne => arena.value_ne(x, y),
                Cmp::Lt => arena.value_lt(x, y),
                Cmp::Le => arena.value_le(x, y),
                Cmp::Gt => arena.value_gt(x, y),
                Cmp::Ge => arena.value_ge(x, y),
            },
            _ => false,
        });
        Ok(self)
    }

    /// Prune current links by executing address: keep pairs whose addresses
    /// are equal (or differ, for [`AddressAction::Ne`]).
    pub fn source_address(&mut self, action: AddressAction) -> Result<&mut Self, QueryError> {
        let current = self.current()?;
        self.prune_links(current, |_, a, b| match action {
            AddressAction::Eq => a.address == b.address,
            AddressAction::Ne => a.address != b.address,
        });
        Ok(self)
    }

    /// Deactivate ops not executing at the given address.
    pub fn source_address_literal(&mut self, address: Address) -> &mut Self {
        for i in 0..self.ops.len() {
            if self.working_set[i] && self.meta(i).address != Some(address) {
                self.working_set[i] = false;
            }
        }
        self
    }

    /// Intersect (or union, with `inclusive`) the working set of another
    /// view over the same op population.
    pub fn merge(&mut self, other: &OpView<'_>, inclusive: bool) -> Result<&mut Self, QueryError> {
        if self.working_set.len() != other.working_set.len() {
            debug_assert!(false, "merging views of different shapes");
            return Err(QueryError::ShapeMismatch(
                self.working_set.len(),
                other.working_set.len(),
            ))
        }
        for (mine, theirs) in self.working_set.iter_mut().zip(&other.working_set) {
            if inclusive {
                *mine |= theirs;
            } else {
                *mine &= theirs;
            }
        }
        Ok(self)
    }

    /// Materialize the surviving ops: one row per element of the Cartesian
    /// product of the op's link sets, in view-insertion order.
    pub fn get_results(&self, keys: &[&str]) -> Results {
        let arena = self.loader.arena();
        let mut results = Results::new(keys);

        for i in 0..self.ops.len() {
            if !self.working_set[i] {
                continue
            }
            let a = RowOp::from_meta(self.meta(i), arena);

            let sets: Vec<&Vec<OpId>> = self.links[i]
                .iter()
                .filter(|(_, set)| !set.is_empty())
                .map(|(_, set)| set)
                .collect();

            if sets.is_empty() {
                results.add_row(vec![a]);
                continue
            }

            for combo in sets.iter().map(|set| set.iter().copied()).multi_cartesian_product() {
                let mut row = vec![a.clone()];
                row.extend(
                    combo
                        .into_iter()
                        .map(|id| RowOp::from_meta(&self.loader.ops()[id], arena)),
                );
                results.add_row(row);
            }
        }
        results
    }

    fn prune_links(
        &mut self,
        current: &'static str,
        keep: impl Fn(&OpLoader<'_>, &MetaOp, &MetaOp) -> bool,
    ) {
        let loader = self.loader;
        for i in 0..self.ops.len() {
            if !self.working_set[i] {
                continue
            }
            let a = &loader.ops()[self.ops[i]];
            if let Some(set) = self.link_set_mut(i, current) {
                set.retain(|&b| keep(loader, a, &loader.ops()[b]));
                if set.is_empty() {
                    self.working_set[i] = false;
                }
            } else {
                self.working_set[i] = false;
            }
        }
    }
}
