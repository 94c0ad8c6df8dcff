//! Turn restrictions for edge-based hierarchies
//!
//! A maneuver is the vertex triple `[prev, via, next]` a path walks through.
//! U-turns (`prev == next`) are always forbidden. Beyond that a
//! [`RestrictionProvider`] decides which maneuvers are banned: each
//! restriction registered at `via` is a short vertex sequence, and the
//! maneuver is banned when the sequence appears as a contiguous window of the
//! triple that covers `via`.

mod witness;

pub use witness::EdgeBasedWitnessCalculator;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::VertexId;

/// Source of forbidden vertex sequences, keyed by the vertex they pass
pub trait RestrictionProvider: Send + Sync {
    /// Restricted sequences registered at `vertex`
    fn restrictions(&self, vertex: VertexId) -> &[Vec<VertexId>];

    /// Whether `[prev, via, next]` avoids every restriction at `via`.
    /// U-turns are handled by [`TurnModel`], not here.
    fn allows(&self, prev: VertexId, via: VertexId, next: VertexId) -> bool {
        let maneuver = [prev, via, next];
        !self
            .restrictions(via)
            .iter()
            .any(|seq| window_matches(seq, &maneuver))
    }
}

/// `seq` occurs in `maneuver` at a position that includes the middle vertex
fn window_matches(seq: &[VertexId], maneuver: &[VertexId; 3]) -> bool {
    let len = seq.len();
    if len == 0 || len > maneuver.len() {
        return false;
    }
    (0..=maneuver.len() - len)
        .filter(|&start| start <= 1 && start + len > 1)
        .any(|start| &maneuver[start..start + len] == seq)
}

/// Provider without any restriction
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRestrictions;

impl RestrictionProvider for NoRestrictions {
    fn restrictions(&self, _vertex: VertexId) -> &[Vec<VertexId>] {
        &[]
    }

    fn allows(&self, _prev: VertexId, _via: VertexId, _next: VertexId) -> bool {
        true
    }
}

pub(crate) static NO_RESTRICTIONS: NoRestrictions = NoRestrictions;

/// How the builder and the query treat maneuvers
#[derive(Clone, Copy)]
pub enum TurnModel<'r> {
    /// Plain vertex graph: every maneuver is allowed
    VertexBased,
    /// Edge-based: U-turns banned, plus whatever the provider forbids
    EdgeBased(&'r dyn RestrictionProvider),
}

impl std::fmt::Debug for TurnModel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnModel::VertexBased => f.write_str("VertexBased"),
            TurnModel::EdgeBased(_) => f.write_str("EdgeBased"),
        }
    }
}

impl<'r> TurnModel<'r> {
    pub fn edge_based(provider: &'r dyn RestrictionProvider) -> Self {
        TurnModel::EdgeBased(provider)
    }

    #[inline]
    pub fn is_edge_based(&self) -> bool {
        matches!(self, TurnModel::EdgeBased(_))
    }

    #[inline]
    pub fn allows(&self, prev: VertexId, via: VertexId, next: VertexId) -> bool {
        match self {
            TurnModel::VertexBased => true,
            TurnModel::EdgeBased(provider) => prev != next && provider.allows(prev, via, next),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnRuleKind {
    /// `from -> via -> to` is forbidden
    Ban,
    /// Arriving from `from`, `via` may only be left towards `to`
    Only,
}

/// Junction-level rule, the usual shape of road turn restrictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnRule {
    pub kind: TurnRuleKind,
    pub from: VertexId,
    pub via: VertexId,
    pub to: VertexId,
}

/// Restriction index keyed by the vertex the restriction passes
#[derive(Debug, Clone, Default)]
pub struct TurnRestrictionIndex {
    restricted_nodes: FxHashSet<VertexId>,
    restrictions: FxHashMap<VertexId, Vec<Vec<VertexId>>>,
    /// (via, from) -> the only exits allowed
    only_allowed: FxHashMap<(VertexId, VertexId), FxHashSet<VertexId>>,
}

impl TurnRestrictionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: impl IntoIterator<Item = TurnRule>) -> Self {
        let mut index = Self::new();
        for rule in rules {
            index.add_rule(rule);
        }
        index
    }

    /// Register a forbidden sequence passing `via`. Sequences are matched
    /// against `[prev, via, next]`, so only lengths 1 to 3 ever match.
    pub fn add_sequence(&mut self, via: VertexId, sequence: Vec<VertexId>) {
        self.restricted_nodes.insert(via);
        self.restrictions.entry(via).or_default().push(sequence);
    }

    pub fn add_rule(&mut self, rule: TurnRule) {
        match rule.kind {
            TurnRuleKind::Ban => self.add_sequence(rule.via, vec![rule.from, rule.via, rule.to]),
            TurnRuleKind::Only => {
                self.restricted_nodes.insert(rule.via);
                self.only_allowed
                    .entry((rule.via, rule.from))
                    .or_default()
                    .insert(rule.to);
            }
        }
    }

    #[inline]
    pub fn is_restricted(&self, vertex: VertexId) -> bool {
        self.restricted_nodes.contains(&vertex)
    }

    pub fn n_restricted_nodes(&self) -> usize {
        self.restricted_nodes.len()
    }

    pub fn n_restrictions(&self) -> usize {
        self.restrictions.values().map(Vec::len).sum::<usize>()
            + self.only_allowed.values().map(FxHashSet::len).sum::<usize>()
    }
}

impl RestrictionProvider for TurnRestrictionIndex {
    fn restrictions(&self, vertex: VertexId) -> &[Vec<VertexId>] {
        self.restrictions
            .get(&vertex)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn allows(&self, prev: VertexId, via: VertexId, next: VertexId) -> bool {
        // Fast path: nothing registered here
        if !self.restricted_nodes.contains(&via) {
            return true;
        }
        if let Some(allowed) = self.only_allowed.get(&(via, prev)) {
            if !allowed.contains(&next) {
                return false;
            }
        }
        let maneuver = [prev, via, next];
        !self
            .restrictions(via)
            .iter()
            .any(|seq| window_matches(seq, &maneuver))
    }
}
