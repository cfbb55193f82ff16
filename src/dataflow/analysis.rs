// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use crate::graph::cfg::{Cfg, CfgNode};

/// The common shape of an intra-procedural data-flow analysis.
///
/// For a forward analysis the solver maintains `IN[n] = ⊓ OUT[preds]` and
/// `OUT[n] = transfer(IN[n])`; a backward analysis swaps the roles, and its
/// `transfer_node` receives the fact after the node as `input` and produces
/// the fact before it in `output`.
pub trait DataflowAnalysis {
    type Fact: Clone + PartialEq;

    fn is_forward(&self) -> bool;

    /// The fact at the boundary node (entry for forward analyses, exit for
    /// backward ones).
    fn new_boundary_fact(&self, cfg: &Cfg) -> Self::Fact;

    /// The initial fact of every other node; the bottom element, also used
    /// as the unit of empty meets.
    fn new_initial_fact(&self) -> Self::Fact;

    /// `target` becomes `target ⊓ fact`. Returns true iff `target` changed.
    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact) -> bool;

    /// Applies the node transfer function. Returns true iff `output`
    /// changed. Transfers must be monotone for the solvers to converge.
    fn transfer_node(&self, node: CfgNode, input: &Self::Fact, output: &mut Self::Fact) -> bool;
}
