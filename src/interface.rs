//! Types and traits for the collaborators this crate consumes but does not
//! implement: the public-tree builder, the hand-strength evaluator, and
//! the neural next-street value oracle. Everything in this module is a
//! boundary the core is built against, not an implementation of it.

use crate::card::Card;
use crate::error::ResolveResult;

/// Which kind of action led to a child node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Fold,
    Call,
    Bet(i32),
}

/// What a node represents in the public tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Decision,
    Chance,
    TerminalFold,
    TerminalShowdown,
}

/// A node of the public game tree, as produced by an external
/// `PublicTreeBuilder`. The lookahead builder only ever reads this
/// structure; it never mutates or constructs trees for a live game.
#[derive(Debug, Clone)]
pub struct PublicNode {
    pub street: usize,
    pub board: Vec<Card>,
    pub current_player: usize,
    pub bets: [i32; 2],
    pub node_kind: NodeKind,
    pub action_kinds: Vec<ActionKind>,
    pub children: Vec<PublicNode>,
}

impl PublicNode {
    pub fn pot_size(&self) -> i32 {
        self.bets[0] + self.bets[1]
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.node_kind,
            NodeKind::TerminalFold | NodeKind::TerminalShowdown
        )
    }
}

/// Parameters an external tree builder is handed when asked to produce a
/// depth-limited public sub-tree rooted at a particular node.
pub struct TreeParams<'a> {
    pub root_node: &'a PublicNode,
    pub limit_to_street: bool,
}

/// Factory producing a tree description. Out of scope for this crate: a
/// real implementation walks betting/bet-sizing rules to expand `root_node`
/// into its depth-limited children.
pub trait PublicTreeBuilder {
    fn build_tree(&self, params: TreeParams<'_>) -> ResolveResult<PublicNode>;
}

/// Oracle mapping a board to a per-hand showdown strength ranking,
/// consumed by `TerminalEquity` when building last-round call matrices.
/// Ties (equal strength) are expected for blocked/impossible hands; the
/// caller masks those separately via `possible_hands_mask`.
pub trait HandStrengthEvaluator {
    /// Returns one strength value per private hand, in the same hand-index
    /// order as `CardTools::all_hands`. Higher is stronger.
    fn strength(&self, board: &[Card]) -> Vec<i32>;
}

/// Batched neural value oracle for a depth-limited transition to a future
/// street. `board_idx` identifies which of the lookahead's enumerated
/// next-street boards the query is for.
pub trait NextStreetOracle {
    /// CFVs for all boards' transitions, batched: `inputs`/`outputs` are
    /// `[batch, player, hand]` flattened row-major.
    fn get_value(&self, inputs: &[f32], outputs: &mut [f32], board_idx: usize);

    /// Variant used at street 1 (preflop), where the board axis collapses.
    fn get_value_aux(&self, inputs: &[f32], outputs: &mut [f32], board_idx: usize);

    /// Single-board query used by `get_chance_action_cfv`.
    fn get_value_on_board(&self, board: &[Card], outputs: &mut [f32]);
}
