//! Walks a public tree once and allocates the per-depth tensor layout the
//! rest of the lookahead iterates over. This is the only place tree
//! structure is consulted; everything downstream works purely on the flat
//! tensors this module produces.

use crate::error::{ResolveError, ResolveResult};
use crate::interface::{ActionKind, NodeKind, PublicNode};
use crate::params::{GameSettings, ResolveParams};
use crate::tensor::{Shape6, Tensor6};

/// What a single `(action, node)` slot at a depth actually is. Decision
/// slots recurse into the next depth; the rest are leaves the CFR+ loop
/// evaluates directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Empty,
    Decision,
    TerminalFold,
    TerminalShowdown,
    NextStreetBox(usize),
}

/// Tensors and metadata for one depth of the levelized public tree.
pub struct LookaheadLayer {
    pub action_kinds: Vec<ActionKind>,
    pub shape: Shape6,
    pub ranges: Tensor6,
    pub current_strategy: Tensor6,
    pub average_strategy: Tensor6,
    pub cfvs: Tensor6,
    pub average_cfvs: Tensor6,
    pub regrets: Tensor6,
    /// `[A * N]`, row-major over `(a, n)`: 1 where the action exists at
    /// the parent, else 0.
    pub empty_action_mask: Vec<f32>,
    pub slot_kinds: Vec<SlotKind>,
    /// `[A * N]`, row-major over `(a, n)`: pot size of the child reached by
    /// taking action `a` at node `n`, i.e. `parent.pot_size() + bet`. Used
    /// to rescale pot-normalized CFVs back to absolute chips at terminals
    /// and next-street boxes (invariant I6).
    pub child_pot_size: Vec<f32>,
    pub acting_player: usize,
    pub pot_size: Vec<f32>,
    pub terminal_actions_count: usize,
    pub bets_count: usize,
    pub nonallinbets_count: usize,
    /// For each `n`, the `(a, n)` slot in the parent layer whose action
    /// led to this layer's node `n`. Empty at depth 1, whose single node
    /// is the root being resolved.
    pub parent_slot: Vec<usize>,
}

impl LookaheadLayer {
    pub fn a(&self) -> usize {
        self.shape.a
    }
    pub fn n(&self) -> usize {
        self.shape.n
    }

    pub fn mask(&self, a: usize, n: usize) -> f32 {
        self.empty_action_mask[a * self.shape.n + n]
    }

    pub fn kind(&self, a: usize, n: usize) -> SlotKind {
        self.slot_kinds[a * self.shape.n + n]
    }

    pub fn child_pot(&self, a: usize, n: usize) -> f32 {
        self.child_pot_size[a * self.shape.n + n]
    }
}

/// Terminal/next-street-box bookkeeping shared across all depths.
pub struct NextStreetBoxes {
    pub count: usize,
    pub pot_sizes: Vec<f32>,
    pub board_idx: Vec<usize>,
    pub inputs: Tensor6,
    pub outputs: Tensor6,
}

pub struct LookaheadLayout {
    pub layers: Vec<LookaheadLayer>,
    pub boxes: NextStreetBoxes,
    pub depth: usize,
    pub batch_size: usize,
}

struct FlatNode<'a> {
    node: &'a PublicNode,
    depth: usize,
    parent: Option<usize>,
    action_from_parent: Option<usize>,
}

fn flatten(root: &PublicNode) -> Vec<FlatNode<'_>> {
    let mut arena = vec![FlatNode {
        node: root,
        depth: 0,
        parent: None,
        action_from_parent: None,
    }];
    let mut i = 0;
    while i < arena.len() {
        let node = arena[i].node;
        let depth = arena[i].depth;
        for (a, child) in node.children.iter().enumerate() {
            arena.push(FlatNode {
                node: child,
                depth: depth + 1,
                parent: Some(i),
                action_from_parent: Some(a),
            });
        }
        i += 1;
    }
    arena
}

pub struct LookaheadBuilder<'a> {
    settings: &'a GameSettings,
    params: &'a ResolveParams,
}

impl<'a> LookaheadBuilder<'a> {
    pub fn new(settings: &'a GameSettings, params: &'a ResolveParams) -> Self {
        LookaheadBuilder { settings, params }
    }

    /// Builds the full layout for `root`, sized for `batch_size` ranges.
    ///
    /// The action schema at each depth is taken to be uniform across every
    /// decision node of that depth (the grandparent-bet axis `B` therefore
    /// always collapses to 1 here): a depth-limited public tree produced
    /// by an external builder already enumerates every concrete action, so
    /// there is no further bet-size abstraction to track per branch.
    pub fn build(&self, root: &PublicNode, batch_size: usize) -> ResolveResult<LookaheadLayout> {
        if root.node_kind != NodeKind::Decision {
            return Err(ResolveError::InvalidInput(
                "root of a re-solve must be a decision node".to_string(),
            ));
        }

        let arena = flatten(root);
        let max_depth = arena.iter().map(|f| f.depth).max().unwrap_or(0);
        if max_depth == 0 {
            return Err(ResolveError::InvalidInput(
                "root has no children to resolve".to_string(),
            ));
        }

        let hc = self.settings.hand_count;
        let p = self.settings.players_count;

        let mut boxes = NextStreetBoxes {
            count: 0,
            pot_sizes: Vec::new(),
            board_idx: Vec::new(),
            inputs: Tensor6::zeros(Shape6::new(1, 1, 1, 1, 1, 1)),
            outputs: Tensor6::zeros(Shape6::new(1, 1, 1, 1, 1, 1)),
        };
        let mut box_entries: Vec<(f32, usize)> = Vec::new();

        let mut layers = Vec::with_capacity(max_depth);
        // Maps a depth-(d-1) decision node's arena index to its node index
        // within the layer built for depth d-1, so the next iteration can
        // point `parent_slot` at the right `(action, node)` slot without
        // re-scanning the arena. Empty while building the root's own layer.
        let mut prev_parent_indices: Vec<usize> = Vec::new();

        for depth in 1..=max_depth {
            let parent_indices: Vec<usize> = arena
                .iter()
                .enumerate()
                .filter(|(_, f)| f.depth == depth - 1 && f.node.node_kind == NodeKind::Decision)
                .map(|(i, _)| i)
                .collect();

            if depth == 1 {
                assert_eq!(
                    parent_indices.len(),
                    1,
                    "depth-1 layer must have exactly one parent decision node (the root)"
                );
            }

            let n = parent_indices.len().max(1);
            let action_kinds = parent_indices
                .iter()
                .map(|&pi| arena[pi].node.action_kinds.clone())
                .max_by_key(|v| v.len())
                .unwrap_or_default();
            let action_count = action_kinds.len().max(1);

            let terminal_actions_count = action_kinds
                .iter()
                .filter(|k| matches!(k, ActionKind::Fold | ActionKind::Call))
                .count();
            let bets_count = action_kinds
                .iter()
                .filter(|k| matches!(k, ActionKind::Bet(_)))
                .count();

            let acting_player = parent_indices
                .first()
                .map(|&pi| arena[pi].node.current_player)
                .unwrap_or(0);

            let mut pot_size = vec![0.0f32; n];
            let mut empty_action_mask = vec![0.0f32; action_count * n];
            let mut slot_kinds = vec![SlotKind::Empty; action_count * n];
            let mut child_pot_size = vec![0.0f32; action_count * n];
            let mut parent_slot = vec![0usize; n];
            let prev_n = prev_parent_indices.len().max(1);
            let prev_index_of: std::collections::HashMap<usize, usize> = prev_parent_indices
                .iter()
                .enumerate()
                .map(|(idx, &ai)| (ai, idx))
                .collect();

            for (node_idx, &pi) in parent_indices.iter().enumerate() {
                pot_size[node_idx] = arena[pi].node.pot_size() as f32;
                if let Some(parent_of_parent) = arena[pi].parent {
                    let action_in_parent = arena[pi].action_from_parent.unwrap_or(0);
                    let parent_node_idx = *prev_index_of.get(&parent_of_parent).unwrap_or(&0);
                    parent_slot[node_idx] = action_in_parent * prev_n + parent_node_idx;
                }

                for (a, child) in arena[pi].node.children.iter().enumerate() {
                    let slot = a * n + node_idx;
                    empty_action_mask[slot] = 1.0;
                    child_pot_size[slot] = child.pot_size() as f32;
                    slot_kinds[slot] = match child.node_kind {
                        NodeKind::Decision => SlotKind::Decision,
                        NodeKind::TerminalFold => SlotKind::TerminalFold,
                        NodeKind::TerminalShowdown => SlotKind::TerminalShowdown,
                        NodeKind::Chance => {
                            let box_idx = box_entries.len();
                            box_entries.push((child.pot_size() as f32, 0));
                            SlotKind::NextStreetBox(box_idx)
                        }
                    };
                }
            }

            let shape = Shape6::new(action_count, 1, n, batch_size, p, hc);
            layers.push(LookaheadLayer {
                action_kinds,
                shape,
                ranges: Tensor6::zeros(shape),
                current_strategy: Tensor6::zeros(shape),
                average_strategy: Tensor6::zeros(shape),
                cfvs: Tensor6::zeros(shape),
                average_cfvs: Tensor6::zeros(shape),
                regrets: Tensor6::filled(shape, self.params.regret_epsilon),
                empty_action_mask,
                slot_kinds,
                child_pot_size,
                acting_player,
                pot_size,
                terminal_actions_count,
                bets_count,
                nonallinbets_count: bets_count,
                parent_slot,
            });

            prev_parent_indices = parent_indices;
        }

        boxes.count = box_entries.len();
        if boxes.count > 0 {
            boxes.pot_sizes = box_entries.iter().map(|(pot, _)| *pot).collect();
            boxes.board_idx = (0..boxes.count).collect();
            let box_shape = Shape6::new(1, 1, boxes.count, batch_size, p, hc);
            boxes.inputs = Tensor6::zeros(box_shape);
            boxes.outputs = Tensor6::zeros(box_shape);
        }

        Ok(LookaheadLayout {
            layers,
            boxes,
            depth: max_depth,
            batch_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::GameSettings;

    fn leaf(kind: NodeKind, player: usize, bets: [i32; 2]) -> PublicNode {
        PublicNode {
            street: 1,
            board: vec![0],
            current_player: player,
            bets,
            node_kind: kind,
            action_kinds: Vec::new(),
            children: Vec::new(),
        }
    }

    fn toy_tree() -> PublicNode {
        let fold = leaf(NodeKind::TerminalFold, 1, [1, 0]);
        let call = leaf(NodeKind::TerminalShowdown, 1, [1, 1]);
        PublicNode {
            street: 1,
            board: vec![0],
            current_player: 0,
            bets: [1, 1],
            node_kind: NodeKind::Decision,
            action_kinds: vec![ActionKind::Fold, ActionKind::Call],
            children: vec![fold, call],
        }
    }

    #[test]
    fn test_build_single_decision_layer() {
        let settings = GameSettings::leduc();
        let params = ResolveParams::default();
        let builder = LookaheadBuilder::new(&settings, &params);
        let tree = toy_tree();
        let layout = builder.build(&tree, 3).unwrap();
        assert_eq!(layout.depth, 1);
        let layer = &layout.layers[0];
        assert_eq!(layer.a(), 2);
        assert_eq!(layer.n(), 1);
        assert_eq!(layer.terminal_actions_count, 2);
        assert_eq!(layer.bets_count, 0);
        assert!(layer.regrets.as_slice().iter().all(|&r| r == params.regret_epsilon));
    }

    #[test]
    fn test_rejects_non_decision_root() {
        let settings = GameSettings::leduc();
        let params = ResolveParams::default();
        let builder = LookaheadBuilder::new(&settings, &params);
        let root = leaf(NodeKind::TerminalFold, 0, [0, 0]);
        assert!(builder.build(&root, 1).is_err());
    }
}
