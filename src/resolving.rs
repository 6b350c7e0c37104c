//! `Resolving` is the thin facade a continual-resolving driver actually
//! calls: it ties the tree builder, the terminal-equity evaluator, the
//! lookahead, and the CFR-D gadget together and hands back packaged
//! results. None of the CFR+ machinery lives here; this module only
//! wires collaborators together and validates the one contractual rule
//! the spec places at this boundary (exactly one of `opponent_range` /
//! `opponent_cfvs`).

use std::path::Path;

use crate::error::{ResolveError, ResolveResult};
use crate::interface::{HandStrengthEvaluator, NextStreetOracle, PublicNode, PublicTreeBuilder, TreeParams};
use crate::lookahead::{Lookahead, LookaheadResults};
use crate::params::{GameSettings, ResolveParams};
use crate::terminal_equity::TerminalEquity;

/// Collaborators and tunables a `Resolving` instance needs for the
/// lifetime of one re-solve. Held by reference, per the design notes'
/// instruction to avoid hidden global state.
pub struct Resolving<'a> {
    settings: &'a GameSettings,
    params: &'a ResolveParams,
    tree_builder: &'a dyn PublicTreeBuilder,
    evaluator: &'a dyn HandStrengthEvaluator,
    oracle: Option<&'a dyn NextStreetOracle>,
    pf_equity_path: Option<&'a Path>,
    print_progress: bool,
}

impl<'a> Resolving<'a> {
    pub fn new(
        settings: &'a GameSettings,
        params: &'a ResolveParams,
        tree_builder: &'a dyn PublicTreeBuilder,
        evaluator: &'a dyn HandStrengthEvaluator,
        oracle: Option<&'a dyn NextStreetOracle>,
    ) -> Self {
        Resolving {
            settings,
            params,
            tree_builder,
            evaluator,
            oracle,
            pf_equity_path: None,
            print_progress: false,
        }
    }

    pub fn with_pf_equity_path(mut self, path: &'a Path) -> Self {
        self.pf_equity_path = Some(path);
        self
    }

    pub fn with_print_progress(mut self, print_progress: bool) -> Self {
        self.print_progress = print_progress;
        self
    }

    /// Builds a depth-limited tree rooted at `node`, runs CFR+ seeded
    /// either by an explicit opponent range or by an opponent CFV target,
    /// and returns the packaged results.
    ///
    /// Exactly one of `opponent_range` / `opponent_cfvs` must be `Some`;
    /// both or neither is an `InvalidInput` error (the spec's
    /// `AmbiguousResolveInput`).
    pub fn resolve(
        &self,
        node: &PublicNode,
        player_range: &[f32],
        opponent_range: Option<&[f32]>,
        opponent_cfvs: Option<&[f32]>,
    ) -> ResolveResult<LookaheadResults> {
        match (opponent_range, opponent_cfvs) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(ResolveError::InvalidInput(
                    "resolve requires exactly one of opponent_range or opponent_cfvs".to_string(),
                ));
            }
            _ => {}
        }
        if player_range.is_empty() || player_range.len() % self.settings.hand_count != 0 {
            return Err(ResolveError::InvalidInput(format!(
                "player_range length {} is not a positive multiple of hand_count {}",
                player_range.len(),
                self.settings.hand_count
            )));
        }
        let batch_size = player_range.len() / self.settings.hand_count;

        let tree = self.tree_builder.build_tree(TreeParams {
            root_node: node,
            limit_to_street: true,
        })?;

        let mut terminal_equity = TerminalEquity::new(self.settings);
        terminal_equity.set_board(&tree.board, self.evaluator, self.pf_equity_path)?;

        let mut lookahead = Lookahead::build_lookahead_with_progress(
            self.settings,
            self.params,
            &terminal_equity,
            self.oracle,
            &tree,
            batch_size,
            self.print_progress,
        )?;

        match (opponent_range, opponent_cfvs) {
            (Some(o_range), None) => lookahead.resolve_first_node(player_range, o_range)?,
            (None, Some(o_cfvs)) => lookahead.resolve(player_range, o_cfvs)?,
            _ => unreachable!("validated above"),
        }

        Ok(lookahead.get_results())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leduc::{EquityOracle, LeducEvaluator, LeducTreeBuilder};
    use crate::interface::NodeKind;

    fn leduc_root() -> PublicNode {
        PublicNode {
            street: 0,
            board: Vec::new(),
            current_player: 0,
            bets: [1, 1],
            node_kind: NodeKind::Decision,
            action_kinds: Vec::new(),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_rejects_both_opponent_inputs() {
        let settings = GameSettings::leduc();
        let params = ResolveParams {
            cfr_iters: 4,
            cfr_skip_iters: 1,
            ..ResolveParams::default()
        };
        let tree_builder = LeducTreeBuilder::new(&settings);
        let evaluator = LeducEvaluator::new(&settings);
        let oracle = EquityOracle::new(&settings, &[]);
        let resolving = Resolving::new(&settings, &params, &tree_builder, &evaluator, Some(&oracle));
        let node = leduc_root();
        let range = vec![1.0 / 6.0; 6];
        let err = resolving
            .resolve(&node, &range, Some(&range), Some(&range))
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_neither_opponent_input() {
        let settings = GameSettings::leduc();
        let params = ResolveParams {
            cfr_iters: 4,
            cfr_skip_iters: 1,
            ..ResolveParams::default()
        };
        let tree_builder = LeducTreeBuilder::new(&settings);
        let evaluator = LeducEvaluator::new(&settings);
        let oracle = EquityOracle::new(&settings, &[]);
        let resolving = Resolving::new(&settings, &params, &tree_builder, &evaluator, Some(&oracle));
        let node = leduc_root();
        let range = vec![1.0 / 6.0; 6];
        let err = resolving.resolve(&node, &range, None, None).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidInput(_)));
    }

    #[test]
    fn test_resolve_first_node_runs_end_to_end() {
        let settings = GameSettings::leduc();
        let params = ResolveParams {
            cfr_iters: 20,
            cfr_skip_iters: 5,
            ..ResolveParams::default()
        };
        let tree_builder = LeducTreeBuilder::new(&settings);
        let evaluator = LeducEvaluator::new(&settings);
        let oracle = EquityOracle::new(&settings, &[]);
        let resolving = Resolving::new(&settings, &params, &tree_builder, &evaluator, Some(&oracle));
        let node = leduc_root();
        let range = vec![1.0 / 6.0; 6];
        let results = resolving.resolve(&node, &range, Some(&range), None).unwrap();
        assert_eq!(results.achieved_cfvs.len(), 6);
        assert!(results.root_cfvs.is_some());
    }
}
