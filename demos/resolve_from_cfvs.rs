//! Demonstrates `Lookahead::resolve` (the CFV-seeded entry point used by
//! every continual-resolving call after the first node): the opponent's
//! range is not known directly, only the counterfactual values they
//! should have achieved reaching this node, reconstructed each iteration
//! by the CFR-D gadget.

use lookahead_resolver::leduc::{EquityOracle, LeducEvaluator, LeducTreeBuilder};
use lookahead_resolver::{GameSettings, NodeKind, PublicNode, ResolveParams, Resolving};

fn main() {
    let settings = GameSettings::leduc();
    let params = ResolveParams {
        cfr_iters: 500,
        cfr_skip_iters: 100,
        ..ResolveParams::default()
    };

    let tree_builder = LeducTreeBuilder::new(&settings);
    let evaluator = LeducEvaluator::new(&settings);
    // A re-solve at a later street still only needs a next-street oracle
    // if its own depth-limited tree crosses into a further street; Leduc
    // has just two streets, so resolving at street 1 (the river-like
    // final street) never needs one.
    let resolving = Resolving::new(&settings, &params, &tree_builder, &evaluator, None);

    let node = PublicNode {
        street: 1,
        board: vec![0],
        current_player: 0,
        bets: [2, 2],
        node_kind: NodeKind::Decision,
        action_kinds: Vec::new(),
        children: Vec::new(),
    };

    let player_range = vec![1.0 / settings.hand_count as f32; settings.hand_count];
    // A target CFV vector the opponent "should" have achieved reaching
    // this node, as handed down by a parent resolve. Zero here stands in
    // for "break-even", the simplest target a demo can construct without
    // a previous resolve's actual output.
    let opponent_cfv_target = vec![0.0f32; settings.hand_count];

    let results = resolving
        .resolve(&node, &player_range, None, Some(&opponent_cfv_target))
        .expect("resolve should succeed on a well-formed Leduc node");

    println!("root average strategy over actions {:?}:", results.action_kinds);
    println!("{:?}", results.strategy);
    println!(
        "opponent's achieved cfvs (should track the target): {:?}",
        results.achieved_cfvs
    );
    assert!(results.root_cfvs.is_none(), "CFV-seeded resolves have no root_cfvs");
}
