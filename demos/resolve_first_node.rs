//! Demonstrates `Lookahead::resolve_first_node`: both players' ranges are
//! known explicitly, as they are at the very first node of a hand before
//! any continual re-solving has happened yet.

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
    let oracle = EquityOracle::new(&settings, &[]);
    let resolving = Resolving::new(&settings, &params, &tree_builder, &evaluator, Some(&oracle))
        .with_print_progress(true);

    // Root of a fresh hand: preflop, no board, both players have put in
    // their ante/blind (`bets`), player 0 to act, uniform ranges.
    let node = PublicNode {
        street: 0,
        board: Vec::new(),
        current_player: 0,
        bets: [1, 1],
        node_kind: NodeKind::Decision,
        action_kinds: Vec::new(),
        children: Vec::new(),
    };
    let uniform = vec![1.0 / settings.hand_count as f32; settings.hand_count];

    let results = resolving
        .resolve(&node, &uniform, Some(&uniform), None)
        .expect("resolve_first_node should succeed on a well-formed Leduc root");

    println!("root average strategy over actions {:?}:", results.action_kinds);
    println!("{:?}", results.strategy);
    println!("opponent's achieved cfvs: {:?}", results.achieved_cfvs);
    println!(
        "resolving player's root cfvs: {:?}",
        results.root_cfvs.expect("resolve_first_node always returns root_cfvs")
    );
}
