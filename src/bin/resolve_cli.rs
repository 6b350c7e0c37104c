//! Command-line front end over the `Resolving` facade: loads a JSON node
//! description, builds the toy in-crate Leduc tree/evaluator/oracle, runs
//! one re-solve, and prints (or saves) the resulting strategy. This is
//! the ordinary "drive the library from a terminal" entry point, not the
//! data-generation pipeline the core spec places out of scope.

use std::fs;
use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use serde::Deserialize;

use lookahead_resolver::{GameSettings, NodeKind, PublicNode, ResolveParams, Resolving};
use lookahead_resolver::leduc::{EquityOracle, LeducEvaluator, LeducTreeBuilder};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a JSON node/range configuration file.
    #[arg(required = true)]
    config: String,

    /// Total number of CFR+ iterations to run.
    #[arg(short = 'n', long, default_value = "1000")]
    cfr_iters: usize,

    /// Burn-in iterations before averaging starts.
    #[arg(short = 's', long, default_value = "500")]
    cfr_skip_iters: usize,

    /// Print iteration progress to stdout.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Optional path to write the resulting strategy/CFVs as JSON.
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// On-disk description of the node to resolve and the ranges/CFVs to
/// seed it with. `opponent_range` and `opponent_cfvs` are mutually
/// exclusive, matching `Resolving::resolve`'s contract.
#[derive(Debug, Deserialize)]
struct NodeConfig {
    street: usize,
    #[serde(default)]
    board: Vec<u8>,
    current_player: usize,
    bets: [i32; 2],
    player_range: Vec<f32>,
    #[serde(default)]
    opponent_range: Option<Vec<f32>>,
    #[serde(default)]
    opponent_cfvs: Option<Vec<f32>>,
}

#[derive(serde::Serialize)]
struct ResolveOutput {
    strategy: Vec<f32>,
    achieved_cfvs: Vec<f32>,
    children_cfvs: Vec<f32>,
}

fn main() {
    let args = Args::parse();

    let contents = match fs::read_to_string(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to read {}: {e}", args.config);
            exit(1);
        }
    };
    let config: NodeConfig = match serde_json::from_str(&contents) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to parse {}: {e}", args.config);
            exit(1);
        }
    };

    let settings = GameSettings::leduc();
    let params = ResolveParams {
        cfr_iters: args.cfr_iters,
        cfr_skip_iters: args.cfr_skip_iters,
        ..ResolveParams::default()
    };
    if let Err(e) = params.validate() {
        eprintln!("invalid parameters: {e}");
        exit(1);
    }

    let node = PublicNode {
        street: config.street,
        board: config.board.clone(),
        current_player: config.current_player,
        bets: config.bets,
        node_kind: NodeKind::Decision,
        action_kinds: Vec::new(),
        children: Vec::new(),
    };

    let tree_builder = LeducTreeBuilder::new(&settings);
    let evaluator = LeducEvaluator::new(&settings);
    let oracle = EquityOracle::new(&settings, &config.board);
    let resolving = Resolving::new(&settings, &params, &tree_builder, &evaluator, Some(&oracle))
        .with_print_progress(args.verbose);

    let results = match resolving.resolve(
        &node,
        &config.player_range,
        config.opponent_range.as_deref(),
        config.opponent_cfvs.as_deref(),
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("resolve failed: {e}");
            exit(1);
        }
    };

    println!("root action kinds: {:?}", results.action_kinds);
    println!("achieved cfvs: {:?}", results.achieved_cfvs);
    if let Some(root_cfvs) = &results.root_cfvs {
        println!("root cfvs (resolving player): {root_cfvs:?}");
    }
    let hc = settings.hand_count;
    for (a, kind) in results.action_kinds.iter().enumerate() {
        let slice = &results.children_cfvs[a * hc..(a + 1) * hc];
        println!("action {kind:?}: opponent child cfvs = {slice:?}");
    }

    if let Some(out_path) = &args.out {
        let output = ResolveOutput {
            strategy: results.strategy,
            achieved_cfvs: results.achieved_cfvs,
            children_cfvs: results.children_cfvs,
        };
        match serde_json::to_string_pretty(&output) {
            Ok(json) => {
                if let Err(e) = fs::write(out_path, json) {
                    eprintln!("failed to write {}: {e}", out_path.display());
                    exit(1);
                }
            }
            Err(e) => {
                eprintln!("failed to serialize results: {e}");
                exit(1);
            }
        }
    }
}
