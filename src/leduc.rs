//! A minimal heads-up Leduc hold'em implementation of the external
//! collaborator traits (`PublicTreeBuilder`, `HandStrengthEvaluator`,
//! `NextStreetOracle`). None of this is part of the re-solving core; it
//! exists so the CLI, the demos, and the integration tests have a
//! concrete small game to drive `Resolving` against without pulling in a
//! real bet-sizing engine or a trained value network.
//!
//! Leduc's deck is three ranks (J, Q, K) in two suits, dealt one hole card
//! per player and one board card on the second street. A made pair beats
//! every unpaired hand; among unpaired hands the higher rank wins; two
//! hole cards of the same rank are a push.

use crate::card::Card;
use crate::card_tools::CardTools;
use crate::error::ResolveResult;
use crate::interface::{ActionKind, HandStrengthEvaluator, NextStreetOracle, NodeKind, PublicNode, PublicTreeBuilder, TreeParams};
use crate::params::GameSettings;
use crate::terminal_equity::TerminalEquity;

/// `strength(board)[hand]` for Leduc: a pair with the board outranks every
/// unpaired hand; otherwise rank alone decides, and same-rank-different-
/// suit hole cards are a tie (a push, same as real Leduc).
pub struct LeducEvaluator<'a> {
    settings: &'a GameSettings,
}

impl<'a> LeducEvaluator<'a> {
    pub fn new(settings: &'a GameSettings) -> Self {
        LeducEvaluator { settings }
    }

    fn rank(card: Card) -> i32 {
        (card / 2) as i32
    }
}

impl<'a> HandStrengthEvaluator for LeducEvaluator<'a> {
    fn strength(&self, board: &[Card]) -> Vec<i32> {
        let tools = CardTools::new(self.settings);
        let board_card = board.first().copied();
        tools
            .all_hands()
            .iter()
            .map(|hand| {
                let hole = hand[0];
                let rank = Self::rank(hole);
                match board_card {
                    Some(b) if Self::rank(b) == rank => 100 + rank,
                    _ => rank,
                }
            })
            .collect()
    }
}

/// Builds the depth-limited betting subtree for one street of heads-up
/// Leduc: at most one bet and one call per street (no re-raises), which
/// keeps the demo tree small while still exercising every `ActionKind`
/// and `NodeKind` the lookahead understands.
pub struct LeducTreeBuilder<'a> {
    settings: &'a GameSettings,
    bet_sizes: Vec<i32>,
}

impl<'a> LeducTreeBuilder<'a> {
    /// `bet_sizes[street]` is the fixed bet size used on that street (2 and
    /// 4 chips, as in the textbook Leduc game).
    pub fn new(settings: &'a GameSettings) -> Self {
        LeducTreeBuilder {
            settings,
            bet_sizes: vec![2, 4],
        }
    }

    fn bet_size(&self, street: usize) -> i32 {
        self.bet_sizes[street.min(self.bet_sizes.len() - 1)]
    }

    /// The first-to-act decision node of `street`, with no bet yet this
    /// street (`checks_so_far` tracks how many consecutive checks have
    /// happened, since two checks end the street).
    fn decision_no_bet(
        &self,
        player: usize,
        bets: [i32; 2],
        street: usize,
        board: &[Card],
        checks_so_far: usize,
        limit_to_street: bool,
    ) -> PublicNode {
        let opponent = 1 - player;
        let bet_size = self.bet_size(street);

        let check_child = if checks_so_far + 1 >= 2 {
            self.end_of_street(street, board, bets, limit_to_street)
        } else {
            self.decision_no_bet(opponent, bets, street, board, checks_so_far + 1, limit_to_street)
        };

        let mut bet_bets = bets;
        bet_bets[player] += bet_size;
        let bet_child = self.facing_bet(opponent, bet_bets, street, board, bet_size, limit_to_street);

        PublicNode {
            street,
            board: board.to_vec(),
            current_player: player,
            bets,
            node_kind: NodeKind::Decision,
            action_kinds: vec![ActionKind::Call, ActionKind::Bet(bet_size)],
            children: vec![check_child, bet_child],
        }
    }

    /// `player` faces a bet of `bet_size` already reflected in `bets`;
    /// they may fold or call, no re-raise.
    fn facing_bet(
        &self,
        player: usize,
        bets: [i32; 2],
        street: usize,
        board: &[Card],
        _bet_size: i32,
        limit_to_street: bool,
    ) -> PublicNode {
        let fold_child = PublicNode {
            street,
            board: board.to_vec(),
            current_player: player,
            bets,
            node_kind: NodeKind::TerminalFold,
            action_kinds: Vec::new(),
            children: Vec::new(),
        };

        let mut call_bets = bets;
        call_bets[player] = call_bets[1 - player];
        let call_child = self.end_of_street(street, board, call_bets, limit_to_street);

        PublicNode {
            street,
            board: board.to_vec(),
            current_player: player,
            bets,
            node_kind: NodeKind::Decision,
            action_kinds: vec![ActionKind::Fold, ActionKind::Call],
            children: vec![fold_child, call_child],
        }
    }

    /// What follows the last action of a street: showdown if this was the
    /// final street, a `Chance` leaf standing in for the depth-limited
    /// transition when `limit_to_street`, or a fully expanded deal of
    /// every possible next board card otherwise.
    fn end_of_street(&self, street: usize, board: &[Card], bets: [i32; 2], limit_to_street: bool) -> PublicNode {
        if street + 1 >= self.settings.streets_count {
            return PublicNode {
                street,
                board: board.to_vec(),
                current_player: 0,
                bets,
                node_kind: NodeKind::TerminalShowdown,
                action_kinds: Vec::new(),
                children: Vec::new(),
            };
        }

        if limit_to_street {
            return PublicNode {
                street,
                board: board.to_vec(),
                current_player: 0,
                bets,
                node_kind: NodeKind::Chance,
                action_kinds: Vec::new(),
                children: Vec::new(),
            };
        }

        let tools = CardTools::new(self.settings);
        let next_boards = tools.next_round_boards(board);
        let children: Vec<PublicNode> = next_boards
            .iter()
            .map(|b| self.decision_no_bet(0, bets, street + 1, b, 0, limit_to_street))
            .collect();
        let action_kinds = next_boards.iter().map(|_| ActionKind::Call).collect();

        PublicNode {
            street,
            board: board.to_vec(),
            current_player: 0,
            bets,
            node_kind: NodeKind::Chance,
            action_kinds,
            children,
        }
    }
}

impl<'a> PublicTreeBuilder for LeducTreeBuilder<'a> {
    fn build_tree(&self, params: TreeParams<'_>) -> ResolveResult<PublicNode> {
        let root = params.root_node;
        Ok(self.decision_no_bet(
            root.current_player,
            root.bets,
            root.street,
            &root.board,
            0,
            params.limit_to_street,
        ))
    }
}

/// A toy stand-in for the trained next-street value network: rather than
/// a neural net, it computes the *exact* averaged call-matrix CFVs for
/// calling down with no further betting on every possible next board,
/// reusing the same averaging `TerminalEquity` already does for inner
/// rounds. Good enough to exercise the depth-limited code path end to
/// end in tests and demos; a real agent would replace this with a
/// trained network query.
pub struct EquityOracle<'a> {
    settings: &'a GameSettings,
    board: Vec<Card>,
}

impl<'a> EquityOracle<'a> {
    pub fn new(settings: &'a GameSettings, board: &[Card]) -> Self {
        EquityOracle {
            settings,
            board: board.to_vec(),
        }
    }

    fn query(&self, board: &[Card], inputs: &[f32], outputs: &mut [f32]) {
        let hc = self.settings.hand_count;
        let p = self.settings.players_count;
        let batch = inputs.len() / (p * hc);
        let evaluator = LeducEvaluator::new(self.settings);
        let mut te = TerminalEquity::new(self.settings);
        // `set_board` on a non-final-street board averages over every
        // possible extension, which is exactly the "value of calling down
        // with a yet-unknown future board" this oracle is standing in for.
        te.set_board(board, &evaluator, None).expect("leduc board is always valid");

        for s in 0..batch {
            let p0 = &inputs[(s * p) * hc..(s * p + 1) * hc];
            let p1 = &inputs[(s * p + 1) * hc..(s * p + 2) * hc];
            let mut out0 = vec![0.0f32; hc];
            let mut out1 = vec![0.0f32; hc];
            te.call_value(p1, &mut out0);
            te.call_value(p0, &mut out1);
            outputs[(s * p) * hc..(s * p + 1) * hc].copy_from_slice(&out0);
            outputs[(s * p + 1) * hc..(s * p + 2) * hc].copy_from_slice(&out1);
        }
    }
}

impl<'a> NextStreetOracle for EquityOracle<'a> {
    fn get_value(&self, inputs: &[f32], outputs: &mut [f32], _board_idx: usize) {
        self.query(&self.board, inputs, outputs);
    }

    fn get_value_aux(&self, inputs: &[f32], outputs: &mut [f32], _board_idx: usize) {
        self.query(&self.board, inputs, outputs);
    }

    fn get_value_on_board(&self, board: &[Card], outputs: &mut [f32]) {
        let hc = self.settings.hand_count;
        let p = self.settings.players_count;
        let uniform = vec![1.0f32 / hc as f32; p * hc];
        self.query(board, &uniform, outputs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluator_pair_beats_unpaired() {
        let settings = GameSettings::leduc();
        let tools = CardTools::new(&settings);
        let evaluator = LeducEvaluator::new(&settings);
        let board = [0u8]; // rank 0 (J), suit 0
        let strengths = evaluator.strength(&board);
        let paired_idx = tools.hole_index(&[1]); // rank 0, other suit -> pairs with board
        let unpaired_idx = tools.hole_index(&[4]); // rank 2 (K)
        assert!(strengths[paired_idx] > strengths[unpaired_idx]);
    }

    #[test]
    fn test_unpaired_hands_compare_by_rank() {
        let settings = GameSettings::leduc();
        let tools = CardTools::new(&settings);
        let evaluator = LeducEvaluator::new(&settings);
        let board = [4u8]; // rank 2 (K)
        let strengths = evaluator.strength(&board);
        // neither hole card below pairs the board, so rank alone decides
        let j = tools.hole_index(&[0]);
        let q = tools.hole_index(&[2]);
        assert!(strengths[q] > strengths[j]);
    }

    #[test]
    fn test_tree_builder_root_has_check_and_bet() {
        let settings = GameSettings::leduc();
        let builder = LeducTreeBuilder::new(&settings);
        let root_desc = PublicNode {
            street: 0,
            board: Vec::new(),
            current_player: 0,
            bets: [1, 1],
            node_kind: NodeKind::Decision,
            action_kinds: Vec::new(),
            children: Vec::new(),
        };
        let tree = builder
            .build_tree(TreeParams {
                root_node: &root_desc,
                limit_to_street: true,
            })
            .unwrap();
        assert_eq!(tree.action_kinds, vec![ActionKind::Call, ActionKind::Bet(2)]);
        assert_eq!(tree.children.len(), 2);
    }

    #[test]
    fn test_limit_to_street_ends_in_chance_not_showdown() {
        let settings = GameSettings::leduc();
        let builder = LeducTreeBuilder::new(&settings);
        let root_desc = PublicNode {
            street: 0,
            board: Vec::new(),
            current_player: 0,
            bets: [1, 1],
            node_kind: NodeKind::Decision,
            action_kinds: Vec::new(),
            children: Vec::new(),
        };
        let tree = builder
            .build_tree(TreeParams {
                root_node: &root_desc,
                limit_to_street: true,
            })
            .unwrap();
        // check, check -> end of street 0, which is not the last street
        let after_two_checks = &tree.children[0].children[0];
        assert_eq!(after_two_checks.node_kind, NodeKind::Chance);
    }
}
