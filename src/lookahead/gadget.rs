//! Reconstructs, at each CFR+ iteration, an opponent range consistent with
//! a target counterfactual-value vector rather than with an explicit
//! range. This is the entry point for continual re-solving after the
//! first node: the caller only knows what the opponent "should" have
//! achieved, not what holdings they actually have.
//!
//! Internally this runs regret-matching over a two-arm choice per hand —
//! "play on" versus "take the target value and stop" — so the
//! reconstructed range converges to one whose achieved CFVs match the
//! target as iterations accumulate.

use crate::card::Card;
use crate::card_tools::CardTools;
use crate::params::GameSettings;

pub struct CFRDGadget<'a> {
    settings: &'a GameSettings,
    board: Vec<Card>,
    possible_mask: Vec<f32>,
    opponent_cfvs: Vec<f32>,
    follow_regrets: Vec<f32>,
    terminate_regrets: Vec<f32>,
}

impl<'a> CFRDGadget<'a> {
    pub fn new(settings: &'a GameSettings, board: &[Card], opponent_cfvs: &[f32]) -> Self {
        let tools = CardTools::new(settings);
        let possible_mask = tools.possible_hands_mask(board);
        let hc = settings.hand_count;
        CFRDGadget {
            settings,
            board: board.to_vec(),
            possible_mask,
            opponent_cfvs: opponent_cfvs.to_vec(),
            follow_regrets: vec![0.0; hc],
            terminate_regrets: vec![0.0; hc],
        }
    }

    pub fn board(&self) -> &[Card] {
        &self.board
    }

    /// Given the opponent's *achieved* CFVs this iteration (from actually
    /// playing out the sub-tree), produces the reconstructed opponent
    /// range for the next iteration. Non-negative, sums to 1, and zero on
    /// hands impossible given `board`.
    pub fn compute_opponent_range(&mut self, current_cfvs_of_opponent: &[f32], iteration: usize) -> Vec<f32> {
        let hc = self.settings.hand_count;
        let mut range = vec![0.0f32; hc];

        for h in 0..hc {
            if self.possible_mask[h] == 0.0 {
                continue;
            }
            let follow_value = current_cfvs_of_opponent[h];
            let terminate_value = self.opponent_cfvs[h];
            let gadget_value = follow_value.max(terminate_value);

            let follow_regret = follow_value - gadget_value;
            let terminate_regret = terminate_value - gadget_value;

            self.follow_regrets[h] = (self.follow_regrets[h] + follow_regret).max(0.0);
            self.terminate_regrets[h] = (self.terminate_regrets[h] + terminate_regret).max(0.0);
        }

        let _ = iteration;

        for h in 0..hc {
            if self.possible_mask[h] == 0.0 {
                continue;
            }
            let total = self.follow_regrets[h] + self.terminate_regrets[h];
            range[h] = if total > 0.0 {
                self.follow_regrets[h] / total
            } else {
                0.5
            };
        }

        let mask_sum: f32 = self.possible_mask.iter().sum();
        if mask_sum > 0.0 {
            let range_sum: f32 = range.iter().sum();
            if range_sum > 0.0 {
                for v in range.iter_mut() {
                    *v /= range_sum;
                }
            } else {
                for (v, &m) in range.iter_mut().zip(self.possible_mask.iter()) {
                    *v = m / mask_sum;
                }
            }
        }

        range
    }
}
