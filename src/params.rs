use crate::error::{ResolveError, ResolveResult};

/// Game-level constants shared by every module in this crate.
///
/// These describe the fixed shape of the poker variant being solved, not
/// anything about a particular hand or re-solve. They are built once and
/// threaded through by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    /// Number of players. The engine only supports heads-up re-solving.
    pub players_count: usize,
    /// Number of betting streets (e.g. 4 for hold'em, 2 for Leduc).
    pub streets_count: usize,
    /// Number of board cards revealed on each street, indexed `0..streets_count`.
    pub board_card_count: Vec<usize>,
    /// Number of private cards held by each player.
    pub hand_card_count: usize,
    /// Total number of distinct cards in the deck.
    pub card_count: usize,
    /// Total number of distinct private hands (combinations of `hand_card_count`
    /// cards out of `card_count`).
    pub hand_count: usize,
}

impl GameSettings {
    /// Settings for heads-up Leduc poker: 6-card deck, 1 board card, 1-card hands.
    pub fn leduc() -> Self {
        GameSettings {
            players_count: 2,
            streets_count: 2,
            board_card_count: vec![0, 1],
            hand_card_count: 1,
            card_count: 6,
            hand_count: 6,
        }
    }

    pub fn validate(&self) -> ResolveResult<()> {
        if self.players_count != 2 {
            return Err(ResolveError::InvalidInput(
                "only heads-up (players_count == 2) is supported".to_string(),
            ));
        }
        if self.board_card_count.len() != self.streets_count {
            return Err(ResolveError::InvalidInput(format!(
                "board_card_count has {} entries, expected streets_count = {}",
                self.board_card_count.len(),
                self.streets_count
            )));
        }
        Ok(())
    }
}

/// Tunable parameters governing a single CFR+ re-solve.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveParams {
    /// Total number of CFR+ iterations to run.
    pub cfr_iters: usize,
    /// Burn-in iteration count before averaging starts. Must be `< cfr_iters`.
    pub cfr_skip_iters: usize,
    /// Small positive floor on clipped cumulative regret, used both to seed
    /// regrets at construction time and as the lower clamp in CFR+.
    pub regret_epsilon: f32,
    /// Upper clamp on cumulative regret and other accumulators, guarding
    /// against unbounded growth turning into `inf`/`NaN`.
    pub max_number: f32,
    /// Ante chip amount, used only for pot-size bookkeeping when a tree is
    /// built from scratch; irrelevant to the CFR+ core itself.
    pub ante: i32,
    /// Effective stack in chips, used the same way as `ante`.
    pub stack: i32,
}

impl ResolveParams {
    pub fn validate(&self) -> ResolveResult<()> {
        if self.cfr_skip_iters >= self.cfr_iters {
            return Err(ResolveError::InvalidInput(format!(
                "cfr_skip_iters ({}) must be less than cfr_iters ({})",
                self.cfr_skip_iters, self.cfr_iters
            )));
        }
        if self.regret_epsilon <= 0.0 {
            return Err(ResolveError::InvalidInput(
                "regret_epsilon must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ResolveParams {
    fn default() -> Self {
        ResolveParams {
            cfr_iters: 1000,
            cfr_skip_iters: 500,
            regret_epsilon: 1e-9,
            max_number: 1e15,
            ante: 0,
            stack: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_settings_leduc() {
        let gs = GameSettings::leduc();
        assert!(gs.validate().is_ok());
        assert_eq!(gs.board_card_count.len(), gs.streets_count);
    }

    #[test]
    fn test_resolve_params_rejects_bad_skip() {
        let mut p = ResolveParams::default();
        p.cfr_skip_iters = p.cfr_iters;
        assert!(p.validate().is_err());
    }
}
