//! Combinatorial indexing of holes and boards, and hand-validity masks.
//!
//! Everything here is pure arithmetic over card indices; it has no
//! dependency on the rest of the lookahead and is safe to unit-test in
//! isolation.

use crate::error::{ResolveError, ResolveResult};
use crate::params::GameSettings;

/// `n choose k`, computed with `u64` to avoid overflow on decks up to 52
/// cards; callers cast down once the result is known to fit.
pub fn choose(n: usize, k: usize) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u64 = 1;
    for i in 0..k {
        result = result * (n - i) as u64 / (i + 1) as u64;
    }
    result
}

/// Colex rank of a sorted `k`-subset of `{0, .., n-1}` among all such subsets.
///
/// `hand` must be sorted in strictly ascending order. This is the standard
/// combinatorial-number-system rank and is its own well-defined inverse,
/// though only the forward direction is needed here.
pub fn colex_rank(hand: &[u8]) -> usize {
    let mut index: u64 = 0;
    for (i, &card) in hand.iter().enumerate() {
        index += choose(card as usize, i + 1);
    }
    index as usize
}

/// Returns true iff `hand` shares no card with `board`.
pub fn hand_is_possible(hand: &[u8], board: &[u8]) -> bool {
    for &h in hand {
        if board.contains(&h) {
            return false;
        }
    }
    true
}

/// `CardTools` bundles indexing helpers that are parameterized on a fixed
/// `GameSettings`; every hole and board index depends on `hand_card_count`
/// and `card_count` so we keep a reference rather than threading both
/// through every free function.
pub struct CardTools<'a> {
    settings: &'a GameSettings,
    all_hands: Vec<Vec<u8>>,
}

impl<'a> CardTools<'a> {
    pub fn new(settings: &'a GameSettings) -> Self {
        let all_hands = enumerate_combinations(settings.card_count, settings.hand_card_count);
        CardTools {
            settings,
            all_hands,
        }
    }

    /// The `hand_count`-length list of all private hands, in colex order
    /// (i.e. `all_hands()[i]` is the hand whose `hole_index` is `i`).
    pub fn all_hands(&self) -> &[Vec<u8>] {
        &self.all_hands
    }

    /// Colex rank of a sorted hand among all `hand_card_count`-card hands.
    pub fn hole_index(&self, hand: &[u8]) -> usize {
        colex_rank(hand)
    }

    /// Rank of `board` among all boards of its length drawn from the full
    /// deck, using the same colex convention as `hole_index`. `flop_index`
    /// in the spec is this function specialized to 3-card boards.
    pub fn board_index(&self, board: &[u8]) -> usize {
        colex_rank(board)
    }

    /// `[HC]` 0/1 mask: 1 iff the hole at that index shares no card with
    /// `board`.
    pub fn possible_hands_mask(&self, board: &[u8]) -> Vec<f32> {
        self.all_hands
            .iter()
            .map(|hand| if hand_is_possible(hand, board) { 1.0 } else { 0.0 })
            .collect()
    }

    pub fn possible_hand_indexes(&self, board: &[u8]) -> Vec<usize> {
        self.all_hands
            .iter()
            .enumerate()
            .filter(|(_, hand)| hand_is_possible(hand, board))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn impossible_hand_indexes(&self, board: &[u8]) -> Vec<usize> {
        self.all_hands
            .iter()
            .enumerate()
            .filter(|(_, hand)| !hand_is_possible(hand, board))
            .map(|(i, _)| i)
            .collect()
    }

    /// `possible_hands_mask` normalized to sum to 1.
    pub fn uniform_range(&self, board: &[u8]) -> ResolveResult<Vec<f32>> {
        let mask = self.possible_hands_mask(board);
        normalize_range(&mask)
    }

    /// A range supported on exactly the hands compatible with `board`,
    /// with mass distributed according to `weights` (same length as
    /// `all_hands()`) and then normalized. Masks out and renormalizes
    /// rather than assuming `weights` is already board-consistent.
    pub fn random_range(&self, board: &[u8], weights: &[f32]) -> ResolveResult<Vec<f32>> {
        if weights.len() != self.settings.hand_count {
            return Err(ResolveError::InvalidInput(format!(
                "expected {} weights, got {}",
                self.settings.hand_count,
                weights.len()
            )));
        }
        let mask = self.possible_hands_mask(board);
        let masked: Vec<f32> = weights
            .iter()
            .zip(mask.iter())
            .map(|(&w, &m)| w.max(0.0) * m)
            .collect();
        normalize_range(&masked)
    }

    /// A range is valid iff it sums to 1 within `1e-4` and has zero mass on
    /// every hand impossible on `board`.
    pub fn is_valid_range(&self, range: &[f32], board: &[u8]) -> bool {
        if range.len() != self.settings.hand_count {
            return false;
        }
        let sum: f32 = range.iter().sum();
        if (sum - 1.0).abs() > 1e-4 {
            return false;
        }
        let mask = self.possible_hands_mask(board);
        range
            .iter()
            .zip(mask.iter())
            .all(|(&r, &m)| m != 0.0 || r == 0.0)
    }

    /// Number of cards already on `board`, determining which street it
    /// represents.
    pub fn board_to_street(&self, board: &[u8]) -> usize {
        let mut cumulative = 0;
        for (street, &count) in self.settings.board_card_count.iter().enumerate() {
            cumulative += count;
            if board.len() <= cumulative {
                return street;
            }
        }
        self.settings.streets_count - 1
    }

    /// All possible boards for the street after `board`, each extended by
    /// the next street's card count, sorted ascending, deduplicated of
    /// shared cards with `board`.
    pub fn next_round_boards(&self, board: &[u8]) -> Vec<Vec<u8>> {
        let street = self.board_to_street(board);
        if street + 1 >= self.settings.streets_count {
            return Vec::new();
        }
        let new_cards = self.settings.board_card_count[street + 1];
        let mut remaining: Vec<u8> = (0..self.settings.card_count as u8)
            .filter(|c| !board.contains(c))
            .collect();
        remaining.sort_unstable();
        let mut out = Vec::new();
        build_boards_recursive(board, &remaining, new_cards, &mut out);
        out
    }

    /// Number of distinct next-round boards, i.e. `len(next_round_boards(board))`
    /// without materializing them.
    pub fn next_boards_count(&self, board: &[u8]) -> u64 {
        let street = self.board_to_street(board);
        if street + 1 >= self.settings.streets_count {
            return 0;
        }
        let new_cards = self.settings.board_card_count[street + 1];
        let remaining = self.settings.card_count - board.len();
        choose(remaining, new_cards)
    }

    /// All possible boards for the *final* street reachable from `board` in
    /// one step, i.e. `board` extended by every street's remaining cards at
    /// once rather than one street at a time. Used by callers that want to
    /// average a quantity directly over terminal boards instead of
    /// recursing street-by-street (the two are equivalent by linearity of
    /// expectation under uniform board draws, but enumerating directly
    /// avoids building every intermediate street's board set).
    pub fn last_round_boards(&self, board: &[u8]) -> Vec<Vec<u8>> {
        let street = self.board_to_street(board);
        if street + 1 >= self.settings.streets_count {
            return Vec::new();
        }
        let new_cards: usize = self.settings.board_card_count[street + 1..].iter().sum();
        let mut remaining: Vec<u8> = (0..self.settings.card_count as u8)
            .filter(|c| !board.contains(c))
            .collect();
        remaining.sort_unstable();
        let mut out = Vec::new();
        build_boards_recursive(board, &remaining, new_cards, &mut out);
        out
    }

    /// Number of distinct final-street boards reachable from `board`, i.e.
    /// `len(last_round_boards(board))` without materializing them.
    pub fn last_boards_count(&self, board: &[u8]) -> u64 {
        let street = self.board_to_street(board);
        if street + 1 >= self.settings.streets_count {
            return 0;
        }
        let new_cards: usize = self.settings.board_card_count[street + 1..].iter().sum();
        let remaining = self.settings.card_count - board.len();
        choose(remaining, new_cards)
    }
}

fn build_boards_recursive(prefix: &[u8], remaining: &[u8], count: usize, out: &mut Vec<Vec<u8>>) {
    if count == 0 {
        let mut board = prefix.to_vec();
        board.sort_unstable();
        out.push(board);
        return;
    }
    for (i, &card) in remaining.iter().enumerate() {
        if remaining.len() - i < count {
            break;
        }
        let mut next_prefix = prefix.to_vec();
        next_prefix.push(card);
        build_boards_recursive(&next_prefix, &remaining[i + 1..], count - 1, out);
    }
}

/// Normalizes a non-negative vector to sum to 1. Errors rather than
/// dividing by zero when the input is entirely masked out.
pub fn normalize_range(range: &[f32]) -> ResolveResult<Vec<f32>> {
    let sum: f32 = range.iter().sum();
    if sum <= 0.0 {
        return Err(ResolveError::InvalidInput(
            "cannot normalize a range with zero total mass".to_string(),
        ));
    }
    Ok(range.iter().map(|&r| r / sum).collect())
}

fn enumerate_combinations(n: usize, k: usize) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(k);
    enumerate_combinations_recursive(n, k, 0, &mut current, &mut out);
    out
}

fn enumerate_combinations_recursive(
    n: usize,
    k: usize,
    start: usize,
    current: &mut Vec<u8>,
    out: &mut Vec<Vec<u8>>,
) {
    if current.len() == k {
        out.push(current.clone());
        return;
    }
    for card in start..n {
        current.push(card as u8);
        enumerate_combinations_recursive(n, k, card + 1, current, out);
        current.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leduc_settings() -> GameSettings {
        GameSettings::leduc()
    }

    #[test]
    fn test_choose() {
        assert_eq!(choose(6, 1), 6);
        assert_eq!(choose(52, 2), 1326);
        assert_eq!(choose(5, 7), 0);
    }

    #[test]
    fn test_colex_rank_is_injective() {
        let hands = enumerate_combinations(6, 1);
        let mut ranks: Vec<usize> = hands.iter().map(|h| colex_rank(h)).collect();
        ranks.sort_unstable();
        ranks.dedup();
        assert_eq!(ranks.len(), hands.len());
    }

    #[test]
    fn test_possible_hands_mask_blocks_board_cards() {
        let settings = leduc_settings();
        let tools = CardTools::new(&settings);
        let board = [0u8];
        let mask = tools.possible_hands_mask(&board);
        let idx = tools.hole_index(&[0]);
        assert_eq!(mask[idx], 0.0);
        assert_eq!(mask.iter().filter(|&&m| m == 1.0).count(), 5);
    }

    #[test]
    fn test_uniform_range_sums_to_one_and_respects_mask() {
        let settings = leduc_settings();
        let tools = CardTools::new(&settings);
        let board = [0u8];
        let range = tools.uniform_range(&board).unwrap();
        let sum: f32 = range.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(tools.is_valid_range(&range, &board));
    }

    #[test]
    fn test_random_range_masks_and_normalizes() {
        let settings = leduc_settings();
        let tools = CardTools::new(&settings);
        let board = [0u8];
        let weights = vec![1.0; settings.hand_count];
        let range = tools.random_range(&board, &weights).unwrap();
        assert!(tools.is_valid_range(&range, &board));
    }

    #[test]
    fn test_next_round_boards_count_matches_enumeration() {
        let settings = leduc_settings();
        let tools = CardTools::new(&settings);
        let board: Vec<u8> = Vec::new();
        let boards = tools.next_round_boards(&board);
        assert_eq!(boards.len() as u64, tools.next_boards_count(&board));
        assert_eq!(boards.len(), 6);
    }

    #[test]
    fn test_last_round_boards_matches_next_round_when_one_street_remains() {
        // Leduc has exactly two streets, so from the empty board the "next"
        // street and the "last" street are the same street.
        let settings = leduc_settings();
        let tools = CardTools::new(&settings);
        let board: Vec<u8> = Vec::new();
        let mut next = tools.next_round_boards(&board);
        let mut last = tools.last_round_boards(&board);
        next.sort();
        last.sort();
        assert_eq!(next, last);
        assert_eq!(tools.last_boards_count(&board), tools.next_boards_count(&board));
    }
}
