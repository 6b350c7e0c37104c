//! Precomputes, for a fixed board, the call-matrix `E` and fold-matrix `F`
//! that turn a reach-probability vector into a showdown counterfactual
//! value without walking a tree: `ranges · E` is the contribution from
//! both players calling down, `ranges · F` is the uncontested-fold
//! payout.

use std::path::Path;

use once_cell::sync::OnceCell;

use crate::card::Card;
use crate::card_tools::{choose, CardTools};
use crate::error::{ResolveError, ResolveResult};
use crate::interface::HandStrengthEvaluator;
use crate::params::GameSettings;
#[cfg(not(feature = "rayon"))]
use crate::sliceop::row;

static PF_EQUITY: OnceCell<Option<Vec<f32>>> = OnceCell::new();

/// Loads the persisted preflop equity table the first time it's needed,
/// caching the result (including a cache miss) for the lifetime of the
/// process. Absence of the file is not an error: callers fall back to
/// computing the preflop matrix the same way an inner-round matrix is
/// computed.
#[cfg(feature = "bincode")]
fn load_pf_equity(path: &Path, hand_count: usize) -> &'static Option<Vec<f32>> {
    PF_EQUITY.get_or_init(|| {
        let raw = std::fs::read(path).ok()?;
        let bytes = decompress_if_zstd(&raw)?;
        let config = bincode::config::standard();
        let (table, _): (Vec<f32>, usize) =
            bincode::decode_from_slice(&bytes, config).ok()?;
        if table.len() == hand_count * hand_count {
            Some(table)
        } else {
            None
        }
    })
}

/// Transparently decompresses a zstd-compressed artifact when the `zstd`
/// feature is enabled; with it disabled (or the bytes not zstd-compressed),
/// the raw bytes are passed through unchanged.
#[cfg(all(feature = "bincode", feature = "zstd"))]
fn decompress_if_zstd(raw: &[u8]) -> Option<std::borrow::Cow<'_, [u8]>> {
    match zstd::stream::decode_all(raw) {
        Ok(decoded) => Some(std::borrow::Cow::Owned(decoded)),
        Err(_) => Some(std::borrow::Cow::Borrowed(raw)),
    }
}

#[cfg(all(feature = "bincode", not(feature = "zstd")))]
fn decompress_if_zstd(raw: &[u8]) -> Option<std::borrow::Cow<'_, [u8]>> {
    Some(std::borrow::Cow::Borrowed(raw))
}

/// Without the `bincode` feature there is no persisted-table format to
/// decode; every board falls back to the computed-matrix path.
#[cfg(not(feature = "bincode"))]
fn load_pf_equity(_path: &Path, _hand_count: usize) -> &'static Option<Vec<f32>> {
    PF_EQUITY.get_or_init(|| None)
}

/// `HC × HC` matrices for one fixed board.
pub struct TerminalEquity<'a> {
    settings: &'a GameSettings,
    hand_count: usize,
    block_matrix: Vec<f32>,
    call_matrix: Vec<f32>,
    fold_matrix: Vec<f32>,
    board: Vec<Card>,
}

impl<'a> TerminalEquity<'a> {
    /// Builds the static card-blocking matrix; this depends only on
    /// `settings` and is reused across every board the caller sets.
    fn build_block_matrix(settings: &GameSettings) -> Vec<f32> {
        let tools = CardTools::new(settings);
        let hands = tools.all_hands();
        let hc = hands.len();
        let mut block = vec![1.0f32; hc * hc];
        for i in 0..hc {
            for j in 0..hc {
                if hands[i].iter().any(|c| hands[j].contains(c)) {
                    block[i * hc + j] = 0.0;
                }
            }
        }
        block
    }

    pub fn new(settings: &'a GameSettings) -> Self {
        let hand_count = settings.hand_count;
        TerminalEquity {
            settings,
            hand_count,
            block_matrix: Self::build_block_matrix(settings),
            call_matrix: vec![0.0; hand_count * hand_count],
            fold_matrix: vec![0.0; hand_count * hand_count],
            board: Vec::new(),
        }
    }

    pub fn board(&self) -> &[Card] {
        &self.board
    }

    /// Builds `E` and `F` for `board`, dispatching on street: the last
    /// street evaluates hand strengths directly, earlier streets average
    /// over every possible next-round board, and an empty board tries the
    /// persisted preflop table first.
    pub fn set_board(
        &mut self,
        board: &[Card],
        evaluator: &dyn HandStrengthEvaluator,
        pf_equity_path: Option<&Path>,
    ) -> ResolveResult<()> {
        let tools = CardTools::new(self.settings);
        let street = tools.board_to_street(board);

        if board.is_empty() {
            if let Some(path) = pf_equity_path {
                if let Some(table) = load_pf_equity(path, self.hand_count) {
                    self.call_matrix = table.clone();
                    self.fold_matrix = vec![1.0; self.hand_count * self.hand_count];
                    self.board = board.to_vec();
                    self.apply_masking(board, &tools);
                    return Ok(());
                }
            }
        }

        if street + 1 == self.settings.streets_count {
            self.set_last_round_call_matrix(board, evaluator);
        } else {
            self.set_inner_call_matrix(board, evaluator, &tools)?;
        }
        self.fold_matrix = vec![1.0; self.hand_count * self.hand_count];
        self.board = board.to_vec();
        self.apply_masking(board, &tools);
        Ok(())
    }

    fn set_last_round_call_matrix(&mut self, board: &[Card], evaluator: &dyn HandStrengthEvaluator) {
        let strengths = evaluator.strength(board);
        let hc = self.hand_count;
        let mut matrix = vec![0.0f32; hc * hc];
        for i in 0..hc {
            for j in 0..hc {
                matrix[i * hc + j] = match strengths[i].cmp(&strengths[j]) {
                    std::cmp::Ordering::Greater => 1.0,
                    std::cmp::Ordering::Less => -1.0,
                    std::cmp::Ordering::Equal => 0.0,
                };
            }
        }
        self.call_matrix = matrix;
    }

    fn set_inner_call_matrix(
        &mut self,
        board: &[Card],
        evaluator: &dyn HandStrengthEvaluator,
        tools: &CardTools<'_>,
    ) -> ResolveResult<()> {
        let next_boards = tools.next_round_boards(board);
        if next_boards.is_empty() {
            return Err(ResolveError::InvariantViolation(
                "inner-round board has no next-round extensions".to_string(),
            ));
        }
        let hc = self.hand_count;
        let mut accum = vec![0.0f32; hc * hc];
        for next_board in &next_boards {
            let mut child = TerminalEquity::new(self.settings);
            child.set_board(next_board, evaluator, None)?;
            for (dst, src) in accum.iter_mut().zip(child.call_matrix.iter()) {
                *dst += src;
            }
        }
        let cards_left = self.settings.card_count
            - self.settings.hand_card_count * self.settings.players_count
            - board.len();
        let cards_to_come = next_boards[0].len() - board.len();
        let divisor = choose(cards_left, cards_to_come) as f32;
        for v in accum.iter_mut() {
            *v /= divisor;
        }
        self.call_matrix = accum;
        Ok(())
    }

    /// Multiplies each row/column of `E` and `F` by `possible_hands_mask`
    /// and element-wise by the static block matrix.
    fn apply_masking(&mut self, board: &[Card], tools: &CardTools<'_>) {
        let mask = tools.possible_hands_mask(board);
        let hc = self.hand_count;
        for i in 0..hc {
            for j in 0..hc {
                let factor = mask[i] * mask[j] * self.block_matrix[i * hc + j];
                self.call_matrix[i * hc + j] *= factor;
                self.fold_matrix[i * hc + j] *= factor;
            }
        }
    }

    /// `out = ranges · E`. `ranges`/`out` are `[n, HC]` flattened row-major.
    pub fn call_value(&self, ranges: &[f32], out: &mut [f32]) {
        self.matvec(ranges, &self.call_matrix, out);
    }

    /// `out = ranges · F`. The caller negates for the folder.
    pub fn fold_value(&self, ranges: &[f32], out: &mut [f32]) {
        self.matvec(ranges, &self.fold_matrix, out);
    }

    /// `out = ranges · matrix`, one row per batch element. Parallelized
    /// over the batch axis when the `rayon` feature is enabled; per §5 this
    /// only changes scheduling, not the per-row arithmetic, so results are
    /// bit-identical either way.
    #[cfg(feature = "rayon")]
    fn matvec(&self, ranges: &[f32], matrix: &[f32], out: &mut [f32]) {
        use rayon::prelude::*;
        let hc = self.hand_count;
        out.par_chunks_mut(hc)
            .zip(ranges.par_chunks(hc))
            .for_each(|(o, r)| Self::matvec_row(r, matrix, hc, o));
    }

    #[cfg(not(feature = "rayon"))]
    fn matvec(&self, ranges: &[f32], matrix: &[f32], out: &mut [f32]) {
        let hc = self.hand_count;
        let n = ranges.len() / hc;
        for row_idx in 0..n {
            let r = row(ranges, row_idx, hc);
            let o = &mut out[row_idx * hc..(row_idx + 1) * hc];
            Self::matvec_row(r, matrix, hc, o);
        }
    }

    fn matvec_row(r: &[f32], matrix: &[f32], hc: usize, o: &mut [f32]) {
        for j in 0..hc {
            let mut acc = 0.0f32;
            for i in 0..hc {
                acc += r[i] * matrix[i * hc + j];
            }
            o[j] = acc;
        }
    }

    /// Swapped-index convenience: `result[p]` is derived from
    /// `ranges[1 - p]`, since P1's counterfactual value is a function of
    /// P2's range and vice versa.
    pub fn tree_node_call_value(&self, ranges: &[Vec<f32>; 2], result: &mut [Vec<f32>; 2]) {
        for p in 0..2 {
            let mut out = vec![0.0; self.hand_count];
            self.call_value(&ranges[1 - p], &mut out);
            result[p] = out;
        }
    }

    pub fn tree_node_fold_value(
        &self,
        ranges: &[Vec<f32>; 2],
        result: &mut [Vec<f32>; 2],
        folding_player: usize,
    ) {
        for p in 0..2 {
            let mut out = vec![0.0; self.hand_count];
            self.fold_value(&ranges[1 - p], &mut out);
            if p == folding_player {
                for v in out.iter_mut() {
                    *v = -*v;
                }
            }
            result[p] = out;
        }
    }
}
