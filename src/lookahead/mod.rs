//! The CFR+ iteration loop over the tensor layout built by
//! [`layout::LookaheadBuilder`]. This is the central subsystem: everything
//! else in the crate exists to feed this loop ranges and matrices, or to
//! read its results back out.

pub mod gadget;
pub mod layout;

use std::io::{self, Write};

use crate::card::Card;
use crate::error::{ResolveError, ResolveResult};
use crate::interface::{ActionKind, NextStreetOracle, PublicNode};
use crate::params::{GameSettings, ResolveParams};
use crate::terminal_equity::TerminalEquity;

use gadget::CFRDGadget;
use layout::{LookaheadBuilder, LookaheadLayout, SlotKind};

/// What the Lookahead was seeded with, and therefore what `get_results`
/// can honestly report.
enum ResolveMode<'a> {
    /// `resolve_first_node`: both players' explicit ranges are known.
    FirstNode { opponent_range: Vec<f32> },
    /// `resolve`: only the resolving player's range is known; the
    /// opponent's range is reconstructed each iteration by the gadget from
    /// a target CFV vector.
    FromCfvs { gadget: CFRDGadget<'a> },
}

/// Root-level average strategy, achieved/child CFVs — the public result of
/// a re-solve, handed back to the continual-resolving driver.
pub struct LookaheadResults {
    /// `[A, S, HC]` root average strategy, flattened row-major.
    pub strategy: Vec<f32>,
    /// `[PC, HC]` the opponent's average CFV vector at the root.
    pub achieved_cfvs: Vec<f32>,
    /// The resolving player's average CFVs at the root, `None` when
    /// resolving from a CFV target (there is no "own range" to average
    /// over in that mode).
    pub root_cfvs: Option<Vec<f32>>,
    /// Same as `root_cfvs` but with the player axes swapped, matching the
    /// lookahead's internal swapped-CFV convention (see design notes).
    pub root_cfvs_both_players: Option<Vec<f32>>,
    /// `[A, HC]` the opponent's child CFV per root action, action-
    /// conditioned (divided by the root action's average probability,
    /// not reach-weighted).
    pub children_cfvs: Vec<f32>,
    pub action_kinds: Vec<ActionKind>,
}

/// Owns the tensor arena for one re-solve and runs CFR+ over it.
///
/// A `Lookahead` is built once per `Resolving::resolve` call and discarded
/// afterwards; nothing here is shared across resolves except the
/// `TerminalEquity` matrices, which the caller owns.
pub struct Lookahead<'a> {
    settings: &'a GameSettings,
    params: &'a ResolveParams,
    terminal_equity: &'a TerminalEquity<'a>,
    oracle: Option<&'a dyn NextStreetOracle>,
    root_street: usize,
    layout: LookaheadLayout,
    /// `[S, P, H]` flattened, the reach entering the root's own decision —
    /// i.e. the ranges passed to `resolve_first_node`/`resolve`, not yet
    /// scaled by the root's own strategy.
    root_range: Vec<f32>,
    /// `[P, H]` per-batch-element-averaged, the reconstructed/achieved CFV
    /// of the root node from the previous iteration, fed to the gadget and
    /// accumulated for averaging.
    root_cfvs: Vec<Vec<f32>>,
    average_root_cfvs: Vec<Vec<f32>>,
    mode: Option<ResolveMode<'a>>,
    batch_size: usize,
    print_progress: bool,
}

impl<'a> Lookahead<'a> {
    /// Builds the tensor layout for `root` (delegating to
    /// [`LookaheadBuilder`]) sized for `batch_size` ranges.
    pub fn build_lookahead(
        settings: &'a GameSettings,
        params: &'a ResolveParams,
        terminal_equity: &'a TerminalEquity<'a>,
        oracle: Option<&'a dyn NextStreetOracle>,
        root: &PublicNode,
        batch_size: usize,
    ) -> ResolveResult<Self> {
        Self::build_lookahead_with_progress(settings, params, terminal_equity, oracle, root, batch_size, false)
    }

    /// Same as [`Self::build_lookahead`], but reports iteration progress to
    /// stdout the way the teacher's `solve()` does, gated on `print_progress`
    /// rather than a logging framework.
    pub fn build_lookahead_with_progress(
        settings: &'a GameSettings,
        params: &'a ResolveParams,
        terminal_equity: &'a TerminalEquity<'a>,
        oracle: Option<&'a dyn NextStreetOracle>,
        root: &PublicNode,
        batch_size: usize,
        print_progress: bool,
    ) -> ResolveResult<Self> {
        let layout = LookaheadBuilder::new(settings, params).build(root, batch_size)?;
        let hc = settings.hand_count;
        let p = settings.players_count;
        Ok(Lookahead {
            settings,
            params,
            terminal_equity,
            oracle,
            root_street: root.street,
            layout,
            root_range: vec![0.0; batch_size * p * hc],
            root_cfvs: vec![vec![0.0; hc]; p],
            average_root_cfvs: vec![vec![0.0; hc]; p],
            mode: None,
            batch_size,
            print_progress,
        })
    }

    fn hc(&self) -> usize {
        self.settings.hand_count
    }

    fn seed_root_range(&mut self, player_idx: usize, range: &[f32]) -> ResolveResult<()> {
        if range.len() != self.hc() {
            return Err(ResolveError::InvalidInput(format!(
                "expected a range of length {}, got {}",
                self.hc(),
                range.len()
            )));
        }
        let hc = self.hc();
        let p = self.settings.players_count;
        for s in 0..self.batch_size {
            let base = (s * p + player_idx) * hc;
            self.root_range[base..base + hc].copy_from_slice(range);
        }
        Ok(())
    }

    /// Seeds both players' reach at the root and runs CFR+.
    pub fn resolve_first_node(&mut self, p_range: &[f32], o_range: &[f32]) -> ResolveResult<()> {
        let acting = self.layout.layers[0].acting_player;
        let opponent = 1 - acting;
        self.seed_root_range(acting, p_range)?;
        self.seed_root_range(opponent, o_range)?;
        self.mode = Some(ResolveMode::FirstNode {
            opponent_range: o_range.to_vec(),
        });
        self.compute()
    }

    /// Seeds the resolving player's reach and stores `o_cfvs` as the
    /// gadget's reconstruction target, then runs CFR+.
    pub fn resolve(&mut self, p_range: &[f32], o_cfvs: &[f32]) -> ResolveResult<()> {
        let acting = self.layout.layers[0].acting_player;
        self.seed_root_range(acting, p_range)?;
        let board = self.terminal_equity.board().to_vec();
        let gadget = CFRDGadget::new(self.settings, &board, o_cfvs);
        self.mode = Some(ResolveMode::FromCfvs { gadget });
        self.compute()
    }

    /// The main `cfr_iters`-pass loop. Order of passes within an iteration,
    /// and of depths within each pass, is fixed per the resource model.
    fn compute(&mut self) -> ResolveResult<()> {
        let depth = self.layout.depth;
        let hc = self.hc();
        let p = self.settings.players_count;
        let total_iters = self.params.cfr_iters;

        if self.print_progress {
            print!("cfr+ iteration: 0 / {total_iters}");
            io::stdout().flush().ok();
        }

        for iter in 0..self.params.cfr_iters {
            // 1. Gadget step.
            self.gadget_step(iter)?;

            // 2. Current strategies from regrets, every layer.
            for l in 0..depth {
                self.compute_strategy(l);
            }

            // 3. Forward: compute ranges, layer 0..D-1 (root feeds layer 0).
            for l in 0..depth {
                self.forward_ranges(l);
            }

            // 4. Accumulate average strategy (root decision only).
            if iter > self.params.cfr_skip_iters {
                let layer = &mut self.layout.layers[0];
                let cur = layer.current_strategy.as_slice().to_vec();
                let avg = layer.average_strategy.as_mut_slice();
                for (a, c) in avg.iter_mut().zip(cur.iter()) {
                    *a += c;
                }
            }

            // 5. Terminal equities (+ pot scaling), every layer.
            for l in 0..depth {
                self.terminal_equities(l)?;
            }

            // 6. Backward: compute interior CFVs, D..1.
            for h in 0..hc {
                for pl in 0..p {
                    self.root_cfvs[pl][h] = 0.0;
                }
            }
            for l in (0..depth).rev() {
                self.backward_cfvs(l);
            }

            // 7. Regrets (CFR+): every decision layer.
            for l in 0..depth {
                self.update_regrets(l);
            }

            // 8. Accumulate average CFVs.
            if iter > self.params.cfr_skip_iters {
                for pl in 0..p {
                    for h in 0..hc {
                        self.average_root_cfvs[pl][h] += self.root_cfvs[pl][h];
                    }
                }
                let layer = &mut self.layout.layers[0];
                let cur = layer.cfvs.as_slice().to_vec();
                let avg = layer.average_cfvs.as_mut_slice();
                for (a, c) in avg.iter_mut().zip(cur.iter()) {
                    *a += c;
                }
            }

            if self.print_progress {
                print!("\rcfr+ iteration: {} / {total_iters}", iter + 1);
                io::stdout().flush().ok();
            }
        }

        if self.print_progress {
            println!();
            io::stdout().flush().ok();
        }

        self.finalize();
        Ok(())
    }

    fn gadget_step(&mut self, iter: usize) -> ResolveResult<()> {
        let acting = self.layout.layers[0].acting_player;
        let opponent = 1 - acting;
        let hc = self.hc();
        let batch = self.batch_size;

        let new_range = match &mut self.mode {
            Some(ResolveMode::FromCfvs { gadget }) => {
                let mut current = vec![0.0f32; hc];
                let denom = batch.max(1) as f32;
                // average the previous iteration's achieved opponent CFVs
                // across the batch axis; the gadget itself is batch-free.
                for h in 0..hc {
                    current[h] = self.root_cfvs[opponent][h] / denom;
                }
                Some(gadget.compute_opponent_range(&current, iter))
            }
            _ => None,
        };

        if let Some(range) = new_range {
            self.seed_root_range(opponent, &range)?;
        }
        Ok(())
    }

    /// Step 2: clip regrets, mask, normalize per `(n, s, h)` over the
    /// action axis.
    fn compute_strategy(&mut self, l: usize) {
        let layer = &mut self.layout.layers[l];
        let shape = layer.shape;
        let (a_n, n_n, s_n, p_n, h_n) = (shape.a, shape.n, shape.s, shape.p, shape.h);
        let acting = layer.acting_player;
        let epsilon = self.params.regret_epsilon;
        let max_number = self.params.max_number;
        let slab_len = s_n * p_n * h_n;

        let regrets = layer.regrets.as_slice().to_vec();
        let mut positive = vec![0.0f32; regrets.len()];
        for n in 0..n_n {
            for a in 0..a_n {
                let mask = layer.mask(a, n);
                let row_start = (a * n_n + n) * slab_len;
                for s in 0..s_n {
                    let h_start = row_start + (s * p_n + acting) * h_n;
                    for h in 0..h_n {
                        let r = regrets[h_start + h];
                        positive[h_start + h] = if mask == 0.0 {
                            0.0
                        } else {
                            r.clamp(epsilon, max_number)
                        };
                    }
                }
            }
        }

        let strat = layer.current_strategy.as_mut_slice();
        for n in 0..n_n {
            for s in 0..s_n {
                for h in 0..h_n {
                    let idx = |a: usize| (a * n_n + n) * slab_len + (s * p_n + acting) * h_n + h;
                    let sum: f32 = (0..a_n).map(|a| positive[idx(a)]).sum();
                    for a in 0..a_n {
                        strat[idx(a)] = if sum > 0.0 { positive[idx(a)] / sum } else { 0.0 };
                    }
                }
            }
        }
    }

    /// Step 3: `ranges[l][a,n] = incoming(l,n) * strategy` on the acting
    /// player's axis, copied unchanged on the other (invariant I3).
    fn forward_ranges(&mut self, l: usize) {
        let hc = self.hc();
        let p = self.settings.players_count;
        let batch = self.batch_size;

        let (n_n, a_n, acting) = {
            let layer = &self.layout.layers[l];
            (layer.shape.n, layer.shape.a, layer.acting_player)
        };

        for n in 0..n_n {
            let incoming = self.incoming_range(l, n);
            let layer = &mut self.layout.layers[l];
            for a in 0..a_n {
                if layer.mask(a, n) == 0.0 {
                    continue;
                }
                let strat_slab = layer.current_strategy.slab(a, 0, n).to_vec();
                let slab = layer.ranges.slab_mut(a, 0, n);
                for s in 0..batch {
                    for pl in 0..p {
                        for h in 0..hc {
                            let idx = (s * p + pl) * hc + h;
                            slab[idx] = if pl == acting {
                                incoming[idx] * strat_slab[(s * p + acting) * hc + h]
                            } else {
                                incoming[idx]
                            };
                        }
                    }
                }
            }
        }
    }

    /// The `[S,P,H]` reach entering node `n` of layer `l`: the root range
    /// for `l == 0`, else the parent layer's slot that `parent_slot[n]`
    /// points to.
    fn incoming_range(&self, l: usize, n: usize) -> Vec<f32> {
        if l == 0 {
            return self.root_range.clone();
        }
        let parent_n_count = self.layout.layers[l - 1].shape.n;
        let flat = self.layout.layers[l].parent_slot[n];
        let a_p = flat / parent_n_count;
        let n_p = flat % parent_n_count;
        self.layout.layers[l - 1].ranges.slab(a_p, 0, n_p).to_vec()
    }

    /// Step 5: evaluate every terminal/next-street slot of layer `l`,
    /// writing pot-scaled CFVs.
    fn terminal_equities(&mut self, l: usize) -> ResolveResult<()> {
        let hc = self.hc();
        let batch = self.batch_size;
        let (a_n, n_n) = {
            let layer = &self.layout.layers[l];
            (layer.shape.a, layer.shape.n)
        };

        for n in 0..n_n {
            for a in 0..a_n {
                let layer = &self.layout.layers[l];
                if layer.mask(a, n) == 0.0 {
                    continue;
                }
                let kind = layer.kind(a, n);
                let acting = layer.acting_player;
                let pot = layer.child_pot(a, n);
                match kind {
                    SlotKind::Decision | SlotKind::Empty => continue,
                    SlotKind::TerminalFold => {
                        let ranges = self.layout.layers[l].ranges.slab(a, 0, n).to_vec();
                        let mut p0 = vec![0.0f32; batch * hc];
                        let mut p1 = vec![0.0f32; batch * hc];
                        for s in 0..batch {
                            p0[s * hc..(s + 1) * hc]
                                .copy_from_slice(&ranges[(s * 2) * hc..(s * 2 + 1) * hc]);
                            p1[s * hc..(s + 1) * hc]
                                .copy_from_slice(&ranges[(s * 2 + 1) * hc..(s * 2 + 2) * hc]);
                        }
                        let mut out0 = vec![0.0f32; batch * hc];
                        let mut out1 = vec![0.0f32; batch * hc];
                        self.terminal_equity.fold_value(&p1, &mut out0);
                        self.terminal_equity.fold_value(&p0, &mut out1);
                        // the acting player at this node is the one who
                        // folded; their payout is negative, the caller's
                        // (non-acting) is positive.
                        let layer = &mut self.layout.layers[l];
                        let cfv_slab = layer.cfvs.slab_mut(a, 0, n);
                        for s in 0..batch {
                            for h in 0..hc {
                                let sign0 = if acting == 0 { -1.0 } else { 1.0 };
                                let sign1 = if acting == 1 { -1.0 } else { 1.0 };
                                cfv_slab[(s * 2) * hc + h] = sign0 * out0[s * hc + h] * pot;
                                cfv_slab[(s * 2 + 1) * hc + h] = sign1 * out1[s * hc + h] * pot;
                            }
                        }
                    }
                    SlotKind::TerminalShowdown => {
                        let ranges = self.layout.layers[l].ranges.slab(a, 0, n).to_vec();
                        let mut p0 = vec![0.0f32; batch * hc];
                        let mut p1 = vec![0.0f32; batch * hc];
                        for s in 0..batch {
                            p0[s * hc..(s + 1) * hc]
                                .copy_from_slice(&ranges[(s * 2) * hc..(s * 2 + 1) * hc]);
                            p1[s * hc..(s + 1) * hc]
                                .copy_from_slice(&ranges[(s * 2 + 1) * hc..(s * 2 + 2) * hc]);
                        }
                        let mut out0 = vec![0.0f32; batch * hc];
                        let mut out1 = vec![0.0f32; batch * hc];
                        // P1's value comes from P2's range and vice versa.
                        self.terminal_equity.call_value(&p1, &mut out0);
                        self.terminal_equity.call_value(&p0, &mut out1);
                        let layer = &mut self.layout.layers[l];
                        let cfv_slab = layer.cfvs.slab_mut(a, 0, n);
                        for s in 0..batch {
                            for h in 0..hc {
                                cfv_slab[(s * 2) * hc + h] = out0[s * hc + h] * pot;
                                cfv_slab[(s * 2 + 1) * hc + h] = out1[s * hc + h] * pot;
                            }
                        }
                    }
                    SlotKind::NextStreetBox(box_idx) => {
                        self.evaluate_next_street_box(l, a, n, acting, pot, box_idx)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluate_next_street_box(
        &mut self,
        l: usize,
        a: usize,
        n: usize,
        acting: usize,
        pot: f32,
        box_idx: usize,
    ) -> ResolveResult<()> {
        let hc = self.hc();
        let batch = self.batch_size;
        let oracle = self.oracle.ok_or_else(|| {
            ResolveError::OracleFailure(
                "tree has a depth-limited transition but no next-street oracle was supplied"
                    .to_string(),
            )
        })?;

        let mut inputs = self.layout.layers[l].ranges.slab(a, 0, n).to_vec();
        if acting == 1 {
            swap_player_axis(&mut inputs, batch, hc);
        }
        let mut outputs = vec![0.0f32; inputs.len()];
        if self.root_street == 0 {
            oracle.get_value_aux(&inputs, &mut outputs, box_idx);
        } else {
            oracle.get_value(&inputs, &mut outputs, box_idx);
        }
        if !outputs.iter().all(|v| v.is_finite()) {
            return Err(ResolveError::OracleFailure(
                "next-street oracle returned a non-finite value".to_string(),
            ));
        }
        if acting == 1 {
            swap_player_axis(&mut outputs, batch, hc);
        }

        let layer = &mut self.layout.layers[l];
        let cfv_slab = layer.cfvs.slab_mut(a, 0, n);
        for (dst, src) in cfv_slab.iter_mut().zip(outputs.iter()) {
            *dst = *src * pot;
        }
        Ok(())
    }

    /// Step 6: combine a decision node's child CFVs into the node's own
    /// value, weighting the acting player's axis by its own strategy
    /// (invariant I3's forward multiplication already folded the strategy
    /// into the non-acting player's view, so only the acting axis needs
    /// re-weighting here).
    fn backward_cfvs(&mut self, l: usize) {
        let hc = self.hc();
        let p = self.settings.players_count;
        let batch = self.batch_size;
        let (a_n, n_n, acting) = {
            let layer = &self.layout.layers[l];
            (layer.shape.a, layer.shape.n, layer.acting_player)
        };

        for n in 0..n_n {
            let layer = &self.layout.layers[l];
            let mut combined = vec![0.0f32; batch * p * hc];
            for a in 0..a_n {
                if layer.mask(a, n) == 0.0 {
                    continue;
                }
                let strat_slab = layer.current_strategy.slab(a, 0, n);
                let cfv_slab = layer.cfvs.slab(a, 0, n);
                for s in 0..batch {
                    for pl in 0..p {
                        for h in 0..hc {
                            let idx = (s * p + pl) * hc + h;
                            combined[idx] += if pl == acting {
                                strat_slab[(s * p + acting) * hc + h] * cfv_slab[idx]
                            } else {
                                cfv_slab[idx]
                            };
                        }
                    }
                }
            }

            if l == 0 {
                for pl in 0..p {
                    for h in 0..hc {
                        let mut acc = 0.0f32;
                        for s in 0..batch {
                            acc += combined[(s * p + pl) * hc + h];
                        }
                        self.root_cfvs[pl][h] = acc / batch.max(1) as f32;
                    }
                }
            } else {
                let parent_n_count = self.layout.layers[l - 1].shape.n;
                let flat = self.layout.layers[l].parent_slot[n];
                let a_p = flat / parent_n_count;
                let n_p = flat % parent_n_count;
                let parent = &mut self.layout.layers[l - 1];
                let dst = parent.cfvs.slab_mut(a_p, 0, n_p);
                dst.copy_from_slice(&combined);
            }
        }
    }

    /// Step 7: CFR+ regret update — positive part of `child - parent`,
    /// clamped non-negative (invariant I5).
    fn update_regrets(&mut self, l: usize) {
        let hc = self.hc();
        let p = self.settings.players_count;
        let batch = self.batch_size;
        let max_number = self.params.max_number;
        let (a_n, n_n, acting) = {
            let layer = &self.layout.layers[l];
            (layer.shape.a, layer.shape.n, layer.acting_player)
        };

        for n in 0..n_n {
            let layer = &self.layout.layers[l];
            // the parent (average) value of this node on the acting
            // player's axis, recomputed the same way `backward_cfvs` did.
            let mut parent_value = vec![0.0f32; batch * hc];
            for a in 0..a_n {
                if layer.mask(a, n) == 0.0 {
                    continue;
                }
                let strat_slab = layer.current_strategy.slab(a, 0, n);
                let cfv_slab = layer.cfvs.slab(a, 0, n);
                for s in 0..batch {
                    for h in 0..hc {
                        let idx = (s * p + acting) * hc + h;
                        parent_value[s * hc + h] += strat_slab[idx] * cfv_slab[idx];
                    }
                }
            }

            for a in 0..a_n {
                let layer = &self.layout.layers[l];
                if layer.mask(a, n) == 0.0 {
                    continue;
                }
                let cfv_slab = layer.cfvs.slab(a, 0, n).to_vec();
                let layer = &mut self.layout.layers[l];
                let regret_slab = layer.regrets.slab_mut(a, 0, n);
                for s in 0..batch {
                    for h in 0..hc {
                        let idx = (s * p + acting) * hc + h;
                        let delta = cfv_slab[idx] - parent_value[s * hc + h];
                        regret_slab[idx] = (regret_slab[idx] + delta).clamp(0.0, max_number);
                    }
                }
            }
        }
    }

    /// Normalizes averaged strategy/CFVs after the loop completes.
    fn finalize(&mut self) {
        let hc = self.hc();
        let p = self.settings.players_count;
        let iters = (self.params.cfr_iters - self.params.cfr_skip_iters).max(1) as f32;

        let layer = &mut self.layout.layers[0];
        let (a_n, n_n, batch, acting) = (
            layer.shape.a,
            layer.shape.n,
            layer.shape.s,
            layer.acting_player,
        );
        let avg = layer.average_strategy.as_mut_slice();
        let slab_len = batch * p * hc;
        for n in 0..n_n {
            for s in 0..batch {
                for h in 0..hc {
                    let idx = |a: usize| (a * n_n + n) * slab_len + (s * p + acting) * hc + h;
                    let sum: f32 = (0..a_n).map(|a| avg[idx(a)]).sum();
                    if sum.is_finite() && sum > 0.0 {
                        for a in 0..a_n {
                            avg[idx(a)] /= sum;
                        }
                    } else {
                        for a in 0..a_n {
                            avg[idx(a)] = if a == 0 { 1.0 } else { 0.0 };
                        }
                    }
                }
            }
        }

        for pl in 0..p {
            for h in 0..hc {
                self.average_root_cfvs[pl][h] /= iters;
            }
        }
    }

    /// Packages the root average strategy, achieved/child CFVs into the
    /// public result type.
    pub fn get_results(&self) -> LookaheadResults {
        let hc = self.hc();
        let p = self.settings.players_count;
        let layer = &self.layout.layers[0];
        let acting = layer.acting_player;
        let opponent = 1 - acting;

        let strategy = layer.average_strategy.as_slice().to_vec();

        let achieved_cfvs = self.average_root_cfvs[opponent].clone();

        let (root_cfvs, root_cfvs_both_players) = match &self.mode {
            Some(ResolveMode::FirstNode { .. }) => {
                let mine = self.average_root_cfvs[acting].clone();
                let mut both = vec![0.0f32; p * hc];
                both[..hc].copy_from_slice(&self.average_root_cfvs[opponent]);
                both[hc..2 * hc].copy_from_slice(&self.average_root_cfvs[acting]);
                (Some(mine), Some(both))
            }
            _ => (None, None),
        };

        let a_n = layer.shape.a;
        let n_n = layer.shape.n;
        let batch = layer.shape.s;
        let mut children_cfvs = vec![0.0f32; a_n * hc];
        let avg_cfvs = layer.average_cfvs.as_slice();
        let avg_strategy = layer.average_strategy.as_slice();
        let slab_len = batch * p * hc;
        let iters = (self.params.cfr_iters - self.params.cfr_skip_iters).max(1) as f32;
        for a in 0..a_n {
            let row = (a * n_n) * slab_len;
            // `scaler` is one scalar per action: the root reach-weighted
            // average probability of taking this action, put back into the
            // same "summed over iterations" units as `avg_cfvs` (which is
            // never divided by `iters`) so the two can be divided directly.
            let mut scaler = 0.0f32;
            for s in 0..batch {
                for h in 0..hc {
                    let strat = avg_strategy[row + (s * p + acting) * hc + h];
                    let range = self.root_range[(s * p + acting) * hc + h];
                    scaler += strat * range;
                }
            }
            scaler = scaler / batch.max(1) as f32 * iters;
            for h in 0..hc {
                let mut cfv_sum = 0.0f32;
                for s in 0..batch {
                    cfv_sum += avg_cfvs[row + (s * p + opponent) * hc + h];
                }
                let mean_cfv = cfv_sum / batch.max(1) as f32;
                children_cfvs[a * hc + h] = if scaler > 1e-6 { mean_cfv / scaler } else { 0.0 };
            }
        }

        LookaheadResults {
            strategy,
            achieved_cfvs,
            root_cfvs,
            root_cfvs_both_players,
            children_cfvs,
            action_kinds: layer.action_kinds.clone(),
        }
    }

    /// Looks up the next-street oracle's output for root action
    /// `action_idx` on `board`, scaled by that action's pot.
    pub fn get_chance_action_cfv(&self, action_idx: usize, board: &[Card]) -> ResolveResult<Vec<f32>> {
        let hc = self.hc();
        let layer = &self.layout.layers[0];
        if layer.kind(action_idx, 0) == SlotKind::Decision
            || layer.mask(action_idx, 0) == 0.0
        {
            return Err(ResolveError::InvalidInput(format!(
                "root action {action_idx} is not a depth-limited chance transition"
            )));
        }
        let oracle = self.oracle.ok_or_else(|| {
            ResolveError::OracleFailure("no next-street oracle supplied".to_string())
        })?;
        let p = self.settings.players_count;
        let mut outputs = vec![0.0f32; p * hc];
        oracle.get_value_on_board(board, &mut outputs);
        let pot = layer.child_pot(action_idx, 0);
        let current_player = layer.acting_player;
        let row = &outputs[current_player * hc..(current_player + 1) * hc];
        Ok(row.iter().map(|v| v * pot).collect())
    }
}

/// Swaps the `P` axis (assumed size 2) of a `[S, P, H]` flattened buffer in
/// place, used to present ranges/CFVs to the P1-centric next-street oracle
/// when the lookahead's acting player is P2.
fn swap_player_axis(buf: &mut [f32], batch: usize, hc: usize) {
    for s in 0..batch {
        let base = s * 2 * hc;
        for h in 0..hc {
            buf.swap(base + h, base + hc + h);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::NodeKind;
    use crate::leduc::{EquityOracle, LeducEvaluator};
    use crate::params::ResolveParams;
    use crate::terminal_equity::TerminalEquity;

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

    fn fold_call_tree() -> PublicNode {
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

    fn chance_tree() -> PublicNode {
        let chance = PublicNode {
            street: 0,
            board: Vec::new(),
            current_player: 0,
            bets: [1, 1],
            node_kind: NodeKind::Chance,
            action_kinds: Vec::new(),
            children: Vec::new(),
        };
        PublicNode {
            street: 0,
            board: Vec::new(),
            current_player: 0,
            bets: [1, 1],
            node_kind: NodeKind::Decision,
            action_kinds: vec![ActionKind::Call],
            children: vec![chance],
        }
    }

    #[test]
    fn test_regrets_never_negative_after_iterations() {
        let settings = GameSettings::leduc();
        let params = ResolveParams {
            cfr_iters: 25,
            cfr_skip_iters: 5,
            ..ResolveParams::default()
        };
        let evaluator = LeducEvaluator::new(&settings);
        let mut te = TerminalEquity::new(&settings);
        te.set_board(&[0], &evaluator, None).unwrap();
        let tree = fold_call_tree();
        let mut lookahead = Lookahead::build_lookahead(&settings, &params, &te, None, &tree, 2).unwrap();
        let uniform = vec![1.0 / settings.hand_count as f32; settings.hand_count];
        lookahead.resolve_first_node(&uniform, &uniform).unwrap();
        for layer in &lookahead.layout.layers {
            assert!(layer.regrets.as_slice().iter().all(|&r| r >= 0.0));
        }
    }

    #[test]
    fn test_average_strategy_normalizes_to_one() {
        let settings = GameSettings::leduc();
        let params = ResolveParams {
            cfr_iters: 25,
            cfr_skip_iters: 5,
            ..ResolveParams::default()
        };
        let evaluator = LeducEvaluator::new(&settings);
        let mut te = TerminalEquity::new(&settings);
        te.set_board(&[0], &evaluator, None).unwrap();
        let tree = fold_call_tree();
        let mut lookahead = Lookahead::build_lookahead(&settings, &params, &te, None, &tree, 2).unwrap();
        let uniform = vec![1.0 / settings.hand_count as f32; settings.hand_count];
        lookahead.resolve_first_node(&uniform, &uniform).unwrap();
        let results = lookahead.get_results();
        let a_n = results.action_kinds.len();
        let hc = settings.hand_count;
        let batch = lookahead.layout.layers[0].shape.s;
        let p = settings.players_count;
        let slab_len = batch * p * hc;
        let n_n = lookahead.layout.layers[0].shape.n;
        let acting = lookahead.layout.layers[0].acting_player;
        for n in 0..n_n {
            for s in 0..batch {
                for h in 0..hc {
                    let sum: f32 = (0..a_n)
                        .map(|a| results.strategy[(a * n_n + n) * slab_len + (s * p + acting) * hc + h])
                        .sum();
                    assert!((sum - 1.0).abs() < 1e-4, "strategy should sum to 1, got {sum}");
                }
            }
        }
    }

    #[test]
    fn test_get_chance_action_cfv_matches_oracle_scaled_by_pot() {
        let settings = GameSettings::leduc();
        let params = ResolveParams {
            cfr_iters: 2,
            cfr_skip_iters: 0,
            ..ResolveParams::default()
        };
        let evaluator = LeducEvaluator::new(&settings);
        let mut te = TerminalEquity::new(&settings);
        te.set_board(&[], &evaluator, None).unwrap();
        let oracle = EquityOracle::new(&settings, &[]);
        let tree = chance_tree();
        let mut lookahead =
            Lookahead::build_lookahead(&settings, &params, &te, Some(&oracle), &tree, 1).unwrap();
        let uniform = vec![1.0 / settings.hand_count as f32; settings.hand_count];
        lookahead.resolve_first_node(&uniform, &uniform).unwrap();

        let got = lookahead.get_chance_action_cfv(0, &tree.board).unwrap();

        let hc = settings.hand_count;
        let p = settings.players_count;
        let mut expected_full = vec![0.0f32; p * hc];
        oracle.get_value_on_board(&tree.board, &mut expected_full);
        let pot = tree.children[0].pot_size() as f32;
        let expected: Vec<f32> = expected_full[..hc].iter().map(|v| v * pot).collect();

        for (g, e) in got.iter().zip(expected.iter()) {
            assert!((g - e).abs() < 1e-5, "got {g}, expected {e}");
        }
    }
}
