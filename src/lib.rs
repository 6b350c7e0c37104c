//! Depth-limited CFR+ re-solving engine for continual-resolving poker
//! agents (Leduc / Texas hold'em style).
//!
//! The dependency order mirrors the one the engine is built in: card
//! indexing and masking at the bottom ([`card_tools`]), terminal-equity
//! matrices built on top of that ([`terminal_equity`]), the tensor
//! layout and CFR+ loop above that ([`lookahead`]), and [`resolving`] as
//! the facade a continual-resolving driver actually calls. [`interface`]
//! names the external collaborators (tree builder, hand evaluator,
//! next-street oracle) this crate consumes but does not implement;
//! [`leduc`] is a small concrete implementation of those traits used by
//! the tests, the demos, and the CLI.

pub mod card;
pub mod card_tools;
pub mod error;
pub mod interface;
pub mod leduc;
pub mod lookahead;
pub mod params;
pub mod resolving;
pub(crate) mod sliceop;
pub mod tensor;
pub mod terminal_equity;

pub use card::{card_rank, card_suit, card_to_string, rank_to_char, suit_to_char, Card, NOT_DEALT};
pub use error::{ResolveError, ResolveResult};
pub use interface::{
    ActionKind, HandStrengthEvaluator, NextStreetOracle, NodeKind, PublicNode, PublicTreeBuilder, TreeParams,
};
pub use lookahead::gadget::CFRDGadget;
pub use lookahead::{Lookahead, LookaheadResults};
pub use params::{GameSettings, ResolveParams};
pub use resolving::Resolving;
pub use terminal_equity::TerminalEquity;
