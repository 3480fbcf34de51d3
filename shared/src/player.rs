//! Per-seat player state.

use crate::cards::{ColourCounts, TokenCounts};

/// One seat's accumulated state: display name, score from purchased
/// cards, per-colour discounts, and the token wallet (wilds included).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerState {
    pub name: String,
    pub score: u32,
    pub discounts: ColourCounts,
    pub wallet: TokenCounts,
}

impl PlayerState {
    pub fn new(name: impl Into<String>) -> Self {
        PlayerState {
            name: name.into(),
            score: 0,
            discounts: ColourCounts::default(),
            wallet: TokenCounts::default(),
        }
    }
}
