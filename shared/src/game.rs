//! The table state machine: board, piles and wallets, move legality, and
//! the mutations every legal move performs.
//!
//! The server drives this directly; clients replay the broadcast stream
//! through the same transitions, so both sides keep identical books.

use thiserror::Error;

use crate::cards::{Card, Colour, ColourCounts, TokenCounts};
use crate::player::PlayerState;
use crate::{BOARD_LIMIT, TAKE_COLOURS};

/// Why a move (or a replayed announcement) was rejected.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("seat {0} is out of range")]
    UnknownSeat(usize),
    #[error("no card at board index {0}")]
    UnknownCard(usize),
    #[error("cannot afford that card")]
    Unaffordable,
    #[error("payment must use the fewest possible wilds")]
    WrongPayment,
    #[error("a take is exactly three distinct colours")]
    MalformedTake,
    #[error("cannot take from an empty pile")]
    EmptyPile,
    #[error("not enough tokens to cover that move")]
    ShortTokens,
    #[error("the board is full")]
    BoardFull,
}

/// Everything about one table that both ends of the wire can see: the
/// seated players, the face-up board, and the server-held token piles.
#[derive(Clone, Debug)]
pub struct GameState {
    pub players: Vec<PlayerState>,
    pub board: Vec<Card>,
    pub piles: ColourCounts,
}

/// True when the player can pay for the card: per-colour shortfalls after
/// discounts and wallet are summed, and the sum must fit in their wilds.
pub fn can_afford(player: &PlayerState, card: &Card) -> bool {
    let mut wilds_needed = 0;
    for colour in Colour::ALL {
        let net = card.cost[colour].saturating_sub(player.discounts[colour]);
        wilds_needed += net.saturating_sub(player.wallet.colours[colour]);
    }
    wilds_needed <= player.wallet.wild
}

/// The unique payment using the fewest wilds: every colour pays from its
/// own pile first and wilds cover exactly the remaining shortfall.
/// Meaningful only when [`can_afford`] holds.
pub fn required_payment(player: &PlayerState, card: &Card) -> TokenCounts {
    let mut payment = TokenCounts::default();
    for colour in Colour::ALL {
        let net = card.cost[colour].saturating_sub(player.discounts[colour]);
        payment.colours[colour] = net.min(player.wallet.colours[colour]);
        payment.wild += net.saturating_sub(player.wallet.colours[colour]);
    }
    payment
}

impl GameState {
    pub fn new(players: Vec<PlayerState>, initial_tokens: u32) -> Self {
        GameState {
            players,
            board: Vec::new(),
            piles: ColourCounts::uniform(initial_tokens),
        }
    }

    pub fn player(&self, seat: usize) -> Result<&PlayerState, ActionError> {
        self.players.get(seat).ok_or(ActionError::UnknownSeat(seat))
    }

    /// Tokens may only be taken while at least three piles are non-empty.
    pub fn can_take_tokens(&self) -> bool {
        let stocked = Colour::ALL.iter().filter(|&&c| self.piles[c] > 0).count();
        stocked as u32 >= TAKE_COLOURS
    }

    /// A legal take names exactly three distinct colours, one token each,
    /// and every named pile must have a token to give.
    pub fn validate_take(&self, take: &ColourCounts) -> Result<(), ActionError> {
        let mut chosen = 0;
        for (colour, count) in take.iter() {
            match count {
                0 => {}
                1 if self.piles[colour] > 0 => chosen += 1,
                1 => return Err(ActionError::EmptyPile),
                _ => return Err(ActionError::MalformedTake),
            }
        }
        if chosen != TAKE_COLOURS {
            return Err(ActionError::MalformedTake);
        }
        Ok(())
    }

    /// A legal purchase names a face-up card the player can afford, paid
    /// with exactly the minimal-wild payment.
    pub fn validate_purchase(
        &self,
        seat: usize,
        card: usize,
        payment: &TokenCounts,
    ) -> Result<(), ActionError> {
        let player = self.player(seat)?;
        let target = self
            .board
            .get(card)
            .ok_or(ActionError::UnknownCard(card))?;
        if !can_afford(player, target) {
            return Err(ActionError::Unaffordable);
        }
        if *payment != required_payment(player, target) {
            return Err(ActionError::WrongPayment);
        }
        Ok(())
    }

    /// Move the taken tokens from the piles into the wallet.
    pub fn apply_take(&mut self, seat: usize, take: ColourCounts) -> Result<(), ActionError> {
        self.player(seat)?;
        for (colour, count) in take.iter() {
            if self.piles[colour] < count {
                return Err(ActionError::ShortTokens);
            }
        }
        for colour in Colour::ALL {
            self.piles[colour] -= take[colour];
            self.players[seat].wallet.colours[colour] += take[colour];
        }
        Ok(())
    }

    /// Wilds come from an unbounded supply, never from a pile.
    pub fn apply_wild(&mut self, seat: usize) -> Result<(), ActionError> {
        self.player(seat)?;
        self.players[seat].wallet.wild += 1;
        Ok(())
    }

    /// Remove the card (later cards shift down), move the payment from
    /// the wallet back onto the piles (wilds vanish), and credit the
    /// card's value and discount. Returns the purchased card.
    pub fn apply_purchase(
        &mut self,
        seat: usize,
        card: usize,
        payment: &TokenCounts,
    ) -> Result<Card, ActionError> {
        let player = self.player(seat)?;
        if card >= self.board.len() {
            return Err(ActionError::UnknownCard(card));
        }
        if player.wallet.wild < payment.wild {
            return Err(ActionError::ShortTokens);
        }
        for colour in Colour::ALL {
            if player.wallet.colours[colour] < payment.colours[colour] {
                return Err(ActionError::ShortTokens);
            }
        }

        let bought = self.board.remove(card);
        let player = &mut self.players[seat];
        for colour in Colour::ALL {
            player.wallet.colours[colour] -= payment.colours[colour];
            self.piles[colour] += payment.colours[colour];
        }
        player.wallet.wild -= payment.wild;
        player.score += bought.value;
        player.discounts[bought.discount] += 1;
        Ok(bought)
    }

    /// Face a card up at the tail of the board.
    pub fn add_card(&mut self, card: Card) -> Result<(), ActionError> {
        if self.board.len() >= BOARD_LIMIT {
            return Err(ActionError::BoardFull);
        }
        self.board.push(card);
        Ok(())
    }

    /// Seats sharing the highest score.
    pub fn leaders(&self) -> Vec<usize> {
        let top = self.players.iter().map(|p| p.score).max().unwrap_or(0);
        self.players
            .iter()
            .enumerate()
            .filter_map(|(seat, p)| (p.score == top).then_some(seat))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(discount: Colour, value: u32, cost: [u32; 4]) -> Card {
        Card {
            discount,
            value,
            cost: ColourCounts(cost),
        }
    }

    fn two_seat_table(initial_tokens: u32) -> GameState {
        GameState::new(
            vec![PlayerState::new("ada"), PlayerState::new("ben")],
            initial_tokens,
        )
    }

    #[test]
    fn take_needs_three_stocked_piles() {
        let mut state = two_seat_table(1);
        assert!(state.can_take_tokens());
        state.piles = ColourCounts([1, 1, 0, 0]);
        assert!(!state.can_take_tokens());
    }

    #[test]
    fn take_accepts_exactly_triples_of_stocked_colours() {
        let mut state = two_seat_table(2);
        state.piles = ColourCounts([2, 2, 0, 2]);

        assert_eq!(state.validate_take(&ColourCounts([1, 1, 0, 1])), Ok(()));
        // only two colours
        assert_eq!(
            state.validate_take(&ColourCounts([1, 1, 0, 0])),
            Err(ActionError::MalformedTake)
        );
        // two tokens of one colour
        assert_eq!(
            state.validate_take(&ColourCounts([2, 1, 0, 0])),
            Err(ActionError::MalformedTake)
        );
        // the yellow pile is empty
        assert_eq!(
            state.validate_take(&ColourCounts([1, 1, 1, 0])),
            Err(ActionError::EmptyPile)
        );
    }

    #[test]
    fn take_conserves_real_tokens() {
        let mut state = two_seat_table(3);
        state.apply_take(0, ColourCounts([1, 1, 0, 1])).unwrap();

        for colour in Colour::ALL {
            let held: u32 = state.players.iter().map(|p| p.wallet.colours[colour]).sum();
            assert_eq!(state.piles[colour] + held, 3);
        }
        assert_eq!(state.players[0].wallet.total(), 3);
    }

    #[test]
    fn wilds_come_from_nowhere() {
        let mut state = two_seat_table(3);
        state.apply_wild(1).unwrap();
        assert_eq!(state.players[1].wallet.wild, 1);
        assert_eq!(state.piles.total(), 12);
    }

    #[test]
    fn affordability_counts_discounts_then_wallet_then_wilds() {
        let mut player = PlayerState::new("ada");
        let target = card(Colour::Red, 1, [2, 0, 0, 1]);

        assert!(!can_afford(&player, &target));
        player.discounts[Colour::Purple] = 1;
        player.wallet.colours[Colour::Purple] = 1;
        assert!(!can_afford(&player, &target));
        player.wallet.wild = 1;
        assert!(can_afford(&player, &target));
    }

    #[test]
    fn required_payment_is_minimal_in_wilds() {
        let mut player = PlayerState::new("ada");
        player.wallet = TokenCounts {
            colours: ColourCounts([1, 0, 3, 0]),
            wild: 5,
        };
        player.discounts[Colour::Yellow] = 1;
        let target = card(Colour::Purple, 2, [2, 1, 2, 0]);

        let payment = required_payment(&player, &target);
        assert_eq!(payment.colours, ColourCounts([1, 0, 1, 0]));
        assert_eq!(payment.wild, 2);

        // Any other covering payment spends at least as many wilds: the
        // colour fields are capped by the wallet, so wilds can only grow.
        for purple in 0..=player.wallet.colours[Colour::Purple] {
            let shortfall = (2 - purple) + 1;
            assert!(shortfall >= payment.wild);
        }
    }

    #[test]
    fn purchase_refunds_piles_and_credits_the_card() {
        let mut state = two_seat_table(0);
        state.add_card(card(Colour::Brown, 3, [1, 0, 0, 0])).unwrap();
        state.add_card(card(Colour::Red, 1, [0, 0, 0, 0])).unwrap();
        state.players[0].wallet.colours[Colour::Purple] = 1;

        let payment = TokenCounts {
            colours: ColourCounts([1, 0, 0, 0]),
            wild: 0,
        };
        assert_eq!(state.validate_purchase(0, 0, &payment), Ok(()));
        let bought = state.apply_purchase(0, 0, &payment).unwrap();

        assert_eq!(bought.value, 3);
        assert_eq!(state.board.len(), 1);
        assert_eq!(state.board[0].discount, Colour::Red);
        assert_eq!(state.piles[Colour::Purple], 1);
        assert_eq!(state.players[0].score, 3);
        assert_eq!(state.players[0].discounts[Colour::Brown], 1);
        assert_eq!(state.players[0].wallet.total(), 0);
    }

    #[test]
    fn purchase_rejects_wasteful_wilds() {
        let mut state = two_seat_table(0);
        state.add_card(card(Colour::Brown, 1, [1, 0, 0, 0])).unwrap();
        state.players[0].wallet.colours[Colour::Purple] = 1;
        state.players[0].wallet.wild = 1;

        let wasteful = TokenCounts {
            colours: ColourCounts::default(),
            wild: 1,
        };
        assert_eq!(
            state.validate_purchase(0, 0, &wasteful),
            Err(ActionError::WrongPayment)
        );
    }

    #[test]
    fn purchase_rejects_missing_cards_and_short_wallets() {
        let mut state = two_seat_table(0);
        state.add_card(card(Colour::Brown, 1, [1, 0, 0, 0])).unwrap();

        let payment = TokenCounts::default();
        assert_eq!(
            state.validate_purchase(0, 3, &payment),
            Err(ActionError::UnknownCard(3))
        );
        assert_eq!(
            state.validate_purchase(0, 0, &payment),
            Err(ActionError::Unaffordable)
        );
    }

    #[test]
    fn board_stops_at_eight_cards() {
        let mut state = two_seat_table(0);
        for _ in 0..8 {
            state.add_card(card(Colour::Red, 0, [0, 0, 0, 0])).unwrap();
        }
        assert_eq!(
            state.add_card(card(Colour::Red, 0, [0, 0, 0, 0])),
            Err(ActionError::BoardFull)
        );
    }

    #[test]
    fn leaders_share_the_top_score() {
        let mut state = two_seat_table(0);
        assert_eq!(state.leaders(), vec![0, 1]);
        state.players[1].score = 4;
        assert_eq!(state.leaders(), vec![1]);
    }
}
