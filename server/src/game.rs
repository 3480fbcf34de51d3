//! Server-side view of one game: the shared table state plus the things
//! only the server knows — the remaining deck, the win threshold, and
//! whether the game has been finalised.

use std::collections::VecDeque;

use austerity_shared::cards::Card;
use austerity_shared::game::GameState;
use austerity_shared::player::PlayerState;
use austerity_shared::BOARD_LIMIT;

#[derive(Clone, Debug)]
pub struct Game {
    pub state: GameState,
    pub deck: VecDeque<Card>,
    pub win_score: u32,
    /// Set exactly once, by the owning game task, when the game ends.
    pub finished: bool,
}

impl Game {
    /// `players` must already be in seating order; each game gets its own
    /// copy of the configured deck, in deck order.
    pub fn new(
        players: Vec<PlayerState>,
        deck: Vec<Card>,
        initial_tokens: u32,
        win_score: u32,
    ) -> Self {
        Game {
            state: GameState::new(players, initial_tokens),
            deck: VecDeque::from(deck),
            win_score,
            finished: false,
        }
    }

    /// Turn the top deck card face up, if the board has room and the deck
    /// has cards. Returns the revealed card for broadcasting.
    pub fn reveal(&mut self) -> Option<Card> {
        if self.state.board.len() >= BOARD_LIMIT {
            return None;
        }
        let card = self.deck.pop_front()?;
        self.state.add_card(card).ok()?;
        Some(card)
    }

    /// The game ends once any seat reaches the win threshold (the round
    /// in progress still completes).
    pub fn is_over(&self) -> bool {
        self.state.players.iter().any(|p| p.score >= self.win_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use austerity_shared::cards::{Colour, ColourCounts};

    fn plain_card(value: u32) -> Card {
        Card {
            discount: Colour::Purple,
            value,
            cost: ColourCounts::default(),
        }
    }

    fn new_game(deck_size: usize) -> Game {
        let players = vec![PlayerState::new("ada"), PlayerState::new("ben")];
        let deck = (0..deck_size as u32).map(plain_card).collect();
        Game::new(players, deck, 3, 5)
    }

    #[test]
    fn reveal_fills_the_board_in_deck_order() {
        let mut game = new_game(10);
        for expect in 0..8 {
            let card = game.reveal().unwrap();
            assert_eq!(card.value, expect);
        }
        // board full
        assert_eq!(game.reveal(), None);
        assert_eq!(game.deck.len(), 2);
    }

    #[test]
    fn reveal_stops_at_an_empty_deck() {
        let mut game = new_game(3);
        for _ in 0..3 {
            assert!(game.reveal().is_some());
        }
        assert_eq!(game.reveal(), None);
        assert_eq!(game.state.board.len(), 3);
    }

    #[test]
    fn the_win_threshold_ends_the_game() {
        let mut game = new_game(1);
        assert!(!game.is_over());
        game.state.players[1].score = 5;
        assert!(game.is_over());
    }
}
