//! Interactive move selection over stdin.
//!
//! Every prompt re-asks until it reads a well-formed number in range;
//! only stdin closing gives up. Range checks are against the visible
//! state (the wallet for purchases, the piles for takes) — whether the
//! move is actually legal is the server's call.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader, Stdin};

use austerity_shared::cards::{Colour, ColourCounts, TokenCounts};
use austerity_shared::game::GameState;
use austerity_shared::messages::ActionMsg;

pub struct Prompter {
    input: BufReader<Stdin>,
}

impl Prompter {
    pub fn new() -> Self {
        Prompter {
            input: BufReader::new(tokio::io::stdin()),
        }
    }

    /// Ask until the user names an action, then fill in its details.
    /// `None` means stdin is gone.
    pub async fn choose_action(&mut self, state: &GameState, seat: usize) -> Option<ActionMsg> {
        loop {
            match self.ask("Action> ").await?.as_str() {
                "purchase" => return self.plan_purchase(state, seat).await,
                "take" => return self.plan_take(state).await,
                "wild" => return Some(ActionMsg::Wild),
                _ => {}
            }
        }
    }

    /// Card index, then a spend per colour the player holds any of.
    async fn plan_purchase(&mut self, state: &GameState, seat: usize) -> Option<ActionMsg> {
        let card = self.ask_count("Card> ", 7).await? as usize;
        let wallet = state.players.get(seat)?.wallet;

        let mut payment = TokenCounts::default();
        for colour in Colour::ALL {
            if wallet.colours[colour] > 0 {
                let label = format!("Token-{}> ", colour.letter());
                payment.colours[colour] = self.ask_count(&label, wallet.colours[colour]).await?;
            }
        }
        if wallet.wild > 0 {
            payment.wild = self.ask_count("Token-W> ", wallet.wild).await?;
        }
        Some(ActionMsg::Purchase { card, payment })
    }

    /// One count per colour, bounded by what the pile shows.
    async fn plan_take(&mut self, state: &GameState) -> Option<ActionMsg> {
        let mut take = ColourCounts::default();
        for colour in Colour::ALL {
            let label = format!("Token-{}> ", colour.letter());
            take[colour] = self.ask_count(&label, state.piles[colour]).await?;
        }
        Some(ActionMsg::Take(take))
    }

    async fn ask(&mut self, label: &str) -> Option<String> {
        print!("{label}");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match self.input.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                }
                Some(line)
            }
        }
    }

    /// Re-ask until the answer is a decimal in `0..=max`.
    async fn ask_count(&mut self, label: &str, max: u32) -> Option<u32> {
        loop {
            let answer = self.ask(label).await?;
            if answer.is_empty() || !answer.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            if let Ok(count) = answer.parse() {
                if count <= max {
                    return Some(count);
                }
            }
        }
    }
}

impl Default for Prompter {
    fn default() -> Self {
        Self::new()
    }
}
