//! Per-turn diagnostics on stderr, and the end-of-game line on stdout.

use std::io::IsTerminal;

use owo_colors::OwoColorize;

use austerity_shared::cards::Colour;
use austerity_shared::game::GameState;
use austerity_shared::seat_letter;

/// The whole visible table: board cards, pile counts, and every seat's
/// books.
pub fn show_table(state: &GameState, own_seat: usize) {
    let paint = std::io::stderr().is_terminal();

    eprintln!("Board:");
    for (index, card) in state.board.iter().enumerate() {
        eprintln!(
            "  {index}: {} worth {} costs {}",
            letter(card.discount, paint),
            card.value,
            card.cost
        );
    }

    let piles: Vec<String> = Colour::ALL
        .iter()
        .map(|&c| format!("{}={}", letter(c, paint), state.piles[c]))
        .collect();
    eprintln!("Piles: {}", piles.join(" "));

    for (seat, player) in state.players.iter().enumerate() {
        let marker = if seat == own_seat { " (you)" } else { "" };
        eprintln!(
            "{}{}: {} points, d={}, t={}",
            seat_letter(seat),
            marker,
            player.score,
            player.discounts,
            player.wallet
        );
    }
}

/// `Winner(s) A,B` — every seat sharing the top score.
pub fn show_winners(state: &GameState) {
    let letters: Vec<String> = state
        .leaders()
        .into_iter()
        .map(|seat| seat_letter(seat).to_string())
        .collect();
    println!("Winner(s) {}", letters.join(","));
}

fn letter(colour: Colour, paint: bool) -> String {
    let plain = colour.letter().to_string();
    if !paint {
        return plain;
    }
    match colour {
        Colour::Purple => plain.magenta().to_string(),
        Colour::Brown => plain.yellow().to_string(),
        Colour::Yellow => plain.bright_yellow().to_string(),
        Colour::Red => plain.red().to_string(),
    }
}
