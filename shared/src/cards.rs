//! Token colours, per-colour count vectors, and cards.

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::parse_count;

/// The four real token colours, in wire order. The wild pseudo-colour is
/// not part of this enum: wilds never sit on a pile, never discount, and
/// appear on the wire only as the trailing fifth count of a wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Colour {
    Purple,
    Brown,
    Yellow,
    Red,
}

impl Colour {
    /// All colours in wire order.
    pub const ALL: [Colour; 4] = [Colour::Purple, Colour::Brown, Colour::Yellow, Colour::Red];

    /// One-letter wire name for the colour.
    pub fn letter(self) -> char {
        match self {
            Colour::Purple => 'P',
            Colour::Brown => 'B',
            Colour::Yellow => 'Y',
            Colour::Red => 'R',
        }
    }

    /// Inverse of [`Colour::letter`].
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'P' => Some(Colour::Purple),
            'B' => Some(Colour::Brown),
            'Y' => Some(Colour::Yellow),
            'R' => Some(Colour::Red),
            _ => None,
        }
    }
}

/// A count per real colour: a token pile, a price, a discount tally, or a
/// take request, depending on context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColourCounts(pub [u32; 4]);

impl ColourCounts {
    /// The same count in every colour.
    pub fn uniform(count: u32) -> Self {
        ColourCounts([count; 4])
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// (colour, count) pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (Colour, u32)> + '_ {
        Colour::ALL.iter().map(move |&c| (c, self[c]))
    }

    /// Parse `P,B,Y,R` with canonical numbers.
    pub(crate) fn parse(text: &str) -> Option<Self> {
        let mut counts = ColourCounts::default();
        let mut fields = text.split(',');
        for colour in Colour::ALL {
            counts[colour] = parse_count(fields.next()?)?;
        }
        if fields.next().is_some() {
            return None;
        }
        Some(counts)
    }
}

impl Index<Colour> for ColourCounts {
    type Output = u32;

    fn index(&self, colour: Colour) -> &u32 {
        &self.0[colour as usize]
    }
}

impl IndexMut<Colour> for ColourCounts {
    fn index_mut(&mut self, colour: Colour) -> &mut u32 {
        &mut self.0[colour as usize]
    }
}

impl fmt::Display for ColourCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

/// A count per colour including wilds: a player's wallet, or the payment
/// accompanying a purchase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenCounts {
    pub colours: ColourCounts,
    pub wild: u32,
}

impl TokenCounts {
    pub fn total(&self) -> u32 {
        self.colours.total() + self.wild
    }

    /// Parse `P,B,Y,R,W` with canonical numbers.
    pub(crate) fn parse(text: &str) -> Option<Self> {
        let (colours, wild) = text.rsplit_once(',')?;
        Some(TokenCounts {
            colours: ColourCounts::parse(colours)?,
            wild: parse_count(wild)?,
        })
    }
}

impl fmt::Display for TokenCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.colours, self.wild)
    }
}

/// A card: the colour it discounts once purchased, its point value, and
/// its price per real colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Card {
    pub discount: Colour,
    pub value: u32,
    pub cost: ColourCounts,
}

impl Card {
    /// Parse the `D:V:P,B,Y,R` form used both in deckfiles and in
    /// `newcard` messages.
    pub fn parse(text: &str) -> Option<Self> {
        let (head, cost) = text.split_once(':').and_then(|(discount, rest)| {
            let (value, cost) = rest.split_once(':')?;
            Some(((discount, value), cost))
        })?;
        let (discount, value) = head;
        let mut letters = discount.chars();
        let letter = letters.next()?;
        if letters.next().is_some() {
            return None;
        }
        Some(Card {
            discount: Colour::from_letter(letter)?,
            value: parse_count(value)?,
            cost: ColourCounts::parse(cost)?,
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.discount.letter(), self.value, self.cost)
    }
}
