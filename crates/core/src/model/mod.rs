mod card;
mod collection;
mod deck;
mod ids;

pub use ids::{CardId, DeckId};

pub use card::{Card, CardError};
pub use collection::{Collection, MergeReport};
pub use deck::{Deck, DeckError};
