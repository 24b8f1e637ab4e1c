mod amount;
mod currency;

pub mod helpers;
pub mod op;
mod secret;

pub use amount::{Amount, AmountParseError};
pub use currency::{Currency, CurrencyParseError};
pub use secret::Secret;
