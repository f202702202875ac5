mod money;

pub mod helpers;
pub mod op;
mod secret;

pub use money::Money;
pub use secret::Secret;
