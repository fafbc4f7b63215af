//! Session credential models exchanged with the authentication endpoints.

pub mod pair;
pub mod secret;

pub use pair::*;
pub use secret::*;
