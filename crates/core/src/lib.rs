//! Domain types shared by the council session stream client.

pub mod domain;
pub mod error;

pub use domain::*;
pub use error::{CoreError, Result};
