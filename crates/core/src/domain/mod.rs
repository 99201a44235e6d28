mod authorization;
mod decision;
mod message;
mod session;

pub use authorization::*;
pub use decision::*;
pub use message::*;
pub use session::*;
