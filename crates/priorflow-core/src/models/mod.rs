//! Domain types for the prior-authorization intake engine.

mod answer;
mod drug;
mod question;
mod session;

pub use answer::*;
pub use drug::*;
pub use question::*;
pub use session::*;
