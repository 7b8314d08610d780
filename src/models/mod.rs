pub mod common;
pub mod restaurant;
pub mod session;

pub use crate::entities::{GameStatus, SessionStatus};
pub use common::*;
pub use restaurant::*;
pub use session::*;
