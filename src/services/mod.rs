pub mod game_state;
pub mod restaurant_service;
pub mod reward;
pub mod session_service;

pub use game_state::GameEvent;
pub use restaurant_service::*;
pub use reward::{DrawFn, default_draw, select_slot};
pub use session_service::*;
