pub mod dining_sessions;
pub mod restaurants;

pub use dining_sessions as dining_session_entity;
pub use dining_sessions::{GameStatus, SessionStatus};
pub use restaurants as restaurant_entity;
