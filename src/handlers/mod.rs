pub mod restaurant;
pub mod session;

pub use restaurant::restaurant_config;
pub use session::session_config;
