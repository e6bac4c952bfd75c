pub mod auth;
pub mod store;

pub use auth::*;
pub use store::*;
