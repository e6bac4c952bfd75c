pub mod error;
pub mod services;

pub use error::VideoCallError;
pub use services::*;
