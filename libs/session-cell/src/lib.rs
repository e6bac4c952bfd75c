pub mod cipher;
pub mod cookies;
pub mod error;
pub mod services;

pub use cipher::CookieCipher;
pub use cookies::*;
pub use error::CookieError;
pub use services::*;
