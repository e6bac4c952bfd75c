pub mod account;
pub mod auth;
pub mod checkout;
pub mod consultation;
pub mod error;
pub mod toast;
pub mod workspace;

pub use error::PortalError;
