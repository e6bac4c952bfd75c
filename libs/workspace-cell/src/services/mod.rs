pub mod checkout;
pub mod workspace;

pub use checkout::*;
pub use workspace::*;
