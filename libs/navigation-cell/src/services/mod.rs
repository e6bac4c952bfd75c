pub mod guard;
pub mod navigator;

pub use guard::*;
pub use navigator::*;
