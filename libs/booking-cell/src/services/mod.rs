pub mod draft;
pub mod schedule;
pub mod wizard;

pub use draft::*;
pub use schedule::*;
pub use wizard::*;
