pub mod portal;

pub use portal::{is_public, Portal};
