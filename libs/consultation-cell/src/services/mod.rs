pub mod consultation;
pub mod poller;
pub mod video;

pub use consultation::*;
pub use poller::*;
pub use video::*;
