pub mod common;
pub mod narration;
pub mod video;

pub use common::*;
pub use narration::*;
pub use video::*;
