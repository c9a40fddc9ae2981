pub mod dump_manifest;
pub mod foreach;
pub mod status;

pub use dump_manifest::*;
pub use foreach::*;
pub use status::*;
