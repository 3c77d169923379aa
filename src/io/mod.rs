pub mod format;
pub mod input;
pub mod output;

pub use format::*;
pub use input::*;
pub use output::*;
