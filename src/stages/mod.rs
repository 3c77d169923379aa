pub mod pipeline;
pub mod stage1_align;
pub mod stage2_render;

pub use pipeline::*;
pub use stage1_align::*;
pub use stage2_render::*;
