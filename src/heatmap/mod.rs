pub mod axis;
pub mod color_scale;
pub mod error;
pub mod renderer;
