mod draw;
mod raster;
mod renderer;

pub use draw::{Color, DrawCommand, DrawList};
pub use renderer::Renderer;

pub const BACKGROUND_COLOR: Color = Color::rgb(128, 128, 128);
