use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use super::draw::DrawList;
use super::raster::{clear_frame, paint_command};
use super::BACKGROUND_COLOR;

/// Software rasterizer presenting a [`DrawList`] through `pixels`. The frame
/// buffer always matches the window's physical size, one pixel per canvas unit.
pub struct Renderer {
    window: &'static Window,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
}

impl Renderer {
    pub fn new(window: &'static Window) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(window, size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            width: size.width,
            height: size.height,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(self.window, width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn build_pixels(
        window: &'static Window,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn draw(&mut self, draw: &DrawList) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }

        let frame = self.pixels.frame_mut();
        clear_frame(frame, BACKGROUND_COLOR);
        for command in draw.commands() {
            paint_command(frame, self.width, self.height, command);
        }

        self.pixels.render()
    }
}
