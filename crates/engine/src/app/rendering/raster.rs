use crate::app::Vec2;

use super::draw::{Color, DrawCommand};

pub(crate) fn clear_frame(frame: &mut [u8], color: Color) {
    let rgba = color.to_rgba();
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&rgba);
    }
}

pub(crate) fn paint_command(frame: &mut [u8], width: u32, height: u32, command: &DrawCommand) {
    match command {
        DrawCommand::Circle {
            center,
            radius,
            color,
        } => fill_circle(frame, width, height, *center, *radius, color.to_rgba()),
        DrawCommand::Line { from, to, color } => {
            draw_line(frame, width, height, *from, *to, color.to_rgba())
        }
        DrawCommand::Image {
            position,
            size,
            rotation_radians,
            tint,
            ..
        } => fill_rotated_rect(
            frame,
            width,
            height,
            *position,
            *size,
            *rotation_radians,
            tint.to_rgba(),
        ),
    }
}

fn fill_circle(frame: &mut [u8], width: u32, height: u32, center: Vec2, radius: f32, color: [u8; 4]) {
    if radius <= 0.0 {
        return;
    }
    let left = (center.x - radius).floor().max(0.0) as i32;
    let right = (center.x + radius).ceil().min(width as f32) as i32;
    let top = (center.y - radius).floor().max(0.0) as i32;
    let bottom = (center.y + radius).ceil().min(height as f32) as i32;
    let radius_sq = radius * radius;

    for y in top..bottom {
        for x in left..right {
            let dx = x as f32 + 0.5 - center.x;
            let dy = y as f32 + 0.5 - center.y;
            if dx * dx + dy * dy <= radius_sq {
                write_pixel_rgba_clipped(frame, width as usize, height, x, y, color);
            }
        }
    }
}

fn draw_line(frame: &mut [u8], width: u32, height: u32, from: Vec2, to: Vec2, color: [u8; 4]) {
    let (mut x, mut y) = (from.x.round() as i32, from.y.round() as i32);
    let (end_x, end_y) = (to.x.round() as i32, to.y.round() as i32);
    let dx = (end_x - x).abs();
    let dy = -(end_y - y).abs();
    let step_x = if x < end_x { 1 } else { -1 };
    let step_y = if y < end_y { 1 } else { -1 };
    let mut error = dx + dy;

    loop {
        write_pixel_rgba_clipped(frame, width as usize, height, x, y, color);
        if x == end_x && y == end_y {
            break;
        }
        let doubled = 2 * error;
        if doubled >= dy {
            error += dy;
            x += step_x;
        }
        if doubled <= dx {
            error += dx;
            y += step_y;
        }
    }
}

fn fill_rotated_rect(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center: Vec2,
    size: Vec2,
    rotation_radians: f32,
    color: [u8; 4],
) {
    let half_w = size.x * 0.5;
    let half_h = size.y * 0.5;
    let reach = (half_w * half_w + half_h * half_h).sqrt();
    let (sin, cos) = rotation_radians.sin_cos();

    let left = (center.x - reach).floor().max(0.0) as i32;
    let right = (center.x + reach).ceil().min(width as f32) as i32;
    let top = (center.y - reach).floor().max(0.0) as i32;
    let bottom = (center.y + reach).ceil().min(height as f32) as i32;

    for y in top..bottom {
        for x in left..right {
            let dx = x as f32 + 0.5 - center.x;
            let dy = y as f32 + 0.5 - center.y;
            // Rotate the sample back into the rect's local frame.
            let local_x = dx * cos + dy * sin;
            let local_y = -dx * sin + dy * cos;
            if local_x.abs() <= half_w && local_y.abs() <= half_h {
                write_pixel_rgba_clipped(frame, width as usize, height, x, y, color);
            }
        }
    }
}

fn write_pixel_rgba_clipped(
    frame: &mut [u8],
    width: usize,
    height: u32,
    x: i32,
    y: i32,
    color: [u8; 4],
) {
    if x < 0 || y < 0 || x as usize >= width || y as u32 >= height {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);
    const GRAY: Color = Color::rgb(128, 128, 128);

    fn frame(width: u32, height: u32) -> Vec<u8> {
        let mut frame = vec![0; (width * height * 4) as usize];
        clear_frame(&mut frame, GRAY);
        frame
    }

    fn pixel(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * width + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn clear_fills_every_pixel() {
        let frame = frame(4, 3);
        assert!(frame.chunks_exact(4).all(|chunk| chunk == [128, 128, 128, 255]));
    }

    #[test]
    fn circle_covers_center_but_not_corners() {
        let mut frame = frame(20, 20);
        paint_command(
            &mut frame,
            20,
            20,
            &DrawCommand::Circle {
                center: Vec2::new(10.0, 10.0),
                radius: 5.0,
                color: RED,
            },
        );
        assert_eq!(pixel(&frame, 20, 10, 10), [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 20, 0, 0), [128, 128, 128, 255]);
        assert_eq!(pixel(&frame, 20, 14, 14), [128, 128, 128, 255]);
    }

    #[test]
    fn line_hits_both_endpoints() {
        let mut frame = frame(10, 10);
        paint_command(
            &mut frame,
            10,
            10,
            &DrawCommand::Line {
                from: Vec2::new(1.0, 1.0),
                to: Vec2::new(8.0, 5.0),
                color: RED,
            },
        );
        assert_eq!(pixel(&frame, 10, 1, 1), [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 10, 8, 5), [255, 0, 0, 255]);
    }

    #[test]
    fn off_canvas_shapes_are_clipped_without_panicking() {
        let mut frame = frame(8, 8);
        paint_command(
            &mut frame,
            8,
            8,
            &DrawCommand::Line {
                from: Vec2::new(-20.0, -20.0),
                to: Vec2::new(30.0, 4.0),
                color: RED,
            },
        );
        paint_command(
            &mut frame,
            8,
            8,
            &DrawCommand::Circle {
                center: Vec2::new(100.0, 100.0),
                radius: 3.0,
                color: RED,
            },
        );
        assert_eq!(frame.len(), 8 * 8 * 4);
    }

    #[test]
    fn quarter_turn_swaps_rect_axes() {
        let mut frame = frame(40, 40);
        paint_command(
            &mut frame,
            40,
            40,
            &DrawCommand::Image {
                key: "crate",
                position: Vec2::new(20.0, 20.0),
                size: Vec2::new(20.0, 4.0),
                rotation_radians: std::f32::consts::FRAC_PI_2,
                tint: RED,
            },
        );
        assert_eq!(pixel(&frame, 40, 20, 28), [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 40, 28, 20), [128, 128, 128, 255]);
    }
}
