//! Frame annotation.
//!
//! Draws a highlight rectangle around every reported region and, once per
//! frame, a status banner across the top-left half of the frame. Frames with no
//! reported regions are left untouched.

mod font;

use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::detect::Region;
use crate::frame::{rgb, Color, Frame};

use font::{glyph, is_set, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Text written on the banner.
pub const MOTION_LABEL: &str = "Motion Detected";

/// Colors and geometry used by the annotator.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationStyle {
    pub highlight_color: Color,
    pub outline_thickness: u32,
    pub banner_fill_color: Color,
    pub banner_text_color: Color,
    /// Banner height as a share of frame height.
    pub banner_height_fraction: f64,
    /// Left margin of the label in pixels.
    pub banner_text_offset: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            highlight_color: [255, 255, 0],
            outline_thickness: 2,
            banner_fill_color: [255, 255, 255],
            banner_text_color: [255, 0, 0],
            banner_height_fraction: 0.08,
            banner_text_offset: 20,
        }
    }
}

/// Draw `regions` onto `frame` in place.
pub fn annotate(frame: &mut Frame, regions: &[Region], style: &AnnotationStyle) {
    if regions.is_empty() {
        return;
    }
    for region in regions {
        let bbox = region.bounding_box;
        draw_outline(
            frame,
            (bbox.x1() as i32, bbox.y1() as i32),
            (bbox.x2() as i32, bbox.y2() as i32),
            style.outline_thickness,
            style.highlight_color,
        );
    }
    draw_banner(frame, MOTION_LABEL, style);
}

/// Banner height in pixels for a frame of `frame_height` rows.
pub fn banner_height(frame_height: u32, style: &AnnotationStyle) -> u32 {
    (style.banner_height_fraction * frame_height as f64) as u32
}

fn draw_banner(frame: &mut Frame, text: &str, style: &AnnotationStyle) {
    let height = banner_height(frame.height(), style);
    let width = frame.width() / 2;
    // Both corners (0, 0) and (width, height) are covered.
    draw_filled_rect_mut(
        frame,
        Rect::at(0, 0).of_size(width + 1, height + 1),
        rgb(style.banner_fill_color),
    );

    let scale = (height / (2 * GLYPH_HEIGHT)).max(1);
    let baseline = 10 + height / 2;
    let top = baseline as i32 - (GLYPH_HEIGHT * scale) as i32;
    draw_text(
        frame,
        text,
        (style.banner_text_offset as i32, top),
        scale,
        style.banner_text_color,
    );
}

fn draw_text(frame: &mut Frame, text: &str, origin: (i32, i32), scale: u32, color: Color) {
    let pixel = rgb(color);
    let step = scale as i32;
    let mut x = origin.0;
    for c in text.chars() {
        if let Some(rows) = glyph(c) {
            for (row_index, row) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if is_set(*row, col) {
                        let cell = Rect::at(
                            x + col as i32 * step,
                            origin.1 + row_index as i32 * step,
                        )
                        .of_size(scale, scale);
                        draw_filled_rect_mut(frame, cell, pixel);
                    }
                }
            }
        }
        x += GLYPH_ADVANCE as i32 * step;
    }
}

/// Hollow rectangle whose stroke is centred on the edge `(p1, p2)`.
///
/// Drawn as `thickness` nested one-pixel outlines, outermost first.
fn draw_outline(frame: &mut Frame, p1: (i32, i32), p2: (i32, i32), thickness: u32, color: Color) {
    let pixel = rgb(color);
    let t = thickness.max(1) as i32;
    let half = t / 2;
    let (x0, y0) = (p1.0 - half, p1.1 - half);
    let (x1, y1) = (p2.0 + (t - 1 - half), p2.1 + (t - 1 - half));

    for inset in 0..t {
        let width = x1 - x0 + 1 - 2 * inset;
        let height = y1 - y0 + 1 - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let ring = Rect::at(x0 + inset, y0 + inset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(frame, ring, pixel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Point};
    use image::Rgb;

    const GREY: Rgb<u8> = Rgb([90, 90, 90]);

    fn region(x: u32, y: u32, width: u32, height: u32) -> Region {
        Region {
            contour: vec![Point::new(x, y)],
            area: (width * height) as u64,
            bounding_box: BoundingBox {
                x,
                y,
                width,
                height,
            },
        }
    }

    #[test]
    fn no_regions_leaves_frame_untouched() {
        let mut frame = Frame::from_pixel(64, 48, GREY);
        let before = frame.clone();
        annotate(&mut frame, &[], &AnnotationStyle::default());
        assert_eq!(frame, before);
    }

    #[test]
    fn outline_is_drawn_in_highlight_color() {
        let style = AnnotationStyle::default();
        let mut frame = Frame::from_pixel(200, 200, GREY);
        annotate(&mut frame, &[region(100, 100, 40, 30)], &style);

        let yellow = rgb(style.highlight_color);
        assert_eq!(frame.get_pixel(100, 100), &yellow);
        assert_eq!(frame.get_pixel(99, 120), &yellow);
        assert_eq!(frame.get_pixel(140, 130), &yellow);
        assert_eq!(frame.get_pixel(120, 130), &yellow);
        // Interior and outside stay untouched.
        assert_eq!(frame.get_pixel(120, 115), &GREY);
        assert_eq!(frame.get_pixel(97, 115), &GREY);
        assert_eq!(frame.get_pixel(142, 115), &GREY);
    }

    #[test]
    fn banner_covers_left_half_once() {
        let style = AnnotationStyle::default();
        let mut frame = Frame::from_pixel(640, 360, GREY);
        annotate(
            &mut frame,
            &[region(300, 200, 50, 50), region(400, 250, 60, 60)],
            &style,
        );

        let height = banner_height(360, &style);
        assert_eq!(height, 28);
        let white = rgb(style.banner_fill_color);
        assert_eq!(frame.get_pixel(0, 0), &white);
        assert_eq!(frame.get_pixel(320, height), &white);
        assert_eq!(frame.get_pixel(321, 0), &GREY);
        assert_eq!(frame.get_pixel(10, height + 1), &GREY);

        let red = rgb(style.banner_text_color);
        let label_pixels = frame
            .enumerate_pixels()
            .filter(|(x, y, px)| *px == &red && *x < 320 && *y <= height)
            .count();
        assert!(label_pixels > 0);
        // Scale 2, baseline 24: seven glyph rows of two pixels from row 10.
        let red_pixels: Vec<(u32, u32)> = frame
            .enumerate_pixels()
            .filter(|(_, _, px)| *px == &red)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert_eq!(red_pixels.iter().map(|&(_, y)| y).min(), Some(10));
        assert_eq!(red_pixels.iter().map(|&(_, y)| y).max(), Some(23));
        // Label starts at the configured offset.
        assert_eq!(
            red_pixels.iter().map(|&(x, _)| x).min(),
            Some(style.banner_text_offset)
        );
    }

    #[test]
    fn thick_outline_is_centred_on_the_box_edge() {
        let style = AnnotationStyle {
            outline_thickness: 3,
            ..AnnotationStyle::default()
        };
        let mut frame = Frame::from_pixel(100, 100, GREY);
        annotate(&mut frame, &[region(40, 40, 20, 20)], &style);

        let yellow = rgb(style.highlight_color);
        for x in [39, 40, 41] {
            assert_eq!(frame.get_pixel(x, 50), &yellow);
        }
        for y in [59, 60, 61] {
            assert_eq!(frame.get_pixel(50, y), &yellow);
        }
        assert_eq!(frame.get_pixel(38, 50), &GREY);
        assert_eq!(frame.get_pixel(42, 50), &GREY);
        assert_eq!(frame.get_pixel(62, 50), &GREY);
        assert_eq!(frame.get_pixel(39, 39), &yellow);
        assert_eq!(frame.get_pixel(61, 61), &yellow);
    }

    #[test]
    fn outline_is_clipped_at_frame_edges() {
        let style = AnnotationStyle::default();
        let mut frame = Frame::from_pixel(50, 50, GREY);
        annotate(&mut frame, &[region(0, 30, 50, 20)], &style);
        assert_eq!(frame.get_pixel(0, 40), &rgb(style.highlight_color));
        assert_eq!(frame.get_pixel(49, 49), &rgb(style.highlight_color));
    }
}
