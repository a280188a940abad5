//! Primitive drawing operations.
//!
//! Every operation returns a guard that performs the drawing when dropped and allows customizing
//! the operation before that. All operations honor a list of [`ClipCircle`]s: a pixel is only
//! written if its center lies inside every circle.

use std::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    prelude::*,
    primitives::{self, Line, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle},
};

use crate::image::{Color, Image};

/// A circular clip region, in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipCircle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl ClipCircle {
    /// Returns whether the center of pixel `(x, y)` lies inside the circle.
    #[inline]
    pub fn contains_pixel(&self, x: i32, y: i32) -> bool {
        let dx = x as f32 + 0.5 - self.x;
        let dy = y as f32 + 0.5 - self.y;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

/// Returns whether pixel `(x, y)` passes all clip circles in `clip`.
#[inline]
pub fn unclipped(clip: &[ClipCircle], x: i32, y: i32) -> bool {
    clip.iter().all(|c| c.contains_pixel(x, y))
}

/// Guard returned by [`line`][line()]; draws the line when dropped and allows customization.
pub struct DrawLine<'a> {
    image: &'a mut Image,
    clip: &'a [ClipCircle],
    start_x: i32,
    start_y: i32,
    end_x: i32,
    end_y: i32,
    color: Color,
    stroke_width: u32,
}

impl<'a> DrawLine<'a> {
    /// Sets the line's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the line's stroke width.
    ///
    /// By default, a stroke width of 1 is used.
    pub fn stroke_width(&mut self, width: u32) -> &mut Self {
        self.stroke_width = width;
        self
    }

    /// Restricts drawing to the intersection of `clip`.
    pub fn clip(&mut self, clip: &'a [ClipCircle]) -> &mut Self {
        self.clip = clip;
        self
    }
}

impl Drop for DrawLine<'_> {
    fn drop(&mut self) {
        match Line::new(
            Point::new(self.start_x, self.start_y),
            Point::new(self.end_x, self.end_y),
        )
        .into_styled(PrimitiveStyle::with_stroke(self.color, self.stroke_width))
        .draw(&mut Target {
            image: self.image,
            clip: self.clip,
        }) {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Guard returned by [`circle`]; draws the circle when dropped and allows customization.
///
/// By default, the circle is filled and has no outline.
pub struct DrawCircle<'a> {
    image: &'a mut Image,
    clip: &'a [ClipCircle],
    x: i32,
    y: i32,
    diameter: u32,
    fill: Option<Color>,
    stroke: Option<(Color, u32)>,
}

impl<'a> DrawCircle<'a> {
    /// Sets the fill color, or disables filling if `None` is passed.
    pub fn fill(&mut self, color: Option<Color>) -> &mut Self {
        self.fill = color;
        self
    }

    /// Draws an outline with the given color and stroke width.
    pub fn stroke(&mut self, color: Color, width: u32) -> &mut Self {
        self.stroke = Some((color, width));
        self
    }

    /// Restricts drawing to the intersection of `clip`.
    pub fn clip(&mut self, clip: &'a [ClipCircle]) -> &mut Self {
        self.clip = clip;
        self
    }
}

impl Drop for DrawCircle<'_> {
    fn drop(&mut self) {
        let mut style = PrimitiveStyleBuilder::new();
        if let Some(fill) = self.fill {
            style = style.fill_color(fill);
        }
        if let Some((color, width)) = self.stroke {
            style = style.stroke_color(color).stroke_width(width);
        }

        match primitives::Circle::with_center(Point::new(self.x, self.y), self.diameter)
            .into_styled(style.build())
            .draw(&mut Target {
                image: self.image,
                clip: self.clip,
            }) {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Draws a line onto an image.
pub fn line(
    image: &mut Image,
    start_x: i32,
    start_y: i32,
    end_x: i32,
    end_y: i32,
) -> DrawLine<'_> {
    DrawLine {
        image,
        clip: &[],
        start_x,
        start_y,
        end_x,
        end_y,
        color: Color::from_rgb8(0, 0, 255),
        stroke_width: 1,
    }
}

/// Draws a circle centered on `(x, y)` onto an image.
pub fn circle(image: &mut Image, x: i32, y: i32, diameter: u32) -> DrawCircle<'_> {
    DrawCircle {
        image,
        clip: &[],
        x,
        y,
        diameter,
        fill: Some(Color::GREEN),
        stroke: None,
    }
}

struct Target<'a> {
    image: &'a mut Image,
    clip: &'a [ClipCircle],
}

impl Dimensions for Target<'_> {
    fn bounding_box(&self) -> Rectangle {
        let (width, height) = (self.image.width(), self.image.height());

        Rectangle {
            top_left: Point { x: 0, y: 0 },
            size: Size { width, height },
        }
    }
}

impl DrawTarget for Target<'_> {
    type Color = Color;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = embedded_graphics::Pixel<Self::Color>>,
    {
        for Pixel(pos, color) in pixels {
            if pos.x >= 0
                && (pos.x as u32) < self.image.width()
                && pos.y >= 0
                && (pos.y as u32) < self.image.height()
                && unclipped(self.clip, pos.x, pos.y)
            {
                self.image.set(pos.x as u32, pos.y as u32, color);
            }
        }

        Ok(())
    }
}
