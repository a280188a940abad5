//! Drawing surfaces and the source-to-surface coordinate transform.

use nalgebra::Point2;

use crate::{
    error::DrawError,
    image::{
        blend::blend,
        draw::{self, ClipCircle},
        Color, Image, Rect, Resolution,
    },
};

/// A resizable 2D drawing target.
///
/// All coordinates passed to a [`Surface`] are in surface space.
pub trait Surface {
    /// Returns the current size of the surface.
    fn resolution(&self) -> Resolution;

    /// Resets every pixel in `rect` to transparent black, ignoring the clip region.
    fn clear_rect(&mut self, rect: Rect);

    /// Draws the `src` region of `image` into the `dst` region of the surface, scaling as needed.
    fn draw_image(&mut self, image: &Image, src: Rect, dst: Rect) -> Result<(), DrawError>;

    fn draw_line(&mut self, from: Point2<f32>, to: Point2<f32>, color: Color, width: u32);

    /// Draws a circle filled with `fill`, optionally outlined with a `(color, width)` stroke.
    fn draw_circle(
        &mut self,
        center: Point2<f32>,
        radius: f32,
        fill: Color,
        stroke: Option<(Color, u32)>,
    );

    /// Pushes the current clip state.
    fn save(&mut self);

    /// Pops the clip state pushed by the matching [`Surface::save`]. Does nothing if the stack is
    /// empty.
    fn restore(&mut self);

    /// Intersects the clip region with a circle. Affects all following draw calls until the next
    /// [`Surface::restore`].
    fn clip_circle(&mut self, center: Point2<f32>, radius: f32);

    /// Clears the whole surface.
    fn clear(&mut self) {
        let rect = self.resolution().rect();
        self.clear_rect(rect);
    }
}

/// A [`Surface`] backed by an in-memory [`Image`].
pub struct Canvas {
    image: Image,
    clip: Vec<ClipCircle>,
    saved: Vec<usize>,
}

impl Canvas {
    pub fn new(res: Resolution) -> Self {
        Self {
            image: Image::new(res.width(), res.height()),
            clip: Vec::new(),
            saved: Vec::new(),
        }
    }

    /// Changes the size of the canvas. Contents are discarded if the size changes.
    pub fn resize(&mut self, res: Resolution) {
        if self.image.resolution() != res {
            log::debug!("resizing canvas from {} to {}", self.image.resolution(), res);
            self.image = Image::new(res.width(), res.height());
        }
    }

    #[inline]
    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn into_image(self) -> Image {
        self.image
    }
}

impl Surface for Canvas {
    fn resolution(&self) -> Resolution {
        self.image.resolution()
    }

    fn clear_rect(&mut self, rect: Rect) {
        let Some(rect) = rect.intersection(&self.image.rect()) else {
            return;
        };
        let x0 = rect.x().round() as u32;
        let y0 = rect.y().round() as u32;
        let x1 = (rect.right().round() as u32).min(self.image.width());
        let y1 = (rect.bottom().round() as u32).min(self.image.height());
        for y in y0..y1 {
            for x in x0..x1 {
                self.image.set(x, y, Color::NULL);
            }
        }
    }

    fn draw_image(&mut self, image: &Image, src: Rect, dst: Rect) -> Result<(), DrawError> {
        if !dst.is_drawable() {
            return Err(DrawError::DegenerateRect(dst));
        }
        if !src.is_drawable() {
            return Err(DrawError::DegenerateRect(src));
        }
        if src.intersection(&image.rect()).is_none() {
            return Err(DrawError::EmptyRegion);
        }

        blend(&mut self.image, dst, image, src).clip(&self.clip);
        Ok(())
    }

    fn draw_line(&mut self, from: Point2<f32>, to: Point2<f32>, color: Color, width: u32) {
        if !(from.x.is_finite() && from.y.is_finite() && to.x.is_finite() && to.y.is_finite()) {
            return;
        }
        draw::line(
            &mut self.image,
            from.x.round() as i32,
            from.y.round() as i32,
            to.x.round() as i32,
            to.y.round() as i32,
        )
        .color(color)
        .stroke_width(width)
        .clip(&self.clip);
    }

    fn draw_circle(
        &mut self,
        center: Point2<f32>,
        radius: f32,
        fill: Color,
        stroke: Option<(Color, u32)>,
    ) {
        if !(center.x.is_finite() && center.y.is_finite() && radius > 0.0) {
            return;
        }
        let diameter = (radius * 2.0).round() as u32;
        let mut guard = draw::circle(
            &mut self.image,
            center.x.round() as i32,
            center.y.round() as i32,
            diameter,
        );
        guard.fill(Some(fill)).clip(&self.clip);
        if let Some((color, width)) = stroke {
            guard.stroke(color, width);
        }
    }

    fn save(&mut self) {
        self.saved.push(self.clip.len());
    }

    fn restore(&mut self) {
        if let Some(len) = self.saved.pop() {
            self.clip.truncate(len);
        }
    }

    fn clip_circle(&mut self, center: Point2<f32>, radius: f32) {
        self.clip.push(ClipCircle {
            x: center.x,
            y: center.y,
            radius,
        });
    }
}

/// Converts source-frame coordinates to surface coordinates.
///
/// The X and Y axes are scaled independently; the aspect ratio of the source is not preserved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameScale {
    pub sx: f32,
    pub sy: f32,
}

impl FrameScale {
    /// Computes the scale from a `source` frame to a `target` surface.
    ///
    /// Returns [`None`] if `source` has zero width or height.
    pub fn new(source: Resolution, target: Resolution) -> Option<Self> {
        if source.is_empty() {
            return None;
        }
        Some(Self {
            sx: target.width() as f32 / source.width() as f32,
            sy: target.height() as f32 / source.height() as f32,
        })
    }

    pub const IDENTITY: Self = Self { sx: 1.0, sy: 1.0 };

    #[inline]
    pub fn point(&self, p: Point2<f32>) -> Point2<f32> {
        Point2::new(p.x * self.sx, p.y * self.sy)
    }

    #[inline]
    pub fn rect(&self, r: Rect) -> Rect {
        Rect::from_top_left(
            r.x() * self.sx,
            r.y() * self.sy,
            r.width() * self.sx,
            r.height() * self.sy,
        )
    }

    /// Returns the smaller of the two axis scales, used for lengths that must stay round.
    #[inline]
    pub fn min(&self) -> f32 {
        self.sx.min(self.sy)
    }
}
