//! Garment alignment.
//!
//! Each garment category has a bounding-box policy that derives a box from the pose in
//! source-frame space ([`lower_box`], [`upper_box`]), and a height policy that fits the garment
//! image into that box ([`placement`]). Only [`GarmentAligner::draw`] touches a surface.

use std::{path::PathBuf, sync::Arc, thread};

use once_cell::sync::OnceCell;

use crate::{
    error::DrawError,
    image::{Image, Rect},
    landmark::{BodyPart::*, Pose},
    snapshot::{SnapshotCell, SnapshotReader, SnapshotWriter},
    surface::{FrameScale, Surface},
};

/// Garment categories, in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Garment {
    Lower,
    Upper,
}

/// How the garment height relates to its bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightPolicy {
    /// Height follows from the width and may extend past the bottom of the box.
    Overflow,
    /// Like [`HeightPolicy::Overflow`], but if the height would exceed the box, the size is
    /// computed from the box height instead.
    ShrinkToFit,
}

impl Garment {
    pub fn height_policy(self) -> HeightPolicy {
        // Shrinking the lower garment would move its waistband away from the hips.
        match self {
            Garment::Lower => HeightPolicy::Overflow,
            Garment::Upper => HeightPolicy::ShrinkToFit,
        }
    }

    /// Computes the bounding box for this garment, or [`None`] if the pose lacks the required
    /// landmarks.
    pub fn bounding_box(self, pose: &Pose, threshold: f32) -> Option<Rect> {
        match self {
            Garment::Lower => lower_box(pose, threshold),
            Garment::Upper => upper_box(pose, threshold),
        }
    }
}

/// Bounding box of the lower garment, in source-frame space.
///
/// Requires both hips to be present. The bottom of the box follows the ankles if both are
/// present, else the knees if both score strictly above `threshold`, else the hips. Hip and ankle
/// scores are not checked.
pub fn lower_box(pose: &Pose, threshold: f32) -> Option<Rect> {
    let (lhip, rhip) = (pose.get(LeftHip)?, pose.get(RightHip)?);
    let (lbottom, rbottom) = match (pose.get(LeftAnkle), pose.get(RightAnkle)) {
        (Some(l), Some(r)) => (l, r),
        _ => match (
            pose.confident(LeftKnee, threshold),
            pose.confident(RightKnee, threshold),
        ) {
            (Some(l), Some(r)) => (l, r),
            _ => (lhip, rhip),
        },
    };

    let hip_width = (lhip.x() - rhip.x()).abs();
    let pad_x = 0.4 * hip_width;
    let pad_y = 0.15 * hip_width;

    let xs = [lhip.x(), rhip.x(), lbottom.x(), rbottom.x()];
    let left = xs.iter().copied().fold(f32::INFINITY, f32::min) - pad_x;
    let right = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max) + pad_x;
    let top = lhip.y().min(rhip.y()) - pad_y;
    let bottom = lbottom.y().max(rbottom.y()).max(top);

    Some(Rect::from_edges(left, top, right, bottom))
}

/// Bounding box of the upper garment, in source-frame space.
///
/// Requires both shoulders and both hips to score strictly above `threshold`.
pub fn upper_box(pose: &Pose, threshold: f32) -> Option<Rect> {
    let ls = pose.confident(LeftShoulder, threshold)?;
    let rs = pose.confident(RightShoulder, threshold)?;
    let lh = pose.confident(LeftHip, threshold)?;
    let rh = pose.confident(RightHip, threshold)?;

    let shoulder_width = (ls.x() - rs.x()).abs();
    let hip_width = (lh.x() - rh.x()).abs();
    let pad = 0.25 * shoulder_width.max(hip_width);

    let bounds = Rect::bounding([ls, rs, lh, rh].map(|lm| lm.position()))?;
    Some(bounds.pad(pad, pad))
}

/// Fits an image with the given `width / height` ratio into `bbox`, returning the surface-space
/// draw rectangle.
///
/// The image is scaled to the box width (converted with `scale`), horizontally centered, and
/// aligned to the top of the box.
pub fn placement(bbox: Rect, aspect: f32, scale: FrameScale, policy: HeightPolicy) -> Rect {
    let box_w = bbox.width() * scale.sx;
    let box_h = bbox.height() * scale.sy;

    let mut w = box_w;
    let mut h = w / aspect;
    if policy == HeightPolicy::ShrinkToFit && h > box_h {
        h = box_h;
        w = h * aspect;
    }

    let x = bbox.x() * scale.sx + (box_w - w) / 2.0;
    let y = bbox.y() * scale.sy;
    Rect::from_top_left(x, y, w, h)
}

/// A garment image that may still be loading.
///
/// Clones share the same underlying image.
#[derive(Debug, Clone)]
pub struct OverlayAsset {
    label: Arc<str>,
    image: Arc<OnceCell<Image>>,
}

impl OverlayAsset {
    /// Creates an asset that is not loaded yet. Call [`OverlayAsset::set_image`] to finish it.
    pub fn pending<L: Into<Arc<str>>>(label: L) -> Self {
        Self {
            label: label.into(),
            image: Arc::new(OnceCell::new()),
        }
    }

    pub fn from_image<L: Into<Arc<str>>>(label: L, image: Image) -> Self {
        let this = Self::pending(label);
        this.set_image(image);
        this
    }

    /// Starts loading `path` on a background thread and returns the still pending asset.
    ///
    /// Load failures are logged; the asset then stays pending forever and is never drawn.
    pub fn load_in_background(path: PathBuf) -> Self {
        let this = Self::pending(path.display().to_string());
        let asset = this.clone();
        let res = thread::Builder::new()
            .name(format!("load {}", this.label))
            .spawn(move || match Image::load(&path) {
                Ok(image) => {
                    log::debug!("loaded garment '{}' ({})", asset.label, image.resolution());
                    asset.set_image(image);
                }
                Err(e) => log::error!("failed to load garment '{}': {e:#}", asset.label),
            });
        if let Err(e) = res {
            log::error!("failed to spawn loader for '{}': {e}", this.label);
        }
        this
    }

    /// Finishes loading. Does nothing if the asset already has an image.
    pub fn set_image(&self, image: Image) {
        if self.image.set(image).is_err() {
            log::warn!("garment '{}' was already loaded", self.label);
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the image if loading has finished.
    pub fn image(&self) -> Option<&Image> {
        self.image.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.image.get().is_some()
    }
}

/// The garments currently chosen for each category.
#[derive(Debug, Clone, Default)]
pub struct Garments {
    pub lower: Option<OverlayAsset>,
    pub upper: Option<OverlayAsset>,
}

impl Garments {
    pub fn get(&self, garment: Garment) -> Option<&OverlayAsset> {
        match garment {
            Garment::Lower => self.lower.as_ref(),
            Garment::Upper => self.upper.as_ref(),
        }
    }
}

/// Write side of the garment selection, owned by whatever lets the user pick garments.
pub struct GarmentSelection {
    writer: SnapshotWriter<Garments>,
    current: Garments,
}

impl GarmentSelection {
    pub fn new(initial: Garments) -> (Self, SelectionReader) {
        let (writer, reader) = SnapshotCell::with_value(Some(initial.clone()));
        (
            Self {
                writer,
                current: initial,
            },
            SelectionReader { reader },
        )
    }

    pub fn set(&mut self, garment: Garment, asset: Option<OverlayAsset>) {
        match garment {
            Garment::Lower => self.current.lower = asset,
            Garment::Upper => self.current.upper = asset,
        }
        self.writer.publish(self.current.clone());
    }

    pub fn current(&self) -> &Garments {
        &self.current
    }
}

/// Read side of the garment selection, consulted once per rendered frame.
#[derive(Debug, Clone)]
pub struct SelectionReader {
    reader: SnapshotReader<Garments>,
}

impl SelectionReader {
    pub fn load(&self) -> Arc<Garments> {
        self.reader.load().unwrap_or_default()
    }
}

/// Places and draws garments.
#[derive(Debug, Clone)]
pub struct GarmentAligner {
    threshold: f32,
}

impl GarmentAligner {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Computes the surface-space draw rectangle for `garment`, if the pose supports it.
    pub fn place(
        &self,
        garment: Garment,
        pose: &Pose,
        image: &Image,
        scale: FrameScale,
    ) -> Result<Option<Rect>, DrawError> {
        let Some(bbox) = garment.bounding_box(pose, self.threshold) else {
            return Ok(None);
        };
        let aspect = image.resolution().aspect_ratio().ok_or(DrawError::InvalidAsset {
            width: image.width(),
            height: image.height(),
        })?;
        Ok(Some(placement(bbox, aspect, scale, garment.height_policy())))
    }

    /// Draws `garment` aligned to `pose`.
    ///
    /// Returns `Ok(false)` without drawing if the asset is not loaded or the pose lacks the
    /// required landmarks.
    pub fn draw<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        garment: Garment,
        asset: &OverlayAsset,
        pose: &Pose,
        scale: FrameScale,
    ) -> Result<bool, DrawError> {
        let Some(image) = asset.image() else {
            log::trace!("garment '{}' not loaded yet", asset.label());
            return Ok(false);
        };
        let Some(dst) = self.place(garment, pose, image, scale)? else {
            return Ok(false);
        };
        surface.draw_image(image, image.rect(), dst)?;
        Ok(true)
    }
}
