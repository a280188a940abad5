//! V4L2 webcam access.
//!
//! Only V4L2 `VIDEO_CAPTURE` devices yielding JFIF JPEG or Motion JPEG frames are supported.

use std::{env, fmt};

use anyhow::{bail, Context};
use linuxvideo::{
    format::{FrameIntervals, FrameSizes, PixFormat, Pixelformat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device, Fract,
};

use crate::{
    config,
    image::{Image, Resolution},
    timer::Timer,
};

use super::FrameReader;

const ENV_VAR_WEBCAM_NAME: &str = "TRYON_WEBCAM_NAME";

/// Indicates whether to prefer a higher resolution or frame rate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ParamPreference {
    /// Prefer increased resolution over higher frame rates.
    #[default]
    Resolution,
    /// Prefer higher frame rate over higher image resolution.
    Framerate,
}

/// Format negotiation options.
#[derive(Debug, Default, Clone)]
pub struct WebcamOptions {
    name: Option<String>,
    resolution: Option<Resolution>,
    fps: Option<u32>,
    pref: ParamPreference,
}

impl WebcamOptions {
    /// Creates options from the `[capture]` section of the configuration.
    pub fn from_config(capture: &config::Capture) -> Self {
        let mut options = Self::default();
        if let Some(name) = &capture.device {
            options = options.name(name.clone());
        }
        if let (Some(w), Some(h)) = (capture.width, capture.height) {
            options = options.resolution(Resolution::new(w, h));
        }
        if let Some(fps) = capture.fps {
            options = options.fps(fps);
        }
        options
    }

    /// Sets the name of the webcam device to open.
    ///
    /// If no webcam with the given name can be found, opening the webcam will result in an error.
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Sets the desired image resolution.
    ///
    /// A lower resolution might be selected if the webcam cannot deliver it.
    pub fn resolution(self, resolution: Resolution) -> Self {
        Self {
            resolution: Some(resolution),
            ..self
        }
    }

    /// Sets the desired frame rate.
    ///
    /// A lower frame rate might be selected if the webcam cannot deliver it.
    pub fn fps(self, fps: u32) -> Self {
        Self {
            fps: Some(fps),
            ..self
        }
    }

    /// Selects which parameter to keep when the camera cannot deliver both the desired frame rate
    /// and resolution.
    pub fn prefer(self, pref: ParamPreference) -> Self {
        Self { pref, ..self }
    }

    /// Drops the least important constraint. Returns `false` if none are left.
    fn relax(&mut self) -> bool {
        match self.pref {
            ParamPreference::Resolution => {
                self.fps.take().is_some() || self.resolution.take().is_some()
            }
            ParamPreference::Framerate => {
                self.resolution.take().is_some() || self.fps.take().is_some()
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
struct FrameFormat {
    resolution: Resolution,
    frame_interval: Fract,
}

impl FrameFormat {
    fn fps(&self) -> f32 {
        1.0 / self.frame_interval.as_f32()
    }
}

impl fmt::Debug for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {:.1}Hz", self.resolution, self.fps())
    }
}

fn enumerate_formats(device: &Device) -> anyhow::Result<(Pixelformat, Vec<FrameFormat>)> {
    let mut pixel_format = None;
    for format in device.formats(BufType::VIDEO_CAPTURE) {
        let format = format?;
        if format.pixelformat() == Pixelformat::JPEG || format.pixelformat() == Pixelformat::MJPG {
            pixel_format = Some(format.pixelformat());
            break;
        }
    }
    let Some(pixel_format) = pixel_format else {
        bail!("no supported pixel format found");
    };

    let sizes = match device.frame_sizes(pixel_format)? {
        FrameSizes::Discrete(sizes) => sizes,
        FrameSizes::Stepwise(_) | FrameSizes::Continuous(_) => {
            bail!("stepwise or continuous resolutions are not supported");
        }
    };

    let mut formats = Vec::new();
    for size in sizes {
        let intervals = match device.frame_intervals(pixel_format, size.width(), size.height())? {
            FrameIntervals::Discrete(intervals) => intervals,
            FrameIntervals::Stepwise(_) | FrameIntervals::Continuous(_) => {
                bail!("stepwise or continuous frame rates are not supported")
            }
        };
        formats.extend(intervals.iter().map(|rate| FrameFormat {
            resolution: Resolution::new(size.width(), size.height()),
            frame_interval: *rate.fract(),
        }));
    }

    Ok((pixel_format, formats))
}

/// Picks the best format satisfying `options`, relaxing constraints until one is found.
fn negotiate(formats: &[FrameFormat], options: &WebcamOptions) -> Option<FrameFormat> {
    let mut options = options.clone();
    loop {
        let mut eligible = formats
            .iter()
            .filter(|fmt| {
                options.resolution.map_or(true, |res| {
                    fmt.resolution.width() >= res.width() && fmt.resolution.height() >= res.height()
                }) && options
                    .fps
                    .map_or(true, |fps| fmt.fps().round() >= fps as f32)
            })
            .copied()
            .collect::<Vec<_>>();
        match options.pref {
            ParamPreference::Resolution => eligible.sort_by(|a, b| {
                a.resolution
                    .num_pixels()
                    .cmp(&b.resolution.num_pixels())
                    .then(a.fps().total_cmp(&b.fps()))
            }),
            ParamPreference::Framerate => eligible.sort_by(|a, b| {
                a.fps()
                    .total_cmp(&b.fps())
                    .then(a.resolution.num_pixels().cmp(&b.resolution.num_pixels()))
            }),
        }
        if let Some(fmt) = eligible.last() {
            return Some(*fmt);
        }

        log::debug!("no format matches {:?}", options);
        if !options.relax() {
            return None;
        }
    }
}

/// A webcam yielding a stream of [`Image`]s.
pub struct Webcam {
    stream: ReadStream,
    resolution: Resolution,
    t_dequeue: Timer,
    t_decode: Timer,
}

impl Webcam {
    /// Opens the first supported webcam found.
    ///
    /// This can block for a significant amount of time while the webcam initializes (on the order
    /// of hundreds of milliseconds).
    pub fn open(options: WebcamOptions) -> anyhow::Result<Self> {
        let name_from_env = env::var(ENV_VAR_WEBCAM_NAME).ok();
        if let Some(name) = &name_from_env {
            log::debug!("webcam override: `{ENV_VAR_WEBCAM_NAME}` is set to '{name}'");
        }
        let name = options.name.clone().or(name_from_env);

        for res in linuxvideo::list().context("failed to list video devices")? {
            match res {
                Ok(dev) => match Self::open_impl(dev, name.as_deref(), &options) {
                    Ok(Some(webcam)) => return Ok(webcam),
                    Ok(None) => {}
                    Err(e) => log::debug!("{e:#}"),
                },
                Err(e) => log::warn!("{e}"),
            }
        }

        match name {
            Some(name) => bail!("no supported webcam named '{name}' found"),
            None => bail!("no supported webcam device found"),
        }
    }

    fn open_impl(
        dev: Device,
        name: Option<&str>,
        options: &WebcamOptions,
    ) -> anyhow::Result<Option<Self>> {
        let caps = dev.capabilities()?;
        if let Some(name) = name {
            if caps.card() != name {
                return Ok(None);
            }
        }

        let cap_flags = caps.device_capabilities();
        let path = dev.path()?;
        log::debug!(
            "device {} ({}) capabilities: {:?}",
            caps.card(),
            path.display(),
            cap_flags,
        );
        if !cap_flags.contains(CapabilityFlags::VIDEO_CAPTURE) {
            return Ok(None);
        }

        let (pixel_format, formats) = enumerate_formats(&dev)?;
        let Some(format) = negotiate(&formats, options) else {
            bail!("failed to negotiate a webcam format for {}", caps.card());
        };

        let capture = dev.video_capture(PixFormat::new(
            format.resolution.width(),
            format.resolution.height(),
            pixel_format,
        ))?;
        let actual_format = capture.format();
        let resolution = Resolution::new(actual_format.width(), actual_format.height());
        let actual = capture.set_frame_interval(format.frame_interval)?;

        log::info!(
            "opened {} ({}), {} @ {:.1}Hz",
            caps.card(),
            path.display(),
            resolution,
            1.0 / actual.as_f32(),
        );

        let stream = capture.into_stream(2)?;
        Ok(Some(Self {
            stream,
            resolution,
            t_dequeue: Timer::new("dequeue"),
            t_decode: Timer::new("decode"),
        }))
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Reads the next frame from the camera, blocking until one is available.
    ///
    /// Frames that fail to decode are replaced with a blank image of the stream's resolution.
    pub fn read(&mut self) -> anyhow::Result<Image> {
        let dequeue_guard = self.t_dequeue.start();
        let resolution = self.resolution;
        let t_decode = &mut self.t_decode;
        let image = self.stream.dequeue(|buf| {
            drop(dequeue_guard);
            let image = match t_decode.time(|| Image::decode_jpeg(&buf)) {
                Ok(image) => image,
                Err(e) => {
                    // Some webcams occasionally produce corrupted MJPG frames.
                    log::error!("webcam decode error: {e}");
                    Image::new(resolution.width(), resolution.height())
                }
            };
            Ok(image)
        })?;
        Ok(image)
    }
}

impl FrameReader for Webcam {
    fn read_frame(&mut self) -> anyhow::Result<Image> {
        self.read()
    }

    fn timers(&mut self) -> Vec<&mut Timer> {
        vec![&mut self.t_dequeue, &mut self.t_decode]
    }
}
