use std::{env, sync::Arc};

use anyhow::Context;
use tryon::{
    config::Config,
    estimator::ReplayEstimator,
    garment::{GarmentSelection, Garments, OverlayAsset},
    gui,
    session::Session,
    video::{
        webcam::{Webcam, WebcamOptions},
        CaptureSource, LiveCapture, StillImage,
    },
};

fn main() -> anyhow::Result<()> {
    tryon::init_logger!();

    let config = match env::args_os().nth(1) {
        Some(path) => Config::load(path)?,
        None => {
            log::info!("no config file given, using defaults");
            Config::default()
        }
    };

    let capture: Arc<dyn CaptureSource> = match &config.capture.image {
        Some(path) => Arc::new(StillImage::load(path)?),
        None => {
            let webcam = Webcam::open(WebcamOptions::from_config(&config.capture))?;
            Arc::new(LiveCapture::spawn("webcam", webcam).context("failed to spawn capture thread")?)
        }
    };

    let estimator = match &config.poses {
        Some(path) => ReplayEstimator::load(path)?,
        None => {
            log::warn!("no pose recording configured, only the camera image will be shown");
            ReplayEstimator::new(vec![Vec::new()])
        }
    };

    let garments = Garments {
        lower: config.garments.lower.clone().map(OverlayAsset::load_in_background),
        upper: config.garments.upper.clone().map(OverlayAsset::load_in_background),
    };
    let (_selection, selection) = GarmentSelection::new(garments);

    let mut window = gui::Window::open(&config.display)?;
    let mut session = Session::start(&config, capture, estimator, selection)?;
    session.run(&mut window)
}
