//! A native window to present rendered frames in.

use std::time::Duration;

use anyhow::Context;
use minifb::{Key, WindowOptions};

use crate::{
    config,
    image::{Image, Resolution},
    render::Presenter,
};

/// A resizable window, paced to the configured refresh rate.
///
/// Closing the window or pressing *Escape* closes the [`Presenter`].
pub struct Window {
    win: minifb::Window,
    buffer: Vec<u32>,
}

impl Window {
    pub fn open(config: &config::Display) -> anyhow::Result<Self> {
        let mut win = minifb::Window::new(
            &config.title,
            config.width as usize,
            config.height as usize,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )
        .with_context(|| format!("failed to open window '{}'", config.title))?;

        let rate = config.refresh_rate.max(1);
        win.limit_update_rate(Some(Duration::from_secs(1) / rate));
        log::debug!(
            "opened {}x{} window '{}' at {rate} Hz",
            config.width,
            config.height,
            config.title,
        );

        Ok(Self {
            win,
            buffer: Vec::new(),
        })
    }
}

impl Presenter for Window {
    fn size(&self) -> Resolution {
        let (w, h) = self.win.get_size();
        Resolution::new(w as u32, h as u32)
    }

    fn is_open(&self) -> bool {
        self.win.is_open() && !self.win.is_key_down(Key::Escape)
    }

    fn present(&mut self, image: &Image) -> anyhow::Result<()> {
        if image.resolution().is_empty() {
            // Minimized; still process events.
            self.win.update();
            return Ok(());
        }

        image.write_0rgb(&mut self.buffer);
        self.win
            .update_with_buffer(
                &self.buffer,
                image.width() as usize,
                image.height() as usize,
            )
            .context("failed to update window")?;
        Ok(())
    }
}
