use std::env::{self, VarError};

use anyhow::bail;
use image::ImageBuffer;
use once_cell::sync::Lazy;

use super::Image;

/// The supported JPEG decoding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JpegBackend {
    /// Uses the `jpeg-decoder` crate (through `image`), a robust but slow pure-Rust JPEG decoder.
    JpegDecoder,
    /// Uses the `zune-jpeg` crate, a pure-Rust JPEG decoder somewhat faster than `jpeg-decoder`.
    ZuneJpeg,
}

const DEFAULT_BACKEND: JpegBackend = JpegBackend::JpegDecoder;

static JPEG_BACKEND: Lazy<JpegBackend> = Lazy::new(|| {
    let backend = match env::var("TRYON_JPEG_BACKEND") {
        Ok(v) => match parse_backend(&v) {
            Some(backend) => backend,
            None => {
                log::error!(
                    "invalid value set for `TRYON_JPEG_BACKEND` variable: '{v}'; using {:?}",
                    DEFAULT_BACKEND
                );
                DEFAULT_BACKEND
            }
        },
        Err(VarError::NotPresent) => DEFAULT_BACKEND,
        Err(VarError::NotUnicode(s)) => {
            log::error!(
                "invalid value set for `TRYON_JPEG_BACKEND` variable: {}; using {:?}",
                s.to_string_lossy(),
                DEFAULT_BACKEND
            );
            DEFAULT_BACKEND
        }
    };
    log::debug!("using JPEG decode backend: {:?}", backend);
    backend
});

fn parse_backend(name: &str) -> Option<JpegBackend> {
    match name {
        "jpeg-decoder" => Some(JpegBackend::JpegDecoder),
        "zune-jpeg" => Some(JpegBackend::ZuneJpeg),
        _ => None,
    }
}

pub(super) fn decode_jpeg(data: &[u8]) -> anyhow::Result<Image> {
    decode_with(*JPEG_BACKEND, data)
}

fn decode_with(backend: JpegBackend, data: &[u8]) -> anyhow::Result<Image> {
    let buf = match backend {
        JpegBackend::JpegDecoder => {
            image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?.to_rgba8()
        }
        JpegBackend::ZuneJpeg => {
            use zune_jpeg::zune_core::colorspace::ColorSpace;
            use zune_jpeg::zune_core::options::DecoderOptions;

            let mut decomp = zune_jpeg::JpegDecoder::new_with_options(
                DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGBA),
                data,
            );
            decomp.decode_headers()?;
            match decomp.get_output_colorspace() {
                Some(ColorSpace::RGBA) => {}
                other => bail!("unsupported colorspace {other:?} (expected RGBA)"),
            }

            let Some(size) = decomp.output_buffer_size() else {
                bail!("JPEG headers do not specify an image size");
            };
            let mut buf = vec![0; size];
            decomp.decode_into(&mut buf)?;
            let Some((width, height)) = decomp.dimensions() else {
                bail!("JPEG headers do not specify an image size");
            };
            match ImageBuffer::from_raw(width.into(), height.into(), buf) {
                Some(buf) => buf,
                None => bail!("decoded JPEG buffer does not match {width}x{height}"),
            }
        }
    };

    Ok(Image { buf })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names() {
        assert_eq!(parse_backend("zune-jpeg"), Some(JpegBackend::ZuneJpeg));
        assert_eq!(parse_backend("jpeg-decoder"), Some(JpegBackend::JpegDecoder));
        assert_eq!(parse_backend("mozjpeg"), None);
    }

    #[test]
    fn garbage_is_an_error() {
        let data = [0xff, 0xd8, 0x00, 0x01, 0x02];
        assert!(decode_with(JpegBackend::JpegDecoder, &data).is_err());
        assert!(decode_with(JpegBackend::ZuneJpeg, &data).is_err());
    }
}
