//! Camera sources
//!
//! A [`CameraSource`] is acquired once and yields frames on demand. The V4L2
//! source (feature `v4l2`) reads USB cameras; the still-image source serves a
//! fixed picture, which is handy for demos and tests.

use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for CameraError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => CameraError::PermissionDenied(e.to_string()),
            _ => CameraError::Unavailable(e.to_string()),
        }
    }
}

/// Requested capture parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConstraints {
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 1920,
            height: 1080,
            fps: 30,
        }
    }
}

pub trait FrameStream: Send {
    /// Block until the next frame is available
    fn next_frame(&mut self) -> Result<RgbImage, CameraError>;
}

pub trait CameraSource: Send + Sync {
    fn acquire(&self, constraints: &CaptureConstraints) -> Result<Box<dyn FrameStream>, CameraError>;
}

/// Pick a source for the configured device: `/dev/...` is a V4L2 camera,
/// anything else is read as an image file
pub fn source_for(device: &str) -> Box<dyn CameraSource> {
    if device.starts_with("/dev/") {
        #[cfg(feature = "v4l2")]
        {
            Box::new(v4l2::V4l2Camera)
        }
        #[cfg(not(feature = "v4l2"))]
        {
            tracing::warn!("Built without V4L2 support, {} cannot be opened", device);
            Box::new(NoCamera)
        }
    } else {
        Box::new(StillImageCamera::new(device))
    }
}

/// Source that is never available
pub struct NoCamera;

impl CameraSource for NoCamera {
    fn acquire(&self, constraints: &CaptureConstraints) -> Result<Box<dyn FrameStream>, CameraError> {
        Err(CameraError::Unavailable(format!(
            "{}: camera support not compiled in",
            constraints.device
        )))
    }
}

/// Serves the same picture for every frame
pub struct StillImageCamera {
    path: PathBuf,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

struct StillFrames {
    frame: RgbImage,
}

impl FrameStream for StillFrames {
    fn next_frame(&mut self) -> Result<RgbImage, CameraError> {
        Ok(self.frame.clone())
    }
}

impl CameraSource for StillImageCamera {
    fn acquire(&self, _constraints: &CaptureConstraints) -> Result<Box<dyn FrameStream>, CameraError> {
        let bytes = std::fs::read(&self.path)?;
        let frame = image::load_from_memory(&bytes)
            .map_err(|e| CameraError::Unavailable(format!("{:?}: {}", self.path, e)))?
            .to_rgb8();
        tracing::info!(
            "Using still image {:?} as camera ({}x{})",
            self.path,
            frame.width(),
            frame.height()
        );
        Ok(Box::new(StillFrames { frame }))
    }
}

#[cfg(feature = "v4l2")]
mod v4l2 {
    //! USB cameras through V4L2
    //!
    //! MJPEG is decoded with turbojpeg (libjpeg-turbo, SIMD) and falls back to
    //! jpeg-decoder; YUYV and BGR are converted with integer math.

    use image::RgbImage;
    use tracing::{info, warn};
    use v4l::buffer::Type;
    use v4l::io::mmap::Stream;
    use v4l::io::traits::CaptureStream;
    use v4l::video::Capture;
    use v4l::{Device, FourCC};

    use super::{CameraError, CameraSource, CaptureConstraints, FrameStream};

    thread_local! {
        static JPEG_DECOMPRESSOR: std::cell::RefCell<Option<turbojpeg::Decompressor>> =
            std::cell::RefCell::new(turbojpeg::Decompressor::new().ok());
    }

    /// Pixel formats in order of preference
    const PREFERRED_FORMATS: &[&[u8; 4]] = &[b"MJPG", b"YUYV", b"RGB3", b"BGR3"];

    pub struct V4l2Camera;

    struct V4l2Frames {
        stream: Stream<'static>,
        // Keeps the device open for the lifetime of the stream
        _device: Device,
        fourcc: [u8; 4],
        width: usize,
        height: usize,
    }

    impl CameraSource for V4l2Camera {
        fn acquire(&self, c: &CaptureConstraints) -> Result<Box<dyn FrameStream>, CameraError> {
            let device = Device::with_path(&c.device)?;
            let caps = device.query_caps()?;
            info!("Camera: {} (driver: {})", caps.card, caps.driver);

            let format = configure_format(&device, c.width, c.height)?;
            info!(
                "Capture format: {}x{} {:?}",
                format.width,
                format.height,
                String::from_utf8_lossy(&format.fourcc.repr)
            );

            if let Err(e) = set_frame_rate(&device, c.fps) {
                warn!("Could not set frame rate to {} fps: {}", c.fps, e);
            }

            let stream = Stream::with_buffers(&device, Type::VideoCapture, 4)?;
            Ok(Box::new(V4l2Frames {
                stream,
                _device: device,
                fourcc: format.fourcc.repr,
                width: format.width as usize,
                height: format.height as usize,
            }))
        }
    }

    impl FrameStream for V4l2Frames {
        fn next_frame(&mut self) -> Result<RgbImage, CameraError> {
            let (buf, _meta) = self.stream.next()?;
            let mut rgb = vec![0u8; self.width * self.height * 3];
            match &self.fourcc {
                b"MJPG" => decode_mjpeg(buf, &mut rgb)
                    .ok_or_else(|| CameraError::Unavailable("failed to decode MJPEG frame".into()))?,
                b"YUYV" => yuyv_to_rgb(buf, &mut rgb, self.width, self.height),
                b"BGR3" => bgr_to_rgb(buf, &mut rgb),
                _ => {
                    let n = buf.len().min(rgb.len());
                    rgb[..n].copy_from_slice(&buf[..n]);
                }
            }
            RgbImage::from_raw(self.width as u32, self.height as u32, rgb)
                .ok_or_else(|| CameraError::Unavailable("short frame".into()))
        }
    }

    fn configure_format(dev: &Device, width: u32, height: u32) -> std::io::Result<v4l::Format> {
        let formats = dev.enum_formats()?;
        for preferred in PREFERRED_FORMATS {
            let fourcc = FourCC::new(preferred);
            if !formats.iter().any(|f| f.fourcc == fourcc) {
                continue;
            }
            let mut format = dev.format()?;
            format.width = width;
            format.height = height;
            format.fourcc = fourcc;
            match dev.set_format(&format) {
                Ok(actual) => return Ok(actual),
                Err(e) => warn!(
                    "Could not set format {:?} at {}x{}: {}",
                    String::from_utf8_lossy(*preferred),
                    width,
                    height,
                    e
                ),
            }
        }

        // Whatever the device gives us
        let mut format = dev.format()?;
        format.width = width;
        format.height = height;
        match dev.set_format(&format) {
            Ok(actual) => Ok(actual),
            Err(e) => {
                warn!("Could not set resolution {}x{}: {}", width, height, e);
                dev.format()
            }
        }
    }

    fn set_frame_rate(dev: &Device, fps: u32) -> std::io::Result<()> {
        let mut params = dev.params()?;
        params.interval = v4l::Fraction::new(1, fps.max(1));
        dev.set_params(&params)?;
        Ok(())
    }

    /// turbojpeg first, jpeg-decoder when that fails
    fn decode_mjpeg(data: &[u8], rgb: &mut [u8]) -> Option<()> {
        let turbo = JPEG_DECOMPRESSOR.with(|decomp| {
            let mut decomp = decomp.borrow_mut();
            let decompressor = decomp.as_mut()?;
            let header = decompressor.read_header(data).ok()?;
            if header.width * header.height * 3 > rgb.len() {
                return None;
            }
            let image = turbojpeg::Image {
                pixels: &mut rgb[..header.width * header.height * 3],
                width: header.width,
                pitch: header.width * 3,
                height: header.height,
                format: turbojpeg::PixelFormat::RGB,
            };
            decompressor.decompress(data, image).ok()
        });
        if turbo.is_some() {
            return Some(());
        }

        let mut decoder = jpeg_decoder::Decoder::new(std::io::Cursor::new(data));
        let pixels = decoder.decode().ok()?;
        let info = decoder.info()?;
        match info.pixel_format {
            jpeg_decoder::PixelFormat::L8 => {
                for (px, &gray) in rgb.chunks_exact_mut(3).zip(pixels.iter()) {
                    px.fill(gray);
                }
            }
            _ => {
                let n = pixels.len().min(rgb.len());
                rgb[..n].copy_from_slice(&pixels[..n]);
            }
        }
        Some(())
    }

    /// BT.601 YUYV to RGB in fixed point (scaled by 256)
    pub fn yuyv_to_rgb(yuyv: &[u8], rgb: &mut [u8], width: usize, height: usize) {
        let pairs = (width * height / 2).min(yuyv.len() / 4).min(rgb.len() / 6);
        for (src, dst) in yuyv.chunks_exact(4).zip(rgb.chunks_exact_mut(6)).take(pairs) {
            let y0 = src[0] as i32;
            let u = src[1] as i32 - 128;
            let y1 = src[2] as i32;
            let v = src[3] as i32 - 128;

            let v_r = (359 * v) >> 8;
            let uv_g = (88 * u + 183 * v) >> 8;
            let u_b = (454 * u) >> 8;

            dst[0] = (y0 + v_r).clamp(0, 255) as u8;
            dst[1] = (y0 - uv_g).clamp(0, 255) as u8;
            dst[2] = (y0 + u_b).clamp(0, 255) as u8;
            dst[3] = (y1 + v_r).clamp(0, 255) as u8;
            dst[4] = (y1 - uv_g).clamp(0, 255) as u8;
            dst[5] = (y1 + u_b).clamp(0, 255) as u8;
        }
    }

    pub fn bgr_to_rgb(bgr: &[u8], rgb: &mut [u8]) {
        for (src, dst) in bgr.chunks_exact(3).zip(rgb.chunks_exact_mut(3)) {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_still_image_camera() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        RgbImage::from_pixel(8, 4, Rgb([10, 20, 30])).save(&path).unwrap();

        let camera = StillImageCamera::new(&path);
        let mut stream = camera.acquire(&CaptureConstraints::default()).unwrap();
        let frame = stream.next_frame().unwrap();
        assert_eq!(frame.dimensions(), (8, 4));
        assert_eq!(frame.get_pixel(3, 2), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_missing_still_image_is_unavailable() {
        let camera = StillImageCamera::new("/nonexistent/frame.png");
        match camera.acquire(&CaptureConstraints::default()) {
            Err(CameraError::Unavailable(_)) => {}
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("missing file must not open"),
        }
    }

    #[test]
    fn test_io_permission_maps_to_permission_denied() {
        let err: CameraError = std::io::Error::from(std::io::ErrorKind::PermissionDenied).into();
        assert!(matches!(err, CameraError::PermissionDenied(_)));
    }

    #[cfg(not(feature = "v4l2"))]
    #[test]
    fn test_device_without_v4l2_support() {
        let source = source_for("/dev/video0");
        assert!(source.acquire(&CaptureConstraints::default()).is_err());
    }
}
