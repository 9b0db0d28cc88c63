mod source_spec;
mod synthetic;

use opencv::{
    core::Mat,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};

pub use source_spec::{SourceKind, SourceSpec};
use synthetic::SyntheticScene;

pub trait FrameSource {
    /// Next frame of the stream, `None` once the stream is exhausted.
    fn read(&mut self) -> anyhow::Result<Option<Mat>>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn read(&mut self) -> anyhow::Result<Option<Mat>> {
        (**self).read()
    }
}

/// Camera device, video file or stream URL opened through videoio.
pub struct CaptureSource {
    capture: VideoCapture,
}

impl CaptureSource {
    /// `Ok(None)` when the backend could not open the source.
    pub fn open(spec: &SourceSpec) -> anyhow::Result<Option<Self>> {
        let capture = match &spec.kind {
            SourceKind::Device(index) => VideoCapture::new(*index, CAP_ANY),
            SourceKind::Path(path) => VideoCapture::from_file(path, CAP_ANY),
            SourceKind::Synthetic => return Ok(None),
        };
        let mut capture = match capture {
            Ok(capture) => capture,
            Err(e) => {
                log::debug!("videoio failed to open {:?}: {e}", spec.kind);
                return Ok(None);
            }
        };
        if !capture.is_opened()? {
            return Ok(None);
        }

        if let Some((width, height)) = spec.size {
            capture.set(CAP_PROP_FRAME_WIDTH, width as f64)?;
            capture.set(CAP_PROP_FRAME_HEIGHT, height as f64)?;
        }

        Ok(Some(Self { capture }))
    }
}

impl FrameSource for CaptureSource {
    fn read(&mut self) -> anyhow::Result<Option<Mat>> {
        let mut frame = Mat::default();
        match self.capture.read(&mut frame) {
            Ok(true) if !frame.empty() => Ok(Some(frame)),
            Ok(_) => Ok(None),
            Err(e) => {
                log::debug!("Frame read failed: {e}");
                Ok(None)
            }
        }
    }
}

/// Opens the source described by `spec`, falling back to the synthetic book
/// scene when a device or file cannot be opened.
pub fn open_source(spec: &SourceSpec) -> anyhow::Result<Box<dyn FrameSource>> {
    if spec.kind == SourceKind::Synthetic {
        log::info!("Using synthetic scene");
        return Ok(Box::new(SyntheticScene::new(spec)?));
    }

    match CaptureSource::open(spec)? {
        Some(capture) => {
            log::info!("Opened video source {:?}", spec.kind);
            Ok(Box::new(capture))
        }
        None => {
            log::warn!(
                "Unable to open video source {:?}, using synthetic scene instead",
                spec.kind
            );
            Ok(Box::new(SyntheticScene::new(&SourceSpec::book())?))
        }
    }
}
