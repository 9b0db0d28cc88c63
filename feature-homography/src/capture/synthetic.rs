use std::path::Path;

use anyhow::{bail, Context};
use nalgebra::Vector2;
use opencv::{
    core::{
        self, Mat, Point2f, Scalar, Size, Vector, BORDER_TRANSPARENT, CV_8SC3, CV_8UC3, DECOMP_LU,
    },
    imgcodecs::{self, IMREAD_COLOR},
    imgproc::{gaussian_blur_def, get_perspective_transform, resize, warp_perspective, INTER_LINEAR},
    prelude::*,
};

use super::{source_spec::SourceSpec, FrameSource};

const DEFAULT_SIZE: (i32, i32) = (640, 480);
const TIME_STEP: f64 = 1.0 / 30.0;
const SPEED: f64 = 0.25;

/// Endless generated video: a textured foreground sliding over a textured
/// background along a Lissajous path, with a slight perspective wobble.
pub struct SyntheticScene {
    background: Mat,
    foreground: Mat,
    noise: f64,
    time: f64,
    center: Vector2<f64>,
    amplitude: Vector2<f64>,
}

impl SyntheticScene {
    pub fn new(spec: &SourceSpec) -> anyhow::Result<Self> {
        let (width, height) = spec.size.unwrap_or(DEFAULT_SIZE);

        let background = match &spec.background {
            Some(path) => fit(load_image(path)?, Size::new(width, height))?,
            None => generate_texture(width, height, 9.0)?,
        };
        let foreground = match &spec.foreground {
            Some(path) => load_image(path)?,
            None => generate_texture(width / 3, height / 3, 1.5)?,
        };

        let bg_size = background.size()?;
        let fg_size = foreground.size()?;
        if fg_size.width > bg_size.width || fg_size.height > bg_size.height {
            bail!("Foreground image is larger than the scene");
        }
        let center = Vector2::new(
            (bg_size.width - fg_size.width) as f64 / 2.0,
            (bg_size.height - fg_size.height) as f64 / 2.0,
        );
        // Keeps the foreground inside the frame at the extremes of the path
        let amplitude = center * 0.8;

        Ok(Self {
            background,
            foreground,
            noise: spec.noise,
            time: 0.0,
            center,
            amplitude,
        })
    }

    // Foreground corners in frame coordinates, clockwise from top-left
    fn foreground_quad(&self) -> anyhow::Result<Vector<Point2f>> {
        let size = self.foreground.size()?;
        let (w, h) = (size.width as f64, size.height as f64);
        let top_left = self.center
            + Vector2::new(
                self.amplitude.x * (self.time * SPEED).cos(),
                self.amplitude.y * (self.time * SPEED).sin(),
            );
        let wobble = h / 20.0 * self.time.cos();

        let corners = [
            top_left,
            top_left + Vector2::new(w + wobble, wobble),
            top_left + Vector2::new(w + wobble, h + wobble),
            top_left + Vector2::new(0.0, h),
        ];

        Ok(corners.iter().map(|c| Point2f::new(c.x as f32, c.y as f32)).collect())
    }

    fn render(&mut self) -> anyhow::Result<Mat> {
        let size = self.foreground.size()?;
        let (w, h) = (size.width as f32, size.height as f32);
        let src: Vector<Point2f> = [
            Point2f::new(0.0, 0.0),
            Point2f::new(w, 0.0),
            Point2f::new(w, h),
            Point2f::new(0.0, h),
        ]
        .into_iter()
        .collect();
        let transform = get_perspective_transform(&src, &self.foreground_quad()?, DECOMP_LU)?;

        let mut frame = self.background.try_clone()?;
        let frame_size = frame.size()?;
        warp_perspective(
            &self.foreground,
            &mut frame,
            &transform,
            frame_size,
            INTER_LINEAR,
            BORDER_TRANSPARENT,
            Scalar::default(),
        )?;
        self.time += TIME_STEP;

        if self.noise > 0.0 {
            frame = add_noise(&frame, self.noise)?;
        }

        Ok(frame)
    }
}

impl FrameSource for SyntheticScene {
    fn read(&mut self) -> anyhow::Result<Option<Mat>> {
        self.render().map(Some)
    }
}

fn load_image(path: &Path) -> anyhow::Result<Mat> {
    let path_str = path.to_str().context("Image path is not valid UTF-8")?;
    let image = imgcodecs::imread(path_str, IMREAD_COLOR)
        .with_context(|| format!("Failed to read image {path_str}"))?;
    if image.empty() {
        bail!("Failed to read image {path_str}");
    }

    Ok(image)
}

fn fit(image: Mat, size: Size) -> anyhow::Result<Mat> {
    if image.size()? == size {
        return Ok(image);
    }
    let mut resized = Mat::default();
    resize(&image, &mut resized, size, 0.0, 0.0, INTER_LINEAR)?;

    Ok(resized)
}

// Blurred uniform noise; smaller sigma gives a busier texture with more corners
fn generate_texture(width: i32, height: i32, sigma: f64) -> anyhow::Result<Mat> {
    let mut noise = Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0))?;
    core::randu(&mut noise, &Scalar::all(0.0), &Scalar::all(255.0))?;
    let mut texture = Mat::default();
    gaussian_blur_def(&noise, &mut texture, Size::new(0, 0), sigma)?;

    Ok(texture)
}

fn add_noise(frame: &Mat, level: f64) -> anyhow::Result<Mat> {
    let size = frame.size()?;
    let mut noise =
        Mat::new_rows_cols_with_default(size.height, size.width, CV_8SC3, Scalar::all(0.0))?;
    core::randn(&mut noise, &Scalar::all(0.0), &Scalar::all(255.0 * level))?;
    let mut noisy = Mat::default();
    core::add(frame, &noise, &mut noisy, &Mat::default(), CV_8UC3)?;

    Ok(noisy)
}
