use opencv::{
    core::Mat,
    imgproc::{cvt_color_def, COLOR_BGR2Luv},
};
use plane_tracker::{TargetRect, TargetTracker, TrackedTarget};

use crate::{
    capture::FrameSource,
    display::DisplaySink,
    drawing,
    rect_selector::{self, RectSelector, SharedSelector},
};

pub const PLANE_WINDOW: &str = "plane";
pub const LIVE_WINDOW: &str = "live";

const KEY_SPACE: i32 = b' ' as i32;
const KEY_ESCAPE: i32 = 27;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct App<S, D, T> {
    source: S,
    display: D,
    tracker: T,
    selector: SharedSelector,
    frame: Option<Mat>,
    paused: bool,
    frames_read: u64,
}

impl<S: FrameSource, D: DisplaySink, T: TargetTracker> App<S, D, T> {
    pub fn new(source: S, mut display: D, tracker: T) -> anyhow::Result<Self> {
        let selector = RectSelector::shared();
        display.bind_selector(PLANE_WINDOW, selector.clone())?;

        Ok(Self {
            source,
            display,
            tracker,
            selector,
            frame: None,
            paused: false,
            frames_read: 0,
        })
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        while self.step()? == Flow::Continue {}

        Ok(())
    }

    fn step(&mut self) -> anyhow::Result<Flow> {
        let playing = !self.paused && !rect_selector::lock(&self.selector).dragging();
        if playing || self.frame.is_none() {
            match self.source.read()? {
                Some(frame) => {
                    self.frame = Some(frame);
                    self.frames_read += 1;
                }
                None => {
                    log::info!("End of video stream");
                    return Ok(Flow::Exit);
                }
            }
        }
        let Some(frame) = self.frame.as_ref() else {
            return Ok(Flow::Exit);
        };

        let mut live = Mat::default();
        cvt_color_def(frame, &mut live, COLOR_BGR2Luv)?;
        self.display.show(LIVE_WINDOW, &live)?;

        let tracked: Vec<TrackedTarget> = if playing {
            self.tracker.track(frame)?
        } else {
            Vec::new()
        };

        let mut vis = drawing::compose(
            frame,
            self.tracker.targets().first(),
            tracked.first(),
            self.tracker.frame_points(),
        )?;
        rect_selector::lock(&self.selector).draw(&mut vis)?;
        self.display.show(PLANE_WINDOW, &vis)?;

        let key = self.display.wait_key(1)?;
        let completed = rect_selector::lock(&self.selector).take_completed();
        if let Some(rect) = completed {
            self.on_rect(rect)?;
        }

        if key == KEY_SPACE {
            self.paused = !self.paused;
            log::debug!("Paused: {}", self.paused);
        }
        if key == KEY_ESCAPE {
            return Ok(Flow::Exit);
        }

        Ok(Flow::Continue)
    }

    fn on_rect(&mut self, rect: TargetRect) -> anyhow::Result<()> {
        let Some(frame) = self.frame.as_ref() else {
            return Ok(());
        };
        self.tracker.clear();
        self.tracker.add_target(frame, rect)
    }
}
