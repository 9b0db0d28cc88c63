use opencv::{core::Mat, highgui};

use crate::rect_selector::{self, SharedSelector};

pub trait DisplaySink {
    fn show(&mut self, window: &str, image: &Mat) -> anyhow::Result<()>;
    /// Waits up to `delay_ms` for a key press. Pointer events for bound
    /// selectors are delivered during the wait. Returns -1 if no key was pressed.
    fn wait_key(&mut self, delay_ms: i32) -> anyhow::Result<i32>;
    fn bind_selector(&mut self, window: &str, selector: SharedSelector) -> anyhow::Result<()>;
}

/// highgui windows, destroyed when the handle is dropped.
pub struct HighGuiDisplay {
    windows: Vec<String>,
}

impl HighGuiDisplay {
    pub fn open(windows: &[&str]) -> anyhow::Result<Self> {
        let windows = create_windows(
            windows,
            |window| highgui::named_window(window, highgui::WINDOW_AUTOSIZE),
            highgui::destroy_window,
        )?;

        Ok(Self { windows })
    }
}

/// Creates `windows` in order. When one fails, the ones created before it
/// are destroyed again and the error is returned.
fn create_windows(
    windows: &[&str],
    mut create: impl FnMut(&str) -> opencv::Result<()>,
    destroy: impl FnMut(&str) -> opencv::Result<()>,
) -> anyhow::Result<Vec<String>> {
    let mut created = Vec::with_capacity(windows.len());
    for window in windows {
        if let Err(e) = create(*window) {
            destroy_windows(&created, destroy);
            return Err(e.into());
        }
        created.push(window.to_string());
    }

    Ok(created)
}

fn destroy_windows(windows: &[String], mut destroy: impl FnMut(&str) -> opencv::Result<()>) {
    for window in windows.iter().rev() {
        if let Err(e) = destroy(window) {
            log::debug!("Failed to destroy window {window}: {e}");
        }
    }
}

impl DisplaySink for HighGuiDisplay {
    fn show(&mut self, window: &str, image: &Mat) -> anyhow::Result<()> {
        highgui::imshow(window, image)?;

        Ok(())
    }

    fn wait_key(&mut self, delay_ms: i32) -> anyhow::Result<i32> {
        Ok(highgui::wait_key(delay_ms)?)
    }

    fn bind_selector(&mut self, window: &str, selector: SharedSelector) -> anyhow::Result<()> {
        highgui::set_mouse_callback(
            window,
            Some(Box::new(move |event, x, y, flags| {
                rect_selector::lock(&selector).on_mouse(event, x, y, flags);
            })),
        )?;

        Ok(())
    }
}

impl Drop for HighGuiDisplay {
    fn drop(&mut self) {
        destroy_windows(&self.windows, highgui::destroy_window);
    }
}
