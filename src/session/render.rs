use std::borrow::Cow;

use image::RgbaImage;
use tracing::{debug, error, warn};

use super::{Phase, Retry, Session, Shown};
use crate::events::Flow;
use crate::processing::layout::resize_to_contain;
use crate::services::{ImageService, Screen, Trash};

impl<S, I, T> Session<S, I, T>
where
    S: Screen,
    I: ImageService,
    T: Trash,
{
    /// Decode and present the current entry.
    ///
    /// An entry that fails to decode is skipped with `retry`, at most
    /// `len - 1` times, so a catalog of broken files cannot spin. `previous`
    /// keeps the value the triggering transition gave it.
    pub(super) fn show(&mut self, retry: Retry) {
        self.frame.cancel(&mut self.timers);
        let n = self.catalog.len();
        let previous = self.state.previous;
        for attempt in 0..n {
            let Some(path) = self.current().cloned() else {
                break;
            };
            match self.images.decode(path.as_path()) {
                Ok(image) => {
                    self.shown = Some(Shown {
                        path,
                        image,
                        frame: 0,
                    });
                    self.state.previous = previous;
                    self.present_frame();
                    self.update_title();
                    self.arm_frame();
                    return;
                }
                Err(err) => {
                    warn!(error = %err, attempt, "cannot display; skipping");
                    if attempt + 1 < n {
                        self.apply_retry(retry);
                    }
                }
            }
        }
        error!(count = n, "no entry could be decoded");
        self.state.previous = previous;
        self.shown = None;
        self.screen.set_title("no displayable image");
    }

    /// Present the cached image again at the current size and zoom.
    pub(super) fn rerender(&mut self) -> Flow {
        if self.phase == Phase::Empty {
            return Flow::Exit;
        }
        if self.shown.is_some() {
            self.present_frame();
        } else {
            self.frame.cancel(&mut self.timers);
            self.show(Retry::Step(crate::catalog::Direction::Forward));
        }
        Flow::Continue
    }

    pub(super) fn next_frame(&mut self) -> Flow {
        let Some(shown) = self.shown.as_mut() else {
            return self.flow();
        };
        shown.frame = (shown.frame + 1) % shown.image.frames.len();
        self.present_frame();
        self.arm_frame();
        self.flow()
    }

    pub(super) fn update_title(&mut self) {
        let title = self.title();
        self.screen.set_title(&title);
    }

    /// `name [i/N]`, plus markers for pause and shuffle.
    #[must_use]
    pub fn title(&self) -> String {
        let Some(current) = self.current() else {
            return String::from("reel");
        };
        let mut title = format!(
            "{} [{}/{}]",
            current.file_name(),
            self.state.index + 1,
            self.catalog.len()
        );
        if self.state.paused {
            title.push_str(" (paused)");
        }
        if self.state.shuffled {
            title.push_str(" (shuffle)");
        }
        title
    }

    fn present_frame(&mut self) {
        let Some(shown) = self.shown.as_ref() else {
            return;
        };
        let Some(frame) = shown.image.frames.get(shown.frame) else {
            return;
        };
        let image = if self.zoomed {
            let (tw, th) = self.target;
            let (w, h) = resize_to_contain(tw, th, frame.image.width(), frame.image.height());
            if (w, h) == frame.image.dimensions() {
                Cow::Borrowed(&frame.image)
            } else {
                match self.images.resize(&frame.image, w, h) {
                    Ok(resized) => Cow::Owned(resized),
                    Err(err) => {
                        warn!(error = %err, "resize failed; showing native size");
                        Cow::Borrowed(&frame.image)
                    }
                }
            }
        } else {
            Cow::Borrowed(&frame.image)
        };
        let image: &RgbaImage = &image;
        debug!(
            path = %shown.path,
            frame = shown.frame,
            width = image.width(),
            height = image.height(),
            "present"
        );
        self.screen.present(image);
    }

    fn arm_frame(&mut self) {
        let Some(shown) = self.shown.as_ref() else {
            return;
        };
        if !shown.image.is_animated() {
            return;
        }
        let delay = shown.image.frames[shown.frame]
            .delay
            .max(self.tuning.min_frame_delay);
        self.frame.arm(&mut self.timers, delay);
    }
}
