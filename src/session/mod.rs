//! Playback state and every operation that moves, mutates or redraws it.
//!
//! A [`Session`] owns the catalog, the playback state, the window geometry
//! and the timers. It is driven from a single event-processing context: one
//! key press or timer callback at a time, so nothing here locks.

mod render;

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info};

use crate::catalog::{Catalog, CatalogBuild, Direction, ImagePath, ScanOptions};
use crate::config::Settings;
use crate::error::Error;
use crate::events::{Command, Flow, TimerKind};
use crate::geometry::Geometry;
use crate::services::{DecodedImage, ImageService, Screen, Trash};
use crate::tasks::files::DeletionLog;
use crate::timers::{TimerHandle, TimerQueue, TimerSlot};

/// Position and mode of the slideshow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    pub index: usize,
    /// Index before the most recent move; [`Session::go_back`] returns here.
    pub previous: usize,
    pub paused: bool,
    pub shuffled: bool,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    /// Nothing left to show; the session should end.
    Empty,
}

/// How to move on when the image a transition landed on cannot be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    /// Same rule as auto-advance: random when shuffled, else forward.
    Next,
    Step(Direction),
    Random,
}

/// The image currently on screen.
#[derive(Debug)]
struct Shown {
    path: ImagePath,
    image: DecodedImage,
    frame: usize,
}

#[derive(Debug, Clone)]
struct Tuning {
    min_delay: Duration,
    delay_step: Duration,
    resize_debounce: Duration,
    rescan_debounce: Duration,
    min_frame_delay: Duration,
    windowed: Geometry,
}

pub struct Session<S, I, T> {
    scan: ScanOptions,
    tuning: Tuning,
    catalog: Catalog,
    state: PlaybackState,
    phase: Phase,
    fullscreen: bool,
    zoomed: bool,
    target: (u32, u32),
    timers: TimerQueue,
    advance: TimerSlot,
    frame: TimerSlot,
    resize: TimerSlot,
    rescan: TimerSlot,
    shown: Option<Shown>,
    deletion_log: Option<DeletionLog>,
    rng: StdRng,
    screen: S,
    images: I,
    trash: T,
}

impl<S, I, T> Session<S, I, T>
where
    S: Screen,
    I: ImageService,
    T: Trash,
{
    /// Create a session positioned on the build's anchor.
    ///
    /// # Errors
    /// Returns [`Error::EmptyCatalog`] when the build found nothing to show.
    pub fn new(
        settings: &Settings,
        build: CatalogBuild,
        screen: S,
        images: I,
        trash: T,
    ) -> Result<Self, Error> {
        if build.catalog.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        let geometry = settings.geometry;
        let target = if settings.fullscreen {
            screen
                .monitor_size()
                .unwrap_or((geometry.width, geometry.height))
        } else {
            (geometry.width, geometry.height)
        };
        Ok(Self {
            scan: settings.scan.clone(),
            tuning: Tuning {
                min_delay: settings.min_delay,
                delay_step: settings.delay_step,
                resize_debounce: settings.resize_debounce,
                rescan_debounce: settings.rescan_debounce,
                min_frame_delay: settings.min_frame_delay,
                windowed: geometry,
            },
            catalog: build.catalog,
            state: PlaybackState {
                index: build.anchor,
                previous: build.anchor,
                paused: settings.paused,
                shuffled: settings.shuffled,
                delay: settings.delay.max(settings.min_delay),
            },
            phase: Phase::Running,
            fullscreen: settings.fullscreen,
            zoomed: settings.zoomed,
            target,
            timers: TimerQueue::new(),
            advance: TimerSlot::new(TimerKind::Advance),
            frame: TimerSlot::new(TimerKind::Frame),
            resize: TimerSlot::new(TimerKind::Resize),
            rescan: TimerSlot::new(TimerKind::Rescan),
            shown: None,
            deletion_log: settings.deletion_log.clone().map(DeletionLog::new),
            rng: StdRng::from_os_rng(),
            screen,
            images,
            trash,
        })
    }

    /// Replace the random source, e.g. with a seeded one.
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    #[must_use]
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn current(&self) -> Option<&ImagePath> {
        self.catalog.get(self.state.index)
    }

    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    #[must_use]
    pub fn is_zoomed(&self) -> bool {
        self.zoomed
    }

    /// Size images are fitted to in zoomed mode.
    #[must_use]
    pub fn target_size(&self) -> (u32, u32) {
        self.target
    }

    #[must_use]
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    #[must_use]
    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Show the initial image and start the advance clock.
    pub fn start(&mut self) -> Flow {
        if self.phase == Phase::Empty {
            return Flow::Exit;
        }
        info!(
            count = self.catalog.len(),
            index = self.state.index,
            delay = %humantime::format_duration(self.state.delay),
            paused = self.state.paused,
            shuffled = self.state.shuffled,
            "slideshow started"
        );
        self.show(Retry::Next);
        self.rearm();
        Flow::Continue
    }

    /// Run every timer due at `now`, one at a time.
    pub fn run_due_timers(&mut self, now: Instant) -> Flow {
        for (handle, kind) in self.timers.take_due(now) {
            if self.on_timer(handle, kind) == Flow::Exit {
                return Flow::Exit;
            }
        }
        self.flow()
    }

    /// Dispatch a fired timer. Handles no longer owned by their slot are
    /// ignored.
    pub fn on_timer(&mut self, handle: TimerHandle, kind: TimerKind) -> Flow {
        match kind {
            TimerKind::Advance if self.advance.fired(handle) => self.advance_auto(),
            TimerKind::Frame if self.frame.fired(handle) => self.next_frame(),
            TimerKind::Resize if self.resize.fired(handle) => self.rerender(),
            TimerKind::Rescan if self.rescan.fired(handle) => self.reload(),
            _ => self.flow(),
        }
    }

    pub fn dispatch(&mut self, cmd: Command) -> Flow {
        if cmd == Command::Quit {
            info!("quit requested");
            return Flow::Exit;
        }
        if self.phase == Phase::Empty {
            return Flow::Exit;
        }
        debug!(?cmd, index = self.state.index, "command");
        match cmd {
            Command::Next => self.next(),
            Command::Prev => self.prev(),
            Command::Random => self.random(),
            Command::Back => self.go_back(),
            Command::NextDirectory => self.jump_to_directory_boundary(Direction::Forward),
            Command::PrevDirectory => self.jump_to_directory_boundary(Direction::Backward),
            Command::ToggleShuffle => {
                self.toggle_shuffle();
                Flow::Continue
            }
            Command::TogglePause => {
                self.toggle_pause();
                Flow::Continue
            }
            Command::Slower => {
                self.adjust_delay(duration_ms(self.tuning.delay_step));
                Flow::Continue
            }
            Command::Faster => {
                self.adjust_delay(-duration_ms(self.tuning.delay_step));
                Flow::Continue
            }
            Command::DeleteCurrent => {
                let res = self.delete_current();
                self.settle(res)
            }
            Command::DeleteDirectory => {
                let res = self.delete_current_directory();
                self.settle(res)
            }
            Command::Reload => self.reload(),
            Command::ToggleFullscreen => self.toggle_fullscreen(),
            Command::ToggleZoom => self.toggle_zoom(),
            Command::Quit => Flow::Exit,
        }
    }

    fn settle(&mut self, res: Result<Flow, Error>) -> Flow {
        match res {
            Ok(flow) => flow,
            Err(err) => {
                error!(error = %err, "delete failed");
                self.screen.set_title(&format!("delete failed: {err}"));
                Flow::Continue
            }
        }
    }

    /// Timer-driven advance: moves unless paused, always re-arms.
    pub fn advance_auto(&mut self) -> Flow {
        if self.phase == Phase::Empty {
            return Flow::Exit;
        }
        if !self.state.paused {
            self.pick_next();
            self.show(Retry::Next);
        }
        self.rearm();
        Flow::Continue
    }

    /// Random when shuffled, else one step forward.
    pub fn pick_next(&mut self) {
        if self.state.shuffled {
            self.pick_random();
        } else {
            let n = self.catalog.len();
            if n > 0 {
                self.move_to(Direction::Forward.step(self.state.index, n));
            }
        }
    }

    /// Uniform choice among every index except the current one.
    pub fn pick_random(&mut self) {
        let n = self.catalog.len();
        if n < 2 {
            return;
        }
        let drawn = self.rng.random_range(0..n - 1);
        let index = if drawn >= self.state.index {
            drawn + 1
        } else {
            drawn
        };
        self.move_to(index);
    }

    pub fn next(&mut self) -> Flow {
        self.navigate(|s| s.pick_next(), Retry::Next)
    }

    pub fn prev(&mut self) -> Flow {
        self.navigate(
            |s| {
                let n = s.catalog.len();
                s.move_to(Direction::Backward.step(s.state.index, n));
            },
            Retry::Step(Direction::Backward),
        )
    }

    pub fn random(&mut self) -> Flow {
        self.navigate(Self::pick_random, Retry::Random)
    }

    /// Swap the current and previous positions.
    pub fn go_back(&mut self) -> Flow {
        self.navigate(
            |s| {
                let last = s.catalog.len() - 1;
                let back = s.state.previous.min(last);
                s.move_to(back);
            },
            Retry::Step(Direction::Forward),
        )
    }

    /// Move to the neighbouring directory in `dir`.
    ///
    /// Forward lands on the first entry of the next directory, backward on
    /// the first entry of the previous one. With a single directory this is
    /// an ordinary step.
    pub fn jump_to_directory_boundary(&mut self, dir: Direction) -> Flow {
        self.navigate(
            move |s| {
                let index = s.state.index;
                let n = s.catalog.len();
                let target = match (s.catalog.run_boundary(index, dir), dir) {
                    (Some(first), Direction::Forward) => first,
                    (Some(last), Direction::Backward) => s.catalog.run_start(last, index),
                    (None, _) => dir.step(index, n),
                };
                s.move_to(target);
            },
            Retry::Step(dir),
        )
    }

    pub fn toggle_shuffle(&mut self) {
        self.state.shuffled = !self.state.shuffled;
        info!(shuffled = self.state.shuffled, "shuffle toggled");
        self.update_title();
    }

    /// Pausing leaves the timer armed; paused ticks simply skip the move.
    pub fn toggle_pause(&mut self) {
        self.state.paused = !self.state.paused;
        info!(paused = self.state.paused, "pause toggled");
        self.update_title();
    }

    /// Change the delay by `delta_ms`, never going below the minimum.
    /// The pending timer keeps its deadline.
    pub fn adjust_delay(&mut self, delta_ms: i64) {
        let delta = Duration::from_millis(delta_ms.unsigned_abs());
        let delay = if delta_ms >= 0 {
            self.state.delay.saturating_add(delta)
        } else {
            self.state.delay.saturating_sub(delta)
        };
        self.state.delay = delay.max(self.tuning.min_delay);
        info!(delay = %humantime::format_duration(self.state.delay), "delay adjusted");
    }

    /// Delete the current file and drop it from the catalog.
    ///
    /// # Errors
    /// Returns [`Error::Delete`] when the trash refuses; nothing changes then.
    pub fn delete_current(&mut self) -> Result<Flow, Error> {
        let Some(path) = self.current().cloned() else {
            return Ok(Flow::Exit);
        };
        let removed = self.state.index;
        self.trash
            .delete(path.as_path())
            .map_err(|source| Error::Delete {
                path: path.as_path().to_path_buf(),
                source,
            })?;
        self.record_deletion(path.as_path());
        self.catalog.remove_at(removed);
        info!(path = %path, remaining = self.catalog.len(), "deleted file");

        let n = self.catalog.len();
        if n == 0 {
            return Ok(self.enter_empty());
        }
        if removed >= n {
            self.state.index = 0;
        }
        let previous = self.state.previous;
        self.state.previous = if previous > removed {
            previous - 1
        } else if previous == removed {
            self.state.index
        } else {
            previous
        }
        .min(n - 1);
        self.advance.cancel(&mut self.timers);
        self.show(Retry::Step(Direction::Forward));
        self.rearm();
        Ok(Flow::Continue)
    }

    /// Delete the current file's directory and rebuild the catalog.
    ///
    /// Lands on the first entry after the last image of the directory that
    /// preceded the deleted one.
    ///
    /// # Errors
    /// Returns [`Error::Delete`] when the trash refuses; nothing changes then.
    pub fn delete_current_directory(&mut self) -> Result<Flow, Error> {
        let Some(current) = self.current().cloned() else {
            return Ok(Flow::Exit);
        };
        let dir = current.parent().to_path_buf();
        let before = self
            .catalog
            .run_boundary(self.state.index, Direction::Backward)
            .and_then(|i| self.catalog.get(i).cloned());

        self.trash.delete(&dir).map_err(|source| Error::Delete {
            path: dir.clone(),
            source,
        })?;
        self.record_deletion(&dir);

        let build = Catalog::build(&self.scan);
        self.catalog = build.catalog;
        info!(dir = %dir.display(), remaining = self.catalog.len(), "deleted directory");

        let n = self.catalog.len();
        if n == 0 {
            return Ok(self.enter_empty());
        }
        let index = match before {
            Some(anchor) => match self.catalog.search(&anchor) {
                Ok(pos) => (pos + 1) % n,
                Err(pos) => pos % n,
            },
            None => 0,
        };
        self.state.previous = self.state.index.min(n - 1);
        self.state.index = index;
        self.advance.cancel(&mut self.timers);
        self.show(Retry::Step(Direction::Forward));
        self.rearm();
        Ok(Flow::Continue)
    }

    /// Rebuild the catalog from the configured roots, keeping the current
    /// image in place when it still exists.
    pub fn reload(&mut self) -> Flow {
        let current = self.current().cloned();
        let previous = self.catalog.get(self.state.previous).cloned();

        let build = Catalog::build(&self.scan);
        self.catalog = build.catalog;
        let n = self.catalog.len();
        if n == 0 {
            return self.enter_empty();
        }
        self.phase = Phase::Running;

        let found = current.as_ref().and_then(|p| self.catalog.position_of(p));
        match found {
            Some(index) => {
                self.state.index = index;
                self.state.previous = previous
                    .and_then(|p| self.catalog.position_of(&p))
                    .unwrap_or(index);
            }
            None => {
                self.state.index = 0;
                self.state.previous = 0;
            }
        }
        info!(count = n, index = self.state.index, skipped = build.skipped, "catalog reloaded");

        let on_screen = self.shown.as_ref().map(|s| &s.path);
        if on_screen != self.current() {
            self.show(Retry::Step(Direction::Forward));
        } else {
            self.update_title();
        }
        if self.advance.handle().is_none() {
            self.rearm();
        }
        Flow::Continue
    }

    /// Schedule a reload once file-system changes have been quiet for a while.
    pub fn schedule_rescan(&mut self) {
        self.rescan
            .arm(&mut self.timers, self.tuning.rescan_debounce);
    }

    /// Record a new window size and debounce the re-render.
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == self.target {
            return;
        }
        self.target = (width, height);
        debug!(width, height, "resize; re-render debounced");
        self.resize
            .arm(&mut self.timers, self.tuning.resize_debounce);
    }

    pub fn toggle_fullscreen(&mut self) -> Flow {
        self.fullscreen = !self.fullscreen;
        let windowed = (self.tuning.windowed.width, self.tuning.windowed.height);
        self.target = if self.fullscreen {
            self.screen.monitor_size().unwrap_or(windowed)
        } else {
            windowed
        };
        info!(fullscreen = self.fullscreen, width = self.target.0, height = self.target.1, "fullscreen toggled");
        self.screen.set_fullscreen(self.fullscreen);
        self.rerender()
    }

    pub fn toggle_zoom(&mut self) -> Flow {
        self.zoomed = !self.zoomed;
        info!(zoomed = self.zoomed, "zoom toggled");
        self.rerender()
    }

    /// Cancel the advance timer, apply `step`, show the result, re-arm.
    fn navigate(&mut self, step: impl FnOnce(&mut Self), retry: Retry) -> Flow {
        if self.phase == Phase::Empty || self.catalog.is_empty() {
            return Flow::Exit;
        }
        self.advance.cancel(&mut self.timers);
        step(self);
        self.show(retry);
        self.rearm();
        Flow::Continue
    }

    fn move_to(&mut self, index: usize) {
        self.state.previous = self.state.index;
        self.state.index = index;
        debug!(index, previous = self.state.previous, "moved");
    }

    fn apply_retry(&mut self, retry: Retry) {
        let n = self.catalog.len();
        match retry {
            Retry::Next => self.pick_next(),
            Retry::Step(dir) => self.move_to(dir.step(self.state.index, n)),
            Retry::Random => self.pick_random(),
        }
    }

    fn rearm(&mut self) {
        if self.phase == Phase::Running {
            self.advance.arm(&mut self.timers, self.state.delay);
        }
    }

    fn record_deletion(&self, path: &std::path::Path) {
        if let Some(log) = &self.deletion_log {
            log.record(path);
        }
    }

    fn enter_empty(&mut self) -> Flow {
        info!("catalog is empty; ending session");
        self.phase = Phase::Empty;
        self.advance.cancel(&mut self.timers);
        self.frame.cancel(&mut self.timers);
        self.resize.cancel(&mut self.timers);
        self.rescan.cancel(&mut self.timers);
        self.timers.clear();
        self.shown = None;
        self.state.index = 0;
        self.state.previous = 0;
        Flow::Exit
    }

    fn flow(&self) -> Flow {
        match self.phase {
            Phase::Running => Flow::Continue,
            Phase::Empty => Flow::Exit,
        }
    }
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
