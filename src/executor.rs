//! Resumable stroke playback.
//!
//! The controller walks a [`StrokeMap`] in paint order and turns every
//! stroke into a press-drag-release on an [`InputTarget`]. Pause and cancel
//! requests arrive through a [`PlaybackHandle`] that may live on another
//! thread; they are sampled between strokes only, so a drag is never left
//! half drawn.

use crate::error::{Result, StrokeError};
use crate::input::{InputTarget, Key, MouseButton};
use crate::settings::{PausePolicy, PlaybackSettings, Settings, ToolConfig};
use crate::strokes::{Color, Point, Stroke, StrokeMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

const PAUSE_POLL: Duration = Duration::from_millis(50);
const SWATCH_CLICKS: u32 = 2;
const SWATCH_CLICK_INTERVAL: Duration = Duration::from_millis(250);
/// Tabs from the custom color button to the red channel field.
const CUSTOM_COLOR_TABS: usize = 7;
/// Screen pixels between interpolated drag points.
const INTERPOLATION_SPACING: f64 = 20.0;

/// Resumable cursor into a stroke map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawState {
    pub color_index: usize,
    pub stroke_index: usize,
    pub was_paused: bool,
    /// Color active when the run was interrupted.
    pub paused_color: Option<Color>,
}

impl DrawState {
    pub fn is_clean(&self) -> bool {
        *self == DrawState::default()
    }

    /// Strokes of `map` already drawn when this cursor was saved.
    pub fn strokes_before(&self, map: &StrokeMap) -> usize {
        map.layers()
            .iter()
            .take(self.color_index)
            .map(|l| l.strokes.len())
            .sum::<usize>()
            + self.stroke_index
    }

    /// Where the pointer was released by the last stroke before this cursor.
    pub fn last_end(&self, map: &StrokeMap) -> Option<Point> {
        self.strokes_before(map)
            .checked_sub(1)
            .and_then(|i| map.strokes_in_order().nth(i))
            .map(|(_, s)| s.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Paused,
    Cancelled,
}

/// Estimated playback duration.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Eta(pub Duration);

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs_f64();
        if secs < 60.0 {
            return write!(f, "{secs:.1}s");
        }
        let total = secs.round() as u64;
        let (h, m, s) = (total / 3600, total % 3600 / 60, total % 60);
        if h > 0 {
            write!(f, "{h}h {m:02}m {s:02}s")
        } else {
            write!(f, "{m}m {s:02}s")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressReport {
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
    /// Running-average projection; `None` until a stroke has finished.
    pub remaining: Option<Duration>,
}

impl ProgressReport {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

#[derive(Debug, Default)]
struct ControlSignals {
    paused: AtomicBool,
    cancelled: AtomicBool,
}

#[derive(Debug, Default)]
struct Shared {
    state: PlaybackState,
    checkpoint: DrawState,
    progress: ProgressReport,
}

/// Cloneable remote control for a running controller.
#[derive(Debug, Clone, Default)]
pub struct PlaybackHandle {
    signals: Arc<ControlSignals>,
    shared: Arc<Mutex<Shared>>,
}

impl PlaybackHandle {
    pub fn pause(&self) {
        self.signals.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.signals.paused.store(false, Ordering::SeqCst);
    }

    /// Flip the pause flag; returns the new value.
    pub fn toggle_pause(&self) -> bool {
        !self.signals.paused.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.signals.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.signals.paused.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.signals.cancelled.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state
    }

    pub fn checkpoint(&self) -> DrawState {
        self.lock().checkpoint
    }

    pub fn progress(&self) -> ProgressReport {
        self.lock().progress
    }

    fn clear_signals(&self) {
        self.signals.paused.store(false, Ordering::SeqCst);
        self.signals.cancelled.store(false, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Interrupt {
    None,
    /// Blocked on pause and came back; the active color must be re-selected.
    Resumed,
    Paused,
    Cancelled,
}

pub struct ExecutionController {
    settings: Settings,
    playback: PlaybackSettings,
    tools: ToolConfig,
    handle: PlaybackHandle,
}

impl ExecutionController {
    pub fn new(settings: Settings, playback: PlaybackSettings, tools: ToolConfig) -> Self {
        Self {
            settings,
            playback,
            tools,
            handle: PlaybackHandle::default(),
        }
    }

    pub fn handle(&self) -> PlaybackHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.handle.state()
    }

    pub fn checkpoint(&self) -> DrawState {
        self.handle.checkpoint()
    }

    /// `Σ stroke delay + Σ jump delay + colors × switch overhead`.
    pub fn estimate(&self, map: &StrokeMap) -> Eta {
        let mut secs = 0.0;
        let mut last_end: Option<Point> = None;
        for (_, stroke) in map.strokes_in_order() {
            secs += self.settings.delay;
            if self.is_jump(last_end, stroke) {
                secs += self.settings.jump_delay;
            }
            last_end = Some(stroke.end);
        }
        secs += map.len() as f64 * self.playback.color_switch_overhead;
        Eta(Duration::try_from_secs_f64(secs).unwrap_or_default())
    }

    /// Start a fresh run from the first stroke.
    pub fn begin(&mut self, map: &StrokeMap, target: &mut dyn InputTarget) -> Result<RunOutcome> {
        self.reset();
        self.play(map, target, None)
    }

    /// Continue from the saved checkpoint.
    pub fn resume(&mut self, map: &StrokeMap, target: &mut dyn InputTarget) -> Result<RunOutcome> {
        self.handle.clear_signals();
        self.play(map, target, None)
    }

    /// Resume a paused checkpoint, otherwise begin afresh.
    pub fn run(&mut self, map: &StrokeMap, target: &mut dyn InputTarget) -> Result<RunOutcome> {
        if self.checkpoint().was_paused {
            self.resume(map, target)
        } else {
            self.begin(map, target)
        }
    }

    /// Draw only the first `max_strokes` strokes in paint order.
    pub fn test_draw(
        &mut self,
        map: &StrokeMap,
        target: &mut dyn InputTarget,
        max_strokes: usize,
    ) -> Result<RunOutcome> {
        self.reset();
        self.play(map, target, Some(max_strokes))
    }

    fn reset(&mut self) {
        self.handle.clear_signals();
        let mut shared = self.handle.lock();
        shared.checkpoint = DrawState::default();
        shared.state = PlaybackState::Idle;
    }

    fn set_state(&self, state: PlaybackState) {
        self.handle.lock().state = state;
    }

    fn save_checkpoint(&self, checkpoint: DrawState) {
        self.handle.lock().checkpoint = checkpoint;
    }

    fn play(
        &mut self,
        map: &StrokeMap,
        target: &mut dyn InputTarget,
        limit: Option<usize>,
    ) -> Result<RunOutcome> {
        self.settings.validate()?;
        self.validate_selection(map)?;

        let start = self.checkpoint();
        let total = limit.map_or(map.total_strokes(), |l| l.min(map.total_strokes()));
        let already = start.strokes_before(map);
        {
            let mut shared = self.handle.lock();
            shared.state = PlaybackState::Running;
            shared.progress = ProgressReport {
                completed: already.min(total),
                total,
                ..Default::default()
            };
        }
        tracing::info!(
            colors = map.len(),
            strokes = total,
            resumed_at = already,
            eta = %self.estimate(map),
            "playback started"
        );

        let mut cursor = (start.color_index, start.stroke_index);
        match self.play_strokes(map, target, start, limit, &mut cursor) {
            Ok(RunOutcome::Completed) => {
                self.save_checkpoint(DrawState::default());
                self.set_state(PlaybackState::Completed);
                tracing::info!("playback completed");
                Ok(RunOutcome::Completed)
            }
            Ok(RunOutcome::Paused) => {
                self.set_state(PlaybackState::Paused);
                tracing::info!(checkpoint = ?self.checkpoint(), "playback paused");
                Ok(RunOutcome::Paused)
            }
            Ok(RunOutcome::Cancelled) => {
                self.release_button(target);
                self.handle.clear_signals();
                self.set_state(PlaybackState::Cancelled);
                tracing::info!(checkpoint = ?self.checkpoint(), "playback cancelled");
                Ok(RunOutcome::Cancelled)
            }
            Err(err) => {
                self.release_button(target);
                let active = map.layers().get(cursor.0).map(|l| l.color);
                self.save_checkpoint(DrawState {
                    color_index: cursor.0,
                    stroke_index: cursor.1,
                    was_paused: false,
                    paused_color: active,
                });
                self.set_state(PlaybackState::Idle);
                let err = match err.downcast::<StrokeError>() {
                    Ok(e) => e,
                    Err(e) => StrokeError::Input(e),
                };
                tracing::warn!(error = %err, "playback aborted");
                Err(err)
            }
        }
    }

    fn play_strokes(
        &self,
        map: &StrokeMap,
        target: &mut dyn InputTarget,
        start: DrawState,
        limit: Option<usize>,
        cursor: &mut (usize, usize),
    ) -> anyhow::Result<RunOutcome> {
        let clock = Instant::now();
        let mut drawn = start.strokes_before(map);
        let mut drawn_this_run = 0usize;
        let mut last_end = start.last_end(map);

        for (ci, layer) in map.layers().iter().enumerate().skip(start.color_index) {
            let first = if ci == start.color_index { start.stroke_index } else { 0 };
            if first >= layer.strokes.len() {
                continue;
            }
            let active = match start.paused_color {
                Some(saved) if ci == start.color_index => saved,
                _ => layer.color,
            };
            if limit.is_some_and(|l| drawn >= l) {
                return Ok(RunOutcome::Completed);
            }
            *cursor = (ci, first);
            self.select_color(active, target)?;

            for (si, stroke) in layer.strokes.iter().enumerate().skip(first) {
                if limit.is_some_and(|l| drawn >= l) {
                    return Ok(RunOutcome::Completed);
                }
                *cursor = (ci, si);
                match self.check_signals(ci, si, active) {
                    Interrupt::None => {}
                    Interrupt::Resumed => self.select_color(active, target)?,
                    Interrupt::Paused => return Ok(RunOutcome::Paused),
                    Interrupt::Cancelled => return Ok(RunOutcome::Cancelled),
                }

                if self.is_jump(last_end, stroke) {
                    thread::sleep(self.settings.jump_delay());
                }
                self.draw_stroke(stroke, target)?;
                last_end = Some(stroke.end);
                drawn += 1;
                drawn_this_run += 1;
                self.report_progress(drawn, drawn_this_run, clock.elapsed());
            }
        }
        Ok(RunOutcome::Completed)
    }

    fn check_signals(&self, ci: usize, si: usize, active: Color) -> Interrupt {
        let mut checkpoint = DrawState {
            color_index: ci,
            stroke_index: si,
            was_paused: false,
            paused_color: Some(active),
        };
        if self.handle.is_cancelled() {
            self.save_checkpoint(checkpoint);
            return Interrupt::Cancelled;
        }
        if !self.handle.is_paused() {
            return Interrupt::None;
        }

        checkpoint.was_paused = true;
        self.save_checkpoint(checkpoint);
        if self.playback.pause_policy == PausePolicy::Yield {
            return Interrupt::Paused;
        }

        self.set_state(PlaybackState::Paused);
        tracing::info!(color_index = ci, stroke_index = si, "paused, waiting");
        while self.handle.is_paused() {
            if self.handle.is_cancelled() {
                checkpoint.was_paused = false;
                self.save_checkpoint(checkpoint);
                return Interrupt::Cancelled;
            }
            thread::sleep(PAUSE_POLL);
        }
        if self.handle.is_cancelled() {
            checkpoint.was_paused = false;
            self.save_checkpoint(checkpoint);
            return Interrupt::Cancelled;
        }
        checkpoint.was_paused = false;
        self.save_checkpoint(checkpoint);
        self.set_state(PlaybackState::Running);
        tracing::info!("resumed");
        Interrupt::Resumed
    }

    fn is_jump(&self, last_end: Option<Point>, stroke: &Stroke) -> bool {
        last_end.is_some_and(|p| p.distance(&stroke.start) > self.playback.jump_threshold)
    }

    fn report_progress(&self, drawn: usize, drawn_this_run: usize, elapsed: Duration) {
        let mut shared = self.handle.lock();
        let total = shared.progress.total;
        let remaining = (drawn_this_run > 0)
            .then(|| elapsed.mul_f64(total.saturating_sub(drawn) as f64 / drawn_this_run as f64));
        shared.progress = ProgressReport {
            completed: drawn,
            total,
            elapsed,
            remaining,
        };
    }

    /// One atomic drag: move, press, interpolate, release.
    fn draw_stroke(&self, stroke: &Stroke, target: &mut dyn InputTarget) -> anyhow::Result<()> {
        let steps = interpolation_steps(stroke);
        let pause = self.settings.stroke_delay() / (steps as u32 + 1);

        target.move_to(stroke.start)?;
        target.press(MouseButton::Left)?;
        for i in 1..=steps {
            let t = i as f64 / (steps + 1) as f64;
            let point = Point::new(
                lerp(stroke.start.x, stroke.end.x, t),
                lerp(stroke.start.y, stroke.end.y, t),
            );
            thread::sleep(pause);
            target.move_to(point)?;
        }
        thread::sleep(pause);
        target.move_to(stroke.end)?;
        target.release(MouseButton::Left)
    }

    fn select_color(&self, color: Color, target: &mut dyn InputTarget) -> anyhow::Result<()> {
        if let Some(button) = self.tools.new_layer.as_ref().filter(|b| b.enabled) {
            for &m in &button.modifiers {
                target.key_down(m.into())?;
            }
            target.click(button.position, 1, Duration::ZERO)?;
            for &m in button.modifiers.iter().rev() {
                target.key_up(m.into())?;
            }
        }

        if let Some(position) = self.tools.palette.as_ref().and_then(|p| p.position_of(color)) {
            tracing::debug!(r = color.r, g = color.g, b = color.b, "selecting swatch");
            return target.click(position, SWATCH_CLICKS, SWATCH_CLICK_INTERVAL);
        }

        let region = self.tools.custom_colors()?;
        tracing::debug!(r = color.r, g = color.g, b = color.b, "entering custom color");
        target.click(region.center(), SWATCH_CLICKS, SWATCH_CLICK_INTERVAL)?;
        for _ in 0..CUSTOM_COLOR_TABS {
            target.key_press(Key::Tab)?;
        }
        for channel in [color.r, color.g, color.b] {
            target.type_text(&channel.to_string())?;
            target.key_press(Key::Tab)?;
        }
        target.key_press(Key::Tab)?;
        target.key_press(Key::Enter)
    }

    /// Every color needs a swatch or a custom color region before any
    /// input is injected.
    fn validate_selection(&self, map: &StrokeMap) -> Result<()> {
        let palette = self.tools.palette.as_ref();
        for color in map.colors() {
            if palette.and_then(|p| p.position_of(color)).is_some() {
                continue;
            }
            if self.tools.custom_colors.is_none() {
                return Err(match palette {
                    Some(p) if !p.is_empty() => StrokeError::NoCustomColors,
                    _ => StrokeError::NoPalette,
                });
            }
        }
        Ok(())
    }

    fn release_button(&self, target: &mut dyn InputTarget) {
        if let Err(err) = target.release(MouseButton::Left) {
            tracing::warn!(error = %err, "failed to release pointer button");
        }
    }
}

fn interpolation_steps(stroke: &Stroke) -> usize {
    ((stroke.length() / INTERPOLATION_SPACING).round() as usize).clamp(2, 10)
}

fn lerp(a: i32, b: i32, t: f64) -> i32 {
    (f64::from(a) + f64::from(b - a) * t).round() as i32
}
