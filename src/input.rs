//! The seam to the host automation layer that actually moves the pointer
//! and presses keys.

use crate::settings::Modifier;
use crate::strokes::Point;
use anyhow::Result;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab,
    Enter,
    Ctrl,
    Alt,
    Shift,
    Char(char),
}

impl From<Modifier> for Key {
    fn from(m: Modifier) -> Self {
        match m {
            Modifier::Ctrl => Key::Ctrl,
            Modifier::Alt => Key::Alt,
            Modifier::Shift => Key::Shift,
        }
    }
}

/// Pointer and keyboard primitives. Every call is best effort; an `Err`
/// aborts playback after the pointer button has been released.
pub trait InputTarget {
    fn move_to(&mut self, point: Point) -> Result<()>;

    fn press(&mut self, button: MouseButton) -> Result<()>;

    fn release(&mut self, button: MouseButton) -> Result<()>;

    fn click(&mut self, point: Point, clicks: u32, interval: Duration) -> Result<()>;

    fn key_down(&mut self, key: Key) -> Result<()>;

    fn key_up(&mut self, key: Key) -> Result<()>;

    fn key_press(&mut self, key: Key) -> Result<()> {
        self.key_down(key)?;
        self.key_up(key)
    }

    fn type_text(&mut self, text: &str) -> Result<()> {
        for c in text.chars() {
            self.key_press(Key::Char(c))?;
        }
        Ok(())
    }
}

/// One recorded primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    MoveTo(Point),
    Press(MouseButton),
    Release(MouseButton),
    Click { point: Point, clicks: u32 },
    KeyDown(Key),
    KeyUp(Key),
}

type Hook = Box<dyn FnMut(&Action) -> Result<()> + Send>;

/// Records every action; an optional hook observes (or fails) each one.
#[derive(Default)]
pub struct RecordingTarget {
    pub actions: Vec<Action>,
    hook: Option<Hook>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(hook: impl FnMut(&Action) -> Result<()> + Send + 'static) -> Self {
        Self {
            actions: Vec::new(),
            hook: Some(Box::new(hook)),
        }
    }

    fn record(&mut self, action: Action) -> Result<()> {
        if let Some(hook) = self.hook.as_mut() {
            hook(&action)?;
        }
        self.actions.push(action);
        Ok(())
    }

    /// `(start, end)` of every completed press..release drag.
    pub fn drags(&self) -> Vec<(Point, Point)> {
        let mut drags = Vec::new();
        let mut cursor = Point::default();
        let mut start = None;
        for action in &self.actions {
            match action {
                Action::MoveTo(p) => cursor = *p,
                Action::Click { point, .. } => cursor = *point,
                Action::Press(MouseButton::Left) => start = Some(cursor),
                Action::Release(MouseButton::Left) => {
                    if let Some(s) = start.take() {
                        drags.push((s, cursor));
                    }
                }
                _ => {}
            }
        }
        drags
    }

    pub fn clicks(&self) -> Vec<Point> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Click { point, .. } => Some(*point),
                _ => None,
            })
            .collect()
    }

    /// Whether the left button ends up released.
    pub fn button_released(&self) -> bool {
        self.actions
            .iter()
            .rev()
            .find_map(|a| match a {
                Action::Press(MouseButton::Left) => Some(false),
                Action::Release(MouseButton::Left) => Some(true),
                _ => None,
            })
            .unwrap_or(true)
    }
}

impl InputTarget for RecordingTarget {
    fn move_to(&mut self, point: Point) -> Result<()> {
        self.record(Action::MoveTo(point))
    }

    fn press(&mut self, button: MouseButton) -> Result<()> {
        self.record(Action::Press(button))
    }

    fn release(&mut self, button: MouseButton) -> Result<()> {
        self.record(Action::Release(button))
    }

    fn click(&mut self, point: Point, clicks: u32, _interval: Duration) -> Result<()> {
        self.record(Action::Click { point, clicks })
    }

    fn key_down(&mut self, key: Key) -> Result<()> {
        self.record(Action::KeyDown(key))
    }

    fn key_up(&mut self, key: Key) -> Result<()> {
        self.record(Action::KeyUp(key))
    }
}

/// Dry-run target: every action becomes a `tracing` event.
#[derive(Debug, Default)]
pub struct LogTarget {
    pub actions: usize,
}

impl InputTarget for LogTarget {
    fn move_to(&mut self, point: Point) -> Result<()> {
        self.actions += 1;
        tracing::trace!(x = point.x, y = point.y, "move");
        Ok(())
    }

    fn press(&mut self, button: MouseButton) -> Result<()> {
        self.actions += 1;
        tracing::trace!(?button, "press");
        Ok(())
    }

    fn release(&mut self, button: MouseButton) -> Result<()> {
        self.actions += 1;
        tracing::trace!(?button, "release");
        Ok(())
    }

    fn click(&mut self, point: Point, clicks: u32, _interval: Duration) -> Result<()> {
        self.actions += 1;
        tracing::debug!(x = point.x, y = point.y, clicks, "click");
        Ok(())
    }

    fn key_down(&mut self, key: Key) -> Result<()> {
        self.actions += 1;
        tracing::trace!(?key, "key down");
        Ok(())
    }

    fn key_up(&mut self, key: Key) -> Result<()> {
        self.actions += 1;
        tracing::trace!(?key, "key up");
        Ok(())
    }
}
