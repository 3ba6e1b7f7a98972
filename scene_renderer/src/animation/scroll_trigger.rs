// animation/scroll_trigger.rs - Bindings between page scroll ranges and progress callbacks

use std::str::FromStr;
use linked_hash_map::LinkedHashMap;
use crate::page::{Rect, Viewport};
use super::{normalized_progress, AnimationError, Result};

// ============================================================================
// TRIGGER POSITIONS
// ============================================================================

/// A point along an element or along the viewport, measured from its top
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    Top,
    Center,
    Bottom,
    /// Fraction of the extent, 0.9 for "90%"
    Percent(f32),
    Pixels(f32),
}

impl Anchor {
    /// Offset from the top edge for an extent of `size` pixels
    pub fn resolve(self, size: f32) -> f32 {
        match self {
            Anchor::Top => 0.0,
            Anchor::Center => size * 0.5,
            Anchor::Bottom => size,
            Anchor::Percent(fraction) => size * fraction,
            Anchor::Pixels(px) => px,
        }
    }
}

impl FromStr for Anchor {
    type Err = AnimationError;

    fn from_str(token: &str) -> Result<Self> {
        let invalid = || AnimationError::InvalidTriggerPosition(token.to_string());
        match token {
            "top" => Ok(Anchor::Top),
            "center" => Ok(Anchor::Center),
            "bottom" => Ok(Anchor::Bottom),
            _ => {
                if let Some(pct) = token.strip_suffix('%') {
                    pct.parse::<f32>().map(|p| Anchor::Percent(p / 100.0)).map_err(|_| invalid())
                } else {
                    token
                        .strip_suffix("px")
                        .unwrap_or(token)
                        .parse::<f32>()
                        .map(Anchor::Pixels)
                        .map_err(|_| invalid())
                }
            }
        }
    }
}

/// "`<element anchor> <viewport anchor>`", e.g. `"top 90%"`: the trigger
/// point is reached when the element anchor meets the viewport anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerPosition {
    pub element: Anchor,
    pub viewport: Anchor,
}

impl TriggerPosition {
    pub const fn new(element: Anchor, viewport: Anchor) -> Self {
        Self { element, viewport }
    }

    /// Scroll offset at which this position is reached
    pub fn scroll_offset(&self, rect: &Rect, viewport: &Viewport) -> f32 {
        rect.top + self.element.resolve(rect.height) - self.viewport.resolve(viewport.height)
    }
}

impl FromStr for TriggerPosition {
    type Err = AnimationError;

    fn from_str(spec: &str) -> Result<Self> {
        let mut tokens = spec.split_whitespace();
        let (Some(element), Some(viewport), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(AnimationError::InvalidTriggerPosition(spec.to_string()));
        };
        Ok(Self::new(element.parse()?, viewport.parse()?))
    }
}

// ============================================================================
// SCROLL TRIGGER
// ============================================================================

/// Handle returned by [`ScrollTriggerRegistry::create`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerId(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerState {
    pub progress: f32,
    /// Scroll position lies within [start, end]
    pub is_active: bool,
}

type UpdateFn = Box<dyn FnMut(&TriggerState)>;
type EnterFn = Box<dyn FnMut()>;

pub struct ScrollTrigger {
    rect: Rect,
    start: TriggerPosition,
    end: TriggerPosition,
    start_px: f32,
    end_px: f32,
    progress: f32,
    before_start: bool,
    on_update: Option<UpdateFn>,
    on_enter: Option<EnterFn>,
}

impl ScrollTrigger {
    pub fn new(rect: Rect, start: TriggerPosition, end: TriggerPosition) -> Self {
        Self {
            rect,
            start,
            end,
            start_px: 0.0,
            end_px: 0.0,
            progress: 0.0,
            before_start: true,
            on_update: None,
            on_enter: None,
        }
    }

    /// Called with the new state whenever the clamped progress changes
    pub fn on_update<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&TriggerState) + 'static,
    {
        self.on_update = Some(Box::new(callback));
        self
    }

    /// Called when scrolling forward past the start position
    pub fn on_enter<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + 'static,
    {
        self.on_enter = Some(Box::new(callback));
        self
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn range(&self) -> (f32, f32) {
        (self.start_px, self.end_px)
    }

    fn measure(&mut self, viewport: &Viewport) {
        self.start_px = self.start.scroll_offset(&self.rect, viewport);
        self.end_px = self.end.scroll_offset(&self.rect, viewport);
    }

    fn sync(&mut self, scroll_y: f32) {
        let before_start = scroll_y < self.start_px;
        if self.before_start && !before_start {
            if let Some(on_enter) = self.on_enter.as_mut() {
                on_enter();
            }
        }
        self.before_start = before_start;

        let progress = normalized_progress(scroll_y, self.start_px, self.end_px);
        if progress != self.progress {
            self.progress = progress;
            let state = TriggerState {
                progress,
                is_active: scroll_y >= self.start_px && scroll_y <= self.end_px,
            };
            if let Some(on_update) = self.on_update.as_mut() {
                on_update(&state);
            }
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Every live scroll trigger on the page
pub struct ScrollTriggerRegistry {
    triggers: LinkedHashMap<TriggerId, ScrollTrigger>,
    next_id: u64,
}

impl ScrollTriggerRegistry {
    pub fn new() -> Self {
        Self {
            triggers: LinkedHashMap::new(),
            next_id: 0,
        }
    }

    /// Register a trigger and sync it against the current scroll position
    pub fn create(&mut self, mut trigger: ScrollTrigger, viewport: &Viewport) -> TriggerId {
        trigger.measure(viewport);
        trigger.sync(viewport.scroll_y);

        let id = TriggerId(self.next_id);
        self.next_id += 1;
        log::debug!(
            "scroll trigger {:?} spans {:.1}..{:.1}px",
            id, trigger.start_px, trigger.end_px
        );
        self.triggers.insert(id, trigger);
        id
    }

    pub fn kill(&mut self, id: TriggerId) -> bool {
        self.triggers.remove(&id).is_some()
    }

    pub fn get(&self, id: TriggerId) -> Option<&ScrollTrigger> {
        self.triggers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Scroll position changed
    pub fn update(&mut self, viewport: &Viewport) {
        for (_, trigger) in self.triggers.iter_mut() {
            trigger.sync(viewport.scroll_y);
        }
    }

    /// Viewport geometry changed: re-measure every range, then sync
    pub fn refresh(&mut self, viewport: &Viewport) {
        for (_, trigger) in self.triggers.iter_mut() {
            trigger.measure(viewport);
            trigger.sync(viewport.scroll_y);
        }
    }
}

impl Default for ScrollTriggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
