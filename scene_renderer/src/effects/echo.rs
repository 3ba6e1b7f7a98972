// effects/echo.rs - Looping "echo" text: each line rolls out while its clone rolls in

use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::animation::{lerp, stagger, Easing, Tween, REPEAT_FOREVER};
use crate::page::Element;
use super::{Effect, EffectContext, Registrations};

const ROLL_DURATION: Duration = Duration::from_secs(2);
const ROLL_STAGGER: Duration = Duration::from_millis(200);
const ROLL_TRAVEL_PERCENT: f32 = 110.0;
const ROLL_EASING: Easing = Easing::PowerInOut(4);

/// How a layer sits in its line box
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerPosition {
    /// In normal flow (the original markup)
    Flow,
    /// Overlaid on the original, pinned at `left`
    Absolute { left: f32 },
}

/// One rendering of a line's glyphs.
///
/// The staggered roll of all glyphs repeats and yoyos as a single sequence:
/// one playhead spans the whole group, and glyph `i` samples its own roll
/// `i` stagger steps behind it. On the way back the last glyph leaves first.
pub struct GlyphLayer {
    pub glyphs: Vec<String>,
    pub position: LayerPosition,
    from: f32,
    to: f32,
    playhead: Tween<f32>,
}

impl GlyphLayer {
    fn new(glyphs: Vec<String>, position: LayerPosition, from: f32, to: f32) -> Self {
        let span = group_span(glyphs.len());
        let playhead = Tween::new(0.0, span.as_secs_f32(), span)
            .with_repeat(REPEAT_FOREVER)
            .with_yoyo(true);
        Self { glyphs, position, from, to, playhead }
    }

    /// Length of one pass of the group, in seconds
    pub fn group_duration(&self) -> f32 {
        group_span(self.glyphs.len()).as_secs_f32()
    }

    /// Current `yPercent` of every glyph
    pub fn y_percents(&self) -> Vec<f32> {
        let group_time = *self.playhead.current();
        let roll = ROLL_DURATION.as_secs_f32();
        (0..self.glyphs.len())
            .map(|index| {
                let local = (group_time - stagger(index, ROLL_STAGGER).as_secs_f32()).clamp(0.0, roll);
                lerp(self.from, self.to, ROLL_EASING.apply(local / roll))
            })
            .collect()
    }

    fn advance(&mut self, dt: Duration) {
        self.playhead.update(dt);
    }
}

/// The last of `count` staggered rolls ends this long after the first starts
fn group_span(count: usize) -> Duration {
    ROLL_DURATION + stagger(count.saturating_sub(1), ROLL_STAGGER)
}

/// A line element plus its absolutely positioned clone
pub struct EchoLine {
    pub original: GlyphLayer,
    pub clone: GlyphLayer,
}

/// `data-component="echo"`
pub struct Echo {
    lines: Rc<RefCell<Vec<EchoLine>>>,
    registrations: Registrations,
}

impl Echo {
    pub fn new(element: &Element, ctx: &mut EffectContext) -> Self {
        let lines: Vec<EchoLine> = element
            .select_all("line")
            .into_iter()
            .map(|line| {
                let glyphs = line_glyphs(line);
                EchoLine {
                    original: GlyphLayer::new(glyphs.clone(), LayerPosition::Flow, 0.0, ROLL_TRAVEL_PERCENT),
                    clone: GlyphLayer::new(
                        glyphs,
                        LayerPosition::Absolute { left: 0.0 },
                        -ROLL_TRAVEL_PERCENT,
                        0.0,
                    ),
                }
            })
            .collect();

        log::debug!("echo: {} line(s)", lines.len());

        let lines = Rc::new(RefCell::new(lines));
        let mut registrations = Registrations::default();

        let state = lines.clone();
        registrations.ticker.push(ctx.ticker.add(move |event| {
            let dt = event.delta_duration();
            for line in state.borrow_mut().iter_mut() {
                line.original.advance(dt);
                line.clone.advance(dt);
            }
        }));

        Self { lines, registrations }
    }

    pub fn lines(&self) -> Ref<'_, Vec<EchoLine>> {
        self.lines.borrow()
    }
}

impl Effect for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn destroy(&mut self, ctx: &mut EffectContext) {
        self.registrations.release(ctx);
    }
}

/// Glyphs of a line: its vector `path` children, or else its characters
fn line_glyphs(line: &Element) -> Vec<String> {
    let paths = line.by_tag("path");
    if !paths.is_empty() {
        return paths
            .iter()
            .enumerate()
            .map(|(index, path)| path.text.clone().unwrap_or_else(|| format!("path{index}")))
            .collect();
    }
    crate::page::split_chars(&line.text_content())
        .into_iter()
        .map(String::from)
        .collect()
}
