// effects/quote.rs - Line-by-line clip reveal scrubbed by scroll

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::animation::{ScrollTrigger, TriggerPosition, Anchor};
use crate::page::{split_lines, Element};
use super::{Effect, EffectContext, Registrations};

/// `"top 75%"`
const SCRUB_START: TriggerPosition = TriggerPosition::new(Anchor::Top, Anchor::Percent(0.75));
/// `"bottom 25%"`
const SCRUB_END: TriggerPosition = TriggerPosition::new(Anchor::Bottom, Anchor::Percent(0.25));

/// A line whose visible width is clipped from the left edge
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedLine {
    pub text: String,
    /// Revealed fraction of the line, 0 hidden, 1 fully shown
    pub reveal: f32,
}

impl ClippedLine {
    /// CSS `clip-path` for the current reveal
    pub fn clip_path(&self) -> String {
        let x = format_percent(self.reveal);
        format!("polygon({x} 0, 0 0, 0 100%, {x} 100%)")
    }
}

fn format_percent(fraction: f32) -> String {
    let pct = fraction * 100.0;
    if pct == 0.0 {
        "0".to_string()
    } else if pct.fract() == 0.0 {
        format!("{}%", pct as i32)
    } else {
        format!("{pct:.2}%")
    }
}

/// Reveal of line `index` of `count` at scrub progress `progress`: each
/// line takes one unit of timeline time and starts one unit after the last.
pub fn line_reveal(progress: f32, index: usize, count: usize) -> f32 {
    (progress.clamp(0.0, 1.0) * count as f32 - index as f32).clamp(0.0, 1.0)
}

/// `data-component="quote"`
pub struct Quote {
    lines: Rc<RefCell<Vec<ClippedLine>>>,
    registrations: Registrations,
}

impl Quote {
    pub fn new(element: &Element, ctx: &mut EffectContext) -> Self {
        let lines: Vec<ClippedLine> = split_lines(&element.text_content())
            .into_iter()
            .map(|text| ClippedLine { text, reveal: 0.0 })
            .collect();

        let lines = Rc::new(RefCell::new(lines));
        let mut registrations = Registrations::default();

        let state = lines.clone();
        let trigger = ScrollTrigger::new(element.rect, SCRUB_START, SCRUB_END).on_update(move |trigger| {
            let mut lines = state.borrow_mut();
            let count = lines.len();
            for (index, line) in lines.iter_mut().enumerate() {
                line.reveal = line_reveal(trigger.progress, index, count);
            }
        });
        let viewport = ctx.viewport();
        registrations.triggers.push(ctx.scroll.create(trigger, &viewport));

        Self { lines, registrations }
    }

    pub fn lines(&self) -> Ref<'_, Vec<ClippedLine>> {
        self.lines.borrow()
    }
}

impl Effect for Quote {
    fn name(&self) -> &'static str {
        "quote"
    }

    fn destroy(&mut self, ctx: &mut EffectContext) {
        self.registrations.release(ctx);
    }
}
