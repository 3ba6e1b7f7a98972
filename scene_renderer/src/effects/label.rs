// effects/label.rs - Word-by-word drop-in reveal when the label scrolls into view

use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::animation::{stagger, Easing, ScrollTrigger, TriggerPosition, Anchor, Tween};
use crate::page::{split_words, Element};
use super::{Effect, EffectContext, Registrations};

const DROP_FROM_PERCENT: f32 = -100.0;
const DROP_DURATION: Duration = Duration::from_millis(600);
const DROP_STAGGER: Duration = Duration::from_millis(50);
/// `"top 90%"`
const REVEAL_START: TriggerPosition = TriggerPosition::new(Anchor::Top, Anchor::Percent(0.9));
/// ScrollTrigger's default end, `"bottom top"`
const REVEAL_END: TriggerPosition = TriggerPosition::new(Anchor::Bottom, Anchor::Top);

/// A word inside its overflow-hidden mask
pub struct MaskedWord {
    pub text: String,
    pub overflow_hidden: bool,
    offset: Tween<f32>,
}

impl MaskedWord {
    pub fn y_percent(&self) -> f32 {
        *self.offset.current()
    }
}

/// `data-component="label"`
pub struct Label {
    words: Rc<RefCell<Vec<MaskedWord>>>,
    registrations: Registrations,
}

impl Label {
    pub fn new(element: &Element, ctx: &mut EffectContext) -> Self {
        let words: Vec<MaskedWord> = split_words(&element.text_content())
            .into_iter()
            .enumerate()
            .map(|(index, text)| MaskedWord {
                text,
                overflow_hidden: true,
                offset: Tween::new(DROP_FROM_PERCENT, 0.0, DROP_DURATION)
                    .with_easing(Easing::PowerOut(2))
                    .with_delay(stagger(index, DROP_STAGGER))
                    .paused(),
            })
            .collect();

        log::debug!("label: {} word(s)", words.len());

        let words = Rc::new(RefCell::new(words));
        let mut registrations = Registrations::default();

        // drops off the ticker once every word has landed
        let state = words.clone();
        registrations.ticker.push(ctx.ticker.add_until(move |event| {
            let dt = event.delta_duration();
            let mut active = false;
            for word in state.borrow_mut().iter_mut() {
                active |= word.offset.update(dt);
            }
            active
        }));

        let state = words.clone();
        let trigger = ScrollTrigger::new(element.rect, REVEAL_START, REVEAL_END).on_enter(move || {
            for word in state.borrow_mut().iter_mut() {
                word.offset.resume();
            }
        });
        let viewport = ctx.viewport();
        registrations.triggers.push(ctx.scroll.create(trigger, &viewport));

        Self { words, registrations }
    }

    pub fn words(&self) -> Ref<'_, Vec<MaskedWord>> {
        self.words.borrow()
    }
}

impl Effect for Label {
    fn name(&self) -> &'static str {
        "label"
    }

    fn destroy(&mut self, ctx: &mut EffectContext) {
        self.registrations.release(ctx);
    }
}
