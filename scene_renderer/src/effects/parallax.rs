// effects/parallax.rs - Image drifts against the scroll while its frame crosses the viewport

use std::cell::Cell;
use std::rc::Rc;

use crate::animation::{lerp, ScrollTrigger, TriggerPosition, Anchor};
use crate::page::Element;
use super::{Effect, EffectContext, Registrations};

pub const PARALLAX_FROM_PERCENT: f32 = -20.0;
pub const PARALLAX_TO_PERCENT: f32 = 20.0;
/// `"top bottom"`
const SCRUB_START: TriggerPosition = TriggerPosition::new(Anchor::Top, Anchor::Bottom);
/// `"bottom top"`
const SCRUB_END: TriggerPosition = TriggerPosition::new(Anchor::Bottom, Anchor::Top);

/// `data-component="parallax"`
pub struct Parallax {
    /// `None` when the element has no `data-select="image"` child
    image_offset: Option<Rc<Cell<f32>>>,
    registrations: Registrations,
}

impl Parallax {
    pub fn new(element: &Element, ctx: &mut EffectContext) -> Self {
        let mut registrations = Registrations::default();

        let image_offset = element.select_first("image").map(|_| {
            let offset = Rc::new(Cell::new(PARALLAX_FROM_PERCENT));
            let target = offset.clone();
            let trigger = ScrollTrigger::new(element.rect, SCRUB_START, SCRUB_END).on_update(move |state| {
                target.set(lerp(PARALLAX_FROM_PERCENT, PARALLAX_TO_PERCENT, state.progress));
            });
            let viewport = ctx.viewport();
            registrations.triggers.push(ctx.scroll.create(trigger, &viewport));
            offset
        });

        if image_offset.is_none() {
            log::debug!("parallax: no image to move");
        }

        Self { image_offset, registrations }
    }

    /// Current image `yPercent`
    pub fn image_offset(&self) -> Option<f32> {
        self.image_offset.as_ref().map(|offset| offset.get())
    }
}

impl Effect for Parallax {
    fn name(&self) -> &'static str {
        "parallax"
    }

    fn destroy(&mut self, ctx: &mut EffectContext) {
        self.registrations.release(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Rect, Viewport};

    fn parallax_element(with_image: bool) -> Element {
        let children = if with_image {
            vec![Element { tag: "img".into(), select: Some("image".into()), ..Default::default() }]
        } else {
            Vec::new()
        };
        Element {
            component: Some("parallax".into()),
            rect: Rect { left: 0.0, top: 2000.0, width: 1000.0, height: 600.0 },
            children,
            ..Default::default()
        }
    }

    #[test]
    fn test_offset_tracks_scroll_range() {
        let mut ctx = EffectContext::new(Viewport { width: 1000.0, height: 800.0, scroll_y: 0.0 });
        let parallax = Parallax::new(&parallax_element(true), &mut ctx);
        assert_eq!(parallax.image_offset(), Some(-20.0));

        // range: 2000 - 800 = 1200 .. 2600
        ctx.scroll_to(1900.0);
        assert_eq!(parallax.image_offset(), Some(0.0));
        ctx.scroll_to(2600.0);
        assert_eq!(parallax.image_offset(), Some(20.0));
        ctx.scroll_to(100.0);
        assert_eq!(parallax.image_offset(), Some(-20.0));
    }

    #[test]
    fn test_missing_image_registers_nothing() {
        let mut ctx = EffectContext::new(Viewport::default());
        let parallax = Parallax::new(&parallax_element(false), &mut ctx);
        assert_eq!(parallax.image_offset(), None);
        assert!(ctx.scroll.is_empty());
    }
}
