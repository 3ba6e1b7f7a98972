// effects/mod.rs - Page effect controllers and the shared engine they register with

pub mod echo;
pub mod label;
pub mod quote;
pub mod parallax;
pub mod factory;

pub use echo::Echo;
pub use label::Label;
pub use quote::Quote;
pub use parallax::Parallax;
pub use factory::{mount, Components};

use std::cell::RefCell;
use std::rc::Rc;

use crate::animation::{ListenerId, ScrollTriggerRegistry, Ticker, TriggerId};
use crate::page::{PointerEvent, Viewport, WindowEvents, WindowListener};

/// The animation engine every controller on the page shares: frame ticker,
/// scroll triggers and window listeners, plus the current viewport.
///
/// Controllers receive it explicitly instead of reaching for a global.
pub struct EffectContext {
    pub ticker: Ticker,
    pub scroll: ScrollTriggerRegistry,
    pub window: WindowEvents,
    viewport: Viewport,
}

pub type SharedContext = Rc<RefCell<EffectContext>>;

impl EffectContext {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            ticker: Ticker::new(),
            scroll: ScrollTriggerRegistry::new(),
            window: WindowEvents::new(),
            viewport,
        }
    }

    pub fn shared(viewport: Viewport) -> SharedContext {
        Rc::new(RefCell::new(Self::new(viewport)))
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scroll_to(&mut self, scroll_y: f32) {
        self.viewport.scroll_y = scroll_y.max(0.0);
        self.scroll.update(&self.viewport);
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.window.dispatch_resize(&self.viewport);
        self.scroll.refresh(&self.viewport);
    }

    pub fn pointer_move(&mut self, event: PointerEvent) {
        self.window.dispatch_pointer_move(&event, &self.viewport);
    }

    pub fn tick(&mut self, time: f64) {
        self.ticker.tick(time);
    }
}

/// Everything a controller registered, so it can be unregistered again
#[derive(Debug, Default)]
pub struct Registrations {
    pub ticker: Vec<ListenerId>,
    pub triggers: Vec<TriggerId>,
    pub window: Vec<WindowListener>,
}

impl Registrations {
    pub fn is_empty(&self) -> bool {
        self.ticker.is_empty() && self.triggers.is_empty() && self.window.is_empty()
    }

    /// Remove every handle from `ctx`
    pub fn release(&mut self, ctx: &mut EffectContext) {
        for id in self.ticker.drain(..) {
            ctx.ticker.remove(id);
        }
        for id in self.triggers.drain(..) {
            ctx.scroll.kill(id);
        }
        for listener in self.window.drain(..) {
            ctx.window.remove(listener);
        }
    }
}

/// A controller bound to one page element
pub trait Effect {
    fn name(&self) -> &'static str;

    /// Unregister every listener, tween and trigger this controller owns
    fn destroy(&mut self, ctx: &mut EffectContext);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::ScrollTrigger;
    use crate::page::Rect;

    #[test]
    fn test_release_clears_every_registry() {
        let mut ctx = EffectContext::new(Viewport::default());
        let mut regs = Registrations::default();

        regs.ticker.push(ctx.ticker.add(|_| {}));
        let trigger = ScrollTrigger::new(
            Rect::default(),
            "top top".parse().unwrap(),
            "bottom top".parse().unwrap(),
        );
        let viewport = ctx.viewport();
        regs.triggers.push(ctx.scroll.create(trigger, &viewport));
        regs.window.push(ctx.window.on_resize(|_| {}));

        regs.release(&mut ctx);
        assert!(regs.is_empty());
        assert!(ctx.ticker.is_empty());
        assert!(ctx.scroll.is_empty());
        assert_eq!(ctx.window.listener_count(), 0);
    }

    #[test]
    fn test_scroll_to_clamps_negative() {
        let mut ctx = EffectContext::new(Viewport::default());
        ctx.scroll_to(-40.0);
        assert_eq!(ctx.viewport().scroll_y, 0.0);
    }
}
