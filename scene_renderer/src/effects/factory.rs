// effects/factory.rs - Instantiate one controller per tagged element once fonts are ready

use std::future::Future;

use crate::page::Document;
use crate::scene::{Background, BackgroundOptions};
use super::{Echo, Effect, EffectContext, Label, Parallax, Quote, SharedContext};

/// Every controller mounted on the page, grouped by `data-component`
#[derive(Default)]
pub struct Components {
    pub echo: Vec<Echo>,
    pub label: Vec<Label>,
    pub quote: Vec<Quote>,
    pub background: Vec<Background>,
    pub parallax: Vec<Parallax>,
}

impl Components {
    pub fn len(&self) -> usize {
        self.echo.len() + self.label.len() + self.quote.len() + self.background.len() + self.parallax.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn effects_mut(&mut self) -> impl Iterator<Item = &mut dyn Effect> + '_ {
        let echo = self.echo.iter_mut().map(|e| e as &mut dyn Effect);
        let label = self.label.iter_mut().map(|e| e as &mut dyn Effect);
        let quote = self.quote.iter_mut().map(|e| e as &mut dyn Effect);
        let background = self.background.iter_mut().map(|e| e as &mut dyn Effect);
        let parallax = self.parallax.iter_mut().map(|e| e as &mut dyn Effect);
        echo.chain(label).chain(quote).chain(background).chain(parallax)
    }

    /// Wait for every background's asset load to settle
    pub async fn wait_loaded(&mut self) {
        for background in &mut self.background {
            background.wait_loaded().await;
        }
    }

    /// Tear down every controller, unregistering everything they added to `ctx`
    pub fn destroy_all(&mut self, ctx: &mut EffectContext) {
        let mut count = 0;
        for effect in self.effects_mut() {
            log::debug!("destroying {}", effect.name());
            effect.destroy(ctx);
            count += 1;
        }
        log::info!("Destroyed {} component(s)", count);
    }
}

/// Wait for `fonts_ready`, then mount controllers in page order per
/// component type: echo, label, quote, background, parallax.
///
/// Background controllers start their asset load with `spawn_local`, so this
/// must run inside a `tokio::task::LocalSet`.
pub async fn mount<F>(fonts_ready: F, document: &Document, ctx: SharedContext, background: BackgroundOptions) -> Components
where
    F: Future<Output = ()>,
{
    fonts_ready.await;

    let mut components = Components::default();
    {
        let mut engine = ctx.borrow_mut();
        components.echo = document.components("echo").into_iter().map(|el| Echo::new(el, &mut engine)).collect();
        components.label = document.components("label").into_iter().map(|el| Label::new(el, &mut engine)).collect();
        components.quote = document.components("quote").into_iter().map(|el| Quote::new(el, &mut engine)).collect();
    }
    components.background = document
        .components("background")
        .into_iter()
        .map(|el| Background::spawn(el, document, ctx.clone(), background.clone()))
        .collect();
    {
        let mut engine = ctx.borrow_mut();
        components.parallax = document.components("parallax").into_iter().map(|el| Parallax::new(el, &mut engine)).collect();
    }

    log::info!(
        "Mounted {} component(s): echo={} label={} quote={} background={} parallax={}",
        components.len(),
        components.echo.len(),
        components.label.len(),
        components.quote.len(),
        components.background.len(),
        components.parallax.len()
    );
    components
}
