// lib.rs - Library exports for the scroll-linked page effects and skull scene

pub mod animation;
pub mod config;
pub mod effects;
pub mod error_handling;
pub mod page;
pub mod scene;

// Re-export commonly used types
pub use config::SceneConfig;
pub use effects::{mount, Components, Effect, EffectContext, SharedContext};
pub use error_handling::RendererError;
pub use page::{Document, Element, PointerEvent, Viewport};
pub use scene::{Background, BackgroundOptions, GpuContext, RenderBackend, SkullScene, WgpuRenderer};
