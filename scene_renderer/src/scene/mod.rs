// scene/mod.rs - The animated skull behind the page: asset load, render loop,
// pointer-reactive rotation and the scroll-scrubbed timeline

pub mod assets;
pub mod camera;
pub mod mixer;
pub mod model;
pub mod renderer;

pub use assets::{AssetLoader, EnvironmentMap, SceneAssets};
pub use camera::PerspectiveCamera;
pub use mixer::{ActionId, AnimationClip, AnimationMixer};
pub use model::{DrawItem, SceneModel, Transform};
pub use renderer::{GpuContext, RenderBackend, RenderFrame, WgpuRenderer};

use std::cell::RefCell;
use std::f32::consts::TAU;
use std::rc::Rc;
use std::time::Instant;

use glam::{Mat4, Vec3};
use image::RgbaImage;
use tokio::task::JoinHandle;

use crate::animation::{Anchor, Easing, ScrollTrigger, Timeline, TriggerPosition};
use crate::config::SceneConfig;
use crate::effects::{Effect, EffectContext, Registrations, SharedContext};
use crate::error_handling::Result;
use crate::page::{Document, Element, PointerEvent, Rect};

/// `"top top"`
const LANDING_START: TriggerPosition = TriggerPosition::new(Anchor::Top, Anchor::Top);
/// `"bottom top"`
const LANDING_END: TriggerPosition = TriggerPosition::new(Anchor::Bottom, Anchor::Top);
/// `"top bottom"`
const FOOTER_START: TriggerPosition = TriggerPosition::new(Anchor::Top, Anchor::Bottom);
/// `"top top"`
const FOOTER_END: TriggerPosition = TriggerPosition::new(Anchor::Top, Anchor::Top);

/// Properties the scroll timeline drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkullTrack {
    /// `state.progress`, which in turn scrubs the clip
    Progress,
    /// Model rotation around Y
    SpinY,
    /// Model position along Z
    DepthZ,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SkullState {
    pub progress: f32,
    pub target_rotation_x: f32,
    pub target_rotation_y: f32,
}

/// Source of frame deltas for the animation mixer
pub trait DeltaClock {
    /// Seconds since the previous call
    fn delta(&mut self) -> f32;
}

/// Wall-clock deltas; the first call returns 0
#[derive(Debug, Default)]
pub struct WallClock {
    last: Option<Instant>,
}

impl DeltaClock for WallClock {
    fn delta(&mut self) -> f32 {
        let now = Instant::now();
        let delta = self.last.map_or(0.0, |last| now.duration_since(last).as_secs_f32());
        self.last = Some(now);
        delta
    }
}

/// First clip of the model and the mixer playing it
struct ClipPlayer {
    mixer: AnimationMixer,
    action: ActionId,
    duration: f32,
}

/// Scene state and per-event handlers of the background skull.
///
/// Scene graph: camera, a pointer-rotated group, and inside it the model
/// whose spin and depth the timeline drives.
pub struct SkullScene {
    config: SceneConfig,
    model: SceneModel,
    clip: Option<ClipPlayer>,
    camera: PerspectiveCamera,
    group_rotation_x: f32,
    group_rotation_y: f32,
    model_spin_y: f32,
    model_depth_z: f32,
    state: SkullState,
    timeline: Timeline<SkullTrack>,
    renderer: Box<dyn RenderBackend>,
    clock: Box<dyn DeltaClock>,
}

impl SkullScene {
    /// Build the scene around loaded assets and park the clip at its end pose
    pub fn new(
        assets: SceneAssets,
        container: (f32, f32),
        pixel_ratio: f32,
        config: SceneConfig,
        mut renderer: Box<dyn RenderBackend>,
        clock: Box<dyn DeltaClock>,
    ) -> Result<Self> {
        let SceneAssets { environment, model } = assets;
        let (width, height) = container;

        renderer.set_size(width as u32, height as u32);
        renderer.set_pixel_ratio(pixel_ratio);
        renderer.prepare(&model, &environment)?;

        let aspect = if height > 0.0 { width / height } else { 1.0 };
        let mut camera = PerspectiveCamera::new(config.camera_fov_degrees, aspect, config.camera_near, config.camera_far);
        camera.position = Vec3::new(0.0, 0.0, config.camera_distance);

        let clip = model.animations.first().cloned().map(|clip| {
            let duration = clip.duration;
            let mut mixer = AnimationMixer::new(model.rest_pose());
            let action = mixer.clip_action(clip);
            if let Some(action) = mixer.action_mut(action) {
                action.paused = true;
                action.play();
            }
            ClipPlayer { mixer, action, duration }
        });

        let mut timeline = Timeline::new();
        timeline
            .to(SkullTrack::Progress, 0.0, config.timeline_progress_end, config.timeline_progress_duration, 0.0, Easing::Linear)
            .to(SkullTrack::SpinY, 0.0, TAU, config.timeline_spin_duration, 0.0, Easing::Linear)
            .to(
                SkullTrack::DepthZ,
                0.0,
                config.timeline_depth_target,
                config.timeline_depth_duration,
                config.timeline_depth_start,
                Easing::Linear,
            );

        let mut scene = Self {
            config,
            model,
            clip,
            camera,
            group_rotation_x: 0.0,
            group_rotation_y: 0.0,
            model_spin_y: 0.0,
            model_depth_z: 0.0,
            state: SkullState::default(),
            timeline,
            renderer,
            clock,
        };
        scene.scrub(1.0);

        log::info!(
            "Skull scene ready: {}x{} @{}x, clip {:?}",
            width,
            height,
            pixel_ratio,
            scene.clip.as_ref().map(|c| c.duration)
        );
        Ok(scene)
    }

    /// One ticker frame at `time` seconds
    pub fn handle_tick(&mut self, time: f32) {
        if let Some(clip) = self.clip.as_mut() {
            clip.mixer.update(self.clock.delta());
        }

        let smoothing = self.config.rotation_smoothing;
        self.group_rotation_y += (self.state.target_rotation_y - self.group_rotation_y) * smoothing;
        self.group_rotation_x += (self.state.target_rotation_x - self.group_rotation_x) * smoothing;

        let drift = self.config.camera_drift;
        self.camera.position = Vec3::new(
            drift.x.sample(time),
            drift.y.sample(time),
            self.config.camera_distance + drift.z.sample(time),
        );
        self.camera.rotation_z = drift.roll.sample(time);

        if let Err(err) = self.render() {
            log::warn!("Frame render failed: {}", err);
        }
    }

    /// Point the rotation target at the pointer, relative to the container's client rect
    pub fn handle_pointer_move(&mut self, event: &PointerEvent, container: &Rect) {
        if container.width <= 0.0 || container.height <= 0.0 {
            return;
        }
        let mouse_x = (event.client_x - container.left) / container.width;
        let mouse_y = (event.client_y - container.top) / container.height;
        let range = self.config.pointer_rotation_range;
        self.state.target_rotation_y = (mouse_x - 0.5) * range;
        self.state.target_rotation_x = (mouse_y - 0.5) * range;
    }

    pub fn handle_resize(&mut self, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            log::debug!("Ignoring {}x{} resize", width, height);
            return;
        }
        self.camera.aspect = width / height;
        self.camera.update_projection_matrix();
        self.renderer.set_size(width as u32, height as u32);
    }

    /// Seek the scroll timeline; when it moves, apply its tracks and scrub the clip
    pub fn set_timeline_progress(&mut self, progress: f32) {
        if !self.timeline.seek_progress(progress) {
            return;
        }
        for (track, value) in self.timeline.values() {
            match track {
                SkullTrack::Progress => self.state.progress = value,
                SkullTrack::SpinY => self.model_spin_y = value,
                SkullTrack::DepthZ => self.model_depth_z = value,
            }
        }
        self.scrub(self.state.progress);
    }

    /// Pose the clip at `progress` of its duration
    pub fn scrub(&mut self, progress: f32) {
        let Some(clip) = self.clip.as_mut() else {
            return;
        };
        if clip.duration <= 0.0 {
            return;
        }
        if let Some(action) = clip.mixer.action_mut(clip.action) {
            action.paused = true;
            action.time = (progress * clip.duration).clamp(0.0, clip.duration);
            action.play();
        }
        clip.mixer.update(0.0);
    }

    pub fn destroy(&mut self) {
        self.renderer.dispose();
    }

    fn root_matrix(&self) -> Mat4 {
        let group = Mat4::from_rotation_x(self.group_rotation_x) * Mat4::from_rotation_y(self.group_rotation_y);
        let model = Mat4::from_translation(Vec3::new(0.0, 0.0, self.model_depth_z)) * Mat4::from_rotation_y(self.model_spin_y);
        group * model
    }

    pub fn draw_items(&self) -> Vec<DrawItem> {
        let rest;
        let pose = match &self.clip {
            Some(clip) => clip.mixer.pose(),
            None => {
                rest = self.model.rest_pose();
                &rest
            }
        };
        let worlds = self.model.world_matrices(pose, self.root_matrix());
        self.model.draw_items(&worlds)
    }

    fn render(&mut self) -> Result<()> {
        let draws = self.draw_items();
        let frame = RenderFrame {
            view_projection: self.camera.view_projection(),
            camera_position: self.camera.position,
            draws: &draws,
        };
        self.renderer.render(&frame)
    }

    pub fn capture(&mut self) -> Result<Option<RgbaImage>> {
        self.renderer.capture()
    }

    pub fn state(&self) -> SkullState {
        self.state
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    /// Smoothed (x, y) rotation of the pointer group
    pub fn group_rotation(&self) -> (f32, f32) {
        (self.group_rotation_x, self.group_rotation_y)
    }

    pub fn model_spin_y(&self) -> f32 {
        self.model_spin_y
    }

    pub fn model_depth_z(&self) -> f32 {
        self.model_depth_z
    }

    pub fn timeline_progress(&self) -> f32 {
        self.timeline.progress()
    }

    pub fn clip_duration(&self) -> Option<f32> {
        self.clip.as_ref().map(|clip| clip.duration)
    }

    pub fn clip_time(&self) -> Option<f32> {
        let clip = self.clip.as_ref()?;
        clip.mixer.action(clip.action).map(|action| action.time)
    }
}

pub type RendererFactory = Rc<dyn Fn(&SceneConfig) -> Result<Box<dyn RenderBackend>>>;
pub type ClockFactory = Rc<dyn Fn() -> Box<dyn DeltaClock>>;

/// How the background builds its scene once assets arrive
#[derive(Clone)]
pub struct BackgroundOptions {
    pub config: SceneConfig,
    /// `window.devicePixelRatio`
    pub pixel_ratio: f32,
    pub renderer: RendererFactory,
    pub clock: ClockFactory,
}

impl BackgroundOptions {
    pub fn new(config: SceneConfig, pixel_ratio: f32, renderer: RendererFactory) -> Self {
        Self {
            config,
            pixel_ratio,
            renderer,
            clock: Rc::new(|| Box::new(WallClock::default()) as Box<dyn DeltaClock>),
        }
    }
}

type SceneSlot = Rc<RefCell<Option<SkullScene>>>;

/// `data-component="background"`: loads the skull assets in the background
/// and wires the scene into the shared engine once they arrive. If loading
/// fails the controller stays inert.
pub struct Background {
    scene: SceneSlot,
    registrations: Rc<RefCell<Registrations>>,
    load: Option<JoinHandle<()>>,
}

impl Background {
    /// Start the asset load. Must be called inside a `tokio::task::LocalSet`.
    pub fn spawn(element: &Element, document: &Document, ctx: SharedContext, options: BackgroundOptions) -> Self {
        let scene: SceneSlot = Rc::new(RefCell::new(None));
        let registrations = Rc::new(RefCell::new(Registrations::default()));

        let element = element.clone();
        let landing = document.section("landing").map(|section| section.rect);
        let footer = document.section("footer").map(|section| section.rect);

        let slot = scene.clone();
        let regs = registrations.clone();
        let load = tokio::task::spawn_local(async move {
            let assets = match AssetLoader::new(&options.config).load().await {
                Ok(assets) => assets,
                Err(err) => {
                    log::error!("Background assets failed to load: {}", err);
                    return;
                }
            };

            let mut ctx = ctx.borrow_mut();
            let viewport = ctx.viewport();
            let built = (options.renderer)(&options.config).and_then(|renderer| {
                SkullScene::new(
                    assets,
                    element.client_size(&viewport),
                    options.pixel_ratio,
                    options.config.clone(),
                    renderer,
                    (options.clock)(),
                )
            });
            match built {
                Ok(skull) => *slot.borrow_mut() = Some(skull),
                Err(err) => {
                    log::error!("Background scene setup failed: {}", err);
                    return;
                }
            }

            let mut regs = regs.borrow_mut();
            install_listeners(&mut ctx, &mut regs, &slot, element, landing, footer);
            log::info!("Background scene attached");
        });

        Self { scene, registrations, load: Some(load) }
    }

    /// Resolve once the asset load has finished, successfully or not
    pub async fn wait_loaded(&mut self) {
        if let Some(load) = self.load.take() {
            if let Err(err) = load.await {
                log::debug!("Background load task ended early: {}", err);
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.scene.borrow().is_some()
    }

    /// Borrow the scene, if it has been built
    pub fn with_scene<R>(&self, f: impl FnOnce(&mut SkullScene) -> R) -> Option<R> {
        self.scene.borrow_mut().as_mut().map(f)
    }

    /// Read back the last rendered frame
    pub fn capture(&self) -> Result<Option<RgbaImage>> {
        Ok(self.with_scene(|scene| scene.capture()).transpose()?.flatten())
    }
}

fn install_listeners(
    ctx: &mut EffectContext,
    regs: &mut Registrations,
    slot: &SceneSlot,
    element: Element,
    landing: Option<Rect>,
    footer: Option<Rect>,
) {
    let element = Rc::new(element);

    let (scene, container) = (slot.clone(), element.clone());
    regs.window.push(ctx.window.on_resize(move |viewport| {
        let (width, height) = container.client_size(viewport);
        if let Some(scene) = scene.borrow_mut().as_mut() {
            scene.handle_resize(width, height);
        }
    }));

    let (scene, container) = (slot.clone(), element);
    regs.window.push(ctx.window.on_pointer_move(move |event, viewport| {
        let rect = container.layout_rect(viewport).client_rect(viewport);
        if let Some(scene) = scene.borrow_mut().as_mut() {
            scene.handle_pointer_move(event, &rect);
        }
    }));

    let scene = slot.clone();
    regs.ticker.push(ctx.ticker.add(move |event| {
        if let Some(scene) = scene.borrow_mut().as_mut() {
            scene.handle_tick(event.time as f32);
        }
    }));

    let viewport = ctx.viewport();
    match landing {
        Some(rect) => {
            let scene = slot.clone();
            let trigger = ScrollTrigger::new(rect, LANDING_START, LANDING_END).on_update(move |state| {
                if let Some(scene) = scene.borrow_mut().as_mut() {
                    scene.set_timeline_progress(state.progress);
                }
            });
            regs.triggers.push(ctx.scroll.create(trigger, &viewport));
        }
        None => log::debug!("background: no landing section"),
    }
    match footer {
        Some(rect) => {
            let scene = slot.clone();
            let trigger = ScrollTrigger::new(rect, FOOTER_START, FOOTER_END).on_update(move |state| {
                if let Some(scene) = scene.borrow_mut().as_mut() {
                    scene.set_timeline_progress(1.0 - state.progress);
                }
            });
            regs.triggers.push(ctx.scroll.create(trigger, &viewport));
        }
        None => log::debug!("background: no footer section"),
    }
}

impl Effect for Background {
    fn name(&self) -> &'static str {
        "background"
    }

    fn destroy(&mut self, ctx: &mut EffectContext) {
        if let Some(load) = self.load.take() {
            load.abort();
        }
        self.registrations.borrow_mut().release(ctx);
        if let Some(scene) = self.scene.borrow_mut().as_mut() {
            scene.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::RendererError;
    use crate::page::Viewport;
    use proptest::prelude::*;
    use std::path::PathBuf;

    #[derive(Debug, Default)]
    struct RenderLog {
        prepared: bool,
        renders: usize,
        size: (u32, u32),
        pixel_ratio: f32,
        disposed: bool,
        fail: bool,
    }

    struct StubRenderer(Rc<RefCell<RenderLog>>);

    impl RenderBackend for StubRenderer {
        fn prepare(&mut self, _model: &SceneModel, _environment: &EnvironmentMap) -> Result<()> {
            self.0.borrow_mut().prepared = true;
            Ok(())
        }

        fn set_size(&mut self, width: u32, height: u32) {
            self.0.borrow_mut().size = (width, height);
        }

        fn set_pixel_ratio(&mut self, ratio: f32) {
            self.0.borrow_mut().pixel_ratio = ratio;
        }

        fn render(&mut self, _frame: &RenderFrame<'_>) -> Result<()> {
            let mut log = self.0.borrow_mut();
            if log.fail {
                return Err(RendererError::NotPrepared);
            }
            log.renders += 1;
            Ok(())
        }

        fn dispose(&mut self) {
            self.0.borrow_mut().disposed = true;
        }
    }

    struct FixedClock(f32);

    impl DeltaClock for FixedClock {
        fn delta(&mut self) -> f32 {
            self.0
        }
    }

    fn assets_from(gltf: &str) -> SceneAssets {
        SceneAssets {
            environment: EnvironmentMap::uniform(1.0),
            model: SceneModel::from_gltf_bytes(gltf.as_bytes()).unwrap(),
        }
    }

    fn scene_with(clock: f32) -> (SkullScene, Rc<RefCell<RenderLog>>) {
        scene_from(&model::test_gltf(), clock)
    }

    fn scene_from(gltf: &str, clock: f32) -> (SkullScene, Rc<RefCell<RenderLog>>) {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        let scene = SkullScene::new(
            assets_from(gltf),
            (1600.0, 900.0),
            2.0,
            SceneConfig::default(),
            Box::new(StubRenderer(log.clone())),
            Box::new(FixedClock(clock)),
        )
        .unwrap();
        (scene, log)
    }

    #[test]
    fn test_setup_parks_clip_at_end() {
        let (scene, log) = scene_with(0.0);
        assert_eq!(scene.clip_duration(), Some(2.0));
        assert_eq!(scene.clip_time(), Some(2.0));
        assert_eq!(scene.state(), SkullState::default());

        let log = log.borrow();
        assert!(log.prepared);
        assert_eq!(log.size, (1600, 900));
        assert_eq!(log.pixel_ratio, 2.0);
        assert_eq!(log.renders, 0);
    }

    #[test]
    fn test_camera_drift_at_whole_seconds() {
        let (mut scene, log) = scene_with(0.0);
        for (t, expected) in [(0.0f32, 0.0f32), (1.0, 0.5f32.sin()), (2.0, 1.0f32.sin())] {
            scene.handle_tick(t);
            assert!((scene.camera().position.y - 0.24 * expected).abs() < 1e-6);
        }
        assert_eq!(scene.camera().position.z, 25.0 + (2.0f32 * 0.15).sin() * 2.0);
        assert_eq!(log.borrow().renders, 3);
    }

    #[test]
    fn test_paused_clip_ignores_clock() {
        let (mut scene, _) = scene_with(0.75);
        scene.scrub(0.25);
        scene.handle_tick(1.0);
        assert_eq!(scene.clip_time(), Some(0.5));
    }

    #[test]
    fn test_pointer_sets_rotation_target() {
        let (mut scene, _) = scene_with(0.0);
        let container = Rect { left: 0.0, top: 0.0, width: 1000.0, height: 500.0 };
        scene.handle_pointer_move(&PointerEvent { client_x: 750.0, client_y: 125.0 }, &container);
        let state = scene.state();
        assert!((state.target_rotation_y - 0.4).abs() < 1e-6);
        assert!((state.target_rotation_x + 0.4).abs() < 1e-6);

        let empty = Rect::default();
        scene.handle_pointer_move(&PointerEvent { client_x: 10.0, client_y: 10.0 }, &empty);
        assert_eq!(scene.state(), state);
    }

    #[test]
    fn test_rotation_eases_toward_target() {
        let (mut scene, _) = scene_with(0.0);
        let container = Rect { left: 0.0, top: 0.0, width: 100.0, height: 100.0 };
        scene.handle_pointer_move(&PointerEvent { client_x: 100.0, client_y: 0.0 }, &container);
        let target = scene.state().target_rotation_y;

        let mut distance = target.abs();
        for frame in 0..60 {
            scene.handle_tick(frame as f32 / 60.0);
            let (_, y) = scene.group_rotation();
            let next = (target - y).abs();
            assert!(next < distance);
            assert!(y <= target);
            distance = next;
        }
        // first frame covers exactly a tenth of the way
        let (mut fresh, _) = scene_with(0.0);
        fresh.handle_pointer_move(&PointerEvent { client_x: 100.0, client_y: 0.0 }, &container);
        fresh.handle_tick(0.0);
        assert!((fresh.group_rotation().1 - target * 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_resize_updates_aspect() {
        let (mut scene, log) = scene_with(0.0);
        scene.handle_resize(1200.0, 800.0);
        assert_eq!(scene.camera().aspect, 1200.0 / 800.0);
        assert_eq!(log.borrow().size, (1200, 800));

        scene.handle_resize(1200.0, 0.0);
        assert_eq!(scene.camera().aspect, 1.5);
        assert_eq!(log.borrow().size, (1200, 800));
    }

    #[test]
    fn test_timeline_drives_model_and_clip() {
        let (mut scene, _) = scene_with(0.0);
        scene.set_timeline_progress(1.0);
        assert_eq!(scene.state().progress, 0.5);
        assert!((scene.model_spin_y() - TAU).abs() < 1e-5);
        assert_eq!(scene.model_depth_z(), -50.0);
        assert_eq!(scene.clip_time(), Some(1.0));

        scene.set_timeline_progress(0.1);
        assert!((scene.state().progress - 0.1).abs() < 1e-6);
        assert_eq!(scene.model_depth_z(), 0.0);
    }

    #[test]
    fn test_render_failure_keeps_ticking() {
        let (mut scene, log) = scene_with(0.0);
        log.borrow_mut().fail = true;
        scene.handle_tick(0.0);
        scene.handle_tick(1.0);
        log.borrow_mut().fail = false;
        scene.handle_tick(2.0);
        assert_eq!(log.borrow().renders, 1);
    }

    #[test]
    fn test_draws_follow_depth() {
        let (mut scene, _) = scene_with(0.0);
        scene.set_timeline_progress(1.0);
        let draws = scene.draw_items();
        assert_eq!(draws.len(), 1);
        let origin = draws[0].world.transform_point3(Vec3::ZERO);
        assert!((origin.z + 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_model_without_clip_renders_and_follows_timeline() {
        let (mut scene, log) = scene_from(&model::test_static_gltf(), 0.5);
        assert_eq!(scene.clip_duration(), None);
        assert_eq!(scene.clip_time(), None);

        scene.handle_tick(0.0);
        scene.handle_tick(1.0);
        assert_eq!(log.borrow().renders, 2);

        scene.set_timeline_progress(1.0);
        assert_eq!(scene.state().progress, 0.5);
        assert!((scene.model_spin_y() - TAU).abs() < 1e-5);
        assert_eq!(scene.model_depth_z(), -50.0);

        let draws = scene.draw_items();
        assert_eq!(draws.len(), 1);
        let origin = draws[0].world.transform_point3(Vec3::ZERO);
        assert!((origin.z + 50.0).abs() < 1e-4);
    }

    /// A loaded scene wired to the page's landing and footer sections
    fn attached_scene() -> (SharedContext, SceneSlot) {
        let document = page();
        let ctx = EffectContext::shared(document.viewport);
        let (scene, _) = scene_with(0.0);
        let slot: SceneSlot = Rc::new(RefCell::new(Some(scene)));
        let mut regs = Registrations::default();
        install_listeners(
            &mut ctx.borrow_mut(),
            &mut regs,
            &slot,
            document.components("background")[0].clone(),
            document.section("landing").map(|section| section.rect),
            document.section("footer").map(|section| section.rect),
        );
        (ctx, slot)
    }

    fn timeline_of(slot: &SceneSlot) -> f32 {
        slot.borrow().as_ref().map(|scene| scene.timeline_progress()).unwrap()
    }

    #[test]
    fn test_footer_reverses_timeline_at_its_bounds() {
        let (ctx, slot) = attached_scene();

        // footer range 3100..4000: fully scrolled in rewinds the timeline
        ctx.borrow_mut().scroll_to(4000.0);
        assert_eq!(timeline_of(&slot), 0.0);
        {
            let scene = slot.borrow();
            let scene = scene.as_ref().unwrap();
            assert_eq!(scene.model_spin_y(), 0.0);
            assert_eq!(scene.model_depth_z(), 0.0);
            assert_eq!(scene.state().progress, 0.0);
        }

        ctx.borrow_mut().scroll_to(4600.0);
        assert_eq!(timeline_of(&slot), 0.0);

        // back to the footer's start puts it at the end again
        ctx.borrow_mut().scroll_to(3100.0);
        assert_eq!(timeline_of(&slot), 1.0);
        let scene = slot.borrow();
        let scene = scene.as_ref().unwrap();
        assert!((scene.model_spin_y() - TAU).abs() < 1e-5);
        assert_eq!(scene.model_depth_z(), -50.0);
    }

    proptest! {
        #[test]
        fn prop_footer_maps_progress_to_its_complement(q in 0.0f32..=1.0) {
            let (ctx, slot) = attached_scene();
            ctx.borrow_mut().scroll_to(3100.0 + q * 900.0);
            prop_assert!((timeline_of(&slot) - (1.0 - q)).abs() < 1e-3);
        }

        #[test]
        fn prop_smoothing_closes_in_without_overshoot(x in 60.0f32..=100.0, frames in 1usize..40) {
            let (mut scene, _) = scene_with(0.0);
            let container = Rect { left: 0.0, top: 0.0, width: 100.0, height: 100.0 };
            scene.handle_pointer_move(&PointerEvent { client_x: x, client_y: 50.0 }, &container);
            let target = scene.state().target_rotation_y;
            prop_assert!(target > 0.0);

            let mut distance = target;
            for frame in 0..frames {
                scene.handle_tick(frame as f32 / 60.0);
                let (_, y) = scene.group_rotation();
                let next = (target - y).abs();
                prop_assert!(next < distance);
                prop_assert!(y <= target);
                distance = next;
            }
        }

        #[test]
        fn prop_camera_x_follows_drift(t in 0.0f32..1000.0) {
            let (mut scene, _) = scene_with(0.0);
            scene.handle_tick(t);
            prop_assert_eq!(scene.camera().position.x, (t * 0.3).sin() * 0.5);
        }

        #[test]
        fn prop_scrub_sets_proportional_time(p in 0.0f32..=1.0) {
            let (mut scene, _) = scene_with(0.0);
            scene.scrub(p);
            let time = scene.clip_time().unwrap();
            prop_assert_eq!(time, p * 2.0);
            prop_assert!((0.0..=2.0).contains(&time));
        }
    }

    fn temp_assets(name: &str, gltf: Option<String>) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scroll-scene-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        if let Some(gltf) = gltf {
            let hdr = assets::encode_hdr(2, 2, &[[1.0, 1.0, 1.0]; 4]);
            std::fs::write(dir.join("studio_small_09_1k.hdr"), hdr).unwrap();
            std::fs::write(dir.join("skull2.glb"), gltf).unwrap();
        }
        dir
    }

    fn page() -> Document {
        Document::from_json(
            r#"{
                "viewport": { "width": 1440, "height": 900 },
                "body": {
                    "tag": "body",
                    "children": [
                        { "component": "background", "fill_viewport": true },
                        { "section": "landing", "rect": { "left": 0, "top": 0, "width": 1440, "height": 1800 } },
                        { "section": "footer", "rect": { "left": 0, "top": 4000, "width": 1440, "height": 900 } }
                    ]
                }
            }"#,
        )
        .unwrap()
    }

    fn options(root: PathBuf, log: Rc<RefCell<RenderLog>>) -> BackgroundOptions {
        let config = SceneConfig { asset_root: root, ..Default::default() };
        let mut options = BackgroundOptions::new(
            config,
            1.0,
            Rc::new(move |_: &SceneConfig| -> Result<Box<dyn RenderBackend>> {
                Ok(Box::new(StubRenderer(log.clone())))
            }),
        );
        options.clock = Rc::new(|| Box::new(FixedClock(0.0)) as Box<dyn DeltaClock>);
        options
    }

    #[tokio::test]
    async fn test_background_scrolls_and_tears_down() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let document = page();
                let ctx = EffectContext::shared(document.viewport);
                let log = Rc::new(RefCell::new(RenderLog::default()));
                let element = document.components("background")[0];

                let mut background = Background::spawn(
                    element,
                    &document,
                    ctx.clone(),
                    options(temp_assets("attach", Some(model::test_gltf())), log.clone()),
                );
                background.wait_loaded().await;
                assert!(background.is_loaded());
                {
                    let ctx = ctx.borrow();
                    assert_eq!(ctx.ticker.len(), 1);
                    assert_eq!(ctx.scroll.len(), 2);
                    assert_eq!(ctx.window.listener_count(), 2);
                }
                assert_eq!(log.borrow().size, (1440, 900));

                // footer range 3100..4000; q = 0.25 puts the timeline at 0.75
                ctx.borrow_mut().scroll_to(3325.0);
                let (spin, depth) = background.with_scene(|s| (s.model_spin_y(), s.model_depth_z())).unwrap();
                assert!((spin - 0.75 * TAU).abs() < 1e-4);
                assert!((depth + 34.375).abs() < 1e-3);

                ctx.borrow_mut().resize(1000.0, 500.0);
                assert_eq!(background.with_scene(|s| s.camera().aspect), Some(2.0));

                ctx.borrow_mut().tick(0.0);
                ctx.borrow_mut().tick(0.016);
                assert_eq!(log.borrow().renders, 2);
                assert!(background.capture().unwrap().is_none());

                background.destroy(&mut ctx.borrow_mut());
                let ctx = ctx.borrow();
                assert!(ctx.ticker.is_empty());
                assert!(ctx.scroll.is_empty());
                assert_eq!(ctx.window.listener_count(), 0);
                assert!(log.borrow().disposed);
            })
            .await;
    }

    #[tokio::test]
    async fn test_background_attaches_model_without_clips() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let document = page();
                let ctx = EffectContext::shared(document.viewport);
                let log = Rc::new(RefCell::new(RenderLog::default()));
                let element = document.components("background")[0];

                let mut background = Background::spawn(
                    element,
                    &document,
                    ctx.clone(),
                    options(temp_assets("static", Some(model::test_static_gltf())), log.clone()),
                );
                background.wait_loaded().await;
                assert!(background.is_loaded());
                assert_eq!(background.with_scene(|s| s.clip_duration()), Some(None));
                assert_eq!(ctx.borrow().ticker.len(), 1);

                // halfway down the landing section
                ctx.borrow_mut().scroll_to(900.0);
                let (spin, progress) = background.with_scene(|s| (s.model_spin_y(), s.timeline_progress())).unwrap();
                assert_eq!(progress, 0.5);
                assert!((spin - 0.5 * TAU).abs() < 1e-4);

                ctx.borrow_mut().tick(0.0);
                assert_eq!(log.borrow().renders, 1);

                background.destroy(&mut ctx.borrow_mut());
                assert!(ctx.borrow().ticker.is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn test_missing_assets_leave_background_inert() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let document = page();
                let ctx = EffectContext::shared(Viewport::default());
                let log = Rc::new(RefCell::new(RenderLog::default()));
                let element = document.components("background")[0];

                let mut background = Background::spawn(
                    element,
                    &document,
                    ctx.clone(),
                    options(temp_assets("missing", None), log.clone()),
                );
                background.wait_loaded().await;

                assert!(!background.is_loaded());
                let ctx = ctx.borrow();
                assert!(ctx.ticker.is_empty());
                assert!(ctx.scroll.is_empty());
                assert_eq!(ctx.window.listener_count(), 0);
                assert!(!log.borrow().prepared);
            })
            .await;
    }
}
