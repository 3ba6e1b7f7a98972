// main.rs - Headless driver: mounts a page's effects, plays a scripted scroll
// and pointer path through them, and writes the last skull frame as PNG.

use anyhow::{Context, Result};
use clap::Parser;
use image::ImageFormat;
use log::{info, warn};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use scroll_scene::scene::RendererFactory;
use scroll_scene::{
    mount, BackgroundOptions, Document, EffectContext, GpuContext, PointerEvent, RenderBackend, SceneConfig,
    WgpuRenderer,
};

/// CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Page description JSON
    #[arg(short, long, default_value = "demos/landing.json")]
    pub page: PathBuf,

    /// Directory holding the HDR environment and the skull model
    #[arg(short, long)]
    pub assets: Option<PathBuf>,

    /// Scene config JSON overriding the built-in constants
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Viewport width (defaults to the page's)
    #[arg(short = 'W', long)]
    pub width: Option<u32>,

    /// Viewport height (defaults to the page's)
    #[arg(short = 'H', long)]
    pub height: Option<u32>,

    /// Device pixel ratio of the simulated display
    #[arg(long, default_value = "1.0")]
    pub pixel_ratio: f32,

    /// Frames to simulate; the scroll sweeps the whole page over them
    #[arg(short, long, default_value = "240")]
    pub frames: u32,

    /// Ticker rate of the simulation
    #[arg(long, default_value = "60")]
    pub fps: f32,

    /// Force Vulkan backend
    #[arg(long)]
    pub vulkan: bool,

    /// Output PNG of the last rendered frame
    #[arg(short, long, default_value = "frame.png")]
    pub output: PathBuf,
}

fn load_config(args: &Args) -> Result<SceneConfig> {
    let mut config = match &args.config {
        Some(path) => SceneConfig::from_json_file(path)
            .with_context(|| format!("Failed to load scene config {}", path.display()))?,
        None => SceneConfig::default(),
    };
    if let Some(root) = &args.assets {
        config.asset_root = root.clone();
    }
    Ok(config)
}

async fn run(args: Args) -> Result<()> {
    anyhow::ensure!(args.fps > 0.0, "Invalid fps: {}", args.fps);

    let mut document = Document::load(&args.page)
        .await
        .with_context(|| format!("Failed to load page {}", args.page.display()))?;
    if let Some(width) = args.width {
        document.viewport.width = width as f32;
    }
    if let Some(height) = args.height {
        document.viewport.height = height as f32;
    }
    let config = load_config(&args)?;

    let gpu = GpuContext::new(args.vulkan).await.context("No suitable GPU adapter found")?;
    let renderer: RendererFactory = Rc::new(
        move |config: &SceneConfig| -> scroll_scene::error_handling::Result<Box<dyn RenderBackend>> {
            Ok(Box::new(WgpuRenderer::new(gpu.clone(), config)))
        },
    );

    let ctx = EffectContext::shared(document.viewport);
    let options = BackgroundOptions::new(config, args.pixel_ratio, renderer);
    // no web fonts to wait for when headless
    let mut components = mount(futures::future::ready(()), &document, ctx.clone(), options).await;
    components.wait_loaded().await;
    if !components.background.iter().any(|background| background.is_loaded()) {
        warn!("No background scene loaded; nothing will be rendered");
    }

    let max_scroll = (document.scroll_height() - document.viewport.height).max(0.0);
    let frames = args.frames.max(1);
    let start = Instant::now();

    for frame in 0..frames {
        let time = frame as f64 / args.fps as f64;
        let sweep = frame as f32 / (frames - 1).max(1) as f32;

        let mut engine = ctx.borrow_mut();
        engine.scroll_to(sweep * max_scroll);

        // pointer traces a slow ellipse around the centre
        let viewport = engine.viewport();
        let t = time as f32;
        engine.pointer_move(PointerEvent {
            client_x: viewport.width * (0.5 + 0.4 * (t * 0.7).cos()),
            client_y: viewport.height * (0.5 + 0.4 * (t * 0.9).sin()),
        });
        engine.tick(time);

        if frame % 60 == 0 {
            info!("Frame {}/{} at scroll {:.0}px", frame, frames, viewport.scroll_y);
        }
    }

    let elapsed = start.elapsed();
    info!(
        "Done: {} frames in {:?} ({:.1} frames/sec)",
        frames,
        elapsed,
        frames as f64 / elapsed.as_secs_f64()
    );

    let image = components
        .background
        .iter()
        .find_map(|background| background.capture().transpose())
        .transpose()
        .context("Failed to read back frame")?;
    match image {
        Some(image) => {
            if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            image
                .save_with_format(&args.output, ImageFormat::Png)
                .with_context(|| format!("Failed writing PNG {}", args.output.display()))?;
            info!("Saved {}", args.output.display());
        }
        None => warn!("No frame captured; {} not written", args.output.display()),
    }

    components.destroy_all(&mut ctx.borrow_mut());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    info!("Starting with {args:?}");

    let local = tokio::task::LocalSet::new();
    local.run_until(run(args)).await
}
