//! Entry point for the particle viewer.

use anyhow::{Context, Result};
use clap::Parser;
use particle_morph::{DeviceClass, DirResources, PointCloudLoader, SceneConfig, SceneContext};
use particle_viewer::app::App;
use std::{path::PathBuf, sync::Arc};
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

#[derive(Parser, Debug)]
#[command(name = "particle-viewer", version)]
struct Args {
    /// Directory holding `<name>.ptcl` / `<name>.json` / `<name>.obj` resources.
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    /// Scene configuration (JSON). Built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Force the constrained device class (fewer particles, compact transforms).
    #[arg(long, default_value_t = false)]
    constrained: bool,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SceneConfig::from_json_file(path)
            .with_context(|| format!("reading scene config {}", path.display()))?,
        None => SceneConfig::default(),
    };
    let device = if args.constrained {
        DeviceClass::Constrained
    } else {
        DeviceClass::Desktop
    };
    let loader = PointCloudLoader::new(
        Arc::new(DirResources::new(&args.assets)),
        config.particle_count(device),
        args.seed,
    );
    let scene = SceneContext::new(config, device, args.seed);

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Particle Morph")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720))
            .build(&event_loop)?,
    );

    let mut app = pollster::block_on(App::new(window.clone(), scene))?;
    app.begin_load(loader)?;
    let assets = args.assets;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                if !app.handle_event(&window, &event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                                elwt.exit();
                            }
                        }
                        WindowEvent::RedrawRequested => match app.render(&window) {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => {
                                app.resize(app.renderer.gfx.size);
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("WGPU out of memory, exiting.");
                                elwt.exit();
                            }
                            Err(e) => log::error!("Render error: {:?}", e),
                        },
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                if let Err(err) = app.poll_loading() {
                    log::error!("Failed to load scene from {}: {:#}", assets.display(), err);
                }
                window.request_redraw();
            }
            Event::LoopExiting => {
                app.shutdown();
            }
            _ => {}
        }
    })?;

    Ok(())
}
