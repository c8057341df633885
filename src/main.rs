mod domain;
mod application;
mod adapters;
mod config;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::adapters::{
    display::window::MinifbDisplay,
    onnx::{model_catalog::OnnxModelCatalog, yolo_engine::OnnxYoloEngine},
    render::canvas::{resolve_font, ImageRenderer},
    v4l2::{camera_repo::V4l2CameraCatalog, capture::V4l2Camera},
};
use crate::application::{
    reporter::ConsoleReporter,
    services::{CameraService, WebcamService},
    session::Session,
};
use crate::config::Args;
use crate::domain::errors::DomainError;

/// Todos los fallos son terminales: se informan una vez y se sale con normalidad.
fn report_failure(e: &DomainError) {
    eprintln!("Error: {e}");
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 1. Inicializar logs (RUST_LOG=warn por defecto). Van a stderr: stdout es
    // de la consola de resultados, que se reescribe en sitio.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if args.list_cameras {
        let cameras = CameraService::new(V4l2CameraCatalog::new()).list_cameras()?;
        println!("{:<14} | {:<30} | {:<24} | {:<10}", "Path", "Card", "Bus", "Driver");
        println!("{}", "-".repeat(86));
        for cam in cameras {
            println!("{:<14} | {:<30} | {:<24} | {:<10}", cam.id.path, cam.card, cam.bus, cam.driver);
        }
        return Ok(());
    }

    // 2. Modelo según la tarea
    let catalog = OnnxModelCatalog::new();
    let infer_cfg = args.inference_config(&catalog);
    let engine = match catalog
        .validate_model(&infer_cfg.model)
        .and_then(|()| OnnxYoloEngine::open(&infer_cfg))
    {
        Ok(engine) => engine,
        Err(e) => {
            report_failure(&e);
            return Ok(());
        }
    };

    // 3. Adaptadores de infraestructura
    let font = match resolve_font(args.font.as_deref()) {
        Ok(font) => font,
        Err(e) => {
            report_failure(&DomainError::InvalidInput(format!("{e:#}")));
            return Ok(());
        }
    };
    let camera = V4l2Camera::new(args.capture_config());
    let renderer = ImageRenderer::new(font);
    let display = MinifbDisplay::new();

    // 4. Bucle principal
    let mut session = Session::new(args.color_seed);
    let mut service = WebcamService::new(
        camera,
        engine,
        renderer,
        display,
        ConsoleReporter::stdout(),
        args.loop_options(),
    );

    tracing::info!("🚀 {} en {}", infer_cfg.task, args.device);
    match service.run(&mut session) {
        Ok(summary) => {
            tracing::info!("Fin: {} frames ({:?})", summary.frames, summary.stop);
        }
        Err(e) => report_failure(&e),
    }

    Ok(())
}
