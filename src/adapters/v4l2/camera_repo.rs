use v4l::video::Capture;
use v4l::Device;

use crate::application::ports::CameraCatalogPort;
use crate::domain::camera::*;
use crate::domain::errors::DomainResult;

pub struct V4l2CameraCatalog;
impl V4l2CameraCatalog { pub fn new() -> Self { Self } }

impl CameraCatalogPort for V4l2CameraCatalog {
    fn list_cameras(&self) -> DomainResult<Vec<CameraInfo>> {
        let nodes = v4l::context::enum_devices();
        let mut out = Vec::new();
        for node in nodes {
            let path = node.path().to_string_lossy().to_string();
            // Solo nodos que responden a QUERYCAP y capturan vídeo
            let Ok(dev) = Device::with_path(&path) else { continue };
            let Ok(caps) = dev.query_caps() else { continue };
            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                continue;
            }
            out.push(CameraInfo {
                id: CameraId { path },
                driver: caps.driver,
                card: caps.card,
                bus: caps.bus,
            });
        }
        out.sort_by(|a, b| a.id.path.cmp(&b.id.path));
        Ok(out)
    }
}
