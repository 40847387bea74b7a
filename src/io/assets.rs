use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use glam::Vec3;

use crate::io::{MeshFormat, detect_format};

/// Number of matcap preview materials.
pub const MATCAP_SLOTS: usize = 6;
/// The slot whose completion gates the default-mesh fetch, so the startup
/// mesh never renders before its preview material exists.
pub const PRIMARY_MATCAP: usize = 0;

const MATCAP_DIR: &str = "assets/matcaps";
const MATCAP_FILES: [&str; MATCAP_SLOTS] = [
    "clay.png",
    "chavant.png",
    "skin.png",
    "bronze.png",
    "velvet.png",
    "pearl.png",
];
const MATCAP_TINTS: [[f32; 3]; MATCAP_SLOTS] = [
    [0.78, 0.57, 0.42],
    [0.52, 0.50, 0.48],
    [0.87, 0.65, 0.55],
    [0.71, 0.48, 0.22],
    [0.58, 0.16, 0.22],
    [0.80, 0.80, 0.86],
];
const DEFAULT_MESH_PATH: &str = "assets/sphere.ply";

/// Decoded matcap pixels ready for GPU upload.
pub struct MatcapImage {
    pub slot: usize,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Asynchronously loaded startup assets, delivered over a channel that the
/// scene drains once per frame on the main thread.
pub enum AssetEvent {
    Matcap(MatcapImage),
    DefaultMesh { data: Vec<u8>, format: MeshFormat },
}

/// Start the background loader. Matcaps decode in slot order; the default
/// mesh payload is fetched right after the primary slot resolves.
pub fn spawn_loader() -> Receiver<AssetEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for (slot, file) in MATCAP_FILES.iter().enumerate() {
            let path = PathBuf::from(MATCAP_DIR).join(file);
            let (width, height, pixels) = match image::open(&path) {
                Ok(img) => {
                    let rgba = img.to_rgba8();
                    let (w, h) = rgba.dimensions();
                    (w, h, rgba.into_raw())
                }
                Err(e) => {
                    log::debug!("matcap {file} unavailable ({e}), synthesizing");
                    synth_matcap(MATCAP_TINTS[slot])
                }
            };
            if tx
                .send(AssetEvent::Matcap(MatcapImage {
                    slot,
                    width,
                    height,
                    pixels,
                }))
                .is_err()
            {
                return;
            }

            if slot == PRIMARY_MATCAP
                && let Some(format) = detect_format(DEFAULT_MESH_PATH)
            {
                match std::fs::read(DEFAULT_MESH_PATH) {
                    Ok(data) => {
                        if tx.send(AssetEvent::DefaultMesh { data, format }).is_err() {
                            return;
                        }
                    }
                    Err(e) => log::warn!("default mesh {DEFAULT_MESH_PATH} unavailable: {e}"),
                }
            }
        }
    });
    rx
}

/// Lit-sphere gradient used when a matcap image is missing: lambert
/// shading of a hemisphere under a fixed key light, plus a specular dot.
fn synth_matcap(tint: [f32; 3]) -> (u32, u32, Vec<u8>) {
    const SIZE: u32 = 128;
    let light = Vec3::new(0.4, 0.5, 0.75).normalize();
    let half = (light + Vec3::Z).normalize();
    let mut pixels = Vec::with_capacity((SIZE * SIZE * 4) as usize);
    for y in 0..SIZE {
        for x in 0..SIZE {
            let u = x as f32 / (SIZE - 1) as f32 * 2.0 - 1.0;
            let v = 1.0 - y as f32 / (SIZE - 1) as f32 * 2.0;
            let r2 = u * u + v * v;
            let n = if r2 <= 1.0 {
                Vec3::new(u, v, (1.0 - r2).sqrt())
            } else {
                Vec3::Z
            };
            let diffuse = n.dot(light).max(0.0);
            let specular = n.dot(half).max(0.0).powi(24) * 0.35;
            for channel in tint {
                let value = (channel * (0.25 + 0.75 * diffuse) + specular).clamp(0.0, 1.0);
                pixels.push((value * 255.0) as u8);
            }
            pixels.push(255);
        }
    }
    (SIZE, SIZE, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn loader_delivers_all_matcaps_and_the_default_payload() {
        let rx = spawn_loader();
        let mut matcaps = 0;
        let mut default_payload = None;
        while let Ok(event) = rx.recv_timeout(Duration::from_secs(10)) {
            match event {
                AssetEvent::Matcap(img) => {
                    assert!(img.slot < MATCAP_SLOTS);
                    assert_eq!(img.pixels.len(), (img.width * img.height * 4) as usize);
                    matcaps += 1;
                }
                AssetEvent::DefaultMesh { data, format } => {
                    assert_eq!(format, MeshFormat::Ply);
                    default_payload = Some(data);
                }
            }
        }
        assert_eq!(matcaps, MATCAP_SLOTS);
        // The repo ships assets/sphere.ply; the payload must have arrived
        // after the primary matcap.
        let payload = default_payload.expect("default mesh payload");
        assert!(!payload.is_empty());
    }

    #[test]
    fn synthesized_matcap_is_opaque_rgba() {
        let (w, h, pixels) = synth_matcap([0.5, 0.5, 0.5]);
        assert_eq!(pixels.len(), (w * h * 4) as usize);
        assert!(pixels.chunks(4).all(|px| px[3] == 255));
    }
}
