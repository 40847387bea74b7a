use serde::{Deserialize, Serialize};

/// All user-configurable settings, persisted to JSON.
#[derive(Default, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    pub sculpt: SculptSettings,
    pub camera: CameraSettings,
    pub display: DisplaySettings,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SculptSettings {
    pub radius_px: f32,
    pub intensity: f32,
    pub symmetry: bool,
    pub continuous: bool,
    pub paint_color: [f32; 4],
}

impl Default for SculptSettings {
    fn default() -> Self {
        Self {
            radius_px: 50.0,
            intensity: 0.75,
            symmetry: true,
            continuous: false,
            paint_color: [0.85, 0.32, 0.25, 1.0],
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CameraSettings {
    pub fov_degrees: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub orbit_sensitivity: f32,
    pub pan_sensitivity: f32,
    pub zoom_speed: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near_plane: 0.05,
            far_plane: 1000.0,
            orbit_sensitivity: 0.005,
            pan_sensitivity: 0.002,
            zoom_speed: 0.4,
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DisplaySettings {
    pub bg_color: [f32; 3],
    pub matcap: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            bg_color: [0.13, 0.13, 0.16],
            matcap: 0,
        }
    }
}

impl Settings {
    /// Load settings from config file. Falls back to defaults on error.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    fn load_from(path: &std::path::Path) -> Self {
        if path.exists()
            && let Ok(data) = std::fs::read_to_string(path)
            && let Ok(settings) = serde_json::from_str::<Settings>(&data)
        {
            return settings;
        }
        Self::default()
    }

    /// Save settings to config file.
    pub fn save(&self) {
        self.save_to(&config_path());
    }

    fn save_to(&self, path: &std::path::Path) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(data) = serde_json::to_string_pretty(self) {
            let _ = std::fs::write(path, data);
        }
    }
}

fn config_path() -> std::path::PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    std::path::PathBuf::from(home).join(".config/clayforge/settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.sculpt.radius_px = 80.0;
        settings.sculpt.continuous = true;
        settings.display.matcap = 3;
        settings.save_to(&path);

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.sculpt.radius_px, 80.0);
        assert!(loaded.sculpt.continuous);
        assert_eq!(loaded.display.matcap, 3);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load_from(&dir.path().join("nope.json"));
        assert_eq!(loaded.sculpt.radius_px, 50.0);
        assert!(loaded.sculpt.symmetry);
    }

    #[test]
    fn unknown_fields_fall_back_per_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"sculpt": {"radius_px": 99.0}}"#).unwrap();
        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.sculpt.radius_px, 99.0);
        // Everything unspecified keeps its default.
        assert_eq!(loaded.sculpt.intensity, 0.75);
        assert_eq!(loaded.display.matcap, 0);
    }
}
