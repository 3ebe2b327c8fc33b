use std::path::{Path, PathBuf};

use crate::components::history::DEFAULT_HISTORY_CAPACITY;
use crate::components::tools::{DEFAULT_PEN_SIZE, MAX_PEN_SIZE, MIN_PEN_SIZE};
use crate::io::EXPORT_JPEG_QUALITY;

const SETTINGS_FILE: &str = "deluxe-draw.cfg";
pub const DEFAULT_CANVAS_SIZE: u32 = 512;

/// User preferences, persisted as `key=value` lines.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub max_undo_steps: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub pen_size: f32,
    pub fill_tolerance: u8,
    pub jpeg_quality: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_undo_steps: DEFAULT_HISTORY_CAPACITY,
            canvas_width: DEFAULT_CANVAS_SIZE,
            canvas_height: DEFAULT_CANVAS_SIZE,
            pen_size: DEFAULT_PEN_SIZE,
            fill_tolerance: 0,
            jpeg_quality: EXPORT_JPEG_QUALITY,
        }
    }
}

impl Settings {
    /// Per-user config directory for the application.
    ///
    /// `$XDG_CONFIG_HOME/deluxe-draw/`                  (Linux)
    /// `%APPDATA%\DeluxeDraw\`                          (Windows)
    /// `~/Library/Application Support/DeluxeDraw/`      (macOS)
    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("deluxe-draw");
            return Some(dir);
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("DeluxeDraw"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("DeluxeDraw"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf))
        }
    }

    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join(SETTINGS_FILE))
    }

    /// Parse `key=value` lines. Unknown keys and bad values are ignored.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "max_undo_steps" => {
                    if let Ok(v) = val.parse::<usize>() {
                        s.max_undo_steps = v.max(1);
                    }
                }
                "canvas_width" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.canvas_width = v.max(1);
                    }
                }
                "canvas_height" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.canvas_height = v.max(1);
                    }
                }
                "pen_size" => {
                    if let Ok(v) = val.parse::<f32>() {
                        if v.is_finite() {
                            s.pen_size = v.clamp(MIN_PEN_SIZE, MAX_PEN_SIZE);
                        }
                    }
                }
                "fill_tolerance" => {
                    if let Ok(v) = val.parse::<u8>() {
                        s.fill_tolerance = v;
                    }
                }
                "jpeg_quality" => {
                    if let Ok(v) = val.parse::<u8>() {
                        s.jpeg_quality = v.clamp(1, 100);
                    }
                }
                _ => {}
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        let lines = [
            format!("max_undo_steps={}", self.max_undo_steps),
            format!("canvas_width={}", self.canvas_width),
            format!("canvas_height={}", self.canvas_height),
            format!("pen_size={}", self.pen_size),
            format!("fill_tolerance={}", self.fill_tolerance),
            format!("jpeg_quality={}", self.jpeg_quality),
        ];
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Load from the per-user settings file, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::settings_path() else { return Ok(()) };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_config_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.max_undo_steps, 50);
        assert_eq!((s.canvas_width, s.canvas_height), (512, 512));
        assert_eq!(s.pen_size, 4.0);
        assert_eq!(s.jpeg_quality, 95);
    }

    #[test]
    fn parse_ignores_noise_and_clamps() {
        let s = Settings::parse(
            "# comment\nmax_undo_steps = 0\npen_size=900\nunknown=1\ncanvas_width=abc\njpeg_quality=0\nfill_tolerance=12\n",
        );
        assert_eq!(s.max_undo_steps, 1);
        assert_eq!(s.pen_size, 50.0);
        assert_eq!(s.canvas_width, 512);
        assert_eq!(s.jpeg_quality, 1);
        assert_eq!(s.fill_tolerance, 12);
    }

    #[test]
    fn config_string_round_trips() {
        let s = Settings {
            max_undo_steps: 20,
            canvas_width: 800,
            canvas_height: 600,
            pen_size: 7.5,
            fill_tolerance: 3,
            jpeg_quality: 75,
        };
        assert_eq!(Settings::parse(&s.to_config_string()), s);
    }

    #[test]
    fn file_round_trip_and_missing_file() {
        let dir = std::env::temp_dir().join(format!("deluxe-draw-settings-{}", uuid::Uuid::new_v4()));
        let path = dir.join(SETTINGS_FILE);
        assert_eq!(Settings::load_from(&path), Settings::default());

        let s = Settings {
            canvas_width: 64,
            ..Settings::default()
        };
        s.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), s);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
