use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::detect::{ClassAllowList, DetectionAdapter, DEFAULT_ALLOWED_CLASSES};
use crate::engine::EngineParams;
use crate::service::{ModePreference, ServiceOptions, UriCapture};

const DEFAULT_DB_PATH: &str = "parkwatch.db";
const DEFAULT_AREAS_PATH: &str = "areas.json";
const DEFAULT_API_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_CAPTURE_SOURCE: &str = "stub://1920x1080";
const DEFAULT_MODEL_INPUT: u32 = 640;

#[derive(Debug, Deserialize, Default)]
struct ServiceConfigFile {
    db_path: Option<String>,
    areas_path: Option<PathBuf>,
    api: Option<ApiConfigFile>,
    engine: Option<EngineConfigFile>,
    detector: Option<DetectorConfigFile>,
    capture: Option<CaptureConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct EngineConfigFile {
    overlap_threshold: Option<f64>,
    variance_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    allowed_classes: Option<Vec<String>>,
    min_confidence: Option<f32>,
    mode: Option<String>,
    model_path: Option<PathBuf>,
    labels: Option<Vec<String>>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    default_source: Option<String>,
    /// Camera index (as a string key) to source URI.
    cameras: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub db_path: String,
    pub areas_path: PathBuf,
    pub api_addr: String,
    pub engine: EngineParams,
    pub detector: DetectorSettings,
    pub capture: CaptureSettings,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub allowed_classes: Vec<String>,
    pub min_confidence: f32,
    pub mode: ModePreference,
    pub model_path: Option<PathBuf>,
    /// Class names in model output order.
    pub labels: Vec<String>,
    pub input_width: u32,
    pub input_height: u32,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub default_source: String,
    pub cameras: HashMap<u32, String>,
}

impl ServiceConfig {
    /// Read `PARKWATCH_CONFIG` (TOML when the name ends in `.toml`, JSON
    /// otherwise), fill defaults, apply `PARKWATCH_*` overrides, and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PARKWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ServiceConfigFile) -> Result<Self> {
        let db_path = file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let areas_path = file
            .areas_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AREAS_PATH));
        let api_addr = file
            .api
            .and_then(|api| api.addr)
            .unwrap_or_else(|| DEFAULT_API_ADDR.to_string());

        let defaults = EngineParams::default();
        let engine_file = file.engine.unwrap_or_default();
        let engine = EngineParams {
            overlap_threshold: engine_file
                .overlap_threshold
                .unwrap_or(defaults.overlap_threshold),
            variance_threshold: engine_file
                .variance_threshold
                .unwrap_or(defaults.variance_threshold),
        };

        let detector_file = file.detector.unwrap_or_default();
        let mode = match detector_file.mode.as_deref() {
            Some(mode) => mode.parse::<ModePreference>()?,
            None => ModePreference::Auto,
        };
        let detector = DetectorSettings {
            allowed_classes: detector_file.allowed_classes.unwrap_or_else(|| {
                DEFAULT_ALLOWED_CLASSES
                    .iter()
                    .map(|c| c.to_string())
                    .collect()
            }),
            min_confidence: detector_file.min_confidence.unwrap_or(0.0),
            mode,
            model_path: detector_file.model_path,
            labels: detector_file.labels.unwrap_or_default(),
            input_width: detector_file.input_width.unwrap_or(DEFAULT_MODEL_INPUT),
            input_height: detector_file.input_height.unwrap_or(DEFAULT_MODEL_INPUT),
        };

        let capture_file = file.capture.unwrap_or_default();
        let mut cameras = HashMap::new();
        for (index, uri) in capture_file.cameras.unwrap_or_default() {
            let index: u32 = index
                .trim()
                .parse()
                .map_err(|_| anyhow!("capture.cameras key '{}' is not a camera index", index))?;
            cameras.insert(index, uri);
        }
        let capture = CaptureSettings {
            default_source: capture_file
                .default_source
                .unwrap_or_else(|| DEFAULT_CAPTURE_SOURCE.to_string()),
            cameras,
        };

        Ok(Self {
            db_path,
            areas_path,
            api_addr,
            engine,
            detector,
            capture,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("PARKWATCH_DB_PATH") {
            if !path.trim().is_empty() {
                self.db_path = path;
            }
        }
        if let Ok(path) = std::env::var("PARKWATCH_AREAS") {
            if !path.trim().is_empty() {
                self.areas_path = PathBuf::from(path);
            }
        }
        if let Ok(addr) = std::env::var("PARKWATCH_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api_addr = addr;
            }
        }
        if let Ok(source) = std::env::var("PARKWATCH_CAPTURE_SOURCE") {
            if !source.trim().is_empty() {
                self.capture.default_source = source;
            }
        }
        if let Ok(value) = std::env::var("PARKWATCH_OVERLAP_THRESHOLD") {
            self.engine.overlap_threshold = value
                .trim()
                .parse()
                .map_err(|_| anyhow!("PARKWATCH_OVERLAP_THRESHOLD must be a number"))?;
        }
        if let Ok(value) = std::env::var("PARKWATCH_VARIANCE_THRESHOLD") {
            self.engine.variance_threshold = value
                .trim()
                .parse()
                .map_err(|_| anyhow!("PARKWATCH_VARIANCE_THRESHOLD must be a number"))?;
        }
        if let Ok(classes) = std::env::var("PARKWATCH_ALLOWED_CLASSES") {
            self.detector.allowed_classes = split_csv(&classes);
        }
        if let Ok(mode) = std::env::var("PARKWATCH_MODE") {
            if !mode.trim().is_empty() {
                self.detector.mode = mode.parse()?;
            }
        }
        if let Ok(path) = std::env::var("PARKWATCH_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(path));
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.engine.validate()?;
        let conf = self.detector.min_confidence;
        if !conf.is_finite() || !(0.0..=1.0).contains(&conf) {
            return Err(anyhow!(
                "detector.min_confidence must be within [0, 1], got {}",
                conf
            ));
        }
        if self.db_path.trim().is_empty() {
            return Err(anyhow!("db_path must not be empty"));
        }
        if self.api_addr.trim().is_empty() {
            return Err(anyhow!("api.addr must not be empty"));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(anyhow!("detector input size must be positive"));
        }
        Ok(())
    }

    pub fn adapter(&self) -> Result<DetectionAdapter> {
        Ok(DetectionAdapter::new(
            ClassAllowList::new(&self.detector.allowed_classes),
            self.detector.min_confidence,
        )?)
    }

    pub fn service_options(&self) -> Result<ServiceOptions> {
        Ok(ServiceOptions {
            mode: self.detector.mode,
            params: self.engine,
            adapter: self.adapter()?,
        })
    }

    pub fn capture_provider(&self) -> UriCapture {
        self.capture.cameras.iter().fold(
            UriCapture::new(&self.capture.default_source),
            |capture, (index, uri)| capture.with_camera(*index, uri),
        )
    }
}

fn read_config_file(path: &Path) -> Result<ServiceConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let cfg = ServiceConfig::from_file(ServiceConfigFile::default()).unwrap();
        assert_eq!(cfg.db_path, DEFAULT_DB_PATH);
        assert_eq!(cfg.api_addr, DEFAULT_API_ADDR);
        assert_eq!(cfg.engine, EngineParams::default());
        assert_eq!(cfg.detector.mode, ModePreference::Auto);
        assert_eq!(cfg.detector.allowed_classes.len(), 5);
        assert_eq!(cfg.capture.default_source, DEFAULT_CAPTURE_SOURCE);
    }

    #[test]
    fn camera_keys_must_be_indices() {
        let file: ServiceConfigFile =
            serde_json::from_str(r#"{"capture": {"cameras": {"front": "stub://"}}}"#).unwrap();
        assert!(ServiceConfig::from_file(file).is_err());
    }

    #[test]
    fn capture_provider_maps_cameras() {
        let file: ServiceConfigFile = serde_json::from_str(
            r#"{"capture": {"default_source": "stub://8x8", "cameras": {"3": "stub://2x2"}}}"#,
        )
        .unwrap();
        let cfg = ServiceConfig::from_file(file).unwrap();
        let capture = cfg.capture_provider();
        assert_eq!(capture.source_for(3), "stub://2x2");
        assert_eq!(capture.source_for(0), "stub://8x8");
    }

    #[test]
    fn split_csv_drops_blanks() {
        assert_eq!(split_csv(" car, ,bus,"), vec!["car", "bus"]);
        assert!(split_csv("").is_empty());
    }
}
