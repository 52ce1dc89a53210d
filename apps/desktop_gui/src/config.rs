//! Startup configuration for the prediction-service base URLs.

use std::{collections::HashMap, fs};

use client_core::ServiceEndpoints;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub scene_graph_url: String,
    pub probability_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scene_graph_url: "http://127.0.0.1:8000".into(),
            probability_url: "http://127.0.0.1:8001".into(),
        }
    }
}

/// Resolve settings: defaults, then `studio.toml`, then environment.
/// CLI flags are applied on top by the caller.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("studio.toml") {
        apply_file_overrides(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("SCENE_GRAPH_URL") {
        settings.scene_graph_url = v;
    }
    if let Ok(v) = std::env::var("STUDIO__SCENE_GRAPH_URL") {
        settings.scene_graph_url = v;
    }

    if let Ok(v) = std::env::var("PROBABILITY_URL") {
        settings.probability_url = v;
    }
    if let Ok(v) = std::env::var("STUDIO__PROBABILITY_URL") {
        settings.probability_url = v;
    }

    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(v) = file_cfg.get("scene_graph_url") {
            settings.scene_graph_url = v.clone();
        }
        if let Some(v) = file_cfg.get("probability_url") {
            settings.probability_url = v.clone();
        }
    }
}

impl Settings {
    pub fn endpoints(&self) -> ServiceEndpoints {
        let defaults = Settings::default();
        ServiceEndpoints {
            scene_graph_url: normalize_base_url(&self.scene_graph_url, &defaults.scene_graph_url),
            probability_url: normalize_base_url(&self.probability_url, &defaults.probability_url),
        }
    }
}

fn normalize_base_url(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');

    if trimmed.is_empty() {
        return fallback.to_string();
    }

    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}
