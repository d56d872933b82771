use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Deserializer};

use crate::{
    core::{Resolution, TimeWindow},
    error::{BumpgenError, BumpgenResult},
};

/// A field that is either the wildcard `"*"` or a concrete value.
#[derive(Clone, Debug, PartialEq)]
pub enum StarOr<T> {
    Star,
    Value(T),
}

impl<T> StarOr<T> {
    pub fn as_value(&self) -> Option<&T> {
        match self {
            StarOr::Star => None,
            StarOr::Value(v) => Some(v),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for StarOr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.as_str() == Some("*") {
            return Ok(StarOr::Star);
        }
        T::deserialize(value)
            .map(StarOr::Value)
            .map_err(serde::de::Error::custom)
    }
}

/// Allowed windows for one background file, as `[start, end]` second pairs.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundContentConfig {
    pub windows: Vec<[f64; 2]>,
}

/// Per-channel generation settings. A single entry can cover many
/// channels via the wildcard or an explicit id list.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    pub channel_ids: StarOr<Vec<String>>,
    pub template: String,
    /// Which library files this channel may draw backgrounds from.
    pub background_content: StarOr<Vec<String>>,
    /// Bump length in seconds, `"*"` for the default.
    pub length: StarOr<f64>,
    pub resolution: Resolution,
    #[serde(default)]
    pub padding: Option<f64>,
}

impl ChannelConfig {
    pub fn matches(&self, channel_id: &str) -> bool {
        match &self.channel_ids {
            StarOr::Star => true,
            StarOr::Value(ids) => ids.iter().any(|id| id == channel_id),
        }
    }

    /// The allow-list for background selection; `None` means any file.
    pub fn allow_list(&self) -> Option<&[String]> {
        self.background_content.as_value().map(Vec::as_slice)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub output_folder: String,
    pub background_content_folder: String,
    #[serde(default)]
    pub background_content: HashMap<String, BackgroundContentConfig>,
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub language: Option<String>,
}

impl AppConfig {
    pub fn load(path: &Path) -> BumpgenResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BumpgenError::validation(format!("cannot read config '{}': {e}", path.display()))
        })?;
        let config: AppConfig = serde_json::from_str(&text).map_err(|e| {
            BumpgenError::validation(format!("invalid config '{}': {e}", path.display()))
        })?;
        if config.channels.is_empty() {
            return Err(BumpgenError::validation(
                "config must define at least one channel entry",
            ));
        }
        Ok(config)
    }

    /// First channel entry matching `channel_id`; entries are checked in
    /// file order so specific entries should precede wildcard ones.
    pub fn channel_config_for(&self, channel_id: &str) -> BumpgenResult<&ChannelConfig> {
        self.channels
            .iter()
            .find(|c| c.matches(channel_id))
            .ok_or_else(|| {
                BumpgenError::validation(format!(
                    "no channel configuration matches id '{channel_id}'"
                ))
            })
    }

    /// Configured allowed windows keyed by library file name.
    pub fn allowed_windows(&self) -> BumpgenResult<HashMap<String, Vec<TimeWindow>>> {
        let mut out = HashMap::with_capacity(self.background_content.len());
        for (name, content) in &self.background_content {
            let mut windows = Vec::with_capacity(content.windows.len());
            for [start, end] in &content.windows {
                let window = TimeWindow::new(*start, *end).map_err(|e| {
                    BumpgenError::validation(format!("bad window for '{name}': {e}"))
                })?;
                windows.push(window);
            }
            out.insert(name.clone(), windows);
        }
        Ok(out)
    }
}
