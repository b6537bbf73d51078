//! User settings
//!
//! The per-participant knobs that shape catalog construction and what a
//! broadcast carries. Unknown keys and unparsable values are logged and
//! skipped, leaving the default in place.

use crate::{CatalogConfig, DEFAULT_RESPAWN_MINUTES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tofmt_core::{LineNumber, PeerId, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// This participant's advertised id
    pub peer_id: PeerId,
    /// Id of the participant being followed, if any
    pub target_id: Option<PeerId>,
    /// Area name -> line count, replacing the catalog default
    pub line_count_overrides: BTreeMap<String, u8>,
    /// Uniform respawn time in minutes applied to every boss
    pub respawn_minutes: u64,
    /// Boss names hidden from views
    pub bosses_exclude: Vec<String>,
    /// Line numbers hidden from views
    pub lines_exclude: Vec<LineNumber>,
    /// Show nicknames instead of full boss names
    pub show_nickname: bool,
    /// Compression method name used for broadcasts
    pub compression: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            peer_id: PeerId::random(),
            target_id: None,
            line_count_overrides: BTreeMap::new(),
            respawn_minutes: DEFAULT_RESPAWN_MINUTES,
            bosses_exclude: Vec::new(),
            lines_exclude: Vec::new(),
            show_nickname: false,
            compression: "zstd".into(),
        }
    }
}

impl Settings {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut settings = Self::default();

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                settings.parse_option(key.trim(), value.trim());
            }
        }

        settings
    }

    fn parse_option(&mut self, key: &str, value: &str) {
        if let Some(area) = key.strip_prefix("maxline.") {
            match value.parse() {
                Ok(count) => {
                    self.line_count_overrides.insert(area.to_string(), count);
                }
                Err(_) => tracing::warn!("Ignoring line count {:?} for area {:?}", value, area),
            }
            return;
        }

        match key {
            "id" => self.peer_id = PeerId::new(value),
            "target" => {
                self.target_id = (!value.is_empty()).then(|| PeerId::new(value));
            }
            "respawn" => {
                self.respawn_minutes = value.parse().unwrap_or(DEFAULT_RESPAWN_MINUTES);
            }
            "exclude.bosses" => {
                self.bosses_exclude = split_list(value).map(String::from).collect();
            }
            "exclude.lines" => {
                self.lines_exclude = split_list(value)
                    .filter_map(|v| match v.parse() {
                        Ok(line) => Some(line),
                        Err(_) => {
                            tracing::warn!("Ignoring excluded line {:?}", v);
                            None
                        }
                    })
                    .collect();
            }
            "nickname" => self.show_nickname = value.parse().unwrap_or(false),
            "compression" => self.compression = value.to_lowercase(),
            _ => tracing::warn!("Unknown setting {:?}", key),
        }
    }

    /// Restore every area's line count to the catalog default
    pub fn reset_line_counts(&mut self, config: &CatalogConfig) {
        self.line_count_overrides = config
            .areas
            .iter()
            .map(|a| (a.name.clone(), a.default_line_count))
            .collect();
    }

    /// Uniform respawn override for catalog construction.
    ///
    /// `None` when the setting matches the default, so per-boss configured
    /// respawn times survive.
    pub fn respawn_override(&self) -> Option<u64> {
        (self.respawn_minutes != DEFAULT_RESPAWN_MINUTES).then_some(self.respawn_minutes)
    }

    pub fn display(&self) {
        tracing::info!("Settings:");
        tracing::info!("  Peer id: {}", self.peer_id);
        if let Some(target) = &self.target_id {
            tracing::info!("  Following: {}", target);
        }
        tracing::info!("  Respawn: {} minutes", self.respawn_minutes);
        tracing::info!("  Line overrides: {}", self.line_count_overrides.len());
        tracing::info!("  Excluded bosses: {}", self.bosses_exclude.len());
        tracing::info!("  Excluded lines: {}", self.lines_exclude.len());
        tracing::info!("  Compression: {}", self.compression);
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}
