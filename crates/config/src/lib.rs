//! tofmt configuration
//!
//! Supplies the static boss catalog (areas, default line counts, boss
//! templates) and the user settings that shape catalog construction and
//! broadcasting.
//!
//! Both can be loaded from line-oriented text files:
//!
//! ```text
//! # catalog.txt
//! linelimit = 255
//!
//! [Asha]
//! lines = 50
//! boss = Sobek, Croc, #3A4454
//! boss = Lucia, Mom, #BDA8A0, 90
//! ```

mod settings;

pub use settings::Settings;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tofmt_core::{Result, TimerError, MAX_STRING_LEN};

/// Upper bound on lines per area, and the default line limit
pub const DEFAULT_LINE_LIMIT: u8 = 255;

/// Respawn time applied to bosses without an explicit one
pub const DEFAULT_RESPAWN_MINUTES: u64 = 60;

/// Maximum bosses per line
pub const MAX_BOSSES_PER_LINE: usize = 255;

/// One boss as configured for an area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossTemplate {
    /// Canonical name, unique within an area
    pub name: String,
    /// Short display name
    pub nick_name: String,
    /// Hex display color, e.g. `#BB0001`
    pub color: String,
    /// Per-boss respawn time; `None` means the one-hour default
    pub respawn_time: Option<Duration>,
}

impl BossTemplate {
    pub fn new(name: &str, nick_name: &str, color: &str) -> Self {
        Self {
            name: name.into(),
            nick_name: nick_name.into(),
            color: color.into(),
            respawn_time: None,
        }
    }

    pub fn with_respawn_time(mut self, respawn_time: Duration) -> Self {
        self.respawn_time = Some(respawn_time);
        self
    }
}

/// One configured area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaTemplate {
    pub name: String,
    /// Number of lines created when no override is given
    pub default_line_count: u8,
    /// Bosses seeded into every line of the area
    pub bosses: Vec<BossTemplate>,
}

/// Complete catalog configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Maximum lines per area (at most 255)
    pub line_limit: u8,
    pub areas: Vec<AreaTemplate>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        fn area(name: &str, bosses: &[(&str, &str, &str)]) -> AreaTemplate {
            AreaTemplate {
                name: name.into(),
                default_line_count: 50,
                bosses: bosses
                    .iter()
                    .map(|(name, nick, color)| BossTemplate::new(name, nick, color))
                    .collect(),
            }
        }

        Self {
            line_limit: DEFAULT_LINE_LIMIT,
            areas: vec![
                area(
                    "亞夏",
                    &[
                        ("羅貝拉格", "花", "#BB0001"),
                        ("阿波菲斯", "狗", "#86775F"),
                        ("急凍機甲", "龍蝦", "#910913"),
                        ("索貝克", "鱷魚", "#3A4454"),
                        ("露琪亞", "媽", "#BDA8A0"),
                        ("巴巴羅薩", "雙頭狗", "#613655"),
                    ],
                ),
                area(
                    "人工島",
                    &[("間躍雙火龍", "火龍", "#5E5F84"), ("吞噬者", "青蛙", "#668291")],
                ),
                area(
                    "維拉",
                    &[
                        ("瑪格瑪", "鹿", "#353231"),
                        ("倫迪爾", "沙鱷魚", "#404546"),
                        ("伊娃", "棉花", "#FFFFFF"),
                    ],
                ),
                area("深淵", &[("海拉", "海拉", "#15151F"), ("科爾頓", "河馬", "#48525D")]),
                area("溟海", &[("哈伯拉", "哈伯拉", "#F0DA52"), ("絲奇拉", "絲奇拉", "#737B98")]),
            ],
        }
    }
}

impl CatalogConfig {
    /// Load a catalog from a text file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse catalog text. Unlike settings, every malformed line is an error.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self {
            line_limit: DEFAULT_LINE_LIMIT,
            areas: Vec::new(),
        };

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                config.areas.push(AreaTemplate {
                    name: name.trim().into(),
                    default_line_count: 50,
                    bosses: Vec::new(),
                });
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(parse_error(line_no, "expected `key = value`"));
            };
            let (key, value) = (key.trim(), value.trim());

            match (key, config.areas.last_mut()) {
                ("linelimit", None) => {
                    config.line_limit = value
                        .parse()
                        .map_err(|_| parse_error(line_no, "linelimit must be 0-255"))?;
                }
                ("lines", Some(area)) => {
                    area.default_line_count = value
                        .parse()
                        .map_err(|_| parse_error(line_no, "lines must be 0-255"))?;
                }
                ("boss", Some(area)) => area.bosses.push(parse_boss(line_no, value)?),
                (_, None) => {
                    return Err(parse_error(line_no, &format!("unknown global option `{key}`")))
                }
                (_, Some(_)) => {
                    return Err(parse_error(line_no, &format!("unknown area option `{key}`")))
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the structural rules every catalog must satisfy
    pub fn validate(&self) -> Result<()> {
        if self.areas.is_empty() {
            return Err(TimerError::Config("catalog defines no areas".into()));
        }
        if self.areas.len() > usize::from(u8::MAX) {
            return Err(TimerError::Config(format!(
                "catalog defines {} areas, limit is 255",
                self.areas.len()
            )));
        }

        let mut names = HashSet::new();
        for area in &self.areas {
            if area.name.is_empty() || area.name.len() > MAX_STRING_LEN {
                return Err(TimerError::Config(format!("invalid area name {:?}", area.name)));
            }
            if !names.insert(area.name.as_str()) {
                return Err(TimerError::Config(format!("duplicate area {:?}", area.name)));
            }
            if area.default_line_count == 0 || area.default_line_count > self.line_limit {
                return Err(TimerError::Config(format!(
                    "area {:?} has {} lines, expected 1-{}",
                    area.name, area.default_line_count, self.line_limit
                )));
            }
            if area.bosses.len() > MAX_BOSSES_PER_LINE {
                return Err(TimerError::Config(format!(
                    "area {:?} has {} bosses, limit is {}",
                    area.name,
                    area.bosses.len(),
                    MAX_BOSSES_PER_LINE
                )));
            }
            let mut bosses = HashSet::new();
            for boss in &area.bosses {
                if !bosses.insert(boss.name.as_str()) {
                    return Err(TimerError::Config(format!(
                        "duplicate boss {:?} in area {:?}",
                        boss.name, area.name
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn area(&self, name: &str) -> Option<&AreaTemplate> {
        self.areas.iter().find(|a| a.name == name)
    }

    /// Every configured boss name, in catalog order, without repeats
    pub fn all_boss_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.areas
            .iter()
            .flat_map(|a| a.bosses.iter())
            .filter(|b| seen.insert(b.name.as_str()))
            .map(|b| b.name.clone())
            .collect()
    }

    /// Log a summary of the catalog
    pub fn display(&self) {
        tracing::info!("Catalog configuration:");
        tracing::info!("  Line limit: {}", self.line_limit);
        for area in &self.areas {
            tracing::info!(
                "  [{}] {} lines, {} bosses",
                area.name,
                area.default_line_count,
                area.bosses.len()
            );
        }
    }
}

fn parse_boss(line_no: usize, value: &str) -> Result<BossTemplate> {
    let fields: Vec<&str> = value.split(',').map(str::trim).collect();
    match fields.as_slice() {
        [name, nick, color] => Ok(BossTemplate::new(name, nick, color)),
        [name, nick, color, minutes] => {
            let minutes: u64 = minutes
                .parse()
                .map_err(|_| parse_error(line_no, "respawn minutes must be a number"))?;
            Ok(BossTemplate::new(name, nick, color)
                .with_respawn_time(Duration::from_secs(minutes.saturating_mul(60))))
        }
        _ => Err(parse_error(
            line_no,
            "boss must be `name, nickname, #color[, respawn minutes]`",
        )),
    }
}

fn parse_error(line_no: usize, message: &str) -> TimerError {
    TimerError::Config(format!("line {line_no}: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_catalog() {
        let config = CatalogConfig::default();
        assert_eq!(config.areas.len(), 5);
        assert_eq!(config.line_limit, 255);
        assert!(config.areas.iter().all(|a| a.default_line_count == 50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_all_boss_names() {
        let config = CatalogConfig::default();
        let names = config.all_boss_names();
        assert_eq!(names.len(), 15);
        assert_eq!(names[0], "羅貝拉格");
        assert!(names.contains(&"索貝克".to_string()));
    }

    #[test]
    fn test_all_boss_names_dedups_shared_bosses() {
        let config = CatalogConfig::parse(
            r#"
[North]
boss = Sobek, Croc, #3A4454
[South]
boss = Sobek, Croc, #3A4454
boss = Hela, Hela, #15151F
"#,
        )
        .unwrap();
        assert_eq!(config.all_boss_names(), vec!["Sobek", "Hela"]);
    }

    #[test]
    fn test_parse_catalog() {
        let config = CatalogConfig::parse(
            r#"
# test catalog
linelimit = 100

[Asha]
lines = 20
boss = Sobek, Croc, #3A4454
boss = Lucia, Mom, #BDA8A0, 90
"#,
        )
        .unwrap();

        assert_eq!(config.line_limit, 100);
        let area = config.area("Asha").unwrap();
        assert_eq!(area.default_line_count, 20);
        assert_eq!(area.bosses.len(), 2);
        assert_eq!(area.bosses[0].respawn_time, None);
        assert_eq!(area.bosses[1].respawn_time, Some(Duration::from_secs(90 * 60)));
    }

    #[test]
    fn test_parse_rejects_bad_boss_line() {
        let err = CatalogConfig::parse("[Asha]\nboss = Sobek\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_rejects_line_count_over_limit() {
        let err = CatalogConfig::parse("linelimit = 10\n[Asha]\nlines = 11\n").unwrap_err();
        assert!(matches!(err, TimerError::Config(_)));
    }

    #[test]
    fn test_parse_rejects_duplicate_area() {
        let err = CatalogConfig::parse("[Asha]\n[Asha]\n").unwrap_err();
        assert!(err.to_string().contains("duplicate area"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[Vera]\nlines = 3\nboss = Eva, Cotton, #FFFFFF").unwrap();

        let config = CatalogConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.areas[0].name, "Vera");
        assert_eq!(config.areas[0].default_line_count, 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = CatalogConfig::load_from_file("/nonexistent/catalog.txt").unwrap_err();
        assert!(matches!(err, TimerError::Io(_)));
    }
}
