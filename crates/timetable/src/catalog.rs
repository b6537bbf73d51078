//! The full set of areas
//!
//! Built once from a [`CatalogConfig`] plus per-area line count overrides.
//! Followers swap the whole area list at once with
//! [`Catalog::replace_areas`].

use crate::area::{respawn_minutes, Area};
use crate::boss::Boss;
use crate::line::Line;
use crate::validate;
use std::collections::{BTreeMap, HashSet};
use tofmt_config::CatalogConfig;
use tofmt_core::{LineNumber, Result, ValidationError};

/// Bounds every snapshot of a catalog must respect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLimits {
    /// Number of configured areas
    pub max_areas: usize,
    /// Maximum lines per area
    pub line_limit: u8,
    /// Every configured boss name
    pub known_boss_names: Vec<String>,
}

impl CatalogLimits {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            max_areas: config.areas.len(),
            line_limit: config.line_limit,
            known_boss_names: config.all_boss_names(),
        }
    }

    pub fn is_known_boss(&self, name: &str) -> bool {
        self.known_boss_names.iter().any(|n| n == name)
    }

    /// Check exclusion sets against the known universe and the line limit
    pub fn validate_exclusions(&self, bosses_exclude: &[String], lines_exclude: &[LineNumber]) -> Result<()> {
        validate::count("excluded bosses", bosses_exclude.len(), self.known_boss_names.len())?;
        for name in bosses_exclude {
            validate::max_len("excluded boss", name)?;
            if !self.is_known_boss(name) {
                return Err(ValidationError::UnknownExclusion(name.clone()).into());
            }
        }
        validate::count("excluded lines", lines_exclude.len(), usize::from(self.line_limit))?;
        Ok(())
    }

    /// Check an area list against the configured area count and line limit
    pub fn validate_areas(&self, areas: &[Area]) -> Result<()> {
        validate::count("areas", areas.len(), self.max_areas)?;
        let mut names = HashSet::new();
        for area in areas {
            if !names.insert(area.name()) {
                return Err(ValidationError::Duplicate {
                    field: "area name",
                    value: area.name().to_string(),
                }
                .into());
            }
            validate::count("lines per area", area.all_lines().len(), usize::from(self.line_limit))?;
        }
        Ok(())
    }
}

/// Every area of the timetable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    areas: Vec<Area>,
    limits: CatalogLimits,
}

impl Catalog {
    /// Build the catalog from configuration
    ///
    /// Each area gets `line_count_overrides[name]` lines (numbered from 1),
    /// or its configured default when there is no override or the override
    /// is zero. Every line receives fresh boss instances. An override key
    /// naming no configured area fails the whole build.
    pub fn build(
        config: &CatalogConfig,
        line_count_overrides: &BTreeMap<String, u8>,
        respawn_override_minutes: Option<u64>,
    ) -> Result<Self> {
        config.validate()?;

        if let Some(unknown) = line_count_overrides.keys().find(|k| config.area(k).is_none()) {
            return Err(ValidationError::UnknownArea(unknown.clone()).into());
        }

        let respawn_override = respawn_override_minutes.map(respawn_minutes).transpose()?;

        let mut areas = Vec::with_capacity(config.areas.len());
        for template in &config.areas {
            let line_count = match line_count_overrides.get(&template.name) {
                Some(&count) if count > 0 => count,
                _ => template.default_line_count,
            };
            if line_count > config.line_limit {
                return Err(ValidationError::OutOfRange {
                    field: "line count",
                    value: i64::from(line_count),
                    min: 1,
                    max: i64::from(config.line_limit),
                }
                .into());
            }

            let mut lines = Vec::with_capacity(usize::from(line_count));
            for number in 1..=line_count {
                let bosses = template
                    .bosses
                    .iter()
                    .map(|b| Boss::from_template(b, respawn_override))
                    .collect::<Result<Vec<_>>>()?;
                lines.push(Line::new(number, bosses)?);
            }

            areas.push(Area::new(&template.name, lines, config.line_limit)?);
        }

        tracing::debug!(
            "Built catalog: {} areas, {} lines",
            areas.len(),
            areas.iter().map(|a| a.all_lines().len()).sum::<usize>()
        );

        Ok(Self {
            areas,
            limits: CatalogLimits::from_config(config),
        })
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn limits(&self) -> &CatalogLimits {
        &self.limits
    }

    pub fn all_boss_names(&self) -> &[String] {
        &self.limits.known_boss_names
    }

    pub fn find_area(&self, name: &str) -> Option<&Area> {
        self.areas.iter().find(|a| a.name() == name)
    }

    pub fn area_mut(&mut self, name: &str) -> Option<&mut Area> {
        self.areas.iter_mut().find(|a| a.name() == name)
    }

    /// Apply one respawn time to every boss in every area
    pub fn set_global_boss_respawn_time(&mut self, minutes: u64) -> Result<()> {
        respawn_minutes(minutes)?;
        for area in &mut self.areas {
            area.set_global_boss_respawn_time(minutes)?;
        }
        Ok(())
    }

    /// Swap in a complete area list, or leave the catalog untouched on error
    pub fn replace_areas(&mut self, areas: Vec<Area>) -> Result<()> {
        self.limits.validate_areas(&areas)?;
        self.areas = areas;
        Ok(())
    }

    pub fn invalidate_caches(&self) {
        for area in &self.areas {
            area.invalidate_caches();
        }
    }
}
