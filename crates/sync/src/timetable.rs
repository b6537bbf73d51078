//! # Timetable
//!
//! The catalog together with the exclusion filters a snapshot carries.
//! Sessions hold it behind a [`SharedTimetable`] so encoding and decoding
//! can run outside the write lock.

use parking_lot::RwLock;
use std::sync::Arc;
use tofmt_config::{CatalogConfig, Settings};
use tofmt_core::{LineNumber, Result, Timestamp};
use tofmt_protocol::{Snapshot, SyncEnvelope};
use tofmt_timetable::{Catalog, RespawnEntry};

/// Timetable shared between a session and its readers
pub type SharedTimetable = Arc<RwLock<Timetable>>;

/// Catalog plus the filters applied when viewing or sharing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timetable {
    catalog: Catalog,
    bosses_exclude: Vec<String>,
    lines_exclude: Vec<LineNumber>,
}

impl Timetable {
    /// Wrap a catalog with no exclusions
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            bosses_exclude: Vec::new(),
            lines_exclude: Vec::new(),
        }
    }

    /// Build from configuration and user settings
    ///
    /// Settings are lenient, so excluded names that match no configured
    /// boss are dropped with a warning rather than failing the build.
    pub fn from_settings(config: &CatalogConfig, settings: &Settings) -> Result<Self> {
        let catalog = Catalog::build(config, &settings.line_count_overrides, settings.respawn_override())?;

        let bosses_exclude: Vec<String> = settings
            .bosses_exclude
            .iter()
            .filter(|name| {
                let known = catalog.limits().is_known_boss(name);
                if !known {
                    tracing::warn!("Ignoring exclusion of unknown boss {:?}", name);
                }
                known
            })
            .cloned()
            .collect();

        let mut timetable = Self::new(catalog);
        timetable.set_exclusions(bosses_exclude, settings.lines_exclude.clone())?;
        Ok(timetable)
    }

    /// Move into a [`SharedTimetable`]
    pub fn shared(self) -> SharedTimetable {
        Arc::new(RwLock::new(self))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn bosses_exclude(&self) -> &[String] {
        &self.bosses_exclude
    }

    pub fn lines_exclude(&self) -> &[LineNumber] {
        &self.lines_exclude
    }

    /// Replace both exclusion filters, validated against the catalog limits
    pub fn set_exclusions(&mut self, bosses_exclude: Vec<String>, lines_exclude: Vec<LineNumber>) -> Result<()> {
        self.catalog.limits().validate_exclusions(&bosses_exclude, &lines_exclude)?;
        self.bosses_exclude = bosses_exclude;
        self.lines_exclude = lines_exclude;
        Ok(())
    }

    /// Capture the current state into an envelope stamped now
    pub fn capture(&self) -> Result<SyncEnvelope> {
        SyncEnvelope::create(&self.catalog, &self.bosses_exclude, &self.lines_exclude)
    }

    /// Replace areas and filters with a decoded snapshot
    ///
    /// All or nothing: if the areas are rejected the timetable is unchanged.
    pub fn apply(&mut self, snapshot: Snapshot) -> Result<()> {
        let (areas, bosses_exclude, lines_exclude) = snapshot.into_parts();
        self.catalog.limits().validate_exclusions(&bosses_exclude, &lines_exclude)?;
        self.catalog.replace_areas(areas)?;
        self.bosses_exclude = bosses_exclude;
        self.lines_exclude = lines_exclude;
        Ok(())
    }

    /// Dead bosses across every area, soonest respawn first
    pub fn respawn_queue(&self, now: Timestamp) -> Vec<(&str, RespawnEntry)> {
        let mut queue: Vec<(&str, RespawnEntry)> = self
            .catalog
            .areas()
            .iter()
            .flat_map(|area| {
                area.respawn_queue(now, &self.bosses_exclude, &self.lines_exclude)
                    .into_iter()
                    .map(move |entry| (area.name(), entry))
            })
            .collect();

        queue.sort_by(|a, b| a.1.respawn_at.cmp(&b.1.respawn_at));
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tofmt_config::{AreaTemplate, BossTemplate};
    use tofmt_core::ValidationError;

    fn config() -> CatalogConfig {
        CatalogConfig {
            line_limit: 20,
            areas: vec![
                AreaTemplate {
                    name: "Asha".into(),
                    default_line_count: 4,
                    bosses: vec![
                        BossTemplate::new("Sobek", "Croc", "#3A4454"),
                        BossTemplate::new("Lucia", "Mom", "#BDA8A0"),
                    ],
                },
                AreaTemplate {
                    name: "Abyss".into(),
                    default_line_count: 2,
                    bosses: vec![BossTemplate::new("Hela", "Hela", "#15151F")],
                },
            ],
        }
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings::parse("maxline.Abyss = 6\nexclude.bosses = Sobek, Ghost\nexclude.lines = 3\n");
        let timetable = Timetable::from_settings(&config(), &settings).unwrap();

        assert_eq!(timetable.catalog().find_area("Abyss").unwrap().all_lines().len(), 6);
        assert_eq!(timetable.bosses_exclude(), ["Sobek"]);
        assert_eq!(timetable.lines_exclude(), [3]);
    }

    #[test]
    fn test_set_exclusions_rejects_unknown() {
        let catalog = Catalog::build(&config(), &Default::default(), None).unwrap();
        let mut timetable = Timetable::new(catalog);

        let err = timetable.set_exclusions(vec!["Ghost".into()], vec![]).unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::UnknownExclusion("Ghost".into())));
        assert!(timetable.bosses_exclude().is_empty());
    }

    #[test]
    fn test_capture_and_apply() {
        let catalog = Catalog::build(&config(), &Default::default(), None).unwrap();
        let mut owner = Timetable::new(catalog.clone());
        owner
            .catalog_mut()
            .area_mut("Asha")
            .unwrap()
            .kill(2, "Lucia", Timestamp::from_secs(100))
            .unwrap();
        owner.set_exclusions(vec!["Sobek".into()], vec![1]).unwrap();

        let mut follower = Timetable::new(catalog);
        assert_ne!(follower, owner);

        follower.apply(owner.capture().unwrap().payload).unwrap();
        assert_eq!(follower, owner);
    }

    #[test]
    fn test_respawn_queue_across_areas() {
        const T0: i64 = 1_700_000_000;
        let catalog = Catalog::build(&config(), &Default::default(), None).unwrap();
        let mut timetable = Timetable::new(catalog);
        let catalog = timetable.catalog_mut();
        catalog.area_mut("Abyss").unwrap().kill(1, "Hela", Timestamp::from_secs(T0 + 10)).unwrap();
        catalog.area_mut("Asha").unwrap().kill(3, "Sobek", Timestamp::from_secs(T0 + 5)).unwrap();
        catalog.area_mut("Asha").unwrap().kill(4, "Lucia", Timestamp::from_secs(T0 + 20)).unwrap();
        timetable.set_exclusions(vec![], vec![4]).unwrap();

        let queue = timetable.respawn_queue(Timestamp::from_secs(T0 + 60));
        let order: Vec<(&str, &str)> = queue.iter().map(|(area, e)| (*area, e.boss.as_str())).collect();
        assert_eq!(order, [("Asha", "Sobek"), ("Abyss", "Hela")]);
    }
}
