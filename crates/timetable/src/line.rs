//! One server line and the bosses it hosts

use crate::boss::{Boss, BossRef};
use crate::cache::{CacheStats, ProjectionCache};
use crate::validate;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tofmt_config::MAX_BOSSES_PER_LINE;
use tofmt_core::{LineNumber, Result, ValidationError};

/// A parallel server instance
///
/// Bosses are stored in a flat vector; the name lookup table and the
/// filtered views hold indices into it.
///
/// # Thread Safety
/// Caches sit behind `Mutex` so shared readers can fill them. Mutation
/// takes `&mut self` and clears them before returning.
pub struct Line {
    number: LineNumber,
    bosses: Vec<Boss>,
    lookup: Mutex<Option<HashMap<String, usize>>>,
    filtered: Mutex<ProjectionCache<Vec<String>, Arc<[usize]>>>,
}

impl Line {
    pub fn new(number: LineNumber, bosses: Vec<Boss>) -> Result<Self> {
        validate_bosses(&bosses)?;
        Ok(Self {
            number,
            bosses,
            lookup: Mutex::new(None),
            filtered: Mutex::new(ProjectionCache::default()),
        })
    }

    pub fn number(&self) -> LineNumber {
        self.number
    }

    /// Every boss, in order
    pub fn all_bosses(&self) -> &[Boss] {
        &self.bosses
    }

    pub fn len(&self) -> usize {
        self.bosses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bosses.is_empty()
    }

    /// Bosses whose name is not in `exclude_names`
    pub fn bosses<S: AsRef<str>>(&self, exclude_names: &[S]) -> Vec<&Boss> {
        self.filtered_indices(exclude_names)
            .iter()
            .map(|&i| &self.bosses[i])
            .collect()
    }

    /// Cached indices of the bosses visible under `exclude_names`.
    ///
    /// Equivalent exclusion sets share one entry regardless of order or
    /// repeats.
    pub fn filtered_indices<S: AsRef<str>>(&self, exclude_names: &[S]) -> Arc<[usize]> {
        let key = exclusion_key(exclude_names);
        self.filtered.lock().get_or_insert_with(key.clone(), || {
            self.bosses
                .iter()
                .enumerate()
                .filter(|(_, b)| key.binary_search_by(|k| k.as_str().cmp(b.name())).is_err())
                .map(|(i, _)| i)
                .collect()
        })
    }

    pub fn find_boss(&self, name: &str) -> Option<&Boss> {
        self.find_index(name).map(|i| &self.bosses[i])
    }

    /// Look up by name or by identity with one of this line's bosses
    pub fn find<'a>(&self, key: impl Into<BossRef<'a>>) -> Option<&Boss> {
        match key.into() {
            BossRef::Name(name) => self.find_boss(name),
            BossRef::Boss(target) => self.bosses.iter().find(|b| std::ptr::eq(*b, target)),
        }
    }

    /// Mutable access for timing changes (kill, respawn, respawn time)
    ///
    /// Boss identity cannot change through this, so caches stay valid.
    pub fn find_boss_mut(&mut self, name: &str) -> Option<&mut Boss> {
        let index = self.find_index(name)?;
        self.bosses.get_mut(index)
    }

    /// Mutable iteration for timing changes across the whole line
    pub fn bosses_mut(&mut self) -> impl Iterator<Item = &mut Boss> {
        self.bosses.iter_mut()
    }

    pub fn push_boss(&mut self, boss: Boss) -> Result<()> {
        validate::count("bosses per line", self.bosses.len() + 1, MAX_BOSSES_PER_LINE)?;
        if self.find_index(boss.name()).is_some() {
            return Err(ValidationError::Duplicate {
                field: "boss name",
                value: boss.name().to_string(),
            }
            .into());
        }

        self.bosses.push(boss);
        self.invalidate_caches();
        Ok(())
    }

    pub fn remove_boss(&mut self, name: &str) -> Option<Boss> {
        let index = self.find_index(name)?;
        let boss = self.bosses.remove(index);
        self.invalidate_caches();
        Some(boss)
    }

    /// Replace the whole boss set, leaving the line untouched on error
    pub fn replace_bosses(&mut self, bosses: Vec<Boss>) -> Result<()> {
        validate_bosses(&bosses)?;
        self.bosses = bosses;
        self.invalidate_caches();
        Ok(())
    }

    /// Drop the lookup table and every filtered view
    pub fn invalidate_caches(&self) {
        tracing::trace!("Invalidating caches for line {}", self.number);
        *self.lookup.lock() = None;
        self.filtered.lock().clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.filtered.lock().stats()
    }

    fn find_index(&self, name: &str) -> Option<usize> {
        let mut lookup = self.lookup.lock();
        let table = lookup.get_or_insert_with(|| {
            self.bosses
                .iter()
                .enumerate()
                .map(|(i, b)| (b.name().to_string(), i))
                .collect()
        });
        table.get(name).copied()
    }
}

fn validate_bosses(bosses: &[Boss]) -> Result<()> {
    validate::count("bosses per line", bosses.len(), MAX_BOSSES_PER_LINE)?;
    let mut seen = std::collections::HashSet::new();
    for boss in bosses {
        if !seen.insert(boss.name()) {
            return Err(ValidationError::Duplicate {
                field: "boss name",
                value: boss.name().to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Sorted, de-duplicated owned copy of an exclusion set
fn exclusion_key<S: AsRef<str>>(exclude: &[S]) -> Vec<String> {
    let mut key: Vec<String> = exclude.iter().map(|s| s.as_ref().to_string()).collect();
    key.sort();
    key.dedup();
    key
}

impl Clone for Line {
    /// Copies the data only; the clone starts with empty caches
    fn clone(&self) -> Self {
        Self {
            number: self.number,
            bosses: self.bosses.clone(),
            lookup: Mutex::new(None),
            filtered: Mutex::new(ProjectionCache::default()),
        }
    }
}

impl PartialEq for Line {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number && self.bosses == other.bosses
    }
}

impl Eq for Line {}

impl std::fmt::Debug for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Line")
            .field("number", &self.number)
            .field("bosses", &self.bosses)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boss(name: &str) -> Boss {
        Boss::new(name, "", "#FFFFFF", None).unwrap()
    }

    fn line() -> Line {
        Line::new(1, vec![boss("Sobek"), boss("Hela"), boss("Eva")]).unwrap()
    }

    fn names(bosses: &[&Boss]) -> Vec<String> {
        bosses.iter().map(|b| b.name().to_string()).collect()
    }

    #[test]
    fn test_filtered_view() {
        let line = line();
        assert_eq!(names(&line.bosses::<&str>(&[])), vec!["Sobek", "Hela", "Eva"]);
        assert_eq!(names(&line.bosses(&["Sobek"])), vec!["Hela", "Eva"]);
        assert_eq!(names(&line.bosses(&["Sobek", "Eva", "Unknown"])), vec!["Hela"]);
    }

    #[test]
    fn test_filtered_view_is_cached() {
        let line = line();
        let first = line.filtered_indices(&["Hela"]);
        let second = line.filtered_indices(&["Hela"]);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(line.cache_stats().hits, 1);
        assert_eq!(line.cache_stats().misses, 1);
    }

    #[test]
    fn test_equivalent_exclusions_share_entry() {
        let line = line();
        let a = line.filtered_indices(&["Eva", "Sobek"]);
        let b = line.filtered_indices(&["Sobek", "Eva", "Sobek"]);

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(line.cache_stats().entries, 1);
    }

    #[test]
    fn test_push_invalidates() {
        let mut line = line();
        let before = line.filtered_indices(&["Hela"]);
        assert!(line.find_boss("Lucia").is_none());

        line.push_boss(boss("Lucia")).unwrap();

        let after = line.filtered_indices(&["Hela"]);
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(names(&line.bosses(&["Hela"])), vec!["Sobek", "Eva", "Lucia"]);
        assert!(line.find_boss("Lucia").is_some());
    }

    #[test]
    fn test_remove_invalidates() {
        let mut line = line();
        assert!(line.find_boss("Hela").is_some());
        line.bosses::<&str>(&[]);

        let removed = line.remove_boss("Hela").unwrap();
        assert_eq!(removed.name(), "Hela");
        assert!(line.find_boss("Hela").is_none());
        assert_eq!(line.find_boss("Eva").map(Boss::name), Some("Eva"));
        assert_eq!(names(&line.bosses::<&str>(&[])), vec!["Sobek", "Eva"]);
    }

    #[test]
    fn test_replace_bosses() {
        let mut line = line();
        line.find_boss("Sobek");
        line.replace_bosses(vec![boss("Hela")]).unwrap();

        assert!(line.find_boss("Sobek").is_none());
        assert_eq!(line.len(), 1);
    }

    #[test]
    fn test_replace_rejects_duplicates_without_change() {
        let mut line = line();
        let err = line.replace_bosses(vec![boss("Hela"), boss("Hela")]).unwrap_err();

        assert!(matches!(err.validation(), Some(ValidationError::Duplicate { .. })));
        assert_eq!(line.len(), 3);
    }

    #[test]
    fn test_duplicate_push_rejected() {
        let mut line = line();
        assert!(line.push_boss(boss("Sobek")).is_err());
        assert_eq!(line.len(), 3);
    }

    #[test]
    fn test_capacity_bounds() {
        let full: Vec<Boss> = (0..255).map(|i| boss(&format!("b{i}"))).collect();
        let mut line = Line::new(0, full).unwrap();
        assert_eq!(line.len(), 255);

        let err = line.push_boss(boss("extra")).unwrap_err();
        assert!(matches!(err.validation(), Some(ValidationError::TooMany { .. })));

        let too_many: Vec<Boss> = (0..256).map(|i| boss(&format!("b{i}"))).collect();
        assert!(Line::new(255, too_many).is_err());
    }

    #[test]
    fn test_find_by_reference() {
        let line = line();
        let hela = line.find_boss("Hela").unwrap();
        assert!(std::ptr::eq(line.find(hela).unwrap(), hela));

        let outsider = boss("Hela");
        assert!(line.find(&outsider).is_none());
    }

    #[test]
    fn test_timing_mutation_keeps_lookup() {
        let mut line = line();
        line.find_boss_mut("Eva")
            .unwrap()
            .kill(tofmt_core::Timestamp::from_secs(10))
            .unwrap();

        assert_eq!(
            line.find_boss("Eva").unwrap().kill_at(),
            tofmt_core::Timestamp::from_secs(10)
        );
    }

    #[test]
    fn test_clone_and_eq() {
        let line = line();
        line.bosses(&["Eva"]);
        let copy = line.clone();

        assert_eq!(line, copy);
        assert_eq!(copy.cache_stats().entries, 0);
    }
}
