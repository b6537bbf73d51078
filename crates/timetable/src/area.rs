//! Game areas
//!
//! An area owns its lines in a flat vector. Lookups by line number, the
//! largest line number, and filtered line views are all memoized and
//! dropped together by [`Area::invalidate_caches`].

use crate::boss::{Boss, BossRef};
use crate::cache::{CacheStats, ProjectionCache};
use crate::line::Line;
use crate::validate;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tofmt_core::{LineNumber, Result, Timestamp, ValidationError};

/// One entry of the upcoming-respawn view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RespawnEntry {
    pub line: LineNumber,
    pub boss: String,
    pub respawn_at: Timestamp,
    pub remaining: Duration,
}

/// A game zone with several parallel lines
pub struct Area {
    name: String,
    line_limit: u8,
    lines: Vec<Line>,
    lookup: Mutex<Option<HashMap<LineNumber, usize>>>,
    /// `None` = not computed; `Some(None)` = no lines
    largest_line: Mutex<Option<Option<LineNumber>>>,
    filtered: Mutex<ProjectionCache<Vec<LineNumber>, Arc<[usize]>>>,
}

impl Area {
    /// Create an area holding at most `line_limit` lines
    pub fn new(name: &str, lines: Vec<Line>, line_limit: u8) -> Result<Self> {
        validate::name("area name", name)?;
        validate_lines(&lines, line_limit)?;

        Ok(Self {
            name: name.to_string(),
            line_limit,
            lines,
            lookup: Mutex::new(None),
            largest_line: Mutex::new(None),
            filtered: Mutex::new(ProjectionCache::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line_limit(&self) -> u8 {
        self.line_limit
    }

    /// Every line, in order
    pub fn all_lines(&self) -> &[Line] {
        &self.lines
    }

    /// Lines whose number is not in `exclude_line_numbers`
    pub fn lines(&self, exclude_line_numbers: &[LineNumber]) -> Vec<&Line> {
        self.filtered_indices(exclude_line_numbers)
            .iter()
            .map(|&i| &self.lines[i])
            .collect()
    }

    /// Cached indices of the lines visible under `exclude_line_numbers`
    pub fn filtered_indices(&self, exclude_line_numbers: &[LineNumber]) -> Arc<[usize]> {
        let mut key = exclude_line_numbers.to_vec();
        key.sort_unstable();
        key.dedup();

        self.filtered.lock().get_or_insert_with(key.clone(), || {
            self.lines
                .iter()
                .enumerate()
                .filter(|(_, l)| key.binary_search(&l.number()).is_err())
                .map(|(i, _)| i)
                .collect()
        })
    }

    pub fn find_line(&self, number: LineNumber) -> Option<&Line> {
        self.find_index(number).map(|i| &self.lines[i])
    }

    /// Mutable access to one line
    ///
    /// The line number cannot change through this, so area caches stay
    /// valid; the line guards its own caches.
    pub fn line_mut(&mut self, number: LineNumber) -> Option<&mut Line> {
        let index = self.find_index(number)?;
        self.lines.get_mut(index)
    }

    pub fn find_boss<'a>(&self, line: LineNumber, boss: impl Into<BossRef<'a>>) -> Option<&Boss> {
        self.find_line(line)?.find(boss)
    }

    pub fn find_boss_mut(&mut self, line: LineNumber, name: &str) -> Option<&mut Boss> {
        self.line_mut(line)?.find_boss_mut(name)
    }

    pub fn largest_line_number(&self) -> Option<LineNumber> {
        *self
            .largest_line
            .lock()
            .get_or_insert_with(|| self.lines.iter().map(Line::number).max())
    }

    pub fn add_line(&mut self, line: Line) -> Result<()> {
        validate::count("lines per area", self.lines.len() + 1, usize::from(self.line_limit))?;
        if self.find_index(line.number()).is_some() {
            return Err(ValidationError::Duplicate {
                field: "line number",
                value: line.number().to_string(),
            }
            .into());
        }

        self.lines.push(line);
        self.invalidate_caches();
        Ok(())
    }

    pub fn remove_line(&mut self, number: LineNumber) -> Option<Line> {
        let index = self.find_index(number)?;
        let line = self.lines.remove(index);
        self.invalidate_caches();
        Some(line)
    }

    /// Record a kill of `boss` on `line`
    pub fn kill(&mut self, line: LineNumber, boss: &str, now: Timestamp) -> Result<()> {
        self.require_boss_mut(line, boss)?.kill(now)
    }

    /// Force `boss` on `line` alive
    pub fn respawn(&mut self, line: LineNumber, boss: &str) -> Result<()> {
        self.require_boss_mut(line, boss)?.respawn();
        Ok(())
    }

    /// Force every boss in the area alive
    pub fn respawn_all(&mut self) {
        for line in &mut self.lines {
            line.bosses_mut().for_each(Boss::respawn);
        }
    }

    /// Set the respawn time of every boss on every line.
    ///
    /// Drops all derived caches, including the per-line ones, since views
    /// built elsewhere may order by timing.
    pub fn set_global_boss_respawn_time(&mut self, minutes: u64) -> Result<()> {
        let respawn_time = respawn_minutes(minutes)?;

        for line in &mut self.lines {
            for boss in line.bosses_mut() {
                boss.set_respawn_time(respawn_time)?;
            }
        }

        tracing::debug!("Area {}: respawn time set to {} minutes", self.name, minutes);
        self.invalidate_caches();
        Ok(())
    }

    /// Dead bosses in visible lines, soonest respawn first
    pub fn respawn_queue<S: AsRef<str>>(
        &self,
        now: Timestamp,
        bosses_exclude: &[S],
        lines_exclude: &[LineNumber],
    ) -> Vec<RespawnEntry> {
        let mut queue: Vec<RespawnEntry> = self
            .lines(lines_exclude)
            .into_iter()
            .flat_map(|line| {
                line.bosses(bosses_exclude)
                    .into_iter()
                    .filter(|b| !b.is_alive(now))
                    .map(move |b| RespawnEntry {
                        line: line.number(),
                        boss: b.name().to_string(),
                        respawn_at: b.respawn_at(),
                        remaining: b.time_until_respawn(now),
                    })
            })
            .collect();

        queue.sort_by(|a, b| a.respawn_at.cmp(&b.respawn_at).then(a.line.cmp(&b.line)));
        queue
    }

    /// Drop area caches and every line's caches
    pub fn invalidate_caches(&self) {
        tracing::trace!("Invalidating caches for area {}", self.name);
        *self.lookup.lock() = None;
        *self.largest_line.lock() = None;
        self.filtered.lock().clear();
        for line in &self.lines {
            line.invalidate_caches();
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.filtered.lock().stats()
    }

    fn find_index(&self, number: LineNumber) -> Option<usize> {
        let mut lookup = self.lookup.lock();
        let table = lookup.get_or_insert_with(|| {
            self.lines
                .iter()
                .enumerate()
                .map(|(i, l)| (l.number(), i))
                .collect()
        });
        table.get(&number).copied()
    }

    fn require_boss_mut(&mut self, line: LineNumber, boss: &str) -> Result<&mut Boss> {
        let line = self
            .line_mut(line)
            .ok_or(ValidationError::UnknownLine(line))?;
        line.find_boss_mut(boss)
            .ok_or_else(|| ValidationError::UnknownBoss(boss.to_string()).into())
    }
}

/// Convert minutes to a respawn duration that fits the wire format
pub(crate) fn respawn_minutes(minutes: u64) -> Result<Duration> {
    let respawn_time = Duration::from_secs(minutes.saturating_mul(60));
    validate::respawn_time(respawn_time)?;
    Ok(respawn_time)
}

fn validate_lines(lines: &[Line], line_limit: u8) -> Result<()> {
    validate::count("lines per area", lines.len(), usize::from(line_limit))?;
    let mut seen = HashSet::new();
    for line in lines {
        if !seen.insert(line.number()) {
            return Err(ValidationError::Duplicate {
                field: "line number",
                value: line.number().to_string(),
            }
            .into());
        }
    }
    Ok(())
}

impl Clone for Area {
    /// Copies the data only; the clone starts with empty caches
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            line_limit: self.line_limit,
            lines: self.lines.clone(),
            lookup: Mutex::new(None),
            largest_line: Mutex::new(None),
            filtered: Mutex::new(ProjectionCache::default()),
        }
    }
}

/// Structural equality over name and lines; the line limit is local policy
impl PartialEq for Area {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.lines == other.lines
    }
}

impl Eq for Area {}

impl std::fmt::Debug for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Area")
            .field("name", &self.name)
            .field("line_limit", &self.line_limit)
            .field("lines", &self.lines)
            .finish()
    }
}
