//! Snapshot codec
//!
//! A snapshot is a self-contained copy of every area plus the sender's two
//! exclusion sets. It is validated on construction and on decode, so a
//! `Snapshot` value is always within the catalog's bounds.
//!
//! # Layout
//! ```text
//! area_count u8
//!   name str8, line_count u8
//!     line_number u8, boss_count u8
//!       name str8, nick_name str8, color str8, kill_at i64 (ms), respawn_ms u32
//! bosses_exclude_count u16, str8 each
//! lines_exclude_count u8, u8 each
//! ```

use crate::codecs::*;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tofmt_core::{LineNumber, Result, Timestamp};
use tofmt_timetable::{Area, Boss, Catalog, CatalogLimits, Line};

/// Point-in-time copy of a catalog plus exclusion filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    areas: Vec<Area>,
    bosses_exclude: Vec<String>,
    lines_exclude: Vec<LineNumber>,
}

impl Snapshot {
    /// Validate and assemble a snapshot
    pub fn new(
        areas: Vec<Area>,
        bosses_exclude: Vec<String>,
        lines_exclude: Vec<LineNumber>,
        limits: &CatalogLimits,
    ) -> Result<Self> {
        limits.validate_areas(&areas)?;
        limits.validate_exclusions(&bosses_exclude, &lines_exclude)?;
        Ok(Self {
            areas,
            bosses_exclude,
            lines_exclude,
        })
    }

    /// Copy the catalog's current state
    pub fn capture(catalog: &Catalog, bosses_exclude: &[String], lines_exclude: &[LineNumber]) -> Result<Self> {
        Self::new(
            catalog.areas().to_vec(),
            bosses_exclude.to_vec(),
            lines_exclude.to_vec(),
            catalog.limits(),
        )
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn bosses_exclude(&self) -> &[String] {
        &self.bosses_exclude
    }

    pub fn lines_exclude(&self) -> &[LineNumber] {
        &self.lines_exclude
    }

    pub fn into_parts(self) -> (Vec<Area>, Vec<String>, Vec<LineNumber>) {
        (self.areas, self.bosses_exclude, self.lines_exclude)
    }

    /// Serialize to the binary layout
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::new();
        self.write(&mut buf)?;
        Ok(buf.to_vec())
    }

    pub fn write(&self, buf: &mut BytesMut) -> Result<()> {
        write_count8(buf, "areas", self.areas.len())?;
        for area in &self.areas {
            write_str8(buf, "area name", area.name())?;
            write_count8(buf, "lines per area", area.all_lines().len())?;
            for line in area.all_lines() {
                write_line(buf, line)?;
            }
        }

        write_count16(buf, "excluded bosses", self.bosses_exclude.len())?;
        for name in &self.bosses_exclude {
            write_str8(buf, "excluded boss", name)?;
        }

        write_count8(buf, "excluded lines", self.lines_exclude.len())?;
        for &line in &self.lines_exclude {
            write_u8(buf, line);
        }
        Ok(())
    }

    /// Parse and fully validate a snapshot.
    ///
    /// The whole buffer must be consumed; nothing is returned on any error.
    pub fn decode(bytes: &[u8], limits: &CatalogLimits) -> Result<Self> {
        let mut buf = Bytes::copy_from_slice(bytes);

        let area_count = usize::from(read_u8(&mut buf)?);
        tofmt_timetable::validate::count("areas", area_count, limits.max_areas)?;

        let mut areas = Vec::with_capacity(area_count);
        for _ in 0..area_count {
            let name = read_str8(&mut buf)?;
            let line_count = usize::from(read_u8(&mut buf)?);
            tofmt_timetable::validate::count("lines per area", line_count, usize::from(limits.line_limit))?;

            let mut lines = Vec::with_capacity(line_count);
            for _ in 0..line_count {
                lines.push(read_line(&mut buf)?);
            }
            areas.push(Area::new(&name, lines, limits.line_limit)?);
        }

        let excluded = usize::from(read_u16(&mut buf)?);
        tofmt_timetable::validate::count("excluded bosses", excluded, limits.known_boss_names.len())?;
        let bosses_exclude = (0..excluded)
            .map(|_| read_str8(&mut buf))
            .collect::<Result<Vec<_>>>()?;

        let excluded = usize::from(read_u8(&mut buf)?);
        let lines_exclude = (0..excluded)
            .map(|_| read_u8(&mut buf))
            .collect::<Result<Vec<_>>>()?;

        expect_end(&buf, "snapshot")?;
        Self::new(areas, bosses_exclude, lines_exclude, limits)
    }
}

fn write_line(buf: &mut BytesMut, line: &Line) -> Result<()> {
    write_u8(buf, line.number());
    write_count8(buf, "bosses per line", line.len())?;
    for boss in line.all_bosses() {
        write_str8(buf, "boss name", boss.name())?;
        write_str8(buf, "boss nickname", boss.nick_name())?;
        write_str8(buf, "boss color", boss.color())?;
        write_i64(buf, boss.kill_at().as_millis());
        // Boss construction keeps respawn times within u32 milliseconds
        write_u32(buf, u32::try_from(boss.respawn_time().as_millis()).unwrap_or(u32::MAX));
    }
    Ok(())
}

fn read_line(buf: &mut Bytes) -> Result<Line> {
    let number = read_u8(buf)?;
    let boss_count = usize::from(read_u8(buf)?);

    let mut bosses = Vec::with_capacity(boss_count);
    for _ in 0..boss_count {
        let name = read_str8(buf)?;
        let nick_name = read_str8(buf)?;
        let color = read_str8(buf)?;
        let kill_at = Timestamp::from_millis(read_i64(buf)?);
        let respawn_time = Duration::from_millis(u64::from(read_u32(buf)?));
        bosses.push(Boss::from_parts(name, nick_name, color, kill_at, respawn_time)?);
    }

    Line::new(number, bosses)
}
