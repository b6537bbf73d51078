//! Subcommand implementations
//!
//! Command output goes to stdout, logging to stderr.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tofmt_config::{CatalogConfig, Settings};
use tofmt_core::{LineNumber, PeerId, Timestamp, ValidationError};
use tofmt_protocol::{CompressionType, SyncEnvelope, WireOptions};
use tofmt_sync::{ChannelTransport, SyncSession, Timetable};
use tofmt_timetable::{Area, CatalogLimits};
use tracing::info;

/// A kill given on the command line as `AREA:LINE:BOSS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kill {
    pub area: String,
    pub line: LineNumber,
    pub boss: String,
}

pub fn parse_kill(arg: &str) -> Result<Kill> {
    let mut parts = arg.splitn(3, ':');
    let (Some(area), Some(line), Some(boss)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("kill {arg:?} is not AREA:LINE:BOSS");
    };
    let line = line
        .trim()
        .parse()
        .with_context(|| format!("kill {arg:?}: bad line number {line:?}"))?;

    Ok(Kill {
        area: area.trim().to_string(),
        line,
        boss: boss.trim().to_string(),
    })
}

fn load_config(path: Option<&Path>) -> Result<CatalogConfig> {
    match path {
        Some(path) => CatalogConfig::load_from_file(path)
            .with_context(|| format!("loading catalog {}", path.display())),
        None => Ok(CatalogConfig::default()),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load_from_file(path)
            .with_context(|| format!("loading settings {}", path.display())),
        None => Ok(Settings::default()),
    }
}

/// Catalog and settings as they would be used by `export`
#[derive(Debug, Serialize)]
pub struct EffectiveConfig {
    pub catalog: CatalogConfig,
    pub settings: Settings,
}

pub fn effective_config(config: Option<&Path>, settings: Option<&Path>) -> Result<EffectiveConfig> {
    Ok(EffectiveConfig {
        catalog: load_config(config)?,
        settings: load_settings(settings)?,
    })
}

/// Build the timetable, apply kills, and encode it as text
pub fn export(
    config: Option<&Path>,
    settings: Option<&Path>,
    compression: Option<&str>,
    kills: &[String],
) -> Result<String> {
    let config = load_config(config)?;
    let settings = load_settings(settings)?;
    config.display();
    settings.display();
    let compression: CompressionType = compression.unwrap_or(settings.compression.as_str()).parse()?;

    let mut timetable = Timetable::from_settings(&config, &settings)?;
    let now = Timestamp::now();
    for kill in kills {
        let kill = parse_kill(kill)?;
        let area = timetable
            .catalog_mut()
            .area_mut(&kill.area)
            .ok_or_else(|| ValidationError::UnknownArea(kill.area.clone()))?;
        area.kill(kill.line, &kill.boss, now)?;
    }

    let options = WireOptions {
        compression,
        level: None,
        text: true,
    };
    let text = timetable.capture()?.to_text(&options)?;
    info!("Exported {} chars using {}", text.len(), compression.as_str());
    Ok(text)
}

#[derive(Debug, Serialize)]
pub struct AreaSummary {
    pub name: String,
    pub lines: usize,
    pub dead: usize,
}

#[derive(Debug, Serialize)]
pub struct QueueEntry {
    pub area: String,
    pub line: LineNumber,
    pub boss: String,
    pub respawn_at: i64,
    pub remaining_secs: u64,
}

/// What `inspect` reports about an envelope
#[derive(Debug, Serialize)]
pub struct EnvelopeSummary {
    pub version: u32,
    pub command: String,
    pub created_at: i64,
    pub areas: Vec<AreaSummary>,
    pub bosses_exclude: Vec<String>,
    pub lines_exclude: Vec<LineNumber>,
    pub respawn_queue: Vec<QueueEntry>,
}

impl EnvelopeSummary {
    fn new(envelope: &SyncEnvelope, now: Timestamp) -> Self {
        let snapshot = &envelope.payload;
        let mut respawn_queue: Vec<QueueEntry> = snapshot
            .areas()
            .iter()
            .flat_map(|area| {
                area.respawn_queue(now, snapshot.bosses_exclude(), snapshot.lines_exclude())
                    .into_iter()
                    .map(move |entry| QueueEntry {
                        area: area.name().to_string(),
                        line: entry.line,
                        boss: entry.boss,
                        respawn_at: entry.respawn_at.as_millis(),
                        remaining_secs: entry.remaining.as_secs(),
                    })
            })
            .collect();
        respawn_queue.sort_by_key(|e| e.respawn_at);

        Self {
            version: envelope.version,
            command: envelope.command.clone(),
            created_at: envelope.created_at.as_millis(),
            areas: snapshot.areas().iter().map(|a| summarize_area(a, now)).collect(),
            bosses_exclude: snapshot.bosses_exclude().to_vec(),
            lines_exclude: snapshot.lines_exclude().to_vec(),
            respawn_queue,
        }
    }

    pub fn print(&self) {
        println!("{} v{} created at {}", self.command, self.version, Timestamp::from_millis(self.created_at));
        for area in &self.areas {
            println!("  [{}] {} lines, {} dead", area.name, area.lines, area.dead);
        }
        if !self.bosses_exclude.is_empty() {
            println!("  hidden bosses: {}", self.bosses_exclude.join(", "));
        }
        if !self.lines_exclude.is_empty() {
            let lines: Vec<String> = self.lines_exclude.iter().map(u8::to_string).collect();
            println!("  hidden lines: {}", lines.join(", "));
        }
        for entry in &self.respawn_queue {
            println!(
                "  {} line {} {}: {}m{:02}s",
                entry.area,
                entry.line,
                entry.boss,
                entry.remaining_secs / 60,
                entry.remaining_secs % 60
            );
        }
    }
}

fn summarize_area(area: &Area, now: Timestamp) -> AreaSummary {
    AreaSummary {
        name: area.name().to_string(),
        lines: area.all_lines().len(),
        dead: area
            .all_lines()
            .iter()
            .flat_map(|line| line.all_bosses())
            .filter(|boss| !boss.is_alive(now))
            .count(),
    }
}

/// Decode a text envelope against the catalog's limits
pub fn inspect(text: &str, config: Option<&Path>) -> Result<EnvelopeSummary> {
    let limits = CatalogLimits::from_config(&load_config(config)?);
    let envelope = SyncEnvelope::from_text(text, &limits).context("decoding envelope")?;
    Ok(EnvelopeSummary::new(&envelope, Timestamp::now()))
}

/// Owner and follower in one process, connected by a channel
pub async fn demo() -> Result<()> {
    let config = CatalogConfig::default();
    let settings = Settings::default();
    let Some(area) = config.areas.first() else {
        bail!("catalog has no areas");
    };
    let area_name = area.name.clone();
    let boss_names: Vec<String> = area.bosses.iter().take(2).map(|b| b.name.clone()).collect();

    let (transport, events) = ChannelTransport::pair(16);
    let closer = transport.clone();
    let mut owner = SyncSession::new(
        PeerId::random(),
        Timetable::from_settings(&config, &settings)?.shared(),
        Arc::new(transport),
        WireOptions::default(),
    );

    let (follower_out, _follower_events) = ChannelTransport::pair(1);
    let mut follower = SyncSession::new(
        PeerId::random(),
        Timetable::from_settings(&config, &settings)?.shared(),
        Arc::new(follower_out),
        WireOptions::default(),
    );
    follower.connect(owner.peer_id().clone())?;

    let follower_task = tokio::spawn(async move {
        let applied = follower.follow(events).await;
        (follower, applied)
    });

    owner.start_sharing()?;
    let now = Timestamp::now();
    for (line, boss) in (1..).zip(&boss_names) {
        owner
            .commit(|t| {
                t.catalog_mut()
                    .area_mut(&area_name)
                    .ok_or_else(|| ValidationError::UnknownArea(area_name.clone()))?
                    .kill(line, boss, now)
            })
            .await?;
        info!("Owner {} recorded {} down on line {}", owner.peer_id(), boss, line);
    }
    closer.close().await?;

    let (follower, applied) = follower_task.await?;
    let applied = applied?;
    info!("Follower {} applied {} envelopes, now {}", follower.peer_id(), applied, follower.state());

    let mirror = follower.timetable();
    let mirror = mirror.read();
    for (area, entry) in mirror.respawn_queue(Timestamp::now()) {
        let boss = mirror
            .catalog()
            .find_area(area)
            .and_then(|a| a.find_boss(entry.line, entry.boss.as_str()))
            .map_or(entry.boss.as_str(), |b| b.display_name(settings.show_nickname));
        println!("{} line {} {}: respawns at {}", area, entry.line, boss, entry.respawn_at);
    }
    Ok(())
}
