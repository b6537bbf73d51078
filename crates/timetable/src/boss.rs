//! Boss respawn state

use crate::validate;
use serde::Serialize;
use std::time::Duration;
use tofmt_config::BossTemplate;
use tofmt_core::{Result, Timestamp, ValidationError};

/// Respawn time used when none is configured
pub const DEFAULT_RESPAWN_TIME: Duration = Duration::from_secs(60 * 60);

/// A trackable world boss on one line
///
/// # Alive rule
/// A boss is alive strictly after `kill_at + respawn_time`. A boss that was
/// never killed keeps `kill_at` at the epoch and so is always alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Boss {
    name: String,
    nick_name: String,
    color: String,
    kill_at: Timestamp,
    respawn_time: Duration,
}

impl Boss {
    /// Create a never-killed boss
    ///
    /// An empty `nick_name` falls back to `name`; `None` respawn time falls
    /// back to one hour.
    pub fn new(
        name: &str,
        nick_name: &str,
        color: &str,
        respawn_time: Option<Duration>,
    ) -> Result<Self> {
        let nick_name = if nick_name.is_empty() { name } else { nick_name };
        Self::from_parts(
            name.to_string(),
            nick_name.to_string(),
            color.to_string(),
            Timestamp::EPOCH,
            respawn_time.unwrap_or(DEFAULT_RESPAWN_TIME),
        )
    }

    /// Seed a fresh boss from a catalog template
    pub fn from_template(template: &BossTemplate, respawn_override: Option<Duration>) -> Result<Self> {
        Self::new(
            &template.name,
            &template.nick_name,
            &template.color,
            respawn_override.or(template.respawn_time),
        )
    }

    /// Rebuild a boss from every stored field, validating each one
    pub fn from_parts(
        name: String,
        nick_name: String,
        color: String,
        kill_at: Timestamp,
        respawn_time: Duration,
    ) -> Result<Self> {
        validate::name("boss name", &name)?;
        validate::max_len("boss nickname", &nick_name)?;
        validate::hex_color(&color)?;
        validate_timestamp(kill_at)?;
        validate::respawn_time(respawn_time)?;

        Ok(Self {
            name,
            nick_name,
            color,
            kill_at,
            respawn_time,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nick_name(&self) -> &str {
        &self.nick_name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn kill_at(&self) -> Timestamp {
        self.kill_at
    }

    pub fn respawn_time(&self) -> Duration {
        self.respawn_time
    }

    /// When the boss comes back
    pub fn respawn_at(&self) -> Timestamp {
        self.kill_at + self.respawn_time
    }

    pub fn is_alive(&self, now: Timestamp) -> bool {
        now > self.respawn_at()
    }

    /// Record a kill at `now`
    pub fn kill(&mut self, now: Timestamp) -> Result<()> {
        validate_timestamp(now)?;
        self.kill_at = now;
        Ok(())
    }

    /// Force the boss alive
    pub fn respawn(&mut self) {
        self.kill_at = Timestamp::EPOCH;
    }

    /// Remaining time until respawn, zero once alive or due
    pub fn time_until_respawn(&self, now: Timestamp) -> Duration {
        let ms = self.respawn_at().millis_since(now);
        Duration::from_millis(u64::try_from(ms).unwrap_or(0))
    }

    pub fn display_name(&self, use_nickname: bool) -> &str {
        if use_nickname {
            &self.nick_name
        } else {
            &self.name
        }
    }

    pub fn set_respawn_time(&mut self, respawn_time: Duration) -> Result<()> {
        validate::respawn_time(respawn_time)?;
        self.respawn_time = respawn_time;
        Ok(())
    }
}

fn validate_timestamp(ts: Timestamp) -> std::result::Result<(), ValidationError> {
    if ts < Timestamp::EPOCH {
        return Err(ValidationError::OutOfRange {
            field: "kill time (ms)",
            value: ts.as_millis(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// How a caller names a boss inside a line
///
/// `Name` goes through the line's lookup table; `Boss` compares identity
/// against the line's own entries.
#[derive(Debug, Clone, Copy)]
pub enum BossRef<'a> {
    Name(&'a str),
    Boss(&'a Boss),
}

impl<'a> From<&'a str> for BossRef<'a> {
    fn from(name: &'a str) -> Self {
        BossRef::Name(name)
    }
}

impl<'a> From<&'a String> for BossRef<'a> {
    fn from(name: &'a String) -> Self {
        BossRef::Name(name)
    }
}

impl<'a> From<&'a Boss> for BossRef<'a> {
    fn from(boss: &'a Boss) -> Self {
        BossRef::Boss(boss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sobek() -> Boss {
        let mut boss = Boss::new("Sobek", "Croc", "#3A4454", Some(Duration::from_millis(3_600_000))).unwrap();
        boss.kill(Timestamp::from_secs(1000)).unwrap();
        boss
    }

    #[test]
    fn test_never_killed_is_alive() {
        let boss = Boss::new("Hela", "", "#15151F", None).unwrap();
        assert_eq!(boss.kill_at(), Timestamp::EPOCH);
        assert_eq!(boss.respawn_time(), DEFAULT_RESPAWN_TIME);
        assert!(boss.is_alive(Timestamp::now()));
    }

    #[test]
    fn test_nickname_defaults_to_name() {
        let boss = Boss::new("Hela", "", "#15151F", None).unwrap();
        assert_eq!(boss.nick_name(), "Hela");
        assert_eq!(boss.display_name(true), "Hela");
    }

    #[test]
    fn test_display_name() {
        let boss = sobek();
        assert_eq!(boss.display_name(false), "Sobek");
        assert_eq!(boss.display_name(true), "Croc");
    }

    #[test]
    fn test_respawn_boundary() {
        let boss = sobek();

        let due = Timestamp::from_secs(4600);
        assert!(!boss.is_alive(due));
        assert_eq!(boss.time_until_respawn(due), Duration::ZERO);

        assert!(boss.is_alive(Timestamp::from_millis(4_600_001)));
        assert!(boss.is_alive(Timestamp::from_secs(4601)));
        assert_eq!(boss.time_until_respawn(Timestamp::from_secs(4601)), Duration::ZERO);
    }

    #[test]
    fn test_time_until_respawn() {
        let boss = sobek();
        assert_eq!(
            boss.time_until_respawn(Timestamp::from_secs(1600)),
            Duration::from_secs(3000)
        );
        assert!(!boss.is_alive(Timestamp::from_secs(1600)));
    }

    #[test]
    fn test_respawn_resets_kill() {
        let mut boss = sobek();
        boss.respawn();
        assert_eq!(boss.kill_at(), Timestamp::EPOCH);
        assert!(boss.is_alive(Timestamp::from_secs(4601)));
    }

    #[test]
    fn test_kill_rejects_pre_epoch() {
        let mut boss = sobek();
        assert!(boss.kill(Timestamp::from_millis(-1)).is_err());
        assert_eq!(boss.kill_at(), Timestamp::from_secs(1000));
    }

    #[test]
    fn test_invalid_fields() {
        assert!(Boss::new("", "x", "#FFFFFF", None).is_err());
        assert!(Boss::new(&"x".repeat(256), "x", "#FFFFFF", None).is_err());
        assert!(Boss::new("x", &"y".repeat(256), "#FFFFFF", None).is_err());
        assert!(Boss::new("x", "y", "red", None).is_err());
    }

    #[test]
    fn test_template_respawn_override() {
        let template = BossTemplate::new("Eva", "Cotton", "#FFFFFF")
            .with_respawn_time(Duration::from_secs(90 * 60));

        let configured = Boss::from_template(&template, None).unwrap();
        assert_eq!(configured.respawn_time(), Duration::from_secs(90 * 60));

        let overridden = Boss::from_template(&template, Some(Duration::from_secs(30 * 60))).unwrap();
        assert_eq!(overridden.respawn_time(), Duration::from_secs(30 * 60));
    }
}
