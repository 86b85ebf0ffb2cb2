use chrono::Weekday;
use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{PunchclockError, Result};
use crate::time::{parse_timezone, DEFAULT_TIMEZONE};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_POLL_TIMEOUT_SECS: u32 = 30;
pub const DEFAULT_ERROR_BACKOFF_SECS: u64 = 5;
pub const DEFAULT_KEEP_ALIVE_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_KEEP_ALIVE_INITIAL_DELAY_SECS: u64 = 300;

/// Top-level config (punchclock.toml + PUNCHCLOCK_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PunchclockConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub attendance: AttendanceConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub keep_alive: KeepAliveConfig,
}

/// Health-check HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Who may talk to the bot. `"*"` allows everyone; entries match a
    /// username (with or without `@`) or a numeric user id.
    #[serde(default = "default_allow_users")]
    pub allow_users: Vec<String>,
    /// Identities allowed to run `/users` and `/remove`: numeric user ids or
    /// usernames, with or without a leading `@`.
    #[serde(default)]
    pub admins: Vec<String>,
    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u32,
    /// Pause after a failed poll before trying again.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allow_users: default_allow_users(),
            admins: Vec::new(),
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            error_backoff_secs: DEFAULT_ERROR_BACKOFF_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceConfig {
    /// IANA name of the civil timezone used for stamping, display and the
    /// schedule.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl AttendanceConfig {
    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }
}

/// A weekly wall-clock rule: fire at `hour:minute` local time on each of `days`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub days: Vec<Weekday>,
    pub hour: u8,
    pub minute: u8,
}

impl TriggerRule {
    pub fn new(days: &[Weekday], hour: u8, minute: u8) -> Self {
        Self {
            days: days.to_vec(),
            hour,
            minute,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.days.is_empty() {
            return Err(PunchclockError::InvalidSchedule(
                "trigger rule has no days".to_string(),
            ));
        }
        if self.hour > 23 || self.minute > 59 {
            return Err(PunchclockError::InvalidSchedule(format!(
                "invalid time {:02}:{:02}",
                self.hour, self.minute
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_check_in_rules")]
    pub check_in: Vec<TriggerRule>,
    #[serde(default = "default_check_out_rules")]
    pub check_out: Vec<TriggerRule>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_in: default_check_in_rules(),
            check_out: default_check_out_rules(),
        }
    }
}

/// Periodic self-ping so free-tier hosts do not idle the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepAliveConfig {
    /// Public base URL of this service; keep-alive is disabled when unset.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_keep_alive_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_keep_alive_initial_delay_secs")]
    pub initial_delay_secs: u64,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            url: None,
            interval_secs: DEFAULT_KEEP_ALIVE_INTERVAL_SECS,
            initial_delay_secs: DEFAULT_KEEP_ALIVE_INITIAL_DELAY_SECS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_allow_users() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_poll_timeout_secs() -> u32 {
    DEFAULT_POLL_TIMEOUT_SECS
}
fn default_error_backoff_secs() -> u64 {
    DEFAULT_ERROR_BACKOFF_SECS
}
fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}
fn default_keep_alive_interval_secs() -> u64 {
    DEFAULT_KEEP_ALIVE_INTERVAL_SECS
}
fn default_keep_alive_initial_delay_secs() -> u64 {
    DEFAULT_KEEP_ALIVE_INITIAL_DELAY_SECS
}

/// 08:00 Monday to Friday.
fn default_check_in_rules() -> Vec<TriggerRule> {
    use Weekday::*;
    vec![TriggerRule::new(&[Mon, Tue, Wed, Thu, Fri], 8, 0)]
}

/// 17:30 Monday to Thursday, 16:30 Friday.
fn default_check_out_rules() -> Vec<TriggerRule> {
    use Weekday::*;
    vec![
        TriggerRule::new(&[Mon, Tue, Wed, Thu], 17, 30),
        TriggerRule::new(&[Fri], 16, 30),
    ]
}

impl PunchclockConfig {
    /// Load config from a TOML file with env var overrides.
    ///
    /// Precedence, lowest first:
    ///   1. built-in defaults
    ///   2. the TOML file (explicit path, else ~/.punchclock/punchclock.toml)
    ///   3. `PUNCHCLOCK_*` variables, `__` separating nested keys
    ///      (e.g. `PUNCHCLOCK_TELEGRAM__BOT_TOKEN`)
    ///   4. hosting variables `TELEGRAM_BOT_TOKEN`, `RENDER_EXTERNAL_URL`, `PORT`
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        if !std::path::Path::new(&path).exists() {
            tracing::info!(path = %path, "no config file; using defaults and environment");
        }

        let config: PunchclockConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PUNCHCLOCK_").split("__"))
            .merge(
                Env::raw()
                    .only(&["TELEGRAM_BOT_TOKEN", "RENDER_EXTERNAL_URL", "PORT"])
                    .map(|key| {
                        let key = key.as_str();
                        if key.eq_ignore_ascii_case("TELEGRAM_BOT_TOKEN") {
                            "telegram.bot_token".into()
                        } else if key.eq_ignore_ascii_case("RENDER_EXTERNAL_URL") {
                            "keep_alive.url".into()
                        } else {
                            "gateway.port".into()
                        }
                    }),
            )
            .extract()
            .map_err(|e| PunchclockError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Reject configurations the process cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(PunchclockError::Config(
                "telegram.bot_token is required (or set TELEGRAM_BOT_TOKEN)".to_string(),
            ));
        }
        self.attendance.tz()?;
        for rule in self.schedule.check_in.iter().chain(&self.schedule.check_out) {
            rule.validate()?;
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.punchclock/punchclock.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_weekly_schedule() {
        let cfg = PunchclockConfig::default();
        assert_eq!(cfg.schedule.check_in.len(), 1);
        assert_eq!(cfg.schedule.check_in[0].hour, 8);
        assert_eq!(cfg.schedule.check_in[0].days.len(), 5);
        assert_eq!(cfg.schedule.check_out[0].hour, 17);
        assert_eq!(cfg.schedule.check_out[0].minute, 30);
        assert_eq!(cfg.schedule.check_out[1].days, vec![Weekday::Fri]);
        assert_eq!(cfg.schedule.check_out[1].hour, 16);
        assert_eq!(cfg.attendance.timezone, "America/Havana");
        assert_eq!(cfg.telegram.allow_users, vec!["*".to_string()]);
    }

    #[test]
    fn validate_requires_token() {
        let cfg = PunchclockConfig::default();
        assert!(matches!(cfg.validate(), Err(PunchclockError::Config(_))));
    }

    #[test]
    fn validate_rejects_bad_timezone_and_rule() {
        let mut cfg = PunchclockConfig::default();
        cfg.telegram.bot_token = "t".to_string();
        assert!(cfg.validate().is_ok());

        cfg.attendance.timezone = "Nowhere/Land".to_string();
        assert!(matches!(
            cfg.validate(),
            Err(PunchclockError::InvalidTimezone(_))
        ));

        cfg.attendance.timezone = "UTC".to_string();
        cfg.schedule.check_in = vec![TriggerRule::new(&[Weekday::Mon], 24, 0)];
        assert!(matches!(
            cfg.validate(),
            Err(PunchclockError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn load_file_and_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "punchclock.toml",
                r#"
                [telegram]
                bot_token = "from-file"
                admins = ["1001"]

                [attendance]
                timezone = "Europe/Madrid"

                [[schedule.check_in]]
                days = ["Mon", "Wed"]
                hour = 9
                minute = 15
                "#,
            )?;
            jail.set_env("PUNCHCLOCK_GATEWAY__BIND", "127.0.0.1");
            jail.set_env("PORT", "8080");

            let cfg = PunchclockConfig::load(Some("punchclock.toml")).expect("config loads");
            assert_eq!(cfg.telegram.bot_token, "from-file");
            assert_eq!(cfg.telegram.admins, vec!["1001".to_string()]);
            assert_eq!(cfg.attendance.timezone, "Europe/Madrid");
            assert_eq!(
                cfg.schedule.check_in,
                vec![TriggerRule::new(&[Weekday::Mon, Weekday::Wed], 9, 15)]
            );
            // check_out keeps its defaults when the file does not mention it.
            assert_eq!(cfg.schedule.check_out.len(), 2);
            assert_eq!(cfg.gateway.bind, "127.0.0.1");
            assert_eq!(cfg.gateway.port, 8080);
            Ok(())
        });
    }

    #[test]
    fn hosting_token_variable_wins() {
        Jail::expect_with(|jail| {
            jail.create_file("punchclock.toml", "[telegram]\nbot_token = \"file\"\n")?;
            jail.set_env("TELEGRAM_BOT_TOKEN", "env-token");
            jail.set_env("RENDER_EXTERNAL_URL", "https://bot.example.com");

            let cfg = PunchclockConfig::load(Some("punchclock.toml")).expect("config loads");
            assert_eq!(cfg.telegram.bot_token, "env-token");
            assert_eq!(cfg.keep_alive.url.as_deref(), Some("https://bot.example.com"));
            Ok(())
        });
    }
}
