//! User-facing message texts.

use chrono::{DateTime, Weekday};
use chrono_tz::Tz;
use punchclock_core::config::{ScheduleConfig, TriggerRule};
use punchclock_core::time::{format_clock, format_date, format_elapsed};
use punchclock_core::types::{AttendanceRecord, ConnectionProfile, EmployeeId, UserIdentity};
use punchclock_users::{OnboardingCursor, UserError};

pub const NO_PROFILE: &str = "❌ You have no saved configuration. Use /config to set one up.";
pub const FALLBACK: &str = "Use /start to begin or /config to set up your connection.";
pub const ADMIN_ONLY: &str = "⛔ This command is for administrators only.";
pub const CONNECTION_ERROR: &str = "❌ Connection error.";
pub const CONFIG_COMPLETE: &str = "✅ Configuration complete!\n\nTesting connection...";
pub const CONFIG_REJECTED: &str =
    "❌ Connection error. Check your credentials and use /config to reconfigure.";
pub const CONFIG_NOT_LINKED: &str = "⚠️ Connected, but no employee is linked to your user.\n\
     Check that your login is linked to an employee.";
pub const REMOVE_USAGE: &str = "Usage: /remove <login>";

const COMMAND_LIST: &str = "Available commands:\n\
     /config - Set up the HR server connection\n\
     /status - Show configuration and attendance\n\
     /test - Test the connection\n\
     /manual_in - Check in now\n\
     /manual_out - Check out now\n\
     /check_status - Show the open attendance\n\
     /exit - Delete your configuration and start over";

const ADMIN_COMMAND_LIST: &str = "Admin commands:\n\
     /users - List registered users\n\
     /remove <login> - Remove every profile using a login";

pub fn start(has_profile: bool) -> String {
    if has_profile {
        format!("👋 Hi! Your attendance bot is already set up.\n\n{COMMAND_LIST}")
    } else {
        "👋 Welcome to the attendance bot! 🤖\n\n\
         To begin, connect me to your HR server.\n\
         Use /config to get started."
            .to_string()
    }
}

pub fn help(is_admin: bool) -> String {
    if is_admin {
        format!("{COMMAND_LIST}\n\n{ADMIN_COMMAND_LIST}")
    } else {
        COMMAND_LIST.to_string()
    }
}

pub fn unknown_command(token: &str) -> String {
    format!("❓ Unknown command: {token}\nUse /help to see the available commands.")
}

/// Prompt for the field `cursor` is waiting for.
pub fn onboarding_prompt(cursor: OnboardingCursor) -> &'static str {
    match cursor {
        OnboardingCursor::AwaitingAddress => {
            "🔧 Server setup\n\nSend the URL of your HR server:\nExample: https://my-odoo.com"
        }
        OnboardingCursor::AwaitingTenant => "✅ URL saved.\n\nNow send your database name:",
        OnboardingCursor::AwaitingLogin => "✅ Database saved.\n\nNow send your login:",
        OnboardingCursor::AwaitingSecret => "✅ Login saved.\n\nFinally, send your password:",
    }
}

pub fn onboarding_rejected(error: &UserError) -> String {
    match error {
        UserError::InvalidAddress(_) => {
            "❌ Please send a valid URL starting with http:// or https://".to_string()
        }
        UserError::EmptyField(field) => format!("❌ The {field} cannot be empty. Please send it again:"),
        UserError::NotFound(_) => NO_PROFILE.to_string(),
    }
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

fn rule_line(label: &str, rule: &TriggerRule) -> String {
    let days: Vec<&str> = rule.days.iter().copied().map(day_name).collect();
    format!(
        "📅 {label} {}: {:02}:{:02}",
        days.join(", "),
        rule.hour,
        rule.minute
    )
}

/// One line per configured rule.
pub fn schedule_summary(schedule: &ScheduleConfig) -> String {
    schedule
        .check_in
        .iter()
        .map(|r| rule_line("Check-in", r))
        .chain(schedule.check_out.iter().map(|r| rule_line("Check-out", r)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn onboarding_success(schedule: &ScheduleConfig) -> String {
    format!(
        "🎉 All set!\n\n\
         The bot will record your attendance automatically:\n{}\n\n\
         You can also use the manual commands:\n\
         /manual_in - Check in\n\
         /manual_out - Check out\n\
         /status - Show configuration\n\
         /test - Test the connection\n\
         /exit - Delete your configuration and start over",
        schedule_summary(schedule)
    )
}

pub fn profile_summary(profile: &ConnectionProfile, schedule: &ScheduleConfig) -> String {
    format!(
        "✅ Current configuration:\n\n\
         🌐 URL: {}\n\
         🗄️ Database: {}\n\
         👤 Login: {}\n\
         🔑 Password: {}\n\n\
         ⏰ Schedule:\n{}",
        profile.server_address,
        profile.tenant,
        profile.login,
        profile.masked_secret(),
        schedule_summary(schedule)
    )
}

fn stamp(at: &DateTime<Tz>) -> String {
    format!("🕐 Time: {}\n📅 Date: {}", format_clock(at), format_date(at))
}

pub fn live_open(record: &AttendanceRecord, tz: Tz, now: DateTime<Tz>) -> String {
    let check_in = record.check_in.with_timezone(&tz);
    format!(
        "🟢 Checked in since {} on {}\n⏱️ Time worked: {}",
        format_clock(&check_in),
        format_date(&check_in),
        format_elapsed(now.signed_duration_since(check_in))
    )
}

pub fn live_last(record: Option<&AttendanceRecord>, tz: Tz) -> String {
    let Some(record) = record else {
        return "⚪ No attendance recorded yet.".to_string();
    };
    let check_in = record.check_in.with_timezone(&tz);
    match record.check_out {
        Some(out) => {
            let out = out.with_timezone(&tz);
            format!(
                "⚪ Not checked in. Last attendance: {} {} - {} {}",
                format_date(&check_in),
                format_clock(&check_in),
                format_date(&out),
                format_clock(&out)
            )
        }
        None => format!("⚪ Last check-in: {} {}", format_date(&check_in), format_clock(&check_in)),
    }
}

pub fn live_unavailable(reason: &str) -> String {
    format!("⚠️ Live status unavailable: {reason}")
}

pub fn test_ok(employee: EmployeeId) -> String {
    format!("✅ Connection successful!\n👤 Employee ID: {employee}")
}

pub const TEST_NOT_LINKED: &str = "⚠️ Connection successful, but no linked employee was found.";

pub fn checked_in(at: &DateTime<Tz>) -> String {
    format!("✅ Check-in recorded!\n{}", stamp(at))
}

pub fn checked_out(at: &DateTime<Tz>) -> String {
    format!("✅ Check-out recorded!\n{}", stamp(at))
}

pub const CHECK_IN_FAILED: &str = "❌ Check-in failed.";
pub const CHECK_OUT_FAILED: &str = "❌ Check-out failed.";
pub const NOTHING_OPEN: &str = "⚠️ There is no open attendance to close.\n\nYou can check in with /manual_in";
pub const NOT_LINKED: &str = "❌ No linked employee found.";

pub fn open_attendance(record: &AttendanceRecord, tz: Tz, now: DateTime<Tz>) -> String {
    let check_in = record.check_in.with_timezone(&tz);
    format!(
        "✅ You have an open attendance\n\n\
         🕐 Check-in time: {}\n\
         📅 Date: {}\n\
         ⏱️ Time worked: {}",
        format_clock(&check_in),
        format_date(&check_in),
        format_elapsed(now.signed_duration_since(check_in))
    )
}

pub const NO_OPEN_ATTENDANCE: &str =
    "❌ You have no open attendance\n\nYou can check in with /manual_in";

pub fn exited(had_profile: bool) -> String {
    if had_profile {
        "🗑️ Configuration deleted.\n\n\
         ✅ Your scheduled check-ins have stopped.\n\
         ✅ All your data has been erased.\n\n\
         Use /start to begin again."
            .to_string()
    } else {
        "❌ You have no saved configuration.".to_string()
    }
}

pub fn user_list(entries: &[(UserIdentity, ConnectionProfile)]) -> String {
    if entries.is_empty() {
        return "👥 No registered users.".to_string();
    }
    let lines: Vec<String> = entries
        .iter()
        .map(|(id, p)| format!("• {id}: {} @ {} ({})", p.login, p.tenant, p.server_address))
        .collect();
    format!("👥 Registered users ({}):\n\n{}", entries.len(), lines.join("\n"))
}

pub fn removed(login: &str, count: usize) -> String {
    if count == 0 {
        format!("❌ No profile uses login {login}.")
    } else {
        format!("🗑️ Removed {count} profile(s) with login {login}.")
    }
}

pub fn progress(what: &str) -> String {
    format!("🔄 {what}...")
}
