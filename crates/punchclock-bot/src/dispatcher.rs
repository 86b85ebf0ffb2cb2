//! Routes each inbound message to its command handler or to the onboarding
//! dialogue, and sends the replies.
//!
//! Every backend-facing handler authenticates and resolves afresh; nothing is
//! cached between messages. Replies are fire-and-forget: a failed send is
//! logged and the handler carries on.

use std::sync::Arc;

use punchclock_attendance::{connect_employee, AttendanceClient, AttendanceError, BackendConnector, CloseOutcome};
use punchclock_channels::{InboundMessage, MessageTransport, OutboundMessage};
use punchclock_core::config::ScheduleConfig;
use punchclock_core::time::LocalClock;
use punchclock_core::types::{ConnectionProfile, UserIdentity};
use punchclock_users::{OnboardingStep, UserRegistry};
use tracing::{debug, info, warn};

use crate::commands::Command;
use crate::replies;

/// Static settings the handlers need.
#[derive(Debug, Clone, Default)]
pub struct BotSettings {
    /// Identities (numeric id or username, `@` optional) allowed to run
    /// `/users` and `/remove`.
    pub admins: Vec<String>,
    pub schedule: ScheduleConfig,
    pub clock: LocalClock,
}

pub struct CommandDispatcher {
    registry: Arc<UserRegistry>,
    connector: Arc<dyn BackendConnector>,
    transport: Arc<dyn MessageTransport>,
    settings: BotSettings,
}

impl CommandDispatcher {
    pub fn new(
        registry: Arc<UserRegistry>,
        connector: Arc<dyn BackendConnector>,
        transport: Arc<dyn MessageTransport>,
        settings: BotSettings,
    ) -> Self {
        Self {
            registry,
            connector,
            transport,
            settings,
        }
    }

    /// Handle one message to completion.
    pub async fn handle(&self, msg: &InboundMessage) {
        let user = UserIdentity::from(msg.sender_id.clone());

        let Some(command) = Command::parse(&msg.content) else {
            self.handle_text(msg, &user).await;
            return;
        };

        debug!(%user, ?command, "command received");

        if command.is_admin_only() && !self.is_admin(msg) {
            warn!(%user, ?command, "admin command refused");
            self.reply(msg, replies::ADMIN_ONLY).await;
            return;
        }

        match command {
            Command::Start => {
                let has_profile = self.registry.get(&user).is_some();
                self.reply(msg, replies::start(has_profile)).await;
            }
            Command::Help => self.reply(msg, replies::help(self.is_admin(msg))).await,
            Command::Config => {
                let cursor = self.registry.begin_onboarding(user.clone());
                info!(%user, "onboarding started");
                self.reply(msg, replies::onboarding_prompt(cursor)).await;
            }
            Command::Status => self.status(msg, &user).await,
            Command::Test => self.test(msg, &user).await,
            Command::ManualIn => self.manual_in(msg, &user).await,
            Command::ManualOut => self.manual_out(msg, &user).await,
            Command::CheckStatus => self.check_status(msg, &user).await,
            Command::Exit => {
                let had_profile = self.registry.remove(&user).is_some();
                // A dialogue without a profile is also dropped by remove().
                info!(%user, had_profile, "profile removed on request");
                self.reply(msg, replies::exited(had_profile)).await;
            }
            Command::Users => {
                let entries = self.registry.list();
                self.reply(msg, replies::user_list(&entries)).await;
            }
            Command::Remove(None) => self.reply(msg, replies::REMOVE_USAGE).await,
            Command::Remove(Some(login)) => {
                let removed = self.registry.remove_by_login(&login);
                info!(admin = %user, %login, count = removed.len(), "admin removed profiles");
                self.reply(msg, replies::removed(&login, removed.len())).await;
            }
            Command::Unknown(token) => self.reply(msg, replies::unknown_command(&token)).await,
        }
    }

    fn is_admin(&self, msg: &InboundMessage) -> bool {
        self.settings.admins.iter().any(|entry| {
            let entry = entry.trim().trim_start_matches('@');
            !entry.is_empty()
                && (entry == msg.sender_id || msg.sender_name.as_deref() == Some(entry))
        })
    }

    async fn reply(&self, msg: &InboundMessage, text: impl Into<String>) {
        let out = OutboundMessage::reply_to(msg, text);
        if let Err(e) = self.transport.send(&out).await {
            warn!(transport = self.transport.name(), chat = %msg.chat_id, error = %e, "reply failed");
        }
    }

    /// The caller's profile, or a reply telling them to run `/config`.
    async fn require_profile(&self, msg: &InboundMessage, user: &UserIdentity) -> Option<ConnectionProfile> {
        match self.registry.require(user) {
            Ok(profile) => Some(profile),
            Err(_) => {
                self.reply(msg, replies::NO_PROFILE).await;
                None
            }
        }
    }

    async fn handle_text(&self, msg: &InboundMessage, user: &UserIdentity) {
        let Some(step) = self.registry.submit_onboarding(user, &msg.content) else {
            self.reply(msg, replies::FALLBACK).await;
            return;
        };

        match step {
            OnboardingStep::Advanced { next } => {
                self.reply(msg, replies::onboarding_prompt(next)).await;
            }
            OnboardingStep::Rejected { cursor, error } => {
                debug!(%user, ?cursor, %error, "onboarding input refused");
                self.reply(msg, replies::onboarding_rejected(&error)).await;
            }
            OnboardingStep::Completed(profile) => {
                self.reply(msg, replies::CONFIG_COMPLETE).await;
                self.verify_new_profile(msg, user, &profile).await;
            }
        }
    }

    /// Authenticate and resolve a freshly stored profile. A profile that
    /// cannot authenticate is dropped again.
    async fn verify_new_profile(&self, msg: &InboundMessage, user: &UserIdentity, profile: &ConnectionProfile) {
        match connect_employee(self.connector.as_ref(), profile, self.settings.clock).await {
            Ok((_, employee)) => {
                info!(%user, login = %profile.login, %employee, "new profile verified");
                self.reply(msg, replies::onboarding_success(&self.settings.schedule)).await;
            }
            Err(AttendanceError::NotLinked) => {
                warn!(%user, login = %profile.login, "new profile has no linked employee");
                self.reply(msg, replies::CONFIG_NOT_LINKED).await;
            }
            Err(e) => {
                warn!(%user, login = %profile.login, error = %e, "new profile rejected; removing");
                self.registry.remove(user);
                self.reply(msg, replies::CONFIG_REJECTED).await;
            }
        }
    }

    async fn status(&self, msg: &InboundMessage, user: &UserIdentity) {
        let Some(profile) = self.require_profile(msg, user).await else {
            return;
        };
        self.reply(msg, replies::progress("Fetching status")).await;

        let summary = replies::profile_summary(&profile, &self.settings.schedule);
        let live = self.live_status(&profile).await;
        self.reply(msg, format!("{summary}\n\n{live}")).await;
    }

    async fn live_status(&self, profile: &ConnectionProfile) -> String {
        let clock = self.settings.clock;
        let tz = clock.timezone();
        let (session, employee) = match connect_employee(self.connector.as_ref(), profile, clock).await {
            Ok(pair) => pair,
            Err(AttendanceError::NotLinked) => return replies::live_unavailable("no linked employee"),
            Err(_) => return replies::live_unavailable("connection error"),
        };
        match session.peek_open_attendance(employee).await {
            Ok(Some(open)) => replies::live_open(&open, tz, clock.now()),
            Ok(None) => match session.peek_last_attendance(employee).await {
                Ok(last) => replies::live_last(last.as_ref(), tz),
                Err(_) => replies::live_unavailable("connection error"),
            },
            Err(_) => replies::live_unavailable("connection error"),
        }
    }

    async fn test(&self, msg: &InboundMessage, user: &UserIdentity) {
        let Some(profile) = self.require_profile(msg, user).await else {
            return;
        };
        self.reply(msg, replies::progress("Testing connection")).await;

        let text = match AttendanceClient::connect(self.connector.as_ref(), &profile, self.settings.clock) {
            Ok(client) => match client.authenticate().await {
                Ok(session) => match session.resolve_employee().await {
                    Ok(Some(employee)) => replies::test_ok(employee),
                    Ok(None) => replies::TEST_NOT_LINKED.to_string(),
                    Err(_) => replies::CONNECTION_ERROR.to_string(),
                },
                Err(_) => replies::CONNECTION_ERROR.to_string(),
            },
            Err(_) => replies::CONNECTION_ERROR.to_string(),
        };
        self.reply(msg, text).await;
    }

    async fn manual_in(&self, msg: &InboundMessage, user: &UserIdentity) {
        let Some(profile) = self.require_profile(msg, user).await else {
            return;
        };
        self.reply(msg, replies::progress("Checking in")).await;

        let text = match connect_employee(self.connector.as_ref(), &profile, self.settings.clock).await {
            Ok((session, employee)) => match session.open_attendance(employee).await {
                Ok(at) => {
                    info!(%user, %employee, "manual check-in");
                    replies::checked_in(&at)
                }
                Err(_) => replies::CHECK_IN_FAILED.to_string(),
            },
            Err(AttendanceError::NotLinked) => replies::NOT_LINKED.to_string(),
            Err(_) => replies::CONNECTION_ERROR.to_string(),
        };
        self.reply(msg, text).await;
    }

    async fn manual_out(&self, msg: &InboundMessage, user: &UserIdentity) {
        let Some(profile) = self.require_profile(msg, user).await else {
            return;
        };
        self.reply(msg, replies::progress("Checking out")).await;

        let text = match connect_employee(self.connector.as_ref(), &profile, self.settings.clock).await {
            Ok((session, employee)) => match session.close_attendance(employee).await {
                Ok(CloseOutcome::Closed { closed_at, .. }) => {
                    info!(%user, %employee, "manual check-out");
                    replies::checked_out(&closed_at)
                }
                Ok(CloseOutcome::NothingOpen) => replies::NOTHING_OPEN.to_string(),
                Err(_) => replies::CHECK_OUT_FAILED.to_string(),
            },
            Err(AttendanceError::NotLinked) => replies::NOT_LINKED.to_string(),
            Err(_) => replies::CONNECTION_ERROR.to_string(),
        };
        self.reply(msg, text).await;
    }

    async fn check_status(&self, msg: &InboundMessage, user: &UserIdentity) {
        let Some(profile) = self.require_profile(msg, user).await else {
            return;
        };
        self.reply(msg, replies::progress("Checking attendance status")).await;

        let clock = self.settings.clock;
        let text = match connect_employee(self.connector.as_ref(), &profile, clock).await {
            Ok((session, employee)) => match session.peek_open_attendance(employee).await {
                Ok(Some(open)) => replies::open_attendance(&open, clock.timezone(), clock.now()),
                Ok(None) => replies::NO_OPEN_ATTENDANCE.to_string(),
                Err(_) => replies::CONNECTION_ERROR.to_string(),
            },
            Err(AttendanceError::NotLinked) => replies::NOT_LINKED.to_string(),
            Err(_) => replies::CONNECTION_ERROR.to_string(),
        };
        self.reply(msg, text).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{inbound, RecordingTransport};
    use punchclock_attendance::testing::{InMemoryBackend, InMemoryConnector};

    const HR: &str = "https://odoo.example.com";

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        registry: Arc<UserRegistry>,
        transport: Arc<RecordingTransport>,
        dispatcher: CommandDispatcher,
    }

    fn fixture(backend: InMemoryBackend, admins: &[&str]) -> Fixture {
        let backend = Arc::new(backend);
        let registry = Arc::new(UserRegistry::new());
        let transport = Arc::new(RecordingTransport::new());
        let connector = InMemoryConnector::new().with_backend(HR, backend.clone());
        let settings = BotSettings {
            admins: admins.iter().map(|s| s.to_string()).collect(),
            ..BotSettings::default()
        };
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&registry),
            Arc::new(connector),
            transport.clone(),
            settings,
        );
        Fixture {
            backend,
            registry,
            transport,
            dispatcher,
        }
    }

    fn linked_alice() -> InMemoryBackend {
        InMemoryBackend::new()
            .with_account("mydb", "alice", "secret123", 7, Some(70))
            .with_employee(4, "Alice", 70)
    }

    impl Fixture {
        async fn say(&self, sender: &str, text: &str) -> Vec<String> {
            let before = self.transport.sent().len();
            self.dispatcher.handle(&inbound(1, sender, text)).await;
            self.transport.sent()[before..].iter().map(|m| m.content.clone()).collect()
        }

        fn register_alice(&self, sender: &str) {
            self.registry.put(
                sender.into(),
                ConnectionProfile::new(HR, "mydb", "alice", "secret123"),
            );
        }
    }

    #[tokio::test]
    async fn config_dialogue_end_to_end() {
        let f = fixture(linked_alice(), &[]);

        f.say("42", "/config").await;
        let replies = f.say("42", "ftp://bad").await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("valid URL"));

        f.say("42", "https://odoo.example.com").await;
        f.say("42", "mydb").await;
        f.say("42", "alice").await;
        let replies = f.say("42", "secret123").await;

        assert_eq!(
            f.registry.get(&"42".into()),
            Some(ConnectionProfile::new("https://odoo.example.com", "mydb", "alice", "secret123"))
        );
        assert!(f.registry.cursor(&"42".into()).is_none());
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], replies::CONFIG_COMPLETE);
        assert!(replies[1].starts_with("🎉"));
        assert_eq!(f.backend.authenticate_count(), 1);
    }

    #[tokio::test]
    async fn rejected_credentials_drop_the_profile() {
        let f = fixture(linked_alice(), &[]);
        for text in ["/config", HR, "mydb", "alice", "wrong"] {
            f.say("42", text).await;
        }
        let last = f.transport.sent().last().unwrap().content.clone();
        assert_eq!(last, replies::CONFIG_REJECTED);
        assert!(f.registry.get(&"42".into()).is_none());
        assert!(f.registry.cursor(&"42".into()).is_none());
    }

    #[tokio::test]
    async fn unlinked_profile_is_kept_with_warning() {
        let f = fixture(
            InMemoryBackend::new().with_account("mydb", "alice", "secret123", 7, None),
            &[],
        );
        for text in ["/config", HR, "mydb", "alice", "secret123"] {
            f.say("42", text).await;
        }
        assert_eq!(f.transport.sent().last().unwrap().content, replies::CONFIG_NOT_LINKED);
        assert!(f.registry.get(&"42".into()).is_some());
    }

    #[tokio::test]
    async fn status_after_manual_in_reports_same_time() {
        let f = fixture(linked_alice(), &[]);
        f.register_alice("42");

        let replies_in = f.say("42", "/manual_in").await;
        assert_eq!(replies_in.len(), 2);
        assert_eq!(replies_in[0], "🔄 Checking in...");
        let time_line = replies_in[1]
            .lines()
            .find_map(|l| l.strip_prefix("🕐 Time: "))
            .unwrap()
            .to_string();

        let replies_status = f.say("42", "/check_status").await;
        assert!(replies_status[1].contains(&format!("🕐 Check-in time: {time_line}")));

        let replies_full = f.say("42", "/status").await;
        assert!(replies_full[1].contains("🔑 Password: *********"));
        assert!(replies_full[1].contains(&format!("🟢 Checked in since {time_line}")));
    }

    #[tokio::test]
    async fn manual_out_without_open_record() {
        let f = fixture(linked_alice(), &[]);
        f.register_alice("42");
        let replies = f.say("42", "/manual_out").await;
        assert_eq!(replies[1], replies::NOTHING_OPEN);
        assert_eq!(f.backend.write_count(), 0);
    }

    #[tokio::test]
    async fn manual_in_then_out() {
        let f = fixture(linked_alice(), &[]);
        f.register_alice("42");
        f.say("42", "/manual_in").await;
        let replies = f.say("42", "/manual_out").await;
        assert!(replies[1].starts_with("✅ Check-out recorded!"));
        assert!(!f.backend.attendances()[0].is_open());
    }

    #[tokio::test]
    async fn commands_need_a_profile() {
        let f = fixture(linked_alice(), &[]);
        for cmd in ["/status", "/test", "/manual_in", "/manual_out", "/check_status"] {
            assert_eq!(f.say("42", cmd).await, vec![replies::NO_PROFILE.to_string()]);
        }
        assert!(f.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reports_employee_or_absence() {
        let f = fixture(
            linked_alice().with_account("mydb", "bob", "pw", 8, None),
            &[],
        );
        f.register_alice("1");
        f.registry.put("2".into(), ConnectionProfile::new(HR, "mydb", "bob", "pw"));
        f.registry.put("3".into(), ConnectionProfile::new(HR, "mydb", "bob", "nope"));

        assert_eq!(f.say("1", "/test").await[1], replies::test_ok(punchclock_core::types::EmployeeId(4)));
        assert_eq!(f.say("2", "/test").await[1], replies::TEST_NOT_LINKED);
        assert_eq!(f.say("3", "/test").await[1], replies::CONNECTION_ERROR);
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_connection_error() {
        let f = fixture(linked_alice(), &[]);
        f.register_alice("42");
        f.backend.set_offline(true);
        assert_eq!(f.say("42", "/manual_in").await[1], replies::CONNECTION_ERROR);
    }

    #[tokio::test]
    async fn exit_removes_profile_and_dialogue() {
        let f = fixture(linked_alice(), &[]);
        f.register_alice("42");
        f.say("42", "/config").await;
        f.say("42", "/exit").await;
        assert!(f.registry.get(&"42".into()).is_none());
        assert!(f.registry.cursor(&"42".into()).is_none());
        assert_eq!(f.say("42", "hello").await, vec![replies::FALLBACK.to_string()]);
    }

    #[tokio::test]
    async fn start_and_unknown() {
        let f = fixture(linked_alice(), &[]);
        assert!(f.say("42", "/start").await[0].contains("/config"));
        assert_eq!(f.say("42", "/frobnicate").await, vec![replies::unknown_command("/frobnicate")]);
    }

    #[tokio::test]
    async fn admin_commands_are_guarded() {
        let f = fixture(linked_alice(), &["1000"]);
        f.register_alice("42");
        f.register_alice("43");

        assert_eq!(f.say("42", "/users").await, vec![replies::ADMIN_ONLY.to_string()]);
        assert_eq!(f.say("42", "/remove alice").await, vec![replies::ADMIN_ONLY.to_string()]);
        assert_eq!(f.registry.len(), 2);

        let listing = f.say("1000", "/users").await;
        assert!(listing[0].contains("Registered users (2)"));
        assert_eq!(f.say("1000", "/remove alice").await, vec![replies::removed("alice", 2)]);
        assert!(f.registry.is_empty());
    }

    #[tokio::test]
    async fn admin_matched_by_username() {
        let f = fixture(linked_alice(), &["@boss", "chief"]);
        for name in ["boss", "chief"] {
            let mut msg = inbound(1, "500", "/users");
            msg.sender_name = Some(name.to_string());
            f.dispatcher.handle(&msg).await;
            assert!(f.transport.sent().last().unwrap().content.starts_with("👥"));
        }

        let mut msg = inbound(1, "501", "/users");
        msg.sender_name = Some("intern".to_string());
        f.dispatcher.handle(&msg).await;
        assert_eq!(f.transport.sent().last().unwrap().content, replies::ADMIN_ONLY);
    }

    #[tokio::test]
    async fn failed_send_does_not_abort_handler() {
        let f = fixture(linked_alice(), &[]);
        f.register_alice("42");
        f.transport.set_fail_sends(true);
        f.dispatcher.handle(&inbound(1, "42", "/manual_in")).await;
        assert_eq!(f.backend.create_count(), 1);
    }
}
