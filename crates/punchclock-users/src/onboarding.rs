//! The four-step `/config` dialogue.
//!
//! ```text
//! AwaitingAddress -> AwaitingTenant -> AwaitingLogin -> AwaitingSecret -> done
//! ```
//!
//! Invalid or blank input re-prompts the same step and leaves earlier
//! answers untouched. Partial answers live in a private [`Draft`] and are
//! only turned into a [`ConnectionProfile`] once all four are present.

use punchclock_core::types::{normalize_server_address, ConnectionProfile};
use serde::{Deserialize, Serialize};

use crate::error::UserError;

/// Which field the dialogue is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingCursor {
    AwaitingAddress,
    AwaitingTenant,
    AwaitingLogin,
    AwaitingSecret,
}

impl OnboardingCursor {
    /// Human name of the awaited field.
    pub fn field(&self) -> &'static str {
        match self {
            OnboardingCursor::AwaitingAddress => "server address",
            OnboardingCursor::AwaitingTenant => "database",
            OnboardingCursor::AwaitingLogin => "login",
            OnboardingCursor::AwaitingSecret => "password",
        }
    }
}

/// What happened to one line of onboarding input.
#[derive(Debug, Clone, PartialEq)]
pub enum OnboardingStep {
    /// The answer was stored; the dialogue now waits at `next`.
    Advanced { next: OnboardingCursor },
    /// The answer was refused; the dialogue stays at `cursor`.
    Rejected {
        cursor: OnboardingCursor,
        error: UserError,
    },
    /// All four answers collected. The registry already stored the profile.
    Completed(ConnectionProfile),
}

pub(crate) enum DraftStep {
    Next(Draft),
    Invalid(Draft, UserError),
    Done(ConnectionProfile),
}

/// Answers collected so far.
#[derive(Debug, Clone)]
pub(crate) struct Draft {
    cursor: OnboardingCursor,
    server_address: String,
    tenant: String,
    login: String,
}

impl Draft {
    pub(crate) fn new() -> Self {
        Self {
            cursor: OnboardingCursor::AwaitingAddress,
            server_address: String::new(),
            tenant: String::new(),
            login: String::new(),
        }
    }

    pub(crate) fn cursor(&self) -> OnboardingCursor {
        self.cursor
    }

    /// Feed one answer. Consumes the draft and hands back its successor.
    pub(crate) fn accept(mut self, text: &str) -> DraftStep {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            let field = self.cursor.field();
            return DraftStep::Invalid(self, UserError::EmptyField(field));
        }

        match self.cursor {
            OnboardingCursor::AwaitingAddress => {
                let Some(address) = normalize_server_address(trimmed) else {
                    return DraftStep::Invalid(self, UserError::InvalidAddress(trimmed.to_string()));
                };
                self.server_address = address;
                self.cursor = OnboardingCursor::AwaitingTenant;
            }
            OnboardingCursor::AwaitingTenant => {
                self.tenant = trimmed.to_string();
                self.cursor = OnboardingCursor::AwaitingLogin;
            }
            OnboardingCursor::AwaitingLogin => {
                self.login = trimmed.to_string();
                self.cursor = OnboardingCursor::AwaitingSecret;
            }
            // Passwords may legitimately carry surrounding spaces.
            OnboardingCursor::AwaitingSecret => {
                return DraftStep::Done(ConnectionProfile::new(
                    self.server_address,
                    self.tenant,
                    self.login,
                    text,
                ));
            }
        }
        DraftStep::Next(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance(draft: Draft, text: &str) -> Draft {
        match draft.accept(text) {
            DraftStep::Next(d) => d,
            _ => panic!("expected the dialogue to advance on {text:?}"),
        }
    }

    #[test]
    fn full_dialogue_builds_profile() {
        let d = advance(Draft::new(), "https://hr.example.com/");
        let d = advance(d, "acme");
        let d = advance(d, "alice");
        assert_eq!(d.cursor(), OnboardingCursor::AwaitingSecret);

        match d.accept("s3cret") {
            DraftStep::Done(p) => {
                assert_eq!(p.server_address, "https://hr.example.com");
                assert_eq!(p.tenant, "acme");
                assert_eq!(p.login, "alice");
                assert_eq!(p.secret, "s3cret");
            }
            _ => panic!("expected completion"),
        }
    }

    #[test]
    fn address_without_scheme_is_refused() {
        match Draft::new().accept("hr.example.com") {
            DraftStep::Invalid(d, UserError::InvalidAddress(_)) => {
                assert_eq!(d.cursor(), OnboardingCursor::AwaitingAddress);
            }
            _ => panic!("expected refusal"),
        }
    }

    #[test]
    fn scheme_without_host_is_refused() {
        for text in ["http://", "https:///", "https:// /"] {
            match Draft::new().accept(text) {
                DraftStep::Invalid(d, UserError::InvalidAddress(_)) => {
                    assert_eq!(d.cursor(), OnboardingCursor::AwaitingAddress);
                }
                _ => panic!("expected refusal of {text:?}"),
            }
        }
    }

    #[test]
    fn blank_input_keeps_earlier_answers() {
        let d = advance(Draft::new(), "http://localhost:8069");
        match d.accept("   ") {
            DraftStep::Invalid(d, UserError::EmptyField("database")) => {
                assert_eq!(d.cursor(), OnboardingCursor::AwaitingTenant);
                assert_eq!(d.server_address, "http://localhost:8069");
            }
            _ => panic!("expected refusal"),
        }
    }

    #[test]
    fn blank_secret_is_refused() {
        let d = advance(advance(advance(Draft::new(), "http://x"), "db"), "bob");
        assert!(matches!(d.accept(""), DraftStep::Invalid(_, UserError::EmptyField("password"))));
    }
}
