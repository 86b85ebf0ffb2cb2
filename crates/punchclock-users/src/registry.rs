use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use punchclock_core::types::{ConnectionProfile, UserIdentity};
use tracing::{debug, info};

use crate::error::{Result, UserError};
use crate::onboarding::{Draft, DraftStep, OnboardingCursor, OnboardingStep};

#[derive(Default)]
struct Inner {
    profiles: HashMap<UserIdentity, ConnectionProfile>,
    onboarding: HashMap<UserIdentity, Draft>,
}

/// In-memory store of connection profiles and onboarding dialogues.
///
/// One mutex guards both maps so that finishing a dialogue (drop the
/// cursor, store the profile) is a single step. The lock is never held
/// across an `.await`.
#[derive(Default)]
pub struct UserRegistry {
    inner: Mutex<Inner>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic elsewhere must not take the registry down with it.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn get(&self, id: &UserIdentity) -> Option<ConnectionProfile> {
        self.lock().profiles.get(id).cloned()
    }

    /// Like [`get`](Self::get), but a missing profile is an error.
    pub fn require(&self, id: &UserIdentity) -> Result<ConnectionProfile> {
        self.get(id).ok_or_else(|| UserError::NotFound(id.to_string()))
    }

    /// Insert or replace the profile for `id`.
    pub fn put(&self, id: UserIdentity, profile: ConnectionProfile) {
        debug!(user = %id, login = %profile.login, "profile stored");
        self.lock().profiles.insert(id, profile);
    }

    /// Drop the profile and any dialogue in progress.
    pub fn remove(&self, id: &UserIdentity) -> Option<ConnectionProfile> {
        let mut inner = self.lock();
        inner.onboarding.remove(id);
        inner.profiles.remove(id)
    }

    /// Snapshot of all profiles, ordered by identity.
    pub fn list(&self) -> Vec<(UserIdentity, ConnectionProfile)> {
        let mut entries: Vec<_> = self
            .lock()
            .profiles
            .iter()
            .map(|(id, p)| (id.clone(), p.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.lock().profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every profile that logs in as `login`. Returns the identities
    /// that were removed.
    pub fn remove_by_login(&self, login: &str) -> Vec<UserIdentity> {
        let mut inner = self.lock();
        let mut removed: Vec<_> = inner
            .profiles
            .iter()
            .filter(|(_, p)| p.login == login)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &removed {
            inner.profiles.remove(id);
            inner.onboarding.remove(id);
        }
        removed.sort();
        if !removed.is_empty() {
            info!(login, count = removed.len(), "profiles removed by login");
        }
        removed
    }

    /// Start (or restart) the dialogue for `id`. An existing profile stays
    /// active until the new dialogue completes.
    pub fn begin_onboarding(&self, id: UserIdentity) -> OnboardingCursor {
        let draft = Draft::new();
        let cursor = draft.cursor();
        self.lock().onboarding.insert(id, draft);
        cursor
    }

    pub fn cursor(&self, id: &UserIdentity) -> Option<OnboardingCursor> {
        self.lock().onboarding.get(id).map(Draft::cursor)
    }

    /// Feed one line of text to the dialogue of `id`.
    ///
    /// `None` when no dialogue is in progress. On completion the cursor is
    /// cleared and the profile stored under the same lock.
    pub fn submit_onboarding(&self, id: &UserIdentity, text: &str) -> Option<OnboardingStep> {
        let mut inner = self.lock();
        let draft = inner.onboarding.remove(id)?;

        let step = match draft.accept(text) {
            DraftStep::Next(draft) => {
                let next = draft.cursor();
                inner.onboarding.insert(id.clone(), draft);
                OnboardingStep::Advanced { next }
            }
            DraftStep::Invalid(draft, error) => {
                let cursor = draft.cursor();
                inner.onboarding.insert(id.clone(), draft);
                OnboardingStep::Rejected { cursor, error }
            }
            DraftStep::Done(profile) => {
                inner.profiles.insert(id.clone(), profile.clone());
                info!(user = %id, login = %profile.login, server = %profile.server_address, "onboarding completed");
                OnboardingStep::Completed(profile)
            }
        };
        Some(step)
    }
}
