//! First-run onboarding state, kept in `settings.onboarding`.

use crate::clock::{format_timestamp, parse_timestamp};
use crate::normalize::normalize;
use crate::record::OnboardingState;
use crate::schema::Collection;
use crate::store::LocalStore;
use crate::{Error, Result};
use chrono::{Datelike, Duration};
use serde_json::{json, Map, Value};

const MAX_DEFER_YEAR: i32 = 9999;

/// Answers collected by the onboarding flow. Either map may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnboardingInput {
    pub goals: Map<String, Value>,
    pub profile: Map<String, Value>,
}

pub struct Onboarding<'a> {
    store: &'a LocalStore,
}

impl<'a> Onboarding<'a> {
    pub fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    pub fn state(&self) -> OnboardingState {
        let settings = self.store.get(Collection::Settings);
        let normalized = normalize(Collection::Settings, &settings, &self.store.normalize_context());
        serde_json::from_value(normalized["onboarding"].clone()).unwrap_or_default()
    }

    /// Whether the onboarding flow should be shown now.
    pub fn should_prompt(&self) -> bool {
        let state = self.state();
        if state.completed {
            return false;
        }
        match state.deferred_until.as_deref().and_then(parse_timestamp) {
            Some(until) => self.store.clock().now() >= until,
            None => true,
        }
    }

    /// Apply the collected answers and mark onboarding complete.
    pub fn complete(&self, input: OnboardingInput) -> Result<()> {
        if !input.goals.is_empty() {
            self.store.patch(Collection::Goals, &Value::Object(input.goals))?;
        }

        let settings = self.store.get(Collection::Settings);
        let mut profile = settings
            .get("profile")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        profile.extend(input.profile);

        self.store.patch(
            Collection::Settings,
            &json!({
                "profile": profile,
                "onboarding": {
                    "completed": true,
                    "completedAt": self.store.clock().now_iso(),
                    "deferredUntil": null,
                },
            }),
        )?;
        tracing::info!("onboarding completed");
        Ok(())
    }

    /// Postpone the prompt by `days`. The resulting date must fit a
    /// four-digit year so it can be stored as an ISO timestamp.
    pub fn defer(&self, days: u32) -> Result<()> {
        let until = Duration::try_days(i64::from(days))
            .and_then(|delta| self.store.clock().now().checked_add_signed(delta))
            .filter(|until| until.year() <= MAX_DEFER_YEAR)
            .ok_or(Error::DeferralOutOfRange(days))?;
        let state = self.state();
        self.write_state(OnboardingState {
            deferred_until: Some(format_timestamp(until)),
            ..state
        })
    }

    /// Forget all onboarding progress.
    pub fn reset(&self) -> Result<()> {
        self.write_state(OnboardingState::default())
    }

    fn write_state(&self, state: OnboardingState) -> Result<()> {
        let state = serde_json::to_value(state)?;
        self.store
            .patch(Collection::Settings, &json!({ "onboarding": state }))?;
        Ok(())
    }
}
