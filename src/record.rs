use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{Identity, RegisteredUser};
use crate::metrics::MetricsLog;
use crate::settings::Settings;

/// Final statistics of one half. Never changed once built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HalfStats {
    pub characters_typed: usize,
    pub mistakes: usize,
    pub time_spent: u64,
}

/// Persisted summary of a finished (or manually ended) session, the body of
/// `POST /tests`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub user_id: String,
    pub name: String,
    pub registration_number: String,
    pub department: String,
    pub half_time: u64,
    pub break_time: u64,
    pub first_half: HalfStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_half: Option<HalfStats>,
    pub total_characters_typed: usize,
    pub total_mistakes: usize,
    pub total_time_spent: u64,
    pub ended_early: bool,
    pub completed_at: DateTime<Utc>,
}

impl TestRecord {
    pub fn new(
        identity: &Identity,
        user: &RegisteredUser,
        settings: Settings,
        first_half: HalfStats,
        second_half: Option<HalfStats>,
        ended_early: bool,
    ) -> Self {
        let halves = std::iter::once(first_half).chain(second_half);
        let (chars, mistakes, time) = halves.fold((0, 0, 0), |(c, m, t), h| {
            (c + h.characters_typed, m + h.mistakes, t + h.time_spent)
        });

        Self {
            user_id: user.id.clone(),
            name: identity.name.clone(),
            registration_number: identity.registration_number.clone(),
            department: identity.department.clone(),
            half_time: settings.half_time,
            break_time: settings.break_time,
            first_half,
            second_half,
            total_characters_typed: chars,
            total_mistakes: mistakes,
            total_time_spent: time,
            ended_early,
            completed_at: Utc::now(),
        }
    }

    /// Characters per minute over the time actually spent typing
    pub fn characters_per_minute(&self) -> f64 {
        if self.total_time_spent == 0 {
            return 0.0;
        }
        (self.total_characters_typed as f64 * 60.0 / self.total_time_spent as f64).round()
    }
}

/// Body of `POST /metrics`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSubmission {
    pub user_id: String,
    pub first_half: MetricsLog,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_half: Option<MetricsLog>,
    pub half_time: u64,
    pub break_time: u64,
}

/// What the backend echoed back for a stored test record
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PersistedRecord {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> (Identity, RegisteredUser) {
        (
            Identity::new("Ada", "Architecture", "1804001"),
            RegisteredUser {
                id: "u1".to_string(),
            },
        )
    }

    fn half(chars: usize, mistakes: usize, time: u64) -> HalfStats {
        HalfStats {
            characters_typed: chars,
            mistakes,
            time_spent: time,
        }
    }

    #[test]
    fn test_totals_cover_both_halves() {
        let (id, user) = identity();
        let record = TestRecord::new(
            &id,
            &user,
            Settings::default(),
            half(100, 4, 120),
            Some(half(80, 2, 120)),
            false,
        );

        assert_eq!(record.total_characters_typed, 180);
        assert_eq!(record.total_mistakes, 6);
        assert_eq!(record.total_time_spent, 240);
        assert_eq!(record.characters_per_minute(), 45.0);
    }

    #[test]
    fn test_missing_second_half_is_omitted() {
        let (id, user) = identity();
        let record = TestRecord::new(
            &id,
            &user,
            Settings::default(),
            half(10, 1, 5),
            None,
            true,
        );

        assert_eq!(record.total_characters_typed, 10);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("secondHalf").is_none());
        assert_eq!(json["firstHalf"]["timeSpent"], 5);
        assert_eq!(json["registrationNumber"], "1804001");
        assert_eq!(json["endedEarly"], true);
    }

    #[test]
    fn test_cpm_without_time_is_zero() {
        let (id, user) = identity();
        let record = TestRecord::new(&id, &user, Settings::default(), half(0, 0, 0), None, true);
        assert_eq!(record.characters_per_minute(), 0.0);
    }

    #[test]
    fn test_persisted_record_tolerates_missing_id() {
        let echoed: PersistedRecord = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(echoed.id, None);
        let echoed: PersistedRecord = serde_json::from_str(r#"{"_id":"t9"}"#).unwrap();
        assert_eq!(echoed.id.as_deref(), Some("t9"));
    }
}
