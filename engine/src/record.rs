//! Canonical record and singleton shapes.
//!
//! These are the types the normalizer produces. Unknown top-level fields are
//! kept in `extra` and written back untouched, so data from a newer build
//! survives a round trip through an older one.

use crate::schema::{WorkoutType, SCHEMA_VERSION};
use crate::{RecordId, SchemaVersion};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unknown fields carried through normalization.
pub type Extra = Map<String, Value>;

/// One set of an exercise. At least one of the two fields is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSet {
    pub reps: Option<f64>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub sets: Vec<WorkoutSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: RecordId,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: WorkoutType,
    pub exercises: Vec<Exercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Eating window for the day. Either end may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodWindow {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alcohol {
    pub drinks: f64,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionEntry {
    pub id: RecordId,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub date: NaiveDate,
    pub total_calories: f64,
    pub total_protein: f64,
    pub food_window: FoodWindow,
    pub alcohol: Alcohol,
    pub meals: Vec<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsEntry {
    pub id: RecordId,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub date: NaiveDate,
    pub weight: Option<f64>,
    pub body_fat: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub steps: Option<f64>,
    pub resting_heart_rate: Option<f64>,
    pub water_liters: Option<f64>,
    pub energy: Option<f64>,
    pub mood: Option<f64>,
    pub creatine: bool,
    pub supplements: bool,
    pub stretching: bool,
    pub meditation: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goals {
    pub weekly_workouts: u8,
    pub daily_calories: f64,
    pub daily_protein: f64,
    pub daily_water_liters: f64,
    pub sleep_hours: f64,
    pub daily_steps: u32,
    pub fasting_hours: f64,
    pub target_weight: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            weekly_workouts: 4,
            daily_calories: 2000.0,
            daily_protein: 150.0,
            daily_water_liters: 3.0,
            sleep_hours: 8.0,
            daily_steps: 10_000,
            fasting_hours: 16.0,
            target_weight: None,
            extra: Extra::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastingWindow {
    pub start: String,
    pub end: String,
}

impl Default for FastingWindow {
    fn default() -> Self {
        Self {
            start: "12:00".to_string(),
            end: "20:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub height_cm: Option<f64>,
    pub sex: Option<Sex>,
    pub units: Units,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingState {
    pub completed: bool,
    pub completed_at: Option<String>,
    pub deferred_until: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub schema_version: SchemaVersion,
    pub theme: Theme,
    pub workout_split: Vec<WorkoutType>,
    pub default_fasting_window: FastingWindow,
    pub custom_exercises: Vec<String>,
    pub profile: Profile,
    pub onboarding: OnboardingState,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            theme: Theme::default(),
            workout_split: WorkoutType::default_split(),
            default_fasting_window: FastingWindow::default(),
            custom_exercises: Vec::new(),
            profile: Profile::default(),
            onboarding: OnboardingState::default(),
            extra: Extra::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn workout_serializes_camel_case_with_extra() {
        let mut extra = Extra::new();
        extra.insert("durationMinutes".into(), json!(45));

        let workout = Workout {
            id: "w1".into(),
            created_at: "2026-02-01T00:00:00.000Z".into(),
            updated_at: None,
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            kind: WorkoutType::FullBody,
            exercises: vec![Exercise {
                name: "Squat".into(),
                sets: vec![WorkoutSet {
                    reps: Some(5.0),
                    weight: None,
                }],
            }],
            notes: None,
            extra,
        };

        let value = serde_json::to_value(&workout).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "w1",
                "createdAt": "2026-02-01T00:00:00.000Z",
                "date": "2026-02-01",
                "type": "full_body",
                "exercises": [{"name": "Squat", "sets": [{"reps": 5.0, "weight": null}]}],
                "durationMinutes": 45
            })
        );
    }

    #[test]
    fn settings_default_shape() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(value["schemaVersion"], json!(SCHEMA_VERSION));
        assert_eq!(value["theme"], json!("dark"));
        assert_eq!(value["workoutSplit"], json!(["push", "pull", "legs"]));
        assert_eq!(
            value["defaultFastingWindow"],
            json!({"start": "12:00", "end": "20:00"})
        );
        assert_eq!(
            value["onboarding"],
            json!({"completed": false, "completedAt": null, "deferredUntil": null})
        );
        assert_eq!(value["profile"]["units"], json!("metric"));
    }

    #[test]
    fn nutrition_alcohol_uses_type_key() {
        let alcohol = Alcohol {
            drinks: 2.0,
            kind: Some("wine".into()),
        };
        assert_eq!(
            serde_json::to_value(alcohol).unwrap(),
            json!({"drinks": 2.0, "type": "wine"})
        );
    }
}
