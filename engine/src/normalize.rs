//! Schema normalizer.
//!
//! Turns whatever JSON is found in storage (legacy shapes, hand-edited
//! imports, partial writes) into the canonical shapes in [`crate::record`].
//!
//! Rules:
//! - Never fails. Malformed records are filtered out; malformed fields are
//!   replaced with defaults.
//! - Idempotent: normalizing canonical data returns it unchanged. Record ids
//!   and creation timestamps that are already present are never regenerated.
//! - Pure apart from minting ids for records that arrive without one.

use crate::clock::{format_timestamp, Clock};
use crate::coerce;
use crate::record::{
    Alcohol, Exercise, Extra, FastingWindow, FoodWindow, Goals, MetricsEntry, NutritionEntry,
    OnboardingState, Profile, Settings, Sex, Theme, Units, Workout, WorkoutSet,
};
use crate::schema::{Collection, WorkoutType, SCHEMA_VERSION};
use crate::RecordId;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Longest custom exercise name kept, in characters.
pub const MAX_CUSTOM_EXERCISE_LEN: usize = 60;

/// Maximum number of custom exercises kept.
pub const MAX_CUSTOM_EXERCISES: usize = 200;

const IDENTITY_FIELDS: &[&str] = &["id", "createdAt", "updatedAt", "date"];

const WORKOUT_FIELDS: &[&str] = &["type", "exercises", "notes"];

const NUTRITION_FIELDS: &[&str] = &[
    "totalCalories",
    "totalProtein",
    "foodWindow",
    "alcohol",
    "meals",
    "notes",
];

const METRIC_NUMBER_FIELDS: &[&str] = &[
    "weight",
    "bodyFat",
    "sleepHours",
    "steps",
    "restingHeartRate",
    "waterLiters",
    "energy",
    "mood",
];

const METRIC_FLAG_FIELDS: &[&str] = &["creatine", "supplements", "stretching", "meditation"];

const GOAL_FIELDS: &[&str] = &[
    "weeklyWorkouts",
    "dailyCalories",
    "dailyProtein",
    "dailyWaterLiters",
    "sleepHours",
    "dailySteps",
    "fastingHours",
    "targetWeight",
];

const SETTINGS_FIELDS: &[&str] = &[
    "schemaVersion",
    "theme",
    "darkMode",
    "workoutSplit",
    "defaultFastingWindow",
    "customExercises",
    "profile",
    "onboarding",
    "onboardingCompleted",
];

const PROFILE_FIELDS: &[&str] = &["name", "age", "heightCm", "sex", "units"];

/// Inputs the normalizer needs from the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeContext {
    /// Fallback for missing or unparseable record dates.
    pub today: NaiveDate,
}

impl NormalizeContext {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self::new(clock.today())
    }
}

/// Normalize any collection into its canonical JSON value.
pub fn normalize(collection: Collection, raw: &Value, ctx: &NormalizeContext) -> Value {
    match collection {
        Collection::Workouts => to_json(&normalize_workouts(raw, ctx), Value::Array(Vec::new())),
        Collection::Nutrition => {
            to_json(&normalize_nutrition(raw, ctx), Value::Array(Vec::new()))
        }
        Collection::Metrics => to_json(&normalize_metrics(raw, ctx), Value::Array(Vec::new())),
        Collection::Goals => to_json(&normalize_goals(raw), Value::Object(Map::new())),
        Collection::Settings => to_json(&normalize_settings(raw), Value::Object(Map::new())),
    }
}

fn to_json<T: Serialize>(value: &T, fallback: Value) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "failed to serialize normalized value");
        fallback
    })
}

pub fn normalize_workouts(raw: &Value, ctx: &NormalizeContext) -> Vec<Workout> {
    normalize_records(raw, |obj| normalize_workout(obj, ctx), |w| &w.id)
}

pub fn normalize_nutrition(raw: &Value, ctx: &NormalizeContext) -> Vec<NutritionEntry> {
    normalize_records(raw, |obj| normalize_nutrition_entry(obj, ctx), |n| &n.id)
}

pub fn normalize_metrics(raw: &Value, ctx: &NormalizeContext) -> Vec<MetricsEntry> {
    normalize_records(raw, |obj| normalize_metrics_entry(obj, ctx), |m| &m.id)
}

/// Shared record-list handling: drop non-objects, normalize the rest, and
/// keep only the first record for any repeated id.
fn normalize_records<T>(
    raw: &Value,
    normalize_one: impl Fn(&Map<String, Value>) -> T,
    id_of: impl Fn(&T) -> &RecordId,
) -> Vec<T> {
    let Some(items) = raw.as_array() else {
        if !raw.is_null() {
            tracing::debug!("expected a record list, found another JSON type");
        }
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let Some(obj) = item.as_object() else {
            continue;
        };
        let record = normalize_one(obj);
        if seen.insert(id_of(&record).clone()) {
            records.push(record);
        } else {
            tracing::debug!(id = %id_of(&record), "dropping record with duplicate id");
        }
    }
    records
}

struct Identity {
    id: RecordId,
    created_at: String,
    updated_at: Option<String>,
    date: NaiveDate,
}

fn identity(obj: &Map<String, Value>, ctx: &NormalizeContext) -> Identity {
    let date = coerce::date(obj.get("date"), ctx.today);
    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    };
    let created_at = coerce::timestamp(obj.get("createdAt")).unwrap_or_else(|| {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        format_timestamp(midnight)
    });
    Identity {
        id,
        created_at,
        updated_at: coerce::timestamp(obj.get("updatedAt")),
        date,
    }
}

fn extra_fields(obj: &Map<String, Value>, known: &[&[&str]]) -> Extra {
    obj.iter()
        .filter(|(key, _)| !known.iter().any(|group| group.contains(&key.as_str())))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn normalize_workout(obj: &Map<String, Value>, ctx: &NormalizeContext) -> Workout {
    let identity = identity(obj, ctx);
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(WorkoutType::parse)
        .unwrap_or_default();
    let exercises = obj
        .get("exercises")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(normalize_exercise).collect())
        .unwrap_or_default();

    Workout {
        id: identity.id,
        created_at: identity.created_at,
        updated_at: identity.updated_at,
        date: identity.date,
        kind,
        exercises,
        notes: coerce::text(obj.get("notes")),
        extra: extra_fields(obj, &[IDENTITY_FIELDS, WORKOUT_FIELDS]),
    }
}

fn normalize_exercise(value: &Value) -> Option<Exercise> {
    // Older builds stored bare exercise names
    if let Some(name) = coerce::text(Some(value)) {
        return Some(Exercise {
            name,
            sets: Vec::new(),
        });
    }

    let obj = value.as_object()?;
    let name = coerce::text(obj.get("name"))?;
    let sets = obj
        .get("sets")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(normalize_set).collect())
        .unwrap_or_default();
    Some(Exercise { name, sets })
}

fn normalize_set(value: &Value) -> Option<WorkoutSet> {
    let obj = value.as_object()?;
    let reps = coerce::number(obj.get("reps"));
    let weight = coerce::number(obj.get("weight"));
    (reps.is_some() || weight.is_some()).then_some(WorkoutSet { reps, weight })
}

fn normalize_nutrition_entry(obj: &Map<String, Value>, ctx: &NormalizeContext) -> NutritionEntry {
    let identity = identity(obj, ctx);

    let food_window = match obj.get("foodWindow").and_then(Value::as_object) {
        Some(window) => FoodWindow {
            start: coerce::clock_time(window.get("start")),
            end: coerce::clock_time(window.get("end")),
        },
        None => FoodWindow::default(),
    };

    let alcohol = match obj.get("alcohol") {
        Some(Value::Object(alcohol)) => Alcohol {
            drinks: coerce::non_negative(alcohol.get("drinks")).unwrap_or(0.0),
            kind: coerce::text(alcohol.get("type")),
        },
        // A bare number is a drink count from the single-field format
        other => Alcohol {
            drinks: coerce::non_negative(other).unwrap_or(0.0),
            kind: None,
        },
    };

    let meals = obj
        .get("meals")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).cloned().collect())
        .unwrap_or_default();

    NutritionEntry {
        id: identity.id,
        created_at: identity.created_at,
        updated_at: identity.updated_at,
        date: identity.date,
        total_calories: coerce::non_negative(obj.get("totalCalories")).unwrap_or(0.0),
        total_protein: coerce::non_negative(obj.get("totalProtein")).unwrap_or(0.0),
        food_window,
        alcohol,
        meals,
        notes: coerce::text(obj.get("notes")),
        extra: extra_fields(obj, &[IDENTITY_FIELDS, NUTRITION_FIELDS]),
    }
}

fn normalize_metrics_entry(obj: &Map<String, Value>, ctx: &NormalizeContext) -> MetricsEntry {
    let identity = identity(obj, ctx);
    let number = |key: &str| coerce::number(obj.get(key));
    let flag = |key: &str| coerce::flag(obj.get(key));

    MetricsEntry {
        id: identity.id,
        created_at: identity.created_at,
        updated_at: identity.updated_at,
        date: identity.date,
        weight: number("weight"),
        body_fat: number("bodyFat"),
        sleep_hours: number("sleepHours"),
        steps: number("steps"),
        resting_heart_rate: number("restingHeartRate"),
        water_liters: number("waterLiters"),
        energy: number("energy"),
        mood: number("mood"),
        creatine: flag("creatine"),
        supplements: flag("supplements"),
        stretching: flag("stretching"),
        meditation: flag("meditation"),
        extra: extra_fields(
            obj,
            &[IDENTITY_FIELDS, METRIC_NUMBER_FIELDS, METRIC_FLAG_FIELDS],
        ),
    }
}

pub fn normalize_goals(raw: &Value) -> Goals {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);
    let defaults = Goals::default();
    let positive = |key: &str, fallback: f64| coerce::positive(obj.get(key)).unwrap_or(fallback);

    Goals {
        weekly_workouts: coerce::number(obj.get("weeklyWorkouts"))
            .map(|n| n.round().clamp(1.0, 7.0) as u8)
            .unwrap_or(defaults.weekly_workouts),
        daily_calories: positive("dailyCalories", defaults.daily_calories),
        daily_protein: positive("dailyProtein", defaults.daily_protein),
        daily_water_liters: positive("dailyWaterLiters", defaults.daily_water_liters),
        sleep_hours: positive("sleepHours", defaults.sleep_hours),
        daily_steps: coerce::positive(obj.get("dailySteps"))
            .map(|n| n.round().min(f64::from(u32::MAX)) as u32)
            .filter(|n| *n > 0)
            .unwrap_or(defaults.daily_steps),
        fasting_hours: coerce::positive(obj.get("fastingHours"))
            .filter(|h| *h <= 24.0)
            .unwrap_or(defaults.fasting_hours),
        target_weight: coerce::positive(obj.get("targetWeight")),
        extra: extra_fields(obj, &[GOAL_FIELDS]),
    }
}

pub fn normalize_settings(raw: &Value) -> Settings {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    Settings {
        schema_version: SCHEMA_VERSION,
        theme: resolve_theme(obj),
        workout_split: normalize_split(obj.get("workoutSplit")),
        default_fasting_window: normalize_fasting_window(obj.get("defaultFastingWindow")),
        custom_exercises: normalize_custom_exercises(obj.get("customExercises")),
        profile: normalize_profile(obj.get("profile").unwrap_or(&Value::Null)),
        onboarding: normalize_onboarding(obj),
        extra: extra_fields(obj, &[SETTINGS_FIELDS]),
    }
}

fn resolve_theme(obj: &Map<String, Value>) -> Theme {
    match obj.get("theme").and_then(Value::as_str).map(str::trim) {
        Some("dark") => Theme::Dark,
        Some("light") => Theme::Light,
        _ => match obj.get("darkMode") {
            Some(Value::Bool(true)) => Theme::Dark,
            Some(Value::Bool(false)) => Theme::Light,
            _ => Theme::default(),
        },
    }
}

fn normalize_split(value: Option<&Value>) -> Vec<WorkoutType> {
    let mut split = Vec::new();
    for name in coerce::string_list(value) {
        if let Some(kind) = WorkoutType::parse(&name) {
            if !split.contains(&kind) {
                split.push(kind);
            }
        }
    }
    if split.is_empty() {
        WorkoutType::default_split()
    } else {
        split
    }
}

fn normalize_fasting_window(value: Option<&Value>) -> FastingWindow {
    let defaults = FastingWindow::default();
    let Some(window) = value.and_then(Value::as_object) else {
        return defaults;
    };
    FastingWindow {
        start: coerce::clock_time(window.get("start")).unwrap_or(defaults.start),
        end: coerce::clock_time(window.get("end")).unwrap_or(defaults.end),
    }
}

fn normalize_custom_exercises(value: Option<&Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    coerce::string_list(value)
        .into_iter()
        .map(|name| {
            name.chars()
                .take(MAX_CUSTOM_EXERCISE_LEN)
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .filter(|name| seen.insert(name.to_lowercase()))
        .take(MAX_CUSTOM_EXERCISES)
        .collect()
}

/// Normalize the profile object embedded in settings.
pub fn normalize_profile(raw: &Value) -> Profile {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let sex = obj
        .get("sex")
        .and_then(Value::as_str)
        .and_then(|s| match s.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Sex::Male),
            "female" => Some(Sex::Female),
            "other" => Some(Sex::Other),
            _ => None,
        });
    let units = match obj.get("units").and_then(Value::as_str).map(str::trim) {
        Some("imperial") => Units::Imperial,
        _ => Units::Metric,
    };

    Profile {
        name: coerce::text(obj.get("name")),
        age: coerce::positive(obj.get("age"))
            .map(f64::round)
            .filter(|age| *age >= 1.0 && *age <= 150.0)
            .map(|age| age as u32),
        height_cm: coerce::positive(obj.get("heightCm")),
        sex,
        units,
        extra: extra_fields(obj, &[PROFILE_FIELDS]),
    }
}

fn normalize_onboarding(settings: &Map<String, Value>) -> OnboardingState {
    match settings.get("onboarding").and_then(Value::as_object) {
        Some(obj) => OnboardingState {
            completed: coerce::flag(obj.get("completed")),
            completed_at: coerce::timestamp(obj.get("completedAt")),
            deferred_until: coerce::timestamp(obj.get("deferredUntil")),
        },
        None => OnboardingState {
            completed: coerce::flag(settings.get("onboardingCompleted")),
            ..OnboardingState::default()
        },
    }
}
