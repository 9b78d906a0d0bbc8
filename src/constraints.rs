use std::ops::RangeInclusive;

use tracing::trace;

use crate::weights::{WeightKey, WeightSet};

pub const MAX_CLASSES_BATCH_DEFAULT: u32 = 6;
pub const MAX_CLASSES_BATCH_RANGE: RangeInclusive<u32> = 1..=10;
pub const MAX_CLASSES_FACULTY_DEFAULT: u32 = 8;
pub const MAX_CLASSES_FACULTY_RANGE: RangeInclusive<u32> = 1..=12;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlots {
    pub morning: Vec<String>,
    pub afternoon: Vec<String>,
    pub evening: Vec<String>,
}

impl Default for TimeSlots {
    fn default() -> Self {
        let slots = |s: &[&str]| s.iter().map(|t| t.to_string()).collect::<Vec<String>>();
        TimeSlots {
            morning: slots(&["09:00", "10:00", "11:00", "12:00"]),
            afternoon: slots(&["13:00", "14:00", "15:00", "16:00"]),
            evening: slots(&["17:00", "18:00", "19:00"]),
        }
    }
}

impl TimeSlots {
    /// Slots per shift, numbered consecutively across the day starting at 1.
    pub fn numbered(&self) -> Vec<(&'static str, Vec<(usize, &str)>)> {
        let mut next = 1;
        [
            ("Morning", &self.morning),
            ("Afternoon", &self.afternoon),
            ("Evening", &self.evening),
        ]
        .into_iter()
        .map(|(shift, slots)| {
            let numbered = slots
                .iter()
                .enumerate()
                .map(|(i, s)| (next + i, s.as_str()))
                .collect::<Vec<_>>();
            next += slots.len();
            (shift, numbered)
        })
        .collect()
    }
}

/// Rules and preferences for a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraints {
    pub max_classes_per_day_batch: u32,
    pub max_classes_per_day_faculty: u32,
    pub time_slots: TimeSlots,
    pub weights: WeightSet,
}

impl Default for Constraints {
    fn default() -> Self {
        Constraints {
            max_classes_per_day_batch: MAX_CLASSES_BATCH_DEFAULT,
            max_classes_per_day_faculty: MAX_CLASSES_FACULTY_DEFAULT,
            time_slots: TimeSlots::default(),
            weights: WeightSet::default(),
        }
    }
}

// Leading integer of `input` like a number form field reads it. Zero and
// garbage both mean "use the default".
fn parse_class_limit(input: &str, default: u32, range: RangeInclusive<u32>) -> u32 {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    let parsed = match digits.parse::<u64>() {
        Ok(0) => return default,
        Err(_) if digits.is_empty() => return default,
        _ if negative => *range.start(),
        Ok(n) => u32::try_from(n).unwrap_or(u32::MAX),
        // Only overflow is left
        Err(_) => u32::MAX,
    };
    parsed.clamp(*range.start(), *range.end())
}

fn step_class_limit(current: u32, delta: i32, range: RangeInclusive<u32>) -> u32 {
    let stepped = i64::from(current) + i64::from(delta);
    stepped.clamp(i64::from(*range.start()), i64::from(*range.end())) as u32
}

impl Constraints {
    pub fn with_weight(&self, key: WeightKey, percent: f64) -> Constraints {
        Constraints {
            weights: self.weights.normalize(key, percent),
            ..self.clone()
        }
    }

    pub fn step_weight(&self, key: WeightKey, steps: i32) -> Constraints {
        Constraints {
            weights: self.weights.step(key, steps),
            ..self.clone()
        }
    }

    pub fn set_max_classes_batch(&self, input: &str) -> Constraints {
        let value = parse_class_limit(input, MAX_CLASSES_BATCH_DEFAULT, MAX_CLASSES_BATCH_RANGE);
        trace!("Max classes per day (batch): {input:?} -> {value}");
        Constraints {
            max_classes_per_day_batch: value,
            ..self.clone()
        }
    }

    pub fn set_max_classes_faculty(&self, input: &str) -> Constraints {
        let value =
            parse_class_limit(input, MAX_CLASSES_FACULTY_DEFAULT, MAX_CLASSES_FACULTY_RANGE);
        trace!("Max classes per day (faculty): {input:?} -> {value}");
        Constraints {
            max_classes_per_day_faculty: value,
            ..self.clone()
        }
    }

    pub fn step_max_classes_batch(&self, delta: i32) -> Constraints {
        Constraints {
            max_classes_per_day_batch: step_class_limit(
                self.max_classes_per_day_batch,
                delta,
                MAX_CLASSES_BATCH_RANGE,
            ),
            ..self.clone()
        }
    }

    pub fn step_max_classes_faculty(&self, delta: i32) -> Constraints {
        Constraints {
            max_classes_per_day_faculty: step_class_limit(
                self.max_classes_per_day_faculty,
                delta,
                MAX_CLASSES_FACULTY_RANGE,
            ),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Constraints::default();
        assert_eq!(c.max_classes_per_day_batch, 6);
        assert_eq!(c.max_classes_per_day_faculty, 8);
        assert_eq!(c.weights, WeightSet::default());
        assert_eq!(c.time_slots.morning.len(), 4);
        assert_eq!(c.time_slots.evening, vec!["17:00", "18:00", "19:00"]);
    }

    #[test]
    fn class_limit_parsing() {
        let c = Constraints::default();
        assert_eq!(c.set_max_classes_batch("abc").max_classes_per_day_batch, 6);
        assert_eq!(c.set_max_classes_batch("0").max_classes_per_day_batch, 6);
        assert_eq!(c.set_max_classes_batch("").max_classes_per_day_batch, 6);
        assert_eq!(c.set_max_classes_batch("7x").max_classes_per_day_batch, 7);
        assert_eq!(c.set_max_classes_batch(" 9").max_classes_per_day_batch, 9);
        assert_eq!(c.set_max_classes_batch("42").max_classes_per_day_batch, 10);
        assert_eq!(c.set_max_classes_batch("-3").max_classes_per_day_batch, 1);
        assert_eq!(c.set_max_classes_faculty("12").max_classes_per_day_faculty, 12);
        assert_eq!(c.set_max_classes_faculty("x").max_classes_per_day_faculty, 8);
        assert_eq!(
            c.set_max_classes_faculty("99999999999999999999")
                .max_classes_per_day_faculty,
            12
        );
    }

    #[test]
    fn class_limit_steps_stay_in_range() {
        let c = Constraints::default()
            .step_max_classes_batch(10)
            .step_max_classes_faculty(-20);
        assert_eq!(c.max_classes_per_day_batch, 10);
        assert_eq!(c.max_classes_per_day_faculty, 1);
        assert_eq!(c.step_max_classes_batch(-1).max_classes_per_day_batch, 9);
    }

    #[test]
    fn weights_are_normalized() {
        let c = Constraints::default().with_weight(WeightKey::FacultyLoad, 60.0);
        assert!((c.weights.total() - 1.0).abs() < 1e-9);
        assert_eq!(c.weights.rounded_percent(WeightKey::FacultyLoad), 46);
        assert_eq!(c.max_classes_per_day_batch, 6);
    }

    #[test]
    fn numbered_slots_continue_across_shifts() {
        let slots = TimeSlots::default();
        let numbered = slots.numbered();
        assert_eq!(numbered[0].1[0], (1, "09:00"));
        assert_eq!(numbered[1].1[0], (5, "13:00"));
        assert_eq!(numbered[2].1[2], (11, "19:00"));
    }
}
