//! Optimization weights for timetable generation.
//!
//! Three objectives are balanced against each other. Whenever one slider
//! moves, all three weights are renormalized so that they sum to 1.0 while
//! the untouched pair keeps its relative proportion.

use std::fmt;
use std::str::FromStr;

use tracing::{trace, warn};

use crate::domain::TTVError;

/// Slider granularity in percentage points.
pub const WEIGHT_STEP: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightKey {
    FacultyLoad,
    RoomUtilization,
    StudentGaps,
}

impl WeightKey {
    pub const ALL: [WeightKey; 3] = [
        WeightKey::FacultyLoad,
        WeightKey::RoomUtilization,
        WeightKey::StudentGaps,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WeightKey::FacultyLoad => "facultyLoad",
            WeightKey::RoomUtilization => "roomUtilization",
            WeightKey::StudentGaps => "studentGaps",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WeightKey::FacultyLoad => "Faculty Load Balance",
            WeightKey::RoomUtilization => "Room Utilization",
            WeightKey::StudentGaps => "Minimize Student Gaps",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            WeightKey::FacultyLoad => "Faculty",
            WeightKey::RoomUtilization => "Rooms",
            WeightKey::StudentGaps => "Gaps",
        }
    }
}

impl fmt::Display for WeightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WeightKey {
    type Err = TTVError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WeightKey::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| TTVError::UnknownWeight(s.to_string()))
    }
}

/// Fractions per objective. Only `normalize` produces new values, so a
/// `WeightSet` always sums to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSet {
    faculty_load: f64,
    room_utilization: f64,
    student_gaps: f64,
}

impl Default for WeightSet {
    fn default() -> Self {
        WeightSet {
            faculty_load: 0.3,
            room_utilization: 0.4,
            student_gaps: 0.3,
        }
    }
}

impl WeightSet {
    fn equal_thirds() -> Self {
        WeightSet {
            faculty_load: 1.0 / 3.0,
            room_utilization: 1.0 / 3.0,
            student_gaps: 1.0 / 3.0,
        }
    }

    pub fn get(&self, key: WeightKey) -> f64 {
        match key {
            WeightKey::FacultyLoad => self.faculty_load,
            WeightKey::RoomUtilization => self.room_utilization,
            WeightKey::StudentGaps => self.student_gaps,
        }
    }

    fn set(&mut self, key: WeightKey, value: f64) {
        match key {
            WeightKey::FacultyLoad => self.faculty_load = value,
            WeightKey::RoomUtilization => self.room_utilization = value,
            WeightKey::StudentGaps => self.student_gaps = value,
        }
    }

    pub fn total(&self) -> f64 {
        self.faculty_load + self.room_utilization + self.student_gaps
    }

    /// Slider position of `key` in the 0-100 range.
    pub fn percent(&self, key: WeightKey) -> f64 {
        self.get(key) * 100.0
    }

    /// Rounded percentage as shown next to each slider.
    pub fn rounded_percent(&self, key: WeightKey) -> u32 {
        // Weights are never negative, so rounding half away from zero rounds halves up.
        self.percent(key).round() as u32
    }

    /// Set `key` to `new_value` percent and rescale all three weights to sum to 1.0.
    ///
    /// `new_value` is clamped to 0-100 (NaN counts as 0). If every weight
    /// ends up at zero there is nothing to scale, and the set falls back to
    /// equal thirds.
    pub fn normalize(&self, key: WeightKey, new_value: f64) -> WeightSet {
        let new_value = if new_value.is_nan() {
            0.0
        } else {
            new_value.clamp(0.0, 100.0)
        };

        let mut weights = *self;
        weights.set(key, new_value / 100.0);

        let total = weights.total();
        if total <= 0.0 {
            warn!("All optimization weights are zero after setting {key}, using equal thirds");
            return WeightSet::equal_thirds();
        }

        for k in WeightKey::ALL {
            weights.set(k, weights.get(k) / total);
        }
        trace!("Normalized weights after {key}={new_value}: {weights:?}");
        weights
    }

    /// Move the slider of `key` by `steps` slider increments.
    pub fn step(&self, key: WeightKey, steps: i32) -> WeightSet {
        self.normalize(key, self.percent(key) + f64::from(steps) * WEIGHT_STEP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TOLERANCE: f64 = 1e-9;

    fn approx(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    fn weight_key() -> impl Strategy<Value = WeightKey> {
        prop_oneof![
            Just(WeightKey::FacultyLoad),
            Just(WeightKey::RoomUtilization),
            Just(WeightKey::StudentGaps),
        ]
    }

    #[test]
    fn default_distribution() {
        let w = WeightSet::default();
        assert_eq!(w.get(WeightKey::FacultyLoad), 0.3);
        assert_eq!(w.get(WeightKey::RoomUtilization), 0.4);
        assert_eq!(w.get(WeightKey::StudentGaps), 0.3);
        assert!(approx(w.total(), 1.0, TOLERANCE));
    }

    #[test]
    fn faculty_load_to_sixty() {
        let w = WeightSet::default().normalize(WeightKey::FacultyLoad, 60.0);
        assert!(approx(w.get(WeightKey::FacultyLoad), 0.6 / 1.3, TOLERANCE));
        assert!(approx(w.get(WeightKey::RoomUtilization), 0.4 / 1.3, TOLERANCE));
        assert!(approx(w.get(WeightKey::StudentGaps), 0.3 / 1.3, TOLERANCE));
        assert!(approx(w.get(WeightKey::FacultyLoad), 0.4615, 1e-4));
        assert!(approx(w.get(WeightKey::RoomUtilization), 0.3077, 1e-4));
        assert!(approx(w.get(WeightKey::StudentGaps), 0.2308, 1e-4));
        assert_eq!(w.rounded_percent(WeightKey::FacultyLoad), 46);
        assert_eq!(w.rounded_percent(WeightKey::RoomUtilization), 31);
        assert_eq!(w.rounded_percent(WeightKey::StudentGaps), 23);
    }

    #[test]
    fn zero_total_falls_back_to_equal_thirds() {
        let w = WeightSet::default()
            .normalize(WeightKey::FacultyLoad, 0.0)
            .normalize(WeightKey::RoomUtilization, 0.0);
        // Only student gaps is left, so it carries everything
        assert!(approx(w.get(WeightKey::StudentGaps), 1.0, TOLERANCE));

        let w = w.normalize(WeightKey::StudentGaps, 0.0);
        for k in WeightKey::ALL {
            assert!(approx(w.get(k), 1.0 / 3.0, TOLERANCE));
        }
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let high = WeightSet::default().normalize(WeightKey::StudentGaps, 250.0);
        let max = WeightSet::default().normalize(WeightKey::StudentGaps, 100.0);
        assert_eq!(high, max);

        let low = WeightSet::default().normalize(WeightKey::StudentGaps, -20.0);
        assert_eq!(low.get(WeightKey::StudentGaps), 0.0);

        let nan = WeightSet::default().normalize(WeightKey::StudentGaps, f64::NAN);
        assert_eq!(nan, low);
    }

    #[test]
    fn step_moves_by_five_points() {
        let w = WeightSet::default().step(WeightKey::RoomUtilization, 1);
        // 0.45 / 1.05
        assert!(approx(w.get(WeightKey::RoomUtilization), 0.45 / 1.05, TOLERANCE));
        assert!(approx(w.total(), 1.0, TOLERANCE));
    }

    #[test]
    fn parse_weight_names() {
        assert_eq!(
            "roomUtilization".parse::<WeightKey>().unwrap(),
            WeightKey::RoomUtilization
        );
        assert!(matches!(
            "roomutilization".parse::<WeightKey>(),
            Err(TTVError::UnknownWeight(_))
        ));
    }

    proptest! {
        #[test]
        fn weights_always_sum_to_one(
            updates in prop::collection::vec((weight_key(), 0.0f64..=100.0), 1..20)
        ) {
            let mut w = WeightSet::default();
            for (key, value) in updates {
                w = w.normalize(key, value);
                prop_assert!(approx(w.total(), 1.0, TOLERANCE));
                for k in WeightKey::ALL {
                    prop_assert!(w.get(k) >= 0.0);
                }
            }
        }

        #[test]
        fn current_percentage_is_a_no_op(
            key in weight_key(),
            other in weight_key(),
            value in 1.0f64..=100.0,
        ) {
            let w = WeightSet::default().normalize(other, value);
            let again = w.normalize(key, w.percent(key));
            for k in WeightKey::ALL {
                prop_assert!(approx(w.get(k), again.get(k), TOLERANCE));
            }
        }
    }
}
