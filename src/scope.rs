//! Generation scope: which departments, semesters, shifts and batches a
//! timetable run covers. Selecting departments cascades to their batches.

use tracing::debug;

#[derive(Debug, Clone)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub batches: u32,
    pub faculty: u32,
}

#[derive(Debug, Clone)]
pub struct Semester {
    pub id: String,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct Shift {
    pub id: String,
    pub name: String,
    pub time: String,
}

#[derive(Debug, Clone)]
pub struct Batch {
    pub id: String,
    pub name: String,
    pub department: String,
    pub students: u32,
    pub year: String,
}

/// Everything that can be picked for a scope.
#[derive(Debug, Clone)]
pub struct ScopeCatalog {
    pub departments: Vec<Department>,
    pub semesters: Vec<Semester>,
    pub shifts: Vec<Shift>,
    pub batches: Vec<Batch>,
}

impl Default for ScopeCatalog {
    fn default() -> Self {
        let department = |id: &str, name: &str, batches, faculty| Department {
            id: id.to_string(),
            name: name.to_string(),
            batches,
            faculty,
        };
        let semester = |id: &str, name: &str, active| Semester {
            id: id.to_string(),
            name: name.to_string(),
            active,
        };
        let shift = |id: &str, name: &str, time: &str| Shift {
            id: id.to_string(),
            name: name.to_string(),
            time: time.to_string(),
        };
        let batch = |id: &str, name: &str, department: &str, students| Batch {
            id: id.to_string(),
            name: name.to_string(),
            department: department.to_string(),
            students,
            year: "2024".to_string(),
        };

        ScopeCatalog {
            departments: vec![
                department("CS", "Computer Science", 3, 8),
                department("MATH", "Mathematics", 2, 6),
                department("PHY", "Physics", 2, 5),
                department("ENG", "English", 2, 4),
            ],
            semesters: vec![
                semester("FALL2024", "Fall 2024", true),
                semester("SPRING2025", "Spring 2025", false),
            ],
            shifts: vec![
                shift("morning", "Morning", "08:00 - 13:00"),
                shift("afternoon", "Afternoon", "13:00 - 18:00"),
                shift("evening", "Evening", "18:00 - 22:00"),
            ],
            batches: vec![
                batch("CS2024A", "CS Batch A", "CS", 45),
                batch("CS2024B", "CS Batch B", "CS", 38),
                batch("MATH2024A", "Math Batch A", "MATH", 42),
                batch("PHY2024A", "Physics Batch A", "PHY", 40),
                batch("ENG2024A", "English Batch A", "ENG", 35),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    pub departments: Vec<String>,
    pub semesters: Vec<String>,
    pub shifts: Vec<String>,
    pub batches: Vec<String>,
}

fn toggled(ids: &[String], id: &str, checked: bool) -> Vec<String> {
    let mut ids = ids.to_vec();
    if checked {
        if !ids.iter().any(|i| i == id) {
            ids.push(id.to_string());
        }
    } else {
        ids.retain(|i| i != id);
    }
    ids
}

impl Scope {
    /// Check or uncheck a department. The batch selection is replaced by all
    /// batches of the resulting departments, in catalog order.
    pub fn toggle_department(&self, catalog: &ScopeCatalog, id: &str, checked: bool) -> Scope {
        let departments = toggled(&self.departments, id, checked);
        let batches = catalog
            .batches
            .iter()
            .filter(|b| departments.contains(&b.department))
            .map(|b| b.id.clone())
            .collect::<Vec<String>>();
        debug!("Scope departments {departments:?} -> batches {batches:?}");
        Scope {
            departments,
            batches,
            ..self.clone()
        }
    }

    pub fn toggle_semester(&self, id: &str, checked: bool) -> Scope {
        Scope {
            semesters: toggled(&self.semesters, id, checked),
            ..self.clone()
        }
    }

    pub fn toggle_shift(&self, id: &str, checked: bool) -> Scope {
        Scope {
            shifts: toggled(&self.shifts, id, checked),
            ..self.clone()
        }
    }

    pub fn toggle_batch(&self, id: &str, checked: bool) -> Scope {
        Scope {
            batches: toggled(&self.batches, id, checked),
            ..self.clone()
        }
    }

    /// Batches that can be picked, i.e. those of the selected departments.
    pub fn available_batches<'a>(&self, catalog: &'a ScopeCatalog) -> Vec<&'a Batch> {
        catalog
            .batches
            .iter()
            .filter(|b| self.departments.contains(&b.department))
            .collect()
    }

    /// A generation run needs at least one department and one batch.
    pub fn is_ready(&self) -> bool {
        !self.departments.is_empty() && !self.batches.is_empty()
    }

    pub fn student_count(&self, catalog: &ScopeCatalog) -> u32 {
        catalog
            .batches
            .iter()
            .filter(|b| self.batches.contains(&b.id))
            .map(|b| b.students)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn department_selects_its_batches() {
        let catalog = ScopeCatalog::default();
        let scope = Scope::default().toggle_department(&catalog, "CS", true);
        assert_eq!(scope.departments, vec!["CS"]);
        assert_eq!(scope.batches, vec!["CS2024A", "CS2024B"]);
        assert_eq!(scope.student_count(&catalog), 83);
    }

    #[test]
    fn cascade_replaces_manual_batch_choices() {
        let catalog = ScopeCatalog::default();
        let scope = Scope::default()
            .toggle_department(&catalog, "CS", true)
            .toggle_batch("CS2024B", false);
        assert_eq!(scope.batches, vec!["CS2024A"]);

        let scope = scope.toggle_department(&catalog, "MATH", true);
        assert_eq!(scope.departments, vec!["CS", "MATH"]);
        assert_eq!(scope.batches, vec!["CS2024A", "CS2024B", "MATH2024A"]);

        let scope = scope.toggle_department(&catalog, "CS", false);
        assert_eq!(scope.batches, vec!["MATH2024A"]);
    }

    #[test]
    fn toggling_twice_does_not_duplicate() {
        let catalog = ScopeCatalog::default();
        let scope = Scope::default()
            .toggle_department(&catalog, "PHY", true)
            .toggle_department(&catalog, "PHY", true)
            .toggle_shift("morning", true)
            .toggle_shift("morning", true);
        assert_eq!(scope.departments, vec!["PHY"]);
        assert_eq!(scope.shifts, vec!["morning"]);
    }

    #[test]
    fn readiness_needs_department_and_batch() {
        let catalog = ScopeCatalog::default();
        assert!(!Scope::default().is_ready());

        let scope = Scope::default().toggle_department(&catalog, "ENG", true);
        assert!(scope.is_ready());

        let scope = scope.toggle_batch("ENG2024A", false);
        assert!(!scope.is_ready());
    }

    #[test]
    fn semesters_and_shifts_do_not_cascade() {
        let catalog = ScopeCatalog::default();
        let scope = Scope::default()
            .toggle_semester("FALL2024", true)
            .toggle_shift("evening", true);
        assert!(scope.batches.is_empty());
        assert!(scope.available_batches(&catalog).is_empty());

        let scope = scope.toggle_semester("FALL2024", false);
        assert!(scope.semesters.is_empty());
        assert_eq!(scope.shifts, vec!["evening"]);
    }

    #[test]
    fn available_batches_follow_departments() {
        let catalog = ScopeCatalog::default();
        let scope = Scope::default()
            .toggle_department(&catalog, "MATH", true)
            .toggle_department(&catalog, "PHY", true)
            .toggle_batch("PHY2024A", false);
        let available: Vec<&str> = scope
            .available_batches(&catalog)
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(available, vec!["MATH2024A", "PHY2024A"]);
    }
}
