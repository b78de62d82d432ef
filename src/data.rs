use crate::error::ScheduleError;
use crate::grid::{HALLS_PER_TIMESLOT, HallIndex};
use crate::penalty::PenaltyBreakdown;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

// Type aliases for clarity
pub type CourseId = usize;
pub type StudentId = usize;

/// Position of an activity in [`Catalog::activities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityId(pub usize);

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One lecture, tutorial or practical of a course as supplied by the loader.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySpec {
    pub category: String,
    pub capacity: u32,
}

/// A course and its activities.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub name: String,
    pub activities: Vec<ActivitySpec>,
}

impl Course {
    /// Expands activity counts into labelled activities (`"lecture 1"`, ...).
    ///
    /// Lectures are sized for the expected number of students.
    pub fn from_counts(
        name: impl Into<String>,
        lectures: u32,
        tutorials: u32,
        tutorial_capacity: u32,
        practicals: u32,
        practical_capacity: u32,
        expected: u32,
    ) -> Self {
        let lectures = (1..=lectures).map(|i| ActivitySpec {
            category: format!("lecture {}", i),
            capacity: expected,
        });
        let tutorials = (1..=tutorials).map(|i| ActivitySpec {
            category: format!("tutorial {}", i),
            capacity: tutorial_capacity,
        });
        let practicals = (1..=practicals).map(|i| ActivitySpec {
            category: format!("practical {}", i),
            capacity: practical_capacity,
        });
        Self {
            name: name.into(),
            activities: lectures.chain(tutorials).chain(practicals).collect(),
        }
    }
}

/// A student and the names of the courses they take.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub courses: Vec<String>,
}

/// A lecture hall with a given capacity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hall {
    pub name: String,
    pub capacity: u32,
}

/// The raw catalog as handed over by a loader.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogInput {
    pub courses: Vec<Course>,
    pub students: Vec<Student>,
    pub halls: Vec<Hall>,
}

/// A schedulable activity, flattened out of its course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub course_id: CourseId,
    pub course: String,
    pub category: String,
    pub capacity: u32,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.course, self.category)
    }
}

/// Validated, immutable reference data shared by every model of a run.
#[derive(Debug, Clone)]
pub struct Catalog {
    courses: Vec<Course>,
    students: Vec<Student>,
    halls: Vec<Hall>,
    activities: Vec<Activity>,
    course_students: Vec<Vec<StudentId>>,
    student_courses: Vec<Vec<CourseId>>,
}

impl Catalog {
    /// Validates the input and builds the lookup tables.
    ///
    /// The grid addresses exactly [`HALLS_PER_TIMESLOT`] halls, so any other
    /// hall count is rejected.
    pub fn new(input: CatalogInput) -> Result<Self, ScheduleError> {
        let CatalogInput {
            courses,
            students,
            halls,
        } = input;

        if halls.len() != HALLS_PER_TIMESLOT {
            return Err(ScheduleError::InvalidCatalog(format!(
                "expected {} halls, got {}",
                HALLS_PER_TIMESLOT,
                halls.len()
            )));
        }

        let mut course_ids: HashMap<&str, CourseId> = HashMap::with_capacity(courses.len());
        let mut activities = Vec::new();
        for (course_id, course) in courses.iter().enumerate() {
            if course_ids.insert(course.name.as_str(), course_id).is_some() {
                return Err(ScheduleError::InvalidCatalog(format!(
                    "duplicate course '{}'",
                    course.name
                )));
            }
            let mut categories = HashSet::new();
            for spec in &course.activities {
                if !categories.insert(spec.category.as_str()) {
                    return Err(ScheduleError::InvalidCatalog(format!(
                        "duplicate activity '{}' in course '{}'",
                        spec.category, course.name
                    )));
                }
                activities.push(Activity {
                    course_id,
                    course: course.name.clone(),
                    category: spec.category.clone(),
                    capacity: spec.capacity,
                });
            }
        }

        let mut course_students = vec![Vec::new(); courses.len()];
        let mut student_courses = Vec::with_capacity(students.len());
        for (student_id, student) in students.iter().enumerate() {
            let mut taken = Vec::with_capacity(student.courses.len());
            for name in &student.courses {
                let Some(&course_id) = course_ids.get(name.as_str()) else {
                    return Err(ScheduleError::InvalidCatalog(format!(
                        "student '{}' takes unknown course '{}'",
                        student.id, name
                    )));
                };
                if !taken.contains(&course_id) {
                    taken.push(course_id);
                    course_students[course_id].push(student_id);
                }
            }
            student_courses.push(taken);
        }

        Ok(Self {
            courses,
            students,
            halls,
            activities,
            course_students,
            student_courses,
        })
    }

    #[inline]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    #[inline]
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    #[inline]
    pub fn halls(&self) -> &[Hall] {
        &self.halls
    }

    #[inline]
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    #[inline]
    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }

    pub fn activity_ids(&self) -> impl Iterator<Item = ActivityId> {
        (0..self.activities.len()).map(ActivityId)
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this catalog.
    #[inline]
    pub fn activity(&self, id: ActivityId) -> &Activity {
        &self.activities[id.0]
    }

    pub fn find_activity(&self, course: &str, category: &str) -> Option<ActivityId> {
        self.activities
            .iter()
            .position(|a| a.course == course && a.category == category)
            .map(ActivityId)
    }

    #[inline]
    pub fn hall_capacity(&self, hall: HallIndex) -> u32 {
        self.halls[hall].capacity
    }

    pub fn course_id(&self, name: &str) -> Option<CourseId> {
        self.courses.iter().position(|c| c.name == name)
    }

    #[inline]
    pub fn students_of_course(&self, course: CourseId) -> &[StudentId] {
        &self.course_students[course]
    }

    #[inline]
    pub fn courses_of_student(&self, student: StudentId) -> &[CourseId] {
        &self.student_courses[student]
    }

    /// Every activity of every course the student takes.
    pub fn activities_of_student(&self, student: StudentId) -> HashSet<ActivityId> {
        let taken = &self.student_courses[student];
        self.activity_ids()
            .filter(|id| taken.contains(&self.activities[id.0].course_id))
            .collect()
    }
}

/// A placed activity as reported to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedActivity {
    pub index: usize,
    pub day: usize,
    pub day_name: String,
    pub timeslot: usize,
    pub start_hour: u32,
    pub hall: String,
    pub course: String,
    pub category: String,
    pub enrolled: usize,
}

/// The final output of the solver.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingOutput {
    pub algorithm: String,
    pub assignments: Vec<PlacedActivity>,
    pub penalties: PenaltyBreakdown,
    pub total: u64,
    /// Best penalty of every restart, for multi-run algorithms.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub run_scores: Vec<u64>,
}
