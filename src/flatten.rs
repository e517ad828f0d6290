//! Step flattening.
//!
//! Expands a workout's nested step tree into the linear sequence of atomic
//! steps the run controller executes. Everything here is pure.

use crate::model::{AtomicStep, FlattenedStep, Workout, WorkoutBody, WorkoutStep};
use std::collections::HashMap;
use std::sync::Arc;

/// Expand a workout into its ordered atomic steps, tagged with section names.
pub fn flatten(workout: &Workout) -> Vec<FlattenedStep> {
    let mut out = Vec::new();
    match workout.body() {
        WorkoutBody::Sections(sections) => {
            for section in sections {
                flatten_into(&section.steps, Some(&section.name), &mut out);
            }
        }
        WorkoutBody::Steps(steps) => flatten_into(steps, None, &mut out),
        WorkoutBody::Empty => {}
    }
    out
}

fn flatten_into(steps: &[WorkoutStep], label: Option<&str>, out: &mut Vec<FlattenedStep>) {
    for step in steps {
        match step {
            WorkoutStep::Exercise {
                name,
                duration,
                description,
            } => out.push(FlattenedStep {
                step: AtomicStep::Exercise {
                    name: name.clone(),
                    duration: *duration,
                    description: description.clone(),
                },
                section: label.map(str::to_owned),
            }),
            WorkoutStep::Rest { duration } => out.push(rest(*duration, label)),
            WorkoutStep::Repetition {
                count,
                steps: children,
                rest_between_reps,
            } => {
                let gap = rest_between_reps.filter(|g| *g > 0);
                for rep in 0..*count {
                    flatten_into(children, label, out);
                    if let Some(g) = gap {
                        if rep + 1 < *count {
                            out.push(rest(g, label));
                        }
                    }
                }
            }
        }
    }
}

fn rest(duration: u64, label: Option<&str>) -> FlattenedStep {
    FlattenedStep {
        step: AtomicStep::Rest { duration },
        section: label.map(str::to_owned),
    }
}

/// Total duration of a step tree, computed without expanding it.
/// Saturates at `u64::MAX` instead of overflowing.
pub fn steps_duration(steps: &[WorkoutStep]) -> u64 {
    steps
        .iter()
        .map(|step| match step {
            WorkoutStep::Exercise { duration, .. } | WorkoutStep::Rest { duration } => *duration,
            WorkoutStep::Repetition {
                count,
                steps,
                rest_between_reps,
            } => {
                let count = u64::from(*count);
                let gaps = rest_between_reps
                    .unwrap_or(0)
                    .saturating_mul(count.saturating_sub(1));
                steps_duration(steps)
                    .saturating_mul(count)
                    .saturating_add(gaps)
            }
        })
        .fold(0, u64::saturating_add)
}

/// Flattened sequence of one workout plus its total duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub workout_id: String,
    pub workout_name: String,
    pub steps: Vec<FlattenedStep>,
    pub total_secs: u64,
}

impl Plan {
    pub fn for_workout(workout: &Workout) -> Self {
        let steps = flatten(workout);
        let total_secs = steps
            .iter()
            .map(|s| s.step.duration())
            .fold(0, u64::saturating_add);
        Self {
            workout_id: workout.id.clone(),
            workout_name: workout.name.clone(),
            steps,
            total_secs,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Plans memoized by workout id. A changed workout under the same id gets a
/// freshly computed plan; cached plans are never modified.
#[derive(Debug, Default)]
pub struct PlanCache {
    entries: HashMap<String, (Workout, Arc<Plan>)>,
}

impl PlanCache {
    pub fn get(&mut self, workout: &Workout) -> Arc<Plan> {
        if let Some((cached, plan)) = self.entries.get(&workout.id) {
            if cached == workout {
                return plan.clone();
            }
        }
        let plan = Arc::new(Plan::for_workout(workout));
        self.entries
            .insert(workout.id.clone(), (workout.clone(), plan.clone()));
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Section;

    fn ex(name: &str, duration: u64) -> WorkoutStep {
        WorkoutStep::Exercise {
            name: name.into(),
            duration,
            description: None,
        }
    }

    fn rep(count: u32, steps: Vec<WorkoutStep>, gap: Option<u64>) -> WorkoutStep {
        WorkoutStep::Repetition {
            count,
            steps,
            rest_between_reps: gap,
        }
    }

    fn workout(steps: Vec<WorkoutStep>) -> Workout {
        Workout {
            id: "w".into(),
            name: "Test".into(),
            steps: Some(steps),
            sections: None,
        }
    }

    fn durations(plan: &[FlattenedStep]) -> Vec<(bool, u64)> {
        plan.iter()
            .map(|s| (s.step.is_rest(), s.step.duration()))
            .collect()
    }

    #[test]
    fn repetition_with_gap_inserts_rest_between_reps_only() {
        let w = workout(vec![rep(3, vec![ex("Push-up", 2)], Some(1))]);
        let plan = Plan::for_workout(&w);
        assert_eq!(
            durations(&plan.steps),
            vec![(false, 2), (true, 1), (false, 2), (true, 1), (false, 2)]
        );
        assert_eq!(plan.total_secs, 8);
    }

    #[test]
    fn zero_count_and_zero_gap() {
        let w = workout(vec![
            rep(0, vec![ex("A", 5)], Some(3)),
            rep(2, vec![ex("B", 5)], Some(0)),
        ]);
        let steps = flatten(&w);
        assert_eq!(durations(&steps), vec![(false, 5), (false, 5)]);
    }

    #[test]
    fn nested_repetitions_expand_in_order() {
        let inner = rep(2, vec![ex("In", 1)], Some(1));
        let w = workout(vec![ex("Warm", 3), rep(2, vec![inner, ex("Out", 4)], None)]);
        let flat = flatten(&w);
        let names: Vec<&str> = flat.iter().map(|s| s.step.title()).collect();
        assert_eq!(
            names,
            vec!["Warm", "In", "Rest", "In", "Out", "In", "Rest", "In", "Out"]
        );
    }

    #[test]
    fn sections_label_every_step_including_gaps() {
        let w = Workout {
            id: "s".into(),
            name: "Sections".into(),
            steps: None,
            sections: Some(vec![
                Section {
                    name: "Warm-up".into(),
                    steps: vec![ex("Jog", 60)],
                },
                Section {
                    name: "Main".into(),
                    steps: vec![rep(2, vec![ex("Sprint", 20)], Some(10))],
                },
            ]),
        };
        let steps = flatten(&w);
        let labels: Vec<Option<&str>> = steps.iter().map(|s| s.section.as_deref()).collect();
        assert_eq!(
            labels,
            vec![Some("Warm-up"), Some("Main"), Some("Main"), Some("Main")]
        );
    }

    #[test]
    fn malformed_workouts_flatten_best_effort() {
        let none = Workout {
            id: "n".into(),
            name: "None".into(),
            steps: None,
            sections: None,
        };
        assert!(flatten(&none).is_empty());

        let childless = workout(vec![rep(4, vec![], Some(5)), ex("Only", 7)]);
        // Gaps still separate the (empty) reps; the exercise is kept.
        let steps = flatten(&childless);
        assert_eq!(steps.last().map(|s| s.step.title()), Some("Only"));
        assert_eq!(steps.len(), 4);
    }

    #[test]
    fn length_and_duration_agree_with_tree_formulas() {
        let tree = vec![
            ex("A", 10),
            WorkoutStep::Rest { duration: 5 },
            rep(3, vec![ex("B", 7), rep(2, vec![ex("C", 1)], Some(2))], Some(4)),
        ];
        let w = workout(tree.clone());
        let plan = Plan::for_workout(&w);
        // 2 atomic + 3 * (1 + 2 + 1 gap) + 2 gaps
        assert_eq!(plan.len(), 2 + 3 * 4 + 2);
        assert_eq!(plan.total_secs, steps_duration(&tree));
        assert_eq!(flatten(&w), plan.steps);
    }

    #[test]
    fn huge_durations_saturate_instead_of_overflowing() {
        let tree = vec![rep(u32::MAX, vec![ex("Long", u64::MAX / 1000)], Some(u64::MAX))];
        assert_eq!(steps_duration(&tree), u64::MAX);

        let w = workout(vec![ex("A", u64::MAX - 1), ex("B", 5)]);
        assert_eq!(Plan::for_workout(&w).total_secs, u64::MAX);
    }

    #[test]
    fn cache_reuses_plan_until_workout_changes() {
        let mut cache = PlanCache::default();
        let w = workout(vec![ex("A", 1)]);
        let first = cache.get(&w);
        let again = cache.get(&w);
        assert!(Arc::ptr_eq(&first, &again));

        let changed = workout(vec![ex("A", 1), ex("B", 2)]);
        let replaced = cache.get(&changed);
        assert!(!Arc::ptr_eq(&first, &replaced));
        assert_eq!(replaced.total_secs, 3);
        assert_eq!(first.total_secs, 1);
    }
}
