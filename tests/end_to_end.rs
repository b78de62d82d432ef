use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use timetable_solver::algorithms::hill_climber::HillClimber;
use timetable_solver::algorithms::local_search::LocalSearchConfig;
use timetable_solver::algorithms::random::{RandomConfig, RandomConstruction};
use timetable_solver::algorithms::random_restart::{RandomRestart, RandomRestartConfig};
use timetable_solver::algorithms::simulated_annealing::{
    AnnealingConfig, Cooling, SimulatedAnnealing,
};
use timetable_solver::data::{
    ActivityId, ActivitySpec, Catalog, CatalogInput, Course, Hall, Student,
};
use timetable_solver::grid::{HALLS_PER_TIMESLOT, slot_index, translate_index};
use timetable_solver::heuristics::{Heuristic, HeuristicSet};
use timetable_solver::model::Model;
use timetable_solver::penalty::{EVENING_PENALTY, GAP_PENALTY_TABLE, evaluate};

fn halls(capacities: [u32; HALLS_PER_TIMESLOT]) -> Vec<Hall> {
    capacities
        .iter()
        .enumerate()
        .map(|(i, &capacity)| Hall {
            name: format!("Hall {}", i),
            capacity,
        })
        .collect()
}

/// One course with a lecture (capacity 30) and a tutorial (capacity 20),
/// 25 students.
fn toy_catalog(hall_capacities: [u32; HALLS_PER_TIMESLOT]) -> Catalog {
    Catalog::new(CatalogInput {
        courses: vec![Course {
            name: "Heuristieken".to_string(),
            activities: vec![
                ActivitySpec {
                    category: "lecture 1".to_string(),
                    capacity: 30,
                },
                ActivitySpec {
                    category: "tutorial 1".to_string(),
                    capacity: 20,
                },
            ],
        }],
        students: (0..25)
            .map(|i| Student {
                id: format!("{}", 1000 + i),
                courses: vec!["Heuristieken".to_string()],
            })
            .collect(),
        halls: halls(hall_capacities),
    })
    .unwrap()
}

/// Four overlapping courses, 40 students, mixed hall sizes.
fn faculty() -> Catalog {
    let courses = vec![
        Course::from_counts("Analyse", 2, 2, 12, 0, 0, 24),
        Course::from_counts("Databases", 1, 1, 10, 1, 10, 18),
        Course::from_counts("Netwerken", 1, 0, 0, 2, 8, 14),
        Course::from_counts("Statistiek", 2, 1, 15, 0, 0, 20),
    ];
    let names = ["Analyse", "Databases", "Netwerken", "Statistiek"];
    let students = (0..40)
        .map(|i| Student {
            id: format!("s{}", i),
            courses: vec![
                names[i % 4].to_string(),
                names[(i / 4) % 4].to_string(),
                names[(i + 1) % 4].to_string(),
            ],
        })
        .collect();
    Catalog::new(CatalogInput {
        courses,
        students,
        halls: halls([20, 15, 30, 10, 25, 40, 12]),
    })
    .unwrap()
}

fn random_start(empty: &Model, seed: u64) -> Model {
    RandomConstruction::new(ChaCha8Rng::seed_from_u64(seed), RandomConfig::default())
        .unwrap()
        .construct(empty)
        .unwrap()
}

#[test]
fn toy_catalog_random_placement_penalty() {
    let empty = Model::new(Arc::new(toy_catalog([30; HALLS_PER_TIMESLOT])));
    for seed in 0..20 {
        let model = random_start(&empty, seed);
        assert_eq!(model.solution().iter().flatten().count(), 2);

        let lecture = translate_index(model.index_of_activity(ActivityId(0)).unwrap());
        let tutorial = translate_index(model.index_of_activity(ActivityId(1)).unwrap());

        // Every hall seats 30, so neither activity overflows.
        let mut expected = 0u64;
        for info in [lecture, tutorial] {
            if info.is_evening() {
                expected += EVENING_PENALTY as u64;
            }
        }
        if lecture.day == tutorial.day {
            if lecture.timeslot == tutorial.timeslot {
                expected += 2 * 25;
            } else {
                let gaps = lecture.timeslot.abs_diff(tutorial.timeslot) - 1;
                expected += GAP_PENALTY_TABLE[gaps.min(3)] as u64 * 25;
            }
        }

        assert_eq!(model.penalty_breakdown().capacity, 0);
        assert_eq!(model.penalty_points(), Some(expected), "seed {}", seed);
        assert_eq!(evaluate(&model).total(), expected);
    }
}

#[test]
fn toy_catalog_tutorial_overflow_in_small_hall() {
    let catalog = toy_catalog([30, 30, 30, 30, 30, 30, 20]);
    let mut model = Model::new(Arc::new(catalog));
    assert!(model.add_activity(slot_index(0, 0, 0).unwrap(), ActivityId(0)));
    assert!(model.add_activity(slot_index(2, 1, 6).unwrap(), ActivityId(1)));

    assert_eq!(model.calc_total_penalty(), 25 - 20);
    assert_eq!(model.penalty_breakdown().capacity, 5);
    assert!(model.is_solution());
    assert!(model.is_complete());
}

#[test]
fn hill_climber_never_regresses() {
    let empty = Model::new(Arc::new(faculty()));
    for seed in 0..5 {
        let initial = random_start(&empty, seed);
        let initial_penalty = initial.penalty_points().unwrap();
        let outcome = HillClimber::search(
            initial,
            ChaCha8Rng::seed_from_u64(100 + seed),
            LocalSearchConfig {
                iterations: 400,
                heuristics: HeuristicSet::empty().with(Heuristic::Balance),
                ..Default::default()
            },
        )
        .unwrap()
        .run();

        let best = outcome.best.penalty_points().unwrap();
        assert!(best <= initial_penalty, "seed {}", seed);
        assert!(outcome.scores.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(best, evaluate(&outcome.best).total());
        assert!(outcome.best.is_complete());
    }
}

#[test]
fn annealing_stops_accepting_worse_moves_once_cold() {
    let empty = Model::new(Arc::new(faculty()));
    let config = LocalSearchConfig {
        iterations: 400,
        ..Default::default()
    };
    let annealing = AnnealingConfig {
        temperature: 1.0,
        cooling: Cooling::Exponential { alpha: 0.9 },
    };
    for seed in 0..5 {
        let outcome = SimulatedAnnealing::new(annealing.schedule().unwrap())
            .search(
                random_start(&empty, seed),
                ChaCha8Rng::seed_from_u64(seed),
                config,
            )
            .unwrap()
            .run();
        // After 200 steps the temperature is below 1e-9: the trace behaves
        // like a hill climber from there on.
        let cold = &outcome.scores[200..];
        assert!(cold.windows(2).all(|w| w[1] <= w[0]), "seed {}", seed);
        let best = outcome.best.penalty_points().unwrap();
        assert!(outcome.scores.iter().all(|&s| s >= best));
    }
}

#[test]
fn random_restart_is_reproducible() {
    let empty = Model::new(Arc::new(faculty()));
    let config = RandomRestartConfig {
        runs: 3,
        search: LocalSearchConfig {
            iterations: 150,
            mutations: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    let driver = RandomRestart::new(config).unwrap();
    let a = driver.run(&empty, 2024).unwrap();
    let b = driver.run(&empty, 2024).unwrap();
    assert_eq!(a.run_scores, b.run_scores);
    assert_eq!(a.best.solution(), b.best.solution());
    assert_eq!(
        a.best.penalty_points(),
        a.run_scores.iter().min().copied()
    );
}
