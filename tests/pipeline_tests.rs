//! End-to-end tests: files on disk through compilation and a solve session.

mod fixtures;

use std::fs;

use serde_json::json;

use run_scheduler::compiler::{CompileError, FactCompiler};
use run_scheduler::config::SchedulerConfig;
use run_scheduler::extract::fingerprint;
use run_scheduler::facts::{self, FactSet, Term};
use run_scheduler::haversine::haversine_miles;
use run_scheduler::precision::{PrecisionCodec, PrecisionPair};
use run_scheduler::processor::{ModelProcessor, run_session};
use run_scheduler::store::Solution;

use fixtures::{
    BALLARD_LOCKS, EXCHANGES, FREMONT, GAS_WORKS, GREEN_LAKE, ScriptedModel, ScriptedSolver,
    exchange_map, sample_routes, write_exchange_registry, write_route_file,
};

fn pair_distance(set: &FactSet, predicate: &str, a: &str, b: &str) -> Option<i64> {
    set.named(predicate, 3)
        .find(|fact| fact.text(0) == Some(a) && fact.text(1) == Some(b))
        .and_then(|fact| fact.int(2))
}

#[test]
fn test_compiled_distances_match_haversine() {
    let compiled = FactCompiler::new(PrecisionPair::default())
        .compile(&sample_routes(), &exchange_map(EXCHANGES))
        .unwrap();
    let codec = PrecisionCodec::new(2);

    assert!(compiled.contains(&facts::route_distance("canal", 3.2, &codec)));
    assert!(compiled.contains(&facts::route_distance("lake", 4.25, &codec)));
    assert!(compiled.contains(&facts::ascent("lake", 210)));
    assert!(!compiled.contains(&facts::descent("lake", 0)));
    assert!(compiled.contains(&facts::distance_precision(2)));
    assert!(compiled.contains(&facts::duration_precision(0)));

    let expected = codec.encode(haversine_miles(GAS_WORKS.coords().into(), GREEN_LAKE.coords().into()));
    assert_eq!(
        pair_distance(&compiled, facts::EXCHANGE_PAIR_DISTANCE, GAS_WORKS.id, GREEN_LAKE.id),
        Some(expected)
    );
    assert_eq!(
        pair_distance(&compiled, facts::EXCHANGE_PAIR_DISTANCE, GREEN_LAKE.id, GAS_WORKS.id),
        Some(expected)
    );
    assert_eq!(
        pair_distance(&compiled, facts::EXCHANGE_PAIR_DISTANCE, FREMONT.id, FREMONT.id),
        Some(0)
    );
    assert_eq!(compiled.named(facts::EXCHANGE_PAIR_DISTANCE, 3).count(), 9);
    assert_eq!(compiled.named(facts::ROUTE_PAIR_DISTANCE, 3).count(), 4);

    let canal_to_lake = pair_distance(&compiled, facts::ROUTE_PAIR_DISTANCE, "canal", "lake").unwrap();
    assert!(canal_to_lake > 0);
    assert_eq!(
        pair_distance(&compiled, facts::ROUTE_PAIR_DISTANCE, "lake", "canal"),
        Some(canal_to_lake)
    );
}

#[test]
fn test_route_with_unknown_exchange_is_fatal() {
    let mut routes = sample_routes();
    routes.push(run_scheduler::domain::Route::new(
        "locks",
        "Locks Out-and-back",
        FREMONT.id,
        BALLARD_LOCKS.id,
        5.0,
    ));
    let err = FactCompiler::new(PrecisionPair::default())
        .compile(&routes, &exchange_map(EXCHANGES))
        .unwrap_err();
    assert_eq!(
        err,
        CompileError::UnknownExchange {
            route: "locks".to_string(),
            exchange: BALLARD_LOCKS.id.to_string(),
        }
    );
}

#[test]
fn test_compilation_is_deterministic() {
    let compile = || {
        FactCompiler::new(PrecisionPair::default())
            .compile(&sample_routes(), &exchange_map(EXCHANGES))
            .unwrap()
    };
    let first = compile();
    let second = compile();
    assert_eq!(first.to_program(), second.to_program());
    assert_eq!(fingerprint(&first), fingerprint(&second));
}

#[test]
fn test_config_driven_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let routes_dir = tmp.path().join("routes");
    fs::create_dir(&routes_dir).unwrap();

    write_route_file(
        &routes_dir,
        "01-canal.geojson",
        json!({
            "id": "canal", "name": "Ship Canal Trail", "distance_mi": 3.2,
            "start": GAS_WORKS.id, "end": FREMONT.id, "ascent_m": 40, "descent_m": 35,
            "surface": "paved", "dates_run": ["2023-05-06"]
        }),
        &[GAS_WORKS.coords(), FREMONT.coords()],
    );
    write_route_file(
        &routes_dir,
        "02-lake.geojson",
        json!({
            "id": "lake", "name": "Green Lake Loop", "dist": 4.25,
            "start": FREMONT.id, "end": GREEN_LAKE.id, "up": 210,
            "neighborhoods": ["Fremont", "Green Lake"]
        }),
        &[FREMONT.coords(), GREEN_LAKE.coords()],
    );
    write_route_file(
        &routes_dir,
        "03-retired.geojson",
        json!({
            "id": "retired", "name": "Old Route", "distance_mi": 2.0,
            "start": GAS_WORKS.id, "end": BALLARD_LOCKS.id, "deprecated": true
        }),
        &[GAS_WORKS.coords(), BALLARD_LOCKS.coords()],
    );
    let registry = write_exchange_registry(tmp.path(), "exchanges.geojson", EXCHANGES);

    let config = SchedulerConfig::new("spring", registry)
        .with_routes_dir(&routes_dir)
        .with_out_dir(tmp.path().join("out"))
        .with_stop_after_optimal(1);
    config.validate().unwrap();

    let (routes, exchanges) = config.load_inputs().unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(exchanges.len(), 3);

    let compiled = FactCompiler::new(config.precision())
        .compile(&routes, &exchanges)
        .unwrap();
    assert!(compiled.contains(&facts::attribute("surface", "canal", Term::from("paved"))));
    assert!(compiled.contains(&facts::attribute("neighborhood", "lake", Term::from("Green Lake"))));
    assert!(compiled.contains(&facts::last_run("canal", 0)));

    let processor = ModelProcessor::from_config(&config);
    let mut solver = ScriptedSolver::new(vec![ScriptedModel::new(
        vec![
            facts::slot_assignment(1, 1, "lake"),
            facts::slot_assignment(1, 2, "canal"),
            facts::day_dist_range(1, 6.0, 9.0, &PrecisionCodec::new(2)),
            facts::objective(1, "spread"),
        ],
        vec![3],
        true,
    )]);
    let report = run_session(&mut solver, &compiled, &config.rules, &processor).unwrap();
    assert_eq!(report.models, 1);
    assert!(report.stopped.is_some());

    let solution = Solution::from_json_file(tmp.path().join("out/solution_0.json")).unwrap();
    let day = &solution.schedule[0];
    assert_eq!(day.routes[0].route_id, "lake");
    assert_eq!(day.routes[0].start_exchange, FREMONT.id);
    assert_eq!(day.routes[1].route_id, "canal");
    assert_eq!(day.distance_range, Some((6.0, 9.0)));
    assert_eq!(solution.costs.get("spread"), Some(&3));
    assert_eq!(solution.distance_precision, 2);
    assert_eq!(solution.hash.len(), 16);
}
