use mate_core::config::StateAbstractionKind;
use mate_core::{
    run_exploration, run_workers, ExplorationConfig, ResourceLimits, RunError, SearchConfig,
    SelectorConfig, StopReason,
};
use mate_explore::context::EpisodeSettings;
use mate_explore::heuristic::HeuristicWeighting;
use mate_explore::ppt::InitialDistribution;
use mate_explore::search::fuzzing::FuzzingSettings;
use mate_explore::search::EpisodeEnd;
use mate_explore::simulated::SimulatedApp;
use mate_model::equivalence::StateEquivalence;
use mate_model::observation::{Action, ScreenObservation};

/// Main -> List -> Item (delete crashes), Main -> Settings.
fn demo_app() -> SimulatedApp {
    let mut app = SimulatedApp::new(ScreenObservation::new("app", "Main").with_actions([
        Action::click("list"),
        Action::click("settings"),
        Action::menu(),
    ]));
    let list = app.add_screen(
        ScreenObservation::new("app", "List").with_actions([Action::click("item"), Action::back()]),
    );
    let item = app.add_screen(
        ScreenObservation::new("app", "Item").with_actions([Action::click("delete"), Action::back()]),
    );
    let settings = app.add_screen(ScreenObservation::new("app", "Settings").with_action(Action::back()));
    app.add_edge(0, Action::click("list"), list);
    app.add_edge(list, Action::back(), 0);
    app.add_edge(list, Action::click("item"), item);
    app.add_edge(item, Action::back(), list);
    app.add_crash(item, Action::click("delete"));
    app.add_edge(0, Action::click("settings"), settings);
    app.add_edge(settings, Action::back(), 0);
    app
}

fn config(selector: SelectorConfig, search: SearchConfig) -> ExplorationConfig {
    ExplorationConfig {
        seed: 7,
        equivalence: StateEquivalence::Activity,
        episode: EpisodeSettings {
            max_length: 8,
            reset_retries: 2,
        },
        limits: ResourceLimits {
            max_episodes: 30,
            ..Default::default()
        },
        selector,
        search,
        ..Default::default()
    }
}

#[test]
fn test_default_run_stops_at_episode_limit() {
    let config = config(SelectorConfig::UniformRandom, SearchConfig::Episodes);
    let outcome = run_exploration(&config, demo_app(), 0).unwrap();

    assert_eq!(outcome.stop_reason, Some(StopReason::EpisodeLimitReached));
    assert_eq!(outcome.report.progress.episodes, 30);
    assert_eq!(outcome.report.stopped_by, "resource_limits");
    assert_eq!(outcome.analytics.total_episodes, 30);
    assert_eq!(outcome.analytics.episodes.len(), 30);
    assert!(outcome.analytics.total_steps <= 30 * 8);
    assert_eq!(outcome.model.states.len(), outcome.analytics.total_states);
    assert_eq!(outcome.analytics.discovery_curve.len(), outcome.analytics.total_states);
    assert_eq!(outcome.model.root, Some(0));
    assert_eq!(outcome.report.archive.len(), 1);
}

#[test]
fn test_random_exploration_finds_every_screen() {
    let config = config(SelectorConfig::UniformRandom, SearchConfig::Episodes);
    let outcome = run_exploration(&config, demo_app(), 0).unwrap();
    let mut activities: Vec<_> = outcome.model.states.iter().map(|s| s.activity.as_str()).collect();
    activities.sort_unstable();
    assert_eq!(activities, vec!["Item", "List", "Main", "Settings"]);
}

#[test]
fn test_step_limit_stops_run() {
    let mut config = config(SelectorConfig::UniformRandom, SearchConfig::Episodes);
    config.limits.max_steps = 5;
    let outcome = run_exploration(&config, demo_app(), 0).unwrap();
    assert_eq!(outcome.stop_reason, Some(StopReason::StepLimitReached));
    assert_eq!(outcome.analytics.total_steps, 5);
}

#[test]
fn test_step_limit_cuts_a_long_episode() {
    let mut config = config(SelectorConfig::UniformRandom, SearchConfig::Episodes);
    config.episode.max_length = 50;
    config.limits.max_steps = 1;
    let outcome = run_exploration(&config, demo_app(), 0).unwrap();
    assert_eq!(outcome.stop_reason, Some(StopReason::StepLimitReached));
    assert_eq!(outcome.analytics.total_steps, 1);
    assert_eq!(outcome.analytics.episodes.len(), 1);
    assert_eq!(outcome.analytics.episodes[0].length, 1);
    assert_eq!(outcome.analytics.episodes[0].end, EpisodeEnd::Terminated);
}

#[test]
fn test_genetic_initial_population_respects_episode_limit() {
    let mut config = config(
        SelectorConfig::UniformRandom,
        SearchConfig::Genetic {
            population_size: 10,
            tournament_size: 2,
        },
    );
    config.limits.max_episodes = 2;
    let outcome = run_exploration(&config, demo_app(), 0).unwrap();
    assert_eq!(outcome.stop_reason, Some(StopReason::EpisodeLimitReached));
    assert_eq!(outcome.analytics.total_episodes, 2);
    assert!(!outcome.report.archive.is_empty());
}

#[test]
fn test_genetic_offspring_respect_episode_limit() {
    let mut config = config(
        SelectorConfig::UniformRandom,
        SearchConfig::Genetic {
            population_size: 4,
            tournament_size: 2,
        },
    );
    config.limits.max_episodes = 6;
    let outcome = run_exploration(&config, demo_app(), 0).unwrap();
    assert_eq!(outcome.stop_reason, Some(StopReason::EpisodeLimitReached));
    assert_eq!(outcome.analytics.total_episodes, 6);
}

#[test]
fn test_fuzzer_initial_seeds_respect_episode_limit() {
    let mut config = config(
        SelectorConfig::UniformRandom,
        SearchConfig::GreyBoxFuzzing {
            settings: FuzzingSettings {
                initial_seeds: 5,
                ..Default::default()
            },
        },
    );
    config.limits.max_episodes = 2;
    let outcome = run_exploration(&config, demo_app(), 0).unwrap();
    assert_eq!(outcome.stop_reason, Some(StopReason::EpisodeLimitReached));
    assert_eq!(outcome.analytics.total_episodes, 2);
}

#[test]
fn test_crash_limit_stops_run() {
    let mut app = SimulatedApp::new(ScreenObservation::new("app", "Main").with_action(Action::click("boom")));
    app.add_crash(0, Action::click("boom"));
    let mut config = config(SelectorConfig::UniformRandom, SearchConfig::Episodes);
    config.limits.max_crashes = 3;

    let outcome = run_exploration(&config, app, 0).unwrap();
    assert_eq!(outcome.stop_reason, Some(StopReason::CrashLimitReached));
    assert_eq!(outcome.analytics.crashes, 3);
    assert_eq!(outcome.report.crashes.len(), 3);
    assert_eq!(outcome.analytics.crash_rate(), 1.0);
}

#[test]
fn test_same_seed_same_run() {
    let config = config(
        SelectorConfig::Stoat {
            weighting: HeuristicWeighting::default(),
        },
        SearchConfig::OnePlusOne,
    );
    let first = run_exploration(&config, demo_app(), 0).unwrap();
    let second = run_exploration(&config, demo_app(), 0).unwrap();
    assert_eq!(first.model, second.model);
    assert_eq!(first.analytics.episodes, second.analytics.episodes);
    assert_eq!(first.analytics.discovery_curve, second.analytics.discovery_curve);
    assert_eq!(first.report.summary().progress, second.report.summary().progress);
}

#[test]
fn test_invalid_config_is_rejected_before_running() {
    let mut config = config(SelectorConfig::UniformRandom, SearchConfig::Episodes);
    config.objectives.clear();
    let app = demo_app();
    assert!(matches!(run_exploration(&config, app, 0), Err(RunError::Config(_))));
}

#[test]
fn test_reset_failure_surfaces_as_driver_error() {
    let mut app = demo_app();
    app.fail_next_resets(3);
    let config = config(SelectorConfig::UniformRandom, SearchConfig::Episodes);
    assert!(matches!(run_exploration(&config, app, 0), Err(RunError::Driver(_))));
}

#[test]
fn test_every_selector_and_search_runs() {
    let selectors = [
        SelectorConfig::UniformRandom,
        SelectorConfig::Stoat {
            weighting: HeuristicWeighting::default(),
        },
        SelectorConfig::Qbe {
            state_abstraction: StateAbstractionKind::ActionCount,
            abstract_states: 10,
            matrix: None,
            learning: Some((0.5, 0.9)),
        },
        SelectorConfig::Qbe {
            state_abstraction: StateAbstractionKind::Activity,
            abstract_states: 4,
            matrix: None,
            learning: None,
        },
        SelectorConfig::Pipe {
            initial: InitialDistribution::Uniform,
            learning_rate: 0.1,
            mutation: Some((0.5, 0.05)),
        },
    ];
    let searches = [
        SearchConfig::Episodes,
        SearchConfig::RandomSearch { archive_size: 3 },
        SearchConfig::OnePlusOne,
        SearchConfig::Genetic {
            population_size: 4,
            tournament_size: 2,
        },
        SearchConfig::GreyBoxFuzzing {
            settings: FuzzingSettings::default(),
        },
    ];
    for selector in &selectors {
        for search in &searches {
            let config = config(selector.clone(), search.clone());
            let outcome = run_exploration(&config, demo_app(), 0)
                .unwrap_or_else(|e| panic!("{selector:?} / {search:?} failed: {e}"));
            assert!(outcome.stop_reason.is_some(), "{selector:?} / {search:?}");
            assert!(outcome.analytics.total_states >= 1);
            assert!(!outcome.report.archive.is_empty(), "{selector:?} / {search:?}");
        }
    }
}

#[test]
fn test_workers_run_independently_in_order() {
    let config = config(SelectorConfig::UniformRandom, SearchConfig::Episodes);
    let outcomes = run_workers(&config, 4, |_| demo_app());
    assert_eq!(outcomes.len(), 4);
    for (i, outcome) in outcomes.iter().enumerate() {
        let outcome = outcome.as_ref().unwrap();
        assert_eq!(outcome.worker, i as u64);
        assert_eq!(outcome.analytics.total_episodes, 30);
    }

    // Worker i matches a standalone run as worker i.
    let alone = run_exploration(&config, demo_app(), 2).unwrap();
    let parallel = outcomes[2].as_ref().unwrap();
    assert_eq!(alone.model, parallel.model);
    assert_eq!(alone.analytics.episodes, parallel.analytics.episodes);
}

#[test]
fn test_workers_report_their_own_errors() {
    let config = config(SelectorConfig::UniformRandom, SearchConfig::Episodes);
    let outcomes = run_workers(&config, 3, |worker| {
        let mut app = demo_app();
        if worker == 1 {
            app.fail_next_resets(3);
        }
        app
    });
    assert!(outcomes[0].is_ok());
    assert!(matches!(outcomes[1], Err(RunError::Driver(_))));
    assert!(outcomes[2].is_ok());
}

#[test]
fn test_config_from_json_drives_a_run() {
    let json = r#"{
        "seed": 3,
        "equivalence": { "level": "activity" },
        "episode": { "max_length": 6 },
        "limits": { "max_episodes": 12 },
        "selector": { "kind": "pipe", "initial": { "kind": "uniform" } },
        "search": { "kind": "random_search", "archive_size": 2 },
        "objectives": ["distinct_states", "episode_length"]
    }"#;
    let config = ExplorationConfig::from_json_str(json).unwrap();
    let outcome = run_exploration(&config, demo_app(), 0).unwrap();
    assert_eq!(outcome.stop_reason, Some(StopReason::EpisodeLimitReached));
    assert!(outcome.report.archive.len() <= 2);
    assert!(outcome.analytics.episodes.iter().all(|e| e.fitness.len() == 2));
}
