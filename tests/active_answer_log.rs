use linktune::config::EvolutionConfig;
use linktune::data::CsvConnector;
use linktune::engines::evaluation::FitnessEvaluator;
use linktune::engines::generation::{ConsoleProgressCallback, EvolutionEngine, Genome};
use linktune::engines::learning::{GoldOracle, InMemoryLinkDatabase, Labeler};
use linktune::matching::{ComparatorKind, InMemoryEngine, PropertyConfig};
use linktune::types::{Link, LinkKind, Record};

// Kept in its own test binary: it changes the working directory.
#[test]
fn test_default_active_run_writes_answers_txt() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    std::fs::write("answers.txt", "+,stale,entry,1.0\n").unwrap();

    let records = vec![
        Record::new().with("ID", "1").with("NAME", "acme corp"),
        Record::new().with("ID", "2").with("NAME", "acme corp"),
        Record::new().with("ID", "3").with("NAME", "zenith"),
    ];
    let ids = vec!["ID".to_string()];
    let engine = InMemoryEngine::index(vec![records], &ids).unwrap();
    let evaluator = FitnessEvaluator::new(engine, ids, false);

    let config = EvolutionConfig {
        active: true,
        population_size: 6,
        generations: 2,
        copies_of_original: 6,
        seed: Some(3),
        ..Default::default()
    };
    assert_eq!(config.answers_log, None);

    let gold = InMemoryLinkDatabase::from_links([Link::asserted("1", "2", LinkKind::Same)], true);
    let labeler = Labeler::with_log_at(Box::new(GoldOracle::new(gold)), config.answers_log_path()).unwrap();
    let template = Genome::new(
        0.8,
        vec![
            PropertyConfig::identity("ID"),
            PropertyConfig::compared("NAME", ComparatorKind::Exact, 0.1, 0.9),
        ],
    );

    let mut tuner = EvolutionEngine::new(config, evaluator, template)
        .unwrap()
        .with_labeler(labeler);
    let summary = tuner.run(&mut ConsoleProgressCallback::new(false)).unwrap();

    let log = dir.path().join("answers.txt");
    assert!(log.exists());
    let logged = CsvConnector::load_links(&log).unwrap();
    assert_eq!(summary.questions_asked, 1);
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].kind, LinkKind::Same);
    assert_eq!((logged[0].id1.as_str(), logged[0].id2.as_str()), ("1", "2"));
}
