use linktune::config::{AppConfig, EvolutionConfig};
use linktune::data::CsvConnector;
use linktune::engines::evaluation::FitnessEvaluator;
use linktune::engines::generation::{
    EvolutionEngine, Evaluated, GenerationSummary, Genome, LineageEntry, ProgressCallback,
};
use linktune::engines::learning::{AnswerLog, GoldOracle, InMemoryLinkDatabase, Labeler, LinkDatabase};
use linktune::matching::{
    identity_fields, ComparatorKind, InMemoryEngine, MatchConfiguration, MatchEngine,
    MatchListener, PropertyConfig,
};
use linktune::types::{Link, LinkKind, MatchMode, PairKey, Record};
use linktune::LinktuneError;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Records what the engine reports so tests can inspect each generation.
#[derive(Default)]
struct RecordingCallback {
    evaluated: Vec<usize>,
    summaries: Vec<Vec<f64>>,
    new_bests: usize,
    questions: Vec<usize>,
    question_rounds: Vec<usize>,
}

impl ProgressCallback for RecordingCallback {
    fn on_generation_start(&mut self, _generation: usize) {
        self.evaluated.push(0);
    }

    fn on_genome_evaluated(&mut self, _evaluated: &Evaluated<'_>) {
        if let Some(count) = self.evaluated.last_mut() {
            *count += 1;
        }
    }

    fn on_new_best(&mut self, _genome: &Genome, _fitness: f64, _lineage: &[LineageEntry]) {
        self.new_bests += 1;
    }

    fn on_generation_complete(&mut self, _generation: usize, summary: &GenerationSummary) {
        self.summaries.push(summary.fitnesses.clone());
    }

    fn on_questions_asked(&mut self, generation: usize, asked: usize, _total: usize) {
        self.question_rounds.push(generation);
        self.questions.push(asked);
    }
}

fn companies() -> Vec<Record> {
    [
        ("1", "acme corp", "oslo"),
        ("2", "acme corp", "oslo"),
        ("3", "zenith", "bergen"),
        ("4", "zenith", "bergen"),
        ("5", "orbit", "oslo"),
        ("6", "nimbus", "tromso"),
    ]
    .iter()
    .map(|(id, name, city)| Record::new().with("ID", *id).with("NAME", *name).with("CITY", *city))
    .collect()
}

fn gold() -> InMemoryLinkDatabase {
    InMemoryLinkDatabase::from_links(
        vec![
            Link::asserted("1", "2", LinkKind::Same),
            Link::asserted("3", "4", LinkKind::Same),
        ],
        true,
    )
}

fn template() -> Genome {
    Genome::new(
        0.8,
        vec![
            PropertyConfig::identity("ID"),
            PropertyConfig::compared("NAME", ComparatorKind::Exact, 0.1, 0.9),
            PropertyConfig::compared("CITY", ComparatorKind::Levenshtein, 0.3, 0.6),
        ],
    )
}

fn evaluator(pessimistic: bool) -> FitnessEvaluator<InMemoryEngine> {
    let ids = vec!["ID".to_string()];
    let engine = InMemoryEngine::index(vec![companies()], &ids).unwrap();
    FitnessEvaluator::new(engine, ids, pessimistic)
}

/// Reports the same pairs for every configuration, or fails every pass
/// with a broken score when `broken` is set.
struct FixedEngine {
    records: Vec<Record>,
    pairs: Vec<(usize, usize)>,
    broken: Option<f64>,
}

impl FixedEngine {
    fn new(pairs: Vec<(usize, usize)>) -> Self {
        Self {
            records: companies(),
            pairs,
            broken: None,
        }
    }
}

impl MatchEngine for FixedEngine {
    fn mode(&self) -> MatchMode {
        MatchMode::Deduplication
    }

    fn link_records(
        &self,
        _config: &MatchConfiguration<'_>,
        listener: &mut dyn MatchListener,
    ) -> linktune::Result<()> {
        if let Some(fmeasure) = self.broken {
            return Err(LinktuneError::SanityViolation { fmeasure });
        }
        for &(a, b) in &self.pairs {
            listener.matches(&self.records[a], &self.records[b], 0.9)?;
        }
        listener.end_processing()
    }

    fn find_record(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.get("ID") == Some(id))
    }
}

fn evolution(population_size: usize, generations: usize) -> EvolutionConfig {
    EvolutionConfig {
        population_size,
        generations,
        seed: Some(7),
        ..Default::default()
    }
}

#[test]
fn test_batch_run_keeps_population_size() {
    let mut config = evolution(10, 4);
    config.threads = 2;
    let mut engine = EvolutionEngine::new(config, evaluator(true), template())
        .unwrap()
        .with_truth(gold());

    let mut callback = RecordingCallback::default();
    let summary = engine.run(&mut callback).unwrap();

    assert!(summary.generations >= 1 && summary.generations <= 4);
    assert_eq!(callback.evaluated.len(), summary.generations);
    assert!(callback.evaluated.iter().all(|&n| n == 10));
    for fitnesses in &callback.summaries {
        assert_eq!(fitnesses.len(), 10);
        assert!(fitnesses.windows(2).all(|w| w[0] >= w[1]));
        assert!(fitnesses.iter().all(|f| (0.0..=1.0).contains(f)));
    }

    let hof: Vec<f64> = engine.hall_of_fame().get_all().iter().map(|e| e.fitness).collect();
    assert!(hof.windows(2).all(|w| w[0] >= w[1]));
    if let Some(best) = &summary.best {
        assert_eq!(Some(best.fitness), hof.first().copied());
        assert!(callback.new_bests >= 1);
    }
    assert_eq!(summary.questions_asked, 0);
}

#[test]
fn test_perfect_configuration_stops_the_run() {
    let mut config = evolution(10, 50);
    config.copies_of_original = 10;
    let mut engine = EvolutionEngine::new(config, evaluator(true), template())
        .unwrap()
        .with_truth(gold());

    let mut callback = RecordingCallback::default();
    let summary = engine.run(&mut callback).unwrap();

    assert_eq!(summary.generations, 1);
    let best = summary.best.unwrap();
    assert_eq!(best.fitness, 1.0);
    assert_eq!(best.genome, template());
    assert_eq!(callback.summaries[0], vec![1.0; 10]);
}

#[test]
fn test_unreachable_threshold_scores_zero() {
    let evaluator = evaluator(true);
    let hopeless = Genome::new(
        0.99,
        vec![
            PropertyConfig::identity("ID"),
            PropertyConfig::compared("NAME", ComparatorKind::Exact, 0.1, 0.6),
        ],
    );
    assert_eq!(evaluator.evaluate(&hopeless, &gold()).unwrap(), 0.0);
    assert_eq!(evaluator.cached(&hopeless), Some(0.0));
}

#[test]
fn test_pessimism_only_matters_for_unknown_pairs() {
    // CITY alone also pairs 1/5 and 2/5, which the truth set says nothing about
    let loose = Genome::new(
        0.55,
        vec![
            PropertyConfig::identity("ID"),
            PropertyConfig::compared("CITY", ComparatorKind::Exact, 0.3, 0.6),
        ],
    );
    let truth = gold();
    let strict = evaluator(true).evaluate(&loose, &truth).unwrap();
    let lenient = evaluator(false).evaluate(&loose, &truth).unwrap();
    assert!(strict < lenient, "{} vs {}", strict, lenient);
    assert_eq!(lenient, 1.0);
}

#[test]
fn test_active_learning_never_repeats_a_question() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("answers.txt");

    let mut config = evolution(10, 6);
    config.active = true;
    config.questions = 3;
    config.copies_of_original = 3;

    let labeler = Labeler::new(
        Box::new(GoldOracle::new(gold())),
        Some(AnswerLog::create(&log_path).unwrap()),
    );
    let mut engine = EvolutionEngine::new(config, evaluator(false), template())
        .unwrap()
        .with_labeler(labeler)
        .with_validation(gold());

    let mut callback = RecordingCallback::default();
    let summary = engine.run(&mut callback).unwrap();

    let logged = CsvConnector::load_links(&log_path).unwrap();
    assert_eq!(logged.len(), summary.questions_asked);
    assert_eq!(callback.questions.iter().sum::<usize>(), summary.questions_asked);
    assert!(callback.questions.iter().all(|&n| n <= 3));

    let distinct: HashSet<PairKey> = logged.iter().map(Link::key).collect();
    assert_eq!(distinct.len(), logged.len());

    for link in &logged {
        let expected = match gold().infer_link(&link.id1, &link.id2) {
            Some(known) => known.kind,
            None => LinkKind::Different,
        };
        assert_eq!(link.kind, expected, "{}", link.key());
        assert!(engine.knowledge_base().contains(&link.key()));
    }
}

#[test]
fn test_genome_text_round_trip() {
    let genome = template();
    let text = genome.to_string();
    assert_eq!(
        text,
        "[GeneticConfiguration 0.8 [ID] [NAME Exact 0.1 0.9] [CITY Levenshtein 0.3 0.6]]"
    );
    assert_eq!(text.parse::<Genome>().unwrap(), genome);
}

fn write(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap();
}

#[test]
fn test_run_from_files() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("companies.csv"),
        "ID,NAME,CITY\n1,acme corp,oslo\n2,acme corp,oslo\n3,zenith,bergen\n4,zenith,bergen\n5,orbit,oslo\n",
    );
    write(&dir.path().join("gold.txt"), "+,1,2,1.0\n+,3,4,1.0\n");
    write(
        &dir.path().join("linktune.toml"),
        r#"
[matching]
threshold = 0.8

[[matching.data_sources]]
path = "companies.csv"

[[matching.properties]]
name = "ID"
id = true

[[matching.properties]]
name = "NAME"
comparator = "Exact"
low = 0.1
high = 0.9

[evolution]
population_size = 6
generations = 3
seed = 11
copies_of_original = 1
"#,
    );

    let mut app = AppConfig::load(dir.path().join("linktune.toml")).unwrap();
    let output = dir.path().join("best.toml");
    app.evolution.output = Some(output.clone());
    app.validate().unwrap();

    let properties = app.matching.to_properties().unwrap();
    let ids = identity_fields(&properties);
    let records = CsvConnector::load_records(&app.matching.data_sources[0].path).unwrap();
    assert_eq!(records.len(), 5);
    let engine = InMemoryEngine::index(vec![records], &ids).unwrap();
    let truth = InMemoryLinkDatabase::from_links(
        CsvConnector::load_links(dir.path().join("gold.txt")).unwrap(),
        true,
    );

    let evaluator = FitnessEvaluator::new(engine, ids, app.evolution.pessimistic());
    let mut tuner = EvolutionEngine::new(
        app.evolution.clone(),
        evaluator,
        app.matching.to_genome().unwrap(),
    )
    .unwrap()
    .with_truth(truth)
    .with_export(output.clone(), app.matching.clone());

    let summary = tuner.run(&mut RecordingCallback::default()).unwrap();
    assert_eq!(summary.best.map(|b| b.fitness), Some(1.0));

    let saved: toml::Value = toml::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(saved["matching"]["properties"][0]["name"].as_str(), Some("ID"));
}

#[test]
fn test_questions_on_generation_one_and_even_generations() {
    // 1/2 and 1/3 are always reported; 3/4 is never found, so no genome
    // can reach 1.0 and the run goes the full five generations
    let engine = FixedEngine::new(vec![(0, 1), (0, 2)]);
    let evaluator = FitnessEvaluator::new(engine, vec!["ID".to_string()], false);

    let mut config = evolution(10, 5);
    config.active = true;
    let mut tuner = EvolutionEngine::new(config, evaluator, template())
        .unwrap()
        .with_labeler(Labeler::new(Box::new(GoldOracle::new(gold())), None));

    let mut callback = RecordingCallback::default();
    let summary = tuner.run(&mut callback).unwrap();

    assert_eq!(summary.generations, 5);
    assert_eq!(callback.question_rounds, vec![0, 1, 2, 4]);
    assert_eq!(callback.questions, vec![2, 0, 0, 0]);
    assert_eq!(
        tuner.knowledge_base().infer_link("1", "3").map(|l| l.kind),
        Some(LinkKind::Different)
    );
}

#[test]
fn test_broken_score_aborts_the_run() {
    let mut engine = FixedEngine::new(vec![(0, 1)]);
    engine.broken = Some(1.5);
    let evaluator = FitnessEvaluator::new(engine, vec!["ID".to_string()], true);

    let err = evaluator.evaluate(&template(), &gold()).unwrap_err();
    assert!(matches!(err, LinktuneError::SanityViolation { fmeasure } if fmeasure == 1.5));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(evaluator.cached(&template()), None);

    let mut tuner = EvolutionEngine::new(evolution(10, 3), evaluator, template())
        .unwrap()
        .with_truth(gold());
    let mut callback = RecordingCallback::default();
    match tuner.run(&mut callback) {
        Err(e) => assert_eq!(e.exit_code(), 3),
        Ok(_) => panic!("run should abort on a broken score"),
    }
    assert!(callback.summaries.is_empty());
    assert_eq!(LinktuneError::Configuration("x".to_string()).exit_code(), 1);
}
