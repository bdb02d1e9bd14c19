use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use linktune::config::{AppConfig, EvolutionConfig};
use linktune::data::CsvConnector;
use linktune::engines::evaluation::FitnessEvaluator;
use linktune::engines::generation::progress::print_lineage;
use linktune::engines::generation::{ConsoleProgressCallback, EvolutionEngine, LineageEntry};
use linktune::engines::learning::{ConsoleOracle, GoldOracle, InMemoryLinkDatabase, Labeler, Oracle};
use linktune::matching::{identity_fields, InMemoryEngine};
use linktune::LinktuneError;
use log::{error, info};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "linktune", version, about = "Evolves record-linkage configurations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Tune the matching configuration in CONFIG
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// TOML or JSON configuration file
    config: PathBuf,

    /// Link file of known matches. With --active it stands in for the
    /// human oracle and every generation is also validated against it.
    gold: Option<PathBuf>,

    /// Ask for labels on the most informative pairs instead of relying on
    /// a complete test file
    #[arg(long)]
    active: bool,

    #[arg(long)]
    generations: Option<usize>,

    #[arg(long)]
    population: Option<usize>,

    /// Pairs to label per active-learning round
    #[arg(long)]
    questions: Option<usize>,

    #[arg(long)]
    threads: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Log of every answer given, truncated at start [default: answers.txt]
    #[arg(long)]
    linkfile: Option<PathBuf>,

    /// Where to write the best configuration found
    #[arg(long)]
    output: Option<PathBuf>,

    /// The test file misses some links; don't count unknown pairs as wrong
    #[arg(long)]
    incomplete: bool,

    /// Keep the configured comparators, tuning only threshold and probabilities
    #[arg(long)]
    no_comparators: bool,

    /// Copies of the configured starting point in the first generation
    #[arg(long)]
    original: Option<usize>,

    /// Print one line per generation instead of every configuration
    #[arg(long, short)]
    quiet: bool,
}

impl RunArgs {
    fn apply(&self, evolution: &mut EvolutionConfig) {
        evolution.active |= self.active;
        evolution.incomplete |= self.incomplete;
        if let Some(n) = self.generations {
            evolution.generations = n;
        }
        if let Some(n) = self.population {
            evolution.population_size = n;
        }
        if let Some(n) = self.questions {
            evolution.questions = n;
        }
        if let Some(n) = self.threads {
            evolution.threads = n;
        }
        if self.seed.is_some() {
            evolution.seed = self.seed;
        }
        if self.linkfile.is_some() {
            evolution.answers_log = self.linkfile.clone();
        }
        if self.output.is_some() {
            evolution.output = self.output.clone();
        }
        if self.no_comparators {
            evolution.evolve_comparators = false;
        }
        if let Some(n) = self.original {
            evolution.copies_of_original = n;
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run(args) => run(args),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<LinktuneError>()
            .map_or(1, LinktuneError::exit_code);
        std::process::exit(code);
    }
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut app = AppConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    args.apply(&mut app.evolution);
    app.validate()?;

    let properties = app.matching.to_properties()?;
    let id_fields = identity_fields(&properties);
    let sources = app
        .matching
        .data_sources
        .iter()
        .map(|source| {
            CsvConnector::load_records(&source.path)
                .with_context(|| format!("reading {}", source.path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let engine = InMemoryEngine::index(sources, &id_fields)?;

    let gold = match &args.gold {
        Some(path) => {
            let links = CsvConnector::load_links(path)
                .with_context(|| format!("reading {}", path.display()))?;
            info!("Loaded {} gold links", links.len());
            Some(InMemoryLinkDatabase::from_links(links, true))
        }
        None => None,
    };

    let evolution = app.evolution.clone();
    let evaluator = FitnessEvaluator::new(engine, id_fields, evolution.pessimistic());
    let mut tuner = EvolutionEngine::new(evolution.clone(), evaluator, app.matching.to_genome()?)?;

    if evolution.active {
        let oracle: Box<dyn Oracle> = match gold {
            Some(gold) => {
                info!("Validation mode: gold links answer every question");
                tuner = tuner.with_validation(gold.clone());
                Box::new(GoldOracle::new(gold))
            }
            None => {
                let fields = properties.iter().map(|p| p.name.clone()).collect();
                Box::new(ConsoleOracle::new(io::stdin().lock(), io::stdout(), fields))
            }
        };
        tuner = tuner.with_labeler(Labeler::with_log_at(oracle, evolution.answers_log_path())?);
    } else {
        match gold {
            Some(gold) => tuner = tuner.with_truth(gold),
            None => bail!("a test file is required unless --active is given"),
        }
    }

    if let Some(output) = &evolution.output {
        tuner = tuner.with_export(output.clone(), app.matching.clone());
    }

    let mut progress = ConsoleProgressCallback::new(!args.quiet);
    let summary = tuner.run(&mut progress)?;

    println!();
    println!("Finished after {} generations", summary.generations);
    if summary.questions_asked > 0 {
        println!("Questions asked: {}", summary.questions_asked);
    }
    match &summary.best {
        Some(best) => {
            println!("BEST: {} {}", best.genome, best.fitness);
            let lineage: Vec<LineageEntry> = tuner.lineage(&best.genome);
            print_lineage(&lineage);
        }
        None => println!("No configuration scored above 0"),
    }

    println!();
    println!("HALL OF FAME:");
    for entry in tuner.hall_of_fame().get_all() {
        println!("  {} {}", entry.fitness, entry.genome);
    }
    Ok(())
}
