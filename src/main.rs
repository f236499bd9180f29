mod config;
mod features;
mod harvest;
mod model;
mod persist;
mod report;

use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use config::{Config, RecordSourceKind};
use harvest::{ApiClient, ApiHarvester, CachedRecords, RecordSource};
use model::predict::PredictionInput;
use model::TrainerOptions;

/// PR Lifetime — harvests merged pull requests from a Bitbucket-style REST
/// API and trains a regression model that predicts how many hours a pull
/// request stays open.
#[derive(Parser, Debug)]
#[command(name = "pr-lifetime", version, about)]
struct Cli {
    /// Config file (defaults to .pr-lifetime.toml in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// REST API base, e.g. https://host/rest/api/1.0/
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Basic-auth user (password comes from config or PR_LIFETIME_PASSWORD)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Raw pull request JSON file
    #[arg(long, global = true)]
    raw: Option<PathBuf>,

    /// Training CSV file
    #[arg(long, global = true)]
    training: Option<PathBuf>,

    /// Test CSV file
    #[arg(long, global = true)]
    test: Option<PathBuf>,

    /// Model bundle file
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch (or reload) merged pull requests and write the training/test CSVs
    Harvest(HarvestArgs),
    /// Train on the CSVs, evaluate on the test set and save the model
    Train(TrainArgs),
    /// Predict the lifetime of one hand-described pull request
    Predict(PredictArgs),
    /// Harvest, then train
    Run {
        #[command(flatten)]
        harvest: HarvestArgs,
        #[command(flatten)]
        train: TrainArgs,
    },
}

#[derive(Args, Debug)]
struct HarvestArgs {
    /// Reuse the raw JSON file instead of calling the API
    #[arg(long)]
    from_cache: bool,

    /// Seed for the train/test shuffle
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Optional output file path for a markdown metrics report
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long)]
    project: String,
    #[arg(long)]
    repo: String,
    #[arg(long)]
    author: String,
    #[arg(long, default_value_t = 100)]
    comment_count: u64,
    #[arg(long, default_value_t = 2)]
    resolved_tasks: u64,
    #[arg(long, default_value_t = 1)]
    reviewers_count: u64,
    #[arg(long, default_value_t = 100)]
    description_length: u64,
    /// 1 for a feature/ branch, 0 otherwise
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    branch: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = load_config(&cli)?;
    debug!(source = ?config.data.source, raw = %config.data.raw.display(), "configuration loaded");

    match &cli.command {
        Command::Harvest(args) => run_harvest(&config, args).await?,
        Command::Train(args) => run_train(&config, args)?,
        Command::Predict(args) => run_predict(&config, args)?,
        Command::Run { harvest, train } => {
            run_harvest(&config, harvest).await?;
            run_train(&config, train)?;
        }
    }

    info!("done");
    Ok(())
}

/// File (or defaults), then environment, then command-line flags.
fn load_config(cli: &Cli) -> Result<Config, config::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?.with_env_overrides(),
        None => Config::load()?,
    };
    if let Some(endpoint) = &cli.endpoint {
        config.api.endpoint = Some(endpoint.clone());
    }
    if let Some(user) = &cli.user {
        config.api.user = Some(user.clone());
    }
    if let Some(raw) = &cli.raw {
        config.data.raw = raw.clone();
    }
    if let Some(training) = &cli.training {
        config.data.training = training.clone();
    }
    if let Some(test) = &cli.test {
        config.data.test = test.clone();
    }
    if let Some(model) = &cli.model {
        config.model.path = model.clone();
    }
    Ok(config)
}

async fn run_harvest(config: &Config, args: &HarvestArgs) -> Result<(), Box<dyn std::error::Error>> {
    let kind = resolve_source(config, args);
    let source: Box<dyn RecordSource> = match kind {
        RecordSourceKind::Fetch => {
            let client = ApiClient::new(
                config.credentials(),
                config.api.page_limit,
                Duration::from_secs(config.api.timeout_secs),
            )?;
            Box::new(ApiHarvester::new(client, config.endpoint()?))
        }
        RecordSourceKind::Cache => Box::new(CachedRecords::new(&config.data.raw)),
    };

    let mut rng = match resolve_seed(config, args) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    collect_and_split(config, kind, source.as_ref(), &mut rng).await
}

/// `--from-cache` forces a cache reload; otherwise `data.source` decides.
fn resolve_source(config: &Config, args: &HarvestArgs) -> RecordSourceKind {
    if args.from_cache {
        RecordSourceKind::Cache
    } else {
        config.data.source
    }
}

/// `--seed` wins over `data.seed`. None means an entropy-seeded shuffle.
fn resolve_seed(config: &Config, args: &HarvestArgs) -> Option<u64> {
    args.seed.or(config.data.seed)
}

/// Collect records, save the raw file after a fetch, then write both CSVs.
/// A cache reload never rewrites the raw file it was read from.
async fn collect_and_split(
    config: &Config,
    kind: RecordSourceKind,
    source: &dyn RecordSource,
    rng: &mut StdRng,
) -> Result<(), Box<dyn std::error::Error>> {
    let _span = info_span!("harvest", source = source.name()).entered();

    info!("collecting merged pull requests");
    let records = source.records().await?;
    info!(records = records.len(), "collected pull requests");

    if kind == RecordSourceKind::Fetch {
        harvest::save_raw(&records, &config.data.raw)?;
        info!(path = %config.data.raw.display(), "saved raw data");
    }

    let rows = features::extract_all(&records)?;
    let (training, test) = features::split::shuffle_and_split(rows, rng);
    info!(training = training.len(), test = test.len(), "split dataset");

    features::write_csv(&training, &config.data.training)?;
    features::write_csv(&test, &config.data.test)?;
    Ok(())
}

fn run_train(config: &Config, args: &TrainArgs) -> Result<(), Box<dyn std::error::Error>> {
    let _span = info_span!("train", model = %config.model.path.display()).entered();

    let options = TrainerOptions {
        l2: config.model.l2,
        max_epochs: config.model.max_epochs,
        tolerance: config.model.tolerance,
    };
    info!("training model");
    let outcome = model::train(
        &config.data.training,
        &config.data.test,
        &config.model.path,
        options,
    )?;

    info!("generating report");
    let built_report = report::build(outcome);
    report::output(&built_report, args.output.as_deref())?;
    info!(quality = %built_report.quality, "training complete");
    Ok(())
}

fn run_predict(config: &Config, args: &PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let _span = info_span!("predict", model = %config.model.path.display()).entered();

    let predictor = model::Predictor::load(&config.model.path)?;
    let input = PredictionInput {
        project: args.project.clone(),
        repo: args.repo.clone(),
        author: args.author.clone(),
        reviewers_count: args.reviewers_count,
        comment_count: args.comment_count,
        resolved_tasks: args.resolved_tasks,
        description_length: args.description_length,
        branch: args.branch,
    };
    let hours = predictor.predict(&input);
    info!(hours, trainer = %predictor.bundle().trainer, "scored input");
    println!("Predicted lifetime: {:.4} hours", hours);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use harvest::tests::test_record;
    use harvest::{HarvestError, PullRequestRecord};
    use std::path::Path;

    struct FixedRecords(Vec<PullRequestRecord>);

    #[async_trait]
    impl RecordSource for FixedRecords {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn records(&self) -> Result<Vec<PullRequestRecord>, HarvestError> {
            Ok(self.0.clone())
        }
    }

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.data.raw = dir.join("raw.json");
        config.data.training = dir.join("trainingdata.csv");
        config.data.test = dir.join("testdata.csv");
        config
    }

    fn records(n: usize) -> Vec<PullRequestRecord> {
        (0..n)
            .map(|i| test_record(&format!("https://host/pr/{i}"), "main"))
            .collect()
    }

    #[test]
    fn test_from_cache_overrides_configured_source() {
        let mut config = Config::default();
        config.data.source = RecordSourceKind::Fetch;
        let args = HarvestArgs { from_cache: true, seed: None };
        assert_eq!(resolve_source(&config, &args), RecordSourceKind::Cache);

        let args = HarvestArgs { from_cache: false, seed: None };
        assert_eq!(resolve_source(&config, &args), RecordSourceKind::Fetch);

        config.data.source = RecordSourceKind::Cache;
        assert_eq!(resolve_source(&config, &args), RecordSourceKind::Cache);
    }

    #[test]
    fn test_seed_flag_beats_config_seed() {
        let mut config = Config::default();
        config.data.seed = Some(7);
        let args = HarvestArgs { from_cache: false, seed: Some(42) };
        assert_eq!(resolve_seed(&config, &args), Some(42));

        let args = HarvestArgs { from_cache: false, seed: None };
        assert_eq!(resolve_seed(&config, &args), Some(7));

        config.data.seed = None;
        assert_eq!(resolve_seed(&config, &args), None);
    }

    #[tokio::test]
    async fn test_fetch_saves_raw_and_writes_both_csvs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let source = FixedRecords(records(4));
        let mut rng = StdRng::seed_from_u64(1);

        collect_and_split(&config, RecordSourceKind::Fetch, &source, &mut rng)
            .await
            .unwrap();

        assert_eq!(harvest::load_raw(&config.data.raw).unwrap(), source.0);
        let training = features::read_csv(&config.data.training).unwrap();
        let test = features::read_csv(&config.data.test).unwrap();
        assert_eq!(training.len(), 2);
        assert_eq!(test.len(), 2);
    }

    #[tokio::test]
    async fn test_cache_reload_leaves_raw_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        // Written by hand, so any re-save would change the bytes.
        let original = format!(
            "[\n\n  {}\n\n]\n",
            serde_json::to_string(&test_record("https://host/pr/1", "feature/x")).unwrap()
        );
        std::fs::write(&config.data.raw, &original).unwrap();

        let source = CachedRecords::new(&config.data.raw);
        let mut rng = StdRng::seed_from_u64(1);
        collect_and_split(&config, RecordSourceKind::Cache, &source, &mut rng)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&config.data.raw).unwrap(), original);
        assert!(config.data.training.exists());
        assert!(config.data.test.exists());
    }

    #[tokio::test]
    async fn test_same_seed_gives_same_split() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let source = FixedRecords(records(10));

        let mut rng = StdRng::seed_from_u64(9);
        collect_and_split(&config, RecordSourceKind::Fetch, &source, &mut rng)
            .await
            .unwrap();
        let first = features::read_csv(&config.data.training).unwrap();

        let mut rng = StdRng::seed_from_u64(9);
        collect_and_split(&config, RecordSourceKind::Fetch, &source, &mut rng)
            .await
            .unwrap();
        assert_eq!(features::read_csv(&config.data.training).unwrap(), first);
    }
}
