//! Running trials.
//!
//! A trial is one combat from fresh characters to an outcome. Trials share
//! nothing but the read-only probability tables, so a batch is spread over
//! tokio's blocking pool and folded into one summary.

use crate::character::Character;
use crate::character_builder::{build_groups, GroupRecord};
use crate::config::SimulationConfig;
use crate::context::Context;
use crate::engine::CombatEngine;
use crate::error::{ConfigError, EngineError};
use crate::features::{SummaryFeatures, TrialFeatures};
use crate::probability::{ProbabilityProvider, ProbabilityTables};
use futures::future::join_all;
use std::sync::Arc;

/// Builds the groups for a trial. Called once per trial so that no
/// character state carries over.
pub trait CharacterFactory: Send + Sync {
    fn groups(&self) -> Result<Vec<Vec<Character>>, ConfigError>;
}

impl<F> CharacterFactory for F
where
    F: Fn() -> Result<Vec<Vec<Character>>, ConfigError> + Send + Sync,
{
    fn groups(&self) -> Result<Vec<Vec<Character>>, ConfigError> {
        self()
    }
}

/// Groups read from character records.
#[derive(Debug, Clone)]
pub struct RecordFactory {
    records: Vec<GroupRecord>,
}

impl RecordFactory {
    /// Checks that the records build before any trial runs.
    pub fn new(records: Vec<GroupRecord>) -> Result<Self, ConfigError> {
        build_groups(&records)?;
        Ok(Self { records })
    }
}

impl CharacterFactory for RecordFactory {
    fn groups(&self) -> Result<Vec<Vec<Character>>, ConfigError> {
        build_groups(&self.records)
    }
}

/// The tables `config` asks for: the shared ones for default settings,
/// otherwise freshly generated.
pub fn probability_tables(config: &SimulationConfig) -> Arc<dyn ProbabilityProvider> {
    if config.uses_default_tables() {
        ProbabilityTables::shared()
    } else {
        Arc::new(ProbabilityTables::generate(config.table_samples, config.table_seed))
    }
}

/// Run trial `index` of the batch described by `config`.
pub fn run_trial<F: CharacterFactory + ?Sized>(
    factory: &F,
    config: &SimulationConfig,
    index: u32,
) -> Result<TrialFeatures, EngineError> {
    run_trial_with(factory, config, index, probability_tables(config))
}

fn run_trial_with<F: CharacterFactory + ?Sized>(
    factory: &F,
    config: &SimulationConfig,
    index: u32,
    tables: Arc<dyn ProbabilityProvider>,
) -> Result<TrialFeatures, EngineError> {
    let context = Context::new(factory.groups()?)?
        .with_formation(config.formation)?
        .with_seed(config.trial_seed(index))
        .with_probabilities(tables);
    let mut engine = CombatEngine::new(context).with_max_rounds(config.max_rounds);
    let outcome = engine.run()?;
    tracing::debug!(
        trial = index,
        winner = outcome.winner(),
        rounds = engine.features().rounds,
        "trial finished"
    );
    Ok(engine.features().clone())
}

/// Run every trial in `config` and summarize them.
///
/// Trials are dealt round-robin to one blocking worker per available core.
/// The first configuration or engine error aborts the batch.
pub async fn run_trials<F>(factory: Arc<F>, config: &SimulationConfig) -> Result<SummaryFeatures, EngineError>
where
    F: CharacterFactory + 'static,
{
    config.validate()?;
    let table_config = config.clone();
    let tables = tokio::task::spawn_blocking(move || probability_tables(&table_config))
        .await
        .map_err(|e| EngineError::Worker(e.to_string()))?;

    let workers = std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
        .clamp(1, config.trials);
    tracing::info!(trials = config.trials, workers, seed = config.seed, "running trials");

    let handles = (0..workers).map(|worker| {
        let factory = Arc::clone(&factory);
        let tables = Arc::clone(&tables);
        let config = config.clone();
        tokio::task::spawn_blocking(move || {
            let mut summary = SummaryFeatures::new();
            for index in (worker..config.trials).step_by(workers as usize) {
                let features = run_trial_with(factory.as_ref(), &config, index, Arc::clone(&tables))?;
                summary.add(&features);
            }
            Ok::<_, EngineError>(summary)
        })
    });

    let mut summary = SummaryFeatures::new();
    for joined in join_all(handles).await {
        let partial = joined.map_err(|e| EngineError::Worker(e.to_string()))??;
        summary.merge(&partial);
    }
    tracing::info!(
        trials = summary.trials,
        control = summary.control.victories,
        test = summary.test.victories,
        mutual = summary.mutual_defeats,
        "trials finished"
    );
    Ok(summary)
}

/// Run trials one after another on the calling thread.
pub fn run_trials_blocking<F: CharacterFactory + ?Sized>(
    factory: &F,
    config: &SimulationConfig,
) -> Result<SummaryFeatures, EngineError> {
    config.validate()?;
    let tables = probability_tables(config);
    (0..config.trials)
        .map(|index| run_trial_with(factory, config, index, Arc::clone(&tables)))
        .collect::<Result<Vec<_>, _>>()
        .map(|trials| trials.into_iter().collect())
}
