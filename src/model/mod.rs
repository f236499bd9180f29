pub mod encoding;
pub mod predict;
pub mod regression;

pub use encoding::FeaturePipeline;
pub use predict::Predictor;
pub use regression::{CoordinateDescentRegressor, LinearModel, RegressionMetrics, TrainerOptions};

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::features::{self, FeatureError, FeatureRow, HEADER};
use crate::persist;

const LIFETIME_RANGE: RangeInclusive<i64> = 0..=1000;
const RESOLVED_TASKS_RANGE: RangeInclusive<u64> = 0..=30;
const COMMENT_COUNT_RANGE: RangeInclusive<u64> = 0..=100;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to load dataset: {0}")]
    Dataset(#[from] FeatureError),

    #[error("No training rows left after filtering")]
    EmptyTrainingSet,

    #[error("Model file not found: {0}")]
    MissingModel(PathBuf),

    #[error("Model file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model file is not a valid bundle: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Model schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },
}

/// Everything needed to score a row: the column schema the model was trained
/// against, the fitted transformation and the regression weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub schema: Vec<String>,
    pub trainer: String,
    pub pipeline: FeaturePipeline,
    pub model: LinearModel,
    pub training_rows: usize,
    /// Test-set metrics, filled in after evaluation
    pub metrics: Option<RegressionMetrics>,
}

impl ModelBundle {
    /// Pipeline output and model input widths must agree.
    pub fn check_shape(&self) -> Result<(), ModelError> {
        if self.schema != HEADER {
            return Err(ModelError::SchemaMismatch {
                expected: HEADER.join(","),
                found: self.schema.join(","),
            });
        }
        let width = self.pipeline.width();
        if width != self.model.weights.len() {
            return Err(ModelError::SchemaMismatch {
                expected: format!("{} features", self.model.weights.len()),
                found: format!("{} features", width),
            });
        }
        Ok(())
    }

    pub fn score(&self, row: &FeatureRow) -> f64 {
        self.model.predict(&self.pipeline.transform(row))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let json = serde_json::to_vec_pretty(self)?;
        persist::write_replacing(path, &json)?;
        debug!("saved model bundle");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::MissingModel(path.to_path_buf()));
        }
        let contents = std::fs::read(path)?;
        let bundle: ModelBundle = serde_json::from_slice(&contents)?;
        bundle.check_shape()?;
        Ok(bundle)
    }
}

/// Summary of one training run, consumed by the report.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub trainer: String,
    pub model_path: PathBuf,
    pub loaded_rows: usize,
    pub training_rows: usize,
    pub feature_width: usize,
    pub metrics: RegressionMetrics,
}

/// Drop training rows outside the accepted ranges for lifetime, resolved
/// tasks and comment count. Bounds are inclusive.
pub fn filter_training_rows(rows: Vec<FeatureRow>) -> Vec<FeatureRow> {
    rows.into_iter()
        .filter(|r| {
            LIFETIME_RANGE.contains(&r.lifetime)
                && RESOLVED_TASKS_RANGE.contains(&r.resolved_tasks)
                && COMMENT_COUNT_RANGE.contains(&r.comment_count)
        })
        .collect()
}

/// Fit the transformation pipeline and the regressor on `rows`.
pub fn fit(rows: &[FeatureRow], options: TrainerOptions) -> Result<ModelBundle, ModelError> {
    if rows.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }
    let pipeline = FeaturePipeline::fit(rows);
    let features: Vec<Vec<f64>> = rows.iter().map(|r| pipeline.transform(r)).collect();
    let labels: Vec<f64> = rows.iter().map(FeaturePipeline::label).collect();
    let model = CoordinateDescentRegressor::new(options).fit(&features, &labels);

    Ok(ModelBundle {
        schema: HEADER.iter().map(|h| h.to_string()).collect(),
        trainer: CoordinateDescentRegressor::NAME.to_string(),
        pipeline,
        model,
        training_rows: rows.len(),
        metrics: None,
    })
}

/// Score every row of `rows` with `bundle` and compare against lifetimes.
pub fn evaluate(bundle: &ModelBundle, rows: &[FeatureRow]) -> RegressionMetrics {
    let predictions: Vec<f64> = rows.iter().map(|r| bundle.score(r)).collect();
    let labels: Vec<f64> = rows.iter().map(FeaturePipeline::label).collect();
    regression::evaluate(&predictions, &labels)
}

/// Load both datasets, train on the filtered training set, evaluate on the
/// unfiltered test set and persist the bundle to `model_path`.
#[instrument(skip(options), fields(training = %training_path.display(), test = %test_path.display()))]
pub fn train(
    training_path: &Path,
    test_path: &Path,
    model_path: &Path,
    options: TrainerOptions,
) -> Result<TrainingOutcome, ModelError> {
    let loaded = features::read_csv(training_path)?;
    let test = features::read_csv(test_path)?;
    let loaded_rows = loaded.len();

    let training = filter_training_rows(loaded);
    info!(
        loaded = loaded_rows,
        kept = training.len(),
        test = test.len(),
        "loaded datasets"
    );

    let mut bundle = fit(&training, options)?;
    info!(features = bundle.pipeline.width(), trainer = %bundle.trainer, "model trained");

    let metrics = evaluate(&bundle, &test);
    info!(
        r_squared = metrics.r_squared,
        rmse = metrics.root_mean_squared_error,
        "model evaluated"
    );
    bundle.metrics = Some(metrics);
    bundle.save(model_path)?;

    Ok(TrainingOutcome {
        trainer: bundle.trainer.clone(),
        model_path: model_path.to_path_buf(),
        loaded_rows,
        training_rows: bundle.training_rows,
        feature_width: bundle.pipeline.width(),
        metrics,
    })
}
