use std::path::Path;

use tracing::{debug, instrument};

use super::{ModelBundle, ModelError};
use crate::features::FeatureRow;

/// Hand-built input for a single prediction. The lifetime is what gets
/// predicted, so it has no field here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionInput {
    pub project: String,
    pub repo: String,
    pub author: String,
    pub reviewers_count: u64,
    pub comment_count: u64,
    pub resolved_tasks: u64,
    pub description_length: u64,
    pub branch: u8,
}

impl PredictionInput {
    /// Shape the input as a feature row with a zeroed label.
    pub fn to_row(&self) -> FeatureRow {
        FeatureRow {
            link: String::new(),
            project: self.project.clone(),
            repo: self.repo.clone(),
            lifetime: 0,
            author: self.author.clone(),
            reviewers_count: self.reviewers_count,
            comment_count: self.comment_count,
            resolved_tasks: self.resolved_tasks,
            description_length: self.description_length,
            branch: self.branch,
        }
    }
}

/// Scores single rows with a persisted model bundle.
pub struct Predictor {
    bundle: ModelBundle,
}

impl Predictor {
    /// Load and validate the bundle at `path`.
    #[instrument(fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bundle = ModelBundle::load(path)?;
        debug!(trainer = %bundle.trainer, features = bundle.pipeline.width(), "loaded model");
        Ok(Self { bundle })
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Predicted lifetime in hours.
    pub fn predict(&self, input: &PredictionInput) -> f64 {
        self.bundle.score(&input.to_row())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::synthetic_rows;
    use crate::model::{fit, TrainerOptions};

    fn input(project: &str, comment_count: u64) -> PredictionInput {
        PredictionInput {
            project: project.to_string(),
            repo: "web".to_string(),
            author: "alice".to_string(),
            reviewers_count: 2,
            comment_count,
            resolved_tasks: 0,
            description_length: 20,
            branch: 0,
        }
    }

    #[test]
    fn test_to_row_zeroes_label() {
        let row = input("A", 3).to_row();
        assert_eq!(row.lifetime, 0);
        assert_eq!(row.comment_count, 3);
        assert!(row.link.is_empty());
    }

    #[test]
    fn test_predict_from_saved_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fit(&synthetic_rows(), TrainerOptions::default())
            .unwrap()
            .save(&path)
            .unwrap();

        let predictor = Predictor::load(&path).unwrap();
        let low = predictor.predict(&input("A", 0));
        let high = predictor.predict(&input("A", 8));
        let other_project = predictor.predict(&input("B", 0));

        assert!(high > low, "low={low} high={high}");
        assert!(other_project > low, "A={low} B={other_project}");
        assert!((high - low - 40.0).abs() < 5.0, "low={low} high={high}");
    }

    #[test]
    fn test_unknown_categories_still_score() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fit(&synthetic_rows(), TrainerOptions::default())
            .unwrap()
            .save(&path)
            .unwrap();

        let predictor = Predictor::load(&path).unwrap();
        let mut unseen = input("ZZZ", 4);
        unseen.repo = "???".to_string();
        assert!(predictor.predict(&unseen).is_finite());
    }

    #[test]
    fn test_missing_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Predictor::load(&dir.path().join("absent.json")),
            Err(ModelError::MissingModel(_))
        ));
    }
}
