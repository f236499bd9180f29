use std::path::PathBuf;

use crate::model::RegressionMetrics;

/// Coarse rating of a model's fit, derived from R² on the test set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FitQuality {
    Poor,
    Fair,
    Good,
}

impl FitQuality {
    pub fn from_r_squared(r_squared: f64) -> Self {
        if r_squared >= 0.7 {
            FitQuality::Good
        } else if r_squared >= 0.3 {
            FitQuality::Fair
        } else {
            FitQuality::Poor
        }
    }
}

impl std::fmt::Display for FitQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitQuality::Poor => write!(f, "POOR"),
            FitQuality::Fair => write!(f, "FAIR"),
            FitQuality::Good => write!(f, "GOOD"),
        }
    }
}

/// Everything printed after a training run.
#[derive(Debug)]
pub struct Report {
    /// Trainer that produced the model
    pub trainer: String,
    /// Where the bundle was written
    pub model_path: PathBuf,
    /// Training rows before range filtering
    pub loaded_rows: usize,
    /// Training rows the model was fitted on
    pub training_rows: usize,
    /// Length of the encoded feature vector
    pub feature_width: usize,
    /// Metrics on the held-out test set
    pub metrics: RegressionMetrics,
    pub quality: FitQuality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_quality_ordering() {
        assert!(FitQuality::Poor < FitQuality::Fair);
        assert!(FitQuality::Fair < FitQuality::Good);
    }

    #[test]
    fn test_fit_quality_thresholds() {
        assert_eq!(FitQuality::from_r_squared(-2.0), FitQuality::Poor);
        assert_eq!(FitQuality::from_r_squared(0.3), FitQuality::Fair);
        assert_eq!(FitQuality::from_r_squared(0.69), FitQuality::Fair);
        assert_eq!(FitQuality::from_r_squared(0.7), FitQuality::Good);
    }

    #[test]
    fn test_fit_quality_display() {
        assert_eq!(FitQuality::Poor.to_string(), "POOR");
        assert_eq!(FitQuality::Fair.to_string(), "FAIR");
        assert_eq!(FitQuality::Good.to_string(), "GOOD");
    }
}
