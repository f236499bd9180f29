use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::features::FeatureRow;

/// Text columns expanded into indicator blocks, in feature-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoricalColumn {
    Project,
    Repo,
    Author,
}

impl CategoricalColumn {
    pub const ALL: [CategoricalColumn; 3] = [Self::Project, Self::Repo, Self::Author];

    pub fn value(self, row: &FeatureRow) -> &str {
        match self {
            Self::Project => &row.project,
            Self::Repo => &row.repo,
            Self::Author => &row.author,
        }
    }
}

/// Numeric columns that are z-score normalized, in feature-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumericColumn {
    CommentCount,
    DescriptionLength,
    ResolvedTasks,
    ReviewersCount,
    Branch,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 5] = [
        Self::CommentCount,
        Self::DescriptionLength,
        Self::ResolvedTasks,
        Self::ReviewersCount,
        Self::Branch,
    ];

    pub fn value(self, row: &FeatureRow) -> f64 {
        match self {
            Self::CommentCount => row.comment_count as f64,
            Self::DescriptionLength => row.description_length as f64,
            Self::ResolvedTasks => row.resolved_tasks as f64,
            Self::ReviewersCount => row.reviewers_count as f64,
            Self::Branch => f64::from(row.branch),
        }
    }
}

/// One-hot encoder with a sorted vocabulary learned at fit time.
/// Categories never seen during fitting encode to an all-zero block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub column: CategoricalColumn,
    pub categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit(column: CategoricalColumn, rows: &[FeatureRow]) -> Self {
        let categories: BTreeSet<&str> = rows.iter().map(|r| column.value(r)).collect();
        Self {
            column,
            categories: categories.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    pub fn encode_into(&self, row: &FeatureRow, out: &mut Vec<f64>) {
        let start = out.len();
        out.resize(start + self.width(), 0.0);
        let value = self.column.value(row);
        if let Ok(index) = self
            .categories
            .binary_search_by(|c| c.as_str().cmp(value))
        {
            out[start + index] = 1.0;
        }
    }
}

/// Mean/variance normalizer: `(x - mean) / std` with population statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanVarianceNormalizer {
    pub column: NumericColumn,
    pub mean: f64,
    pub std_dev: f64,
}

impl MeanVarianceNormalizer {
    pub fn fit(column: NumericColumn, rows: &[FeatureRow]) -> Self {
        if rows.is_empty() {
            return Self {
                column,
                mean: 0.0,
                std_dev: 0.0,
            };
        }
        let n = rows.len() as f64;
        let mean = rows.iter().map(|r| column.value(r)).sum::<f64>() / n;
        let variance = rows
            .iter()
            .map(|r| (column.value(r) - mean).powi(2))
            .sum::<f64>()
            / n;
        Self {
            column,
            mean,
            std_dev: variance.sqrt(),
        }
    }

    /// Constant columns carry no signal and map to 0.
    pub fn apply(&self, row: &FeatureRow) -> f64 {
        if self.std_dev == 0.0 {
            0.0
        } else {
            (self.column.value(row) - self.mean) / self.std_dev
        }
    }
}

/// Fitted transformation from a feature row to the model's input vector:
/// project, repo and author indicator blocks followed by the normalized
/// numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePipeline {
    pub encoders: Vec<OneHotEncoder>,
    pub normalizers: Vec<MeanVarianceNormalizer>,
}

impl FeaturePipeline {
    pub fn fit(rows: &[FeatureRow]) -> Self {
        Self {
            encoders: CategoricalColumn::ALL
                .iter()
                .map(|&c| OneHotEncoder::fit(c, rows))
                .collect(),
            normalizers: NumericColumn::ALL
                .iter()
                .map(|&c| MeanVarianceNormalizer::fit(c, rows))
                .collect(),
        }
    }

    /// Length of every vector `transform` produces.
    pub fn width(&self) -> usize {
        self.encoders.iter().map(OneHotEncoder::width).sum::<usize>() + self.normalizers.len()
    }

    pub fn transform(&self, row: &FeatureRow) -> Vec<f64> {
        let mut features = Vec::with_capacity(self.width());
        for encoder in &self.encoders {
            encoder.encode_into(row, &mut features);
        }
        features.extend(self.normalizers.iter().map(|n| n.apply(row)));
        features
    }

    /// The training target: lifetime in hours.
    pub fn label(row: &FeatureRow) -> f64 {
        row.lifetime as f64
    }
}
