use serde::{Deserialize, Serialize};

/// Column names of the tabular files, in field order.
pub const HEADER: [&str; 10] = [
    "link",
    "project",
    "repo",
    "lifetime",
    "author",
    "reviewersCount",
    "commentCount",
    "resolvedTasks",
    "descriptionLength",
    "branch",
];

/// One flattened pull request, ready for training.
///
/// Field order is the CSV column order. Serde names are the CSV header names,
/// so writing and reading through `csv` keeps both sides in agreement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRow {
    /// Self link of the pull request
    pub link: String,
    /// Source project key
    pub project: String,
    /// Source repository slug
    pub repo: String,
    /// Hours from creation to close, rounded
    pub lifetime: i64,
    /// Author's user name
    pub author: String,
    /// Reviewers plus participants
    pub reviewers_count: u64,
    pub comment_count: u64,
    pub resolved_tasks: u64,
    /// Characters in the description
    pub description_length: u64,
    /// 1 when the source branch is a `feature/` branch
    pub branch: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_matches_serialized_field_order() {
        let row = FeatureRow {
            link: "l".to_string(),
            project: "p".to_string(),
            repo: "r".to_string(),
            lifetime: 1,
            author: "a".to_string(),
            reviewers_count: 2,
            comment_count: 3,
            resolved_tasks: 4,
            description_length: 5,
            branch: 1,
        };
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(&row).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, HEADER.join(","));
        assert_eq!(
            header,
            "link,project,repo,lifetime,author,reviewersCount,commentCount,resolvedTasks,descriptionLength,branch"
        );
    }
}
