use serde::{Deserialize, Serialize};

/// One page of a cursor-paginated collection.
///
/// `is_last_page` is optional here so a page missing it can be reported as
/// malformed rather than as a generic decode failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    pub is_last_page: Option<bool>,
    pub next_page_start: Option<u64>,
}

/// Entry of the `projects` collection.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSummary {
    pub key: String,
}

/// Entry of the `projects/{key}/repos` collection.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositorySummary {
    pub slug: String,
}

/// A merged pull request as returned by the API.
///
/// Required nesting (`fromRef`, `author`, links, reviewer and participant
/// lists) is enforced when the page is decoded. `closedDate` is optional in
/// the API, so its absence is caught during feature extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRecord {
    pub links: Links,
    pub from_ref: BranchRef,
    pub author: Participant,
    pub created_date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_date: Option<i64>,
    pub reviewers: Vec<Participant>,
    pub participants: Vec<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PullRequestRecord {
    /// The first `self` link, used as the row identifier.
    pub fn self_link(&self) -> Option<&str> {
        self.links.self_links.first().map(|l| l.href.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Links {
    #[serde(rename = "self", default)]
    pub self_links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

/// Source branch of a pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRef {
    /// Branch name without the `refs/heads/` prefix, e.g. `feature/login`.
    pub display_id: String,
    pub repository: RepositoryRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub slug: String,
    pub project: ProjectRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub key: String,
}

/// Author, reviewer or participant entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_task_count: Option<u64>,
}
