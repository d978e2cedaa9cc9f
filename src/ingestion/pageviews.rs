//! Seeds projects and page popularity from a Wikimedia pageviews dump.
//!
//! Dump lines look like:
//!
//! ```text
//! en.wikipedia Main_Page desktop A 12345 X
//! ```
//!
//! Every project name seen in the dump is registered; page rows are only
//! accumulated for the requested project, summing views across the access
//! methods a page appears under. Decompression is the caller's concern —
//! any `BufRead` over the decompressed dump works.

use std::collections::{BTreeSet, HashMap};
use std::io::BufRead;

use tracing::{debug, info};

use crate::stores::SqliteStore;
use crate::types::RagError;

/// Page rows inserted per transaction while loading totals into the store.
const PAGE_INSERT_BATCH: usize = 1_000;

/// Aggregated dump contents for one project.
#[derive(Debug, Clone)]
pub struct PageviewTotals {
    /// The project whose pages were kept.
    pub project: String,
    /// Every project name seen in the dump, deduplicated.
    pub projects: Vec<String>,
    /// Per-page accumulated views, sorted by page name.
    pub pages: Vec<(String, i64)>,
}

/// Parses a decompressed pageviews dump, keeping pages of `project` only.
pub fn parse_pageviews<R: BufRead>(reader: R, project: &str) -> Result<PageviewTotals, RagError> {
    let mut projects: BTreeSet<String> = BTreeSet::new();
    let mut pages: HashMap<String, i64> = HashMap::new();

    for line in reader.lines() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let &[project_name, page, size, _access, accumulated_views, _detailed_views] =
            fields.as_slice()
        else {
            continue;
        };
        let project_name = project_name.to_lowercase();
        projects.insert(project_name.clone());
        if project_name != project || size == "null" {
            continue;
        }
        let Ok(views) = accumulated_views.parse::<i64>() else {
            continue;
        };
        *pages.entry(page.to_string()).or_insert(0) += views;
    }

    let mut pages: Vec<(String, i64)> = pages.into_iter().collect();
    pages.sort_by(|a, b| a.0.cmp(&b.0));
    debug!(
        projects = projects.len(),
        pages = pages.len(),
        "parsed pageviews dump"
    );
    Ok(PageviewTotals {
        project: project.to_string(),
        projects: projects.into_iter().collect(),
        pages,
    })
}

/// Loads parsed totals into the store in [`PAGE_INSERT_BATCH`]-row
/// transactions. Returns the number of page rows submitted.
pub async fn load_pageviews(
    store: &SqliteStore,
    totals: PageviewTotals,
) -> Result<usize, RagError> {
    store.register_projects(totals.projects).await?;
    let mut loaded = 0;
    for batch in totals.pages.chunks(PAGE_INSERT_BATCH) {
        store.store_pages(&totals.project, batch.to_vec()).await?;
        loaded += batch.len();
    }
    info!(project = %totals.project, pages = loaded, "pageviews loaded");
    Ok(loaded)
}
