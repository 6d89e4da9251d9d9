//! README written alongside every backup.
//!
//! The content depends only on the request, never on the clock, so an
//! unchanged file set produces an identical tree.

use super::SyncRequest;
use std::collections::BTreeMap;

pub const README_PATH: &str = "README.md";

pub fn render(request: &SyncRequest) -> String {
    let title = if request.title.trim().is_empty() {
        "Generated project"
    } else {
        request.title.trim()
    };

    let mut out = format!(
        "# {title}\n\n\
         This repository is an automatic backup of a sandbox project.\n\n\
         **Project ID:** {}\n",
        request.project_id
    );
    if !request.sandbox_url.is_empty() {
        out.push_str(&format!("**Sandbox URL:** {}\n", request.sandbox_url));
    }
    out.push_str("\n## Files\n\n");
    for path in request.files.keys() {
        out.push_str(&format!("- {path}\n"));
    }
    out
}

/// The request's files plus the generated README. A README supplied by the
/// project itself wins.
pub fn files_with_readme(request: &SyncRequest) -> BTreeMap<String, String> {
    let mut files = request.files.clone();
    files
        .entry(README_PATH.to_string())
        .or_insert_with(|| render(request));
    files
}
