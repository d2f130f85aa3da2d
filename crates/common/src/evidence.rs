//! Evidence file location
//!
//! Artifacts are produced asynchronously by the UI-interaction layer and
//! associated with a test purely by file-name matching. The locator never
//! fails: a category with no match is simply absent from the returned set.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::config::EvidenceConfig;
use crate::types::EvidenceSet;

/// Prefix the teardown hook uses when saving the final-state screenshot.
const SCREENSHOT_PREFIX: &str = "TEARDOWN_FINAL_STATE_";

/// Locates the evidence files belonging to one test execution.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    screenshot_dir: PathBuf,
    video_dir: PathBuf,
    trace_dir: PathBuf,
}

impl ArtifactLocator {
    pub fn new(config: &EvidenceConfig) -> Self {
        Self {
            screenshot_dir: config.screenshot_dir.clone(),
            video_dir: config.video_dir.clone(),
            trace_dir: config.trace_dir.clone(),
        }
    }

    /// Resolve the screenshot, video and trace for a test display name.
    ///
    /// Ties between several matching files are broken by latest modification
    /// time, so re-runs naturally shadow stale artifacts.
    pub fn locate(&self, display_name: &str) -> EvidenceSet {
        let token = sanitize_name(display_name);
        debug!("locating evidence for '{}' (token '{}')", display_name, token);

        let screenshot_prefix = format!("{}{}", SCREENSHOT_PREFIX, token);
        let set = EvidenceSet {
            screenshot: newest_match(&self.screenshot_dir, "png", |stem| {
                stem.starts_with(&screenshot_prefix)
            }),
            video: newest_match(&self.video_dir, "webm", |stem| stem.starts_with(&token)),
            trace: newest_match(&self.trace_dir, "zip", |stem| stem.contains(&token)),
        };

        for (category, path) in [
            ("screenshot", &set.screenshot),
            ("video", &set.video),
            ("trace", &set.trace),
        ] {
            match path {
                Some(p) => debug!("evidence {}: {}", category, p.display()),
                None => warn!("no {} evidence found for '{}'", category, display_name),
            }
        }
        set
    }

    /// Resolve only the video, for success reports.
    pub fn locate_video(&self, display_name: &str) -> Option<PathBuf> {
        let token = sanitize_name(display_name);
        newest_match(&self.video_dir, "webm", |stem| stem.starts_with(&token))
    }
}

/// Normalize a test display name into the filesystem-safe token artifact
/// names are built from: anything other than alphanumerics, spaces, dashes
/// and underscores becomes an underscore.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Most recently modified file in `dir` with extension `ext` whose stem
/// satisfies `matches`. An unreadable or absent directory yields `None`.
fn newest_match<F>(dir: &Path, ext: &str, matches: F) -> Option<PathBuf>
where
    F: Fn(&str) -> bool,
{
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("evidence dir {} not readable: {}", dir.display(), e);
            return None;
        }
    };

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e != ext).unwrap_or(true) {
            continue;
        }
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem,
            None => continue,
        };
        if !matches(stem) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if newest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
            newest = Some((modified, path));
        }
    }
    newest.map(|(_, path)| path)
}
