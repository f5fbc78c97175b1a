//! A mock transport for testing purposes; currently only available in tests

use std::collections::{HashMap, HashSet};
use std::path::Path;

use kilnutil::artifact::ArtifactCoordinate;
use kilnutil::progress::ProgressHandle;
use kilnutil::repo::RemoteRepository;

use super::{ArtifactTransport, TransportOutcome};

/// A mock transport, primarily used in tests. Artifacts "exist" in the
/// repositories they were seeded into; fetching one writes a placeholder
/// file into the local repository like a real download would.
#[derive(Default)]
pub struct MockTransport {
    available: HashMap<ArtifactCoordinate, HashSet<String>>,
    broken_repos: HashSet<String>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `coordinate` as present in the repository with id `repo_id`.
    pub fn add_artifact(&mut self, coordinate: &ArtifactCoordinate, repo_id: &str) -> &mut Self {
        self.available
            .entry(coordinate.clone())
            .or_default()
            .insert(repo_id.to_string());
        self
    }

    /// Every fetch attempt against this repository fails with a transfer
    /// error instead of a clean miss.
    pub fn break_repo(&mut self, repo_id: &str) -> &mut Self {
        self.broken_repos.insert(repo_id.to_string());
        self
    }
}

impl ArtifactTransport for MockTransport {
    fn fetch(
        &self,
        coordinate: &ArtifactCoordinate,
        local_repo: &Path,
        repositories: &[RemoteRepository],
        _progress: &dyn ProgressHandle,
    ) -> TransportOutcome {
        let local_file = coordinate.path_in(local_repo);
        if local_file.is_file() {
            return TransportOutcome::success(local_file);
        }

        let mut outcome = TransportOutcome::default();
        for repo in repositories {
            if self.broken_repos.contains(&repo.id) {
                outcome
                    .errors
                    .push(anyhow::anyhow!("transfer from {} failed", repo));
                continue;
            }
            let found = self
                .available
                .get(coordinate)
                .is_some_and(|repos| repos.contains(&repo.id));
            if found {
                std::fs::create_dir_all(local_file.parent().unwrap()).unwrap();
                std::fs::write(&local_file, coordinate.to_string()).unwrap();
                outcome.resolved = Some(local_file);
                return outcome;
            }
        }
        outcome.missing.push(coordinate.clone());
        outcome
    }
}
