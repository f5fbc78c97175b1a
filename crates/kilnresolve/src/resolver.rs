// kiln: Build orchestration and classpath engine for JVM projects.
// Copyright (C) 2024 International Digital Economy Academy
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// For inquiries, you can contact us via e-mail at jichuruanjian@idea.edu.cn.

//! Artifact resolution against the local repository and an assembled remote
//! list, with staleness bookkeeping for cheap unavailability checks.

use std::sync::Arc;

use kilnutil::artifact::{ArtifactCoordinate, ResolvedArtifact};
use kilnutil::progress::ProgressHandle;
use kilnutil::repo::RemoteRepository;
use thiserror::Error;

use crate::repositories::RepositoryAssembler;
use crate::settings::SettingsResolver;
use crate::staleness::{record_key, StalenessCache};
use crate::transport::{ArtifactTransport, TransportOutcome};

/// One underlying cause of a failed resolution.
#[derive(Debug, Error)]
pub enum ResolveFailure {
    #[error("missing {0}")]
    Missing(ArtifactCoordinate),
    #[error("{0}")]
    Transfer(anyhow::Error),
}

/// Every cause of one failed resolution, aggregated.
#[derive(Debug)]
pub struct ResolveFailures(pub Vec<ResolveFailure>);

impl std::fmt::Display for ResolveFailures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for failure in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The caller's progress token was cancelled; not a hard failure.
    #[error("resolution of {0} was cancelled")]
    Cancelled(ArtifactCoordinate),
    #[error("could not resolve {0}: {1}")]
    Unresolved(ArtifactCoordinate, ResolveFailures),
}

impl ResolveError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ResolveError::Cancelled(_))
    }
}

/// Resolves artifact coordinates, delegating transport to the external
/// collaborator and recording a staleness mark for every consulted remote
/// repository, success or failure.
pub struct ArtifactResolver {
    settings: Arc<SettingsResolver>,
    assembler: Arc<RepositoryAssembler>,
    transport: Box<dyn ArtifactTransport>,
}

impl ArtifactResolver {
    pub fn new(
        settings: Arc<SettingsResolver>,
        assembler: Arc<RepositoryAssembler>,
        transport: Box<dyn ArtifactTransport>,
    ) -> Self {
        ArtifactResolver {
            settings,
            assembler,
            transport,
        }
    }

    /// Resolve one coordinate. When `repositories` is not given, the default
    /// assembled list (settings injected) is used; if assembly fails the
    /// remote list is empty and resolution can still succeed from the local
    /// repository alone.
    pub fn resolve(
        &self,
        coordinate: &ArtifactCoordinate,
        repositories: Option<&[RemoteRepository]>,
        progress: &dyn ProgressHandle,
    ) -> Result<ResolvedArtifact, ResolveError> {
        let local_repo = self.settings.local_repository();

        let assembled;
        let repositories: &[RemoteRepository] = match repositories {
            Some(list) => list,
            None => {
                assembled = match self.assembler.artifact_repositories(true) {
                    Ok(list) => list,
                    Err(err) => {
                        // we've tried; local cache is all that's left
                        log::warn!("repository assembly failed for {coordinate}: {err}");
                        Vec::new()
                    }
                };
                &assembled
            }
        };

        if progress.cancelled() {
            return Err(ResolveError::Cancelled(coordinate.clone()));
        }
        progress.message(&format!("Resolving {coordinate}"));

        let outcome = self
            .transport
            .fetch(coordinate, &local_repo, repositories, progress);

        // Checked repositories are recorded regardless of the outcome; this
        // is what makes later unavailability checks cheap.
        if let Err(err) =
            StalenessCache::new(&local_repo).record_checked(coordinate, repositories)
        {
            log::warn!("could not record staleness for {coordinate}: {err}");
        }

        if progress.cancelled() {
            return Err(ResolveError::Cancelled(coordinate.clone()));
        }

        self.into_result(coordinate, outcome, &local_repo)
    }

    fn into_result(
        &self,
        coordinate: &ArtifactCoordinate,
        outcome: TransportOutcome,
        local_repo: &std::path::Path,
    ) -> Result<ResolvedArtifact, ResolveError> {
        if outcome.is_success() {
            let path = outcome.resolved.expect("successful outcome has a path");
            for listener in self.settings.local_repository_listeners() {
                listener.artifact_installed(local_repo, coordinate, &path);
            }
            return Ok(ResolvedArtifact {
                coordinate: coordinate.clone(),
                path,
            });
        }

        let mut causes: Vec<ResolveFailure> =
            outcome.errors.into_iter().map(ResolveFailure::Transfer).collect();
        causes.extend(outcome.missing.into_iter().map(ResolveFailure::Missing));
        if causes.is_empty() {
            // transport reported neither a file nor a cause
            causes.push(ResolveFailure::Missing(coordinate.clone()));
        }
        Err(ResolveError::Unresolved(
            coordinate.clone(),
            ResolveFailures(causes),
        ))
    }

    /// Cheap unavailability check; performs no remote I/O.
    ///
    /// This is a "have we already tried everywhere" heuristic, not a
    /// guarantee: false means the artifact may still be obtainable (present
    /// locally, or some repository has never been checked); true means every
    /// given repository has a recorded prior check and the file is absent.
    pub fn is_unavailable(
        &self,
        coordinate: &ArtifactCoordinate,
        repositories: &[RemoteRepository],
    ) -> bool {
        let local_repo = self.settings.local_repository();

        if coordinate.path_in(&local_repo).is_file() {
            // artifact is available locally
            return false;
        }

        if repositories.is_empty() {
            // nothing more can be done
            return true;
        }

        let records = StalenessCache::new(&local_repo).load(coordinate);
        for repo in repositories {
            if !records.contains_key(&record_key(repo, coordinate)) {
                // this repository has never been checked, availability is
                // still open
                return false;
            }
        }

        true
    }
}
