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

//! The dependency-resolution collaborator: actual transport and conflict
//! resolution live behind this trait.

#[cfg(test)]
pub mod mock;

use std::path::{Path, PathBuf};

use kilnutil::artifact::ArtifactCoordinate;
use kilnutil::progress::ProgressHandle;
use kilnutil::repo::RemoteRepository;

/// What one fetch attempt produced. `resolved` is the artifact file in the
/// local repository when the attempt succeeded; `errors` and `missing`
/// carry everything that went wrong, per repository attempt.
#[derive(Debug, Default)]
pub struct TransportOutcome {
    pub resolved: Option<PathBuf>,
    pub errors: Vec<anyhow::Error>,
    pub missing: Vec<ArtifactCoordinate>,
}

impl TransportOutcome {
    pub fn success(path: PathBuf) -> Self {
        TransportOutcome {
            resolved: Some(path),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.resolved.is_some() && self.errors.is_empty() && self.missing.is_empty()
    }
}

/// Resolves one coordinate against the local repository and a remote list.
/// Implementations own transport, authentication and proxying; they never
/// decide retry/staleness policy, which stays with the caller.
pub trait ArtifactTransport: Send + Sync {
    fn fetch(
        &self,
        coordinate: &ArtifactCoordinate,
        local_repo: &Path,
        repositories: &[RemoteRepository],
        progress: &dyn ProgressHandle,
    ) -> TransportOutcome;
}
