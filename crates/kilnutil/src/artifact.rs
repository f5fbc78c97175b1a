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

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ARTIFACT_KIND: &str = "jar";

/// Identity of one resolvable artifact.
///
/// `kind` is the packaging/file type (`jar`, `pom`, ...); the classifier is
/// optional and distinguishes secondary artifacts (`sources`, `javadoc`, ...).
/// Versions are opaque strings: `1.0-SNAPSHOT` and friends are legal, so no
/// ordering beyond equality is defined here.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub kind: String,
    pub classifier: Option<String>,
}

impl ArtifactCoordinate {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        ArtifactCoordinate {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            kind: DEFAULT_ARTIFACT_KIND.to_string(),
            classifier: None,
        }
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = kind.to_string();
        self
    }

    pub fn with_classifier(mut self, classifier: &str) -> Self {
        self.classifier = Some(classifier.to_string());
        self
    }

    /// The classifier as stored in staleness keys: empty when absent.
    pub fn classifier_str(&self) -> &str {
        self.classifier.as_deref().unwrap_or("")
    }

    /// Directory of this artifact inside a local repository, relative to the
    /// repository root. Dots in the group id become path separators.
    pub fn repo_dir(&self) -> PathBuf {
        let mut p = PathBuf::new();
        for seg in self.group_id.split('.') {
            p.push(seg);
        }
        p.push(&self.artifact_id);
        p.push(&self.version);
        p
    }

    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{}.{}", self.artifact_id, self.version, c, self.kind),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.kind),
        }
    }

    /// Full path of the artifact file inside `local_repo`.
    pub fn path_in(&self, local_repo: &Path) -> PathBuf {
        local_repo.join(self.repo_dir()).join(self.file_name())
    }
}

impl std::fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.version, self.kind
        )?;
        if let Some(c) = &self.classifier {
            write!(f, ":{c}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ArtifactCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 3 || parts.len() > 5 {
            return Err(format!(
                "expected group:artifact:version[:kind[:classifier]], got `{s}`"
            ));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(format!("empty segment in coordinate `{s}`"));
        }
        let mut coord = ArtifactCoordinate::new(parts[0], parts[1], parts[2]);
        if let Some(kind) = parts.get(3) {
            coord.kind = kind.to_string();
        }
        if let Some(classifier) = parts.get(4) {
            coord.classifier = Some(classifier.to_string());
        }
        Ok(coord)
    }
}

/// An artifact materialized on disk after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub coordinate: ArtifactCoordinate,
    pub path: PathBuf,
}
