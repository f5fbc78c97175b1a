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

//! Per-artifact "last checked against repository X" records, persisted in
//! the local repository so later unavailability checks skip remote lookups.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use kilnutil::artifact::ArtifactCoordinate;
use kilnutil::repo::RemoteRepository;

/// File name of the record inside each artifact directory.
pub const LAST_CHECKED_FILE: &str = "kiln-last-checked";

/// Key a staleness record line: repository id, pipe-separated username when
/// authenticated, pipe-separated url, pipe-separated classifier. The exact
/// composition is part of the persisted format; records written during one
/// resolution must be found by unrelated unavailability checks later.
pub fn record_key(repo: &RemoteRepository, coordinate: &ArtifactCoordinate) -> String {
    let mut key = String::new();
    key.push_str(&repo.id);
    if let Some(username) = repo.username() {
        key.push('|');
        key.push_str(username);
    }
    key.push('|');
    key.push_str(&repo.url);
    key.push('|');
    key.push_str(coordinate.classifier_str());
    key
}

/// Staleness records of one local repository root.
///
/// Concurrent resolutions of the same coordinate race on the record file;
/// the read-modify-write here loses one of the updates (last writer wins),
/// which is acceptable for a cache of "we already looked" marks.
pub struct StalenessCache {
    root: PathBuf,
}

impl StalenessCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StalenessCache { root: root.into() }
    }

    fn file_of(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        self.root
            .join(coordinate.repo_dir())
            .join(LAST_CHECKED_FILE)
    }

    /// All recorded checks for one artifact. A missing file is an empty
    /// record; unreadable lines are skipped with a warning so one corrupt
    /// entry does not poison the rest.
    pub fn load(&self, coordinate: &ArtifactCoordinate) -> BTreeMap<String, i64> {
        let path = self.file_of(coordinate);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(err) => {
                log::warn!("could not read {}: {err}", path.display());
                return BTreeMap::new();
            }
        };
        let mut records = BTreeMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.rsplit_once('=') {
                Some((key, timestamp)) => match timestamp.parse::<i64>() {
                    Ok(ts) => {
                        records.insert(key.to_string(), ts);
                    }
                    Err(_) => {
                        log::warn!("skipping malformed timestamp in {}: {line}", path.display());
                    }
                },
                None => {
                    log::warn!("skipping malformed line in {}: {line}", path.display());
                }
            }
        }
        records
    }

    /// Whether `repo` has a recorded prior check for this artifact.
    pub fn has_checked(&self, coordinate: &ArtifactCoordinate, repo: &RemoteRepository) -> bool {
        self.load(coordinate)
            .contains_key(&record_key(repo, coordinate))
    }

    /// Stamp "checked now" for every given repository against this artifact.
    /// Existing records for other repositories are kept.
    pub fn record_checked(
        &self,
        coordinate: &ArtifactCoordinate,
        repositories: &[RemoteRepository],
    ) -> anyhow::Result<()> {
        if repositories.is_empty() {
            return Ok(());
        }
        let mut records = self.load(coordinate);
        let now = chrono::Utc::now().timestamp_millis();
        for repo in repositories {
            records.insert(record_key(repo, coordinate), now);
        }

        let path = self.file_of(coordinate);
        let dir = path.parent().expect("record file has a parent directory");
        std::fs::create_dir_all(dir)
            .with_context(|| format!("could not create {}", dir.display()))?;
        let mut out = std::fs::File::create(&path)
            .with_context(|| format!("could not write {}", path.display()))?;
        for (key, timestamp) in &records {
            writeln!(out, "{key}={timestamp}")?;
        }
        Ok(())
    }
}
