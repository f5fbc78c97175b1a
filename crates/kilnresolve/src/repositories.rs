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

//! Remote-repository list assembly: active profiles, the built-in default,
//! mirror/proxy/credential injection and de-duplication.

use std::collections::HashSet;
use std::sync::Arc;

use kilnutil::repo::{RemoteRepository, RepositoryAuth, DEFAULT_REMOTE_REPO_ID};
use kilnutil::settings::{DeclaredRepository, EffectiveSettings, SettingsProfile};
use thiserror::Error;

use crate::settings::{SettingsError, SettingsResolver};

/// One invalid repository declaration, kept for aggregated diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryProblem {
    pub profile_id: String,
    pub repository_id: String,
    pub message: String,
}

impl std::fmt::Display for RepositoryProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "profile `{}`, repository `{}`: {}",
            self.profile_id, self.repository_id, self.message
        )
    }
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("could not read settings")]
    Settings(#[source] SettingsError),
    /// Assembly does not partially apply; every invalid declaration found is
    /// reported so one pass surfaces all diagnostics.
    #[error("invalid repository declarations: {}", format_problems(.0))]
    InvalidRepositories(Vec<RepositoryProblem>),
}

fn format_problems(problems: &[RepositoryProblem]) -> String {
    problems
        .iter()
        .map(RepositoryProblem::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Builds the ordered remote-repository list for artifact and plugin
/// resolution from the active profiles of the effective settings.
pub struct RepositoryAssembler {
    settings: Arc<SettingsResolver>,
}

impl RepositoryAssembler {
    pub fn new(settings: Arc<SettingsResolver>) -> Self {
        RepositoryAssembler { settings }
    }

    pub fn artifact_repositories(
        &self,
        inject_settings: bool,
    ) -> Result<Vec<RemoteRepository>, AssemblyError> {
        self.assemble(|p| p.repositories.as_slice(), inject_settings)
    }

    /// Same algorithm as artifact repositories, sourced from each profile's
    /// plugin-repository list.
    pub fn plugin_repositories(
        &self,
        inject_settings: bool,
    ) -> Result<Vec<RemoteRepository>, AssemblyError> {
        self.assemble(|p| p.plugin_repositories.as_slice(), inject_settings)
    }

    fn assemble(
        &self,
        pick: impl Fn(&SettingsProfile) -> &[DeclaredRepository],
        inject_settings: bool,
    ) -> Result<Vec<RemoteRepository>, AssemblyError> {
        let settings = self
            .settings
            .effective_settings()
            .map_err(AssemblyError::Settings)?;

        let mut problems = Vec::new();
        let mut repositories = Vec::new();
        for profile in settings.active_profiles() {
            for declared in pick(profile) {
                match build_repository(profile, declared) {
                    Ok(repo) => repositories.push(repo),
                    Err(problem) => problems.push(problem),
                }
            }
        }

        if !repositories
            .iter()
            .any(|r| r.id == DEFAULT_REMOTE_REPO_ID)
        {
            repositories.push(RemoteRepository::central());
        }

        if inject_settings {
            inject(&mut repositories, &settings, &self.settings);
        }

        if !problems.is_empty() {
            return Err(AssemblyError::InvalidRepositories(problems));
        }

        Ok(dedup(repositories))
    }
}

fn build_repository(
    profile: &SettingsProfile,
    declared: &DeclaredRepository,
) -> Result<RemoteRepository, RepositoryProblem> {
    let problem = |message: &str| RepositoryProblem {
        profile_id: profile.id.clone(),
        repository_id: declared.id.clone(),
        message: message.to_string(),
    };
    if declared.id.trim().is_empty() {
        return Err(problem("repository id must not be empty"));
    }
    if declared.url.trim().is_empty() {
        return Err(problem("repository url must not be empty"));
    }
    let repo = RemoteRepository::new(&declared.id, &declared.url);
    if repo.protocol().is_empty() {
        return Err(problem("repository url has no protocol"));
    }
    Ok(repo)
}

/// Overlay mirrors, then proxies, then per-repository credentials.
fn inject(
    repositories: &mut [RemoteRepository],
    settings: &EffectiveSettings,
    resolver: &SettingsResolver,
) {
    for repo in repositories.iter_mut() {
        if let Some(mirror) = settings
            .mirrors
            .iter()
            .find(|m| m.matches(&repo.id, &repo.url))
        {
            log::debug!("repository {} mirrored by {} ({})", repo.id, mirror.id, mirror.url);
            repo.url = mirror.url.clone();
        }

        repo.proxy = settings.proxy_for(repo.protocol()).cloned();

        if let Some(server) = settings.server(&repo.id) {
            let server = resolver.decrypt(server);
            if let Some(username) = server.username {
                repo.auth = Some(RepositoryAuth {
                    username,
                    password: server.password,
                });
            }
        }
    }
}

/// Keep the first occurrence per identity key, preserving relative order.
fn dedup(repositories: Vec<RemoteRepository>) -> Vec<RemoteRepository> {
    let mut keys = HashSet::new();
    let mut result = Vec::new();
    for repo in repositories {
        if keys.insert(repo.identity_key()) {
            result.push(repo);
        }
    }
    result
}
