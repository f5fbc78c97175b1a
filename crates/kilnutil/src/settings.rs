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

//! Settings model: the raw per-file form and the merged effective snapshot.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One settings file as parsed from disk, before global/user merging.
/// Every section is optional; a missing file behaves like an empty one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSettings {
    pub local_repository: Option<PathBuf>,
    pub offline: Option<bool>,
    pub mirrors: Vec<MirrorSpec>,
    pub proxies: Vec<ProxySpec>,
    pub servers: Vec<ServerCredential>,
    pub profiles: Vec<SettingsProfile>,
    pub active_profiles: Vec<String>,
}

/// Merged global+user configuration. Immutable snapshot per resolution;
/// recomputed on explicit reload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectiveSettings {
    pub local_repository: Option<PathBuf>,
    pub offline: bool,
    pub mirrors: Vec<MirrorSpec>,
    pub proxies: Vec<ProxySpec>,
    pub servers: Vec<ServerCredential>,
    pub profiles: Vec<SettingsProfile>,
    pub active_profiles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsProfile {
    pub id: String,
    pub active_by_default: bool,
    pub repositories: Vec<DeclaredRepository>,
    pub plugin_repositories: Vec<DeclaredRepository>,
}

impl SettingsProfile {
    /// Active either by its default-activation flag or by explicit listing
    /// in the active-profile-id set.
    pub fn is_active(&self, active_ids: &[String]) -> bool {
        self.active_by_default || active_ids.iter().any(|id| id == &self.id)
    }
}

/// A repository as declared in a profile, before settings injection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeclaredRepository {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MirrorSpec {
    pub id: String,
    /// Which repositories this mirror serves: `*`, `external:*`, or a
    /// comma-separated id list where `!id` excludes.
    pub mirror_of: String,
    pub url: String,
}

impl MirrorSpec {
    /// Mirror selection semantics: exact id match, `*` wildcard,
    /// `external:*` for non-local repositories, and comma lists with `!`
    /// exclusions. An explicit exclusion always wins.
    pub fn matches(&self, repo_id: &str, repo_url: &str) -> bool {
        let mut result = false;
        for pat in self.mirror_of.split(',').map(str::trim) {
            if let Some(excluded) = pat.strip_prefix('!') {
                if excluded == repo_id {
                    return false;
                }
            } else if pat == repo_id {
                result = true;
            } else if pat == "*" {
                result = true;
            } else if pat == "external:*" && !is_local_url(repo_url) {
                result = true;
            }
        }
        result
    }
}

fn is_local_url(url: &str) -> bool {
    url.starts_with("file:") || url.contains("localhost") || url.contains("127.0.0.1")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxySpec {
    pub id: String,
    pub active: bool,
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub non_proxy_hosts: Option<String>,
}

impl Default for ProxySpec {
    fn default() -> Self {
        ProxySpec {
            id: String::new(),
            active: true,
            protocol: "http".to_string(),
            host: String::new(),
            port: 8080,
            username: None,
            password: None,
            non_proxy_hosts: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerCredential {
    pub id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl EffectiveSettings {
    /// Merge a global and a user settings file into one effective snapshot.
    ///
    /// Scalars from the user file win; list sections concatenate user-first;
    /// profiles and active-profile ids de-duplicate by id keeping the first
    /// (user) occurrence.
    pub fn merge(global: RawSettings, user: RawSettings) -> EffectiveSettings {
        let mut profiles = Vec::new();
        let mut seen = HashSet::new();
        for profile in user.profiles.into_iter().chain(global.profiles) {
            if seen.insert(profile.id.clone()) {
                profiles.push(profile);
            }
        }

        let mut active_profiles = Vec::new();
        for id in user
            .active_profiles
            .into_iter()
            .chain(global.active_profiles)
        {
            if !active_profiles.contains(&id) {
                active_profiles.push(id);
            }
        }

        EffectiveSettings {
            local_repository: user.local_repository.or(global.local_repository),
            offline: user.offline.or(global.offline).unwrap_or(false),
            mirrors: concat(user.mirrors, global.mirrors),
            proxies: concat(user.proxies, global.proxies),
            servers: concat(user.servers, global.servers),
            profiles,
            active_profiles,
        }
    }

    /// Profiles considered active under this snapshot, in declaration order.
    pub fn active_profiles(&self) -> Vec<&SettingsProfile> {
        self.profiles
            .iter()
            .filter(|p| p.is_active(&self.active_profiles))
            .collect()
    }

    pub fn server(&self, id: &str) -> Option<&ServerCredential> {
        self.servers.iter().find(|s| s.id == id)
    }

    /// First active proxy whose protocol matches, case-insensitively.
    pub fn proxy_for(&self, protocol: &str) -> Option<&ProxySpec> {
        self.proxies
            .iter()
            .find(|p| p.active && p.protocol.eq_ignore_ascii_case(protocol))
    }
}

fn concat<T>(mut first: Vec<T>, second: Vec<T>) -> Vec<T> {
    first.extend(second);
    first
}
