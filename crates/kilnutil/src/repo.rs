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

use serde::{Deserialize, Serialize};

use crate::settings::ProxySpec;

/// Reserved id of the built-in default remote repository.
pub const DEFAULT_REMOTE_REPO_ID: &str = "central";

pub const DEFAULT_REMOTE_REPO_URL: &str = "https://repo.maven.apache.org/maven2";

/// A remote repository after settings injection: mirror-rewritten URL,
/// credentials and proxy attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
    pub auth: Option<RepositoryAuth>,
    pub proxy: Option<ProxySpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryAuth {
    pub username: String,
    pub password: Option<String>,
}

impl RemoteRepository {
    pub fn new(id: &str, url: &str) -> Self {
        RemoteRepository {
            id: id.to_string(),
            url: url.to_string(),
            auth: None,
            proxy: None,
        }
    }

    /// The built-in default remote repository.
    pub fn central() -> Self {
        RemoteRepository::new(DEFAULT_REMOTE_REPO_ID, DEFAULT_REMOTE_REPO_URL)
    }

    pub fn username(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.username.as_str())
    }

    /// De-duplication identity: id, url and authenticated username. Two
    /// entries differing only in proxy settings are considered the same
    /// repository.
    pub fn identity_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.id,
            self.url,
            self.username().unwrap_or("")
        )
    }

    pub fn protocol(&self) -> &str {
        self.url.split_once(':').map(|(p, _)| p).unwrap_or("")
    }
}

impl std::fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}
