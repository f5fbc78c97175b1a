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

//! The settings-loading collaborator: hosts may substitute their own parser.

use std::path::{Path, PathBuf};

use kilnutil::settings::RawSettings;

/// A human-readable problem found while reading a settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsProblem {
    pub path: Option<PathBuf>,
    pub message: String,
}

impl SettingsProblem {
    pub fn new(path: Option<&Path>, message: impl Into<String>) -> Self {
        SettingsProblem {
            path: path.map(Path::to_path_buf),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SettingsProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Parses one settings file into its raw form. Parsing syntax is opaque to
/// the rest of the engine; the shipped implementation reads JSON.
pub trait SettingsLoader: Send + Sync {
    /// A `None` file or a file that does not exist parses as empty settings.
    fn parse(&self, file: Option<&Path>) -> Result<RawSettings, Vec<SettingsProblem>>;
}

/// Default loader: lenient JSON (`settings.json`). Unknown keys are ignored
/// so settings files can carry host-specific sections.
pub struct JsonSettingsLoader;

impl SettingsLoader for JsonSettingsLoader {
    fn parse(&self, file: Option<&Path>) -> Result<RawSettings, Vec<SettingsProblem>> {
        let Some(file) = file else {
            return Ok(RawSettings::default());
        };
        if !file.exists() {
            return Ok(RawSettings::default());
        }
        let content = std::fs::read_to_string(file).map_err(|err| {
            vec![SettingsProblem::new(
                Some(file),
                format!("can not read settings file: {err}"),
            )]
        })?;
        serde_json_lenient::from_str(&content)
            .map_err(|err| vec![SettingsProblem::new(Some(file), err.to_string())])
    }
}
