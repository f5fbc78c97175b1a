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

//! The in-memory project model consumed by planning and classpath synthesis.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactCoordinate;
use crate::settings::DeclaredRepository;

/// One buildable project. Root paths are interpreted relative to `base_dir`
/// unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectModel {
    pub coordinate: ArtifactCoordinate,
    pub packaging: String,
    pub base_dir: PathBuf,
    #[serde(default)]
    pub source_roots: Vec<PathBuf>,
    #[serde(default)]
    pub test_source_roots: Vec<PathBuf>,
    #[serde(default)]
    pub resource_roots: Vec<PathBuf>,
    #[serde(default)]
    pub test_resource_roots: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub test_output_dir: PathBuf,
    /// Ids of sibling reactor modules this project depends on.
    #[serde(default)]
    pub module_deps: Vec<String>,
    #[serde(default)]
    pub declared_repositories: Vec<DeclaredRepository>,
}

impl ProjectModel {
    /// Module identity inside a reactor: `group:artifact`.
    pub fn id(&self) -> String {
        format!(
            "{}:{}",
            self.coordinate.group_id, self.coordinate.artifact_id
        )
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve_path(&self.output_dir)
    }

    pub fn test_output_path(&self) -> PathBuf {
        self.resolve_path(&self.test_output_dir)
    }
}

/// A module of a multi-module reactor, reduced to what ordering needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactorModule {
    pub id: String,
    pub deps: BTreeSet<String>,
}

impl ReactorModule {
    pub fn new(id: &str, deps: impl IntoIterator<Item = &'static str>) -> Self {
        ReactorModule {
            id: id.to_string(),
            deps: deps.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn of_project(project: &ProjectModel) -> Self {
        ReactorModule {
            id: project.id(),
            deps: project.module_deps.iter().cloned().collect(),
        }
    }
}

/// One planned plugin-goal invocation. Immutable once the plan is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalExecution {
    pub group_id: String,
    pub artifact_id: String,
    pub goal: String,
    #[serde(default)]
    pub execution_id: Option<String>,
    /// Declared configuration parameters, in declaration order.
    #[serde(default)]
    pub configuration: IndexMap<String, serde_json::Value>,
}

impl GoalExecution {
    pub fn new(group_id: &str, artifact_id: &str, goal: &str) -> Self {
        GoalExecution {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            goal: goal.to_string(),
            execution_id: None,
            configuration: IndexMap::new(),
        }
    }

    pub fn with_config(mut self, name: &str, value: &str) -> Self {
        self.configuration
            .insert(name.to_string(), serde_json::Value::String(value.into()));
        self
    }

    /// Identity of the owning plugin, `group:artifact`.
    pub fn plugin_key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }
}

impl std::fmt::Display for GoalExecution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.goal)
    }
}

/// Ordered plugin-goal executions for one project and one goal list.
/// Order is execution order. Created fresh per build pass, never cached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionPlan {
    pub executions: Vec<GoalExecution>,
}

impl ExecutionPlan {
    pub fn new(executions: Vec<GoalExecution>) -> Self {
        ExecutionPlan { executions }
    }

    pub fn iter(&self) -> impl Iterator<Item = &GoalExecution> {
        self.executions.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}
