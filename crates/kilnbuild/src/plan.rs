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

//! Execution-plan calculation: requests, sessions, and the compiler-level
//! scan over planned executions.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use kilnresolve::settings::SettingsResolver;
use kilnutil::progress::{ProgressHandle, SilentProgress};
use kilnutil::project::{ExecutionPlan, GoalExecution, ProjectModel};
use thiserror::Error;

/// User property stamped into every request so downstream tooling can tell
/// which tool produced it.
pub const TOOL_PROPERTY: &str = "kiln.version";

pub const COMPILER_PLUGIN_GROUP_ID: &str = "org.apache.maven.plugins";
pub const COMPILER_PLUGIN_ARTIFACT_ID: &str = "maven-compiler-plugin";

/// Everything one build/planning pass needs from configuration, captured
/// up front so the pass is immune to concurrent settings reloads.
#[derive(Clone)]
pub struct ExecutionRequest {
    pub global_settings: Option<PathBuf>,
    pub user_settings: Option<PathBuf>,
    pub local_repository: PathBuf,
    pub offline: bool,
    pub goals: Vec<String>,
    pub user_properties: IndexMap<String, String>,
    /// Cancellation and transfer progress for everything this request spawns.
    pub transfer_progress: Arc<dyn ProgressHandle>,
}

impl ExecutionRequest {
    pub fn with_goals(mut self, goals: impl IntoIterator<Item = &'static str>) -> Self {
        self.goals = goals.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandle>) -> Self {
        self.transfer_progress = progress;
        self
    }
}

impl std::fmt::Debug for ExecutionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionRequest")
            .field("global_settings", &self.global_settings)
            .field("user_settings", &self.user_settings)
            .field("local_repository", &self.local_repository)
            .field("offline", &self.offline)
            .field("goals", &self.goals)
            .field("user_properties", &self.user_properties)
            .finish_non_exhaustive()
    }
}

/// A transient session scoped to exactly one project.
pub struct BuildSession<'a> {
    pub request: &'a ExecutionRequest,
    pub project: &'a ProjectModel,
}

/// The lifecycle-execution collaborator: expands requested goals into the
/// ordered plugin-goal executions, including goals implied by the project's
/// packaging lifecycle.
pub trait LifecyclePlanner: Send + Sync {
    fn expand(
        &self,
        session: &BuildSession,
        goals: &[String],
    ) -> anyhow::Result<Vec<GoalExecution>>;
}

/// The project is not buildable with its current configuration.
#[derive(Debug, Error)]
#[error("could not calculate build plan for {project} (goals: {goals:?})")]
pub struct PlanError {
    pub project: String,
    pub goals: Vec<String>,
    #[source]
    pub source: anyhow::Error,
}

pub struct ExecutionPlanner {
    settings: Arc<SettingsResolver>,
}

impl ExecutionPlanner {
    pub fn new(settings: Arc<SettingsResolver>) -> Self {
        ExecutionPlanner { settings }
    }

    /// A fresh request populated from the effective settings. Goals start
    /// empty; callers fill them per invocation.
    pub fn create_request(&self) -> ExecutionRequest {
        let (global_settings, user_settings) = self.settings.settings_files();
        let offline = self
            .settings
            .effective_settings()
            .map(|s| s.offline)
            .unwrap_or(false);

        let mut user_properties = IndexMap::new();
        user_properties.insert(
            TOOL_PROPERTY.to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );

        ExecutionRequest {
            global_settings,
            user_settings,
            local_repository: self.settings.local_repository(),
            offline,
            goals: Vec::new(),
            user_properties,
            transfer_progress: Arc::new(SilentProgress),
        }
    }

    /// Expand the request's goals for one project into an ordered plan.
    /// Collaborator failures are wrapped, never propagated raw.
    pub fn calculate_plan(
        &self,
        request: &ExecutionRequest,
        project: &ProjectModel,
        planner: &dyn LifecyclePlanner,
    ) -> Result<ExecutionPlan, PlanError> {
        let session = BuildSession { request, project };
        planner
            .expand(&session, &request.goals)
            .map(ExecutionPlan::new)
            .map_err(|err| PlanError {
                project: project.id(),
                goals: request.goals.clone(),
                source: err,
            })
    }
}

/// The mojo-parameter extraction collaborator: resolves a named
/// configuration parameter of a planned execution to a string.
pub trait ParameterSource: Send + Sync {
    fn string_param(&self, execution: &GoalExecution, name: &str) -> Option<String>;
}

/// Reads parameters straight from the execution's declared configuration.
pub struct ConfigParameterSource;

impl ParameterSource for ConfigParameterSource {
    fn string_param(&self, execution: &GoalExecution, name: &str) -> Option<String> {
        match execution.configuration.get(name)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

pub fn is_compiler_execution(execution: &GoalExecution) -> bool {
    execution.group_id == COMPILER_PLUGIN_GROUP_ID
        && execution.artifact_id == COMPILER_PLUGIN_ARTIFACT_ID
}

/// The effective compiler level for `parameter` across the whole plan.
///
/// Every compiler-plugin execution is consulted and the MAXIMUM recognized
/// level wins, so a plan with separate main/test compiler executions never
/// regresses below its highest declared level. Unrecognized values keep the
/// previous maximum. `None` when no matching execution declared the
/// parameter; the caller applies the default level.
pub fn compiler_level<'a>(
    plan: &ExecutionPlan,
    params: &dyn ParameterSource,
    parameter: &str,
    levels: &'a [&'a str],
) -> Option<&'a str> {
    let mut level_idx: Option<usize> = None;
    for execution in plan.iter().filter(|e| is_compiler_execution(e)) {
        let Some(value) = params.string_param(execution, parameter) else {
            continue;
        };
        if let Some(idx) = levels.iter().position(|l| *l == value) {
            if level_idx.is_none_or(|cur| idx > cur) {
                level_idx = Some(idx);
            }
        }
    }
    level_idx.map(|idx| levels[idx])
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use super::*;

    const LEVELS: &[&str] = &["1.1", "1.2", "1.3", "1.4", "1.5", "1.6", "1.7"];

    fn compiler_exec(goal: &str, level: Option<&str>) -> GoalExecution {
        let exec = GoalExecution::new(COMPILER_PLUGIN_GROUP_ID, COMPILER_PLUGIN_ARTIFACT_ID, goal);
        match level {
            Some(level) => exec.with_config("source", level),
            None => exec,
        }
    }

    fn project() -> ProjectModel {
        ProjectModel {
            coordinate: kilnutil::artifact::ArtifactCoordinate::new("g", "app", "1"),
            packaging: "jar".into(),
            base_dir: "/work/app".into(),
            source_roots: vec![],
            test_source_roots: vec![],
            resource_roots: vec![],
            test_resource_roots: vec![],
            output_dir: "target/classes".into(),
            test_output_dir: "target/test-classes".into(),
            module_deps: vec![],
            declared_repositories: vec![],
        }
    }

    #[test]
    fn request_carries_settings_and_tool_identity() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("settings.json");
        std::fs::write(
            &user,
            r#"{"localRepository": "/data/repo", "offline": true}"#,
        )
        .unwrap();
        let settings = Arc::new(
            SettingsResolver::new().with_settings_files(None, Some(&user)),
        );
        let planner = ExecutionPlanner::new(settings);
        let request = planner.create_request().with_goals(["install"]);
        assert!(request.offline);
        assert_eq!(request.local_repository, Path::new("/data/repo"));
        assert_eq!(request.user_settings.as_deref(), Some(user.as_path()));
        assert!(request.user_properties.contains_key(TOOL_PROPERTY));
    }

    struct FixedLifecycle(Vec<GoalExecution>);

    impl LifecyclePlanner for FixedLifecycle {
        fn expand(
            &self,
            _session: &BuildSession,
            _goals: &[String],
        ) -> anyhow::Result<Vec<GoalExecution>> {
            Ok(self.0.clone())
        }
    }

    struct FailingLifecycle;

    impl LifecyclePlanner for FailingLifecycle {
        fn expand(
            &self,
            _session: &BuildSession,
            goals: &[String],
        ) -> anyhow::Result<Vec<GoalExecution>> {
            anyhow::bail!("no plugin found for goal {:?}", goals)
        }
    }

    #[test]
    fn plan_preserves_expansion_order() {
        let settings = Arc::new(SettingsResolver::new());
        let planner = ExecutionPlanner::new(settings);
        let request = planner.create_request().with_goals(["install"]);
        let lifecycle = FixedLifecycle(vec![
            compiler_exec("compile", None),
            GoalExecution::new("org.apache.maven.plugins", "maven-surefire-plugin", "test"),
        ]);
        let plan = planner
            .calculate_plan(&request, &project(), &lifecycle)
            .unwrap();
        let goals: Vec<&str> = plan.iter().map(|e| e.goal.as_str()).collect();
        assert_eq!(goals, ["compile", "test"]);
    }

    #[test]
    fn planning_failure_is_wrapped() {
        let settings = Arc::new(SettingsResolver::new());
        let planner = ExecutionPlanner::new(settings);
        let request = planner.create_request().with_goals(["no-such:goal"]);
        let err = planner
            .calculate_plan(&request, &project(), &FailingLifecycle)
            .unwrap_err();
        assert_eq!(err.project, "g:app");
        assert_eq!(err.goals, ["no-such:goal"]);
        expect_test::expect![[r#"could not calculate build plan for g:app (goals: ["no-such:goal"])"#]]
            .assert_eq(&err.to_string());
    }

    #[test]
    fn compiler_level_takes_the_maximum() {
        let plan = ExecutionPlan::new(vec![
            compiler_exec("compile", Some("1.5")),
            compiler_exec("testCompile", Some("1.6")),
            compiler_exec("compile", Some("1.4")),
        ]);
        assert_eq!(
            compiler_level(&plan, &ConfigParameterSource, "source", LEVELS),
            Some("1.6")
        );
    }

    #[test]
    fn compiler_level_ignores_unrecognized_values_and_other_plugins() {
        let mut other = GoalExecution::new("org.example", "some-plugin", "run")
            .with_config("source", "1.7");
        other.execution_id = Some("default".into());
        let plan = ExecutionPlan::new(vec![
            compiler_exec("compile", Some("1.5")),
            compiler_exec("compile", Some("99.9")),
            other,
        ]);
        assert_eq!(
            compiler_level(&plan, &ConfigParameterSource, "source", LEVELS),
            Some("1.5")
        );
    }

    #[test]
    fn compiler_level_without_matches_is_none() {
        let plan = ExecutionPlan::new(vec![compiler_exec("compile", None)]);
        assert_eq!(
            compiler_level(&plan, &ConfigParameterSource, "source", LEVELS),
            None
        );
        assert_eq!(
            compiler_level(&ExecutionPlan::default(), &ConfigParameterSource, "source", LEVELS),
            None
        );
    }
}
