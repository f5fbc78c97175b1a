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

//! A whole configuration pass: order the reactor, plan each module, and
//! synthesize its classpath.

use std::path::Path;
use std::sync::Arc;

use kilnbuild::classpath::{
    ClasspathSynthesizer, EntryKind, FixedEnvironments, StdFs, DEPENDENCY_CONTAINER,
    JRE_CONTAINER,
};
use kilnbuild::plan::{
    BuildSession, ConfigParameterSource, ExecutionPlanner, LifecyclePlanner,
    COMPILER_PLUGIN_ARTIFACT_ID, COMPILER_PLUGIN_GROUP_ID,
};
use kilnbuild::reactor;
use kilnresolve::settings::SettingsResolver;
use kilnutil::artifact::ArtifactCoordinate;
use kilnutil::progress::SilentProgress;
use kilnutil::project::{GoalExecution, ProjectModel, ReactorModule};

/// The default jar lifecycle, trimmed to what configuration reads. The
/// main and test compilations declare different levels on purpose: the
/// effective level must not regress below the highest one.
struct JarLifecycle;

impl LifecyclePlanner for JarLifecycle {
    fn expand(
        &self,
        session: &BuildSession,
        _goals: &[String],
    ) -> anyhow::Result<Vec<GoalExecution>> {
        anyhow::ensure!(
            session.project.packaging == "jar",
            "unsupported packaging {}",
            session.project.packaging
        );
        Ok(vec![
            GoalExecution::new(
                "org.apache.maven.plugins",
                "maven-resources-plugin",
                "resources",
            ),
            GoalExecution::new(
                COMPILER_PLUGIN_GROUP_ID,
                COMPILER_PLUGIN_ARTIFACT_ID,
                "compile",
            )
            .with_config("source", "1.6")
            .with_config("target", "1.6"),
            GoalExecution::new(
                COMPILER_PLUGIN_GROUP_ID,
                COMPILER_PLUGIN_ARTIFACT_ID,
                "testCompile",
            )
            .with_config("source", "1.5")
            .with_config("target", "1.5"),
            GoalExecution::new("org.apache.maven.plugins", "maven-jar-plugin", "jar"),
        ])
    }
}

fn project(base: &Path, artifact_id: &str, module_deps: Vec<String>) -> ProjectModel {
    for root in ["src/main/java", "src/test/java"] {
        std::fs::create_dir_all(base.join(root)).unwrap();
    }
    ProjectModel {
        coordinate: ArtifactCoordinate::new("org.example", artifact_id, "1.0"),
        packaging: "jar".into(),
        base_dir: base.to_path_buf(),
        source_roots: vec!["src/main/java".into()],
        test_source_roots: vec!["src/test/java".into()],
        resource_roots: vec!["src/main/resources".into()],
        test_resource_roots: vec![],
        output_dir: "target/classes".into(),
        test_output_dir: "target/test-classes".into(),
        module_deps,
        declared_repositories: vec![],
    }
}

#[test]
fn configures_a_two_module_reactor() {
    let dir = tempfile::tempdir().unwrap();
    let app = project(
        &dir.path().join("app"),
        "app",
        vec!["org.example:lib".into()],
    );
    let lib = project(&dir.path().join("lib"), "lib", vec![]);

    // declaration order puts the dependent first; the reactor flips it
    let modules = vec![
        ReactorModule::of_project(&app),
        ReactorModule::of_project(&lib),
    ];
    let order = reactor::sort(&modules).unwrap();
    let ordered_ids: Vec<&str> = order.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ordered_ids, ["org.example:lib", "org.example:app"]);

    let settings = Arc::new(SettingsResolver::new());
    let planner = ExecutionPlanner::new(settings);
    let environments = FixedEnvironments(vec!["JavaSE-1.6".to_string()]);
    let synthesizer = ClasspathSynthesizer::new(&StdFs, &environments, &ConfigParameterSource);

    for project in [&lib, &app] {
        let request = planner.create_request().with_goals(["install"]);
        let plan = planner
            .calculate_plan(&request, project, &JarLifecycle)
            .unwrap();
        assert_eq!(plan.executions.len(), 4);

        let synthesis = synthesizer
            .synthesize(project, &plan, &[], &SilentProgress)
            .unwrap();

        // one SOURCE entry per existing root
        let sources: Vec<_> = synthesis
            .classpath
            .find(|e| matches!(e.kind, EntryKind::Source { .. }))
            .map(|e| e.path.clone())
            .collect();
        assert_eq!(
            sources,
            [
                project.base_dir.join("src/main/java"),
                project.base_dir.join("src/test/java"),
            ]
        );

        // the higher of the two declared levels selects the environment
        let jre: Vec<_> = synthesis
            .classpath
            .find(|e| e.head_segment() == JRE_CONTAINER)
            .collect();
        assert_eq!(jre.len(), 1);
        assert!(jre[0].path.ends_with("JavaSE-1.6"));
        assert_eq!(
            synthesis
                .classpath
                .find(|e| e.head_segment() == DEPENDENCY_CONTAINER)
                .count(),
            1
        );
        assert_eq!(synthesis.compiler.source, "1.6");
        assert_eq!(synthesis.compiler.target, "1.6");

        // entries are unique by path
        let mut paths: Vec<_> = synthesis.classpath.entries().map(|e| &e.path).collect();
        let total = paths.len();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), total);

        assert!(project.output_path().is_dir());
        assert!(project.test_output_path().is_dir());
    }
}
