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

//! Classpath synthesis: maps a project's source/resource/test roots and the
//! plan's compiler compliance levels onto an ordered classpath descriptor.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use kilnutil::progress::ProgressHandle;
use kilnutil::project::{ExecutionPlan, ProjectModel};
use thiserror::Error;

use crate::plan::{compiler_level, ParameterSource};

pub const JRE_CONTAINER: &str = "org.eclipse.jdt.launching.JRE_CONTAINER";
pub const JRE_CONTAINER_VM_TYPE: &str =
    "org.eclipse.jdt.internal.debug.ui.launcher.StandardVMType";
pub const DEPENDENCY_CONTAINER: &str = "kiln.BUILDPATH_CONTAINER";

pub const SOURCE_LEVELS: &[&str] = &["1.1", "1.2", "1.3", "1.4", "1.5", "1.6", "1.7"];
pub const TARGET_LEVELS: &[&str] = &["1.1", "1.2", "1.3", "1.4", "jsr14", "1.5", "1.6", "1.7"];

pub const DEFAULT_COMPILER_LEVEL: &str = "1.4";

/// Compiler target level to execution-environment identity, in level order.
/// `jsr14` bytecode runs on a 1.5 runtime, hence the shared entry.
const ENVIRONMENTS: &[(&str, &str)] = &[
    ("1.1", "JRE-1.1"),
    ("1.2", "J2SE-1.2"),
    ("1.3", "J2SE-1.3"),
    ("1.4", "J2SE-1.4"),
    ("1.5", "J2SE-1.5"),
    ("jsr14", "J2SE-1.5"),
    ("1.6", "JavaSE-1.6"),
    ("1.7", "JavaSE-1.7"),
];

pub fn execution_environment(level: &str) -> Option<&'static str> {
    ENVIRONMENTS
        .iter()
        .find(|(l, _)| *l == level)
        .map(|(_, env)| *env)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A source folder compiled into `output`.
    Source { output: PathBuf },
    Library,
    Container,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClasspathEntry {
    pub kind: EntryKind,
    pub path: PathBuf,
    pub inclusions: Vec<String>,
    pub exclusions: Vec<String>,
    pub optional: bool,
}

impl ClasspathEntry {
    pub fn source(path: PathBuf, output: PathBuf) -> Self {
        ClasspathEntry {
            kind: EntryKind::Source { output },
            path,
            inclusions: Vec::new(),
            exclusions: Vec::new(),
            optional: false,
        }
    }

    pub fn container(path: PathBuf) -> Self {
        ClasspathEntry {
            kind: EntryKind::Container,
            path,
            inclusions: Vec::new(),
            exclusions: Vec::new(),
            optional: false,
        }
    }

    /// First path segment, the container/library discriminator.
    pub fn head_segment(&self) -> &str {
        self.path
            .iter()
            .next()
            .and_then(|s| s.to_str())
            .unwrap_or("")
    }
}

/// The ordered classpath of one project. Insertion order is classpath
/// order; entries are unique by path, and adding to an existing path
/// replaces the entry in place instead of duplicating it.
///
/// Owned exclusively by one synthesis run; never shared across projects.
#[derive(Debug, Default)]
pub struct ClasspathDescriptor {
    entries: IndexMap<PathBuf, ClasspathEntry>,
}

impl ClasspathDescriptor {
    pub fn add_entry(&mut self, entry: ClasspathEntry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    pub fn add_source_entry(&mut self, path: PathBuf, output: PathBuf) {
        self.add_entry(ClasspathEntry::source(path, output));
    }

    pub fn remove_entry(&mut self, path: &Path) -> Option<ClasspathEntry> {
        self.entries.shift_remove(path)
    }

    pub fn remove_where(&mut self, predicate: impl Fn(&ClasspathEntry) -> bool) {
        self.entries.retain(|_, entry| !predicate(entry));
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ClasspathEntry> {
        self.entries.values()
    }

    pub fn find(
        &self,
        predicate: impl Fn(&ClasspathEntry) -> bool,
    ) -> impl Iterator<Item = &ClasspathEntry> {
        self.entries.values().filter(move |e| predicate(*e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The file-system collaborator: folder existence and creation stay with
/// the host workspace.
pub trait WorkspaceFs: Send + Sync {
    fn ensure_dir(&self, path: &Path) -> anyhow::Result<()>;
    fn dir_exists(&self, path: &Path) -> bool;
}

pub struct StdFs;

impl WorkspaceFs for StdFs {
    fn ensure_dir(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }

    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// Which execution environments the host has installed.
pub trait ExecutionEnvironments: Send + Sync {
    fn is_installed(&self, environment_id: &str) -> bool;
}

/// A fixed set of installed environments.
pub struct FixedEnvironments(pub Vec<String>);

impl ExecutionEnvironments for FixedEnvironments {
    fn is_installed(&self, environment_id: &str) -> bool {
        self.0.iter().any(|e| e == environment_id)
    }
}

/// Extension point for downstream configurators (annotation processing
/// paths and the like) to append entries after the standard steps.
pub trait ClasspathContributor: Send + Sync {
    fn contribute(
        &self,
        classpath: &mut ClasspathDescriptor,
        project: &ProjectModel,
        progress: &dyn ProgressHandle,
    ) -> anyhow::Result<()>;
}

/// Classpath synthesis failed for this project's configuration pass.
#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("could not create output folder `{}`", .path.display())]
    OutputFolder {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("classpath contributor failed for {project}")]
    Contributor {
        project: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Compiler options to apply on the owning build unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    pub source: String,
    pub target: String,
}

#[derive(Debug)]
pub struct Synthesis {
    pub classpath: ClasspathDescriptor,
    pub compiler: CompilerOptions,
}

pub struct ClasspathSynthesizer<'a> {
    fs: &'a dyn WorkspaceFs,
    environments: &'a dyn ExecutionEnvironments,
    params: &'a dyn ParameterSource,
}

impl<'a> ClasspathSynthesizer<'a> {
    pub fn new(
        fs: &'a dyn WorkspaceFs,
        environments: &'a dyn ExecutionEnvironments,
        params: &'a dyn ParameterSource,
    ) -> Self {
        ClasspathSynthesizer {
            fs,
            environments,
            params,
        }
    }

    /// Synthesize a fresh descriptor for one configuration pass.
    pub fn synthesize(
        &self,
        project: &ProjectModel,
        plan: &ExecutionPlan,
        contributors: &[&dyn ClasspathContributor],
        progress: &dyn ProgressHandle,
    ) -> Result<Synthesis, ClasspathError> {
        let mut classpath = ClasspathDescriptor::default();
        let compiler =
            self.configure(&mut classpath, project, plan, contributors, progress)?;
        Ok(Synthesis { classpath, compiler })
    }

    /// Run the synthesis steps against an existing descriptor. The
    /// remove-then-add pattern of the later steps is what purges stale
    /// configuration from a previous pass without rebuilding the
    /// descriptor from scratch.
    pub fn configure(
        &self,
        classpath: &mut ClasspathDescriptor,
        project: &ProjectModel,
        plan: &ExecutionPlan,
        contributors: &[&dyn ClasspathContributor],
        progress: &dyn ProgressHandle,
    ) -> Result<CompilerOptions, ClasspathError> {
        let output = project.output_path();
        let test_output = project.test_output_path();
        for dir in [&output, &test_output] {
            self.fs
                .ensure_dir(dir)
                .map_err(|source| ClasspathError::OutputFolder {
                    path: dir.clone(),
                    source,
                })?;
        }

        self.add_source_dirs(classpath, project, &project.source_roots, &output);
        self.add_resource_dirs(classpath, project, &project.resource_roots, &output);
        self.add_source_dirs(classpath, project, &project.test_source_roots, &test_output);
        self.add_resource_dirs(
            classpath,
            project,
            &project.test_resource_roots,
            &test_output,
        );

        for contributor in contributors {
            contributor
                .contribute(classpath, project, progress)
                .map_err(|source| ClasspathError::Contributor {
                    project: project.id(),
                    source,
                })?;
        }

        let source = compiler_level(plan, self.params, "source", SOURCE_LEVELS)
            .unwrap_or(DEFAULT_COMPILER_LEVEL);
        let target = compiler_level(plan, self.params, "target", TARGET_LEVELS)
            .unwrap_or(DEFAULT_COMPILER_LEVEL);

        self.add_jre_container(classpath, target);
        add_dependency_container(classpath);

        Ok(CompilerOptions {
            source: source.to_string(),
            target: target.to_string(),
        })
    }

    fn add_source_dirs(
        &self,
        classpath: &mut ClasspathDescriptor,
        project: &ProjectModel,
        roots: &[PathBuf],
        output: &Path,
    ) {
        for root in roots {
            let path = project.resolve_path(root);
            if self.fs.dir_exists(&path) {
                log::debug!("adding source folder {}", path.display());
                classpath.add_source_entry(path, output.to_path_buf());
            } else if classpath.remove_entry(&path).is_some() {
                // the root disappeared between configuration passes
                log::debug!("removing stale source folder {}", path.display());
            }
        }
    }

    fn add_resource_dirs(
        &self,
        classpath: &mut ClasspathDescriptor,
        project: &ProjectModel,
        roots: &[PathBuf],
        output: &Path,
    ) {
        for root in roots {
            let path = project.resolve_path(root);
            if !self.fs.dir_exists(&path) {
                continue;
            }
            if path == project.base_dir {
                // a folder cannot contain its own output folder
                log::warn!("skipping resource folder {}", path.display());
                continue;
            }
            if classpath.contains_path(&path) {
                // already claimed as a source root, keep that entry
                continue;
            }
            log::debug!("adding resource folder {}", path.display());
            let mut entry = ClasspathEntry::source(path, output.to_path_buf());
            entry.exclusions.push("**".to_string());
            classpath.add_entry(entry);
        }
    }

    /// Exactly one JRE container: the environment-specific one when that
    /// environment is installed, the generic default otherwise.
    fn add_jre_container(&self, classpath: &mut ClasspathDescriptor, target: &str) {
        classpath.remove_where(|entry| entry.head_segment() == JRE_CONTAINER);

        let environment = execution_environment(target);
        let path = match environment {
            Some(env) if self.environments.is_installed(env) => {
                [JRE_CONTAINER, JRE_CONTAINER_VM_TYPE, env].iter().collect()
            }
            _ => PathBuf::from(JRE_CONTAINER),
        };
        classpath.add_entry(ClasspathEntry::container(path));
    }
}

/// Exactly one dependency-management container, always fresh.
fn add_dependency_container(classpath: &mut ClasspathDescriptor) {
    classpath.remove_where(|entry| entry.head_segment() == DEPENDENCY_CONTAINER);
    classpath.add_entry(ClasspathEntry::container(PathBuf::from(
        DEPENDENCY_CONTAINER,
    )));
}
