// src/pipeline/tasks.rs

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::dag::{series, Task, TaskGraph};
use crate::errors::Result;
use crate::pipeline::Pipeline;
use crate::registry::RegistryOptions;

/// Which files a task works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileScope {
    /// Every matching file under the source root.
    All,
    /// One changed file (absolute path).
    Single(PathBuf),
}

/// Leaf tasks of a full build, in `build` order.
pub const DEFAULT_TASKS: [&str; 5] = ["compile", "icons", "minify", "manifest", "styles"];

/// Name of the full-build group.
pub const BUILD_TASK: &str = "build";

fn pipeline_task<F, Fut>(name: String, pipeline: &Arc<Pipeline>, step: F) -> Task
where
    F: Fn(Arc<Pipeline>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<usize>> + Send + 'static,
{
    let pipeline = Arc::clone(pipeline);
    Task::new(name, move || {
        let fut = step(Arc::clone(&pipeline));
        async move { fut.await.map(|_| ()) }
    })
}

impl Pipeline {
    fn scoped_name(&self, base: &str, scope: &FileScope) -> String {
        match scope {
            FileScope::All => base.to_string(),
            FileScope::Single(path) => {
                let rel = self
                    .source_relative(path)
                    .unwrap_or_else(|| path.to_string_lossy().replace('\\', "/"));
                format!("{base}:{rel}")
            }
        }
    }

    pub fn compile_task(self: &Arc<Self>, scope: FileScope) -> Task {
        let name = self.scoped_name("compile", &scope);
        pipeline_task(name, self, move |p| {
            let scope = scope.clone();
            async move { p.compile_components(&scope).await }
        })
    }

    pub fn minify_task(self: &Arc<Self>, scope: FileScope, dev: bool) -> Task {
        let name = self.scoped_name("minify", &scope);
        pipeline_task(name, self, move |p| {
            let scope = scope.clone();
            async move { p.minify_scripts(&scope, dev).await }
        })
    }

    /// Minify one generated source (or all of them) without regenerating
    /// the manifest.
    pub fn minify_generated_task(self: &Arc<Self>, scope: FileScope) -> Task {
        let name = self.scoped_name("minify-generated", &scope);
        pipeline_task(name, self, move |p| {
            let scope = scope.clone();
            async move { p.minify_generated(&scope).await }
        })
    }

    pub fn manifest_task(self: &Arc<Self>, scope: FileScope, options: RegistryOptions) -> Task {
        let name = self.scoped_name("manifest", &scope);
        pipeline_task(name, self, move |p| {
            let scope = scope.clone();
            async move { p.update_manifest(&scope, &options).await }
        })
    }

    pub fn styles_task(self: &Arc<Self>) -> Task {
        pipeline_task("styles".to_string(), self, |p| async move { p.compile_styles().await })
    }

    pub fn icons_task(self: &Arc<Self>) -> Task {
        pipeline_task("icons".to_string(), self, |p| async move { p.build_icons().await })
    }
}

/// The default task graph:
///
/// ```text
/// compile   components -> *.vue.js
/// icons     icon font map -> Icons.js
/// minify    scripts -> *.min.js
/// manifest  module discovery -> manifest, then minify generated sources
/// styles    stylesheets -> *.css
/// build     series(compile, icons, minify, manifest, styles)
/// ```
pub fn build_graph(pipeline: &Arc<Pipeline>, options: RegistryOptions) -> Result<TaskGraph> {
    let mut graph = TaskGraph::new();

    let leaves = [
        pipeline.compile_task(FileScope::All),
        pipeline.icons_task(),
        pipeline.minify_task(FileScope::All, false),
        pipeline.manifest_task(FileScope::All, options),
        pipeline.styles_task(),
    ];
    for task in leaves {
        graph.add_task(task)?;
    }

    graph.define_group(BUILD_TASK, series(DEFAULT_TASKS))?;
    graph.validate()?;
    Ok(graph)
}
