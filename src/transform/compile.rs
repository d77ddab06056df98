// src/transform/compile.rs

use std::sync::LazyLock;

use anyhow::{anyhow, Context};
use regex::Regex;

use crate::exec::run_filter;
use crate::transform::{Artifact, Stage, StageFuture, StageKind};

static EXPORT_DEFAULT_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"export\s+default\s*\{").expect("export default regex is valid")
});

/// Built-in single-file-component compiler.
///
/// Emits the `<script>` block as an ES module with the `<template>` markup
/// injected as a `template` string property of the default export. Style
/// blocks are ignored.
#[derive(Debug, Clone, Default)]
pub struct ComponentCompiler;

impl ComponentCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for ComponentCompiler {
    fn name(&self) -> &str {
        "component-compiler"
    }

    fn kind(&self) -> StageKind {
        StageKind::Compile
    }

    fn apply(&self, artifact: Artifact) -> StageFuture<'_> {
        Box::pin(async move {
            let compiled = compile_component(&artifact.content)?;
            Ok(vec![artifact.with_content(compiled)])
        })
    }
}

/// Compile one single-file component to an ES module.
pub fn compile_component(source: &str) -> anyhow::Result<String> {
    let script = block(source, "script")
        .ok_or_else(|| anyhow!("component has no <script> block"))?;
    let template = block(source, "template")
        .ok_or_else(|| anyhow!("component has no <template> block"))?;

    let m = EXPORT_DEFAULT_OBJECT
        .find(script)
        .ok_or_else(|| anyhow!("component <script> has no `export default {{` object"))?;

    let literal = serde_json::to_string(template.trim()).context("encoding template")?;

    let mut out = String::with_capacity(script.len() + literal.len() + 16);
    out.push_str(script[..m.end()].trim_start());
    out.push_str("\n  template: ");
    out.push_str(&literal);
    out.push(',');
    out.push_str(&script[m.end()..]);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

/// Inner text of the outermost `<tag ...>...</tag>` block, honouring nested
/// blocks of the same tag.
fn block<'a>(source: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let start = find_open_tag(source, &open, 0)?;
    let body_start = start + source[start..].find('>')? + 1;

    let mut depth = 1usize;
    let mut pos = body_start;
    loop {
        let next_close = source[pos..].find(&close)? + pos;
        match find_open_tag(source, &open, pos) {
            Some(next_open) if next_open < next_close => {
                depth += 1;
                pos = next_open + open.len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(&source[body_start..next_close]);
                }
                pos = next_close + close.len();
            }
        }
    }
}

/// Position of `<tag` followed by whitespace or `>`, so `<templates` does not
/// match `<template`.
fn find_open_tag(source: &str, open: &str, from: usize) -> Option<usize> {
    let mut pos = from;
    while let Some(idx) = source[pos..].find(open) {
        let at = pos + idx;
        match source[at + open.len()..].chars().next() {
            Some(c) if c == '>' || c.is_whitespace() => return Some(at),
            None => return None,
            _ => pos = at + open.len(),
        }
    }
    None
}

/// Any external compiler: pipes the artifact through a shell command.
#[derive(Debug, Clone)]
pub struct CommandStage {
    name: String,
    command: String,
    kind: StageKind,
}

impl CommandStage {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            kind: StageKind::Compile,
        }
    }

    pub fn with_kind(mut self, kind: StageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Stage for CommandStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        self.kind
    }

    fn apply(&self, artifact: Artifact) -> StageFuture<'_> {
        Box::pin(async move {
            let output = run_filter(&self.command, &artifact.content).await?;
            Ok(vec![artifact.with_content(output)])
        })
    }
}

/// Compile stage that leaves the artifact untouched.
#[derive(Debug, Clone, Default)]
pub struct PassthroughCompiler;

impl Stage for PassthroughCompiler {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn kind(&self) -> StageKind {
        StageKind::Compile
    }

    fn apply(&self, artifact: Artifact) -> StageFuture<'_> {
        Box::pin(async move { Ok(vec![artifact]) })
    }
}
