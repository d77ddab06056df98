// src/transform/rewrite.rs

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::alias::{map_import_specifiers, rewrite_imports, AliasTable};
use crate::transform::{Artifact, Stage, StageFuture, StageKind};

/// Path-like string literal ending in `.js` or `.vue`.
static PATH_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(["'])([^"'\s?]+\.(?:js|vue))(["'])"#).expect("path literal regex is valid")
});

/// How local references are pointed at their shipped (compiled/minified) files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMinOptions {
    /// Extension `.vue` imports are rewritten to (`vue.js`).
    pub component_ext: String,
    /// Extension `.js` imports are rewritten to (`min.js`).
    pub script_ext: String,
    /// Also rewrite path-like string literals, not just import specifiers.
    pub string_literals: bool,
    /// Query appended to every rewritten reference (`?dev=1700000000000`).
    pub postfix: Option<String>,
}

impl ImportMinOptions {
    pub fn new(component_ext: impl Into<String>, script_ext: impl Into<String>) -> Self {
        Self {
            component_ext: component_ext.into(),
            script_ext: script_ext.into(),
            string_literals: false,
            postfix: None,
        }
    }

    pub fn with_string_literals(mut self, yes: bool) -> Self {
        self.string_literals = yes;
        self
    }

    pub fn with_postfix(mut self, postfix: Option<String>) -> Self {
        self.postfix = postfix;
        self
    }

    /// Cache-busting postfix for dev rebuilds.
    pub fn dev_postfix(millis: u128) -> String {
        format!("?dev={millis}")
    }

    /// Map one local reference to its shipped form, or `None` to leave it.
    pub fn ship(&self, reference: &str) -> Option<String> {
        let (path, query) = match reference.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (reference, None),
        };

        let shipped_component = format!(".{}", self.component_ext);
        let shipped_script = format!(".{}", self.script_ext);

        let path: Cow<'_, str> = if path.ends_with(&shipped_component)
            || path.ends_with(&shipped_script)
        {
            Cow::Borrowed(path)
        } else if let Some(stem) = path.strip_suffix(".vue") {
            Cow::Owned(format!("{stem}{shipped_component}"))
        } else if let Some(stem) = path.strip_suffix(".js") {
            Cow::Owned(format!("{stem}{shipped_script}"))
        } else {
            return None;
        };

        let out = match (&self.postfix, query) {
            (Some(postfix), _) => format!("{path}{postfix}"),
            (None, Some(query)) => format!("{path}?{query}"),
            (None, None) => path.into_owned(),
        };
        (out != reference).then_some(out)
    }
}

/// Resolves aliases in import specifiers, then points local references at
/// their shipped files.
#[derive(Debug, Clone)]
pub struct AliasRewrite {
    table: AliasTable,
    options: ImportMinOptions,
}

impl AliasRewrite {
    pub fn new(table: AliasTable, options: ImportMinOptions) -> Self {
        Self { table, options }
    }

    pub fn options(&self) -> &ImportMinOptions {
        &self.options
    }

    pub fn rewrite(&self, content: &str) -> String {
        let aliased = rewrite_imports(content, &self.table);

        let shipped = map_import_specifiers(&aliased, |spec| {
            if is_local(spec) {
                self.options.ship(spec)
            } else {
                None
            }
        });

        if !self.options.string_literals {
            return shipped.into_owned();
        }

        PATH_LITERAL
            .replace_all(&shipped, |caps: &Captures<'_>| {
                let whole = caps[0].to_string();
                if caps[1] != caps[3] {
                    return whole;
                }
                match self.options.ship(&caps[2]) {
                    Some(path) => format!("{}{}{}", &caps[1], path, &caps[3]),
                    None => whole,
                }
            })
            .into_owned()
    }
}

/// Relative or root-relative reference; bare package names are left alone.
fn is_local(spec: &str) -> bool {
    spec.starts_with('.') || spec.starts_with('/')
}

impl Stage for AliasRewrite {
    fn name(&self) -> &str {
        "alias-rewrite"
    }

    fn kind(&self) -> StageKind {
        StageKind::Rewrite
    }

    fn apply(&self, artifact: Artifact) -> StageFuture<'_> {
        Box::pin(async move {
            let content = self.rewrite(&artifact.content);
            Ok(vec![artifact.with_content(content)])
        })
    }
}
