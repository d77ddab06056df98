// src/alias.rs

//! Logical import prefixes (`/?store/`, `/?Core/`, ...) to physical paths.
//!
//! [`resolve`] is the pure primitive; [`rewrite_imports`] applies it to every
//! import specifier inside a module's source text.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::AliasConfig;

/// A single prefix substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRule {
    pub pattern: String,
    pub replacement: String,
}

impl AliasRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

impl From<&AliasConfig> for AliasRule {
    fn from(cfg: &AliasConfig) -> Self {
        Self::new(cfg.pattern.clone(), cfg.replacement.clone())
    }
}

/// Ordered alias table. Earlier rules take priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    rules: Vec<AliasRule>,
}

impl AliasTable {
    pub fn new(rules: Vec<AliasRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(aliases: &[AliasConfig]) -> Self {
        Self::new(aliases.iter().map(AliasRule::from).collect())
    }

    pub fn rules(&self) -> &[AliasRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn resolve<'a>(&self, path: &'a str) -> Cow<'a, str> {
        resolve(path, &self.rules)
    }
}

/// Rewrite `path` with the first rule whose pattern is a prefix of it.
///
/// The substitution happens once; the replacement is never re-scanned.
/// Paths matching no rule come back unchanged (and unallocated).
pub fn resolve<'a>(path: &'a str, table: &[AliasRule]) -> Cow<'a, str> {
    for rule in table {
        if let Some(rest) = path.strip_prefix(rule.pattern.as_str()) {
            return Cow::Owned(format!("{}{}", rule.replacement, rest));
        }
    }
    Cow::Borrowed(path)
}

/// Matches the specifier of `import x from '..'`, `export {x} from '..'`,
/// `import '..'` and `import('..')`.
static IMPORT_SPECIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\bfrom\s*|\bimport\s*\(\s*|\bimport\s+)(['"])([^'"\r\n]+)(['"])"#)
        .expect("import specifier regex is valid")
});

/// Apply `map` to every import specifier in `content`.
///
/// Returns `Cow::Borrowed` when nothing changed.
pub fn map_import_specifiers<'a, F>(content: &'a str, mut map: F) -> Cow<'a, str>
where
    F: FnMut(&str) -> Option<String>,
{
    IMPORT_SPECIFIER.replace_all(content, |caps: &Captures<'_>| {
        let spec = &caps[3];
        let mapped = map(spec).unwrap_or_else(|| spec.to_string());
        format!("{}{}{}{}", &caps[1], &caps[2], mapped, &caps[4])
    })
}

/// Resolve every import specifier in `content` through `table`.
pub fn rewrite_imports<'a>(content: &'a str, table: &AliasTable) -> Cow<'a, str> {
    if table.is_empty() {
        return Cow::Borrowed(content);
    }
    map_import_specifiers(content, |spec| match table.resolve(spec) {
        Cow::Owned(resolved) => Some(resolved),
        Cow::Borrowed(_) => None,
    })
}
