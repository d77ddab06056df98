// src/transform/icons.rs

use std::sync::LazyLock;

use anyhow::{bail, Result};
use regex::Regex;

use crate::transform::{Artifact, Stage, StageFuture, StageKind};

/// `"name": F01C9` entries of an icon-font SCSS map.
static ICON_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']([A-Za-z0-9_-]+)["']\s*:\s*([0-9A-Fa-f]{2,6})\b"#)
        .expect("icon entry regex is valid")
});

/// Turns an icon-font SCSS variables file into a JS module mapping icon
/// names to code points.
#[derive(Debug, Clone, Default)]
pub struct IconExtract;

impl Stage for IconExtract {
    fn name(&self) -> &str {
        "icon-extract"
    }

    fn kind(&self) -> StageKind {
        StageKind::Extract
    }

    fn apply(&self, artifact: Artifact) -> StageFuture<'_> {
        Box::pin(async move {
            let module = extract_icons(&artifact.content)?;
            Ok(vec![artifact.with_content(module)])
        })
    }
}

/// Render `export default {"name":"F01C9",...};` in source order. Later
/// duplicates of a name are ignored.
pub fn extract_icons(scss: &str) -> Result<String> {
    let mut seen = std::collections::HashSet::new();
    let mut entries = Vec::new();

    for caps in ICON_ENTRY.captures_iter(scss) {
        let name = caps[1].to_string();
        if seen.insert(name.clone()) {
            entries.push(format!(
                "{}:{}",
                serde_json::to_string(&name)?,
                serde_json::to_string(&caps[2].to_ascii_uppercase())?
            ));
        }
    }

    if entries.is_empty() {
        bail!("no icon entries found");
    }

    Ok(format!("export default {{{}}};\n", entries.join(",")))
}
