// src/transform/header.rs

use crate::transform::{Artifact, Stage, StageFuture, StageKind};

/// Prepends the license banner.
///
/// Content that already starts with the banner is left as is, so stamping
/// twice yields the same bytes as stamping once.
#[derive(Debug, Clone)]
pub struct HeaderStamp {
    banner: String,
}

impl HeaderStamp {
    /// `banner` gets a trailing newline if it lacks one.
    pub fn new(banner: impl Into<String>) -> Self {
        let mut banner = banner.into();
        if !banner.ends_with('\n') {
            banner.push('\n');
        }
        Self { banner }
    }

    pub fn banner(&self) -> &str {
        &self.banner
    }

    pub fn stamp(&self, content: &str) -> String {
        if content.starts_with(&self.banner) {
            content.to_string()
        } else {
            format!("{}{}", self.banner, content)
        }
    }
}

impl Stage for HeaderStamp {
    fn name(&self) -> &str {
        "header"
    }

    fn kind(&self) -> StageKind {
        StageKind::Header
    }

    fn apply(&self, artifact: Artifact) -> StageFuture<'_> {
        Box::pin(async move {
            let content = self.stamp(&artifact.content);
            Ok(vec![artifact.with_content(content)])
        })
    }
}
