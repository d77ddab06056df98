// src/pipeline/chains.rs

use std::path::PathBuf;

use crate::alias::AliasTable;
use crate::errors::Result;
use crate::pipeline::{now_millis, Pipeline};
use crate::transform::{
    AliasRewrite, CommandStage, ComponentCompiler, HeaderStamp, IconExtract, ImportMinOptions,
    Minify, MinifyOptions, PassthroughCompiler, Rename, TransformChain,
};

impl Pipeline {
    fn import_min(&self) -> ImportMinOptions {
        ImportMinOptions::new(
            self.config.components.extension.clone(),
            self.config.scripts.extension.clone(),
        )
    }

    fn header(&self) -> Option<HeaderStamp> {
        self.config.project.banner().map(HeaderStamp::new)
    }

    /// compile -> alias-rewrite -> minify -> header -> rename
    pub fn component_chain(&self) -> Result<TransformChain> {
        let builder = TransformChain::builder("components");
        let builder = match &self.config.components.compiler {
            Some(cmd) => builder.stage(CommandStage::new("component-compiler", cmd.clone())),
            None => builder.stage(ComponentCompiler::new()),
        };
        builder
            .stage(AliasRewrite::new(self.aliases.clone(), self.import_min()))
            .stage(Minify::new(MinifyOptions::default()))
            .maybe(self.header())
            .stage(Rename::extension(self.config.components.extension.clone()))
            .build()
    }

    /// minify -> alias-rewrite -> header -> rename
    pub fn script_chain(&self, dev: bool) -> Result<TransformChain> {
        let postfix = (dev && self.config.dev.cache_bust)
            .then(|| ImportMinOptions::dev_postfix(now_millis()));

        TransformChain::builder("scripts")
            .stage(Minify::new(MinifyOptions::default()))
            .stage(AliasRewrite::new(
                self.aliases.clone(),
                self.import_min().with_postfix(postfix),
            ))
            .maybe(self.header())
            .stage(Rename::extension(self.config.scripts.extension.clone()))
            .build()
    }

    /// Generated configuration keeps quoted keys and literal booleans, and
    /// its string-literal paths point at shipped files.
    pub fn generated_chain(&self) -> Result<TransformChain> {
        TransformChain::builder("generated")
            .stage(Minify::new(MinifyOptions::config()))
            .stage(AliasRewrite::new(
                AliasTable::default(),
                self.import_min().with_string_literals(true),
            ))
            .maybe(self.header())
            .stage(Rename::extension(self.config.scripts.extension.clone()))
            .build()
    }

    pub fn style_chain(&self) -> Result<TransformChain> {
        let builder = TransformChain::builder("styles");
        let builder = match &self.config.styles.compiler {
            Some(cmd) => builder.stage(CommandStage::new("style-compiler", cmd.clone())),
            None => builder.stage(PassthroughCompiler),
        };
        builder
            .stage(Rename::extension(self.config.styles.extension.clone()))
            .build()
    }

    /// icon-extract -> header -> rename to `[icons].dest`
    pub fn icon_chain(&self) -> Result<TransformChain> {
        let dest = self
            .config
            .icons
            .as_ref()
            .map(|icons| self.root.join(&icons.dest))
            .unwrap_or_else(|| self.source_root.join("Icons.js"));

        let basename = dest
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Icons".to_string());
        let extension = dest
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "js".to_string());
        let dir = dest.parent().map(PathBuf::from).unwrap_or_default();

        TransformChain::builder("icons")
            .stage(IconExtract)
            .maybe(self.header())
            .stage(Rename::extension(extension).with_basename(basename).into_dir(dir))
            .build()
    }
}
