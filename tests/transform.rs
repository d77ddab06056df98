use std::path::{Path, PathBuf};

use modbuild::alias::{AliasRule, AliasTable};
use modbuild::errors::ModbuildError;
use modbuild::transform::compile::compile_component;
use modbuild::transform::icons::extract_icons;
use modbuild::transform::minify::minify;
use modbuild::transform::{
    AliasRewrite, Artifact, HeaderStamp, ImportMinOptions, Minify, MinifyOptions,
    PassthroughCompiler, Rename, TransformChain,
};
use modbuild_test_utils::{init_tracing, with_timeout};

const COMPONENT: &str = r#"<template>
  <div class="invoice">
    <template v-if="open"><span>{{ total }}</span></template>
  </div>
</template>

<script>
import Row from './Row.vue';
import store from '/?store/index.js';
export default {
  name: 'Invoice',
  components: { Row },
};
</script>

<style>
.invoice { color: red; }
</style>
"#;

#[test]
fn component_compiles_to_module_with_template() {
    let out = compile_component(COMPONENT).unwrap();
    assert!(out.starts_with("import Row from './Row.vue';"));
    assert!(out.contains("export default {\n  template: \"<div class=\\\"invoice\\\">"));
    // Nested <template> blocks stay inside the outer one.
    assert!(out.contains("<span>{{ total }}</span></template>"));
    assert!(out.contains("name: 'Invoice'"));
    assert!(!out.contains(".invoice { color"));
}

#[test]
fn component_without_template_fails() {
    let err = compile_component("<script>export default {}</script>").unwrap_err();
    assert!(err.to_string().contains("<template>"));
}

#[test]
fn component_without_default_export_fails() {
    let err = compile_component("<template><p/></template><script>const a = 1;</script>")
        .unwrap_err();
    assert!(err.to_string().contains("export default"));
}

#[test]
fn minify_strips_comments_and_whitespace() {
    let src = "// leading\nconst a = 1; /* inline */\nconst b = \"x  y\";\n";
    let out = minify(src, &MinifyOptions::default()).unwrap();
    assert_eq!(out, "const a=1;const b=\"x  y\";\n");
}

#[test]
fn minify_keeps_line_breaks_that_matter() {
    let src = "let x = 1\nlet y = 2\n";
    let out = minify(src, &MinifyOptions::default()).unwrap();
    assert_eq!(out, "let x=1\nlet y=2\n");
}

#[test]
fn minify_preserves_license_comments() {
    let src = "/*! keep me */\nvar a = 1;\n";
    let out = minify(src, &MinifyOptions::default()).unwrap();
    assert_eq!(out, "/*! keep me */\nvar a=1;\n");
}

#[test]
fn minify_copies_regex_and_template_literals() {
    let src = "const re = /a  b\\/c/g;\nconst t = `x  ${ y + `z  w` }  v`;\n";
    let out = minify(src, &MinifyOptions::default()).unwrap();
    assert_eq!(out, "const re=/a  b\\/c/g;const t=`x  ${ y + `z  w` }  v`;\n");
}

#[test]
fn minify_options_control_keys_and_booleans() {
    let src = "var t = true, o = {\"k\": false, \"not-ident\": 1};\n";

    let default = minify(src, &MinifyOptions::default()).unwrap();
    assert_eq!(default, "var t=!0,o={k:!1,\"not-ident\":1};\n");

    let config = minify(src, &MinifyOptions::config()).unwrap();
    assert_eq!(config, "var t=true,o={\"k\":false,\"not-ident\":1};\n");
}

#[test]
fn minify_leaves_booleans_that_are_accessed() {
    let src = "const s = true.toString();\nconst k = false[key];\nconst v = true;\n";
    let out = minify(src, &MinifyOptions::default()).unwrap();
    assert_eq!(out, "const s=true.toString();const k=false[key];const v=!0;\n");
}

#[test]
fn minify_reads_regex_after_control_head() {
    let src = "if (ok) /'/.test(s);\nwhile (f(x)) /a b/.exec(y);\n";
    let out = minify(src, &MinifyOptions::default()).unwrap();
    assert_eq!(out, "if(ok)/'/.test(s);while(f(x))/a b/.exec(y);\n");

    // Other parentheses are still followed by division.
    let div = minify("var h = (a + b) / 2 / c;\n", &MinifyOptions::default()).unwrap();
    assert_eq!(div, "var h=(a+b)/2/c;\n");
}

#[test]
fn minify_reports_unterminated_string_with_line() {
    let err = minify("var a = 1;\nvar s = \"abc\n", &MinifyOptions::default()).unwrap_err();
    assert!(err.to_string().contains("line 2"), "{err}");
}

#[test]
fn header_stamp_is_idempotent() {
    let header = HeaderStamp::new("/* (c) ACME */");
    assert_eq!(header.banner(), "/* (c) ACME */\n");

    let once = header.stamp("var a=1;\n");
    let twice = header.stamp(&once);
    assert_eq!(once, "/* (c) ACME */\nvar a=1;\n");
    assert_eq!(once, twice);
}

#[test]
fn ship_maps_local_references_to_outputs() {
    let opts = ImportMinOptions::new("vue.js", "min.js");
    assert_eq!(opts.ship("./Row.vue").as_deref(), Some("./Row.vue.js"));
    assert_eq!(opts.ship("./util.js").as_deref(), Some("./util.min.js"));
    assert_eq!(opts.ship("./util.js?v=2").as_deref(), Some("./util.min.js?v=2"));
    assert_eq!(opts.ship("./util.min.js"), None);
    assert_eq!(opts.ship("./data.json"), None);

    let dev = opts.with_postfix(Some(ImportMinOptions::dev_postfix(42)));
    assert_eq!(dev.ship("./util.js?v=2").as_deref(), Some("./util.min.js?dev=42"));
    assert_eq!(dev.ship("./util.min.js").as_deref(), Some("./util.min.js?dev=42"));
}

#[test]
fn alias_rewrite_resolves_then_ships_local_imports() {
    let table = AliasTable::new(vec![AliasRule::new("/?store/", "/src/store/")]);
    let stage = AliasRewrite::new(table, ImportMinOptions::new("vue.js", "min.js"));

    let out = stage.rewrite(
        "import Row from './Row.vue';\nimport store from '/?store/index.js';\nimport Vue from 'vue';\n",
    );
    assert!(out.contains("from './Row.vue.js'"));
    assert!(out.contains("from '/src/store/index.min.js'"));
    assert!(out.contains("from 'vue'"));
}

#[test]
fn string_literal_paths_are_rewritten_only_when_enabled() {
    let src = "export default {\"Core\":\"modules/Core/state.js\"};\n";

    let imports_only = AliasRewrite::new(AliasTable::default(), ImportMinOptions::new("vue.js", "min.js"));
    assert_eq!(imports_only.rewrite(src), src);

    let literals = AliasRewrite::new(
        AliasTable::default(),
        ImportMinOptions::new("vue.js", "min.js").with_string_literals(true),
    );
    assert_eq!(
        literals.rewrite(src),
        "export default {\"Core\":\"modules/Core/state.min.js\"};\n"
    );
}

#[test]
fn rename_replaces_last_extension() {
    let rename = Rename::extension("min.js");
    assert_eq!(
        rename.target(Path::new("/p/src/a/util.js")),
        Some(PathBuf::from("/p/src/a/util.min.js"))
    );

    let icons = Rename::extension("js").with_basename("Icons").into_dir("/p/src/statics");
    assert_eq!(
        icons.target(Path::new("/p/fonts/_variables.scss")),
        Some(PathBuf::from("/p/src/statics/Icons.js"))
    );
}

#[test]
fn icons_are_extracted_in_source_order() {
    let scss = r#"
$mdi-icons: (
    "account": F0004,
    "alert": f0026,
    "account": F9999
);
"#;
    let out = extract_icons(scss).unwrap();
    assert_eq!(out, "export default {\"account\":\"F0004\",\"alert\":\"F0026\"};\n");
    assert!(extract_icons("$nothing: 1;").is_err());
}

#[test]
fn chain_rejects_minify_after_header() {
    let err = TransformChain::builder("bad")
        .stage(HeaderStamp::new("/* h */"))
        .stage(Minify::new(MinifyOptions::default()))
        .build()
        .unwrap_err();
    assert!(matches!(err, ModbuildError::ConfigError(msg) if msg.contains("before header")));
}

#[test]
fn chain_rejects_rename_before_other_stages() {
    let err = TransformChain::builder("bad")
        .stage(Rename::extension("min.js"))
        .stage(Minify::new(MinifyOptions::default()))
        .build()
        .unwrap_err();
    assert!(matches!(err, ModbuildError::ConfigError(_)));

    let err = TransformChain::builder("bad")
        .stage(Minify::new(MinifyOptions::default()))
        .stage(PassthroughCompiler)
        .build()
        .unwrap_err();
    assert!(matches!(err, ModbuildError::ConfigError(_)));
}

#[tokio::test]
async fn chain_runs_stages_in_order() {
    init_tracing();
    let chain = TransformChain::builder("scripts")
        .stage(Minify::new(MinifyOptions::default()))
        .stage(AliasRewrite::new(
            AliasTable::default(),
            ImportMinOptions::new("vue.js", "min.js"),
        ))
        .stage(HeaderStamp::new("/* h */"))
        .stage(Rename::extension("min.js"))
        .build()
        .unwrap();
    assert_eq!(chain.stage_names(), vec!["minify", "alias-rewrite", "header", "rename"]);

    let input = Artifact::new("/p/src/app.js", "import a from './a.js';\n\nconst x = 1;\n");
    let out = with_timeout(chain.run(input)).await.unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].source(), Path::new("/p/src/app.js"));
    assert_eq!(out[0].dest_path, PathBuf::from("/p/src/app.min.js"));
    assert_eq!(out[0].content, "/* h */\nimport a from'./a.min.js';const x=1;\n");
}

#[tokio::test]
async fn stage_failure_names_file_and_stage() {
    let chain = TransformChain::builder("scripts")
        .stage(Minify::new(MinifyOptions::default()))
        .build()
        .unwrap();

    let err = chain
        .run(Artifact::new("/p/src/broken.js", "var s = 'oops\n"))
        .await
        .unwrap_err();
    match err {
        ModbuildError::Transform { path, stage, reason } => {
            assert_eq!(path, PathBuf::from("/p/src/broken.js"));
            assert_eq!(stage, "minify");
            assert!(reason.contains("unterminated string"));
        }
        other => panic!("expected Transform error, got {other:?}"),
    }
}
