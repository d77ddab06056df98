use proptest::prelude::*;

use modbuild::alias::{resolve, rewrite_imports, AliasRule, AliasTable};

fn table() -> AliasTable {
    AliasTable::new(vec![
        AliasRule::new("/?store/", "/src/store/"),
        AliasRule::new("/?Core/", "/src/modules/Core/"),
        AliasRule::new("/?", "/src/"),
    ])
}

#[test]
fn first_matching_rule_wins() {
    let table = table();
    assert_eq!(table.resolve("/?store/index.js"), "/src/store/index.js");
    assert_eq!(table.resolve("/?Core/state.js"), "/src/modules/Core/state.js");
    assert_eq!(table.resolve("/?lib/util.js"), "/src/lib/util.js");
}

#[test]
fn unmatched_path_is_borrowed_unchanged() {
    let table = table();
    let out = table.resolve("./local.js");
    assert!(matches!(out, std::borrow::Cow::Borrowed("./local.js")));
}

#[test]
fn replacement_is_not_rescanned() {
    // The replacement itself starts with a pattern; it must not be resolved again.
    let rules = vec![AliasRule::new("@/", "@/@/")];
    assert_eq!(resolve("@/x.js", &rules), "@/@/x.js");
}

#[test]
fn rewrites_every_import_form() {
    let src = r#"import a from '/?store/a.js';
export { b } from "/?Core/b.js";
import '/?side.js';
const c = import('/?store/c.js');
const s = '/?store/not-an-import.js';
"#;
    let out = rewrite_imports(src, &table());
    assert!(out.contains("import a from '/src/store/a.js'"));
    assert!(out.contains(r#"export { b } from "/src/modules/Core/b.js""#));
    assert!(out.contains("import '/src/side.js'"));
    assert!(out.contains("import('/src/store/c.js')"));
    // Plain string literals are not import specifiers.
    assert!(out.contains("'/?store/not-an-import.js'"));
}

#[test]
fn empty_table_borrows_content() {
    let src = "import a from '/?store/a.js';";
    let out = rewrite_imports(src, &AliasTable::default());
    assert!(matches!(out, std::borrow::Cow::Borrowed(_)));
}

proptest! {
    #[test]
    fn resolve_with_empty_table_is_identity(path in "[a-zA-Z0-9_./?-]{0,40}") {
        prop_assert_eq!(resolve(&path, &[]), path.as_str());
    }

    #[test]
    fn resolve_replaces_prefix_exactly_once(
        pattern in "/\\?[a-z]{1,6}/",
        replacement in "/[a-z]{1,8}/",
        rest in "[a-z0-9_/]{0,20}\\.js",
    ) {
        let rules = vec![AliasRule::new(pattern.clone(), replacement.clone())];
        let input = format!("{pattern}{rest}");
        let out = resolve(&input, &rules);
        prop_assert_eq!(out.as_ref(), format!("{replacement}{rest}"));
    }

    #[test]
    fn resolve_ignores_paths_without_the_prefix(rest in "[a-z0-9_/]{0,20}") {
        let rules = vec![AliasRule::new("/?", "/src/")];
        let input = format!("./{rest}");
        prop_assert_eq!(resolve(&input, &rules), input.as_str());
    }
}
