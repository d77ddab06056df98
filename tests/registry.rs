use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use modbuild::config::RegistrySection;
use modbuild::errors::ModbuildError;
use modbuild::fs::FileSystem;
use modbuild::fs::mock::MockFileSystem;
use modbuild::registry::descriptor::{ModuleDescriptor, ModuleExports};
use modbuild::registry::order::load_order;
use modbuild::registry::{
    render_manifest, ModuleManifest, ModuleRegistry, RegistryOptions, StoreSection,
};
use modbuild_test_utils::builders::{
    module_dir, project_path, ConfigFileBuilder, ProjectBuilder,
};
use modbuild_test_utils::init_tracing;

const CORE: &str = r#"
priority = 10
getters = ["core/user"]
"#;

const BILLING: &str = r#"
dependencies = ["Core"]
getters = ["billing/invoices"]
mutations = ["billing/setInvoices"]
"#;

fn registry(fs: &MockFileSystem) -> ModuleRegistry {
    registry_with(fs, RegistrySection::default())
}

fn registry_with(fs: &MockFileSystem, section: RegistrySection) -> ModuleRegistry {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    ModuleRegistry::new(fs, project_path("src"), section)
}

fn core_billing() -> ProjectBuilder {
    ProjectBuilder::new()
        .module(
            "Core",
            CORE,
            &[("state.js", "export default {}"), ("getters.js", "export default {}")],
        )
        .module(
            "Billing",
            BILLING,
            &[
                ("state.js", "export default {}"),
                ("getters.js", "export default {}"),
                ("mutations.js", "export default {}"),
                ("Invoice.vue", "<template><div/></template>"),
            ],
        )
}

fn names(manifest: &ModuleManifest) -> Vec<&str> {
    manifest.module_names().collect()
}

#[test]
fn core_and_billing_are_ordered_and_aggregated() {
    init_tracing();
    let fs = core_billing().fs();
    let manifest = registry(&fs).discover(&RegistryOptions::default()).unwrap();

    assert_eq!(names(&manifest), vec!["Core", "Billing"]);

    let state: Vec<(&str, &str)> = manifest.state().collect();
    assert_eq!(
        state,
        vec![
            ("Core", "modules/Core/state.js"),
            ("Billing", "modules/Billing/state.js"),
        ]
    );

    let getters = manifest.aggregate(StoreSection::Getters).unwrap();
    assert_eq!(getters.keys().collect::<Vec<_>>(), vec!["core/user", "billing/invoices"]);
    let invoices = getters.get("billing/invoices").unwrap();
    assert_eq!(invoices.module, "Billing");
    assert_eq!(invoices.source, "modules/Billing/getters.js");

    let mutations = manifest.aggregate(StoreSection::Mutations).unwrap();
    assert_eq!(mutations.len(), 1);
    assert!(manifest.aggregate(StoreSection::Actions).unwrap().is_empty());
    assert!(manifest.aggregate(StoreSection::State).is_none());

    let billing = manifest.module("Billing").unwrap();
    assert_eq!(billing.dependencies, vec!["Core".to_string()]);
    assert_eq!(billing.priority, 100);
    assert!(billing.assets.contains("modules/Billing/Invoice.vue"));
    assert!(!billing.assets.contains("modules/Billing/module.toml"));
}

#[test]
fn discovery_is_deterministic_regardless_of_insertion_order() {
    let forward = core_billing().fs();

    // Same tree, files added in reverse order.
    let backward = ProjectBuilder::new()
        .module(
            "Billing",
            BILLING,
            &[
                ("Invoice.vue", "<template><div/></template>"),
                ("mutations.js", "export default {}"),
                ("getters.js", "export default {}"),
                ("state.js", "export default {}"),
            ],
        )
        .module(
            "Core",
            CORE,
            &[("getters.js", "export default {}"), ("state.js", "export default {}")],
        )
        .fs();

    let opts = RegistryOptions::default();
    let a = registry(&forward).discover(&opts).unwrap();
    let b = registry(&backward).discover(&opts).unwrap();
    assert_eq!(a, b);

    let dest = Path::new("/proj/src/statics/modules.js");
    assert_eq!(render_manifest(&a, dest).unwrap(), render_manifest(&b, dest).unwrap());
}

#[test]
fn nested_modules_depend_on_their_parent() {
    let fs = ProjectBuilder::new()
        .simple_module("Core", "")
        .simple_module("Core/Users", "priority = 0")
        .fs();

    let manifest = registry(&fs).discover(&RegistryOptions::default()).unwrap();
    assert_eq!(names(&manifest), vec!["Core", "Core.Users"]);

    let users = manifest.module("Core.Users").unwrap();
    assert_eq!(users.parent.as_deref(), Some("Core"));
    assert_eq!(users.dependencies, vec!["Core".to_string()]);
    assert_eq!(users.root_path, "modules/Core/modules/Users");
    // Nested module files belong to the nested module only.
    let core = manifest.module("Core").unwrap();
    assert!(core.assets.iter().all(|a| !a.contains("Users")));
}

#[test]
fn malformed_modules_are_skipped() {
    init_tracing();
    let fs = ProjectBuilder::new()
        .simple_module("Core", "")
        // No state.js.
        .module("Broken", "", &[("getters.js", "")])
        // Depends on a skipped module.
        .simple_module("Child", r#"dependencies = ["Broken"]"#)
        // Not PascalCase.
        .simple_module("lowercase", "")
        // Declares actions without an actions file.
        .simple_module("Liar", r#"actions = ["liar/doIt"]"#)
        // Unknown descriptor key.
        .simple_module("Typo", "prioritty = 3")
        .fs();

    let manifest = registry(&fs).discover(&RegistryOptions { verbose: true }).unwrap();
    assert_eq!(names(&manifest), vec!["Core"]);
}

#[test]
fn missing_modules_dir_yields_empty_manifest() {
    let fs = ProjectBuilder::new().file("src/app.js", "").fs();
    let manifest = registry(&fs).discover(&RegistryOptions::default()).unwrap();
    assert!(manifest.is_empty());
}

#[test]
fn priority_then_name_breaks_ties() {
    let fs = ProjectBuilder::new()
        .simple_module("Zeta", "priority = 1")
        .simple_module("Beta", "priority = 5")
        .simple_module("Alpha", "priority = 5")
        .fs();

    let manifest = registry(&fs).discover(&RegistryOptions::default()).unwrap();
    assert_eq!(names(&manifest), vec!["Zeta", "Alpha", "Beta"]);
}

#[test]
fn pinned_load_order_wins_among_ready_modules() {
    let fs = ProjectBuilder::new()
        .simple_module("Alpha", "priority = 1")
        .simple_module("Zeta", "priority = 50")
        .simple_module("After", r#"dependencies = ["Zeta"]
priority = 0"#)
        .fs();

    let section = RegistrySection {
        load_order: vec!["Zeta".to_string(), "Missing".to_string()],
        ..RegistrySection::default()
    };
    let manifest = registry_with(&fs, section)
        .discover(&RegistryOptions::default())
        .unwrap();
    assert_eq!(names(&manifest), vec!["Zeta", "After", "Alpha"]);
}

#[test]
fn duplicate_export_key_is_a_collision() {
    let fs = ProjectBuilder::new()
        .module(
            "First",
            "priority = 1\ngetters = [\"shared/x\"]",
            &[("state.js", ""), ("getters.js", "")],
        )
        .module(
            "Second",
            "priority = 2\ngetters = [\"shared/x\"]",
            &[("state.js", ""), ("getters.js", "")],
        )
        .fs();

    let err = registry(&fs).discover(&RegistryOptions::default()).unwrap_err();
    match err {
        ModbuildError::KeyCollision {
            section,
            key,
            first,
            second,
        } => {
            assert_eq!(section, "getters");
            assert_eq!(key, "shared/x");
            assert_eq!(first, "First");
            assert_eq!(second, "Second");
        }
        other => panic!("expected KeyCollision, got {other:?}"),
    }
}

#[test]
fn dependency_cycle_is_reported() {
    let fs = ProjectBuilder::new()
        .simple_module("Core", "")
        .simple_module("Apple", r#"dependencies = ["Pear"]"#)
        .simple_module("Pear", r#"dependencies = ["Apple"]"#)
        .fs();

    let err = registry(&fs).discover(&RegistryOptions::default()).unwrap_err();
    match err {
        ModbuildError::ModuleCycle(members) => {
            assert_eq!(members, vec!["Apple".to_string(), "Pear".to_string()]);
        }
        other => panic!("expected ModuleCycle, got {other:?}"),
    }
}

#[test]
fn manifest_renders_as_es_module_or_json() {
    let fs = core_billing().fs();
    let manifest = registry(&fs).discover(&RegistryOptions::default()).unwrap();

    let js = render_manifest(&manifest, Path::new("/proj/src/statics/modules.js")).unwrap();
    assert!(js.starts_with("export default {"));
    assert!(js.ends_with("};\n"));

    let json = render_manifest(&manifest, Path::new("/proj/src/statics/modules.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 5);
    assert_eq!(value["state"]["Core"], "modules/Core/state.js");
    assert_eq!(value["getters"]["billing/invoices"]["module"], "Billing");
    assert_eq!(value["modules"]["Billing"]["rootPath"], "modules/Billing");

    // Load order survives serialization.
    let module_pos = |name: &str| json.find(&format!("\"{name}\": {{")).unwrap();
    assert!(module_pos("Core") < module_pos("Billing"));
}

#[test]
fn save_manifest_skips_identical_bytes() {
    let fs = core_billing().fs();
    let registry = registry(&fs);
    let manifest = registry.discover(&RegistryOptions::default()).unwrap();

    assert!(registry.save_manifest(&manifest).unwrap());
    fs.clear_written_paths();

    assert!(!registry.save_manifest(&manifest).unwrap());
    assert!(fs.written_paths().is_empty());
}

#[test]
fn failed_manifest_write_leaves_old_file() {
    let fs = core_billing().fs();
    let dest = project_path("src/statics/modules.js");
    fs.add_file(&dest, "export default {};\n");
    fs.set_read_only(project_path("src/statics"));

    let err = registry(&fs)
        .regenerate(&RegistryOptions::default())
        .unwrap_err();
    match err {
        ModbuildError::Write { path, .. } => assert_eq!(path, dest),
        other => panic!("expected Write error, got {other:?}"),
    }
    assert_eq!(fs.read_to_string(&dest).unwrap(), "export default {};\n");
}

#[test]
fn build_outputs_are_not_module_assets() {
    let (pipeline, fs) = core_billing().pipeline(ConfigFileBuilder::new().build());
    fs.add_file(module_dir("Billing").join("Invoice.vue.js"), "compiled");
    fs.add_file(module_dir("Billing").join("state.min.js"), "minified");

    let manifest = pipeline
        .registry()
        .discover(&RegistryOptions::default())
        .unwrap();
    let billing = manifest.module("Billing").unwrap();
    assert!(billing.assets.contains("modules/Billing/Invoice.vue"));
    assert!(!billing.assets.contains("modules/Billing/Invoice.vue.js"));
    assert!(!billing.assets.contains("modules/Billing/state.min.js"));
    assert_eq!(billing.exports.state, "modules/Billing/state.js");
}

fn descriptor(name: &str, dependencies: &[&str]) -> ModuleDescriptor {
    ModuleDescriptor {
        name: name.to_string(),
        root_path: format!("modules/{name}"),
        parent: None,
        priority: 100,
        dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        assets: BTreeSet::new(),
        exports: ModuleExports {
            state: format!("modules/{name}/state.js"),
            getters: None,
            mutations: None,
            actions: None,
        },
    }
}

#[test]
fn load_order_rejects_unknown_dependency() {
    let modules = vec![descriptor("Core", &[]), descriptor("Billing", &["Core", "Ledger"])];

    let err = load_order(modules, &[]).unwrap_err();
    match err {
        ModbuildError::Discovery { module, reason } => {
            assert_eq!(module, "Billing");
            assert!(reason.contains("Ledger"), "{reason}");
        }
        other => panic!("expected Discovery, got {other:?}"),
    }
}

#[test]
fn load_order_puts_dependencies_first() {
    let modules = vec![descriptor("Billing", &["Core"]), descriptor("Core", &[])];
    let names: Vec<String> = load_order(modules, &[])
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["Core", "Billing"]);
}
