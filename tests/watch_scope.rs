use modbuild::types::{ManifestPolicy, TriggerWhileRunningBehaviour};
use modbuild::watch::{Admission, ChangeKind, ChangeQueue, RebuildStep, ScopePolicy};
use modbuild_test_utils::builders::{project_path, ConfigFileBuilder, ProjectBuilder};

fn project() -> ProjectBuilder {
    ProjectBuilder::new()
        .simple_module("Billing", "")
        .file("src/modules/Billing/Invoice.vue", "<template/>")
        .file("src/app/Shell.vue", "<template/>")
        .file("src/app/util.js", "export const a = 1;")
        .file("src/css/main.styl", "body\n  color red")
        .file("src/statics/modules.js", "export default {};")
        .file("src/statics/routes.js", "export default {};")
}

#[test]
fn component_in_a_module_compiles_and_regenerates() {
    let (pipeline, _fs) = project().pipeline(ConfigFileBuilder::new().build());
    let policy = ScopePolicy::new(ManifestPolicy::Always);

    let path = project_path("src/modules/Billing/Invoice.vue");
    let plan = policy.plan(&pipeline, &path, ChangeKind::Modified);
    assert_eq!(
        plan.steps,
        vec![
            RebuildStep::CompileComponent(path.clone()),
            RebuildStep::RegenerateManifest,
        ]
    );
}

#[test]
fn manifest_policy_limits_regeneration() {
    let (pipeline, _fs) = project().pipeline(ConfigFileBuilder::new().build());
    let outside = project_path("src/app/util.js");
    let inside = project_path("src/modules/Billing/Invoice.vue");

    let modules = ScopePolicy::new(ManifestPolicy::Modules);
    assert_eq!(
        modules.plan(&pipeline, &outside, ChangeKind::Modified).steps,
        vec![RebuildStep::MinifyScript(outside.clone())]
    );
    assert!(modules
        .plan(&pipeline, &inside, ChangeKind::Modified)
        .regenerates_manifest());

    let never = ScopePolicy::new(ManifestPolicy::Never);
    assert!(!never
        .plan(&pipeline, &inside, ChangeKind::Modified)
        .regenerates_manifest());
}

#[test]
fn generated_sources_are_only_minified() {
    let config = ConfigFileBuilder::new().with_generated("statics/routes.js").build();
    let (pipeline, _fs) = project().pipeline(config);
    let policy = ScopePolicy::new(ManifestPolicy::Always);

    for rel in ["src/statics/modules.js", "src/statics/routes.js"] {
        let path = project_path(rel);
        let plan = policy.plan(&pipeline, &path, ChangeKind::Modified);
        assert_eq!(plan.steps, vec![RebuildStep::MinifyGenerated(path.clone())]);
        assert!(!plan.regenerates_manifest());
    }
}

#[test]
fn descriptor_change_regenerates_manifest_only() {
    let (pipeline, _fs) = project().pipeline(ConfigFileBuilder::new().build());
    let policy = ScopePolicy::new(ManifestPolicy::Never);

    let path = project_path("src/modules/Billing/module.toml");
    let plan = policy.plan(&pipeline, &path, ChangeKind::Modified);
    assert_eq!(plan.steps, vec![RebuildStep::RegenerateManifest]);
}

#[test]
fn stylesheet_change_rebuilds_all_styles() {
    let (pipeline, _fs) = project().pipeline(ConfigFileBuilder::new().build());
    let policy = ScopePolicy::new(ManifestPolicy::Always);

    let path = project_path("src/css/main.styl");
    let plan = policy.plan(&pipeline, &path, ChangeKind::Modified);
    assert_eq!(plan.steps, vec![RebuildStep::CompileStyles]);
}

#[test]
fn outputs_and_foreign_paths_are_ignored() {
    let (pipeline, _fs) = project().pipeline(ConfigFileBuilder::new().build());
    let policy = ScopePolicy::new(ManifestPolicy::Always);

    for rel in [
        "src/app/util.min.js",
        "src/app/Shell.vue.js",
        "src/statics/modules.min.js",
        "src/css/main.css",
        "Modbuild.toml",
    ] {
        let plan = policy.plan(&pipeline, &project_path(rel), ChangeKind::Modified);
        assert!(plan.is_empty(), "{rel} should not trigger a rebuild: {plan:?}");
    }
}

#[test]
fn removed_sources_only_regenerate() {
    let (pipeline, _fs) = project().pipeline(ConfigFileBuilder::new().build());
    let policy = ScopePolicy::new(ManifestPolicy::Always);

    let path = project_path("src/modules/Billing/Gone.vue");
    let plan = policy.plan(&pipeline, &path, ChangeKind::Removed);
    assert_eq!(plan.steps, vec![RebuildStep::RegenerateManifest]);

    let generated = project_path("src/statics/modules.js");
    assert!(policy.plan(&pipeline, &generated, ChangeKind::Removed).is_empty());
}

#[test]
fn queue_mode_caps_follow_ups() {
    let mut queue = ChangeQueue::new(TriggerWhileRunningBehaviour::Queue, 2);

    assert_eq!(queue.admit("a.js"), Admission::Start);
    assert_eq!(queue.admit("a.js"), Admission::Queued);
    assert_eq!(queue.admit("a.js"), Admission::Queued);
    assert_eq!(queue.admit("a.js"), Admission::Queued);
    assert_eq!(queue.pending("a.js"), 2);

    // Other paths are independent.
    assert_eq!(queue.admit("b.js"), Admission::Start);

    assert!(queue.finish("a.js"));
    assert!(queue.finish("a.js"));
    assert!(!queue.finish("a.js"));
    assert!(!queue.is_running("a.js"));
    assert!(queue.is_running("b.js"));
}

#[test]
fn coalesce_mode_collapses_changes() {
    let mut queue = ChangeQueue::new(TriggerWhileRunningBehaviour::Coalesce, 5);

    assert_eq!(queue.admit("a.js"), Admission::Start);
    for _ in 0..4 {
        assert_eq!(queue.admit("a.js"), Admission::Queued);
    }
    assert_eq!(queue.pending("a.js"), 1);
    assert!(queue.finish("a.js"));
    assert!(!queue.finish("a.js"));
    assert_eq!(queue.admit("a.js"), Admission::Start);
}
