use std::fs;
use std::path::Path;
use std::sync::Arc;

use modbuild::fs::{FileSystem, RealFileSystem};
use modbuild::pipeline::{build_graph, Pipeline};
use modbuild::registry::RegistryOptions;
use modbuild::watch::{ChannelNotifier, DispatchOutcome, WatchDispatcher};
use modbuild_test_utils::builders::ConfigFileBuilder;
use modbuild_test_utils::init_tracing;

#[test]
fn concurrent_atomic_writes_to_one_file_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("statics/modules.js");
    const SIZE: usize = 512 * 1024;

    std::thread::scope(|scope| {
        for writer in 0..4u8 {
            let target = &target;
            scope.spawn(move || {
                let payload = vec![b'a' + writer; SIZE];
                for _ in 0..10 {
                    RealFileSystem.write_atomic(target, &payload).unwrap();
                }
            });
        }
    });

    // Whole content of exactly one writer.
    let bytes = fs::read(&target).unwrap();
    assert_eq!(bytes.len(), SIZE);
    assert!(bytes.iter().all(|b| *b == bytes[0]));

    // No temp files left behind.
    let entries: Vec<_> = fs::read_dir(target.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("modules.js")]);
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn component(name: &str) -> String {
    format!("<template><p>{name}</p></template>\n<script>\nexport default {{\n  name: '{name}',\n}};\n</script>\n")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rebuilds_of_different_modules_both_regenerate_the_manifest() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(&root, "src/modules/Core/module.toml", "priority = 1\ngetters = [\"core/user\"]\n");
    write(&root, "src/modules/Core/state.js", "export default { user: null };\n");
    write(&root, "src/modules/Core/getters.js", "export default { user: s => s.user };\n");
    write(&root, "src/modules/Core/Panel.vue", &component("Panel"));
    write(&root, "src/modules/Billing/module.toml", "dependencies = [\"Core\"]\n");
    write(&root, "src/modules/Billing/state.js", "export default { total: 0 };\n");
    write(&root, "src/modules/Billing/Invoice.vue", &component("Invoice"));

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let pipeline = Arc::new(Pipeline::new(root.clone(), ConfigFileBuilder::new().build(), fs).unwrap());
    let graph = Arc::new(build_graph(&pipeline, RegistryOptions::default()).unwrap());
    let (notifier, mut rx) = ChannelNotifier::new();
    let dispatcher = Arc::new(WatchDispatcher::new(pipeline, graph, Arc::new(notifier)));

    let manifest = root.join("src/statics/modules.js");
    let changed = [
        root.join("src/modules/Core/Panel.vue"),
        root.join("src/modules/Billing/Invoice.vue"),
    ];

    for round in 0..10 {
        // Both rebuilds find the manifest missing and write it.
        let _ = fs::remove_file(&manifest);

        let handles: Vec<_> = changed
            .iter()
            .cloned()
            .map(|path| {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move { dispatcher.on_source_change(&path).await })
            })
            .collect();

        for handle in handles {
            let outcome = handle.await.unwrap();
            assert!(
                matches!(outcome, Ok(DispatchOutcome::Rebuilt { runs: 1 })),
                "round {round}: {outcome:?}"
            );
        }

        let text = fs::read_to_string(&manifest).unwrap();
        assert!(text.contains("\"core/user\""), "round {round}: {text}");
        assert!(text.contains("\"Billing\""), "round {round}: {text}");
    }

    let mut reloads = 0;
    while rx.try_recv().is_ok() {
        reloads += 1;
    }
    assert_eq!(reloads, 20);
}
