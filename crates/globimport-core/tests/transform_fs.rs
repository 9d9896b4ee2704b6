//! End-to-end transforms against a real project directory.

use globimport_core::dev::{FileEventKind, GlobImportPlugin, ModuleGraph};
use globimport_core::{
    compute_affected_modules, paths, transform_module, AliasResolver, DependencyIndex, Error,
    FsGlobMatcher, GlobImportOptions, NoopResolver,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A project with a handful of modules under `src/`.
fn project() -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/mods/a.ts", "export default 'a';\n");
    write(dir.path(), "src/mods/b.ts", "export default 'b';\n");
    write(dir.path(), "src/mods/.hidden.ts", "export default 'hidden';\n");
    write(dir.path(), "src/mods/node_modules/dep/index.ts", "export default 'dep';\n");
    write(dir.path(), "src/styles/app.css", "body {}\n");
    let root = paths::path_to_posix(dir.path()).trim_end_matches('/').to_string();
    (dir, root)
}

fn takeover() -> GlobImportOptions {
    GlobImportOptions::default().with_takeover(true)
}

#[tokio::test]
async fn lazy_glob_lists_sorted_matches() {
    let (_dir, root) = project();
    let id = format!("{root}/src/main.ts");

    let out = transform_module(
        "const m = import.meta.glob('./mods/*.ts');\n",
        &id,
        &root,
        &NoopResolver,
        &takeover(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(
        out.code,
        "const m = {\n\"./mods/a.ts\": () => import(\"./mods/a.ts\"),\n\"./mods/b.ts\": () => import(\"./mods/b.ts\")\n};\n"
    );
    assert_eq!(out.globs[0].resolved, vec![format!("{root}/src/mods/*.ts")]);
}

#[tokio::test]
async fn eager_glob_hoists_imports() {
    let (_dir, root) = project();
    let id = format!("{root}/src/main.ts");

    let out = transform_module(
        "const m = import.meta.glob('./mods/*.ts', { eager: true });\n",
        &id,
        &root,
        &NoopResolver,
        &takeover(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(
        out.code,
        "import * as __glob_import_0_0 from \"./mods/a.ts\"\n\
         import * as __glob_import_0_1 from \"./mods/b.ts\"\n\
         const m = {\n\"./mods/a.ts\": __glob_import_0_0,\n\"./mods/b.ts\": __glob_import_0_1\n};\n"
    );
}

#[tokio::test]
async fn exhaustive_includes_dotfiles_and_node_modules() {
    let (_dir, root) = project();
    let id = format!("{root}/src/main.ts");

    let out = transform_module(
        "import.meta.importGlob('./mods/**/*.ts', { exhaustive: true })",
        &id,
        &root,
        &NoopResolver,
        &GlobImportOptions::default(),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(out.code.contains("\"./mods/.hidden.ts\""));
    assert!(out.code.contains("\"./mods/node_modules/dep/index.ts\""));

    let out = transform_module(
        "import.meta.importGlob('./mods/**/*.ts')",
        &id,
        &root,
        &NoopResolver,
        &GlobImportOptions::default(),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(!out.code.contains("hidden"));
    assert!(!out.code.contains("node_modules"));
    assert!(out.code.contains("\"./mods/a.ts\""));
}

#[tokio::test]
async fn alias_patterns_produce_root_keys() {
    let (_dir, root) = project();
    let id = format!("{root}/src/main.ts");
    let resolver = AliasResolver::new().alias("@", format!("{root}/src"));

    let out = transform_module(
        "import.meta.importGlob('@/styles/*.css', { query: { inline: true } })",
        &id,
        &root,
        &resolver,
        &GlobImportOptions::default(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(
        out.code,
        "{\n\"/src/styles/app.css\": () => import(\"./styles/app.css?inline=true&used&lang.css\")\n}"
    );
    assert!(!out.globs[0].is_relative);
}

#[tokio::test]
async fn conflicting_options_fail_before_scanning() {
    let (_dir, root) = project();
    let id = format!("{root}/src/main.ts");

    let err = transform_module(
        "import.meta.glob('foo', { as: 'raw', export: 'named' })",
        &id,
        &root,
        &NoopResolver,
        &takeover(),
    )
    .await
    .unwrap_err();

    assert!(err.is_syntax());
    assert_eq!(err.pos(), Some(0));
}

#[tokio::test]
async fn invalid_glob_is_a_resolution_error() {
    let (_dir, root) = project();
    let id = format!("{root}/src/main.ts");

    let err = transform_module(
        "import.meta.importGlob('mods/*.ts')",
        &id,
        &root,
        &NoopResolver,
        &GlobImportOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::InvalidGlob { ref glob } if glob == "mods/*.ts"));
}

#[tokio::test]
async fn double_star_stays_inside_the_root() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "project/src/main.ts", "");
    write(dir.path(), "project/docs/readme.md", "# readme\n");
    write(dir.path(), "shared/util.ts", "export default 1;\n");
    write(dir.path(), "other/outside.md", "# outside\n");
    let tmp = paths::path_to_posix(dir.path()).trim_end_matches('/').to_string();
    let root = format!("{tmp}/project");
    let id = format!("{root}/src/main.ts");

    let out = transform_module(
        "import.meta.importGlob(['**/*.md', '../../shared/*.ts'])",
        &id,
        &root,
        &NoopResolver,
        &GlobImportOptions::default(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(
        out.globs[0].resolved,
        vec!["**/*.md".to_string(), format!("{tmp}/shared/*.ts")]
    );
    assert!(out.code.contains("readme.md"));
    assert!(out.code.contains("util.ts"));
    assert!(!out.code.contains("outside.md"));

    let matcher = FsGlobMatcher::with_root(root.clone());
    let index = DependencyIndex::new();
    index.record(&id, &out.globs);
    assert_eq!(
        compute_affected_modules(&format!("{root}/docs/new.md"), &index, &matcher),
        vec![id]
    );
    assert!(compute_affected_modules(&format!("{tmp}/other/new.md"), &index, &matcher).is_empty());
}

#[tokio::test]
async fn affected_modules_follow_recorded_globs() {
    let (dir, root) = project();
    let id = format!("{root}/src/main.ts");
    let out = transform_module(
        "import.meta.importGlob('./mods/*.ts')",
        &id,
        &root,
        &NoopResolver,
        &GlobImportOptions::default(),
    )
    .await
    .unwrap()
    .unwrap();

    let index = DependencyIndex::new();
    index.record(&id, &out.globs);
    let matcher = FsGlobMatcher::new();

    write(dir.path(), "src/mods/c.ts", "export default 'c';\n");
    assert_eq!(
        compute_affected_modules(&format!("{root}/src/mods/c.ts"), &index, &matcher),
        vec![id]
    );
    assert!(compute_affected_modules(&format!("{root}/src/other/c.ts"), &index, &matcher).is_empty());
}

#[tokio::test]
async fn plugin_session_picks_up_new_files() {
    let (dir, root) = project();
    let plugin = GlobImportPlugin::new(&root, GlobImportOptions::default());
    let graph = ModuleGraph::new();
    let id = format!("{root}/src/main.ts");
    let code = "export default import.meta.importGlob('./mods/*.ts');\n";

    plugin.build_start();
    graph.ensure_module(&id, &id);
    let before = plugin.transform(code, &id, &NoopResolver, None).await.unwrap().unwrap();
    assert!(!before.code.contains("c.ts"));

    write(dir.path(), "src/mods/c.ts", "export default 'c';\n");
    let invalidated =
        plugin.handle_file_event(&format!("{root}/src/mods/c.ts"), FileEventKind::Add, &graph);
    assert_eq!(invalidated, vec![id.clone()]);

    let after = plugin.transform(code, &id, &NoopResolver, None).await.unwrap().unwrap();
    assert!(after.code.contains("\"./mods/c.ts\": () => import(\"./mods/c.ts\")"));
}
