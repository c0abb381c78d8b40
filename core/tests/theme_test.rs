use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use tmbridge_core::bridge::Bridge;
use tmbridge_core::host::{discover_extensions, FsExtensionHost};
use tmbridge_core::reader::FsFileReader;
use tmbridge_core::registry::RegistrySnapshot;
use tmbridge_core::resolve::ThemeResolver;
use tmbridge_core::types::{ThemeResolution, ThemeType};

fn write_json(dir: &Path, rel_path: &str, value: &Value) {
    let full = dir.join(rel_path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&full, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// One extension `themes-pack` carrying the given theme contributions.
fn write_theme_pack(root: &Path, themes: Value) {
    write_json(
        root,
        "themes-pack/package.json",
        &json!({ "name": "themes-pack", "contributes": { "themes": themes } }),
    );
}

fn rule(scope: &str) -> Value {
    json!({ "scope": scope, "settings": { "foreground": "#ffffff" } })
}

async fn resolve(root: &Path, name: Option<&str>) -> ThemeResolution {
    let snapshot = RegistrySnapshot::build(&discover_extensions(&[root.to_path_buf()]));
    let reader = FsFileReader::new();
    ThemeResolver::new(&snapshot.themes, &reader).resolve(name).await
}

/// T includes U includes V, each in its own directory so relative includes
/// only work when the directory is tracked per hop.
fn setup_chain(root: &Path) {
    write_theme_pack(
        root,
        json!([{ "id": "t", "label": "Theme T", "uiTheme": "vs", "path": "./themes/t.json" }]),
    );
    write_json(
        root,
        "themes-pack/themes/t.json",
        &json!({
            "include": "./u/u.json",
            "colors": { "a": "3" },
            "tokenColors": [rule("t.1"), rule("t.2")],
            "semanticTokenColors": { "variable": "#333333" }
        }),
    );
    write_json(
        root,
        "themes-pack/themes/u/u.json",
        &json!({
            "include": "../v/v.json",
            "colors": { "a": "2", "b": "2" },
            "tokenColors": [rule("u.1")],
            "semanticHighlighting": true,
            "semanticTokenColors": { "variable": "#222222", "parameter": "#222222" }
        }),
    );
    write_json(
        root,
        "themes-pack/themes/v/v.json",
        &json!({
            "type": "light",
            "colors": { "a": "1" },
            "tokenColors": [rule("v.1"), rule("v.2")]
        }),
    );
}

fn scopes(theme: &ThemeResolution) -> Vec<String> {
    theme
        .theme()
        .unwrap()
        .settings
        .iter()
        .map(|r| r["scope"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// 1. Include chain: base colors win, rules ordered from deepest include
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_include_chain_merges_with_base_precedence() {
    let dir = TempDir::new().unwrap();
    setup_chain(dir.path());

    let resolution = resolve(dir.path(), Some("t")).await;
    assert_eq!(resolution.id(), "t");

    let theme = resolution.theme().unwrap();
    assert_eq!(Value::Object(theme.colors.clone()), json!({ "a": "3", "b": "2" }));
    assert_eq!(scopes(&resolution), vec!["v.1", "v.2", "u.1", "t.1", "t.2"]);
    assert_eq!(theme.semantic_highlighting, Some(true));
    assert_eq!(
        Value::Object(theme.semantic_token_colors.clone()),
        json!({ "variable": "#333333", "parameter": "#222222" })
    );
    assert_eq!(theme.display_name.as_deref(), Some("Theme T"));
    assert_eq!(theme.theme_type, ThemeType::Light);
}

// ---------------------------------------------------------------------------
// 2. Labels resolve to ids
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_label_resolves_to_id() {
    let dir = TempDir::new().unwrap();
    setup_chain(dir.path());

    let resolution = resolve(dir.path(), Some("Theme T")).await;
    assert_eq!(resolution.id(), "t");
    assert_eq!(resolution.theme().unwrap().name, "t");
}

// ---------------------------------------------------------------------------
// 3. Sentinel for unset and unknown names
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_unknown_or_unset_theme_gives_sentinel() {
    let dir = TempDir::new().unwrap();
    setup_chain(dir.path());

    for name in [None, Some(""), Some("Solarized Nope")] {
        let resolution = resolve(dir.path(), name).await;
        assert_eq!(resolution, ThemeResolution::NotFound);
        assert_eq!(serde_json::to_value(&resolution).unwrap(), json!(["none", "none"]));
    }
}

// ---------------------------------------------------------------------------
// 4. uiTheme classification, label-only themes
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_ui_theme_classification() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_theme_pack(
        root,
        json!([
            { "label": "HC Dark", "uiTheme": "hc-black", "path": "./plain.json" },
            { "label": "HC Light", "uiTheme": "hc-light", "path": "./plain.json" },
            { "label": "Dark", "uiTheme": "vs-dark", "path": "./plain.json" },
            { "label": "Odd", "uiTheme": "sepia", "path": "./plain.json" }
        ]),
    );
    write_json(root, "themes-pack/plain.json", &json!({ "colors": {} }));

    let expected = [
        ("HC Dark", ThemeType::Dark),
        ("HC Light", ThemeType::Light),
        ("Dark", ThemeType::Dark),
        ("Odd", ThemeType::Dark),
    ];
    for (label, kind) in expected {
        let resolution = resolve(root, Some(label)).await;
        assert_eq!(resolution.id(), label, "label-only themes are keyed by label");
        assert_eq!(resolution.theme().unwrap().theme_type, kind, "{label}");
    }
}

// ---------------------------------------------------------------------------
// 5. Include cycles end in the sentinel instead of looping
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_include_cycle_gives_sentinel() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_theme_pack(root, json!([{ "id": "loop", "path": "./a.json" }]));
    write_json(root, "themes-pack/a.json", &json!({ "include": "./b.json", "colors": { "a": "1" } }));
    write_json(root, "themes-pack/b.json", &json!({ "include": "./a.json", "colors": { "b": "1" } }));

    assert_eq!(resolve(root, Some("loop")).await, ThemeResolution::NotFound);
}

// ---------------------------------------------------------------------------
// 6. tokenColors as a path to a legacy rule file
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_token_colors_path_is_loaded() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_theme_pack(
        root,
        json!([
            { "id": "legacy", "path": "./themes/legacy.json", "uiTheme": "vs-dark" },
            { "id": "broken", "path": "./themes/broken.json", "uiTheme": "vs-dark" }
        ]),
    );
    write_json(root, "themes-pack/themes/legacy.json", &json!({ "tokenColors": "./legacy.tmTheme.json" }));
    write_json(
        root,
        "themes-pack/themes/legacy.tmTheme.json",
        &json!({ "settings": [rule("comment"), rule("string")] }),
    );
    write_json(root, "themes-pack/themes/broken.json", &json!({ "tokenColors": "./missing.json", "colors": { "x": "1" } }));

    assert_eq!(scopes(&resolve(root, Some("legacy")).await), vec!["comment", "string"]);

    let broken = resolve(root, Some("broken")).await;
    assert!(scopes(&broken).is_empty());
    assert_eq!(broken.theme().unwrap().colors["x"], "1");
}

// ---------------------------------------------------------------------------
// 7. A rule file named inside an included theme resolves next to that file
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_token_colors_path_in_included_file() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_theme_pack(root, json!([{ "id": "t", "path": "./themes/t.json", "uiTheme": "vs-dark" }]));
    write_json(
        root,
        "themes-pack/themes/t.json",
        &json!({ "include": "./u/u.json", "tokenColors": [rule("t.1")] }),
    );
    write_json(
        root,
        "themes-pack/themes/u/u.json",
        &json!({ "type": "light", "tokenColors": "./rules.json" }),
    );
    write_json(
        root,
        "themes-pack/themes/u/rules.json",
        &json!({ "settings": [rule("u.rules.1"), rule("u.rules.2")] }),
    );
    // same name next to the base file; must not be picked up
    write_json(root, "themes-pack/themes/rules.json", &json!({ "settings": [rule("wrong")] }));

    let resolution = resolve(root, Some("t")).await;
    assert_eq!(scopes(&resolution), vec!["u.rules.1", "u.rules.2", "t.1"]);
    assert_eq!(resolution.theme().unwrap().theme_type, ThemeType::Dark, "kind follows uiTheme");

    let snapshot = RegistrySnapshot::build(&discover_extensions(&[root.to_path_buf()]));
    let reader = FsFileReader::new();
    let contribution = snapshot.themes.get("t").unwrap();
    let raw = ThemeResolver::new(&snapshot.themes, &reader)
        .resolve_chain("t", contribution)
        .await
        .unwrap();
    assert_eq!(raw.theme_type.as_deref(), Some("light"), "type is inherited from the include");
    assert!(raw.include.is_none());
}

// ---------------------------------------------------------------------------
// 8. Unreadable include keeps the part already merged
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_unreadable_include_keeps_base() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_theme_pack(root, json!([{ "id": "half", "path": "./half.json" }]));
    write_json(root, "themes-pack/half.json", &json!({ "include": "./gone.json", "colors": { "a": "1" } }));

    let resolution = resolve(root, Some("half")).await;
    assert_eq!(resolution.theme().unwrap().colors["a"], "1");
}

// ---------------------------------------------------------------------------
// 9. The bridge falls back to the host's configured theme
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_bridge_uses_configured_theme() {
    let dir = TempDir::new().unwrap();
    setup_chain(dir.path());

    let host = FsExtensionHost::new(vec![dir.path().to_path_buf()])
        .with_color_theme(Some("Theme T".to_string()));
    let bridge = Bridge::new(Arc::new(host));

    let resolution = bridge.resolve_theme(None).await.unwrap();
    assert_eq!(resolution.id(), "t");
    let explicit = bridge.resolve_theme(Some("nope")).await.unwrap();
    assert_eq!(explicit.id(), "none");
}
