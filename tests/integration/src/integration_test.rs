//! End-to-end tests across the workcfg crates
//!
//! Each test drives the full flow: load -> normalize -> edit -> normalize again.

use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use workcfg_bindings::{
    AddBindingOptions, AddBindingOutcome, BindingRegistry, ResourceBinding, ResourceType, ScriptedPrompter,
    add_binding,
};
use workcfg_config::{NormalizeArgs, read_config};
use workcfg_content::{PatchMode, patch_config};

const WORKER_JSONC: &str = r#"{
	"$schema": "node_modules/wrangler/config-schema.json",
	// The worker
	"name": "shop",
	"main": "src/index.ts",
	"compatibility_date": "2024-09-01",
	"kv_namespaces": [
		{ "binding": "KV", "id": "sessions" } // sessions store
	],
	"env": {
		"staging": {
			"kv_namespaces": [{ "binding": "KV", "id": "staging-sessions" }]
		}
	}
}
"#;

fn setup_worker() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("wrangler.jsonc");
    fs::write(&path, WORKER_JSONC).unwrap();
    (temp, path)
}

#[test]
fn test_added_bindings_keep_config_valid() {
    let (_temp, path) = setup_worker();
    let registry = BindingRegistry::with_builtins();
    let options = AddBindingOptions {
        interactive: false,
        assume_yes: true,
    };

    for id in ["carts", "wishlists"] {
        let resource = ResourceBinding::new(ResourceType::Kv, id, id);
        let outcome = add_binding(&path, &registry, &resource, &options, &mut ScriptedPrompter::new())
            .expect("Should add binding");
        assert!(matches!(outcome, AddBindingOutcome::Patched { .. }));
    }

    let normalized = read_config(&path, &NormalizeArgs::default())
        .expect("Should read config")
        .into_result()
        .expect("Should stay valid");
    let names: Vec<&str> = normalized
        .config
        .env
        .kv_namespaces
        .iter()
        .map(|kv| kv.binding.as_str())
        .collect();
    assert_eq!(names, vec!["KV", "KV_1", "KV_2"]);

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("// The worker"));
    assert!(text.contains("// sessions store"));
}

#[test]
fn test_rebinding_same_resource_changes_nothing() {
    let (_temp, path) = setup_worker();
    let registry = BindingRegistry::with_builtins();
    let resource = ResourceBinding::new(ResourceType::Kv, "sessions", "sessions");

    let outcome = add_binding(
        &path,
        &registry,
        &resource,
        &AddBindingOptions::default(),
        &mut ScriptedPrompter::new(),
    )
    .expect("Should detect binding");

    assert_eq!(
        outcome,
        AddBindingOutcome::AlreadyBound {
            binding: Some("KV".to_string())
        }
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), WORKER_JSONC);
}

#[test]
fn test_patched_environment_is_resolved() {
    let (_temp, path) = setup_worker();

    patch_config(
        &path,
        &json!({"env": {"staging": {"vars": {"STAGE": "staging"}}}}),
        PatchMode::Append,
    )
    .expect("Should patch");

    let args = NormalizeArgs {
        env: Some("staging".to_string()),
        ..NormalizeArgs::default()
    };
    let normalized = read_config(&path, &args)
        .expect("Should read config")
        .into_result()
        .expect("Should stay valid");

    assert_eq!(normalized.config.env.vars.get("STAGE"), Some(&json!("staging")));
    assert_eq!(normalized.config.env.kv_namespaces[0].id, "staging-sessions");
    assert_eq!(normalized.config.env.main.as_deref(), Some("src/index.ts"));
}

#[test]
fn test_duplicate_binding_names_are_reported() {
    let (_temp, path) = setup_worker();

    patch_config(
        &path,
        &json!({"r2_buckets": [{"binding": "KV", "bucket_name": "images"}]}),
        PatchMode::Append,
    )
    .expect("Should patch");

    let normalized = read_config(&path, &NormalizeArgs::default()).expect("Should read config");
    assert!(normalized.diagnostics.has_errors());
    assert!(normalized.diagnostics.render_errors().contains("KV assigned to"));
    assert!(normalized.into_result().is_err());
}
