//! Tests for the binding insertion flow

use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use tempfile::TempDir;
use workcfg_bindings::{
    AddBindingOptions, AddBindingOutcome, BindingRegistry, Error, ResourceBinding, ResourceType, ScriptedPrompter,
    add_binding,
};

fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Should write config");
    path
}

fn batch() -> AddBindingOptions {
    AddBindingOptions {
        interactive: false,
        assume_yes: true,
    }
}

mod patch_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_assume_yes_patches_jsonc_and_keeps_comments() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "wrangler.jsonc",
            "{\n\t// worker name\n\t\"name\": \"app\",\n\t\"kv_namespaces\": [{ \"binding\": \"KV\", \"id\": \"1\" }]\n}\n",
        );
        let registry = BindingRegistry::with_builtins();
        let resource = ResourceBinding::new(ResourceType::Kv, "2", "sessions");

        let outcome = add_binding(&path, &registry, &resource, &batch(), &mut ScriptedPrompter::new())
            .expect("Should add binding");

        let AddBindingOutcome::Patched { binding, text } = outcome else {
            panic!("Should patch the file");
        };
        assert_eq!(binding, "KV_1");
        assert!(text.contains("// worker name"));
        assert_eq!(fs::read_to_string(&path).unwrap(), text);

        let parsed = workcfg_content::RawDocument::load(&path).expect("Should reparse");
        let kv = parsed.value()["kv_namespaces"].as_array().unwrap();
        assert_eq!(kv.len(), 2);
        assert_eq!(kv[1]["binding"], "KV_1");
        assert_eq!(kv[1]["id"], "2");
    }

    #[test]
    fn test_interactive_confirm_patches_json() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "wrangler.json", "{\n  \"name\": \"app\"\n}\n");
        let registry = BindingRegistry::with_builtins();
        let resource = ResourceBinding::new(ResourceType::D1, "db-1", "main");
        let options = AddBindingOptions {
            interactive: true,
            assume_yes: false,
        };
        let mut prompter = ScriptedPrompter::new().answer("MAIN_DB").confirm_with(true);

        let outcome = add_binding(&path, &registry, &resource, &options, &mut prompter).expect("Should add binding");

        assert!(matches!(outcome, AddBindingOutcome::Patched { ref binding, .. } if binding == "MAIN_DB"));
        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["d1_databases"][0]["database_name"], "main");
        assert_eq!(written["d1_databases"][0]["database_id"], "db-1");
    }
}

mod snippet_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_toml_gets_snippet_and_file_is_untouched() {
        let dir = TempDir::new().unwrap();
        let original = "# my worker\nname = \"app\"\n";
        let path = write_config(&dir, "wrangler.toml", original);
        let registry = BindingRegistry::with_builtins();
        let resource = ResourceBinding::new(ResourceType::R2, "assets", "assets");

        let outcome = add_binding(&path, &registry, &resource, &batch(), &mut ScriptedPrompter::new())
            .expect("Should render snippet");

        let AddBindingOutcome::Snippet { binding, text } = outcome else {
            panic!("Should not patch TOML");
        };
        assert_eq!(binding, "BUCKET");
        assert!(text.contains("[[r2_buckets]]"));
        assert!(text.contains("bucket_name = \"assets\""));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_declined_write_falls_back_to_snippet() {
        let dir = TempDir::new().unwrap();
        let original = "{ \"name\": \"app\" }";
        let path = write_config(&dir, "wrangler.json", original);
        let registry = BindingRegistry::with_builtins();
        let resource = ResourceBinding::new(ResourceType::Vectorize, "idx", "idx");
        let options = AddBindingOptions {
            interactive: true,
            assume_yes: false,
        };
        let mut prompter = ScriptedPrompter::new().answer("").confirm_with(false);

        let outcome = add_binding(&path, &registry, &resource, &options, &mut prompter).expect("Should render snippet");

        let AddBindingOutcome::Snippet { binding, text } = outcome else {
            panic!("Should not write after decline");
        };
        assert_eq!(binding, "VECTORIZE");
        assert!(text.starts_with("\"vectorize\": ["));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }
}

mod existing_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_already_bound_resource_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let original = "{ \"hyperdrive\": [{ \"binding\": \"PG\", \"id\": \"hd-1\" }] }";
        let path = write_config(&dir, "wrangler.json", original);
        let registry = BindingRegistry::with_builtins();
        let resource = ResourceBinding::new(ResourceType::Hyperdrive, "hd-1", "pg");

        let outcome = add_binding(&path, &registry, &resource, &batch(), &mut ScriptedPrompter::new())
            .expect("Should detect existing binding");

        assert_eq!(
            outcome,
            AddBindingOutcome::AlreadyBound {
                binding: Some("PG".to_string())
            }
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_unregistered_type_is_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "wrangler.json", "{}");
        let registry = BindingRegistry::new();
        let resource = ResourceBinding::new(ResourceType::Kv, "1", "kv");

        let err = add_binding(&path, &registry, &resource, &batch(), &mut ScriptedPrompter::new()).unwrap_err();

        assert!(matches!(err, Error::UnsupportedResourceType { .. }));
    }
}
