//! Binding name selection
//!
//! Binding names become identifiers in worker code, so they must be valid
//! JavaScript identifiers and unique (ignoring case) among the bindings the
//! registry knows about.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::prompt::Prompter;
use crate::registry::BindingRegistry;
use crate::types::ResourceBinding;

static BINDING_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid binding name regex"));

const NAME_QUESTION: &str = "What binding name would you like to use?";

pub fn is_valid_binding_name(name: &str) -> bool {
    BINDING_NAME.is_match(name)
}

/// First free name among `base`, `base_1`, `base_2`, ...
///
/// `base` is the resource's suggested binding or its type's generic name.
pub fn generate_unique_binding_name(
    registry: &BindingRegistry,
    config: &Map<String, Value>,
    resource: &ResourceBinding,
) -> Result<String> {
    let entry = registry.entry(resource.resource_type)?;
    let base = resource.binding.as_deref().unwrap_or(entry.generic_name);
    let taken = registry.get_all_existing_binding_names(config);

    if !taken.contains(&base.to_uppercase()) {
        return Ok(base.to_string());
    }
    let name = (1..)
        .map(|i| format!("{base}_{i}"))
        .find(|candidate| !taken.contains(&candidate.to_uppercase()))
        .unwrap_or_default();
    tracing::debug!(base, %name, "Binding name taken, using suffixed name");
    Ok(name)
}

/// Ask for a binding name until the answer is a valid, unused identifier.
///
/// Declining to pick another name after a conflict aborts with
/// [`Error::BindingConflict`].
pub fn prompt_for_valid_binding_name(
    registry: &BindingRegistry,
    config: &Map<String, Value>,
    resource: &ResourceBinding,
    prompter: &mut dyn Prompter,
) -> Result<String> {
    let default = generate_unique_binding_name(registry, config, resource)?;
    let taken = registry.get_all_existing_binding_names(config);
    let mut question = NAME_QUESTION.to_string();

    loop {
        let answer = prompter.prompt(&question, &default)?;
        let answer = answer.trim();

        if !is_valid_binding_name(answer) {
            question = format!(
                "\"{answer}\" is not a valid binding name. Use letters, digits, \"_\" or \"$\", not starting with a digit. {NAME_QUESTION}"
            );
            continue;
        }

        if taken.contains(&answer.to_uppercase()) {
            let retry = prompter.confirm(&format!(
                "The binding name \"{answer}\" is already in use. Would you like to choose a different name?"
            ))?;
            if !retry {
                tracing::warn!(name = answer, "User declined to rename conflicting binding");
                return Err(Error::BindingConflict {
                    name: answer.to_string(),
                });
            }
            question = format!("\"{answer}\" is already in use. {NAME_QUESTION}");
            continue;
        }

        return Ok(answer.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use crate::types::ResourceType;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;
    use serde_json::json;

    fn config(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[rstest]
    #[case("KV", true)]
    #[case("_private", true)]
    #[case("$env", true)]
    #[case("my_db2", true)]
    #[case("2FAST", false)]
    #[case("has-dash", false)]
    #[case("", false)]
    fn test_binding_name_syntax(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(is_valid_binding_name(name), valid);
    }

    #[test]
    fn test_generic_name_when_free() {
        let registry = BindingRegistry::with_builtins();
        let resource = ResourceBinding::new(ResourceType::Vectorize, "idx", "idx");
        assert_eq!(
            generate_unique_binding_name(&registry, &Map::new(), &resource).unwrap(),
            "VECTORIZE"
        );
    }

    #[test]
    fn test_suffix_skips_taken_names() {
        let registry = BindingRegistry::with_builtins();
        let config = config(json!({
            "kv_namespaces": [{"binding": "KV", "id": "1"}, {"binding": "kv_1", "id": "2"}]
        }));
        let resource = ResourceBinding::new(ResourceType::Kv, "3", "sessions");
        assert_eq!(generate_unique_binding_name(&registry, &config, &resource).unwrap(), "KV_2");
    }

    #[test]
    fn test_suggested_binding_is_preferred() {
        let registry = BindingRegistry::with_builtins();
        let config = config(json!({"r2_buckets": [{"binding": "ASSETS", "bucket_name": "a"}]}));
        let resource = ResourceBinding::new(ResourceType::R2, "b", "b").with_binding("assets");
        assert_eq!(
            generate_unique_binding_name(&registry, &config, &resource).unwrap(),
            "assets_1"
        );
    }

    #[test]
    fn test_prompt_reasks_after_invalid_and_taken_names() {
        let registry = BindingRegistry::with_builtins();
        let config = config(json!({"d1_databases": [{"binding": "DB", "database_id": "1"}]}));
        let resource = ResourceBinding::new(ResourceType::D1, "2", "analytics");
        let mut prompter = ScriptedPrompter::new()
            .answer("not valid")
            .answer("db")
            .confirm_with(true)
            .answer("ANALYTICS");

        let name = prompt_for_valid_binding_name(&registry, &config, &resource, &mut prompter).unwrap();

        assert_eq!(name, "ANALYTICS");
        assert_eq!(
            prompter.questions(),
            [
                "What binding name would you like to use?",
                "\"not valid\" is not a valid binding name. Use letters, digits, \"_\" or \"$\", not starting with a digit. What binding name would you like to use?",
                "The binding name \"db\" is already in use. Would you like to choose a different name?",
                "\"db\" is already in use. What binding name would you like to use?",
            ]
        );
    }

    #[test]
    fn test_prompt_default_is_unique_name() {
        let registry = BindingRegistry::with_builtins();
        let config = config(json!({"hyperdrive": [{"binding": "HYPERDRIVE", "id": "1"}]}));
        let resource = ResourceBinding::new(ResourceType::Hyperdrive, "2", "pg");
        let mut prompter = ScriptedPrompter::new().answer("");
        let name = prompt_for_valid_binding_name(&registry, &config, &resource, &mut prompter).unwrap();
        assert_eq!(name, "HYPERDRIVE_1");
    }

    #[test]
    fn test_declining_rename_is_conflict() {
        let registry = BindingRegistry::with_builtins();
        let config = config(json!({"kv_namespaces": [{"binding": "KV", "id": "1"}]}));
        let resource = ResourceBinding::new(ResourceType::Kv, "2", "kv");
        let mut prompter = ScriptedPrompter::new().answer("KV").confirm_with(false);

        let err = prompt_for_valid_binding_name(&registry, &config, &resource, &mut prompter).unwrap_err();

        assert!(matches!(err, Error::BindingConflict { name } if name == "KV"));
    }

    proptest! {
        #[test]
        fn prop_generated_name_never_collides(existing in proptest::collection::vec("(KV|kv|Kv)(_[0-9]{1,2})?", 0..12)) {
            let registry = BindingRegistry::with_builtins();
            let bindings: Vec<Value> = existing
                .iter()
                .enumerate()
                .map(|(i, name)| json!({"binding": name, "id": i.to_string()}))
                .collect();
            let config = config(json!({"kv_namespaces": bindings}));
            let resource = ResourceBinding::new(ResourceType::Kv, "new", "new");

            let name = generate_unique_binding_name(&registry, &config, &resource).unwrap();

            prop_assert!(is_valid_binding_name(&name));
            prop_assert!(!existing.iter().any(|e| e.eq_ignore_ascii_case(&name)));
        }
    }
}
