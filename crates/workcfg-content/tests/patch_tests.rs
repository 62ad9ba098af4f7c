//! End-to-end tests for patching configuration files on disk

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};
use tempfile::TempDir;
use workcfg_content::{ConfigFormat, Error, PatchMode, PatchOptions, patch_config, patch_text};

const JSON_BASE: &str = "{\n  \"compatibility_date\": \"2022-01-12\",\n  \"name\": \"test-name\"\n}\n";
const TOML_BASE: &str = "compatibility_date = \"2022-01-12\"\nname = \"test-name\"\n";

fn write_config(dir: &TempDir, file: &str, content: &str) -> PathBuf {
    let path = dir.path().join(file);
    std::fs::write(&path, content).unwrap();
    path
}

/// Base JSON config with extra top-level entries from `extra`.
fn json_config(extra: Value) -> String {
    let mut config = json!({"compatibility_date": "2022-01-12", "name": "test-name"});
    if let (Some(target), Some(extra)) = (config.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            target.insert(k.clone(), v.clone());
        }
    }
    serde_json::to_string_pretty(&config).unwrap()
}

#[rstest]
#[case::append(PatchMode::Append, json!({"kv_namespaces": [{"binding": "KV"}]}))]
#[case::replace(PatchMode::Replace, json!({"kv_namespaces": [{"binding": "KV"}]}))]
fn test_add_a_binding(#[case] mode: PatchMode, #[case] patch: Value) {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "wrangler.json", JSON_BASE);

    let result = patch_config(&path, &patch, mode).unwrap();

    assert_eq!(
        result,
        "{\n\t\"compatibility_date\": \"2022-01-12\",\n\t\"name\": \"test-name\",\n\t\"kv_namespaces\": [\n\t\t{\n\t\t\t\"binding\": \"KV\"\n\t\t}\n\t]\n}"
    );
    assert_eq!(std::fs::read_to_string(&path).unwrap(), result);
}

#[rstest]
#[case::append(PatchMode::Append, json!({"kv_namespaces": [{"binding": "KV2"}]}))]
#[case::replace(PatchMode::Replace, json!({"kv_namespaces": [{"binding": "KV"}, {"binding": "KV2"}]}))]
fn test_add_a_second_binding_of_the_same_type(#[case] mode: PatchMode, #[case] patch: Value) {
    let original = json_config(json!({"kv_namespaces": [{"binding": "KV"}]}));

    let result = patch_text(&original, ConfigFormat::Json, &patch, mode, &PatchOptions::default()).unwrap();

    assert_eq!(
        result,
        "{\n\t\"compatibility_date\": \"2022-01-12\",\n\t\"name\": \"test-name\",\n\t\"kv_namespaces\": [\n\t\t{\n\t\t\t\"binding\": \"KV\"\n\t\t},\n\t\t{\n\t\t\t\"binding\": \"KV2\"\n\t\t}\n\t]\n}"
    );
}

#[rstest]
#[case::append(PatchMode::Append)]
#[case::replace(PatchMode::Replace)]
fn test_add_a_new_field(#[case] mode: PatchMode) {
    let original = json_config(json!({"kv_namespaces": [{"binding": "KV"}]}));
    let patch = json!({"compatibility_flags": ["nodejs_compat"]});

    let result = patch_text(&original, ConfigFormat::Json, &patch, mode, &PatchOptions::default()).unwrap();

    assert_eq!(
        result,
        "{\n\t\"compatibility_date\": \"2022-01-12\",\n\t\"name\": \"test-name\",\n\t\"kv_namespaces\": [\n\t\t{\n\t\t\t\"binding\": \"KV\"\n\t\t}\n\t],\n\t\"compatibility_flags\": [\n\t\t\"nodejs_compat\"\n\t]\n}"
    );
}

#[rstest]
#[case::append(
    PatchMode::Append,
    json!({"kv_namespaces": [{"binding": "KV2"}, {"binding": "KV3"}], "d1_databases": [{"binding": "DB2"}]})
)]
#[case::replace(
    PatchMode::Replace,
    json!({
        "kv_namespaces": [{"binding": "KV"}, {"binding": "KV2"}, {"binding": "KV3"}],
        "d1_databases": [{"binding": "DB"}, {"binding": "DB2"}]
    })
)]
fn test_make_multiple_edits_at_the_same_time(#[case] mode: PatchMode, #[case] patch: Value) {
    let original = json_config(json!({
        "kv_namespaces": [{"binding": "KV"}],
        "d1_databases": [{"binding": "DB"}]
    }));

    let result = patch_text(&original, ConfigFormat::Json, &patch, mode, &PatchOptions::default()).unwrap();
    let value: Value = serde_json::from_str(&result).unwrap();

    assert_eq!(
        value["kv_namespaces"],
        json!([{"binding": "KV"}, {"binding": "KV2"}, {"binding": "KV3"}])
    );
    assert_eq!(value["d1_databases"], json!([{"binding": "DB"}, {"binding": "DB2"}]));
}

#[test]
fn test_replace_mode_adds_a_field_to_an_existing_binding() {
    let original = json_config(json!({"kv_namespaces": [{"binding": "KV"}]}));
    let patch = json!({"kv_namespaces": [{"binding": "KV", "id": "1234"}]});

    let result = patch_text(&original, ConfigFormat::Json, &patch, PatchMode::Replace, &PatchOptions::default()).unwrap();

    assert!(result.contains("\t\t{\n\t\t\t\"binding\": \"KV\",\n\t\t\t\"id\": \"1234\"\n\t\t}"));
}

#[test]
fn test_replace_mode_edits_a_compat_flag() {
    let original = json_config(json!({"compatibility_flags": ["nodejs_compat"]}));
    let patch = json!({"compatibility_flags": ["nodejs_compat", "flag"]});

    let result = patch_text(&original, ConfigFormat::Json, &patch, PatchMode::Replace, &PatchOptions::default()).unwrap();

    assert!(result.ends_with("\"compatibility_flags\": [\n\t\t\"nodejs_compat\",\n\t\t\"flag\"\n\t]\n}"));
}

#[test]
fn test_append_twice_gives_three_entries() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "wrangler.json", &json_config(json!({"kv_namespaces": [{"binding": "KV"}]})));
    let patch = json!({"kv_namespaces": [{"binding": "KV2"}]});

    patch_config(&path, &patch, PatchMode::Append).unwrap();
    let result = patch_config(&path, &patch, PatchMode::Append).unwrap();

    let value: Value = serde_json::from_str(&result).unwrap();
    assert_eq!(value["kv_namespaces"].as_array().unwrap().len(), 3);
}

#[test]
fn test_jsonc_comments_survive_append() {
    let jsonc = "
				{
					// a comment
					\"compatibility_date\": \"2022-01-12\",
					\"name\": \"test-name\",
					\"kv_namespaces\": [
						{
							// more comments!
							\"binding\": \"KV\"
						}
					],
					\"d1_databases\": [
						/**
						 * multiline comment
						 */
						{
							\"binding\": \"DB\"
						}
					]
				}
				";
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "wrangler.jsonc", jsonc);
    let patch = json!({
        "kv_namespaces": [{"binding": "KV2"}, {"binding": "KV3"}],
        "d1_databases": [{"binding": "DB2"}]
    });

    let result = patch_config(&path, &patch, PatchMode::Append).unwrap();

    insta::assert_snapshot!(result, @r#"
    {
    	// a comment
    	"compatibility_date": "2022-01-12",
    	"name": "test-name",
    	"kv_namespaces": [
    		{
    			// more comments!
    			"binding": "KV"
    		},
    		{
    			"binding": "KV2"
    		},
    		{
    			"binding": "KV3"
    		}
    	],
    	"d1_databases": [
    		/**
    						 * multiline comment
    						 */
    		{
    			"binding": "DB"
    		},
    		{
    			"binding": "DB2"
    		}
    	]
    }
    "#);
}

#[test]
fn test_jsonc_comments_survive_replace() {
    let jsonc = "{\n\t// a comment\n\t\"name\": \"test-name\",\n\t\"kv_namespaces\": [\n\t\t{\n\t\t\t// more comments!\n\t\t\t\"binding\": \"KV\"\n\t\t}\n\t],\n\t\"d1_databases\": [\n\t\t/**\n\t\t * multiline comment\n\t\t */\n\t\t{\n\t\t\t\"binding\": \"DB\"\n\t\t}\n\t]\n}";
    let patch = json!({
        "kv_namespaces": [{"binding": "KV"}, {"binding": "KV2"}],
        "d1_databases": [{"binding": "DB"}, {"binding": "DB2"}]
    });

    let result = patch_text(jsonc, ConfigFormat::Jsonc, &patch, PatchMode::Replace, &PatchOptions::default()).unwrap();

    assert_eq!(
        result,
        "{\n\t// a comment\n\t\"name\": \"test-name\",\n\t\"kv_namespaces\": [\n\t\t{\n\t\t\t// more comments!\n\t\t\t\"binding\": \"KV\"\n\t\t},\n\t\t{\n\t\t\t\"binding\": \"KV2\"\n\t\t}\n\t],\n\t\"d1_databases\": [\n\t\t/**\n\t\t * multiline comment\n\t\t */\n\t\t{\n\t\t\t\"binding\": \"DB\"\n\t\t},\n\t\t{\n\t\t\t\"binding\": \"DB2\"\n\t\t}\n\t]\n}"
    );
}

#[test]
fn test_null_value_with_trailing_comma() {
    let jsonc = "
				{
					\"compatibility_date\": \"2022-01-12\",
					\"name\": \"test-name\",
				}
				";
    let patch = json!({"tail_consumers": null});

    let result = patch_text(jsonc, ConfigFormat::Jsonc, &patch, PatchMode::Replace, &PatchOptions::default()).unwrap();

    assert_eq!(
        result,
        "{\n\t\"compatibility_date\": \"2022-01-12\",\n\t\"name\": \"test-name\",\n\t\"tail_consumers\": null,\n}"
    );
}

#[test]
fn test_byte_order_mark_is_kept() {
    let jsonc = "\u{feff}{\n\t\"name\": \"test-name\"\n}";

    let result = patch_text(
        jsonc,
        ConfigFormat::Jsonc,
        &json!({"main": "src/index.ts"}),
        PatchMode::Append,
        &PatchOptions::default(),
    )
    .unwrap();

    assert_eq!(result, "\u{feff}{\n\t\"name\": \"test-name\",\n\t\"main\": \"src/index.ts\"\n}");
}

#[rstest]
#[case::append(PatchMode::Append, json!({"kv_namespaces": [{"binding": "KV2"}], "d1_databases": [{"binding": "DB"}]}))]
#[case::replace(PatchMode::Replace, json!({"kv_namespaces": [{"binding": "KV"}, {"binding": "KV2"}], "d1_databases": [{"binding": "DB"}]}))]
fn test_toml_round_trip(#[case] mode: PatchMode, #[case] patch: Value) {
    let dir = TempDir::new().unwrap();
    let original = format!("{TOML_BASE}\n[[kv_namespaces]]\nbinding = \"KV\"\n");
    let path = write_config(&dir, "wrangler.toml", &original);

    let result = patch_config(&path, &patch, mode).unwrap();

    assert!(result.starts_with("compatibility_date = \"2022-01-12\"\nname = \"test-name\"\n"));
    assert_eq!(result.matches("[[kv_namespaces]]").count(), 2);
    assert!(result.contains("binding = \"KV2\""));
    assert!(result.contains("[[d1_databases]]\nbinding = \"DB\""));
    let kv = result.find("[[kv_namespaces]]").unwrap();
    let d1 = result.find("[[d1_databases]]").unwrap();
    assert!(kv < d1);
}

#[test]
fn test_toml_scalar_arrays_stay_inline() {
    let patch = json!({"compatibility_flags": ["nodejs_compat"]});

    let result = patch_text(TOML_BASE, ConfigFormat::Toml, &patch, PatchMode::Append, &PatchOptions::default()).unwrap();

    assert!(result.contains("compatibility_flags = [\"nodejs_compat\"]"));
}

#[test]
fn test_toml_with_comments_is_rejected_before_writing() {
    let dir = TempDir::new().unwrap();
    let original = format!("# my worker\n{TOML_BASE}");
    let path = write_config(&dir, "wrangler.toml", &original);

    let err = patch_config(&path, &json!({"main": "src/index.ts"}), PatchMode::Append).unwrap_err();

    assert!(matches!(err, Error::TomlComments));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn test_toml_null_cannot_be_written() {
    let err = patch_text(TOML_BASE, ConfigFormat::Toml, &json!({"tail_consumers": null}), PatchMode::Append, &PatchOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Conversion { .. }));
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "wrangler.yaml", "name: w\n");
    let err = patch_config(&path, &json!({"main": "x"}), PatchMode::Append).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { .. }));
}

#[test]
fn test_malformed_json_is_a_parse_error() {
    let err = patch_text("{\"name\": }", ConfigFormat::Json, &json!({"main": "x"}), PatchMode::Append, &PatchOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::ParseError { .. }));
}
