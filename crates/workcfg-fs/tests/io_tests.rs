use std::fs;

use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;
use workcfg_fs::{Error, io};

#[test]
fn test_write_atomic_creates_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("wrangler.json");

    io::write_atomic(&path, b"{}").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn test_write_atomic_overwrites_existing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("wrangler.toml");
    fs::write(&path, "name = \"old\"").unwrap();

    io::write_atomic(&path, b"name = \"new\"").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "name = \"new\"");
}

#[test]
fn test_write_atomic_creates_parent_directories() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("dir").join("wrangler.jsonc");

    io::write_text(&path, "{}").unwrap();

    assert!(path.exists());
}

#[test]
fn test_write_atomic_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("wrangler.json");

    io::write_text(&path, "{\"name\": \"a\"}").unwrap();
    io::write_text(&path, "{\"name\": \"b\"}").unwrap();

    let entries: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["wrangler.json".to_string()]);
}

#[test]
fn test_read_text_existing_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("wrangler.json");
    fs::write(&path, "{\n\t\"name\": \"test\"\n}").unwrap();

    assert_eq!(io::read_text(&path).unwrap(), "{\n\t\"name\": \"test\"\n}");
}

#[test]
fn test_read_text_nonexistent_file() {
    let temp = TempDir::new().unwrap();
    let result = io::read_text(&temp.path().join("missing.toml"));

    assert!(matches!(result, Err(Error::Io { .. })));
}

#[rstest]
#[case("")]
#[case("compatibility_date = \"2022-01-12\"\n")]
#[case("{\n\t// comment\n\t\"kv_namespaces\": []\n}")]
fn test_write_then_read_is_lossless(#[case] content: &str) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.txt");

    io::write_text(&path, content).unwrap();

    assert_eq!(io::read_text(&path).unwrap(), content);
}

#[test]
fn test_io_error_names_path() {
    let err = Error::io("/tmp/x.json", std::io::Error::other("boom"));
    assert!(err.to_string().contains("/tmp/x.json"));
}
