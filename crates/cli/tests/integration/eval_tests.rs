//! Eval and list command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

fn stdout_json(output: &[u8]) -> serde_json::Value {
  serde_json::from_slice(output).unwrap_or_else(|e| panic!("stdout is not JSON ({}): {}", e, String::from_utf8_lossy(output)))
}

#[test]
fn eval_writes_one_specification_per_unit() {
  let env = TestEnv::from_fixture("hello.lua");

  env
    .cairn_cmd()
    .arg("eval")
    .arg(&env.defs_path)
    .arg("hello")
    .assert()
    .success()
    .stdout(predicate::str::contains("Evaluated hello-1.0"))
    .stdout(predicate::str::contains("Specifications: 2"));

  let files = env.emitted_files();
  assert_eq!(files.len(), 2, "files: {:?}", files);
  assert!(files.iter().any(|f| f.starts_with("hello-1.0-") && f.ends_with(".toml")));
  assert!(files.iter().any(|f| f.starts_with("toybox-x86_64-") && f.ends_with(".toml")));
}

#[test]
fn eval_is_idempotent() {
  let env = TestEnv::from_fixture("hello.lua");

  let first = env
    .cairn_cmd()
    .args(["--output", "json", "eval"])
    .arg(&env.defs_path)
    .arg("hello")
    .assert()
    .success();
  let contents: Vec<String> = env
    .emitted_files()
    .iter()
    .map(|f| std::fs::read_to_string(env.eval_path().join(f)).unwrap())
    .collect();

  let second = env
    .cairn_cmd()
    .args(["--output", "json", "eval"])
    .arg(&env.defs_path)
    .arg("hello")
    .assert()
    .success();
  let again: Vec<String> = env
    .emitted_files()
    .iter()
    .map(|f| std::fs::read_to_string(env.eval_path().join(f)).unwrap())
    .collect();

  assert_eq!(
    stdout_json(&first.get_output().stdout)["id"],
    stdout_json(&second.get_output().stdout)["id"]
  );
  assert_eq!(contents, again);
}

#[test]
fn eval_json_reports_root_identifier() {
  let env = TestEnv::from_fixture("hello.lua");

  let assert = env
    .cairn_cmd()
    .args(["--output", "json", "eval"])
    .arg(&env.defs_path)
    .arg("hello")
    .arg("--print")
    .assert()
    .success();

  let json = stdout_json(&assert.get_output().stdout);
  let id = json["id"].as_str().unwrap();
  assert!(id.starts_with("hello-1.0-"));
  assert_eq!(json["units"], 2);
  assert_eq!(json["written"], 2);
  assert_eq!(json["specification"]["identifier"], id);
  assert_eq!(json["specification"]["dependencies"].as_array().unwrap().len(), 1);
}

#[test]
fn dry_run_writes_nothing() {
  let env = TestEnv::from_fixture("hello.lua");

  env
    .cairn_cmd()
    .arg("eval")
    .arg(&env.defs_path)
    .arg("hello")
    .arg("--dry-run")
    .assert()
    .success()
    .stdout(predicate::str::contains("Dry run"));

  assert!(env.emitted_files().is_empty());
}

#[test]
fn print_shows_interpolated_script() {
  let env = TestEnv::from_fixture("hello.lua");
  let store = env.store_path();

  env
    .cairn_cmd()
    .arg("eval")
    .arg(&env.defs_path)
    .arg("hello")
    .arg("--print")
    .assert()
    .success()
    .stdout(predicate::str::contains("name = \"hello\""))
    .stdout(predicate::str::contains(format!("{}/toybox-x86_64-", store.display())))
    .stdout(predicate::str::contains("ᛈ").not());
}

#[test]
fn store_flag_changes_package_identifier() {
  let env = TestEnv::from_fixture("hello.lua");

  let default = env
    .cairn_cmd()
    .args(["--output", "json", "eval"])
    .arg(&env.defs_path)
    .arg("hello")
    .arg("--dry-run")
    .assert()
    .success();
  let elsewhere = env
    .cairn_cmd()
    .args(["--output", "json", "eval"])
    .arg(&env.defs_path)
    .arg("hello")
    .args(["--dry-run", "--store", "/elsewhere/store"])
    .assert()
    .success();

  assert_ne!(
    stdout_json(&default.get_output().stdout)["id"],
    stdout_json(&elsewhere.get_output().stdout)["id"]
  );
}

#[test]
fn store_flag_applies_to_packages_in_environment() {
  let env = TestEnv::from_fixture("layered.lua");

  env
    .cairn_cmd()
    .arg("eval")
    .arg(&env.defs_path)
    .arg("app")
    .args(["--dry-run", "--print", "--store", "/elsewhere/store"])
    .assert()
    .success()
    .stdout(predicate::str::contains("PATH = \"/elsewhere/store/base-1.0-"));
}

#[test]
fn list_and_eval_agree_under_store_flag() {
  let env = TestEnv::from_fixture("layered.lua");

  let listed = env
    .cairn_cmd()
    .args(["--output", "json", "list"])
    .arg(&env.defs_path)
    .args(["--store", "/elsewhere/store"])
    .assert()
    .success();
  let evaluated = env
    .cairn_cmd()
    .args(["--output", "json", "eval"])
    .arg(&env.defs_path)
    .arg("app")
    .args(["--dry-run", "--store", "/elsewhere/store"])
    .assert()
    .success();

  let items = stdout_json(&listed.get_output().stdout);
  let app = items
    .as_array()
    .unwrap()
    .iter()
    .find(|item| item["name"] == "app")
    .unwrap()
    .clone();
  let id = stdout_json(&evaluated.get_output().stdout)["id"].clone();
  assert_eq!(app["id"], id);
  assert_eq!(app["path"], format!("/elsewhere/store/{}", id.as_str().unwrap()));
}

#[test]
fn format_flag_selects_json_files() {
  let env = TestEnv::from_fixture("hello.lua");

  env
    .cairn_cmd()
    .arg("eval")
    .arg(&env.defs_path)
    .arg("hello")
    .args(["--format", "json", "--jobs", "1"])
    .assert()
    .success();

  let files = env.emitted_files();
  assert_eq!(files.len(), 2);
  assert!(files.iter().all(|f| f.ends_with(".json")));
}

#[test]
fn dot_flag_writes_graph() {
  let env = TestEnv::from_fixture("hello.lua");
  let dot = env.temp.path().join("graph.dot");

  env
    .cairn_cmd()
    .arg("eval")
    .arg(&env.defs_path)
    .arg("hello")
    .arg("--dot")
    .arg(&dot)
    .assert()
    .success();

  let text = std::fs::read_to_string(&dot).unwrap();
  assert!(text.contains("digraph"));
  assert!(text.contains("->"));
}

#[test]
fn cycle_is_reported() {
  let env = TestEnv::from_fixture("cycle.lua");

  env
    .cairn_cmd()
    .arg("eval")
    .arg(&env.defs_path)
    .arg("a")
    .assert()
    .failure()
    .stderr(predicate::str::contains("dependency cycle: a-1 -> b-1 -> a-1"));

  assert!(env.emitted_files().is_empty());
}

#[test]
fn unresolved_reference_is_reported() {
  let env = TestEnv::from_fixture("unresolved.lua");

  env
    .cairn_cmd()
    .arg("eval")
    .arg(&env.defs_path)
    .arg("broken")
    .assert()
    .failure()
    .stderr(predicate::str::contains("ghost-1"));
}

#[test]
fn unknown_export_fails() {
  let env = TestEnv::from_fixture("hello.lua");

  env
    .cairn_cmd()
    .arg("eval")
    .arg(&env.defs_path)
    .arg("goodbye")
    .assert()
    .failure()
    .stderr(predicate::str::contains("No unit exported as 'goodbye'"));
}

#[test]
fn list_shows_exports_with_identifiers() {
  let env = TestEnv::from_fixture("hello.lua");

  env
    .cairn_cmd()
    .arg("list")
    .arg(&env.defs_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("hello"))
    .stdout(predicate::str::contains("(package)"))
    .stdout(predicate::str::contains("toybox-x86_64-"));
}

#[test]
fn list_json_includes_store_paths() {
  let env = TestEnv::from_fixture("hello.lua");

  let assert = env
    .cairn_cmd()
    .args(["--output", "json", "list"])
    .arg(&env.defs_path)
    .assert()
    .success();

  let json = stdout_json(&assert.get_output().stdout);
  let items = json.as_array().unwrap();
  assert_eq!(items.len(), 2);
  for item in items {
    let path = item["path"].as_str().unwrap();
    let id = item["id"].as_str().unwrap();
    assert_eq!(path, format!("{}/{}", env.store_path().display(), id));
  }
}
