//! Tests for loading unit definitions from Lua.

use cairn_lib::unit::{Identify, Unit, with_store_root};
use tempfile::TempDir;

use super::common::{load_code, load_fixture, store_root};

mod fixture {
  use super::*;

  #[test]
  fn exports_every_named_unit() {
    let defs = load_fixture("bootstrap.lua");
    let names: Vec<String> = defs.exports().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["bootstrap", "stage1", "stage2", "toybox"]);
  }

  #[test]
  fn registers_unexported_units_too() {
    let defs = load_fixture("bootstrap.lua");
    // tarball, toybox, busybox, unpack, bootstrap, stage1, stage2
    assert_eq!(defs.registry().len(), 7);
  }

  #[test]
  fn fetch_identifier_is_file_name_and_hash() {
    let defs = load_fixture("bootstrap.lua");
    let toybox = defs.export("toybox").unwrap();
    let id = toybox.id().unwrap();
    assert_eq!(id.as_str(), format!("toybox-x86_64-{}", toybox.content_hash().unwrap()));
  }

  #[test]
  fn identifiers_are_stable_across_loads() {
    let first = load_fixture("bootstrap.lua");
    let second = load_fixture("bootstrap.lua");

    for (name, unit) in first.exports() {
      let other = second.export(&name).unwrap();
      let a = with_store_root(&store_root(), || unit.id()).unwrap();
      let b = with_store_root(&store_root(), || other.id()).unwrap();
      assert_eq!(a, b, "export {name}");
    }
  }

  #[test]
  fn bootstrap_script_is_dedented_and_interpolated() {
    let defs = load_fixture("bootstrap.lua");
    let Unit::Package(bootstrap) = defs.export("bootstrap").unwrap() else {
      panic!("expected package");
    };
    let toybox = defs.export("toybox").unwrap();

    let resolved = with_store_root(&store_root(), || bootstrap.resolve()).unwrap();

    assert!(resolved.script.starts_with("set -exu\n"));
    let toybox_path = format!("/cairn/store/{} mkdir -p $HOME/bin", toybox.id().unwrap());
    assert!(resolved.script.contains(&toybox_path), "script was:\n{}", resolved.script);
    assert!(!resolved.script.contains('ᛈ'));
    assert_eq!(resolved.discovered.len(), 4);
  }
}

mod inline {
  use super::*;

  #[test]
  fn string_and_function_scripts_hash_alike() {
    let temp = TempDir::new().unwrap();
    let defs = load_code(
      &temp,
      r#"
        return {
          a = cairn.package { name = "p", version = "1.0", script = "echo hi" },
          b = cairn.package { name = "p", version = "1.0", script = function() return "echo hi" end },
        }
      "#,
    );

    let a = with_store_root(&store_root(), || defs.export("a").unwrap().id()).unwrap();
    let b = with_store_root(&store_root(), || defs.export("b").unwrap().id()).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn env_table_order_does_not_matter() {
    let temp = TempDir::new().unwrap();
    let defs = load_code(
      &temp,
      r#"
        local function make(keys)
          local env = {}
          for _, k in ipairs(keys) do env[k] = "v-" .. k end
          return cairn.package { name = "p", version = "1", env = env }
        end
        return {
          forward = make { "A", "B", "C", "D", "E", "F" },
          backward = make { "F", "E", "D", "C", "B", "A" },
        }
      "#,
    );

    let forward = with_store_root(&store_root(), || defs.export("forward").unwrap().id()).unwrap();
    let backward = with_store_root(&store_root(), || defs.export("backward").unwrap().id()).unwrap();
    assert_eq!(forward, backward);
  }

  #[test]
  fn unit_fields_are_readable_from_lua() {
    let temp = TempDir::new().unwrap();
    let defs = load_code(
      &temp,
      r#"
        local t = cairn.fetch { url = "https://example.org/tool.tar.xz" }
        assert(t.name == "tool.tar.xz")
        assert(t.kind == "fetch")
        assert(t.version == nil)
        assert(string.find(t.id, "^tool.tar.xz%-") ~= nil)
        assert(#t.hash == 40)
        return { t = t }
      "#,
    );
    assert!(defs.export("t").is_some());
  }
}
