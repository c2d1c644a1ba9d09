//! End-to-end evaluation of Lua definitions.

use cairn_lib::emit::{SpecFormat, SpecWriter};
use cairn_lib::eval::{EvalError, Evaluator, evaluate};
use cairn_lib::store::StoreRoot;
use cairn_lib::unit::{Identify, Specification, Unit, with_store_root};
use tempfile::TempDir;

use super::common::{config, load_code, load_fixture, load_fixture_in, store_root};

fn id_of(unit: &Unit) -> cairn_lib::unit::UnitId {
  with_store_root(&store_root(), || unit.id()).unwrap()
}

mod plan {
  use super::*;

  #[test]
  fn stage2_pulls_in_whole_chain() {
    let defs = load_fixture("bootstrap.lua");
    let stage2 = defs.export("stage2").unwrap();

    let graph = Evaluator::new(defs.registry(), store_root()).plan(&stage2).unwrap();

    // stage2, stage1, bootstrap, and the four fetches
    assert_eq!(graph.len(), 7);
    assert_eq!(graph.root(), Some(&id_of(&stage2)));
    assert_eq!(graph.waves().unwrap().len(), 4);
  }

  #[test]
  fn env_reference_becomes_dependency() {
    let defs = load_fixture("bootstrap.lua");
    let stage1 = defs.export("stage1").unwrap();
    let bootstrap = defs.export("bootstrap").unwrap();
    let toybox = defs.export("toybox").unwrap();

    let graph = Evaluator::new(defs.registry(), store_root()).plan(&stage1).unwrap();

    let mut expected = vec![id_of(&bootstrap), id_of(&toybox)];
    expected.sort();
    assert_eq!(graph.dependencies(&id_of(&stage1)), expected);

    let Some(Specification::Package(spec)) = graph.specification(&id_of(&stage1)) else {
      panic!("expected package spec");
    };
    assert_eq!(spec.dependencies, expected);
    assert_eq!(spec.environment["PATH"], format!("/cairn/store/{}/bin", id_of(&bootstrap)));
  }

  #[test]
  fn env_reference_resolves_under_other_store_root() {
    let other = StoreRoot::new("/other/store");
    let defs = load_fixture_in("bootstrap.lua", &other);
    let stage1 = defs.export("stage1").unwrap();
    let bootstrap = defs.export("bootstrap").unwrap();

    let graph = Evaluator::new(defs.registry(), other.clone()).plan(&stage1).unwrap();

    let bootstrap_id = with_store_root(&other, || bootstrap.id()).unwrap();
    assert_ne!(bootstrap_id, id_of(&bootstrap));
    let stage1_id = with_store_root(&other, || stage1.id()).unwrap();
    assert!(graph.dependencies(&stage1_id).contains(&bootstrap_id));
    let Some(Specification::Package(spec)) = graph.specification(&stage1_id) else {
      panic!("expected package spec");
    };
    assert_eq!(spec.environment["PATH"], format!("/other/store/{}/bin", bootstrap_id));
  }

  #[test]
  fn shared_dependency_template_runs_once() {
    let temp = TempDir::new().unwrap();
    let defs = load_code(
      &temp,
      r#"
        local calls = 0
        local base = cairn.package {
          name = "base", version = "1",
          script = function()
            calls = calls + 1
            if calls > 1 then error("base template ran twice") end
            return "echo base"
          end,
        }
        local left = cairn.package { name = "left", version = "1", script = function() return "use " .. base end }
        local right = cairn.package { name = "right", version = "1", script = function() return "use " .. base end }
        local top = cairn.package { name = "top", version = "1", deps = { left, right } }
        return { top = top }
      "#,
    );
    let top = defs.export("top").unwrap();

    let graph = Evaluator::new(defs.registry(), store_root()).plan(&top).unwrap();

    assert_eq!(graph.len(), 4);
    // Resolving again hits the memo instead of the template.
    assert!(with_store_root(&store_root(), || top.id()).is_ok());
  }

  #[test]
  fn mutual_reference_is_a_cycle() {
    let temp = TempDir::new().unwrap();
    let defs = load_code(
      &temp,
      r#"
        local a, b
        a = cairn.package { name = "a", version = "1", script = function() return "run " .. b end }
        b = cairn.package { name = "b", version = "1", script = function() return "run " .. a end }
        return { a = a }
      "#,
    );
    let a = defs.export("a").unwrap();

    let err = Evaluator::new(defs.registry(), store_root()).plan(&a).unwrap_err();

    let EvalError::Cycle { chain } = err else {
      panic!("expected cycle, got {err:?}");
    };
    assert_eq!(chain, vec!["a-1", "b-1", "a-1"]);
  }

  #[test]
  fn unknown_marker_is_unresolved() {
    let temp = TempDir::new().unwrap();
    let defs = load_code(
      &temp,
      r#"return { p = cairn.package { name = "p", version = "1", script = "run ᛈ>ghost-1<ᛈ" } }"#,
    );
    let p = defs.export("p").unwrap();

    let err = Evaluator::new(defs.registry(), store_root()).plan(&p).unwrap_err();
    assert!(matches!(err, EvalError::UnresolvedReference { .. }), "got {err:?}");
  }
}

mod emit {
  use super::*;

  #[tokio::test]
  async fn writes_one_file_per_unit_and_reads_back() {
    let temp = TempDir::new().unwrap();
    let defs = load_fixture("bootstrap.lua");
    let stage2 = defs.export("stage2").unwrap();
    let config = config(temp.path(), SpecFormat::Toml);

    let (graph, summary) = evaluate(&stage2, defs.registry(), &config).await.unwrap();

    assert_eq!(summary.emitted.len(), 7);
    let files = std::fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(files, 7);

    let writer = SpecWriter::new(temp.path(), SpecFormat::Toml);
    for spec in graph.specifications() {
      let loaded = writer.load(spec.identifier()).await.unwrap();
      assert_eq!(loaded.as_ref(), Some(spec));
    }
  }

  #[tokio::test]
  async fn second_run_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let defs = load_fixture("bootstrap.lua");
    let stage1 = defs.export("stage1").unwrap();
    let config = config(temp.path(), SpecFormat::Json);

    let (first, _) = evaluate(&stage1, defs.registry(), &config).await.unwrap();
    let before: Vec<_> = std::fs::read_dir(temp.path())
      .unwrap()
      .map(|e| std::fs::read(e.unwrap().path()).unwrap())
      .collect();

    let (second, _) = evaluate(&stage1, defs.registry(), &config).await.unwrap();
    let after: Vec<_> = std::fs::read_dir(temp.path())
      .unwrap()
      .map(|e| std::fs::read(e.unwrap().path()).unwrap())
      .collect();

    assert_eq!(first.root(), second.root());
    assert_eq!(before.len(), after.len());
    for content in &before {
      assert!(after.contains(content));
    }
  }

  #[tokio::test]
  async fn fetch_and_simple_package_example() {
    let temp = TempDir::new().unwrap();
    let defs = load_code(
      &temp,
      r#"
        return {
          tool = cairn.fetch { url = "https://example.org/tool.tar.xz" },
          p = cairn.package { name = "p", version = "1.0", script = function() return "echo hi" end },
        }
      "#,
    );
    let eval_dir = temp.path().join("eval");
    let config = config(&eval_dir, SpecFormat::Toml);

    let tool = defs.export("tool").unwrap();
    assert_eq!(tool.name(), "tool.tar.xz");
    assert_eq!(
      id_of(&tool).as_str(),
      format!("tool.tar.xz-{}", tool.content_hash().unwrap())
    );

    let p = defs.export("p").unwrap();
    let (first, _) = evaluate(&p, defs.registry(), &config).await.unwrap();
    let (second, _) = evaluate(&p, defs.registry(), &config).await.unwrap();
    assert_eq!(first.root(), second.root());

    let root = first.root().unwrap();
    let Some(Specification::Package(spec)) = first.specification(root) else {
      panic!("expected package spec");
    };
    assert!(spec.dependencies.is_empty());
    assert_eq!(spec.script, "echo hi");
  }
}
