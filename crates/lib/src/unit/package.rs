use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use super::context;
use super::spec::{PackageSpec, Specification};
use super::types::{Identify, Unit, UnitId};
use crate::eval::EvalError;
use crate::placeholder::{self, Resolved};
use crate::store::StoreRoot;
use crate::util::hash::{ObjectHash, UnitHasher};

/// Zero-argument function producing a package's script text.
///
/// Templates typically render other units (their markers) into the text;
/// every marker found in the output becomes a dependency.
#[derive(Clone)]
pub struct ScriptTemplate(Rc<dyn Fn() -> Result<String, EvalError>>);

impl ScriptTemplate {
  pub fn new(f: impl Fn() -> Result<String, EvalError> + 'static) -> Self {
    Self(Rc::new(f))
  }

  /// A template that always renders `text`.
  pub fn text(text: impl Into<String>) -> Self {
    let text = text.into();
    Self::new(move || Ok(text.clone()))
  }

  pub fn render(&self) -> Result<String, EvalError> {
    (self.0)()
  }
}

impl fmt::Debug for ScriptTemplate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("ScriptTemplate(..)")
  }
}

/// Everything derived from a package once its text has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
  pub id: UnitId,
  pub hash: ObjectHash,
  /// Script with markers substituted and common indentation removed.
  pub script: String,
  pub environment: BTreeMap<String, String>,
  /// Identifiers referenced by markers in the script or environment.
  pub discovered: BTreeSet<UnitId>,
  /// Declared plus discovered dependency identifiers.
  pub dependencies: BTreeSet<UnitId>,
}

/// A composite unit: a script run with an environment over its dependencies.
pub struct Package {
  name: String,
  version: String,
  script: ScriptTemplate,
  dependencies: Vec<Unit>,
  environment: HashMap<String, String>,
  resolved: RefCell<BTreeMap<StoreRoot, Rc<ResolvedPackage>>>,
}

impl Package {
  pub fn builder(name: impl Into<String>, version: impl Into<String>) -> PackageBuilder {
    PackageBuilder {
      name: name.into(),
      version: version.into(),
      script: None,
      dependencies: Vec::new(),
      environment: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  /// `name-version`, available before the package is hashed.
  pub fn label(&self) -> String {
    format!("{}-{}", self.name, self.version)
  }

  pub fn dependencies(&self) -> &[Unit] {
    &self.dependencies
  }

  /// Resolve script and environment against the current store root.
  ///
  /// The result is cached per store root, so the template runs at most once
  /// per instance for a given root. Re-entering a package that is still
  /// being resolved (a template rendering itself, directly or through other
  /// packages) fails with [`EvalError::Cycle`].
  pub fn resolve(&self) -> Result<Rc<ResolvedPackage>, EvalError> {
    let root = context::current_store_root();
    if let Some(hit) = self.resolved.borrow().get(&root) {
      return Ok(hit.clone());
    }

    let label = self.label();
    let _guard = context::enter(self as *const Self as usize, &label)?;
    debug!(package = %label, store = %root, "resolving package");

    let rendered = self.script.render()?;
    let script = resolve_text(&label, &rendered, &root)?;
    let mut discovered = script.references;
    let script = textwrap::dedent(&script.text);

    let mut environment = BTreeMap::new();
    for (key, value) in &self.environment {
      let resolved = resolve_text(&label, value, &root)?;
      discovered.extend(resolved.references);
      environment.insert(key.clone(), resolved.text);
    }

    let mut dependencies = BTreeSet::new();
    for dependency in &self.dependencies {
      dependencies.insert(dependency.id()?);
    }
    dependencies.extend(discovered.iter().cloned());

    let hash = UnitHasher::new()
      .field(&self.name)
      .field(&self.version)
      .field(&script)
      .entries(&environment)
      .set(dependencies.iter().map(UnitId::as_str))
      .finish();
    let id = UnitId::for_package(&self.name, &self.version, &hash);
    trace!(unit = %id, discovered = discovered.len(), dependencies = dependencies.len(), "package resolved");

    let resolved = Rc::new(ResolvedPackage {
      id,
      hash,
      script,
      environment,
      discovered,
      dependencies,
    });
    self.resolved.borrow_mut().insert(root, resolved.clone());
    Ok(resolved)
  }
}

fn resolve_text(label: &str, text: &str, root: &StoreRoot) -> Result<Resolved, EvalError> {
  placeholder::substitute(text, root).map_err(|source| EvalError::MalformedReference {
    unit: label.to_string(),
    source,
  })
}

impl Identify for Package {
  fn id(&self) -> Result<UnitId, EvalError> {
    Ok(self.resolve()?.id.clone())
  }

  fn content_hash(&self) -> Result<ObjectHash, EvalError> {
    Ok(self.resolve()?.hash.clone())
  }

  fn specification(&self) -> Result<Specification, EvalError> {
    let resolved = self.resolve()?;
    Ok(Specification::Package(PackageSpec {
      identifier: resolved.id.clone(),
      name: self.name.clone(),
      version: self.version.clone(),
      script: resolved.script.clone(),
      dependencies: resolved.dependencies.iter().cloned().collect(),
      environment: resolved.environment.clone(),
    }))
  }
}

impl fmt::Debug for Package {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Package")
      .field("name", &self.name)
      .field("version", &self.version)
      .field("dependencies", &self.dependencies.iter().map(Unit::label).collect::<Vec<_>>())
      .field("environment", &self.environment)
      .finish_non_exhaustive()
  }
}

/// Builder for [`Package`].
///
/// # Example
///
/// ```
/// use cairn_lib::unit::{Identify, Package, Unit};
///
/// let tool = Unit::fetch("https://example.com/tool", true).unwrap();
/// let marker = tool.marker().unwrap();
/// let pkg = Package::builder("hello", "1.0")
///   .with_script(move || Ok(format!("{} --version > $out", marker)))
///   .with_env("LANG", "C")
///   .build()
///   .unwrap();
/// assert!(pkg.id().unwrap().as_str().starts_with("hello-1.0-"));
/// ```
#[derive(Debug)]
pub struct PackageBuilder {
  name: String,
  version: String,
  script: Option<ScriptTemplate>,
  dependencies: Vec<Unit>,
  environment: HashMap<String, String>,
}

impl PackageBuilder {
  pub fn with_script(mut self, template: impl Fn() -> Result<String, EvalError> + 'static) -> Self {
    self.script = Some(ScriptTemplate::new(template));
    self
  }

  pub fn with_script_text(mut self, text: impl Into<String>) -> Self {
    self.script = Some(ScriptTemplate::text(text));
    self
  }

  pub fn with_template(mut self, template: ScriptTemplate) -> Self {
    self.script = Some(template);
    self
  }

  pub fn with_dependency(mut self, unit: Unit) -> Self {
    self.dependencies.push(unit);
    self
  }

  pub fn with_dependencies(mut self, units: impl IntoIterator<Item = Unit>) -> Self {
    self.dependencies.extend(units);
    self
  }

  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.environment.insert(key.into(), value.into());
    self
  }

  /// Validate the definition and produce the unit.
  ///
  /// # Errors
  ///
  /// [`EvalError::InvalidUnitDefinition`] when the name or version is empty
  /// or cannot appear in an identifier, or an environment key is empty or
  /// contains `=`.
  pub fn build(self) -> Result<Unit, EvalError> {
    if !UnitId::is_valid(&self.name) {
      return Err(EvalError::invalid(format!("package name '{}' is not usable in an identifier", self.name)));
    }
    if !UnitId::is_valid(&self.version) {
      return Err(EvalError::invalid(format!(
        "package {} has unusable version '{}'",
        self.name, self.version
      )));
    }
    if let Some(key) = self.environment.keys().find(|k| k.is_empty() || k.contains('=')) {
      return Err(EvalError::invalid(format!(
        "package {}-{} has invalid environment key '{}'",
        self.name, self.version, key
      )));
    }

    Ok(Unit::Package(Rc::new(Package {
      name: self.name,
      version: self.version,
      script: self.script.unwrap_or_else(|| ScriptTemplate::text("")),
      dependencies: self.dependencies,
      environment: self.environment,
      resolved: RefCell::new(BTreeMap::new()),
    })))
  }
}
