//! Per-thread resolution context.
//!
//! Resolving a package runs its script template, and templates render other
//! units by asking for their markers. Those nested identity computations need
//! two things the call chain cannot pass explicitly: the store root in effect
//! and the stack of packages currently being resolved. Both live here.

use std::cell::RefCell;

use tracing::trace;

use crate::eval::EvalError;
use crate::store::StoreRoot;

struct Frame {
  key: usize,
  label: String,
}

thread_local! {
  static STORE_ROOT: RefCell<Option<StoreRoot>> = const { RefCell::new(None) };
  static RESOLVING: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Run `f` with `root` as the store root for every identity computed inside.
///
/// Calls nest; the previous root is restored when `f` returns or unwinds.
pub fn with_store_root<R>(root: &StoreRoot, f: impl FnOnce() -> R) -> R {
  let previous = STORE_ROOT.with(|cell| cell.replace(Some(root.clone())));
  let _restore = RestoreRoot(previous);
  f()
}

/// The installed store root, or the one configured through the environment.
pub fn current_store_root() -> StoreRoot {
  STORE_ROOT
    .with(|cell| cell.borrow().clone())
    .unwrap_or_else(StoreRoot::from_env)
}

struct RestoreRoot(Option<StoreRoot>);

impl Drop for RestoreRoot {
  fn drop(&mut self) {
    let previous = self.0.take();
    STORE_ROOT.with(|cell| *cell.borrow_mut() = previous);
  }
}

/// Marks a unit instance as being resolved until dropped.
pub(crate) struct ResolveGuard {
  _private: (),
}

/// Push `key` onto the resolution stack.
///
/// Fails with [`EvalError::Cycle`] if the same instance is already being
/// resolved further up the stack. The chain starts and ends with the
/// repeated unit.
pub(crate) fn enter(key: usize, label: &str) -> Result<ResolveGuard, EvalError> {
  RESOLVING.with(|cell| {
    let mut stack = cell.borrow_mut();
    if let Some(start) = stack.iter().position(|frame| frame.key == key) {
      let mut chain: Vec<String> = stack[start..].iter().map(|frame| frame.label.clone()).collect();
      chain.push(label.to_string());
      return Err(EvalError::Cycle { chain });
    }
    trace!(unit = label, depth = stack.len(), "enter resolution");
    stack.push(Frame {
      key,
      label: label.to_string(),
    });
    Ok(ResolveGuard { _private: () })
  })
}

impl Drop for ResolveGuard {
  fn drop(&mut self) {
    RESOLVING.with(|cell| {
      cell.borrow_mut().pop();
    });
  }
}
