//! Interpolation markers and their substitution.
//!
//! A unit's textual self-representation is a marker embedding its identifier.
//! Scripts and environment values may contain any number of markers; resolving
//! a string replaces each one with the referenced unit's store path and
//! reports which identifiers were referenced, so that callers can grow the
//! dependency set of the unit the text belongs to.
//!
//! # Marker Format
//!
//! - `ᛈ>ID<ᛈ` - reference to the unit with identifier `ID`
//!
//! The rune sentinel never appears in ordinary shell syntax, so `$HOME`,
//! `<`, `>`, `${...}` and friends pass through untouched.
//!
//! # Example
//!
//! ```
//! use cairn_lib::placeholder::{parse, Segment};
//! use cairn_lib::unit::UnitId;
//!
//! let segments = parse("cp ᛈ>tool-abc<ᛈ $out").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("cp ".to_string()),
//!     Segment::Reference(UnitId::new("tool-abc")),
//!     Segment::Literal(" $out".to_string()),
//! ]);
//! ```

use std::collections::BTreeSet;

use thiserror::Error;

use crate::consts::{MARKER_CLOSE, MARKER_OPEN};
use crate::unit::UnitId;

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no markers)
  Literal(String),

  /// A reference to another unit
  Reference(UnitId),
}

/// Errors that can occur during marker parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unterminated reference marker at byte {0}")]
  Unclosed(usize),

  #[error("nested reference marker at byte {0}")]
  Nested(usize),

  #[error("reference marker close without open at byte {0}")]
  UnmatchedClose(usize),

  #[error("empty reference marker at byte {0}")]
  Empty(usize),

  #[error("invalid identifier in reference marker: '{0}'")]
  InvalidIdentifier(String),

  #[error("unresolved reference: {0}")]
  Unresolved(UnitId),
}

/// Trait for turning a referenced identifier into replacement text.
pub trait Resolver {
  fn resolve_unit(&self, id: &UnitId) -> Result<String, PlaceholderError>;
}

/// Text with every marker replaced, plus the identifiers it referenced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
  pub text: String,
  pub references: BTreeSet<UnitId>,
}

/// Render the marker for a unit identifier.
pub fn marker(id: &UnitId) -> String {
  format!("{}{}{}", MARKER_OPEN, id, MARKER_CLOSE)
}

/// Parse a string into literal and reference segments in one linear pass.
///
/// # Errors
///
/// Returns an error for an open marker without a close, an open marker inside
/// another marker, a close marker without an open, or an empty identifier.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut cursor = 0;

  loop {
    let next_open = input[cursor..].find(MARKER_OPEN).map(|i| cursor + i);
    let next_close = input[cursor..].find(MARKER_CLOSE).map(|i| cursor + i);

    let open = match (next_open, next_close) {
      (None, None) => break,
      (None, Some(close)) => return Err(PlaceholderError::UnmatchedClose(close)),
      (Some(open), Some(close)) if close < open => return Err(PlaceholderError::UnmatchedClose(close)),
      (Some(open), _) => open,
    };

    let body_start = open + MARKER_OPEN.len();
    let close = input[body_start..]
      .find(MARKER_CLOSE)
      .map(|i| body_start + i)
      .ok_or(PlaceholderError::Unclosed(open))?;

    let body = &input[body_start..close];
    if let Some(nested) = body.find(MARKER_OPEN) {
      return Err(PlaceholderError::Nested(body_start + nested));
    }
    if body.is_empty() {
      return Err(PlaceholderError::Empty(open));
    }
    if !UnitId::is_valid(body) {
      return Err(PlaceholderError::InvalidIdentifier(body.to_string()));
    }

    if open > cursor {
      segments.push(Segment::Literal(input[cursor..open].to_string()));
    }
    segments.push(Segment::Reference(UnitId::new(body)));

    cursor = close + MARKER_CLOSE.len();
  }

  if cursor < input.len() {
    segments.push(Segment::Literal(input[cursor..].to_string()));
  }

  Ok(segments)
}

/// Collect the identifiers referenced by a string without substituting.
pub fn references(input: &str) -> Result<BTreeSet<UnitId>, PlaceholderError> {
  Ok(
    parse(input)?
      .into_iter()
      .filter_map(|segment| match segment {
        Segment::Reference(id) => Some(id),
        Segment::Literal(_) => None,
      })
      .collect(),
  )
}

/// Substitute all markers in a string using the provided resolver.
///
/// Text without markers comes back unchanged with an empty reference set.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<Resolved, PlaceholderError> {
  let segments = parse(input)?;
  substitute_segments(&segments, resolver)
}

/// Substitute markers in pre-parsed segments.
pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> Result<Resolved, PlaceholderError> {
  let mut resolved = Resolved::default();

  for segment in segments {
    match segment {
      Segment::Literal(s) => resolved.text.push_str(s),
      Segment::Reference(id) => {
        resolved.text.push_str(&resolver.resolve_unit(id)?);
        resolved.references.insert(id.clone());
      }
    }
  }

  Ok(resolved)
}
