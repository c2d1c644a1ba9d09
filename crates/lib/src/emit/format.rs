use std::fmt;
use std::str::FromStr;

use super::EmitError;
use crate::unit::Specification;

/// Turns a specification into file contents and back.
pub trait SpecSerializer {
  /// File extension, without the dot.
  fn extension(&self) -> &'static str;

  fn serialize(&self, spec: &Specification) -> Result<String, EmitError>;

  fn deserialize(&self, text: &str) -> Result<Specification, EmitError>;
}

/// Built-in serialization formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpecFormat {
  #[default]
  Toml,
  Json,
}

impl SpecSerializer for SpecFormat {
  fn extension(&self) -> &'static str {
    match self {
      SpecFormat::Toml => "toml",
      SpecFormat::Json => "json",
    }
  }

  fn serialize(&self, spec: &Specification) -> Result<String, EmitError> {
    match self {
      SpecFormat::Toml => toml::to_string(spec).map_err(|e| EmitError::Serialize(e.to_string())),
      SpecFormat::Json => serde_json::to_string_pretty(spec)
        .map(|mut text| {
          text.push('\n');
          text
        })
        .map_err(|e| EmitError::Serialize(e.to_string())),
    }
  }

  fn deserialize(&self, text: &str) -> Result<Specification, EmitError> {
    match self {
      SpecFormat::Toml => toml::from_str(text).map_err(|e| EmitError::Parse(e.to_string())),
      SpecFormat::Json => serde_json::from_str(text).map_err(|e| EmitError::Parse(e.to_string())),
    }
  }
}

impl fmt::Display for SpecFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.extension())
  }
}

impl FromStr for SpecFormat {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "toml" => Ok(SpecFormat::Toml),
      "json" => Ok(SpecFormat::Json),
      other => Err(format!("unknown specification format '{}' (expected toml or json)", other)),
    }
  }
}
