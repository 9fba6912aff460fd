use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::diagnostics::{DiagnosticCode, DiagnosticSeverity};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Default)]
pub enum LuaVersion {
    #[serde(rename = "5.1")]
    Lua51,
    #[serde(rename = "5.2")]
    Lua52,
    #[serde(rename = "5.3")]
    Lua53,
    #[default]
    #[serde(rename = "5.4")]
    Lua54,
    #[serde(rename = "JIT")]
    LuaJit,
}

impl LuaVersion {
    /// Parses the words used by `---@version`.
    pub fn from_doc_text(text: &str) -> Option<Self> {
        Some(match text {
            "5.1" => LuaVersion::Lua51,
            "5.2" => LuaVersion::Lua52,
            "5.3" => LuaVersion::Lua53,
            "5.4" => LuaVersion::Lua54,
            "JIT" | "jit" | "LuaJIT" => LuaVersion::LuaJit,
            _ => return None,
        })
    }

    /// LuaJIT follows the 5.1 language for ordering comparisons.
    fn numeric(self) -> u8 {
        match self {
            LuaVersion::Lua51 | LuaVersion::LuaJit => 51,
            LuaVersion::Lua52 => 52,
            LuaVersion::Lua53 => 53,
            LuaVersion::Lua54 => 54,
        }
    }

    pub fn is_newer_than(self, other: LuaVersion) -> bool {
        self.numeric() > other.numeric()
    }

    pub fn is_older_than(self, other: LuaVersion) -> bool {
        self.numeric() < other.numeric()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub version: LuaVersion,
    /// Ordered `require` patterns; `?` stands for the module path.
    pub require_pattern: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            version: LuaVersion::default(),
            require_pattern: vec!["?.lua".to_string(), "?/init.lua".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Workspace and library roots used for module resolution.
    pub roots: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub disable: Vec<DiagnosticCode>,
    pub severity: FxHashMap<DiagnosticCode, DiagnosticSeverity>,
    pub globals: Vec<String>,
    pub debounce_ms: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            disable: Vec::new(),
            severity: FxHashMap::default(),
            globals: Vec::new(),
            debounce_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub runtime: RuntimeConfig,
    pub workspace: WorkspaceConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl AnalysisConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    #[tracing::instrument]
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = AnalysisConfig::from_json(
            r#"{
                "runtime": { "version": "5.1" },
                "diagnostics": {
                    "disable": ["undefined-global"],
                    "severity": { "unused-local": "warning" }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.runtime.version, LuaVersion::Lua51);
        assert_eq!(config.runtime.require_pattern, vec!["?.lua", "?/init.lua"]);
        assert_eq!(config.diagnostics.disable, vec![DiagnosticCode::UndefinedGlobal]);
        assert_eq!(
            config.diagnostics.severity.get(&DiagnosticCode::UnusedLocal),
            Some(&DiagnosticSeverity::Warning)
        );
        assert_eq!(config.diagnostics.debounce_ms, 300);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(AnalysisConfig::from_json("{ runtime: ").is_err());
    }
}
