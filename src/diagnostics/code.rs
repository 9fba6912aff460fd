use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    SyntaxError,
    TypeNotMatch,
    ParamTypeNotMatch,
    MissingParameter,
    RedundantParameter,
    UndefinedGlobal,
    Deprecated,
    MissingReturn,
    ReturnTypeMismatch,
    DiscardReturns,
    AwaitInSync,
    AccessInvisible,
    UnusedLocal,
    CircleDocClass,
    DuplicateType,
}

static CODE_NAMES: phf::Map<&'static str, DiagnosticCode> = phf::phf_map! {
    "syntax-error" => DiagnosticCode::SyntaxError,
    "type-not-match" => DiagnosticCode::TypeNotMatch,
    "param-type-not-match" => DiagnosticCode::ParamTypeNotMatch,
    "missing-parameter" => DiagnosticCode::MissingParameter,
    "redundant-parameter" => DiagnosticCode::RedundantParameter,
    "undefined-global" => DiagnosticCode::UndefinedGlobal,
    "deprecated" => DiagnosticCode::Deprecated,
    "missing-return" => DiagnosticCode::MissingReturn,
    "return-type-mismatch" => DiagnosticCode::ReturnTypeMismatch,
    "discard-returns" => DiagnosticCode::DiscardReturns,
    "await-in-sync" => DiagnosticCode::AwaitInSync,
    "access-invisible" => DiagnosticCode::AccessInvisible,
    "unused-local" => DiagnosticCode::UnusedLocal,
    "circle-doc-class" => DiagnosticCode::CircleDocClass,
    "duplicate-type" => DiagnosticCode::DuplicateType,
};

impl DiagnosticCode {
    pub const ALL: [DiagnosticCode; 15] = [
        DiagnosticCode::SyntaxError,
        DiagnosticCode::TypeNotMatch,
        DiagnosticCode::ParamTypeNotMatch,
        DiagnosticCode::MissingParameter,
        DiagnosticCode::RedundantParameter,
        DiagnosticCode::UndefinedGlobal,
        DiagnosticCode::Deprecated,
        DiagnosticCode::MissingReturn,
        DiagnosticCode::ReturnTypeMismatch,
        DiagnosticCode::DiscardReturns,
        DiagnosticCode::AwaitInSync,
        DiagnosticCode::AccessInvisible,
        DiagnosticCode::UnusedLocal,
        DiagnosticCode::CircleDocClass,
        DiagnosticCode::DuplicateType,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::SyntaxError => "syntax-error",
            DiagnosticCode::TypeNotMatch => "type-not-match",
            DiagnosticCode::ParamTypeNotMatch => "param-type-not-match",
            DiagnosticCode::MissingParameter => "missing-parameter",
            DiagnosticCode::RedundantParameter => "redundant-parameter",
            DiagnosticCode::UndefinedGlobal => "undefined-global",
            DiagnosticCode::Deprecated => "deprecated",
            DiagnosticCode::MissingReturn => "missing-return",
            DiagnosticCode::ReturnTypeMismatch => "return-type-mismatch",
            DiagnosticCode::DiscardReturns => "discard-returns",
            DiagnosticCode::AwaitInSync => "await-in-sync",
            DiagnosticCode::AccessInvisible => "access-invisible",
            DiagnosticCode::UnusedLocal => "unused-local",
            DiagnosticCode::CircleDocClass => "circle-doc-class",
            DiagnosticCode::DuplicateType => "duplicate-type",
        }
    }

    pub fn default_severity(self) -> DiagnosticSeverity {
        match self {
            DiagnosticCode::SyntaxError
            | DiagnosticCode::TypeNotMatch
            | DiagnosticCode::MissingParameter
            | DiagnosticCode::CircleDocClass
            | DiagnosticCode::DuplicateType => DiagnosticSeverity::Error,
            DiagnosticCode::ParamTypeNotMatch
            | DiagnosticCode::RedundantParameter
            | DiagnosticCode::UndefinedGlobal
            | DiagnosticCode::MissingReturn
            | DiagnosticCode::ReturnTypeMismatch
            | DiagnosticCode::DiscardReturns
            | DiagnosticCode::AwaitInSync
            | DiagnosticCode::AccessInvisible => DiagnosticSeverity::Warning,
            DiagnosticCode::Deprecated | DiagnosticCode::UnusedLocal => DiagnosticSeverity::Hint,
        }
    }
}

impl FromStr for DiagnosticCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CODE_NAMES
            .get(s)
            .copied()
            .ok_or_else(|| format!("unknown diagnostic code `{s}`"))
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
    Hint,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Information => "info",
            DiagnosticSeverity::Hint => "hint",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_names() {
        assert_eq!("type-not-match".parse::<DiagnosticCode>(), Ok(DiagnosticCode::TypeNotMatch));
        assert_eq!("unused-local".parse::<DiagnosticCode>(), Ok(DiagnosticCode::UnusedLocal));
        assert!("TypeNotMatch".parse::<DiagnosticCode>().is_err());
    }

    #[test]
    fn test_default_severities() {
        assert_eq!(DiagnosticCode::SyntaxError.default_severity(), DiagnosticSeverity::Error);
        assert_eq!(DiagnosticCode::UndefinedGlobal.default_severity(), DiagnosticSeverity::Warning);
        assert_eq!(DiagnosticCode::UnusedLocal.default_severity(), DiagnosticSeverity::Hint);
    }
}
