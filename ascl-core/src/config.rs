#![forbid(unsafe_code)]

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("config error: {message}")]
#[diagnostic(code(ascl::config))]
pub struct ConfigError {
    pub message: String,
}

/// Compiler switches read from the `[compile]` table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Flags {
    /// Fold constant array indexes, literal ternaries and literal aggregates.
    pub fold: bool,
    /// Alignment of a frame's stack usage when it is passed to a callee.
    pub stack_align: u32,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            fold: true,
            stack_align: 8,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    compile: Option<Flags>,
}

impl Flags {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError {
            message: e.to_string(),
        })?;
        let flags = file.compile.unwrap_or_default();
        flags.validate()?;
        Ok(flags)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.stack_align.is_power_of_two() {
            return Err(ConfigError {
                message: format!(
                    "stack_align must be a power of two, found {}",
                    self.stack_align
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_table_uses_defaults() {
        let flags = Flags::from_toml_str("").expect("flags");
        assert_eq!(flags, Flags::default());
        assert!(flags.fold);
        assert_eq!(flags.stack_align, 8);
    }

    #[test]
    fn reads_compile_table() {
        let flags = Flags::from_toml_str("[compile]\nfold = false\nstack_align = 16\n").expect("flags");
        assert!(!flags.fold);
        assert_eq!(flags.stack_align, 16);
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let flags = Flags::from_toml_str("[compile]\nfold = false\n").expect("flags");
        assert_eq!(flags.stack_align, 8);
    }

    #[test]
    fn rejects_bad_alignment() {
        let err = Flags::from_toml_str("[compile]\nstack_align = 12\n").unwrap_err();
        assert!(err.message.contains("power of two"));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(Flags::from_toml_str("[compile\n").is_err());
        assert!(Flags::from_toml_str("[compile]\nunknown = 1\n").is_err());
    }
}
