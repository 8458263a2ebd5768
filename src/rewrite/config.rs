use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::sema::PackageImporter;

pub const DEFAULT_RUNTIME_PATH: &str = "github.com/moriarty/runtime";

/// Reserved mangling prefix for every name the rewriter injects.
pub const ALIAS_PREFIX: &str = "__moriarty_";
pub const SPAWN_TEMP_PREFIX: &str = "__moriarty_p";

// The low-level pointer utility the hooks funnel addresses through.
pub const POINTER_PACKAGE: &str = "unsafe";
pub const POINTER_FUNC: &str = "Pointer";

pub const ENTRY_PACKAGE: &str = "main";
pub const ENTRY_FUNC: &str = "main";

#[derive(Deserialize)]
#[serde(default)]
pub struct Config {
    /// Import paths rewritten verbatim before any other work.
    pub import_rewrites: HashMap<String, String>,

    /// Package path of the instrumentation runtime.
    pub runtime_path: String,

    /// Import alias for the runtime package. Empty means a mangled
    /// alias is minted from the runtime path.
    pub runtime_alias: String,

    pub mem_read_func: String,
    pub mem_write_func: String,
    pub spawn_func: String,
    pub enter_func: String,
    pub exit_func: String,

    /// Optional export classifications for imported packages, supplied
    /// by a driving build tool.
    #[serde(skip)]
    pub importer: Option<Box<dyn PackageImporter>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            import_rewrites: HashMap::new(),
            runtime_path: DEFAULT_RUNTIME_PATH.to_string(),
            runtime_alias: String::new(),
            mem_read_func: "MemRead".to_string(),
            mem_write_func: "MemWrite".to_string(),
            spawn_func: "Spawn".to_string(),
            enter_func: "GoroutineEnter".to_string(),
            exit_func: "GoroutineExit".to_string(),
            importer: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.runtime_path.is_empty() {
            bail!("runtime path must not be empty");
        }
        for (label, name) in [
            ("mem_read_func", &self.mem_read_func),
            ("mem_write_func", &self.mem_write_func),
            ("spawn_func", &self.spawn_func),
            ("enter_func", &self.enter_func),
            ("exit_func", &self.exit_func),
        ] {
            if !is_identifier(name) {
                bail!("{} is not a valid hook function name: {:?}", label, name);
            }
        }
        if !self.runtime_alias.is_empty() && !is_identifier(&self.runtime_alias) {
            bail!(
                "runtime alias is not a valid identifier: {:?}",
                self.runtime_alias
            );
        }
        if let Some(path) = rewrite_cycle(&self.import_rewrites) {
            bail!("import rewrites form a cycle through {:?}", path);
        }
        Ok(())
    }

    /// Fills in the minted alias when the caller supplied none.
    pub(crate) fn finalize(&mut self) {
        if self.runtime_alias.is_empty() {
            self.runtime_alias = mint_runtime_alias(&self.runtime_path);
        }
    }
}

/// Deterministic, collision-free import alias: the reserved prefix plus
/// the first 8 bytes of SHA-256 of the runtime path, hex encoded.
pub fn mint_runtime_alias(runtime_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(runtime_path.as_bytes());
    let digest = hasher.finalize();
    format!("{}{}", ALIAS_PREFIX, hex::encode(&digest[..8]))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// A rewrite chain that revisits a key would never settle under repeated
// application; reject it up front.
fn rewrite_cycle(rewrites: &HashMap<String, String>) -> Option<String> {
    for start in rewrites.keys() {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut cur = start.as_str();
        while let Some(next) = rewrites.get(cur) {
            if !seen.insert(cur) {
                return Some(start.clone());
            }
            cur = next.as_str();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_is_deterministic_and_prefixed() {
        let a = mint_runtime_alias(DEFAULT_RUNTIME_PATH);
        let b = mint_runtime_alias(DEFAULT_RUNTIME_PATH);
        assert_eq!(a, b);
        assert!(a.starts_with(ALIAS_PREFIX));
        // Prefix plus 16 hex characters.
        assert_eq!(a.len(), ALIAS_PREFIX.len() + 16);
    }

    #[test]
    fn alias_differs_per_path() {
        assert_ne!(
            mint_runtime_alias("a/runtime"),
            mint_runtime_alias("b/runtime")
        );
    }

    #[test]
    fn custom_alias_is_preserved() {
        let mut config = Config {
            runtime_alias: "myAlias".to_string(),
            ..Config::default()
        };
        config.validate().expect("valid");
        config.finalize();
        assert_eq!(config.runtime_alias, "myAlias");
    }

    #[test]
    fn invalid_hook_name_is_rejected() {
        let config = Config {
            mem_read_func: "Mem Read".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn circular_import_rewrites_are_rejected() {
        let mut rewrites = HashMap::new();
        rewrites.insert("a".to_string(), "b".to_string());
        rewrites.insert("b".to_string(), "a".to_string());
        let config = Config {
            import_rewrites: rewrites,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let mut chain = HashMap::new();
        chain.insert("a".to_string(), "b".to_string());
        chain.insert("b".to_string(), "c".to_string());
        let config = Config {
            import_rewrites: chain,
            ..Config::default()
        };
        config.validate().expect("chains without cycles are fine");
    }

    #[test]
    fn config_deserializes_from_json() {
        let config: Config = serde_json::from_str(
            r#"{"runtime_path": "corp/replay/runtime", "mem_read_func": "Read"}"#,
        )
        .expect("deserialize");
        assert_eq!(config.runtime_path, "corp/replay/runtime");
        assert_eq!(config.mem_read_func, "Read");
        // Unset fields keep their defaults.
        assert_eq!(config.mem_write_func, "MemWrite");
    }
}
