use std::env;
use std::path::PathBuf;

/// Settings for building a resolver, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Where the selector memory document lives
    pub memory_path: PathBuf,
    /// Whether the vision tier may be used
    pub vision_enabled: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            memory_path: default_memory_path(),
            vision_enabled: true,
        }
    }
}

impl ResolverConfig {
    /// Read `ELEMENT_RESOLVER_MEMORY_PATH` and `ELEMENT_RESOLVER_DISABLE_VISION`.
    pub fn from_env() -> Self {
        let memory_path = env::var_os("ELEMENT_RESOLVER_MEMORY_PATH")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_memory_path);
        let vision_disabled = env::var("ELEMENT_RESOLVER_DISABLE_VISION")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        Self {
            memory_path,
            vision_enabled: !vision_disabled,
        }
    }
}

/// `<local data dir>/element-resolver/selector_memory.json`
pub fn default_memory_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("element-resolver")
        .join("selector_memory.json")
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
