//! Build metadata embedded by `build.rs`.

use std::fmt;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

const UNKNOWN: &str = "unknown";

/// Where and when this binary was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: &'static str,
    pub branch: &'static str,
    /// Full commit SHA; [`Display`](fmt::Display) shortens it.
    pub sha: &'static str,
    pub dirty: bool,
    pub built_at: &'static str,
}

impl BuildInfo {
    /// Metadata captured at compile time. Missing values (no git checkout,
    /// vendored source) read as "unknown".
    pub fn current() -> Self {
        Self {
            version: PKG_VERSION,
            branch: or_unknown(option_env!("VERGEN_GIT_BRANCH")),
            sha: or_unknown(option_env!("VERGEN_GIT_SHA")),
            dirty: option_env!("VERGEN_GIT_DIRTY") == Some("true"),
            built_at: or_unknown(option_env!("VERGEN_BUILD_TIMESTAMP")),
        }
    }

    pub fn short_sha(&self) -> &'static str {
        &self.sha[..7.min(self.sha.len())]
    }
}

const fn or_unknown(value: Option<&'static str>) -> &'static str {
    match value {
        Some(v) => v,
        None => UNKNOWN,
    }
}

/// `{version}+{branch}.{sha}`, with `.dirty` appended for modified trees.
impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}.{}", self.version, self.branch, self.short_sha())?;
        if self.dirty {
            f.write_str(".dirty")?;
        }
        Ok(())
    }
}

/// Version string for logs, e.g. `0.1.0+main.abc1234`.
pub fn version_string() -> String {
    BuildInfo::current().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shortens_sha_and_marks_dirty() {
        let info = BuildInfo {
            version: "1.2.3",
            branch: "main",
            sha: "abc1234def5678",
            dirty: true,
            built_at: UNKNOWN,
        };
        assert_eq!(info.to_string(), "1.2.3+main.abc1234.dirty");
    }

    #[test]
    fn short_sha_tolerates_unknown() {
        let info = BuildInfo {
            sha: UNKNOWN,
            ..BuildInfo::current()
        };
        assert_eq!(info.short_sha(), "unknown");
    }

    #[test]
    fn current_version_matches_manifest() {
        assert!(version_string().starts_with(PKG_VERSION));
    }
}
