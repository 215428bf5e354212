//! Build metadata embedded by build.rs.

use std::fmt;

/// One value per rustc-env emitted by the build script.
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_branch: &'static str,
    pub build_timestamp: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc_version: &'static str,
    dirty: &'static str,
}

const BUILD_INFO: BuildInfo = BuildInfo {
    name: env!("CARGO_PKG_NAME"),
    version: env!("CARGO_PKG_VERSION"),
    git_hash: env!("NOMADS_GIT_HASH"),
    git_branch: env!("NOMADS_GIT_BRANCH"),
    build_timestamp: env!("NOMADS_BUILD_TIMESTAMP"),
    target: env!("NOMADS_TARGET"),
    profile: env!("NOMADS_PROFILE"),
    rustc_version: env!("NOMADS_RUSTC_VERSION"),
    dirty: env!("NOMADS_GIT_DIRTY"),
};

impl BuildInfo {
    pub fn is_dirty(&self) -> bool {
        self.dirty == "true"
    }

    /// Version string carrying the commit, e.g. `0.3.0+abc1234` (with a
    /// `.dirty` suffix for uncommitted builds).
    pub fn full_version(&self) -> String {
        let mut v = format!("{}+{}", self.version, self.git_hash);
        if self.is_dirty() {
            v.push_str(".dirty");
        }
        v
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} ({}, {})",
            self.name, self.version, self.git_hash, self.profile
        )?;
        writeln!(
            f,
            "  branch:  {}{}",
            self.git_branch,
            if self.is_dirty() { " (dirty)" } else { "" }
        )?;
        writeln!(f, "  built:   {} for {}", self.build_timestamp, self.target)?;
        writeln!(f, "  rustc:   {}", self.rustc_version)
    }
}

/// The metadata of the running binary.
pub fn build_info() -> BuildInfo {
    BUILD_INFO
}

/// `version` subcommand output.
pub fn print_version() {
    print!("{}", build_info());
}
