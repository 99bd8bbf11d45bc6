//! Version information with embedded git metadata.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the on-disk schema, as encoded in the database file name.
pub const SCHEMA_VERSION: u32 = 2;

/// Git branch at build time, or "unknown" if unavailable.
pub const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => "unknown",
};

/// Git commit SHA at build time, or "unknown" if unavailable.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// Full version string: `{version}+{branch}.{sha}[.dirty] (schema v{n})`.
pub fn version_string() -> String {
    let dirty_suffix = if option_env!("VERGEN_GIT_DIRTY") == Some("true") {
        ".dirty"
    } else {
        ""
    };
    let sha: String = GIT_SHA.chars().take(7).collect();
    format!("{PKG_VERSION}+{GIT_BRANCH}.{sha}{dirty_suffix} (schema v{SCHEMA_VERSION})")
}
