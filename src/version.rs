//! Version and build information
//!
//! Build metadata is embedded at compile time by `build.rs`; the bundled
//! data-table summary is computed from the loaded tables.

use std::fmt;

use crate::catalog::Catalog;
use crate::validation::CriteriaTable;

/// Build information embedded at compile time
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Package version from Cargo.toml
    pub version: &'static str,
    /// Package name
    pub name: &'static str,
    /// Git commit hash (short)
    pub git_hash: &'static str,
    /// Git branch name
    pub git_branch: &'static str,
    git_dirty_str: &'static str,
    /// Build timestamp
    pub build_timestamp: &'static str,
    /// Target triple
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
    /// Rustc version used to build
    pub rustc_version: &'static str,
    /// Host triple (build machine)
    pub host: &'static str,
}

impl BuildInfo {
    /// Get the current build information
    pub const fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            name: env!("CARGO_PKG_NAME"),
            git_hash: env!("PERSONA_FORGE_GIT_HASH"),
            git_branch: env!("PERSONA_FORGE_GIT_BRANCH"),
            git_dirty_str: env!("PERSONA_FORGE_GIT_DIRTY"),
            build_timestamp: env!("PERSONA_FORGE_BUILD_TIMESTAMP"),
            target: env!("PERSONA_FORGE_TARGET"),
            profile: env!("PERSONA_FORGE_PROFILE"),
            rustc_version: env!("PERSONA_FORGE_RUSTC_VERSION"),
            host: env!("PERSONA_FORGE_HOST"),
        }
    }

    /// Whether the working directory was dirty at build time
    pub fn git_dirty(&self) -> bool {
        self.git_dirty_str == "true"
    }

    /// Full version string (e.g., "0.1.0-abc1234")
    pub fn full_version(&self) -> String {
        if self.git_dirty() {
            format!("{}-{}-dirty", self.version, self.git_hash)
        } else {
            format!("{}-{}", self.version, self.git_hash)
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.full_version())?;
        writeln!(f)?;
        writeln!(f, "Build Information:")?;
        writeln!(f, "  Version:    {}", self.version)?;
        writeln!(f, "  Git Hash:   {}{}", self.git_hash, if self.git_dirty() { " (dirty)" } else { "" })?;
        writeln!(f, "  Git Branch: {}", self.git_branch)?;
        writeln!(f, "  Built:      {}", self.build_timestamp)?;
        writeln!(f, "  Profile:    {}", self.profile)?;
        writeln!(f, "  Target:     {}", self.target)?;
        writeln!(f, "  Host:       {}", self.host)?;
        writeln!(f, "  Compiler:   {}", self.rustc_version)?;
        Ok(())
    }
}

/// Get the current build info
pub fn build_info() -> BuildInfo {
    BuildInfo::current()
}

/// Print version information, followed by a summary of the bundled tables
pub fn print_version() {
    print!("{}", build_info());
    println!();
    println!("Data Tables:");
    match Catalog::bundled() {
        Ok(catalog) => {
            println!("  Characteristics:         {}", catalog.len());
            println!("  Reference distributions: {}", catalog.reference().distributions().len());
            println!("  Correlation rules:       {}", catalog.rules().correlations.len());
        }
        Err(e) => println!("  Catalog unavailable: {}", e),
    }
    match CriteriaTable::bundled() {
        Ok(table) => println!("  Validation criteria:     {}", table.len()),
        Err(e) => println!("  Criteria unavailable: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_exists() {
        let info = build_info();
        assert!(!info.version.is_empty());
        assert_eq!(info.name, "persona-forge");
    }

    #[test]
    fn test_full_version_contains_hash() {
        let info = build_info();
        let full = info.full_version();
        assert!(full.starts_with(info.version));
        assert!(full.contains(info.git_hash));
    }

    #[test]
    fn test_display_format() {
        let display = format!("{}", build_info());
        assert!(display.contains("Version:"));
        assert!(display.contains("Git Hash:"));
        assert!(display.contains("Target:"));
    }
}
