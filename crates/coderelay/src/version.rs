//! Version information for coderelay.

/// Coderelay version from Cargo.toml
pub const CODERELAY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version information reported on the health endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VersionInfo {
    pub coderelay: &'static str,
    /// Compiler executable the bridge drives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            coderelay: CODERELAY_VERSION,
            compiler: None,
        }
    }
}

impl VersionInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = Some(compiler.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_info_has_crate_version() {
        let info = VersionInfo::new();
        assert_eq!(info.coderelay, CODERELAY_VERSION);
        assert!(info.compiler.is_none());
    }

    #[test]
    fn version_info_serializes_minimal() {
        let info = VersionInfo {
            coderelay: "0.1.0",
            compiler: None,
        };
        insta::assert_json_snapshot!(info, @r#"
        {
          "coderelay": "0.1.0"
        }
        "#);
    }

    #[test]
    fn version_info_serializes_full() {
        let info = VersionInfo {
            coderelay: "0.1.0",
            compiler: None,
        }
        .with_compiler("./compiler");
        insta::assert_json_snapshot!(info, @r#"
        {
          "coderelay": "0.1.0",
          "compiler": "./compiler"
        }
        "#);
    }
}
