use std::path::{Path, PathBuf};

pub const DEFAULT_DUMP_EXTENSION: &str = "dat";

/// Inputs and output of one corpus run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Directory of `<version label>.<extension>` dump files.
    pub dumps_dir: PathBuf,
    /// Global string blob shared by every dump.
    pub strings_path: PathBuf,
    /// Where the packaged artifact is written.
    pub output: Option<PathBuf>,
    pub extension: String,
}

impl BuildConfig {
    pub fn new(dumps_dir: impl Into<PathBuf>, strings_path: impl Into<PathBuf>) -> Self {
        Self {
            dumps_dir: dumps_dir.into(),
            strings_path: strings_path.into(),
            output: None,
            extension: DEFAULT_DUMP_EXTENSION.to_string(),
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// True if `path` looks like a dump file of this corpus.
    pub fn is_dump_file(&self, path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_builders() {
        let config = BuildConfig::new("dumps", "strings.dat");
        assert_eq!(config.extension, "dat");
        assert!(config.output.is_none());

        let config = config.with_output("trees.bin").with_extension(".bin");
        assert_eq!(config.output.as_deref(), Some(Path::new("trees.bin")));
        assert_eq!(config.extension, "bin");
    }
}
