//! Simple test infrastructure shared by every suite

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test environment
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Temporary directory holding translation catalogues
pub struct TranslationDir {
    pub dir: tempfile::TempDir,
}

impl TranslationDir {
    pub fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        init_test_env();
        Ok(Self { dir: tempfile::tempdir()? })
    }

    /// Write `{lang}.json` with the given content
    pub fn write(&self, lang: &str, content: &str) -> std::io::Result<()> {
        std::fs::write(self.dir.path().join(format!("{}.json", lang)), content)
    }

    pub fn path(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }
}
