//! Temporary project directories

use pipewatch_deployer::config::ProjectLayout;
use std::path::Path;
use tempfile::TempDir;

/// A temp directory laid out like a pipewatch project
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    /// Empty directory: no inputs, no generated files
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Directory with every deployment input present
    pub fn complete() -> Self {
        let fixture = Self::empty();
        let layout = fixture.layout();
        std::fs::create_dir_all(layout.cdk_dir()).unwrap();
        std::fs::create_dir_all(layout.agent_container_dir()).unwrap();
        let config = layout.notification_config();
        std::fs::create_dir_all(config.parent().unwrap()).unwrap();
        std::fs::write(config, "notification_emails:\n  - ops@example.com\n").unwrap();
        fixture
    }

    /// Add a generated `pipeline_config/stages.json`
    pub fn with_pipeline_config(self) -> Self {
        let stages = self.layout().stages_file();
        std::fs::create_dir_all(stages.parent().unwrap()).unwrap();
        std::fs::write(stages, r#"{"pipeline_name":"p","stages":[]}"#).unwrap();
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(self.dir.path())
    }
}
