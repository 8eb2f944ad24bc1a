//! Test environment abstraction for isolated testing.
//!
//! Provides `TestEnvironment` to manage:
//! - a throwaway world root for region files
//! - a project config directory (`.tessera/`)
//!
//! # Usage
//!
//! ```ignore
//! use tessera_config::testing::TestEnvironment;
//!
//! #[test]
//! fn test_something() {
//!     let env = TestEnvironment::new().unwrap();
//!     let path = env.region_path(0, -1);
//!     // path lives under env.world_root and is removed on drop
//! }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

use crate::{Config, StorageConfig};

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated test environment with its own world root and config directory
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Directory holding region files
    pub world_root: PathBuf,
    /// Project-local config directory
    pub config_dir: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        let world_root = root.join(format!("world-{}", test_id)).join("region");
        let config_dir = root.join(".tessera");

        std::fs::create_dir_all(&world_root)?;
        std::fs::create_dir_all(&config_dir)?;

        Ok(Self {
            _temp_dir: temp_dir,
            world_root,
            config_dir,
            test_id,
        })
    }

    /// Path of the region file for region coordinates `(x, z)`
    pub fn region_path(&self, x: i32, z: i32) -> PathBuf {
        self.world_root.join(format!("r.{}.{}.mca", x, z))
    }

    /// Path of the project config file
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Write raw bytes to a file under the world root
    pub fn write_file(&self, relative_path: &str, content: &[u8]) -> anyhow::Result<PathBuf> {
        let path = self.world_root.join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Config pointing at this environment's world root
    pub fn config(&self) -> Config {
        Config {
            storage: StorageConfig {
                world_root: self.world_root.clone(),
                ..StorageConfig::default()
            },
            ..Config::default()
        }
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
