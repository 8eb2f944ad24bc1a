//! Mapping from world chunk coordinates to region files.
//!
//! ```text
//! <world_root>/r.<rx>.<rz>.mca   rx = floor(cx / 32), rz = floor(cz / 32)
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tessera_config::{log_world_debug, log_world_info, StorageConfig};
use tessera_nbt::NamedTag;
use tracing::field;

use crate::error::{RegionError, Result};
use crate::metadata::REGION_WIDTH;
use crate::region::{RegionFile, RegionOptions};

/// Global chunk coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Region holding this chunk.
    pub fn region(self) -> RegionPos {
        RegionPos {
            x: self.x.div_euclid(REGION_WIDTH as i32),
            z: self.z.div_euclid(REGION_WIDTH as i32),
        }
    }

    /// Slot coordinates inside the region, each in `0..32`.
    pub fn local(self) -> (usize, usize) {
        (
            self.x.rem_euclid(REGION_WIDTH as i32) as usize,
            self.z.rem_euclid(REGION_WIDTH as i32) as usize,
        )
    }
}

/// Region coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn file_name(self) -> String {
        format!("r.{}.{}.mca", self.x, self.z)
    }
}

impl fmt::Display for RegionPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Region files under one directory, opened on demand and kept open.
///
/// Only the file a coordinate addresses is ever touched; the directory is
/// never listed.
pub struct WorldRegions {
    root: PathBuf,
    options: RegionOptions,
    create_missing: bool,
    regions: HashMap<RegionPos, RegionFile>,
}

impl WorldRegions {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            options: RegionOptions::default(),
            create_missing: true,
            regions: HashMap::new(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            root: config.world_root.clone(),
            options: RegionOptions::from(config),
            create_missing: config.create_missing,
            regions: HashMap::new(),
        }
    }

    /// Regions as configured by the process-wide [`tessera_config::config`].
    pub fn from_global() -> Self {
        Self::from_config(&tessera_config::config().storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn region_path(&self, pos: RegionPos) -> PathBuf {
        self.root.join(pos.file_name())
    }

    /// Number of region files currently held open.
    pub fn open_count(&self) -> usize {
        self.regions.len()
    }

    fn region(&mut self, pos: RegionPos, create: bool) -> Result<Option<&mut RegionFile>> {
        if !self.regions.contains_key(&pos) {
            let path = self.region_path(pos);
            let region = if path.exists() {
                log_world_debug!("Opening region", region = field::display(pos));
                RegionFile::open(&path)?
            } else if create {
                fs::create_dir_all(&self.root)?;
                log_world_info!("Creating region", region = field::display(pos));
                RegionFile::create(&path)?
            } else {
                return Ok(None);
            };
            self.regions.insert(pos, region.with_options(self.options));
        }
        Ok(self.regions.get_mut(&pos))
    }

    /// Open an existing region without creating it.
    pub fn open_region(&mut self, pos: RegionPos) -> Result<Option<&mut RegionFile<File>>> {
        self.region(pos, false)
    }

    /// Read a chunk. A missing region file is reported with the global
    /// coordinates that were asked for.
    pub fn get_chunk(&mut self, pos: ChunkPos) -> Result<NamedTag> {
        let (x, z) = pos.local();
        match self.region(pos.region(), false)? {
            Some(region) => region.get(x, z),
            None => Err(missing_region(pos)),
        }
    }

    /// Write a chunk, creating its region file when `create_missing` is set.
    pub fn put_chunk(&mut self, pos: ChunkPos, tag: &NamedTag) -> Result<()> {
        let (x, z) = pos.local();
        let create = self.create_missing;
        match self.region(pos.region(), create)? {
            Some(region) => region.put(x, z, tag),
            None => Err(missing_region(pos)),
        }
    }

    /// Delete a chunk. A missing region file means there is nothing to do.
    pub fn delete_chunk(&mut self, pos: ChunkPos) -> Result<()> {
        let (x, z) = pos.local();
        match self.region(pos.region(), false)? {
            Some(region) => region.delete(x, z),
            None => Ok(()),
        }
    }

    /// Flush and close every open region.
    pub fn close(self) -> Result<()> {
        for (_, region) in self.regions {
            region.close()?;
        }
        Ok(())
    }
}

fn missing_region(pos: ChunkPos) -> RegionError {
    RegionError::MissingRegion {
        x: pos.x,
        z: pos.z,
        file: pos.region().file_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_to_region_mapping() {
        let pos = ChunkPos::new(33, -1);
        assert_eq!(pos.region(), RegionPos::new(1, -1));
        assert_eq!(pos.local(), (1, 31));

        let pos = ChunkPos::new(-32, -33);
        assert_eq!(pos.region(), RegionPos::new(-1, -2));
        assert_eq!(pos.local(), (0, 31));

        assert_eq!(ChunkPos::new(31, 0).region(), RegionPos::new(0, 0));
    }

    #[test]
    fn test_from_global_uses_loaded_config() {
        let world = WorldRegions::from_global();
        let config = tessera_config::config();
        assert_eq!(world.root(), config.storage.world_root.as_path());
        assert_eq!(world.create_missing, config.storage.create_missing);
        assert_eq!(
            world.options.compression_level,
            config.storage.compression_level
        );
        assert_eq!(world.open_count(), 0);
    }

    #[test]
    fn test_missing_region_error_names_global_chunk() {
        let err = missing_region(ChunkPos::new(-33, 64));
        assert!(matches!(
            err,
            RegionError::MissingRegion { x: -33, z: 64, ref file } if file == "r.-2.2.mca"
        ));
    }

    #[test]
    fn test_region_file_name() {
        assert_eq!(RegionPos::new(0, 0).file_name(), "r.0.0.mca");
        assert_eq!(RegionPos::new(-3, 12).file_name(), "r.-3.12.mca");
    }
}
