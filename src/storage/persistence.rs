//! Snapshot files for the in-memory store

use super::{ActivityLog, EntityTable};
use crate::core::{DbError, Result};
use crate::schema::ModelSchema;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub schemas: Vec<ModelSchema>,
    pub tables: HashMap<String, EntityTable>,
    pub activities: ActivityLog,
    pub next_transaction_id: i64,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub row_count: usize,
    pub table_count: usize,
    pub activity_count: usize,
}

impl StoreSnapshot {
    pub fn new(
        schemas: Vec<ModelSchema>,
        tables: HashMap<String, EntityTable>,
        activities: ActivityLog,
        next_transaction_id: i64,
    ) -> Self {
        let metadata = SnapshotMetadata {
            created_at: Utc::now(),
            row_count: tables.values().map(EntityTable::row_count).sum(),
            table_count: tables.len(),
            activity_count: activities.len(),
        };

        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            schemas,
            tables,
            activities,
            next_transaction_id,
            metadata,
        }
    }
}

/// Reads and atomically writes MessagePack snapshot files.
pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }

    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let parent = match self.snapshot_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .map_err(|e| DbError::IoError(format!("Failed to create snapshot directory: {}", e)))?;

        let serialized = rmp_serde::to_vec(snapshot)
            .map_err(|e| DbError::ExecutionError(format!("Failed to serialize snapshot: {}", e)))?;

        let temp_file = NamedTempFile::new_in(&parent)
            .map_err(|e| DbError::IoError(format!("Failed to create temp file: {}", e)))?;
        {
            let mut writer = BufWriter::new(temp_file.as_file());
            writer
                .write_all(&serialized)
                .map_err(|e| DbError::IoError(format!("Failed to write snapshot: {}", e)))?;
            writer
                .flush()
                .map_err(|e| DbError::IoError(format!("Failed to flush snapshot: {}", e)))?;
        }
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| DbError::IoError(format!("Failed to sync snapshot: {}", e)))?;
        temp_file
            .persist(&self.snapshot_path)
            .map_err(|e| DbError::IoError(format!("Failed to move snapshot into place: {}", e)))?;
        Ok(())
    }

    pub fn load(&self) -> Result<StoreSnapshot> {
        let file = File::open(&self.snapshot_path)
            .map_err(|e| DbError::IoError(format!("Failed to open snapshot: {}", e)))?;
        let mut reader = BufReader::new(file);
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| DbError::IoError(format!("Failed to read snapshot: {}", e)))?;

        let snapshot: StoreSnapshot = rmp_serde::from_slice(&data)
            .map_err(|e| DbError::ExecutionError(format!("Failed to deserialize snapshot: {}", e)))?;
        if snapshot.version != SNAPSHOT_FORMAT_VERSION {
            return Err(DbError::ExecutionError(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        Ok(snapshot)
    }
}
