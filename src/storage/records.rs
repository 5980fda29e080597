use std::collections::BTreeMap;

use redb::{ReadableTable, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::ContentRecord;
use super::tables::*;
use crate::upload::FieldSettings;

impl Database {
    // ========================================================================
    // Record operations
    // ========================================================================

    /// Store a record and update the folder index
    pub fn put_record(&self, record: &ContentRecord) -> Result<(), DatabaseError> {
        debug_assert!(!record.id.is_empty(), "record id must not be empty");

        let write_txn = self.begin_write()?;
        {
            // Replacing a record may move it to another folder
            let previous: Option<ContentRecord> = {
                let table = write_txn.open_table(RECORDS)?;
                let result = match table.get(record.id.as_str())? {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                };
                result
            };
            if let Some(previous) = previous {
                if previous.media_path != record.media_path {
                    unlink_folder(&write_txn, &previous.media_path, &record.id)?;
                }
            }

            let mut table = write_txn.open_table(RECORDS)?;
            let data = rmp_serde::to_vec_named(record)?;
            table.insert(record.id.as_str(), data.as_slice())?;

            link_folder(&write_txn, &record.media_path, &record.id)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a record by id
    pub fn get_record(&self, id: &str) -> Result<Option<ContentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;

        match table.get(id)? {
            Some(data) => {
                let record: ContentRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Ids of every record whose media lives in `media_path`
    pub fn get_records_by_folder(&self, media_path: &str) -> Result<Vec<String>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FOLDER_RECORDS)?;

        match table.get(media_path)? {
            Some(data) => Ok(rmp_serde::from_slice(data.value())?),
            None => Ok(Vec::new()),
        }
    }

    /// Delete a record and clean up the folder index
    pub fn delete_record(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let media_path: Option<String> = {
            let table = write_txn.open_table(RECORDS)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let record: ContentRecord = rmp_serde::from_slice(data.value())?;
                    Some(record.media_path)
                }
                None => None,
            };
            result
        };

        let deleted = match media_path {
            Some(media_path) => {
                {
                    let mut table = write_txn.open_table(RECORDS)?;
                    table.remove(id)?;
                }
                unlink_folder(&write_txn, &media_path, id)?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    /// Update a record's title and field settings
    pub fn update_record(
        &self,
        id: &str,
        title: Option<Option<&str>>,
        fields: Option<&BTreeMap<String, FieldSettings>>,
    ) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing: Option<ContentRecord> = {
            let table = write_txn.open_table(RECORDS)?;
            let result = match table.get(id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            result
        };

        let updated = match existing {
            Some(mut record) => {
                if let Some(t) = title {
                    record.title = t.map(|s| s.to_string());
                }
                if let Some(f) = fields {
                    record.fields = f.clone();
                }
                record.updated_at = chrono::Utc::now();

                let serialized = rmp_serde::to_vec_named(&record)?;
                let mut table = write_txn.open_table(RECORDS)?;
                table.insert(id, serialized.as_slice())?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(updated)
    }

    /// Get all records
    pub fn get_all_records(&self) -> Result<Vec<ContentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;

        let mut records = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let record: ContentRecord = rmp_serde::from_slice(value.value())?;
            records.push(record);
        }

        Ok(records)
    }

    /// List records, optionally only those sharing `media_path`
    pub fn list_records(&self, media_path: Option<&str>) -> Result<Vec<ContentRecord>, DatabaseError> {
        let Some(media_path) = media_path else {
            return self.get_all_records();
        };

        let mut records = Vec::new();
        for id in self.get_records_by_folder(media_path)? {
            if let Some(record) = self.get_record(&id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Check if a record id is already in use
    pub fn record_exists(&self, id: &str) -> Result<bool, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        Ok(table.get(id)?.is_some())
    }
}

fn link_folder(write_txn: &WriteTransaction, media_path: &str, id: &str) -> Result<(), DatabaseError> {
    let mut table = write_txn.open_table(FOLDER_RECORDS)?;
    let mut ids: Vec<String> = table
        .get(media_path)?
        .map(|v| rmp_serde::from_slice(v.value()).unwrap_or_default())
        .unwrap_or_default();

    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
        let data = rmp_serde::to_vec_named(&ids)?;
        table.insert(media_path, data.as_slice())?;
    }
    Ok(())
}

fn unlink_folder(write_txn: &WriteTransaction, media_path: &str, id: &str) -> Result<(), DatabaseError> {
    let ids: Option<Vec<String>> = {
        let table = write_txn.open_table(FOLDER_RECORDS)?;
        let result = match table.get(media_path)? {
            Some(data) => Some(rmp_serde::from_slice(data.value())?),
            None => None,
        };
        result
    };

    if let Some(mut ids) = ids {
        ids.retain(|rid| rid != id);
        let mut table = write_txn.open_table(FOLDER_RECORDS)?;
        if ids.is_empty() {
            table.remove(media_path)?;
        } else {
            let data = rmp_serde::to_vec_named(&ids)?;
            table.insert(media_path, data.as_slice())?;
        }
    }
    Ok(())
}
