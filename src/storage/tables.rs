use redb::TableDefinition;

/// Content records: id -> ContentRecord (msgpack)
pub const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Folder index: media_path -> msgpack Vec of record ids sharing that folder
pub const FOLDER_RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("folder_records");
