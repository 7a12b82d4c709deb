//! Schema definitions shared by the storage backends.

/// Drops the votes table, discarding every stored vote.
pub const DROP_VOTES_TABLE: &str = "DROP TABLE IF EXISTS votes";

/// One row per voter; the latest vote overwrites the previous one.
pub const CREATE_VOTES_TABLE: &str = r#"
CREATE TABLE votes (
    id VARCHAR(255) NOT NULL PRIMARY KEY,
    vote VARCHAR(255) NOT NULL
)
"#;

/// Quote an identifier for interpolation into DDL.
///
/// Database names cannot be bound as parameters, so embedded double
/// quotes are doubled per the SQL standard.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
