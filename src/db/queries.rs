//! SQL query constants and builders
//!
//! Contains all SQL used by the PostgreSQL gateway. Every table lives in one
//! `records` table keyed by `(table_name, id)` with the payload in `data`.

/// Record storage table
pub const CREATE_RECORDS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS records (
        table_name VARCHAR(64) NOT NULL,
        id UUID NOT NULL,
        version BIGINT NOT NULL DEFAULT 1,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (table_name, id)
    )
"#;

/// Newest-first listing per table
pub const CREATE_TABLE_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_records_table_created
    ON records (table_name, created_at DESC)
"#;

/// Settings keys are unique
pub const CREATE_SETTINGS_KEY_INDEX: &str = r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_records_settings_key
    ON records ((data ->> 'key'))
    WHERE table_name = 'settings'
"#;

/// Profile emails are unique
pub const CREATE_PROFILE_EMAIL_INDEX: &str = r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_records_profiles_email
    ON records ((lower(data ->> 'email')))
    WHERE table_name = 'profiles'
"#;

/// Child lookups (media by center, payments by booking, ...)
pub const CREATE_DATA_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_records_data
    ON records USING GIN (data jsonb_path_ops)
"#;

pub const BOOTSTRAP: [&str; 5] = [
    CREATE_RECORDS_TABLE,
    CREATE_TABLE_INDEX,
    CREATE_SETTINGS_KEY_INDEX,
    CREATE_PROFILE_EMAIL_INDEX,
    CREATE_DATA_INDEX,
];

/// Insert a record: $1 table, $2 id, $3 data, $4 timestamp
pub const INSERT_RECORD: &str = r#"
    INSERT INTO records (table_name, id, version, data, created_at, updated_at)
    VALUES ($1, $2, 1, $3, $4, $4)
"#;

/// Replace a record payload: $1 data, $2 version, $3 timestamp, $4 table, $5 id
pub const UPDATE_RECORD: &str = r#"
    UPDATE records
    SET data = $1, version = $2, updated_at = $3
    WHERE table_name = $4 AND id = $5
"#;

/// Builder for the dynamic parts of record queries. Field names are always
/// bound as parameters, never interpolated.
pub struct SqlBuilder {
    sql: String,
    next_param: usize,
}

impl SqlBuilder {
    pub fn new(head: &str) -> Self {
        Self {
            sql: head.to_string(),
            next_param: 1,
        }
    }

    /// Reserve the next `$n` placeholder
    pub fn param(&mut self) -> String {
        let placeholder = format!("${}", self.next_param);
        self.next_param += 1;
        placeholder
    }

    pub fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    /// JSONB field access expression with a bound field name
    pub fn field_expr(&mut self) -> String {
        format!("(data -> {}::text)", self.param())
    }

    pub fn finish(self) -> String {
        self.sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_numbers_params() {
        let mut builder = SqlBuilder::new("SELECT data FROM records WHERE table_name = ");
        let table = builder.param();
        builder.push(&table);
        let field = builder.field_expr();
        let value = builder.param();
        builder.push(&format!(" AND {} = {}::jsonb", field, value));

        assert_eq!(
            builder.finish(),
            "SELECT data FROM records WHERE table_name = $1 AND (data -> $2::text) = $3::jsonb"
        );
    }
}
