/// Typed schema model and migration catalog
///
/// The database schema is described here as plain Rust values. Each
/// migration is a list of [`SchemaChange`]s that can be rendered to
/// PostgreSQL DDL, inverted, and replayed against an in-memory
/// [`SchemaSnapshot`]. The snapshot obtained by applying every migration in
/// [`catalog::catalog`] mirrors the live schema and is what new migrations
/// are diffed against.
///
/// The SQL files under `migrations/` are the executable form consumed by
/// sqlx; the schema tests check that they match what the catalog renders.
///
/// # Example
///
/// ```
/// use nong_identity_shared::schema::{catalog, ColumnType};
///
/// let snapshot = catalog::current_snapshot().unwrap();
/// let created = snapshot.column("AuditLog", "Created").unwrap();
/// assert_eq!(created.ty, ColumnType::TimestampTz);
/// ```

pub mod catalog;

use std::collections::BTreeMap;
use std::fmt;

/// Error raised when a change does not fit the current snapshot
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Table {0} does not exist")]
    TableNotFound(String),

    #[error("Table {0} already exists")]
    TableExists(String),

    #[error("Column {table}.{column} does not exist")]
    ColumnNotFound { table: String, column: String },

    #[error("Column {table}.{column} already exists")]
    ColumnExists { table: String, column: String },

    #[error("Column {table}.{column} has type {actual}, expected {expected}")]
    TypeMismatch {
        table: String,
        column: String,
        expected: ColumnType,
        actual: ColumnType,
    },

    #[error("Column {table}.{column} does not match its recorded definition")]
    DefinitionMismatch { table: String, column: String },
}

/// PostgreSQL column types used by the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Text,
    Varchar(u32),
    Integer,
    BigInt,
    DoublePrecision,
    Boolean,
    Timestamp,
    TimestampTz,
}

impl ColumnType {
    /// Name as reported by PostgreSQL (`information_schema.columns.data_type`
    /// plus length for varchar)
    pub fn sql_name(&self) -> String {
        match self {
            ColumnType::Text => "text".to_string(),
            ColumnType::Varchar(len) => format!("character varying({})", len),
            ColumnType::Integer => "integer".to_string(),
            ColumnType::BigInt => "bigint".to_string(),
            ColumnType::DoublePrecision => "double precision".to_string(),
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::Timestamp => "timestamp without time zone".to_string(),
            ColumnType::TimestampTz => "timestamp with time zone".to_string(),
        }
    }

    /// Maximum length for bounded strings
    pub fn max_length(&self) -> Option<u32> {
        match self {
            ColumnType::Varchar(len) => Some(*len),
            _ => None,
        }
    }

    fn is_timestamp(&self) -> bool {
        matches!(self, ColumnType::Timestamp | ColumnType::TimestampTz)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_name())
    }
}

/// Column default
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Text(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    /// Timestamp literal, e.g. `0001-01-01 00:00:00+00`
    Timestamp(String),
}

impl DefaultValue {
    pub fn to_sql(&self) -> String {
        match self {
            DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            DefaultValue::Integer(i) => i.to_string(),
            DefaultValue::Double(d) => format!("{:?}", d),
            DefaultValue::Boolean(true) => "TRUE".to_string(),
            DefaultValue::Boolean(false) => "FALSE".to_string(),
            DefaultValue::Timestamp(s) => format!("'{}'", s),
        }
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    /// `GENERATED BY DEFAULT AS IDENTITY`
    pub identity: bool,
}

impl ColumnDef {
    /// Nullable column without default
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            default: None,
            identity: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self.nullable = false;
        self
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("\"{}\" {}", self.name, self.ty.sql_name());
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql());
        }
        if self.identity {
            sql.push_str(" GENERATED BY DEFAULT AS IDENTITY");
        }
        sql
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDef {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Foreign key; children are always deleted with their parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub name: String,
    pub columns: Vec<String>,
    pub references_table: String,
    pub references_columns: Vec<String>,
    pub on_delete_cascade: bool,
}

impl ForeignKeyDef {
    pub fn cascade(name: impl Into<String>, column: &str, table: &str, references: &str) -> Self {
        Self {
            name: name.into(),
            columns: vec![column.to_string()],
            references_table: table.to_string(),
            references_columns: vec![references.to_string()],
            on_delete_cascade: true,
        }
    }
}

/// Table definition
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
    pub indexes: Vec<IndexDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn foreign_key(mut self, fk: ForeignKeyDef) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn find_column_mut(&mut self, name: &str) -> Option<&mut ColumnDef> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    fn create_statements(&self) -> Vec<String> {
        let mut parts: Vec<String> = self.columns.iter().map(ColumnDef::to_sql).collect();

        if !self.primary_key.is_empty() {
            parts.push(format!(
                "CONSTRAINT \"PK_{}\" PRIMARY KEY ({})",
                self.name,
                quote_list(&self.primary_key)
            ));
        }

        for fk in &self.foreign_keys {
            let mut constraint = format!(
                "CONSTRAINT \"{}\" FOREIGN KEY ({}) REFERENCES \"{}\" ({})",
                fk.name,
                quote_list(&fk.columns),
                fk.references_table,
                quote_list(&fk.references_columns)
            );
            if fk.on_delete_cascade {
                constraint.push_str(" ON DELETE CASCADE");
            }
            parts.push(constraint);
        }

        let mut statements = vec![format!(
            "CREATE TABLE \"{}\" ({})",
            self.name,
            parts.join(", ")
        )];

        for index in &self.indexes {
            statements.push(format!(
                "CREATE {}INDEX \"{}\" ON \"{}\" ({})",
                if index.unique { "UNIQUE " } else { "" },
                index.name,
                self.name,
                quote_list(&index.columns)
            ));
        }

        statements
    }
}

fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("\"{}\"", n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A single reversible schema delta
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaChange {
    CreateTable(TableDef),
    DropTable(TableDef),
    AddColumn { table: String, column: ColumnDef },
    /// Carries the full definition so the drop can be inverted
    DropColumn { table: String, column: ColumnDef },
    AlterColumnType {
        table: String,
        column: String,
        from: ColumnType,
        to: ColumnType,
    },
}

impl SchemaChange {
    pub fn add_column(table: &str, column: ColumnDef) -> Self {
        SchemaChange::AddColumn {
            table: table.to_string(),
            column,
        }
    }

    pub fn alter_column_type(table: &str, column: &str, from: ColumnType, to: ColumnType) -> Self {
        SchemaChange::AlterColumnType {
            table: table.to_string(),
            column: column.to_string(),
            from,
            to,
        }
    }

    /// Table the change applies to
    pub fn table(&self) -> &str {
        match self {
            SchemaChange::CreateTable(t) | SchemaChange::DropTable(t) => &t.name,
            SchemaChange::AddColumn { table, .. }
            | SchemaChange::DropColumn { table, .. }
            | SchemaChange::AlterColumnType { table, .. } => table,
        }
    }

    /// The change that undoes this one
    pub fn inverse(&self) -> SchemaChange {
        match self {
            SchemaChange::CreateTable(t) => SchemaChange::DropTable(t.clone()),
            SchemaChange::DropTable(t) => SchemaChange::CreateTable(t.clone()),
            SchemaChange::AddColumn { table, column } => SchemaChange::DropColumn {
                table: table.clone(),
                column: column.clone(),
            },
            SchemaChange::DropColumn { table, column } => SchemaChange::AddColumn {
                table: table.clone(),
                column: column.clone(),
            },
            SchemaChange::AlterColumnType {
                table,
                column,
                from,
                to,
            } => SchemaChange::AlterColumnType {
                table: table.clone(),
                column: column.clone(),
                from: *to,
                to: *from,
            },
        }
    }

    /// PostgreSQL statements for this change, without trailing semicolons
    pub fn statements(&self) -> Vec<String> {
        match self {
            SchemaChange::CreateTable(t) => t.create_statements(),
            SchemaChange::DropTable(t) => vec![format!("DROP TABLE \"{}\"", t.name)],
            SchemaChange::AddColumn { table, column } => {
                vec![format!("ALTER TABLE \"{}\" ADD {}", table, column.to_sql())]
            }
            SchemaChange::DropColumn { table, column } => vec![format!(
                "ALTER TABLE \"{}\" DROP COLUMN \"{}\"",
                table, column.name
            )],
            SchemaChange::AlterColumnType {
                table,
                column,
                from,
                to,
            } => {
                let mut sql = format!(
                    "ALTER TABLE \"{}\" ALTER COLUMN \"{}\" TYPE {}",
                    table,
                    column,
                    to.sql_name()
                );
                // Stored wall clocks are UTC, so reinterpret them in UTC
                // rather than in the session time zone.
                if from.is_timestamp() && to.is_timestamp() {
                    sql.push_str(&format!(" USING \"{}\" AT TIME ZONE 'UTC'", column));
                }
                vec![sql]
            }
        }
    }
}

/// A versioned, reversible group of changes
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    /// Timestamp-style version, also the sqlx migration version
    pub version: i64,

    /// Snake-case description, matches the migration file name
    pub name: &'static str,

    pub changes: Vec<SchemaChange>,
}

impl Migration {
    pub fn new(version: i64, name: &'static str, changes: Vec<SchemaChange>) -> Self {
        Self {
            version,
            name,
            changes,
        }
    }

    /// File stem used under `migrations/`
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.version, self.name)
    }

    /// Changes that undo this migration, in application order
    pub fn inverse_changes(&self) -> Vec<SchemaChange> {
        self.changes.iter().rev().map(SchemaChange::inverse).collect()
    }

    pub fn up_statements(&self) -> Vec<String> {
        self.changes.iter().flat_map(SchemaChange::statements).collect()
    }

    pub fn down_statements(&self) -> Vec<String> {
        self.inverse_changes()
            .iter()
            .flat_map(SchemaChange::statements)
            .collect()
    }

    pub fn up_sql(&self) -> String {
        render_script(&self.up_statements())
    }

    pub fn down_sql(&self) -> String {
        render_script(&self.down_statements())
    }
}

fn render_script(statements: &[String]) -> String {
    statements
        .iter()
        .map(|s| format!("{};\n", s))
        .collect()
}

/// Splits a SQL script into comparable statements
///
/// Drops `--` comments, collapses whitespace and removes padding inside
/// parentheses and before commas, so formatting differences do not matter.
pub fn normalize_sql(script: &str) -> Vec<String> {
    let without_comments: String = script
        .lines()
        .map(|line| match line.find("--") {
            Some(pos) => &line[..pos],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(|stmt| {
            stmt.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .replace("( ", "(")
                .replace(" )", ")")
                .replace(" ,", ",")
        })
        .filter(|stmt| !stmt.is_empty())
        .collect()
}

/// In-memory mirror of the schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaSnapshot {
    tables: BTreeMap<String, TableDef>,
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.values()
    }

    pub fn column(&self, table: &str, column: &str) -> Option<&ColumnDef> {
        self.tables.get(table).and_then(|t| t.find_column(column))
    }

    /// Applies a single change after checking it fits the current shape
    pub fn apply(&mut self, change: &SchemaChange) -> Result<(), SchemaError> {
        match change {
            SchemaChange::CreateTable(t) => {
                if self.tables.contains_key(&t.name) {
                    return Err(SchemaError::TableExists(t.name.clone()));
                }
                self.tables.insert(t.name.clone(), t.clone());
            }
            SchemaChange::DropTable(t) => {
                if self.tables.remove(&t.name).is_none() {
                    return Err(SchemaError::TableNotFound(t.name.clone()));
                }
            }
            SchemaChange::AddColumn { table, column } => {
                let t = self.table_mut(table)?;
                if t.find_column(&column.name).is_some() {
                    return Err(SchemaError::ColumnExists {
                        table: table.clone(),
                        column: column.name.clone(),
                    });
                }
                t.columns.push(column.clone());
            }
            SchemaChange::DropColumn { table, column } => {
                let t = self.table_mut(table)?;
                let existing = t.find_column(&column.name).ok_or_else(|| {
                    SchemaError::ColumnNotFound {
                        table: table.clone(),
                        column: column.name.clone(),
                    }
                })?;
                if existing != column {
                    return Err(SchemaError::DefinitionMismatch {
                        table: table.clone(),
                        column: column.name.clone(),
                    });
                }
                t.columns.retain(|c| c.name != column.name);
            }
            SchemaChange::AlterColumnType {
                table,
                column,
                from,
                to,
            } => {
                let t = self.table_mut(table)?;
                let existing =
                    t.find_column_mut(column)
                        .ok_or_else(|| SchemaError::ColumnNotFound {
                            table: table.clone(),
                            column: column.clone(),
                        })?;
                if existing.ty != *from {
                    return Err(SchemaError::TypeMismatch {
                        table: table.clone(),
                        column: column.clone(),
                        expected: *from,
                        actual: existing.ty,
                    });
                }
                existing.ty = *to;
            }
        }
        Ok(())
    }

    /// Applies every change of a migration; stops at the first failure
    pub fn apply_migration(&mut self, migration: &Migration) -> Result<(), SchemaError> {
        for change in &migration.changes {
            self.apply(change)?;
        }
        Ok(())
    }

    /// Undoes a previously applied migration
    pub fn revert_migration(&mut self, migration: &Migration) -> Result<(), SchemaError> {
        for change in migration.inverse_changes() {
            self.apply(&change)?;
        }
        Ok(())
    }

    /// Changes that turn `self` into `target`
    ///
    /// New tables come first, then column changes per table in the target's
    /// column order, then dropped tables.
    pub fn diff(&self, target: &SchemaSnapshot) -> Vec<SchemaChange> {
        let mut changes = Vec::new();

        for (name, target_table) in &target.tables {
            let Some(current) = self.tables.get(name) else {
                changes.push(SchemaChange::CreateTable(target_table.clone()));
                continue;
            };

            for column in &target_table.columns {
                match current.find_column(&column.name) {
                    None => changes.push(SchemaChange::AddColumn {
                        table: name.clone(),
                        column: column.clone(),
                    }),
                    Some(existing) if existing.ty != column.ty => {
                        changes.push(SchemaChange::AlterColumnType {
                            table: name.clone(),
                            column: column.name.clone(),
                            from: existing.ty,
                            to: column.ty,
                        })
                    }
                    Some(_) => {}
                }
            }

            for column in &current.columns {
                if target_table.find_column(&column.name).is_none() {
                    changes.push(SchemaChange::DropColumn {
                        table: name.clone(),
                        column: column.clone(),
                    });
                }
            }
        }

        for (name, table) in &self.tables {
            if !target.tables.contains_key(name) {
                changes.push(SchemaChange::DropTable(table.clone()));
            }
        }

        changes
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut TableDef, SchemaError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| SchemaError::TableNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> TableDef {
        TableDef::new("People")
            .column(ColumnDef::new("Id", ColumnType::BigInt).identity())
            .column(ColumnDef::new("Name", ColumnType::Varchar(20)).required())
            .primary_key(&["Id"])
    }

    #[test]
    fn test_column_sql() {
        let col = ColumnDef::new("Name", ColumnType::Varchar(20))
            .required()
            .with_default(DefaultValue::Text(String::new()));
        assert_eq!(col.to_sql(), "\"Name\" character varying(20) NOT NULL DEFAULT ''");

        let id = ColumnDef::new("Id", ColumnType::Integer).identity();
        assert_eq!(
            id.to_sql(),
            "\"Id\" integer NOT NULL GENERATED BY DEFAULT AS IDENTITY"
        );
    }

    #[test]
    fn test_default_literals() {
        assert_eq!(DefaultValue::Double(0.0).to_sql(), "0.0");
        assert_eq!(DefaultValue::Integer(0).to_sql(), "0");
        assert_eq!(DefaultValue::Text("it's".into()).to_sql(), "'it''s'");
        assert_eq!(DefaultValue::Boolean(false).to_sql(), "FALSE");
    }

    #[test]
    fn test_create_table_statements() {
        let table = people().index(IndexDef::new("IX_People_Name", &["Name"]).unique());
        let statements = SchemaChange::CreateTable(table).statements();

        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0],
            "CREATE TABLE \"People\" (\"Id\" bigint NOT NULL GENERATED BY DEFAULT AS IDENTITY, \
             \"Name\" character varying(20) NOT NULL, CONSTRAINT \"PK_People\" PRIMARY KEY (\"Id\"))"
        );
        assert_eq!(
            statements[1],
            "CREATE UNIQUE INDEX \"IX_People_Name\" ON \"People\" (\"Name\")"
        );
    }

    #[test]
    fn test_alter_timestamp_uses_utc() {
        let change = SchemaChange::alter_column_type(
            "Events",
            "At",
            ColumnType::Timestamp,
            ColumnType::TimestampTz,
        );
        assert_eq!(
            change.statements(),
            vec!["ALTER TABLE \"Events\" ALTER COLUMN \"At\" TYPE timestamp with time zone \
                  USING \"At\" AT TIME ZONE 'UTC'"
                .to_string()]
        );
    }

    #[test]
    fn test_inverse_is_involution() {
        let change = SchemaChange::add_column("People", ColumnDef::new("Age", ColumnType::Integer));
        assert_eq!(change.inverse().inverse(), change);
    }

    #[test]
    fn test_apply_rejects_unknown_table() {
        let mut snapshot = SchemaSnapshot::new();
        let err = snapshot
            .apply(&SchemaChange::add_column(
                "Missing",
                ColumnDef::new("X", ColumnType::Text),
            ))
            .unwrap_err();
        assert_eq!(err, SchemaError::TableNotFound("Missing".into()));
    }

    #[test]
    fn test_apply_rejects_duplicate_column() {
        let mut snapshot = SchemaSnapshot::new();
        snapshot.apply(&SchemaChange::CreateTable(people())).unwrap();

        let err = snapshot
            .apply(&SchemaChange::add_column(
                "People",
                ColumnDef::new("Name", ColumnType::Text),
            ))
            .unwrap_err();
        assert!(matches!(err, SchemaError::ColumnExists { .. }));
    }

    #[test]
    fn test_alter_checks_current_type() {
        let mut snapshot = SchemaSnapshot::new();
        snapshot.apply(&SchemaChange::CreateTable(people())).unwrap();

        let err = snapshot
            .apply(&SchemaChange::alter_column_type(
                "People",
                "Name",
                ColumnType::Text,
                ColumnType::Varchar(50),
            ))
            .unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_migration_revert_restores_snapshot() {
        let mut snapshot = SchemaSnapshot::new();
        snapshot.apply(&SchemaChange::CreateTable(people())).unwrap();
        let before = snapshot.clone();

        let migration = Migration::new(
            1,
            "people_age",
            vec![
                SchemaChange::add_column(
                    "People",
                    ColumnDef::new("Age", ColumnType::Integer)
                        .required()
                        .with_default(DefaultValue::Integer(0)),
                ),
                SchemaChange::alter_column_type(
                    "People",
                    "Name",
                    ColumnType::Varchar(20),
                    ColumnType::Text,
                ),
            ],
        );

        snapshot.apply_migration(&migration).unwrap();
        assert_ne!(snapshot, before);

        snapshot.revert_migration(&migration).unwrap();
        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_diff_detects_added_and_altered_columns() {
        let mut before = SchemaSnapshot::new();
        before.apply(&SchemaChange::CreateTable(people())).unwrap();

        let mut after = before.clone();
        let add = SchemaChange::add_column("People", ColumnDef::new("Nick", ColumnType::Text));
        let alter = SchemaChange::alter_column_type(
            "People",
            "Name",
            ColumnType::Varchar(20),
            ColumnType::Varchar(40),
        );
        after.apply(&add).unwrap();
        after.apply(&alter).unwrap();

        assert_eq!(before.diff(&after), vec![alter, add]);
        assert!(after.diff(&after).is_empty());
    }

    #[test]
    fn test_normalize_sql_ignores_layout() {
        let pretty = "-- people\nCREATE TABLE \"People\" (\n    \"Id\" bigint,\n    \"Name\" text\n);\n";
        let compact = "CREATE TABLE \"People\" (\"Id\" bigint, \"Name\" text);";
        assert_eq!(normalize_sql(pretty), normalize_sql(compact));
        assert_eq!(normalize_sql(pretty).len(), 1);
    }
}
