/// Ordered list of every schema migration
///
/// Versions match the file names under `migrations/`. The first three
/// migrations create the baseline identity, audit-log and Nong user tables;
/// the last two are the incremental changes:
///
/// - `20240719143837`: `AuditLog.Created` becomes `timestamp with time zone`
/// - `20240720150902`: profile columns are added to `Users`

use super::{
    ColumnDef, ColumnType, DefaultValue, ForeignKeyDef, IndexDef, Migration, SchemaChange,
    SchemaError, SchemaSnapshot, TableDef,
};

pub const IDENTITY_SCHEMA: i64 = 20240101000000;
pub const AUDIT_LOGGING: i64 = 20240101000100;
pub const NONG_APPLICATION_USERS: i64 = 20240101000200;
pub const AUDIT_LOG_CREATED_TIMESTAMPTZ: i64 = 20240719143837;
pub const USER_PROFILE_COLUMNS: i64 = 20240720150902;

/// Default for `CreateTime` columns added to existing rows
pub const MIN_TIMESTAMP_LITERAL: &str = "0001-01-01 00:00:00+00";

/// Column names added to `Users` by the profile migration, in order
pub const USER_PROFILE_COLUMN_NAMES: [&str; 15] = [
    "City",
    "County",
    "CreateTime",
    "Latitude",
    "Level",
    "Longitude",
    "Manager",
    "Mobile",
    "Password",
    "Province",
    "Salt",
    "Status",
    "Tag",
    "Town",
    "UserCode",
];

pub fn catalog() -> Vec<Migration> {
    vec![
        identity_schema(),
        audit_logging(),
        nong_application_users(),
        audit_log_created_timestamptz(),
        user_profile_columns(),
    ]
}

/// Looks a migration up by version
pub fn find(version: i64) -> Option<Migration> {
    catalog().into_iter().find(|m| m.version == version)
}

/// Snapshot with every migration up to and including `version` applied
pub fn snapshot_at(version: i64) -> Result<SchemaSnapshot, SchemaError> {
    let mut snapshot = SchemaSnapshot::new();
    for migration in catalog().iter().filter(|m| m.version <= version) {
        snapshot.apply_migration(migration)?;
    }
    Ok(snapshot)
}

/// Snapshot of the fully migrated schema
pub fn current_snapshot() -> Result<SchemaSnapshot, SchemaError> {
    snapshot_at(i64::MAX)
}

fn text(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Text)
}

fn required_text(name: &str) -> ColumnDef {
    text(name).required()
}

fn varchar(name: &str, len: u32) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Varchar(len))
}

fn boolean(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Boolean).required()
}

fn identity_schema() -> Migration {
    let roles = TableDef::new("Roles")
        .column(required_text("Id"))
        .column(varchar("Name", 256))
        .column(varchar("NormalizedName", 256))
        .column(text("ConcurrencyStamp"))
        .primary_key(&["Id"])
        .index(IndexDef::new("RoleNameIndex", &["NormalizedName"]).unique());

    let users = TableDef::new("Users")
        .column(required_text("Id"))
        .column(varchar("UserName", 256))
        .column(varchar("NormalizedUserName", 256))
        .column(varchar("Email", 256))
        .column(varchar("NormalizedEmail", 256))
        .column(boolean("EmailConfirmed"))
        .column(text("PasswordHash"))
        .column(text("SecurityStamp"))
        .column(text("ConcurrencyStamp"))
        .column(text("PhoneNumber"))
        .column(boolean("PhoneNumberConfirmed"))
        .column(boolean("TwoFactorEnabled"))
        .column(ColumnDef::new("LockoutEnd", ColumnType::TimestampTz))
        .column(boolean("LockoutEnabled"))
        .column(ColumnDef::new("AccessFailedCount", ColumnType::Integer).required())
        .primary_key(&["Id"])
        .index(IndexDef::new("EmailIndex", &["NormalizedEmail"]))
        .index(IndexDef::new("UserNameIndex", &["NormalizedUserName"]).unique());

    let role_claims = TableDef::new("RoleClaims")
        .column(ColumnDef::new("Id", ColumnType::Integer).identity())
        .column(required_text("RoleId"))
        .column(text("ClaimType"))
        .column(text("ClaimValue"))
        .primary_key(&["Id"])
        .foreign_key(ForeignKeyDef::cascade("FK_RoleClaims_Roles_RoleId", "RoleId", "Roles", "Id"))
        .index(IndexDef::new("IX_RoleClaims_RoleId", &["RoleId"]));

    let user_claims = TableDef::new("UserClaims")
        .column(ColumnDef::new("Id", ColumnType::Integer).identity())
        .column(required_text("UserId"))
        .column(text("ClaimType"))
        .column(text("ClaimValue"))
        .primary_key(&["Id"])
        .foreign_key(ForeignKeyDef::cascade("FK_UserClaims_Users_UserId", "UserId", "Users", "Id"))
        .index(IndexDef::new("IX_UserClaims_UserId", &["UserId"]));

    let user_logins = TableDef::new("UserLogins")
        .column(required_text("LoginProvider"))
        .column(required_text("ProviderKey"))
        .column(text("ProviderDisplayName"))
        .column(required_text("UserId"))
        .primary_key(&["LoginProvider", "ProviderKey"])
        .foreign_key(ForeignKeyDef::cascade("FK_UserLogins_Users_UserId", "UserId", "Users", "Id"))
        .index(IndexDef::new("IX_UserLogins_UserId", &["UserId"]));

    let user_roles = TableDef::new("UserRoles")
        .column(required_text("UserId"))
        .column(required_text("RoleId"))
        .primary_key(&["UserId", "RoleId"])
        .foreign_key(ForeignKeyDef::cascade("FK_UserRoles_Roles_RoleId", "RoleId", "Roles", "Id"))
        .foreign_key(ForeignKeyDef::cascade("FK_UserRoles_Users_UserId", "UserId", "Users", "Id"))
        .index(IndexDef::new("IX_UserRoles_RoleId", &["RoleId"]));

    let user_tokens = TableDef::new("UserTokens")
        .column(required_text("UserId"))
        .column(required_text("LoginProvider"))
        .column(required_text("Name"))
        .column(text("Value"))
        .primary_key(&["UserId", "LoginProvider", "Name"])
        .foreign_key(ForeignKeyDef::cascade("FK_UserTokens_Users_UserId", "UserId", "Users", "Id"));

    Migration::new(
        IDENTITY_SCHEMA,
        "identity_schema",
        vec![
            SchemaChange::CreateTable(roles),
            SchemaChange::CreateTable(users),
            SchemaChange::CreateTable(role_claims),
            SchemaChange::CreateTable(user_claims),
            SchemaChange::CreateTable(user_logins),
            SchemaChange::CreateTable(user_roles),
            SchemaChange::CreateTable(user_tokens),
        ],
    )
}

fn audit_logging() -> Migration {
    let audit_log = TableDef::new("AuditLog")
        .column(ColumnDef::new("Id", ColumnType::BigInt).identity())
        .column(text("Event"))
        .column(text("Source"))
        .column(text("Category"))
        .column(text("SubjectIdentifier"))
        .column(text("SubjectName"))
        .column(text("SubjectType"))
        .column(text("SubjectAdditionalData"))
        .column(text("Action"))
        .column(text("Data"))
        .column(ColumnDef::new("Created", ColumnType::Timestamp).required())
        .primary_key(&["Id"]);

    Migration::new(
        AUDIT_LOGGING,
        "audit_logging",
        vec![SchemaChange::CreateTable(audit_log)],
    )
}

fn nong_application_users() -> Migration {
    let nong = TableDef::new("NongApplicationUsers")
        .column(ColumnDef::new("Id", ColumnType::BigInt).identity())
        .column(varchar("UserCode", 20).required())
        .column(varchar("Province", 20).required())
        .column(varchar("City", 20).required())
        .column(varchar("Town", 20).required())
        .column(varchar("County", 20).required())
        .column(ColumnDef::new("Longitude", ColumnType::DoublePrecision).required())
        .column(ColumnDef::new("Latitude", ColumnType::DoublePrecision).required())
        .column(varchar("Mobile", 20).required())
        .column(varchar("Password", 200).required())
        .column(varchar("Salt", 20).required())
        .column(ColumnDef::new("Tag", ColumnType::Integer).required())
        .column(ColumnDef::new("CreateTime", ColumnType::TimestampTz).required())
        .primary_key(&["Id"]);

    Migration::new(
        NONG_APPLICATION_USERS,
        "nong_application_users",
        vec![SchemaChange::CreateTable(nong)],
    )
}

fn audit_log_created_timestamptz() -> Migration {
    Migration::new(
        AUDIT_LOG_CREATED_TIMESTAMPTZ,
        "audit_log_created_timestamptz",
        vec![SchemaChange::alter_column_type(
            "AuditLog",
            "Created",
            ColumnType::Timestamp,
            ColumnType::TimestampTz,
        )],
    )
}

fn user_profile_columns() -> Migration {
    let empty = || DefaultValue::Text(String::new());
    let string = |name: &str, len: u32| varchar(name, len).required().with_default(empty());
    let int = |name: &str| {
        ColumnDef::new(name, ColumnType::Integer)
            .required()
            .with_default(DefaultValue::Integer(0))
    };
    let double = |name: &str| {
        ColumnDef::new(name, ColumnType::DoublePrecision)
            .required()
            .with_default(DefaultValue::Double(0.0))
    };

    let columns = vec![
        string("City", 20),
        string("County", 20),
        ColumnDef::new("CreateTime", ColumnType::TimestampTz)
            .required()
            .with_default(DefaultValue::Timestamp(MIN_TIMESTAMP_LITERAL.to_string())),
        double("Latitude"),
        int("Level"),
        double("Longitude"),
        ColumnDef::new("Manager", ColumnType::BigInt)
            .required()
            .with_default(DefaultValue::Integer(0)),
        string("Mobile", 20),
        string("Password", 200),
        string("Province", 20),
        string("Salt", 20),
        int("Status"),
        int("Tag"),
        string("Town", 20),
        string("UserCode", 20),
    ];

    Migration::new(
        USER_PROFILE_COLUMNS,
        "user_profile_columns",
        columns
            .into_iter()
            .map(|column| SchemaChange::add_column("Users", column))
            .collect(),
    )
}
