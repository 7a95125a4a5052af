/// Checks that the SQL files under `migrations/` say exactly what the
/// migration catalog renders, in both directions.
///
/// No database needed.

use nong_identity_shared::schema::catalog::{
    self, AUDIT_LOGGING, AUDIT_LOG_CREATED_TIMESTAMPTZ, USER_PROFILE_COLUMNS,
    USER_PROFILE_COLUMN_NAMES,
};
use nong_identity_shared::schema::{normalize_sql, ColumnType, DefaultValue};

/// (version, up script, down script) as embedded by sqlx
const MIGRATION_FILES: [(i64, &str, &str); 5] = [
    (
        20240101000000,
        include_str!("../migrations/20240101000000_identity_schema.up.sql"),
        include_str!("../migrations/20240101000000_identity_schema.down.sql"),
    ),
    (
        20240101000100,
        include_str!("../migrations/20240101000100_audit_logging.up.sql"),
        include_str!("../migrations/20240101000100_audit_logging.down.sql"),
    ),
    (
        20240101000200,
        include_str!("../migrations/20240101000200_nong_application_users.up.sql"),
        include_str!("../migrations/20240101000200_nong_application_users.down.sql"),
    ),
    (
        20240719143837,
        include_str!("../migrations/20240719143837_audit_log_created_timestamptz.up.sql"),
        include_str!("../migrations/20240719143837_audit_log_created_timestamptz.down.sql"),
    ),
    (
        20240720150902,
        include_str!("../migrations/20240720150902_user_profile_columns.up.sql"),
        include_str!("../migrations/20240720150902_user_profile_columns.down.sql"),
    ),
];

#[test]
fn test_every_catalog_migration_has_files() {
    let versions: Vec<i64> = catalog::catalog().iter().map(|m| m.version).collect();
    let file_versions: Vec<i64> = MIGRATION_FILES.iter().map(|(v, _, _)| *v).collect();
    assert_eq!(versions, file_versions);
}

#[test]
fn test_up_scripts_match_catalog() {
    for (version, up, _) in MIGRATION_FILES {
        let migration = catalog::find(version).expect("migration in catalog");
        assert_eq!(
            normalize_sql(up),
            normalize_sql(&migration.up_sql()),
            "up script of {} differs from the catalog",
            migration.file_stem()
        );
    }
}

#[test]
fn test_down_scripts_match_catalog() {
    for (version, _, down) in MIGRATION_FILES {
        let migration = catalog::find(version).expect("migration in catalog");
        assert_eq!(
            normalize_sql(down),
            normalize_sql(&migration.down_sql()),
            "down script of {} differs from the catalog",
            migration.file_stem()
        );
    }
}

#[test]
fn test_audit_log_created_switches_zone_and_back() {
    let before = catalog::snapshot_at(AUDIT_LOGGING).unwrap();
    let after = catalog::snapshot_at(AUDIT_LOG_CREATED_TIMESTAMPTZ).unwrap();

    assert_eq!(
        before.column("AuditLog", "Created").unwrap().ty,
        ColumnType::Timestamp
    );
    assert_eq!(
        after.column("AuditLog", "Created").unwrap().ty,
        ColumnType::TimestampTz
    );

    let mut reverted = after.clone();
    reverted
        .revert_migration(&catalog::find(AUDIT_LOG_CREATED_TIMESTAMPTZ).unwrap())
        .unwrap();
    assert_eq!(
        reverted.column("AuditLog", "Created").unwrap().ty,
        ColumnType::Timestamp
    );
}

#[test]
fn test_profile_columns_types_and_defaults() {
    let snapshot = catalog::snapshot_at(USER_PROFILE_COLUMNS).unwrap();

    let expect = |name: &str, ty: ColumnType, default: DefaultValue| {
        let column = snapshot.column("Users", name).unwrap();
        assert_eq!(column.ty, ty, "type of Users.{}", name);
        assert!(!column.nullable, "Users.{} should be NOT NULL", name);
        assert_eq!(column.default.as_ref(), Some(&default), "default of Users.{}", name);
    };

    expect("UserCode", ColumnType::Varchar(20), DefaultValue::Text(String::new()));
    expect("Password", ColumnType::Varchar(200), DefaultValue::Text(String::new()));
    expect("Longitude", ColumnType::DoublePrecision, DefaultValue::Double(0.0));
    expect("Tag", ColumnType::Integer, DefaultValue::Integer(0));
    expect("Manager", ColumnType::BigInt, DefaultValue::Integer(0));
    expect(
        "CreateTime",
        ColumnType::TimestampTz,
        DefaultValue::Timestamp(catalog::MIN_TIMESTAMP_LITERAL.to_string()),
    );

    assert_eq!(USER_PROFILE_COLUMN_NAMES.len(), 15);
}
