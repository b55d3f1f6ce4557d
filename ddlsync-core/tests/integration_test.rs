//! End-to-end tests for ddlsync-core, driving the facade from DDL text.
//!
//! Run with: cargo test --test integration_test

use std::io::Write;

use ddlsync_core::config::{CliOverrides, DdlsyncConfig};
use ddlsync_core::{Ddlsync, DdlsyncError};

fn ddlsync() -> Ddlsync {
    Ddlsync::new(DdlsyncConfig::default())
}

fn position(statements: &[String], needle: &str) -> usize {
    statements
        .iter()
        .position(|s| s.contains(needle))
        .unwrap_or_else(|| panic!("missing statement containing {needle}: {statements:?}"))
}

const SHOP: &str = "
CREATE DATABASE shop;
USE shop;

CREATE TABLE customers (
    id INT PRIMARY KEY AUTO_INCREMENT,
    email VARCHAR(255) NOT NULL,
    UNIQUE KEY uk_email (email)
);

CREATE TABLE orders (
    id INT PRIMARY KEY AUTO_INCREMENT,
    customer_id INT NOT NULL,
    total DECIMAL(10, 2) NOT NULL DEFAULT 0,
    INDEX idx_total (total),
    CONSTRAINT fk_customer FOREIGN KEY (customer_id) REFERENCES customers (id),
    CONSTRAINT chk_total CHECK (total >= 0)
) COMMENT = 'orders';
";

#[test]
fn test_rename_column_and_add_primary_key() {
    let report = ddlsync()
        .plan(
            "CREATE DATABASE db1; USE db1; CREATE TABLE t1 (id INT, name VARCHAR(10));",
            "CREATE DATABASE db1; USE db1; CREATE TABLE t1 (id INT PRIMARY KEY, full_name VARCHAR(10));",
        )
        .unwrap();

    assert!(report.has_changes);
    let rename = position(
        &report.statements,
        "ALTER TABLE `db1`.`t1` CHANGE COLUMN `name` `full_name` VARCHAR(10);",
    );
    let pk = position(&report.statements, "ALTER TABLE `db1`.`t1` ADD PRIMARY KEY (`id`);");
    assert!(rename < pk);

    let lines: Vec<&str> = report.diff.iter().flat_map(|d| d.lines()).collect();
    assert_eq!(lines.iter().filter(|l| l.starts_with('~')).count(), 1);
    assert_eq!(lines.iter().filter(|l| l.starts_with('+')).count(), 1);
}

#[test]
fn test_identical_schemas_need_nothing() {
    let report = ddlsync().plan(SHOP, SHOP).unwrap();
    assert!(!report.has_changes);
    assert!(report.statements.is_empty());

    let diff = ddlsync().diff(SHOP, SHOP).unwrap();
    assert!(!diff.has_changes);
    assert!(diff.changes.is_empty());
}

#[test]
fn test_normalized_schema_compares_equal() {
    let normalized = ddlsync().validate(SHOP).unwrap().normalized;
    let report = ddlsync().plan(&normalized, SHOP).unwrap();
    assert!(report.statements.is_empty(), "{:?}", report.statements);
}

#[test]
fn test_create_schema_from_scratch() {
    let report = ddlsync().plan("", SHOP).unwrap();
    assert_eq!(report.statements.len(), 3);
    assert_eq!(report.statements[0], "CREATE DATABASE `shop`;");
    assert!(report.statements[1].starts_with("CREATE TABLE `shop`.`customers`"));
    assert!(report.statements[2].starts_with("CREATE TABLE `shop`.`orders`"));
}

#[test]
fn test_drop_parent_table_and_its_references() {
    let desired = "
        CREATE DATABASE shop;
        USE shop;
        CREATE TABLE orders (
            id INT PRIMARY KEY AUTO_INCREMENT,
            total DECIMAL(10, 2) NOT NULL DEFAULT 0,
            INDEX idx_total (total),
            CONSTRAINT chk_total CHECK (total >= 0)
        ) COMMENT = 'orders';
    ";
    let report = ddlsync().plan(SHOP, desired).unwrap();
    let statements = &report.statements;

    let drop_fk = position(
        statements,
        "ALTER TABLE `shop`.`orders` DROP FOREIGN KEY `fk_customer`;",
    );
    let drop_column = position(
        statements,
        "ALTER TABLE `shop`.`orders` DROP COLUMN `customer_id`;",
    );
    let drop_table = position(statements, "DROP TABLE `shop`.`customers`;");
    assert!(drop_fk < drop_column);
    assert!(drop_fk < drop_table);
}

#[test]
fn test_rename_unique_key() {
    let desired = SHOP.replace("uk_email", "uk_customer_email");
    let report = ddlsync().plan(SHOP, &desired).unwrap();
    assert_eq!(
        report.statements,
        vec!["ALTER TABLE `shop`.`customers` RENAME INDEX `uk_email` TO `uk_customer_email`;"]
    );
}

#[test]
fn test_referenced_column_type_change() {
    let desired = SHOP
        .replace(
            "id INT PRIMARY KEY AUTO_INCREMENT,\n    email",
            "id BIGINT PRIMARY KEY AUTO_INCREMENT,\n    email",
        )
        .replace("customer_id INT NOT NULL", "customer_id BIGINT NOT NULL");
    let report = ddlsync().plan(SHOP, &desired).unwrap();
    let statements = &report.statements;

    let drop_fk = position(statements, "DROP FOREIGN KEY `fk_customer`");
    let parent = position(statements, "`customers` MODIFY COLUMN `id` BIGINT");
    let child = position(statements, "`orders` MODIFY COLUMN `customer_id` BIGINT");
    let add_fk = position(statements, "ADD CONSTRAINT `fk_customer`");
    assert!(drop_fk < parent);
    assert!(drop_fk < child);
    assert!(parent < add_fk);
    assert!(child < add_fk);
}

#[test]
fn test_table_options_and_checks() {
    let desired = SHOP
        .replace("COMMENT = 'orders'", "COMMENT = 'customer orders'")
        .replace("CHECK (total >= 0)", "CHECK (total >= 0) NOT ENFORCED");
    let report = ddlsync().plan(SHOP, &desired).unwrap();
    let check = "ALTER TABLE `shop`.`orders` ALTER CHECK `chk_total` NOT ENFORCED;";
    assert!(report.statements.iter().any(|s| s == check));
    let comment = "ALTER TABLE `shop`.`orders` COMMENT = 'customer orders';";
    assert!(report.statements.iter().any(|s| s == comment));
}

#[test]
fn test_database_list_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[schema]\ndatabases = [\"shop\"]").unwrap();
    let path = file.path().to_str().unwrap().to_string();
    let config = DdlsyncConfig::load(Some(&path), &CliOverrides::default()).unwrap();
    let ddlsync = Ddlsync::new(config);

    // Observed databases outside the list are ignored.
    let observed = format!("CREATE DATABASE legacy; {}", SHOP);
    let report = ddlsync.plan(&observed, SHOP).unwrap();
    assert!(report.statements.is_empty());

    // Desired databases outside the list are rejected.
    let err = ddlsync.validate("CREATE DATABASE legacy;").unwrap_err();
    assert!(matches!(err, DdlsyncError::ValidationError(_)));
}

#[test]
fn test_validate_summary() {
    let report = ddlsync().validate(SHOP).unwrap();
    assert_eq!(report.databases.len(), 1);
    assert_eq!(report.databases[0].tables, 2);
    assert_eq!(report.databases[0].columns, 5);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["databases"][0]["name"], "shop");
}

#[test]
fn test_parse_errors_are_reported() {
    let err = ddlsync()
        .plan("", "CREATE DATABASE shop; USE shop; CREATE TABLE t (id INT,);")
        .unwrap_err();
    assert!(matches!(
        err,
        DdlsyncError::ParseError { .. } | DdlsyncError::UnknownToken { .. }
    ));
}

const SHOP_SHOW_CREATE: &str = "
CREATE DATABASE `shop` /*!40100 DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_0900_ai_ci */ /*!80016 DEFAULT ENCRYPTION='N' */;
USE `shop`;

CREATE TABLE `customers` (
  `id` int NOT NULL AUTO_INCREMENT,
  `email` varchar(255) NOT NULL,
  `nickname` varchar(64) DEFAULT NULL,
  `active` tinyint(1) NOT NULL DEFAULT '1',
  `created_at` datetime NOT NULL DEFAULT CURRENT_TIMESTAMP,
  PRIMARY KEY (`id`),
  UNIQUE KEY `uk_email` (`email`)
) ENGINE=InnoDB AUTO_INCREMENT=42 DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_0900_ai_ci;

CREATE TABLE `orders` (
  `id` int NOT NULL AUTO_INCREMENT,
  `customer_id` int NOT NULL,
  `total` decimal(10,2) NOT NULL DEFAULT '0.00',
  PRIMARY KEY (`id`),
  KEY `fk_customer` (`customer_id`),
  CONSTRAINT `fk_customer` FOREIGN KEY (`customer_id`) REFERENCES `customers` (`id`)
) ENGINE=InnoDB AUTO_INCREMENT=7 DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_0900_ai_ci COMMENT='orders';
";

const SHOP_DESIRED: &str = "
CREATE DATABASE shop;
USE shop;

CREATE TABLE customers (
    id INT PRIMARY KEY AUTO_INCREMENT,
    email VARCHAR(255) NOT NULL,
    nickname VARCHAR(64),
    active BOOL NOT NULL DEFAULT 1,
    created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE KEY uk_email (email)
);

CREATE TABLE orders (
    id INT PRIMARY KEY AUTO_INCREMENT,
    customer_id INT NOT NULL,
    total DECIMAL(10, 2) NOT NULL DEFAULT 0.00,
    CONSTRAINT fk_customer FOREIGN KEY (customer_id) REFERENCES customers (id)
) COMMENT = 'orders';
";

#[test]
fn test_show_create_output_matches_desired_schema() {
    let report = ddlsync().plan(SHOP_SHOW_CREATE, SHOP_DESIRED).unwrap();
    assert!(report.statements.is_empty(), "{:?}", report.statements);
    assert!(!report.has_changes);

    let diff = ddlsync().diff(SHOP_SHOW_CREATE, SHOP_DESIRED).unwrap();
    assert!(diff.changes.is_empty(), "{:?}", diff.changes);
    assert!(!diff.has_changes);
}

#[test]
fn test_comment_longer_than_read_chunk() {
    let comment = "x".repeat(2000);
    let schema = format!(
        "CREATE DATABASE shop;\n-- {}\nUSE shop; CREATE TABLE t (id INT) COMMENT='{}';",
        "=".repeat(500),
        comment
    );

    let report = ddlsync().validate(&schema).unwrap();
    assert_eq!(report.databases[0].tables, 1);
    assert!(report.normalized.contains(&comment));

    let plan = ddlsync().plan(&schema, &schema).unwrap();
    assert!(plan.statements.is_empty());

    let created = ddlsync().plan("CREATE DATABASE shop;", &schema).unwrap();
    assert_eq!(created.statements.len(), 1);
    assert!(created.statements[0].contains(&comment));
}
