//! The text schema loader. A catalog file is line-oriented:
//!
//! ```text
//! users (id int pk, name string)
//! orders (id int pk, user_id int, note string)
//! ```
//!
//! Each table's data lives in `<name>.dat` in the same directory as the
//! schema file.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::errors::QueryError;
use strata::{Catalog, FieldType, HeapFile, StorageError, TupleDesc};

/// Parses a schema file and registers every table with the catalog.
/// Returns the table names in file order.
pub fn load_schema(path: impl AsRef<Path>, catalog: &Catalog) -> Result<Vec<String>, QueryError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(StorageError::Io)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut loaded = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (name, desc, primary_key) = parse_table_line(line)
            .map_err(|msg| QueryError::InvalidSchema(format!("line {}: {}", line_no + 1, msg)))?;
        let file = HeapFile::open(base.join(format!("{}.dat", name)), desc)?;
        catalog.add_table(Arc::new(file), &name, &primary_key);
        crate::shale_debug_log!("[loader] added table '{}'", name);
        loaded.push(name);
    }
    Ok(loaded)
}

/// One line: `name (fname type[, fname type[ pk]]*)`. Types are `int` and
/// `string`, case-insensitive; a trailing `pk` marks the primary key.
fn parse_table_line(line: &str) -> Result<(String, TupleDesc, String), String> {
    let open = line.find('(').ok_or("missing '('")?;
    let close = line.rfind(')').ok_or("missing ')'")?;
    if close < open {
        return Err("')' before '('".to_string());
    }
    let name = line[..open].trim();
    if name.is_empty() {
        return Err("missing table name".to_string());
    }

    let mut items = Vec::new();
    let mut primary_key = String::new();
    for column in line[open + 1..close].split(',') {
        let mut words = column.split_whitespace();
        let fname = words.next().ok_or("empty column entry")?;
        let ftype = words
            .next()
            .ok_or_else(|| format!("column '{}' is missing a type", fname))?;
        let ty = match ftype.to_ascii_lowercase().as_str() {
            "int" => FieldType::Int,
            "string" => FieldType::Str,
            other => return Err(format!("unknown type '{}'", other)),
        };
        match words.next() {
            None => {}
            Some("pk") => primary_key = fname.to_string(),
            Some(other) => return Err(format!("unknown annotation '{}'", other)),
        }
        items.push((ty, Some(fname.to_string())));
    }
    if items.is_empty() {
        return Err("table has no columns".to_string());
    }
    Ok((name.to_string(), TupleDesc::new(items), primary_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_schema(dir: &TempDir, text: &str) -> std::path::PathBuf {
        let path = dir.path().join("schema.txt");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn loads_tables_with_names_types_and_pk() {
        let dir = TempDir::new().unwrap();
        let path = write_schema(
            &dir,
            "users (id int pk, name string)\n\norders (id INT pk, user_id Int, note STRING)\n",
        );
        let catalog = Catalog::new();
        let loaded = load_schema(&path, &catalog).unwrap();
        assert_eq!(loaded, vec!["users".to_string(), "orders".to_string()]);

        let users = catalog.table_id("users").unwrap();
        let desc = catalog.tuple_desc(users).unwrap();
        assert_eq!(desc.num_fields(), 2);
        assert_eq!(desc.field_type(0), FieldType::Int);
        assert_eq!(desc.field_type(1), FieldType::Str);
        assert_eq!(desc.field_name(0), Some("id"));
        assert_eq!(catalog.primary_key(users).unwrap(), "id");

        let orders = catalog.table_id("orders").unwrap();
        assert_eq!(catalog.tuple_desc(orders).unwrap().num_fields(), 3);
        // Backing files are created next to the schema.
        assert!(dir.path().join("users.dat").exists());
        assert!(dir.path().join("orders.dat").exists());
    }

    #[test]
    fn unknown_type_is_reported_with_line_number() {
        let dir = TempDir::new().unwrap();
        let path = write_schema(&dir, "t (a float)\n");
        let err = load_schema(&path, &Catalog::new()).unwrap_err();
        match err {
            QueryError::InvalidSchema(msg) => {
                assert!(msg.contains("line 1"), "message was: {}", msg);
                assert!(msg.contains("float"), "message was: {}", msg);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn unknown_annotation_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_schema(&dir, "t (a int unique)\n");
        assert!(matches!(
            load_schema(&path, &Catalog::new()),
            Err(QueryError::InvalidSchema(_))
        ));
    }

    #[test]
    fn malformed_lines_are_rejected() {
        let dir = TempDir::new().unwrap();
        for bad in ["no_parens", "t (", "t ()", "(a int)"] {
            let path = write_schema(&dir, bad);
            assert!(
                matches!(
                    load_schema(&path, &Catalog::new()),
                    Err(QueryError::InvalidSchema(_))
                ),
                "line {:?} should be rejected",
                bad
            );
        }
    }
}
