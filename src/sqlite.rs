//! Decoder for the newer `Loco.sqlite` layout.
//!
//! ## Tables
//!
//! ```text
//! vehicles(id, type, name, address, max_speed, traction_direction, position, ...)
//!   type: 0 = locomotive, 1 = wagon, 2 = accessory
//! functions(vehicle_id, function, position, shortcut, time, image_name, button_type, ...)
//! cvs(vehicle_id, cv, value)                             optional
//! categories(id, name) + vehicles_to_categories          optional
//! traction_list(loco_id, regulation_step)                optional
//! layout_data(id, name)                                  optional
//! update_history(to_database_version)                    optional
//! ```
//!
//! The schema is read up front. Required columns come from the field tables
//! in [`crate::fields`]; a missing one means the file is not what its name
//! claims and fails the load. Optional columns are selected only when they
//! exist.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Params, Row, Statement, params};
use rustc_hash::FxHashMap;

use crate::container::Payload;
use crate::diagnostics::Diagnostics;
use crate::error::{Result, Z21Error};
use crate::fields::{
    self, CV_FIELDS, FUNCTION_FIELDS, FieldSpec, FieldValue, LAYOUT_FIELDS, LOCO_FIELDS,
    RawRecord,
};
use crate::format::Decoder;
use crate::model::{Format, Layout, Locomotive, Z21File};

/// Table names.
pub mod tables {
    pub const VEHICLES: &str = "vehicles";
    pub const FUNCTIONS: &str = "functions";
    pub const CVS: &str = "cvs";
    pub const CATEGORIES: &str = "categories";
    pub const VEHICLES_TO_CATEGORIES: &str = "vehicles_to_categories";
    pub const TRACTION_LIST: &str = "traction_list";
    pub const LAYOUT_DATA: &str = "layout_data";
    pub const UPDATE_HISTORY: &str = "update_history";
}

/// `vehicles.type` of a locomotive.
const TYPE_LOCO: i64 = 0;
/// `vehicles.type` of an accessory.
const TYPE_ACCESSORY: i64 = 2;

/// SQLite payload decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDecoder;

impl Decoder for SqliteDecoder {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    fn format(&self) -> Format {
        Format::Sqlite
    }

    fn decode(&self, payload: &Payload, diagnostics: &mut Diagnostics) -> Result<Z21File> {
        match payload {
            Payload::Sqlite(db) => self.decode_path(db.path(), diagnostics),
            Payload::Xml(_) => Err(Z21Error::malformed(
                "SQLite decoder received an XML payload",
            )),
        }
    }
}

impl SqliteDecoder {
    /// Decode a database file on disk. The file is opened read-only.
    pub fn decode_path(&self, path: &Path, diagnostics: &mut Diagnostics) -> Result<Z21File> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| Z21Error::container(path, format!("cannot open database: {e}")))?;

        let schema = Schema::read(&conn)
            .map_err(|e| Z21Error::container(path, format!("not a valid SQLite database: {e}")))?;

        DatabaseReader {
            conn: &conn,
            schema: &schema,
        }
        .read(diagnostics)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Tables and their columns, all lowercased.
#[derive(Debug, Default)]
struct Schema {
    tables: FxHashMap<String, Vec<String>>,
}

impl Schema {
    fn read(conn: &Connection) -> rusqlite::Result<Self> {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut columns_stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
        let mut tables = FxHashMap::default();
        for name in names {
            let columns = columns_stmt
                .query_map(params![name], |row| row.get::<_, String>(0))?
                .map(|c| c.map(|c| c.to_ascii_lowercase()))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            tables.insert(name.to_ascii_lowercase(), columns);
        }
        Ok(Self { tables })
    }

    fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|columns| columns.iter().any(|c| c.eq_ignore_ascii_case(column)))
    }

    fn has_columns(&self, table: &str, columns: &[&str]) -> bool {
        columns.iter().all(|c| self.has_column(table, c))
    }

    fn require_column(&self, table: &str, column: &str) -> Result<()> {
        if !self.has_table(table) {
            return Err(Z21Error::missing_table(table));
        }
        if !self.has_column(table, column) {
            return Err(Z21Error::missing_column(table, column));
        }
        Ok(())
    }

    /// The column that holds `spec` in `table`, trying aliases in order.
    fn resolve<T>(&self, table: &str, spec: &FieldSpec<T>) -> Option<&'static str> {
        spec.names().find(|name| self.has_column(table, name))
    }

    /// `"column" AS "source"` for every field present in `table`.
    ///
    /// Fails with a schema error naming the first required field that has
    /// no column.
    fn select_list<T>(&self, table: &str, specs: &[FieldSpec<T>]) -> Result<Vec<String>> {
        if !self.has_table(table) {
            return Err(Z21Error::missing_table(table));
        }
        let mut list = Vec::new();
        for spec in specs {
            match self.resolve(table, spec) {
                Some(column) => list.push(format!("\"{column}\" AS \"{}\"", spec.source)),
                None if spec.required => {
                    return Err(Z21Error::missing_column(table, spec.source));
                }
                None => {}
            }
        }
        Ok(list)
    }

    /// `ORDER BY` over the listed columns that exist.
    fn order_by(&self, table: &str, columns: &[&str]) -> String {
        let present: Vec<String> = columns
            .iter()
            .filter(|c| self.has_column(table, c))
            .map(|c| format!("\"{c}\""))
            .collect();
        if present.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {}", present.join(", "))
        }
    }
}

// ============================================================================
// READER
// ============================================================================

fn db_error(table: &'static str) -> impl Fn(rusqlite::Error) -> Z21Error {
    move |e| Z21Error::database(format!("{table}: {e}"))
}

/// Convert every non-null column of `row` into a record field.
fn row_to_record(row: &Row<'_>, columns: &[String], label: String) -> rusqlite::Result<RawRecord> {
    let mut record = RawRecord::new(label);
    for (i, name) in columns.iter().enumerate() {
        match row.get_ref(i)? {
            ValueRef::Null | ValueRef::Blob(_) => {}
            ValueRef::Integer(v) => record.insert(name.as_str(), FieldValue::Integer(v)),
            ValueRef::Real(v) => record.insert(name.as_str(), FieldValue::Real(v)),
            ValueRef::Text(t) => record.insert_text(
                name.as_str(),
                String::from_utf8_lossy(t).into_owned(),
            ),
        }
    }
    Ok(record)
}

/// Run `stmt` and turn each row into a record labelled by `label`.
fn collect_records<P: Params>(
    stmt: &mut Statement<'_>,
    params: P,
    label: impl Fn(usize, &Row<'_>) -> String,
) -> rusqlite::Result<Vec<RawRecord>> {
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let mut rows = stmt.query(params)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let record = row_to_record(row, &columns, label(records.len(), row))?;
        records.push(record);
    }
    Ok(records)
}

struct DatabaseReader<'a> {
    conn: &'a Connection,
    schema: &'a Schema,
}

impl DatabaseReader<'_> {
    fn read(&self, diagnostics: &mut Diagnostics) -> Result<Z21File> {
        let mut file = Z21File::new(Format::Sqlite);

        let vehicles = self.vehicles()?;
        let mut functions = self.function_statement()?;
        let mut cvs = self.cv_statement()?;

        for (id, vehicle_type, record) in vehicles {
            match vehicle_type {
                Some(TYPE_LOCO) => {
                    let Some(mut loco) = fields::build_locomotive(&record, diagnostics) else {
                        continue;
                    };
                    self.read_functions(&mut functions, id, &mut loco, diagnostics)?;
                    if let Some(stmt) = cvs.as_mut() {
                        self.read_cvs(stmt, id, &mut loco, diagnostics)?;
                    }
                    loco.details.categories = self.categories(id)?;
                    loco.details.regulation_step = self.regulation_step(id)?;
                    file.locomotives.push(loco);
                }
                Some(TYPE_ACCESSORY) => {
                    let mut record = record;
                    record.insert_text("type", "accessory");
                    if let Some(accessory) = fields::build_accessory(&record, diagnostics) {
                        file.accessories.push(accessory);
                    }
                }
                _ => {}
            }
        }

        file.layouts = self.layouts(diagnostics)?;
        file.version = self.version()?;

        tracing::debug!(
            "Decoded {} locomotive(s) and {} accessory(ies) from SQLite",
            file.locomotives.len(),
            file.accessories.len()
        );
        Ok(file)
    }

    /// All vehicle rows in display order as `(id, type, record)`.
    fn vehicles(&self) -> Result<Vec<(i64, Option<i64>, RawRecord)>> {
        use self::tables::VEHICLES;

        self.schema.require_column(VEHICLES, "id")?;
        self.schema.require_column(VEHICLES, "type")?;
        let columns = self.schema.select_list(VEHICLES, LOCO_FIELDS)?;

        let sql = format!(
            "SELECT \"id\", {} FROM {VEHICLES}{}",
            columns.join(", "),
            self.schema.order_by(VEHICLES, &["position", "id"])
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_error(VEHICLES))?;
        let records = collect_records(&mut stmt, [], |_, row| {
            format!("vehicles[id={}]", row.get::<_, i64>(0).unwrap_or_default())
        })
        .map_err(db_error(VEHICLES))?;

        Ok(records
            .into_iter()
            .map(|record| {
                let id = record.get("id").and_then(FieldValue::as_i64).unwrap_or_default();
                let vehicle_type = record.get("type").and_then(FieldValue::as_i64);
                (id, vehicle_type, record)
            })
            .collect())
    }

    fn function_statement(&self) -> Result<Statement<'_>> {
        use self::tables::FUNCTIONS;

        self.schema.require_column(FUNCTIONS, "vehicle_id")?;
        let columns = self.schema.select_list(FUNCTIONS, FUNCTION_FIELDS)?;
        let sql = format!(
            "SELECT {} FROM {FUNCTIONS} WHERE \"vehicle_id\" = ?1{}",
            columns.join(", "),
            self.schema.order_by(FUNCTIONS, &["position", "function"])
        );
        self.conn.prepare(&sql).map_err(db_error(FUNCTIONS))
    }

    fn read_functions(
        &self,
        stmt: &mut Statement<'_>,
        vehicle_id: i64,
        loco: &mut Locomotive,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let records = collect_records(stmt, params![vehicle_id], |i, _| {
            format!("functions[vehicle_id={vehicle_id}][{}]", i + 1)
        })
        .map_err(db_error(tables::FUNCTIONS))?;

        for record in records {
            if let Some(function) = fields::build_function(&record, diagnostics) {
                fields::attach_function(loco, function, record.label(), diagnostics);
            }
        }
        Ok(())
    }

    /// Statement for the CV table, if the database has a usable one.
    fn cv_statement(&self) -> Result<Option<Statement<'_>>> {
        use self::tables::CVS;

        if !self.schema.has_column(CVS, "vehicle_id") {
            return Ok(None);
        }
        let Ok(columns) = self.schema.select_list(CVS, CV_FIELDS) else {
            tracing::debug!("Ignoring {CVS} table without cv/value columns");
            return Ok(None);
        };
        let sql = format!(
            "SELECT {} FROM {CVS} WHERE \"vehicle_id\" = ?1",
            columns.join(", ")
        );
        self.conn.prepare(&sql).map(Some).map_err(db_error(CVS))
    }

    fn read_cvs(
        &self,
        stmt: &mut Statement<'_>,
        vehicle_id: i64,
        loco: &mut Locomotive,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let records = collect_records(stmt, params![vehicle_id], |i, _| {
            format!("cvs[vehicle_id={vehicle_id}][{}]", i + 1)
        })
        .map_err(db_error(tables::CVS))?;

        if records.is_empty() {
            return Ok(());
        }
        let mut values = BTreeMap::new();
        for record in records {
            if let Some((number, value)) = fields::build_cv(&record, diagnostics) {
                values.insert(number, value);
            }
        }
        loco.cvs = Some(values);
        Ok(())
    }

    fn categories(&self, vehicle_id: i64) -> Result<Vec<String>> {
        use self::tables::{CATEGORIES, VEHICLES_TO_CATEGORIES};

        if !self.schema.has_columns(CATEGORIES, &["id", "name"])
            || !self
                .schema
                .has_columns(VEHICLES_TO_CATEGORIES, &["vehicle_id", "category_id"])
        {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT c.name FROM categories c \
                 INNER JOIN vehicles_to_categories vtc ON c.id = vtc.category_id \
                 WHERE vtc.vehicle_id = ?1 ORDER BY c.id",
            )
            .map_err(db_error(CATEGORIES))?;
        let names = stmt
            .query_map(params![vehicle_id], |row| row.get::<_, Option<String>>(0))
            .map_err(db_error(CATEGORIES))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_error(CATEGORIES))?;
        Ok(names
            .into_iter()
            .flatten()
            .filter(|name| !name.trim().is_empty())
            .collect())
    }

    fn regulation_step(&self, vehicle_id: i64) -> Result<Option<i64>> {
        use self::tables::TRACTION_LIST;

        if !self
            .schema
            .has_columns(TRACTION_LIST, &["loco_id", "regulation_step"])
        {
            return Ok(None);
        }
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT regulation_step FROM traction_list \
                 WHERE loco_id = ?1 AND regulation_step IS NOT NULL \
                 ORDER BY regulation_step LIMIT 1",
            )
            .map_err(db_error(TRACTION_LIST))?;
        let mut rows = stmt
            .query(params![vehicle_id])
            .map_err(db_error(TRACTION_LIST))?;
        match rows.next().map_err(db_error(TRACTION_LIST))? {
            Some(row) => row.get::<_, Option<i64>>(0).map_err(db_error(TRACTION_LIST)),
            None => Ok(None),
        }
    }

    fn layouts(&self, diagnostics: &mut Diagnostics) -> Result<Vec<Layout>> {
        use self::tables::LAYOUT_DATA;

        if !self.schema.has_column(LAYOUT_DATA, "name") {
            return Ok(Vec::new());
        }
        let columns = self.schema.select_list(LAYOUT_DATA, LAYOUT_FIELDS)?;
        let sql = format!(
            "SELECT {} FROM {LAYOUT_DATA}{}",
            columns.join(", "),
            self.schema.order_by(LAYOUT_DATA, &["id"])
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_error(LAYOUT_DATA))?;
        let records = collect_records(&mut stmt, [], |i, _| format!("layout_data[{}]", i + 1))
            .map_err(db_error(LAYOUT_DATA))?;

        Ok(records
            .iter()
            .filter_map(|record| fields::build_layout(record, diagnostics))
            .collect())
    }

    fn version(&self) -> Result<Option<i64>> {
        use self::tables::UPDATE_HISTORY;

        if !self
            .schema
            .has_column(UPDATE_HISTORY, "to_database_version")
        {
            return Ok(None);
        }
        self.conn
            .query_row(
                "SELECT MAX(to_database_version) FROM update_history",
                [],
                |row| row.get::<_, Option<i64>>(0),
            )
            .map_err(db_error(UPDATE_HISTORY))
    }
}
