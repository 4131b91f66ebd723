//! The full database is large.  These functions write a smaller copy of it
//! with only the records updated since a given date, so it fits in memory on
//! modest machines.

use std::{fs, path::Path};

use jiff::civil::Date;
use log::{debug, info, warn};
use rusqlite::{Connection, DatabaseName};

use super::{is_iso_date, is_preferred_update_column, is_update_column};
use crate::{
    error::{Error, Result},
    utils::lib_sqlite::{count_rows, list_tables, open_read_only, quote_ident, table_columns},
};

/// Where to look for the offender IDs to keep when downsizing by profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFilter {
    /// Table with one row per offender, its first column is the offender ID.
    pub table: String,
    /// Date the profile was last updated.
    pub variable: String,
}

impl Default for ProfileFilter {
    fn default() -> Self {
        Self {
            table: "OFNT3AA1_data".to_string(),
            variable: "DTOFUPDT".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDownsize {
    pub name: String,
    /// Column the rows were filtered on, `None` if the table was copied as is.
    pub column: Option<String>,
    pub rows_before: usize,
    pub rows_after: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DownsizeSummary {
    pub tables: Vec<TableDownsize>,
    /// Number of distinct offenders kept, when downsizing by profile.
    pub profiles: Option<usize>,
}

impl DownsizeSummary {
    pub fn table(&self, name: &str) -> Option<&TableDownsize> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn rows_before(&self) -> usize {
        self.tables.iter().map(|t| t.rows_before).sum()
    }

    pub fn rows_after(&self) -> usize {
        self.tables.iter().map(|t| t.rows_after).sum()
    }
}

/// Parse a `YYYY-MM-DD` cutoff date.
pub fn parse_date_filter(value: &str) -> Result<Date> {
    value.trim().parse::<Date>().map_err(|source| Error::InvalidDate {
        value: value.to_string(),
        source,
    })
}

/// Copy `input_db` to `output_db` and delete, in every table that has an
/// update date column, the rows updated before `date_filter` or with no
/// update date at all.  Tables without such a column are copied unchanged.
/// `input_db` is not modified, `output_db` must not exist yet.
pub fn downsize_by_update(
    input_db: &Path,
    output_db: &Path,
    date_filter: &str,
) -> Result<DownsizeSummary> {
    let cutoff = parse_date_filter(date_filter)?;
    filter_copy(input_db, output_db, |conn| delete_stale_rows(conn, cutoff))
}

/// Keep the offenders whose profile was updated on or after `date_filter`.
/// Their IDs are taken from the profile table, then every `*_data` table is
/// cut down to the rows whose first column is one of those IDs.  The other
/// tables are copied unchanged.
pub fn downsize_by_profile_update(
    input_db: &Path,
    output_db: &Path,
    date_filter: &str,
    filter: &ProfileFilter,
) -> Result<DownsizeSummary> {
    let cutoff = parse_date_filter(date_filter)?;
    filter_copy(input_db, output_db, |conn| {
        keep_recent_profiles(conn, cutoff, filter, input_db)
    })
}

/// IDs of the profiles updated on or after `date_filter`.
pub fn extract_ids_by_update(
    db_path: &Path,
    date_filter: &str,
    filter: &ProfileFilter,
) -> Result<Vec<String>> {
    let cutoff = parse_date_filter(date_filter)?;
    let conn = open_existing(db_path)?;
    let id_column = profile_id_column(&conn, filter, db_path)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} WHERE {} >= ?1",
        quote_ident(&id_column),
        quote_ident(&filter.table),
        quote_ident(&filter.variable)
    ))?;
    let ids = stmt
        .query_map([cutoff.to_string()], |row| row.get::<usize, Option<String>>(0))?
        .filter_map(|id| id.transpose())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Pairs of table name and first column name, the column holding the
/// offender ID in the `*_data` tables.  With `only_data` the `*_desc` and
/// other tables are left out.
pub fn data_tables_and_ids(db_path: &Path, only_data: bool) -> Result<Vec<(String, String)>> {
    let conn = open_existing(db_path)?;
    first_columns(&conn, only_data)
}

fn open_existing(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        return Err(Error::NotFound(db_path.to_path_buf()));
    }
    Ok(open_read_only(db_path)?)
}

fn first_columns(conn: &Connection, only_data: bool) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for table in list_tables(conn)? {
        if only_data && !table.ends_with("_data") {
            continue;
        }
        if let Some(column) = table_columns(conn, &table)?.into_iter().next() {
            out.push((table, column));
        }
    }
    Ok(out)
}

fn profile_id_column(conn: &Connection, filter: &ProfileFilter, db_path: &Path) -> Result<String> {
    let columns = table_columns(conn, &filter.table)?;
    if columns.is_empty() {
        return Err(Error::schema(
            db_path,
            format!("no profile table {}", filter.table),
        ));
    }
    if !columns.contains(&filter.variable) {
        return Err(Error::schema(
            db_path,
            format!("table {} has no column {}", filter.table, filter.variable),
        ));
    }
    Ok(columns[0].clone())
}

/// Copy `input_db` to `output_db`, then run `filter` on the copy in one
/// transaction and compact the file.  The output is removed if the copy or
/// the filter fails, so a failed run can be retried as is.
fn filter_copy<F>(input_db: &Path, output_db: &Path, filter: F) -> Result<DownsizeSummary>
where
    F: FnOnce(&Connection) -> Result<DownsizeSummary>,
{
    let input = open_existing(input_db)?;
    if output_db.exists() {
        return Err(Error::OutputExists(output_db.to_path_buf()));
    }
    let res = copy_database(&input, input_db, output_db)
        .and_then(|()| apply_filter(output_db, filter));
    if res.is_err() && output_db.exists() {
        if let Err(e) = fs::remove_file(output_db) {
            warn!("failed to remove {}: {}", output_db.display(), e);
        }
    }
    res
}

/// Snapshot the input into a new file with the online backup API, so the
/// input is only ever opened read-only.
fn copy_database(input: &Connection, input_db: &Path, output_db: &Path) -> Result<()> {
    info!(
        "copying {} to {} ...",
        input_db.display(),
        output_db.display()
    );
    input.backup(DatabaseName::Main, output_db, None)?;
    Ok(())
}

fn apply_filter<F>(output_db: &Path, filter: F) -> Result<DownsizeSummary>
where
    F: FnOnce(&Connection) -> Result<DownsizeSummary>,
{
    let mut conn = Connection::open(output_db)?;
    let tx = conn.transaction()?;
    let summary = filter(&tx)?;
    tx.commit()?;
    conn.execute_batch("VACUUM;")?;
    info!(
        "kept {} of {} rows in {}",
        summary.rows_after(),
        summary.rows_before(),
        output_db.display()
    );
    Ok(summary)
}

fn delete_stale_rows(conn: &Connection, cutoff: Date) -> Result<DownsizeSummary> {
    let cutoff = cutoff.to_string();
    let mut summary = DownsizeSummary::default();
    for table in list_tables(conn)? {
        let rows_before = count_rows(conn, &table)?;
        let column = update_column(conn, &table)?;
        if let Some(column) = &column {
            let col = quote_ident(column);
            let n = conn.execute(
                &format!(
                    "DELETE FROM {} WHERE {} IS NULL OR {} < ?1",
                    quote_ident(&table),
                    col,
                    col
                ),
                [&cutoff],
            )?;
            info!("{}: deleted {} rows with {} before {}", table, n, column, cutoff);
        }
        let rows_after = count_rows(conn, &table)?;
        summary.tables.push(TableDownsize {
            name: table,
            column,
            rows_before,
            rows_after,
        });
    }
    Ok(summary)
}

/// The column a table is downsized on.  Candidates are picked by name, then
/// kept only if they hold dates: by the `Type` of the field in the matching
/// `*_desc` table for fixed-width data, by content otherwise.  An exact
/// update-date name wins over the other candidates.
fn update_column(conn: &Connection, table: &str) -> Result<Option<String>> {
    let candidates: Vec<String> = table_columns(conn, table)?
        .into_iter()
        .filter(|c| is_update_column(c))
        .collect();
    if candidates.is_empty() {
        return Ok(None);
    }
    let described = match table.strip_suffix("_data") {
        Some(stem) => date_fields(conn, &format!("{}_desc", stem))?,
        None => None,
    };
    let mut dates = Vec::new();
    for column in candidates {
        let is_date = match &described {
            Some(fields) => fields.contains(&column),
            None => holds_only_dates(conn, table, &column)?,
        };
        if is_date {
            dates.push(column);
        } else {
            debug!("{}: {} is not a date column", table, column);
        }
    }
    Ok(match dates.iter().position(|c| is_preferred_update_column(c)) {
        Some(i) => Some(dates.swap_remove(i)),
        None => dates.into_iter().next(),
    })
}

/// Names of the DATE fields listed in a `*_desc` table, `None` if there is
/// no such table.
fn date_fields(conn: &Connection, desc_table: &str) -> Result<Option<Vec<String>>> {
    let columns = table_columns(conn, desc_table)?;
    if !(columns.iter().any(|c| c == "Name") && columns.iter().any(|c| c == "Type")) {
        return Ok(None);
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT Name FROM {} WHERE upper(Type) = 'DATE'",
        quote_ident(desc_table)
    ))?;
    let names = stmt
        .query_map([], |row| row.get::<usize, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(names))
}

/// True if every non-blank value of `column` is a `YYYY-MM-DD` date.
fn holds_only_dates(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let col = quote_ident(column);
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT {} FROM {} WHERE {} IS NOT NULL AND trim({}) <> ''",
        col,
        quote_ident(table),
        col,
        col
    ))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        match row.get::<usize, String>(0) {
            Ok(value) if is_iso_date(&value) => {}
            _ => return Ok(false),
        }
    }
    Ok(true)
}

fn keep_recent_profiles(
    conn: &Connection,
    cutoff: Date,
    filter: &ProfileFilter,
    input_db: &Path,
) -> Result<DownsizeSummary> {
    let id_column = profile_id_column(conn, filter, input_db)?;
    conn.execute(
        &format!(
            "CREATE TEMP TABLE wanted_ids AS SELECT DISTINCT {} AS id FROM {} WHERE {} >= ?1",
            quote_ident(&id_column),
            quote_ident(&filter.table),
            quote_ident(&filter.variable)
        ),
        [cutoff.to_string()],
    )?;
    let profiles: i64 = conn.query_row("SELECT COUNT(*) FROM temp.wanted_ids", [], |row| {
        row.get(0)
    })?;
    let profiles = profiles as usize;
    info!("{} profiles updated since {}", profiles, cutoff);

    let mut summary = DownsizeSummary {
        profiles: Some(profiles),
        ..DownsizeSummary::default()
    };
    for (table, column) in first_columns(conn, false)? {
        let rows_before = count_rows(conn, &table)?;
        let filtered = table.ends_with("_data");
        if filtered {
            let col = quote_ident(&column);
            let deleted = conn.execute(
                &format!(
                    "DELETE FROM {} WHERE {} IS NULL OR {} NOT IN (SELECT id FROM temp.wanted_ids)",
                    quote_ident(&table),
                    col,
                    col
                ),
                [],
            )?;
            info!("{}: deleted {} rows", table, deleted);
        }
        let rows_after = count_rows(conn, &table)?;
        summary.tables.push(TableDownsize {
            name: table,
            column: filtered.then_some(column),
            rows_before,
            rows_after,
        });
    }
    conn.execute_batch("DROP TABLE temp.wanted_ids;")?;
    Ok(summary)
}
