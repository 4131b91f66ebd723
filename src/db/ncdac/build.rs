use std::{
    collections::{BTreeMap, HashSet},
    fs::{self, File},
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use itertools::Itertools;
use log::{debug, info, warn};
use rusqlite::{params, params_from_iter, Connection};

use super::{
    description::{FieldType, RecordLayout, DESC_COLUMNS},
    decode_text, is_update_column, normalize_date,
};
use crate::{
    error::{Error, Result},
    utils::lib_sqlite::quote_ident,
};

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Store date fields as `YYYY-MM-DD`, NULL when they can't be parsed.
    pub fix_dates: bool,
    /// Only read the first `n` records of every file.
    pub subset: Option<usize>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            fix_dates: true,
            subset: None,
        }
    }
}

/// A data file found in the extraction directory, grouped by file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// A `.dat` file with the `.des` file describing its layout.
    FixedWidth {
        stem: String,
        dat: PathBuf,
        des: PathBuf,
    },
    /// A `.csv` file with a header row.
    Delimited { stem: String, path: PathBuf },
}

impl DataSource {
    pub fn stem(&self) -> &str {
        match self {
            DataSource::FixedWidth { stem, .. } => stem,
            DataSource::Delimited { stem, .. } => stem,
        }
    }

    /// Tables this source creates.
    pub fn table_names(&self) -> Vec<String> {
        match self {
            DataSource::FixedWidth { stem, .. } => {
                vec![format!("{}_data", stem), format!("{}_desc", stem)]
            }
            DataSource::Delimited { stem, .. } => vec![stem.clone()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub name: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub tables: Vec<TableSummary>,
}

impl BuildSummary {
    pub fn rows(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|t| t.name == table).map(|t| t.rows)
    }

    /// Rows loaded from data files, the `*_desc` tables excluded.
    pub fn data_rows(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| !t.name.ends_with("_desc"))
            .map(|t| t.rows)
            .sum()
    }
}

#[derive(Default)]
struct StemFiles {
    dat: Option<PathBuf>,
    des: Option<PathBuf>,
    csv: Option<PathBuf>,
}

/// Group the files of `dir_path` into data sources, sorted by stem.  Files
/// with other extensions are ignored.  A `.dat` without its `.des` (or the
/// other way around) is an error.
pub fn list_unique_files(dir_path: &Path) -> Result<Vec<DataSource>> {
    let mut groups: BTreeMap<String, StemFiles> = BTreeMap::new();
    for entry in fs::read_dir(dir_path).map_err(|e| Error::io(dir_path, e))? {
        let path = entry.map_err(|e| Error::io(dir_path, e))?.path();
        if !path.is_file() {
            continue;
        }
        let (Some(stem), Some(ext)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.extension().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        let stem = stem.to_string();
        match ext.to_ascii_lowercase().as_str() {
            "dat" => groups.entry(stem).or_default().dat = Some(path),
            "des" => groups.entry(stem).or_default().des = Some(path),
            "csv" => groups.entry(stem).or_default().csv = Some(path),
            _ => {}
        }
    }

    let mut sources = Vec::new();
    for (stem, files) in groups {
        match (files.dat, files.des) {
            (Some(dat), Some(des)) => sources.push(DataSource::FixedWidth {
                stem: stem.clone(),
                dat,
                des,
            }),
            (Some(dat), None) => {
                return Err(Error::schema(dat, "no matching .des description file"))
            }
            (None, Some(des)) => return Err(Error::schema(des, "no matching .dat data file")),
            (None, None) => {}
        }
        if let Some(path) = files.csv {
            sources.push(DataSource::Delimited { stem, path });
        }
    }
    Ok(sources)
}

/// Create the SQLite database `db_name` from the data files in `dir_path`,
/// one table per data file.  An existing database file is replaced.
pub fn build_sqlite_db(db_name: &Path, dir_path: &Path) -> Result<BuildSummary> {
    build_sqlite_db_with(db_name, dir_path, &BuildOptions::default())
}

pub fn build_sqlite_db_with(
    db_name: &Path,
    dir_path: &Path,
    options: &BuildOptions,
) -> Result<BuildSummary> {
    let sources = list_unique_files(dir_path)?;
    if sources.is_empty() {
        return Err(Error::EmptyDirectory(dir_path.to_path_buf()));
    }
    // SQLite table names are case-insensitive
    let mut tables = HashSet::new();
    for name in sources.iter().flat_map(|s| s.table_names()) {
        if !tables.insert(name.to_ascii_lowercase()) {
            return Err(Error::schema(
                dir_path,
                format!("more than one file maps to table {}", name),
            ));
        }
    }

    if db_name.exists() {
        fs::remove_file(db_name).map_err(|e| Error::io(db_name, e))?;
    }
    let res = write_tables(db_name, &sources, options);
    if res.is_err() && db_name.exists() {
        // a half-built database is worse than none
        if let Err(e) = fs::remove_file(db_name) {
            warn!("failed to remove {}: {}", db_name.display(), e);
        }
    }
    res
}

fn write_tables(
    db_name: &Path,
    sources: &[DataSource],
    options: &BuildOptions,
) -> Result<BuildSummary> {
    let mut conn = Connection::open(db_name)?;
    let tx = conn.transaction()?;

    let mut summary = BuildSummary::default();
    for source in sources {
        info!("Reading {} ...", source.stem());
        match source {
            DataSource::FixedWidth { stem, dat, des } => {
                let layout = RecordLayout::from_des_file(des)?;
                let table = format!("{}_data", stem);
                let rows = load_fixed_width(&tx, &table, dat, &layout, options)?;
                info!("  wrote {} rows to {}", rows, table);
                summary.tables.push(TableSummary { name: table, rows });

                let table = format!("{}_desc", stem);
                let rows = load_description(&tx, &table, &layout)?;
                info!("  wrote {} rows to {}", rows, table);
                summary.tables.push(TableSummary { name: table, rows });
            }
            DataSource::Delimited { stem, path } => {
                let rows = load_delimited(&tx, stem, path, options)?;
                info!("  wrote {} rows to {}", rows, stem);
                summary.tables.push(TableSummary {
                    name: stem.clone(),
                    rows,
                });
            }
        }
    }
    tx.commit()?;
    Ok(summary)
}

fn create_text_table(conn: &Connection, table: &str, columns: &[&str]) -> Result<()> {
    let sql = format!(
        "CREATE TABLE {} ({});",
        quote_ident(table),
        columns
            .iter()
            .map(|c| format!("{} TEXT", quote_ident(c)))
            .join(", ")
    );
    conn.execute_batch(&sql)?;
    Ok(())
}

fn insert_sql(table: &str, columns: &[&str]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.iter().map(|c| quote_ident(c)).join(", "),
        (1..=columns.len()).map(|i| format!("?{}", i)).join(", ")
    )
}

fn load_fixed_width(
    conn: &Connection,
    table: &str,
    dat: &Path,
    layout: &RecordLayout,
    options: &BuildOptions,
) -> Result<usize> {
    let columns = layout.column_names();
    create_text_table(conn, table, &columns)?;
    let mut stmt = conn.prepare(&insert_sql(table, &columns))?;

    let is_date: Vec<bool> = layout
        .fields
        .iter()
        .map(|f| options.fix_dates && f.kind == FieldType::Date)
        .collect();
    let width = layout.width();

    let file = File::open(dat).map_err(|e| Error::io(dat, e))?;
    let mut rows = 0;
    for (i, line) in BufReader::new(file).split(b'\n').enumerate() {
        if options.subset.is_some_and(|n| rows >= n) {
            break;
        }
        let line = line.map_err(|e| Error::io(dat, e))?;
        let line = decode_text(&line);
        let record = line.trim_end();
        if record.trim().is_empty() {
            continue;
        }
        let n = record.chars().count();
        if n > width {
            return Err(Error::schema(
                dat,
                format!(
                    "line {} has {} characters, the layout describes {}",
                    i + 1,
                    n,
                    width
                ),
            ));
        }
        let values: Vec<Option<String>> = layout
            .split(record)
            .into_iter()
            .zip(&is_date)
            .map(|(v, &date)| {
                if date {
                    normalize_date(v)
                } else {
                    Some(v.to_string())
                }
            })
            .collect();
        stmt.execute(params_from_iter(values.iter()))?;
        rows += 1;
    }
    Ok(rows)
}

fn load_description(conn: &Connection, table: &str, layout: &RecordLayout) -> Result<usize> {
    let [name, description, kind, start, length] = DESC_COLUMNS.map(quote_ident);
    conn.execute_batch(&format!(
        "CREATE TABLE {} ({} TEXT, {} TEXT, {} TEXT, {} INTEGER, {} INTEGER);",
        quote_ident(table),
        name,
        description,
        kind,
        start,
        length
    ))?;
    let mut stmt = conn.prepare(&insert_sql(table, &DESC_COLUMNS))?;
    for field in &layout.fields {
        stmt.execute(params![
            field.name,
            field.description,
            field.kind.as_str(),
            field.start as i64,
            field.length as i64,
        ])?;
    }
    Ok(layout.fields.len())
}

fn load_delimited(
    conn: &Connection,
    table: &str,
    path: &Path,
    options: &BuildOptions,
) -> Result<usize> {
    let mut rdr = csv_reader(path)?;
    let headers: Vec<String> = rdr
        .byte_headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(|h| decode_text(h).trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(Error::schema(path, "no header row"));
    }
    if let Some(pos) = headers.iter().position(|h| h.is_empty()) {
        return Err(Error::schema(path, format!("column {} has no name", pos + 1)));
    }
    if let Some(dup) = headers.iter().duplicates().next() {
        return Err(Error::schema(path, format!("duplicate column {}", dup)));
    }

    let columns: Vec<&str> = headers.iter().map(String::as_str).collect();
    let candidates: Vec<bool> = columns
        .iter()
        .map(|c| options.fix_dates && is_update_column(c))
        .collect();
    let is_date = if candidates.contains(&true) {
        date_columns(path, candidates, options.subset)?
    } else {
        candidates
    };

    create_text_table(conn, table, &columns)?;
    let mut stmt = conn.prepare(&insert_sql(table, &columns))?;
    let mut rows = 0;
    for (i, record) in rdr.byte_records().enumerate() {
        if options.subset.is_some_and(|n| rows >= n) {
            break;
        }
        let record = record.map_err(|e| record_error(path, i + 1, e))?;
        let values: Vec<Option<String>> = record
            .iter()
            .zip(&is_date)
            .map(|(v, &date)| {
                let v = decode_text(v);
                if date {
                    normalize_date(&v)
                } else {
                    Some(v.into_owned())
                }
            })
            .collect();
        stmt.execute(params_from_iter(values.iter()))?;
        rows += 1;
    }
    Ok(rows)
}

/// Narrow the update-column candidates of a csv file to the ones where every
/// non-blank value is a date.  Only those get normalized.
fn date_columns(
    path: &Path,
    mut candidates: Vec<bool>,
    subset: Option<usize>,
) -> Result<Vec<bool>> {
    let mut rdr = csv_reader(path)?;
    let records = rdr.byte_records().take(subset.unwrap_or(usize::MAX));
    for (i, record) in records.enumerate() {
        let record = record.map_err(|e| record_error(path, i + 1, e))?;
        for (flag, v) in candidates.iter_mut().zip(record.iter()) {
            let v = decode_text(v);
            if *flag && !v.trim().is_empty() && normalize_date(&v).is_none() {
                debug!("{}: not a date column, found {:?}", path.display(), v);
                *flag = false;
            }
        }
        if !candidates.contains(&true) {
            break;
        }
    }
    Ok(candidates)
}

fn csv_reader(path: &Path) -> Result<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)
        .map_err(|e| csv_error(path, e))
}

fn csv_error(path: &Path, source: csv::Error) -> Error {
    Error::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn record_error(path: &Path, record: usize, e: csv::Error) -> Error {
    if let csv::ErrorKind::UnequalLengths {
        expected_len, len, ..
    } = e.kind()
    {
        return Error::schema(
            path,
            format!(
                "record {} has {} fields, the header has {}",
                record, len, expected_len
            ),
        );
    }
    csv_error(path, e)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::utils::lib_sqlite::{count_rows, list_tables, table_columns};
    use rusqlite::types::Value;
    use std::error::Error;

    pub(crate) const OFNT3AA1_DES: &str = "\
CMDORNUM      OFFENDER NC DOC ID NUMBER      CHAR      1      7
CMLSTNME      OFFENDER LAST NAME      CHAR      8      10
DTOFUPDT      DATE OF LAST UPDATE      DATE      18      10
";

    pub(crate) const OFNT3AA1_DAT: &str = "\
0000001SMITH     2019-06-01
0000002JONES     2021-01-01
0000003DOE       2020-05-05
0000004ROE
";

    pub(crate) const APPT7AA1_DES: &str = "\
CMDORNUM      OFFENDER NC DOC ID NUMBER      CHAR      1      7
APPLDATE      APPEAL DATE      DATE      8      10
";

    pub(crate) const APPT7AA1_DAT: &str = "\
00000012019-01-01
00000022021-03-03
00000022021-04-04
";

    pub(crate) const OFFENDERS_CSV: &str = "\
id,name,update_date
1,Smith,2019-06-01
2,Jones,2021-01-01
3,Doe,2020-05-05
";

    /// A directory that looks like the content of the unpacked OPI archives.
    pub(crate) fn sample_dir() -> Result<tempfile::TempDir, Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("OFNT3AA1.des"), OFNT3AA1_DES)?;
        fs::write(dir.path().join("OFNT3AA1.dat"), OFNT3AA1_DAT)?;
        fs::write(dir.path().join("APPT7AA1.des"), APPT7AA1_DES)?;
        fs::write(dir.path().join("APPT7AA1.dat"), APPT7AA1_DAT)?;
        fs::write(dir.path().join("offenders.csv"), OFFENDERS_CSV)?;
        fs::write(dir.path().join("readme.txt"), "ignored")?;
        Ok(dir)
    }

    fn lines_minus_header(text: &str, header: bool) -> usize {
        let n = text.lines().filter(|l| !l.trim().is_empty()).count();
        if header {
            n - 1
        } else {
            n
        }
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    pub(crate) fn all_rows(conn: &Connection, table: &str) -> Result<Vec<Vec<Value>>, Box<dyn Error>> {
        let columns = table_columns(conn, table)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} ORDER BY 1, 2",
            quote_ident(table)
        ))?;
        let rows = stmt
            .query_map([], |row| {
                (0..columns.len())
                    .map(|i| row.get::<usize, Value>(i))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    #[test]
    fn list_files() -> Result<(), Box<dyn Error>> {
        let dir = sample_dir()?;
        let sources = list_unique_files(dir.path())?;
        let stems: Vec<&str> = sources.iter().map(|s| s.stem()).collect();
        assert_eq!(stems, vec!["APPT7AA1", "OFNT3AA1", "offenders"]);
        assert!(matches!(sources[0], DataSource::FixedWidth { .. }));
        assert!(matches!(sources[2], DataSource::Delimited { .. }));
        Ok(())
    }

    #[test]
    fn build_db() -> Result<(), Box<dyn Error>> {
        let dir = sample_dir()?;
        let db = dir.path().join("ncdac.sqlite");
        let summary = build_sqlite_db(&db, dir.path())?;

        assert_eq!(summary.rows("OFNT3AA1_data"), Some(4));
        assert_eq!(summary.rows("OFNT3AA1_desc"), Some(3));
        assert_eq!(summary.rows("APPT7AA1_data"), Some(3));
        assert_eq!(summary.rows("offenders"), Some(3));
        assert_eq!(
            summary.data_rows(),
            lines_minus_header(OFNT3AA1_DAT, false)
                + lines_minus_header(APPT7AA1_DAT, false)
                + lines_minus_header(OFFENDERS_CSV, true)
        );

        let conn = Connection::open(&db)?;
        assert_eq!(
            list_tables(&conn)?,
            vec![
                "APPT7AA1_data",
                "APPT7AA1_desc",
                "OFNT3AA1_data",
                "OFNT3AA1_desc",
                "offenders"
            ]
        );
        for table in &summary.tables {
            assert_eq!(count_rows(&conn, &table.name)?, table.rows);
        }
        let rows = all_rows(&conn, "OFNT3AA1_data")?;
        assert_eq!(rows[0], vec![text("0000001"), text("SMITH"), text("2019-06-01")]);
        // blank date becomes NULL
        assert_eq!(rows[3][2], Value::Null);

        let (start, length): (i64, i64) = conn.query_row(
            "SELECT Start, Length FROM OFNT3AA1_desc WHERE Name = 'DTOFUPDT'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        assert_eq!((start, length), (18, 10));
        Ok(())
    }

    #[test]
    fn build_is_repeatable() -> Result<(), Box<dyn Error>> {
        let dir = sample_dir()?;
        let db1 = dir.path().join("one.sqlite");
        let db2 = dir.path().join("two.sqlite");
        build_sqlite_db(&db1, dir.path())?;
        build_sqlite_db(&db2, dir.path())?;
        let (c1, c2) = (Connection::open(&db1)?, Connection::open(&db2)?);
        for table in list_tables(&c1)? {
            assert_eq!(all_rows(&c1, &table)?, all_rows(&c2, &table)?);
        }
        Ok(())
    }

    #[test]
    fn build_replaces_existing_db() -> Result<(), Box<dyn Error>> {
        let dir = sample_dir()?;
        let db = dir.path().join("ncdac.sqlite");
        fs::write(&db, "not a database")?;
        build_sqlite_db(&db, dir.path())?;
        let conn = Connection::open(&db)?;
        assert_eq!(count_rows(&conn, "offenders")?, 3);
        Ok(())
    }

    #[test]
    fn build_with_options() -> Result<(), Box<dyn Error>> {
        let dir = sample_dir()?;
        fs::write(
            dir.path().join("offenders.csv"),
            "id,update_date\n1,06/01/2019\n2,\n3,20200505\n",
        )?;
        let db = dir.path().join("ncdac.sqlite");
        let summary = build_sqlite_db_with(
            &db,
            dir.path(),
            &BuildOptions {
                fix_dates: true,
                subset: Some(2),
            },
        )?;
        assert_eq!(summary.rows("OFNT3AA1_data"), Some(2));
        assert_eq!(summary.rows("offenders"), Some(2));
        let conn = Connection::open(&db)?;
        assert_eq!(
            all_rows(&conn, "offenders")?,
            vec![
                vec![text("1"), text("2019-06-01")],
                vec![text("2"), Value::Null],
            ]
        );

        let raw = dir.path().join("raw.sqlite");
        build_sqlite_db_with(
            &raw,
            dir.path(),
            &BuildOptions {
                fix_dates: false,
                subset: None,
            },
        )?;
        let conn = Connection::open(&raw)?;
        let rows = all_rows(&conn, "offenders")?;
        assert_eq!(rows[0][1], text("06/01/2019"));
        assert_eq!(rows[1][1], text(""));
        Ok(())
    }

    #[test]
    fn only_date_columns_are_normalized() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("offenders.csv"),
            "id,updated_by,update_date,last_update\n\
             1,20210101,06/01/2019,01/02/2020\n\
             2,alice,20210101,n/a\n\
             3,bob,,\n",
        )?;
        let db = dir.path().join("ncdac.sqlite");
        build_sqlite_db(&db, dir.path())?;
        let conn = Connection::open(&db)?;
        assert_eq!(
            all_rows(&conn, "offenders")?,
            vec![
                vec![text("1"), text("20210101"), text("2019-06-01"), text("01/02/2020")],
                vec![text("2"), text("alice"), text("2021-01-01"), text("n/a")],
                vec![text("3"), text("bob"), Value::Null, text("")],
            ]
        );
        Ok(())
    }

    #[test]
    fn table_names_collide_ignoring_case() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("a.des"), OFNT3AA1_DES)?;
        fs::write(dir.path().join("a.dat"), OFNT3AA1_DAT)?;
        fs::write(dir.path().join("A_data.csv"), OFFENDERS_CSV)?;
        let db = dir.path().join("ncdac.sqlite");
        match build_sqlite_db(&db, dir.path()) {
            Err(crate::Error::Schema { reason, .. }) => {
                assert!(reason.contains("maps to table"), "{}", reason);
            }
            other => panic!("expected a schema error, got {:?}", other),
        }
        assert!(!db.exists());
        Ok(())
    }

    #[test]
    fn latin1_records() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("OFNT3AA1.des"), OFNT3AA1_DES)?;
        fs::write(
            dir.path().join("OFNT3AA1.dat"),
            b"0000001MU\xd1OZ     2019-06-01\n0000002PE\xd1A      2021-01-01\n",
        )?;
        fs::write(dir.path().join("names.csv"), b"id,name\n1,MU\xd1OZ\n")?;
        let db = dir.path().join("ncdac.sqlite");
        build_sqlite_db(&db, dir.path())?;
        let conn = Connection::open(&db)?;
        assert_eq!(
            all_rows(&conn, "OFNT3AA1_data")?,
            vec![
                vec![text("0000001"), text("MUÑOZ"), text("2019-06-01")],
                vec![text("0000002"), text("PEÑA"), text("2021-01-01")],
            ]
        );
        assert_eq!(all_rows(&conn, "names")?, vec![vec![text("1"), text("MUÑOZ")]]);
        Ok(())
    }

    #[test]
    fn missing_or_empty_dir() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let db = dir.path().join("ncdac.sqlite");
        let res = build_sqlite_db(&db, &dir.path().join("nope"));
        assert!(matches!(res, Err(crate::Error::Io { .. })));

        fs::write(dir.path().join("readme.txt"), "nothing to load")?;
        let res = build_sqlite_db(&db, dir.path());
        assert!(matches!(res, Err(crate::Error::EmptyDirectory(_))));
        assert!(!db.exists());
        Ok(())
    }

    #[test]
    fn unpaired_files() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("OFNT3AA1.dat"), OFNT3AA1_DAT)?;
        let res = build_sqlite_db(&dir.path().join("x.sqlite"), dir.path());
        assert!(matches!(res, Err(crate::Error::Schema { .. })));
        Ok(())
    }

    #[test]
    fn schema_errors_remove_partial_db() -> Result<(), Box<dyn Error>> {
        let dir = sample_dir()?;
        // zz sorts last, so the other tables are written before the failure
        fs::write(dir.path().join("zz.csv"), "a,b\n1,2\n3\n")?;
        let db = dir.path().join("ncdac.sqlite");
        let res = build_sqlite_db(&db, dir.path());
        match res {
            Err(crate::Error::Schema { path, reason }) => {
                assert_eq!(path, dir.path().join("zz.csv"));
                assert!(reason.contains("record 2"), "{}", reason);
            }
            other => panic!("expected a schema error, got {:?}", other),
        }
        assert!(!db.exists());

        let dir = sample_dir()?;
        fs::write(
            dir.path().join("OFNT3AA1.dat"),
            "0000001SMITH     2019-06-01 EXTRA\n",
        )?;
        let res = build_sqlite_db(&db, dir.path());
        assert!(matches!(res, Err(crate::Error::Schema { .. })));
        Ok(())
    }
}
