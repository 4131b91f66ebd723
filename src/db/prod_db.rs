use std::env;

use super::ncdac::opi_archive::OpiArchive;

/// Root of the archive when `ARCHIVE_DIR` is not set.
pub const DEFAULT_ARCHIVE_DIR: &str = "/home/data/Archive";

pub struct ProdDb {}

impl ProdDb {
    fn archive_dir() -> String {
        env::var("ARCHIVE_DIR").unwrap_or_else(|_| DEFAULT_ARCHIVE_DIR.to_string())
    }

    pub fn ncdac_opi() -> OpiArchive {
        let root = ProdDb::archive_dir();
        OpiArchive {
            base_dir: format!("{}/Ncdac/Opi", root),
            sqlite_path: format!("{}/SQLite/ncdac/offenders.sqlite", root),
        }
    }
}
