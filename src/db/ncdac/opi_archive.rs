use std::{
    fs,
    path::{Path, PathBuf},
};

use log::info;
use reqwest::blocking::Client;

use super::{
    build::{build_sqlite_db, BuildSummary},
    downsize::{
        downsize_by_profile_update, downsize_by_update, parse_date_filter, DownsizeSummary,
        ProfileFilter,
    },
    lib_opi::{get_zipped_paths_from, unpack_zipped_paths_with, UnpackOptions, UnpackReport, LISTING_URL},
};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct OpiArchive {
    pub base_dir: String,
    pub sqlite_path: String,
}

impl OpiArchive {
    /// Where the content of the zip files goes.
    pub fn raw_dir(&self) -> PathBuf {
        Path::new(&self.base_dir).join("Raw")
    }

    /// Path of the downsized copy of the database for a cutoff date, e.g.
    /// `offenders_since_2020-01-01.sqlite` next to the full database.
    pub fn downsized_path(&self, date_filter: &str) -> Result<PathBuf> {
        let cutoff = parse_date_filter(date_filter)?;
        let path = Path::new(&self.sqlite_path);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("offenders");
        Ok(path.with_file_name(format!("{}_since_{}.sqlite", stem, cutoff)))
    }

    /// Download and extract all the files listed on the OPI downloads page.
    pub fn download_all(&self, client: &Client, keep_archive: bool) -> Result<UnpackReport> {
        let urls = get_zipped_paths_from(client, LISTING_URL)?;
        unpack_zipped_paths_with(
            client,
            &urls,
            &self.raw_dir(),
            &UnpackOptions {
                keep_archive,
                ..UnpackOptions::default()
            },
        )
    }

    /// Recreate the database from the files in the raw directory.
    pub fn rebuild_sqlite(&self) -> Result<BuildSummary> {
        let path = Path::new(&self.sqlite_path);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        info!("building {} from {}", self.sqlite_path, self.raw_dir().display());
        build_sqlite_db(path, &self.raw_dir())
    }

    /// Write the downsized copy of the database, replacing an older copy for
    /// the same date.  With `by_profile` the offenders are selected on the
    /// update date of their profile, see [`downsize_by_profile_update`].
    pub fn downsize(
        &self,
        date_filter: &str,
        by_profile: bool,
    ) -> Result<(PathBuf, DownsizeSummary)> {
        let output = self.downsized_path(date_filter)?;
        if output.exists() {
            fs::remove_file(&output).map_err(|e| Error::io(&output, e))?;
        }
        let input = Path::new(&self.sqlite_path);
        let summary = if by_profile {
            downsize_by_profile_update(input, &output, date_filter, &ProfileFilter::default())?
        } else {
            downsize_by_update(input, &output, date_filter)?
        };
        Ok((output, summary))
    }
}
