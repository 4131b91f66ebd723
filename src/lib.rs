//! Download the NC DAC offender public information files, load them into a
//! SQLite database, and cut that database down to recently updated records.

pub mod db;
pub mod error;
pub mod utils;

pub use db::ncdac::{
    build::build_sqlite_db,
    downsize::downsize_by_update,
    lib_opi::{get_zipped_paths, unpack_zipped_paths},
};
pub use error::{Error, Result};
