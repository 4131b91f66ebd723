use std::{error::Error, path::Path, time::Duration};

use clap::Parser;
use log::{error, info, warn};
use ncdac::db::prod_db::ProdDb;
use reqwest::blocking::Client;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Rebuild the database from the files already extracted
    #[arg(long)]
    skip_download: bool,

    /// Keep the zip files next to the extracted files
    #[arg(long)]
    keep_zip: bool,

    /// Timeout of each HTTP request, in seconds
    #[arg(long, default_value_t = 600)]
    timeout: u64,
}

/// Run this job once a week, the files are refreshed on the weekend.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let env_file = format!(".env/{}.env", args.env);
    if let Err(e) = dotenvy::from_path(Path::new(&env_file)) {
        warn!("not loading {}: {}", env_file, e);
    }

    let archive = ProdDb::ncdac_opi();
    let mut failed = 0;
    if !args.skip_download {
        let client = Client::builder()
            .timeout(Duration::from_secs(args.timeout))
            .build()?;
        let report = archive.download_all(&client, args.keep_zip)?;
        info!(
            "extracted {} files from {} archives",
            report.files().count(),
            report.unpacked.len()
        );
        for (url, e) in &report.failed {
            error!("failed to get {}: {}", url, e);
        }
        failed = report.failed.len();
    }

    let summary = archive.rebuild_sqlite()?;
    info!(
        "{} rows in {} tables written to {}",
        summary.data_rows(),
        summary.tables.len(),
        archive.sqlite_path
    );

    if failed > 0 {
        return Err(format!("{} downloads failed, the database may be stale", failed).into());
    }
    Ok(())
}
