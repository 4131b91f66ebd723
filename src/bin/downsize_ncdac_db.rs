use std::{
    error::Error,
    path::{Path, PathBuf},
};

use clap::Parser;
use log::{info, warn};
use ncdac::db::{
    ncdac::downsize::{downsize_by_profile_update, downsize_by_update, ProfileFilter},
    prod_db::ProdDb,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Keep the records updated on or after this date, e.g. 2020-01-01
    #[arg(short, long)]
    since: String,

    /// Output database, must not exist.  Defaults to a file next to the
    /// full database, replaced if it exists.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep the offenders whose profile was updated since the date, with all
    /// their records, instead of filtering each table on its own update date
    #[arg(long)]
    by_profile: bool,
}

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
    let input = Path::new(&archive.sqlite_path);
    let (output, summary) = match args.output {
        None => archive.downsize(&args.since, args.by_profile)?,
        Some(output) => {
            let summary = if args.by_profile {
                downsize_by_profile_update(input, &output, &args.since, &ProfileFilter::default())?
            } else {
                downsize_by_update(input, &output, &args.since)?
            };
            (output, summary)
        }
    };

    for table in &summary.tables {
        info!(
            "{}: {} -> {} rows",
            table.name, table.rows_before, table.rows_after
        );
    }
    info!("wrote {}", output.display());
    Ok(())
}
