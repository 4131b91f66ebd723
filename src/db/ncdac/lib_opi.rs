use std::{
    fs::{self, File},
    io::{self, Cursor},
    path::{Path, PathBuf},
};

use log::{error, info, warn};
use reqwest::{
    blocking::{Client, Response},
    header::{UPGRADE_INSECURE_REQUESTS, USER_AGENT},
    Url,
};
use scraper::{Html, Selector};
use zip::ZipArchive;

use crate::error::{Error, Result};

/// The Offender Public Information downloads page.
pub const LISTING_URL: &str = "https://webapps.doc.state.nc.us/opi/downloads.do?method=view";

const BROWSER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct UnpackOptions {
    /// Extract the content of the archives.  When false the zip files are
    /// only saved, and reported as the files of each URL.
    pub unzip: bool,
    /// Leave the downloaded zip file in the extraction directory, named after
    /// the last segment of its URL.
    pub keep_archive: bool,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            unzip: true,
            keep_archive: false,
        }
    }
}

#[derive(Debug)]
pub struct UnpackedArchive {
    pub url: String,
    pub files: Vec<PathBuf>,
}

/// Outcome of a batch download.  A bad link doesn't stop the batch, it ends
/// up in `failed` instead.
#[derive(Debug, Default)]
pub struct UnpackReport {
    pub unpacked: Vec<UnpackedArchive>,
    pub failed: Vec<(String, Error)>,
}

impl UnpackReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// All the files extracted, across archives.
    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.unpacked.iter().flat_map(|e| e.files.iter())
    }
}

/// Get the URLs of all the zip files listed on the OPI downloads page.
pub fn get_zipped_paths() -> Result<Vec<String>> {
    get_zipped_paths_from(&Client::new(), LISTING_URL)
}

/// Same as [`get_zipped_paths`] for a different listing page.  Configure
/// timeouts on the `client` if you need bounded latency.
pub fn get_zipped_paths_from(client: &Client, url: &str) -> Result<Vec<String>> {
    let response = send(client, url)?;
    let base = response.url().clone();
    let html = response.text().map_err(|source| Error::Network {
        url: url.to_string(),
        source,
    })?;
    let links = extract_zip_links(&html, &base);
    info!("found {} zip links on {}", links.len(), url);
    Ok(links)
}

/// Absolute URLs of the anchors that point to a zip file, in page order.
/// An anchor qualifies if its resolved path or its text ends in `.zip`.
pub fn extract_zip_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("static selector");

    let mut links = Vec::new();
    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let url = match base.join(href.trim()) {
            Ok(url) => url,
            Err(e) => {
                warn!("ignoring link {:?}: {}", href, e);
                continue;
            }
        };
        let text = anchor.text().collect::<String>();
        if is_zip_name(url.path()) || is_zip_name(text.trim()) {
            links.push(url.to_string());
        }
    }
    links
}

fn is_zip_name(s: &str) -> bool {
    s.to_ascii_lowercase().ends_with(".zip")
}

/// Download each zip file and extract its content into `extract_path`.
/// Existing files with the same name get overwritten.
pub fn unpack_zipped_paths<S: AsRef<str>>(
    url_list: &[S],
    extract_path: &Path,
) -> Result<UnpackReport> {
    unpack_zipped_paths_with(
        &Client::new(),
        url_list,
        extract_path,
        &UnpackOptions::default(),
    )
}

pub fn unpack_zipped_paths_with<S: AsRef<str>>(
    client: &Client,
    url_list: &[S],
    extract_path: &Path,
    options: &UnpackOptions,
) -> Result<UnpackReport> {
    fs::create_dir_all(extract_path).map_err(|e| Error::io(extract_path, e))?;

    let mut report = UnpackReport::default();
    for url in url_list {
        let url = url.as_ref();
        match download_and_unpack(client, url, extract_path, options) {
            Ok(files) => {
                info!("got {} files from {}", files.len(), url);
                report.unpacked.push(UnpackedArchive {
                    url: url.to_string(),
                    files,
                });
            }
            Err(e) => {
                error!("skipping {}: {}", url, e);
                report.failed.push((url.to_string(), e));
            }
        }
    }
    Ok(report)
}

fn download_and_unpack(
    client: &Client,
    url: &str,
    extract_path: &Path,
    options: &UnpackOptions,
) -> Result<Vec<PathBuf>> {
    info!("downloading {}", url);
    let bytes = send(client, url)?
        .bytes()
        .map_err(|source| Error::Network {
            url: url.to_string(),
            source,
        })?;
    info!("downloaded {} bytes", bytes.len());

    if options.keep_archive || !options.unzip {
        let zip_path = extract_path.join(archive_name(url));
        fs::write(&zip_path, &bytes).map_err(|e| Error::io(&zip_path, e))?;
        info!("saved archive {}", zip_path.display());
        if !options.unzip {
            return Ok(vec![zip_path]);
        }
    }
    unpack_archive(&bytes, extract_path, url)
}

/// Extract a zip file that is already on disk.  Without an `extract_path`
/// the files land next to the zip.
pub fn unzip_file(zip_path: &Path, extract_path: Option<&Path>) -> Result<Vec<PathBuf>> {
    let bytes = fs::read(zip_path).map_err(|e| Error::io(zip_path, e))?;
    let dir = match extract_path {
        Some(dir) => dir,
        None => zip_path.parent().unwrap_or(Path::new(".")),
    };
    unpack_archive(&bytes, dir, &zip_path.display().to_string())
}

/// Write every file entry of an in-memory archive under `extract_path`,
/// keeping the relative paths stored in the archive.  `origin` is only used
/// for error messages.
pub fn unpack_archive(bytes: &[u8], extract_path: &Path, origin: &str) -> Result<Vec<PathBuf>> {
    let archive_error = |source| Error::Archive {
        origin: origin.to_string(),
        source,
    };
    let mut zip = ZipArchive::new(Cursor::new(bytes)).map_err(archive_error)?;

    let mut written = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(archive_error)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(Error::UnsafeEntry {
                origin: origin.to_string(),
                entry: entry.name().to_string(),
            });
        };
        let out_path = extract_path.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| Error::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| Error::io(&out_path, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| Error::io(&out_path, e))?;
        info!("extracted file to {}", out_path.display());
        written.push(out_path);
    }
    Ok(written)
}

/// Local file name for a downloaded archive, the last segment of the URL path.
fn archive_name(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.path_segments().and_then(|s| s.last().map(str::to_string)))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "download.zip".to_string())
}

fn send(client: &Client, url: &str) -> Result<Response> {
    let response = client
        .get(url)
        .header(USER_AGENT, BROWSER_AGENT)
        .header(UPGRADE_INSECURE_REQUESTS, "1")
        .send()
        .map_err(|source| Error::Network {
            url: url.to_string(),
            source,
        })?;
    if !response.status().is_success() {
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status: response.status(),
        });
    }
    Ok(response)
}
