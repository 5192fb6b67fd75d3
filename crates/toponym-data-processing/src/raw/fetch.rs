use super::{PlaceSource, RawDataPaths, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};
use zip::ZipArchive;

const GEONAMES_DUMP_URL: &str = "https://download.geonames.org/export/dump";

/// Downloads whichever of the four raw files are missing from `paths`.
#[instrument(name = "Download data", skip_all, level = "info")]
pub fn download_raw_data(paths: &RawDataPaths, source: PlaceSource) -> Result<()> {
    if let Some(parent) = paths.places.parent() {
        fs::create_dir_all(parent)?;
    }
    let archive_url = source.archive_url();
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        let client = Client::new();

        tokio::try_join!(
            fetch_if_missing(&client, &paths.country_info),
            fetch_if_missing(&client, &paths.admin1_codes),
            fetch_if_missing(&client, &paths.admin2_codes),
            fetch_archive_if_missing(&client, &archive_url, &paths.places),
        )?;
        Ok(())
    })
}

async fn fetch_if_missing(client: &Client, dest: &Path) -> Result<()> {
    if dest.exists() {
        return Ok(());
    }
    let file_name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let url = format!("{GEONAMES_DUMP_URL}/{file_name}");
    let temp_file = download_to_temp_file(client, &url, dest).await?;
    temp_file.persist(dest).map_err(|e| e.error)?;
    info!(path = ?dest, "Saved");
    Ok(())
}

async fn fetch_archive_if_missing(client: &Client, zip_url: &str, dest: &Path) -> Result<()> {
    if dest.exists() {
        return Ok(());
    }
    info!(zip_url, "Starting ZIP download");
    let zip_temp_file = download_to_temp_file(client, zip_url, dest).await?;
    info!(path = ?zip_temp_file.path(), "ZIP download complete");

    let zip_file_path = zip_temp_file.path().to_path_buf();
    let dest_path = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_first_entry_from_zip(zip_file_path, dest_path))
        .await??;
    Ok(())
}

/// Streams `url` into a temporary file created next to `dest`, so the final
/// rename stays on one filesystem.
async fn download_to_temp_file(client: &Client, url: &str, dest: &Path) -> Result<NamedTempFile> {
    info!(url, "Starting download");
    let response = client.get(url).send().await?.error_for_status()?;

    let total_size = response.content_length().unwrap_or(0);

    let pb = ProgressBar::new(total_size);
    pb.set_style(ProgressStyle::default_bar()
        .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})").expect("Progress bar template")
        .progress_chars("█░"));
    pb.set_message(format!(
        "Downloading {}",
        url.split('/').next_back().unwrap_or(url)
    ));

    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let temp_file = NamedTempFile::new_in(dir)?;
    let mut dest_file = tokio::fs::File::create(temp_file.path()).await?;

    let mut stream = response.bytes_stream();
    while let Some(item) = stream.next().await {
        let chunk = item?;
        dest_file.write_all(&chunk).await?;
        pb.inc(chunk.len() as u64);
    }
    dest_file.flush().await?;
    pb.finish_and_clear();
    Ok(temp_file)
}

fn extract_first_entry_from_zip(zip_file_path: PathBuf, dest: PathBuf) -> Result<()> {
    let zip_fs_file = fs::File::open(&zip_file_path)?;
    let mut archive = ZipArchive::new(zip_fs_file)?;

    if archive.is_empty() {
        return Err(zip::result::ZipError::FileNotFound.into());
    }

    let mut file_in_zip = archive.by_index(0)?;
    let mut extracted_fs_file = fs::File::create(&dest)?;

    std::io::copy(&mut file_in_zip, &mut extracted_fs_file)?;
    info!(path = ?dest, "File extracted successfully");

    Ok(())
}
