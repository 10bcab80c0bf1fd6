use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::error::{Result, UpgradeError};
use crate::options::verbose;
use crate::utils::platform::{self, Platform};
use crate::version::Version;

pub const DEFAULT_MIRROR: &str = "https://nodejs.org/dist";

pub trait Downloader {
    /// Fetches `url` to a local file. Upstream 404 is `NotFound`, anything
    /// else that goes wrong is `TransferFailed`.
    fn fetch(&self, url: &str) -> Result<PathBuf>;
}

pub struct HttpDownloader {
    client: Client,
    dest_dir: PathBuf,
}

impl HttpDownloader {
    pub fn new(dest_dir: PathBuf) -> Result<Self> {
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| UpgradeError::Config(format!("HTTP client: {}", err)))?;

        Ok(Self { client, dest_dir })
    }
}

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str) -> Result<PathBuf> {
        let transfer_failed = |detail: String| UpgradeError::TransferFailed {
            url: url.to_string(),
            detail,
        };

        fs::create_dir_all(&self.dest_dir)?;
        let dest_path = self.dest_dir.join(file_name_from_url(url));

        println!("Downloading from {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|err| transfer_failed(err.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(UpgradeError::NotFound(url.to_string()));
        }
        if !resp.status().is_success() {
            return Err(transfer_failed(format!("server answered {}", resp.status())));
        }

        let total_size = resp.content_length().unwrap_or(0);
        let pb = ProgressBar::new(total_size);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }

        let copied = File::create(&dest_path)
            .and_then(|mut file| io::copy(&mut pb.wrap_read(resp), &mut file));
        if let Err(err) = copied {
            pb.abandon();
            let _ = fs::remove_file(&dest_path);
            return Err(transfer_failed(err.to_string()));
        }

        pb.finish_with_message("Download complete");
        verbose::info(&format!("Download complete: {}", dest_path.display()));
        Ok(dest_path)
    }
}

fn file_name_from_url(url: &str) -> &str {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').find(|segment| !segment.is_empty()))
        .filter(|segment| !segment.contains(':'))
        .unwrap_or("node-download")
}

/// HEAD request against the mirror, bounded by `timeout`. A timeout, a
/// transport error and a non-200 answer all mean "no connectivity".
pub fn probe_connectivity(url: &str, timeout: Duration) -> bool {
    verbose::info(&format!("Checking connectivity to {}", url));

    let client = match Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(err) => {
            verbose::warn(&format!("Could not build HTTP client: {}", err));
            return false;
        }
    };

    match client.head(url).send() {
        Ok(resp) if resp.status() == StatusCode::OK => {
            verbose::info("Connectivity verified");
            true
        }
        Ok(resp) => {
            verbose::warn(&format!("{} answered {}", url, resp.status()));
            false
        }
        Err(err) if err.is_timeout() => {
            verbose::warn(&format!("Timed out connecting to {}", url));
            false
        }
        Err(err) => {
            verbose::warn(&format!("Could not connect to {}: {}", url, err));
            false
        }
    }
}

/// Where official release archives live for this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistSite {
    mirror: String,
    os: &'static str,
    arch: &'static str,
}

impl DistSite {
    pub fn new(mirror: &str, os: &'static str, arch: &'static str) -> Self {
        Self {
            mirror: mirror.trim_end_matches('/').to_string(),
            os,
            arch,
        }
    }

    pub fn for_platform(mirror: &str, platform: Platform) -> Self {
        Self::new(mirror, platform.dist_os(), platform::dist_arch())
    }

    pub fn archive_name(&self, version: &Version) -> String {
        format!("node-{}-{}-{}.tar.xz", version, self.os, self.arch)
    }

    pub fn archive_url(&self, version: &Version) -> String {
        format!("{}/{}/{}", self.mirror, version, self.archive_name(version))
    }
}
