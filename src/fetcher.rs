//! Script bundle download and unpacking.

use crate::error::{ExtractError, Result};
use crate::script_traits::Controller;
use flate2::read::GzDecoder;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::info;

/// Path of the bundle relative to the controller's metadata URL.
pub const DEFAULT_BUNDLE_PATH: &str = "maas-scripts/";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Download the bundle at `url` and unpack every member into `scripts_dir`.
///
/// Mode bits recorded in the archive are kept; existing files of the same
/// name are overwritten. A failed download is returned as-is and nothing is
/// written.
pub fn download_and_extract_tar(
    controller: &dyn Controller,
    url: &str,
    scripts_dir: &Path,
) -> Result<()> {
    let bundle = controller.fetch(url)?;
    info!(
        url,
        bytes = bundle.len(),
        dir = %scripts_dir.display(),
        "downloaded script bundle"
    );
    extract_bundle(&bundle, scripts_dir)?;
    Ok(())
}

/// Unpack a plain or gzip-compressed tarball held in memory.
pub fn extract_bundle(bundle: &[u8], scripts_dir: &Path) -> std::result::Result<(), ExtractError> {
    let reader: Box<dyn Read + '_> = if bundle.starts_with(&GZIP_MAGIC) {
        Box::new(GzDecoder::new(bundle))
    } else {
        Box::new(Cursor::new(bundle))
    };

    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);
    archive.unpack(scripts_dir).map_err(|source| ExtractError {
        dir: scripts_dir.display().to_string(),
        source,
    })
}
