use crate::commands::{get, CacheContext};
use crate::model::is_media_file;
use crate::remote::RemoteFs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Default, Clone)]
pub struct PrimeReport {
    pub folder: PathBuf,
    /// Media files found in the folder.
    pub total: usize,
    /// Files that ended up with a usable local copy (any outcome).
    pub cached: usize,
    /// Filename and reason for every file that could not be cached.
    pub failed: Vec<(String, String)>,
    pub folder_missing: bool,
}

/// Cache every slideshow file in `folder`, one at a time.
///
/// Files are fetched by bare name from the cache's remote root, so nested
/// layouts flatten into the cache root. A failing file is recorded and
/// skipped; the pass always runs to the end.
pub fn run<R: RemoteFs>(ctx: &CacheContext<R>, folder: &Path) -> PrimeReport {
    let mut report = PrimeReport {
        folder: folder.to_path_buf(),
        ..Default::default()
    };

    if !ctx.remote.dir_exists(folder) {
        warn!(folder = %folder.display(), "slideshow folder not reachable");
        report.folder_missing = true;
        return report;
    }

    let names = match ctx.remote.list_files(folder) {
        Ok(names) => names,
        Err(err) => {
            warn!(folder = %folder.display(), error = %err, "could not list slideshow folder");
            report.folder_missing = true;
            return report;
        }
    };

    let media: Vec<String> = names.into_iter().filter(|n| is_media_file(n)).collect();
    report.total = media.len();

    for name in media {
        match get::run(ctx, &name) {
            Ok(_) => report.cached += 1,
            Err(err) => {
                warn!(filename = %name, error = %err, "slideshow file not cached");
                report.failed.push((name, err.to_string()));
            }
        }
    }

    info!(
        folder = %folder.display(),
        cached = report.cached,
        total = report.total,
        "slideshow cache pass finished"
    );
    report
}
