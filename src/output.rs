//! Terminal actions: pointer files and full copies
//!
//! Both actions create the target directory on demand and overwrite any
//! existing file, so repeated runs converge on the same output.

use crate::error::ActionError;
use crate::remote::{base_name, RemoteFs};
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};
use url::Url;

/// Extension given to pointer files
pub const POINTER_EXTENSION: &str = ".strm";

/// Path segment the WebDAV endpoint lives under
pub const DEFAULT_DAV_SEGMENT: &str = "/dav";

/// Path segment serving direct downloads
pub const DEFAULT_DIRECT_SEGMENT: &str = "/d";

/// Copy buffer size
const COPY_BUF_SIZE: usize = 64 * 1024;

/// Rewrite the first occurrence of the protocol segment in a base address
///
/// `http://host:5244/dav` becomes `http://host:5244/d`.
/// Only the URL path is rewritten, so a host named `dav...` is left alone.
pub fn rewrite_base(address: &str, dav_segment: &str, direct_segment: &str) -> String {
    let rewritten = if dav_segment.is_empty() {
        address.to_string()
    } else {
        match Url::parse(address) {
            Ok(mut url) => {
                let path = url.path().replacen(dav_segment, direct_segment, 1);
                url.set_path(&path);
                url.to_string()
            }
            Err(_) => address.replacen(dav_segment, direct_segment, 1),
        }
    };
    rewritten.trim_end_matches('/').to_string()
}

/// URL written into a pointer file
pub fn pointer_url(pointer_base: &str, remote_file_path: &str) -> String {
    format!(
        "{}/{}",
        pointer_base.trim_end_matches('/'),
        remote_file_path.trim_start_matches('/')
    )
}

/// Name of the pointer file for a remote file name
pub fn pointer_file_name(file_name: &str) -> String {
    format!("{}{}", crate::classify::stem(file_name), POINTER_EXTENSION)
}

/// Local directory mirroring a remote directory
///
/// `.`/`..` and empty components coming from the server are dropped, so
/// nothing is ever written outside `local_root`.
pub fn local_dir_for(local_root: &Path, remote_dir: &str) -> PathBuf {
    let mut dir = local_root.to_path_buf();
    for part in Path::new(remote_dir).components() {
        if let Component::Normal(name) = part {
            dir.push(name);
        }
    }
    dir
}

async fn ensure_dir(dir: &Path) -> Result<(), ActionError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|source| ActionError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
}

/// Write a pointer file; returns the path written
pub async fn write_pointer(
    pointer_base: &str,
    remote_file_path: &str,
    local_dir: &Path,
    local_file_name: &str,
) -> Result<PathBuf, ActionError> {
    ensure_dir(local_dir).await?;

    let path = local_dir.join(local_file_name);
    let url = pointer_url(pointer_base, remote_file_path);

    let mut file = File::create(&path)
        .await
        .map_err(|source| ActionError::CreateFile {
            path: path.clone(),
            source,
        })?;

    let written = async {
        file.write_all(url.as_bytes()).await?;
        file.flush().await
    }
    .await;

    written.map_err(|source| ActionError::Write {
        path: path.clone(),
        source,
    })?;

    debug!(path = %path.display(), url = %url, "Wrote pointer");
    Ok(path)
}

/// Stream a remote file into `local_dir`; returns the number of bytes copied
///
/// A transfer that fails midway removes the partial local file.
pub async fn copy_file<R: RemoteFs + ?Sized>(
    remote: &R,
    remote_file_path: &str,
    local_dir: &Path,
) -> Result<u64, ActionError> {
    let mut reader = remote.open_read(remote_file_path).await?;

    ensure_dir(local_dir).await?;

    let path = local_dir.join(base_name(remote_file_path));
    let mut file = File::create(&path)
        .await
        .map_err(|source| ActionError::CreateFile {
            path: path.clone(),
            source,
        })?;

    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut copied: u64 = 0;

    let result = loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break Ok(copied),
            Ok(n) => n,
            Err(source) => {
                break Err(ActionError::Interrupted {
                    path: path.clone(),
                    copied,
                    source,
                })
            }
        };
        if let Err(source) = file.write_all(&buf[..n]).await {
            break Err(ActionError::Write {
                path: path.clone(),
                source,
            });
        }
        copied += n as u64;
    };

    let result = match (result, file.flush().await) {
        (Ok(_), Err(source)) => Err(ActionError::Write {
            path: path.clone(),
            source,
        }),
        (result, _) => result,
    };
    drop(file);

    if result.is_err() {
        if let Err(e) = fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove partial copy");
        }
    } else {
        debug!(path = %path.display(), bytes = copied, "Copied file");
    }

    result
}
