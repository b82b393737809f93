//! Configuration types for strm-mirror
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Remote-to-local path layout

use crate::classify::{Classifier, ExtensionSet};
use crate::error::ConfigError;
use crate::output::{local_dir_for, rewrite_base, DEFAULT_DAV_SEGMENT, DEFAULT_DIRECT_SEGMENT};
use crate::remote::normalize_path;
use clap::Parser;
use regex::Regex;
use std::path::PathBuf;
use url::Url;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 256;

/// Default worker pool size
pub const DEFAULT_WORKERS: usize = 10;

/// Default extensions written as pointer files
pub const DEFAULT_POINTER_EXTS: &str = ".mp4,.avi,.mkv,.flv";

/// Default extensions downloaded in full
pub const DEFAULT_COPY_EXTS: &str = ".jpg,.jpeg,.png,.gif,.nfo,.srt,.ass,.ssa";

/// Mirror a WebDAV tree into .strm pointer files and local copies
#[derive(Parser, Debug, Clone)]
#[command(
    name = "strm-mirror",
    version,
    about = "Mirror a WebDAV media tree into .strm pointer files and local copies",
    long_about = "Walks a WebDAV share (e.g. an AList server) and mirrors it locally.\n\n\
                  Files matching the pointer extensions become .strm files holding a direct\n\
                  link to the remote file; files matching the copy extensions are downloaded\n\
                  in full. Everything else is skipped.",
    after_help = "EXAMPLES:\n    \
        strm-mirror -a http://nas:5244/dav -u admin -p secret -r /movies -l ./library\n    \
        strm-mirror -a http://nas:5244/dav -r /tv -l ./tv -s .mkv,.mp4 -d .nfo,.jpg -w 4\n    \
        strm-mirror -a https://nas/dav -r /media --exclude '@eaDir' --strip-root"
)]
pub struct CliArgs {
    /// WebDAV base address
    #[arg(short = 'a', long, default_value = "http://localhost:5244/dav", value_name = "URL")]
    pub address: String,

    /// WebDAV user name
    #[arg(short = 'u', long, default_value = "admin", value_name = "USER")]
    pub user: String,

    /// WebDAV password
    #[arg(short = 'p', long, default_value = "", value_name = "PASSWORD", hide_default_value = true)]
    pub password: String,

    /// Remote directory to mirror
    #[arg(short = 'r', long, default_value = "/", value_name = "PATH")]
    pub remote_dir: String,

    /// Local output directory
    #[arg(short = 'l', long, default_value = ".", value_name = "DIR")]
    pub local_dir: PathBuf,

    /// Extensions downloaded in full (comma separated)
    #[arg(short = 'd', long, default_value = DEFAULT_COPY_EXTS, value_name = "EXTS")]
    pub download_exts: String,

    /// Extensions written as .strm pointer files (comma separated)
    #[arg(short = 's', long, default_value = DEFAULT_POINTER_EXTS, value_name = "EXTS")]
    pub strm_exts: String,

    /// Number of concurrent workers
    #[arg(short = 'w', long, default_value_t = DEFAULT_WORKERS, value_name = "NUM")]
    pub workers: usize,

    /// Maximum directory depth below the remote root (unlimited if not set)
    #[arg(long, value_name = "NUM")]
    pub max_depth: Option<usize>,

    /// Exclude remote paths matching pattern (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Match file extensions case-insensitively
    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    /// Lay out local files relative to the remote directory instead of the share root
    #[arg(long)]
    pub strip_root: bool,

    /// Path segment of the WebDAV endpoint, rewritten in pointer URLs
    #[arg(long, default_value = DEFAULT_DAV_SEGMENT, value_name = "SEGMENT")]
    pub dav_segment: String,

    /// Path segment serving direct links
    #[arg(long, default_value = DEFAULT_DIRECT_SEGMENT, value_name = "SEGMENT")]
    pub direct_segment: String,

    /// Connection timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    pub timeout: u64,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (per-file logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Validated runtime configuration, immutable for the duration of a run
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// WebDAV base address
    pub address: String,

    /// Basic auth user
    pub user: String,

    /// Basic auth password
    pub password: String,

    /// Normalized remote root (leading slash, no trailing slash)
    pub remote_root: String,

    /// Local output root
    pub local_root: PathBuf,

    /// Extension classifier
    pub classifier: Classifier,

    /// Base URL written into pointer files
    pub pointer_base: String,

    /// Worker pool size
    pub worker_count: usize,

    /// Maximum traversal depth
    pub max_depth: Option<usize>,

    /// Compiled exclude patterns
    pub exclude_patterns: Vec<Regex>,

    /// Map paths relative to the remote root
    pub strip_root: bool,

    /// Connection timeout (seconds)
    pub timeout_secs: u64,

    /// Show progress indicator
    pub show_progress: bool,
}

impl MirrorConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let url = Url::parse(args.address.trim()).map_err(|e| ConfigError::InvalidAddress {
            url: args.address.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidAddress {
                url: args.address.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        let pointer = ExtensionSet::parse_list(&args.strm_exts);
        let copy = ExtensionSet::parse_list(&args.download_exts);
        if pointer.is_empty() && copy.is_empty() {
            return Err(ConfigError::NoExtensions);
        }

        let exclude_patterns = args
            .exclude_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidExcludePattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if args.local_dir.exists() && !args.local_dir.is_dir() {
            return Err(ConfigError::InvalidLocalRoot {
                path: args.local_dir.clone(),
                reason: "exists and is not a directory".to_string(),
            });
        }

        let address = args.address.trim().to_string();
        let pointer_base = rewrite_base(&address, &args.dav_segment, &args.direct_segment);

        Ok(Self {
            address,
            user: args.user,
            password: args.password,
            remote_root: normalize_path(args.remote_dir.trim()),
            local_root: args.local_dir,
            classifier: Classifier::new(pointer, copy).ignore_case(args.ignore_case),
            pointer_base,
            worker_count: args.workers,
            max_depth: args.max_depth,
            exclude_patterns,
            strip_root: args.strip_root,
            timeout_secs: args.timeout,
            show_progress: !args.quiet,
        })
    }

    /// Minimal configuration for programmatic use
    ///
    /// Defaults: 10 workers, no depth limit, no excludes, `/dav` → `/d`.
    pub fn new(
        address: impl Into<String>,
        remote_root: &str,
        local_root: impl Into<PathBuf>,
        classifier: Classifier,
    ) -> Self {
        let address = address.into();
        let pointer_base = rewrite_base(&address, DEFAULT_DAV_SEGMENT, DEFAULT_DIRECT_SEGMENT);
        Self {
            address,
            user: String::new(),
            password: String::new(),
            remote_root: normalize_path(remote_root.trim()),
            local_root: local_root.into(),
            classifier,
            pointer_base,
            worker_count: DEFAULT_WORKERS,
            max_depth: None,
            exclude_patterns: Vec::new(),
            strip_root: false,
            timeout_secs: 30,
            show_progress: false,
        }
    }

    /// Set the worker pool size
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.worker_count = workers.max(1);
        self
    }

    /// Local directory for a remote directory
    pub fn local_dir(&self, remote_dir: &str) -> PathBuf {
        local_dir_for(&self.local_root, self.layout_path(remote_dir))
    }

    /// Remote directory as it appears under the local root
    fn layout_path<'a>(&self, remote_dir: &'a str) -> &'a str {
        if !self.strip_root || self.remote_root == "/" {
            return remote_dir;
        }
        match remote_dir.strip_prefix(self.remote_root.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => remote_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::TraverseOptions;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["strm-mirror"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let config = MirrorConfig::from_args(args(&[])).unwrap();
        assert_eq!(config.worker_count, DEFAULT_WORKERS);
        assert_eq!(config.remote_root, "/");
        assert_eq!(config.pointer_base, "http://localhost:5244/d");
        assert!(config.classifier.pointer_exts().contains(".mkv"));
        assert!(config.classifier.copy_exts().contains(".nfo"));
        assert!(config.show_progress);
    }

    #[test]
    fn test_extension_normalization() {
        let config = MirrorConfig::from_args(args(&["-s", "MKV, mp4", "-d", ".NFO"])).unwrap();
        let pointer: Vec<&str> = config.classifier.pointer_exts().iter().collect();
        assert_eq!(pointer, vec![".mkv", ".mp4"]);
        assert!(config.classifier.copy_exts().contains(".nfo"));
    }

    #[test]
    fn test_invalid_worker_count() {
        assert!(matches!(
            MirrorConfig::from_args(args(&["-w", "0"])),
            Err(ConfigError::InvalidWorkerCount { .. })
        ));
        assert!(matches!(
            MirrorConfig::from_args(args(&["-w", "1000"])),
            Err(ConfigError::InvalidWorkerCount { .. })
        ));
    }

    #[test]
    fn test_no_extensions() {
        assert!(matches!(
            MirrorConfig::from_args(args(&["-s", "", "-d", ","])),
            Err(ConfigError::NoExtensions)
        ));
    }

    #[test]
    fn test_invalid_address() {
        assert!(matches!(
            MirrorConfig::from_args(args(&["-a", "localhost:5244"])),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_exclude_pattern() {
        let config = MirrorConfig::from_args(args(&["--exclude", r"@eaDir", "--exclude", r"\.part$"])).unwrap();
        let options = TraverseOptions::from_config(&config);
        assert!(options.is_excluded("/tv/@eaDir/thumb.jpg"));
        assert!(options.is_excluded("/tv/Show.mkv.part"));
        assert!(!options.is_excluded("/tv/Show.mkv"));

        assert!(matches!(
            MirrorConfig::from_args(args(&["--exclude", "("])),
            Err(ConfigError::InvalidExcludePattern { .. })
        ));
    }

    #[test]
    fn test_local_dir_layout() {
        let config = MirrorConfig::from_args(args(&["-r", "/movies/", "-l", "/out"])).unwrap();
        assert_eq!(config.remote_root, "/movies");
        assert_eq!(config.local_dir("/movies/2020"), PathBuf::from("/out/movies/2020"));

        let config = MirrorConfig::from_args(args(&["-r", "/movies", "-l", "/out", "--strip-root"])).unwrap();
        assert_eq!(config.local_dir("/movies/2020"), PathBuf::from("/out/2020"));
        assert_eq!(config.local_dir("/movies"), PathBuf::from("/out"));
        assert_eq!(config.local_dir("/moviesX/a"), PathBuf::from("/out/moviesX/a"));
    }

    #[test]
    fn test_remote_root_input_trimmed() {
        let config = MirrorConfig::from_args(args(&["-r", "  /tv/ "])).unwrap();
        assert_eq!(config.remote_root, "/tv");

        // Names below the root keep their whitespace
        assert_eq!(config.local_dir("/tv/Show "), PathBuf::from("./tv/Show "));
    }

    #[test]
    fn test_custom_segments() {
        let config = MirrorConfig::from_args(args(&[
            "-a",
            "https://nas/webdav",
            "--dav-segment",
            "/webdav",
            "--direct-segment",
            "/direct",
        ]))
        .unwrap();
        assert_eq!(config.pointer_base, "https://nas/direct");
    }
}
