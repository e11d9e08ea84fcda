//! Staging identifiers and remote path resolution.

use tracing::warn;
use uuid::Uuid;

const PATH_SEPARATOR: char = '\\';

/// Source of staging identifiers.
pub trait StagingIds {
    /// Returns a fresh identifier for one run.
    fn next_id(&self) -> Uuid;
}

/// Random (v4) identifiers.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIds;

impl StagingIds for RandomIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Where one run's script lives, both relative to the share (for
/// `smbclient`) and as absolute Windows paths (for `winexe`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StagingHandle {
    /// Identifier naming the temporary directory.
    pub id: Uuid,
    /// Share the script is staged on.
    pub share: String,
    /// Staging directory relative to the share root.
    pub share_directory: String,
    /// Script path relative to the share root.
    pub share_file: String,
    /// Absolute staging directory on the remote host.
    pub remote_directory: String,
    /// Absolute script path on the remote host.
    pub remote_file: String,
}

impl StagingHandle {
    /// Resolves paths for `file_name` staged under `id` on `share`.
    ///
    /// `fallback_root` is used when `share` is not a `<letter>$`
    /// administrative share.
    #[must_use]
    pub fn new(id: Uuid, share: &str, file_name: &str, fallback_root: &str) -> Self {
        let share_directory = id.to_string();
        let share_file = format!("{share_directory}{PATH_SEPARATOR}{file_name}");
        let root = drive_root(share, fallback_root);
        Self {
            id,
            share: share.to_owned(),
            remote_directory: format!("{root}{share_directory}"),
            remote_file: format!("{root}{share_file}"),
            share_directory,
            share_file,
        }
    }
}

/// Maps an administrative share (`D$`) to its drive root (`D:\`). Other
/// shares resolve to `fallback_root`, normalised to end in a separator.
#[must_use]
pub fn drive_root(share: &str, fallback_root: &str) -> String {
    let mut chars = share.chars();
    if let (Some(letter), Some('$'), None) = (chars.next(), chars.next(), chars.next())
        && letter.is_ascii_alphabetic()
    {
        return format!("{}:{PATH_SEPARATOR}", letter.to_ascii_uppercase());
    }

    let mut root = fallback_root.trim().to_owned();
    if !root.ends_with(PATH_SEPARATOR) {
        root.push(PATH_SEPARATOR);
    }
    warn!(share, root = %root, "share is not a drive share; assuming configured root");
    root
}
