//! Shared building blocks for gensave: generation ids, filename rules,
//! the error taxonomy and the directory capability model.

pub mod access;
pub mod error;
pub mod genid;
pub mod sanitize;
pub mod sidecar;

pub use access::{ensure_read_access, AccessProbe, Capability, FsProbe, GrantedDir};
pub use error::{Error, Result};
pub use genid::{
    extract_gen_id, extract_gen_id_from_filename, is_sidecar_name, GenId, SIDECAR_SUFFIX,
};
pub use sanitize::{sanitize_for_filename, MAX_FILENAME_LEN};
pub use sidecar::{MediaKind, Sidecar};

/// File extensions recognised as downloaded media.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "mov", "m4v", "mkv", "png", "jpg", "jpeg", "webp", "gif", "avif",
];

/// Returns true when `ext` (without dot, any case) is a known media extension.
pub fn is_media_extension(ext: &str) -> bool {
    MEDIA_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}
