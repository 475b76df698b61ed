//! Local archive reconciliation: the JSON index on one side, the user's
//! download folder on the other, joined by generation id.

mod index;
mod scan;
mod session;

pub use index::{
    canonical_page_url, load_index, normalize_index, parse_index, IndexRecord, NormalizedIndex,
};
pub use scan::{
    archive_files, scan_archive, scan_archive_blocking, ArchiveEntry, ArchiveScan, ScanError,
};
pub use session::{GallerySession, RecordView};
