//! On-disk embedding index: the vector file and manifest format, and the
//! repository that reads and writes them.

pub mod codec;
pub mod file_repository;

pub use codec::{MANIFEST_FILE, Manifest, VECTORS_FILE};
pub use file_repository::FileIndexRepository;
