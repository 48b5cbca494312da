mod atomic_file;
pub mod credential_document;

pub use atomic_file::{AtomicFile, AtomicFileError, FileFormat};
