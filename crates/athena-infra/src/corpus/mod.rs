pub mod directory;

pub use directory::DirectoryCorpus;
