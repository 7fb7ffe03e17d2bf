pub mod fastembed;

pub use self::fastembed::FastEmbedder;
