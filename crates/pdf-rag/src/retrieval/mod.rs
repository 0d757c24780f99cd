//! Query-time retrieval of the most similar chunks

mod retriever;

pub use retriever::Retriever;
