use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Chunker error: {0}")]
    Chunker(#[from] docchat_chunker::ChunkerError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] docchat_vector_store::VectorStoreError),

    #[error("Generator error: {0}")]
    Generator(#[from] docchat_generator::GeneratorError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
