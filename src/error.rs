#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{failed} of {total} persistence batches failed")]
    PersistFailed { failed: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, LoaderError>;
