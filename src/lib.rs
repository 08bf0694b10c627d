pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod model;

pub use api::SwapiClient;
pub use db::Database;
pub use error::LoaderError;
pub use error::Result;
pub use ingest::IngestReport;
pub use ingest::Ingestor;
pub use ingest::id_windows;
pub use model::Person;
