pub mod json_file_repository;

// Re-export the repository implementation
pub use json_file_repository::JsonFileRepository;
