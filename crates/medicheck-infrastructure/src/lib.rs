pub mod config_service;
pub mod paths;
pub mod storage;
pub mod toml_consultation_repository;

pub use config_service::ConfigService;
pub use paths::MedicheckPaths;
pub use toml_consultation_repository::TomlConsultationRepository;
