// Application layer - use cases over the collaborator traits
pub mod aligner;
pub mod archive_repository;
pub mod retrieval_service;
