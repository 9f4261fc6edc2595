pub mod json_repo;
