pub mod accounts;
pub mod catalog;
pub mod order_repository;

pub use order_repository::RepoError;
