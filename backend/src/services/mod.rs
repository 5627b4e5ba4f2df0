pub mod trash;
