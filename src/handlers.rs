pub mod accounts;
pub mod admin;
pub mod auth;
pub mod health;
pub mod student;
pub mod students;
pub mod subjects;
pub mod teacher;
pub mod teachers;
