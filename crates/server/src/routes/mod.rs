pub mod health;
pub mod statements;
