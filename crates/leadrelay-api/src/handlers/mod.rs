pub mod health;
pub mod lead;
