pub mod health;
pub mod plant;
pub mod search;
