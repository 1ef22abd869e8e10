pub mod credentials;
pub mod database;
pub mod firebase;
pub mod push;
