pub mod change;
pub mod notification;
pub mod user;
