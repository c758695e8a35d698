pub mod chat;
pub mod panels;
pub mod plot;
pub mod table;
