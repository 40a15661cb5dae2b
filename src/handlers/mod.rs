pub mod mint;
pub mod ticket;
