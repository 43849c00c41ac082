pub mod account;
pub mod release;
