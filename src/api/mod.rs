pub mod account;
pub mod feed;
pub mod login;
pub mod news;
