pub mod cli;
pub mod error;
pub mod fonkodo;
pub mod otp;
pub mod sms;
pub mod token;
pub mod users;
