pub mod health;
pub use self::health::health;

pub mod otp;
pub use self::otp::otp;

pub mod login;
pub use self::login::login;

pub mod register;
pub use self::register::register;

pub mod user;
pub use self::user::user;

// common functions for the handlers
use regex::Regex;

pub fn valid_phone(phone: &str) -> bool {
    Regex::new(r"^\+?[0-9]{6,15}$").map_or(false, |re| re.is_match(phone))
}
