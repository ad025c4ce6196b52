pub mod diff;

mod business;
mod mailing_address;
mod message;
mod notify;
mod payment;
mod profile;
mod request;
mod signup;

pub use business::*;
pub use mailing_address::*;
pub use message::*;
pub use notify::*;
pub use payment::*;
pub use profile::*;
pub use request::*;
pub use signup::*;
