//! `MailDispatcher` implementations.

pub mod log;
pub mod sendgrid;
pub mod smtp;

pub use log::LogMailer;
pub use sendgrid::SendGridMailer;
pub use smtp::SmtpMailer;
