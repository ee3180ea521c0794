mod mail;

pub use mail::Mailer;
