pub mod prelude;

pub mod activities;
pub mod settings;
pub mod users;
