pub use super::activities::Entity as Activities;
pub use super::settings::Entity as Settings;
pub use super::users::Entity as Users;
