use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Unique login name, an email address.
    #[sea_orm(unique)]
    pub username: String,

    /// Argon2id password hash; empty until a pending signup is activated.
    pub password_hash: String,

    /// "normal" or "administrator"
    pub role: String,

    pub enabled: bool,

    /// Opaque code mailed out on signup, cleared on activation.
    pub activation_code: Option<String>,

    /// Opaque code mailed out on password reset, cleared on completion.
    pub reset_code: Option<String>,

    pub activated_at: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
