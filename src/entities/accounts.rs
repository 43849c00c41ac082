use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique)]
    pub username: String,

    /// SHA-224 hex of the login password
    pub password_hash: String,

    /// `username.secret`, presented by proxy clients
    #[sea_orm(unique)]
    pub connection_secret: String,

    /// Traffic quota in bytes, -1 for unlimited
    pub quota: i64,

    pub upload: i64,

    pub download: i64,

    /// Unix milliseconds
    pub expire_at: i64,

    /// Unix milliseconds of the last successful proxy authentication
    pub last_connected_at: Option<i64>,

    /// Unix milliseconds before which proxy authentication is refused
    pub denied_until: Option<i64>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
