use sea_orm::entity::prelude::*;

/// Append-only audit trail of authentication-relevant events.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "security_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Null when the account is unknown at failure time.
    pub user_id: Option<i32>,

    pub action: String,

    pub success: bool,

    pub ip_address: String,

    pub user_agent: String,

    pub details: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
