pub mod monitored_address {
    use sea_orm::entity::prelude::*;

    /// Owned by the account system; this service only reads it.
    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "monitored_address")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub address: String,
        pub account_id: Option<i64>,
        pub active: bool,
    }

    #[derive(Debug, Clone, Copy, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod deposits {
    use sea_orm::entity::prelude::*;
    use sea_orm::sea_query::Expr;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "deposits")]
    pub struct Model {
        /// Primary key, so the database itself refuses a second credit.
        #[sea_orm(primary_key, auto_increment = false)]
        pub tx_hash: String,
        pub to_address: String,
        pub asset: String,
        pub amount: i64,
        pub confirmations: i32,
        #[sea_orm(default_expr = "Expr::current_timestamp()")]
        pub created_at: DateTimeUtc,
    }

    #[derive(Debug, Clone, Copy, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
