use crate::entities::accounts::Column;
use crate::entities::prelude::*;
use crate::services::hash::{connection_secret, sha224_hex};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Bootstrap account, rotated with `hy2-admin reset`.
const BOOTSTRAP_USERNAME: &str = "admin";
const BOOTSTRAP_PASSWORD: &str = "admin";

/// 9999-12-31T23:59:59Z in unix milliseconds
const NEVER_EXPIRES_MS: i64 = 253_402_300_799_000;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Accounts)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        let now = chrono::Utc::now().to_rfc3339();

        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(Accounts)
            .columns([
                Column::Id,
                Column::Username,
                Column::PasswordHash,
                Column::ConnectionSecret,
                Column::Quota,
                Column::Upload,
                Column::Download,
                Column::ExpireAt,
                Column::CreatedAt,
                Column::UpdatedAt,
            ])
            .values_panic([
                1_i64.into(),
                BOOTSTRAP_USERNAME.into(),
                sha224_hex(BOOTSTRAP_PASSWORD).into(),
                connection_secret(BOOTSTRAP_USERNAME, BOOTSTRAP_PASSWORD).into(),
                (-1_i64).into(),
                0_i64.into(),
                0_i64.into(),
                NEVER_EXPIRES_MS.into(),
                now.clone().into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Accounts).to_owned())
            .await?;

        Ok(())
    }
}
