//! Lease rows backing the per-account distributed lock.
//!
//! One row per held key. A row whose `expires_at_ms` lies in the past is
//! free to be claimed by the next owner.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccountLocks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccountLocks::LockKey)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccountLocks::OwnerToken).string_len(36).not_null())
                    .col(ColumnDef::new(AccountLocks::ExpiresAtMs).big_integer().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccountLocks::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AccountLocks {
    Table,
    LockKey,
    OwnerToken,
    ExpiresAtMs,
}
