//! Create program table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Program::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Program::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Program::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Program::Description).text())
                    .col(
                        ColumnDef::new(Program::RegistrationFee)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Program::RegistrationFee).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Program::BookFee)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Program::BookFee).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Program::MonthlyFee)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Program::MonthlyFee).gte(0)),
                    )
                    .col(ColumnDef::new(Program::Capacity).integer())
                    .col(ColumnDef::new(Program::IsActive).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(Program::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Program::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Index: is_active (public catalog)
        manager
            .create_index(
                Index::create()
                    .name("idx_program_is_active")
                    .table(Program::Table)
                    .col(Program::IsActive)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Program::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Program {
    Table,
    Id,
    Title,
    Description,
    RegistrationFee,
    BookFee,
    MonthlyFee,
    Capacity,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
