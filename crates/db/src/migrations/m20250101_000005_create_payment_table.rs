//! Create payment table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payment::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Payment::EnrollmentId).string_len(32).not_null())
                    .col(ColumnDef::new(Payment::StudentId).string_len(32).not_null())
                    .col(ColumnDef::new(Payment::Kind).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Payment::Amount)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Payment::Amount).gt(0)),
                    )
                    .col(
                        ColumnDef::new(Payment::Method)
                            .string_len(16)
                            .not_null()
                            .default("TRANSFER"),
                    )
                    .col(
                        ColumnDef::new(Payment::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Payment::Notes).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Payment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Payment::ReviewedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_enrollment")
                            .from(Payment::Table, Payment::EnrollmentId)
                            .to(Enrollment::Table, Enrollment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_student")
                            .from(Payment::Table, Payment::StudentId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: enrollment_id (status lookup)
        manager
            .create_index(
                Index::create()
                    .name("idx_payment_enrollment_id")
                    .table(Payment::Table)
                    .col(Payment::EnrollmentId)
                    .to_owned(),
            )
            .await?;

        // Index: status (admin review queue)
        manager
            .create_index(
                Index::create()
                    .name("idx_payment_status")
                    .table(Payment::Table)
                    .col(Payment::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Payment {
    Table,
    Id,
    EnrollmentId,
    StudentId,
    Kind,
    Amount,
    Method,
    Status,
    Notes,
    CreatedAt,
    ReviewedAt,
}

#[derive(Iden)]
enum Enrollment {
    Table,
    Id,
}

#[derive(Iden)]
enum Student {
    Table,
    Id,
}
