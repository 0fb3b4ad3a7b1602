//! Create enrollment table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Enrollment::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Enrollment::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Enrollment::StudentId).string_len(32).not_null())
                    .col(ColumnDef::new(Enrollment::ProgramId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Enrollment::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Enrollment::EnrolledAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Enrollment::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollment_student")
                            .from(Enrollment::Table, Enrollment::StudentId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollment_program")
                            .from(Enrollment::Table, Enrollment::ProgramId)
                            .to(Program::Table, Program::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (program_id, status) for capacity counts and admin filters
        manager
            .create_index(
                Index::create()
                    .name("idx_enrollment_program_status")
                    .table(Enrollment::Table)
                    .col(Enrollment::ProgramId)
                    .col(Enrollment::Status)
                    .to_owned(),
            )
            .await?;

        // Index: student_id
        manager
            .create_index(
                Index::create()
                    .name("idx_enrollment_student_id")
                    .table(Enrollment::Table)
                    .col(Enrollment::StudentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Enrollment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Enrollment {
    Table,
    Id,
    StudentId,
    ProgramId,
    Status,
    EnrolledAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Student {
    Table,
    Id,
}

#[derive(Iden)]
enum Program {
    Table,
    Id,
}
