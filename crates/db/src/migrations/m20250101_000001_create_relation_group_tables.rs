//! Create `relation_group` and `relation_group_member` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RelationGroup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RelationGroup::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RelationGroup::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(RelationGroup::GroupType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RelationGroup::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(RelationGroup::Description).text().not_null())
                    .col(ColumnDef::new(RelationGroup::ModeratorNotes).text())
                    .col(
                        ColumnDef::new(RelationGroup::OwnerUserId)
                            .big_integer()
                            .not_null(),
                    )
                    // Games live in the game service's own tables.
                    .col(ColumnDef::new(RelationGroup::GameId).big_integer())
                    .col(ColumnDef::new(RelationGroup::OwnerCountryId).integer())
                    .col(
                        ColumnDef::new(RelationGroup::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RelationGroup::ChangedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_relation_group_owner_user_id")
                    .table(RelationGroup::Table)
                    .col(RelationGroup::OwnerUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_relation_group_game_id")
                    .table(RelationGroup::Table)
                    .col(RelationGroup::GameId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RelationGroupMember::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RelationGroupMember::GroupId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RelationGroupMember::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RelationGroupMember::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(RelationGroupMember::UserWeighting)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RelationGroupMember::OwnerWeighting)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RelationGroupMember::ModWeighting)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(RelationGroupMember::ModUserId).big_integer())
                    .col(ColumnDef::new(RelationGroupMember::CountryId).integer())
                    .col(
                        ColumnDef::new(RelationGroupMember::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RelationGroupMember::ChangedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // The upsert relies on this key.
                    .primary_key(
                        Index::create()
                            .name("pk_relation_group_member")
                            .col(RelationGroupMember::GroupId)
                            .col(RelationGroupMember::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_relation_group_member_group")
                            .from(RelationGroupMember::Table, RelationGroupMember::GroupId)
                            .to(RelationGroup::Table, RelationGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_relation_group_member_user_id")
                    .table(RelationGroupMember::Table)
                    .col(RelationGroupMember::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RelationGroupMember::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RelationGroup::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RelationGroup {
    Table,
    Id,
    Name,
    GroupType,
    IsActive,
    Description,
    ModeratorNotes,
    OwnerUserId,
    GameId,
    OwnerCountryId,
    CreatedAt,
    ChangedAt,
}

#[derive(Iden)]
enum RelationGroupMember {
    Table,
    GroupId,
    UserId,
    IsActive,
    UserWeighting,
    OwnerWeighting,
    ModWeighting,
    ModUserId,
    CountryId,
    CreatedAt,
    ChangedAt,
}
