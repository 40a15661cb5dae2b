use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InvestmentTickets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvestmentTickets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InvestmentTickets::TransactionId)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(InvestmentTickets::InvestmentAmountFiat)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvestmentTickets::InvestmentAmountCrypto)
                            .decimal_len(25, 18)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvestmentTickets::InvestmentInfo)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InvestmentTickets::TransactionHash)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(InvestmentTickets::WalletAddress)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvestmentTickets::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookups come in by wallet for the activity panel
        manager
            .create_index(
                Index::create()
                    .name("idx_investment_tickets_wallet_address")
                    .table(InvestmentTickets::Table)
                    .col(InvestmentTickets::WalletAddress)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InvestmentTickets::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum InvestmentTickets {
    Table,
    Id,
    TransactionId,
    InvestmentAmountFiat,
    InvestmentAmountCrypto,
    InvestmentInfo,
    TransactionHash,
    WalletAddress,
    CreatedAt,
}
