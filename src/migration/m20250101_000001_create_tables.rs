use sea_orm::Schema;
use sea_orm_migration::prelude::*;

use crate::entity::{CartItems, Carts, OrderItems, Orders, Products, cart_items};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        // Parents before children so the foreign keys resolve.
        manager
            .create_table(schema.create_table_from_entity(Products).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(Carts).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(CartItems).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(Orders).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(OrderItems).if_not_exists().to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cart_items_cart_product")
                    .table(CartItems)
                    .col(cart_items::Column::CartId)
                    .col(cart_items::Column::ProductId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderItems).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CartItems).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Carts).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products).if_exists().to_owned())
            .await
    }
}
