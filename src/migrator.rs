use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_master_tables::Migration),
            Box::new(m20240301_000002_create_locations_table::Migration),
            Box::new(m20240301_000003_create_ledger_tables::Migration),
            Box::new(m20240301_000004_create_outbound_tables::Migration),
            Box::new(m20240301_000005_create_receiving_tables::Migration),
            Box::new(m20240301_000006_create_putaway_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_master_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_master_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Zone, category and sku masters are owned elsewhere; the shapes mirror what we read
            manager
                .create_table(
                    Table::create()
                        .table(Zones::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Zones::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Zones::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Zones::Code).string_len(64).not_null())
                        .col(ColumnDef::new(Zones::Name).string().not_null())
                        .col(
                            ColumnDef::new(Zones::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Zones::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_zones_warehouse_code")
                        .table(Zones::Table)
                        .col(Zones::WarehouseId)
                        .col(Zones::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Categories::Code)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(
                            ColumnDef::new(Categories::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Skus::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Skus::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Skus::Code)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Skus::Name).string().not_null())
                        .col(ColumnDef::new(Skus::CategoryId).uuid().null())
                        .col(
                            ColumnDef::new(Skus::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Skus::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Zones::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Zones {
        Table,
        Id,
        WarehouseId,
        Code,
        Name,
        Active,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
        Code,
        Name,
        Active,
    }

    #[derive(DeriveIden)]
    enum Skus {
        Table,
        Id,
        Code,
        Name,
        CategoryId,
        Active,
    }
}

mod m20240301_000002_create_locations_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_locations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Locations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Locations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Locations::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Locations::ZoneId).uuid().not_null())
                        .col(ColumnDef::new(Locations::Code).string_len(64).not_null())
                        .col(
                            ColumnDef::new(Locations::LocationType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Locations::ParentId).uuid().null())
                        .col(
                            ColumnDef::new(Locations::MaxWeightKg)
                                .decimal_len(14, 3)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Locations::MaxVolumeM3)
                                .decimal_len(14, 3)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Locations::IsPickingFace)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Locations::IsStaging)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Locations::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Locations::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Locations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Locations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Locations::DeactivatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Codes are unique within a zone
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_locations_zone_code")
                        .table(Locations::Table)
                        .col(Locations::ZoneId)
                        .col(Locations::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_locations_parent_id")
                        .table(Locations::Table)
                        .col(Locations::ParentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_locations_warehouse_type")
                        .table(Locations::Table)
                        .col(Locations::WarehouseId)
                        .col(Locations::LocationType)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Locations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Locations {
        Table,
        Id,
        WarehouseId,
        ZoneId,
        Code,
        LocationType,
        ParentId,
        MaxWeightKg,
        MaxVolumeM3,
        IsPickingFace,
        IsStaging,
        Active,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        DeactivatedAt,
    }
}

mod m20240301_000003_create_ledger_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_ledger_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryLots::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryLots::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryLots::SkuId).uuid().not_null())
                        .col(
                            ColumnDef::new(InventoryLots::LotNumber)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryLots::ManufacturedOn).date().null())
                        .col(ColumnDef::new(InventoryLots::ExpiresOn).date().null())
                        .col(ColumnDef::new(InventoryLots::ReceivingOrderId).uuid().null())
                        .col(
                            ColumnDef::new(InventoryLots::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_inventory_lots_sku_lot_number")
                        .table(InventoryLots::Table)
                        .col(InventoryLots::SkuId)
                        .col(InventoryLots::LotNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventorySnapshot::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventorySnapshot::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventorySnapshot::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(InventorySnapshot::SkuId).uuid().not_null())
                        .col(ColumnDef::new(InventorySnapshot::LotId).uuid().null())
                        .col(ColumnDef::new(InventorySnapshot::LotKey).uuid().not_null())
                        .col(ColumnDef::new(InventorySnapshot::LocationId).uuid().not_null())
                        .col(
                            ColumnDef::new(InventorySnapshot::Quantity)
                                .big_integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(InventorySnapshot::Quantity).gte(0)),
                        )
                        .col(
                            ColumnDef::new(InventorySnapshot::ReservedQty)
                                .big_integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(InventorySnapshot::ReservedQty).gte(0)),
                        )
                        .col(
                            ColumnDef::new(InventorySnapshot::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Conflict target for the ledger upsert
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_inventory_snapshot_cell")
                        .table(InventorySnapshot::Table)
                        .col(InventorySnapshot::WarehouseId)
                        .col(InventorySnapshot::SkuId)
                        .col(InventorySnapshot::LotKey)
                        .col(InventorySnapshot::LocationId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_snapshot_location")
                        .table(InventorySnapshot::Table)
                        .col(InventorySnapshot::LocationId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryTransactions::SkuId).uuid().not_null())
                        .col(ColumnDef::new(InventoryTransactions::LotId).uuid().null())
                        .col(
                            ColumnDef::new(InventoryTransactions::LocationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::Quantity)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::TxnType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::ReferenceTable)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::ReferenceId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::CreatedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_transactions_reference")
                        .table(InventoryTransactions::Table)
                        .col(InventoryTransactions::ReferenceTable)
                        .col(InventoryTransactions::ReferenceId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Reservations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Reservations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Reservations::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Reservations::SkuId).uuid().not_null())
                        .col(
                            ColumnDef::new(Reservations::AnchorLocationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Reservations::Quantity).big_integer().not_null())
                        .col(
                            ColumnDef::new(Reservations::ReferenceTable)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Reservations::ReferenceId).uuid().not_null())
                        .col(ColumnDef::new(Reservations::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Reservations::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Reservations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reservations::ReleasedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reservations_reference")
                        .table(Reservations::Table)
                        .col(Reservations::ReferenceTable)
                        .col(Reservations::ReferenceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Reservations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryTransactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventorySnapshot::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryLots::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryLots {
        Table,
        Id,
        SkuId,
        LotNumber,
        ManufacturedOn,
        ExpiresOn,
        ReceivingOrderId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum InventorySnapshot {
        Table,
        Id,
        WarehouseId,
        SkuId,
        LotId,
        LotKey,
        LocationId,
        Quantity,
        ReservedQty,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum InventoryTransactions {
        Table,
        Id,
        WarehouseId,
        SkuId,
        LotId,
        LocationId,
        Quantity,
        TxnType,
        ReferenceTable,
        ReferenceId,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Reservations {
        Table,
        Id,
        WarehouseId,
        SkuId,
        AnchorLocationId,
        Quantity,
        ReferenceTable,
        ReferenceId,
        Status,
        CreatedBy,
        CreatedAt,
        ReleasedAt,
    }
}

mod m20240301_000004_create_outbound_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_outbound_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SalesOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesOrders::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(SalesOrders::Code).string_len(32).not_null())
                        .col(ColumnDef::new(SalesOrders::Status).string_len(32).not_null())
                        .col(ColumnDef::new(SalesOrders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(SalesOrders::DeliveryDate).date().not_null())
                        .col(ColumnDef::new(SalesOrders::Notes).text().null())
                        .col(ColumnDef::new(SalesOrders::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(SalesOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(SalesOrders::SubmittedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(SalesOrders::ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(SalesOrders::ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(SalesOrders::RejectionCode).string_len(32).null())
                        .col(ColumnDef::new(SalesOrders::RejectionReason).text().null())
                        .col(
                            ColumnDef::new(SalesOrders::CancelledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_orders_warehouse_created")
                        .table(SalesOrders::Table)
                        .col(SalesOrders::WarehouseId)
                        .col(SalesOrders::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_sales_orders_warehouse_code")
                        .table(SalesOrders::Table)
                        .col(SalesOrders::WarehouseId)
                        .col(SalesOrders::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SalesOrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesOrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesOrderItems::SalesOrderId).uuid().not_null())
                        .col(ColumnDef::new(SalesOrderItems::LineNo).integer().not_null())
                        .col(ColumnDef::new(SalesOrderItems::SkuId).uuid().not_null())
                        .col(
                            ColumnDef::new(SalesOrderItems::Quantity)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesOrderItems::Note).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sales_order_items_order")
                                .from(SalesOrderItems::Table, SalesOrderItems::SalesOrderId)
                                .to(SalesOrders::Table, SalesOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Transfers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Transfers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Transfers::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Transfers::Code).string_len(32).not_null())
                        .col(ColumnDef::new(Transfers::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Transfers::DestinationWarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transfers::TransferDate).date().not_null())
                        .col(ColumnDef::new(Transfers::ReceiverName).string().not_null())
                        .col(ColumnDef::new(Transfers::ReceiverPhone).string_len(32).null())
                        .col(ColumnDef::new(Transfers::Notes).text().null())
                        .col(ColumnDef::new(Transfers::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Transfers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transfers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Transfers::SubmittedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Transfers::ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(Transfers::ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Transfers::CancelledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfers_warehouse_created")
                        .table(Transfers::Table)
                        .col(Transfers::WarehouseId)
                        .col(Transfers::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_transfers_warehouse_code")
                        .table(Transfers::Table)
                        .col(Transfers::WarehouseId)
                        .col(Transfers::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransferItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransferItems::TransferId).uuid().not_null())
                        .col(ColumnDef::new(TransferItems::LineNo).integer().not_null())
                        .col(ColumnDef::new(TransferItems::SkuId).uuid().not_null())
                        .col(ColumnDef::new(TransferItems::Quantity).big_integer().not_null())
                        .col(ColumnDef::new(TransferItems::Note).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transfer_items_transfer")
                                .from(TransferItems::Table, TransferItems::TransferId)
                                .to(Transfers::Table, Transfers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransferItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Transfers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SalesOrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SalesOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SalesOrders {
        Table,
        Id,
        WarehouseId,
        Code,
        Status,
        CustomerId,
        DeliveryDate,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        SubmittedAt,
        ApprovedBy,
        ApprovedAt,
        RejectionCode,
        RejectionReason,
        CancelledAt,
    }

    #[derive(DeriveIden)]
    enum SalesOrderItems {
        Table,
        Id,
        SalesOrderId,
        LineNo,
        SkuId,
        Quantity,
        Note,
    }

    #[derive(DeriveIden)]
    enum Transfers {
        Table,
        Id,
        WarehouseId,
        Code,
        Status,
        DestinationWarehouseId,
        TransferDate,
        ReceiverName,
        ReceiverPhone,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        SubmittedAt,
        ApprovedBy,
        ApprovedAt,
        CancelledAt,
    }

    #[derive(DeriveIden)]
    enum TransferItems {
        Table,
        Id,
        TransferId,
        LineNo,
        SkuId,
        Quantity,
        Note,
    }
}

mod m20240301_000005_create_receiving_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_receiving_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ReceivingOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReceivingOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReceivingOrders::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(ReceivingOrders::Code).string_len(32).not_null())
                        .col(
                            ColumnDef::new(ReceivingOrders::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceivingOrders::SourceType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReceivingOrders::Notes).text().null())
                        .col(ColumnDef::new(ReceivingOrders::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(ReceivingOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceivingOrders::SubmittedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ReceivingOrders::ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(ReceivingOrders::ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ReceivingOrders::PostedBy).uuid().null())
                        .col(
                            ColumnDef::new(ReceivingOrders::PostedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_receiving_orders_warehouse_code")
                        .table(ReceivingOrders::Table)
                        .col(ReceivingOrders::WarehouseId)
                        .col(ReceivingOrders::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ReceivingItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReceivingItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceivingItems::ReceivingOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReceivingItems::LineNo).integer().not_null())
                        .col(ColumnDef::new(ReceivingItems::SkuId).uuid().not_null())
                        .col(
                            ColumnDef::new(ReceivingItems::ReceivedQty)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReceivingItems::LotNumber).string_len(64).null())
                        .col(ColumnDef::new(ReceivingItems::ManufacturedOn).date().null())
                        .col(ColumnDef::new(ReceivingItems::ExpiresOn).date().null())
                        .col(ColumnDef::new(ReceivingItems::LotId).uuid().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_receiving_items_order")
                                .from(ReceivingItems::Table, ReceivingItems::ReceivingOrderId)
                                .to(ReceivingOrders::Table, ReceivingOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReceivingItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ReceivingOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ReceivingOrders {
        Table,
        Id,
        WarehouseId,
        Code,
        Status,
        SourceType,
        Notes,
        CreatedBy,
        CreatedAt,
        SubmittedAt,
        ApprovedBy,
        ApprovedAt,
        PostedBy,
        PostedAt,
    }

    #[derive(DeriveIden)]
    enum ReceivingItems {
        Table,
        Id,
        ReceivingOrderId,
        LineNo,
        SkuId,
        ReceivedQty,
        LotNumber,
        ManufacturedOn,
        ExpiresOn,
        LotId,
    }
}

mod m20240301_000006_create_putaway_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_putaway_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PutawayTasks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PutawayTasks::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PutawayTasks::WarehouseId).uuid().not_null())
                        .col(
                            ColumnDef::new(PutawayTasks::ReceivingOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PutawayTasks::FromLocationId).uuid().not_null())
                        .col(ColumnDef::new(PutawayTasks::Status).string_len(16).not_null())
                        .col(ColumnDef::new(PutawayTasks::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(PutawayTasks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PutawayTasks::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PutawayTasks::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_putaway_tasks_warehouse_status")
                        .table(PutawayTasks::Table)
                        .col(PutawayTasks::WarehouseId)
                        .col(PutawayTasks::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PutawayTaskItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PutawayTaskItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PutawayTaskItems::TaskId).uuid().not_null())
                        .col(ColumnDef::new(PutawayTaskItems::ReceivingItemId).uuid().null())
                        .col(ColumnDef::new(PutawayTaskItems::SkuId).uuid().not_null())
                        .col(ColumnDef::new(PutawayTaskItems::LotId).uuid().null())
                        .col(
                            ColumnDef::new(PutawayTaskItems::Quantity)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PutawayTaskItems::PutawayQty)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PutawayTaskItems::SuggestedLocationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PutawayTaskItems::ActualLocationId).uuid().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_putaway_task_items_task")
                                .from(PutawayTaskItems::Table, PutawayTaskItems::TaskId)
                                .to(PutawayTasks::Table, PutawayTasks::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PutawayTaskItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PutawayTasks::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PutawayTasks {
        Table,
        Id,
        WarehouseId,
        ReceivingOrderId,
        FromLocationId,
        Status,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        CompletedAt,
    }

    #[derive(DeriveIden)]
    enum PutawayTaskItems {
        Table,
        Id,
        TaskId,
        ReceivingItemId,
        SkuId,
        LotId,
        Quantity,
        PutawayQty,
        SuggestedLocationId,
        ActualLocationId,
    }
}
