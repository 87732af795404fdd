//! Shop schema vocabulary: tables, columns and the foreign keys joins follow.

/// How many rows a joined table contributes per parent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Exactly one row per parent; joining does not multiply rows.
    ToOne,
    /// Zero or more rows per parent; joining multiplies rows.
    ToMany,
}

/// A table in the shop schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Customers,
    Products,
    Shipments,
    Orders,
    LineItems,
}

impl Table {
    /// Returns the SQL table name.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Customers => "customers",
            Table::Products => "products",
            Table::Shipments => "shipments",
            Table::Orders => "orders",
            Table::LineItems => "line_items",
        }
    }

    /// Returns the alias used for this table in generated SQL.
    pub fn alias(&self) -> &'static str {
        match self {
            Table::Customers => "c",
            Table::Products => "p",
            Table::Shipments => "s",
            Table::Orders => "o",
            Table::LineItems => "li",
        }
    }

    /// Returns the primary key column.
    pub fn primary_key(&self) -> Column {
        match self {
            Table::Customers => Column::CustomerId,
            Table::Products => Column::ProductId,
            Table::Shipments => Column::ShipmentId,
            Table::Orders => Column::OrderId,
            Table::LineItems => Column::LineItemId,
        }
    }

    /// Returns every column of this table, in select order.
    pub fn columns(&self) -> &'static [Column] {
        match self {
            Table::Customers => &[
                Column::CustomerId,
                Column::CustomerName,
                Column::CustomerCity,
                Column::CustomerStreet,
                Column::CustomerZipcode,
            ],
            Table::Products => &[
                Column::ProductId,
                Column::ProductName,
                Column::ProductPrice,
                Column::ProductStock,
            ],
            Table::Shipments => &[
                Column::ShipmentId,
                Column::ShipmentCity,
                Column::ShipmentStreet,
                Column::ShipmentZipcode,
                Column::ShipmentStatus,
            ],
            Table::Orders => &[
                Column::OrderId,
                Column::OrderCustomerId,
                Column::OrderShipmentId,
                Column::OrderStatus,
                Column::OrderedAt,
            ],
            Table::LineItems => &[
                Column::LineItemId,
                Column::LineItemOrderId,
                Column::LineItemProductId,
                Column::LineItemUnitPrice,
                Column::LineItemQuantity,
            ],
        }
    }

    /// Returns the foreign key this table is joined on, as
    /// `(column of this table, column of the parent table)`.
    ///
    /// Customers, shipments and line items hang off orders; products hang off
    /// line items; orders can be joined back from line items.
    pub fn join_key(&self) -> (Column, Column) {
        match self {
            Table::Customers => (Column::CustomerId, Column::OrderCustomerId),
            Table::Shipments => (Column::ShipmentId, Column::OrderShipmentId),
            Table::LineItems => (Column::LineItemOrderId, Column::OrderId),
            Table::Products => (Column::ProductId, Column::LineItemProductId),
            Table::Orders => (Column::OrderId, Column::LineItemOrderId),
        }
    }

    /// Returns the table this one is joined to.
    pub fn join_parent(&self) -> Table {
        self.join_key().1.table()
    }

    /// Returns how many rows this table contributes per parent row when joined.
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Table::LineItems => Cardinality::ToMany,
            _ => Cardinality::ToOne,
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A column of the shop schema.
///
/// Every column has a unique select alias so rows from wide joins never
/// contain two columns with the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    CustomerId,
    CustomerName,
    CustomerCity,
    CustomerStreet,
    CustomerZipcode,

    ProductId,
    ProductName,
    ProductPrice,
    ProductStock,

    ShipmentId,
    ShipmentCity,
    ShipmentStreet,
    ShipmentZipcode,
    ShipmentStatus,

    OrderId,
    OrderCustomerId,
    OrderShipmentId,
    OrderStatus,
    OrderedAt,

    LineItemId,
    LineItemOrderId,
    LineItemProductId,
    LineItemUnitPrice,
    LineItemQuantity,
}

impl Column {
    /// Returns the table this column belongs to.
    pub fn table(&self) -> Table {
        use Column::*;
        match self {
            CustomerId | CustomerName | CustomerCity | CustomerStreet | CustomerZipcode => {
                Table::Customers
            }
            ProductId | ProductName | ProductPrice | ProductStock => Table::Products,
            ShipmentId | ShipmentCity | ShipmentStreet | ShipmentZipcode | ShipmentStatus => {
                Table::Shipments
            }
            OrderId | OrderCustomerId | OrderShipmentId | OrderStatus | OrderedAt => Table::Orders,
            LineItemId | LineItemOrderId | LineItemProductId | LineItemUnitPrice
            | LineItemQuantity => Table::LineItems,
        }
    }

    /// Returns the column name inside its table.
    pub fn name(&self) -> &'static str {
        use Column::*;
        match self {
            CustomerId | ProductId | ShipmentId | OrderId | LineItemId => "id",
            CustomerName | ProductName => "name",
            CustomerCity | ShipmentCity => "city",
            CustomerStreet | ShipmentStreet => "street",
            CustomerZipcode | ShipmentZipcode => "zipcode",
            ProductPrice => "price",
            ProductStock => "stock_quantity",
            ShipmentStatus | OrderStatus => "status",
            OrderCustomerId => "customer_id",
            OrderShipmentId => "shipment_id",
            OrderedAt => "ordered_at",
            LineItemOrderId => "order_id",
            LineItemProductId => "product_id",
            LineItemUnitPrice => "unit_price",
            LineItemQuantity => "quantity",
        }
    }

    /// Returns the alias the column is selected as.
    pub fn alias(&self) -> &'static str {
        use Column::*;
        match self {
            CustomerId => "customer_id",
            CustomerName => "customer_name",
            CustomerCity => "customer_city",
            CustomerStreet => "customer_street",
            CustomerZipcode => "customer_zipcode",
            ProductId => "product_id",
            ProductName => "product_name",
            ProductPrice => "product_price",
            ProductStock => "product_stock",
            ShipmentId => "shipment_id",
            ShipmentCity => "shipment_city",
            ShipmentStreet => "shipment_street",
            ShipmentZipcode => "shipment_zipcode",
            ShipmentStatus => "shipment_status",
            OrderId => "order_id",
            OrderCustomerId => "order_customer_id",
            OrderShipmentId => "order_shipment_id",
            OrderStatus => "order_status",
            OrderedAt => "ordered_at",
            LineItemId => "line_item_id",
            LineItemOrderId => "line_item_order_id",
            LineItemProductId => "line_item_product_id",
            LineItemUnitPrice => "unit_price",
            LineItemQuantity => "quantity",
        }
    }

    /// Returns the qualified SQL expression, e.g. `o.status`.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.table().alias(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const ALL_TABLES: [Table; 5] = [
        Table::Customers,
        Table::Products,
        Table::Shipments,
        Table::Orders,
        Table::LineItems,
    ];

    #[test]
    fn aliases_are_unique_across_schema() {
        let mut seen = HashSet::new();
        for table in ALL_TABLES {
            for column in table.columns() {
                assert!(seen.insert(column.alias()), "duplicate alias {}", column.alias());
            }
        }
    }

    #[test]
    fn columns_belong_to_their_table() {
        for table in ALL_TABLES {
            for column in table.columns() {
                assert_eq!(column.table(), table);
            }
            assert_eq!(table.primary_key().table(), table);
        }
    }

    #[test]
    fn only_line_items_multiply_rows() {
        assert_eq!(Table::LineItems.cardinality(), Cardinality::ToMany);
        assert_eq!(Table::Customers.cardinality(), Cardinality::ToOne);
        assert_eq!(Table::Products.cardinality(), Cardinality::ToOne);
    }

    #[test]
    fn join_parents_follow_foreign_keys() {
        assert_eq!(Table::Customers.join_parent(), Table::Orders);
        assert_eq!(Table::Products.join_parent(), Table::LineItems);
        assert_eq!(Column::OrderStatus.qualified(), "o.status");
    }
}
