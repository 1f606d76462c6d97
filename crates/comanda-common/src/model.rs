//! Restaurant resources exchanged with the backend REST API.
//!
//! Field names follow the backend's wire format. Related records may arrive either as a
//! bare id or expanded inline, depending on which serializer produced them; see [Related].

use serde::{Deserialize, Deserializer, Serialize};

/// A reference to another record, either by id or expanded inline.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum Related<T, I = String> {
    /// The related record's id.
    Id(I),
    /// The full related record.
    Expanded(T),
}

impl<T: HasId<I>, I: Clone> Related<T, I> {
    /// The id of the related record, regardless of representation.
    pub fn id(&self) -> I {
        match self {
            Self::Id(id) => id.clone(),
            Self::Expanded(record) => record.id(),
        }
    }

    /// The expanded record, if present.
    pub fn expanded(&self) -> Option<&T> {
        match self {
            Self::Id(_) => None,
            Self::Expanded(record) => Some(record),
        }
    }
}

/// Records that carry their own id.
pub trait HasId<I = String> {
    /// The record's id.
    fn id(&self) -> I;
}

macro_rules! has_string_id {
    ($($ty:ty),*) => {
        $(
            impl HasId for $ty {
                fn id(&self) -> String {
                    self.id.clone()
                }
            }
        )*
    };
}

has_string_id!(Component, MenuItem, OrderState, Table, Customer, Order, OrderLine);

impl HasId<i64> for User {
    fn id(&self) -> i64 {
        self.id
    }
}

/// An ingredient or component a menu item is made of.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Component {
    /// Record id.
    pub id: String,
    /// Display name.
    #[serde(rename = "nombre")]
    pub name: String,
}

/// An item on the menu.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct MenuItem {
    /// Record id.
    pub id: String,
    /// Display name.
    #[serde(rename = "nombre")]
    pub name: String,
    /// Unit price.
    #[serde(rename = "precio", deserialize_with = "decimal")]
    pub price: f64,
    /// Optional description.
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Components, expanded only by the detail endpoint.
    #[serde(rename = "componentes", default)]
    pub components: Vec<Related<Component>>,
}

/// A state an order line moves through (e.g. pending, cooking, delivered).
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct OrderState {
    /// Record id.
    pub id: String,
    /// Display name.
    #[serde(rename = "nombre")]
    pub name: String,
}

/// A table in the dining room.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Table {
    /// Record id.
    pub id: String,
    /// Table number shown to staff.
    #[serde(rename = "numero")]
    pub number: i64,
}

/// A registered customer.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Customer {
    /// Record id.
    pub id: String,
    /// Identity document number.
    #[serde(rename = "documento")]
    pub document: String,
    /// Full name.
    #[serde(rename = "nombre")]
    pub name: String,
    /// Mobile phone number.
    #[serde(rename = "celular")]
    pub phone: String,
}

/// A backend user account, as listed by the user administration endpoints.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct User {
    /// Numeric user id.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// E-mail address.
    #[serde(default)]
    pub email: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
}

/// A permission group, which doubles as a staff role.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Group {
    /// Numeric group id.
    pub id: i64,
    /// Group name, e.g. `Mesero`.
    pub name: String,
}

/// An order ("pedido") placed for a table.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Order {
    /// Record id.
    pub id: String,
    /// Time of day the order was created.
    #[serde(rename = "hora_creacion")]
    pub created_time: String,
    /// Time of day the order was paid, if it has been.
    #[serde(rename = "hora_pago", default)]
    pub paid_time: Option<String>,
    /// Date the order was created.
    #[serde(rename = "fecha_creacion")]
    pub created_date: String,
    /// Sum of the order lines before adjustments.
    #[serde(deserialize_with = "decimal")]
    pub subtotal: f64,
    /// Amount due.
    #[serde(deserialize_with = "decimal")]
    pub total: f64,
    /// The user that took the order.
    #[serde(rename = "usuario")]
    pub user: Related<User, i64>,
    /// The table the order belongs to.
    #[serde(rename = "mesa")]
    pub table: Related<Table>,
    /// The customer, if one was registered.
    #[serde(rename = "cliente", default)]
    pub customer: Option<Related<Customer>>,
    /// Order lines, expanded only by the detail endpoint.
    #[serde(rename = "ordenes", default)]
    pub lines: Vec<OrderLine>,
}

/// A single line ("orden") of an order, tracked by the kitchen.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct OrderLine {
    /// Record id.
    pub id: String,
    /// Time the line was created.
    #[serde(rename = "hora_creacion")]
    pub created_time: String,
    /// Time the line was delivered to the table, if it has been.
    #[serde(rename = "hora_entrega", default)]
    pub delivered_time: Option<String>,
    /// Free-form note for the kitchen.
    #[serde(rename = "anotacion", default)]
    pub note: String,
    /// Id of the order this line belongs to.
    #[serde(rename = "pedido")]
    pub order: String,
    /// The ordered menu item.
    pub menu_item: Related<MenuItem>,
    /// Current state of the line.
    #[serde(rename = "estado")]
    pub state: Related<OrderState>,
}

/// Result of recalculating an order's totals from its lines.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct OrderTotals {
    /// Sum of the order lines.
    #[serde(deserialize_with = "decimal")]
    pub subtotal: f64,
    /// Amount due.
    #[serde(deserialize_with = "decimal")]
    pub total: f64,
}

/// Reporting period of the manager dashboard.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub enum Period {
    /// Today.
    Day,
    /// The current week.
    #[default]
    Week,
    /// The current month.
    Month,
    /// The current quarter.
    Quarter,
}

impl Period {
    /// Value of the `periodo` query parameter.
    pub const fn as_query(self) -> &'static str {
        match self {
            Self::Day => "dia",
            Self::Week => "semana",
            Self::Month => "mes",
            Self::Quarter => "trimestre",
        }
    }
}

/// Sales aggregated over one bucket of the reporting period.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SalesByPeriod {
    /// Bucket label, e.g. a date or an hour.
    #[serde(rename = "periodo")]
    pub period: String,
    /// Sales in the bucket.
    #[serde(rename = "total_ventas", deserialize_with = "decimal")]
    pub total_sales: f64,
    /// Number of orders in the bucket.
    #[serde(rename = "cantidad_pedidos")]
    pub order_count: u64,
}

/// Sales summary over the whole reporting period.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SalesSummary {
    /// Total sales.
    #[serde(rename = "total_ventas", deserialize_with = "decimal")]
    pub total_sales: f64,
    /// Number of orders.
    #[serde(rename = "cantidad_pedidos")]
    pub order_count: u64,
    /// Average order value.
    #[serde(rename = "ticket_promedio", deserialize_with = "decimal")]
    pub average_ticket: f64,
    /// Relative change against the previous period, in percent.
    #[serde(rename = "tendencia", deserialize_with = "decimal")]
    pub trend: f64,
}

/// Response of `dashboard/ventas/`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SalesReport {
    /// Per-bucket sales.
    #[serde(rename = "ventas")]
    pub sales: Vec<SalesByPeriod>,
    /// Summary.
    #[serde(rename = "resumen")]
    pub summary: SalesSummary,
}

/// A frequently ordered menu item.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct PopularProduct {
    /// Menu item id.
    pub id: String,
    /// Menu item name.
    #[serde(rename = "nombre")]
    pub name: String,
    /// How many times it was ordered.
    #[serde(rename = "veces_ordenado")]
    pub times_ordered: u64,
    /// Sales generated by it.
    #[serde(rename = "total_ventas", deserialize_with = "decimal")]
    pub total_sales: f64,
}

/// Response of `dashboard/productos/`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ProductsReport {
    /// The most popular products.
    #[serde(rename = "productos_populares")]
    pub popular_products: Vec<PopularProduct>,
}

/// Sales performance of one staff member.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct UserPerformance {
    /// User id.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Display name.
    #[serde(rename = "nombre")]
    pub name: String,
    /// Sales handled.
    #[serde(rename = "total_ventas", deserialize_with = "decimal")]
    pub total_sales: f64,
    /// Orders handled.
    #[serde(rename = "pedidos_atendidos")]
    pub orders_served: u64,
}

/// Response of `dashboard/usuarios/`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct UsersReport {
    /// Per-user performance.
    #[serde(rename = "usuarios_rendimiento")]
    pub performance: Vec<UserPerformance>,
}

/// All three dashboard reports for the same period.
#[derive(Clone, Debug, PartialEq)]
pub struct Dashboard {
    /// Sales report.
    pub sales: SalesReport,
    /// Products report.
    pub products: ProductsReport,
    /// Users report.
    pub users: UsersReport,
}

/// Money amounts are serialized by the backend either as numbers or as decimal strings.
fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Decimal {
        Number(f64),
        Text(String),
    }

    match Decimal::deserialize(deserializer)? {
        Decimal::Number(value) => Ok(value),
        Decimal::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
