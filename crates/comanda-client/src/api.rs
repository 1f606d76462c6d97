//! Typed access to the backend's REST resources.
//!
//! All calls go through the authenticated request gateway.

use std::{fmt::Display, marker::PhantomData};

use comanda_common::model::{
    Component, Customer, Dashboard, Group, MenuItem, Order, OrderLine, OrderState, OrderTotals,
    Period, ProductsReport, SalesReport, Table, User, UsersReport,
};
use http::Method;
use reqwest::Url;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error,
    gateway::{ApiRequest, Gateway},
    Error,
};

/// Builds URLs below the API prefix, e.g. `http://host/core/`.
#[derive(Clone, Debug)]
pub(crate) struct ApiUrls {
    api_base: Url,
}

impl ApiUrls {
    pub fn new(api_base: Url) -> Result<Self, Error> {
        if api_base.cannot_be_a_base() {
            return Err(Error::Config("API URL cannot be a base"));
        }
        Ok(Self { api_base })
    }

    /// The URL of `segments` below the API base, with a trailing slash.
    ///
    /// Each segment is percent-encoded, so ids can not escape their path segment.
    pub fn path(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments).push("");
        }
        url
    }
}

/// A REST resource with uniform list/detail/create/update/delete endpoints.
pub struct Resource<'c, T> {
    gateway: &'c Gateway,
    urls: &'c ApiUrls,
    name: &'static str,
    phantom: PhantomData<fn() -> T>,
}

impl<'c, T: DeserializeOwned> Resource<'c, T> {
    pub(crate) fn new(gateway: &'c Gateway, urls: &'c ApiUrls, name: &'static str) -> Self {
        Self {
            gateway,
            urls,
            name,
            phantom: PhantomData,
        }
    }

    /// The resource name, i.e. its path segment below the API prefix.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// List all records.
    pub async fn list(&self) -> Result<Vec<T>, Error> {
        self.gateway
            .json(&ApiRequest::new(Method::GET, self.collection_url()))
            .await
    }

    /// Get one record.
    pub async fn get(&self, id: impl Display) -> Result<T, Error> {
        self.gateway
            .json(&ApiRequest::new(Method::GET, self.detail_url(id)))
            .await
    }

    /// Create a record. The body may be partial; the created record is returned.
    pub async fn create(&self, body: &impl Serialize) -> Result<T, Error> {
        self.gateway
            .json(&ApiRequest::new(Method::POST, self.collection_url()).json(to_json(body)?))
            .await
    }

    /// Replace a record; the updated record is returned.
    pub async fn update(&self, id: impl Display, body: &impl Serialize) -> Result<T, Error> {
        self.gateway
            .json(&ApiRequest::new(Method::PUT, self.detail_url(id)).json(to_json(body)?))
            .await
    }

    /// Delete a record.
    pub async fn delete(&self, id: impl Display) -> Result<(), Error> {
        self.gateway
            .execute(&ApiRequest::new(Method::DELETE, self.detail_url(id)))
            .await?;
        Ok(())
    }

    fn collection_url(&self) -> Url {
        self.urls.path(&[self.name])
    }

    fn detail_url(&self, id: impl Display) -> Url {
        self.urls.path(&[self.name, &id.to_string()])
    }

    fn action_url(&self, id: impl Display, action: &str) -> Url {
        self.urls.path(&[self.name, &id.to_string(), action])
    }

    async fn post_action(
        &self,
        id: impl Display,
        action: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, Error> {
        let mut request = ApiRequest::new(Method::POST, self.action_url(id, action));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.gateway.execute(&request).await
    }
}

impl Resource<'_, MenuItem> {
    /// Attach a component to a menu item.
    pub async fn add_component(&self, menu_item_id: &str, component_id: &str) -> Result<(), Error> {
        self.post_action(
            menu_item_id,
            "add_componente",
            Some(serde_json::json!({ "componente_id": component_id })),
        )
        .await?;
        Ok(())
    }

    /// Detach a component from a menu item.
    pub async fn remove_component(
        &self,
        menu_item_id: &str,
        component_id: &str,
    ) -> Result<(), Error> {
        self.post_action(
            menu_item_id,
            "remove_componente",
            Some(serde_json::json!({ "componente_id": component_id })),
        )
        .await?;
        Ok(())
    }
}

impl Resource<'_, Order> {
    /// Recalculate an order's subtotal and total from its lines.
    pub async fn calculate_total(&self, order_id: &str) -> Result<OrderTotals, Error> {
        self.post_action(order_id, "calcular_total", None)
            .await?
            .json()
            .await
            .map_err(error::reqwest)
    }

    /// Orders visible to the current user: their own for waiters and cooks, all otherwise.
    pub async fn mine(&self) -> Result<Vec<Order>, Error> {
        self.gateway
            .json(&ApiRequest::new(
                Method::GET,
                self.urls.path(&[self.name, "mis_pedidos"]),
            ))
            .await
    }
}

impl Resource<'_, OrderLine> {
    /// Move an order line to another state.
    pub async fn change_state(&self, order_line_id: &str, state_id: &str) -> Result<(), Error> {
        self.post_action(
            order_line_id,
            "cambiar_estado",
            Some(serde_json::json!({ "estado_id": state_id })),
        )
        .await?;
        Ok(())
    }
}

/// The manager analytics dashboard.
pub struct DashboardApi<'c> {
    gateway: &'c Gateway,
    urls: &'c ApiUrls,
}

impl<'c> DashboardApi<'c> {
    pub(crate) fn new(gateway: &'c Gateway, urls: &'c ApiUrls) -> Self {
        Self { gateway, urls }
    }

    /// Sales over the period.
    pub async fn sales(&self, period: Period) -> Result<SalesReport, Error> {
        self.report("ventas", period).await
    }

    /// The most popular products over the period.
    pub async fn products(&self, period: Period) -> Result<ProductsReport, Error> {
        self.report("productos", period).await
    }

    /// Staff performance over the period.
    pub async fn users(&self, period: Period) -> Result<UsersReport, Error> {
        self.report("usuarios", period).await
    }

    /// All three reports, fetched concurrently.
    pub async fn all(&self, period: Period) -> Result<Dashboard, Error> {
        let (sales, products, users) = futures_util::try_join!(
            self.sales(period),
            self.products(period),
            self.users(period)
        )?;

        Ok(Dashboard {
            sales,
            products,
            users,
        })
    }

    async fn report<T: DeserializeOwned>(&self, report: &str, period: Period) -> Result<T, Error> {
        let mut url = self.urls.path(&["dashboard", report]);
        url.query_pairs_mut()
            .append_pair("periodo", period.as_query());

        self.gateway.json(&ApiRequest::new(Method::GET, url)).await
    }
}

fn to_json(body: &impl Serialize) -> Result<serde_json::Value, Error> {
    serde_json::to_value(body).map_err(error::codec)
}

/// Resource names below the API prefix.
pub(crate) mod names {
    pub const COMPONENTS: &str = "componentes";
    pub const MENU_ITEMS: &str = "menu-items";
    pub const ORDER_STATES: &str = "estados";
    pub const TABLES: &str = "mesas";
    pub const CUSTOMERS: &str = "clientes";
    pub const ORDERS: &str = "pedidos";
    pub const ORDER_LINES: &str = "ordenes";
    pub const USERS: &str = "users";
    pub const GROUPS: &str = "groups";
}

/// Type aliases of the resources exposed by the [crate::Client].
pub type Components<'c> = Resource<'c, Component>;
/// See [Components].
pub type MenuItems<'c> = Resource<'c, MenuItem>;
/// See [Components].
pub type OrderStates<'c> = Resource<'c, OrderState>;
/// See [Components].
pub type Tables<'c> = Resource<'c, Table>;
/// See [Components].
pub type Customers<'c> = Resource<'c, Customer>;
/// See [Components].
pub type Orders<'c> = Resource<'c, Order>;
/// See [Components].
pub type OrderLines<'c> = Resource<'c, OrderLine>;
/// See [Components].
pub type Users<'c> = Resource<'c, User>;
/// See [Components].
pub type Groups<'c> = Resource<'c, Group>;
