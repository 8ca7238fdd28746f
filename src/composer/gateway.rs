//! Collaborators the composer talks to.

use thiserror::Error;
use uuid::Uuid;

use crate::{
    dto::orders::{OrderPayload, OrderWithItems},
    models::{Product, ProductCategory},
};

/// Failure reported by a catalog or order backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("request rejected with status {status}")]
    Api { status: u16, detail: Option<String> },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("not signed in")]
    Unauthenticated,
}

impl GatewayError {
    /// Backend-provided explanation, when there is one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            GatewayError::Api { detail, .. } => detail.as_deref().filter(|d| !d.is_empty()),
            GatewayError::Transport(_) | GatewayError::Unauthenticated => None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<ProductCategory>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl ProductFilter {
    /// What the add-item selector offers.
    pub fn active() -> Self {
        Self {
            is_active: Some(true),
            ..Self::default()
        }
    }
}

pub trait ProductCatalog {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, GatewayError>;
}

pub trait OrderGateway {
    async fn get_order(&self, id: Uuid) -> Result<OrderWithItems, GatewayError>;

    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderWithItems, GatewayError>;

    async fn update_order(
        &self,
        id: Uuid,
        payload: &OrderPayload,
    ) -> Result<OrderWithItems, GatewayError>;
}

/// Yes/no question the host UI asks staff after an order is created.
pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}
