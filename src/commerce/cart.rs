use super::{Cart, CartItem};
use crate::error::CommerceError;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Cart kept in process memory. Adding a product already in the cart bumps
/// its quantity.
#[derive(Debug, Default)]
pub struct InMemoryCart {
    items: Mutex<Vec<CartItem>>,
}

impl InMemoryCart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<CartItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }
}

#[async_trait]
impl Cart for InMemoryCart {
    async fn items(&self) -> Vec<CartItem> {
        self.items.lock().await.clone()
    }

    async fn total(&self) -> f64 {
        self.items.lock().await.iter().map(CartItem::line_total).sum()
    }

    async fn add_to_cart(&self, item: CartItem) -> Result<(), CommerceError> {
        if item.quantity == 0 {
            return Err(CommerceError::Cart("quantity must be at least 1".to_string()));
        }

        let mut items = self.items.lock().await;
        match items.iter_mut().find(|existing| existing.product.id == item.product.id) {
            Some(existing) => existing.quantity += item.quantity,
            None => items.push(item),
        }
        Ok(())
    }
}
