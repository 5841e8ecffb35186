//! Cart domain types.

use shopkeep_core::{CartItemId, Price, Quantity};

use super::{Category, Product};

/// One cart line with its product and the product's category.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: CartItemId,
    pub quantity: Quantity,
    pub product: Product,
    pub category: Category,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price().times(self.quantity.get())
    }
}

/// A user's cart: its lines and derived totals.
#[derive(Debug, Clone, Default)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
}

impl CartSummary {
    #[must_use]
    pub const fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity.get())).sum()
    }

    #[must_use]
    pub fn total(&self) -> Price {
        Price::total(self.lines.iter().map(CartLine::line_total))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use shopkeep_core::{CategoryId, Cost, ProductId};

    use super::*;

    fn line(id: i32, cents: i64, quantity: u32) -> CartLine {
        let now = Utc::now();
        CartLine {
            id: CartItemId::new(id),
            quantity: Quantity::new(quantity).unwrap(),
            product: Product {
                id: ProductId::new(id),
                name: format!("Product {id}"),
                cost: Cost::new(cents).unwrap(),
                description: String::new(),
                image_url: None,
                category_id: CategoryId::new(1),
                brand_id: None,
                created_at: now,
                updated_at: now,
            },
            category: Category {
                id: CategoryId::new(1),
                name: "Tea".to_string(),
            },
        }
    }

    #[test]
    fn test_cart_totals() {
        let cart = CartSummary::new(vec![line(1, 250, 2), line(2, 1999, 1)]);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.lines[0].line_total().to_string(), "$5.00");
        assert_eq!(cart.total().to_string(), "$24.99");
    }

    #[test]
    fn test_empty_cart() {
        let cart = CartSummary::default();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.total().to_string(), "$0.00");
    }
}
