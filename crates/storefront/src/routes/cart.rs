//! Shopping cart route handlers.
//!
//! Every cart route needs a logged-in user. Failures a shopper can cause
//! (a product deleted meanwhile, a line already removed, a bad quantity)
//! become an error flash and a redirect rather than an error page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use shopkeep_core::{ProductId, Quantity};

use crate::db::{CartRepository, RepositoryError};
use crate::error::{Result, add_breadcrumb};
use crate::forms::{
    FormData,
    cart::{quantity_from_cleaned, quantity_schema},
};
use crate::middleware::{PageContext, RequireUser, flash};
use crate::models::CartSummary;
use crate::state::AppState;

const CART_PATH: &str = "/cart";

#[derive(Template, WebTemplate)]
#[template(path = "cart/index.html")]
pub struct CartTemplate {
    pub ctx: PageContext,
    pub cart: CartSummary,
}

#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    let cart = CartRepository::new(state.pool()).list_for_user(user.id).await?;

    Ok(CartTemplate {
        ctx: PageContext::load(&session).await?,
        cart,
    }
    .into_response())
}

/// Add a product, or more of it if it is already in the cart.
#[instrument(skip(state, session, user, data), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
    data: FormData,
) -> Result<Response> {
    // The listing's add button may omit the quantity.
    let data = if data.get("quantity").is_some() {
        data
    } else {
        data.with("quantity", "1")
    };
    let Some(quantity) = submitted_quantity(&session, &data).await? else {
        return Ok(Redirect::to("/products").into_response());
    };

    match CartRepository::new(state.pool())
        .add(user.id, product_id, quantity)
        .await
    {
        Ok(total) => {
            let product = product_id.to_string();
            add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product.as_str())]));
            tracing::info!(%product_id, quantity = total.get(), "Added to cart");
            flash::success(&session, "Item added to cart").await?;
            Ok(Redirect::to(CART_PATH).into_response())
        }
        Err(RepositoryError::NotFound) => {
            flash::error(&session, "That product no longer exists").await?;
            Ok(Redirect::to("/products").into_response())
        }
        Err(RepositoryError::QuantityLimit { max }) => {
            flash::error(&session, quantity_limit_message(max)).await?;
            Ok(Redirect::to(CART_PATH).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Set the quantity of a line already in the cart.
#[instrument(skip(state, session, user, data), fields(user_id = %user.id))]
pub async fn update_quantity(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
    data: FormData,
) -> Result<Response> {
    let Some(quantity) = submitted_quantity(&session, &data).await? else {
        return Ok(Redirect::to(CART_PATH).into_response());
    };

    match CartRepository::new(state.pool())
        .update_quantity(user.id, product_id, quantity)
        .await
    {
        Ok(()) => flash::success(&session, "Quantity updated").await?,
        Err(RepositoryError::NotFound) => {
            flash::error(&session, "That product is not in your cart").await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(CART_PATH).into_response())
}

#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
) -> Result<Response> {
    if CartRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?
    {
        flash::success(&session, "Item removed from cart").await?;
    }

    Ok(Redirect::to(CART_PATH).into_response())
}

fn quantity_limit_message(max: u32) -> String {
    format!("A cart can hold at most {max} of one product")
}

/// Validate the quantity field, flashing the error when it is invalid.
async fn submitted_quantity(session: &Session, data: &FormData) -> Result<Option<Quantity>> {
    match quantity_schema().validate(data) {
        Ok(cleaned) => Ok(Some(quantity_from_cleaned(&cleaned)?)),
        Err(form) => {
            if let Some((_, message)) = form.errors().first() {
                flash::error(session, *message).await?;
            }
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_limit_message_names_the_limit() {
        let message = quantity_limit_message(Quantity::MAX);
        assert_eq!(
            message,
            "A cart can hold at most 2147483647 of one product"
        );
    }
}
