//! Product catalog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, RawQuery, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use shopkeep_core::ProductId;

use super::{capitalize, cloudinary::UploadWidget};
use crate::db::{
    ProductFilter, ProductRepository, RepositoryError, products::BrandListing,
    taxonomy::load_choices,
};
use crate::error::{Result, add_breadcrumb};
use crate::forms::{
    BoundForm, FormData,
    catalog::{product_initial, product_schema, search_schema},
};
use crate::middleware::{PageContext, flash};
use crate::models::{ProductDetail, ProductInput};
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub ctx: PageContext,
    pub search: BoundForm,
    pub products: Vec<ProductDetail>,
    pub filtered: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "products/create.html")]
pub struct ProductCreateTemplate {
    pub ctx: PageContext,
    pub form: BoundForm,
    pub upload: Option<UploadWidget>,
}

#[derive(Template, WebTemplate)]
#[template(path = "products/update.html")]
pub struct ProductUpdateTemplate {
    pub ctx: PageContext,
    pub form: BoundForm,
    pub product: ProductDetail,
    pub upload: Option<UploadWidget>,
}

#[derive(Template, WebTemplate)]
#[template(path = "products/delete.html")]
pub struct ProductDeleteTemplate {
    pub ctx: PageContext,
    pub product: ProductDetail,
}

#[derive(Template, WebTemplate)]
#[template(path = "products/brands.html")]
pub struct BrandsTemplate {
    pub ctx: PageContext,
    pub brands: Vec<BrandListing>,
}

// =============================================================================
// Listing and Search
// =============================================================================

/// List products, filtered by the search form in the query string.
///
/// An invalid search shows every product along with the field errors.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    let (categories, _, tags) = load_choices(state.pool()).await?;
    let schema = search_schema(&categories, &tags);
    let data = FormData::from_urlencoded(query.as_deref().unwrap_or_default().as_bytes());

    let (search, filter) = if query.as_deref().is_none_or(str::is_empty) {
        (schema.unbound(), ProductFilter::default())
    } else {
        match schema.validate(&data) {
            Ok(cleaned) => (
                schema.with_initial(&data),
                ProductFilter::from_cleaned(&cleaned),
            ),
            Err(bound) => (bound, ProductFilter::default()),
        }
    };

    let products = ProductRepository::new(state.pool()).list(&filter).await?;
    tracing::debug!(count = products.len(), filtered = !filter.is_empty(), "Products listed");

    Ok(ProductsIndexTemplate {
        ctx: PageContext::load(&session).await?,
        search,
        products,
        filtered: !filter.is_empty(),
    }
    .into_response())
}

/// Brands with their product counts.
#[instrument(skip(state, session))]
pub async fn brands(State(state): State<AppState>, session: Session) -> Result<Response> {
    let brands = ProductRepository::new(state.pool()).brand_listing().await?;

    Ok(BrandsTemplate {
        ctx: PageContext::load(&session).await?,
        brands,
    }
    .into_response())
}

// =============================================================================
// Create
// =============================================================================

#[instrument(skip(state, session))]
pub async fn create_page(State(state): State<AppState>, session: Session) -> Result<Response> {
    let (categories, brands, tags) = load_choices(state.pool()).await?;
    let form = product_schema(&categories, &brands, &tags).unbound();
    render_create(&state, &session, form).await
}

#[instrument(skip(state, session, data))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    data: FormData,
) -> Result<Response> {
    let (categories, brands, tags) = load_choices(state.pool()).await?;
    let schema = product_schema(&categories, &brands, &tags);

    let cleaned = match schema.validate(&data) {
        Ok(cleaned) => cleaned,
        Err(form) => return render_create(&state, &session, form).await,
    };
    let input = ProductInput::from_cleaned(&cleaned)?;

    match ProductRepository::new(state.pool()).create(&input).await {
        Ok(id) => {
            let product_id = id.to_string();
            add_breadcrumb(
                "catalog",
                "Product created",
                Some(&[("product_id", product_id.as_str())]),
            );
            flash::success(&session, format!("New product {} has been created", input.name))
                .await?;
            Ok(Redirect::to("/products").into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            let form = schema.reject(&data, "category_id", capitalize(&message));
            render_create(&state, &session, form).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn render_create(state: &AppState, session: &Session, form: BoundForm) -> Result<Response> {
    Ok(ProductCreateTemplate {
        ctx: PageContext::load(session).await?,
        form,
        upload: UploadWidget::from_config(state.config()),
    }
    .into_response())
}

// =============================================================================
// Update
// =============================================================================

#[instrument(skip(state, session))]
pub async fn update_page(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let product = ProductRepository::new(state.pool()).require(id).await?;
    let (categories, brands, tags) = load_choices(state.pool()).await?;
    let form = product_schema(&categories, &brands, &tags).with_initial(&product_initial(&product));
    render_update(&state, &session, form, product).await
}

#[instrument(skip(state, session, data))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
    data: FormData,
) -> Result<Response> {
    let repo = ProductRepository::new(state.pool());
    let product = repo.require(id).await?;
    let (categories, brands, tags) = load_choices(state.pool()).await?;
    let schema = product_schema(&categories, &brands, &tags);

    let cleaned = match schema.validate(&data) {
        Ok(cleaned) => cleaned,
        Err(form) => return render_update(&state, &session, form, product).await,
    };
    let input = ProductInput::from_cleaned(&cleaned)?;

    match repo.update(id, &input).await {
        Ok(()) => {
            flash::success(&session, format!("Product {} has been updated", input.name)).await?;
            Ok(Redirect::to("/products").into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            let form = schema.reject(&data, "category_id", capitalize(&message));
            render_update(&state, &session, form, product).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn render_update(
    state: &AppState,
    session: &Session,
    form: BoundForm,
    product: ProductDetail,
) -> Result<Response> {
    Ok(ProductUpdateTemplate {
        ctx: PageContext::load(session).await?,
        form,
        product,
        upload: UploadWidget::from_config(state.config()),
    }
    .into_response())
}

// =============================================================================
// Delete
// =============================================================================

#[instrument(skip(state, session))]
pub async fn delete_page(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let product = ProductRepository::new(state.pool()).require(id).await?;

    Ok(ProductDeleteTemplate {
        ctx: PageContext::load(&session).await?,
        product,
    }
    .into_response())
}

#[instrument(skip(state, session))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let repo = ProductRepository::new(state.pool());
    let product = repo.require(id).await?;
    repo.delete(id).await?;

    flash::success(
        &session,
        format!("Product {} has been deleted", product.product.name),
    )
    .await?;
    Ok(Redirect::to("/products").into_response())
}
