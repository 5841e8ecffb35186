//! Category, tag and brand management.
//!
//! The three taxonomies share these handlers. Each is mounted under its own
//! prefix with the [`Taxonomy`] it manages as a request extension.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Extension, Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;
use tracing::instrument;

use super::capitalize;
use crate::db::{RepositoryError, TaxonomyRepository};
use crate::error::{AppError, Result};
use crate::forms::{BoundForm, FormData, catalog::taxonomy_schema};
use crate::middleware::{PageContext, flash};
use crate::models::{Taxonomy, TaxonomyInput, Term};
use crate::state::AppState;

/// Routes for one taxonomy, to be nested under [`Taxonomy::path`].
pub fn routes(taxonomy: Taxonomy) -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/create", post(create))
        .route("/{id}/update", get(update_page).post(update))
        .route("/{id}/delete", post(delete))
        .layer(Extension(taxonomy))
}

#[derive(Template, WebTemplate)]
#[template(path = "taxonomy/index.html")]
pub struct TaxonomyIndexTemplate {
    pub ctx: PageContext,
    pub taxonomy: Taxonomy,
    pub terms: Vec<Term<i32>>,
    pub form: BoundForm,
}

#[derive(Template, WebTemplate)]
#[template(path = "taxonomy/update.html")]
pub struct TaxonomyUpdateTemplate {
    pub ctx: PageContext,
    pub taxonomy: Taxonomy,
    pub term: Term<i32>,
    pub form: BoundForm,
}

/// List the entries with a create form.
#[instrument(skip(state, session))]
pub async fn index(
    Extension(taxonomy): Extension<Taxonomy>,
    State(state): State<AppState>,
    session: Session,
) -> Result<Response> {
    render_index(&state, &session, taxonomy, taxonomy_schema().unbound()).await
}

#[instrument(skip(state, session, data))]
pub async fn create(
    Extension(taxonomy): Extension<Taxonomy>,
    State(state): State<AppState>,
    session: Session,
    data: FormData,
) -> Result<Response> {
    let schema = taxonomy_schema();
    let input = match schema.validate(&data) {
        Ok(cleaned) => TaxonomyInput::from_cleaned(&cleaned)?,
        Err(form) => return render_index(&state, &session, taxonomy, form).await,
    };

    match TaxonomyRepository::new(state.pool(), taxonomy)
        .create(&input.name)
        .await
    {
        Ok(_) => {
            flash::success(
                &session,
                format!("{} {} has been created", taxonomy.singular(), input.name),
            )
            .await?;
            Ok(Redirect::to(taxonomy.path()).into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            let form = schema.reject(&data, "name", capitalize(&message));
            render_index(&state, &session, taxonomy, form).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn render_index(
    state: &AppState,
    session: &Session,
    taxonomy: Taxonomy,
    form: BoundForm,
) -> Result<Response> {
    let terms = TaxonomyRepository::new(state.pool(), taxonomy).list().await?;

    Ok(TaxonomyIndexTemplate {
        ctx: PageContext::load(session).await?,
        taxonomy,
        terms,
        form,
    }
    .into_response())
}

#[instrument(skip(state, session))]
pub async fn update_page(
    Extension(taxonomy): Extension<Taxonomy>,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response> {
    let term = require(&state, taxonomy, id).await?;
    let form = taxonomy_schema().with_initial(&FormData::default().with("name", term.name.clone()));
    render_update(&session, taxonomy, term, form).await
}

#[instrument(skip(state, session, data))]
pub async fn update(
    Extension(taxonomy): Extension<Taxonomy>,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    data: FormData,
) -> Result<Response> {
    let term = require(&state, taxonomy, id).await?;
    let schema = taxonomy_schema();
    let input = match schema.validate(&data) {
        Ok(cleaned) => TaxonomyInput::from_cleaned(&cleaned)?,
        Err(form) => return render_update(&session, taxonomy, term, form).await,
    };

    match TaxonomyRepository::new(state.pool(), taxonomy)
        .rename(id, &input.name)
        .await
    {
        Ok(()) => {
            flash::success(
                &session,
                format!("{} {} has been updated", taxonomy.singular(), input.name),
            )
            .await?;
            Ok(Redirect::to(taxonomy.path()).into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            let form = schema.reject(&data, "name", capitalize(&message));
            render_update(&session, taxonomy, term, form).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn render_update(
    session: &Session,
    taxonomy: Taxonomy,
    term: Term<i32>,
    form: BoundForm,
) -> Result<Response> {
    Ok(TaxonomyUpdateTemplate {
        ctx: PageContext::load(session).await?,
        taxonomy,
        term,
        form,
    }
    .into_response())
}

/// Delete an entry. A category still in use stays, with an error flash.
#[instrument(skip(state, session))]
pub async fn delete(
    Extension(taxonomy): Extension<Taxonomy>,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response> {
    let term = require(&state, taxonomy, id).await?;

    match TaxonomyRepository::new(state.pool(), taxonomy).delete(id).await {
        Ok(()) => {
            flash::success(
                &session,
                format!("{} {} has been deleted", taxonomy.singular(), term.name),
            )
            .await?;
        }
        Err(RepositoryError::Conflict(message)) => {
            tracing::info!(taxonomy = taxonomy.table(), id, "Delete refused: {message}");
            flash::error(
                &session,
                format!("{} cannot be deleted: {message}", term.name),
            )
            .await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(taxonomy.path()).into_response())
}

async fn require(state: &AppState, taxonomy: Taxonomy, id: i32) -> Result<Term<i32>> {
    TaxonomyRepository::new(state.pool(), taxonomy)
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {id}", taxonomy.table())))
}
