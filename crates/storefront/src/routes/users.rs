//! Account route handlers: registration, login, profile and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::forms::{
    BoundForm, FormData, MissingField,
    account::{Credentials, Registration, login_schema, registration_schema},
};
use crate::middleware::{
    PageContext, RequireUser, auth::LOGIN_PATH, clear_current_user, flash, set_current_user,
};
use crate::models::{SessionUser, User};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

const PROFILE_PATH: &str = "/users/profile";

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "users/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub form: BoundForm,
}

#[derive(Template, WebTemplate)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub form: BoundForm,
}

#[derive(Template, WebTemplate)]
#[template(path = "users/profile.html")]
pub struct ProfileTemplate {
    pub ctx: PageContext,
    pub user: User,
}

// =============================================================================
// Registration
// =============================================================================

#[instrument(skip(session))]
pub async fn register_page(session: Session) -> Result<Response> {
    render_register(&session, registration_schema().unbound()).await
}

/// Create an account. A taken email is reported on the email field.
#[instrument(skip(state, session, data))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    data: FormData,
) -> Result<Response> {
    let schema = registration_schema();
    let cleaned = match schema.validate(&data) {
        Ok(cleaned) => cleaned,
        Err(form) => return render_register(&session, form).await,
    };
    let registration = match Registration::from_cleaned(&cleaned) {
        Ok(registration) => registration,
        Err(MissingField("username")) => {
            let form = schema.reject(&data, "username", "Username contains invalid characters");
            return render_register(&session, form).await;
        }
        Err(e) => return Err(e.into()),
    };

    match AuthService::new(state.pool()).register(&registration).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Account created");
            flash::success(&session, "User signed up successfully!").await?;
            Ok(Redirect::to(LOGIN_PATH).into_response())
        }
        Err(AuthError::UserAlreadyExists) => {
            let form = schema.reject(&data, "email", "This email is already registered");
            render_register(&session, form).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn render_register(session: &Session, form: BoundForm) -> Result<Response> {
    Ok(RegisterTemplate {
        ctx: PageContext::load(session).await?,
        form,
    }
    .into_response())
}

// =============================================================================
// Login / Logout
// =============================================================================

#[instrument(skip(session))]
pub async fn login_page(session: Session) -> Result<Response> {
    render_login(&session, login_schema().unbound()).await
}

/// Check credentials and store the user in the session.
///
/// Wrong credentials redirect back to the login page with an error flash,
/// without saying which of email or password was wrong.
#[instrument(skip(state, session, data))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    data: FormData,
) -> Result<Response> {
    let cleaned = match login_schema().validate(&data) {
        Ok(cleaned) => cleaned,
        Err(form) => {
            flash::error(
                &session,
                "There are some problems logging you in. Please fill in the form again",
            )
            .await?;
            return render_login(&session, form).await;
        }
    };
    let credentials = Credentials::from_cleaned(&cleaned)?;

    match AuthService::new(state.pool()).login(&credentials).await {
        Ok(user) => {
            let session_user = SessionUser::from(&user);
            set_current_user(&session, &session_user).await?;
            set_sentry_user(&user.id, Some(user.email.as_str()));
            tracing::info!(user_id = %user.id, "User logged in");

            flash::success(&session, format!("Welcome back, {}", user.username)).await?;
            Ok(Redirect::to(PROFILE_PATH).into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("Login rejected");
            flash::error(&session, "Sorry, your login details are incorrect").await?;
            Ok(Redirect::to(LOGIN_PATH).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn render_login(session: &Session, form: BoundForm) -> Result<Response> {
    Ok(LoginTemplate {
        ctx: PageContext::load(session).await?,
        form,
    }
    .into_response())
}

#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Response> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    flash::success(&session, "Goodbye and see you again").await?;
    Ok(Redirect::to(LOGIN_PATH).into_response())
}

// =============================================================================
// Profile
// =============================================================================

#[instrument(skip(state, session, current), fields(user_id = %current.id))]
pub async fn profile(
    State(state): State<AppState>,
    session: Session,
    RequireUser(current): RequireUser,
) -> Result<Response> {
    let user = UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", current.id)))?;

    Ok(ProfileTemplate {
        ctx: PageContext::load(&session).await?,
        user,
    }
    .into_response())
}
