use serde::Serialize;

use crate::errors::AppError;
use crate::models::order::Order;
use crate::models::token::ApiToken;
use crate::models::user::User;
use crate::session::Session;

/// Everything the customer dashboard shows on load.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub user: User,
    pub tokens: Vec<ApiToken>,
    pub orders: Vec<Order>,
}

pub async fn tokens(session: &Session) -> Result<Vec<ApiToken>, AppError> {
    let token = session.require_token()?;
    session.backend().list_tokens(&token).await
}

pub async fn orders(session: &Session) -> Result<Vec<Order>, AppError> {
    let token = session.require_token()?;
    session.backend().list_orders(&token).await
}

/// Refresh the user, then load tokens and orders concurrently.
pub async fn load(session: &Session) -> Result<DashboardView, AppError> {
    let user = session.refresh_user().await?;
    let (tokens, orders) = tokio::try_join!(tokens(session), orders(session))?;
    tracing::debug!(tokens = tokens.len(), orders = orders.len(), "dashboard loaded");
    Ok(DashboardView {
        user,
        tokens,
        orders,
    })
}
