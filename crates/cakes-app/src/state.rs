use std::{convert::Infallible, sync::Arc};

use axum::extract::FromRequestParts;
use cakes_dal::Pool;
use http::request::Parts;

use crate::service::CakeService;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(pool: Pool, cakes: CakeService) -> Self {
        AppState {
            state: Arc::new(AppStateInner { pool, cakes }),
        }
    }

    pub fn cakes(&self) -> &CakeService {
        &self.state.cakes
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }
}

struct AppStateInner {
    pool: Pool,
    cakes: CakeService,
}

impl FromRequestParts<AppState> for CakeService {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(state.cakes().clone())
    }
}
