use std::sync::Arc;

use crate::auth::{TokenIssuer, UserDirectory};
use crate::service::TableService;

#[derive(Clone)]
pub struct AppState {
    pub tables: Arc<TableService>,
    pub users: Arc<UserDirectory>,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(tables: TableService, users: UserDirectory, tokens: TokenIssuer) -> Self {
        Self {
            tables: Arc::new(tables),
            users: Arc::new(users),
            tokens: Arc::new(tokens),
        }
    }
}
