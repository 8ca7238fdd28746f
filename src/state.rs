use std::sync::Arc;

use crate::{
    config::BusinessInfo,
    db::{DbPool, OrmConn},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub jwt_secret: Arc<str>,
    pub business: Arc<BusinessInfo>,
}
