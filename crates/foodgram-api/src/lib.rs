pub mod auth;
pub mod convert;
pub mod error;
pub mod extract;
pub mod images;
pub mod ingredients;
pub mod middleware;
pub mod pagination;
pub mod recipes;
pub mod routes;
pub mod state;
pub mod tags;
pub mod users;

pub use routes::router;
pub use state::{AppState, AppStateInner};
