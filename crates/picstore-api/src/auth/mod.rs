pub mod context;
pub mod store_auth;

pub use context::StoreContext;
pub use store_auth::StoreAuth;
