pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::*;
pub use models::*;
pub use services::*;
pub use router::{booking_form_routes, booking_form_routes_with_service};
