pub mod frappe;

pub use frappe::FrappeClient;
