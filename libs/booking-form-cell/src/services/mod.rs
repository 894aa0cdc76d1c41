pub mod availability;
pub mod backend;
pub mod form;
pub mod reference;
pub mod selection;
pub mod session;
pub mod submission;
pub mod verification;

pub use availability::AvailabilityResolver;
pub use backend::SchedulingBackend;
pub use form::FormController;
pub use reference::ReferenceData;
pub use session::BookingFormService;
pub use verification::{CodeIssuer, MockCodeIssuer, VerificationGate};
