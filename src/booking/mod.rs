pub mod pricing;
pub mod wizard;

pub use pricing::{rental_days, total_price, Quote, DRIVER_DAILY_RATE};
pub use wizard::{BookingDraft, BookingWizard, LocationHint, LocationPlan, SubmitOutcome, WizardStep};
