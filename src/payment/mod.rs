pub mod checkout;
pub mod confirmation;

pub use checkout::{Checkout, CheckoutOutcome, COD_FALLBACK_DELAY};
pub use confirmation::{Confirmation, PollPolicy, VerificationResult, VerificationStatus};
