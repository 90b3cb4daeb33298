//! NEAR Intents integration
//!
//! Quotes, NEP-413 intent messages signed through the kernel, publishing to
//! the solver relay, and settlement tracking.

pub mod message;
pub mod relay;
pub mod swap;

pub use message::{Intent, IntentMessage, Nep413Payload, SignedNep413, NEP413_TAG};
pub use relay::{DepositAddress, IntentsSwapQuote, QuoteRequest, SolverRelayClient};
pub use swap::{balance_of, wait_for_balance, IntentsSwap, SwapOutcome, SwapRequest, MT_BALANCE_OF};
