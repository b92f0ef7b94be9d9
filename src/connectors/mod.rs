//! Provider connectors
//!
//! One module per provider. Each connector validates its configuration
//! up front, owns a shared HTTP client with the provider's auth and rate
//! budget, and exposes its streams through the [`Connector`] trait.
//!
//! [`Connector`]: crate::connector::Connector

mod paypal;
mod square;
mod typeform;

pub use paypal::{PaypalConfig, PaypalConnector};
pub use square::{SquareConfig, SquareConnector};
pub use typeform::{TypeformConfig, TypeformConnector};
