//! Store domain: products, purchases, error codes and the ports the bridge
//! talks to (billing SDK, UI host, host callbacks).

pub mod error_code;
pub mod ports;
pub mod product;
pub mod purchase;
