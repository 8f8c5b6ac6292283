//! External read services: customer directory, credit bureau, offer catalog.
//!
//! All are synthetic, deterministic by default, and injected as traits so
//! tests and demos can swap implementations freely.

pub mod credit;
pub mod directory;
pub mod offers;

pub use credit::{CreditScoreService, FixedCreditBureau, RandomizedCreditBureau};
pub use directory::{CustomerDirectory, DirectoryRecord, InMemoryDirectory, LibSqlDirectory};
pub use offers::{FixedOfferCatalog, OfferCatalog};
