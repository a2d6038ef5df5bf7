pub mod lookup;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use lookup::{OpenFoodFactsClient, ProductLookup};
pub use repo::{PgProductRepository, ProductRepository};
pub use repo_types::{Product, ProductSource};
pub use services::{LookupError, ProductCatalog};
