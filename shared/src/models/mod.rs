//! Persistent catalog models referenced by the checkout engine

mod product;

pub use product::Product;
