pub mod divergence;
pub mod named_entries;

pub use divergence::Divergence;
pub use named_entries::NamedEntries;
