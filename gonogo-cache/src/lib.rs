pub mod intern;

pub use intern::{intern, interned_count, resolve, Atom};
