use lazy_static::lazy_static;
use std::sync::RwLock;
pub use string_cache::DefaultAtom as Atom;

lazy_static! {
    static ref INTERNER: RwLock<Vec<Atom>> = RwLock::new(Vec::new());
}

/// Interns a stimulus identifier or display string and returns its stable
/// numeric id. The renderer keys its pixmap cache on these ids.
pub fn intern(s: &str) -> usize {
    let atom = Atom::from(s);
    let mut v = INTERNER.write().unwrap();
    match v.iter().position(|a| *a == atom) {
        Some(idx) => idx,
        None => {
            v.push(atom);
            v.len() - 1
        }
    }
}

/// Looks an id back up. `None` for ids that were never handed out.
pub fn resolve(id: usize) -> Option<String> {
    INTERNER.read().unwrap().get(id).map(|a| a.to_string())
}

/// Number of unique strings interned so far.
pub fn interned_count() -> usize {
    INTERNER.read().unwrap().len()
}
