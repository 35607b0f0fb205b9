//! Repository layer: table-scoped database operations.
//!
//! Plain functions over a borrowed `Connection`; no business rules live here.
//! All public functions are re-exported for callers.

mod appointment;
mod doctor;
mod identity;
mod patient;
mod treatment;

pub use appointment::*;
pub use doctor::*;
pub use identity::*;
pub use patient::*;
pub use treatment::*;

/// Build a `LIKE ... ESCAPE '\'` pattern matching `query` as a literal substring.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
