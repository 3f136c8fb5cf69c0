//! Forward-only cursor over query results.
//!
//! The underlying store hands out a release callback with every result set;
//! the cursor runs it when dropped, so the handle is returned on every exit
//! path, including early `break` and `?`.

use scopeguard::ScopeGuard;

type Release = ScopeGuard<(), Box<dyn FnOnce(()) + Send>>;

pub struct Cursor<T> {
    rows: std::vec::IntoIter<T>,
    _release: Release,
}

impl<T> Cursor<T> {
    pub(crate) fn new(rows: Vec<T>, release: impl FnOnce() + Send + 'static) -> Self {
        let release: Box<dyn FnOnce(()) + Send> = Box::new(move |()| release());
        Cursor { rows: rows.into_iter(), _release: scopeguard::guard((), release) }
    }

    /// Rows remaining in the cursor.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl<T> Iterator for Cursor<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<T> std::fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor").field("remaining", &self.rows.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn release_runs_when_cursor_is_exhausted() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&released);
        let cursor = Cursor::new(vec![1, 2, 3], move || flag.store(true, Ordering::SeqCst));

        let collected: Vec<i32> = cursor.collect();
        assert_eq!(collected, vec![1, 2, 3]);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn release_runs_on_early_break() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&released);

        {
            let cursor = Cursor::new(vec![1, 2, 3], move || flag.store(true, Ordering::SeqCst));
            for row in cursor {
                if row == 2 {
                    break;
                }
            }
        }

        assert!(released.load(Ordering::SeqCst));
    }
}
