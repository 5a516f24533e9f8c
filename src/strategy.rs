/// A single lookup strategy: returns `Some` when it found what it was after
pub type Strategy<'a, I, T> = Box<dyn Fn(&I) -> Option<T> + 'a>;

/// Ordered list of interchangeable lookups over the same input.
///
/// Strategies are tried in insertion order and the first one that returns
/// `Some` wins; the rest are not evaluated.
pub struct Prioritized<'a, I: ?Sized, T> {
    name: &'static str,
    strategies: Vec<(&'static str, Strategy<'a, I, T>)>,
}

impl<'a, I: ?Sized, T> Prioritized<'a, I, T> {
    /// Create an empty list; `name` only shows up in logs
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            strategies: Vec::new(),
        }
    }

    /// Append a strategy with the lowest priority so far
    pub fn then<F>(mut self, label: &'static str, strategy: F) -> Self
    where
        F: Fn(&I) -> Option<T> + 'a,
    {
        self.strategies.push((label, Box::new(strategy)));
        self
    }

    /// Number of registered strategies
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run strategies in order and return the first hit
    pub fn first(&self, input: &I) -> Option<T> {
        for (label, strategy) in &self.strategies {
            if let Some(found) = strategy(input) {
                ::log::debug!("{}: strategy '{}' matched", self.name, label);
                return Some(found);
            }
            ::log::trace!("{}: strategy '{}' found nothing", self.name, label);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_first_success_wins() {
        let chain = Prioritized::<str, usize>::new("test")
            .then("none", |_| None)
            .then("len", |s| Some(s.len()))
            .then("const", |_| Some(99));
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.first("abcd"), Some(4));
    }

    #[test]
    fn test_later_strategies_not_evaluated() {
        let calls = Cell::new(0);
        let chain = Prioritized::<i32, i32>::new("test")
            .then("double", |n| Some(n * 2))
            .then("counted", |_| {
                calls.set(calls.get() + 1);
                Some(0)
            });
        assert_eq!(chain.first(&21), Some(42));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_empty_or_exhausted_chain() {
        let empty = Prioritized::<str, String>::new("empty");
        assert!(empty.is_empty());
        assert_eq!(empty.first("x"), None);

        let misses = Prioritized::<str, String>::new("misses")
            .then("a", |_| None)
            .then("b", |_| None);
        assert_eq!(misses.first("x"), None);
    }
}
