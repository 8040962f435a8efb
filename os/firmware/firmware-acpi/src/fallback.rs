//! # Ordered fallback chains
//!
//! Discovery is a list of independent strategies tried once each, strictly in
//! order. The first success wins; failures are collected and only surface if
//! every strategy fails.

use log::debug;

use crate::error::{Error, Result};

/// A named strategy producing `T`.
pub type Strategy<'a, T> = Box<dyn Fn() -> Result<T> + 'a>;

/// Run `strategies` in order and return the first success with its name.
///
/// # Errors
/// Every failure, each wrapped as [`Error::StrategyFailed`], in the order
/// they happened. Empty input yields an empty list.
pub fn first_ok<'s, T, F>(
    strategies: impl IntoIterator<Item = (&'s str, F)>,
) -> Result<(&'s str, T), Vec<Error>>
where
    F: FnOnce() -> Result<T>,
{
    let mut failures = Vec::new();
    for (name, run) in strategies {
        match run() {
            Ok(v) => return Ok((name, v)),
            Err(e) => {
                debug!("{name}: {e}");
                failures.push(Error::StrategyFailed {
                    name: name.to_owned(),
                    source: Box::new(e),
                });
            }
        }
    }
    Err(failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn first_success_short_circuits() {
        let calls = Cell::new(0);
        let attempt = |r: Result<u32>| {
            calls.set(calls.get() + 1);
            r
        };
        let strategies: [(&str, Strategy<'_, u32>); 3] = [
            ("a", Box::new(|| attempt(Err(Error::Empty)))),
            ("b", Box::new(|| attempt(Ok(2)))),
            ("c", Box::new(|| attempt(Ok(3)))),
        ];
        let out = first_ok(strategies);
        assert_eq!(out.unwrap(), ("b", 2));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn collects_every_failure_in_order() {
        let strategies: [(&str, Strategy<'_, ()>); 2] = [
            ("x", Box::new(|| Err(Error::Empty))),
            ("y", Box::new(|| Err(Error::TooShort { need: 1, got: 0 }))),
        ];
        let out = first_ok(strategies);
        let failures = out.unwrap_err();
        let names: Vec<_> = failures
            .iter()
            .map(|e| match e {
                Error::StrategyFailed { name, .. } => name.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(names, ["x", "y"]);
    }
}
