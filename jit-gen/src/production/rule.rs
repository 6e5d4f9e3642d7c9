use crate::context::Context;
use crate::production::{ProductionFailed, ProductionResult};
use rand::prelude::SliceRandom;
use rand::Rng;

type Factory<'a, T> = Box<dyn FnOnce(&mut Context) -> ProductionResult<T> + 'a>;

struct Variant<'a, T> {
    name: String,
    weight: f64,
    factory: Factory<'a, T>,
}

/// Weighted choice between alternative productions of the same thing.
///
/// Variants are tried in random order, biased by weight, until one succeeds. Each variant runs
/// inside [`Context::attempt`], so a failed variant leaves no trace behind.
pub struct Rule<'a, T> {
    name: &'static str,
    variants: Vec<Variant<'a, T>>,
    attempt_limit: Option<usize>,
}

impl<'a, T> Rule<'a, T> {
    pub fn new(name: &'static str) -> Rule<'a, T> {
        Rule {
            name,
            variants: vec![],
            attempt_limit: None,
        }
    }

    /// Adds a variant. Variants without a positive weight are never tried.
    pub fn variant<S, F>(mut self, name: S, weight: f64, factory: F) -> Rule<'a, T>
    where
        S: Into<String>,
        F: FnOnce(&mut Context) -> ProductionResult<T> + 'a,
    {
        self.add(name, weight, factory);
        self
    }

    pub fn add<S, F>(&mut self, name: S, weight: f64, factory: F)
    where
        S: Into<String>,
        F: FnOnce(&mut Context) -> ProductionResult<T> + 'a,
    {
        if weight > 0.0 {
            self.variants.push(Variant {
                name: name.into(),
                weight,
                factory: Box::new(factory),
            });
        }
    }

    /// Gives up after `limit` failed variants.
    pub fn with_attempt_limit(mut self, limit: usize) -> Rule<'a, T> {
        self.attempt_limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn produce(mut self, ctx: &mut Context) -> ProductionResult<T> {
        if self.variants.is_empty() {
            return Err(ProductionFailed::new(format!("{} has no variants", self.name)));
        }
        self.variants.sort_by(|a, b| a.name.cmp(&b.name));
        self.variants.shuffle(&mut ctx.rng);
        let mut failures = 0;
        while !self.variants.is_empty() && self.attempt_limit != Some(0) {
            let index = self.draw(ctx);
            let Variant { name, factory, .. } = self.variants.remove(index);
            match ctx.attempt(factory) {
                Ok(res) => {
                    tracing::trace!(rule = self.name, variant = %name, "Produced");
                    ctx.statistics.record_success(self.name, &name);
                    return Ok(res);
                }
                Err(err) => {
                    failures += 1;
                    tracing::trace!(rule = self.name, variant = %name, reason = %err.0, "Failed");
                    ctx.statistics.record_failure(self.name, &name, failures);
                    if let Some(limit) = self.attempt_limit.as_mut() {
                        *limit -= 1;
                    }
                }
            }
        }
        Err(ProductionFailed::new(format!("{} exhausted", self.name)))
    }

    fn draw(&self, ctx: &mut Context) -> usize {
        let total: f64 = self.variants.iter().map(|variant| variant.weight).sum();
        let target = ctx.rng.gen_range(0.0..total);
        let mut acc = 0.0;
        self.variants
            .iter()
            .position(|variant| {
                acc += variant.weight;
                acc >= target
            })
            .unwrap_or(self.variants.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ExternalSymbols;
    use crate::policy::Policy;
    use crate::ty::env::TypeEnvironment;
    use std::cell::RefCell;

    fn ctx() -> Context {
        Context::with_policy(
            11,
            &Policy::default(),
            TypeEnvironment::default(),
            ExternalSymbols::default(),
        )
    }

    #[test]
    fn empty_rule_fails() {
        let rule: Rule<()> = Rule::new("empty");
        assert!(rule.produce(&mut ctx()).is_err());
    }

    #[test]
    fn non_positive_weights_are_skipped() {
        let rule: Rule<()> = Rule::new("weights")
            .variant("zero", 0.0, |_| Ok(()))
            .variant("negative", -1.0, |_| Ok(()));
        assert!(rule.is_empty());
    }

    #[test]
    fn every_failing_variant_is_tried_once() {
        let calls = RefCell::new(vec![]);
        let mut rule: Rule<()> = Rule::new("failing");
        for name in ["a", "b", "c", "d"] {
            let calls = &calls;
            rule.add(name, 1.0, move |_| {
                calls.borrow_mut().push(name);
                Err(ProductionFailed::new(name))
            });
        }
        let mut ctx = ctx();
        assert!(rule.produce(&mut ctx).is_err());
        let mut calls = calls.into_inner();
        calls.sort_unstable();
        assert_eq!(calls, vec!["a", "b", "c", "d"]);
        assert_eq!(ctx.statistics.total_failures(), 4);
        assert_eq!(ctx.statistics.max_failed_attempts, 4);
    }

    #[test]
    fn success_short_circuits() {
        let calls = RefCell::new(0);
        let rule: Rule<usize> = Rule::new("mixed")
            .variant("fail", 1.0, |_| {
                *calls.borrow_mut() += 1;
                Err(ProductionFailed::new("fail"))
            })
            .variant("ok_1", 1.0, |_| {
                *calls.borrow_mut() += 1;
                Ok(1)
            })
            .variant("ok_2", 1.0, |_| {
                *calls.borrow_mut() += 1;
                Ok(2)
            });
        let res = rule.produce(&mut ctx()).unwrap();
        assert!(res == 1 || res == 2);
        assert!(*calls.borrow() <= 2);
    }

    #[test]
    fn attempt_limit_bounds_failures() {
        let calls = RefCell::new(0);
        let mut rule: Rule<()> = Rule::new("limited").with_attempt_limit(2);
        for name in ["a", "b", "c", "d"] {
            let calls = &calls;
            rule.add(name, 1.0, move |_| {
                *calls.borrow_mut() += 1;
                Err(ProductionFailed::new(name))
            });
        }
        assert!(rule.produce(&mut ctx()).is_err());
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn choice_is_deterministic_for_a_seed() {
        let pick = || {
            let mut rule: Rule<&str> = Rule::new("pick");
            for name in ["a", "b", "c", "d", "e"] {
                rule.add(name, 1.0, move |_| Ok(name));
            }
            rule.produce(&mut ctx()).unwrap()
        };
        assert_eq!(pick(), pick());
    }
}
