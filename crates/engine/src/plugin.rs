//! Plugins and the built-in eager-resolution helpers
//!
//! A plugin is invoked once per [`Config`] (runner plugins first, then case
//! plugins) and may only register hooks, wraps and sinks on it.

use crate::config::Config;
use crate::runner::Runner;
use std::sync::Arc;
use tracing::warn;

/// Callback that decorates a config
pub type Plugin = Arc<dyn Fn(&Config) + Send + Sync>;

/// Plugin resolving the named fixtures before the test body runs
///
/// A fixture that fails to resolve aborts the test with the error message.
pub fn use_fixtures<I, S>(names: I) -> impl Fn(&Config) + Send + Sync + 'static
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: Arc<[String]> = names.into_iter().map(Into::into).collect();
    move |cfg: &Config| {
        let names = Arc::clone(&names);
        cfg.hooks_mut().add_before_test(move |cfg| {
            for name in names.iter() {
                if let Err(e) = cfg.fixture_value(name) {
                    cfg.fatal(e.to_string());
                }
            }
        });
    }
}

/// Before-all hook resolving the named resources when the suite starts
///
/// Failures are logged and left for the first test that needs the resource
/// to report, since no test is running yet.
pub fn use_resources<I, S>(names: I) -> impl Fn(&Runner) + Send + Sync + 'static
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    move |runner: &Runner| {
        for name in &names {
            if let Err(e) = runner.resource_value(name) {
                warn!(target: "axiom::runner", resource = %name, error = %e, "Eager resource resolution failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::Case;
    use crate::registry::Provided;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_use_fixtures_resolves_before_body() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let case = Arc::new(
            Case::new("eager")
                .fixture("db", move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(Provided::new(1u32))
                })
                .plugin(use_fixtures(["db"])),
        );
        let cfg = Runner::builder().build().build_config(&case, 1);
        cfg.apply_plugins();

        let seen_in_body = AtomicUsize::new(0);
        cfg.test(|c| {
            seen_in_body.store(calls.load(Ordering::SeqCst), Ordering::SeqCst);
            assert!(c.fixtures().cache().is_cached("db"));
        });
        assert_eq!(seen_in_body.load(Ordering::SeqCst), 1);
        assert!(!cfg.failed());
    }

    #[test]
    fn test_use_fixtures_missing_name_fails_test() {
        let case = Arc::new(Case::new("eager").plugin(use_fixtures(vec!["ghost".to_string()])));
        let cfg = Runner::builder().build().build_config(&case, 1);
        cfg.apply_plugins();

        let ran = AtomicUsize::new(0);
        cfg.test(|_| {
            ran.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(cfg.failures()[0].contains("ghost"));
    }

    #[test]
    fn test_use_resources_as_before_all() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let runner = Runner::builder()
            .resource("pool", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(Provided::new("pool".to_string()))
            })
            .before_all(use_resources(["pool", "missing"]))
            .build();

        runner.apply_start();
        runner.apply_start();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(runner.resources().cache().is_cached("pool"));
    }
}
