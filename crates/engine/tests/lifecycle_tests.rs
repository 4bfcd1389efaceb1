//! Hook, Wrap Chain and Plugin Lifecycle Tests
//!
//! Validates the order in which suite hooks, test hooks, step hooks, wraps
//! and sinks fire when a case runs, and that after-hooks survive failures.

use axiom_core::{Artefact, Assert, Log, LogLevel, Meta};
use axiom_engine::{Case, CaseStatus, Config, Hooks, LocalHost, Provided, Runner};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

type Trace = Arc<Mutex<Vec<String>>>;

fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

fn push(t: &Trace, entry: impl Into<String>) {
    t.lock().push(entry.into());
}

/// Plugin registering a test wrap that records entry and exit
fn wrap_plugin(t: &Trace, label: &'static str) -> impl Fn(&Config) + Send + Sync + 'static {
    let t = Arc::clone(t);
    move |cfg: &Config| {
        let t = Arc::clone(&t);
        cfg.runtime_mut().emit_test_wrap(move |next| {
            let t = Arc::clone(&t);
            Box::new(move |cfg: &Config| {
                push(&t, format!("{}-before", label));
                next(cfg);
                push(&t, format!("{}-after", label));
            })
        });
    }
}

// ============================================================================
// Wrap chain
// ============================================================================

mod wraps {
    use super::*;

    #[test]
    fn test_first_registered_wrap_is_outermost() {
        let t = trace();
        let runner = Runner::builder().plugin(wrap_plugin(&t, "w1")).build();
        let case = Case::new("ordered").plugin(wrap_plugin(&t, "w2"));
        let host = LocalHost::new();

        let body = Arc::clone(&t);
        runner.run_case(&host, &case, move |_| push(&body, "action"));

        assert_eq!(
            *t.lock(),
            vec!["w1-before", "w2-before", "action", "w2-after", "w1-after"]
        );
    }

    #[test]
    fn test_step_wrap_sees_step_names() {
        let t = trace();
        let plugin_trace = Arc::clone(&t);
        let case = Case::new("steps").plugin(move |cfg: &Config| {
            let t = Arc::clone(&plugin_trace);
            cfg.runtime_mut().emit_step_wrap(move |name, next| {
                push(&t, format!("step:{}", name));
                next
            });
        });
        let host = LocalHost::new();

        Runner::builder().build().run_case(&host, &case, |cfg| {
            cfg.step("open", || {});
            cfg.setup("seed", || {});
            cfg.step("close", || {});
        });

        assert_eq!(*t.lock(), vec!["step:open", "step:close"]);
    }

    #[test]
    fn test_plugins_reapplied_on_every_attempt() {
        let applied = Arc::new(AtomicU32::new(0));
        let a = Arc::clone(&applied);
        let case = Case::new("twice")
            .retry(axiom_core::Retry::new().times(2))
            .plugin(move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            });
        let host = LocalHost::new();

        let outcome = Runner::builder().build().run_case(&host, &case, |cfg| {
            if cfg.attempt() == 1 {
                cfg.fail("again");
            }
        });

        assert_eq!(outcome.status, CaseStatus::Flaky);
        // Base config plus one per attempt
        assert_eq!(applied.load(Ordering::SeqCst), 3);
    }
}

// ============================================================================
// Hooks
// ============================================================================

mod hooks {
    use super::*;

    #[test]
    fn test_full_hook_order() {
        let t = trace();
        let (a, b, c, d, e, f) = (
            Arc::clone(&t),
            Arc::clone(&t),
            Arc::clone(&t),
            Arc::clone(&t),
            Arc::clone(&t),
            Arc::clone(&t),
        );
        let runner = Runner::builder()
            .before_all(move |_| push(&a, "before-all"))
            .after_all(move |_| push(&b, "after-all"))
            .hooks(
                Hooks::new()
                    .before_test(move |cfg| push(&c, format!("before-test:{}", cfg.name)))
                    .after_test(move |cfg| push(&d, format!("after-test:{}", cfg.name))),
            )
            .build();
        let case = Case::new("t1").hooks(
            Hooks::new()
                .before_step(move |_, name| push(&e, format!("before-step:{}", name)))
                .after_step(move |_, name| push(&f, format!("after-step:{}", name))),
        );
        let host = LocalHost::new();

        let body = Arc::clone(&t);
        runner.run_case(&host, &case, move |cfg| {
            cfg.step("s1", || push(&body, "s1"));
        });
        host.finish();

        assert_eq!(
            *t.lock(),
            vec![
                "before-all",
                "before-test:t1",
                "before-step:s1",
                "s1",
                "after-step:s1",
                "after-test:t1",
                "after-all",
            ]
        );
    }

    #[test]
    fn test_suite_hooks_run_once_across_cases() {
        let before = Arc::new(AtomicU32::new(0));
        let after = Arc::new(AtomicU32::new(0));
        let (b, a) = (Arc::clone(&before), Arc::clone(&after));
        let runner = Runner::builder()
            .before_all(move |_| {
                b.fetch_add(1, Ordering::SeqCst);
            })
            .after_all(move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        let host = LocalHost::new();

        for name in ["a", "b", "c"] {
            runner.run_case(&host, &Case::new(name), |_| {});
        }
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 0);
        assert_eq!(host.deferred_len(), 1);

        host.finish();
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_independent_runners_have_independent_gates() {
        let hits = Arc::new(AtomicU32::new(0));
        let host = LocalHost::new();
        for _ in 0..2 {
            let h = Arc::clone(&hits);
            let runner = Runner::builder()
                .before_all(move |_| {
                    h.fetch_add(1, Ordering::SeqCst);
                })
                .build();
            runner.run_case(&host, &Case::new("x"), |_| {});
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_before_all_runs_once_and_still_registers_finish() {
        let before = Arc::new(AtomicU32::new(0));
        let after = Arc::new(AtomicU32::new(0));
        let (b, a) = (Arc::clone(&before), Arc::clone(&after));
        let runner = Runner::builder()
            .before_all(move |_| {
                b.fetch_add(1, Ordering::SeqCst);
                panic!("suite setup failed");
            })
            .after_all(move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        let host = LocalHost::new();

        let first = panic::catch_unwind(AssertUnwindSafe(|| {
            runner.run_case(&host, &Case::new("first"), |_| {})
        }));
        assert!(first.is_err());

        for name in ["second", "third"] {
            let outcome = runner.run_case(&host, &Case::new(name), |_| {});
            assert_eq!(outcome.status, CaseStatus::Passed);
        }

        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(host.deferred_len(), 1);

        host.finish();
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_joined_runner_does_not_inherit_resource_cleanups() {
        let cleaned = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&cleaned);
        let base = Runner::builder()
            .resource("db", move |_| {
                let c = Arc::clone(&c);
                Ok(Provided::new("conn".to_string()).with_cleanup(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                }))
            })
            .build();
        base.resource::<String>("db").unwrap();

        let derived = base.join(&Runner::builder().build());
        assert!(derived.hooks().after_all.is_empty());
        assert_eq!(derived.pending_cleanups(), 0);

        derived.finish();
        assert_eq!(cleaned.load(Ordering::SeqCst), 0, "base resource still live");

        // The derived runner resolves its own instance and owns its cleanup
        derived.resource::<String>("db").unwrap();
        assert_eq!(derived.pending_cleanups(), 1);

        base.finish();
        assert_eq!(cleaned.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_after_test_runs_when_body_panics() {
        let after = Arc::new(AtomicU32::new(0));
        let a = Arc::clone(&after);
        let case = Case::new("crash").hooks(Hooks::new().after_test(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        }));
        let host = LocalHost::new();

        let outcome = Runner::builder()
            .build()
            .run_case(&host, &case, |_| panic!("boom"));

        assert_eq!(outcome.status, CaseStatus::Failed);
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_step_panic_reported_against_step() {
        let host = LocalHost::new();
        let reached = Arc::new(AtomicU32::new(0));
        let r = Arc::clone(&reached);

        let outcome = Runner::builder()
            .build()
            .run_case(&host, &Case::new("stepper"), move |cfg| {
                cfg.step("checkout", || panic!("card declined"));
                r.fetch_add(1, Ordering::SeqCst);
            });

        assert_eq!(outcome.status, CaseStatus::Failed);
        assert_eq!(reached.load(Ordering::SeqCst), 1, "test continues after a step panic");
        let failure = &host.runs()[0].failures[0];
        assert!(failure.contains("step \"checkout\""));
        assert!(failure.contains("card declined"));
    }

    #[test]
    fn test_after_test_hook_sees_attempt_status() {
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&statuses);
        let stats_plugin = move |cfg: &Config| {
            let s = Arc::clone(&s);
            cfg.hooks_mut().add_after_test(move |cfg| {
                s.lock().push((cfg.attempt(), cfg.attempt_status()));
            });
        };
        let runner = Runner::builder().plugin(stats_plugin).build();
        let case = Case::new("flip").retry(axiom_core::Retry::new().times(3));
        let host = LocalHost::new();

        runner.run_case(&host, &case, |cfg| {
            if cfg.attempt() < 2 {
                cfg.fail("not yet");
            }
        });

        assert_eq!(
            *statuses.lock(),
            vec![(1, CaseStatus::Failed), (2, CaseStatus::Flaky)]
        );
    }
}

// ============================================================================
// Sinks and merged context
// ============================================================================

mod sinks {
    use super::*;

    #[test]
    fn test_records_reach_every_sink() {
        let t = trace();
        let sink_trace = Arc::clone(&t);
        let collector = move |cfg: &Config| {
            let mut rt = cfg.runtime_mut();
            let (l, a, f) = (
                Arc::clone(&sink_trace),
                Arc::clone(&sink_trace),
                Arc::clone(&sink_trace),
            );
            rt.emit_log_sink(move |log: &Log| push(&l, format!("log:{:?}:{}", log.level, log.text)));
            rt.emit_assert_sink(move |assert: &Assert| push(&a, format!("assert:{}", assert.message)));
            rt.emit_artefact_sink(move |art: &Artefact| push(&f, format!("artefact:{}", art.name)));
        };
        let host = LocalHost::new();

        Runner::builder()
            .plugin(collector)
            .build()
            .run_case(&host, &Case::new("records"), |cfg| {
                cfg.log(Log::warning("slow response"));
                cfg.assert(Assert::equal(200, 200, "status code"));
                cfg.artefact(Artefact::text("response.txt", "ok"));
            });

        assert_eq!(
            *t.lock(),
            vec![
                format!("log:{:?}:slow response", LogLevel::Warning),
                "assert:status code".to_string(),
                "artefact:response.txt".to_string(),
            ]
        );
    }

    #[test]
    fn test_config_sees_merged_meta_and_params() {
        let runner = Runner::builder()
            .meta(Meta::new().epic("billing").tag("suite"))
            .build();
        let case = Case::new("invoice")
            .id("INV-7")
            .meta(Meta::new().feature("pdf").tag("case"))
            .params(("EUR", 42u32));
        let host = LocalHost::new();

        let outcome = runner.run_case(&host, &case, |cfg| {
            assert_eq!(cfg.id, "INV-7");
            assert_eq!(cfg.meta.epic, "billing");
            assert_eq!(cfg.meta.feature, "pdf");
            assert_eq!(cfg.meta.tags, vec!["suite", "case"]);
            let (currency, amount) = cfg.params::<(&str, u32)>().unwrap();
            assert_eq!((*currency, *amount), ("EUR", 42));
        });

        assert_eq!(outcome.status, CaseStatus::Passed);
        assert_eq!(outcome.id, "INV-7");
    }

    #[test]
    fn test_parallel_case_marked_on_host() {
        let host = LocalHost::new();
        Runner::builder()
            .build()
            .run_case(&host, &Case::new("par").parallel(), |_| {});
        Runner::builder()
            .build()
            .run_case(&host, &Case::new("seq"), |_| {});
        assert_eq!(host.parallel_marks(), vec!["par"]);
    }
}
