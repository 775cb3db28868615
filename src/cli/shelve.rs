//! Shelf commands: list, shelve, unshelve and remove
//!
//! Every command takes its positional arguments raw and checks their count
//! itself, so usage errors are reported the same way for all verbs. The
//! registry is enumerated afresh on each call.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::list::{self, DiffstatRenderer};
use super::log_message::{self, MessageSource};
use super::output::{Output, OutputNotifier};
use crate::domain::{is_url, normalize, strip_peg_revision, Depth, Registry, ShelfName};
use crate::storage::{NoopNotifier, Notify, ShelfStore, ShelveRequest};

#[derive(Debug, Error, PartialEq)]
pub enum UsageError {
    #[error("'{verb}' takes {expected} argument(s) but {found} were given")]
    ArgumentCount {
        verb: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Not enough arguments provided: {0}")]
    InsufficientArguments(&'static str),

    #[error("'{0}' is not a local path")]
    InvalidTarget(String),
}

/// Flags for `shelve`
#[derive(Debug, Clone, Default)]
pub struct ShelveOptions {
    pub depth: Option<Depth>,
    pub changelists: Vec<String>,
    pub keep_local: bool,
    pub dry_run: bool,
    pub quiet: bool,
}

/// Flags for `unshelve`
#[derive(Debug, Clone, Copy, Default)]
pub struct UnshelveOptions {
    pub keep_local: bool,
    pub dry_run: bool,
    pub quiet: bool,
}

/// Runs shelf commands against one store
pub struct ShelfCommands<'a> {
    store: &'a dyn ShelfStore,
    output: &'a Output,
    diffstat: &'a dyn DiffstatRenderer,
    cwd: PathBuf,
    now: DateTime<Utc>,
}

impl<'a> ShelfCommands<'a> {
    /// `cwd` is the directory relative targets are resolved against
    pub fn new(
        store: &'a dyn ShelfStore,
        output: &'a Output,
        diffstat: &'a dyn DiffstatRenderer,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            output,
            diffstat,
            cwd: cwd.into(),
            now: Utc::now(),
        }
    }

    /// Uses a fixed "now" for age computation
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    fn registry(&self) -> Result<Registry> {
        let registry = Registry::from_artifacts(self.store.enumerate()?);
        self.output.verbose_ctx(
            "registry",
            &format!("{} shelf(s) in {}", registry.len(), self.store.root().display()),
        );
        Ok(registry)
    }

    fn notifier<'o>(&'o self, printer: &'o OutputNotifier<'o>, quiet: bool) -> &'o dyn Notify {
        if quiet {
            &NoopNotifier
        } else {
            printer
        }
    }

    /// Lists all shelves oldest first. `verb` names the command in errors.
    pub fn list(&self, verb: &'static str, args: &[String], show_diffstat: bool) -> Result<()> {
        expect_count(verb, args, 0)?;

        let registry = self.registry()?;
        let ordered = registry.ordered_by_age();
        let diffstat = show_diffstat.then_some(self.diffstat);

        list::render(self.output, &ordered, self.now, diffstat);
        Ok(())
    }

    /// Read-only listing with diffstat always on
    pub fn shelves(&self, args: &[String]) -> Result<()> {
        self.list("shelves", args, true)
    }

    /// Shelves local edits under the name given as first argument; the
    /// remaining arguments are the targets.
    pub fn shelve(
        &self,
        args: &[String],
        opts: &ShelveOptions,
        message: Option<&MessageSource>,
    ) -> Result<()> {
        let (name, rest) = split_name("shelve", args)?;

        // Unlike most commands there is no implicit "." target
        if rest.is_empty() {
            return Err(
                UsageError::InsufficientArguments("at least one path to shelve is required").into(),
            );
        }

        if let Some(url) = rest.iter().find(|t| is_url(t)) {
            return Err(UsageError::InvalidTarget(url.clone()).into());
        }

        let depth = opts.depth.unwrap_or_default();
        let targets: Vec<PathBuf> = rest
            .iter()
            .map(|t| normalize(&self.cwd.join(strip_peg_revision(t))))
            .collect();

        self.output.verbose_ctx(
            "shelve",
            &format!(
                "name={}, targets={:?}, depth={}, changelists={:?}, keep_local={}, dry_run={}",
                name, targets, depth, opts.changelists, opts.keep_local, opts.dry_run
            ),
        );

        let printer = OutputNotifier(self.output);
        let notify = self.notifier(&printer, opts.quiet);

        log_message::scoped(message, |message| {
            let request = ShelveRequest {
                name: &name,
                targets: &targets,
                depth,
                changelists: &opts.changelists,
                message,
                keep_local: opts.keep_local,
                dry_run: opts.dry_run,
            };
            self.store.create_or_update(&request, notify)
        })?;

        if !opts.quiet {
            self.output.success(&format!("shelved '{}'", name));
        }

        Ok(())
    }

    /// Applies the named shelf, or the youngest one when no name is given
    pub fn unshelve(&self, args: &[String], opts: UnshelveOptions) -> Result<()> {
        let name = match args {
            [] => {
                let registry = self.registry()?;
                let name = registry.youngest()?.name.clone();
                self.output
                    .line(&format!("unshelving the youngest change, '{}'", name));
                name
            }
            _ => {
                expect_count("unshelve", args, 1)?;
                args[0].parse::<ShelfName>()?
            }
        };

        self.output.verbose_ctx(
            "unshelve",
            &format!(
                "name={}, keep_local={}, dry_run={}",
                name, opts.keep_local, opts.dry_run
            ),
        );

        let printer = OutputNotifier(self.output);
        let notify = self.notifier(&printer, opts.quiet);

        self.store
            .apply(&name, opts.keep_local, opts.dry_run, notify)?;

        if !opts.quiet {
            self.output.success(&format!("unshelved '{}'", name));
        }

        Ok(())
    }

    /// Deletes the named shelf
    pub fn remove(&self, args: &[String], dry_run: bool, quiet: bool) -> Result<()> {
        expect_count("remove", args, 1)?;
        let name: ShelfName = args[0].parse()?;

        self.output
            .verbose_ctx("remove", &format!("name={}, dry_run={}", name, dry_run));

        self.store.delete(&name, dry_run)?;

        if !quiet {
            self.output.success(&format!("deleted '{}'", name));
        }

        Ok(())
    }
}

fn expect_count(verb: &'static str, args: &[String], expected: usize) -> Result<(), UsageError> {
    if args.len() != expected {
        return Err(UsageError::ArgumentCount {
            verb,
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

/// Takes the shelf name off the front of `args`
fn split_name<'s>(verb: &'static str, args: &'s [String]) -> Result<(ShelfName, &'s [String])> {
    let Some((first, rest)) = args.split_first() else {
        return Err(UsageError::ArgumentCount {
            verb,
            expected: 1,
            found: 0,
        }
        .into());
    };

    Ok((first.parse()?, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::output::{Captured, OutputFormat};
    use crate::domain::{NameError, RegistryError, ShelfInfo};
    use crate::storage::{Notification, NotifyAction};
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create {
            name: String,
            targets: Vec<PathBuf>,
            depth: Depth,
            changelists: Vec<String>,
            message: Option<String>,
            keep_local: bool,
            dry_run: bool,
        },
        Apply {
            name: String,
            keep_local: bool,
            dry_run: bool,
        },
        Delete {
            name: String,
            dry_run: bool,
        },
    }

    /// In-memory store that records every mutating call
    #[derive(Default)]
    struct MockStore {
        shelves: RefCell<HashMap<String, ShelfInfo>>,
        calls: RefCell<Vec<Call>>,
        fail_with: Option<&'static str>,
    }

    impl MockStore {
        fn with(entries: &[(&str, i64)]) -> Self {
            let store = Self::default();
            for (name, secs) in entries {
                store.shelves.borrow_mut().insert(
                    format!("{}.patch", name),
                    ShelfInfo {
                        patch_path: PathBuf::from(format!("/shelves/{}.patch", name)),
                        modified: Utc.timestamp_opt(*secs, 0).unwrap(),
                        message: format!("{} message", name),
                        size_bytes: 100,
                    },
                );
            }
            store
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        fn outcome(&self) -> Result<()> {
            match self.fail_with {
                Some(msg) => Err(anyhow::anyhow!(msg)),
                None => Ok(()),
            }
        }
    }

    impl ShelfStore for MockStore {
        fn root(&self) -> &Path {
            Path::new("/wc")
        }

        fn enumerate(&self) -> Result<HashMap<String, ShelfInfo>> {
            Ok(self.shelves.borrow().clone())
        }

        fn create_or_update(&self, request: &ShelveRequest<'_>, notify: &dyn Notify) -> Result<()> {
            self.calls.borrow_mut().push(Call::Create {
                name: request.name.to_string(),
                targets: request.targets.to_vec(),
                depth: request.depth,
                changelists: request.changelists.to_vec(),
                message: request.message.map(str::to_string),
                keep_local: request.keep_local,
                dry_run: request.dry_run,
            });
            notify.notify(&Notification::new(NotifyAction::Shelved, "a.txt"));
            self.outcome()
        }

        fn apply(
            &self,
            name: &ShelfName,
            keep_local: bool,
            dry_run: bool,
            notify: &dyn Notify,
        ) -> Result<()> {
            self.calls.borrow_mut().push(Call::Apply {
                name: name.to_string(),
                keep_local,
                dry_run,
            });
            notify.notify(&Notification::new(NotifyAction::Applied, "a.txt"));
            self.outcome()
        }

        fn delete(&self, name: &ShelfName, dry_run: bool) -> Result<()> {
            self.calls.borrow_mut().push(Call::Delete {
                name: name.to_string(),
                dry_run,
            });
            if !dry_run {
                self.shelves
                    .borrow_mut()
                    .remove(&format!("{}.patch", name));
            }
            self.outcome()
        }
    }

    struct NoDiffstat;

    impl DiffstatRenderer for NoDiffstat {
        fn render(&self, _patch: &Path) -> Option<String> {
            None
        }
    }

    struct Harness {
        output: Output,
        captured: Captured,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_format(OutputFormat::Text)
        }

        fn with_format(format: OutputFormat) -> Self {
            let (output, captured) = Output::captured(format);
            Self { output, captured }
        }

        fn commands<'a>(&'a self, store: &'a MockStore) -> ShelfCommands<'a> {
            ShelfCommands::new(store, &self.output, &NoDiffstat, "/wc/sub")
                .at(Utc.timestamp_opt(600, 0).unwrap())
        }

        fn text(&self) -> String {
            self.captured.contents()
        }
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn usage(err: &anyhow::Error) -> Option<&UsageError> {
        err.downcast_ref::<UsageError>()
    }

    #[test]
    fn list_renders_oldest_first() {
        let store = MockStore::with(&[("wip2", 200), ("wip1", 100)]);
        let h = Harness::new();

        h.commands(&store).list("shelve", &[], false).unwrap();

        let text = h.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("wip1 "));
        assert!(lines[0].contains("8 mins old"));
        assert_eq!(lines[1], " wip1 message");
        assert!(lines[2].starts_with("wip2 "));
        assert!(lines[2].contains("6 mins old"));
    }

    #[test]
    fn list_line_count_ignores_diffstat_flag() {
        let store = MockStore::with(&[("a", 1), ("b", 2)]);
        let h = Harness::new();

        h.commands(&store).shelves(&[]).unwrap();

        let text = h.text();
        let non_blank = text.lines().filter(|l| !l.is_empty()).count();
        assert_eq!(non_blank, 4);
    }

    #[test]
    fn list_rejects_stray_arguments() {
        let store = MockStore::with(&[]);
        let h = Harness::new();

        let err = h.commands(&store).shelves(&args(&["extra"])).unwrap_err();

        assert_eq!(
            usage(&err),
            Some(&UsageError::ArgumentCount {
                verb: "shelves",
                expected: 0,
                found: 1
            })
        );
    }

    #[test]
    fn shelve_forwards_request() {
        let store = MockStore::default();
        let h = Harness::new();
        let opts = ShelveOptions {
            depth: None,
            changelists: vec!["feature".to_string()],
            keep_local: true,
            dry_run: true,
            quiet: false,
        };
        let message = MessageSource::Inline("wip message".to_string());

        h.commands(&store)
            .shelve(&args(&["foo", "a.txt@HEAD", "../lib"]), &opts, Some(&message))
            .unwrap();

        assert_eq!(
            store.calls(),
            vec![Call::Create {
                name: "foo".to_string(),
                targets: vec![PathBuf::from("/wc/sub/a.txt"), PathBuf::from("/wc/lib")],
                depth: Depth::Infinity,
                changelists: vec!["feature".to_string()],
                message: Some("wip message".to_string()),
                keep_local: true,
                dry_run: true,
            }]
        );
        assert_eq!(h.text(), "shelved      a.txt\nshelved 'foo'\n");
    }

    #[test]
    fn shelve_keeps_explicit_depth() {
        let store = MockStore::default();
        let h = Harness::new();
        let opts = ShelveOptions {
            depth: Some(Depth::Files),
            ..Default::default()
        };

        h.commands(&store)
            .shelve(&args(&["foo", "."]), &opts, None)
            .unwrap();

        match &store.calls()[0] {
            Call::Create { depth, targets, message, .. } => {
                assert_eq!(*depth, Depth::Files);
                assert_eq!(targets, &vec![PathBuf::from("/wc/sub")]);
                assert!(message.is_none());
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn shelve_quiet_suppresses_all_output() {
        let store = MockStore::default();
        let h = Harness::new();
        let opts = ShelveOptions {
            quiet: true,
            ..Default::default()
        };

        h.commands(&store)
            .shelve(&args(&["foo", "a.txt"]), &opts, None)
            .unwrap();

        assert_eq!(h.text(), "");
        assert_eq!(store.calls().len(), 1);
    }

    #[test]
    fn shelve_without_targets_makes_no_storage_call() {
        let store = MockStore::default();
        let h = Harness::new();

        let err = h
            .commands(&store)
            .shelve(&args(&["foo"]), &ShelveOptions::default(), None)
            .unwrap_err();

        assert!(matches!(
            usage(&err),
            Some(UsageError::InsufficientArguments(_))
        ));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn shelve_without_name_is_argument_count_error() {
        let store = MockStore::default();
        let h = Harness::new();

        let err = h
            .commands(&store)
            .shelve(&[], &ShelveOptions::default(), None)
            .unwrap_err();

        assert_eq!(
            usage(&err),
            Some(&UsageError::ArgumentCount {
                verb: "shelve",
                expected: 1,
                found: 0
            })
        );
    }

    #[test]
    fn shelve_rejects_repository_urls() {
        let store = MockStore::default();
        let h = Harness::new();

        let err = h
            .commands(&store)
            .shelve(
                &args(&["foo", "a.txt", "https://example.com/repo/trunk"]),
                &ShelveOptions::default(),
                None,
            )
            .unwrap_err();

        assert_eq!(
            usage(&err),
            Some(&UsageError::InvalidTarget(
                "https://example.com/repo/trunk".to_string()
            ))
        );
        assert!(store.calls().is_empty());
    }

    #[test]
    fn shelve_rejects_invalid_names() {
        let store = MockStore::default();
        let h = Harness::new();

        let err = h
            .commands(&store)
            .shelve(&args(&["a/b", "x"]), &ShelveOptions::default(), None)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<NameError>(),
            Some(NameError::InvalidCharacter(_))
        ));
    }

    #[test]
    fn shelve_propagates_storage_errors() {
        let store = MockStore {
            fail_with: Some("disk full"),
            ..Default::default()
        };
        let h = Harness::new();

        let err = h
            .commands(&store)
            .shelve(&args(&["foo", "a.txt"]), &ShelveOptions::default(), None)
            .unwrap_err();

        assert_eq!(err.to_string(), "disk full");
        assert!(!h.text().contains("shelved 'foo'"));
    }

    #[test]
    fn unshelve_youngest_reports_resolution() {
        let store = MockStore::with(&[("wip1", 100), ("wip2", 200)]);
        let h = Harness::new();

        h.commands(&store)
            .unshelve(&[], UnshelveOptions::default())
            .unwrap();

        assert_eq!(
            store.calls(),
            vec![Call::Apply {
                name: "wip2".to_string(),
                keep_local: false,
                dry_run: false,
            }]
        );
        assert_eq!(
            h.text(),
            "unshelving the youngest change, 'wip2'\napplied      a.txt\nunshelved 'wip2'\n"
        );
    }

    #[test]
    fn unshelve_youngest_json_emits_single_result() {
        let store = MockStore::with(&[("wip1", 100), ("wip2", 200)]);
        let h = Harness::with_format(OutputFormat::Json);

        h.commands(&store)
            .unshelve(&[], UnshelveOptions::default())
            .unwrap();

        let text = h.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1, "output was: {text}");

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "unshelved 'wip2'");
    }

    #[test]
    fn unshelve_empty_registry_fails_without_apply() {
        let store = MockStore::default();
        let h = Harness::new();

        let err = h
            .commands(&store)
            .unshelve(&[], UnshelveOptions::default())
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<RegistryError>(),
            Some(&RegistryError::NoShelves)
        );
        assert_eq!(err.to_string(), "No shelved changes found");
        assert!(store.calls().is_empty());
    }

    #[test]
    fn unshelve_explicit_name_skips_enumeration_report() {
        let store = MockStore::with(&[("wip1", 100), ("wip2", 200)]);
        let h = Harness::new();
        let opts = UnshelveOptions {
            keep_local: true,
            dry_run: true,
            quiet: true,
        };

        h.commands(&store).unshelve(&args(&["wip1"]), opts).unwrap();

        assert_eq!(
            store.calls(),
            vec![Call::Apply {
                name: "wip1".to_string(),
                keep_local: true,
                dry_run: true,
            }]
        );
        assert_eq!(h.text(), "");
    }

    #[test]
    fn unshelve_quiet_still_reports_youngest() {
        let store = MockStore::with(&[("only", 5)]);
        let h = Harness::new();
        let opts = UnshelveOptions {
            quiet: true,
            ..Default::default()
        };

        h.commands(&store).unshelve(&[], opts).unwrap();

        assert_eq!(h.text(), "unshelving the youngest change, 'only'\n");
    }

    #[test]
    fn unshelve_rejects_extra_arguments() {
        let store = MockStore::with(&[("wip1", 100)]);
        let h = Harness::new();

        let err = h
            .commands(&store)
            .unshelve(&args(&["wip1", "extra"]), UnshelveOptions::default())
            .unwrap_err();

        assert_eq!(
            usage(&err),
            Some(&UsageError::ArgumentCount {
                verb: "unshelve",
                expected: 1,
                found: 2
            })
        );
        assert!(store.calls().is_empty());
    }

    #[test]
    fn remove_dry_run_keeps_shelf() {
        let store = MockStore::with(&[("wip1", 100)]);
        let h = Harness::new();

        h.commands(&store)
            .remove(&args(&["wip1"]), true, false)
            .unwrap();

        assert!(store.enumerate().unwrap().contains_key("wip1.patch"));
        assert_eq!(h.text(), "deleted 'wip1'\n");
    }

    #[test]
    fn remove_deletes_shelf() {
        let store = MockStore::with(&[("wip1", 100)]);
        let h = Harness::new();

        h.commands(&store)
            .remove(&args(&["wip1"]), false, true)
            .unwrap();

        assert!(store.enumerate().unwrap().is_empty());
        assert_eq!(h.text(), "");
    }

    #[test]
    fn remove_requires_exactly_one_name() {
        let store = MockStore::default();
        let h = Harness::new();

        for given in [args(&[]), args(&["a", "b"])] {
            let err = h.commands(&store).remove(&given, false, false).unwrap_err();
            assert!(matches!(
                usage(&err),
                Some(UsageError::ArgumentCount { verb: "remove", expected: 1, .. })
            ));
        }
        assert!(store.calls().is_empty());
    }
}
