//! Tests for rollback and the rollback ledger

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use mustr::config::{Options, ProjectPaths};
    use mustr::error::MustrError;
    use mustr::rollback::{Ledger, RemoveBy, RollbackEntry};
    use mustr::system::System as _;
    use mustr::system::mock::MockSystem;
    use mustr::operations::inject::Strategy;
    use mustr::template::{InjectConfig, TemplateConfig};
    use mustr::{Mustr, RenderOptions};
    use std::path::Path;
    use std::thread::sleep;
    use std::time::Duration;

    fn system() -> MockSystem {
        MockSystem::new()
            .with_current_dir("/project")
            .unwrap()
            .with_dir("/project/mustr")
            .unwrap()
    }

    fn session(system: &MockSystem) -> Mustr<'_> {
        let mut mustr = Mustr::new(system, Options::default()).unwrap();
        mustr
            .register(
                "greet",
                Some("Hello {{name}}!"),
                TemplateConfig {
                    ext: Some("txt".to_owned()),
                    ..TemplateConfig::default()
                },
            )
            .unwrap()
            .unwrap();
        mustr
    }

    fn ledger(max_rollbacks: usize) -> Ledger {
        let paths = ProjectPaths::new(Path::new("/project"), &Options::default());
        Ledger::new(&paths, max_rollbacks)
    }

    fn entry(template: &str, to: &str, from: Option<&str>) -> RollbackEntry {
        let mut entry = RollbackEntry::new(template, to.to_owned());
        entry.rollback_from = from.map(str::to_owned);
        entry
    }

    fn seeded(max_rollbacks: usize) -> Ledger {
        let mut ledger = ledger(max_rollbacks);
        assert!(ledger.add("300-c", entry("c", "src/c", None)));
        assert!(ledger.add("100-a", entry("a", "src/a", None)));
        assert!(ledger.add("200-b", entry("b", "src/b", None)));
        ledger
    }

    #[test]
    fn rollback_by_id_restores_backups() {
        let system = system()
            .with_file("/project/src/greeting.txt", b"old")
            .unwrap();
        let mut mustr = session(&system);

        let report = mustr
            .render(
                "greet",
                RenderOptions::new()
                    .output("greeting")
                    .metadata("name", "New")
                    .force(true),
            )
            .unwrap();
        let backup_dir = mustr.ledger().backup_dir(&report.rollback_id);
        assert!(system.is_dir(&backup_dir));

        let tally = mustr.rollback(Some(&report.rollback_id), None).unwrap();

        assert_eq!(tally.success, 1);
        assert_eq!(tally.failed, 0);
        assert_eq!(
            system
                .read_to_string(Path::new("/project/src/greeting.txt"))
                .unwrap(),
            "old"
        );
        assert!(mustr.ledger().get(&report.rollback_id).is_none());
        assert!(!system.exists(&backup_dir));
    }

    #[test]
    fn rollback_without_target_undoes_latest_run() {
        let system = system();
        let mut mustr = session(&system);

        mustr
            .render("greet", RenderOptions::new().output("first"))
            .unwrap();
        sleep(Duration::from_millis(2));
        mustr
            .render("greet", RenderOptions::new().output("second"))
            .unwrap();

        let tally = mustr.rollback(None, None).unwrap();

        assert_eq!(tally.total(), 1);
        assert!(!system.exists(Path::new("/project/src/second.txt")));
        assert!(system.exists(Path::new("/project/src/first.txt")));
        assert_eq!(mustr.ledger().len(), 1);
    }

    #[test]
    fn rollback_restores_injected_files() {
        let system = system()
            .with_file("/project/src/index.ts", b"// EXPORTS\n")
            .unwrap();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        let mut config = TemplateConfig {
            ext: Some("ts".to_owned()),
            ..TemplateConfig::default()
        };
        config.injects = Some(vec![InjectConfig::new(
            "index.ts",
            "EXPORTS",
            Strategy::After,
            vec!["export * from './{{name}}';".to_owned()],
        )]);
        mustr
            .register("const", Some("export const {{name}} = 1;"), config)
            .unwrap()
            .unwrap();

        let report = mustr
            .render(
                "const",
                RenderOptions::new().output("users").metadata("name", "users"),
            )
            .unwrap();
        let tally = mustr.rollback(Some(&report.rollback_id), None).unwrap();

        assert_eq!(tally.success, 2);
        assert!(!system.exists(Path::new("/project/src/users.ts")));
        assert_eq!(
            system
                .read_to_string(Path::new("/project/src/index.ts"))
                .unwrap(),
            "// EXPORTS\n"
        );
    }

    #[test]
    fn rollback_by_name_removes_configured_outputs() {
        let system = system();
        let mut mustr = session(&system);
        mustr
            .render("greet", RenderOptions::new().output("greeting"))
            .unwrap();

        let tally = mustr.rollback(Some("greet"), Some("greeting")).unwrap();

        assert_eq!(tally.success, 1);
        assert!(!system.exists(Path::new("/project/src/greeting.txt")));
        // Ad-hoc rollbacks leave the ledger alone
        assert_eq!(mustr.ledger().len(), 1);
    }

    #[test]
    fn rollback_restores_file_overwritten_then_injected() {
        let system = system()
            .with_file("/project/src/db.ts", b"ORIGINAL\n")
            .unwrap();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        let config = TemplateConfig {
            ext: Some("ts".to_owned()),
            injects: Some(vec![InjectConfig::new(
                "self",
                "MARK",
                Strategy::After,
                vec!["added".to_owned()],
            )]),
            ..TemplateConfig::default()
        };
        mustr
            .register("db", Some("MARK {{name}}"), config)
            .unwrap()
            .unwrap();

        let report = mustr
            .render(
                "db",
                RenderOptions::new()
                    .output("db")
                    .metadata("name", "x")
                    .force(true),
            )
            .unwrap();

        let entries = &mustr.ledger().get(&report.rollback_id).unwrap().rollbacks;
        assert_eq!(entries.len(), 2);
        assert!(entries[0].rollback_from.is_some());
        assert_ne!(entries[0].rollback_from, entries[1].rollback_from);

        let tally = mustr.rollback(Some(&report.rollback_id), None).unwrap();

        assert_eq!(tally.success, 2);
        assert_eq!(tally.failed, 0);
        assert_eq!(
            system.read_to_string(Path::new("/project/src/db.ts")).unwrap(),
            "ORIGINAL\n"
        );
    }

    #[test]
    fn rollback_restores_file_injected_twice() {
        let system = system()
            .with_file("/project/src/index.ts", b"// EXPORTS\n")
            .unwrap();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        let inject = |line: &str| {
            InjectConfig::new("index.ts", "EXPORTS", Strategy::After, vec![line.to_owned()])
        };
        let config = TemplateConfig {
            ext: Some("ts".to_owned()),
            injects: Some(vec![inject("one"), inject("two")]),
            ..TemplateConfig::default()
        };
        mustr
            .register("const", Some("export const x = 1;"), config)
            .unwrap()
            .unwrap();

        let report = mustr
            .render("const", RenderOptions::new().output("x"))
            .unwrap();
        assert_ne!(
            system
                .read_to_string(Path::new("/project/src/index.ts"))
                .unwrap(),
            "// EXPORTS\n"
        );

        let tally = mustr.rollback(Some(&report.rollback_id), None).unwrap();

        assert_eq!(tally.success, 3);
        assert!(!system.exists(Path::new("/project/src/x.ts")));
        assert_eq!(
            system
                .read_to_string(Path::new("/project/src/index.ts"))
                .unwrap(),
            "// EXPORTS\n"
        );
    }

    #[test]
    fn component_rollback_by_name_counts_unresolvable_members() {
        let system = system()
            .with_file("/project/mustr/model.tpl", b"model {{name}}")
            .unwrap()
            .with_file("/project/mustr/schema.tpl", b"schema {{name}}")
            .unwrap();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        assert!(mustr.register_component("resource", ["model", "schema"]));

        let report = mustr
            .render("resource", RenderOptions::new().output("api/users"))
            .unwrap();
        assert_eq!(report.written(), 2);
        let model = report.results[0].template.output_path.clone().unwrap();
        let schema = report.results[1].template.output_path.clone().unwrap();

        system
            .remove_file(Path::new("/project/mustr/schema.tpl"))
            .unwrap();
        let tally = mustr.rollback(Some("resource"), Some("api/users")).unwrap();

        assert_eq!(tally.success, 1);
        assert_eq!(tally.failed, 1);
        assert!(!system.exists(&model));
        assert!(system.exists(&schema));
    }

    #[test]
    fn rollback_with_empty_ledger_fails() {
        let system = system();
        let mut mustr = session(&system);

        let err = mustr.rollback(None, None).unwrap_err();
        let mustr_err = err.downcast_ref::<MustrError>().unwrap();
        assert!(matches!(mustr_err, MustrError::Rollback { .. }));
        assert_eq!(mustr_err.exit_code(), 4);
    }

    #[test]
    fn rollback_unknown_id_fails() {
        let system = system();
        let mut mustr = session(&system);

        let err = mustr.rollback(Some("123-nope"), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MustrError>(),
            Some(MustrError::Rollback { .. })
        ));
        assert!(err.to_string().contains("could not be found"));
    }

    #[test]
    fn rollback_id_at_counts_from_newest() {
        let system = system();
        let mut mustr = session(&system);

        let first = mustr
            .render("greet", RenderOptions::new().output("one"))
            .unwrap();
        sleep(Duration::from_millis(2));
        let second = mustr
            .render("greet", RenderOptions::new().output("two"))
            .unwrap();

        assert_eq!(mustr.rollback_id_at(1), Some(second.rollback_id));
        assert_eq!(mustr.rollback_id_at(2), Some(first.rollback_id));
        assert_eq!(mustr.rollback_id_at(0), None);
        assert_eq!(mustr.rollback_id_at(3), None);
    }

    #[test]
    fn ledger_orders_ids_by_timestamp() {
        let ledger = seeded(15);
        assert_eq!(ledger.ids(), vec!["100-a", "200-b", "300-c"]);
        assert_eq!(ledger.latest_id().as_deref(), Some("300-c"));

        let stats = ledger.stats();
        assert_eq!(stats[0].id, "300-c");
        assert_eq!(stats[0].templates, vec!["c"]);
        assert_eq!(stats[2].id, "100-a");
    }

    #[test]
    fn disabled_ledger_ignores_entries() {
        let mut ledger = ledger(0);
        assert!(!ledger.is_enabled());
        assert!(!ledger.add("100-a", entry("a", "src/a", None)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn remove_by_count_keeps_newest() {
        let system = system();
        let mut ledger = seeded(15);

        let removed = ledger.remove(&system, &RemoveBy::Count(5), false).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(ledger.ids(), vec!["300-c"]);
        assert!(!system.exists(Path::new("/project/mustr/rollbacks.json")));
    }

    #[test]
    fn remove_by_date() {
        let system = system();
        let mut ledger = seeded(15);

        let by = RemoveBy::parse("1970-01-01T00:00:00.250Z").unwrap();
        let removed = ledger.remove(&system, &by, true).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(ledger.ids(), vec!["300-c"]);
        assert!(system.exists(Path::new("/project/mustr/rollbacks.json")));
    }

    #[test]
    fn remove_by_date_after_every_rollback_keeps_newest() {
        let system = system();
        let mut ledger = seeded(15);

        let by = RemoveBy::parse("1970-01-01T00:00:01Z").unwrap();
        let removed = ledger.remove(&system, &by, false).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(ledger.ids(), vec!["300-c"]);
    }

    #[test]
    fn remove_by_id_deletes_backups() {
        let system = system()
            .with_file("/project/mustr/rollbacks/200-b/1-b.txt", b"backup")
            .unwrap();
        let mut ledger = seeded(15);

        let removed = ledger
            .remove(&system, &RemoveBy::Id("200-b".to_owned()), false)
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(ledger.ids(), vec!["100-a", "300-c"]);
        assert!(!system.exists(Path::new("/project/mustr/rollbacks/200-b")));

        let none = ledger
            .remove(&system, &RemoveBy::Id("999-z".to_owned()), false)
            .unwrap();
        assert_eq!(none, 0);
    }

    #[test]
    fn reindex_prunes_orphans_and_missing_backups() {
        let system = system()
            .with_file("/project/mustr/rollbacks/100-a/1-a.txt", b"a")
            .unwrap()
            .with_file("/project/mustr/rollbacks/999-orphan/1-x.txt", b"x")
            .unwrap();
        let mut ledger = ledger(15);
        ledger.add(
            "100-a",
            entry("a", "src/a.txt", Some("mustr/rollbacks/100-a/1-a.txt")),
        );
        ledger.add(
            "200-b",
            entry("b", "src/b.txt", Some("mustr/rollbacks/200-b/1-b.txt")),
        );
        ledger.add("300-c", entry("c", "src/c.txt", None));

        ledger.reindex(&system, false).unwrap();
        assert_eq!(ledger.len(), 3);

        ledger.reindex(&system, true).unwrap();

        assert_eq!(ledger.ids(), vec!["100-a", "300-c"]);
        assert!(!system.exists(Path::new("/project/mustr/rollbacks/999-orphan")));
        assert!(system.exists(Path::new("/project/mustr/rollbacks/100-a/1-a.txt")));
    }

    #[test]
    fn save_prunes_and_load_round_trips() {
        let system = system();
        let mut ledger = seeded(2);

        ledger.save(&system, true).unwrap();
        assert_eq!(ledger.ids(), vec!["200-b", "300-c"]);

        let mut reloaded = self::ledger(2);
        reloaded.load(&system, false).unwrap();
        assert_eq!(reloaded.ids(), vec!["200-b", "300-c"]);
        assert_eq!(reloaded.get("300-c"), ledger.get("300-c"));
    }

    #[test]
    fn load_ignores_invalid_ledger_file() {
        let system = system()
            .with_file("/project/mustr/rollbacks.json", b"{ not json")
            .unwrap();
        let mut ledger = seeded(15);

        ledger.load(&system, false).unwrap();

        assert!(ledger.is_empty());
    }

    #[test]
    fn ledger_file_uses_camel_case_keys() {
        let system = system()
            .with_file("/project/src/a.txt", b"a")
            .unwrap();
        let mut ledger = ledger(15);
        let mut inject = entry("a", "src/index.ts", Some("mustr/rollbacks/100-a/1-index.ts"));
        inject.is_inject = true;
        ledger.add("100-a", inject);
        ledger.save(&system, false).unwrap();

        let json = system
            .read_to_string(Path::new("/project/mustr/rollbacks.json"))
            .unwrap();
        assert!(json.contains("\"rollbackTo\": \"src/index.ts\""));
        assert!(json.contains("\"rollbackFrom\""));
        assert!(json.contains("\"isInject\": true"));
    }
}
