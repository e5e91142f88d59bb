//! Tests for the render pipeline

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use anyhow::Result;
    use mustr::config::Options;
    use mustr::engine::Renderer;
    use mustr::error::MustrError;
    use mustr::operations::inject::Strategy;
    use mustr::system::System as _;
    use mustr::system::mock::MockSystem;
    use mustr::template::{InjectConfig, TemplateConfig};
    use mustr::{Mustr, RenderOptions, RenderStatus, Tally};
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn system() -> MockSystem {
        MockSystem::new()
            .with_current_dir("/project")
            .unwrap()
            .with_dir("/project/mustr")
            .unwrap()
    }

    fn greet(mustr: &mut Mustr<'_>) {
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
    }

    fn read(system: &MockSystem, path: &str) -> String {
        system.read_to_string(Path::new(path)).unwrap()
    }

    #[test]
    fn render_writes_new_file_and_records_it() {
        let system = system();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        greet(&mut mustr);

        let report = mustr
            .render(
                "greet",
                RenderOptions::new()
                    .output("greeting")
                    .metadata("name", "World"),
            )
            .unwrap();

        assert_eq!(read(&system, "/project/src/greeting.txt"), "Hello World!");
        assert_eq!(report.results[0].status, RenderStatus::Written);
        assert_eq!(report.rendered(), Some("Hello World!"));
        assert!(report.rollback_id.ends_with("-greet"));

        let container = mustr.ledger().get(&report.rollback_id).unwrap();
        assert_eq!(container.rollbacks.len(), 1);
        assert_eq!(container.rollbacks[0].rollback_to, "src/greeting.txt");
        assert!(container.rollbacks[0].rollback_from.is_none());
        assert!(system.exists(Path::new("/project/mustr/rollbacks.json")));
    }

    #[test]
    fn render_without_force_skips_existing_file() {
        let system = system()
            .with_file("/project/src/greeting.txt", b"keep me")
            .unwrap();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        greet(&mut mustr);

        let report = mustr
            .render("greet", RenderOptions::new().output("greeting"))
            .unwrap();

        assert_eq!(report.results[0].status, RenderStatus::Skipped);
        assert_eq!(report.written(), 0);
        assert_eq!(read(&system, "/project/src/greeting.txt"), "keep me");
        assert!(mustr.ledger().is_empty());
    }

    #[test]
    fn render_with_force_backs_up_existing_file() {
        let system = system()
            .with_file("/project/src/greeting.txt", b"old")
            .unwrap();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        greet(&mut mustr);

        let report = mustr
            .render(
                "greet",
                RenderOptions::new()
                    .output("greeting")
                    .metadata("name", "New")
                    .force(true),
            )
            .unwrap();

        let RenderStatus::Overwritten {
            backup: Some(backup),
        } = &report.results[0].status
        else {
            panic!("expected an overwrite with backup");
        };
        assert!(backup.starts_with(format!("/project/mustr/rollbacks/{}", report.rollback_id)));
        assert_eq!(system.read_to_string(backup).unwrap(), "old");
        assert_eq!(read(&system, "/project/src/greeting.txt"), "Hello New!");

        let entry = &mustr.ledger().get(&report.rollback_id).unwrap().rollbacks[0];
        assert!(
            entry
                .rollback_from
                .as_deref()
                .unwrap()
                .starts_with("mustr/rollbacks/")
        );
    }

    #[test]
    fn disabled_ledger_records_nothing() {
        let system = system()
            .with_file("/project/src/greeting.txt", b"old")
            .unwrap();
        let options = Options {
            max_rollbacks: 0,
            ..Options::default()
        };
        let mut mustr = Mustr::new(&system, options).unwrap();
        greet(&mut mustr);

        let report = mustr
            .render("greet", RenderOptions::new().output("greeting").force(true))
            .unwrap();

        assert_eq!(
            report.results[0].status,
            RenderStatus::Overwritten { backup: None }
        );
        assert!(mustr.ledger().is_empty());
        assert!(!system.exists(Path::new("/project/mustr/rollbacks.json")));
        assert!(!system.exists(Path::new("/project/mustr/rollbacks")));
    }

    #[test]
    fn no_output_renders_without_writing() {
        let system = system();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        mustr
            .register(
                "preview",
                Some("Preview {{name}}"),
                TemplateConfig {
                    no_output: Some(true),
                    ..TemplateConfig::default()
                },
            )
            .unwrap()
            .unwrap();

        let report = mustr
            .render("preview", RenderOptions::new().metadata("name", "x"))
            .unwrap();

        assert_eq!(report.results[0].status, RenderStatus::NoOutput);
        assert_eq!(report.rendered(), Some("Preview x"));
        assert!(!system.exists(Path::new("/project/src/preview")));
        assert!(mustr.ledger().is_empty());
    }

    #[test]
    fn hooks_run_around_render() {
        let system = system();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let after_calls = Arc::clone(&calls);

        mustr
            .register(
                "greet",
                Some("Hello {{name}}!"),
                TemplateConfig::default(),
            )
            .unwrap()
            .unwrap()
            .before_render(|template| {
                template
                    .metadata
                    .insert("name".to_owned(), serde_json::json!("Hook"));
            })
            .after_render(move |template| {
                assert_eq!(template.rendered.as_deref(), Some("Hello Hook!"));
                after_calls.fetch_add(1, Ordering::SeqCst);
            });

        mustr.render("greet", RenderOptions::new()).unwrap();

        assert_eq!(read(&system, "/project/src/greet"), "Hello Hook!");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn partials_render_without_front_matter() {
        let system = system()
            .with_file(
                "/project/mustr/author.tpl",
                b"---\nauthor: nobody\n---\nby {{author}}",
            )
            .unwrap();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        mustr
            .register("doc", Some("Doc {{> author}}"), TemplateConfig::default())
            .unwrap()
            .unwrap()
            .partials("author")
            .unwrap();

        let report = mustr
            .render("doc", RenderOptions::new().metadata("author", "Ann"))
            .unwrap();

        let rendered = report.rendered().unwrap();
        assert!(rendered.starts_with("Doc "));
        assert!(rendered.contains("by Ann"));
        assert!(!rendered.contains("---"));
    }

    #[test]
    fn mapped_paths_are_relative_to_output() {
        let system = system();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        mustr
            .register(
                "svc",
                Some("service {{name}}"),
                TemplateConfig {
                    ext: Some("ts".to_owned()),
                    paths: Some(vec![
                        "self | models/user".to_owned(),
                        "self|services/helpers.ts".to_owned(),
                        "|index".to_owned(),
                    ]),
                    ..TemplateConfig::default()
                },
            )
            .unwrap()
            .unwrap();

        let report = mustr
            .render("svc", RenderOptions::new().output("services/user"))
            .unwrap();

        assert_eq!(
            report.results[0].template.component.paths,
            vec!["../models/user", "./helpers", ".."]
        );
    }

    #[test]
    fn injections_run_after_write_and_are_recorded() {
        let system = system()
            .with_file("/project/src/index.ts", b"// EXPORTS\n")
            .unwrap();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        let mut inject = InjectConfig::new(
            "index.ts",
            "// EXPORTS",
            Strategy::After,
            vec!["export * from './{{name}}';".to_owned()],
        );
        inject.relative = false;
        mustr
            .register(
                "const",
                Some("export const {{name}} = 1;"),
                TemplateConfig {
                    ext: Some("ts".to_owned()),
                    injects: Some(vec![
                        inject,
                        InjectConfig::new("missing.ts", "x", Strategy::After, vec!["y".to_owned()]),
                    ]),
                    ..TemplateConfig::default()
                },
            )
            .unwrap()
            .unwrap();

        let report = mustr
            .render(
                "const",
                RenderOptions::new().output("users").metadata("name", "users"),
            )
            .unwrap();

        assert_eq!(read(&system, "/project/src/users.ts"), "export const users = 1;");
        assert_eq!(
            read(&system, "/project/src/index.ts"),
            "// EXPORTS\nexport * from './users';\n"
        );
        assert_eq!(
            report.results[0].injections,
            Tally {
                success: 1,
                failed: 1
            }
        );

        let rollbacks = &mustr.ledger().get(&report.rollback_id).unwrap().rollbacks;
        assert_eq!(rollbacks.len(), 2);
        assert!(rollbacks[1].is_inject);
        assert_eq!(rollbacks[1].rollback_to, "src/index.ts");
        assert!(rollbacks[1].rollback_from.is_some());
    }

    #[test]
    fn component_renders_members_under_one_rollback() {
        let system = system();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        for (name, body) in [("model", "model {{name}}"), ("schema", "schema {{name}}")] {
            mustr
                .register(
                    name,
                    Some(body),
                    TemplateConfig {
                        ext: Some("ts".to_owned()),
                        ..TemplateConfig::default()
                    },
                )
                .unwrap()
                .unwrap();
        }
        assert!(mustr.register_group("resource", ["model", "schema"]));

        let report = mustr
            .render(
                "resource",
                RenderOptions::new().output("api/users").metadata("name", "users"),
            )
            .unwrap();

        assert!(report.rollback_id.ends_with("-resource-users"));
        assert_eq!(report.written(), 2);
        assert_eq!(read(&system, "/project/src/api/users/model.ts"), "model users");
        assert_eq!(read(&system, "/project/src/api/users/schema.ts"), "schema users");
        assert_eq!(report.results[0].template.group.as_deref(), Some("resource"));
        assert_eq!(
            report.results[1].template.component.group.as_deref(),
            Some("resource")
        );

        assert_eq!(mustr.ledger().len(), 1);
        assert_eq!(
            mustr.ledger().get(&report.rollback_id).unwrap().rollbacks.len(),
            2
        );
    }

    #[test]
    fn component_member_failure_does_not_stop_others() {
        let system = system();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        mustr
            .register("broken", Some("{{#if}}"), TemplateConfig::default())
            .unwrap()
            .unwrap();
        mustr
            .register("fine", Some("fine {{name}}"), TemplateConfig::default())
            .unwrap()
            .unwrap();
        assert!(mustr.register_component("pair", ["broken", "fine"]));

        let report = mustr
            .render("pair", RenderOptions::new().output("out"))
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "broken");
        assert_eq!(report.written(), 1);
        assert!(system.exists(Path::new("/project/src/out/fine")));
    }

    #[test]
    fn component_output_with_extension_is_rejected() {
        let system = system();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        greet(&mut mustr);
        assert!(mustr.register_component("pack", ["greet"]));

        let err = mustr
            .render("pack", RenderOptions::new().output("api/users.ts"))
            .unwrap_err();

        let mustr_err = err.downcast_ref::<MustrError>().unwrap();
        assert!(matches!(mustr_err, MustrError::Configuration { .. }));
        assert_eq!(mustr_err.exit_code(), 1);
        assert!(system.files().unwrap().iter().all(|file| !file.starts_with("/project/src")));
    }

    #[test]
    fn save_prunes_to_max_rollbacks() {
        let system = system();
        let options = Options {
            max_rollbacks: 1,
            ..Options::default()
        };
        let mut mustr = Mustr::new(&system, options).unwrap();
        greet(&mut mustr);

        mustr
            .render("greet", RenderOptions::new().output("one"))
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = mustr
            .render("greet", RenderOptions::new().output("two"))
            .unwrap();

        assert_eq!(mustr.ledger().ids(), vec![second.rollback_id]);
        assert!(system.exists(Path::new("/project/src/one")));
    }

    struct Shouting;

    impl Renderer for Shouting {
        fn render(
            &self,
            body: &str,
            _context: &Value,
            _partials: &BTreeMap<String, String>,
        ) -> Result<String> {
            Ok(body.to_uppercase())
        }
    }

    #[test]
    fn custom_renderer_replaces_engine() {
        let system = system();
        let mut mustr = Mustr::new(&system, Options::default()).unwrap();
        greet(&mut mustr);
        mustr.set_renderer(Box::new(Shouting));

        let plan = mustr
            .configure("greet", Some("loud"), TemplateConfig::default())
            .unwrap();
        let report = mustr.render_template(plan, false).unwrap();

        assert_eq!(read(&system, "/project/src/loud.txt"), "HELLO {{NAME}}!");
        assert!(report.rollback_id.ends_with("-greet"));
        assert_eq!(mustr.transform_case("user.profile", "capitalize"), "User.Profile");
    }
}
