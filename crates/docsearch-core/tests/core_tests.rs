use std::fs;
use tempfile::TempDir;

use docsearch_core::config::Config;
use docsearch_core::loader::DocumentLoader;

#[test]
fn load_directory_text_file_becomes_draft() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("programming/rust")).unwrap();
    fs::write(dir.join("programming/rust/ownership.txt"), "Borrowing rules explained").unwrap();
    fs::write(dir.join("notes.txt"), "Loose note").unwrap();

    let drafts = DocumentLoader::new().load_directory(dir).expect("load");

    assert_eq!(drafts.len(), 2);
    let loose = drafts.iter().find(|d| d.draft.title == "notes").expect("notes draft");
    assert_eq!(loose.draft.category, None, "files at the root carry no category");
    let nested = drafts.iter().find(|d| d.draft.title == "ownership").expect("ownership draft");
    assert_eq!(nested.draft.category.as_deref(), Some("programming/rust"));
    assert_eq!(nested.draft.body, "Borrowing rules explained");
}

#[test]
fn load_directory_json_array_and_object() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(
        dir.join("batch.json"),
        r#"[{"title":"One","body":"first"},{"title":"Two","body":"second","tags":["x"]}]"#,
    )
    .unwrap();
    fs::write(dir.join("single.json"), r#"{"title":"Three","body":"third","category":"misc"}"#).unwrap();

    let drafts = DocumentLoader::new().load_directory(dir).expect("load");

    let titles: Vec<_> = drafts.iter().map(|d| d.draft.title.as_str()).collect();
    assert_eq!(titles, vec!["One", "Two", "Three"]);
    assert_eq!(drafts[1].draft.tags, vec!["x".to_string()]);
    assert_eq!(drafts[2].draft.category.as_deref(), Some("misc"));
}

#[test]
fn load_directory_with_limit_reads_first_files() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo").unwrap();
    fs::write(dir.join("b.txt"), "charlie delta").unwrap();
    fs::write(dir.join("ignored.md"), "not imported").unwrap();

    let drafts = DocumentLoader::with_limit(1).load_directory(dir).expect("load limited");

    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].draft.title, "a");
}

#[test]
fn malformed_json_is_reported() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("bad.json"), "{ not json").unwrap();
    assert!(DocumentLoader::new().load_directory(tmp.path()).is_err());
}

#[test]
fn config_merges_files_and_env() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file(
            "config.toml",
            r#"
            [index]
            path = "/var/lib/docsearch/index"

            [search]
            default_limit = 20
            "#,
        )?;
        jail.create_file("config.test.toml", "[index]\nin_memory = true\n")?;
        jail.set_env("APP_SERVER__PORT", "9090");

        let config = Config::load().expect("load config");
        let settings = config.settings().expect("settings");
        assert_eq!(settings.index.path, "/var/lib/docsearch/index");
        assert!(settings.index.in_memory);
        assert_eq!(settings.search.default_limit, 20);
        assert_eq!(settings.search.max_limit, 100, "unset keys keep their defaults");
        assert_eq!(settings.server.port, 9090);
        assert_eq!(config.get::<u16>("server.port").expect("port"), 9090);
        Ok(())
    });
}

#[test]
fn config_load_rejects_invalid_settings() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file("config.toml", "[search]\ndefault_limit = 50\nmax_limit = 10\n")?;
        assert!(Config::load().is_err());
        Ok(())
    });
}
