//! Integration tests for slidefill CLI
//!
//! These drive the command functions the binary dispatches to, against
//! templates and data files written to temporary directories.

use std::fs;
use std::path::{Path, PathBuf};

use slidefill_cli::{
    batch_command, fill_command, load_settings, plan_command, render_plan, OutputFormat,
};
use slidefill_core::{IssueKind, MappingConfig, Settings};
use slidefill_pptx::test_utils::{minimal_pptx, text_slide};
use slidefill_pptx::Deck;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let workspace = Self {
            dir: TempDir::new().unwrap(),
        };
        fs::write(
            workspace.path("template.pptx"),
            minimal_pptx(&[text_slide("Cover"), text_slide("Dear [A], you owe [B]")]),
        )
        .unwrap();
        fs::write(
            workspace.path("mapping.json"),
            r#"{"2": {"sheet": "customers", "type": "row_for_page", "copy": true}}"#,
        )
        .unwrap();
        workspace
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.batch.template = Some(self.path("template.pptx"));
        settings.batch.mapping_file = Some(self.path("mapping.json"));
        settings
    }
}

fn texts(path: &Path) -> Vec<String> {
    let deck = Deck::open(path).unwrap();
    deck.slides()
        .map(|slide| slide.container_text(slide.text_containers()[0]))
        .collect()
}

#[test]
fn test_fill_command() {
    let ws = Workspace::new();
    let data = ws.path("customers.csv");
    fs::write(&data, "Name,Balance\nAda,12.5\nGrace,3.333\n").unwrap();
    let output = ws.path("out/customers.pptx");

    let report = fill_command(
        &ws.settings(),
        &data,
        Some(output.as_path()),
        OutputFormat::Text,
    )
    .unwrap();

    assert_eq!(report.slides_after, 3);
    assert_eq!(
        texts(&output),
        vec!["Cover", "Dear Ada, you owe 12.5", "Dear Grace, you owe 3.33"]
    );
}

#[test]
fn test_fill_command_default_output_name() {
    let ws = Workspace::new();
    let data = ws.path("customers.csv");
    fs::write(&data, "Name,Balance\nAda,1\n").unwrap();

    let mut settings = ws.settings();
    settings.batch.output_dir = Some(ws.path("decks"));
    settings.fill.fallback = "?".to_string();
    fill_command(&settings, &data, None, OutputFormat::Json).unwrap();

    assert_eq!(
        texts(&ws.path("decks/customers.pptx")),
        vec!["Cover", "Dear Ada, you owe 1"]
    );
}

#[test]
fn test_fill_command_requires_template() {
    let ws = Workspace::new();
    let data = ws.path("customers.csv");
    fs::write(&data, "Name\nAda\n").unwrap();

    let mut settings = ws.settings();
    settings.batch.template = None;
    let err = fill_command(&settings, &data, None, OutputFormat::Text).unwrap_err();
    assert!(err.to_string().contains("No template given"));
}

#[test]
fn test_fill_command_missing_mapping_file() {
    let ws = Workspace::new();
    let data = ws.path("customers.csv");
    fs::write(&data, "Name\nAda\n").unwrap();

    let mut settings = ws.settings();
    settings.batch.mapping_file = Some(ws.path("nope.json"));
    assert!(fill_command(&settings, &data, None, OutputFormat::Text).is_err());
}

#[test]
fn test_batch_command() {
    let ws = Workspace::new();
    let input = ws.path("in");
    fs::create_dir_all(&input).unwrap();
    // Every file feeds a table named after itself; only "customers" is mapped
    fs::write(input.join("customers.csv"), "Name,Balance\nAda,1\nBob,2\n").unwrap();
    fs::write(input.join("others.csv"), "Name,Balance\nEve,3\n").unwrap();

    let mut settings = ws.settings();
    settings.batch.input_dir = Some(input);
    settings.batch.output_dir = Some(ws.path("out"));
    settings.batch.workers = Some(2);

    let report = batch_command(&settings, OutputFormat::Text).unwrap();
    assert_eq!(report.processed(), 2);
    assert_eq!(report.failed(), 0);

    assert_eq!(texts(&ws.path("out/customers.pptx")).len(), 3);
    assert_eq!(
        texts(&ws.path("out/others.pptx")),
        vec!["Cover", "Dear 未知, you owe 未知"]
    );
}

#[test]
fn test_batch_command_needs_directories() {
    let ws = Workspace::new();
    assert!(batch_command(&ws.settings(), OutputFormat::Text).is_err());
}

#[test]
fn test_plan_command_is_dry_run() {
    let ws = Workspace::new();
    let data = ws.path("customers.csv");
    fs::write(&data, "Name,Balance\nA,1\nB,2\nC,3\n").unwrap();
    let before = fs::read(ws.path("template.pptx")).unwrap();

    let plan = plan_command(&ws.settings(), &data, OutputFormat::Text).unwrap();

    assert_eq!(plan.deck_len(), 2);
    assert_eq!(plan.expanded_len(), 4);
    let positions: Vec<_> = plan.items().iter().map(|i| i.position).collect();
    assert_eq!(positions, vec![2, 3, 4]);
    assert_eq!(fs::read(ws.path("template.pptx")).unwrap(), before);
}

#[test]
fn test_render_plan_json() {
    let ws = Workspace::new();
    let data = ws.path("customers.csv");
    fs::write(&data, "Name,Balance\nA,1\nB,2\n").unwrap();

    let plan = plan_command(&ws.settings(), &data, OutputFormat::Json).unwrap();
    let mapping = MappingConfig::from_json_str(r#"{"0": {"sheet": "x"}}"#).unwrap();
    let json = render_plan(&plan, &mapping, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["template_slides"], 2);
    assert_eq!(value["expanded_slides"], 3);
    assert_eq!(value["items"][1]["position"], 3);
    assert_eq!(value["items"][1]["row_index"], 1);
    assert_eq!(value["items"][1]["mode"], "row_for_page");
    assert_eq!(value["issues"][0]["kind"], "config");
    assert_eq!(mapping.issues()[0].kind, IssueKind::Config);

    let text = render_plan(&plan, &mapping, OutputFormat::Text).unwrap();
    assert!(text.starts_with("Template slides: 2, after expansion: 3"));
    assert!(text.contains("slide 2 -> 2: customers (row_for_page), 2 row(s), 1 copy"));
}

#[test]
fn test_load_settings_from_file() {
    let ws = Workspace::new();
    let config = ws.path("slidefill.toml");
    fs::write(&config, "[fill]\nfallback = \"n/a\"\n\n[batch]\nworkers = 2\n").unwrap();

    let settings = load_settings(Some(config.as_path())).unwrap();
    assert_eq!(settings.fill.fallback, "n/a");

    assert!(load_settings(Some(ws.path("missing.toml").as_path())).is_err());
}
