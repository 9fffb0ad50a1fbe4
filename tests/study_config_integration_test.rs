use anyhow::Result;
use chrono::NaiveDate;
use did_etl::core::ConfigProvider;
use did_etl::{DidPipeline, EtlEngine, LocalStorage, StudyConfig};
use httpmock::prelude::*;
use tempfile::TempDir;

/// Same panel as the CLI integration suite, but with every column renamed
/// so the TOML [columns] remapping is exercised end to end.
const REMAPPED_PANEL_CSV: &str = "\
day,sales,region,holdout,phase
2012-04-02,100.0,north,0,0
2012-06-04,99.0,north,0,1
2012-04-02,200.0,south,0,0
2012-06-04,190.0,south,0,1
2012-04-02,150.0,east,0,0
2012-06-04,154.0,east,0,1
2012-04-02,120.0,west,1,0
2012-06-04,121.0,west,1,1
2012-04-02,220.0,centre,1,0
2012-06-04,220.0,centre,1,1
2012-04-02,310.0,island,1,0
2012-06-04,315.0,island,1,1
";

#[tokio::test]
async fn test_study_toml_drives_a_full_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let temp_path = temp_dir.path().to_str().unwrap().replace('\\', "/");

    let panel_path = format!("{temp_path}/panel.csv");
    std::fs::write(&panel_path, REMAPPED_PANEL_CSV)?;

    let config_content = format!(
        r#"
[study]
name = "generic-panel"
description = "Renamed-column variant of the paid search study"
treatment_date = "2012-05-22"

[source]
location = "{panel_path}"

[columns]
date = "day"
revenue = "sales"
unit = "region"
group = "holdout"
period = "phase"

[estimate]
confidence_z = 2.576

[load]
output_path = "{temp_path}/out"
archive = true
"#
    );

    let config_path = temp_dir.path().join("study.toml");
    std::fs::write(&config_path, config_content)?;

    let config = StudyConfig::from_file(&config_path)?;
    assert_eq!(config.study.name, "generic-panel");
    assert_eq!(
        config.treatment_date(),
        NaiveDate::from_ymd_opt(2012, 5, 22).unwrap()
    );
    assert_eq!(config.columns().unit, "region");

    let output_path = config.output_path().to_string();
    let storage = LocalStorage::new(output_path.clone());
    let pipeline = DidPipeline::new(storage, config);
    let engine = EtlEngine::new(pipeline);

    engine.run().await?;

    let out = std::path::Path::new(&output_path);
    assert!(out.join("did_output.zip").exists());

    // Pivot columns keep their canonical names regardless of the remapping.
    let pivot = std::fs::read_to_string(out.join("temp/treated_pivot.csv"))?;
    assert!(pivot.starts_with("dma,log_revenue_pre,log_revenue_post,log_revenue_diff"));
    assert!(pivot.contains("north"));

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("analysis_summary.json"))?)?;
    assert_eq!(summary["treated_units"], 3);
    assert_eq!(summary["untreated_units"], 3);
    assert_eq!(summary["estimate"]["z"], 2.576);

    // A wider z than the default must show up in the rendered table label.
    let table = std::fs::read_to_string(out.join("tables/did_table.tex"))?;
    assert!(table.contains("CI ($z = 2.576$)"));

    Ok(())
}

#[tokio::test]
async fn test_study_source_from_env_var_and_http() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let temp_path = temp_dir.path().to_str().unwrap().replace('\\', "/");

    let server = MockServer::start();
    let csv_mock = server.mock(|when, then| {
        when.method(GET).path("/panel.csv");
        then.status(200)
            .header("Content-Type", "text/csv")
            .body(REMAPPED_PANEL_CSV.replace("day,sales,region,holdout,phase",
                "date,revenue,dma,search_stays_on,treatment_period"));
    });

    std::env::set_var("DID_TEST_PANEL_URL", server.url("/panel.csv"));

    let config_content = format!(
        r#"
[study]
name = "env-sourced"
treatment_date = "2012-05-22"

[source]
location = "${{DID_TEST_PANEL_URL}}"

[load]
output_path = "{temp_path}/out"
"#
    );

    let config_path = temp_dir.path().join("study.toml");
    std::fs::write(&config_path, config_content)?;

    let config = StudyConfig::from_file(&config_path)?;
    assert_eq!(config.source(), server.url("/panel.csv"));

    let output_path = config.output_path().to_string();
    let storage = LocalStorage::new(output_path.clone());
    let pipeline = DidPipeline::new(storage, config);
    let engine = EtlEngine::new(pipeline);

    engine.run().await?;

    csv_mock.assert();
    assert!(std::path::Path::new(&output_path)
        .join("analysis_summary.json")
        .exists());

    std::env::remove_var("DID_TEST_PANEL_URL");
    Ok(())
}

#[tokio::test]
async fn test_invalid_study_config_never_runs() {
    let temp_dir = TempDir::new().unwrap();

    let config_content = r#"
[study]
name = ""
treatment_date = "2012-05-22"

[source]
location = "panel.csv"

[load]
output_path = "./out"
"#;

    let config_path = temp_dir.path().join("study.toml");
    std::fs::write(&config_path, config_content).unwrap();

    let config = StudyConfig::from_file(&config_path).unwrap();
    assert!(config.validate_config().is_err());
}
