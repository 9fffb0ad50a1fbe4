use clap::Parser;
use did_etl::config::study_config::{EstimateSection, StudyConfig};
use did_etl::core::ConfigProvider;
use did_etl::utils::{logger, validation::Validate};
use did_etl::DidPipeline;
use did_etl::EtlEngine;
use did_etl::LocalStorage;

#[derive(Parser)]
#[command(name = "study-etl")]
#[command(about = "DID analysis driven by a TOML study description")]
struct Args {
    /// Path to TOML study file
    #[arg(short, long, default_value = "study.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override archive setting from config
    #[arg(long)]
    archive: Option<bool>,

    /// Override the confidence critical value from config
    #[arg(long)]
    confidence_z: Option<f64>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose, args.log_json);

    tracing::info!("🚀 Starting TOML-based DID analysis tool");
    tracing::info!("📁 Loading study from: {}", args.config);

    // 載入 TOML 配置
    let mut config = match StudyConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load study file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    if let Some(archive) = args.archive {
        config.load.archive = Some(archive);
        tracing::info!("🔧 Archive overridden to: {}", archive);
    }
    if let Some(z) = args.confidence_z {
        config.estimate = Some(EstimateSection {
            confidence_z: Some(z),
        });
        tracing::info!("🔧 Confidence z overridden to: {}", z);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Study loaded and validated successfully");

    // 顯示配置摘要
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config);
        return Ok(());
    }

    // 決定監控設定
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());

    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 創建存儲和管道
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = DidPipeline::new(storage, config);

    // 創建引擎並運行
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ DID analysis completed successfully!");
            tracing::info!("📁 Output saved to: {}", output_path);
            println!("✅ DID analysis completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ DID analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                did_etl::utils::error::ErrorSeverity::Low => 0,
                did_etl::utils::error::ErrorSeverity::Medium => 2,
                did_etl::utils::error::ErrorSeverity::High => 1,
                did_etl::utils::error::ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &StudyConfig, args: &Args) {
    println!("📋 Study Summary:");
    println!("  Study: {}", config.study.name);
    if let Some(description) = &config.study.description {
        println!("  Description: {}", description);
    }
    println!("  Treatment date: {}", config.study.treatment_date);
    println!("  Source: {}", config.source.location);
    println!("  Output: {}", config.output_path());
    println!("  Confidence z: {}", config.confidence_z());
    println!("  Archive: {}", config.archive());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &StudyConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    // 資料來源分析
    println!("📡 Data Source Analysis:");
    println!("  Location: {}", config.source.location);
    let kind = if config.source.location.starts_with("http://")
        || config.source.location.starts_with("https://")
    {
        "http download"
    } else {
        "local file"
    };
    println!("  Kind: {}", kind);

    println!();
    println!("🔄 Column Mapping:");
    println!("  date -> {}", config.columns.date);
    println!("  revenue -> {}", config.columns.revenue);
    println!("  unit -> {}", config.columns.unit);
    println!("  group -> {}", config.columns.group);
    println!("  period -> {}", config.columns.period);

    // 估計方式分析
    println!();
    println!("⚙️ Estimation Plan:");
    println!("  Method: two-group difference-in-differences on log revenue");
    println!(
        "  Interval: gamma ± {} * se (two-sample standard error)",
        config.confidence_z()
    );
    println!("  Treatment date marker: {}", config.study.treatment_date);

    // 輸出分析
    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    println!("  Artifacts:");
    for artifact in [
        "temp/treated_pivot.csv",
        "temp/untreated_pivot.csv",
        "tables/did_table.tex",
        "tables/did_table_levels.tex",
        "tables/did_summary.txt",
        "figures/revenue_by_group.svg",
        "figures/log_revenue_gap.svg",
        "analysis_summary.json",
    ] {
        println!("    {}", artifact);
    }
    if config.archive() {
        println!("  Compression: did_output.zip (ZIP)");
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
