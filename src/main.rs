// ==========================================
// 工厂设备维护管理 - 命令行入口
// ==========================================
// 用法:
//   plant-maintenance [db_path] [readings_file]
// 流程: 导入读数（可选）→ 执行一次评估 → 输出 JSON 摘要
// ==========================================

use anyhow::{Context, Result};
use chrono::Local;
use plant_maintenance::api::ApiError;
use plant_maintenance::app::{get_default_db_path, AppState};
use plant_maintenance::logging;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let db_path = args
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path);
    let readings_file = args
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    tracing::info!("==================================================");
    tracing::info!("{} v{}", plant_maintenance::APP_NAME, plant_maintenance::VERSION);
    tracing::info!("使用数据库: {}", db_path);
    tracing::info!("==================================================");

    let state = AppState::new(db_path.clone())
        .await
        .map_err(anyhow::Error::msg)
        .context("无法初始化AppState")?;

    let import = match readings_file {
        Some(file) => Some(
            state
                .importer
                .import_file(&file)
                .with_context(|| format!("导入读数失败: {}", file))?,
        ),
        None => None,
    };

    let now = Local::now().naive_local();
    let evaluation = match state.maintenance_api.evaluate(now) {
        Ok(report) => Some(report),
        Err(ApiError::DataUnavailable(msg)) => {
            tracing::warn!("跳过评估: {}", msg);
            None
        }
        Err(e) => return Err(e).context("评估失败"),
    };

    let summary = json!({
        "db_path": db_path,
        "import": import,
        "evaluation": evaluation.as_ref().map(|r| json!({
            "evaluated_at": r.evaluated_at,
            "readings": r.readings,
            "status_counts": r.status_counts,
            "recurring_created": r.recurring_created,
            "predictive_created": r.predictive_created,
        })),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
