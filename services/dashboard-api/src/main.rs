//! Vista Finance Dashboard API
//!
//! 仪表盘后端服务：从行情数据提供方拉取历史 OHLCV，
//! 交给核心库计算派生序列，再把结果、摘要指标、同行市值和 CSV 导出
//! 提供给渲染前端。本服务只做数据搬运，指标语义全部在 vista-core。

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use vista_core::{
    analytics::AnalysisEngine,
    errors::{VistaError, VistaResult},
    models::{AnalysisResult, Candle, Interval, PeerMarketCap, PriceSeries, TimeRange},
    utils::{time, validation},
};

/// 仪表盘 API 配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 服务器监听地址
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// 行情数据提供方地址
    #[arg(long, default_value = "http://localhost:9100")]
    provider_url: String,

    /// 成分股列表地址（同行市值图数据源）
    #[arg(long, default_value = "http://localhost:9100/v1/constituents")]
    peers_url: String,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// 应用状态
#[derive(Debug)]
struct AppState {
    engine: AnalysisEngine,
    client: reqwest::Client,
    provider_url: String,
    peers_url: String,
}

/// 健康检查响应
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    timestamp: DateTime<Utc>,
}

/// 统一 API 响应封装
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// 行情提供方数据契约
// ---------------------------------------------------------------------------

/// 提供方返回的单根 K 线
#[derive(Debug, Deserialize)]
struct ProviderBar {
    /// 毫秒时间戳
    ts: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

/// 提供方返回的历史行情
#[derive(Debug, Deserialize)]
struct ProviderHistory {
    symbol: String,
    bars: Vec<ProviderBar>,
}

/// 提供方返回的公司概况，字段缺失是常态而不是错误
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProviderSummary {
    market_cap: Option<u64>,
    trailing_pe: Option<f64>,
    trailing_eps: Option<f64>,
    forward_pe: Option<f64>,
    dividend_yield: Option<f64>,
    total_revenue: Option<u64>,
    gross_margin: Option<f64>,
    beta: Option<f64>,
}

/// 成分股条目
#[derive(Debug, Deserialize)]
struct Constituent {
    symbol: String,
}

// ---------------------------------------------------------------------------
// 请求参数
// ---------------------------------------------------------------------------

/// 仪表盘查询参数
#[derive(Debug, Default, Deserialize)]
struct DashboardQuery {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    interval: Option<String>,
}

/// 同行市值查询参数
#[derive(Debug, Deserialize)]
struct PeersQuery {
    limit: Option<usize>,
    include: Option<String>,
}

/// 缺省查看最近 30 天
fn resolve_range(query: &DashboardQuery) -> TimeRange {
    let end = query.end.unwrap_or_else(Utc::now);
    let start = query.start.unwrap_or(end - Duration::days(30));
    TimeRange::new(start, end)
}

fn resolve_interval(query: &DashboardQuery) -> VistaResult<Interval> {
    match query.interval.as_deref() {
        Some(raw) => raw.parse(),
        None => Ok(Interval::Day),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(match args.log_level.to_lowercase().as_str() {
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        })
        .init();

    tracing::info!("Starting Vista Finance Dashboard API");

    let state = Arc::new(AppState {
        engine: AnalysisEngine::new(),
        client: reqwest::Client::new(),
        provider_url: args.provider_url,
        peers_url: args.peers_url,
    });

    // 构建路由
    let app = Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // 仪表盘数据
        .route("/api/v1/dashboard/:symbol", get(get_dashboard))
        .route("/api/v1/history/:symbol", get(get_history))
        .route("/api/v1/snapshot/:symbol", get(get_snapshot))
        .route("/api/v1/peers/market-cap", get(get_peer_market_caps))
        .route("/api/v1/export/:symbol", get(export_csv))
        // 中间件
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(middleware::from_fn(request_logger)),
        )
        .with_state(state);

    // 启动服务器
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!("Dashboard API listening on {}", args.bind);

    axum::serve(listener, app).await?;

    Ok(())
}

/// 健康检查端点
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// 完整仪表盘数据：全部派生序列 + 摘要指标
async fn get_dashboard(
    Path(symbol): Path<String>,
    Query(query): Query<DashboardQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<AnalysisResult>> {
    let result = async {
        let series = fetch_history(&state, &symbol, &query).await?;
        state.engine.analyze(&series)
    }
    .await;

    match result {
        Ok(analysis) => Json(ApiResponse::success(analysis)),
        Err(e) => {
            tracing::warn!("Dashboard request for {} failed: {}", symbol, e);
            Json(ApiResponse::error(e.to_string()))
        }
    }
}

/// 原始 K 线数据
async fn get_history(
    Path(symbol): Path<String>,
    Query(query): Query<DashboardQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<PriceSeries>> {
    match fetch_history(&state, &symbol, &query).await {
        Ok(series) => Json(ApiResponse::success(series)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

/// 公司概况（市值、估值等可选字段）
async fn get_snapshot(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<ProviderSummary>> {
    match fetch_summary(&state, &symbol).await {
        Ok(summary) => Json(ApiResponse::success(summary)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

/// 同行市值排名，供市值占比图使用
///
/// 单只股票查询失败只是跳过，不影响整体结果。
async fn get_peer_market_caps(
    Query(query): Query<PeersQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<PeerMarketCap>>> {
    let limit = query.limit.unwrap_or(10);

    let constituents: Vec<Constituent> = match fetch_json(&state, state.peers_url.clone()).await {
        Ok(list) => list,
        Err(e) => return Json(ApiResponse::error(e.to_string())),
    };

    let mut peers = Vec::new();
    // 只查前 30 只成分股，控制对提供方的请求量
    for constituent in constituents.iter().take(30) {
        match fetch_summary(&state, &constituent.symbol).await {
            Ok(summary) => {
                if let Some(cap) = summary.market_cap.filter(|&c| c > 0) {
                    peers.push(PeerMarketCap {
                        symbol: constituent.symbol.clone(),
                        market_cap: cap,
                    });
                }
            }
            Err(e) => {
                tracing::warn!("Skipping peer {}: {}", constituent.symbol, e);
            }
        }
    }

    peers.sort_by(|a, b| b.market_cap.cmp(&a.market_cap));
    peers.truncate(limit);

    // 当前查看的股票不在榜单里时补上，让它始终出现在占比图中
    if let Some(symbol) = query.include {
        if !peers.iter().any(|p| p.symbol == symbol) {
            if let Ok(summary) = fetch_summary(&state, &symbol).await {
                if let Some(cap) = summary.market_cap.filter(|&c| c > 0) {
                    peers.push(PeerMarketCap {
                        symbol,
                        market_cap: cap,
                    });
                }
            }
        }
    }

    Json(ApiResponse::success(peers))
}

/// CSV 导出：K 线 + 全部派生列
async fn export_csv(
    Path(symbol): Path<String>,
    Query(query): Query<DashboardQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let result = async {
        let series = fetch_history(&state, &symbol, &query).await?;
        let analysis = state.engine.analyze(&series)?;
        Ok::<_, VistaError>(render_csv(&series, &analysis))
    }
    .await;

    match result {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}_data.csv\"", symbol),
                ),
            ],
            csv,
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::<()>::error(e.to_string())),
        )
            .into_response(),
    }
}

// ---------------------------------------------------------------------------
// 提供方访问
// ---------------------------------------------------------------------------

async fn fetch_json<T: serde::de::DeserializeOwned>(
    state: &AppState,
    url: String,
) -> VistaResult<T> {
    let response = state
        .client
        .get(&url)
        .send()
        .await
        .map_err(|e| VistaError::network(format!("Provider request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(VistaError::network(format!(
            "Provider returned {} for {}",
            response.status(),
            url
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| VistaError::network(format!("Provider payload invalid: {}", e)))
}

/// 拉取历史行情并转换为核心层的 PriceSeries
///
/// 核心层假设序列干净有序，所以在这里完成边界校验。
async fn fetch_history(
    state: &AppState,
    symbol: &str,
    query: &DashboardQuery,
) -> VistaResult<PriceSeries> {
    if !validation::is_valid_symbol(symbol) {
        return Err(VistaError::invalid_input(format!(
            "Invalid symbol: {}",
            symbol
        )));
    }

    let range = resolve_range(query);
    let interval = resolve_interval(query)?;

    let url = format!(
        "{}/v1/history/{}?start={}&end={}&interval={}",
        state.provider_url,
        symbol,
        range.start.timestamp_millis(),
        range.end.timestamp_millis(),
        interval.as_str()
    );

    let history: ProviderHistory = fetch_json(state, url).await?;
    if history.bars.is_empty() {
        return Err(VistaError::not_found(format!(
            "No data available for {}",
            symbol
        )));
    }

    let series = provider_history_to_series(history)?;
    validation::validate_chronological(&series)?;

    Ok(series)
}

fn provider_history_to_series(history: ProviderHistory) -> VistaResult<PriceSeries> {
    let mut candles = Vec::with_capacity(history.bars.len());
    for bar in history.bars {
        candles.push(Candle::new(
            time::timestamp_to_datetime(bar.ts)?,
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
        ));
    }
    Ok(PriceSeries::new(history.symbol, candles))
}

async fn fetch_summary(state: &AppState, symbol: &str) -> VistaResult<ProviderSummary> {
    let url = format!("{}/v1/summary/{}", state.provider_url, symbol);
    fetch_json(state, url).await
}

// ---------------------------------------------------------------------------
// CSV 导出
// ---------------------------------------------------------------------------

const CSV_INDICATORS: [&str; 9] = [
    "SMA(20)",
    "SMA(50)",
    "RSI(14)",
    "MACD",
    "MACD_Signal",
    "BB_Mid",
    "BB_Upper",
    "BB_Lower",
    "Daily_Return",
];

/// 把 K 线和派生序列拼成 CSV 文本，未定义位置输出空单元格
fn render_csv(series: &PriceSeries, analysis: &AnalysisResult) -> String {
    let mut out = String::from("Time,Open,High,Low,Close,Volume");
    for name in CSV_INDICATORS {
        out.push(',');
        out.push_str(name);
    }
    out.push('\n');

    for (i, candle) in series.candles.iter().enumerate() {
        out.push_str(&format!(
            "{},{},{},{},{},{}",
            candle.timestamp.to_rfc3339(),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.volume
        ));
        for name in CSV_INDICATORS {
            out.push(',');
            let cell = analysis
                .indicator(name)
                .and_then(|indicator| indicator.values.get(i).copied().flatten());
            if let Some(value) = cell {
                out.push_str(&value.to_string());
            }
        }
        out.push('\n');
    }

    out
}

/// 请求日志中间件
async fn request_logger(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = req.method().clone();
    let uri = req.uri().clone();

    let start = std::time::Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed();

    tracing::info!(
        "Request: {} {} - Status: {} - Duration: {:?}",
        method,
        uri,
        response.status(),
        duration
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await;
        let health = response.0;

        assert_eq!(health.status, "ok");
        assert!(!health.version.is_empty());
    }

    #[tokio::test]
    async fn test_api_response() {
        let data = serde_json::json!({"test": "value"});
        let response = ApiResponse::success(data.clone());

        assert!(response.success);
        assert!(response.data.is_some());
        assert!(response.error.is_none());

        let failure = ApiResponse::<()>::error("boom".to_string());
        assert!(!failure.success);
        assert_eq!(failure.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_resolve_range_defaults_to_30_days() {
        let range = resolve_range(&DashboardQuery::default());
        let days = range.duration().num_days();
        assert_eq!(days, 30);
    }

    #[test]
    fn test_resolve_interval() {
        assert_eq!(
            resolve_interval(&DashboardQuery::default()).unwrap(),
            Interval::Day
        );

        let query = DashboardQuery {
            interval: Some("1wk".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_interval(&query).unwrap(), Interval::Week);

        let bad = DashboardQuery {
            interval: Some("3mo".to_string()),
            ..Default::default()
        };
        assert!(resolve_interval(&bad).is_err());
    }

    #[test]
    fn test_provider_history_conversion() {
        let history = ProviderHistory {
            symbol: "AAPL".to_string(),
            bars: vec![
                ProviderBar {
                    ts: 1_700_000_000_000,
                    open: 10.0,
                    high: 11.0,
                    low: 9.0,
                    close: 10.5,
                    volume: 1000,
                },
                ProviderBar {
                    ts: 1_700_086_400_000,
                    open: 10.5,
                    high: 12.0,
                    low: 10.0,
                    close: 11.5,
                    volume: 1200,
                },
            ],
        };

        let series = provider_history_to_series(history).unwrap();
        assert_eq!(series.symbol, "AAPL");
        assert_eq!(series.len(), 2);
        assert!(validation::validate_chronological(&series).is_ok());
        assert_eq!(series.closes(), vec![10.5, 11.5]);
    }

    #[test]
    fn test_render_csv_blank_cells_for_undefined() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles: Vec<Candle> = (0..5)
            .map(|i| {
                let close = 100.0 + i as f64;
                Candle::new(
                    base + Duration::days(i),
                    close - 0.5,
                    close + 1.0,
                    close - 1.0,
                    close,
                    1000,
                )
            })
            .collect();
        let series = PriceSeries::new("AAPL".to_string(), candles);
        let analysis = AnalysisEngine::new().analyze(&series).unwrap();

        let csv = render_csv(&series, &analysis);
        let lines: Vec<&str> = csv.lines().collect();

        // 表头 + 每根 K 线一行
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("Time,Open,High,Low,Close,Volume,SMA(20)"));

        // 每行列数一致
        let columns = lines[0].split(',').count();
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), columns);
        }

        // 序列太短：SMA 列是空单元格，MACD 列始终有值
        let first_row: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(first_row[6], ""); // SMA(20)
        assert!(!first_row[9].is_empty()); // MACD
    }
}
