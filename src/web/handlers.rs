use crate::{
    image::ImageLoader,
    prediction::{PredictionResult, TriageVerdict},
    utils::error::ClassifierError,
    web::{
        extractors::{RequestId, ValidatedJson},
        AppState,
    },
    Result,
};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// JSON请求体（base64模式）
#[derive(Debug, Deserialize)]
pub struct PredictJsonRequest {
    /// Base64编码的图像数据，可带 data URL 前缀
    pub image: String,
}

/// 预测响应，顶层字段与移动端约定一致
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    #[serde(flatten)]
    pub prediction: PredictionResult,
    pub triage: TriageVerdict,
    pub request_id: String,
    pub processing_time_ms: u64,
    pub timestamp: String,
}

/// Multipart文件上传处理器
pub async fn predict_upload_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>> {
    let start_time = Instant::now();
    tracing::info!("Processing multipart prediction: request_id={}", request_id);

    let mut image_data: Option<Bytes> = None;

    let max_request_size = state.config.server_config.max_request_size;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_request_size))?
    {
        let field_name = field.name().unwrap_or("unknown").to_string();

        match field_name.as_str() {
            "image" | "file" => {
                if field.file_name() == Some("") {
                    return Err(ClassifierError::InvalidInput("Empty filename".to_string()));
                }

                if let Some(content_type) = field.content_type() {
                    if !content_type.starts_with("image/")
                        && content_type != "application/octet-stream"
                    {
                        return Err(ClassifierError::UnsupportedFormat(content_type.to_string()));
                    }
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_request_size))?;

                if data.is_empty() {
                    return Err(ClassifierError::InvalidInput("Empty file".to_string()));
                }

                // Content-Type 由客户端提供，以文件头为准
                ImageLoader::ensure_supported(&data)?;

                tracing::debug!("Received file: {} bytes", data.len());
                image_data = Some(data);
            }
            _ => {
                tracing::debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let image_data =
        image_data.ok_or_else(|| ClassifierError::InvalidInput("No image provided".to_string()))?;

    let (prediction, triage) = run_prediction(&state, image_data).await?;
    Ok(Json(respond(request_id, start_time, prediction, triage)))
}

/// JSON base64上传处理器
pub async fn predict_base64_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    ValidatedJson(request): ValidatedJson<PredictJsonRequest>,
) -> Result<Json<PredictionResponse>> {
    let start_time = Instant::now();
    tracing::info!("Processing JSON prediction: request_id={}", request_id);

    let image_bytes = ImageLoader::decode_base64(&request.image)?;
    ImageLoader::ensure_supported(&image_bytes)?;
    let (prediction, triage) = run_prediction(&state, Bytes::from(image_bytes)).await?;
    Ok(Json(respond(request_id, start_time, prediction, triage)))
}

/// 请求体超限时 axum 返回 413，其余读取失败视为无效输入
fn multipart_error(err: MultipartError, max_request_size: usize) -> ClassifierError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ClassifierError::RequestTooLarge(max_request_size)
    } else {
        ClassifierError::InvalidInput(format!("Failed to read multipart data: {}", err))
    }
}

/// 推理是同步计算，放到阻塞线程池执行
async fn run_prediction(
    state: &AppState,
    image_data: Bytes,
) -> Result<(PredictionResult, TriageVerdict)> {
    let predictor = Arc::clone(&state.predictor);

    tokio::task::spawn_blocking(move || -> Result<(PredictionResult, TriageVerdict)> {
        let prediction = predictor.infer_bytes(&image_data)?;
        let triage = predictor.classify_risk(&prediction)?;
        Ok((prediction, triage))
    })
    .await
    .map_err(|e| ClassifierError::Internal(format!("Inference task failed: {}", e)))?
}

fn respond(
    request_id: String,
    start_time: Instant,
    prediction: PredictionResult,
    triage: TriageVerdict,
) -> PredictionResponse {
    let processing_time = start_time.elapsed();

    tracing::info!(
        "Prediction completed: request_id={}, class={}, confidence={:.4}, triage={:?}, time={:.3}s",
        request_id,
        prediction.predicted_class(),
        prediction.confidence(),
        triage.level,
        processing_time.as_secs_f32()
    );

    PredictionResponse {
        prediction,
        triage,
        request_id,
        processing_time_ms: processing_time.as_millis() as u64,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}
