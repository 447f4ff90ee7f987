use crate::image::loader::MAX_IMAGE_BYTES;
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// 导出的ONNX分类模型
    pub model_path: PathBuf,

    /// 归一化参数文件，未指定时使用模型同名的 `.json`
    pub metadata_path: Option<PathBuf>,

    /// 工作线程数量
    pub workers: usize,

    /// 开发模式
    pub dev_mode: bool,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 服务器配置
    pub server_config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,

    /// 优化级别
    pub optimization_level: i32,

    /// 启用图优化
    pub enable_optimization: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 最大请求体大小（字节）
    pub max_request_size: usize,
}

impl Config {
    pub fn new(
        bind_addr: String,
        model_path: String,
        metadata_path: Option<String>,
        workers: Option<usize>,
        dev_mode: bool,
    ) -> Result<Self> {
        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores);

        if model_path.trim().is_empty() {
            anyhow::bail!("model path must not be empty");
        }

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1), // 使用75%的CPU核心
            optimization_level: 3,
            enable_optimization: true,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 30 }, // 与移动端的30秒超时保持一致
            // 为multipart边界和表单字段预留1MB
            max_request_size: MAX_IMAGE_BYTES + 1024 * 1024,
        };

        Ok(Self {
            bind_addr,
            model_path: PathBuf::from(model_path),
            metadata_path: metadata_path.map(PathBuf::from),
            workers,
            dev_mode,
            onnx_config,
            server_config,
        })
    }

    /// 获取分类模型路径
    pub fn model_path(&self) -> PathBuf {
        self.model_path.clone()
    }

    /// 获取归一化参数路径
    pub fn metadata_path(&self) -> PathBuf {
        self.metadata_path
            .clone()
            .unwrap_or_else(|| self.model_path.with_extension("json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_defaults_to_sidecar_next_to_model() {
        let config = Config::new(
            "127.0.0.1:5000".to_string(),
            "models/skin_cancer_model.onnx".to_string(),
            None,
            Some(2),
            false,
        )
        .unwrap();

        assert_eq!(
            config.metadata_path(),
            PathBuf::from("models/skin_cancer_model.json")
        );
        assert_eq!(config.workers, 2);
        assert_eq!(config.server_config.request_timeout, 30);
        assert!(config.server_config.max_request_size > MAX_IMAGE_BYTES);
    }

    #[test]
    fn explicit_metadata_path_wins() {
        let config = Config::new(
            "127.0.0.1:5000".to_string(),
            "model.onnx".to_string(),
            Some("meta/profile.json".to_string()),
            None,
            true,
        )
        .unwrap();

        assert_eq!(config.metadata_path(), PathBuf::from("meta/profile.json"));
        assert_eq!(config.server_config.request_timeout, 300);
        assert!(config.onnx_config.intra_threads >= 1);
    }

    #[test]
    fn empty_model_path_is_rejected() {
        assert!(Config::new("0.0.0.0:5000".into(), "  ".into(), None, None, false).is_err());
    }
}
