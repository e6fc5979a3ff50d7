//! 可观测性：tracing 订阅器初始化

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 安装 registry + EnvFilter + fmt 层。`RUST_LOG` 优先，否则使用 `default_directive`。
/// 重复调用时静默忽略（测试与嵌入宿主可能已经初始化过）。
pub fn init(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
