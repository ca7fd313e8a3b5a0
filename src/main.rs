use anyhow::Result;
use tronclass_survey::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 读取 .env（不存在时忽略）
    dotenvy::dotenv().ok();

    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env();

    // 登录并运行
    App::initialize(config).await?.run().await?;

    Ok(())
}
