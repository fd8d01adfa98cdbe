#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let config = todolist_server::config::Config::from_env()?;
    todolist_server::web::start_web_server(config).await
}
