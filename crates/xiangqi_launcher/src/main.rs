#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lib_xiangqi_launcher::init().await
}
