#[tokio::main]
async fn main() -> anyhow::Result<()> {
    course_backend::run().await
}
