use restbase_http::{ApiClient, ClientOptions, RequestSpec};
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = ApiClient::from_env()
        .map_err(anyhow::Error::msg)?
        .with_options(ClientOptions {
            max_retries: 2,
            ..ClientOptions::default()
        });

    let health: Value = client.get_json("/health", (), 200).await?;
    println!("health: {health}");

    let created: Value = client
        .send_json(
            RequestSpec::post("/items")
                .json(&json!({ "name": "example" }))?
                .expect([200, 201]),
        )
        .await?;
    println!("created: {created}");

    Ok(())
}
