use anyhow::{Result, anyhow};
use reqwest::{Url, header};
use serde_json::{Value, json};
use tracing::info;

/// Creates cake and returns its id, as given in `Location` header.
pub async fn create_cake(
    client: &reqwest::Client,
    base_url: &Url,
    title: &str,
    rating: f32,
) -> Result<i64> {
    let payload = json!({"title": title, "rating": rating});
    let api_url = base_url.join("cakes")?;

    let response = client.post(api_url).json(&payload).send().await?;
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 200);

    let location = response
        .headers()
        .get(header::LOCATION)
        .ok_or_else(|| anyhow!("Missing location header"))?
        .to_str()?;
    let id = location
        .strip_prefix("/cakes/")
        .ok_or_else(|| anyhow!("Unexpected location {location}"))?
        .parse()?;
    Ok(id)
}

pub async fn list_cakes(
    client: &reqwest::Client,
    base_url: &Url,
    page: i64,
    page_size: i64,
) -> Result<Value> {
    let mut api_url = base_url.join("cakes")?;
    api_url.set_query(Some(&format!("page={page}&page_size={page_size}")));
    let response = client.get(api_url).send().await?;
    info!("Response: {:#?}", response);
    assert!(response.status().is_success());
    Ok(response.json().await?)
}
