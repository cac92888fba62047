mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{read, TestServer};

struct Shop {
    server: TestServer,
    admin: String,
    supplier: String,
    product_id: i64,
}

async fn shop() -> Result<Shop> {
    let server = TestServer::start().await?;
    let admin = server.user_with_roles("root", true, false).await?;
    let supplier = server.user_with_roles("sam", false, true).await?;

    let (_, category) = read(
        server
            .post("/categories/", &admin)
            .json(&json!({ "name": "Electronics" }))
            .send()
            .await?,
    )
    .await?;
    let (_, product) = read(
        server
            .post("/products/", &supplier)
            .json(&json!({
                "name": "Phone",
                "price": 99.0,
                "stock": 5,
                "category_id": category["data"]["id"],
            }))
            .send()
            .await?,
    )
    .await?;
    let product_id = product["data"]["id"].as_i64().unwrap_or_default();

    Ok(Shop {
        server,
        admin,
        supplier,
        product_id,
    })
}

async fn post_review(shop: &Shop, grade: i32) -> Result<(StatusCode, Value)> {
    read(
        shop.server
            .post("/reviews/", &shop.supplier)
            .json(&json!({ "product_id": shop.product_id, "comment": "solid", "grade": grade }))
            .send()
            .await?,
    )
    .await
}

#[tokio::test]
async fn reviews_fold_into_product_rating() -> Result<()> {
    let shop = shop().await?;

    let (status, body) = post_review(&shop, 4).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["review"]["grade"], 4);
    assert_eq!(body["data"]["product"]["rating"], 4.0);
    assert_eq!(body["data"]["product"]["reviews_count"], 1);

    let (_, body) = post_review(&shop, 2).await?;
    assert_eq!(body["data"]["product"]["rating"], 3.0);
    assert_eq!(body["data"]["product"]["reviews_count"], 2);

    let (_, body) = read(shop.server.get("/reviews/phone", &shop.admin).send().await?).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn admin_delete_toggles_review() -> Result<()> {
    let shop = shop().await?;
    let (_, body) = post_review(&shop, 4).await?;
    let review_id = body["data"]["review"]["id"].as_i64().unwrap_or_default();
    let path = format!("/reviews/{}", review_id);

    let (status, body) = read(shop.server.delete(&path, &shop.admin).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Review deleted");
    assert_eq!(body["data"]["review"]["is_active"], false);
    assert_eq!(body["data"]["product"]["rating"], 0.0);
    assert_eq!(body["data"]["product"]["reviews_count"], 0);

    let (_, body) = read(shop.server.get("/reviews/", &shop.admin).send().await?).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

    let (status, body) = read(shop.server.delete(&path, &shop.admin).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Review undeleted");
    assert_eq!(body["data"]["product"]["rating"], 4.0);
    assert_eq!(body["data"]["product"]["reviews_count"], 1);
    Ok(())
}

#[tokio::test]
async fn review_permissions_and_validation() -> Result<()> {
    let shop = shop().await?;
    let customer = shop.server.user_with_roles("cathy", false, false).await?;

    let resp = shop
        .server
        .post("/reviews/", &customer)
        .json(&json!({ "product_id": shop.product_id, "grade": 5 }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let (status, body) = post_review(&shop, 6).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["grade"].is_string());

    let (_, body) = post_review(&shop, 5).await?;
    let review_id = body["data"]["review"]["id"].as_i64().unwrap_or_default();

    let resp = shop
        .server
        .delete(&format!("/reviews/{}", review_id), &shop.supplier)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = shop.server.delete("/reviews/424242", &shop.admin).send().await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let (status, body) = read(shop.server.delete("/reviews/abc", &shop.admin).send().await?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["message"], "Invalid review id 'abc'");
    Ok(())
}

#[tokio::test]
async fn reviews_need_an_active_product() -> Result<()> {
    let shop = shop().await?;

    let resp = shop.server.delete("/products/phone", &shop.supplier).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _) = post_review(&shop, 3).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
