mod common;

use serde_json::json;
use warp::http::{header, StatusCode};

use common::*;
use foodgram::shopping_list::{shopping_list, ShoppingListItem};

#[tokio::test]
async fn favorite_twice_is_rejected() {
    let app = setup().await;
    let (_, token) = app.user("eater").await;
    let recipe = app
        .create_recipe(&token, "Pie", json!([{ "id": APPLE, "amount": 3 }]))
        .await;
    let path = format!("/recipes/{}/favorite/", recipe["id"]);

    let added = app.request("POST", &path, Some(&token), None).await;
    assert_eq!(added.status, StatusCode::CREATED);
    assert_eq!(added.json()["name"], "Pie");
    assert_eq!(added.json()["cooking_time"], 30);
    assert!(added.json().get("ingredients").is_none());

    let again = app.request("POST", &path, Some(&token), None).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.json()["errors"], "Recipe is already in favorites.");

    let detail = app
        .request("GET", &format!("/recipes/{}/", recipe["id"]), Some(&token), None)
        .await
        .json();
    assert_eq!(detail["is_favorited"], true);
    assert_eq!(detail["is_in_shopping_cart"], false);
}

#[tokio::test]
async fn remove_twice_is_rejected() {
    let app = setup().await;
    let (_, token) = app.user("eater").await;
    let recipe = app
        .create_recipe(&token, "Pie", json!([{ "id": APPLE, "amount": 3 }]))
        .await;
    let path = format!("/recipes/{}/shopping_cart/", recipe["id"]);

    let never_added = app.request("DELETE", &path, Some(&token), None).await;
    assert_eq!(never_added.status, StatusCode::BAD_REQUEST);

    app.request("POST", &path, Some(&token), None).await;
    let removed = app.request("DELETE", &path, Some(&token), None).await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);

    let again = app.request("DELETE", &path, Some(&token), None).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn collections_require_session_and_existing_recipe() {
    let app = setup().await;
    let (_, token) = app.user("eater").await;

    let missing = app
        .request("POST", "/recipes/404/favorite/", Some(&token), None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let recipe = app
        .create_recipe(&token, "Pie", json!([{ "id": APPLE, "amount": 3 }]))
        .await;
    let anonymous = app
        .request(
            "POST",
            &format!("/recipes/{}/favorite/", recipe["id"]),
            None,
            None,
        )
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cart_is_aggregated_by_name_and_unit() {
    let app = setup().await;
    let (user_id, token) = app.user("shopper").await;
    let bread = app
        .create_recipe(
            &token,
            "Bread",
            json!([{ "id": FLOUR, "amount": 200 }, { "id": SUGAR, "amount": 50 }]),
        )
        .await;
    let rolls = app
        .create_recipe(&token, "Rolls", json!([{ "id": FLOUR, "amount": 300 }]))
        .await;
    app.create_recipe(&token, "Juice", json!([{ "id": GRAPE, "amount": 1000 }]))
        .await;

    for recipe in [&bread, &rolls] {
        let added = app
            .request(
                "POST",
                &format!("/recipes/{}/shopping_cart/", recipe["id"]),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(added.status, StatusCode::CREATED);
    }

    let list = shopping_list(app.state.store.as_ref(), user_id as i32)
        .await
        .unwrap();
    assert_eq!(
        list,
        vec![
            ShoppingListItem {
                name: String::from("Flour"),
                measurement_unit: String::from("g"),
                amount: 500,
            },
            ShoppingListItem {
                name: String::from("Sugar"),
                measurement_unit: String::from("g"),
                amount: 50,
            },
        ]
    );

    let in_cart = app
        .request("GET", "/recipes/?is_in_shopping_cart=1", Some(&token), None)
        .await
        .json();
    assert_eq!(in_cart["count"], 2);
}

#[tokio::test]
async fn download_is_a_pdf_attachment() {
    let app = setup().await;
    let (_, token) = app.user("shopper").await;
    let recipe = app
        .create_recipe(&token, "Bread", json!([{ "id": FLOUR, "amount": 200 }]))
        .await;
    app.request(
        "POST",
        &format!("/recipes/{}/shopping_cart/", recipe["id"]),
        Some(&token),
        None,
    )
    .await;

    let response = app
        .request(
            "GET",
            "/recipes/download_shopping_cart/",
            Some(&token),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"shopping_list.pdf\""
    );
    assert!(response.body.starts_with(b"%PDF"));
}

#[tokio::test]
async fn empty_cart_still_downloads() {
    let app = setup().await;
    let (_, token) = app.user("shopper").await;

    let response = app
        .request(
            "GET",
            "/recipes/download_shopping_cart/",
            Some(&token),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.starts_with(b"%PDF"));
}

#[tokio::test]
async fn anonymous_download_is_unauthorized() {
    let app = setup().await;

    let response = app
        .request("GET", "/recipes/download_shopping_cart/", None, None)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleting_recipe_empties_collections() {
    let app = setup().await;
    let (user_id, token) = app.user("shopper").await;
    let recipe = app
        .create_recipe(&token, "Bread", json!([{ "id": FLOUR, "amount": 200 }]))
        .await;
    let id = recipe["id"].clone();

    app.request("POST", &format!("/recipes/{id}/shopping_cart/"), Some(&token), None)
        .await;
    app.request("POST", &format!("/recipes/{id}/favorite/"), Some(&token), None)
        .await;
    app.request("DELETE", &format!("/recipes/{id}/"), Some(&token), None)
        .await;

    let list = shopping_list(app.state.store.as_ref(), user_id as i32)
        .await
        .unwrap();
    assert!(list.is_empty());

    let favorites = app
        .request("GET", "/recipes/?is_favorited=true", Some(&token), None)
        .await
        .json();
    assert_eq!(favorites["count"], 0);
}
