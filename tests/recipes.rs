mod common;

use serde_json::json;
use warp::http::StatusCode;

use common::*;

#[tokio::test]
async fn create_and_read_back() {
    let app = setup().await;
    let (author_id, token) = app.user("baker").await;

    let created = app
        .create_recipe(
            &token,
            "Bread",
            json!([{ "id": FLOUR, "amount": 500 }, { "id": SUGAR, "amount": 10 }]),
        )
        .await;

    assert_eq!(created["author"]["id"], json!(author_id));
    assert_eq!(created["tags"][0]["slug"], "lunch");
    assert_eq!(created["is_favorited"], false);
    assert_eq!(created["is_in_shopping_cart"], false);
    assert!(created["image"]
        .as_str()
        .unwrap()
        .starts_with("/media/recipes/"));
    assert_eq!(amounts(&created), vec![(FLOUR, 500), (SUGAR, 10)]);
    assert_eq!(app.media_files(), 1);

    let id = created["id"].as_i64().unwrap();
    let fetched = app
        .request("GET", &format!("/recipes/{id}/"), None, None)
        .await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.json()["name"], "Bread");
    assert_eq!(fetched.json()["ingredients"][0]["measurement_unit"], "g");
}

#[tokio::test]
async fn anonymous_cannot_create() {
    let app = setup().await;

    let response = app
        .request(
            "POST",
            "/recipes/",
            None,
            Some(recipe_body(
                "Bread",
                json!([LUNCH]),
                json!([{ "id": FLOUR, "amount": 1 }]),
            )),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.json()["detail"].is_string());
}

#[tokio::test]
async fn duplicate_ingredients_persist_nothing() {
    let app = setup().await;
    let (_, token) = app.user("baker").await;
    let body = recipe_body(
        "Bread",
        json!([LUNCH]),
        json!([{ "id": FLOUR, "amount": 1 }, { "id": FLOUR, "amount": 2 }]),
    );

    for _ in 0..2 {
        let response = app
            .request("POST", "/recipes/", Some(&token), Some(body.clone()))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.json()["ingredients"].is_array());
    }

    let listing = app.request("GET", "/recipes/", None, None).await;
    assert_eq!(listing.json()["count"], 0);
    assert_eq!(app.media_files(), 0);
}

#[tokio::test]
async fn duplicate_tags_are_rejected() {
    let app = setup().await;
    let (_, token) = app.user("baker").await;

    let response = app
        .request(
            "POST",
            "/recipes/",
            Some(&token),
            Some(recipe_body(
                "Bread",
                json!([LUNCH, LUNCH]),
                json!([{ "id": FLOUR, "amount": 1 }]),
            )),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["tags"].is_array());
}

#[tokio::test]
async fn unknown_ingredient_is_not_found_and_leaves_nothing() {
    let app = setup().await;
    let (_, token) = app.user("baker").await;

    let response = app
        .request(
            "POST",
            "/recipes/",
            Some(&token),
            Some(recipe_body(
                "Bread",
                json!([LUNCH]),
                json!([{ "id": FLOUR, "amount": 1 }, { "id": 999, "amount": 1 }]),
            )),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let listing = app.request("GET", "/recipes/", None, None).await;
    assert_eq!(listing.json()["count"], 0);
    assert_eq!(app.media_files(), 0);
}

#[tokio::test]
async fn update_replaces_sets() {
    let app = setup().await;
    let (_, token) = app.user("baker").await;
    let created = app
        .create_recipe(
            &token,
            "Cake",
            json!([{ "id": APPLE, "amount": 2 }, { "id": SUGAR, "amount": 1 }]),
        )
        .await;
    let id = created["id"].as_i64().unwrap();

    let response = app
        .request(
            "PATCH",
            &format!("/recipes/{id}/"),
            Some(&token),
            Some(json!({
                "tags": [DINNER],
                "ingredients": [{ "id": SUGAR, "amount": 3 }, { "id": MILK, "amount": 1 }],
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{:?}", response.json());
    let updated = response.json();
    assert_eq!(amounts(&updated), vec![(SUGAR, 3), (MILK, 1)]);
    assert_eq!(updated["tags"].as_array().unwrap().len(), 1);
    assert_eq!(updated["tags"][0]["slug"], "dinner");
    assert_eq!(updated["name"], "Cake");
    assert_eq!(updated["image"], created["image"]);
    assert_eq!(updated["pub_date"], created["pub_date"]);
}

#[tokio::test]
async fn update_with_unknown_ingredient_keeps_previous_state() {
    let app = setup().await;
    let (_, token) = app.user("baker").await;
    let created = app
        .create_recipe(&token, "Cake", json!([{ "id": APPLE, "amount": 2 }]))
        .await;
    let id = created["id"].as_i64().unwrap();

    let response = app
        .request(
            "PATCH",
            &format!("/recipes/{id}/"),
            Some(&token),
            Some(json!({
                "name": "Renamed",
                "image": GIF,
                "tags": [DINNER],
                "ingredients": [{ "id": 999, "amount": 3 }],
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let fetched = app
        .request("GET", &format!("/recipes/{id}/"), None, None)
        .await
        .json();
    assert_eq!(fetched["name"], "Cake");
    assert_eq!(amounts(&fetched), vec![(APPLE, 2)]);
    assert_eq!(fetched["tags"][0]["slug"], "lunch");
    assert_eq!(app.media_files(), 1);
}

#[tokio::test]
async fn new_image_replaces_old_file() {
    let app = setup().await;
    let (_, token) = app.user("baker").await;
    let created = app
        .create_recipe(&token, "Cake", json!([{ "id": APPLE, "amount": 2 }]))
        .await;
    let id = created["id"].as_i64().unwrap();

    let response = app
        .request(
            "PATCH",
            &format!("/recipes/{id}/"),
            Some(&token),
            Some(json!({
                "image": GIF,
                "tags": [LUNCH],
                "ingredients": [{ "id": APPLE, "amount": 2 }],
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_ne!(response.json()["image"], created["image"]);
    assert_eq!(app.media_files(), 1);
}

#[tokio::test]
async fn only_author_or_admin_may_modify() {
    let app = setup().await;
    let (_, author) = app.user("author").await;
    let (_, stranger) = app.user("stranger").await;
    let (_, admin) = app.admin("boss").await;
    let created = app
        .create_recipe(&author, "Soup", json!([{ "id": MILK, "amount": 200 }]))
        .await;
    let path = format!("/recipes/{}/", created["id"]);
    let patch = json!({
        "name": "Better soup",
        "tags": [DINNER],
        "ingredients": [{ "id": MILK, "amount": 250 }],
    });

    let anonymous = app.request("PATCH", &path, None, Some(patch.clone())).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forbidden = app
        .request("PATCH", &path, Some(&stranger), Some(patch.clone()))
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let denied = app.request("DELETE", &path, Some(&stranger), None).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let allowed = app
        .request("PATCH", &path, Some(&admin), Some(patch))
        .await;
    assert_eq!(allowed.status, StatusCode::OK);
    assert_eq!(allowed.json()["name"], "Better soup");
}

#[tokio::test]
async fn delete_removes_recipe_and_image() {
    let app = setup().await;
    let (_, token) = app.user("baker").await;
    let created = app
        .create_recipe(&token, "Bread", json!([{ "id": FLOUR, "amount": 1 }]))
        .await;
    let path = format!("/recipes/{}/", created["id"]);

    let deleted = app.request("DELETE", &path, Some(&token), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(app.media_files(), 0);

    let again = app.request("DELETE", &path, Some(&token), None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_is_paginated_newest_first() {
    let app = setup().await;
    let (_, token) = app.user("baker").await;
    for name in ["First", "Second", "Third"] {
        app.create_recipe(&token, name, json!([{ "id": FLOUR, "amount": 1 }]))
            .await;
    }

    let page = app
        .request("GET", "/recipes/?limit=2", None, None)
        .await
        .json();
    assert_eq!(page["count"], 3);
    assert_eq!(page["results"].as_array().unwrap().len(), 2);
    assert_eq!(page["results"][0]["name"], "Third");
    assert_eq!(page["next"], "?page=2&limit=2");
    assert!(page["previous"].is_null());

    let last = app
        .request("GET", "/recipes/?page=2&limit=2", None, None)
        .await
        .json();
    assert_eq!(last["results"][0]["name"], "First");
    assert!(last["next"].is_null());

    let beyond = app
        .request("GET", "/recipes/?page=3&limit=2", None, None)
        .await;
    assert_eq!(beyond.status, StatusCode::NOT_FOUND);
    assert_eq!(beyond.json()["detail"], "Invalid page.");

    let absurd = app
        .request("GET", "/recipes/?page=9223372036854775807", None, None)
        .await;
    assert_eq!(absurd.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_filters() {
    let app = setup().await;
    let (first_id, first) = app.user("first").await;
    let (_, second) = app.user("second").await;

    let breakfast = app
        .request(
            "POST",
            "/recipes/",
            Some(&first),
            Some(recipe_body(
                "Porridge",
                json!([BREAKFAST]),
                json!([{ "id": MILK, "amount": 200 }]),
            )),
        )
        .await
        .json();
    app.create_recipe(&second, "Salad", json!([{ "id": APPLE, "amount": 1 }]))
        .await;

    let by_author = app
        .request("GET", &format!("/recipes/?author={first_id}"), None, None)
        .await
        .json();
    assert_eq!(by_author["count"], 1);
    assert_eq!(by_author["results"][0]["name"], "Porridge");

    let by_tags = app
        .request("GET", "/recipes/?tags=breakfast&tags=lunch", None, None)
        .await
        .json();
    assert_eq!(by_tags["count"], 2);

    let favorite = app
        .request(
            "POST",
            &format!("/recipes/{}/favorite/", breakfast["id"]),
            Some(&second),
            None,
        )
        .await;
    assert_eq!(favorite.status, StatusCode::CREATED);

    let favorited = app
        .request("GET", "/recipes/?is_favorited=1", Some(&second), None)
        .await
        .json();
    assert_eq!(favorited["count"], 1);
    assert_eq!(favorited["results"][0]["is_favorited"], true);

    let anonymous = app
        .request("GET", "/recipes/?is_favorited=1", None, None)
        .await
        .json();
    assert_eq!(anonymous["count"], 2);
    assert_eq!(anonymous["results"][0]["is_favorited"], false);

    let not_favorited = app
        .request("GET", "/recipes/?is_favorited=0", Some(&second), None)
        .await
        .json();
    assert_eq!(not_favorited["count"], 2);
}

#[tokio::test]
async fn malformed_requests() {
    let app = setup().await;
    let (_, token) = app.user("baker").await;

    let bad_token = app
        .request("GET", "/recipes/", Some("not-a-token"), None)
        .await;
    assert_eq!(bad_token.status, StatusCode::UNAUTHORIZED);

    let unknown = app.request("GET", "/nowhere/", None, None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.json()["detail"], "Not found.");

    let bad_filter = app
        .request("GET", "/recipes/?author=someone", None, None)
        .await;
    assert_eq!(bad_filter.status, StatusCode::BAD_REQUEST);

    let wrong_type = app
        .request(
            "POST",
            "/recipes/",
            Some(&token),
            Some(json!({ "cooking_time": "soon" })),
        )
        .await;
    assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);
}
