use std::sync::Arc;

use actix_web::{
    App,
    http::{StatusCode, header},
    test, web,
};
use chrono::{Duration, Utc};
use recipe_box::auth::{generate_token, hash_password, hash_token};
use recipe_box::config::Config;
use recipe_box::configure;
use recipe_box::models::NutritionRecord;
use recipe_box::nutrition::NutritionTable;
use recipe_box::repository::{MemoryRepository, RecipeRepository, Repository, UserRepository};
use serde_json::{Value, json};

fn record(
    id: i32,
    name: &str,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
) -> NutritionRecord {
    NutritionRecord {
        id,
        product_type: "Test".to_string(),
        name: name.to_string(),
        calories_per_100: calories,
        protein_per_100: protein,
        carbohydrates_per_100: carbs,
        fat_per_100: fat,
    }
}

fn state() -> (Arc<MemoryRepository>, web::Data<dyn Repository>, web::Data<Config>) {
    let repo = Arc::new(MemoryRepository::new(NutritionTable::new(vec![
        record(1, "Egg", 155.0, 13.0, 1.1, 11.0),
        record(2, "Milk", 42.0, 3.4, 5.0, 1.0),
    ])));
    let shared: Arc<dyn Repository> = repo.clone();
    let config = Config::from_lookup(|key| match key {
        "STORAGE" => Some("memory".to_string()),
        _ => None,
    })
    .unwrap();
    (repo, web::Data::from(shared), web::Data::new(config))
}

/// Creates a user with a live session and returns its bearer token.
fn seed_user(repo: &MemoryRepository, username: &str) -> String {
    let hash = hash_password("secret").unwrap();
    let user = repo
        .create_user(username, &format!("{username}@example.com"), &hash)
        .unwrap();
    let token = generate_token();
    repo.create_session(user.id, &hash_token(&token), Utc::now() + Duration::hours(1))
        .unwrap();
    token
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

fn recipe_body(ingredients: Value) -> Value {
    json!({
        "name": "Egg Scramble",
        "description": "Quick breakfast",
        "prep_time": 5,
        "servings": 1,
        "cook_time": 5,
        "instructions": "Whisk, then stir over low heat.",
        "ingredients": ingredients
    })
}

fn assert_close(actual: &Value, expected: f64) {
    let actual = actual.as_f64().unwrap();
    assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
}

#[actix_rt::test]
async fn test_register_login_logout_flow() {
    let (_repo, data, config) = state();
    let app = test::init_service(
        App::new()
            .app_data(data)
            .app_data(config)
            .configure(configure),
    )
    .await;

    let register = json!({"username": "cook", "email": "cook@example.com", "password": "pw"});
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&register)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({"username": "other", "email": "cook@example.com", "password": "pw"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "This email is already in use");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"email": "cook@example.com", "password": "wrong"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"email": "cook@example.com", "password": "pw"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/my_recipes")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/auth/logout")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/api/my_recipes")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_create_recipe_computes_totals() {
    let (repo, data, config) = state();
    let token = seed_user(&repo, "cook");
    let app = test::init_service(
        App::new()
            .app_data(data)
            .app_data(config)
            .configure(configure),
    )
    .await;

    let body = recipe_body(json!([
        {"product": "Egg", "quantity": "200"},
        {"product": "Nonexistent Item", "quantity": "100"},
        {"product": "Milk", "quantity": "abc"},
        {"product": "", "quantity": "100"},
        {}
    ]));
    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .insert_header(bearer(&token))
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_close(&body["total_nutrition"]["Calories"], 310.0);
    assert_close(&body["total_nutrition"]["Protein"], 26.0);
    assert_close(&body["total_nutrition"]["Carbohydrate"], 2.2);
    assert_close(&body["total_nutrition"]["Fat"], 22.0);

    let stored: Vec<(&str, &str)> = body["ingredients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| {
            (
                i["product_name"].as_str().unwrap(),
                i["quantity"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        stored,
        vec![("Egg", "200"), ("Nonexistent Item", "100"), ("Milk", "abc")]
    );

    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["slot"], 2);
}

#[actix_rt::test]
async fn test_create_recipe_requires_login() {
    let (_repo, data, config) = state();
    let app = test::init_service(
        App::new()
            .app_data(data)
            .app_data(config)
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .set_json(recipe_body(json!([])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .insert_header(("Authorization", "Token abc"))
        .set_json(recipe_body(json!([])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_invalid_recipe_reports_fields() {
    let (repo, data, config) = state();
    let token = seed_user(&repo, "cook");
    let app = test::init_service(
        App::new()
            .app_data(data)
            .app_data(config)
            .configure(configure),
    )
    .await;

    let mut body = recipe_body(json!([{"product": "Egg", "quantity": "1"}]));
    body["name"] = json!("");
    body["servings"] = json!(0);

    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .insert_header(bearer(&token))
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["name", "servings"]);
}

#[actix_rt::test]
async fn test_malformed_bodies_get_json_errors() {
    let (repo, data, config) = state();
    let token = seed_user(&repo, "cook");
    let app = test::init_service(
        App::new()
            .app_data(data)
            .app_data(config)
            .configure(configure),
    )
    .await;

    let mut string_prep_time = recipe_body(json!([]));
    string_prep_time["prep_time"] = json!("5");
    let bodies = [
        recipe_body(json!([{"product": "Egg", "quantity": 200}])),
        string_prep_time,
    ];

    for body in bodies {
        let req = test::TestRequest::post()
            .uri("/api/recipes")
            .insert_header(bearer(&token))
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("invalid type"));
    }

    let req = test::TestRequest::get()
        .uri("/api/recipes/abc")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());

    assert!(repo.list_recipes().unwrap().is_empty());
}

#[actix_rt::test]
async fn test_form_reports_every_failing_field() {
    let (repo, data, config) = state();
    let token = seed_user(&repo, "cook");
    let app = test::init_service(
        App::new()
            .app_data(data)
            .app_data(config)
            .configure(configure),
    )
    .await;

    let form = vec![
        ("name", ""),
        ("description", ""),
        ("prep_time", "x"),
        ("servings", "2"),
        ("cook_time", "10"),
        ("instructions", "Combine and cook."),
    ];
    let req = test::TestRequest::post()
        .uri("/addrecipe")
        .insert_header(bearer(&token))
        .set_form(&form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["prep_time", "name", "description"]);
}

#[actix_rt::test]
async fn test_form_submission_uses_indexed_fields() {
    let (repo, data, config) = state();
    let token = seed_user(&repo, "cook");
    let app = test::init_service(
        App::new()
            .app_data(data)
            .app_data(config)
            .configure(configure),
    )
    .await;

    let form = vec![
        ("name", "Milky Eggs"),
        ("description", "Eggs with milk"),
        ("prep_time", "5"),
        ("servings", "2"),
        ("cook_time", "10"),
        ("instructions", "Combine and cook."),
        ("list_of_products_0", "Egg"),
        ("quantities_0", "100"),
        ("list_of_products_3", "Milk"),
        ("quantities_3", "50"),
    ];
    let req = test::TestRequest::post()
        .uri("/addrecipe")
        .insert_header(bearer(&token))
        .set_form(&form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_close(&body["total_nutrition"]["Calories"], 155.0 + 21.0);
    assert_eq!(body["ingredients"].as_array().unwrap().len(), 2);
}

#[actix_rt::test]
async fn test_preview_does_not_store() {
    let (repo, data, config) = state();
    let app = test::init_service(
        App::new()
            .app_data(data)
            .app_data(config)
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/nutrition/preview")
        .set_json(json!({"ingredients": [
            {"product": "Egg", "quantity": "200"},
            {"product": "Unknown", "quantity": "10"}
        ]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_close(&body["total_nutrition"]["Calories"], 310.0);
    assert_eq!(body["ingredients"][0]["product"]["name"], "Egg");
    assert_eq!(body["ingredients"][1]["product"], Value::Null);
    assert!(repo.list_recipes().unwrap().is_empty());
}

#[actix_rt::test]
async fn test_products_are_listed_by_name() {
    let (_repo, data, config) = state();
    let app = test::init_service(
        App::new()
            .app_data(data)
            .app_data(config)
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/products").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"products": ["Egg", "Milk"]}));
}

#[actix_rt::test]
async fn test_view_edit_and_delete_recipe() {
    let (repo, data, config) = state();
    let owner = seed_user(&repo, "owner");
    let guest = seed_user(&repo, "guest");
    let app = test::init_service(
        App::new()
            .app_data(data)
            .app_data(config)
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/recipes")
        .insert_header(bearer(&owner))
        .set_json(recipe_body(json!([{"product": "Egg", "quantity": "100"}])))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["recipe"]["id"].as_i64().unwrap();
    let uri = format!("/api/recipes/{id}");

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&guest))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let detail: Value = test::read_body_json(resp).await;
    assert_close(&detail["total_nutrition"]["Calories"], 155.0);

    let req = test::TestRequest::get().uri("/api/recipes").to_request();
    let all: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(all["recipes"].as_array().unwrap().len(), 1);

    let mut changed = recipe_body(json!([]));
    changed["servings"] = json!(4);
    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&guest))
        .set_json(&changed)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&owner))
        .set_json(&changed)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(resp).await;
    assert_eq!(updated["recipe"]["servings"], 4);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&guest))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&owner))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&owner))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
